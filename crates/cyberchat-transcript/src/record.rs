use cyberchat_core::types::ChunkEnvelope;

/// A classified ndjson line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// A JSON object; its populated fields decide the effect.
    Envelope(ChunkEnvelope),
    /// Anything that is not a JSON object of the expected shape. Applied as
    /// literal text so nothing the upstream sent is lost.
    Raw(String),
}

impl Record {
    /// Classify one line. Never fails: malformed input becomes [`Record::Raw`].
    pub fn parse(line: &str) -> Self {
        let value = match serde_json::from_str::<serde_json::Value>(line) {
            Ok(v) if v.is_object() => v,
            _ => return Record::Raw(line.to_string()),
        };
        // an error is fatal whatever shape its sibling fields have
        if let Some(message) = value.get("error").and_then(serde_json::Value::as_str) {
            return Record::Envelope(ChunkEnvelope {
                error: Some(message.to_string()),
                ..ChunkEnvelope::default()
            });
        }
        match serde_json::from_value::<ChunkEnvelope>(value) {
            Ok(mut env) => {
                // an empty delta carries nothing
                if env.text.as_deref() == Some("") {
                    env.text = None;
                }
                Record::Envelope(env)
            }
            Err(e) => {
                tracing::debug!(err = %e, "ndjson record has unexpected shape, treating as text");
                Record::Raw(line.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_record() {
        match Record::parse(r#"{"text":"Hello"}"#) {
            Record::Envelope(env) => assert_eq!(env.text.as_deref(), Some("Hello")),
            other => panic!("expected envelope, got {other:?}"),
        }
    }

    #[test]
    fn error_survives_mistyped_siblings() {
        let expected = Record::Envelope(ChunkEnvelope {
            error: Some("upstream timeout".into()),
            ..ChunkEnvelope::default()
        });
        assert_eq!(
            Record::parse(r#"{"error":"upstream timeout","text":5}"#),
            expected
        );
        assert_eq!(
            Record::parse(r#"{"error":"upstream timeout","step":"scan"}"#),
            expected
        );
    }

    #[test]
    fn non_string_error_is_raw() {
        let line = r#"{"error":{"code":500}}"#;
        assert_eq!(Record::parse(line), Record::Raw(line.to_string()));
    }

    #[test]
    fn invalid_json_is_raw() {
        assert_eq!(
            Record::parse("not json {"),
            Record::Raw("not json {".to_string())
        );
    }

    #[test]
    fn non_object_json_is_raw() {
        assert_eq!(Record::parse("42"), Record::Raw("42".to_string()));
        assert_eq!(
            Record::parse(r#"["a","b"]"#),
            Record::Raw(r#"["a","b"]"#.to_string())
        );
    }

    #[test]
    fn wrongly_shaped_step_is_raw() {
        let line = r#"{"text":"x","step":"scan"}"#;
        assert_eq!(Record::parse(line), Record::Raw(line.to_string()));
    }

    #[test]
    fn empty_text_counts_as_absent() {
        match Record::parse(r#"{"text":"","plugin_used":"IPinfo"}"#) {
            Record::Envelope(env) => {
                assert_eq!(env.text, None);
                assert_eq!(env.plugin_used.as_deref(), Some("IPinfo"));
            }
            other => panic!("expected envelope, got {other:?}"),
        }
    }
}
