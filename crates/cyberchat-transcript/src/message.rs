use chrono::{DateTime, Utc};
use cyberchat_core::types::{Role, StepInfo};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One rendered entry of the chat transcript. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptMessage {
    /// UUIDv7, unique and time-sortable.
    pub id: String,
    pub content: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_info: Option<StepInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_used: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            content: content.into(),
            role,
            step_info: None,
            plugin_used: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_step(mut self, step: StepInfo) -> Self {
        self.step_info = Some(step);
        self
    }

    pub fn with_plugin(mut self, plugin: Option<String>) -> Self {
        self.plugin_used = plugin;
        self
    }
}

/// Append-only, insertion-ordered list of transcript messages.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<TranscriptMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: TranscriptMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[TranscriptMessage] {
        &self.messages
    }

    /// Messages appended at or after position `from`.
    pub fn since(&self, from: usize) -> &[TranscriptMessage] {
        self.messages.get(from..).unwrap_or(&[])
    }

    pub fn last(&self) -> Option<&TranscriptMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = TranscriptMessage::new(Role::User, "hi");
        let b = TranscriptMessage::new(Role::User, "hi");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn serializes_camel_case_and_skips_absent_fields() {
        let msg = TranscriptMessage::new(Role::Assistant, "done")
            .with_plugin(Some("nmap-scanner".into()));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["pluginUsed"], "nmap-scanner");
        assert_eq!(json["role"], "assistant");
        assert!(json.get("stepInfo").is_none());
    }

    #[test]
    fn since_out_of_range_is_empty() {
        let mut t = Transcript::new();
        t.push(TranscriptMessage::new(Role::User, "q"));
        assert_eq!(t.since(0).len(), 1);
        assert!(t.since(1).is_empty());
        assert!(t.since(5).is_empty());
    }
}
