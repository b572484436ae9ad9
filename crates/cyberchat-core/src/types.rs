use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a transcript or stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[default]
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Body of a query sent to the relay and forwarded upstream unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub plugin_id: Option<i64>,
    /// Ask the upstream to pick a plugin itself; announced back in-band.
    #[serde(default)]
    pub auto_select_plugin: bool,
}

/// A discrete phase of upstream processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// One ndjson record of the query stream.
///
/// Every field is optional; which ones are present decides how the record is
/// applied. Unknown keys (e.g. `endpoint`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<StepInfo>,
    #[serde(
        default,
        alias = "pluginUsed",
        skip_serializing_if = "Option::is_none"
    )]
    pub plugin_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The upstream places step reasoning beside `step` rather than inside it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// JSON error body returned by every gateway route: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

/// A single parameter accepted by a plugin's API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginParameter {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
}

fn default_param_type() -> String {
    "string".to_string()
}

/// Plugin record as served by the backend's plugin registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub api_endpoint: String,
    #[serde(default)]
    pub api_key_required: bool,
    #[serde(default)]
    pub parameters: Vec<PluginParameter>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_accepts_both_plugin_spellings() {
        let a: ChunkEnvelope = serde_json::from_str(r#"{"plugin_used":"nmap-scanner"}"#).unwrap();
        let b: ChunkEnvelope = serde_json::from_str(r#"{"pluginUsed":"nmap-scanner"}"#).unwrap();
        assert_eq!(a.plugin_used.as_deref(), Some("nmap-scanner"));
        assert_eq!(a, b);
    }

    #[test]
    fn envelope_ignores_unknown_keys() {
        let env: ChunkEnvelope = serde_json::from_str(
            r#"{"text":"Using geo","endpoint":"geo","step":{"id":3,"name":"endpoint_selection","role":"system"}}"#,
        )
        .unwrap();
        let step = env.step.unwrap();
        assert_eq!(step.id, 3);
        assert_eq!(step.role, Some(Role::System));
        assert_eq!(env.text.as_deref(), Some("Using geo"));
    }

    #[test]
    fn query_request_defaults() {
        let req: QueryRequest = serde_json::from_str(r#"{"query":"scan 10.0.0.1"}"#).unwrap();
        assert_eq!(req.plugin_id, None);
        assert!(!req.auto_select_plugin);
        let json = serde_json::to_value(&req).unwrap();
        assert!(json["plugin_id"].is_null());
    }

    #[test]
    fn role_round_trip() {
        assert_eq!("system".parse::<Role>().unwrap(), Role::System);
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(Role::User.to_string(), "user");
    }

    #[test]
    fn plugin_parameter_type_defaults_to_string() {
        let p: PluginParameter = serde_json::from_str(r#"{"name":"ip"}"#).unwrap();
        assert_eq!(p.param_type, "string");
        assert!(!p.required);
    }
}
