use cyberchat_core::types::Role;
use serde::{Deserialize, Serialize};

/// A stored chat conversation.
///
/// `messages` holds whatever the query asked for: everything for a single
/// conversation, only the first message as a preview in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// UUIDv7 primary key, time-sortable.
    pub id: String,
    pub title: String,
    /// RFC3339 creation timestamp.
    pub created_at: String,
    /// RFC3339 timestamp, bumped whenever a message is added.
    pub updated_at: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// A single stored message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub content: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_used: Option<String>,
    pub created_at: String,
}

/// Input for appending a message. The role is validated by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub content: String,
    pub role: String,
    #[serde(default, alias = "pluginUsed")]
    pub plugin_used: Option<String>,
}

impl NewMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            role: role.to_string(),
            plugin_used: None,
        }
    }

    pub fn with_plugin(mut self, plugin: Option<String>) -> Self {
        self.plugin_used = plugin;
        self
    }
}
