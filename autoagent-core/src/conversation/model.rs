//! Conversation data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Title given to conversations until the first user message names them
pub const PLACEHOLDER_TITLE: &str = "New Chat";

/// Placeholder written by the web client; stored blobs may still carry it
pub const LEGACY_PLACEHOLDER_TITLE: &str = "新对话";

/// Id of the conversation created on first start and by a full reset
pub const DEFAULT_CONVERSATION_ID: &str = "default";

/// Characters of the first user message kept in a derived title
pub const TITLE_MAX_CHARS: usize = 20;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        f.write_str(name)
    }
}

/// Reasoning and tool usage the backend reported alongside a reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasoning_steps: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools_used: Vec<serde_json::Value>,
}

impl Annotations {
    pub fn is_empty(&self) -> bool {
        self.reasoning_steps.is_empty() && self.tools_used.is_empty()
    }
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role (user, assistant, system)
    pub role: Role,
    /// Message content; assistant replies may carry lightweight Markdown
    pub content: String,
    /// Time the message was appended
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Annotations>,
}

impl Message {
    /// Create a new message stamped with the current time
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            annotations: None,
        }
    }

    /// Attach backend annotations, dropping empty ones
    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        if !annotations.is_empty() {
            self.annotations = Some(annotations);
        }
        self
    }
}

/// A titled, ordered sequence of messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Client-generated id, immutable
    pub id: String,
    pub title: String,
    /// Creation time; older blobs call this field `timestamp`
    #[serde(alias = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Conversation id assigned by the backend, when it issued one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
}

impl Conversation {
    /// Create an empty conversation with the placeholder title
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: PLACEHOLDER_TITLE.to_string(),
            created_at: Utc::now(),
            messages: Vec::new(),
            remote_id: None,
        }
    }

    /// Still carrying the placeholder title
    pub fn is_untitled(&self) -> bool {
        self.title == PLACEHOLDER_TITLE || self.title == LEGACY_PLACEHOLDER_TITLE
    }

    /// Whether any user message has been appended yet
    pub fn has_user_message(&self) -> bool {
        self.messages.iter().any(|m| m.role == Role::User)
    }

    /// Append a message, naming the conversation after its first user
    /// message. Returns the new title when one was derived.
    pub fn push(&mut self, message: Message) -> Option<String> {
        let names_conversation =
            message.role == Role::User && self.is_untitled() && !self.has_user_message();
        let derived = names_conversation.then(|| derive_title(&message.content));
        self.messages.push(message);
        if let Some(title) = &derived {
            self.title = title.clone();
        }
        derived
    }
}

/// Title derived from a first user message
pub fn derive_title(first_message: &str) -> String {
    crate::utils::truncate_chars(first_message.trim(), TITLE_MAX_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_creation() {
        let conversation = Conversation::new("chat_1");
        assert_eq!(conversation.id, "chat_1");
        assert!(conversation.is_untitled());
        assert!(conversation.messages.is_empty());
    }

    #[test]
    fn test_first_user_message_sets_title_once() {
        let mut conversation = Conversation::new("chat_1");

        let derived = conversation.push(Message::new(Role::User, "a".repeat(25)));
        assert_eq!(derived, Some(format!("{}...", "a".repeat(20))));

        let derived = conversation.push(Message::new(Role::User, "second question"));
        assert!(derived.is_none());
        assert_eq!(conversation.title, format!("{}...", "a".repeat(20)));
    }

    #[test]
    fn test_assistant_message_does_not_name_conversation() {
        let mut conversation = Conversation::new("chat_1");
        assert!(conversation
            .push(Message::new(Role::Assistant, "Hello!"))
            .is_none());
        assert!(conversation.is_untitled());

        assert_eq!(
            conversation.push(Message::new(Role::User, "short")),
            Some("short".to_string())
        );
    }

    #[test]
    fn test_renamed_conversation_keeps_its_title() {
        let mut conversation = Conversation::new("chat_1");
        conversation.title = "Quarterly report".to_string();
        assert!(conversation
            .push(Message::new(Role::User, "first"))
            .is_none());
        assert_eq!(conversation.title, "Quarterly report");
    }

    #[test]
    fn test_legacy_blob_without_messages() {
        let raw = r#"{"id":"default","title":"New Chat","timestamp":"2025-01-02T03:04:05.000Z"}"#;
        let conversation: Conversation = serde_json::from_str(raw).unwrap();
        assert_eq!(conversation.id, "default");
        assert!(conversation.messages.is_empty());
        assert!(conversation.remote_id.is_none());
    }

    #[test]
    fn test_legacy_placeholder_is_untitled() {
        let raw = r#"{"id":"default","title":"新对话","timestamp":"2025-01-02T03:04:05.000Z"}"#;
        let mut conversation: Conversation = serde_json::from_str(raw).unwrap();
        assert!(conversation.is_untitled());
        assert_eq!(
            conversation.push(Message::new(Role::User, "disk usage")),
            Some("disk usage".to_string())
        );
    }

    #[test]
    fn test_role_wire_names() {
        let message = Message::new(Role::Assistant, "hi");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "assistant");
        assert!(value.get("annotations").is_none());
    }
}
