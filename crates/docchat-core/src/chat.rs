//! Chat message types for the conversation log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::MessageId;

/// Role of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    /// Question typed by the user.
    User,
    /// Answer or error reported by the backend.
    Assistant,
}

/// A message in the conversation log.
///
/// Messages are immutable once appended to a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    /// Client-generated identifier.
    pub id: MessageId,
    /// Role of this message.
    pub role: ChatRole,
    /// Raw message content (not yet formatted).
    pub content: String,
    /// When the message was created on this client.
    pub created_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Create a new chat message with a fresh identifier.
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            content: content.into(),
            created_at: Some(Utc::now()),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    pub fn is_user(&self) -> bool {
        self.role == ChatRole::User
    }
}

/// A supporting excerpt returned alongside an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceExcerpt {
    /// Excerpt text.
    pub content: String,
    /// Opaque annotations attached by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl SourceExcerpt {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: None,
        }
    }

    /// Name of the document the excerpt came from, if the backend sent one.
    pub fn origin(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("source"))
            .and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constructors_set_role_and_timestamp() {
        let user = ChatMessage::user("hi");
        let assistant = ChatMessage::assistant("hello");
        assert!(user.is_user());
        assert_eq!(assistant.role, ChatRole::Assistant);
        assert!(user.created_at.is_some());
        assert_ne!(user.id, assistant.id);
    }

    #[test]
    fn test_source_origin() {
        let source: SourceExcerpt = serde_json::from_value(json!({
            "content": "X details",
            "metadata": { "source": "a.pdf", "chunk": 3 }
        }))
        .unwrap();
        assert_eq!(source.origin(), Some("a.pdf"));
        assert_eq!(SourceExcerpt::new("plain").origin(), None);
    }
}
