//! Conversation data structures
//!
//! Sessions are persisted as an opaque JSON blob of the shape
//! `{"conversation": [{"content": "...", "isUser": true}, ...]}`. The blob
//! is overwritten wholesale on every save; turns are append-only from the
//! client's perspective and carry no timestamps.

use serde::{Deserialize, Serialize};

/// The conversation blob stored in a session row
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    /// Ordered turns, oldest first
    pub conversation: Vec<ConversationTurn>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn to the conversation
    pub fn push_turn(&mut self, content: impl Into<String>, is_user: bool) {
        self.conversation.push(ConversationTurn {
            content: content.into(),
            is_user,
        });
    }

    /// Serialize to the stored blob form
    pub fn encode(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize a stored blob; anything else is treated as corrupt
    pub fn decode(data: &str) -> crate::Result<Self> {
        serde_json::from_str(data)
            .map_err(|e| crate::Error::Session(format!("corrupt session data: {}", e)))
    }
}

/// A single exchange turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Message text
    pub content: String,
    /// True for user turns, false for assistant turns
    #[serde(rename = "isUser")]
    pub is_user: bool,
}
