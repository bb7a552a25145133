/// Chat model trait and shared types for the generative backend.
///
/// The backend accepts a system instruction plus an ordered list of turns and
/// returns text synchronously. Backend-unreachable is an infrastructure
/// error, distinct from a content answer.
pub mod mock;
pub mod ollama;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One conversation turn. Also the on-disk shape of the chat history file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Errors that can occur when invoking the generative backend.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("chat backend unreachable: {0}")]
    Unreachable(String),

    #[error("chat backend returned a malformed response: {0}")]
    BadResponse(String),
}

/// Trait for generative chat backends.
pub trait ChatModel: Send + Sync {
    /// Complete a conversation: system instruction + turns in, reply text out.
    fn complete(&self, system: &str, turns: &[ChatTurn]) -> Result<String, ChatError>;
}

impl<T: ChatModel + ?Sized> ChatModel for std::sync::Arc<T> {
    fn complete(&self, system: &str, turns: &[ChatTurn]) -> Result<String, ChatError> {
        (**self).complete(system, turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_serialization() {
        let turn = ChatTurn::user("hello");
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hello"}"#);

        let back: ChatTurn = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, Role::User);
        assert_eq!(back.content, "hello");
    }

    #[test]
    fn test_role_as_str() {
        assert_eq!(Role::System.as_str(), "system");
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }
}
