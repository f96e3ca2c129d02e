//! Volatile conversation history for guest mode.

use super::timeline::MessageRole;
use serde::{Deserialize, Serialize};

/// One `{role, content}` pair of guest history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestTurn {
    pub role: MessageRole,
    pub content: String,
}

impl GuestTurn {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Client-held history of a guest conversation.
///
/// Lives only as long as the process; never written anywhere. Growth is
/// bounded by the backend's rate limit, not by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuestHistory {
    turns: Vec<GuestTurn>,
}

impl GuestHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed exchange. Both turns are appended together.
    pub fn push_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.turns.push(GuestTurn::new(MessageRole::User, user));
        self.turns.push(GuestTurn::new(MessageRole::Assistant, assistant));
    }

    /// Appends a synthetic system note, e.g. a scan summary.
    pub fn push_system_note(&mut self, note: impl Into<String>) {
        self.turns.push(GuestTurn::new(MessageRole::System, note));
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[GuestTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_appends_user_then_assistant() {
        let mut history = GuestHistory::new();
        history.push_exchange("hi", "hello");
        history.push_system_note("Scan executed");

        let roles: Vec<_> = history.turns().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::User, MessageRole::Assistant, MessageRole::System]
        );

        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn test_turn_wire_format() {
        let turn = GuestTurn::new(MessageRole::Assistant, "ok");
        assert_eq!(
            serde_json::to_string(&turn).unwrap(),
            r#"{"role":"assistant","content":"ok"}"#
        );
    }
}
