//! Per-session conversation context, passed explicitly into each turn.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::config::defaults::GREETING;
use crate::llm::ChatMessage;

#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    /// A fresh session opens with the assistant greeting.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            messages: vec![ChatMessage::assistant(GREETING)],
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn greeting(&self) -> &str {
        GREETING
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    /// Up to `n` most recent turns, oldest first, excluding the greeting.
    pub fn recent(&self, n: usize) -> &[ChatMessage] {
        let turns = &self.messages[1..];
        &turns[turns.len().saturating_sub(n)..]
    }

    pub fn turn_count(&self) -> usize {
        self.messages.len() - 1
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_starts_with_greeting_only() {
        let session = ChatSession::new();
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, "assistant");
        assert_eq!(session.messages()[0].content, GREETING);
        assert_eq!(session.turn_count(), 0);
        assert!(session.recent(5).is_empty());
    }

    #[test]
    fn recent_returns_latest_turns_in_order() {
        let mut session = ChatSession::new();
        session.push_user("one");
        session.push_assistant("two");
        session.push_user("three");

        let recent: Vec<&str> = session.recent(2).iter().map(|m| m.content.as_str()).collect();
        assert_eq!(recent, vec!["two", "three"]);
        assert_eq!(session.recent(10).len(), 3);
        assert!(session.recent(0).is_empty());
    }

    #[test]
    fn sessions_have_distinct_ids() {
        assert_ne!(ChatSession::new().id(), ChatSession::new().id());
    }
}
