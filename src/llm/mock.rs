/// Scripted chat model for testing.
///
/// Returns queued replies in order, then a fixed fallback. Records the turns
/// of the last call so tests can assert on the prompt that was sent.
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{ChatError, ChatModel, ChatTurn};

pub struct MockChat {
    replies: Mutex<VecDeque<String>>,
    pub calls: Mutex<Vec<Vec<ChatTurn>>>,
    fallback: String,
}

impl MockChat {
    #[must_use]
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            calls: Mutex::new(Vec::new()),
            fallback: "I don't know.".to_string(),
        }
    }

    /// Number of times `complete` was invoked.
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl Default for MockChat {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

impl ChatModel for MockChat {
    fn complete(&self, _system: &str, turns: &[ChatTurn]) -> Result<String, ChatError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(turns.to_vec());
        }
        let reply = self
            .replies
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| self.fallback.clone());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_replies_in_order() {
        let chat = MockChat::new(["first", "second"]);
        assert_eq!(chat.complete("s", &[]).unwrap(), "first");
        assert_eq!(chat.complete("s", &[]).unwrap(), "second");
        // Exhausted queue falls back to the refusal phrase
        assert_eq!(chat.complete("s", &[]).unwrap(), "I don't know.");
        assert_eq!(chat.call_count(), 3);
    }

    #[test]
    fn test_records_turns() {
        let chat = MockChat::new(["ok"]);
        chat.complete("s", &[ChatTurn::user("question")]).unwrap();
        let calls = chat.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0].content, "question");
    }
}
