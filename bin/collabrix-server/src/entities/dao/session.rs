use chrono::{DateTime, Utc};
use collabrix_types::Turn;

/// A user's chat session: one row in `chat_sessions` plus its `chat_turns`.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub user_id: String,
    /// Append order, oldest first.
    pub turns: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// A fresh, empty session that has not been written yet.
    pub fn empty(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The last `window` turns; `0` means the whole transcript.
    pub fn recent_turns(&self, window: usize) -> &[Turn] {
        if window == 0 || self.turns.len() <= window {
            &self.turns
        } else {
            &self.turns[self.turns.len() - window..]
        }
    }
}
