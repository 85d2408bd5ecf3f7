use std::collections::VecDeque;

use {
    dashmap::DashMap,
    serde::{Deserialize, Serialize},
    tally_common::{now_ms, types::IntentRecord},
};

/// Turns kept per conversation unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub text: String,
    pub sender: Sender,
    pub timestamp_ms: i64,
    /// Set on user turns once classification completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<IntentRecord>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
            timestamp_ms: now_ms(),
            classification: None,
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Agent,
            timestamp_ms: now_ms(),
            classification: None,
        }
    }

    #[must_use]
    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// Bounded per-conversation history. The oldest turn is evicted once a
/// conversation holds `capacity` turns.
pub struct ContextTracker {
    capacity: usize,
    conversations: DashMap<String, VecDeque<Turn>>,
}

impl ContextTracker {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            conversations: DashMap::new(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn append(&self, conversation_id: &str, turn: Turn) {
        let mut turns = self
            .conversations
            .entry(conversation_id.to_string())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));
        while turns.len() >= self.capacity {
            turns.pop_front();
        }
        turns.push_back(turn);
    }

    /// Up to `k` most recent turns, oldest first.
    #[must_use]
    pub fn recent(&self, conversation_id: &str, k: usize) -> Vec<Turn> {
        self.conversations
            .get(conversation_id)
            .map(|turns| {
                let skip = turns.len().saturating_sub(k);
                turns.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    /// Attach a classification to the most recent user turn. Returns `false`
    /// when the conversation has no user turn.
    pub fn attach_classification(&self, conversation_id: &str, record: IntentRecord) -> bool {
        let Some(mut turns) = self.conversations.get_mut(conversation_id) else {
            return false;
        };
        match turns.iter_mut().rev().find(|t| t.is_user()) {
            Some(turn) => {
                turn.classification = Some(record);
                true
            },
            None => false,
        }
    }

    pub fn clear(&self, conversation_id: &str) {
        self.conversations.remove(conversation_id);
    }

    #[must_use]
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }
}

impl Default for ContextTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
