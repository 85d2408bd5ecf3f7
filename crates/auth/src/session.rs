use {dashmap::DashMap, tally_common::now_ms};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub conversation_id: String,
    pub user_id: String,
    /// Unix millis.
    pub established_at: i64,
}

/// Established sessions, at most one per conversation.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, conversation_id: &str) -> Option<Session> {
        self.sessions.get(conversation_id).map(|s| s.clone())
    }

    /// Create or refresh the session for a conversation.
    pub fn establish(&self, conversation_id: &str, user_id: &str) -> Session {
        let session = Session {
            conversation_id: conversation_id.to_string(),
            user_id: user_id.to_string(),
            established_at: now_ms(),
        };
        self.sessions
            .insert(conversation_id.to_string(), session.clone());
        session
    }

    pub fn end(&self, conversation_id: &str) -> Option<Session> {
        self.sessions.remove(conversation_id).map(|(_, s)| s)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
