//! In-memory login dialogue state, one process per conversation.
//!
//! Abandoned processes expire lazily: a process older than the book's TTL is
//! dropped the next time it is looked up, and the conversation starts over.

use std::time::{Duration, Instant};

use {
    dashmap::DashMap,
    serde::{Deserialize, Serialize},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginStep {
    Welcome,
    Email,
    Password,
    Authenticated,
}

impl std::fmt::Display for LoginStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Welcome => write!(f, "welcome"),
            Self::Email => write!(f, "email"),
            Self::Password => write!(f, "password"),
            Self::Authenticated => write!(f, "authenticated"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginProcess {
    pub conversation_id: String,
    pub step: LoginStep,
    pub pending_email: Option<String>,
    pub started_at: Instant,
}

impl LoginProcess {
    fn new(conversation_id: &str, now: Instant) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            step: LoginStep::Email,
            pending_email: None,
            started_at: now,
        }
    }
}

pub const DEFAULT_LOGIN_TTL: Duration = Duration::from_secs(600);

/// Open login processes keyed by conversation id.
pub struct LoginBook {
    ttl: Duration,
    processes: DashMap<String, LoginProcess>,
}

impl Default for LoginBook {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_TTL)
    }
}

impl LoginBook {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            processes: DashMap::new(),
        }
    }

    /// Current step; `Welcome` when no live process exists.
    #[must_use]
    pub fn step(&self, conversation_id: &str) -> LoginStep {
        self.step_at(conversation_id, Instant::now())
    }

    #[must_use]
    pub fn step_at(&self, conversation_id: &str, now: Instant) -> LoginStep {
        self.get_at(conversation_id, now)
            .map_or(LoginStep::Welcome, |p| p.step)
    }

    #[must_use]
    pub fn get(&self, conversation_id: &str) -> Option<LoginProcess> {
        self.get_at(conversation_id, Instant::now())
    }

    #[must_use]
    pub fn get_at(&self, conversation_id: &str, now: Instant) -> Option<LoginProcess> {
        let process = self.processes.get(conversation_id).map(|p| p.clone())?;
        if now.saturating_duration_since(process.started_at) >= self.ttl {
            self.processes
                .remove_if(conversation_id, |_, p| p.started_at == process.started_at);
            return None;
        }
        Some(process)
    }

    /// Open a process at the email step, replacing any previous one.
    pub fn start(&self, conversation_id: &str) -> LoginProcess {
        self.start_at(conversation_id, Instant::now())
    }

    pub fn start_at(&self, conversation_id: &str, now: Instant) -> LoginProcess {
        let process = LoginProcess::new(conversation_id, now);
        self.processes
            .insert(conversation_id.to_string(), process.clone());
        process
    }

    /// Record the validated email and move to the password step.
    pub fn accept_email(&self, conversation_id: &str, email: String) -> bool {
        match self.processes.get_mut(conversation_id) {
            Some(mut process) => {
                process.pending_email = Some(email);
                process.step = LoginStep::Password;
                true
            },
            None => false,
        }
    }

    pub fn finish(&self, conversation_id: &str) -> Option<LoginProcess> {
        self.processes.remove(conversation_id).map(|(_, p)| p)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_email_then_password() {
        let book = LoginBook::default();
        assert_eq!(book.step("c1"), LoginStep::Welcome);

        book.start("c1");
        assert_eq!(book.step("c1"), LoginStep::Email);

        assert!(book.accept_email("c1", "ana@example.com".into()));
        let process = book.get("c1");
        assert_eq!(process.as_ref().map(|p| p.step), Some(LoginStep::Password));
        assert_eq!(
            process.and_then(|p| p.pending_email).as_deref(),
            Some("ana@example.com")
        );

        assert!(book.finish("c1").is_some());
        assert_eq!(book.step("c1"), LoginStep::Welcome);
        assert!(book.is_empty());
    }

    #[test]
    fn accept_email_without_process_is_rejected() {
        let book = LoginBook::default();
        assert!(!book.accept_email("c1", "ana@example.com".into()));
    }

    #[test]
    fn abandoned_process_expires_on_lookup() {
        let book = LoginBook::new(Duration::from_secs(60));
        let start = Instant::now();
        book.start_at("c1", start);
        book.start_at("c2", start);
        assert!(book.accept_email("c1", "ana@example.com".into()));

        let later = start + Duration::from_secs(30);
        assert_eq!(book.step_at("c1", later), LoginStep::Password);

        let expired = start + Duration::from_secs(60);
        assert_eq!(book.step_at("c1", expired), LoginStep::Welcome);
        assert!(book.get_at("c1", expired).is_none());
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn restart_refreshes_the_clock() {
        let book = LoginBook::new(Duration::from_secs(60));
        let start = Instant::now();
        book.start_at("c1", start);
        let restart = start + Duration::from_secs(50);
        book.start_at("c1", restart);
        assert_eq!(
            book.step_at("c1", start + Duration::from_secs(90)),
            LoginStep::Email
        );
    }
}
