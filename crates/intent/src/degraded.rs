//! Cooldown after a remote failure: while degraded the classifier goes
//! straight to the offline analyzer instead of waiting on another timeout.

use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

#[derive(Debug)]
pub struct DegradedState {
    cooldown: Duration,
    since: Mutex<Option<Instant>>,
}

impl DegradedState {
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            since: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.is_degraded_at(Instant::now())
    }

    #[must_use]
    pub fn is_degraded_at(&self, now: Instant) -> bool {
        let mut since = self.since.lock().unwrap_or_else(|e| e.into_inner());
        match *since {
            Some(at) if now.saturating_duration_since(at) < self.cooldown => true,
            Some(_) => {
                *since = None;
                false
            },
            None => false,
        }
    }

    pub fn mark(&self) {
        self.mark_at(Instant::now());
    }

    pub fn mark_at(&self, now: Instant) {
        *self.since.lock().unwrap_or_else(|e| e.into_inner()) = Some(now);
    }

    pub fn clear(&self) {
        *self.since.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_expires() {
        let state = DegradedState::new(Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(!state.is_degraded_at(t0));

        state.mark_at(t0);
        assert!(state.is_degraded_at(t0 + Duration::from_secs(59)));
        assert!(!state.is_degraded_at(t0 + Duration::from_secs(60)));
        assert!(!state.is_degraded_at(t0 + Duration::from_secs(1)));
    }

    #[test]
    fn clear_resets() {
        let state = DegradedState::new(Duration::from_secs(60));
        state.mark();
        assert!(state.is_degraded());
        state.clear();
        assert!(!state.is_degraded());
    }
}
