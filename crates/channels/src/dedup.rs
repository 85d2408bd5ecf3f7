//! At-most-once admission of channel messages.
//!
//! Transports re-deliver a message when the first delivery is not acked fast
//! enough. The gate keeps an in-flight marker per message id; a second
//! delivery inside the window is rejected. Markers expire lazily by
//! timestamp and are swept every few hundred admissions.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use {
    dashmap::{DashMap, mapref::entry::Entry},
    tracing::debug,
};

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(5);
pub const DEFAULT_SWEEP_EVERY: u64 = 256;

#[derive(Clone)]
pub struct DedupGate {
    window: Duration,
    sweep_every: u64,
    in_flight: Arc<DashMap<String, Instant>>,
    admissions: Arc<AtomicU64>,
}

impl DedupGate {
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW, DEFAULT_SWEEP_EVERY)
    }

    #[must_use]
    pub fn with_window(window: Duration, sweep_every: u64) -> Self {
        Self {
            window,
            sweep_every: sweep_every.max(1),
            in_flight: Arc::new(DashMap::new()),
            admissions: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns `true` if the message should be processed.
    pub fn admit(&self, message_id: &str) -> bool {
        self.admit_at(message_id, Instant::now())
    }

    pub fn admit_at(&self, message_id: &str, now: Instant) -> bool {
        let admitted = match self.in_flight.entry(message_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                if now.saturating_duration_since(*occupied.get()) >= self.window {
                    occupied.insert(now);
                    true
                } else {
                    false
                }
            },
            Entry::Vacant(vacant) => {
                vacant.insert(now);
                true
            },
        };

        if admitted {
            self.sweep_if_needed(now);
        } else {
            debug!(message_id, "duplicate delivery rejected");
        }
        admitted
    }

    /// Drop the marker before the window elapses.
    pub fn release(&self, message_id: &str) {
        self.in_flight.remove(message_id);
    }

    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn sweep_if_needed(&self, now: Instant) {
        let seen = self.admissions.fetch_add(1, Ordering::Relaxed) + 1;
        if !seen.is_multiple_of(self.sweep_every) {
            return;
        }
        let window = self.window;
        self.in_flight
            .retain(|_, inserted| now.saturating_duration_since(*inserted) < window);
    }
}

impl Default for DedupGate {
    fn default() -> Self {
        Self::new()
    }
}
