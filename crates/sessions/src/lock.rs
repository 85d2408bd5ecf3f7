//! Per-conversation serialization.
//!
//! Each conversation id maps to a `Semaphore(1)`. Tokio semaphores are fair,
//! so waiters proceed in the order they arrived.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use {
    dashmap::DashMap,
    tokio::sync::{OwnedSemaphorePermit, Semaphore},
    tracing::trace,
};

use crate::error::{Error, Result};

const PRUNE_EVERY_ACQUISITIONS: u64 = 1024;

pub struct ConversationLocks {
    locks: DashMap<String, Arc<Semaphore>>,
    acquisitions: AtomicU64,
}

impl ConversationLocks {
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
            acquisitions: AtomicU64::new(0),
        }
    }

    /// Wait for exclusive access to a conversation. The permit releases the
    /// lock on drop.
    pub async fn acquire(&self, conversation_id: &str) -> Result<OwnedSemaphorePermit> {
        let seen = self.acquisitions.fetch_add(1, Ordering::Relaxed) + 1;
        if seen.is_multiple_of(PRUNE_EVERY_ACQUISITIONS) {
            self.prune_idle();
        }

        let sem = self
            .locks
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone();

        trace!(conversation_id, "waiting for conversation lock");
        sem.acquire_owned()
            .await
            .map_err(|_| Error::LockClosed {
                conversation_id: conversation_id.to_string(),
            })
    }

    /// Number of tracked conversations.
    #[must_use]
    pub fn conversation_count(&self) -> usize {
        self.locks.len()
    }

    /// Drop locks nobody holds or waits on.
    pub fn prune_idle(&self) {
        self.locks
            .retain(|_, sem| sem.available_permits() == 0 || Arc::strong_count(sem) > 1);
    }
}

impl Default for ConversationLocks {
    fn default() -> Self {
        Self::new()
    }
}
