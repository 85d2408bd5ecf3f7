//! Sales awaiting quantity/amount confirmation, keyed by user.
//!
//! Entries expire lazily: an expired sale is dropped the next time it is
//! looked up.

use std::time::{Duration, Instant};

use dashmap::DashMap;

pub const DEFAULT_PENDING_SALE_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq)]
pub struct PendingSale {
    pub description: String,
    pub amount: Option<f64>,
    pub opened_at: Instant,
}

pub struct PendingSales {
    ttl: Duration,
    sales: DashMap<String, PendingSale>,
}

impl Default for PendingSales {
    fn default() -> Self {
        Self::new(DEFAULT_PENDING_SALE_TTL)
    }
}

impl PendingSales {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sales: DashMap::new(),
        }
    }

    pub fn open(&self, user_id: &str, description: impl Into<String>, amount: Option<f64>) {
        self.open_at(user_id, description, amount, Instant::now());
    }

    pub fn open_at(
        &self,
        user_id: &str,
        description: impl Into<String>,
        amount: Option<f64>,
        now: Instant,
    ) {
        self.sales.insert(user_id.to_string(), PendingSale {
            description: description.into(),
            amount,
            opened_at: now,
        });
    }

    /// Outstanding sale for the user, if any.
    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<PendingSale> {
        self.get_at(user_id, Instant::now())
    }

    #[must_use]
    pub fn get_at(&self, user_id: &str, now: Instant) -> Option<PendingSale> {
        let sale = self.sales.get(user_id).map(|s| s.clone())?;
        if now.saturating_duration_since(sale.opened_at) >= self.ttl {
            self.sales
                .remove_if(user_id, |_, s| s.opened_at == sale.opened_at);
            return None;
        }
        Some(sale)
    }

    pub fn close(&self, user_id: &str) -> Option<PendingSale> {
        self.sales.remove(user_id).map(|(_, sale)| sale)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sales.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sales.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_get_close() {
        let sales = PendingSales::default();
        sales.open("u1", "bolo", Some(45.0));
        assert_eq!(sales.get("u1").map(|s| s.amount), Some(Some(45.0)));
        assert!(sales.get("u2").is_none());
        assert!(sales.close("u1").is_some());
        assert!(sales.is_empty());
    }

    #[test]
    fn expires_after_ttl() {
        let sales = PendingSales::new(Duration::from_secs(600));
        let t0 = Instant::now();
        sales.open_at("u1", "bolo", None, t0);
        assert!(sales.get_at("u1", t0 + Duration::from_secs(599)).is_some());
        assert!(sales.get_at("u1", t0 + Duration::from_secs(600)).is_none());
        assert_eq!(sales.len(), 0);
    }
}
