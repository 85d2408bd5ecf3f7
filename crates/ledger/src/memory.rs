use std::{collections::HashMap, sync::Mutex};

use {
    async_trait::async_trait,
    chrono::NaiveDate,
    tally_service_traits::{
        IdentityStore, Ledger, LedgerEntry, LedgerTotals, NewEntry, ServiceError, ServiceResult,
        User,
    },
};

use crate::{display_name_for, new_user_id, normalize_email};

#[derive(Default)]
struct State {
    entries: Vec<LedgerEntry>,
    next_id: i64,
    /// Keyed by normalized email.
    users: HashMap<String, User>,
    /// Address -> user id.
    bindings: HashMap<String, String>,
}

/// Process-local ledger and identity store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<State>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn record(&self, entry: NewEntry) -> ServiceResult<LedgerEntry> {
        Ok(self.with_state(|state| {
            state.next_id += 1;
            let stored = LedgerEntry {
                id: state.next_id,
                user_id: entry.user_id,
                kind: entry.kind,
                amount: entry.amount,
                category: entry.category,
                description: entry.description,
                date: entry.date,
                created_at: tally_common::now_ms(),
            };
            state.entries.push(stored.clone());
            stored
        }))
    }

    async fn recent_entries(&self, user_id: &str, limit: usize) -> ServiceResult<Vec<LedgerEntry>> {
        Ok(self.with_state(|state| {
            state
                .entries
                .iter()
                .rev()
                .filter(|e| e.user_id == user_id)
                .take(limit)
                .cloned()
                .collect()
        }))
    }

    async fn last_entry(&self, user_id: &str) -> ServiceResult<Option<LedgerEntry>> {
        Ok(self.with_state(|state| {
            state
                .entries
                .iter()
                .rev()
                .find(|e| e.user_id == user_id)
                .cloned()
        }))
    }

    async fn delete_entry(&self, user_id: &str, entry_id: i64) -> ServiceResult<bool> {
        Ok(self.with_state(|state| {
            let before = state.entries.len();
            state
                .entries
                .retain(|e| !(e.id == entry_id && e.user_id == user_id));
            state.entries.len() != before
        }))
    }

    async fn update_amount(
        &self,
        user_id: &str,
        entry_id: i64,
        amount: f64,
    ) -> ServiceResult<Option<LedgerEntry>> {
        Ok(self.with_state(|state| {
            state
                .entries
                .iter_mut()
                .find(|e| e.id == entry_id && e.user_id == user_id)
                .map(|e| {
                    e.amount = amount;
                    e.clone()
                })
        }))
    }

    async fn totals(&self, user_id: &str, since: Option<NaiveDate>) -> ServiceResult<LedgerTotals> {
        Ok(self.with_state(|state| {
            let mut totals = LedgerTotals::default();
            for entry in state
                .entries
                .iter()
                .filter(|e| e.user_id == user_id && since.is_none_or(|s| e.date >= s))
            {
                totals.add(entry.kind, entry.amount);
            }
            totals
        }))
    }
}

#[async_trait]
impl IdentityStore for MemoryLedger {
    async fn find_by_address(&self, address: &str) -> ServiceResult<Option<User>> {
        Ok(self.with_state(|state| {
            let user_id = state.bindings.get(address)?;
            state.users.values().find(|u| &u.id == user_id).cloned()
        }))
    }

    async fn get_or_create_user(&self, email: &str) -> ServiceResult<User> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(ServiceError::message("email is required"));
        }
        Ok(self.with_state(|state| {
            state
                .users
                .entry(email.clone())
                .or_insert_with(|| User {
                    id: new_user_id(),
                    display_name: display_name_for(&email),
                    email: email.clone(),
                    created_at: tally_common::now_ms(),
                })
                .clone()
        }))
    }

    async fn bind_address(&self, address: &str, user_id: &str) -> ServiceResult {
        self.with_state(|state| match state.bindings.get(address) {
            Some(bound) if bound != user_id => Err(ServiceError::Conflict {
                address: address.to_string(),
                bound_to: bound.clone(),
            }),
            _ => {
                state
                    .bindings
                    .insert(address.to_string(), user_id.to_string());
                Ok(())
            },
        })
    }

    async fn rebind_address(&self, address: &str, user_id: &str) -> ServiceResult {
        self.with_state(|state| {
            state
                .bindings
                .insert(address.to_string(), user_id.to_string());
        });
        Ok(())
    }
}
