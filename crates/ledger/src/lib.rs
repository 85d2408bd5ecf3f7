//! Reference implementations of the ledger and identity seams.
//!
//! The router only sees [`Ledger`] and [`IdentityStore`]; the stores here
//! back the development CLI and the integration tests.

pub mod error;
pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use {
    tally_config::{LedgerBackend, LedgerConfig},
    tally_service_traits::{IdentityStore, Ledger},
    tracing::info,
};

pub use {
    error::{Error, Result},
    memory::MemoryLedger,
    sqlite::SqliteLedger,
};

/// Both seams served by one backing store.
#[derive(Clone)]
pub struct Stores {
    pub ledger: Arc<dyn Ledger>,
    pub identity: Arc<dyn IdentityStore>,
}

impl Stores {
    fn from_shared<T: Ledger + IdentityStore + 'static>(store: T) -> Self {
        let store = Arc::new(store);
        Self {
            ledger: store.clone(),
            identity: store,
        }
    }
}

/// Open the backend selected in the config.
pub async fn open(config: &LedgerConfig) -> Result<Stores> {
    match config.backend {
        LedgerBackend::Memory => {
            info!("using in-memory ledger");
            Ok(Stores::from_shared(MemoryLedger::new()))
        },
        LedgerBackend::Sqlite => {
            info!(url = %config.database_url, "using sqlite ledger");
            Ok(Stores::from_shared(
                SqliteLedger::connect(&config.database_url).await?,
            ))
        },
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Display name derived from the email's local part ("ana@x.com" -> "Ana").
pub(crate) fn display_name_for(email: &str) -> String {
    let local = email.split('@').next().unwrap_or(email);
    let mut chars = local.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => email.to_string(),
    }
}

pub(crate) fn new_user_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
