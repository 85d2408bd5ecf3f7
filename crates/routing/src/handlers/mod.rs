//! One handler per routed outcome. Handlers return the reply text or an
//! error; the dispatcher owns the apology path.

pub mod correction;
pub mod entry;
pub mod fallback;
pub mod query;
pub mod sale;

use {chrono::NaiveDate, tally_service_traits::Ledger};

use crate::{dispatcher::DispatchRequest, pending::PendingSales};

/// Everything a handler needs for one message.
pub struct HandlerContext<'a> {
    pub ledger: &'a dyn Ledger,
    pub pending: &'a PendingSales,
    pub request: &'a DispatchRequest,
    pub today: NaiveDate,
}

impl HandlerContext<'_> {
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.request.user_id
    }
}
