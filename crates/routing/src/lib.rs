//! Dispatch of classified messages to handlers.
//!
//! [`Dispatcher::dispatch`] turns one [`DispatchRequest`] into reply text.
//! Correction phrasing and open sales take precedence over the record type;
//! records below the confidence threshold only ever get a clarification
//! prompt. Handler errors and panics become an apology reply.

pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod money;
pub mod pending;
pub mod period;
pub mod replies;

pub use {
    dispatcher::{DEFAULT_CONFIDENCE_THRESHOLD, DispatchRequest, Dispatcher, Route},
    error::{Error, Result},
    money::format_brl,
    pending::{PendingSale, PendingSales},
};
