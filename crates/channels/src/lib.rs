//! Channel-facing types.
//!
//! Transports (WhatsApp, Telegram, a console) deliver [`InboundMessage`]s;
//! the [`DedupGate`] drops re-deliveries of a message that is still being
//! processed.

pub mod dedup;
pub mod error;
pub mod message;

pub use {
    dedup::DedupGate,
    error::{Error, Result},
    message::InboundMessage,
};
