//! Conversation state that lives only in memory: the bounded turn history
//! used for follow-up resolution, and the per-conversation locks that keep
//! replies in admission order.

pub mod context;
pub mod error;
pub mod lock;

pub use {
    context::{ContextTracker, Sender, Turn},
    error::{Error, Result},
    lock::ConversationLocks,
};
