//! Inbound message pipeline, the glue between channels and handlers.
//!
//! Flow: channel message → dedup gate → conversation lock → media
//! normalization → authentication → classification → dispatch → reply via
//! the channel outbound.

pub mod commands;
pub mod router;

pub use {commands::Command, router::Router};
