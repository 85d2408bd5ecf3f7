//! Types shared by every tally crate: the intent record and its enums, media
//! payloads, and the error-context helper.

pub mod error;
pub mod types;

pub use error::FromMessage;

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
