/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed channel errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input payload or parameter is invalid.
    #[error("invalid channel input: {message}")]
    InvalidInput { message: String },

    /// The same message id is already being processed.
    #[error("duplicate delivery of message {message_id}")]
    DuplicateMessage { message_id: String },
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn duplicate(message_id: impl Into<String>) -> Self {
        Self::DuplicateMessage {
            message_id: message_id.into(),
        }
    }
}
