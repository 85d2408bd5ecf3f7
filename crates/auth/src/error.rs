use tally_service_traits::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// User input failed a syntactic rule; the login step re-prompts.
    #[error("invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Identity(#[from] ServiceError),

    #[error("no pending email for conversation {conversation_id}")]
    MissingEmail { conversation_id: String },
}

impl Error {
    #[must_use]
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
