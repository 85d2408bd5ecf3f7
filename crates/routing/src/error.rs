use {tally_service_traits::ServiceError, thiserror::Error};

/// Failures inside a handler. The dispatcher turns every one of them into an
/// apology reply.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("handler failed: {0}")]
    Handler(String),
}

impl Error {
    #[must_use]
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
