use {tally_service_traits::ServiceError, thiserror::Error};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl tally_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<Error> for ServiceError {
    fn from(error: Error) -> Self {
        match error {
            Error::Database(e) => ServiceError::Unavailable(format!("ledger database ({e})")),
            Error::Message(message) => ServiceError::message(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

tally_common::impl_context!();
