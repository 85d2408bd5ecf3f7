use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("conversation lock for {conversation_id} was closed")]
    LockClosed { conversation_id: String },
}

pub type Result<T> = std::result::Result<T, Error>;
