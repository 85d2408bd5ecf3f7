use {tally_nlu::classify_error, thiserror::Error};

#[derive(Debug, Error)]
pub enum Error {
    #[error("remote classification timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("remote classification failed: {0}")]
    Service(#[from] anyhow::Error),

    #[error("malformed classifier output: {0}")]
    MalformedOutput(String),

    #[error("remote classification is cooling down")]
    Degraded,
}

impl Error {
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedOutput(reason.into())
    }

    /// Whether this failure should put the remote path into its cool-down.
    /// Other provider errors fall back for one message only; the provider
    /// chain's per-key breakers deal with repeats.
    #[must_use]
    pub fn degrades_remote(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::MalformedOutput(_) => true,
            Self::Service(e) => classify_error(e).is_quota_like(),
            Self::Degraded => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
