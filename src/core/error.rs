use thiserror::Error;

use crate::api::ListingError;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("invalid link: {0}")]
    InvalidReference(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("marketplace unavailable: {0}")]
    Upstream(String),

    #[error("listing not found: {0}")]
    NotFound(String),

    #[error("could not find an unused proxy in the proxy list")]
    NoProxyAvailable,

    #[error("item '{0}' already exists")]
    DuplicateItem(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ListingError> for WatchError {
    fn from(err: ListingError) -> Self {
        match err {
            ListingError::InvalidReference(msg) => WatchError::InvalidReference(msg),
            ListingError::Upstream(msg) => WatchError::Upstream(msg),
            ListingError::NotFound(msg) => WatchError::NotFound(msg),
        }
    }
}

pub type WatchResult<T> = std::result::Result<T, WatchError>;
