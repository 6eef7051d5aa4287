use thiserror::Error;

/// Failures of the marketplace adapter, already classified for the monitor.
///
/// Transport and decoding errors never leave the adapter as-is; they are
/// mapped onto one of these three kinds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ListingError {
    #[error("invalid listing reference: {0}")]
    InvalidReference(String),

    /// Transient: network failure, timeout, 5xx, rate limiting or an
    /// unexpected payload. Safe to retry.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The listing was removed or sold. Retrying will not help.
    #[error("listing not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for ListingError {
    fn from(err: reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::NOT_FOUND) {
            return ListingError::NotFound(err.to_string());
        }
        if err.is_timeout() {
            return ListingError::Upstream(format!("request timed out: {}", err));
        }
        ListingError::Upstream(err.to_string())
    }
}

impl From<serde_json::Error> for ListingError {
    fn from(err: serde_json::Error) -> Self {
        ListingError::Upstream(format!("unexpected payload: {}", err))
    }
}
