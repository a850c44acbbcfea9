use crate::storage::StoreError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Session expired. Please log in again.")]
    SessionExpired,
    #[error("No refresh token available")]
    NoRefreshToken,
    #[error("Timed out waiting for token refresh")]
    RefreshTimeout,
    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },
    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl GatewayError {
    /// True for failures after which the caller has to log in again.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self, Self::SessionExpired | Self::NoRefreshToken)
    }

    /// HTTP status of a domain error, if this is one.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            tracing::debug!(error = %e, "Request timed out");
        }
        Self::Network(e.to_string())
    }
}
