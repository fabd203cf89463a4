//! Remote call errors and their mapping onto cart error kinds.

use learnhub_commerce::CartError;

/// Result type for remote cart calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Error type for remote cart calls.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP error: {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// The service answered `success: false`.
    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Request error: {0}")]
    Request(String),
}

impl RemoteError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

impl From<RemoteError> for CartError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::Http { status, .. } if status == 401 || status == 403 => {
                CartError::AuthRequired
            }
            RemoteError::Http { status, .. } if status >= 500 => {
                CartError::RemoteUnavailable(e.to_string())
            }
            RemoteError::Http { .. } => CartError::Validation(e.to_string()),
            RemoteError::Rejected(message) => CartError::Validation(message),
            RemoteError::Timeout(_)
            | RemoteError::Connection(_)
            | RemoteError::Deserialization(_)
            | RemoteError::Request(_) => CartError::RemoteUnavailable(e.to_string()),
        }
    }
}
