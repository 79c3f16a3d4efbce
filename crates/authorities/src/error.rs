//! Authority client error types.

use thiserror::Error;

/// Errors talking to an external authority. All of these abort the current
/// reconciliation run; retry is the readiness gate's responsibility.
#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("authority unavailable: {0}")]
    Unavailable(String),

    #[error("authorization rejected: {0}")]
    Unauthorized(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type for authority calls.
pub type AuthorityResult<T> = std::result::Result<T, AuthorityError>;

impl From<reqwest::Error> for AuthorityError {
    fn from(err: reqwest::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}
