//! Authority error types.

use thiserror::Error;

use uuidlens_core::ResolutionFailure;

/// Errors from the REST authority.
#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("Invalid authority configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Token request failed: {0}")]
    Token(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Response has no entity name")]
    MissingName,
}

impl AuthorityError {
    pub(crate) fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        Self::Status {
            status: status.as_u16(),
            body,
        }
    }
}

impl From<reqwest::Error> for AuthorityError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

impl From<AuthorityError> for ResolutionFailure {
    fn from(e: AuthorityError) -> Self {
        match e {
            AuthorityError::Status { status: 401, .. } => ResolutionFailure::Unauthenticated,
            AuthorityError::Status { status: 403, .. } => ResolutionFailure::Unauthorized,
            AuthorityError::Status { status: 404, .. } => ResolutionFailure::NotFound,
            AuthorityError::Status { status, .. } => ResolutionFailure::Http { status },
            AuthorityError::Network(msg) => ResolutionFailure::Unreachable(msg),
            AuthorityError::Token(_) => ResolutionFailure::Unauthenticated,
            AuthorityError::Decode(msg) => ResolutionFailure::Malformed(msg),
            AuthorityError::MissingName => {
                ResolutionFailure::Malformed("response has no entity name".to_string())
            }
            AuthorityError::Config(msg) => ResolutionFailure::Unreachable(msg),
        }
    }
}
