//! Backend client errors.

use thiserror::Error;

/// Result type for backend calls.
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connect, timeout, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend answered successfully but reported an error in the body.
    #[error("backend error: {0}")]
    Api(String),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response is missing field '{0}'")]
    MissingField(&'static str),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Used by test doubles.
    #[error("simulated failure: {0}")]
    Simulated(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}
