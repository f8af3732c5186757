//! Error taxonomy for network-facing operations.

use parker_core::SessionError;

/// The request never produced an HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not reach server: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("server returned status {status}")]
    Server { status: u16 },
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0} must not be empty")]
    MissingField(&'static str),
    #[error(transparent)]
    Network(#[from] NetworkError),
}

/// Failure of a user-initiated report or status update.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Precondition(#[from] SessionError),
    #[error(transparent)]
    Network(#[from] NetworkError),
}
