//! Error types for hoist-core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-success status.
    #[error("{message}")]
    Status { code: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    /// Nothing is listening at the configured host.
    #[error("could not connect to {0}, is the server running?")]
    Unreachable(String),

    #[error("unexpected response: {0}")]
    Protocol(String),

    /// An `{"error": ...}` record in the middle of a stream.
    #[error("{0}")]
    Remote(String),

    /// Returned by a stream handler to stop the call early.
    #[error("request cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool { self.status_code() == Some(404) }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self { Self::Network(e.to_string()) }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self { Self::Network(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, ClientError>;
