//! Error types for hoist-transfer.

use std::io;

use hoist_verify::VerificationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("negotiation failed: {0}")]
    Negotiation(String),

    /// Every local strategy failed. Only used to decide on fallback; never
    /// returned from a full transfer.
    #[error("local copy failed: {0}")]
    Copy(#[source] hoist_fs::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("transfer cancelled")]
    Cancelled,

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransferError {
    pub fn is_cancelled(&self) -> bool { matches!(self, Self::Cancelled) }
}

impl From<VerificationError> for TransferError {
    fn from(e: VerificationError) -> Self {
        match e {
            VerificationError::Io(e) => Self::Io(e),
            VerificationError::InvalidDigest(raw) => Self::Protocol(format!("invalid digest {raw:?}")),
        }
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for TransferError {
    fn from(e: reqwest::Error) -> Self { Self::Network(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, TransferError>;
