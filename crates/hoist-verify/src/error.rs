use std::io;

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid digest {0:?}: expected sha256:<64 hex chars>")]
    InvalidDigest(String),
}

pub type Result<T> = std::result::Result<T, VerificationError>;
