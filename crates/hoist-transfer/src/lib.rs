//! Digest-negotiated artifact transfer.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - decisions, progress snapshots and options
//! - [`core`] - pure interpretation of the authority's answer
//! - [`effects`] - transport, local copy chain and the transfer driver
//!
//! # Flow
//!
//! 1. Digest the artifact in one full pass and rewind it.
//! 2. Ask the authority, in a single request, whether it already has the
//!    digest or can take the file straight from a local path.
//! 3. Skip, place locally (platform copy, then buffered copy), or upload.
//!    A failed local placement falls back to upload; only the upload's error
//!    ever reaches the caller.

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use self::core::decide;
pub use data::{
    DEFAULT_SAMPLE_INTERVAL, NegotiationResponse, Placement, TransferDecision, TransferOptions,
    TransferReport, UploadProgress,
};
pub use effects::{
    BlobTransfer, BoxStream, ByteCounter, CopyChain, HttpTransport, LOCAL_LOCATION_HEADER, NoAuth,
    REDIRECT_HEADER, RequestSigner, UploadBody, blob_path, cancellable,
};
pub use error::{Result, TransferError};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestTransport;

pub use tokio_util::sync::CancellationToken;
