//! I/O operations for artifact transfers: the remote transport, the local
//! copy chain, the counted upload body and the transfer driver that ties
//! them together.

mod blob;
mod chain;
mod http;
mod upload;

pub use blob::{BlobTransfer, cancellable};
pub use chain::CopyChain;
pub use http::{
    BoxStream, HttpTransport, LOCAL_LOCATION_HEADER, NoAuth, REDIRECT_HEADER, RequestSigner, UploadBody,
    blob_path,
};
pub use upload::{ByteCounter, Sampler, counted_body};

#[cfg(feature = "reqwest")]
pub use http::ReqwestTransport;
