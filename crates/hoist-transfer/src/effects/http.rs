use std::future::Future;
use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use hoist_verify::ArtifactDigest;

use crate::data::NegotiationResponse;
use crate::error::Result;

/// A boxed stream type for upload bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + Sync + 'a>>;

/// Artifact bytes as they are read from disk.
pub type UploadBody = BoxStream<'static, io::Result<Bytes>>;

/// Header asking the authority to answer with a local path when it can.
pub const REDIRECT_HEADER: &str = "X-Redirect-Create";

/// Header carrying the local destination in a redirect answer.
pub const LOCAL_LOCATION_HEADER: &str = "LocalLocation";

/// Signs outgoing requests. Key management lives elsewhere; this is only the
/// capability to produce an `Authorization` value.
pub trait RequestSigner: Send + Sync {
    fn authorization(&self, method: &str, path: &str) -> Option<String>;
}

/// Signer for servers that need no authorization.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl RequestSigner for NoAuth {
    fn authorization(&self, _method: &str, _path: &str) -> Option<String> { None }
}

/// Path of the blob endpoint for a digest.
pub fn blob_path(digest: &ArtifactDigest) -> String { format!("/api/blobs/{digest}") }

/// The two remote calls a blob transfer needs.
///
/// # Implementations
///
/// - [`ReqwestTransport`]: production implementation using `reqwest`
/// - test doubles that script answers and count calls
pub trait HttpTransport: Send + Sync {
    /// Ask whether the artifact of `size` bytes exists or can be placed
    /// locally. Must not follow redirects: a redirect is an answer, not a hop.
    fn negotiate(
        &self,
        digest: &ArtifactDigest,
        size: u64,
    ) -> impl Future<Output = Result<NegotiationResponse>> + Send;

    /// Stream the artifact bytes to the authority.
    fn upload(
        &self,
        digest: &ArtifactDigest,
        size: u64,
        body: UploadBody,
    ) -> impl Future<Output = Result<()>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::sync::Arc;

    use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
    use reqwest::redirect::Policy;
    use reqwest::{Body, Client, Method, RequestBuilder};
    use tracing::debug;
    use url::Url;

    use super::*;
    use crate::error::TransferError;

    /// Production transport using reqwest.
    pub struct ReqwestTransport {
        client: Client,
        base:   Url,
        signer: Arc<dyn RequestSigner>,
    }

    impl ReqwestTransport {
        /// `client` must be built with `redirect(Policy::none())`.
        pub fn new(client: Client, base: Url, signer: Arc<dyn RequestSigner>) -> Self {
            Self {
                client,
                base,
                signer,
            }
        }

        /// Transport with a default client that does not follow redirects.
        pub fn from_base(base: Url) -> Result<Self> {
            let client = Client::builder().redirect(Policy::none()).build()?;
            Ok(Self::new(client, base, Arc::new(NoAuth)))
        }

        fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
            let url = self
                .base
                .join(path)
                .map_err(|e| TransferError::Protocol(format!("invalid blob url {path}: {e}")))?;
            let mut request = self.client.request(method.clone(), url);
            if let Some(authz) = self.signer.authorization(method.as_str(), path) {
                request = request.header(AUTHORIZATION, authz);
            }
            Ok(request)
        }
    }

    impl HttpTransport for ReqwestTransport {
        async fn negotiate(&self, digest: &ArtifactDigest, size: u64) -> Result<NegotiationResponse> {
            let path = blob_path(digest);
            let response = self
                .request(Method::POST, &path)?
                .header(REDIRECT_HEADER, "1")
                .json(digest.as_str())
                .send()
                .await?;

            let status = response.status().as_u16();
            let local_location = response
                .headers()
                .get(LOCAL_LOCATION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            debug!(%digest, size, status, ?local_location, "negotiated blob transfer");

            let mut answer = NegotiationResponse::new(status);
            answer.local_location = local_location;
            if !(200..400).contains(&status) {
                answer.message = response.text().await.ok();
            }
            Ok(answer)
        }

        async fn upload(&self, digest: &ArtifactDigest, size: u64, body: UploadBody) -> Result<()> {
            let path = blob_path(digest);
            let response = self
                .request(Method::POST, &path)?
                .header(CONTENT_LENGTH, size)
                .body(Body::wrap_stream(body))
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                return Ok(());
            }
            let message = response.text().await.unwrap_or_default();
            Err(TransferError::Network(format!(
                "upload of {digest} rejected with {status}: {}",
                message.trim()
            )))
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestTransport;
