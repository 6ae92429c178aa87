use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hoist_verify::{ArtifactDigest, digest_file};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::decide;
use crate::data::{Placement, TransferDecision, TransferOptions, TransferReport, UploadProgress};
use crate::effects::chain::CopyChain;
use crate::effects::http::HttpTransport;
use crate::effects::upload::{ByteCounter, Sampler, counted_body};
use crate::error::{Result, TransferError};

/// Moves one local artifact to the remote authority.
///
/// The artifact is digested once, the authority is asked what it wants, and
/// then exactly one of: nothing, a local placement (falling back to upload if
/// every local strategy fails), or an upload.
pub struct BlobTransfer<T: HttpTransport> {
    transport: T,
    chain:     Arc<CopyChain>,
    options:   TransferOptions,
}

impl<T: HttpTransport> BlobTransfer<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            chain: Arc::new(CopyChain::default()),
            options: TransferOptions::default(),
        }
    }

    pub fn with_chain(mut self, chain: CopyChain) -> Self {
        self.chain = Arc::new(chain);
        self
    }

    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    pub fn transport(&self) -> &T { &self.transport }

    /// Transfer the file at `path`. Returns [`TransferError::Cancelled`] if
    /// `cancel` fires first; whatever was written or sent by then stays.
    pub async fn transfer(&self, path: &Path, cancel: &CancellationToken) -> Result<TransferReport> {
        let owned = path.to_path_buf();
        let (file, digest, size) = cancellable(cancel, async move {
            tokio::task::spawn_blocking(move || digest_file(&owned))
                .await
                .map_err(|e| TransferError::Io(std::io::Error::other(e)))?
                .map_err(TransferError::from)
        })
        .await?;
        debug!(path = %path.display(), %digest, size, "digested artifact");

        let answer = cancellable(cancel, self.transport.negotiate(&digest, size)).await?;
        let decision = decide(&answer)?;
        info!(%digest, ?decision, "transfer decision");

        let placement = match decision {
            TransferDecision::AlreadyPresent => Placement::AlreadyPresent,
            TransferDecision::LocalDestination(dest) => {
                match cancellable(cancel, self.place_locally(path, dest.clone())).await {
                    Ok(strategy) => Placement::Local {
                        strategy,
                        path: dest,
                    },
                    Err(TransferError::Cancelled) => return Err(TransferError::Cancelled),
                    Err(e) => {
                        debug!(%digest, error = %e, "local placement failed, uploading instead");
                        self.upload(&digest, size, file, cancel).await?;
                        Placement::Network
                    }
                }
            }
            TransferDecision::NetworkRequired => {
                self.upload(&digest, size, file, cancel).await?;
                Placement::Network
            }
        };

        if !matches!(placement, Placement::Network) {
            self.options.report(UploadProgress { sent: size, total: size });
        }

        Ok(TransferReport {
            digest,
            size,
            placement,
        })
    }

    async fn place_locally(&self, src: &Path, dest: PathBuf) -> Result<&'static str> {
        let chain = Arc::clone(&self.chain);
        let src = src.to_path_buf();
        tokio::task::spawn_blocking(move || chain.place(&src, &dest))
            .await
            .map_err(|e| TransferError::Io(std::io::Error::other(e)))?
    }

    async fn upload(
        &self,
        digest: &ArtifactDigest,
        size: u64,
        file: std::fs::File,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let counter = ByteCounter::new();
        let body = counted_body(tokio::fs::File::from_std(file), counter.clone());
        let sampler = Sampler::spawn(counter.clone(), size, self.options.clone());

        let result = cancellable(cancel, self.transport.upload(digest, size, body)).await;
        sampler
            .finish(UploadProgress {
                sent:  counter.get(),
                total: size,
            })
            .await;

        if result.is_ok() {
            info!(%digest, bytes = counter.get(), "uploaded artifact");
        }
        result
    }
}

/// Race `fut` against `cancel`; cancellation wins ties.
pub async fn cancellable<F, O>(cancel: &CancellationToken, fut: F) -> Result<O>
where
    F: Future<Output = Result<O>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransferError::Cancelled),
        out = fut => out,
    }
}
