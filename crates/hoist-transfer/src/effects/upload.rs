use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::StreamExt;
use tokio::fs::File;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;

use crate::data::{TransferOptions, UploadProgress};
use crate::effects::http::UploadBody;

const READ_CHUNK: usize = 64 * 1024;

/// Bytes handed to the transport so far. Written by the upload body, read by
/// the sampler; a slightly stale value is fine.
#[derive(Debug, Clone, Default)]
pub struct ByteCounter(Arc<AtomicU64>);

impl ByteCounter {
    pub fn new() -> Self { Self::default() }

    pub fn add(&self, n: u64) { self.0.fetch_add(n, Ordering::Relaxed); }

    pub fn get(&self) -> u64 { self.0.load(Ordering::Relaxed) }
}

/// Wrap a file so every chunk read from it bumps `counter`.
pub fn counted_body(file: File, counter: ByteCounter) -> UploadBody {
    let stream = ReaderStream::with_capacity(file, READ_CHUNK).inspect(move |chunk| {
        if let Ok(bytes) = chunk {
            counter.add(bytes.len() as u64);
        }
    });
    Box::pin(stream)
}

/// Periodic reader of a [`ByteCounter`].
///
/// Samples every `options.sample_interval` until [`Sampler::finish`], which
/// reports one last value so the display ends on the final count.
pub struct Sampler {
    done:   Option<oneshot::Sender<UploadProgress>>,
    handle: JoinHandle<()>,
}

impl Sampler {
    pub fn spawn(counter: ByteCounter, total: u64, options: TransferOptions) -> Self {
        let (done, mut done_rx) = oneshot::channel::<UploadProgress>();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(options.sample_interval);
            loop {
                tokio::select! {
                    last = &mut done_rx => {
                        if let Ok(last) = last {
                            options.report(last);
                        }
                        return;
                    }
                    _ = ticker.tick() => {
                        options.report(UploadProgress { sent: counter.get(), total });
                    }
                }
            }
        });

        Self {
            done: Some(done),
            handle,
        }
    }

    /// Stop sampling after reporting `last`.
    pub async fn finish(mut self, last: UploadProgress) {
        if let Some(done) = self.done.take() {
            let _ = done.send(last);
        }
        let _ = (&mut self.handle).await;
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        if self.done.is_some() {
            self.handle.abort();
        }
    }
}
