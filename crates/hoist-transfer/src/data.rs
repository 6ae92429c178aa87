//! Immutable data types for artifact transfers.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hoist_verify::ArtifactDigest;

/// How the remote authority wants an artifact delivered.
///
/// Produced by a single negotiation round trip and consumed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferDecision {
    /// The authority already holds an artifact with this digest.
    AlreadyPresent,
    /// The authority shares a filesystem with us and will accept the file at
    /// this (validated, absolute) path.
    LocalDestination(PathBuf),
    /// Bytes have to travel over the connection.
    NetworkRequired,
}

/// Raw answer to a negotiation request, before it is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationResponse {
    pub status:         u16,
    pub local_location: Option<String>,
    pub message:        Option<String>,
}

impl NegotiationResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            local_location: None,
            message: None,
        }
    }

    pub fn with_local_location(mut self, location: impl Into<String>) -> Self {
        self.local_location = Some(location.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Snapshot of an upload's byte counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub sent:  u64,
    pub total: u64,
}

impl UploadProgress {
    /// Whole percent, clamped to 100. An empty artifact counts as complete.
    #[must_use]
    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            return 100;
        }
        (self.sent.saturating_mul(100) / self.total).min(100)
    }
}

/// Where an artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    AlreadyPresent,
    Local { strategy: &'static str, path: PathBuf },
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub digest:    ArtifactDigest,
    pub size:      u64,
    pub placement: Placement,
}

pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(60);

/// Configuration for a blob transfer.
#[derive(Clone)]
pub struct TransferOptions {
    /// How often the upload byte counter is sampled for display.
    ///
    /// Default: 60ms
    pub sample_interval: Duration,

    /// Invoked from the sampling task with the latest counter value, and once
    /// more when the transfer finishes.
    ///
    /// Default: None
    pub on_progress: Option<Arc<dyn Fn(&UploadProgress) + Send + Sync>>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            on_progress:     None,
        }
    }
}

impl fmt::Debug for TransferOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferOptions")
            .field("sample_interval", &self.sample_interval)
            .field("on_progress", &self.on_progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

impl TransferOptions {
    pub fn sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&UploadProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub(crate) fn report(&self, progress: UploadProgress) {
        if let Some(ref callback) = self.on_progress {
            callback(&progress);
        }
    }
}
