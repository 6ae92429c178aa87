use std::path::Path;

use hoist_fs::{CopyStrategy, default_strategies};
use tracing::debug;

use crate::error::{Result, TransferError};

/// Ordered local placement strategies. The first success wins; earlier
/// failures are logged and discarded.
pub struct CopyChain {
    strategies: Vec<Box<dyn CopyStrategy>>,
}

impl Default for CopyChain {
    fn default() -> Self { Self::new(default_strategies()) }
}

impl CopyChain {
    pub fn new(strategies: Vec<Box<dyn CopyStrategy>>) -> Self { Self { strategies } }

    pub fn is_empty(&self) -> bool { self.strategies.is_empty() }

    /// Place `src` at `dest`, returning the name of the strategy that did it.
    /// When every strategy fails the last error is returned as
    /// [`TransferError::Copy`].
    pub fn place(&self, src: &Path, dest: &Path) -> Result<&'static str> {
        let mut last = None;
        for strategy in &self.strategies {
            match strategy.copy(src, dest) {
                Ok(bytes) => {
                    debug!(strategy = strategy.name(), bytes, dest = %dest.display(), "placed artifact locally");
                    return Ok(strategy.name());
                }
                Err(e) => {
                    debug!(strategy = strategy.name(), error = %e, "local copy strategy failed");
                    last = Some(e);
                }
            }
        }

        match last {
            Some(e) => {
                debug!(dest = %dest.display(), error = %e, "all local copy strategies failed");
                Err(TransferError::Copy(e))
            }
            None => Err(TransferError::Copy(hoist_fs::Error::Write {
                path:   dest.to_path_buf(),
                source: std::io::Error::other("no local copy strategies configured"),
            })),
        }
    }
}
