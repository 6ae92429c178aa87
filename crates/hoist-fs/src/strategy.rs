use std::path::{Path, PathBuf};

use crate::primitives::{BufferedCopyOptions, buffered_copy, platform_copy};
use crate::{Error, Result};

/// One way of placing a local file at a destination path.
///
/// Strategies are tried in order; a failing strategy is not fatal to the
/// caller, it only means the next one gets a turn.
pub trait CopyStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn copy(&self, src: &Path, dest: &Path) -> Result<u64>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PlatformCopy;

impl CopyStrategy for PlatformCopy {
    fn name(&self) -> &'static str { "platform" }

    fn copy(&self, src: &Path, dest: &Path) -> Result<u64> { platform_copy(src, dest) }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BufferedCopy(pub BufferedCopyOptions);

impl CopyStrategy for BufferedCopy {
    fn name(&self) -> &'static str { "buffered" }

    fn copy(&self, src: &Path, dest: &Path) -> Result<u64> { buffered_copy(src, dest, self.0) }
}

/// The local strategies in the order they should be attempted.
pub fn default_strategies() -> Vec<Box<dyn CopyStrategy>> {
    vec![Box::new(PlatformCopy), Box::new(BufferedCopy::default())]
}

/// Destination paths arrive from a remote authority; only absolute paths are
/// accepted before anything is written.
pub fn validate_destination(raw: &str) -> Result<PathBuf> {
    let path = PathBuf::from(raw);
    if raw.is_empty() || !path.is_absolute() {
        return Err(Error::RelativeDestination(path));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_order() {
        let names: Vec<_> = default_strategies().iter().map(|s| s.name()).collect();
        assert_eq!(names, ["platform", "buffered"]);
    }

    #[cfg(unix)]
    #[test]
    fn absolute_destination_accepted() {
        let path = validate_destination("/var/lib/hoist/blobs/sha256-abc").unwrap();
        assert_eq!(path, Path::new("/var/lib/hoist/blobs/sha256-abc"));
    }

    #[test]
    fn relative_destination_rejected() {
        assert!(matches!(
            validate_destination("blobs/sha256-abc"),
            Err(Error::RelativeDestination(_))
        ));
        assert!(matches!(
            validate_destination("../../etc/passwd"),
            Err(Error::RelativeDestination(_))
        ));
        assert!(validate_destination("").is_err());
    }
}
