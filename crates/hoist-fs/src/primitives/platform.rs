use std::fs::File;
use std::path::Path;

use tracing::debug;

use crate::error::{read_err, write_err};
use crate::{Error, Result};

/// Platform-optimised copy of a single file.
///
/// On Linux this asks the kernel to copy with `copy_file_range`, which shares
/// extents on reflink-capable filesystems and never moves bytes through user
/// space. Elsewhere it defers to `std::fs::copy`, which clones on APFS and
/// uses `CopyFileExW` on Windows. Failure is expected when the source and
/// destination sit on different filesystems or the parent directory does not
/// exist yet; callers fall back to [`buffered_copy`](super::buffered_copy).
pub fn platform_copy(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<u64> {
    let src = src.as_ref();
    let dest = dest.as_ref();
    let input = File::open(src).map_err(read_err(src))?;
    let expected = input.metadata().map_err(read_err(src))?.len();

    let copied = copy_impl(&input, src, dest, expected)?;
    if copied != expected {
        return Err(Error::ShortCopy {
            path: dest.to_path_buf(),
            copied,
            expected,
        });
    }
    debug!(src = %src.display(), dest = %dest.display(), bytes = copied, "platform copy complete");
    Ok(copied)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn copy_impl(input: &File, _src: &Path, dest: &Path, expected: u64) -> Result<u64> {
    use nix::fcntl::copy_file_range;

    // Kernel-side copies are capped per call.
    const MAX_CHUNK: u64 = 1 << 30;

    let output = File::create(dest).map_err(write_err(dest))?;
    let mut copied = 0u64;
    while copied < expected {
        let len = (expected - copied).min(MAX_CHUNK) as usize;
        let n = copy_file_range(input, None, &output, None, len)
            .map_err(|errno| write_err(dest)(std::io::Error::from(errno)))?;
        if n == 0 {
            break;
        }
        copied += n as u64;
    }

    output.sync_all().map_err(write_err(dest))?;
    Ok(copied)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn copy_impl(_input: &File, src: &Path, dest: &Path, _expected: u64) -> Result<u64> {
    std::fs::copy(src, dest).map_err(write_err(dest))
}
