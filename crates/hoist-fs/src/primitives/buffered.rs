use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{read_err, write_err};
use crate::{Error, Result};

pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024 * 1024;

#[derive(Clone, Copy, Debug)]
pub struct BufferedCopyOptions {
    pub buffer_size: usize,
    pub sync:        bool,
}

impl Default for BufferedCopyOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            sync:        true,
        }
    }
}

impl BufferedCopyOptions {
    pub fn new() -> Self { Self::default() }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

/// Copy `src` to `dest` through a fixed-size buffer, creating parent
/// directories as needed. The destination is synced before returning when
/// `options.sync` is set.
pub fn buffered_copy(
    src: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    options: BufferedCopyOptions,
) -> Result<u64> {
    let src = src.as_ref();
    let dest = dest.as_ref();

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(write_err(parent))?;
    }

    let mut input = File::open(src).map_err(read_err(src))?;
    let mut output = File::create(dest).map_err(write_err(dest))?;

    let mut buf = vec![0u8; options.buffer_size];
    let mut copied = 0u64;
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_err(src)(e)),
        };
        output.write_all(&buf[..n]).map_err(write_err(dest))?;
        copied += n as u64;
    }

    output.flush().map_err(write_err(dest))?;
    if options.sync {
        output.sync_all().map_err(write_err(dest))?;
    }

    let expected = input.metadata().map_err(read_err(src))?.len();
    if copied != expected {
        return Err(Error::ShortCopy {
            path: dest.to_path_buf(),
            copied,
            expected,
        });
    }

    debug!(src = %src.display(), dest = %dest.display(), bytes = copied, "buffered copy complete");
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_parent_directories() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.bin");
        let dest = dir.path().join("blobs/nested/sha256-abc");
        std::fs::write(&src, b"weights").unwrap();

        let copied = buffered_copy(&src, &dest, BufferedCopyOptions::new()).unwrap();

        assert_eq!(copied, 7);
        assert_eq!(std::fs::read(&dest).unwrap(), b"weights");
    }

    #[test]
    fn small_buffer_copies_everything() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.bin");
        let dest = dir.path().join("dest.bin");
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&src, &data).unwrap();

        buffered_copy(&src, &dest, BufferedCopyOptions::new().buffer_size(7).sync(false)).unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), data);
    }

    #[test]
    fn missing_source_is_read_error() {
        let dir = tempdir().unwrap();
        let err = buffered_copy(
            dir.path().join("absent"),
            dir.path().join("dest"),
            BufferedCopyOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn overwrites_partial_destination() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.bin");
        let dest = dir.path().join("dest.bin");
        std::fs::write(&src, b"abc").unwrap();
        std::fs::write(&dest, b"stale partial content").unwrap();

        buffered_copy(&src, &dest, BufferedCopyOptions::new()).unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"abc");
    }
}
