use std::io::{self, Read};

use crate::{ArtifactDigest, Hasher};

/// Streaming reader that hashes data as it passes through.
/// Wraps any `Read` source so a single pass both consumes and digests it.
pub struct VerifiedReader<R, H> {
    reader: R,
    hasher: H,
    bytes:  u64,
}

impl<R, H> VerifiedReader<R, H> {
    pub fn new(reader: R, hasher: H) -> Self {
        Self {
            reader,
            hasher,
            bytes: 0,
        }
    }

    /// Bytes hashed so far.
    pub fn bytes_read(&self) -> u64 { self.bytes }
}

impl<R, H: Hasher> VerifiedReader<R, H> {
    /// Finish hashing and hand back the wrapped reader with its digest.
    pub fn into_parts(self) -> (R, ArtifactDigest) {
        let digest = ArtifactDigest::from_raw::<H>(&self.hasher.finalize());
        (self.reader, digest)
    }
}

impl<R: Read, H: Hasher> Read for VerifiedReader<R, H> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read(buf)?;
        if n > 0 {
            self.hasher.update(&buf[..n]);
            self.bytes += n as u64;
        }
        Ok(n)
    }
}
