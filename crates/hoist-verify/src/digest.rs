use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::str::FromStr;

use crate::{Hasher, Result, Sha256Hasher, VerificationError, VerifiedReader};

/// Content-derived identifier of an artifact: `<algorithm>:<lowercase hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactDigest(String);

impl ArtifactDigest {
    pub(crate) fn from_raw<H: Hasher>(raw: &[u8]) -> Self {
        Self(format!("{}:{}", H::ALGORITHM, hex::encode(raw)))
    }

    /// Digest of an in-memory buffer.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self::from_raw::<Sha256Hasher>(&Sha256Hasher::digest(data))
    }

    pub fn as_str(&self) -> &str { &self.0 }

    pub fn algorithm(&self) -> &str {
        self.0.split_once(':').map_or("", |(algorithm, _)| algorithm)
    }

    pub fn hex(&self) -> &str {
        self.0.split_once(':').map_or("", |(_, hex)| hex)
    }

    /// First twelve hex characters, used to label progress bars.
    pub fn short(&self) -> &str {
        let hex = self.hex();
        &hex[..hex.len().min(12)]
    }
}

impl fmt::Display for ArtifactDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl AsRef<str> for ArtifactDigest {
    fn as_ref(&self) -> &str { &self.0 }
}

impl FromStr for ArtifactDigest {
    type Err = VerificationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some(("sha256", hex))
                if hex.len() == 64 && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) =>
            {
                Ok(Self(s.to_string()))
            }
            _ => Err(VerificationError::InvalidDigest(s.to_string())),
        }
    }
}

/// Hash the whole of `source`, then rewind it to its origin so the caller can
/// read it again for the transfer itself.
pub fn digest_reader<R: Read + Seek>(source: &mut R) -> Result<ArtifactDigest> {
    let mut reader = VerifiedReader::new(&mut *source, Sha256Hasher::new());
    io::copy(&mut reader, &mut io::sink())?;
    let (source, digest) = reader.into_parts();
    source.seek(SeekFrom::Start(0))?;
    Ok(digest)
}

/// Open `path`, digest it, and return the rewound file with its digest and size.
pub fn digest_file(path: impl AsRef<Path>) -> Result<(File, ArtifactDigest, u64)> {
    let mut file = File::open(path.as_ref())?;
    let size = file.metadata()?.len();
    let digest = digest_reader(&mut file)?;
    Ok((file, digest, size))
}
