//! Content digests for artifacts.
//!
//! An [`ArtifactDigest`] names an artifact by its bytes. It is computed once,
//! in a full pass over the source, before any transfer decision is made; the
//! source is then rewound so the transfer pass reads it again from the start.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use hoist_verify::digest_reader;
//!
//! let mut source = Cursor::new(b"hello world".to_vec());
//! let digest = digest_reader(&mut source).unwrap();
//!
//! assert_eq!(digest.algorithm(), "sha256");
//! assert_eq!(source.position(), 0);
//! ```

pub use self::digest::{ArtifactDigest, digest_file, digest_reader};
pub use self::error::{Result, VerificationError};
pub use self::hasher::{Hasher, Sha256Hasher};
pub use self::reader::VerifiedReader;

mod digest;
mod error;
mod hasher;
mod reader;
