//! Content-type guesses from leading bytes, the subset model files and
//! prompt images need.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Bytes examined per file.
const SNIFF_LEN: u64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Zip,
    Png,
    Jpeg,
    /// Anything with control bytes a text file would not carry.
    Binary,
    Text,
}

impl ContentType {
    pub fn detect(head: &[u8]) -> Self {
        if head.starts_with(b"PK\x03\x04") {
            Self::Zip
        } else if head.starts_with(b"\x89PNG\r\n\x1a\n") {
            Self::Png
        } else if head.starts_with(b"\xff\xd8\xff") {
            Self::Jpeg
        } else if head.iter().any(|&b| is_binary(b)) {
            Self::Binary
        } else {
            Self::Text
        }
    }

    pub fn of_file(path: &Path) -> io::Result<Self> {
        let mut head = Vec::with_capacity(SNIFF_LEN as usize);
        File::open(path)?.take(SNIFF_LEN).read_to_end(&mut head)?;
        Ok(Self::detect(&head))
    }
}

fn is_binary(b: u8) -> bool { matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f) }
