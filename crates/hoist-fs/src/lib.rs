//! Local placement strategies for content-addressed artifacts.
//!
//! When the remote authority shares a filesystem with the client it hands
//! back a destination path. The strategies here put the artifact there
//! without a network round trip:
//!
//! - [`PlatformCopy`]: kernel or OS assisted copy (copy-on-write where the
//!   filesystem supports it)
//! - [`BufferedCopy`]: portable copy through a fixed 4 MiB buffer, synced
//!   before success is reported
//!
//! Both return errors freely; ordering and fallback are the caller's concern.

mod error;
mod primitives;
mod strategy;

pub use error::{Error, Result};
pub use primitives::{BufferedCopyOptions, DEFAULT_BUFFER_SIZE, buffered_copy, platform_copy};
pub use strategy::{BufferedCopy, CopyStrategy, PlatformCopy, default_strategies, validate_destination};
