pub mod buffered;
pub mod platform;

pub use buffered::{BufferedCopyOptions, DEFAULT_BUFFER_SIZE, buffered_copy};
pub use platform::platform_copy;
