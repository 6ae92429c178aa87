//! Diagnostics go to stderr so they never mix with rendered output.

use std::io::{self, Write};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber. `RUST_LOG` wins over `level` when set.
/// Later calls are ignored.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level));
    let layer = fmt::layer().with_target(false).with_writer(|| ProgressAwareStderr);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init()
            .ok();
    }
}

/// `level` for our own crates, warnings only for dependencies. Targets match
/// by prefix, so `hoist` covers every `hoist_*` crate.
fn default_filter(level: Level) -> EnvFilter {
    EnvFilter::new(format!("warn,hoist={}", level.as_str().to_ascii_lowercase()))
}

/// Stderr that hides live progress widgets while a log line is written.
struct ProgressAwareStderr;

impl Write for ProgressAwareStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        hoist_core::ui::progress::suspend(|| io::stderr().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { io::stderr().flush() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_filter(level: Level, check: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(default_filter(level));
        tracing::subscriber::with_default(subscriber, check);
    }

    #[test]
    fn verbose_stays_inside_the_workspace() {
        with_filter(Level::DEBUG, || {
            assert!(tracing::enabled!(target: "hoist_core::client", Level::DEBUG));
            assert!(tracing::enabled!(target: "hoist_transfer::effects::blob", Level::DEBUG));
            assert!(tracing::enabled!(target: "hoist", Level::DEBUG));
            assert!(!tracing::enabled!(target: "hyper_util::client::legacy::pool", Level::DEBUG));
            assert!(!tracing::enabled!(target: "reqwest::connect", Level::DEBUG));
            assert!(tracing::enabled!(target: "reqwest::connect", Level::WARN));
        });
    }

    #[test]
    fn quiet_default_keeps_warnings() {
        with_filter(Level::WARN, || {
            assert!(!tracing::enabled!(target: "hoist_core::client", Level::DEBUG));
            assert!(tracing::enabled!(target: "hoist_transfer::effects::chain", Level::WARN));
        });
    }

    #[test]
    fn log_writes_pass_through() {
        let mut out = ProgressAwareStderr;
        assert_eq!(out.write(b"").unwrap(), 0);
        out.flush().unwrap();
    }
}
