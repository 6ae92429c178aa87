//! Terminal display: the progress multiplexer and the streaming renderer.

pub mod progress;
pub mod render;

use hoist_transfer::UploadProgress;
use indicatif::ProgressBar;

/// Progress callback that writes `<label> N%` into a spinner.
///
/// The spinner handle is shared with the multiplexer that drew it, so this
/// may run on the upload sampling task.
pub fn percent_reporter(
    spinner: ProgressBar,
    label: &'static str,
) -> impl Fn(&UploadProgress) + Send + Sync + 'static {
    move |progress| spinner.set_message(format!("{label} {}%", progress.percent()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use progress::{ProgressEvent, ProgressMultiplexer};

    #[test]
    fn reporter_updates_status_spinner() {
        let label = "transferring model data";
        let mut display = ProgressMultiplexer::hidden("pulling");
        display.observe(ProgressEvent::status(label));

        let report = percent_reporter(display.status_spinner().unwrap(), label);
        report(&UploadProgress { sent: 50, total: 200 });

        assert_eq!(display.message(label).as_deref(), Some("transferring model data 25%"));
    }
}
