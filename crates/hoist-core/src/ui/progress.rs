use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use once_cell::sync::Lazy;
use tracing::{debug, trace};

const SPINNER_STYLE: &str = "{spinner:.blue} {wide_msg}";

const BAR_STYLE: &str =
    "{msg} {percent:>3}% [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

const TICK: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";

const PB_CHARS: &str = "█▓▒░  ";

const TICK_INTERVAL: Duration = Duration::from_millis(100);

static SPINNER_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    ProgressStyle::with_template(SPINNER_STYLE)
        .ok()
        .map(|style| style.tick_chars(TICK))
});

static BAR_TEMPLATE: Lazy<Option<ProgressStyle>> = Lazy::new(|| {
    ProgressStyle::with_template(BAR_STYLE)
        .ok()
        .map(|style| style.progress_chars(PB_CHARS))
});

/// The display currently drawing on stderr, if any, tagged with its owner.
static LIVE: Lazy<Mutex<Option<(u64, MultiProgress)>>> = Lazy::new(|| Mutex::new(None));

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Run `f` with the live stderr display hidden, so whatever `f` writes to
/// stderr lands between redraws instead of inside one.
pub fn suspend<R>(f: impl FnOnce() -> R) -> R {
    let live = LIVE.lock().ok().and_then(|slot| slot.as_ref().map(|(_, multi)| multi.clone()));
    match live {
        Some(multi) => multi.suspend(f),
        None => f(),
    }
}

/// What happened to one keyed lane of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressKind {
    /// A phase transition with no byte counter.
    StatusChange(String),
    /// Bytes moved for one artifact.
    ByteProgress { completed: u64, total: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub key:  String,
    pub kind: ProgressKind,
}

impl ProgressEvent {
    /// A status event is keyed by its own text.
    pub fn status(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            key:  text.clone(),
            kind: ProgressKind::StatusChange(text),
        }
    }

    pub fn bytes(digest: impl Into<String>, completed: u64, total: u64) -> Self {
        Self {
            key:  digest.into(),
            kind: ProgressKind::ByteProgress { completed, total },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Spinner,
    Bar,
}

struct Widget {
    kind: WidgetKind,
    pb:   ProgressBar,
}

/// Keyed registry of live terminal widgets.
///
/// One status lane holds at most one spinner; a new status retires the old
/// one. Byte progress gets one bar per key, and bars may coexist. Widgets
/// are drawn through a single [`MultiProgress`], which serialises terminal
/// writes, so spinner handles may be updated from other tasks. Other stderr
/// writers go through [`suspend`] while a stderr display is live.
pub struct ProgressMultiplexer {
    id:        Option<u64>,
    multi:     MultiProgress,
    widgets:   HashMap<String, Widget>,
    status:    Option<String>,
    bar_label: &'static str,
    animate:   bool,
}

impl ProgressMultiplexer {
    /// Draw to stderr. Bars are labelled `<bar_label> <short digest>...`.
    pub fn stderr(bar_label: &'static str) -> Self {
        let mut display = Self::with_target(ProgressDrawTarget::stderr(), bar_label, true);
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut slot) = LIVE.lock() {
            *slot = Some((id, display.multi.clone()));
            display.id = Some(id);
        }
        display
    }

    /// Track widgets without drawing anything.
    pub fn hidden(bar_label: &'static str) -> Self {
        Self::with_target(ProgressDrawTarget::hidden(), bar_label, false)
    }

    fn with_target(target: ProgressDrawTarget, bar_label: &'static str, animate: bool) -> Self {
        Self {
            id: None,
            multi: MultiProgress::with_draw_target(target),
            widgets: HashMap::new(),
            status: None,
            bar_label,
            animate,
        }
    }

    pub fn observe(&mut self, event: ProgressEvent) {
        match event.kind {
            ProgressKind::StatusChange(text) => self.set_status(event.key, text),
            ProgressKind::ByteProgress { completed, total } => {
                self.advance(event.key, completed, total)
            }
        }
    }

    fn set_status(&mut self, key: String, text: String) {
        if self.status.as_deref() == Some(key.as_str()) {
            return;
        }
        if let Some(previous) = self.status.take()
            && let Some(widget) = self.widgets.remove(&previous)
        {
            widget.pb.finish_and_clear();
        }
        if let Some(existing) = self.widgets.remove(&key) {
            existing.pb.finish_and_clear();
        }

        let pb = self.multi.add(ProgressBar::new_spinner());
        if let Some(style) = SPINNER_TEMPLATE.as_ref() {
            pb.set_style(style.clone());
        }
        pb.set_message(text);
        if self.animate {
            pb.enable_steady_tick(TICK_INTERVAL);
        }

        trace!(key = %key, "status widget");
        self.widgets.insert(key.clone(), Widget {
            kind: WidgetKind::Spinner,
            pb,
        });
        self.status = Some(key);
    }

    fn advance(&mut self, key: String, completed: u64, total: u64) {
        // Bytes moving means the status phase is over; leave its last frame.
        if let Some(previous) = self.status.take()
            && let Some(widget) = self.widgets.remove(&previous)
        {
            widget.pb.finish();
        }

        if let Some(widget) = self.widgets.get(&key) {
            if widget.pb.length().is_some_and(|len| total > len) {
                widget.pb.set_length(total);
            }
            if completed > widget.pb.position() {
                widget.pb.set_position(completed);
            }
            return;
        }

        let pb = self.multi.add(ProgressBar::new(total));
        if let Some(style) = BAR_TEMPLATE.as_ref() {
            pb.set_style(style.clone());
        }
        pb.set_message(format!("{} {}...", self.bar_label, short_digest(&key)));
        pb.set_position(completed);

        trace!(key = %key, completed, total, "bar widget");
        self.widgets.insert(key, Widget {
            kind: WidgetKind::Bar,
            pb,
        });
    }

    /// Handle on the current status spinner, for updates from other tasks.
    pub fn status_spinner(&self) -> Option<ProgressBar> {
        let key = self.status.as_ref()?;
        self.widgets.get(key).map(|w| w.pb.clone())
    }

    /// Keys of live widgets, sorted.
    pub fn live_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.widgets.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn kind(&self, key: &str) -> Option<WidgetKind> { self.widgets.get(key).map(|w| w.kind) }

    pub fn position(&self, key: &str) -> Option<u64> { self.widgets.get(key).map(|w| w.pb.position()) }

    pub fn message(&self, key: &str) -> Option<String> { self.widgets.get(key).map(|w| w.pb.message()) }

    pub fn is_empty(&self) -> bool { self.widgets.is_empty() }

    /// Stop every widget, leaving their last frames on screen.
    pub fn stop(&mut self) {
        for (_, widget) in self.widgets.drain() {
            widget.pb.finish();
        }
        self.status = None;
        self.release();
    }

    /// Stop every widget and erase the display area.
    pub fn stop_and_clear(&mut self) {
        for (_, widget) in self.widgets.drain() {
            widget.pb.finish_and_clear();
        }
        self.status = None;
        if let Err(e) = self.multi.clear() {
            debug!(error = %e, "clearing progress display");
        }
        self.release();
    }

    /// Give up the stderr slot unless a newer display has taken it.
    fn release(&mut self) {
        let Some(id) = self.id.take() else { return };
        if let Ok(mut slot) = LIVE.lock()
            && slot.as_ref().is_some_and(|(owner, _)| *owner == id)
        {
            *slot = None;
        }
    }
}

impl Drop for ProgressMultiplexer {
    fn drop(&mut self) { self.stop(); }
}

fn short_digest(key: &str) -> &str { key.get(7..19).unwrap_or(key) }
