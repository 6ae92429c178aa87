use std::io::{self, Write};

use console::Term;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::ui::progress::{ProgressEvent, ProgressMultiplexer};

/// Narrower terminals are written verbatim.
pub const MIN_WRAP_WIDTH: usize = 10;

/// Current terminal width in columns, or `None` when stdout is not a terminal.
pub fn terminal_width() -> Option<usize> {
    Term::stdout().size_checked().map(|(_, cols)| cols as usize)
}

/// Position of the cursor within the current line, and the word being typed
/// at it. The pending word is already on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderState {
    pub line_length:  usize,
    pub pending_word: String,
}

impl RenderState {
    fn reset(&mut self) {
        self.line_length = 0;
        self.pending_word.clear();
    }

    // Bookkeeping for a character that has just been printed.
    fn printed(&mut self, ch: char, width: usize) {
        if width >= 2 {
            self.pending_word.clear();
            return;
        }
        match ch {
            ' ' => self.pending_word.clear(),
            '\n' => self.reset(),
            _ => self.pending_word.push(ch),
        }
    }
}

/// Incremental word-wrapping printer for streamed text.
///
/// The width source is asked before every character, so a resized terminal
/// takes effect mid-fragment. A "waiting" spinner, if attached, is cleared
/// when the first fragment arrives.
pub struct Renderer<W, F> {
    out:     W,
    width:   F,
    wrap:    bool,
    state:   RenderState,
    waiting: Option<ProgressMultiplexer>,
}

impl<W, F> Renderer<W, F>
where
    W: Write,
    F: FnMut() -> Option<usize>,
{
    pub fn new(out: W, width: F, wrap: bool) -> Self {
        Self {
            out,
            width,
            wrap,
            state: RenderState::default(),
            waiting: None,
        }
    }

    /// Show a spinner until the first fragment.
    pub fn with_waiting(mut self, mut progress: ProgressMultiplexer) -> Self {
        progress.observe(ProgressEvent::status(""));
        self.waiting = Some(progress);
        self
    }

    pub fn state(&self) -> &RenderState { &self.state }

    pub fn is_waiting(&self) -> bool { self.waiting.is_some() }

    pub fn render(&mut self, fragment: &str) -> io::Result<()> {
        self.stop_waiting();

        for ch in fragment.chars() {
            match (self.width)() {
                Some(width) if self.wrap && width >= MIN_WRAP_WIDTH => self.wrapped(ch, width)?,
                _ => {
                    write!(self.out, "{ch}")?;
                    self.state.pending_word.clear();
                }
            }
        }
        self.out.flush()
    }

    fn wrapped(&mut self, ch: char, width: usize) -> io::Result<()> {
        let ch_width = ch.width().unwrap_or(0);

        if self.state.line_length < width - 5 {
            write!(self.out, "{ch}")?;
            self.state.line_length += ch_width;
            self.state.printed(ch, ch_width);
            return Ok(());
        }

        let word_width = self.state.pending_word.width();
        if word_width > width - 10 {
            // Too long to move; let it run on.
            write!(self.out, "{ch}")?;
            self.state.reset();
            return Ok(());
        }

        if word_width > 0 {
            write!(self.out, "\x1b[{word_width}D")?;
        }
        write!(self.out, "\x1b[K\n{}{ch}", self.state.pending_word)?;
        self.state.line_length = word_width + ch_width;
        self.state.printed(ch, ch_width);
        Ok(())
    }

    /// Clear the waiting spinner if nothing arrived and hand back the writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.stop_waiting();
        self.out.flush()?;
        Ok(self.out)
    }

    fn stop_waiting(&mut self) {
        if let Some(mut progress) = self.waiting.take() {
            progress.stop_and_clear();
        }
    }
}
