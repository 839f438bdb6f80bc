//! Extraction progress bar and the tracing writer that shares stderr with it.
//!
//! When stderr is a terminal, log lines are printed through the same
//! `MultiProgress` that draws the bar so they land above it. Otherwise the
//! bar is never drawn and log lines go straight to stderr.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, IsTerminal, Write};
use std::sync::OnceLock;
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}";
const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

static BARS: OnceLock<MultiProgress> = OnceLock::new();

fn bars() -> &'static MultiProgress {
    BARS.get_or_init(|| MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(10)))
}

/// Styled bar for `len` documents, or `None` when there is nothing to show
pub fn start_progress_bar(len: usize, message: &str) -> Option<ProgressBar> {
    if len == 0 {
        return None;
    }

    let pb = bars().add(ProgressBar::new(len as u64));
    if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
        pb.set_style(style.tick_chars(TICK_CHARS));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

pub fn finish_progress(pb: Option<ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}

/// `MakeWriter` for the fmt layer
#[derive(Debug, Clone, Copy)]
pub struct LogWriterFactory {
    pinned: bool,
}

impl LogWriterFactory {
    /// Print above the progress bars only when stderr is a terminal
    pub fn for_stderr() -> Self {
        Self::new(io::stderr().is_terminal())
    }

    pub fn new(pinned: bool) -> Self {
        Self { pinned }
    }

    /// Whether log lines are routed through the progress bars
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }
}

impl Default for LogWriterFactory {
    fn default() -> Self {
        Self::for_stderr()
    }
}

impl<'a> MakeWriter<'a> for LogWriterFactory {
    type Writer = LogWriter<io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        if self.pinned {
            LogWriter::pinned()
        } else {
            LogWriter::plain(io::stderr())
        }
    }
}

/// Collects one formatted event and emits it line by line, either
/// through the progress bars or to `out`
pub struct LogWriter<W: Write> {
    buffer: String,
    out: Option<W>,
}

impl<W: Write> LogWriter<W> {
    fn pinned() -> Self {
        Self {
            buffer: String::new(),
            out: None,
        }
    }

    pub fn plain(out: W) -> Self {
        Self {
            buffer: String::new(),
            out: Some(out),
        }
    }

    fn emit(&mut self, line: &str) -> io::Result<()> {
        match self.out.as_mut() {
            Some(out) => writeln!(out, "{}", line),
            // a hidden draw target swallows println, so fall back to stderr
            None if bars().is_hidden() => writeln!(io::stderr().lock(), "{}", line),
            None => bars().println(line),
        }
    }

    fn emit_complete_lines(&mut self) -> io::Result<()> {
        while let Some(idx) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=idx).collect();
            self.emit(line.trim_end_matches(['\n', '\r']))?;
        }
        Ok(())
    }
}

impl<W: Write> Write for LogWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.push_str(&String::from_utf8_lossy(buf));
        self.emit_complete_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit_complete_lines()?;
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.emit(rest.trim_end_matches('\r'))?;
        }
        match self.out.as_mut() {
            Some(out) => out.flush(),
            None => Ok(()),
        }
    }
}

impl<W: Write> Drop for LogWriter<W> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
