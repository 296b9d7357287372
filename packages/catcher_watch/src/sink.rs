//! Output destinations for rendered requests and lifecycle lines.
//!
//! Every emission is an [`Output`]; a [`SinkSet`] hands it to each active
//! [`Sink`] in turn. Sinks decide their own framing: the console highlights
//! and frames blocks for reading, the log file keeps a plain transcript.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::WatchError;
use crate::render::Highlighter;

/// Separator written before and after each rendered block.
pub const RULE: &str = "================================================================================";

/// One thing the watcher wants shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output<'a> {
    /// Lifecycle line ("Connected. Waiting for requests...").
    Status(&'a str),
    /// Undecorated rendered request block.
    Request(&'a str),
    /// A feed message that did not decode; shown as `[raw] <message>`.
    Raw(&'a str),
    /// Connection failure or retry notice.
    Diagnostic(&'a str),
}

/// Capability: accept outputs in order.
pub trait Sink: Send {
    fn emit(&mut self, output: &Output<'_>) -> io::Result<()>;

    /// Flush and release resources. Called once when the watcher stops.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Short name used in log messages.
    fn name(&self) -> &'static str;
}

/// Terminal output: stdout for everything but diagnostics, which go to stderr.
pub struct ConsoleSink {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    highlighter: Option<Highlighter>,
}

impl ConsoleSink {
    pub fn new(
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
        highlighter: Option<Highlighter>,
    ) -> Self {
        Self {
            out,
            err,
            highlighter,
        }
    }

    /// Console bound to the process stdout/stderr. Pass a highlighter only
    /// when the terminal supports color.
    pub fn stdio(highlighter: Option<Highlighter>) -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()), highlighter)
    }
}

impl Sink for ConsoleSink {
    fn emit(&mut self, output: &Output<'_>) -> io::Result<()> {
        match output {
            Output::Status(line) => writeln!(self.out, "{line}")?,
            Output::Request(block) => {
                let shown = match &self.highlighter {
                    Some(hl) => hl.apply(block),
                    None => block.to_string(),
                };
                writeln!(self.out, "{RULE}\n{shown}\n{RULE}\n")?;
            }
            Output::Raw(message) => writeln!(self.out, "[raw] {message}")?,
            Output::Diagnostic(line) => {
                writeln!(self.err, "{line}")?;
                return self.err.flush();
            }
        }
        self.out.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        self.out.flush()?;
        self.err.flush()
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

/// Append-only plain-text transcript. Never highlighted.
pub struct LogSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl LogSink {
    /// Open (creating if needed) `path` for appending.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WatchError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| WatchError::LogFile {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "log sink opened");
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for LogSink {
    fn emit(&mut self, output: &Output<'_>) -> io::Result<()> {
        match output {
            Output::Status(line) | Output::Diagnostic(line) => {
                writeln!(self.writer, "{line}")?
            }
            Output::Request(block) => writeln!(self.writer, "{RULE}\n{block}\n{RULE}")?,
            Output::Raw(message) => writeln!(self.writer, "[raw] {message}")?,
        }
        // Flush per emission so `tail -f` sees whole blocks.
        self.writer.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// The active sinks, in the order outputs reach them.
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn Sink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: impl Sink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Deliver to every sink. A failing sink is reported and skipped; it
    /// does not stop delivery to the others.
    pub fn emit(&mut self, output: &Output<'_>) {
        for sink in &mut self.sinks {
            if let Err(e) = sink.emit(output) {
                warn!(sink = sink.name(), error = %e, "failed to write output");
            }
        }
    }

    pub fn close(&mut self) {
        for sink in &mut self.sinks {
            if let Err(e) = sink.close() {
                warn!(sink = sink.name(), error = %e, "failed to close sink");
            }
        }
    }

    /// Sink names in delivery order.
    pub fn names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }
}

/// Which sinks a run writes to, as chosen on the command line.
#[derive(Debug, Clone, Default)]
pub struct SinkOptions {
    /// Log file only; nothing is written to the console.
    pub background: bool,
    pub log_file: Option<PathBuf>,
    pub highlight: Option<String>,
    /// Whether the console may emit ANSI escapes.
    pub color: bool,
}

impl SinkOptions {
    /// The explicit log file, else `default_log` in background mode.
    pub fn log_path(&self, default_log: impl FnOnce() -> PathBuf) -> Option<PathBuf> {
        match (&self.log_file, self.background) {
            (Some(path), _) => Some(path.clone()),
            (None, true) => Some(default_log()),
            (None, false) => None,
        }
    }

    /// Console highlighter; `None` without color or for a blank term.
    pub fn highlighter(&self) -> Option<Highlighter> {
        self.highlight
            .as_deref()
            .filter(|_| self.color)
            .and_then(Highlighter::new)
    }

    /// Console sink unless in background mode, then the log sink when a
    /// path is given.
    pub fn assemble(&self, log_path: Option<&Path>) -> Result<SinkSet, WatchError> {
        let mut sinks = SinkSet::new();
        if !self.background {
            sinks.push(ConsoleSink::stdio(self.highlighter()));
        }
        if let Some(path) = log_path {
            sinks.push(LogSink::open(path)?);
        }
        debug!(sinks = ?sinks.names(), "output sinks ready");
        Ok(sinks)
    }
}
