use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;

/// A status update emitted while duplicates are being resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A file became the current item and its group is being collected.
    Reading(PathBuf),
    /// The current item is being compared against this file.
    Comparing(PathBuf),
    /// This file is about to be removed.
    Deleting(PathBuf),
    /// Removing this file failed; the run carries on with the next one.
    DeleteFailed { path: PathBuf, error: String },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Reading(path) => write!(f, "Reading {}", path.display()),
            ProgressEvent::Comparing(path) => write!(f, "Comparing {}", path.display()),
            ProgressEvent::Deleting(path) => write!(f, "Deleting {}", path.display()),
            ProgressEvent::DeleteFailed { path, error } => {
                write!(f, "Failed to delete {}: {}", path.display(), error)
            }
        }
    }
}

/// Receives progress events. Purely observational.
pub trait ProgressSink {
    fn notify(&mut self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(&ProgressEvent),
{
    fn notify(&mut self, event: &ProgressEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn notify(&mut self, _event: &ProgressEvent) {}
}

/// Writes one line per event, indenting the per-file steps under their
/// `Reading` line.
///
/// A closed pipe on the other end silently switches the writer off; any other
/// write error is logged once and does the same.
#[derive(Debug)]
pub struct LineWriter<W: Write> {
    out: W,
    enabled: bool,
}

impl<W: Write> LineWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, enabled: true }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_event(&mut self, event: &ProgressEvent) -> io::Result<()> {
        match event {
            ProgressEvent::Reading(_) => writeln!(self.out, "\n{}", event)?,
            _ => writeln!(self.out, "\t{}", event)?,
        }
        self.out.flush()
    }
}

impl LineWriter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ProgressSink for LineWriter<W> {
    fn notify(&mut self, event: &ProgressEvent) {
        if !self.enabled {
            return;
        }
        if let Err(err) = self.write_event(event) {
            self.enabled = false;
            if !is_broken_pipe(&err) {
                log::error!("Error writing progress: {}", err);
            }
        }
    }
}

fn is_broken_pipe(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::BrokenPipe {
        return true;
    }
    matches!(err.raw_os_error(), Some(32) | Some(109))
}
