//! Bounded, shared notification log.
//!
//! Guards append advisory messages here instead of surfacing them
//! synchronously; the health emitter flushes the buffer on the next
//! tool-use event. The cap is a hard stop, not a sliding window: once
//! `max_lines` entries are stored, further appends are dropped.

use std::cell::RefCell;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::Result;

pub const DEFAULT_MAX_LINES: usize = 200;

pub trait HealthStore {
    /// Append one timestamped message. Returns `false` when the message was
    /// dropped (empty, or the buffer is at capacity).
    fn append(&self, message: &str) -> Result<bool>;

    /// Take every buffered line and leave the buffer empty.
    /// `None` signals an empty buffer.
    fn flush(&self) -> Result<Option<Vec<String>>>;

    /// Peek at the buffered lines without clearing them.
    fn read(&self) -> Result<Vec<String>>;
}

/// Format a buffer line: `[YYYY-MM-DDTHH:MM:SSZ] message`.
pub fn format_entry(message: &str) -> String {
    let ts = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    // Entries are line-delimited; fold embedded newlines.
    let flat = message.replace(['\r', '\n'], " ");
    format!("[{}] {}", ts, flat.trim())
}

/// File-backed buffer at `.forge/health_buffer`.
pub struct FileHealthBuffer {
    path: PathBuf,
    max_lines: usize,
}

impl FileHealthBuffer {
    pub fn new(path: impl Into<PathBuf>, max_lines: usize) -> Self {
        Self {
            path: path.into(),
            max_lines,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn non_empty_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}

impl HealthStore for FileHealthBuffer {
    fn append(&self, message: &str) -> Result<bool> {
        if message.trim().is_empty() {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let stored = self.read()?.len();
        if stored >= self.max_lines {
            tracing::debug!(stored, "health buffer full, dropping entry");
            return Ok(false);
        }

        let mut f = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(f, "{}", format_entry(message))?;
        Ok(true)
    }

    fn flush(&self) -> Result<Option<Vec<String>>> {
        // Move the file aside first so appends racing with the flush land in
        // a fresh buffer instead of being truncated away.
        let taken = self
            .path
            .with_file_name(format!("health_buffer.flush.{}", std::process::id()));
        match fs::rename(&self.path, &taken) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let content = fs::read_to_string(&taken);
        let _ = fs::remove_file(&taken);
        let lines = non_empty_lines(&content?);

        if lines.is_empty() {
            Ok(None)
        } else {
            Ok(Some(lines))
        }
    }

    fn read(&self) -> Result<Vec<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(non_empty_lines(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process buffer for tests and dry runs.
pub struct MemoryHealthBuffer {
    lines: RefCell<Vec<String>>,
    max_lines: usize,
}

impl MemoryHealthBuffer {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: RefCell::new(Vec::new()),
            max_lines,
        }
    }
}

impl Default for MemoryHealthBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES)
    }
}

impl HealthStore for MemoryHealthBuffer {
    fn append(&self, message: &str) -> Result<bool> {
        if message.trim().is_empty() {
            return Ok(false);
        }
        let mut lines = self.lines.borrow_mut();
        if lines.len() >= self.max_lines {
            return Ok(false);
        }
        lines.push(format_entry(message));
        Ok(true)
    }

    fn flush(&self) -> Result<Option<Vec<String>>> {
        let taken = std::mem::take(&mut *self.lines.borrow_mut());
        if taken.is_empty() {
            Ok(None)
        } else {
            Ok(Some(taken))
        }
    }

    fn read(&self) -> Result<Vec<String>> {
        Ok(self.lines.borrow().clone())
    }
}
