//! Size-rotated log files.
//!
//! Each file is named `<base>.<YYYYMMDDHHMMSS>.<pid>.log` and is never
//! appended to again once rotated away from. Rotating twice within the same
//! second yields the same name, and the second open truncates the first file.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::Timestamp;

/// Rotation threshold used when none is configured (10 MiB).
pub const DEFAULT_ROLL_SIZE: u64 = 10 * 1024 * 1024;

/// Process id zero padded to at least five digits, as used in file names.
pub fn pid_string() -> String {
    format!("{:05}", std::process::id())
}

/// File name for a log opened at `timestamp`.
pub fn file_name(base_name: &str, timestamp: Timestamp, pid: &str) -> String {
    format!("{base_name}.{timestamp}.{pid}.log")
}

pub struct RollingFile {
    directory: PathBuf,
    base_name: String,
    pid: String,
    roll_size: u64,
    file: Option<File>,
    path: Option<PathBuf>,
    written: u64,
}

impl RollingFile {
    pub fn new(directory: PathBuf, base_name: String, pid: String, roll_size: u64) -> RollingFile {
        RollingFile {
            directory,
            base_name,
            pid,
            roll_size,
            file: None,
            path: None,
            written: 0,
        }
    }

    /// True when no file is open or the current one has reached the
    /// rotation threshold.
    pub fn needs_rotation(&self) -> bool {
        self.file.is_none() || self.written >= self.roll_size
    }

    /// Opens a fresh file when [`needs_rotation`](Self::needs_rotation).
    /// Returns whether a new file was opened.
    pub fn ensure_open(&mut self) -> Result<bool> {
        if !self.needs_rotation() {
            return Ok(false);
        }
        self.open_new()?;
        Ok(true)
    }

    /// Opens a file only if none is open, ignoring the threshold.
    pub fn open_if_missing(&mut self) -> Result<()> {
        if self.file.is_none() {
            self.open_new()?;
        }
        Ok(())
    }

    fn open_new(&mut self) -> Result<()> {
        let path = self
            .directory
            .join(file_name(&self.base_name, Timestamp::now(), &self.pid));
        let file = File::create(&path).map_err(|source| Error::CreateFile {
            path: path.clone(),
            source,
        })?;
        self.file = Some(file);
        self.path = Some(path);
        self.written = 0;
        Ok(())
    }

    /// Writes `line` and flushes it. The byte counter is left to the caller,
    /// see [`record_written`](Self::record_written).
    pub fn write(&mut self, line: &[u8]) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(Error::NoFileOpen);
        };
        file.write_all(line).map_err(Error::Write)?;
        file.flush().map_err(Error::Write)
    }

    pub fn record_written(&mut self, len: usize) {
        self.written += len as u64;
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn close(&mut self) {
        self.file = None;
    }
}
