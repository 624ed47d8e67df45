use crate::error::{Result, WatchdogError};
use chrono::{DateTime, Local, NaiveDate};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Default maximum log file size before rotation (10MB)
pub const DEFAULT_MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Append-only log file that rotates on size and on day change
///
/// The rotated file is renamed to `<stem>-YYYYMMDD-HHMMSS.log` and a fresh
/// file is opened under the original name.
#[derive(Debug)]
pub struct RotatingLogFile {
    path: PathBuf,
    file: File,
    max_size: u64,
    size: u64,
    opened_on: NaiveDate,
}

impl RotatingLogFile {
    /// Open (or create) `<log_dir>/<file_name>`
    pub fn open(log_dir: &Path, file_name: &str) -> Result<Self> {
        Self::with_max_size(log_dir, file_name, DEFAULT_MAX_LOG_SIZE)
    }

    pub fn with_max_size(log_dir: &Path, file_name: &str, max_size: u64) -> Result<Self> {
        std::fs::create_dir_all(log_dir).map_err(|e| {
            WatchdogError::LogError(format!(
                "Failed to create log directory {}: {}",
                log_dir.display(),
                e
            ))
        })?;

        let path = log_dir.join(file_name);
        let file = open_append(&path)?;
        let metadata = file.metadata().ok();
        let size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
        // An existing file belongs to the day it was last written
        let opened_on = metadata
            .and_then(|m| m.modified().ok())
            .map(|modified| DateTime::<Local>::from(modified).date_naive())
            .unwrap_or_else(|| Local::now().date_naive());

        Ok(Self {
            path,
            file,
            max_size,
            size,
            opened_on,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    fn needs_rotation(&self, today: NaiveDate) -> bool {
        self.size > 0 && (self.size >= self.max_size || today != self.opened_on)
    }

    /// Rename the current file aside and start a new one
    pub fn rotate(&mut self) -> Result<PathBuf> {
        self.file.flush()?;

        let timestamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
        let parent = self.path.parent().ok_or_else(|| {
            WatchdogError::LogRotationError("Invalid log file path".to_string())
        })?;
        let file_stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| WatchdogError::LogRotationError("Invalid log file name".to_string()))?;

        let mut rotated_path = parent.join(format!("{}-{}.log", file_stem, timestamp));
        let mut n = 1;
        while rotated_path.exists() {
            rotated_path = parent.join(format!("{}-{}-{}.log", file_stem, timestamp, n));
            n += 1;
        }

        std::fs::rename(&self.path, &rotated_path)
            .map_err(|e| WatchdogError::LogRotationError(format!("Failed to rotate log: {}", e)))?;

        self.file = open_append(&self.path)?;
        self.size = 0;
        self.opened_on = Local::now().date_naive();

        Ok(rotated_path)
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            WatchdogError::LogFileError(format!("Failed to open {}: {}", path.display(), e))
        })
}

impl Write for RotatingLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.needs_rotation(Local::now().date_naive()) {
            // Keep logging into the old file rather than dropping the line
            if let Err(e) = self.rotate() {
                eprintln!("procwatch: {}", e);
            }
        }

        let written = self.file.write(buf)?;
        self.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
