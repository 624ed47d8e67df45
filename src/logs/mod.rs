// Logs module - tracing setup and the supervisor's own log file

pub mod writer;

pub use writer::{RotatingLogFile, DEFAULT_MAX_LOG_SIZE};

use crate::error::{Result, WatchdogError};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Name of the supervisor's log file
pub const LOG_FILE_NAME: &str = "procwatch.log";

/// Where and how much to log
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Filter used when `RUST_LOG` is not set
    pub level: String,
    /// Directory for the log file; `None` logs to stderr only
    pub log_dir: Option<PathBuf>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}

/// Install the global tracing subscriber
///
/// Returns the path of the log file, if one was opened.
pub fn init_logging(options: &LogOptions) -> Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.level))
        .map_err(|e| WatchdogError::LogError(format!("Invalid log level: {}", e)))?;

    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let (file_layer, file_path) = match options.log_dir {
        Some(ref dir) => {
            let file = RotatingLogFile::open(dir, LOG_FILE_NAME)?;
            let path = file.path().to_path_buf();
            let layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| WatchdogError::LogError(format!("Failed to install logger: {}", e)))?;

    Ok(file_path)
}
