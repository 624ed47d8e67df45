use std::path::PathBuf;
use thiserror::Error;

/// Reason a single process specification cannot be launched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("workingDirectory '{}' does not exist", .0.display())]
    WorkingDirectoryMissing(PathBuf),

    #[error("executable is not set")]
    ExecutableNotSet,

    #[error("executable '{}' does not exist", .0.display())]
    ExecutableMissing(PathBuf),
}

/// Main error type for the process watchdog
#[derive(Debug, Error)]
pub enum WatchdogError {
    // Specification errors
    #[error("No processes defined in config")]
    NoProcesses,

    #[error("Process #{index} is not valid: {source}")]
    InvalidSpec {
        index: usize,
        #[source]
        source: SpecError,
    },

    // Configuration errors
    #[error("Config file not found, searched: {}", display_paths(.0))]
    ConfigNotFound(Vec<PathBuf>),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Invalid arguments for process #{index}: {reason}")]
    InvalidArguments { index: usize, reason: String },

    // Process errors
    #[error("Failed to spawn process: {0}")]
    SpawnError(String),

    // Log-related errors
    #[error("Log error: {0}")]
    LogError(String),

    #[error("Failed to open log file: {0}")]
    LogFileError(String),

    #[error("Log rotation failed: {0}")]
    LogRotationError(String),

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for watchdog operations
pub type Result<T> = std::result::Result<T, WatchdogError>;
