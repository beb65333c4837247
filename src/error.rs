//! Error types for filewarm
//!
//! The hierarchy mirrors how a run can end:
//! - Input list errors abort before anything is dispatched
//! - Configuration errors abort before anything is dispatched
//! - Per-file errors are always counted, and escalate only when errors are not skipped
//! - Cancellation ends a run early, either by policy or by an external interrupt

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The file list could not be opened or read
#[derive(Error, Debug)]
pub enum InputListError {
    #[error("Cannot open file list '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot read file list '{}' at line {line}: {source}", .path.display())]
    Read {
        path: PathBuf,
        line: usize,
        #[source]
        source: io::Error,
    },
}

/// Invalid settings
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid block size '{value}': {reason}")]
    InvalidBlockSize { value: String, reason: String },

    #[error("Invalid job count {count}: must be at least 1")]
    InvalidJobCount { count: usize },

    #[error("Configuration file not found: {}", .path.display())]
    MissingFile { path: PathBuf },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// Outcome classification for a single file that did not read cleanly
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PerFileError {
    #[error("File not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Permission denied: {}", .path.display())]
    PermissionDenied { path: PathBuf },

    #[error("Read failed: {}: {reason}", .path.display())]
    ReadFailed { path: PathBuf, reason: String },
}

impl PerFileError {
    /// Path of the file that failed
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::NotFound { path } | Self::PermissionDenied { path } | Self::ReadFailed { path, .. } => path,
        }
    }

    /// Classify an io error raised while probing a file before reading it
    pub fn from_probe(path: PathBuf, err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::ReadFailed {
                path,
                reason: err.to_string(),
            },
        }
    }
}

/// Why a run stopped before draining normally
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CancelledError {
    /// Interrupted by signal
    #[error("Operation interrupted by signal")]
    Interrupted,

    /// A file failed while errors were not being skipped
    #[error("Aborted after failure on {}", .path.display())]
    FailurePolicy { path: PathBuf },
}
