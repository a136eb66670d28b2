//! Error types for narc-scan
//!
//! This module defines the error hierarchy for a scan run:
//! - Configuration and CLI errors (invalid arguments)
//! - Worker spawn, join and publication errors
//! - Report sink errors
//!
//! Every error is fatal to the run. There is no partial report: either every
//! worker's result is aggregated or nothing is written.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for a scan run
#[derive(Error, Debug)]
pub enum ScanError {
    /// Invalid arguments or configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Worker spawn/join/publication errors
    #[error(transparent)]
    Worker(#[from] WorkerError),

    /// Report output errors
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Configuration and CLI errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Worker count out of range
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Upper bound of zero leaves nothing to scan
    #[error("Invalid upper bound {0}: must be at least 1")]
    InvalidUpperBound(u64),

    /// Fewer numbers than workers
    #[error("Range [1, {total}] is too small for {workers} workers")]
    RangeTooSmall { total: u64, workers: usize },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },

    /// Isolation mode not available on this platform
    #[error("Isolation mode '{0}' is not supported on this platform")]
    UnsupportedIsolation(String),
}

/// Worker errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker could not be created (thread spawn or fork failed)
    #[error("Failed to spawn worker {slot}: {reason}")]
    SpawnFailed { slot: usize, reason: String },

    /// Result channel could not be allocated
    #[error("Failed to allocate result table for {slots} workers: {reason}")]
    ChannelInit { slots: usize, reason: String },

    /// Worker thread panicked
    #[error("Worker {slot} panicked: {message}")]
    Panicked { slot: usize, message: String },

    /// Worker process terminated abnormally
    #[error("Worker {slot} (pid {pid}) terminated abnormally: {status}")]
    Exited { slot: usize, pid: i32, status: String },

    /// Join returned but the slot was never written
    #[error("Worker {slot} finished without publishing a result")]
    Unpublished { slot: usize },

    /// A slot was written twice
    #[error("Slot {slot} was already published")]
    AlreadyPublished { slot: usize },

    /// Item addressed a slot the table does not have
    #[error("Slot {slot} is out of range for a table of {slots} slots")]
    SlotOutOfRange { slot: usize, slots: usize },

    /// A published result landed in the wrong slot
    #[error("Slot {slot} holds a result for slot {found}")]
    SlotMismatch { slot: usize, found: usize },

    /// Match spill file could not be read back
    #[error("Failed to read matches for worker {slot}: {reason}")]
    Spill { slot: usize, reason: String },
}

/// Report sink errors
#[derive(Error, Debug)]
pub enum SinkError {
    /// Output file could not be opened
    #[error("Failed to open '{path}' for writing: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the report failed
    #[error("Failed to write report to '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for ScanError
pub type Result<T> = std::result::Result<T, ScanError>;

/// Result type alias for ConfigError
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for SinkError
pub type SinkResult<T> = std::result::Result<T, SinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let cfg_err = ConfigError::RangeTooSmall {
            total: 2,
            workers: 4,
        };
        let scan_err: ScanError = cfg_err.into();
        assert!(matches!(scan_err, ScanError::Config(_)));
        assert!(scan_err.to_string().contains("too small"));
    }

    #[test]
    fn test_wrapped_message_not_repeated() {
        let inner = WorkerError::ChannelInit {
            slots: 2000,
            reason: "Too many open files (os error 24)".into(),
        };
        let expected = inner.to_string();

        let chained = format!("{:#}", anyhow::Error::new(ScanError::from(inner)));
        assert_eq!(chained, expected);
    }
}
