use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the broadcast monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An archive file could not be created or written.
    #[error("Failed to write archive {path}: {source}")]
    ArchiveWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Live discovery has no metadata for the requested broadcast.
    #[error("Broadcast not found: {0}")]
    BroadcastNotFound(String),

    /// The live-broadcast listing could not be refreshed.
    #[error("Discovery failed: {0}")]
    Discovery(String),

    /// A grouper definition is malformed.
    #[error("Invalid grouper {name}: {reason}")]
    InvalidGrouper { name: String, reason: String },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the monitor crates.
pub type Result<T> = std::result::Result<T, MonitorError>;
