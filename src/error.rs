//! Error types for FastIndex
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using FastIndexError
pub type Result<T> = std::result::Result<T, FastIndexError>;

/// Unified error type for FastIndex operations
#[derive(Debug, Error)]
pub enum FastIndexError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Short read at position {position}: expected {expected} bytes, got {actual}")]
    ShortRead {
        position: u64,
        expected: u64,
        actual: u64,
    },

    // -------------------------------------------------------------------------
    // Data File Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt data: {0}")]
    Corrupt(String),

    #[error("Record at offset {offset} is {size} bytes, exceeds limit of {limit} bytes")]
    RecordTooLarge { offset: u64, size: u64, limit: u64 },

    #[error("Truncated record at offset {offset} ({trailing} trailing bytes)")]
    TruncatedRecord { offset: u64, trailing: u64 },

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("{} shard(s) failed to build, first failure in shard {}: {}",
        .0.len(),
        .0.first().map(|(shard, _)| *shard).unwrap_or_default(),
        .0.first().map(|(_, e)| e.to_string()).unwrap_or_default())]
    ShardBuild(Vec<(usize, FastIndexError)>),

    #[error("Shard build worker panicked")]
    WorkerPanicked,

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Invalid size string: {0:?}")]
    InvalidSize(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for FastIndexError {
    fn from(e: bincode::Error) -> Self {
        FastIndexError::Serialization(e.to_string())
    }
}
