//! Index Shard Module
//!
//! One shard owns one index file holding the entries for the keys routed
//! to it. The file is written by a `ShardWriter` during the build and
//! served by a `ShardReader` afterwards.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Entry 0: Key (8) | ValueSize (8) | ValuePosition (8)    │
//! ├─────────────────────────────────────────────────────────┤
//! │ Entry 1: Key (8) | ValueSize (8) | ValuePosition (8)    │
//! ├─────────────────────────────────────────────────────────┤
//! │ ... (ascending by key once the shard is finished)       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//! No header, no footer: the entry count is `file_size / 24`.

mod reader;
mod writer;

use std::path::{Path, PathBuf};

pub use reader::ShardReader;
pub use writer::ShardWriter;

/// Summary of a finished shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardMeta {
    /// Shard number
    pub shard: usize,
    /// Number of entries in the shard
    pub entry_count: u64,
    /// Smallest key (None for an empty shard)
    pub min_key: Option<u64>,
    /// Largest key (None for an empty shard)
    pub max_key: Option<u64>,
    /// File size in bytes
    pub file_size: u64,
}

/// File path of a shard: "{dir}/index_{shard}.idx"
pub fn shard_path(dir: &Path, shard: usize) -> PathBuf {
    dir.join(format!("index_{}.idx", shard))
}

/// Shard number encoded in a shard file name, if it is one
pub fn shard_number(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix("index_")?
        .strip_suffix(".idx")?
        .parse()
        .ok()
}
