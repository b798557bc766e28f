//! # FastIndex
//!
//! A disk-backed key/value lookup engine:
//! - Flat data file of variable-length records
//! - Sharded positional index built by one scan + in-memory shard sorts
//! - O(log n) point lookups by binary search over memory-mapped shards
//! - Lock-free concurrent reads
//!
//! ## Architecture Overview
//!
//! ```text
//!   ┌─────────────────────────────────────────────────────────────┐
//!   │                     Data File (data.d)                      │
//!   │     [KeySize][Key][ValueSize][Value] [KeySize][Key]...      │
//!   └─────────────────────┬───────────────────────────────────────┘
//!                         │ DataScanner (bounded chunks)
//!                         ▼
//!   ┌─────────────────────────────────────────────────────────────┐
//!   │                       ShardedIndex                          │
//!   │                 route by key % shard_count                  │
//!   └──────┬──────────────┬──────────────────────────┬────────────┘
//!          ▼              ▼                          ▼
//!   ┌────────────┐ ┌────────────┐            ┌────────────┐
//!   │ index_0.idx│ │ index_1.idx│    ...     │index_n.idx │
//!   │ buffer →   │ │ buffer →   │            │ buffer →   │
//!   │ flush/sort │ │ flush/sort │            │ flush/sort │
//!   └──────┬─────┘ └──────┬─────┘            └──────┬─────┘
//!          └──────────────┴───────── mmap ──────────┘
//!                         │ binary search → (size, position)
//!                         ▼
//!   ┌─────────────────────────────────────────────────────────────┐
//!   │        Lookup: positional read of the data file             │
//!   └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod util;

pub mod record;
pub mod data;
pub mod index;
pub mod lookup;
pub mod db;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{FastIndexError, Result};
pub use config::Config;
pub use db::{Db, DbReader, FindStats};
pub use index::{BuildReport, ShardedIndex};
pub use lookup::Lookup;
pub use record::{IndexEntry, ValueLocation};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of FastIndex
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
