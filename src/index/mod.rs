//! Index Module
//!
//! Sharded positional index over a data file.
//!
//! ## Responsibilities
//! - Build: one sequential scan of the data file, entries routed to
//!   `key % shard_count`, then every shard flushed and sorted in parallel
//! - Serve: O(log n) lookups by binary search over memory-mapped shards
//! - Guard against opening an index with the wrong shard count (manifest)
//!
//! ## Directory Layout
//! ```text
//! {index_dir}/
//!   ├── index_0.idx
//!   ├── index_1.idx
//!   ├── ...
//!   ├── index_{n-1}.idx
//!   └── MANIFEST
//! ```

mod manifest;
mod shard;
mod sharded;

pub use manifest::IndexManifest;
pub use shard::{shard_number, shard_path, ShardMeta, ShardReader, ShardWriter};
pub use sharded::{BuildReport, ShardedIndex};
