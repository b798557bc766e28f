//! Configuration for FastIndex
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{FastIndexError, Result};
use crate::util::{KB, MB};

/// Largest record a scan accepts unless configured otherwise
pub const DEFAULT_MAX_RECORD_SIZE: u64 = 256 * MB;

/// Main configuration for a FastIndex instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Layout Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all files
    /// Internal structure:
    ///   {base_dir}/
    ///     ├── data/data.d        (the data file)
    ///     └── index/             (index_{n}.idx shard files + MANIFEST)
    pub base_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Number of index shards. Must match between build and open.
    pub shard_count: usize,

    /// Per-shard write buffer size; the buffer is flushed once it reaches this
    pub write_buf_size: usize,

    /// Chunk size used when scanning the data file
    pub read_buf_size: usize,

    /// Largest single record the scanner will grow its buffer to hold
    pub max_record_size: u64,

    /// Fail the build on a truncated trailing record instead of dropping it
    pub strict_scan: bool,

    /// Worker threads used to flush and sort shards after the scan
    pub build_workers: usize,

    // -------------------------------------------------------------------------
    // Generator Configuration
    // -------------------------------------------------------------------------
    /// Exclusive upper bound for generated (and randomly probed) keys
    pub max_key: u64,

    /// Upper bound for generated value lengths
    pub max_value_length: u64,

    /// Generator write buffer size
    pub gen_write_buf_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./fastindex_data"),
            shard_count: 1000,
            write_buf_size: (16 * KB) as usize,
            read_buf_size: (64 * MB) as usize,
            max_record_size: DEFAULT_MAX_RECORD_SIZE,
            strict_scan: false,
            build_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            max_key: 1 << 30,
            max_value_length: KB,
            gen_write_buf_size: MB as usize,
        }
    }
}

impl Config {
    const DATA_DIR: &'static str = "data";
    const DATA_FILENAME: &'static str = "data.d";
    const INDEX_DIR: &'static str = "index";

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Directory holding the data file
    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join(Self::DATA_DIR)
    }

    /// Path of the data file
    pub fn data_path(&self) -> PathBuf {
        self.data_dir().join(Self::DATA_FILENAME)
    }

    /// Directory holding the shard files
    pub fn index_dir(&self) -> PathBuf {
        self.base_dir.join(Self::INDEX_DIR)
    }

    /// Reject settings no component can run with
    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 {
            return Err(FastIndexError::Config("shard_count must be at least 1".into()));
        }
        if self.read_buf_size == 0 {
            return Err(FastIndexError::Config("read_buf_size must be non-zero".into()));
        }
        if self.build_workers == 0 {
            return Err(FastIndexError::Config("build_workers must be at least 1".into()));
        }
        if self.max_key == 0 {
            return Err(FastIndexError::Config("max_key must be non-zero".into()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the base directory (root for data and index)
    pub fn base_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.base_dir = path.into();
        self
    }

    /// Set the number of index shards
    pub fn shard_count(mut self, count: usize) -> Self {
        self.config.shard_count = count;
        self
    }

    /// Set the per-shard flush threshold (in bytes)
    pub fn write_buf_size(mut self, size: usize) -> Self {
        self.config.write_buf_size = size;
        self
    }

    /// Set the scan chunk size (in bytes)
    pub fn read_buf_size(mut self, size: usize) -> Self {
        self.config.read_buf_size = size;
        self
    }

    /// Set the largest record the scanner accepts (in bytes)
    pub fn max_record_size(mut self, size: u64) -> Self {
        self.config.max_record_size = size;
        self
    }

    /// Fail on a truncated trailing record
    pub fn strict_scan(mut self, strict: bool) -> Self {
        self.config.strict_scan = strict;
        self
    }

    /// Set the number of shard finalize workers
    pub fn build_workers(mut self, workers: usize) -> Self {
        self.config.build_workers = workers;
        self
    }

    /// Set the exclusive key bound used by the generator
    pub fn max_key(mut self, max_key: u64) -> Self {
        self.config.max_key = max_key;
        self
    }

    /// Set the value length bound used by the generator
    pub fn max_value_length(mut self, len: u64) -> Self {
        self.config.max_value_length = len;
        self
    }

    /// Set the generator flush threshold (in bytes)
    pub fn gen_write_buf_size(mut self, size: usize) -> Self {
        self.config.gen_write_buf_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
