//! Database Module
//!
//! Top-level handle that ties the data file, the index and the generator
//! together.
//!
//! ## Responsibilities
//! - Lay out `{base_dir}/data` and `{base_dir}/index`
//! - Generate a data file, build its index
//! - Open both for lookups and run random lookup workloads

use std::fs::{self, File};
use std::time::{Duration, Instant};

use rand::Rng;

use crate::config::Config;
use crate::data::{DataFileGenerator, GenerateReport};
use crate::error::{FastIndexError, Result};
use crate::index::{BuildReport, ShardedIndex};
use crate::lookup::Lookup;

/// Handle on a base directory
pub struct Db {
    /// Database configuration
    config: Config,
}

impl Db {
    /// Open a database rooted at `config.base_dir`
    ///
    /// Creates the data and index directories if they do not exist.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(config.data_dir())?;
        fs::create_dir_all(config.index_dir())?;

        Ok(Self { config })
    }

    /// Generate a fresh data file of at least `size` bytes
    pub fn create_data(&self, size: u64) -> Result<GenerateReport> {
        DataFileGenerator::new(self.config.data_path(), &self.config, size).generate()
    }

    /// Build the index for the current data file
    pub fn create_index(&self) -> Result<BuildReport> {
        ShardedIndex::build(
            &self.config.index_dir(),
            &self.config.data_path(),
            &self.config,
        )
    }

    /// Open the data file and the index for lookups
    pub fn reader(&self) -> Result<DbReader> {
        let data_file = File::open(self.config.data_path())?;
        let index = ShardedIndex::open(&self.config.index_dir(), self.config.shard_count)?;

        Ok(DbReader {
            data_file,
            index,
            max_key: self.config.max_key,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Lookup statistics for a batch of random probes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindStats {
    pub lookups: u64,
    pub hits: u64,
    pub misses: u64,
    pub errors: u64,
    /// Time spent in lookups that found their key
    pub elapsed: Duration,
}

impl FindStats {
    /// Mean latency of successful lookups
    pub fn avg_latency(&self) -> Duration {
        if self.hits == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos((self.elapsed.as_nanos() / self.hits as u128) as u64)
    }

    /// Combine stats from several workers
    pub fn merge(&mut self, other: &FindStats) {
        self.lookups += other.lookups;
        self.hits += other.hits;
        self.misses += other.misses;
        self.errors += other.errors;
        self.elapsed += other.elapsed;
    }
}

/// Opened data file + index, shareable across threads
pub struct DbReader {
    /// Data file, read with positional reads only
    data_file: File,
    index: ShardedIndex,
    max_key: u64,
}

impl DbReader {
    /// Lookup facade borrowing this reader
    pub fn lookup(&self) -> Lookup<'_> {
        Lookup::new(&self.data_file, &self.index)
    }

    /// Fetch the value stored for `key`
    pub fn find(&self, key: u64) -> Result<Vec<u8>> {
        self.lookup().find_value(key)
    }

    /// Probe `count` random keys from `[0, max_key)`
    ///
    /// Misses are expected (not every key exists); read failures are
    /// counted and logged rather than returned.
    pub fn find_loop<R: Rng + ?Sized>(&self, count: u64, rng: &mut R) -> FindStats {
        let lookup = self.lookup();
        let mut stats = FindStats::default();

        for _ in 0..count {
            let key = rng.gen_range(0..self.max_key);
            let start = Instant::now();
            stats.lookups += 1;

            match lookup.find_value(key) {
                Ok(_) => {
                    stats.hits += 1;
                    stats.elapsed += start.elapsed();
                }
                Err(FastIndexError::KeyNotFound) => stats.misses += 1,
                Err(e) => {
                    tracing::warn!(key, error = %e, "Lookup failed");
                    stats.errors += 1;
                }
            }
        }

        stats
    }

    /// The opened index
    pub fn index(&self) -> &ShardedIndex {
        &self.index
    }
}
