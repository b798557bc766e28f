//! Sharded Index
//!
//! Owns every shard of an index and routes keys between them.
//!
//! ## Responsibilities
//! - Scan the data file once and route each record to `key % shard_count`
//! - Flush and sort all shards in parallel after the scan
//! - Stamp the finished index with a manifest
//! - Open all shards for lookups and route `find` to the owning shard

use std::fs;
use std::path::{Path, PathBuf};

use crossbeam::channel;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::data::DataScanner;
use crate::error::{FastIndexError, Result};
use crate::record::ValueLocation;

use super::{shard_number, IndexManifest, ShardMeta, ShardReader, ShardWriter};

/// Outcome of a successful build
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Records indexed
    pub records: u64,
    /// Bytes of the data file covered by complete records
    pub bytes_scanned: u64,
    /// Per-shard metadata, ordered by shard number
    pub shards: Vec<ShardMeta>,
}

impl BuildReport {
    /// Total entries across all shards
    pub fn entry_count(&self) -> u64 {
        self.shards.iter().map(|m| m.entry_count).sum()
    }
}

/// A served index: one `ShardReader` per shard
///
/// ## Concurrency:
/// - Shards share no mutable state; `find` takes `&self` and is safe to
///   call from any number of threads
pub struct ShardedIndex {
    /// Directory holding the shard files
    dir: PathBuf,
    /// Readers indexed by shard number
    shards: Vec<ShardReader>,
    manifest: IndexManifest,
}

impl ShardedIndex {
    /// Build an index in `dir` from the data file at `data_path`
    ///
    /// Steps:
    /// 1. Create one writer per shard (truncating old shard files) and
    ///    delete shard files left over from a build with more shards
    /// 2. Scan the data file, appending each record's entry to its shard
    /// 3. Flush + sort every shard on a pool of `build_workers` threads
    /// 4. Write the manifest
    ///
    /// Fails if any shard fails; no manifest is written in that case, so
    /// the partial index cannot be opened.
    pub fn build(dir: &Path, data_path: &Path, config: &Config) -> Result<BuildReport> {
        config.validate()?;
        fs::create_dir_all(dir)?;
        IndexManifest::remove(dir)?;

        let shard_count = config.shard_count;
        info!(
            data = %data_path.display(),
            index = %dir.display(),
            shard_count,
            "Building index"
        );

        // Step 1: Writers
        let mut writers = (0..shard_count)
            .map(|shard| ShardWriter::create(dir, shard, config.write_buf_size))
            .collect::<Result<Vec<_>>>()?;
        Self::remove_stale_shards(dir, shard_count)?;

        // Step 2: Scan
        let mut scanner = DataScanner::open(data_path, config.read_buf_size)?
            .max_record_size(config.max_record_size)
            .strict(config.strict_scan);

        let mut records = 0u64;
        for record in &mut scanner {
            let record = record?;
            let shard = Self::shard_for(record.key, shard_count);
            writers[shard].append(&record.index_entry())?;
            records += 1;
        }
        let bytes_scanned = scanner.bytes_consumed();

        info!(records, bytes_scanned, "Data file scanned, finishing shards");

        // Step 3: Flush + sort
        let shards = Self::finish_shards(writers, config.build_workers)?;

        // Step 4: Manifest
        let report = BuildReport {
            records,
            bytes_scanned,
            shards,
        };
        IndexManifest::new(shard_count, report.entry_count(), bytes_scanned).write(dir)?;

        info!(records, shard_count, "Index built");
        Ok(report)
    }

    /// Open a built index for lookups
    ///
    /// `shard_count` must match the count the index was built with.
    pub fn open(dir: &Path, shard_count: usize) -> Result<Self> {
        if shard_count == 0 {
            return Err(FastIndexError::Config("shard_count must be at least 1".into()));
        }

        let manifest = IndexManifest::read(dir)?;
        manifest.check_shard_count(shard_count)?;

        let shards = (0..shard_count)
            .map(|shard| ShardReader::open(dir, shard))
            .collect::<Result<Vec<_>>>()?;

        info!(
            index = %dir.display(),
            shard_count,
            entries = manifest.entry_count,
            "Index opened"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            shards,
            manifest,
        })
    }

    /// Look up a key in the shard that owns it
    pub fn find(&self, key: u64) -> Option<ValueLocation> {
        self.shards[Self::shard_for(key, self.shards.len())].find(key)
    }

    /// The shard that owns `key`
    pub fn shard_for(key: u64, shard_count: usize) -> usize {
        (key % shard_count as u64) as usize
    }

    /// Get the number of shards
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Get a shard reader by number
    pub fn shard(&self, shard: usize) -> Option<&ShardReader> {
        self.shards.get(shard)
    }

    /// Get the index directory path
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the manifest the index was opened with
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Delete `index_{n}.idx` files with `n >= shard_count`
    fn remove_stale_shards(dir: &Path, shard_count: usize) -> Result<()> {
        for dir_entry in fs::read_dir(dir)? {
            let dir_entry = dir_entry?;
            let stale = dir_entry
                .file_name()
                .to_str()
                .and_then(shard_number)
                .map_or(false, |shard| shard >= shard_count);

            if stale {
                fs::remove_file(dir_entry.path())?;
                debug!(path = %dir_entry.path().display(), "Removed stale shard file");
            }
        }
        Ok(())
    }

    /// Finish every writer on a bounded worker pool and join them all
    ///
    /// A failing shard does not stop the others; all failures are reported
    /// together once every shard has been attempted.
    fn finish_shards(writers: Vec<ShardWriter>, workers: usize) -> Result<Vec<ShardMeta>> {
        let shard_count = writers.len();
        let workers = workers.clamp(1, shard_count.max(1));

        let (tx, rx) = channel::unbounded();
        for writer in writers {
            tx.send(writer).map_err(|_| FastIndexError::WorkerPanicked)?;
        }
        drop(tx);

        let metas = Mutex::new(Vec::with_capacity(shard_count));
        let failures = Mutex::new(Vec::new());

        crossbeam::thread::scope(|s| {
            for _ in 0..workers {
                let rx = rx.clone();
                let metas = &metas;
                let failures = &failures;
                s.spawn(move |_| {
                    for writer in rx.iter() {
                        let shard = writer.shard();
                        match writer.finish() {
                            Ok(meta) => metas.lock().push(meta),
                            Err(e) => {
                                error!(shard, error = %e, "Failed to finish shard");
                                failures.lock().push((shard, e));
                            }
                        }
                    }
                });
            }
        })
        .map_err(|_| FastIndexError::WorkerPanicked)?;

        let mut failures = failures.into_inner();
        if !failures.is_empty() {
            failures.sort_by_key(|(shard, _)| *shard);
            return Err(FastIndexError::ShardBuild(failures));
        }

        let mut metas = metas.into_inner();
        metas.sort_by_key(|m| m.shard);
        Ok(metas)
    }
}

#[cfg(test)]
mod tests {
    use std::fs::{self, OpenOptions};
    use std::io::Write;
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;
    use crate::index::shard_path;
    use crate::record::{decode_index_entry, IndexEntry, ENTRY_SIZE};

    /// Writers for `shard_count` shards, each holding keys in descending order
    fn unsorted_writers(dir: &Path, shard_count: usize) -> Vec<ShardWriter> {
        (0..shard_count)
            .map(|shard| {
                let mut writer = ShardWriter::create(dir, shard, ENTRY_SIZE).unwrap();
                for i in (0..5u64).rev() {
                    let key = i * shard_count as u64 + shard as u64;
                    writer.append(&IndexEntry::new(key, 1, key * 10)).unwrap();
                }
                writer
            })
            .collect()
    }

    /// Leave a partial entry at the end of the shard file
    fn corrupt(writer: &mut ShardWriter) {
        writer.flush_remaining().unwrap();
        let mut file = OpenOptions::new().append(true).open(writer.path()).unwrap();
        file.write_all(&[0xAB; 5]).unwrap();
    }

    fn keys_on_disk(dir: &Path, shard: usize) -> Vec<u64> {
        fs::read(shard_path(dir, shard))
            .unwrap()
            .chunks_exact(ENTRY_SIZE)
            .map(|chunk| decode_index_entry(chunk).unwrap().key)
            .collect()
    }

    #[test]
    fn test_finish_shards_reports_failed_shard() {
        let temp = TempDir::new().unwrap();
        let mut writers = unsorted_writers(temp.path(), 4);
        corrupt(&mut writers[2]);

        match ShardedIndex::finish_shards(writers, 2) {
            Err(FastIndexError::ShardBuild(failures)) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].0, 2);
                assert!(matches!(failures[0].1, FastIndexError::Corrupt(_)));
            }
            other => panic!("Expected ShardBuild, got {:?}", other),
        }

        // Sibling shards were still finished
        for shard in [0, 1, 3] {
            let keys = keys_on_disk(temp.path(), shard);
            assert_eq!(keys.len(), 5, "shard {}", shard);
            assert!(keys.windows(2).all(|w| w[0] <= w[1]), "shard {}", shard);
        }
    }

    #[test]
    fn test_finish_shards_failures_sorted_by_shard() {
        let temp = TempDir::new().unwrap();
        let mut writers = unsorted_writers(temp.path(), 6);
        corrupt(&mut writers[5]);
        corrupt(&mut writers[0]);
        corrupt(&mut writers[3]);

        match ShardedIndex::finish_shards(writers, 3) {
            Err(FastIndexError::ShardBuild(failures)) => {
                let shards: Vec<usize> = failures.iter().map(|(shard, _)| *shard).collect();
                assert_eq!(shards, vec![0, 3, 5]);
            }
            other => panic!("Expected ShardBuild, got {:?}", other),
        }
    }

    #[test]
    fn test_finish_shards_success_ordered_by_shard() {
        let temp = TempDir::new().unwrap();
        let writers = unsorted_writers(temp.path(), 5);

        let metas = ShardedIndex::finish_shards(writers, 8).unwrap();

        let shards: Vec<usize> = metas.iter().map(|m| m.shard).collect();
        assert_eq!(shards, vec![0, 1, 2, 3, 4]);
        assert!(metas.iter().all(|m| m.entry_count == 5));
        assert_eq!(metas[1].min_key, Some(1));
        assert_eq!(metas[1].max_key, Some(4 * 5 + 1));
    }

    #[test]
    fn test_failed_build_writes_no_manifest() {
        let temp = TempDir::new().unwrap();
        let index_dir = temp.path().join("index");
        let data_path = temp.path().join("data.d");
        let config = Config::builder()
            .base_dir(temp.path())
            .shard_count(2)
            .build();

        // Previous successful build left a manifest behind
        fs::write(&data_path, b"").unwrap();
        ShardedIndex::build(&index_dir, &data_path, &config).unwrap();
        assert!(IndexManifest::path(&index_dir).exists());

        // A value size beyond the record cap aborts the next build
        let mut bad = Vec::new();
        bad.extend_from_slice(&8u64.to_be_bytes());
        bad.extend_from_slice(&1u64.to_be_bytes());
        bad.extend_from_slice(&(1u64 << 40).to_be_bytes());
        fs::write(&data_path, &bad).unwrap();

        let result = ShardedIndex::build(&index_dir, &data_path, &config);

        assert!(matches!(result, Err(FastIndexError::RecordTooLarge { .. })));
        assert!(!IndexManifest::path(&index_dir).exists());
    }
}
