//! Shard Reader
//!
//! Serves O(log n) key lookups by binary search over a memory-mapped,
//! sorted shard file.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use memmap2::Mmap;
use tracing::{debug, warn};

use crate::error::{FastIndexError, Result};
use crate::record::{decode_index_entry, IndexEntry, ValueLocation, ENTRY_SIZE};

use super::shard_path;

/// Serve-mode handle for a single shard file
///
/// ## Concurrency:
/// - The file is mapped on the first lookup; `OnceLock` makes concurrent
///   first lookups map it exactly once
/// - After that every lookup is a read-only scan of the mapping and needs
///   no locking
pub struct ShardReader {
    /// Shard number
    shard: usize,
    /// Path of the shard file
    path: PathBuf,
    /// Open shard file (kept for the lifetime of the mapping)
    file: File,
    /// Size recorded at open time
    file_size: u64,
    /// Lazily created read-only mapping; `None` if mapping failed
    mmap: OnceLock<Option<Mmap>>,
}

impl ShardReader {
    /// Open the file for `shard` in `dir` read-only
    ///
    /// Does not map the file yet; that happens on the first lookup.
    pub fn open(dir: &Path, shard: usize) -> Result<Self> {
        let path = shard_path(dir, shard);
        let file = File::open(&path)?;
        let file_size = file.metadata()?.len();

        if file_size % ENTRY_SIZE as u64 != 0 {
            return Err(FastIndexError::Corrupt(format!(
                "shard {} file is {} bytes, not a multiple of {}",
                shard, file_size, ENTRY_SIZE
            )));
        }

        Ok(Self {
            shard,
            path,
            file,
            file_size,
            mmap: OnceLock::new(),
        })
    }

    /// Look up a key: O(log n) binary search over the mapped entries
    ///
    /// Returns `None` when the key is not in this shard, and also when the
    /// shard cannot be mapped (logged).
    pub fn find(&self, key: u64) -> Option<ValueLocation> {
        let data = self.mapped()?;
        let count = data.len() / ENTRY_SIZE;
        let target = key.to_be_bytes();

        // First entry whose key is >= target
        let (mut lo, mut hi) = (0usize, count);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if Self::key_at(data, mid) < &target[..] {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        if lo == count {
            return None;
        }

        let start = lo * ENTRY_SIZE;
        match decode_index_entry(&data[start..start + ENTRY_SIZE]) {
            Ok(entry) if entry.key == key => Some(entry.location()),
            Ok(_) => None,
            Err(e) => {
                warn!(shard = self.shard, error = %e, "Corrupt index entry");
                None
            }
        }
    }

    /// Iterate over all entries in file order (ascending key)
    pub fn iter(&self) -> impl Iterator<Item = IndexEntry> + '_ {
        self.mapped()
            .unwrap_or_default()
            .chunks_exact(ENTRY_SIZE)
            .filter_map(|chunk| decode_index_entry(chunk).ok())
    }

    /// Number of entries in the shard
    pub fn entry_count(&self) -> u64 {
        self.file_size / ENTRY_SIZE as u64
    }

    /// Shard number
    pub fn shard(&self) -> usize {
        self.shard
    }

    /// Path of the shard file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size recorded at open time
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Whether the file has been mapped yet
    pub fn is_mapped(&self) -> bool {
        self.mmap.get().is_some()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// The mapped file contents, mapping on first use
    fn mapped(&self) -> Option<&[u8]> {
        if self.file_size == 0 {
            return Some(&[][..]);
        }
        self.mmap.get_or_init(|| self.map()).as_deref()
    }

    fn map(&self) -> Option<Mmap> {
        // SAFETY: Mmap::map is unsafe because another process could modify
        // the file while it is mapped. Shard files are only written by the
        // build, which finishes before any reader opens them, and the
        // mapping is read-only and dropped together with `self.file`.
        let mmap = match unsafe { Mmap::map(&self.file) } {
            Ok(mmap) => mmap,
            Err(e) => {
                warn!(shard = self.shard, error = %e, "Failed to map index shard");
                return None;
            }
        };

        #[cfg(unix)]
        {
            if let Err(e) = mmap.advise(memmap2::Advice::Random) {
                debug!(shard = self.shard, error = %e, "madvise(RANDOM) failed");
            }
        }

        debug!(shard = self.shard, bytes = mmap.len(), "Mapped index shard");
        Some(mmap)
    }

    /// Key bytes of the entry at `index`
    fn key_at(data: &[u8], index: usize) -> &[u8] {
        let start = index * ENTRY_SIZE;
        &data[start..start + 8]
    }
}
