//! Index Manifest
//!
//! Stamps a finished index with the shard count it was built for, so that
//! opening it with a different count fails instead of silently routing
//! keys to the wrong shard.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────────────┬───────────┐
//! │ bincode(IndexManifest)       │ CRC32 (4) │
//! └──────────────────────────────┴───────────┘
//! ```

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FastIndexError, Result};

/// Current manifest format version
const MANIFEST_VERSION: u16 = 1;

const MANIFEST_FILENAME: &str = "MANIFEST";
const MANIFEST_TMP_FILENAME: &str = "MANIFEST.tmp";

/// Metadata written after a successful build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub version: u16,
    pub shard_count: u64,
    /// Total entries across all shards
    pub entry_count: u64,
    /// Bytes of the data file covered by the index
    pub data_len: u64,
}

impl IndexManifest {
    pub fn new(shard_count: usize, entry_count: u64, data_len: u64) -> Self {
        Self {
            version: MANIFEST_VERSION,
            shard_count: shard_count as u64,
            entry_count,
            data_len,
        }
    }

    /// Manifest path inside an index directory
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILENAME)
    }

    /// Write the manifest atomically (temp file + rename)
    pub fn write(&self, dir: &Path) -> Result<()> {
        let body = bincode::serialize(self)?;
        let crc = crc32fast::hash(&body);

        let tmp_path = dir.join(MANIFEST_TMP_FILENAME);
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&body)?;
            file.write_all(&crc.to_le_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, Self::path(dir))?;

        Ok(())
    }

    /// Read and verify the manifest of an index directory
    pub fn read(dir: &Path) -> Result<Self> {
        let path = Self::path(dir);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FastIndexError::Manifest(format!(
                    "no manifest at {}, the index has not been built",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        if bytes.len() < 4 {
            return Err(FastIndexError::Manifest("manifest is truncated".into()));
        }

        let (body, crc_bytes) = bytes.split_at(bytes.len() - 4);
        let mut stored = [0u8; 4];
        stored.copy_from_slice(crc_bytes);
        if crc32fast::hash(body) != u32::from_le_bytes(stored) {
            return Err(FastIndexError::Manifest("manifest checksum mismatch".into()));
        }

        let manifest: IndexManifest = bincode::deserialize(body)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(FastIndexError::Manifest(format!(
                "unsupported manifest version: {}",
                manifest.version
            )));
        }

        Ok(manifest)
    }

    /// Remove the manifest if present
    pub fn remove(dir: &Path) -> Result<()> {
        match fs::remove_file(Self::path(dir)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Fail unless the index was built with `shard_count` shards
    pub fn check_shard_count(&self, shard_count: usize) -> Result<()> {
        if self.shard_count != shard_count as u64 {
            return Err(FastIndexError::Manifest(format!(
                "index was built with {} shards, opened with {}",
                self.shard_count, shard_count
            )));
        }
        Ok(())
    }
}
