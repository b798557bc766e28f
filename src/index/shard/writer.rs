//! Shard Writer
//!
//! Accumulates entries for one shard, spills them to disk in buffered
//! batches and sorts the finished file by key.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::BytesMut;

use crate::error::{FastIndexError, Result};
use crate::record::{encode_index_entry, IndexEntry, ENTRY_SIZE};

use super::{shard_path, ShardMeta};

/// Build-mode handle for a single shard file
///
/// Not meant for concurrent callers: the build drives each writer from one
/// thread at a time.
pub struct ShardWriter {
    /// Shard number
    shard: usize,
    /// Output file path
    path: PathBuf,
    /// Shard file, opened read/write so it can be sorted in place
    file: File,
    /// Pending entries not yet written
    buf: BytesMut,
    /// Flush once `buf` holds at least this many bytes
    flush_threshold: usize,
    /// Bytes written to the file so far
    total_size: u64,
}

impl ShardWriter {
    /// Create (or truncate) the file for `shard` in `dir`
    pub fn create(dir: &Path, shard: usize, flush_threshold: usize) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let path = shard_path(dir, shard);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        Ok(Self {
            shard,
            path,
            file,
            buf: BytesMut::with_capacity(flush_threshold.max(ENTRY_SIZE)),
            flush_threshold,
            total_size: 0,
        })
    }

    /// Buffer one entry, writing the whole buffer out once it is full
    pub fn append(&mut self, entry: &IndexEntry) -> Result<()> {
        self.buf.extend_from_slice(&encode_index_entry(entry));

        if self.buf.len() >= self.flush_threshold {
            self.write_buffer()?;
        }

        Ok(())
    }

    /// Write out whatever is still buffered
    pub fn flush_remaining(&mut self) -> Result<()> {
        if !self.buf.is_empty() {
            self.write_buffer()?;
        }
        Ok(())
    }

    /// Sort the shard file by ascending key, rewriting it at offset 0
    ///
    /// Loads the whole shard into memory. Pending buffered entries are
    /// flushed first. Entries with equal keys keep their append order.
    pub fn sort_in_place(&mut self) -> Result<ShardMeta> {
        self.flush_remaining()?;

        let mut data = Vec::with_capacity(self.total_size as usize);
        self.file.seek(SeekFrom::Start(0))?;
        self.file.read_to_end(&mut data)?;

        if data.len() % ENTRY_SIZE != 0 {
            return Err(FastIndexError::Corrupt(format!(
                "shard {} file is {} bytes, not a multiple of {}",
                self.shard,
                data.len(),
                ENTRY_SIZE
            )));
        }

        let mut entries: Vec<[u8; ENTRY_SIZE]> = data
            .chunks_exact(ENTRY_SIZE)
            .map(|chunk| {
                let mut entry = [0u8; ENTRY_SIZE];
                entry.copy_from_slice(chunk);
                entry
            })
            .collect();

        // Big-endian keys: byte order is numeric order
        entries.sort_by(|a, b| a[..8].cmp(&b[..8]));

        let sorted = entries.concat();
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&sorted)?;
        self.file.flush()?;

        let key_of = |entry: &[u8; ENTRY_SIZE]| {
            let mut key = [0u8; 8];
            key.copy_from_slice(&entry[..8]);
            u64::from_be_bytes(key)
        };

        Ok(ShardMeta {
            shard: self.shard,
            entry_count: entries.len() as u64,
            min_key: entries.first().map(key_of),
            max_key: entries.last().map(key_of),
            file_size: sorted.len() as u64,
        })
    }

    /// Flush, sort and sync the shard, closing the file
    pub fn finish(mut self) -> Result<ShardMeta> {
        let meta = self.sort_in_place()?;
        self.file.sync_all()?;

        tracing::debug!(
            shard = self.shard,
            entries = meta.entry_count,
            "Shard finished"
        );

        Ok(meta)
    }

    /// Shard number
    pub fn shard(&self) -> usize {
        self.shard
    }

    /// Path of the shard file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written to disk so far
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Bytes waiting in the buffer
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    fn write_buffer(&mut self) -> Result<()> {
        let len = self.buf.len();
        self.file.write_all(&self.buf)?;
        self.buf.clear();
        self.total_size += len as u64;
        Ok(())
    }
}
