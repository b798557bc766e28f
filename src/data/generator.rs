//! Data File Generator
//!
//! Fabricates a data file of random records for load testing.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::BytesMut;
use rand::Rng;

use crate::config::Config;
use crate::error::Result;
use crate::record::encode_data_record;

/// Summary of a generated data file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateReport {
    pub records: u64,
    pub bytes_written: u64,
}

/// Writes random records until the file reaches a target size
///
/// Keys are 8 bytes, drawn uniformly from `[0, max_key)`. The value is the
/// key's decimal string repeated at least once, so any value can be checked
/// against its key.
pub struct DataFileGenerator {
    path: PathBuf,
    max_key: u64,
    max_value_length: u64,
    max_size: u64,
    write_buf_size: usize,
}

impl DataFileGenerator {
    pub fn new(path: impl Into<PathBuf>, config: &Config, max_size: u64) -> Self {
        Self {
            path: path.into(),
            max_key: config.max_key,
            max_value_length: config.max_value_length,
            max_size,
            write_buf_size: config.gen_write_buf_size,
        }
    }

    /// Path of the file being generated
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Generate using the thread-local RNG
    pub fn generate(&self) -> Result<GenerateReport> {
        self.generate_with_rng(&mut rand::thread_rng())
    }

    /// Generate using the given RNG (seed it for reproducible files)
    pub fn generate_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<GenerateReport> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(&self.path)?;

        let flush_at = (self.write_buf_size / 2).max(1);
        let mut buf = BytesMut::with_capacity(self.write_buf_size);
        let mut report = GenerateReport::default();

        while report.bytes_written < self.max_size {
            let key = rng.gen_range(0..self.max_key.max(1));
            let value = Self::value_for(key, rng.gen_range(0..self.max_value_length.max(1)));

            let before = buf.len();
            encode_data_record(key, &value, &mut buf);
            report.bytes_written += (buf.len() - before) as u64;
            report.records += 1;

            if buf.len() >= flush_at {
                file.write_all(&buf)?;
                buf.clear();
            }
        }

        if !buf.is_empty() {
            file.write_all(&buf)?;
        }
        file.sync_all()?;

        tracing::info!(
            path = %self.path.display(),
            records = report.records,
            bytes = report.bytes_written,
            "Generated data file"
        );

        Ok(report)
    }

    /// The key's decimal string repeated to roughly `target_len` bytes
    pub fn value_for(key: u64, target_len: u64) -> Vec<u8> {
        let key_str = key.to_string();
        let repeat = (target_len / key_str.len() as u64).max(1) as usize;
        key_str.repeat(repeat).into_bytes()
    }
}
