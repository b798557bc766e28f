//! Lookup Facade
//!
//! Answers "value bytes for key" by combining an index lookup with a
//! positional read of the data file.

use std::fs::File;

use crate::data::read_full_at;
use crate::error::{FastIndexError, Result};
use crate::index::ShardedIndex;

/// Borrowed view over an opened index and its data file
///
/// Reads are positional, so one `Lookup` (or many) can be used from
/// several threads at once.
#[derive(Clone, Copy)]
pub struct Lookup<'a> {
    data_file: &'a File,
    index: &'a ShardedIndex,
}

impl<'a> Lookup<'a> {
    pub fn new(data_file: &'a File, index: &'a ShardedIndex) -> Self {
        Self { data_file, index }
    }

    /// Fetch the value stored for `key`
    ///
    /// Returns:
    /// - `Ok(value)`: key found, value read in full
    /// - `Err(KeyNotFound)`: key not in the index
    /// - `Err(ShortRead)`: the data file ends before the value does
    pub fn find_value(&self, key: u64) -> Result<Vec<u8>> {
        let location = self.index.find(key).ok_or(FastIndexError::KeyNotFound)?;

        // Entries never point past the data the index was built from
        let data_len = self.index.manifest().data_len;
        if location.position.saturating_add(location.size) > data_len {
            return Err(FastIndexError::Corrupt(format!(
                "key {} points at {}+{}, past indexed data length {}",
                key, location.position, location.size, data_len
            )));
        }

        let mut value = vec![0u8; location.size as usize];
        let read = read_full_at(self.data_file, &mut value, location.position)?;

        if read as u64 != location.size {
            return Err(FastIndexError::ShortRead {
                position: location.position,
                expected: location.size,
                actual: read as u64,
            });
        }

        Ok(value)
    }

    /// The index being served
    pub fn index(&self) -> &'a ShardedIndex {
        self.index
    }
}
