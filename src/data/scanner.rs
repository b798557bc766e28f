//! Data File Scanner
//!
//! Sequential iteration over all records in a data file through a bounded
//! read buffer.

use std::fs::File;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::DEFAULT_MAX_RECORD_SIZE;
use crate::error::{FastIndexError, Result};
use crate::record::{decode_data_record, Decoded, IndexEntry, RECORD_OVERHEAD};

use super::read_full_at;

/// Header fields of one record plus where it starts in the data file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedRecord {
    /// Absolute offset of the record's KeySize field
    pub offset: u64,
    pub key: u64,
    pub key_size: u64,
    pub value_size: u64,
}

impl ScannedRecord {
    /// Absolute offset of the value's first byte
    pub fn value_position(&self) -> u64 {
        self.offset + RECORD_OVERHEAD + self.key_size
    }

    /// Total bytes this record occupies in the data file
    pub fn encoded_len(&self) -> u64 {
        RECORD_OVERHEAD + self.key_size + self.value_size
    }

    /// The index entry pointing at this record's value
    pub fn index_entry(&self) -> IndexEntry {
        IndexEntry::new(self.key, self.value_size, self.value_position())
    }
}

/// Forward-only iterator over the records of a data file
///
/// Reads one chunk at a time. A record that straddles the end of a chunk
/// is not consumed; the next chunk is re-read starting at that record, so
/// it is decoded whole. When even the first record of a chunk does not
/// fit, the buffer grows to the record's length. Any record longer than
/// `max_record_size` (256 MiB unless set) fails the scan, whatever the
/// chunk size.
pub struct DataScanner {
    file: File,
    buf: Vec<u8>,
    /// Absolute file offset of `buf[0]`
    chunk_start: u64,
    /// Valid bytes in `buf`
    len: usize,
    /// Decode position within `buf`
    pos: usize,
    /// The last read came back short; nothing follows `buf[..len]`
    exhausted: bool,
    done: bool,
    max_record_size: u64,
    strict: bool,
    bytes_consumed: u64,
}

impl DataScanner {
    /// Open a data file for scanning with the given chunk size
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(FastIndexError::Config("scan chunk size must be non-zero".into()));
        }

        let file = File::open(path)?;

        Ok(Self {
            file,
            buf: vec![0u8; chunk_size],
            chunk_start: 0,
            len: 0,
            pos: 0,
            exhausted: false,
            done: false,
            max_record_size: DEFAULT_MAX_RECORD_SIZE,
            strict: false,
            bytes_consumed: 0,
        })
    }

    /// Cap the size a single record may have
    pub fn max_record_size(mut self, limit: u64) -> Self {
        self.max_record_size = limit;
        self
    }

    /// Report a truncated trailing record as an error instead of dropping it
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Bytes covered by the records yielded so far
    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    /// Current chunk buffer capacity
    pub fn chunk_size(&self) -> usize {
        self.buf.len()
    }

    /// Re-read the buffer starting at the first unconsumed byte
    fn refill(&mut self) -> Result<()> {
        self.chunk_start += self.pos as u64;
        self.pos = 0;
        self.len = read_full_at(&self.file, &mut self.buf, self.chunk_start)?;
        self.exhausted = self.len < self.buf.len();
        Ok(())
    }

    fn too_large(&self, offset: u64, size: u64) -> FastIndexError {
        FastIndexError::RecordTooLarge {
            offset,
            size,
            limit: self.max_record_size,
        }
    }

    fn fail(&mut self, err: FastIndexError) -> Option<Result<ScannedRecord>> {
        self.done = true;
        Some(Err(err))
    }
}

impl Iterator for DataScanner {
    type Item = Result<ScannedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            // Buffer drained: load the next chunk or stop at EOF
            if self.pos >= self.len {
                if self.exhausted {
                    self.done = true;
                    return None;
                }
                if let Err(e) = self.refill() {
                    return self.fail(e);
                }
                continue;
            }

            let offset = self.chunk_start + self.pos as u64;

            match decode_data_record(&self.buf[..self.len], self.pos) {
                Ok(Decoded::Record(record)) => {
                    if record.encoded_len > self.max_record_size {
                        let err = self.too_large(offset, record.encoded_len);
                        return self.fail(err);
                    }
                    let scanned = ScannedRecord {
                        offset,
                        key: record.key,
                        key_size: record.key_bytes.len() as u64,
                        value_size: record.value_size,
                    };
                    self.pos += record.encoded_len as usize;
                    self.bytes_consumed += record.encoded_len;
                    return Some(Ok(scanned));
                }
                Ok(Decoded::Incomplete { needed }) => {
                    if needed > self.max_record_size {
                        let err = self.too_large(offset, needed);
                        return self.fail(err);
                    }

                    if self.exhausted {
                        self.done = true;
                        let trailing = (self.len - self.pos) as u64;
                        if self.strict {
                            return Some(Err(FastIndexError::TruncatedRecord { offset, trailing }));
                        }
                        warn!(offset, trailing, "Dropping truncated record at end of data file");
                        return None;
                    }

                    if needed > self.buf.len() as u64 {
                        debug!(offset, needed, "Growing scan buffer for oversized record");
                        self.buf.resize(needed as usize, 0);
                    }

                    if let Err(e) = self.refill() {
                        return self.fail(e);
                    }
                }
                Err(FastIndexError::Corrupt(msg)) => {
                    return self.fail(FastIndexError::Corrupt(format!(
                        "record at offset {}: {}",
                        offset, msg
                    )));
                }
                Err(e) => return self.fail(e),
            }
        }
    }
}
