//! Record Module
//!
//! The two fixed binary layouts FastIndex reads and writes.
//!
//! ## Data Record (data file)
//! ```text
//! ┌──────────────┬──────────────┬────────────────┬──────────────────┐
//! │ KeySize (8)  │ Key (KeySize)│ ValueSize (8)  │ Value (ValueSize)│
//! └──────────────┴──────────────┴────────────────┴──────────────────┘
//! ```
//!
//! ## Index Entry (shard files)
//! ```text
//! ┌──────────────┬──────────────┬──────────────────┐
//! │   Key (8)    │ ValueSize (8)│ ValuePosition (8)│
//! └──────────────┴──────────────┴──────────────────┘
//! ```
//!
//! All integers are big-endian, so a byte-wise comparison of two encoded
//! keys orders them the same way as a numeric comparison.

mod codec;

pub use codec::{
    decode_data_record, decode_index_entry, encode_data_record, encode_index_entry,
};

/// Width of every size field in a data record
pub const SIZE_FIELD_LEN: u64 = 8;

/// Bytes of a data record that are not key or value: KeySize + ValueSize
pub const RECORD_OVERHEAD: u64 = 2 * SIZE_FIELD_LEN;

/// Widest key the index can hold
pub const MAX_KEY_SIZE: u64 = 8;

/// Size of one index entry
pub const ENTRY_SIZE: usize = 24;

/// A complete data record borrowed from a read buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRecord<'a> {
    /// Raw key bytes as stored
    pub key_bytes: &'a [u8],
    /// Key decoded as a big-endian integer
    pub key: u64,
    /// Raw ValueSize field
    pub value_size_bytes: &'a [u8],
    pub value_size: u64,
    pub value: &'a [u8],
    /// Header + key + value length
    pub encoded_len: u64,
}

impl DataRecord<'_> {
    /// Offset of the value's first byte, relative to the record start
    pub fn value_offset(&self) -> u64 {
        RECORD_OVERHEAD + self.key_bytes.len() as u64
    }
}

/// Outcome of decoding at a buffer offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded<'a> {
    /// A whole record was available
    Record(DataRecord<'a>),

    /// The buffer ends inside the record; at least `needed` bytes from the
    /// decode offset are required before decoding can make progress
    Incomplete { needed: u64 },
}

/// One 24-byte index entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexEntry {
    pub key: u64,
    pub value_size: u64,
    /// Absolute data-file offset of the value's first byte
    pub value_position: u64,
}

impl IndexEntry {
    pub fn new(key: u64, value_size: u64, value_position: u64) -> Self {
        Self {
            key,
            value_size,
            value_position,
        }
    }

    /// Where the value lives in the data file
    pub fn location(&self) -> ValueLocation {
        ValueLocation {
            size: self.value_size,
            position: self.value_position,
        }
    }
}

/// Result of a successful index lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueLocation {
    /// Value length in bytes
    pub size: u64,
    /// Absolute byte offset in the data file
    pub position: u64,
}
