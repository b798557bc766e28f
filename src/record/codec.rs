//! Record codec
//!
//! Encoding and decoding functions for data records and index entries.

use bytes::BufMut;

use crate::error::{FastIndexError, Result};

use super::{
    DataRecord, Decoded, IndexEntry, ENTRY_SIZE, MAX_KEY_SIZE, RECORD_OVERHEAD, SIZE_FIELD_LEN,
};

// =============================================================================
// Data Record Encoding/Decoding
// =============================================================================

/// Decode the data record starting at `offset` in `buf`
///
/// Returns `Decoded::Incomplete` when `buf` ends before the record does;
/// that is a "read more and retry" signal, not an error. Errors are
/// reserved for size fields no valid record can carry.
pub fn decode_data_record(buf: &[u8], offset: usize) -> Result<Decoded<'_>> {
    let available = buf.len().saturating_sub(offset) as u64;

    // KeySize
    if available < SIZE_FIELD_LEN {
        return Ok(Decoded::Incomplete {
            needed: RECORD_OVERHEAD,
        });
    }
    let key_size = read_u64(&buf[offset..offset + 8]);
    if key_size == 0 || key_size > MAX_KEY_SIZE {
        return Err(FastIndexError::Corrupt(format!(
            "key size {} out of range 1..={}",
            key_size, MAX_KEY_SIZE
        )));
    }

    // Key + ValueSize
    let header_len = RECORD_OVERHEAD + key_size;
    if available < header_len {
        return Ok(Decoded::Incomplete { needed: header_len });
    }
    let key_start = offset + SIZE_FIELD_LEN as usize;
    let key_end = key_start + key_size as usize;
    let key_bytes = &buf[key_start..key_end];
    let value_size_bytes = &buf[key_end..key_end + SIZE_FIELD_LEN as usize];
    let value_size = read_u64(value_size_bytes);

    // Value
    let encoded_len = header_len.checked_add(value_size).ok_or_else(|| {
        FastIndexError::Corrupt(format!("value size {} overflows record length", value_size))
    })?;
    if available < encoded_len {
        return Ok(Decoded::Incomplete {
            needed: encoded_len,
        });
    }
    let value_start = key_end + SIZE_FIELD_LEN as usize;
    let value = &buf[value_start..value_start + value_size as usize];

    Ok(Decoded::Record(DataRecord {
        key_bytes,
        key: read_u64(key_bytes),
        value_size_bytes,
        value_size,
        value,
        encoded_len,
    }))
}

/// Append one data record with an 8-byte key
///
/// Format: key_size (8) + key (8) + value_size (8) + value
pub fn encode_data_record(key: u64, value: &[u8], out: &mut impl BufMut) {
    out.put_u64(MAX_KEY_SIZE);
    out.put_u64(key);
    out.put_u64(value.len() as u64);
    out.put_slice(value);
}

// =============================================================================
// Index Entry Encoding/Decoding
// =============================================================================

/// Encode an index entry to its 24-byte form
pub fn encode_index_entry(entry: &IndexEntry) -> [u8; ENTRY_SIZE] {
    let mut bytes = [0u8; ENTRY_SIZE];
    bytes[0..8].copy_from_slice(&entry.key.to_be_bytes());
    bytes[8..16].copy_from_slice(&entry.value_size.to_be_bytes());
    bytes[16..24].copy_from_slice(&entry.value_position.to_be_bytes());
    bytes
}

/// Decode an index entry; the slice must be exactly 24 bytes
pub fn decode_index_entry(bytes: &[u8]) -> Result<IndexEntry> {
    if bytes.len() != ENTRY_SIZE {
        return Err(FastIndexError::Corrupt(format!(
            "index entry is {} bytes, expected {}",
            bytes.len(),
            ENTRY_SIZE
        )));
    }

    Ok(IndexEntry {
        key: read_u64(&bytes[0..8]),
        value_size: read_u64(&bytes[8..16]),
        value_position: read_u64(&bytes[16..24]),
    })
}

// =============================================================================
// Helpers
// =============================================================================

/// Big-endian integer from up to 8 bytes; shorter inputs are right-aligned
fn read_u64(bytes: &[u8]) -> u64 {
    let mut padded = [0u8; 8];
    padded[8 - bytes.len()..].copy_from_slice(bytes);
    u64::from_be_bytes(padded)
}
