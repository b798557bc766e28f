//! Data File Module
//!
//! Everything that touches the flat data file.
//!
//! ## Responsibilities
//! - Stream records through a bounded buffer (`DataScanner`)
//! - Produce synthetic corpora for load testing (`DataFileGenerator`)
//! - Positional reads shared by the scanner and value lookups
//!
//! ## File Format
//! ```text
//! ┌──────────┬─────────┬────────────┬─────────┬──────────┬─────────┬─────
//! │KeySize(8)│   Key   │ValueSize(8)│  Value  │KeySize(8)│   Key   │ ...
//! └──────────┴─────────┴────────────┴─────────┴──────────┴─────────┴─────
//! ```
//! Records are packed back to back with no file header or padding.

mod generator;
mod scanner;

use std::fs::File;
use std::io;

pub use generator::{DataFileGenerator, GenerateReport};
pub use scanner::{DataScanner, ScannedRecord};

/// Read into `buf` starting at `offset` until it is full or EOF
///
/// Returns the number of bytes read. Each call carries its own offset, so
/// a single `File` can serve concurrent readers.
pub(crate) fn read_full_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match read_at(file, &mut buf[filled..], offset + filled as u64) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(unix)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;
    file.read_at(buf, offset)
}

#[cfg(windows)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;
    file.seek_read(buf, offset)
}
