//! Size and duration helpers for the command line.

use std::time::Duration;

use crate::error::{FastIndexError, Result};

pub const KB: u64 = 1024;
pub const MB: u64 = 1024 * KB;
pub const GB: u64 = 1024 * MB;
pub const TB: u64 = 1024 * GB;

/// Parse a size such as "16G", "128M" or "4096" into bytes
///
/// Suffixes K, M, G and T (either case) are powers of 1024; a bare number
/// is a byte count.
pub fn parse_size(size: &str) -> Result<u64> {
    let size = size.trim();
    let invalid = || FastIndexError::InvalidSize(size.to_string());

    let (digits, unit) = match size.chars().last() {
        Some('K' | 'k') => (&size[..size.len() - 1], KB),
        Some('M' | 'm') => (&size[..size.len() - 1], MB),
        Some('G' | 'g') => (&size[..size.len() - 1], GB),
        Some('T' | 't') => (&size[..size.len() - 1], TB),
        Some(_) => (size, 1),
        None => return Err(invalid()),
    };

    let n: u64 = digits.parse().map_err(|_| invalid())?;
    n.checked_mul(unit).ok_or_else(invalid)
}

/// Coarse human-readable duration: "850ns", "12us", "3ms", "42s", "5min", "2h"
pub fn readable_duration(d: Duration) -> String {
    let ns = d.as_nanos();
    match ns {
        n if n < 1_000 => format!("{}ns", n),
        n if n < 1_000_000 => format!("{}us", n / 1_000),
        n if n < 1_000_000_000 => format!("{}ms", n / 1_000_000),
        n if n < 60 * 1_000_000_000 => format!("{}s", n / 1_000_000_000),
        n if n < 60 * 60 * 1_000_000_000 => format!("{}min", n / (60 * 1_000_000_000)),
        n if n < 24 * 60 * 60 * 1_000_000_000 => format!("{}h", n / (60 * 60 * 1_000_000_000)),
        _ => "a century...".to_string(),
    }
}
