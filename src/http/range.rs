//! HTTP Range request resolution
//!
//! Turns a `Range` header into a validated byte interval of a resource, compliant
//! with RFC 7233 for the single-range `bytes` unit.

use crate::error::MediaError;

/// Inclusive byte interval within a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteInterval {
    pub start: u64,
    pub end: u64,
}

impl ByteInterval {
    /// Number of bytes covered, `end - start + 1`
    #[inline]
    pub const fn chunk_size(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Outcome of resolving a Range header against a resource length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// No usable Range header, serve everything with 200
    Full(ByteInterval),
    /// Satisfiable explicit range, serve with 206
    Partial(ByteInterval),
}

impl Resolution {
    pub const fn interval(&self) -> ByteInterval {
        match self {
            Self::Full(i) | Self::Partial(i) => *i,
        }
    }
}

/// Resolve a Range header (single range, bytes unit) against `total_size`
///
/// Supported formats:
/// - `bytes=start-end` - Specific range, `end` clamped to the last byte
/// - `bytes=start-` - From start to end
/// - `bytes=-suffix` - Last suffix bytes
///
/// Anything else (other units, multiple ranges, garbage) falls back to the full
/// resource.
///
/// # Examples
/// ```ignore
/// let r = resolve(Some("bytes=500-"), 1000).unwrap();
/// assert_eq!(r, Resolution::Partial(ByteInterval { start: 500, end: 999 }));
/// ```
pub fn resolve(range_header: Option<&str>, total_size: u64) -> Result<Resolution, MediaError> {
    if total_size == 0 {
        return Err(MediaError::EmptyResource);
    }

    let full = Resolution::Full(ByteInterval {
        start: 0,
        end: total_size - 1,
    });

    let Some(spec) = range_header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return Ok(full); // Absent or not bytes unit
    };

    // Multi-range is not served, fall back to full content
    if spec.contains(',') {
        return Ok(full);
    }

    let Some((start_str, end_str)) = spec.split_once('-') else {
        return Ok(full);
    };
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    let resolved = if start_str.is_empty() {
        resolve_suffix(end_str, total_size)
    } else {
        resolve_standard(start_str, end_str, total_size)
    };

    Ok(resolved?.map_or(full, Resolution::Partial))
}

/// Suffix range, e.g. "-500". `Ok(None)` means malformed.
fn resolve_suffix(suffix_str: &str, total_size: u64) -> Result<Option<ByteInterval>, MediaError> {
    let Some(suffix) = parse_position(suffix_str) else {
        return Ok(None);
    };

    if suffix == 0 {
        return Err(MediaError::RangeNotSatisfiable { total_size });
    }

    // Suffix longer than the resource selects all of it
    Ok(Some(ByteInterval {
        start: total_size.saturating_sub(suffix),
        end: total_size - 1,
    }))
}

/// Standard range, e.g. "0-99" or "100-". `Ok(None)` means malformed.
fn resolve_standard(
    start_str: &str,
    end_str: &str,
    total_size: u64,
) -> Result<Option<ByteInterval>, MediaError> {
    let Some(start) = parse_position(start_str) else {
        return Ok(None);
    };

    let end = if end_str.is_empty() {
        total_size - 1
    } else {
        let Some(e) = parse_position(end_str) else {
            return Ok(None);
        };
        e.min(total_size - 1)
    };

    if start >= total_size || start > end {
        return Err(MediaError::RangeNotSatisfiable { total_size });
    }

    Ok(Some(ByteInterval { start, end }))
}

/// Digits only; `u64::from_str` alone would accept a leading '+'
fn parse_position(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
