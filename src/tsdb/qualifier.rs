//! Column qualifier codec
//!
//! A column name is a 2-byte prefix (family byte plus `:`) followed by one or
//! more 2-byte entries. Each entry describes one stored value:
//!
//! ```text
//!  byte 0            byte 1
//! ┌────────────────┬────────┬──────┬───────────┐
//! │ delta [11..4]  │ delta  │ type │ length    │
//! │                │ [3..0] │ bit3 │ bits 2..0 │
//! └────────────────┴────────┴──────┴───────────┘
//! ```
//!
//! `delta` is the offset in seconds from the row's base time. A column with
//! several entries is a compacted column: its value is the concatenation of
//! every entry's bytes, in entry order.

use crate::tsdb::error::{DecodeError, DecodeResult};
use crate::tsdb::types::{DataPoint, ValueKind};

/// Bytes before the first entry of every qualifier
pub const QUALIFIER_PREFIX_LEN: usize = 2;

/// Bytes per qualifier entry
pub const ENTRY_LEN: usize = 2;

const TYPE_FLAG: u8 = 0x08;
const LENGTH_MASK: u8 = 0x07;

/// Width assumed when the length class is not one of the known values
pub const FALLBACK_WIDTH: usize = 4;

/// One decoded qualifier entry and the slice of the value it owns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualifierEntry {
    /// Seconds after the row's base time
    pub delta: u16,
    /// Integer or float
    pub kind: ValueKind,
    /// Value width in bytes
    pub width: usize,
    /// Start of this entry's bytes inside the cell value
    pub offset: usize,
}

impl QualifierEntry {
    /// Parse one 2-byte entry. `offset` is where its value starts.
    fn parse(bytes: [u8; ENTRY_LEN], offset: usize) -> Self {
        let delta = (u16::from(bytes[0]) << 4) | (u16::from(bytes[1]) >> 4);
        let kind = if bytes[1] & TYPE_FLAG == 0 {
            ValueKind::Integer
        } else {
            ValueKind::Float
        };

        Self {
            delta,
            kind,
            width: value_width(bytes[1] & LENGTH_MASK),
            offset,
        }
    }

    /// Byte range of this entry's value
    pub fn value_range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.width
    }
}

/// Map a length class to a value width.
///
/// Known classes are 0 → 1, 2 → 2, 3 → 4 and 4 → 8 bytes. Every other class
/// falls back to [`FALLBACK_WIDTH`].
pub fn value_width(length_flag: u8) -> usize {
    match length_flag {
        0 => 1,
        2 => 2,
        3 => 4,
        4 => 8,
        other => {
            tracing::trace!(length_flag = other, "unknown length class, assuming 4 bytes");
            FALLBACK_WIDTH
        }
    }
}

/// Decode the entries of a qualifier, assigning each its value offset
pub fn decode_entries(qualifier: &[u8]) -> DecodeResult<Vec<QualifierEntry>> {
    let len = qualifier.len();
    let body = qualifier.get(QUALIFIER_PREFIX_LEN..).unwrap_or_default();

    if body.len() < ENTRY_LEN {
        return Err(DecodeError::qualifier(len, "no entry after the prefix"));
    }
    if body.len() % ENTRY_LEN != 0 {
        return Err(DecodeError::qualifier(len, "odd entry length"));
    }

    let mut offset = 0;
    let entries = body
        .chunks_exact(ENTRY_LEN)
        .map(|chunk| {
            let entry = QualifierEntry::parse([chunk[0], chunk[1]], offset);
            offset += entry.width;
            entry
        })
        .collect();

    Ok(entries)
}

/// Decode one column into data points.
///
/// With a single entry the value is read at the declared width. With several
/// entries each one consumes the next `width` bytes of the value.
pub fn decode_column(base_time: u32, qualifier: &[u8], value: &[u8]) -> DecodeResult<Vec<DataPoint>> {
    let entries = decode_entries(qualifier)?;

    let mut points = Vec::with_capacity(entries.len());
    for entry in &entries {
        let bytes = value.get(entry.value_range()).ok_or_else(|| {
            DecodeError::qualifier(
                qualifier.len(),
                format!(
                    "value has {} bytes, entry at delta {} needs {}..{}",
                    value.len(),
                    entry.delta,
                    entry.offset,
                    entry.offset + entry.width
                ),
            )
        })?;

        let decoded = match entry.kind {
            ValueKind::Integer => read_unsigned(bytes),
            ValueKind::Float => read_float(bytes).ok_or_else(|| {
                DecodeError::qualifier(
                    qualifier.len(),
                    format!("float value cannot be {} bytes wide", entry.width),
                )
            })?,
        };

        points.push(DataPoint::new(
            i64::from(base_time) + i64::from(entry.delta),
            decoded,
        ));
    }

    Ok(points)
}

/// Big-endian unsigned integer of 1, 2, 4 or 8 bytes, widened to f64
fn read_unsigned(bytes: &[u8]) -> f64 {
    bytes
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)) as f64
}

/// Big-endian IEEE-754 float of 4 or 8 bytes
fn read_float(bytes: &[u8]) -> Option<f64> {
    match *bytes {
        [a, b, c, d] => Some(f64::from(f32::from_be_bytes([a, b, c, d]))),
        [a, b, c, d, e, f, g, h] => Some(f64::from_be_bytes([a, b, c, d, e, f, g, h])),
        _ => None,
    }
}
