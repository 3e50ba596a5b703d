//! Core data types for the OpenTSDB storage layout
//!
//! - `KeyLayout`: widths of the metric and tag identifiers
//! - `RowKey`: a decoded row key (metric, hour bucket, tag pairs)
//! - `SeriesKey`: the identity of one logical time series
//! - `DataPoint`: a single decoded measurement

use serde::Serialize;
use std::fmt;

/// Width of the base timestamp stored in every row key
pub const TIMESTAMP_BYTES: usize = 4;

/// Default width of metric, tag key and tag value identifiers
pub const DEFAULT_UID_WIDTH: usize = 3;

/// Widths of the opaque identifiers embedded in row keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLayout {
    /// Width of the metric identifier (W_m)
    pub metric_width: usize,
    /// Width of each tag key and tag value identifier (W_t)
    pub tag_width: usize,
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self {
            metric_width: DEFAULT_UID_WIDTH,
            tag_width: DEFAULT_UID_WIDTH,
        }
    }
}

impl KeyLayout {
    pub fn new(metric_width: usize, tag_width: usize) -> Self {
        Self {
            metric_width,
            tag_width,
        }
    }

    /// Length of a row key without any tags
    pub fn min_row_key_len(&self) -> usize {
        self.metric_width + TIMESTAMP_BYTES
    }

    /// Length of one encoded tag pair
    pub fn tag_pair_len(&self) -> usize {
        2 * self.tag_width
    }
}

/// One (tag key id, tag value id) pair from a row key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagPair {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl TagPair {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A decoded row key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowKey {
    /// Metric identifier
    pub metric_id: Vec<u8>,
    /// Hour-aligned base timestamp, seconds since epoch
    pub base_time: u32,
    /// Tag pairs, in row key order
    pub tags: Vec<TagPair>,
}

impl RowKey {
    /// The series this row belongs to (everything but the hour bucket)
    pub fn series_key(&self) -> SeriesKey {
        SeriesKey {
            metric_id: self.metric_id.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Identity of one logical time series: metric id plus all tag id pairs
///
/// Rows from different hours with equal series keys are aggregated together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub metric_id: Vec<u8>,
    pub tags: Vec<TagPair>,
}

impl SeriesKey {
    pub fn new(metric_id: impl Into<Vec<u8>>, tags: Vec<TagPair>) -> Self {
        Self {
            metric_id: metric_id.into(),
            tags,
        }
    }

    /// Concatenated form: `metric_id ‖ (tag_key ‖ tag_value)*`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.metric_id.clone();
        for pair in &self.tags {
            bytes.extend_from_slice(&pair.key);
            bytes.extend_from_slice(&pair.value);
        }
        bytes
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_hex(&self.to_bytes()))
    }
}

/// Lowercase hex rendering of raw key bytes, for logs and errors
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Numeric encoding of a stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Big-endian unsigned integer
    Integer,
    /// Big-endian IEEE-754 float
    Float,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Integer => write!(f, "integer"),
            ValueKind::Float => write!(f, "float"),
        }
    }
}

/// A single decoded measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataPoint {
    /// Unix timestamp in seconds
    pub timestamp: i64,
    /// Decoded value, integers widened to f64
    pub value: f64,
}

impl DataPoint {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}
