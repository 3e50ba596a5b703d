//! Row key codec
//!
//! Layout:
//! ```text
//! ┌──────────────┬─────────────────┬────────────────────────────────┐
//! │ metric [W_m] │ base_time [4]   │ (tag_key [W_t] tag_value [W_t])* │
//! │              │ u32 big-endian  │                                │
//! └──────────────┴─────────────────┴────────────────────────────────┘
//! ```

use crate::tsdb::error::{DecodeError, DecodeResult};
use crate::tsdb::types::{KeyLayout, RowKey, TagPair, TIMESTAMP_BYTES};

/// Decode a raw row key
pub fn decode_row_key(layout: &KeyLayout, bytes: &[u8]) -> DecodeResult<RowKey> {
    let len = bytes.len();
    let header_len = layout.min_row_key_len();

    if len < header_len {
        return Err(DecodeError::row_key(
            len,
            format!("shorter than {} bytes", header_len),
        ));
    }

    let pair_len = layout.tag_pair_len();
    let tag_region = len - header_len;
    if pair_len == 0 {
        if tag_region != 0 {
            return Err(DecodeError::row_key(len, "tag region with zero-width tags"));
        }
    } else if tag_region % pair_len != 0 {
        return Err(DecodeError::row_key(
            len,
            format!(
                "tag region of {} bytes is not a multiple of {}",
                tag_region, pair_len
            ),
        ));
    }

    let (metric_id, rest) = bytes.split_at(layout.metric_width);
    let (time_bytes, tag_bytes) = rest.split_at(TIMESTAMP_BYTES);
    let base_time = u32::from_be_bytes([time_bytes[0], time_bytes[1], time_bytes[2], time_bytes[3]]);

    let tags = if pair_len == 0 {
        Vec::new()
    } else {
        tag_bytes
            .chunks_exact(pair_len)
            .map(|pair| {
                let (key, value) = pair.split_at(layout.tag_width);
                TagPair::new(key, value)
            })
            .collect()
    };

    Ok(RowKey {
        metric_id: metric_id.to_vec(),
        base_time,
        tags,
    })
}

/// Build a scan boundary: `metric_id ‖ big-endian(timestamp)`
pub fn scan_key(metric_id: &[u8], timestamp: u32) -> Vec<u8> {
    let mut key = Vec::with_capacity(metric_id.len() + TIMESTAMP_BYTES);
    key.extend_from_slice(metric_id);
    key.extend_from_slice(&timestamp.to_be_bytes());
    key
}
