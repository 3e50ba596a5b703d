//! OpenTSDB storage layout
//!
//! Pure decoding of the rows OpenTSDB writes to its data table:
//!
//! - **types**: Row keys, series keys, data points, identifier widths
//! - **row_key**: Row key decoding and scan boundaries
//! - **qualifier**: Column qualifier and value decoding
//! - **error**: Error types
//!
//! # Read Path
//!
//! ```text
//!   Row key   → metric id, base hour, tag ids → SeriesKey
//!   Qualifier → delta + flags per entry       → DataPoint(s)
//! ```

pub mod error;
pub mod qualifier;
pub mod row_key;
pub mod types;

pub use error::{DecodeError, DecodeResult};
pub use qualifier::{decode_column, decode_entries, value_width, QualifierEntry};
pub use row_key::{decode_row_key, scan_key};
pub use types::{to_hex, DataPoint, KeyLayout, RowKey, SeriesKey, TagPair, ValueKind};
