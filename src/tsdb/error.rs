//! Decode error types
//!
//! Structural failures found while reading the OpenTSDB row/column layout.

use thiserror::Error;

/// Errors that can occur while decoding row keys and columns
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Row key length does not match `metric + 4 + k * (2 * tag)`
    #[error("Malformed row key ({len} bytes): {reason}")]
    MalformedRowKey { len: usize, reason: String },

    /// Column qualifier or its value cannot be decoded
    #[error("Malformed qualifier ({len} bytes): {reason}")]
    MalformedQualifier { len: usize, reason: String },
}

impl DecodeError {
    pub(crate) fn row_key(len: usize, reason: impl Into<String>) -> Self {
        DecodeError::MalformedRowKey {
            len,
            reason: reason.into(),
        }
    }

    pub(crate) fn qualifier(len: usize, reason: impl Into<String>) -> Self {
        DecodeError::MalformedQualifier {
            len,
            reason: reason.into(),
        }
    }
}

/// Result type alias for decode operations
pub type DecodeResult<T> = Result<T, DecodeError>;
