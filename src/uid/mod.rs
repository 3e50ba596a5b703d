//! Identifier (UID) resolution
//!
//! OpenTSDB stores metric names, tag keys and tag values as fixed-width ids.
//! The uid table maps both ways:
//!
//! ```text
//!   row = id,   column = name:metrics | name:tagk | name:tagv → name
//!   row = name, column = id:metrics   | id:tagk   | id:tagv   → id
//! ```
//!
//! - **UidCache**: memoizes lookups for the whole process
//! - **UidResolver**: cache-first lookups through a [`StoreClient`](crate::store::StoreClient)

mod cache;
mod resolver;

pub use cache::{CacheStats, UidCache};
pub use resolver::{UidResolver, DEFAULT_UID_TABLE};

use crate::store::StoreError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Role of an identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UidKind {
    Metric,
    TagKey,
    TagValue,
}

impl UidKind {
    /// Qualifier used for this kind in the uid table
    pub fn qualifier(&self) -> &'static str {
        match self {
            UidKind::Metric => "metrics",
            UidKind::TagKey => "tagk",
            UidKind::TagValue => "tagv",
        }
    }
}

impl fmt::Display for UidKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UidKind::Metric => write!(f, "metric"),
            UidKind::TagKey => write!(f, "tag key"),
            UidKind::TagValue => write!(f, "tag value"),
        }
    }
}

/// Direction of a uid table lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lookup {
    /// id → name (`name:` family)
    Name,
    /// name → id (`id:` family)
    Id,
}

impl Lookup {
    /// Full column name for a kind, e.g. `name:tagk`
    pub fn column(&self, kind: UidKind) -> String {
        let family = match self {
            Lookup::Name => "name",
            Lookup::Id => "id",
        };
        format!("{}:{}", family, kind.qualifier())
    }
}

/// Errors that can occur while resolving identifiers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UidError {
    /// The uid table had zero or several cells where exactly one was expected
    #[error("No unique {kind} for {key}: store returned {cells} cells")]
    NotFound {
        kind: UidKind,
        key: String,
        cells: usize,
    },

    /// An id lookup returned an id of the wrong width
    #[error("{kind} id for {key} is {actual} bytes, expected {expected}")]
    WidthMismatch {
        kind: UidKind,
        key: String,
        expected: usize,
        actual: usize,
    },

    /// Store access failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for uid operations
pub type UidResult<T> = Result<T, UidError>;
