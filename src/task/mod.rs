//! Daily collection tasks
//!
//! A task scans one metric over one UTC day, decodes every row and column,
//! aggregates per series and resolves the series identifiers to names:
//!
//! ```text
//! DailyQuery → metric id → scan [day start, day end) → decode → aggregate → resolve
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use hyperion::store::{RestConfig, RestStore, StoreClient};
//! use hyperion::task::{CollectionTask, TaskOptions};
//! use hyperion::uid::UidCache;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store: Arc<dyn StoreClient> = Arc::new(RestStore::new(RestConfig::default())?);
//!     let task = CollectionTask::new(store, Arc::new(UidCache::new()), TaskOptions::default());
//!
//!     for result in task.run("sys.cpu.usage", "2015-03-24").await? {
//!         println!("{}", result);
//!     }
//!     Ok(())
//! }
//! ```

mod aggregator;
mod collector;

pub use aggregator::{SeriesAggregator, Summary};
pub use collector::{
    CollectionTask, DailyQuery, DecodePolicy, TaskOptions, DAY_SECS, DEFAULT_DATA_TABLE,
    DEFAULT_FAMILY, DEFAULT_MAX_ROWS,
};

use crate::store::StoreError;
use crate::tsdb::DecodeError;
use crate::uid::UidError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Aggregates of one series over one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    /// Metric name
    pub metric: String,
    /// Tag key name → tag value name
    pub tags: BTreeMap<String, String>,
    pub avg: f64,
    pub max: f64,
    pub min: f64,
    /// Number of data points aggregated
    pub count: usize,
}

impl fmt::Display for AggregateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<String> = self
            .tags
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(
            f,
            "metric={}, tags={{{}}} avg={:.6} max={:.6} min={:.6}",
            self.metric,
            tags.join(", "),
            self.avg,
            self.max,
            self.min
        )
    }
}

/// Errors that abort a task
#[derive(Error, Debug)]
pub enum TaskError {
    /// Day is not a `YYYY-MM-DD` date in the supported range
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Metric name has no id in the uid table
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// A series identifier could not be resolved to a name
    #[error("Identifier not found: {0}")]
    IdentifierNotFound(UidError),

    /// A row key or column could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The store could not be reached or failed the request
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl From<UidError> for TaskError {
    fn from(err: UidError) -> Self {
        match err {
            UidError::Store(e) => TaskError::StoreUnavailable(e),
            other => TaskError::IdentifierNotFound(other),
        }
    }
}

/// Result type for task operations
pub type TaskResult<T> = Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uid::UidKind;

    #[test]
    fn test_result_display() {
        let mut tags = BTreeMap::new();
        tags.insert("host".to_string(), "web01".to_string());
        tags.insert("cpu".to_string(), "0".to_string());

        let result = AggregateResult {
            metric: "sys.cpu.usage".to_string(),
            tags,
            avg: 2.0,
            max: 3.0,
            min: 1.0,
            count: 3,
        };

        assert_eq!(
            result.to_string(),
            "metric=sys.cpu.usage, tags={cpu=0, host=web01} avg=2.000000 max=3.000000 min=1.000000"
        );
    }

    #[test]
    fn test_result_serialization() {
        let result = AggregateResult {
            metric: "m".to_string(),
            tags: BTreeMap::new(),
            avg: 10.0,
            max: 10.0,
            min: 10.0,
            count: 1,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["metric"], "m");
        assert_eq!(json["avg"], 10.0);
        assert!(json["tags"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_uid_error_conversion() {
        let err: TaskError = UidError::Store(StoreError::Unavailable("down".to_string())).into();
        assert!(matches!(err, TaskError::StoreUnavailable(_)));

        let err: TaskError = UidError::NotFound {
            kind: UidKind::TagKey,
            key: "000001".to_string(),
            cells: 2,
        }
        .into();
        assert!(matches!(err, TaskError::IdentifierNotFound(_)));
    }
}
