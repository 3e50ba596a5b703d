//! # Hyperion
//!
//! Daily aggregation of OpenTSDB metrics, read directly from the HBase tables
//! OpenTSDB writes to instead of going through the TSD.
//!
//! ## Features
//!
//! - **Storage layout decoding**: row keys, compacted qualifiers, integer and float values
//! - **Identifier resolution**: name/id lookups against the uid table, with a shared cache
//! - **Daily aggregation**: avg/max/min per series over one UTC day
//! - **Serving**: HTTP API and CLI
//!
//! ## Modules
//!
//! - [`tsdb`]: Row key and column decoding
//! - [`store`]: Key-value store access (HBase REST gateway, in-memory)
//! - [`uid`]: Identifier resolution and caching
//! - [`task`]: Daily collection tasks and aggregation
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hyperion::config::Config;
//! use hyperion::store::RestStore;
//! use hyperion::task::CollectionTask;
//! use hyperion::uid::UidCache;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default()?;
//!     let store = Arc::new(RestStore::new(config.rest_config())?);
//!
//!     let task = CollectionTask::new(store, Arc::new(UidCache::new()), config.task_options());
//!     for result in task.run("sys.cpu.usage", "2015-03-24").await? {
//!         println!("{}", result);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod store;
pub mod task;
pub mod tsdb;
pub mod uid;

// Re-export top-level types for convenience
pub use tsdb::{DataPoint, DecodeError, KeyLayout, RowKey, SeriesKey, TagPair};

pub use store::{MemoryStore, RestConfig, RestStore, StoreClient, StoreError};

pub use uid::{UidCache, UidError, UidKind, UidResolver};

pub use task::{AggregateResult, CollectionTask, DailyQuery, DecodePolicy, TaskError, TaskOptions};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig};
