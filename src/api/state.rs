//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::store::StoreClient;
use crate::task::{CollectionTask, TaskOptions};
use crate::uid::UidCache;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Store client shared by every request
    pub store: Arc<dyn StoreClient>,
    /// Identifier cache shared by every request
    pub cache: Arc<UidCache>,
    /// Tables, layout and limits for collection tasks
    pub task_options: TaskOptions,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<dyn StoreClient>, task_options: TaskOptions, config: ApiConfig) -> Self {
        Self {
            store,
            cache: Arc::new(UidCache::new()),
            task_options,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Build a task over the shared store and cache
    pub fn task(&self) -> CollectionTask {
        CollectionTask::new(
            Arc::clone(&self.store),
            Arc::clone(&self.cache),
            self.task_options.clone(),
        )
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 42421,
            cors_origins: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
