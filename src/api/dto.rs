//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.

use serde::{Deserialize, Serialize};

use crate::uid::CacheStats;

/// Query parameters of `GET /api/metric/daily`
#[derive(Debug, Default, Deserialize)]
pub struct DailyParams {
    /// Metric name
    #[serde(default)]
    pub metric: Option<String>,
    /// UTC day, `YYYY-MM-DD`
    #[serde(default)]
    pub day: Option<String>,
}

/// Full health status response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok" while the process serves requests
    pub status: String,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
    /// Identifier cache counters
    pub uid_cache: CacheStats,
}
