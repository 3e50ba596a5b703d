//! Daily Aggregation Route
//!
//! - GET /api/metric/daily?metric=<name>&day=<YYYY-MM-DD>

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::DailyParams;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::task::{AggregateResult, DailyQuery};

/// GET /api/metric/daily
///
/// Runs one collection task and returns one entry per series.
pub async fn daily_aggregates(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DailyParams>,
) -> ApiResult<Json<Vec<AggregateResult>>> {
    let metric = required(params.metric, "metric")?;
    let day = required(params.day, "day")?;

    let query = DailyQuery::new(metric, &day)?;
    let results = state.task().execute(&query).await?;

    tracing::debug!(
        metric = %query.metric,
        day = %query.day,
        series = results.len(),
        "served daily aggregates"
    );

    Ok(Json(results))
}

fn required(value: Option<String>, name: &str) -> ApiResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::Validation(format!("{} is required", name))),
    }
}
