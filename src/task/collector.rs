//! Collection Task
//!
//! Runs one [`DailyQuery`]: resolve the metric, scan its rows for the day,
//! decode and aggregate per series, then resolve every series to names.

use crate::store::{scan_all, Row, ScanSpec, StoreClient};
use crate::task::{AggregateResult, SeriesAggregator, Summary, TaskError, TaskResult};
use crate::tsdb::{decode_column, decode_row_key, scan_key, to_hex, DecodeError, KeyLayout, SeriesKey};
use crate::uid::{UidCache, UidError, UidKind, UidResolver, DEFAULT_UID_TABLE};
use chrono::{NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

/// Length of a collection window in seconds
pub const DAY_SECS: i64 = 86_400;

/// Default name of the data table
pub const DEFAULT_DATA_TABLE: &str = "tsdb";

/// Default data column family
pub const DEFAULT_FAMILY: &str = "t";

/// Default upper bound on rows fetched per task
pub const DEFAULT_MAX_ROWS: usize = 10_000_000;

/// What to do with a row or column that fails to decode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Abort the task with the decode error
    #[default]
    FailFast,
    /// Log a warning and leave the row or column out
    Skip,
}

impl FromStr for DecodePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" | "fail-fast" | "fail_fast" => Ok(DecodePolicy::FailFast),
            "skip" => Ok(DecodePolicy::Skip),
            other => Err(format!("unknown decode policy '{}'", other)),
        }
    }
}

impl fmt::Display for DecodePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodePolicy::FailFast => write!(f, "fail_fast"),
            DecodePolicy::Skip => write!(f, "skip"),
        }
    }
}

/// Tables, layout and limits used by a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOptions {
    pub data_table: String,
    /// Data column family. Empty scans every family.
    pub family: String,
    pub uid_table: String,
    pub max_rows: usize,
    pub layout: KeyLayout,
    pub decode_policy: DecodePolicy,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            data_table: DEFAULT_DATA_TABLE.to_string(),
            family: DEFAULT_FAMILY.to_string(),
            uid_table: DEFAULT_UID_TABLE.to_string(),
            max_rows: DEFAULT_MAX_ROWS,
            layout: KeyLayout::default(),
            decode_policy: DecodePolicy::default(),
        }
    }
}

/// One metric over one UTC day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyQuery {
    pub metric: String,
    pub day: NaiveDate,
    start: u32,
    end: u32,
}

impl DailyQuery {
    /// Parse `day` as `YYYY-MM-DD`
    pub fn new(metric: impl Into<String>, day: &str) -> TaskResult<Self> {
        let date = NaiveDate::parse_from_str(day.trim(), "%Y-%m-%d")
            .map_err(|e| TaskError::InvalidDate(format!("'{}': {}", day, e)))?;
        Self::for_date(metric, date)
    }

    /// Build a query for an already parsed date
    pub fn for_date(metric: impl Into<String>, day: NaiveDate) -> TaskResult<Self> {
        let midnight = day
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| TaskError::InvalidDate(day.to_string()))?;
        let start = Utc.from_utc_datetime(&midnight).timestamp();

        match (u32::try_from(start), u32::try_from(start + DAY_SECS)) {
            (Ok(start), Ok(end)) => Ok(Self {
                metric: metric.into(),
                day,
                start,
                end,
            }),
            _ => Err(TaskError::InvalidDate(format!(
                "{} is outside the 32-bit timestamp range",
                day
            ))),
        }
    }

    /// Midnight UTC, seconds since epoch
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Next midnight UTC (exclusive)
    pub fn end(&self) -> u32 {
        self.end
    }
}

/// Counters for one run, logged when the task finishes
#[derive(Debug, Default)]
struct RunStats {
    rows: usize,
    columns: usize,
    points: usize,
    skipped_rows: usize,
    skipped_columns: usize,
}

/// Computes daily aggregates for one metric at a time
///
/// Tasks are cheap to build. Many tasks can share one store client and one
/// [`UidCache`].
pub struct CollectionTask {
    store: Arc<dyn StoreClient>,
    resolver: UidResolver,
    options: TaskOptions,
}

impl CollectionTask {
    pub fn new(store: Arc<dyn StoreClient>, cache: Arc<UidCache>, options: TaskOptions) -> Self {
        let resolver = UidResolver::new(
            Arc::clone(&store),
            cache,
            options.uid_table.clone(),
            options.layout,
        );

        Self {
            store,
            resolver,
            options,
        }
    }

    pub fn options(&self) -> &TaskOptions {
        &self.options
    }

    pub fn resolver(&self) -> &UidResolver {
        &self.resolver
    }

    /// Parse `day` and run the task
    pub async fn run(&self, metric: &str, day: &str) -> TaskResult<Vec<AggregateResult>> {
        let query = DailyQuery::new(metric, day)?;
        self.execute(&query).await
    }

    /// Run the task. Results are sorted by metric, then tags.
    pub async fn execute(&self, query: &DailyQuery) -> TaskResult<Vec<AggregateResult>> {
        let started = Instant::now();
        let metric_id = self.resolve_metric(&query.metric).await?;

        let mut spec = ScanSpec::new(
            self.options.data_table.clone(),
            scan_key(&metric_id, query.start()),
            scan_key(&metric_id, query.end()),
        );
        if !self.options.family.is_empty() {
            spec = spec.column(self.options.family.clone());
        }

        let rows = scan_all(self.store.as_ref(), &spec, self.options.max_rows).await?;
        tracing::debug!(
            metric = %query.metric,
            day = %query.day,
            rows = rows.len(),
            "scan complete"
        );

        let mut aggregator = SeriesAggregator::new();
        let stats = self.accumulate(&rows, &mut aggregator)?;

        let mut results = Vec::with_capacity(aggregator.len());
        for (series, summary) in aggregator.finish() {
            results.push(self.resolve_series(&series, &summary).await?);
        }
        results.sort_by(|a, b| (&a.metric, &a.tags).cmp(&(&b.metric, &b.tags)));

        tracing::info!(
            metric = %query.metric,
            day = %query.day,
            rows = stats.rows,
            columns = stats.columns,
            points = stats.points,
            skipped_rows = stats.skipped_rows,
            skipped_columns = stats.skipped_columns,
            series = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "daily aggregation complete"
        );

        Ok(results)
    }

    async fn resolve_metric(&self, name: &str) -> TaskResult<Vec<u8>> {
        match self.resolver.resolve_id(UidKind::Metric, name).await {
            Ok(id) => Ok(id),
            Err(UidError::Store(e)) => Err(TaskError::StoreUnavailable(e)),
            Err(e) => {
                tracing::debug!(metric = %name, error = %e, "metric lookup failed");
                Err(TaskError::UnknownMetric(name.to_string()))
            }
        }
    }

    fn accumulate(&self, rows: &[Row], aggregator: &mut SeriesAggregator) -> TaskResult<RunStats> {
        let mut stats = RunStats::default();

        for row in rows {
            let key = match decode_row_key(&self.options.layout, &row.key) {
                Ok(key) => key,
                Err(e) => {
                    self.skip_or_fail(e, &row.key)?;
                    stats.skipped_rows += 1;
                    continue;
                }
            };
            stats.rows += 1;

            let series = key.series_key();

            for (qualifier, value) in &row.columns {
                match decode_column(key.base_time, qualifier, value) {
                    Ok(points) => {
                        stats.columns += 1;
                        stats.points += points.len();
                        aggregator.add(&series, &points);
                    }
                    Err(e) => {
                        self.skip_or_fail(e, &row.key)?;
                        stats.skipped_columns += 1;
                    }
                }
            }
        }

        Ok(stats)
    }

    fn skip_or_fail(&self, err: DecodeError, row_key: &[u8]) -> TaskResult<()> {
        match self.options.decode_policy {
            DecodePolicy::FailFast => Err(err.into()),
            DecodePolicy::Skip => {
                tracing::warn!(row = %to_hex(row_key), error = %err, "skipping undecodable data");
                Ok(())
            }
        }
    }

    async fn resolve_series(&self, series: &SeriesKey, summary: &Summary) -> TaskResult<AggregateResult> {
        let metric = self
            .resolver
            .resolve_name(UidKind::Metric, &series.metric_id)
            .await?;

        let mut tags = BTreeMap::new();
        for pair in &series.tags {
            let key = self.resolver.resolve_name(UidKind::TagKey, &pair.key).await?;
            let value = self
                .resolver
                .resolve_name(UidKind::TagValue, &pair.value)
                .await?;
            tags.insert(key, value);
        }

        Ok(AggregateResult {
            metric,
            tags,
            avg: summary.avg(),
            max: summary.max(),
            min: summary.min(),
            count: summary.count(),
        })
    }
}
