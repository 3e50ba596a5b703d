//! Key-value store access
//!
//! The decoding core only talks to the store through [`StoreClient`]:
//!
//! - **get**: point lookup of one cell (identifier tables)
//! - **open_scanner / fetch_rows / close_scanner**: range scans (data table)
//!
//! Backends:
//!
//! - [`RestStore`]: HBase REST gateway over HTTP
//! - [`MemoryStore`]: ordered in-memory tables
//!
//! Neither backend retries. Timeouts are configured on the client.

pub mod memory;
pub mod rest;

pub use memory::MemoryStore;
pub use rest::{RestConfig, RestStore};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors returned by store backends
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transport failure, timeout or server-side error
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with something we cannot interpret
    #[error("Unexpected store response: {0}")]
    Protocol(String),

    /// Scanner handle is unknown or already closed
    #[error("Unknown scanner: {0}")]
    UnknownScanner(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A single cell returned by a point lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Full column name (`family:qualifier`)
    pub column: Vec<u8>,
    pub value: Vec<u8>,
}

/// A row returned by a scan: key plus every matching column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub key: Vec<u8>,
    /// Full column name (`family:qualifier`) → cell value
    pub columns: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl Row {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            columns: BTreeMap::new(),
        }
    }

    /// Builder method: add a column
    pub fn column(mut self, column: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        self.columns.insert(column.into(), value.into());
        self
    }
}

/// Range scan request: rows in `[start_row, stop_row)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSpec {
    pub table: String,
    pub start_row: Vec<u8>,
    /// Exclusive. Empty means unbounded.
    pub stop_row: Vec<u8>,
    /// Column families (`t`) or full column names (`t:q`). Empty means all.
    pub columns: Vec<String>,
}

impl ScanSpec {
    pub fn new(table: impl Into<String>, start_row: Vec<u8>, stop_row: Vec<u8>) -> Self {
        Self {
            table: table.into(),
            start_row,
            stop_row,
            columns: Vec::new(),
        }
    }

    /// Builder method: restrict to a family or column
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }
}

/// Opaque handle of an open scanner
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScannerId(String);

impl ScannerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScannerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read access to the key-value store
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Fetch the cells of one column of one row. Zero or one cell is expected.
    async fn get(&self, table: &str, row: &[u8], column: &str) -> StoreResult<Vec<Cell>>;

    /// Open a scanner over a row range
    async fn open_scanner(&self, spec: &ScanSpec) -> StoreResult<ScannerId>;

    /// Fetch up to `max_rows` rows from an open scanner
    async fn fetch_rows(&self, scanner: &ScannerId, max_rows: usize) -> StoreResult<Vec<Row>>;

    /// Release a scanner
    async fn close_scanner(&self, scanner: ScannerId) -> StoreResult<()>;
}

/// Open a scanner, fetch up to `max_rows` rows and close it.
///
/// The scanner is closed whether or not the fetch succeeded. A failure to
/// close after a successful fetch is logged and does not discard the rows.
pub async fn scan_all(
    store: &dyn StoreClient,
    spec: &ScanSpec,
    max_rows: usize,
) -> StoreResult<Vec<Row>> {
    let scanner = store.open_scanner(spec).await?;
    tracing::debug!(table = %spec.table, scanner = %scanner, "scanner opened");

    let fetched = store.fetch_rows(&scanner, max_rows).await;

    let scanner_name = scanner.to_string();
    if let Err(e) = store.close_scanner(scanner).await {
        tracing::warn!(scanner = %scanner_name, error = %e, "failed to close scanner");
    }

    fetched
}

/// Check whether a full column name is selected by a scan's column list
pub(crate) fn column_selected(columns: &[String], column: &[u8]) -> bool {
    if columns.is_empty() {
        return true;
    }

    columns.iter().any(|wanted| {
        let wanted = wanted.as_bytes();
        if wanted.contains(&b':') {
            column == wanted
        } else {
            column.len() > wanted.len()
                && column.starts_with(wanted)
                && column[wanted.len()] == b':'
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_selected() {
        let family = vec!["t".to_string()];
        assert!(column_selected(&family, b"t:\x00\x00"));
        assert!(!column_selected(&family, b"tt:\x00\x00"));
        assert!(!column_selected(&family, b"t"));

        let exact = vec!["name:metrics".to_string()];
        assert!(column_selected(&exact, b"name:metrics"));
        assert!(!column_selected(&exact, b"name:tagk"));

        assert!(column_selected(&[], b"anything"));
    }

    #[tokio::test]
    async fn test_scan_all_closes_scanner() {
        let store = MemoryStore::new();
        store.put("tsdb", b"a".to_vec(), "t:x", b"1".to_vec());
        store.put("tsdb", b"b".to_vec(), "t:x", b"2".to_vec());

        let spec = ScanSpec::new("tsdb", b"a".to_vec(), b"z".to_vec()).column("t");
        let rows = scan_all(&store, &spec, 100).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(store.scanners_opened(), 1);
        assert_eq!(store.open_scanners(), 0);
    }

    #[tokio::test]
    async fn test_scan_all_closes_scanner_on_fetch_failure() {
        let store = MemoryStore::new();
        store.put("tsdb", b"a".to_vec(), "t:x", b"1".to_vec());
        store.fail_next_fetch();

        let spec = ScanSpec::new("tsdb", Vec::new(), Vec::new());
        let result = scan_all(&store, &spec, 100).await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(store.scanners_opened(), 1);
        assert_eq!(store.open_scanners(), 0);
    }
}
