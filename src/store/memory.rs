//! In-memory store
//!
//! Ordered tables held in `BTreeMap`s, with the same scan semantics as the
//! real store (`start <= key < stop`, family/column filters). Keeps call
//! counters so callers can check caching and scanner release.

use crate::store::{
    column_selected, Cell, Row, ScanSpec, ScannerId, StoreClient, StoreError, StoreResult,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

type Table = BTreeMap<Vec<u8>, BTreeMap<Vec<u8>, Vec<u8>>>;

/// In-memory implementation of [`StoreClient`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// table name → row key → column → value
    tables: RwLock<HashMap<String, Table>>,
    /// Open scanners with their remaining rows
    scanners: Mutex<HashMap<String, VecDeque<Row>>>,
    next_scanner: AtomicU64,
    gets: AtomicUsize,
    scanners_opened: AtomicUsize,
    offline: AtomicBool,
    fail_next_fetch: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one cell
    pub fn put(
        &self,
        table: &str,
        row: impl Into<Vec<u8>>,
        column: impl AsRef<[u8]>,
        value: impl Into<Vec<u8>>,
    ) {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        tables
            .entry(table.to_string())
            .or_default()
            .entry(row.into())
            .or_default()
            .insert(column.as_ref().to_vec(), value.into());
    }

    /// Number of point lookups served
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::Relaxed)
    }

    /// Number of scanners opened so far
    pub fn scanners_opened(&self) -> usize {
        self.scanners_opened.load(Ordering::Relaxed)
    }

    /// Number of scanners currently open
    pub fn open_scanners(&self) -> usize {
        self.scanners.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Make every call fail with `StoreError::Unavailable`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Make the next `fetch_rows` call fail with `StoreError::Unavailable`
    pub fn fail_next_fetch(&self) {
        self.fail_next_fetch.store(true, Ordering::Relaxed);
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn get(&self, table: &str, row: &[u8], column: &str) -> StoreResult<Vec<Cell>> {
        self.check_online()?;
        self.gets.fetch_add(1, Ordering::Relaxed);

        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        let cell = tables
            .get(table)
            .and_then(|t| t.get(row))
            .and_then(|columns| columns.get(column.as_bytes()))
            .map(|value| Cell {
                column: column.as_bytes().to_vec(),
                value: value.clone(),
            });

        Ok(cell.into_iter().collect())
    }

    async fn open_scanner(&self, spec: &ScanSpec) -> StoreResult<ScannerId> {
        self.check_online()?;

        let rows: VecDeque<Row> = {
            let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
            match tables.get(&spec.table) {
                Some(table) => table
                    .range(spec.start_row.clone()..)
                    .take_while(|(key, _)| spec.stop_row.is_empty() || **key < spec.stop_row)
                    .map(|(key, columns)| Row {
                        key: key.clone(),
                        columns: columns
                            .iter()
                            .filter(|(column, _)| column_selected(&spec.columns, column))
                            .map(|(c, v)| (c.clone(), v.clone()))
                            .collect(),
                    })
                    .filter(|row| !row.columns.is_empty())
                    .collect(),
                None => VecDeque::new(),
            }
        };

        let id = format!("scanner-{}", self.next_scanner.fetch_add(1, Ordering::Relaxed));
        self.scanners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone(), rows);
        self.scanners_opened.fetch_add(1, Ordering::Relaxed);

        Ok(ScannerId::new(id))
    }

    async fn fetch_rows(&self, scanner: &ScannerId, max_rows: usize) -> StoreResult<Vec<Row>> {
        self.check_online()?;
        if self.fail_next_fetch.swap(false, Ordering::Relaxed) {
            return Err(StoreError::Unavailable("fetch timed out".to_string()));
        }

        let mut scanners = self.scanners.lock().unwrap_or_else(|e| e.into_inner());
        let remaining = scanners
            .get_mut(scanner.as_str())
            .ok_or_else(|| StoreError::UnknownScanner(scanner.to_string()))?;

        let take = max_rows.min(remaining.len());
        Ok(remaining.drain(..take).collect())
    }

    async fn close_scanner(&self, scanner: ScannerId) -> StoreResult<()> {
        self.scanners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(scanner.as_str())
            .map(|_| ())
            .ok_or_else(|| StoreError::UnknownScanner(scanner.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get() {
        let store = MemoryStore::new();
        store.put("tsdb-uid", b"\x00\x00\x01".to_vec(), "name:metrics", b"sys.cpu".to_vec());

        let cells = store.get("tsdb-uid", b"\x00\x00\x01", "name:metrics").await.unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].value, b"sys.cpu".to_vec());

        let missing = store.get("tsdb-uid", b"\x00\x00\x02", "name:metrics").await.unwrap();
        assert!(missing.is_empty());

        let other_column = store.get("tsdb-uid", b"\x00\x00\x01", "name:tagk").await.unwrap();
        assert!(other_column.is_empty());

        assert_eq!(store.get_count(), 3);
    }

    #[tokio::test]
    async fn test_scan_range_is_half_open() {
        let store = MemoryStore::new();
        for key in [b"a", b"b", b"c", b"d"] {
            store.put("tsdb", key.to_vec(), "t:q", b"v".to_vec());
        }

        let spec = ScanSpec::new("tsdb", b"b".to_vec(), b"d".to_vec());
        let scanner = store.open_scanner(&spec).await.unwrap();
        let rows = store.fetch_rows(&scanner, 10).await.unwrap();
        store.close_scanner(scanner).await.unwrap();

        let keys: Vec<Vec<u8>> = rows.into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec()]);
    }

    #[tokio::test]
    async fn test_scan_filters_family_and_pages() {
        let store = MemoryStore::new();
        store.put("tsdb", b"a".to_vec(), "t:q", b"1".to_vec());
        store.put("tsdb", b"a".to_vec(), "x:q", b"2".to_vec());
        store.put("tsdb", b"b".to_vec(), "x:q", b"3".to_vec());
        store.put("tsdb", b"c".to_vec(), "t:q", b"4".to_vec());

        let spec = ScanSpec::new("tsdb", Vec::new(), Vec::new()).column("t");
        let scanner = store.open_scanner(&spec).await.unwrap();

        let first = store.fetch_rows(&scanner, 1).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].columns.len(), 1);

        let second = store.fetch_rows(&scanner, 10).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].key, b"c".to_vec());

        assert!(store.fetch_rows(&scanner, 10).await.unwrap().is_empty());
        store.close_scanner(scanner).await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_scanner_is_unknown() {
        let store = MemoryStore::new();
        let scanner = store
            .open_scanner(&ScanSpec::new("tsdb", Vec::new(), Vec::new()))
            .await
            .unwrap();
        store.close_scanner(scanner.clone()).await.unwrap();

        let result = store.fetch_rows(&scanner, 1).await;
        assert!(matches!(result, Err(StoreError::UnknownScanner(_))));
    }

    #[tokio::test]
    async fn test_offline() {
        let store = MemoryStore::new();
        store.set_offline(true);

        let result = store.get("tsdb-uid", b"x", "id:metrics").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
