//! HBase REST gateway client
//!
//! Talks to the REST server that ships with HBase (`hbase rest start`).
//! Row keys, column names and values travel base64-encoded in JSON.
//!
//! - `GET /{table}/{row}/{column}` - point lookup (404 means no cell)
//! - `POST /{table}/scanner` - open a scanner, handle in `Location`
//! - `GET {location}` - next batch of cells, 204 when exhausted
//! - `DELETE {location}` - close the scanner

use crate::store::{Cell, Row, ScanSpec, ScannerId, StoreClient, StoreError, StoreResult};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

const JSON: &str = "application/json";

/// Configuration for the REST gateway client
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Gateway base URL (e.g., "http://127.0.0.1:8080")
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Cells requested per scanner batch
    pub scanner_batch: usize,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            request_timeout_ms: 30_000,
            scanner_batch: 10_000,
        }
    }
}

/// Store client backed by the HBase REST gateway
pub struct RestStore {
    client: Client,
    config: RestConfig,
    /// Rows read past the last `fetch_rows` limit, handed out on the next call
    pending: Mutex<HashMap<ScannerId, Vec<Row>>>,
}

#[derive(Debug, Deserialize)]
struct CellSetModel {
    #[serde(rename = "Row", default)]
    rows: Vec<RowModel>,
}

#[derive(Debug, Deserialize)]
struct RowModel {
    key: String,
    #[serde(rename = "Cell", default)]
    cells: Vec<CellModel>,
}

#[derive(Debug, Deserialize)]
struct CellModel {
    column: String,
    #[serde(rename = "$")]
    value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScannerModel {
    start_row: String,
    end_row: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    column: Vec<String>,
    batch: usize,
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Protocol(err.to_string())
        } else {
            StoreError::Unavailable(err.to_string())
        }
    }
}

impl From<base64::DecodeError> for StoreError {
    fn from(err: base64::DecodeError) -> Self {
        StoreError::Protocol(format!("invalid base64: {}", err))
    }
}

impl RestStore {
    /// Create a client. No connection is made until the first request.
    pub fn new(config: RestConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            pending: Mutex::new(HashMap::new()),
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    fn url(&self, segments: &[&[u8]]) -> String {
        let mut url = self.config.base_url.trim_end_matches('/').to_string();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode_binary(segment));
        }
        url
    }

    fn scanner_model(&self, spec: &ScanSpec) -> ScannerModel {
        ScannerModel {
            start_row: B64.encode(&spec.start_row),
            end_row: B64.encode(&spec.stop_row),
            column: spec.columns.iter().map(|c| B64.encode(c)).collect(),
            batch: self.config.scanner_batch,
        }
    }

    fn take_pending(&self, scanner: &ScannerId) -> Vec<Row> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(scanner)
            .unwrap_or_default()
    }

    fn stash_pending(&self, scanner: &ScannerId, rows: Vec<Row>) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(scanner.clone(), rows);
    }
}

/// Convert a gateway cell set into rows, merging cells of the same row
fn decode_cell_set(cell_set: CellSetModel, rows: &mut Vec<Row>) -> StoreResult<()> {
    for row_model in cell_set.rows {
        let key = B64.decode(&row_model.key)?;

        // Batched scanners may split one row over consecutive responses
        if rows.last().map_or(true, |last| last.key != key) {
            rows.push(Row::new(key));
        }

        if let Some(row) = rows.last_mut() {
            for cell in row_model.cells {
                row.columns
                    .insert(B64.decode(&cell.column)?, B64.decode(&cell.value)?);
            }
        }
    }
    Ok(())
}

fn check_status(status: StatusCode, what: &str) -> StoreResult<()> {
    if status.is_success() {
        Ok(())
    } else if status.is_server_error() {
        Err(StoreError::Unavailable(format!("{} returned {}", what, status)))
    } else {
        Err(StoreError::Protocol(format!("{} returned {}", what, status)))
    }
}

#[async_trait]
impl StoreClient for RestStore {
    async fn get(&self, table: &str, row: &[u8], column: &str) -> StoreResult<Vec<Cell>> {
        let url = self.url(&[table.as_bytes(), row, column.as_bytes()]);
        let response = self.client.get(&url).header(ACCEPT, JSON).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        check_status(response.status(), "point lookup")?;

        let cell_set: CellSetModel = response.json().await?;
        let mut rows = Vec::new();
        decode_cell_set(cell_set, &mut rows)?;

        Ok(rows
            .into_iter()
            .flat_map(|row| row.columns)
            .map(|(column, value)| Cell { column, value })
            .collect())
    }

    async fn open_scanner(&self, spec: &ScanSpec) -> StoreResult<ScannerId> {
        let url = self.url(&[spec.table.as_bytes(), b"scanner"]);
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, JSON)
            .header(ACCEPT, JSON)
            .json(&self.scanner_model(spec))
            .send()
            .await?;
        check_status(response.status(), "scanner open")?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| StoreError::Protocol("scanner open without Location header".to_string()))?;

        Ok(ScannerId::new(location))
    }

    async fn fetch_rows(&self, scanner: &ScannerId, max_rows: usize) -> StoreResult<Vec<Row>> {
        if max_rows == 0 {
            return Ok(Vec::new());
        }

        let mut rows = self.take_pending(scanner);

        // The batch limit counts cells, so the last row seen may continue in the
        // next response. A row is complete once a later key arrives or the
        // scanner is exhausted.
        while rows.len() <= max_rows {
            let response = self
                .client
                .get(scanner.as_str())
                .header(ACCEPT, JSON)
                .send()
                .await?;

            match response.status() {
                StatusCode::NO_CONTENT => break,
                StatusCode::NOT_FOUND => return Err(StoreError::UnknownScanner(scanner.to_string())),
                status => check_status(status, "scanner fetch")?,
            }

            let cell_set: CellSetModel = response.json().await?;
            if cell_set.rows.is_empty() {
                break;
            }
            decode_cell_set(cell_set, &mut rows)?;
        }

        if rows.len() > max_rows {
            let rest = rows.split_off(max_rows);
            self.stash_pending(scanner, rest);
        }
        Ok(rows)
    }

    async fn close_scanner(&self, scanner: ScannerId) -> StoreResult<()> {
        self.take_pending(&scanner);
        let response = self.client.delete(scanner.as_str()).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::UnknownScanner(scanner.to_string())),
            status => check_status(status, "scanner close"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, State},
        http::{HeaderMap, HeaderValue, StatusCode as HttpStatus},
        response::{IntoResponse, Response},
        routing::{get, post},
        Json, Router,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Minimal stand-in for the gateway: one uid cell and a two-batch scanner
    struct Gateway {
        base_url: String,
        fetches: AtomicUsize,
        deletes: AtomicUsize,
    }

    fn cell(column: &[u8], value: &[u8]) -> serde_json::Value {
        serde_json::json!({"column": B64.encode(column), "$": B64.encode(value)})
    }

    fn row(key: &[u8], cells: Vec<serde_json::Value>) -> serde_json::Value {
        serde_json::json!({"key": B64.encode(key), "Cell": cells})
    }

    fn cell_set(rows: Vec<serde_json::Value>) -> serde_json::Value {
        serde_json::json!({ "Row": rows })
    }

    async fn get_cell_or_scan(
        State(gw): State<Arc<Gateway>>,
        Path((_table, first, second)): Path<(String, String, String)>,
    ) -> Response {
        if first == "scanner" {
            return match gw.fetches.fetch_add(1, Ordering::SeqCst) {
                0 => Json(cell_set(vec![row(b"row-a", vec![cell(b"t:\x00\x00", b"\x01")])]))
                    .into_response(),
                // second batch continues row-a, then starts row-b
                1 => Json(cell_set(vec![
                    row(b"row-a", vec![cell(b"t:\x00\x10", b"\x02")]),
                    row(b"row-b", vec![cell(b"t:\x00\x00", b"\x03")]),
                ]))
                .into_response(),
                _ => HttpStatus::NO_CONTENT.into_response(),
            };
        }

        if first == "sys.cpu.usage" && second == "id:metrics" {
            return Json(cell_set(vec![row(
                b"sys.cpu.usage",
                vec![cell(b"id:metrics", b"\x00\x00\x01")],
            )]))
            .into_response();
        }
        HttpStatus::NOT_FOUND.into_response()
    }

    async fn open_scanner(State(gw): State<Arc<Gateway>>) -> Response {
        let mut headers = HeaderMap::new();
        let location = format!("{}/tsdb/scanner/42", gw.base_url);
        headers.insert("location", HeaderValue::from_str(&location).unwrap());
        (HttpStatus::CREATED, headers).into_response()
    }

    async fn close_scanner(State(gw): State<Arc<Gateway>>) -> HttpStatus {
        gw.deletes.fetch_add(1, Ordering::SeqCst);
        HttpStatus::OK
    }

    async fn spawn_gateway() -> Arc<Gateway> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let gateway = Arc::new(Gateway {
            base_url: format!("http://{}", listener.local_addr().unwrap()),
            fetches: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        });

        let router = Router::new()
            .route("/:table/scanner", post(open_scanner))
            .route(
                "/:table/:first/:second",
                get(get_cell_or_scan).delete(close_scanner),
            )
            .with_state(Arc::clone(&gateway));

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        gateway
    }

    fn store_for(gateway: &Gateway) -> RestStore {
        RestStore::new(RestConfig {
            base_url: gateway.base_url.clone(),
            request_timeout_ms: 5_000,
            scanner_batch: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_url_encodes_binary_segments() {
        let store = RestStore::new(RestConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            store.url(&[b"tsdb-uid", b"\x00\x00\x01", b"name:metrics"]),
            "http://localhost:8080/tsdb-uid/%00%00%01/name%3Ametrics"
        );
    }

    #[test]
    fn test_scanner_model_json() {
        let store = RestStore::new(RestConfig::default()).unwrap();
        let spec = ScanSpec::new("tsdb", vec![0, 0, 1], vec![0, 0, 2]).column("t");

        let json = serde_json::to_value(store.scanner_model(&spec)).unwrap();
        assert_eq!(json["startRow"], "AAAB");
        assert_eq!(json["endRow"], "AAAC");
        assert_eq!(json["column"][0], "dA==");
        assert_eq!(json["batch"], 10_000);
    }

    #[test]
    fn test_decode_cell_set_merges_split_rows() {
        let json = cell_set(vec![
            row(b"k1", vec![cell(b"t:a", b"1")]),
            row(b"k1", vec![cell(b"t:b", b"2")]),
        ]);
        let model: CellSetModel = serde_json::from_value(json).unwrap();

        let mut rows = Vec::new();
        decode_cell_set(model, &mut rows).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns.len(), 2);
    }

    #[test]
    fn test_decode_cell_set_rejects_bad_base64() {
        let json = serde_json::json!({"Row": [{"key": "***", "Cell": []}]});
        let model: CellSetModel = serde_json::from_value(json).unwrap();

        let mut rows = Vec::new();
        let result = decode_cell_set(model, &mut rows);
        assert!(matches!(result, Err(StoreError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_point_lookup_against_gateway() {
        let gateway = spawn_gateway().await;
        let store = store_for(&gateway);

        let cells = store
            .get("tsdb-uid", b"sys.cpu.usage", "id:metrics")
            .await
            .unwrap();
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].value, vec![0, 0, 1]);

        let missing = store.get("tsdb-uid", b"nope", "id:metrics").await.unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_scan_against_gateway() {
        let gateway = spawn_gateway().await;
        let store = store_for(&gateway);

        let spec = ScanSpec::new("tsdb", b"row-a".to_vec(), b"row-z".to_vec()).column("t");
        let rows = crate::store::scan_all(&store, &spec, 100).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, b"row-a".to_vec());
        assert_eq!(rows[0].columns.len(), 2);
        assert_eq!(rows[1].key, b"row-b".to_vec());
        assert_eq!(gateway.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_row_limit_keeps_split_row_whole() {
        let gateway = spawn_gateway().await;
        let store = store_for(&gateway);

        let spec = ScanSpec::new("tsdb", b"row-a".to_vec(), b"row-z".to_vec()).column("t");
        let rows = crate::store::scan_all(&store, &spec, 1).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, b"row-a".to_vec());
        assert_eq!(rows[0].columns.len(), 2);
        assert_eq!(gateway.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rows_past_limit_carry_over() {
        let gateway = spawn_gateway().await;
        let store = store_for(&gateway);

        let spec = ScanSpec::new("tsdb", b"row-a".to_vec(), b"row-z".to_vec()).column("t");
        let scanner = store.open_scanner(&spec).await.unwrap();

        let first = store.fetch_rows(&scanner, 1).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].columns.len(), 2);

        let second = store.fetch_rows(&scanner, 1).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].key, b"row-b".to_vec());

        assert!(store.fetch_rows(&scanner, 1).await.unwrap().is_empty());
        store.close_scanner(scanner).await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_gateway_is_unavailable() {
        // Port 9 (discard) is closed on test machines
        let store = RestStore::new(RestConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            request_timeout_ms: 1_000,
            scanner_batch: 1,
        })
        .unwrap();

        let result = store.get("tsdb-uid", b"x", "id:metrics").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
