//! In-process stand-ins for the template store, the comparison service and
//! the attendance endpoint, served over real HTTP on ephemeral ports.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use biomatch::BiometricTemplate;

/// Images starting with this prefix make the comparison service fail for that pair.
pub const CORRUPT_PREFIX: &[u8] = b"corrupt";

/// Similarity (0-100) at or above which the stub service reports a match.
pub const STUB_MATCH_SCORE: f64 = 60.0;

pub async fn serve(router: Router) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(addr)
}

/// Shared-prefix similarity, rounded to one decimal.
pub fn similarity(a: &[u8], b: &[u8]) -> f64 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 0.0;
    }
    let shared = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    ((shared as f64 / longest as f64) * 1000.0).round() / 10.0
}

fn decode_image(payload: &Value) -> Option<Vec<u8>> {
    let encoded = payload.get("image")?.as_str()?;
    base64::engine::general_purpose::STANDARD.decode(encoded).ok()
}

#[derive(Default)]
pub struct StoreStub {
    templates: Mutex<Vec<BiometricTemplate>>,
    raw_rows: Mutex<Vec<Value>>,
    unavailable: AtomicBool,
    api_keys: Mutex<Vec<String>>,
    fetches: AtomicUsize,
}

impl StoreStub {
    pub fn new(templates: Vec<BiometricTemplate>) -> Arc<Self> {
        Arc::new(Self {
            templates: Mutex::new(templates),
            ..Default::default()
        })
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Appends an arbitrary stored document, served after the typed templates.
    pub fn push_raw(&self, row: Value) {
        self.raw_rows.lock().push(row);
    }

    pub fn api_keys(&self) -> Vec<String> {
        self.api_keys.lock().clone()
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/templates", get(list_templates))
            .route("/health", get(store_health))
            .with_state(Arc::clone(self))
    }
}

async fn list_templates(
    State(stub): State<Arc<StoreStub>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if stub.unavailable.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "database offline").into_response();
    }
    stub.fetches.fetch_add(1, Ordering::SeqCst);
    if let Some(key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        stub.api_keys.lock().push(key.to_string());
    }

    let modality = query.get("modality").cloned().unwrap_or_default();
    let mut documents: Vec<Value> = stub
        .templates
        .lock()
        .iter()
        .filter(|t| t.modality.as_str() == modality)
        .filter_map(|t| serde_json::to_value(t).ok())
        .collect();
    documents.extend(
        stub.raw_rows
            .lock()
            .iter()
            .filter(|row| row["modality"] == modality.as_str())
            .cloned(),
    );
    let total = documents.len();
    Json(json!({ "documents": documents, "total": total })).into_response()
}

async fn store_health(State(stub): State<Arc<StoreStub>>) -> StatusCode {
    if stub.unavailable.load(Ordering::SeqCst) {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

/// Fingerprint comparison service that can play a cold instance: the first
/// `batch_failures` batch calls answer 503 before the service warms up.
pub struct ComparatorStub {
    batch_failures: AtomicUsize,
    reverse_batch_results: bool,
    batch_latency: Duration,
    pub compare_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
    pub health_calls: AtomicUsize,
}

impl ComparatorStub {
    fn build(batch_failures: usize, reverse_batch_results: bool, batch_latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            batch_failures: AtomicUsize::new(batch_failures),
            reverse_batch_results,
            batch_latency,
            compare_calls: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
            health_calls: AtomicUsize::new(0),
        })
    }

    pub fn healthy() -> Arc<Self> {
        Self::build(0, false, Duration::ZERO)
    }

    pub fn cold(batch_failures: usize) -> Arc<Self> {
        Self::build(batch_failures, false, Duration::ZERO)
    }

    /// Answers batches with results in reverse template order.
    pub fn reversed() -> Arc<Self> {
        Self::build(0, true, Duration::ZERO)
    }

    /// Holds every batch call for `latency` before answering.
    pub fn slow(latency: Duration) -> Arc<Self> {
        Self::build(0, false, latency)
    }

    pub fn compare_calls(&self) -> usize {
        self.compare_calls.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn health_calls(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }

    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/compare", post(compare_pair))
            .route("/batch-compare", post(batch_compare))
            .route("/health", get(comparator_health))
            .with_state(Arc::clone(self))
    }
}

fn score_entry(id: &str, probe: &[u8], candidate: &[u8]) -> Value {
    if candidate.starts_with(CORRUPT_PREFIX) {
        return json!({ "id": id, "error": "unreadable minutiae" });
    }
    let score = similarity(probe, candidate);
    json!({
        "id": id,
        "matched": score >= STUB_MATCH_SCORE,
        "score": score,
        "confidence": score,
    })
}

async fn compare_pair(State(stub): State<Arc<ComparatorStub>>, Json(body): Json<Value>) -> Response {
    stub.compare_calls.fetch_add(1, Ordering::SeqCst);

    if body["modality"] != "fingerprint" {
        return (StatusCode::BAD_REQUEST, "unsupported modality").into_response();
    }
    let (Some(a), Some(b)) = (decode_image(&body["sampleA"]), decode_image(&body["sampleB"])) else {
        return (StatusCode::BAD_REQUEST, "sampleA and sampleB are required").into_response();
    };
    if b.starts_with(CORRUPT_PREFIX) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "unreadable minutiae").into_response();
    }

    let score = similarity(&a, &b);
    Json(json!({
        "matched": score >= STUB_MATCH_SCORE,
        "score": score,
        "confidence": score,
    }))
    .into_response()
}

async fn batch_compare(State(stub): State<Arc<ComparatorStub>>, Json(body): Json<Value>) -> Response {
    stub.batch_calls.fetch_add(1, Ordering::SeqCst);

    let cold = stub
        .batch_failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if cold {
        return (StatusCode::SERVICE_UNAVAILABLE, "instance starting").into_response();
    }
    if !stub.batch_latency.is_zero() {
        tokio::time::sleep(stub.batch_latency).await;
    }

    let Some(probe) = decode_image(&body["probe"]) else {
        return (StatusCode::BAD_REQUEST, "probe is required").into_response();
    };
    let mut results: Vec<Value> = body["templates"]
        .as_array()
        .map(|templates| {
            templates
                .iter()
                .filter_map(|t| {
                    let id = t["id"].as_str()?;
                    let candidate = decode_image(&t["payload"])?;
                    Some(score_entry(id, &probe, &candidate))
                })
                .collect()
        })
        .unwrap_or_default();

    let best_match = results
        .iter()
        .filter(|r| r["matched"] == true)
        .max_by(|a, b| {
            let (a, b) = (a["score"].as_f64(), b["score"].as_f64());
            a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
        })
        .cloned();
    let total = results.len();
    if stub.reverse_batch_results {
        results.reverse();
    }

    Json(json!({
        "bestMatch": best_match,
        "totalCompared": total,
        "results": results,
    }))
    .into_response()
}

async fn comparator_health(State(stub): State<Arc<ComparatorStub>>) -> Json<Value> {
    stub.health_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "ready": true }))
}

#[derive(Default)]
pub struct AuditStub {
    records: Mutex<Vec<Value>>,
}

impl AuditStub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn records(&self) -> Vec<Value> {
        self.records.lock().clone()
    }

    /// Polls until `count` records arrived or `timeout` elapsed.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Value> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let records = self.records();
            if records.len() >= count || tokio::time::Instant::now() >= deadline {
                return records;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/attendance", post(receive_record))
            .with_state(Arc::clone(self))
    }
}

async fn receive_record(State(stub): State<Arc<AuditStub>>, Json(body): Json<Value>) -> StatusCode {
    stub.records.lock().push(body);
    StatusCode::CREATED
}
