//! ==============================================================================
//! server.rs - REST query surface
//! ==============================================================================
//!
//! routes (all GET, json):
//!     /                         service banner + endpoint list
//!     /health                   liveness + store size
//!     /update_data              pull from the source now
//!     /sensor_data              today's readings
//!     /historical_data          ?start_date=YYYY-MM-DD&end_date=YYYY-MM-DD
//!     /data_by_date/{date}      one calendar day
//!     /data_range/{range_type}  last_7_days | last_30_days
//!
//! every failure goes through error.rs (ApiError); panics are caught by the
//! catch-panic layer and answered with a 500 json body.
//!
//! ==============================================================================

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::domain::Reading;
use crate::error::ApiError;
use crate::fetcher::Fetcher;
use crate::ingest;
use crate::query::{parse_date, DateRange, NamedRange};
use crate::store::DataStore;

// ==============================================================================
// shared state
// ==============================================================================
// cheap to clone: every handler gets the same store and fetcher.

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DataStore>,
    pub fetcher: Arc<dyn Fetcher>,
    pub api_url: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<DataStore>, fetcher: Arc<dyn Fetcher>, api_url: impl Into<Arc<str>>) -> Self {
        Self { store, fetcher, api_url: api_url.into() }
    }
}

pub const ENDPOINTS: [&str; 7] = [
    "/health",
    "/update_data",
    "/sensor_data",
    "/historical_data?start_date=YYYY-MM-DD&end_date=YYYY-MM-DD",
    "/data_by_date/YYYY-MM-DD",
    "/data_range/last_7_days",
    "/data_range/last_30_days",
];

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/health", get(health_handler))
        .route("/update_data", get(update_data_handler))
        .route("/sensor_data", get(sensor_data_handler))
        .route("/historical_data", get(historical_data_handler))
        .route("/data_by_date/:date", get(data_by_date_handler))
        .route("/data_range/:range_type", get(data_range_handler))
        .layer(CatchPanicLayer::custom(ApiError::from_panic))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(state: AppState, addr: &str) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "serving sensor data api");
    axum::serve(listener, app).await?;
    Ok(())
}

// ==============================================================================
// response shapes
// ==============================================================================

/// body of every successful data query; optional keys appear per route
#[derive(Debug, Serialize)]
pub struct DataResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_type: Option<&'static str>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    pub data: Vec<Reading>,
}

impl DataResponse {
    fn new(data: Vec<Reading>, empty_message: impl FnOnce() -> String) -> Self {
        let message = data.is_empty().then(empty_message);
        Self {
            status: "success",
            message,
            date: None,
            range_type: None,
            count: data.len(),
            date_range: None,
            data,
        }
    }
}

fn iso(t: NaiveDateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

fn now_iso() -> String {
    iso(Local::now().naive_local())
}

// ==============================================================================
// handlers
// ==============================================================================

async fn home_handler() -> Json<Value> {
    Json(json!({
        "status": "running",
        "message": "Sensor Data API is active",
        "endpoints": ENDPOINTS,
    }))
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let last_update = state
        .store
        .last_update()
        .await
        .map(|t| iso(t.naive_local()));
    Json(json!({
        "status": "healthy",
        "timestamp": now_iso(),
        "readings": state.store.len().await,
        "last_update": last_update,
    }))
}

// a source outage is "no new data", not an error; only a panic yields 500
async fn update_data_handler(State(state): State<AppState>) -> Json<Value> {
    let outcome = ingest::ingest(state.fetcher.as_ref(), &state.store, &state.api_url).await;
    Json(json!({
        "status": "success",
        "message": outcome.message(),
        "received": outcome.received,
        "added": outcome.added,
        "timestamp": now_iso(),
    }))
}

async fn sensor_data_handler(State(state): State<AppState>) -> Json<DataResponse> {
    let data = state.store.today().await;
    Json(DataResponse::new(data, || "No data available for today".to_string()))
}

/// first occurrence of `key` wins, like a form lookup
fn first_param(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
        .filter(|v| !v.is_empty())
}

async fn historical_data_handler(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<DataResponse>, ApiError> {
    let Query(pairs) = query?;
    let (Some(start), Some(end)) = (first_param(&pairs, "start_date"), first_param(&pairs, "end_date")) else {
        return Err(ApiError::BadRequest(
            "Both start_date and end_date are required (format: YYYY-MM-DD)".to_string(),
        ));
    };
    let start = parse_date(&start)?;
    let end = parse_date(&end)?;

    let data = state.store.range(start, end).await;
    let mut resp = DataResponse::new(data, || "No data available for the specified date range".to_string());
    resp.date_range = Some(DateRange { start, end });
    Ok(Json(resp))
}

async fn data_by_date_handler(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<DataResponse>, ApiError> {
    let Path(date) = path?;
    let day: NaiveDate = parse_date(&date)?;
    let data = state.store.by_date(day).await;
    let mut resp = DataResponse::new(data, || format!("No data available for {}", date));
    resp.date = Some(date);
    Ok(Json(resp))
}

async fn data_range_handler(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<DataResponse>, ApiError> {
    let Path(range_type) = path?;
    let kind: NamedRange = range_type.parse()?;
    let today = Local::now().date_naive();

    let data = state.store.named_range(kind, today).await;
    let mut resp = DataResponse::new(data, || "No data available for the specified range".to_string());
    resp.range_type = Some(kind.as_str());
    resp.date_range = Some(kind.window(today));
    Ok(Json(resp))
}
