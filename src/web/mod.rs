//! HTTP surface over the inventory service.
//!
//! - `POST /inventory/{key}` with `{"quantityChange": n}`: 200 applied, 400 rejected
//! - `GET /inventory/{key}`: current level
//! - `POST /inventory/random-update`: same as the keyed POST on a random pool key
//! - `GET /inventory`: every stored level
//! - `GET /benchmark`: runs the load generator against this service
//!
//! The key `random-update` is reserved: its path belongs to the random-update
//! route, so `GET /inventory/random-update` answers 405 and a POST there picks
//! a pool key. Keys are a single path segment; clients percent-encode them.

use crate::config::{KeyDistribution, LoadTestConfig};
use crate::core::{InventoryError, Key, Quantity, UpdateRequest};
use crate::load_test::LoadGenerator;
use crate::service::InventoryService;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub enum WebError {
    Inventory(InventoryError),
    Input(String),
    Rejected(String),
}

impl From<InventoryError> for WebError {
    fn from(err: InventoryError) -> Self {
        WebError::Inventory(err)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            WebError::Inventory(InventoryError::Config(msg)) => {
                (StatusCode::BAD_REQUEST, msg, "invalid_config".to_string())
            }
            WebError::Inventory(err) if err.is_retryable() => (
                StatusCode::SERVICE_UNAVAILABLE,
                err.to_string(),
                "store_unavailable".to_string(),
            ),
            WebError::Inventory(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                err.to_string(),
                "internal_error".to_string(),
            ),
            WebError::Input(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                msg,
                "input_error".to_string(),
            ),
            WebError::Rejected(msg) => (StatusCode::BAD_REQUEST, msg, "rejected".to_string()),
        };

        let body = Json(ErrorResponse {
            error: message,
            code,
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;

/// Path segment of the random-update route; not addressable as a key.
pub const RANDOM_UPDATE_SEGMENT: &str = "random-update";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InventoryService>,
    pub random_key_pool: Arc<[Key]>,
}

impl AppState {
    pub fn new(service: Arc<InventoryService>, random_key_pool: Vec<Key>) -> Self {
        Self {
            service,
            random_key_pool: random_key_pool.into(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/inventory", get(list_inventory))
        .route(
            &format!("/inventory/{}", RANDOM_UPDATE_SEGMENT),
            post(random_update),
        )
        .route("/inventory/:key", get(get_inventory).post(update_inventory))
        .route("/benchmark", get(run_benchmark))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn apply_update(state: &AppState, key: &str, delta: i64) -> Result<&'static str> {
    if state.service.update(key, delta).await? {
        Ok("Inventory updated")
    } else {
        debug!(key, delta, "update rejected over HTTP");
        Err(WebError::Rejected("Invalid inventory update".to_string()))
    }
}

async fn update_inventory(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(request): Json<UpdateRequest>,
) -> Result<&'static str> {
    apply_update(&state, &key, request.quantity_change).await
}

async fn random_update(
    State(state): State<AppState>,
    Json(request): Json<UpdateRequest>,
) -> Result<&'static str> {
    let key = state
        .random_key_pool
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or_else(|| WebError::Input("random key pool is empty".to_string()))?;
    apply_update(&state, &key, request.quantity_change).await
}

async fn get_inventory(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<Quantity> {
    Json(state.service.get(&key))
}

async fn list_inventory(State(state): State<AppState>) -> Json<BTreeMap<String, Quantity>> {
    Json(state.service.snapshot())
}

#[derive(Debug, Deserialize)]
pub struct BenchmarkQuery {
    pub requests: Option<usize>,
    pub keys: Option<usize>,
    pub distribution: Option<String>,
    pub seed: Option<u64>,
}

impl BenchmarkQuery {
    fn into_config(self) -> Result<LoadTestConfig> {
        let defaults = LoadTestConfig::default();
        let requests = self.requests.unwrap_or(defaults.request_count);
        let keys = self.keys.unwrap_or(defaults.distribution.key_space());
        let distribution = match self.distribution.as_deref().unwrap_or("round-robin") {
            "round-robin" | "roundrobin" => KeyDistribution::RoundRobin { key_count: keys },
            "random" => KeyDistribution::Random {
                key_count: keys,
                seed: self.seed,
            },
            other => {
                return Err(WebError::Input(format!(
                    "unknown distribution '{}', expected round-robin or random",
                    other
                )));
            }
        };
        Ok(LoadTestConfig::new(requests, distribution))
    }
}

async fn run_benchmark(
    State(state): State<AppState>,
    Query(query): Query<BenchmarkQuery>,
) -> Result<String> {
    let config = query.into_config()?;
    let generator = LoadGenerator::new(config)?;
    let report = generator.run(state.service.clone()).await?;
    Ok(format!(
        "\n=== LOCK CONTENTION BENCHMARK ===\n{}",
        report
    ))
}
