use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use roadwatch_common::{DetectionRequest, LocationConfidence};
use roadwatch_core::ServerDeps;
use roadwatch_domains::faults::Ingestor;
use roadwatch_domains::reports::TopNeighborhoodsResponse;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;

/// Upper bound on `?limit=` for the report endpoint.
pub const MAX_REPORT_LIMIT: usize = 100;

pub fn build_router(deps: Arc<ServerDeps>) -> Router {
    let allowed_origins = deps.file_config.server.allowed_origins.clone();

    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let state = AppState {
        ingestor: Ingestor::from_deps(&deps),
        top_n: deps.top_n(),
    };

    Router::new()
        .route("/", get(status))
        .route("/health", get(health))
        .route("/api/registrar_falla/", post(register_fault))
        .route("/api/faults", post(register_fault))
        .route("/api/reports/top-neighborhoods", get(top_neighborhoods))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Clone)]
pub struct AppState {
    ingestor: Ingestor,
    top_n: usize,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub record_id: i64,
    pub neighborhood_id: i64,
    pub neighborhood_name: String,
    pub location_confidence: LocationConfidence,
}

/// The device is identified by the caller's IP address.
async fn register_fault(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    payload: Result<Json<DetectionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let device = addr.ip().to_string();

    let receipt = state.ingestor.ingest_request(request, &device).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Fault registered",
            record_id: receipt.record_id,
            neighborhood_id: receipt.neighborhood_id,
            neighborhood_name: receipt.neighborhood_name,
            location_confidence: receipt.location_confidence,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    limit: Option<usize>,
}

async fn top_neighborhoods(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<TopNeighborhoodsResponse>, ApiError> {
    let limit = query.limit.unwrap_or(state.top_n).min(MAX_REPORT_LIMIT);
    let top_neighborhoods = state.ingestor.top_neighborhoods(limit).await?;
    Ok(Json(TopNeighborhoodsResponse { top_neighborhoods }))
}

async fn status() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "roadwatch",
        "status": "running",
    }))
}

async fn health() -> &'static str {
    "ok"
}
