//! # HTTP API
//!
//! - `POST /api/orchestrate` - NDJSON stream of stage events
//! - `POST /api/resolve-dependencies` - manifest ranges for the imports of a file set
//! - `POST /api/npm-validator` - existence check with retry for every import
//! - `GET /api/health`, `GET /api/openapi.json`

pub mod orchestrate;
pub mod packages;

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::app::{ApiDoc, SharedState};

/// Liveness and configuration status
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Whether an LLM API key is available
    pub llm_configured: bool,
}

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/orchestrate", post(orchestrate::orchestrate))
        .route("/resolve-dependencies", post(packages::resolve_dependencies))
        .route("/npm-validator", post(packages::npm_validator))
        .route("/health", get(health))
        .route("/openapi.json", get(serve_openapi))
}

/// Health check
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "system",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        llm_configured: state.config.model.require_api_key().is_ok(),
    })
}

async fn serve_openapi() -> impl IntoResponse {
    let spec = ApiDoc::openapi().to_json().unwrap_or_default();
    ([(header::CONTENT_TYPE, "application/json")], spec)
}
