//! HTTP service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/query` | Answer a query through the controller |
//! | `GET`  | `/health` | Liveness (`{"status": "healthy"}`) |
//! | `GET`  | `/status` | Component health report |
//!
//! `POST /query` body:
//!
//! ```json
//! { "query": "What is Rust?", "max_results": 5, "force_web_search": false, "include_sources": true }
//! ```
//!
//! Only `query` is required. `sources` is left out of the response when
//! `include_sources` is false.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Query processing failures are not HTTP errors: they come back as a 200
//! with `search_method: "error"`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, Span};

use crate::config::Config;
use crate::controller::{HealthReport, QueryController};
use crate::models::{Query, SourceRecord};

#[derive(Clone)]
struct AppState {
    controller: Arc<QueryController>,
    default_max_results: usize,
}

/// Build the router without binding. Used by [`run_server`] and by tests.
pub fn router(controller: Arc<QueryController>, default_max_results: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/query", post(handle_query))
        .route("/health", get(handle_health))
        .route("/status", get(handle_status))
        .layer(cors)
        .with_state(AppState {
            controller,
            default_max_results,
        })
}

/// Bind to `[server].bind` and serve until the process is terminated.
pub async fn run_server(
    config: &Config,
    controller: Arc<QueryController>,
    span: Span,
) -> anyhow::Result<()> {
    let app = router(controller, config.retrieval.max_results);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(parent: &span, addr = %listener.local_addr()?, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ POST /query ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    max_results: Option<usize>,
    #[serde(default)]
    force_web_search: bool,
    #[serde(default = "default_true")]
    include_sources: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize)]
struct QueryResponse {
    query: String,
    response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sources: Option<Vec<SourceRecord>>,
    confidence: f64,
    search_method: String,
    /// Seconds.
    execution_time: f64,
}

async fn handle_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let max_results = req.max_results.unwrap_or(state.default_max_results);
    if max_results == 0 {
        return Err(bad_request("max_results must be >= 1"));
    }

    let query = Query::new(req.query.clone())
        .with_max_results(max_results)
        .force_web(req.force_web_search)
        .include_sources(req.include_sources);
    let result = state.controller.query(query).await;

    Ok(Json(QueryResponse {
        query: req.query,
        response: result.response,
        sources: req.include_sources.then_some(result.sources),
        confidence: result.confidence,
        search_method: result.search_method.to_string(),
        execution_time: result.execution_time.as_secs_f64(),
    }))
}

// ============ GET /health, GET /status ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_status(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.controller.health().await)
}
