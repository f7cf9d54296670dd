//! HTTP API gateway for IronJudge.
//!
//! Exposes a liveness probe at `/` and the v1 API under `/api/v1`, where a
//! POST starts a run and streams its telemetry back over Server-Sent Events.
//!
//! Built on Axum for high performance async HTTP.

pub mod api_v1;

use axum::extract::DefaultBodyLimit;
use axum::{Router, response::Json, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use ironjudge_agent::Engine;
use ironjudge_config::AppConfig;
use ironjudge_core::memory::VectorMemory;
use ironjudge_core::provider::Provider;

/// Build the full router: liveness probe plus the v1 API.
///
/// Layers applied:
/// - Permissive CORS so browser dashboards can consume the stream
/// - Request body size limit (64 KB)
/// - HTTP trace logging
pub fn build_router(api_state: api_v1::SharedApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health_handler))
        .nest("/api/v1", api_v1::v1_router(api_state))
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// Builds the provider, vector memory and engine once; every request runs
/// independently against the shared engine.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider: Arc<dyn Provider> =
        Arc::new(ironjudge_providers::OpenAiCompatProvider::from_config(&config)?);
    let memory: Arc<dyn VectorMemory> = Arc::new(ironjudge_memory::InMemoryVectorStore::new(
        config.memory.dimensions,
    ));
    let engine = Engine::from_config(&config, provider.clone(), memory)?;

    let api_state = Arc::new(api_v1::ApiV1State::new(Arc::new(engine), provider.name()));
    let app = build_router(api_state);

    info!(addr = %addr, model = %config.model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    system: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "online".into(),
        system: "IronJudge".into(),
    })
}
