//! HTTP API v1: run the engine over HTTP.
//!
//! Endpoints:
//!
//! - `POST /api/v1/judge/execute`: Run an objective, get an SSE stream of telemetry
//! - `GET  /api/v1/tools`: List registered tools in catalog order
//! - `GET  /api/v1/status`: Engine status

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use ironjudge_agent::Engine;

// ── State ─────────────────────────────────────────────────────────────────

/// Shared state for the v1 API.
pub struct ApiV1State {
    /// One engine serves every request; each request is an independent run.
    pub engine: Arc<Engine>,
    pub provider_name: String,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

impl ApiV1State {
    pub fn new(engine: Arc<Engine>, provider_name: impl Into<String>) -> Self {
        Self {
            engine,
            provider_name: provider_name.into(),
            start_time: chrono::Utc::now(),
        }
    }
}

pub type SharedApiState = Arc<ApiV1State>;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/api/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/judge/execute", post(execute_handler))
        .route("/tools", get(list_tools_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct ExecuteRequest {
    objective: String,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize, Deserialize)]
struct ToolInfo {
    name: String,
    description: String,
}

#[derive(Serialize, Deserialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
    count: usize,
}

#[derive(Serialize, Deserialize)]
struct StatusResponse {
    status: String,
    version: String,
    uptime_secs: i64,
    provider: String,
    model: String,
    tools_count: usize,
    max_iterations: u32,
}

// ── SSE Streaming ─────────────────────────────────────────────────────────

/// `POST /api/v1/judge/execute`: Run an objective, receive an SSE stream of events.
///
/// Each frame carries one telemetry event as JSON; the SSE event name is the
/// event tag. When the client disconnects the stream is dropped, which
/// cancels the run at its next event.
async fn execute_handler(
    State(state): State<SharedApiState>,
    Json(payload): Json<ExecuteRequest>,
) -> Result<
    Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>,
    (StatusCode, Json<ErrorResponse>),
> {
    let objective = payload.objective.trim();
    if objective.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "objective must not be empty".into(),
            }),
        ));
    }

    info!(objective_len = objective.len(), "judge/execute SSE request");

    let rx = state.engine.stream(objective);

    let stream = ReceiverStream::new(rx).map(|event| {
        let event_type = event.event_type();
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().event(event_type).data(data))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// ── Tools ─────────────────────────────────────────────────────────────────

/// `GET /api/v1/tools`
async fn list_tools_handler(State(state): State<SharedApiState>) -> Json<ToolListResponse> {
    let tools: Vec<ToolInfo> = state
        .engine
        .tools()
        .describe_all()
        .into_iter()
        .map(|t| ToolInfo {
            name: t.name,
            description: t.description,
        })
        .collect();
    let count = tools.len();
    Json(ToolListResponse { tools, count })
}

// ── Status ────────────────────────────────────────────────────────────────

/// `GET /api/v1/status`
async fn status_handler(State(state): State<SharedApiState>) -> Json<StatusResponse> {
    let uptime = chrono::Utc::now() - state.start_time;
    Json(StatusResponse {
        status: "running".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_secs: uptime.num_seconds(),
        provider: state.provider_name.clone(),
        model: state.engine.model().into(),
        tools_count: state.engine.tools().len(),
        max_iterations: state.engine.max_iterations(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────
