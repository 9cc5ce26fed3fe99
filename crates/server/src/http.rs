//! HTTP Endpoints
//!
//! REST API for the lead agent.

use std::time::Duration;

use axum::{
    extract::{Json, MatchedPath, Path, Request, State},
    http::{HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use lead_agent_agent::HandoffReport;
use lead_agent_core::ConversationStage;
use lead_agent_tools::{ToolExecutor, ToolOutput};

use crate::metrics::{metrics_handler, record_request};
use crate::state::AppState;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(
        &state.config.server.cors_origins,
        state.config.server.cors_enabled,
    );

    Router::new()
        // Sessions
        .route("/api/sessions", post(create_session).get(list_sessions))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        // Chat
        .route("/api/chat/:session_id", post(chat))
        // Tools
        .route("/api/tools", get(list_tools))
        .route("/api/tools/:name", post(call_tool))
        // Health
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        .route_layer(middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// CORS from the configured origins
///
/// - disabled: permissive (development only)
/// - no valid origins: localhost:3000
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!(origin = %origin, "Invalid CORS origin");
                None
            })
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if parsed.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to {}", DEFAULT_ORIGIN);
        return layer.allow_origin(HeaderValue::from_static(DEFAULT_ORIGIN));
    }

    tracing::info!(origins = parsed.len(), "CORS configured");
    layer.allow_origin(parsed)
}

async fn track_requests(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let response = next.run(request).await;
    record_request(route, response.status());
    response
}

/// Reply to a turn or to session creation
#[derive(Debug, Serialize)]
struct ChatResponse {
    session_id: String,
    reply: String,
    stage: ConversationStage,
    stage_name: &'static str,
    finished: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    handoff: Option<HandoffReport>,
}

/// Create a session and return the greeting
async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ChatResponse>), ServerError> {
    let session = state.sessions.create()?;
    let mut conversation = session.lock().await;
    let greeting = state.driver.start(&mut conversation).await?;

    Ok((
        StatusCode::CREATED,
        Json(ChatResponse {
            session_id: session.id.clone(),
            reply: greeting.reply,
            stage: greeting.stage,
            stage_name: greeting.stage.display_name(),
            finished: false,
            handoff: None,
        }),
    ))
}

async fn list_sessions(State(state): State<AppState>) -> Json<Value> {
    let sessions = state.sessions.list();
    Json(json!({
        "sessions": sessions,
        "count": sessions.len(),
    }))
}

/// Snapshot of a session's conversation state
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServerError> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| ServerError::SessionNotFound(id.clone()))?;
    let conversation = session.lock().await;

    Ok(Json(json!({
        "session_id": session.id,
        "created_at": session.created_at,
        "idle_seconds": session.idle_for().as_secs(),
        "stage": conversation.stage(),
        "stage_name": conversation.stage().display_name(),
        "finished": conversation.stage().is_terminal(),
        "turn_count": conversation.transcript().user_turn_count(),
        "state": &*conversation,
    })))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    if state.sessions.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::SessionNotFound(id))
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

/// One visitor turn
async fn chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ServerError> {
    if request.message.trim().is_empty() {
        return Err(ServerError::InvalidRequest("message must not be empty".to_string()));
    }
    let session = state
        .sessions
        .get(&session_id)
        .ok_or_else(|| ServerError::SessionNotFound(session_id.clone()))?;
    session.touch();

    let mut conversation = session.lock().await;
    let turn = state.driver.handle_turn(&mut conversation, &request.message).await?;

    Ok(Json(ChatResponse {
        session_id,
        finished: turn.is_finished(),
        stage_name: turn.stage.display_name(),
        stage: turn.stage,
        reply: turn.reply,
        handoff: turn.handoff,
    }))
}

async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    let tools = state.tools.list_tools();
    Json(json!({
        "count": tools.len(),
        "tools": tools,
    }))
}

fn empty_object() -> Value {
    json!({})
}

#[derive(Debug, Deserialize)]
struct ToolCallRequest {
    #[serde(default = "empty_object")]
    arguments: Value,
}

async fn call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<ToolCallRequest>,
) -> Result<Json<ToolOutput>, ServerError> {
    let output = state.tools.execute(&name, request.arguments).await?;
    tracing::debug!(tool = %name, is_error = output.is_error, "Tool called over HTTP");
    Ok(Json(output))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let data = &state.reference_data;
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "driver": state.driver.name(),
        "checks": {
            "tools": { "status": "ok", "count": state.tools.len() },
            "reference_data": {
                "status": "ok",
                "service_areas": data.service_areas.len(),
                "restaurant_partners": data.restaurant_partners.len(),
            },
            "sessions": { "status": "ok", "count": state.sessions.count() },
        },
    }))
}

/// Ready when the language model (if the driver needs one) answers
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let mut checks = serde_json::Map::new();
    let mut ready = true;

    checks.insert(
        "sessions".to_string(),
        json!({ "status": "ok", "count": state.sessions.count() }),
    );

    if let Some(llm) = &state.llm {
        let status = match tokio::time::timeout(Duration::from_secs(2), llm.is_available()).await {
            Ok(true) => "ok",
            Ok(false) => {
                ready = false;
                "unreachable"
            }
            Err(_) => {
                ready = false;
                "timeout"
            }
        };
        checks.insert(
            "llm_backend".to_string(),
            json!({ "status": status, "model": llm.model_name() }),
        );
    }

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status_code,
        Json(json!({
            "status": if ready { "ready" } else { "not_ready" },
            "checks": checks,
        })),
    )
}
