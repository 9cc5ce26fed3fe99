//! Lead Agent Server
//!
//! HTTP endpoints for chat sessions, tool calls, health and metrics.

pub mod http;
pub mod metrics;
pub mod session;
pub mod startup;
pub mod state;

pub use http::create_router;
pub use metrics::{init_metrics, metrics_handler};
pub use session::{Session, SessionManager};
pub use startup::load_configuration;
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use lead_agent_agent::AgentError;
use lead_agent_tools::{ErrorCode, ToolError};

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Max sessions reached")]
    Capacity,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The language model failed or never produced a reply
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Tool error: {0}")]
    Tool(ToolError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AgentError> for ServerError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::ConversationEnded | AgentError::InvalidState(_) => {
                ServerError::Conflict(err.to_string())
            }
            AgentError::Llm(_) | AgentError::ToolLoopExhausted(_) => {
                ServerError::Upstream(err.to_string())
            }
            AgentError::Tool(msg) => ServerError::Internal(msg),
        }
    }
}

impl From<ToolError> for ServerError {
    fn from(err: ToolError) -> Self {
        ServerError::Tool(err)
    }
}

impl From<&ServerError> for StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Capacity => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::Tool(e) => match e.code {
                ErrorCode::MethodNotFound => StatusCode::NOT_FOUND,
                ErrorCode::InvalidParams => StatusCode::BAD_REQUEST,
                ErrorCode::Timeout => StatusCode::GATEWAY_TIMEOUT,
                ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::Configuration(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_errors_map_to_status() {
        let ended: ServerError = AgentError::ConversationEnded.into();
        assert_eq!(StatusCode::from(&ended), StatusCode::CONFLICT);

        let exhausted: ServerError = AgentError::ToolLoopExhausted(5).into();
        assert_eq!(StatusCode::from(&exhausted), StatusCode::BAD_GATEWAY);
        assert!(exhausted.to_string().contains("5 tool iterations"));
    }

    #[test]
    fn test_tool_errors_map_by_code() {
        let missing = ServerError::from(ToolError::not_found("Tool not found: x"));
        assert_eq!(StatusCode::from(&missing), StatusCode::NOT_FOUND);
        let invalid = ServerError::from(ToolError::invalid_params("city is required"));
        assert_eq!(StatusCode::from(&invalid), StatusCode::BAD_REQUEST);
    }
}
