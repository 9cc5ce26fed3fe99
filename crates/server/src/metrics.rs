//! Prometheus metrics
//!
//! The recorder is process-global; it is installed once and every router
//! built afterwards shares the same handle.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::state::AppState;

static HANDLE: OnceCell<Option<PrometheusHandle>> = OnceCell::new();

/// Install the Prometheus recorder and describe the agent's metrics.
///
/// Returns `None` if another recorder was installed first.
pub fn init_metrics() -> Option<PrometheusHandle> {
    HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                describe();
                Some(handle)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Prometheus recorder not installed");
                None
            }
        })
        .clone()
}

fn describe() {
    metrics::describe_counter!("lead_agent_turns_total", "Visitor turns processed, by driver");
    metrics::describe_histogram!(
        "lead_agent_turn_duration_seconds",
        "Time to produce a reply, by driver"
    );
    metrics::describe_counter!(
        "lead_agent_stage_transitions_total",
        "Conversation stage transitions"
    );
    metrics::describe_counter!(
        "lead_agent_leads_total",
        "Leads handed to sales, by qualification status and channel"
    );
    metrics::describe_counter!(
        "lead_agent_notification_failures_total",
        "Lead notifications that failed to deliver"
    );
    metrics::describe_counter!("lead_agent_tool_calls_total", "Model tool calls, by tool and outcome");
    metrics::describe_counter!("lead_agent_llm_errors_total", "Failed language model calls");
    metrics::describe_gauge!("lead_agent_active_sessions", "Sessions held in memory");
    metrics::describe_counter!("lead_agent_http_requests_total", "HTTP requests, by route and status");
}

/// Record a finished HTTP request
pub fn record_request(route: String, status: StatusCode) {
    metrics::counter!(
        "lead_agent_http_requests_total",
        "route" => route,
        "status" => status.as_u16().to_string()
    )
    .increment(1);
}

pub fn record_active_sessions(count: usize) {
    metrics::gauge!("lead_agent_active_sessions").set(count as f64);
}

/// `GET /metrics`
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    record_active_sessions(state.sessions.count());
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            "# metrics recorder not installed\n".to_string(),
        ),
    }
}
