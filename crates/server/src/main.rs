//! Lead Agent Server Entry Point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use lead_agent_config::{DriverKind, Settings};
use lead_agent_core::LanguageModel;
use lead_agent_llm::{LlmConfig, OllamaBackend};
use lead_agent_server::{create_router, init_metrics, load_configuration, AppState};
use lead_agent_tools::{LogNotificationSink, NotificationSink, WebhookNotificationSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("LEAD_AGENT_ENV").ok();
    let (config, reference_data) = match load_configuration("config", env.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            // Tracing not yet initialized
            eprintln!("Error: {:#}", e);
            return Err(e);
        }
    };

    init_tracing(&config);

    tracing::info!(
        env = env.as_deref().unwrap_or("default"),
        service_areas = reference_data.service_areas.len(),
        restaurant_partners = reference_data.restaurant_partners.len(),
        "Starting Lead Agent Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let sink = build_sink(&config)?;
    let llm = build_llm(&config)?;

    let metrics_handle = init_metrics();
    if metrics_handle.is_some() {
        tracing::info!("Initialized Prometheus metrics at /metrics");
    }

    let state = AppState::new(config.clone(), Arc::new(reference_data), sink, llm)?
        .with_metrics(metrics_handle);

    let cleanup_shutdown = state.sessions.start_cleanup_task();

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!("Invalid listen address {}:{}", config.server.host, config.server.port)
        })?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = cleanup_shutdown.send(true);
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Webhook delivery when a URL is configured, log lines otherwise
fn build_sink(config: &Settings) -> anyhow::Result<Arc<dyn NotificationSink>> {
    let notification = &config.notification;
    match &notification.webhook_url {
        Some(url) => {
            let sink = WebhookNotificationSink::new(
                url.clone(),
                notification.sales_email.clone(),
                Duration::from_millis(notification.timeout_ms),
            )?;
            tracing::info!(url = %url, "Lead notifications go to webhook");
            Ok(Arc::new(sink))
        }
        None => {
            tracing::info!(
                sales_email = %notification.sales_email,
                "Lead notifications are logged"
            );
            Ok(Arc::new(LogNotificationSink::new(notification.sales_email.clone())))
        }
    }
}

/// The language model is only built for the model driver
fn build_llm(config: &Settings) -> anyhow::Result<Option<Arc<dyn LanguageModel>>> {
    if config.agent.driver != DriverKind::Model {
        return Ok(None);
    }
    let backend = OllamaBackend::new(LlmConfig::from(&config.llm))
        .context("Failed to create language model backend")?;
    tracing::info!(model = %config.llm.model, endpoint = %config.llm.endpoint, "LLM backend ready");
    Ok(Some(Arc::new(backend)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("lead_agent={},tower_http=debug", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
