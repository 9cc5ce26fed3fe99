//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;

use lead_agent_agent::{
    ConversationDriver, HandoffDispatcher, QualificationEngine, StageSequencer, ToolCallingAgent,
};
use lead_agent_config::{DriverKind, ReferenceData, Settings};
use lead_agent_core::LanguageModel;
use lead_agent_tools::{create_registry, NotificationSink, ToolRegistry};

use crate::session::SessionManager;
use crate::ServerError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub reference_data: Arc<ReferenceData>,
    pub sessions: Arc<SessionManager>,
    pub tools: Arc<ToolRegistry>,
    pub driver: Arc<dyn ConversationDriver>,
    /// Present when the model driver is configured
    pub llm: Option<Arc<dyn LanguageModel>>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Wire the engine, tools and the configured driver.
    ///
    /// The model driver requires `llm`.
    pub fn new(
        config: Settings,
        reference_data: Arc<ReferenceData>,
        sink: Arc<dyn NotificationSink>,
        llm: Option<Arc<dyn LanguageModel>>,
    ) -> Result<Self, ServerError> {
        let engine = Arc::new(QualificationEngine::from_settings(&config, reference_data.clone()));
        let channel = sink.channel();
        let dispatcher = Arc::new(HandoffDispatcher::new(sink));
        let tools = Arc::new(create_registry(
            reference_data.clone(),
            config.qualification.clone(),
        ));

        let driver: Arc<dyn ConversationDriver> = match config.agent.driver {
            DriverKind::Stage => Arc::new(StageSequencer::new(engine, dispatcher)),
            DriverKind::Model => {
                let llm = llm.clone().ok_or_else(|| {
                    ServerError::Configuration("model driver requires a language model".to_string())
                })?;
                Arc::new(ToolCallingAgent::new(
                    llm,
                    tools.clone(),
                    engine,
                    dispatcher,
                    config.agent.max_tool_iterations,
                ))
            }
        };

        let sessions = Arc::new(SessionManager::new(
            config.server.max_sessions,
            Duration::from_secs(config.server.session_timeout_seconds),
        ));

        tracing::info!(
            driver = driver.name(),
            channel,
            max_sessions = config.server.max_sessions,
            "Initialized application state"
        );

        Ok(Self {
            config: Arc::new(config),
            reference_data,
            sessions,
            tools,
            driver,
            llm,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}
