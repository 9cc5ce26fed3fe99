//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, PromptTemplates, QualificationPolicy};

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Conversation driver configuration
    #[serde(default)]
    pub agent: AgentConfig,

    /// Language model backend (model driver only)
    #[serde(default)]
    pub llm: LlmSettings,

    /// Scoring weights and thresholds
    #[serde(default)]
    pub qualification: QualificationPolicy,

    /// Where finished leads go
    #[serde(default)]
    pub notification: NotificationConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Assistant wording
    #[serde(default)]
    pub prompts: PromptTemplates,

    /// Service areas and restaurant partners (YAML, JSON or TOML).
    /// Unset means the built-in table.
    #[serde(default)]
    pub reference_data_path: Option<String>,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_agent()?;
        self.validate_llm()?;
        self.qualification.validate()?;
        self.validate_notification()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "Port must be non-zero"));
        }
        if self.server.max_sessions == 0 {
            return Err(ConfigError::invalid(
                "server.max_sessions",
                "At least one session must be allowed",
            ));
        }
        Ok(())
    }

    fn validate_agent(&self) -> Result<(), ConfigError> {
        if self.agent.showcase_limit == 0 {
            return Err(ConfigError::invalid(
                "agent.showcase_limit",
                "Showcase must list at least one partner",
            ));
        }
        if self.agent.max_tool_iterations == 0 {
            return Err(ConfigError::invalid(
                "agent.max_tool_iterations",
                "Model driver needs at least one iteration",
            ));
        }
        Ok(())
    }

    fn validate_llm(&self) -> Result<(), ConfigError> {
        if self.agent.driver != DriverKind::Model {
            return Ok(());
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::MissingField("llm.model".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::invalid(
                "llm.temperature",
                format!("Must be between 0.0 and 2.0, got {}", self.llm.temperature),
            ));
        }
        Ok(())
    }

    fn validate_notification(&self) -> Result<(), ConfigError> {
        if !self.notification.sales_email.contains('@') {
            return Err(ConfigError::invalid(
                "notification.sales_email",
                format!("Not an email address: {}", self.notification.sales_email),
            ));
        }
        if let Some(url) = &self.notification.webhook_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::invalid(
                    "notification.webhook_url",
                    "Must be an http(s) URL",
                ));
            }
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum concurrent sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Idle session timeout in seconds
    #[serde(default = "default_session_timeout")]
    pub session_timeout_seconds: u64,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_max_sessions() -> usize {
    1000
}
fn default_session_timeout() -> u64 {
    3600
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_sessions: default_max_sessions(),
            session_timeout_seconds: default_session_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Which driver advances conversations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Deterministic per-stage sequencer
    #[default]
    Stage,
    /// Language model calling lookup tools
    Model,
}

/// Conversation driver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub driver: DriverKind,

    /// Partners listed in the showcase
    #[serde(default = "default_showcase_limit")]
    pub showcase_limit: usize,

    /// Model/tool round trips allowed per turn
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

fn default_showcase_limit() -> usize {
    3
}
fn default_max_tool_iterations() -> usize {
    5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::default(),
            showcase_limit: default_showcase_limit(),
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

/// Language model backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_ms: u64,

    /// Retries for transient failures (network, 5xx)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Use the chat API's function calling; when false, tools are described
    /// in the system prompt and calls are parsed from `[TOOL_CALL: ...]` text
    #[serde(default = "default_true")]
    pub native_tools: bool,
}

fn default_llm_model() -> String {
    "qwen2.5:7b-instruct-q4_K_M".to_string()
}
fn default_llm_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    512
}
fn default_llm_timeout() -> u64 {
    30_000
}
fn default_max_retries() -> u32 {
    3
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            endpoint: default_llm_endpoint(),
            api_key: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_llm_timeout(),
            max_retries: default_max_retries(),
            native_tools: true,
        }
    }
}

/// Lead notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Recipient of lead emails; also quoted to visitors who decline
    #[serde(default = "default_sales_email")]
    pub sales_email: String,

    /// POST finished leads here instead of logging them
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default = "default_notification_timeout")]
    pub timeout_ms: u64,
}

fn default_sales_email() -> String {
    "sales@mealoutpost.com".to_string()
}
fn default_notification_timeout() -> u64 {
    5_000
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            sales_email: default_sales_email(),
            webhook_url: None,
            timeout_ms: default_notification_timeout(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (LEAD_AGENT_ prefix, `__` between sections)
/// 2. {dir}/{env}.yaml (if env specified)
/// 3. {dir}/default.yaml
///
/// The merged result must pass [`Settings::validate`].
pub fn load_settings_from(dir: &str, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name(&format!("{}/default", dir)).required(false));

    if let Some(env_name) = env {
        builder = builder
            .add_source(File::with_name(&format!("{}/{}", dir, env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("LEAD_AGENT")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
