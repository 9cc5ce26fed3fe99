//! Configuration management for the lead agent
//!
//! Supports loading configuration from:
//! - YAML/TOML files (`config/default.*`, `config/{env}.*`)
//! - Environment variables (LEAD_AGENT_ prefix, `__` separator)
//!
//! Reference data (service areas and restaurant partners) is loaded
//! separately, once, and shared read-only for the life of the process.

pub mod prompts;
pub mod reference;
pub mod scoring;
pub mod settings;

pub use prompts::{render, PromptTemplates};
pub use reference::{CapacityTier, ReferenceData, RestaurantPartner, ServiceArea};
pub use scoring::{QualificationPolicy, QualificationThresholds, ScoreWeights};
pub use settings::{
    load_settings_from, AgentConfig, DriverKind, LlmSettings, NotificationConfig,
    ObservabilityConfig, ServerConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for lead_agent_core::Error {
    fn from(err: ConfigError) -> Self {
        lead_agent_core::Error::Configuration(err.to_string())
    }
}
