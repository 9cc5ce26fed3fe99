//! MCP-style tool interface
//!
//! Tools describe their input with a JSON schema, validate arguments before
//! running, and answer with content blocks. The same schema is handed to the
//! language model as a function definition.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use lead_agent_core::ToolDefinition;

/// Default per-tool timeout
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// A callable tool
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn schema(&self) -> ToolSchema;

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError>;

    /// Check arguments against the input schema
    fn validate(&self, input: &Value) -> Result<(), ToolError> {
        self.schema().input_schema.validate(input)
    }

    fn timeout_secs(&self) -> u64 {
        DEFAULT_TOOL_TIMEOUT_SECS
    }
}

/// Tool name, description and input schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: InputSchema,
}

impl ToolSchema {
    /// Function definition for the language model
    pub fn to_tool_definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            self.name.clone(),
            self.description.clone(),
            serde_json::to_value(&self.input_schema).unwrap_or(Value::Null),
        )
    }
}

/// JSON schema of a tool's arguments (always an object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl InputSchema {
    pub fn object() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    pub fn property(mut self, name: &str, schema: PropertySchema, required: bool) -> Self {
        self.properties.insert(name.to_string(), schema);
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn validate(&self, input: &Value) -> Result<(), ToolError> {
        let object = match input {
            Value::Object(map) => map,
            Value::Null if self.required.is_empty() => return Ok(()),
            _ => return Err(ToolError::invalid_params("Arguments must be a JSON object")),
        };

        for name in &self.required {
            match object.get(name) {
                None | Some(Value::Null) => {
                    return Err(ToolError::invalid_params(format!("{} is required", name)))
                }
                Some(_) => {}
            }
        }

        for (name, value) in object {
            if value.is_null() {
                continue;
            }
            if let Some(schema) = self.properties.get(name) {
                validate_property(name, schema, value)?;
            }
        }

        Ok(())
    }
}

/// Schema for a single argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub prop_type: String,
    pub description: String,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,
}

impl PropertySchema {
    fn typed(prop_type: &str, description: &str) -> Self {
        Self {
            prop_type: prop_type.to_string(),
            description: description.to_string(),
            enum_values: None,
            default: None,
            minimum: None,
            maximum: None,
            items: None,
        }
    }

    pub fn string(description: &str) -> Self {
        Self::typed("string", description)
    }

    pub fn number(description: &str) -> Self {
        Self::typed("number", description)
    }

    pub fn integer(description: &str) -> Self {
        Self::typed("integer", description)
    }

    pub fn boolean(description: &str) -> Self {
        Self::typed("boolean", description)
    }

    pub fn enum_type(description: &str, values: Vec<String>) -> Self {
        let mut schema = Self::typed("string", description);
        schema.enum_values = Some(values);
        schema
    }

    /// Array of strings
    pub fn string_array(description: &str) -> Self {
        let mut schema = Self::typed("array", description);
        schema.items = Some(Box::new(Self::typed("string", "")));
        schema
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.minimum = Some(min);
        self.maximum = Some(max);
        self
    }
}

/// Type, enum and range check for one argument
pub fn validate_property(name: &str, schema: &PropertySchema, value: &Value) -> Result<(), ToolError> {
    let type_ok = match schema.prop_type.as_str() {
        "string" => value.is_string(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        _ => true,
    };
    if !type_ok {
        return Err(ToolError::invalid_params(format!(
            "{} must be of type {}",
            name, schema.prop_type
        )));
    }

    if let (Some(allowed), Some(s)) = (&schema.enum_values, value.as_str()) {
        if !allowed.iter().any(|a| a.eq_ignore_ascii_case(s)) {
            return Err(ToolError::invalid_params(format!(
                "{} must be one of: {}",
                name,
                allowed.join(", ")
            )));
        }
    }

    if let Some(n) = value.as_f64() {
        if schema.minimum.is_some_and(|min| n < min) || schema.maximum.is_some_and(|max| n > max) {
            return Err(ToolError::invalid_params(format!(
                "{} is out of range [{}, {}]",
                name,
                schema.minimum.unwrap_or(f64::MIN),
                schema.maximum.unwrap_or(f64::MAX)
            )));
        }
    }

    if let (Some(items), Value::Array(values)) = (&schema.items, value) {
        for (i, item) in values.iter().enumerate() {
            validate_property(&format!("{}[{}]", name, i), items, item)?;
        }
    }

    Ok(())
}

/// A block of tool output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

/// Result of a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: Vec<ContentBlock>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn json(value: Value) -> Self {
        let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
        Self::text(text)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// All text blocks joined by newlines
    pub fn as_text(&self) -> String {
        self.content
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Output parsed back into JSON, if it is JSON
    pub fn as_json(&self) -> Option<Value> {
        serde_json::from_str(&self.as_text()).ok()
    }
}

/// JSON-RPC style error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    MethodNotFound,
    InvalidParams,
    InternalError,
    Timeout,
}

impl ErrorCode {
    pub fn code(&self) -> i32 {
        match self {
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::Timeout => -32000,
        }
    }
}

/// Tool execution error
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
}

impl ToolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MethodNotFound, message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn timeout(tool: &str, secs: u64) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("Tool '{}' timed out after {}s", tool, secs),
        )
    }
}

impl From<ToolError> for lead_agent_core::Error {
    fn from(err: ToolError) -> Self {
        lead_agent_core::Error::Tool(err.to_string())
    }
}
