//! Ollama chat backend
//!
//! Talks to `/api/chat` with `stream: false`. Tool definitions go out in the
//! request's `tools` field and come back as `message.tool_calls`; with
//! `native_tools` off they are described in the system prompt instead and
//! parsed out of the reply text. Network errors, timeouts and 5xx answers
//! are retried with exponential backoff; 4xx answers fail at once.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use lead_agent_config::LlmSettings;
use lead_agent_core::{
    FinishReason, GenerateRequest, GenerateResponse, LanguageModel, Message, Role, TokenUsage,
    ToolCall, ToolDefinition,
};

use crate::prompt::{parse_tool_calls, tool_prompt};
use crate::LlmError;

/// LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// API endpoint
    pub endpoint: String,
    /// Bearer token for hosted endpoints
    pub api_key: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry)
    pub initial_backoff: Duration,
    /// Keep the model loaded between calls ("5m", "-1", "0")
    pub keep_alive: String,
    pub native_tools: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::from(&LlmSettings::default())
    }
}

impl From<&LlmSettings> for LlmConfig {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            model: settings.model.clone(),
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout: Duration::from_millis(settings.timeout_ms),
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(200),
            keep_alive: "5m".to_string(),
            native_tools: settings.native_tools,
        }
    }
}

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    client: Client,
    config: LlmConfig,
}

impl OllamaBackend {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint, path)
    }

    fn build_request(&self, request: &GenerateRequest, tools: &[ToolDefinition]) -> OllamaChatRequest {
        let mut messages: Vec<OllamaMessage> = request.messages.iter().map(OllamaMessage::from).collect();

        let native = self.config.native_tools && !tools.is_empty();
        if !self.config.native_tools && !tools.is_empty() {
            let prompt = tool_prompt(tools);
            if messages.first().is_some_and(|m| m.role == "system") {
                let system = &mut messages[0];
                system.content.push_str("\n\n");
                system.content.push_str(&prompt);
            } else {
                messages.insert(0, OllamaMessage::text("system", prompt));
            }
        }

        OllamaChatRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages,
            stream: false,
            tools: native.then(|| tools.iter().map(OllamaTool::from).collect()),
            options: Some(OllamaOptions {
                temperature: Some(request.temperature.unwrap_or(self.config.temperature)),
                num_predict: Some(request.max_tokens.unwrap_or(self.config.max_tokens) as i32),
            }),
            keep_alive: Some(self.config.keep_alive.clone()),
        }
    }

    /// Retry loop with exponential backoff
    async fn chat(&self, request: &OllamaChatRequest) -> Result<OllamaChatResponse, LlmError> {
        let mut last_error = None;
        let mut backoff = self.config.initial_backoff;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    attempt,
                    max_retries = self.config.max_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    "LLM request failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.execute_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Network("Max retries exceeded".to_string())))
    }

    async fn execute_request(&self, request: &OllamaChatRequest) -> Result<OllamaChatResponse, LlmError> {
        let mut builder = self.client.post(self.api_url("/chat")).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(LlmError::Network(format!("Server error {}: {}", status, error)));
            }
            if status.as_u16() == 404 && error.contains("not found") {
                return Err(LlmError::ModelNotFound(request.model.clone()));
            }
            return Err(LlmError::Api(format!("{}: {}", status, error)));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    fn to_generate_response(&self, response: OllamaChatResponse) -> GenerateResponse {
        let usage = match (response.prompt_eval_count, response.eval_count) {
            (None, None) => None,
            (prompt, completion) => Some(TokenUsage::new(
                prompt.unwrap_or(0) as u32,
                completion.unwrap_or(0) as u32,
            )),
        };

        let mut tool_calls: Vec<ToolCall> = response
            .message
            .tool_calls
            .into_iter()
            .map(|tc| {
                // Some models send arguments as a JSON-encoded string
                let arguments = match tc.function.arguments {
                    Value::String(raw) => serde_json::from_str(&raw).unwrap_or(Value::Null),
                    other => other,
                };
                ToolCall::new(tc.function.name, arguments)
            })
            .collect();

        let mut text = response.message.content;
        if tool_calls.is_empty() && text.contains("[TOOL_CALL:") {
            let (remaining, parsed) = parse_tool_calls(&text);
            text = remaining;
            tool_calls = parsed;
        }

        let finish_reason = if !tool_calls.is_empty() {
            FinishReason::ToolCalls
        } else if response.done_reason.as_deref() == Some("length") {
            FinishReason::Length
        } else {
            FinishReason::Stop
        };

        GenerateResponse {
            text: text.trim().to_string(),
            finish_reason,
            usage,
            tool_calls,
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaBackend {
    async fn generate(&self, request: GenerateRequest) -> lead_agent_core::Result<GenerateResponse> {
        self.generate_with_tools(request, &[]).await
    }

    async fn generate_with_tools(
        &self,
        request: GenerateRequest,
        tools: &[ToolDefinition],
    ) -> lead_agent_core::Result<GenerateResponse> {
        let body = self.build_request(&request, tools);
        let start = std::time::Instant::now();

        let response = self.chat(&body).await.map_err(|e| {
            tracing::error!(model = %body.model, error = %e, "LLM generation failed");
            e
        })?;
        let response = self.to_generate_response(response);

        tracing::debug!(
            model = %body.model,
            tool_calls = response.tool_calls.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "LLM generation complete"
        );
        Ok(response)
    }

    async fn is_available(&self) -> bool {
        match self.client.get(self.api_url("/tags")).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OllamaTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

impl OllamaMessage {
    fn text(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content,
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }
}

impl From<&Message> for OllamaMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|tc| OllamaToolCall {
                    function: OllamaFunctionCall {
                        name: tc.name.clone(),
                        arguments: tc.arguments_value(),
                    },
                })
                .collect(),
            tool_name: match msg.role {
                Role::Tool => msg.name.clone(),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunctionCall {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct OllamaTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OllamaFunction,
}

#[derive(Debug, Serialize)]
struct OllamaFunction {
    name: String,
    description: String,
    parameters: Value,
}

impl From<&ToolDefinition> for OllamaTool {
    fn from(def: &ToolDefinition) -> Self {
        Self {
            tool_type: "function",
            function: OllamaFunction {
                name: def.name.clone(),
                description: def.description.clone(),
                parameters: def.parameters.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}
