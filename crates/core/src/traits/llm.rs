//! Language Model traits

use crate::{GenerateRequest, GenerateResponse, Result, ToolDefinition};
use async_trait::async_trait;

/// Language Model interface
///
/// The model maps system instructions plus chat history to either a
/// natural-language reply or a request to call one of the offered tools.
///
/// Implementations:
/// - `OllamaBackend` - Local Ollama inference
///
/// # Example
///
/// ```ignore
/// let llm: Arc<dyn LanguageModel> = Arc::new(OllamaBackend::new(config)?);
/// let request = GenerateRequest::new("You are MO from Meal Outpost")
///     .with_user_message("Do you cater in Boston?");
/// let response = llm.generate_with_tools(request, &tools).await?;
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Generate completion
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;

    /// Generate with tool/function calling
    ///
    /// Response may include tool calls in addition to text.
    async fn generate_with_tools(
        &self,
        request: GenerateRequest,
        tools: &[ToolDefinition],
    ) -> Result<GenerateResponse>;

    /// Check if model is available
    async fn is_available(&self) -> bool;

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolCall;
    use serde_json::json;

    /// Asks for the area check whenever a tool is offered
    struct AreaCheckingModel;

    #[async_trait]
    impl LanguageModel for AreaCheckingModel {
        async fn generate(&self, _request: GenerateRequest) -> Result<GenerateResponse> {
            Ok(GenerateResponse::text("Where is your event?"))
        }

        async fn generate_with_tools(
            &self,
            request: GenerateRequest,
            tools: &[ToolDefinition],
        ) -> Result<GenerateResponse> {
            match tools.first() {
                Some(tool) => Ok(GenerateResponse::with_tool_calls(vec![ToolCall::new(
                    tool.name.clone(),
                    json!({"city": "Boston"}),
                )])),
                None => self.generate(request).await,
            }
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "area-checker"
        }
    }

    #[tokio::test]
    async fn test_tools_offered_through_trait_object() {
        let llm: Box<dyn LanguageModel> = Box::new(AreaCheckingModel);
        let request = GenerateRequest::new("You are MO").with_user_message("Boston");

        let plain = llm.generate_with_tools(request.clone(), &[]).await.unwrap();
        assert!(!plain.has_tool_calls());
        assert_eq!(plain.text, "Where is your event?");

        let tools = [ToolDefinition::new("check_service_area", "Check a city", json!({}))];
        let response = llm.generate_with_tools(request, &tools).await.unwrap();
        assert_eq!(response.tool_calls[0].name, "check_service_area");
        assert_eq!(response.tool_calls[0].get_string("city"), Some("Boston"));
    }
}
