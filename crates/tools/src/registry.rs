//! Tool Registry
//!
//! Manages tool registration, discovery, and execution.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use lead_agent_config::{QualificationPolicy, ReferenceData};
use lead_agent_core::ToolDefinition;

use crate::catering::{
    BusinessRulesTool, CheckOrderMinimumTool, CheckServiceAreaTool, ExtractContactInfoTool,
    FindRestaurantPartnersTool,
};
use crate::mcp::{Tool, ToolError, ToolOutput, ToolSchema};

/// Tool executor trait
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a tool by name
    async fn execute(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolError>;

    /// List available tools
    fn list_tools(&self) -> Vec<ToolSchema>;

    /// Get tool schema by name
    fn get_tool(&self, name: &str) -> Option<ToolSchema>;
}

/// Tool registry
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Function definitions for the language model, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.list_tools()
            .iter()
            .map(ToolSchema::to_tool_definition)
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    /// Validate arguments, then run the tool under its own timeout
    async fn execute(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::not_found(format!("Tool not found: {}", name)))?;

        tool.validate(&arguments)?;

        let timeout_secs = tool.timeout_secs();
        tracing::trace!(tool = name, timeout_secs, "Executing tool with timeout");

        match tokio::time::timeout(Duration::from_secs(timeout_secs), tool.execute(arguments)).await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(ToolError::timeout(name, timeout_secs)),
        }
    }

    fn list_tools(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self.tools.values().map(|t| t.schema()).collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    fn get_tool(&self, name: &str) -> Option<ToolSchema> {
        self.tools.get(name).map(|t| t.schema())
    }
}

/// Registry with every stateless lookup tool
pub fn create_registry(data: Arc<ReferenceData>, policy: QualificationPolicy) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(CheckServiceAreaTool::new(data.clone()));
    registry.register(CheckOrderMinimumTool::new(policy.clone()));
    registry.register(FindRestaurantPartnersTool::new(data.clone()));
    registry.register(ExtractContactInfoTool::new());
    registry.register(BusinessRulesTool::new(data, policy));

    tracing::debug!(tools = ?registry.tool_names(), "Created lookup tool registry");
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::{ErrorCode, InputSchema};
    use serde_json::json;

    fn registry() -> ToolRegistry {
        create_registry(
            Arc::new(ReferenceData::builtin()),
            QualificationPolicy::default(),
        )
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "Never finishes in time"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "slow".into(),
                description: "Never finishes in time".into(),
                input_schema: InputSchema::object(),
            }
        }

        async fn execute(&self, _input: Value) -> Result<ToolOutput, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ToolOutput::text("late"))
        }

        fn timeout_secs(&self) -> u64 {
            1
        }
    }

    #[test]
    fn test_registry_contents() {
        let registry = registry();
        assert_eq!(registry.len(), 5);
        assert_eq!(
            registry.tool_names(),
            vec![
                "check_order_minimum",
                "check_service_area",
                "extract_contact_info",
                "find_restaurant_partners",
                "get_business_rules",
            ]
        );
        let defs = registry.definitions();
        assert_eq!(defs[1].name, "check_service_area");
        assert_eq!(defs[1].parameters["required"], json!(["city"]));
    }

    #[tokio::test]
    async fn test_execute_dispatches_and_validates() {
        let registry = registry();
        let output = registry
            .execute("check_service_area", json!({"city": "Boston"}))
            .await
            .unwrap();
        assert_eq!(output.as_json().unwrap()["serves_area"], true);

        let err = registry
            .execute("check_service_area", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParams);

        let err = registry.execute("book_flight", json!({})).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MethodNotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_times_out() {
        let mut registry = ToolRegistry::new();
        registry.register(SlowTool);
        let err = registry.execute("slow", json!({})).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Timeout);
    }
}
