//! Contact Extraction Tool

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::lookup::extract_contact_info;
use crate::mcp::{InputSchema, PropertySchema, Tool, ToolError, ToolOutput, ToolSchema};

pub struct ExtractContactInfoTool;

impl ExtractContactInfoTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExtractContactInfoTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ExtractContactInfoTool {
    fn name(&self) -> &str {
        "extract_contact_info"
    }

    fn description(&self) -> &str {
        "Extract an email address and US phone number from text"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object().property(
                "text",
                PropertySchema::string("Text that may contain contact details"),
                true,
            ),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let text = input
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::invalid_params("text is required"))?;

        let info = extract_contact_info(text);
        Ok(ToolOutput::json(json!({
            "email": info.email,
            "phone": info.phone,
        })))
    }

    fn timeout_secs(&self) -> u64 {
        5
    }
}
