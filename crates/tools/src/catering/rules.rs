//! Business Rules Tool

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use lead_agent_config::{QualificationPolicy, ReferenceData};

use crate::lookup::business_rules;
use crate::mcp::{InputSchema, Tool, ToolError, ToolOutput, ToolSchema};

pub struct BusinessRulesTool {
    data: Arc<ReferenceData>,
    policy: QualificationPolicy,
}

impl BusinessRulesTool {
    pub fn new(data: Arc<ReferenceData>, policy: QualificationPolicy) -> Self {
        Self { data, policy }
    }
}

#[async_trait]
impl Tool for BusinessRulesTool {
    fn name(&self) -> &str {
        "get_business_rules"
    }

    fn description(&self) -> &str {
        "Get the minimum order size, lead times, service areas and qualification thresholds"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object(),
        }
    }

    async fn execute(&self, _input: Value) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::json(business_rules(&self.data, &self.policy)))
    }
}
