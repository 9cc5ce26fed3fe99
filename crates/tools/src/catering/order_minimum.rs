//! Order Minimum Tool
//!
//! Compares a headcount with the preferred minimum order size.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use lead_agent_config::QualificationPolicy;

use crate::mcp::{InputSchema, PropertySchema, Tool, ToolError, ToolOutput, ToolSchema};

/// Where a headcount falls against the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSizeTier {
    MeetsMinimum,
    Substantial,
    Small,
}

impl OrderSizeTier {
    pub fn classify(people: u32, policy: &QualificationPolicy) -> Self {
        if people >= policy.minimum_order_size {
            OrderSizeTier::MeetsMinimum
        } else if people >= policy.substantial_order_size {
            OrderSizeTier::Substantial
        } else {
            OrderSizeTier::Small
        }
    }
}

fn is_recurring_frequency(frequency: &str) -> bool {
    let frequency = frequency.to_lowercase();
    ["recurring", "daily", "weekly"]
        .iter()
        .any(|k| frequency.contains(k))
}

/// Guidance text for a headcount
pub fn order_minimum_message(
    people: u32,
    frequency: &str,
    policy: &QualificationPolicy,
) -> (OrderSizeTier, String) {
    let minimum = policy.minimum_order_size;
    let tier = OrderSizeTier::classify(people, policy);
    let message = match tier {
        OrderSizeTier::MeetsMinimum => format!(
            "Perfect! {} people is a great size for us. We specialize in orders of {}+ people and would be happy to help with your catering needs.",
            people, minimum
        ),
        OrderSizeTier::Substantial if is_recurring_frequency(frequency) => format!(
            "While {} people is below our typical minimum of {}, we'd be happy to discuss your recurring catering needs. Recurring orders give us more flexibility with smaller group sizes.",
            people, minimum
        ),
        OrderSizeTier::Substantial => format!(
            "Thanks for your interest! {} people is below our typical minimum of {} people per order. However, if you have recurring catering needs or multiple events planned, we'd still love to discuss how we might help.",
            people, minimum
        ),
        OrderSizeTier::Small => format!(
            "Thank you for considering Meal Outpost! Our service works best for orders of {}+ people. For {} people, you might want to consider ordering directly from individual restaurants. If your catering needs grow in the future, we'd love to help!",
            minimum, people
        ),
    };
    (tier, message)
}

pub struct CheckOrderMinimumTool {
    policy: QualificationPolicy,
}

impl CheckOrderMinimumTool {
    pub fn new(policy: QualificationPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for CheckOrderMinimumTool {
    fn name(&self) -> &str {
        "check_order_minimum"
    }

    fn description(&self) -> &str {
        "Check if an order meets Meal Outpost's minimum requirements"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object()
                .property(
                    "people_count",
                    PropertySchema::integer("Number of people to feed").with_range(1.0, 100_000.0),
                    true,
                )
                .property(
                    "order_frequency",
                    PropertySchema::string("How often they need catering (one-time, daily, weekly, monthly)")
                        .with_default(json!("one-time")),
                    false,
                ),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let people = input
            .get("people_count")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| ToolError::invalid_params("people_count is required"))?;
        let people = u32::try_from(people)
            .map_err(|_| ToolError::invalid_params("people_count is too large"))?;
        let frequency = input
            .get("order_frequency")
            .and_then(|v| v.as_str())
            .unwrap_or("one-time");

        let (tier, message) = order_minimum_message(people, frequency, &self.policy);

        Ok(ToolOutput::json(json!({
            "people_count": people,
            "minimum_order_size": self.policy.minimum_order_size,
            "meets_minimum": tier == OrderSizeTier::MeetsMinimum,
            "tier": tier,
            "message": message,
        })))
    }

    fn timeout_secs(&self) -> u64 {
        5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers() {
        let policy = QualificationPolicy::default();
        assert_eq!(OrderSizeTier::classify(20, &policy), OrderSizeTier::MeetsMinimum);
        assert_eq!(OrderSizeTier::classify(19, &policy), OrderSizeTier::Substantial);
        assert_eq!(OrderSizeTier::classify(10, &policy), OrderSizeTier::Substantial);
        assert_eq!(OrderSizeTier::classify(9, &policy), OrderSizeTier::Small);
    }

    #[test]
    fn test_messages() {
        let policy = QualificationPolicy::default();
        let (_, msg) = order_minimum_message(45, "one-time", &policy);
        assert!(msg.starts_with("Perfect! 45 people is a great size for us."));

        let (_, msg) = order_minimum_message(12, "Weekly lunches", &policy);
        assert!(msg.contains("Recurring orders give us more flexibility"));

        let (_, msg) = order_minimum_message(12, "one-time", &policy);
        assert!(msg.contains("below our typical minimum of 20 people per order"));

        let (_, msg) = order_minimum_message(5, "daily", &policy);
        assert!(msg.contains("For 5 people"));
    }

    #[tokio::test]
    async fn test_execute() {
        let tool = CheckOrderMinimumTool::new(QualificationPolicy::default());
        let value = tool
            .execute(json!({"people_count": 45}))
            .await
            .unwrap()
            .as_json()
            .unwrap();
        assert_eq!(value["meets_minimum"], true);
        assert_eq!(value["tier"], "meets_minimum");

        assert!(tool.validate(&json!({"people_count": 0})).is_err());
        assert!(tool.validate(&json!({"people_count": "45"})).is_err());
    }
}
