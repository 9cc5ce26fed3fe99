//! Service Area Tool
//!
//! Tells the visitor whether a city is served and names a few partners.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use lead_agent_config::ReferenceData;

use super::title_case;
use crate::lookup::{check_area_in_state, find_partners, PartnerQuery};
use crate::mcp::{InputSchema, PropertySchema, Tool, ToolError, ToolOutput, ToolSchema};

/// Partners named in a positive answer
const SAMPLE_PARTNERS: usize = 3;

pub struct CheckServiceAreaTool {
    data: Arc<ReferenceData>,
}

impl CheckServiceAreaTool {
    pub fn new(data: Arc<ReferenceData>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl Tool for CheckServiceAreaTool {
    fn name(&self) -> &str {
        "check_service_area"
    }

    fn description(&self) -> &str {
        "Check if Meal Outpost serves a specific city and mention some restaurant partners"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object()
                .property("city", PropertySchema::string("The city name to check"), true)
                .property(
                    "state",
                    PropertySchema::string("Optional two-letter state abbreviation"),
                    false,
                ),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let city = input
            .get("city")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::invalid_params("city is required"))?;
        let state = input.get("state").and_then(|v| v.as_str());

        let Some(area) = check_area_in_state(&self.data, city, state) else {
            tracing::debug!(city = %city, "City outside service area");
            return Ok(ToolOutput::json(json!({
                "serves_area": false,
                "message": format!(
                    "We don't currently serve {}, but we're always expanding! We'd love to stay in touch about your catering needs and can notify you when we expand to your area.",
                    title_case(city)
                ),
            })));
        };

        let partners: Vec<&str> = find_partners(&self.data, &PartnerQuery::new(&area.city, SAMPLE_PARTNERS))
            .into_iter()
            .map(|p| p.name.as_str())
            .collect();

        let mut message = if partners.is_empty() {
            format!("Great! We operate in {}, {}.", area.city, area.state)
        } else {
            format!(
                "Great! We operate in {}, {} and have some great partners there including {}.",
                area.city,
                area.state,
                partners.join(", ")
            )
        };
        if let Some(notes) = &area.notes {
            message.push_str(&format!(" We cover {}.", notes));
        }

        Ok(ToolOutput::json(json!({
            "serves_area": true,
            "city": area.city,
            "state": area.state,
            "lead_time_hours": area.lead_time_hours,
            "restaurant_count": area.restaurant_count,
            "notes": area.notes,
            "sample_partners": partners,
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

    fn tool() -> CheckServiceAreaTool {
        CheckServiceAreaTool::new(Arc::new(ReferenceData::builtin()))
    }

    #[tokio::test]
    async fn test_served_city() {
        let output = tool().execute(json!({"city": "nyc"})).await.unwrap();
        let value = output.as_json().unwrap();
        assert_eq!(value["serves_area"], true);
        assert_eq!(value["city"], "New York City");
        assert_eq!(value["restaurant_count"], 25);
        let message = value["message"].as_str().unwrap();
        assert!(message.starts_with("Great! We operate in New York City, NY"));
        assert!(message.contains("Ben's Fast Food, Pokeworks, Starbird Chicken"));
        assert!(message.contains("We cover Manhattan, Brooklyn"));
    }

    #[tokio::test]
    async fn test_served_city_without_partners() {
        let value = tool().execute(json!({"city": "Denver"})).await.unwrap().as_json().unwrap();
        assert_eq!(value["message"], "Great! We operate in Denver, CO.");
    }

    #[tokio::test]
    async fn test_unserved_city() {
        let value = tool()
            .execute(json!({"city": "portland"}))
            .await
            .unwrap()
            .as_json()
            .unwrap();
        assert_eq!(value["serves_area"], false);
        assert!(value["message"]
            .as_str()
            .unwrap()
            .starts_with("We don't currently serve Portland,"));
    }

    #[test]
    fn test_missing_city_fails_validation() {
        assert!(tool().validate(&json!({})).is_err());
    }
}
