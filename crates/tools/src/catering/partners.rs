//! Restaurant Partner Search Tool

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use lead_agent_config::{CapacityTier, ReferenceData};

use crate::lookup::{find_partners, PartnerQuery};
use crate::mcp::{InputSchema, PropertySchema, Tool, ToolError, ToolOutput, ToolSchema};

const DEFAULT_LIMIT: usize = 5;

pub struct FindRestaurantPartnersTool {
    data: Arc<ReferenceData>,
}

impl FindRestaurantPartnersTool {
    pub fn new(data: Arc<ReferenceData>) -> Self {
        Self { data }
    }
}

fn string_list(input: &Value, key: &str) -> Vec<String> {
    match input.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl Tool for FindRestaurantPartnersTool {
    fn name(&self) -> &str {
        "find_restaurant_partners"
    }

    fn description(&self) -> &str {
        "Find restaurant partners in a city, optionally filtered by cuisine, dietary options and kitchen size"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: InputSchema::object()
                .property("city", PropertySchema::string("City to search in"), true)
                .property(
                    "cuisine_type",
                    PropertySchema::string_array("Cuisine types, any of which may match"),
                    false,
                )
                .property(
                    "dietary_needs",
                    PropertySchema::string_array("Dietary requirements, any of which may match"),
                    false,
                )
                .property(
                    "capacity",
                    PropertySchema::enum_type(
                        "Largest kitchen size to include",
                        vec!["small".into(), "medium".into(), "large".into()],
                    ),
                    false,
                )
                .property(
                    "limit",
                    PropertySchema::integer("Maximum number of partners")
                        .with_default(json!(DEFAULT_LIMIT))
                        .with_range(1.0, 20.0),
                    false,
                ),
        }
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let city = input
            .get("city")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::invalid_params("city is required"))?;

        let limit = input
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|l| l as usize)
            .unwrap_or(DEFAULT_LIMIT);

        let mut query = PartnerQuery::new(city, limit)
            .with_cuisine(string_list(&input, "cuisine_type"))
            .with_dietary(string_list(&input, "dietary_needs"));

        if let Some(capacity) = input.get("capacity").and_then(|v| v.as_str()) {
            let ceiling = CapacityTier::parse(capacity).ok_or_else(|| {
                ToolError::invalid_params(format!("Unknown capacity: {}", capacity))
            })?;
            query = query.with_capacity_ceiling(ceiling);
        }

        let partners: Vec<Value> = find_partners(&self.data, &query)
            .into_iter()
            .map(|p| {
                json!({
                    "name": p.name,
                    "cuisine": p.cuisine_tags.join(", "),
                    "description": p.description,
                    "capacity": p.capacity.as_str(),
                    "dietary_options": p.dietary_tags.join(", "),
                    "avg_price": p.avg_price_per_person,
                })
            })
            .collect();

        tracing::debug!(city = %city, count = partners.len(), "Partner search");

        Ok(ToolOutput::json(json!({
            "city": city,
            "count": partners.len(),
            "partners": partners,
        })))
    }

    fn timeout_secs(&self) -> u64 {
        5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> FindRestaurantPartnersTool {
        FindRestaurantPartnersTool::new(Arc::new(ReferenceData::builtin()))
    }

    #[tokio::test]
    async fn test_search_with_filters() {
        let value = tool()
            .execute(json!({
                "city": "San Francisco",
                "cuisine_type": ["indian street food"],
                "dietary_needs": ["vegan"],
                "capacity": "medium"
            }))
            .await
            .unwrap()
            .as_json()
            .unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["partners"][0]["name"], "Curry Up Now");
        assert_eq!(value["partners"][0]["avg_price"], "$19-27");
    }

    #[tokio::test]
    async fn test_limit_and_unknown_city() {
        let value = tool()
            .execute(json!({"city": "New York City", "limit": 2}))
            .await
            .unwrap()
            .as_json()
            .unwrap();
        assert_eq!(value["count"], 2);

        let value = tool()
            .execute(json!({"city": "Portland"}))
            .await
            .unwrap()
            .as_json()
            .unwrap();
        assert_eq!(value["count"], 0);
    }

    #[test]
    fn test_validation() {
        let tool = tool();
        assert!(tool.validate(&json!({"city": "Boston", "capacity": "huge"})).is_err());
        assert!(tool.validate(&json!({"city": "Boston", "limit": 0})).is_err());
        assert!(tool.validate(&json!({"city": "Boston", "cuisine_type": "Thai"})).is_err());
    }
}
