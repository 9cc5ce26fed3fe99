//! Lead record handed to the sales process

use serde::{Deserialize, Serialize};

use crate::state::{QualificationStatus, RoutingRecommendation, UserNeed};

/// Structured lead produced at handoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub need_type: Option<UserNeed>,
    pub headcount: Option<u32>,
    pub timing: Option<String>,
    pub frequency: Option<String>,
    pub cuisine_preferences: Vec<String>,
    #[serde(default)]
    pub dietary_requirements: Vec<String>,
    pub qualification_status: QualificationStatus,
    pub score: u32,
    #[serde(default)]
    pub reasons: Vec<String>,
    pub recommendation: RoutingRecommendation,
    pub in_service_area: bool,
    pub meets_minimum: Option<bool>,
}

/// Placeholder lead identifier; no store assigns real ids
pub fn new_lead_id() -> String {
    format!(
        "LEAD-{}",
        uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase()
    )
}
