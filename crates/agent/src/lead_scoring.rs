//! Lead scoring
//!
//! Additive points from three factors evaluated in a fixed order (service
//! area, headcount, need type), then a tier from the configured cut points.
//! Pure and deterministic: the same inputs always give the same score,
//! reasons and status.

use serde::{Deserialize, Serialize};

use lead_agent_config::QualificationPolicy;
use lead_agent_core::{QualificationStatus, RoutingRecommendation, UserNeed};

/// Scoring result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadScore {
    pub status: QualificationStatus,
    pub score: u32,
    /// One entry per factor that contributed a reason, in evaluation order
    pub reasons: Vec<String>,
    pub recommendation: RoutingRecommendation,
}

/// Scores leads against a qualification policy
#[derive(Debug, Clone, Default)]
pub struct LeadScorer {
    policy: QualificationPolicy,
}

impl LeadScorer {
    pub fn new(policy: QualificationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &QualificationPolicy {
        &self.policy
    }

    /// Score a lead. Unknown service area counts as outside it; unknown
    /// headcount and exploring or unknown need add neither points nor reasons.
    pub fn score(
        &self,
        in_service_area: Option<bool>,
        headcount: Option<u32>,
        need: Option<UserNeed>,
    ) -> LeadScore {
        let weights = &self.policy.weights;
        let mut score = 0;
        let mut reasons = Vec::with_capacity(3);

        if in_service_area == Some(true) {
            score += weights.in_service_area;
            reasons.push("In service area".to_string());
        } else {
            reasons.push("Outside current service area".to_string());
        }

        if let Some(people) = headcount {
            if people >= self.policy.minimum_order_size {
                score += weights.meets_minimum;
                reasons.push(format!("Meets minimum size ({} people)", people));
            } else if people >= self.policy.substantial_order_size {
                score += weights.substantial;
                reasons.push(format!(
                    "Below preferred minimum but substantial ({} people)",
                    people
                ));
            } else {
                reasons.push(format!("Small order size ({} people)", people));
            }
        }

        match need {
            Some(UserNeed::Recurring) => {
                score += weights.recurring;
                reasons.push("Recurring need (high value)".to_string());
            }
            Some(UserNeed::OneTime) => {
                score += weights.one_time;
                reasons.push("One-time event".to_string());
            }
            Some(UserNeed::Exploring) | None => {}
        }

        let status = self.status_for(score);
        LeadScore {
            status,
            score,
            reasons,
            recommendation: status.recommendation(),
        }
    }

    /// Tier for a total score
    pub fn status_for(&self, score: u32) -> QualificationStatus {
        let thresholds = &self.policy.thresholds;
        if score >= thresholds.qualified {
            QualificationStatus::Qualified
        } else if score >= thresholds.maybe {
            QualificationStatus::Maybe
        } else {
            QualificationStatus::NotQualified
        }
    }
}
