//! Qualification policy
//!
//! Business constants for lead scoring. Defaults reproduce the
//! established cut points: 50/30/15/20/10 points, Qualified at 70,
//! Maybe at 40, preferred minimum of 20 people.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Points awarded per factor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreWeights {
    #[serde(default = "default_in_service_area")]
    pub in_service_area: u32,
    #[serde(default = "default_meets_minimum")]
    pub meets_minimum: u32,
    /// Headcount below the minimum but at or above `substantial_order_size`
    #[serde(default = "default_substantial")]
    pub substantial: u32,
    #[serde(default = "default_recurring")]
    pub recurring: u32,
    #[serde(default = "default_one_time")]
    pub one_time: u32,
}

fn default_in_service_area() -> u32 {
    50
}
fn default_meets_minimum() -> u32 {
    30
}
fn default_substantial() -> u32 {
    15
}
fn default_recurring() -> u32 {
    20
}
fn default_one_time() -> u32 {
    10
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            in_service_area: default_in_service_area(),
            meets_minimum: default_meets_minimum(),
            substantial: default_substantial(),
            recurring: default_recurring(),
            one_time: default_one_time(),
        }
    }
}

/// Score cut points (inclusive)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationThresholds {
    #[serde(default = "default_qualified")]
    pub qualified: u32,
    #[serde(default = "default_maybe")]
    pub maybe: u32,
}

fn default_qualified() -> u32 {
    70
}
fn default_maybe() -> u32 {
    40
}

impl Default for QualificationThresholds {
    fn default() -> Self {
        Self {
            qualified: default_qualified(),
            maybe: default_maybe(),
        }
    }
}

/// Qualification policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualificationPolicy {
    /// Preferred people per order
    #[serde(default = "default_minimum_order_size")]
    pub minimum_order_size: u32,

    /// Smallest headcount still worth partial credit
    #[serde(default = "default_substantial_order_size")]
    pub substantial_order_size: u32,

    /// Lead time quoted for one-time orders
    #[serde(default = "default_one_time_lead_hours")]
    pub one_time_lead_hours: u32,

    /// Lead time quoted for setting up a recurring program
    #[serde(default = "default_recurring_setup_hours")]
    pub recurring_setup_hours: u32,

    #[serde(default)]
    pub weights: ScoreWeights,

    #[serde(default)]
    pub thresholds: QualificationThresholds,
}

fn default_minimum_order_size() -> u32 {
    20
}
fn default_substantial_order_size() -> u32 {
    10
}
fn default_one_time_lead_hours() -> u32 {
    48
}
fn default_recurring_setup_hours() -> u32 {
    168
}

impl Default for QualificationPolicy {
    fn default() -> Self {
        Self {
            minimum_order_size: default_minimum_order_size(),
            substantial_order_size: default_substantial_order_size(),
            one_time_lead_hours: default_one_time_lead_hours(),
            recurring_setup_hours: default_recurring_setup_hours(),
            weights: ScoreWeights::default(),
            thresholds: QualificationThresholds::default(),
        }
    }
}

impl QualificationPolicy {
    /// Highest score the weights allow
    pub fn max_score(&self) -> u32 {
        let w = &self.weights;
        w.in_service_area + w.meets_minimum.max(w.substantial) + w.recurring.max(w.one_time)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.minimum_order_size == 0 {
            return Err(ConfigError::invalid(
                "qualification.minimum_order_size",
                "Must be at least 1",
            ));
        }
        if self.substantial_order_size > self.minimum_order_size {
            return Err(ConfigError::invalid(
                "qualification.substantial_order_size",
                format!(
                    "Must not exceed minimum_order_size ({} > {})",
                    self.substantial_order_size, self.minimum_order_size
                ),
            ));
        }
        if self.weights.substantial > self.weights.meets_minimum {
            return Err(ConfigError::invalid(
                "qualification.weights.substantial",
                "Partial headcount credit must not exceed full credit",
            ));
        }
        if self.thresholds.maybe > self.thresholds.qualified {
            return Err(ConfigError::invalid(
                "qualification.thresholds",
                format!(
                    "maybe ({}) must not exceed qualified ({})",
                    self.thresholds.maybe, self.thresholds.qualified
                ),
            ));
        }
        if self.thresholds.qualified > self.max_score() {
            tracing::warn!(
                qualified = self.thresholds.qualified,
                max_score = self.max_score(),
                "Qualified threshold is unreachable with the configured weights"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = QualificationPolicy::default();
        assert_eq!(policy.minimum_order_size, 20);
        assert_eq!(policy.thresholds.qualified, 70);
        assert_eq!(policy.thresholds.maybe, 40);
        assert_eq!(policy.max_score(), 100);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_policy_validation() {
        let mut policy = QualificationPolicy::default();
        policy.substantial_order_size = 25;
        assert!(policy.validate().is_err());

        let mut policy = QualificationPolicy::default();
        policy.weights.substantial = 40;
        assert!(policy.validate().is_err());

        let mut policy = QualificationPolicy::default();
        policy.minimum_order_size = 0;
        policy.substantial_order_size = 0;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let policy: QualificationPolicy =
            serde_yaml::from_str("weights:\n  recurring: 25\n").unwrap();
        assert_eq!(policy.weights.recurring, 25);
        assert_eq!(policy.weights.one_time, 10);
        assert_eq!(policy.minimum_order_size, 20);
    }
}
