//! Per-session conversation state
//!
//! `ConversationState` is the single mutable record threaded through every
//! turn. Fields with invariants (stage, headcount and the derived minimum
//! flag, location outcome, qualification, handoff flag) are private and only
//! change through methods that enforce those invariants. Free-text facts are
//! plain public fields.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::conversation::{ConversationStage, Transcript, Turn};

/// Kind of catering need
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserNeed {
    OneTime,
    Recurring,
    Exploring,
}

impl UserNeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserNeed::OneTime => "one-time",
            UserNeed::Recurring => "recurring",
            UserNeed::Exploring => "exploring",
        }
    }

    /// Parse a need label as written by people or models
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace(['_', ' '], "-").as_str() {
            "one-time" | "onetime" | "event" => Some(UserNeed::OneTime),
            "recurring" | "program" => Some(UserNeed::Recurring),
            "exploring" => Some(UserNeed::Exploring),
            _ => None,
        }
    }
}

impl std::fmt::Display for UserNeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualification tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualificationStatus {
    Qualified,
    Maybe,
    #[serde(rename = "Not Qualified")]
    NotQualified,
}

impl QualificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualificationStatus::Qualified => "Qualified",
            QualificationStatus::Maybe => "Maybe",
            QualificationStatus::NotQualified => "Not Qualified",
        }
    }

    /// Routing derived purely from the tier
    pub fn recommendation(&self) -> RoutingRecommendation {
        match self {
            QualificationStatus::Qualified => RoutingRecommendation::ImmediateSales,
            QualificationStatus::Maybe => RoutingRecommendation::SalesEvaluation,
            QualificationStatus::NotQualified => RoutingRecommendation::FutureFollowUp,
        }
    }
}

impl std::fmt::Display for QualificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the sales process should pick up a lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingRecommendation {
    ImmediateSales,
    SalesEvaluation,
    FutureFollowUp,
}

impl RoutingRecommendation {
    pub fn description(&self) -> &'static str {
        match self {
            RoutingRecommendation::ImmediateSales => {
                "Route to sales team immediately - high-priority lead"
            }
            RoutingRecommendation::SalesEvaluation => {
                "Route to sales team for evaluation - potential opportunity"
            }
            RoutingRecommendation::FutureFollowUp => {
                "Capture information for future follow-up when expanding"
            }
        }
    }
}

impl std::fmt::Display for RoutingRecommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// State of one chat session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    session_id: String,
    transcript: Transcript,
    stage: ConversationStage,

    pub user_need: Option<UserNeed>,

    location_city: Option<String>,
    location_state: Option<String>,
    is_in_service_area: Option<bool>,
    location_attempted: bool,

    pub timing: Option<String>,

    headcount: Option<u32>,
    meets_minimum: Option<bool>,
    headcount_attempted: bool,

    pub frequency: Option<String>,
    pub cuisine_preferences: BTreeSet<String>,
    pub dietary_requirements: BTreeSet<String>,

    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,

    qualification_status: Option<QualificationStatus>,
    qualification_score: Option<u32>,
    ready_for_handoff: bool,
}

impl ConversationState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            transcript: Transcript::new(),
            stage: ConversationStage::Greeting,
            user_need: None,
            location_city: None,
            location_state: None,
            is_in_service_area: None,
            location_attempted: false,
            timing: None,
            headcount: None,
            meets_minimum: None,
            headcount_attempted: false,
            frequency: None,
            cuisine_preferences: BTreeSet::new(),
            dietary_requirements: BTreeSet::new(),
            contact_email: None,
            contact_phone: None,
            notes: None,
            qualification_status: None,
            qualification_score: None,
            ready_for_handoff: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn stage(&self) -> ConversationStage {
        self.stage
    }

    /// Move forward to `next`. Returns false (and changes nothing) if the
    /// current stage is terminal or `next` is not strictly later.
    pub fn advance_to(&mut self, next: ConversationStage) -> bool {
        if self.stage.is_terminal() || next.ordinal() <= self.stage.ordinal() {
            return false;
        }
        self.stage = next;
        true
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.transcript.push(Turn::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.transcript.push(Turn::assistant(content));
    }

    pub fn push_tool(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.transcript.push(Turn::tool(name, content));
    }

    pub fn location_city(&self) -> Option<&str> {
        self.location_city.as_deref()
    }

    pub fn location_state(&self) -> Option<&str> {
        self.location_state.as_deref()
    }

    pub fn is_in_service_area(&self) -> Option<bool> {
        self.is_in_service_area
    }

    pub fn location_attempted(&self) -> bool {
        self.location_attempted
    }

    /// Record a resolved service-area city
    pub fn set_served_location(&mut self, city: impl Into<String>, state: impl Into<String>) {
        self.location_city = Some(city.into());
        self.location_state = Some(state.into());
        self.is_in_service_area = Some(true);
        self.location_attempted = true;
    }

    /// Record a location outside the service areas; city and state stay unknown
    pub fn set_unserved_location(&mut self) {
        self.location_city = None;
        self.location_state = None;
        self.is_in_service_area = Some(false);
        self.location_attempted = true;
    }

    pub fn headcount(&self) -> Option<u32> {
        self.headcount
    }

    pub fn meets_minimum(&self) -> Option<bool> {
        self.meets_minimum
    }

    pub fn headcount_attempted(&self) -> bool {
        self.headcount_attempted
    }

    /// Record a headcount attempt; `meets_minimum` is derived from it
    pub fn set_headcount(&mut self, headcount: Option<u32>, minimum: u32) {
        self.headcount = headcount;
        self.meets_minimum = headcount.map(|h| h >= minimum);
        self.headcount_attempted = true;
    }

    pub fn qualification_status(&self) -> Option<QualificationStatus> {
        self.qualification_status
    }

    pub fn qualification_score(&self) -> Option<u32> {
        self.qualification_score
    }

    /// Whether qualification may be computed now: contact email known,
    /// location and headcount attempted, nothing recorded yet.
    pub fn can_qualify(&self) -> bool {
        self.qualification_status.is_none()
            && self.contact_email.is_some()
            && self.location_attempted
            && self.headcount_attempted
    }

    /// Record the qualification outcome. Happens once; later calls are
    /// rejected and return false.
    pub fn record_qualification(&mut self, status: QualificationStatus, score: u32) -> bool {
        if !self.can_qualify() {
            return false;
        }
        self.qualification_status = Some(status);
        self.qualification_score = Some(score);
        true
    }

    pub fn ready_for_handoff(&self) -> bool {
        self.ready_for_handoff
    }

    /// Mark the lead as dispatched. Requires a recorded qualification and
    /// only succeeds once.
    pub fn mark_handed_off(&mut self) -> bool {
        if self.ready_for_handoff || self.qualification_status.is_none() {
            return false;
        }
        self.ready_for_handoff = true;
        true
    }

    pub fn add_cuisine_preference(&mut self, preference: &str) {
        let preference = preference.trim();
        if !preference.is_empty() {
            self.cuisine_preferences.insert(preference.to_string());
        }
    }

    pub fn add_dietary_requirement(&mut self, requirement: &str) {
        let requirement = requirement.trim();
        if !requirement.is_empty() {
            self.dietary_requirements.insert(requirement.to_lowercase());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qualifiable_state() -> ConversationState {
        let mut state = ConversationState::new("test");
        state.set_unserved_location();
        state.set_headcount(None, 20);
        state.contact_email = Some("a@b.co".to_string());
        state
    }

    #[test]
    fn test_stage_only_moves_forward() {
        let mut state = ConversationState::new("test");
        assert!(state.advance_to(ConversationStage::Discovery));
        assert!(!state.advance_to(ConversationStage::Greeting));
        assert!(!state.advance_to(ConversationStage::Discovery));
        assert!(state.advance_to(ConversationStage::ContactCapture));
        assert!(state.advance_to(ConversationStage::End));
        assert!(!state.advance_to(ConversationStage::Complete));
        assert_eq!(state.stage(), ConversationStage::End);
    }

    #[test]
    fn test_meets_minimum_is_derived() {
        let mut state = ConversationState::new("test");
        assert_eq!(state.meets_minimum(), None);

        for h in [20, 21, 45, 1000] {
            state.set_headcount(Some(h), 20);
            assert_eq!(state.meets_minimum(), Some(true), "headcount {}", h);
        }
        for h in [0, 1, 10, 19] {
            state.set_headcount(Some(h), 20);
            assert_eq!(state.meets_minimum(), Some(false), "headcount {}", h);
        }
        state.set_headcount(None, 20);
        assert_eq!(state.meets_minimum(), None);
        assert!(state.headcount_attempted());
    }

    #[test]
    fn test_unserved_location_clears_city() {
        let mut state = ConversationState::new("test");
        assert_eq!(state.is_in_service_area(), None);
        state.set_unserved_location();
        assert_eq!(state.is_in_service_area(), Some(false));
        assert_eq!(state.location_city(), None);
        assert_eq!(state.location_state(), None);
        assert!(state.location_attempted());
    }

    #[test]
    fn test_qualification_requires_email_and_attempts() {
        let mut state = ConversationState::new("test");
        state.contact_email = Some("a@b.co".to_string());
        assert!(!state.record_qualification(QualificationStatus::Maybe, 40));

        let mut state = qualifiable_state();
        assert!(state.record_qualification(QualificationStatus::Maybe, 40));
        assert!(!state.record_qualification(QualificationStatus::Qualified, 100));
        assert_eq!(state.qualification_status(), Some(QualificationStatus::Maybe));
        assert_eq!(state.qualification_score(), Some(40));
    }

    #[test]
    fn test_handoff_flag_set_once_after_qualification() {
        let mut state = qualifiable_state();
        assert!(!state.mark_handed_off());
        state.record_qualification(QualificationStatus::NotQualified, 0);
        assert!(state.mark_handed_off());
        assert!(!state.mark_handed_off());
        assert!(state.ready_for_handoff());
    }

    #[test]
    fn test_preferences_are_deduplicated() {
        let mut state = ConversationState::new("test");
        state.add_cuisine_preference("Italian");
        state.add_cuisine_preference(" Italian ");
        state.add_cuisine_preference("");
        state.add_dietary_requirement("Vegan");
        state.add_dietary_requirement("vegan");
        assert_eq!(state.cuisine_preferences.len(), 1);
        assert_eq!(state.dietary_requirements.len(), 1);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(
            serde_json::to_string(&QualificationStatus::NotQualified).unwrap(),
            "\"Not Qualified\""
        );
        assert_eq!(serde_json::to_string(&UserNeed::OneTime).unwrap(), "\"one-time\"");
        assert_eq!(UserNeed::parse("One_Time"), Some(UserNeed::OneTime));
        assert_eq!(UserNeed::parse("recurring"), Some(UserNeed::Recurring));
        assert_eq!(UserNeed::parse("maybe"), None);
        assert_eq!(
            QualificationStatus::Maybe.recommendation(),
            RoutingRecommendation::SalesEvaluation
        );
    }
}
