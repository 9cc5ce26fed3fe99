//! Stage engine
//!
//! One node per conversation stage. Every node checks that the state is
//! currently in its stage and otherwise returns `None` without touching the
//! state, so nodes can be invoked in any order. A node that runs records
//! what it extracted, appends its reply to the transcript and moves the
//! stage forward.
//!
//! Nothing here fails: extraction misses leave fields unknown and the
//! conversation keeps moving. The engine never performs I/O; a step that
//! qualifies a lead hands the record back in [`StepOutcome::lead`] and the
//! driver dispatches it.

use std::sync::Arc;

use lead_agent_config::{
    render, PromptTemplates, QualificationPolicy, ReferenceData, RestaurantPartner, Settings,
};
use lead_agent_core::{ConversationStage, ConversationState, LeadRecord, UserNeed};
use lead_agent_tools::{check_area, find_partners, PartnerQuery};

use crate::extraction::{Extractor, KeywordExtractor};
use crate::lead_scoring::{LeadScore, LeadScorer};
use crate::stage::next_stage;

/// Result of a node that ran
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub from: ConversationStage,
    pub to: ConversationStage,
    pub reply: Option<String>,
    /// Lead qualified by this step, waiting to be dispatched
    pub lead: Option<LeadRecord>,
}

impl StepOutcome {
    pub fn advanced(&self) -> bool {
        self.from != self.to
    }
}

/// Per-stage nodes over [`ConversationState`]
pub struct QualificationEngine {
    data: Arc<ReferenceData>,
    scorer: LeadScorer,
    prompts: PromptTemplates,
    extractor: Arc<dyn Extractor>,
    showcase_limit: usize,
    sales_email: String,
    cuisine_tags: Vec<String>,
    dietary_tags: Vec<String>,
}

fn distinct_tags<'a>(tags: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        if !out.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            out.push(tag.clone());
        }
    }
    out
}

impl QualificationEngine {
    pub fn new(data: Arc<ReferenceData>, policy: QualificationPolicy, prompts: PromptTemplates) -> Self {
        let cuisine_tags = distinct_tags(data.restaurant_partners.iter().flat_map(|p| &p.cuisine_tags));
        let dietary_tags = distinct_tags(data.restaurant_partners.iter().flat_map(|p| &p.dietary_tags));
        Self {
            data,
            scorer: LeadScorer::new(policy),
            prompts,
            extractor: Arc::new(KeywordExtractor::default()),
            showcase_limit: 3,
            sales_email: "sales@mealoutpost.com".to_string(),
            cuisine_tags,
            dietary_tags,
        }
    }

    pub fn from_settings(settings: &Settings, data: Arc<ReferenceData>) -> Self {
        Self::new(data, settings.qualification.clone(), settings.prompts.clone())
            .with_showcase_limit(settings.agent.showcase_limit)
            .with_sales_email(settings.notification.sales_email.clone())
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_showcase_limit(mut self, limit: usize) -> Self {
        self.showcase_limit = limit;
        self
    }

    pub fn with_sales_email(mut self, sales_email: impl Into<String>) -> Self {
        self.sales_email = sales_email.into();
        self
    }

    pub fn data(&self) -> &ReferenceData {
        &self.data
    }

    pub fn scorer(&self) -> &LeadScorer {
        &self.scorer
    }

    pub fn policy(&self) -> &QualificationPolicy {
        self.scorer.policy()
    }

    pub fn prompts(&self) -> &PromptTemplates {
        &self.prompts
    }

    pub fn extractor(&self) -> &dyn Extractor {
        self.extractor.as_ref()
    }

    pub fn sales_email(&self) -> &str {
        &self.sales_email
    }

    /// Run the node for the current stage
    pub fn step(&self, state: &mut ConversationState, message: &str) -> Option<StepOutcome> {
        use ConversationStage::*;

        match state.stage() {
            Greeting => self.greet(state),
            Discovery => self.discover(state, message),
            Location => self.locate(state, message),
            Timing => self.record_timing(state, message),
            Scale => self.record_scale(state, message),
            Frequency => self.record_frequency(state, message),
            Preferences => self.record_preferences(state, message),
            PartnerShowcase => self.showcase(state),
            ContactCapture => self.capture_contact(state, message),
            EmailCollection => self.collect_email(state, message),
            Handoff => self.close(state),
            Complete | End => None,
        }
    }

    fn transition(
        &self,
        state: &mut ConversationState,
        to: ConversationStage,
        reply: Option<String>,
    ) -> StepOutcome {
        let from = state.stage();
        if let Some(reply) = &reply {
            state.push_assistant(reply.clone());
        }
        if from != to && state.advance_to(to) {
            tracing::debug!(
                session_id = %state.session_id(),
                from = from.as_str(),
                to = to.as_str(),
                "Stage transition"
            );
            metrics::counter!(
                "lead_agent_stage_transitions_total",
                "from" => from.as_str(),
                "to" => to.as_str()
            )
            .increment(1);
        }
        StepOutcome {
            from,
            to: state.stage(),
            reply,
            lead: None,
        }
    }

    pub fn greet(&self, state: &mut ConversationState) -> Option<StepOutcome> {
        if state.stage() != ConversationStage::Greeting {
            return None;
        }
        Some(self.transition(
            state,
            ConversationStage::Discovery,
            Some(self.prompts.welcome.clone()),
        ))
    }

    pub fn discover(&self, state: &mut ConversationState, message: &str) -> Option<StepOutcome> {
        if state.stage() != ConversationStage::Discovery {
            return None;
        }
        state.user_need = Some(self.extractor.need_type(message));
        Some(self.transition(
            state,
            ConversationStage::Location,
            Some(self.prompts.ask_location.clone()),
        ))
    }

    pub fn locate(&self, state: &mut ConversationState, message: &str) -> Option<StepOutcome> {
        if state.stage() != ConversationStage::Location {
            return None;
        }
        let reply = match check_area(&self.data, message) {
            Some(area) => {
                state.set_served_location(&area.city, &area.state);
                render(&self.prompts.location_served, &[("city", area.city.as_str())])
            }
            None => {
                tracing::debug!(session_id = %state.session_id(), "Location outside service area");
                state.set_unserved_location();
                self.prompts.location_unserved.clone()
            }
        };
        Some(self.transition(state, ConversationStage::Timing, Some(reply)))
    }

    pub fn record_timing(&self, state: &mut ConversationState, message: &str) -> Option<StepOutcome> {
        if state.stage() != ConversationStage::Timing {
            return None;
        }
        let timing = message.trim();
        state.timing = (!timing.is_empty()).then(|| timing.to_string());
        Some(self.transition(
            state,
            ConversationStage::Scale,
            Some(self.prompts.ask_headcount.clone()),
        ))
    }

    pub fn record_scale(&self, state: &mut ConversationState, message: &str) -> Option<StepOutcome> {
        if state.stage() != ConversationStage::Scale {
            return None;
        }
        let headcount = self.extractor.headcount(message);
        state.set_headcount(headcount, self.policy().minimum_order_size);

        let next = next_stage(ConversationStage::Scale, state.user_need)
            .unwrap_or(ConversationStage::Preferences);
        let reply = if next == ConversationStage::Frequency {
            self.prompts.ask_frequency.clone()
        } else {
            self.prompts.ask_preferences.clone()
        };
        Some(self.transition(state, next, Some(reply)))
    }

    pub fn record_frequency(&self, state: &mut ConversationState, message: &str) -> Option<StepOutcome> {
        if state.stage() != ConversationStage::Frequency {
            return None;
        }
        let frequency = message.trim();
        if !frequency.is_empty() && state.user_need == Some(UserNeed::Recurring) {
            state.frequency = Some(frequency.to_string());
        }
        Some(self.transition(
            state,
            ConversationStage::Preferences,
            Some(self.prompts.ask_preferences_after_frequency.clone()),
        ))
    }

    /// Keeps the answer verbatim as one preference entry; known dietary tags
    /// named in it are also recorded as dietary requirements.
    pub fn record_preferences(&self, state: &mut ConversationState, message: &str) -> Option<StepOutcome> {
        if state.stage() != ConversationStage::Preferences {
            return None;
        }
        state.add_cuisine_preference(message);
        for tag in self.extractor.tags(message, &self.dietary_tags) {
            state.add_dietary_requirement(&tag);
        }
        Some(self.transition(state, ConversationStage::PartnerShowcase, None))
    }

    pub fn showcase(&self, state: &mut ConversationState) -> Option<StepOutcome> {
        if state.stage() != ConversationStage::PartnerShowcase {
            return None;
        }
        let reply = match (state.is_in_service_area(), state.location_city()) {
            (Some(true), Some(city)) => self.showcase_message(state, city),
            _ => self.prompts.showcase_unserved.clone(),
        };
        Some(self.transition(state, ConversationStage::ContactCapture, Some(reply)))
    }

    /// Partners for the showcase: cuisine matches first, then dietary
    /// matches, then the rest of the city in table order.
    pub fn showcase_partners(&self, state: &ConversationState, city: &str) -> Vec<&RestaurantPartner> {
        let preferences: Vec<&str> = state.cuisine_preferences.iter().map(String::as_str).collect();
        let preferences = preferences.join(" ");
        let cuisine = self.extractor.tags(&preferences, &self.cuisine_tags);
        let dietary: Vec<String> = state.dietary_requirements.iter().cloned().collect();

        let all = self.data.restaurant_partners.len();
        let mut queries = Vec::new();
        if !cuisine.is_empty() {
            queries.push(PartnerQuery::new(city, all).with_cuisine(cuisine));
        }
        if !dietary.is_empty() {
            queries.push(PartnerQuery::new(city, all).with_dietary(dietary));
        }
        queries.push(PartnerQuery::new(city, all));

        let mut picked: Vec<&RestaurantPartner> = Vec::new();
        for query in &queries {
            for partner in find_partners(&self.data, query) {
                if picked.len() >= self.showcase_limit {
                    return picked;
                }
                if !picked.iter().any(|p| std::ptr::eq(*p, partner)) {
                    picked.push(partner);
                }
            }
        }
        picked
    }

    fn showcase_message(&self, state: &ConversationState, city: &str) -> String {
        let restaurant_count = self
            .data
            .area(city)
            .map(|a| a.restaurant_count.to_string())
            .unwrap_or_else(|| "many".to_string());
        let vars = [("city", city), ("restaurant_count", restaurant_count.as_str())];

        let partners = self.showcase_partners(state, city);
        let mut message = if partners.is_empty() {
            render(&self.prompts.showcase_no_partners, &vars)
        } else {
            let items: Vec<String> = partners
                .iter()
                .map(|p| {
                    render(
                        &self.prompts.showcase_item,
                        &[("name", p.name.as_str()), ("description", p.description.as_str())],
                    )
                })
                .collect();
            format!("{}\n\n{}", render(&self.prompts.showcase_intro, &vars), items.join("\n"))
        };
        message.push_str("\n\n");
        message.push_str(&self.prompts.showcase_outro);
        message
    }

    pub fn capture_contact(&self, state: &mut ConversationState, message: &str) -> Option<StepOutcome> {
        if state.stage() != ConversationStage::ContactCapture {
            return None;
        }
        if self.extractor.is_affirmative(message) {
            Some(self.transition(
                state,
                ConversationStage::EmailCollection,
                Some(self.prompts.ask_email.clone()),
            ))
        } else {
            tracing::info!(session_id = %state.session_id(), "Visitor declined handoff");
            let reply = render(&self.prompts.decline, &[("sales_email", self.sales_email.as_str())]);
            Some(self.transition(state, ConversationStage::End, Some(reply)))
        }
    }

    /// Records the email, qualifies the lead and emits the summary. A blank
    /// answer re-asks for the email without leaving the stage.
    pub fn collect_email(&self, state: &mut ConversationState, message: &str) -> Option<StepOutcome> {
        if state.stage() != ConversationStage::EmailCollection {
            return None;
        }
        let Some(email) = self.extractor.email(message) else {
            return Some(self.transition(
                state,
                ConversationStage::EmailCollection,
                Some(self.prompts.ask_email.clone()),
            ));
        };
        state.contact_email = Some(email);
        if let Some(phone) = self.extractor.phone(message) {
            state.contact_phone = Some(phone);
        }

        let lead = self.qualify(state);
        let reply = self.summary(state);
        let mut outcome = self.transition(state, ConversationStage::Handoff, Some(reply));
        outcome.lead = lead;
        Some(outcome)
    }

    pub fn close(&self, state: &mut ConversationState) -> Option<StepOutcome> {
        if state.stage() != ConversationStage::Handoff {
            return None;
        }
        Some(self.transition(
            state,
            ConversationStage::Complete,
            Some(self.prompts.closing.clone()),
        ))
    }

    /// Score the lead and record the outcome on the state. Returns `None`
    /// when qualification is not allowed yet or already happened.
    pub fn qualify(&self, state: &mut ConversationState) -> Option<LeadRecord> {
        if !state.can_qualify() {
            return None;
        }
        let score = self
            .scorer
            .score(state.is_in_service_area(), state.headcount(), state.user_need);
        if !state.record_qualification(score.status, score.score) {
            return None;
        }
        tracing::info!(
            session_id = %state.session_id(),
            status = score.status.as_str(),
            score = score.score,
            "Lead qualified"
        );
        Some(self.lead_record(state, &score))
    }

    pub fn lead_record(&self, state: &ConversationState, score: &LeadScore) -> LeadRecord {
        LeadRecord {
            email: state.contact_email.clone().unwrap_or_default(),
            phone: state.contact_phone.clone(),
            city: state.location_city().map(str::to_string),
            state: state.location_state().map(str::to_string),
            need_type: state.user_need,
            headcount: state.headcount(),
            timing: state.timing.clone(),
            frequency: state.frequency.clone(),
            cuisine_preferences: state.cuisine_preferences.iter().cloned().collect(),
            dietary_requirements: state.dietary_requirements.iter().cloned().collect(),
            qualification_status: score.status,
            score: score.score,
            reasons: score.reasons.clone(),
            recommendation: score.recommendation,
            in_service_area: state.is_in_service_area() == Some(true),
            meets_minimum: state.meets_minimum(),
        }
    }

    /// Attempt location and headcount from earlier visitor messages when no
    /// node or tool has yet. Either may stay unknown.
    pub fn backfill(&self, state: &mut ConversationState) {
        if !state.location_attempted() {
            let area = state
                .transcript()
                .user_messages()
                .find_map(|m| check_area(&self.data, m));
            match area {
                Some(area) => state.set_served_location(&area.city, &area.state),
                None => state.set_unserved_location(),
            }
        }
        if !state.headcount_attempted() {
            let headcount = state
                .transcript()
                .user_messages()
                .find_map(|m| self.extractor.headcount_mention(m));
            state.set_headcount(headcount, self.policy().minimum_order_size);
        }
    }

    /// Visitor-facing recap after the email is captured
    pub fn summary(&self, state: &ConversationState) -> String {
        let headcount = state
            .headcount()
            .map(|h| h.to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        render(
            &self.prompts.summary,
            &[
                ("email", state.contact_email.as_deref().unwrap_or("")),
                (
                    "location",
                    state.location_city().unwrap_or("Outside current service area"),
                ),
                ("need", state.user_need.map(|n| n.as_str()).unwrap_or("Unknown")),
                ("headcount", headcount.as_str()),
                ("timing", state.timing.as_deref().unwrap_or("Unknown")),
            ],
        )
    }

    /// Captured facts as a bullet list, for the model's system prompt
    pub fn fact_summary(&self, state: &ConversationState) -> String {
        let mut lines = Vec::new();
        if let Some(need) = state.user_need {
            lines.push(format!("- Need: {}", need));
        }
        match (state.location_city(), state.is_in_service_area()) {
            (Some(city), _) => lines.push(format!(
                "- Location: {}, {} (served)",
                city,
                state.location_state().unwrap_or("")
            )),
            (None, Some(false)) => lines.push("- Location: outside current service area".to_string()),
            _ => {}
        }
        if let Some(timing) = &state.timing {
            lines.push(format!("- Timing: {}", timing));
        }
        if let Some(headcount) = state.headcount() {
            lines.push(format!("- Group size: {} people", headcount));
        }
        if let Some(frequency) = &state.frequency {
            lines.push(format!("- Frequency: {}", frequency));
        }
        if !state.cuisine_preferences.is_empty() {
            let prefs: Vec<&str> = state.cuisine_preferences.iter().map(String::as_str).collect();
            lines.push(format!("- Preferences: {}", prefs.join(", ")));
        }
        if !state.dietary_requirements.is_empty() {
            let diet: Vec<&str> = state.dietary_requirements.iter().map(String::as_str).collect();
            lines.push(format!("- Dietary: {}", diet.join(", ")));
        }
        if let Some(email) = &state.contact_email {
            lines.push(format!("- Email: {}", email));
        }
        if state.ready_for_handoff() {
            lines.push("- Lead already sent to the sales team".to_string());
        }

        if lines.is_empty() {
            "Nothing captured yet.".to_string()
        } else {
            lines.join("\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_agent_core::QualificationStatus;

    fn engine() -> QualificationEngine {
        QualificationEngine::new(
            Arc::new(ReferenceData::builtin()),
            QualificationPolicy::default(),
            PromptTemplates::default(),
        )
    }

    fn state_at(engine: &QualificationEngine, answers: &[&str]) -> ConversationState {
        let mut state = ConversationState::new("test");
        engine.greet(&mut state);
        for answer in answers {
            state.push_user(*answer);
            engine.step(&mut state, answer);
        }
        state
    }

    #[test]
    fn test_greeting_moves_to_discovery() {
        let engine = engine();
        let mut state = ConversationState::new("test");
        let outcome = engine.greet(&mut state).unwrap();
        assert_eq!(outcome.to, ConversationStage::Discovery);
        assert!(outcome.reply.unwrap().starts_with("Hi! Welcome to Meal Outpost."));
        assert_eq!(state.transcript().len(), 1);
    }

    #[test]
    fn test_nodes_are_noops_outside_their_stage() {
        let engine = engine();
        let mut state = state_at(&engine, &["daily lunch", "Boston"]);
        assert_eq!(state.stage(), ConversationStage::Timing);
        let before = serde_json::to_value(&state).unwrap();

        assert!(engine.greet(&mut state).is_none());
        assert!(engine.discover(&mut state, "a one-time event").is_none());
        assert!(engine.locate(&mut state, "Seattle").is_none());
        assert!(engine.record_scale(&mut state, "45").is_none());
        assert!(engine.collect_email(&mut state, "a@b.co").is_none());
        assert!(engine.close(&mut state).is_none());

        assert_eq!(serde_json::to_value(&state).unwrap(), before);
    }

    #[test]
    fn test_location_served_and_unserved() {
        let engine = engine();
        let state = state_at(&engine, &["event", "Manhattan, New York City"]);
        assert_eq!(state.location_city(), Some("New York City"));
        assert_eq!(state.location_state(), Some("NY"));
        assert_eq!(state.is_in_service_area(), Some(true));

        let state = state_at(&engine, &["event", "Portland, Oregon"]);
        assert_eq!(state.is_in_service_area(), Some(false));
        assert_eq!(state.location_city(), None);
        assert_eq!(state.stage(), ConversationStage::Timing);
    }

    #[test]
    fn test_scale_branches_to_frequency_for_recurring() {
        let engine = engine();
        let state = state_at(&engine, &["daily lunch", "Boston", "next month", "45 people"]);
        assert_eq!(state.stage(), ConversationStage::Frequency);
        assert_eq!(state.meets_minimum(), Some(true));

        let state = state_at(&engine, &["team meeting", "Boston", "Friday", "lots of folks"]);
        assert_eq!(state.stage(), ConversationStage::Preferences);
        assert_eq!(state.headcount(), None);
        assert_eq!(state.meets_minimum(), None);
        assert!(state.headcount_attempted());
    }

    #[test]
    fn test_zero_headcount_is_below_minimum() {
        let engine = engine();
        let state = state_at(&engine, &["team meeting", "Boston", "Friday", "0"]);
        assert_eq!(state.headcount(), Some(0));
        assert_eq!(state.meets_minimum(), Some(false));
        assert_eq!(state.stage(), ConversationStage::Preferences);
    }

    #[test]
    fn test_showcase_lists_matching_partners_first() {
        let engine = engine();
        let mut state = state_at(
            &engine,
            &["event", "NYC", "Friday", "30", "BBQ please, some vegan options"],
        );
        assert_eq!(state.stage(), ConversationStage::PartnerShowcase);
        assert!(state.dietary_requirements.contains("vegan"));

        let names: Vec<&str> = engine
            .showcase_partners(&state, "New York City")
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["Starbird Chicken", "Pokeworks", "Ben's Fast Food"]);

        let outcome = engine.showcase(&mut state).unwrap();
        let reply = outcome.reply.unwrap();
        assert!(reply.contains("In New York City, we work with 25+ restaurant partners"));
        assert!(reply.contains("• **Starbird Chicken** - Delicious chicken meals"));
        assert_eq!(state.stage(), ConversationStage::ContactCapture);
    }

    #[test]
    fn test_showcase_without_partners_or_area() {
        let engine = engine();
        let mut state = state_at(&engine, &["event", "Chicago", "Friday", "30", "anything"]);
        let reply = engine.showcase(&mut state).unwrap().reply.unwrap();
        assert!(reply.starts_with("Great choices! In Chicago, we work with 18+ restaurant partners."));

        let mut state = state_at(&engine, &["event", "Portland", "Friday", "30", "anything"]);
        let reply = engine.showcase(&mut state).unwrap().reply.unwrap();
        assert!(reply.contains("Even though we don't serve your area yet"));
    }

    #[test]
    fn test_decline_ends_conversation() {
        let engine = engine();
        let mut state = state_at(&engine, &["event", "Boston", "Friday", "30", "Thai"]);
        engine.showcase(&mut state);
        state.push_user("no thanks");
        let outcome = engine.capture_contact(&mut state, "no thanks").unwrap();
        assert_eq!(outcome.to, ConversationStage::End);
        assert!(outcome.reply.unwrap().contains("sales@mealoutpost.com"));
        assert!(engine.step(&mut state, "hello?").is_none());
    }

    #[test]
    fn test_email_collection_qualifies_once() {
        let engine = engine();
        let mut state = state_at(&engine, &["event", "Boston", "Friday", "30", "Thai"]);
        engine.showcase(&mut state);
        engine.capture_contact(&mut state, "yes");

        let retry = engine.collect_email(&mut state, "  ").unwrap();
        assert!(!retry.advanced());
        assert!(retry.lead.is_none());

        let outcome = engine.collect_email(&mut state, "jo@acme.io").unwrap();
        let lead = outcome.lead.unwrap();
        assert_eq!(lead.email, "jo@acme.io");
        assert_eq!(lead.qualification_status, QualificationStatus::Qualified);
        assert_eq!(lead.score, 90);
        assert_eq!(lead.city.as_deref(), Some("Boston"));
        assert!(outcome.reply.unwrap().contains("- Location: Boston"));
        assert_eq!(state.stage(), ConversationStage::Handoff);
        assert!(engine.qualify(&mut state).is_none());
    }

    #[test]
    fn test_backfill_from_transcript() {
        let engine = engine();
        let mut state = ConversationState::new("test");
        state.push_user("We need lunch for 30 people in Seattle");
        engine.backfill(&mut state);
        assert_eq!(state.location_city(), Some("Seattle"));
        assert_eq!(state.headcount(), Some(30));

        let mut state = ConversationState::new("test");
        state.push_user("Just browsing");
        engine.backfill(&mut state);
        assert_eq!(state.is_in_service_area(), Some(false));
        assert!(state.location_attempted());
        assert!(state.headcount_attempted());
        assert_eq!(state.headcount(), None);
    }

    #[test]
    fn test_fact_summary() {
        let engine = engine();
        let state = ConversationState::new("test");
        assert_eq!(engine.fact_summary(&state), "Nothing captured yet.");

        let state = state_at(&engine, &["daily lunch", "Boston", "next month", "45"]);
        let summary = engine.fact_summary(&state);
        assert!(summary.contains("- Need: recurring"));
        assert!(summary.contains("- Location: Boston, MA (served)"));
        assert!(summary.contains("- Group size: 45 people"));
    }
}
