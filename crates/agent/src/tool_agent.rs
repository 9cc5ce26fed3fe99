//! Tool-calling model driver
//!
//! The language model decides what to ask next and calls the lookup tools
//! plus two session tools (`record_requirements`, `send_lead_notification`).
//! Every tool result is folded into the conversation state, and the stage
//! moves forward to whatever the captured facts imply.
//!
//! A turn works on a draft copy of the state. The draft replaces the session
//! state only when the model produced a final reply, so a failed model call
//! or an exhausted tool loop leaves the session untouched and no lead is
//! sent.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use lead_agent_config::render;
use lead_agent_core::{
    ConversationStage, ConversationState, GenerateRequest, LanguageModel, LeadRecord, Message,
    ToolCall, ToolDefinition, TurnRole, UserNeed,
};
use lead_agent_tools::{
    InputSchema, PropertySchema, ToolError, ToolExecutor, ToolOutput, ToolSchema,
};

use crate::driver::{ConversationDriver, TurnReply};
use crate::engine::QualificationEngine;
use crate::handoff::HandoffDispatcher;
use crate::AgentError;

pub const RECORD_REQUIREMENTS: &str = "record_requirements";
pub const SEND_LEAD_NOTIFICATION: &str = "send_lead_notification";

/// Schemas of the tools that write to the session
pub fn session_tool_schemas() -> Vec<ToolSchema> {
    vec![
        ToolSchema {
            name: RECORD_REQUIREMENTS.to_string(),
            description: "Record the visitor's catering need, when they need it and how often"
                .to_string(),
            input_schema: InputSchema::object()
                .property(
                    "need_type",
                    PropertySchema::enum_type(
                        "Kind of catering need",
                        vec!["one-time".into(), "recurring".into(), "exploring".into()],
                    ),
                    true,
                )
                .property("timing", PropertySchema::string("When they need catering"), false)
                .property(
                    "frequency",
                    PropertySchema::string("How often, for recurring programs"),
                    false,
                ),
        },
        ToolSchema {
            name: SEND_LEAD_NOTIFICATION.to_string(),
            description: "Send the qualified lead to the sales team once the visitor has given an email address"
                .to_string(),
            input_schema: InputSchema::object()
                .property("email", PropertySchema::string("Visitor email address"), true)
                .property(
                    "details",
                    PropertySchema::string("Anything else the sales team should know"),
                    false,
                ),
        },
    ]
}

/// Furthest stage the captured facts justify
fn implied_stage(state: &ConversationState) -> ConversationStage {
    use ConversationStage::*;

    let mut reached = vec![Discovery];
    if state.user_need.is_some() {
        reached.push(Location);
    }
    if state.location_attempted() {
        reached.push(Timing);
    }
    if state.timing.is_some() {
        reached.push(Scale);
    }
    if state.headcount_attempted() {
        let waiting_on_frequency =
            state.user_need == Some(UserNeed::Recurring) && state.frequency.is_none();
        reached.push(if waiting_on_frequency { Frequency } else { Preferences });
    }
    if !state.cuisine_preferences.is_empty() || !state.dietary_requirements.is_empty() {
        reached.push(PartnerShowcase);
    }
    if state.contact_email.is_some() {
        reached.push(EmailCollection);
    }
    if state.qualification_status().is_some() {
        reached.push(Handoff);
    }
    reached
        .into_iter()
        .max_by_key(|s| s.ordinal())
        .unwrap_or(Discovery)
}

fn string_list(args: &Value, key: &str) -> Vec<String> {
    match args.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect(),
        Some(Value::String(item)) => vec![item.clone()],
        _ => Vec::new(),
    }
}

fn non_empty(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub struct ToolCallingAgent {
    llm: Arc<dyn LanguageModel>,
    tools: Arc<dyn ToolExecutor>,
    engine: Arc<QualificationEngine>,
    dispatcher: Arc<HandoffDispatcher>,
    max_iterations: usize,
}

impl ToolCallingAgent {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        tools: Arc<dyn ToolExecutor>,
        engine: Arc<QualificationEngine>,
        dispatcher: Arc<HandoffDispatcher>,
        max_iterations: usize,
    ) -> Self {
        Self {
            llm,
            tools,
            engine,
            dispatcher,
            max_iterations: max_iterations.max(1),
        }
    }

    /// Lookup tools followed by the session tools
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .list_tools()
            .iter()
            .chain(session_tool_schemas().iter())
            .map(ToolSchema::to_tool_definition)
            .collect()
    }

    /// Business rules, captured facts and guidance for the current stage
    pub fn system_prompt(&self, state: &ConversationState) -> String {
        let policy = self.engine.policy();
        let service_areas = self.engine.data().city_names().join(", ");
        let minimum = policy.minimum_order_size.to_string();
        let lead_time = policy.one_time_lead_hours.to_string();

        let rules = render(
            &self.engine.prompts().system_prompt,
            &[
                ("service_areas", service_areas.as_str()),
                ("minimum_order_size", minimum.as_str()),
                ("lead_time_hours", lead_time.as_str()),
                ("sales_email", self.engine.sales_email()),
            ],
        );
        format!(
            "{}\n\n## What we know so far\n{}\n\n## Current step: {}\n{}",
            rules,
            self.engine.fact_summary(state),
            state.stage().display_name(),
            state.stage().prompt_guidance()
        )
    }

    fn build_request(&self, state: &ConversationState) -> GenerateRequest {
        let mut request = GenerateRequest::new(self.system_prompt(state));
        for turn in state.transcript().iter() {
            match turn.role {
                TurnRole::User => request.messages.push(Message::user(turn.content.clone())),
                TurnRole::Assistant => request.messages.push(Message::assistant(turn.content.clone())),
                TurnRole::Tool => {}
            }
        }
        request
    }

    async fn run_tool(
        &self,
        draft: &mut ConversationState,
        call: &ToolCall,
        pending: &mut Option<LeadRecord>,
    ) -> String {
        let args = call.arguments_value();
        let result = match call.name.as_str() {
            RECORD_REQUIREMENTS => self.record_requirements(draft, &args),
            SEND_LEAD_NOTIFICATION => self.send_lead_notification(draft, &args, pending),
            name => match self.tools.execute(name, args.clone()).await {
                Ok(output) => {
                    self.fold_lookup(draft, name, &args, &output);
                    Ok(output.as_text())
                }
                Err(e) => Err(e),
            },
        };

        let target = implied_stage(draft);
        let from = draft.stage();
        if draft.advance_to(target) {
            tracing::debug!(
                session_id = %draft.session_id(),
                from = from.as_str(),
                to = target.as_str(),
                tool = %call.name,
                "Stage advanced by tool result"
            );
            metrics::counter!(
                "lead_agent_stage_transitions_total",
                "from" => from.as_str(),
                "to" => target.as_str()
            )
            .increment(1);
        }

        match result {
            Ok(text) => {
                metrics::counter!("lead_agent_tool_calls_total", "tool" => call.name.clone(), "status" => "ok")
                    .increment(1);
                text
            }
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call failed");
                metrics::counter!("lead_agent_tool_calls_total", "tool" => call.name.clone(), "status" => "error")
                    .increment(1);
                format!("Error: {}", e)
            }
        }
    }

    /// Copy facts from a lookup tool result into the draft
    fn fold_lookup(&self, draft: &mut ConversationState, name: &str, args: &Value, output: &ToolOutput) {
        let result = output.as_json().unwrap_or(Value::Null);
        match name {
            "check_service_area" => match result.get("serves_area").and_then(|v| v.as_bool()) {
                Some(true) => {
                    let city = result.get("city").and_then(|v| v.as_str());
                    let state = result.get("state").and_then(|v| v.as_str());
                    if let (Some(city), Some(state)) = (city, state) {
                        draft.set_served_location(city, state);
                    }
                }
                // A served city already found this session wins
                Some(false) if draft.is_in_service_area() != Some(true) => {
                    draft.set_unserved_location();
                }
                _ => {}
            },
            "check_order_minimum" => {
                let people = result
                    .get("people_count")
                    .and_then(|v| v.as_u64())
                    .and_then(|p| u32::try_from(p).ok());
                if let Some(people) = people {
                    draft.set_headcount(Some(people), self.engine.policy().minimum_order_size);
                }
            }
            "find_restaurant_partners" => {
                for cuisine in string_list(args, "cuisine_type") {
                    draft.add_cuisine_preference(&cuisine);
                }
                for diet in string_list(args, "dietary_needs") {
                    draft.add_dietary_requirement(&diet);
                }
            }
            "extract_contact_info" => {
                if let Some(email) = result.get("email").and_then(|v| v.as_str()) {
                    draft.contact_email = Some(email.to_string());
                }
                if let Some(phone) = result.get("phone").and_then(|v| v.as_str()) {
                    draft.contact_phone = Some(phone.to_string());
                }
            }
            _ => {}
        }
    }

    fn record_requirements(&self, draft: &mut ConversationState, args: &Value) -> Result<String, ToolError> {
        let schema = &session_tool_schemas()[0];
        schema.input_schema.validate(args)?;

        let raw_need = args.get("need_type").and_then(|v| v.as_str()).unwrap_or_default();
        let need = UserNeed::parse(raw_need)
            .ok_or_else(|| ToolError::invalid_params(format!("Unknown need_type: {}", raw_need)))?;
        draft.user_need = Some(need);
        if let Some(timing) = non_empty(args, "timing") {
            draft.timing = Some(timing);
        }
        if need == UserNeed::Recurring {
            if let Some(frequency) = non_empty(args, "frequency") {
                draft.frequency = Some(frequency);
            }
        } else {
            draft.frequency = None;
        }

        Ok(format!(
            "Recorded: need={}, timing={}, frequency={}",
            need,
            draft.timing.as_deref().unwrap_or("unknown"),
            draft.frequency.as_deref().unwrap_or("n/a")
        ))
    }

    /// Qualifies the lead and queues it for dispatch after the turn commits
    fn send_lead_notification(
        &self,
        draft: &mut ConversationState,
        args: &Value,
        pending: &mut Option<LeadRecord>,
    ) -> Result<String, ToolError> {
        if draft.qualification_status().is_some() {
            return Ok(format!(
                "Already sent: our sales team has this lead and will reach out to {}.",
                draft.contact_email.as_deref().unwrap_or("the visitor")
            ));
        }
        let schema = &session_tool_schemas()[1];
        schema.input_schema.validate(args)?;

        let raw = args.get("email").and_then(|v| v.as_str()).unwrap_or_default();
        let extractor = self.engine.extractor();
        let email = extractor
            .email(raw)
            .ok_or_else(|| ToolError::invalid_params("email is required"))?;
        if let Some(phone) = extractor.phone(raw) {
            draft.contact_phone = Some(phone);
        }
        draft.contact_email = Some(email.clone());
        if let Some(details) = non_empty(args, "details") {
            draft.notes = Some(details);
        }

        self.engine.backfill(draft);
        let lead = self
            .engine
            .qualify(draft)
            .ok_or_else(|| ToolError::internal("Lead could not be qualified"))?;
        *pending = Some(lead);

        Ok(format!(
            "Great! I've sent your information to our sales team. Someone will reach out to {} within 24 hours to discuss options, pricing, and get you set up. Looking forward to serving you!",
            email
        ))
    }
}

#[async_trait]
impl ConversationDriver for ToolCallingAgent {
    async fn start(&self, state: &mut ConversationState) -> Result<TurnReply, AgentError> {
        let outcome = self.engine.greet(state).ok_or_else(|| {
            AgentError::InvalidState(format!(
                "Conversation already started (stage {})",
                state.stage().as_str()
            ))
        })?;
        Ok(TurnReply::new(outcome.reply.unwrap_or_default(), state.stage()))
    }

    async fn handle_turn(
        &self,
        state: &mut ConversationState,
        message: &str,
    ) -> Result<TurnReply, AgentError> {
        if state.stage().is_terminal() {
            return Err(AgentError::ConversationEnded);
        }
        let started = Instant::now();
        let entry_stage = state.stage();

        let mut draft = state.clone();
        draft.advance_to(ConversationStage::Discovery);
        draft.push_user(message);

        let definitions = self.tool_definitions();
        let mut request = self.build_request(&draft);
        let mut pending: Option<LeadRecord> = None;

        for iteration in 0..self.max_iterations {
            let response = match self.llm.generate_with_tools(request.clone(), &definitions).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(
                        session_id = %state.session_id(),
                        model = self.llm.model_name(),
                        error = %e,
                        "Model call failed"
                    );
                    metrics::counter!("lead_agent_llm_errors_total").increment(1);
                    return Err(e.into());
                }
            };

            if !response.has_tool_calls() {
                let reply = response.text.trim().to_string();
                if reply.is_empty() {
                    return Err(AgentError::Llm("Model returned an empty reply".to_string()));
                }
                draft.push_assistant(reply.clone());
                if entry_stage == ConversationStage::Handoff {
                    draft.advance_to(ConversationStage::Complete);
                }
                *state = draft;

                let handoff = match pending {
                    Some(lead) => self.dispatcher.dispatch(state, &lead).await,
                    None => None,
                };

                tracing::debug!(
                    session_id = %state.session_id(),
                    iterations = iteration + 1,
                    from = entry_stage.as_str(),
                    stage = state.stage().as_str(),
                    "Turn processed"
                );
                metrics::counter!("lead_agent_turns_total", "driver" => self.name()).increment(1);
                metrics::histogram!("lead_agent_turn_duration_seconds", "driver" => self.name())
                    .record(started.elapsed().as_secs_f64());

                return Ok(TurnReply::new(reply, state.stage()).with_handoff(handoff));
            }

            tracing::debug!(
                session_id = %state.session_id(),
                iteration,
                tool_calls = response.tool_calls.len(),
                "Model requested tool calls"
            );
            request
                .messages
                .push(Message::assistant_tool_calls(response.text.clone(), response.tool_calls.clone()));
            for call in &response.tool_calls {
                let content = self.run_tool(&mut draft, call, &mut pending).await;
                draft.push_tool(call.name.as_str(), content.as_str());
                request
                    .messages
                    .push(Message::tool(call.name.as_str(), content, call.id.as_str()));
            }
        }

        tracing::warn!(
            session_id = %state.session_id(),
            max_iterations = self.max_iterations,
            "Tool loop exhausted without a reply"
        );
        Err(AgentError::ToolLoopExhausted(self.max_iterations))
    }

    fn name(&self) -> &'static str {
        "model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use lead_agent_config::{PromptTemplates, QualificationPolicy, ReferenceData};
    use lead_agent_core::{GenerateResponse, QualificationStatus};
    use lead_agent_tools::{
        create_registry, IntegrationError, NotificationReceipt, NotificationSink,
    };
    use parking_lot::Mutex;
    use serde_json::json;

    struct ScriptedLlm {
        script: Mutex<VecDeque<lead_agent_core::Result<GenerateResponse>>>,
        offered: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedLlm {
        fn new(script: Vec<lead_agent_core::Result<GenerateResponse>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                offered: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedLlm {
        async fn generate(&self, request: GenerateRequest) -> lead_agent_core::Result<GenerateResponse> {
            self.generate_with_tools(request, &[]).await
        }

        async fn generate_with_tools(
            &self,
            _request: GenerateRequest,
            tools: &[ToolDefinition],
        ) -> lead_agent_core::Result<GenerateResponse> {
            self.offered
                .lock()
                .push(tools.iter().map(|t| t.name.clone()).collect());
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(GenerateResponse::text("Anything else?")))
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        emails: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn notify(
            &self,
            lead_id: &str,
            lead: &LeadRecord,
        ) -> Result<NotificationReceipt, IntegrationError> {
            self.emails.lock().push(lead.email.clone());
            Ok(NotificationReceipt {
                lead_id: lead_id.to_string(),
                recipient: "sales@mealoutpost.com".to_string(),
                channel: "test".to_string(),
                sent_at: chrono::Utc::now(),
            })
        }

        fn channel(&self) -> &'static str {
            "test"
        }
    }

    fn agent(llm: Arc<ScriptedLlm>, sink: Arc<RecordingSink>, max_iterations: usize) -> ToolCallingAgent {
        let data = Arc::new(ReferenceData::builtin());
        let policy = QualificationPolicy::default();
        let engine = QualificationEngine::new(data.clone(), policy.clone(), PromptTemplates::default());
        ToolCallingAgent::new(
            llm,
            Arc::new(create_registry(data, policy)),
            Arc::new(engine),
            Arc::new(HandoffDispatcher::new(sink)),
            max_iterations,
        )
    }

    fn call(name: &str, args: Value) -> ToolCall {
        ToolCall::new(name, args)
    }

    #[test]
    fn test_reclassified_need_drops_frequency() {
        let llm = Arc::new(ScriptedLlm::new(vec![]));
        let agent = agent(llm, Arc::new(RecordingSink::default()), 5);
        let mut draft = ConversationState::new("s");

        agent
            .record_requirements(&mut draft, &json!({"need_type": "recurring", "frequency": "weekly"}))
            .unwrap();
        assert_eq!(draft.frequency.as_deref(), Some("weekly"));

        let text = agent
            .record_requirements(&mut draft, &json!({"need_type": "one-time"}))
            .unwrap();
        assert_eq!(draft.user_need, Some(UserNeed::OneTime));
        assert_eq!(draft.frequency, None);
        assert!(text.contains("frequency=n/a"));
    }

    #[tokio::test]
    async fn test_tool_results_advance_stage() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok(GenerateResponse::with_tool_calls(vec![
                call(RECORD_REQUIREMENTS, json!({"need_type": "recurring"})),
                call("check_service_area", json!({"city": "Boston"})),
            ])),
            Ok(GenerateResponse::text("Great, we serve Boston! When do you need catering?")),
        ]));
        let agent = agent(llm.clone(), Arc::new(RecordingSink::default()), 5);
        let mut state = ConversationState::new("s");

        let reply = agent
            .handle_turn(&mut state, "Weekly lunches for our Boston office")
            .await
            .unwrap();
        assert_eq!(reply.stage, ConversationStage::Timing);
        assert_eq!(state.user_need, Some(UserNeed::Recurring));
        assert_eq!(state.location_city(), Some("Boston"));
        assert_eq!(state.transcript().len(), 4);

        let offered = llm.offered.lock();
        assert!(offered[0].contains(&"check_service_area".to_string()));
        assert!(offered[0].contains(&SEND_LEAD_NOTIFICATION.to_string()));
    }

    #[tokio::test]
    async fn test_send_lead_notification_backfills_and_dispatches() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok(GenerateResponse::with_tool_calls(vec![
                call(RECORD_REQUIREMENTS, json!({"need_type": "one-time", "timing": "next Friday"})),
                call(SEND_LEAD_NOTIFICATION, json!({"email": "jo@acme.io"})),
            ])),
            Ok(GenerateResponse::text("All set! Our team will be in touch.")),
        ]));
        let sink = Arc::new(RecordingSink::default());
        let agent = agent(llm, sink.clone(), 5);
        let mut state = ConversationState::new("s");

        let reply = agent
            .handle_turn(
                &mut state,
                "Lunch for 30 people in Seattle next Friday, reach me at jo@acme.io",
            )
            .await
            .unwrap();

        let handoff = reply.handoff.unwrap();
        assert!(handoff.delivered);
        assert_eq!(state.location_city(), Some("Seattle"));
        assert_eq!(state.headcount(), Some(30));
        assert_eq!(state.qualification_status(), Some(QualificationStatus::Qualified));
        assert_eq!(state.qualification_score(), Some(90));
        assert_eq!(state.stage(), ConversationStage::Handoff);
        assert!(state.ready_for_handoff());
        assert_eq!(sink.emails.lock().as_slice(), ["jo@acme.io".to_string()]);

        let confirmation = &state.transcript().turns()[2].content;
        assert!(confirmation.starts_with("Great! I've sent your information to our sales team."));
    }

    #[tokio::test]
    async fn test_second_notification_is_not_sent() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok(GenerateResponse::with_tool_calls(vec![call(
                SEND_LEAD_NOTIFICATION,
                json!({"email": "jo@acme.io"}),
            )])),
            Ok(GenerateResponse::text("Sent!")),
            Ok(GenerateResponse::with_tool_calls(vec![call(
                SEND_LEAD_NOTIFICATION,
                json!({"email": "jo@acme.io"}),
            )])),
            Ok(GenerateResponse::text("Already done, thanks!")),
        ]));
        let sink = Arc::new(RecordingSink::default());
        let agent = agent(llm, sink.clone(), 5);
        let mut state = ConversationState::new("s");

        agent.handle_turn(&mut state, "jo@acme.io").await.unwrap();
        let reply = agent.handle_turn(&mut state, "did you send it?").await.unwrap();

        assert!(reply.handoff.is_none());
        assert_eq!(reply.stage, ConversationStage::Complete);
        assert_eq!(sink.emails.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_model_failure_leaves_state_unchanged() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok(GenerateResponse::with_tool_calls(vec![call(
                RECORD_REQUIREMENTS,
                json!({"need_type": "recurring"}),
            )])),
            Err(lead_agent_core::Error::Llm("connection refused".to_string())),
        ]));
        let agent = agent(llm, Arc::new(RecordingSink::default()), 5);
        let mut state = ConversationState::new("s");
        let before = serde_json::to_value(&state).unwrap();

        let err = agent.handle_turn(&mut state, "daily lunch").await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(_)));
        assert_eq!(serde_json::to_value(&state).unwrap(), before);
    }

    #[tokio::test]
    async fn test_tool_loop_is_bounded() {
        let looping = || {
            Ok(GenerateResponse::with_tool_calls(vec![call("get_business_rules", json!({}))]))
        };
        let llm = Arc::new(ScriptedLlm::new(vec![looping(), looping(), looping()]));
        let agent = agent(llm, Arc::new(RecordingSink::default()), 2);
        let mut state = ConversationState::new("s");

        let err = agent.handle_turn(&mut state, "hi").await.unwrap_err();
        assert!(matches!(err, AgentError::ToolLoopExhausted(2)));
        assert_eq!(state.stage(), ConversationStage::Greeting);
        assert!(state.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_tool_errors_go_back_to_model() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok(GenerateResponse::with_tool_calls(vec![
                call("book_table", json!({})),
                call(RECORD_REQUIREMENTS, json!({"need_type": "brunch"})),
            ])),
            Ok(GenerateResponse::text("Could you tell me more about your event?")),
        ]));
        let agent = agent(llm, Arc::new(RecordingSink::default()), 5);
        let mut state = ConversationState::new("s");

        let reply = agent.handle_turn(&mut state, "hello").await.unwrap();
        assert_eq!(reply.stage, ConversationStage::Discovery);
        let turns = state.transcript().turns();
        assert!(turns[1].content.starts_with("Error: Tool not found"));
        assert!(turns[2].content.starts_with("Error:"));
        assert_eq!(state.user_need, None);
    }

    #[tokio::test]
    async fn test_served_location_not_downgraded() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Ok(GenerateResponse::with_tool_calls(vec![
                call("check_service_area", json!({"city": "Boston"})),
                call("check_service_area", json!({"city": "Portland"})),
            ])),
            Ok(GenerateResponse::text("We serve Boston!")),
        ]));
        let agent = agent(llm, Arc::new(RecordingSink::default()), 5);
        let mut state = ConversationState::new("s");

        agent.handle_turn(&mut state, "Boston, maybe Portland").await.unwrap();
        assert_eq!(state.location_city(), Some("Boston"));
        assert_eq!(state.is_in_service_area(), Some(true));
    }

    #[test]
    fn test_implied_stage() {
        let mut state = ConversationState::new("s");
        assert_eq!(implied_stage(&state), ConversationStage::Discovery);

        state.user_need = Some(UserNeed::Recurring);
        state.set_headcount(Some(45), 20);
        assert_eq!(implied_stage(&state), ConversationStage::Frequency);

        state.frequency = Some("daily".to_string());
        assert_eq!(implied_stage(&state), ConversationStage::Preferences);

        state.add_dietary_requirement("vegan");
        assert_eq!(implied_stage(&state), ConversationStage::PartnerShowcase);
    }
}
