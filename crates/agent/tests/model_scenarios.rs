//! Conversations through the tool-calling driver with a scripted model

mod common;

use std::sync::Arc;

use serde_json::json;

use lead_agent_agent::{ConversationDriver, ToolCallingAgent};
use lead_agent_config::QualificationPolicy;
use lead_agent_core::{
    ConversationStage, ConversationState, GenerateResponse, QualificationStatus, Role, ToolCall,
};
use lead_agent_tools::create_registry;

use common::{dispatcher, engine, reference_data, RecordingSink, ScriptedLlm};

fn tool_calls(calls: Vec<(&str, serde_json::Value)>) -> GenerateResponse {
    GenerateResponse::with_tool_calls(
        calls
            .into_iter()
            .map(|(name, args)| ToolCall::new(name, args))
            .collect(),
    )
}

fn agent(llm: Arc<ScriptedLlm>, sink: Arc<RecordingSink>) -> ToolCallingAgent {
    ToolCallingAgent::new(
        llm,
        Arc::new(create_registry(reference_data(), QualificationPolicy::default())),
        engine(),
        dispatcher(sink),
        5,
    )
}

#[tokio::test]
async fn test_model_conversation_reaches_complete() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        // turn 1
        tool_calls(vec![
            ("record_requirements", json!({"need_type": "recurring"})),
            ("check_service_area", json!({"city": "Chicago"})),
        ]),
        GenerateResponse::text("We serve Chicago! When would you like to start?"),
        // turn 2
        tool_calls(vec![
            ("record_requirements", json!({"need_type": "recurring", "timing": "March", "frequency": "weekly"})),
            ("check_order_minimum", json!({"people_count": 60})),
        ]),
        GenerateResponse::text("Great. Any cuisine preferences?"),
        // turn 3
        tool_calls(vec![(
            "find_restaurant_partners",
            json!({"city": "Chicago", "cuisine_type": ["Mexican"], "dietary_needs": ["vegan"]}),
        )]),
        GenerateResponse::text("We have 18+ partners in Chicago. Want me to connect you with our team?"),
        // turn 4
        GenerateResponse::text("Wonderful! What's the best email to reach you?"),
        // turn 5
        tool_calls(vec![(
            "send_lead_notification",
            json!({"email": "Reach me at lee@widgets.co", "details": "Prefers Tuesdays"}),
        )]),
        GenerateResponse::text("Done! Our team will reach out within 24 hours."),
        // turn 6
        GenerateResponse::text("Thanks for chatting, have a great day!"),
    ]));
    let sink = Arc::new(RecordingSink::default());
    let driver = agent(llm.clone(), sink.clone());
    let mut state = ConversationState::new("model");

    let greeting = driver.start(&mut state).await.unwrap();
    assert_eq!(greeting.stage, ConversationStage::Discovery);

    let reply = driver
        .handle_turn(&mut state, "Weekly team lunches in Chicago")
        .await
        .unwrap();
    assert_eq!(reply.stage, ConversationStage::Timing);

    let reply = driver
        .handle_turn(&mut state, "Starting in March, about 60 people, weekly")
        .await
        .unwrap();
    assert_eq!(reply.stage, ConversationStage::Preferences);
    assert_eq!(state.meets_minimum(), Some(true));
    assert_eq!(state.frequency.as_deref(), Some("weekly"));

    let reply = driver
        .handle_turn(&mut state, "Mexican food, some vegan options")
        .await
        .unwrap();
    assert_eq!(reply.stage, ConversationStage::PartnerShowcase);
    assert!(state.cuisine_preferences.contains("Mexican"));

    driver.handle_turn(&mut state, "Yes please").await.unwrap();

    let reply = driver
        .handle_turn(&mut state, "lee@widgets.co")
        .await
        .unwrap();
    assert_eq!(reply.stage, ConversationStage::Handoff);
    assert!(reply.handoff.unwrap().delivered);
    assert_eq!(state.contact_email.as_deref(), Some("lee@widgets.co"));
    assert_eq!(state.notes.as_deref(), Some("Prefers Tuesdays"));
    assert_eq!(state.qualification_status(), Some(QualificationStatus::Qualified));
    assert_eq!(state.qualification_score(), Some(100));

    let reply = driver.handle_turn(&mut state, "Thanks!").await.unwrap();
    assert_eq!(reply.stage, ConversationStage::Complete);
    assert!(reply.is_finished());

    let leads = sink.leads.lock();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].1.city.as_deref(), Some("Chicago"));
    assert_eq!(leads[0].1.frequency.as_deref(), Some("weekly"));
}

#[tokio::test]
async fn test_system_prompt_carries_facts_and_history() {
    let llm = Arc::new(ScriptedLlm::new(vec![
        tool_calls(vec![("check_service_area", json!({"city": "Austin"}))]),
        GenerateResponse::text("Austin is covered!"),
        GenerateResponse::text("How many people?"),
    ]));
    let driver = agent(llm.clone(), Arc::new(RecordingSink::default()));
    let mut state = ConversationState::new("prompt");
    driver.start(&mut state).await.unwrap();

    driver.handle_turn(&mut state, "Austin").await.unwrap();
    driver.handle_turn(&mut state, "Next week").await.unwrap();

    let requests = llm.requests.lock();
    let last = requests.last().unwrap();
    let system = &last.messages[0];
    assert_eq!(system.role, Role::System);
    assert!(system.content.contains("## What we know so far"));
    assert!(system.content.contains("- Location: Austin, TX (served)"));
    assert!(system.content.contains("Boston"));

    // greeting, visitor, reply, visitor; tool turns stay out of the history
    let roles: Vec<Role> = last.messages[1..].iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::Assistant, Role::User, Role::Assistant, Role::User]);
}
