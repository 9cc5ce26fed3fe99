//! Full conversations through the stage sequencer

mod common;

use std::sync::Arc;

use lead_agent_agent::{AgentError, ConversationDriver, StageSequencer};
use lead_agent_core::{
    ConversationStage, ConversationState, QualificationStatus, RoutingRecommendation, UserNeed,
};

use common::{dispatcher, engine, RecordingSink};

fn sequencer(sink: Arc<RecordingSink>) -> StageSequencer {
    StageSequencer::new(engine(), dispatcher(sink))
}

#[tokio::test]
async fn test_recurring_program_in_new_york_is_qualified() {
    let sink = Arc::new(RecordingSink::default());
    let driver = sequencer(sink.clone());
    let mut state = ConversationState::new("nyc");

    let greeting = driver.start(&mut state).await.unwrap();
    assert!(greeting.reply.contains("What brings you to Meal Outpost today?"));

    let script = [
        ("I need daily lunch catering", ConversationStage::Location),
        ("Manhattan, New York City", ConversationStage::Timing),
        ("next month", ConversationStage::Scale),
        ("45 people", ConversationStage::Frequency),
        ("Daily, Monday-Friday", ConversationStage::Preferences),
        ("Italian, Asian", ConversationStage::ContactCapture),
        ("yes connect me", ConversationStage::EmailCollection),
    ];
    for (message, expected) in script {
        let reply = driver.handle_turn(&mut state, message).await.unwrap();
        assert_eq!(reply.stage, expected, "after {:?}", message);
        assert!(reply.handoff.is_none());
    }

    let showcase = &state.transcript().turns()[state.transcript().len() - 3].content;
    assert!(showcase.contains("Ben's Fast Food"));

    let reply = driver
        .handle_turn(&mut state, "sarah.johnson@techcorp.com")
        .await
        .unwrap();
    assert_eq!(reply.stage, ConversationStage::Handoff);
    assert!(reply.reply.contains("- Location: New York City"));
    assert!(reply.reply.contains("- Group size: 45 people"));
    let handoff = reply.handoff.unwrap();
    assert!(handoff.delivered);

    assert_eq!(state.user_need, Some(UserNeed::Recurring));
    assert_eq!(state.frequency.as_deref(), Some("Daily, Monday-Friday"));
    assert_eq!(state.qualification_status(), Some(QualificationStatus::Qualified));
    assert_eq!(state.qualification_score(), Some(100));

    {
        let leads = sink.leads.lock();
        assert_eq!(leads.len(), 1);
        let (lead_id, lead) = &leads[0];
        assert_eq!(lead_id, &handoff.lead_id);
        assert_eq!(lead.email, "sarah.johnson@techcorp.com");
        assert_eq!(lead.city.as_deref(), Some("New York City"));
        assert_eq!(lead.recommendation, RoutingRecommendation::ImmediateSales);
    }

    let reply = driver.handle_turn(&mut state, "No, that's all!").await.unwrap();
    assert_eq!(reply.stage, ConversationStage::Complete);
    assert!(reply.reply.starts_with("Perfect! Thanks so much"));
    assert!(reply.handoff.is_none());

    let err = driver.handle_turn(&mut state, "one more thing").await.unwrap_err();
    assert!(matches!(err, AgentError::ConversationEnded));
    assert_eq!(sink.leads.lock().len(), 1);
}

#[tokio::test]
async fn test_unserved_event_is_a_maybe() {
    let sink = Arc::new(RecordingSink::default());
    let driver = sequencer(sink.clone());
    let mut state = ConversationState::new("pdx");
    driver.start(&mut state).await.unwrap();

    for message in [
        "We have a one-time event",
        "Portland, Oregon",
        "in two weeks",
        "75",
        "Vegetarian",
        "sure",
    ] {
        driver.handle_turn(&mut state, message).await.unwrap();
    }
    assert_eq!(state.is_in_service_area(), Some(false));
    assert!(state.dietary_requirements.contains("vegetarian"));

    let reply = driver.handle_turn(&mut state, "pat@example.com").await.unwrap();
    assert_eq!(reply.stage, ConversationStage::Handoff);
    assert!(reply.reply.contains("- Location: Outside current service area"));

    assert_eq!(state.qualification_status(), Some(QualificationStatus::Maybe));
    assert_eq!(state.qualification_score(), Some(40));
    let leads = sink.leads.lock();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].1.recommendation, RoutingRecommendation::SalesEvaluation);
    assert!(!leads[0].1.in_service_area);
}

#[tokio::test]
async fn test_declined_contact_ends_without_lead() {
    let sink = Arc::new(RecordingSink::default());
    let driver = sequencer(sink.clone());
    let mut state = ConversationState::new("decline");
    driver.start(&mut state).await.unwrap();

    for message in ["just exploring", "Austin", "not sure", "10 people", "tacos"] {
        driver.handle_turn(&mut state, message).await.unwrap();
    }
    let reply = driver.handle_turn(&mut state, "no thanks").await.unwrap();
    assert_eq!(reply.stage, ConversationStage::End);
    assert!(reply.reply.contains("sales@mealoutpost.com"));
    assert!(state.qualification_status().is_none());
    assert!(sink.leads.lock().is_empty());
}

#[tokio::test]
async fn test_blank_email_is_asked_again() {
    let sink = Arc::new(RecordingSink::default());
    let driver = sequencer(sink.clone());
    let mut state = ConversationState::new("blank");
    driver.start(&mut state).await.unwrap();

    for message in ["an event", "Denver", "Friday", "25", "pizza", "yes"] {
        driver.handle_turn(&mut state, message).await.unwrap();
    }
    let reply = driver.handle_turn(&mut state, "   ").await.unwrap();
    assert_eq!(reply.stage, ConversationStage::EmailCollection);
    assert!(reply.reply.contains("best email address"));
    assert!(sink.leads.lock().is_empty());

    let reply = driver.handle_turn(&mut state, "ops@denverco.com").await.unwrap();
    assert_eq!(reply.stage, ConversationStage::Handoff);
    assert_eq!(sink.leads.lock().len(), 1);
}
