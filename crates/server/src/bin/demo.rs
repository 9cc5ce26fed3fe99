//! Scripted conversations through the stage sequencer.
//!
//! Usage: `lead-agent-demo [qualified|out-of-area|declined]`. With no
//! argument every script runs in order. Leads are written to the log
//! instead of being delivered.

use std::sync::Arc;

use anyhow::bail;

use lead_agent_agent::{ConversationDriver, HandoffDispatcher, QualificationEngine, StageSequencer};
use lead_agent_config::{ReferenceData, Settings};
use lead_agent_core::ConversationState;
use lead_agent_tools::LogNotificationSink;

struct Script {
    name: &'static str,
    turns: &'static [&'static str],
}

const SCRIPTS: &[Script] = &[
    Script {
        name: "qualified",
        turns: &[
            "I need daily lunch catering for my office",
            "Manhattan, New York City",
            "Starting next month",
            "About 45 people",
            "Daily, Monday-Friday",
            "Italian and Asian, a few vegetarians",
            "Yes, please connect me",
            "sarah.johnson@techcorp.com",
            "No, that's all!",
        ],
    },
    Script {
        name: "out-of-area",
        turns: &[
            "We have a one-time event coming up",
            "Portland, Oregon",
            "In two weeks",
            "75",
            "Vegetarian",
            "Sure",
            "pat@example.com",
            "Thanks!",
        ],
    },
    Script {
        name: "declined",
        turns: &[
            "Just exploring options",
            "Austin",
            "Not sure yet",
            "10 people",
            "Tacos",
            "No thanks",
        ],
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_agent=info".into()),
        )
        .init();

    let selected = std::env::args().nth(1);
    let scripts: Vec<&Script> = match selected.as_deref() {
        None => SCRIPTS.iter().collect(),
        Some(name) => match SCRIPTS.iter().find(|s| s.name == name) {
            Some(script) => vec![script],
            None => {
                let names: Vec<&str> = SCRIPTS.iter().map(|s| s.name).collect();
                bail!("unknown script {:?}, expected one of {}", name, names.join(", "));
            }
        },
    };

    let settings = Settings::default();
    let data = Arc::new(ReferenceData::builtin());
    let engine = Arc::new(QualificationEngine::from_settings(&settings, data));
    let sink = Arc::new(LogNotificationSink::new(settings.notification.sales_email.clone()));
    let driver = StageSequencer::new(engine, Arc::new(HandoffDispatcher::new(sink)));

    for script in scripts {
        run_script(&driver, script).await?;
    }
    Ok(())
}

async fn run_script(driver: &StageSequencer, script: &Script) -> anyhow::Result<()> {
    println!("==================== {} ====================", script.name);
    let mut state = ConversationState::new(format!("demo-{}", script.name));

    let greeting = driver.start(&mut state).await?;
    println!("assistant> {}\n", greeting.reply);

    for message in script.turns {
        println!("visitor> {}", message);
        let turn = driver.handle_turn(&mut state, message).await?;
        println!("assistant> {}", turn.reply);
        println!("  [stage: {}] {}", turn.stage.display_name(), facts(&state));
        if let Some(handoff) = &turn.handoff {
            println!("  [lead {} delivered: {}]", handoff.lead_id, handoff.delivered);
        }
        println!();
        if turn.is_finished() {
            break;
        }
    }

    println!("final state:\n{}\n", serde_json::to_string_pretty(&state)?);
    Ok(())
}

/// One-line view of what has been captured so far
fn facts(state: &ConversationState) -> String {
    let mut parts = Vec::new();
    if let Some(need) = state.user_need {
        parts.push(format!("need={}", need.as_str()));
    }
    match (state.location_city(), state.is_in_service_area()) {
        (Some(city), _) => parts.push(format!("city={}", city)),
        (None, Some(false)) => parts.push("city=unserved".to_string()),
        _ => {}
    }
    if let Some(headcount) = state.headcount() {
        parts.push(format!("headcount={}", headcount));
    }
    if let Some(email) = &state.contact_email {
        parts.push(format!("email={}", email));
    }
    if let (Some(status), Some(score)) = (state.qualification_status(), state.qualification_score()) {
        parts.push(format!("status={} score={}", status.as_str(), score));
    }
    parts.join(" ")
}
