//! Deterministic stage driver
//!
//! Each visitor message is consumed by exactly one input stage. Stages that
//! only emit text (the greeting and the partner showcase) run on either
//! side of it without waiting for input, so the showcase is shown on the
//! same turn the preferences are given.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use lead_agent_core::{ConversationStage, ConversationState};

use crate::driver::{ConversationDriver, TurnReply};
use crate::engine::{QualificationEngine, StepOutcome};
use crate::handoff::{HandoffDispatcher, HandoffReport};
use crate::AgentError;

pub struct StageSequencer {
    engine: Arc<QualificationEngine>,
    dispatcher: Arc<HandoffDispatcher>,
}

/// Replies and handoff collected while running a turn
#[derive(Default)]
struct TurnLog {
    replies: Vec<String>,
    handoff: Option<HandoffReport>,
}

impl StageSequencer {
    pub fn new(engine: Arc<QualificationEngine>, dispatcher: Arc<HandoffDispatcher>) -> Self {
        Self { engine, dispatcher }
    }

    pub fn engine(&self) -> &QualificationEngine {
        &self.engine
    }

    async fn absorb(&self, state: &mut ConversationState, outcome: StepOutcome, log: &mut TurnLog) -> bool {
        if let Some(lead) = &outcome.lead {
            if let Some(report) = self.dispatcher.dispatch(state, lead).await {
                log.handoff = Some(report);
            }
        }
        let advanced = outcome.advanced();
        if let Some(reply) = outcome.reply {
            log.replies.push(reply);
        }
        advanced
    }

    async fn run_passive(&self, state: &mut ConversationState, log: &mut TurnLog) {
        while !state.stage().is_terminal() && !state.stage().consumes_input() {
            let Some(outcome) = self.engine.step(state, "") else {
                break;
            };
            if !self.absorb(state, outcome, log).await {
                break;
            }
        }
    }
}

#[async_trait]
impl ConversationDriver for StageSequencer {
    async fn start(&self, state: &mut ConversationState) -> Result<TurnReply, AgentError> {
        if state.stage() != ConversationStage::Greeting {
            return Err(AgentError::InvalidState(format!(
                "Conversation already started (stage {})",
                state.stage().as_str()
            )));
        }
        let mut log = TurnLog::default();
        self.run_passive(state, &mut log).await;
        Ok(TurnReply::new(log.replies.join("\n\n"), state.stage()))
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
        let mut log = TurnLog::default();

        self.run_passive(state, &mut log).await;
        state.push_user(message);
        if let Some(outcome) = self.engine.step(state, message) {
            self.absorb(state, outcome, &mut log).await;
        }
        self.run_passive(state, &mut log).await;

        tracing::debug!(
            session_id = %state.session_id(),
            from = entry_stage.as_str(),
            stage = state.stage().as_str(),
            "Turn processed"
        );
        metrics::counter!("lead_agent_turns_total", "driver" => self.name()).increment(1);
        metrics::histogram!("lead_agent_turn_duration_seconds", "driver" => self.name())
            .record(started.elapsed().as_secs_f64());

        Ok(TurnReply::new(log.replies.join("\n\n"), state.stage()).with_handoff(log.handoff))
    }

    fn name(&self) -> &'static str {
        "stage"
    }
}
