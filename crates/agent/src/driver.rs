//! Conversation drivers
//!
//! A driver advances a [`ConversationState`] by one visitor turn. Two
//! implementations share the same state model and engine:
//! - `StageSequencer` - deterministic per-stage nodes
//! - `ToolCallingAgent` - a language model calling lookup tools

use async_trait::async_trait;
use serde::Serialize;

use lead_agent_core::{ConversationStage, ConversationState};

use crate::handoff::HandoffReport;
use crate::AgentError;

/// Reply to one visitor turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub reply: String,
    pub stage: ConversationStage,
    /// Set on the turn that handed the lead to sales
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handoff: Option<HandoffReport>,
}

impl TurnReply {
    pub fn new(reply: impl Into<String>, stage: ConversationStage) -> Self {
        Self {
            reply: reply.into(),
            stage,
            handoff: None,
        }
    }

    pub fn with_handoff(mut self, handoff: Option<HandoffReport>) -> Self {
        self.handoff = handoff;
        self
    }

    pub fn is_finished(&self) -> bool {
        self.stage.is_terminal()
    }
}

/// Advances a conversation one turn at a time
///
/// A failed turn returns an error and leaves the state as it was.
#[async_trait]
pub trait ConversationDriver: Send + Sync {
    /// Opening message for a fresh session
    async fn start(&self, state: &mut ConversationState) -> Result<TurnReply, AgentError>;

    /// Process one visitor message
    async fn handle_turn(
        &self,
        state: &mut ConversationState,
        message: &str,
    ) -> Result<TurnReply, AgentError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}
