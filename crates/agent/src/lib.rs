//! Conversation engine for the lead agent
//!
//! Features:
//! - Keyword extraction behind a swappable `Extractor`
//! - Lead scoring from the configured qualification policy
//! - Per-stage nodes over `ConversationState`
//! - Single-shot lead handoff to a notification sink
//! - Two drivers: a deterministic stage sequencer and a tool-calling
//!   language model agent

pub mod driver;
pub mod engine;
pub mod extraction;
pub mod handoff;
pub mod lead_scoring;
pub mod sequencer;
pub mod stage;
pub mod tool_agent;

pub use driver::{ConversationDriver, TurnReply};
pub use engine::{QualificationEngine, StepOutcome};
pub use extraction::{Extractor, KeywordExtractor};
pub use handoff::{HandoffDispatcher, HandoffReport};
pub use lead_scoring::{LeadScore, LeadScorer};
pub use sequencer::StageSequencer;
pub use stage::next_stage;
pub use tool_agent::ToolCallingAgent;

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Conversation has ended")]
    ConversationEnded,

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("No reply after {0} tool iterations")]
    ToolLoopExhausted(usize),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl From<lead_agent_core::Error> for AgentError {
    fn from(err: lead_agent_core::Error) -> Self {
        match err {
            lead_agent_core::Error::Llm(msg) => AgentError::Llm(msg),
            lead_agent_core::Error::Tool(msg) => AgentError::Tool(msg),
            lead_agent_core::Error::InvalidState(msg) => AgentError::InvalidState(msg),
            other => AgentError::Llm(other.to_string()),
        }
    }
}

impl From<lead_agent_tools::ToolError> for AgentError {
    fn from(err: lead_agent_tools::ToolError) -> Self {
        AgentError::Tool(err.to_string())
    }
}

impl From<AgentError> for lead_agent_core::Error {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Llm(msg) => lead_agent_core::Error::Llm(msg),
            AgentError::Tool(msg) => lead_agent_core::Error::Tool(msg),
            other => lead_agent_core::Error::InvalidState(other.to_string()),
        }
    }
}
