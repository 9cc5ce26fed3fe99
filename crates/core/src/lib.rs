//! Core traits and types for the lead agent
//!
//! This crate provides foundational types used across all other crates:
//! - Conversation stages, turns and the per-session state record
//! - Qualification outcomes and the lead record handed to sales
//! - Language model request/response types and the `LanguageModel` trait
//! - Error types

pub mod conversation;
pub mod error;
pub mod lead;
pub mod llm_types;
pub mod state;
pub mod traits;

pub use conversation::{ConversationStage, Transcript, Turn, TurnRole};
pub use error::{Error, Result};
pub use lead::{new_lead_id, LeadRecord};
pub use llm_types::{
    FinishReason, GenerateRequest, GenerateResponse, Message, Role, TokenUsage, ToolCall,
    ToolDefinition,
};
pub use state::{ConversationState, QualificationStatus, RoutingRecommendation, UserNeed};

pub use traits::LanguageModel;
