//! Core traits for the lead agent
//!
//! ```text
//! Language Models:
//!   - LanguageModel: Text generation and tool calling
//! ```

mod llm;

pub use llm::LanguageModel;
