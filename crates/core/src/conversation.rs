//! Conversation types including stages and turns

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stages of the lead-qualification flow
///
/// The flow is linear with one conditional edge (`Scale` goes to
/// `Frequency` only for recurring needs) and one side branch (`End`,
/// reachable from `ContactCapture` when the visitor declines).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    /// Welcome prompt
    #[default]
    Greeting,
    /// What kind of catering need
    Discovery,
    /// City check against the service areas
    Location,
    /// When catering is needed
    Timing,
    /// Headcount
    Scale,
    /// Cadence for recurring programs
    Frequency,
    /// Cuisine and dietary preferences
    Preferences,
    /// Restaurant partner showcase
    PartnerShowcase,
    /// Offer to connect with sales
    ContactCapture,
    /// Email capture, qualification and notification
    EmailCollection,
    /// Closing message
    Handoff,
    /// Lead handed to sales
    Complete,
    /// Visitor declined the handoff
    End,
}

impl ConversationStage {
    /// All stages in pipeline order
    pub const ALL: [ConversationStage; 13] = [
        ConversationStage::Greeting,
        ConversationStage::Discovery,
        ConversationStage::Location,
        ConversationStage::Timing,
        ConversationStage::Scale,
        ConversationStage::Frequency,
        ConversationStage::Preferences,
        ConversationStage::PartnerShowcase,
        ConversationStage::ContactCapture,
        ConversationStage::EmailCollection,
        ConversationStage::Handoff,
        ConversationStage::Complete,
        ConversationStage::End,
    ];

    /// Position in the pipeline; stages only move to a higher ordinal
    pub fn ordinal(&self) -> u8 {
        match self {
            ConversationStage::Greeting => 0,
            ConversationStage::Discovery => 1,
            ConversationStage::Location => 2,
            ConversationStage::Timing => 3,
            ConversationStage::Scale => 4,
            ConversationStage::Frequency => 5,
            ConversationStage::Preferences => 6,
            ConversationStage::PartnerShowcase => 7,
            ConversationStage::ContactCapture => 8,
            ConversationStage::EmailCollection => 9,
            ConversationStage::Handoff => 10,
            ConversationStage::Complete => 11,
            ConversationStage::End => 12,
        }
    }

    /// Whether no further stage processing happens
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConversationStage::Complete | ConversationStage::End)
    }

    /// Whether the stage reads the latest visitor message
    ///
    /// `Greeting` and `PartnerShowcase` only emit text and run without
    /// waiting for input.
    pub fn consumes_input(&self) -> bool {
        !matches!(
            self,
            ConversationStage::Greeting
                | ConversationStage::PartnerShowcase
                | ConversationStage::Complete
                | ConversationStage::End
        )
    }

    /// Stable identifier used in logs and the HTTP API
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStage::Greeting => "greeting",
            ConversationStage::Discovery => "discovery",
            ConversationStage::Location => "location",
            ConversationStage::Timing => "timing",
            ConversationStage::Scale => "scale",
            ConversationStage::Frequency => "frequency",
            ConversationStage::Preferences => "preferences",
            ConversationStage::PartnerShowcase => "partner_showcase",
            ConversationStage::ContactCapture => "contact_capture",
            ConversationStage::EmailCollection => "email_collection",
            ConversationStage::Handoff => "handoff",
            ConversationStage::Complete => "complete",
            ConversationStage::End => "end",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            ConversationStage::Greeting => "Greeting",
            ConversationStage::Discovery => "Discovery",
            ConversationStage::Location => "Location",
            ConversationStage::Timing => "Timing",
            ConversationStage::Scale => "Scale",
            ConversationStage::Frequency => "Frequency",
            ConversationStage::Preferences => "Preferences",
            ConversationStage::PartnerShowcase => "Partner Showcase",
            ConversationStage::ContactCapture => "Contact Capture",
            ConversationStage::EmailCollection => "Email Collection",
            ConversationStage::Handoff => "Handoff",
            ConversationStage::Complete => "Complete",
            ConversationStage::End => "End",
        }
    }

    /// Stage-specific guidance for a model-driven conversation
    pub fn prompt_guidance(&self) -> &'static str {
        match self {
            ConversationStage::Greeting => {
                "Welcome the visitor and ask whether they need one-time catering, \
                 a recurring meal program, or are just exploring."
            }
            ConversationStage::Discovery => {
                "Understand the kind of catering need, then ask which city they are in."
            }
            ConversationStage::Location => {
                "Find out the city and check it with check_service_area."
            }
            ConversationStage::Timing => "Ask when they are looking to have catering.",
            ConversationStage::Scale => {
                "Ask how many people they need to feed and check it with check_order_minimum."
            }
            ConversationStage::Frequency => {
                "Ask how often they need catering: daily, weekly, or something else."
            }
            ConversationStage::Preferences => {
                "Ask about cuisine preferences and dietary requirements."
            }
            ConversationStage::PartnerShowcase => {
                "Show a few restaurant partners in their city with find_restaurant_partners."
            }
            ConversationStage::ContactCapture => {
                "Offer to connect them with the sales team."
            }
            ConversationStage::EmailCollection => {
                "Ask for the best email address, then call send_lead_notification."
            }
            ConversationStage::Handoff | ConversationStage::Complete => {
                "Thank them and let them know the team will be in touch."
            }
            ConversationStage::End => {
                "Close politely and mention they can reach the sales team any time."
            }
        }
    }
}

impl std::fmt::Display for ConversationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Role in a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// Visitor message
    User,
    /// Assistant message
    Assistant,
    /// Output of a lookup tool, kept for audit
    Tool,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
            TurnRole::Tool => "tool",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single turn in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Role of the speaker
    pub role: TurnRole,
    /// Content of the turn
    pub content: String,
    /// Tool name for tool turns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// When the turn occurred
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new turn
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    /// Create a tool turn
    pub fn tool(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(TurnRole::Tool, content)
        }
    }
}

/// Ordered, append-only record of a conversation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Number of visitor turns
    pub fn user_turn_count(&self) -> usize {
        self.turns.iter().filter(|t| t.role == TurnRole::User).count()
    }

    /// Most recent visitor message
    pub fn last_user_message(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == TurnRole::User)
            .map(|t| t.content.as_str())
    }

    /// Visitor messages, oldest first
    pub fn user_messages(&self) -> impl Iterator<Item = &str> {
        self.turns
            .iter()
            .filter(|t| t.role == TurnRole::User)
            .map(|t| t.content.as_str())
    }
}
