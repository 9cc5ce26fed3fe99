//! Stage transitions
//!
//! ```text
//! greeting → discovery → location → timing → scale ─┬─────────────→ preferences
//!                                                   └→ frequency ─┘  (recurring only)
//! preferences → partner_showcase → contact_capture ─┬→ email_collection → handoff → complete
//!                                                   └→ end  (declined)
//! ```

use lead_agent_core::{ConversationStage, UserNeed};

/// Successor of `stage` on the main path.
///
/// `Scale` is the only conditional edge. The decline branch out of
/// `ContactCapture` is taken by the contact node itself, so this returns
/// `EmailCollection` there. Terminal stages have no successor.
pub fn next_stage(stage: ConversationStage, need: Option<UserNeed>) -> Option<ConversationStage> {
    use ConversationStage::*;

    let next = match stage {
        Greeting => Discovery,
        Discovery => Location,
        Location => Timing,
        Timing => Scale,
        Scale if need == Some(UserNeed::Recurring) => Frequency,
        Scale => Preferences,
        Frequency => Preferences,
        Preferences => PartnerShowcase,
        PartnerShowcase => ContactCapture,
        ContactCapture => EmailCollection,
        EmailCollection => Handoff,
        Handoff => Complete,
        Complete | End => return None,
    };
    Some(next)
}
