//! Lead handoff
//!
//! Sends a qualified lead to the notification sink exactly once per
//! session. Delivery is a single attempt: a failure is logged and counted,
//! and the session is marked handed off regardless so the sink is never
//! called twice.

use std::sync::Arc;

use serde::Serialize;

use lead_agent_core::{new_lead_id, ConversationState, LeadRecord};
use lead_agent_tools::{NotificationReceipt, NotificationSink};

/// What happened to a dispatched lead
#[derive(Debug, Clone, Serialize)]
pub struct HandoffReport {
    pub lead_id: String,
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<NotificationReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct HandoffDispatcher {
    sink: Arc<dyn NotificationSink>,
}

impl HandoffDispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    pub fn channel(&self) -> &'static str {
        self.sink.channel()
    }

    /// Notify the sink about `lead` and mark the session handed off.
    ///
    /// Returns `None` without calling the sink when the session was already
    /// handed off or has no recorded qualification.
    pub async fn dispatch(&self, state: &mut ConversationState, lead: &LeadRecord) -> Option<HandoffReport> {
        if state.ready_for_handoff() || state.qualification_status().is_none() {
            tracing::debug!(
                session_id = %state.session_id(),
                "Handoff skipped: already dispatched or not qualified"
            );
            return None;
        }

        let lead_id = new_lead_id();
        let channel = self.sink.channel();
        let result = self.sink.notify(&lead_id, lead).await;
        state.mark_handed_off();

        metrics::counter!(
            "lead_agent_leads_total",
            "status" => lead.qualification_status.as_str(),
            "channel" => channel
        )
        .increment(1);

        let report = match result {
            Ok(receipt) => {
                tracing::info!(
                    session_id = %state.session_id(),
                    lead_id = %lead_id,
                    status = lead.qualification_status.as_str(),
                    score = lead.score,
                    channel,
                    "Lead handed off"
                );
                HandoffReport {
                    lead_id,
                    delivered: true,
                    receipt: Some(receipt),
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %state.session_id(),
                    lead_id = %lead_id,
                    channel,
                    error = %e,
                    "Lead notification failed"
                );
                metrics::counter!("lead_agent_notification_failures_total", "channel" => channel)
                    .increment(1);
                HandoffReport {
                    lead_id,
                    delivered: false,
                    receipt: None,
                    error: Some(e.to_string()),
                }
            }
        };
        Some(report)
    }
}
