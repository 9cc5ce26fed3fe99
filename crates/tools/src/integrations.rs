//! Lead notification sinks
//!
//! The sales team learns about a finished lead through a [`NotificationSink`].
//! `LogNotificationSink` renders the sales email and writes it to the log;
//! `WebhookNotificationSink` POSTs the lead to an HTTP endpoint. Delivery is
//! a single best-effort attempt with no retry.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lead_agent_core::LeadRecord;

/// Integration errors
#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<IntegrationError> for crate::mcp::ToolError {
    fn from(err: IntegrationError) -> Self {
        match err {
            IntegrationError::NotFound(msg) => crate::mcp::ToolError::not_found(msg),
            IntegrationError::InvalidRequest(msg) => crate::mcp::ToolError::invalid_params(msg),
            IntegrationError::RateLimited => {
                crate::mcp::ToolError::internal("Rate limited - please retry later")
            }
            _ => crate::mcp::ToolError::internal(err.to_string()),
        }
    }
}

/// Proof of delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationReceipt {
    pub lead_id: String,
    pub recipient: String,
    pub channel: String,
    pub sent_at: DateTime<Utc>,
}

/// Where finished leads are delivered
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(
        &self,
        lead_id: &str,
        lead: &LeadRecord,
    ) -> Result<NotificationReceipt, IntegrationError>;

    /// Short name for logs and metrics
    fn channel(&self) -> &'static str;
}

/// Sales email for a lead
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or("Unknown")
}

/// Render the email the sales team receives
pub fn render_lead_email(lead_id: &str, lead: &LeadRecord, sales_email: &str) -> LeadEmail {
    let headcount = lead
        .headcount
        .map(|h| h.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    let meets_minimum = match lead.meets_minimum {
        Some(true) => "Yes",
        Some(false) => "No",
        None => "Unknown",
    };

    let mut body = String::new();
    body.push_str("New Catering Lead from Meal Outpost Website:\n\n");
    body.push_str(&format!("LEAD ID: {}\n\n", lead_id));
    body.push_str("CONTACT INFORMATION:\n");
    body.push_str(&format!("- Email: {}\n", lead.email));
    if let Some(phone) = &lead.phone {
        body.push_str(&format!("- Phone: {}\n", phone));
    }
    body.push_str("\nCATERING REQUIREMENTS:\n");
    body.push_str(&format!(
        "- Location: {}, {}\n",
        or_unknown(lead.city.as_deref()),
        or_unknown(lead.state.as_deref())
    ));
    body.push_str(&format!(
        "- Need Type: {}\n",
        or_unknown(lead.need_type.map(|n| n.as_str()))
    ));
    body.push_str(&format!("- Group Size: {} people\n", headcount));
    body.push_str(&format!("- Timing: {}\n", or_unknown(lead.timing.as_deref())));
    body.push_str(&format!(
        "- Frequency: {}\n",
        lead.frequency.as_deref().unwrap_or("One-time")
    ));
    body.push_str(&format!(
        "- Cuisine Preferences: {}\n",
        lead.cuisine_preferences.join(", ")
    ));
    if !lead.dietary_requirements.is_empty() {
        body.push_str(&format!(
            "- Dietary Requirements: {}\n",
            lead.dietary_requirements.join(", ")
        ));
    }
    body.push_str("\nQUALIFICATION:\n");
    body.push_str(&format!(
        "- Status: {} (score {})\n",
        lead.qualification_status.as_str(),
        lead.score
    ));
    body.push_str(&format!(
        "- In Service Area: {}\n",
        if lead.in_service_area { "Yes" } else { "No" }
    ));
    body.push_str(&format!("- Meets Minimum Size: {}\n", meets_minimum));
    if !lead.reasons.is_empty() {
        body.push_str(&format!("- Reasons: {}\n", lead.reasons.join("; ")));
    }
    body.push_str(&format!(
        "- Recommendation: {}\n",
        lead.recommendation.description()
    ));
    body.push_str("\nACTION REQUIRED: Follow up within 24 hours\n");

    LeadEmail {
        to: sales_email.to_string(),
        subject: format!("New Catering Lead - {}", lead.email),
        body,
    }
}

/// Writes the sales email to the log
pub struct LogNotificationSink {
    sales_email: String,
}

impl LogNotificationSink {
    pub fn new(sales_email: impl Into<String>) -> Self {
        Self {
            sales_email: sales_email.into(),
        }
    }
}

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify(
        &self,
        lead_id: &str,
        lead: &LeadRecord,
    ) -> Result<NotificationReceipt, IntegrationError> {
        let email = render_lead_email(lead_id, lead, &self.sales_email);
        tracing::info!(
            lead_id = %lead_id,
            to = %email.to,
            subject = %email.subject,
            status = lead.qualification_status.as_str(),
            "New lead notification\n{}",
            email.body
        );
        Ok(NotificationReceipt {
            lead_id: lead_id.to_string(),
            recipient: email.to,
            channel: self.channel().to_string(),
            sent_at: Utc::now(),
        })
    }

    fn channel(&self) -> &'static str {
        "log"
    }
}

/// Body POSTed by [`WebhookNotificationSink`]
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    lead_id: &'a str,
    sales_email: &'a str,
    lead: &'a LeadRecord,
    email: LeadEmail,
}

/// POSTs leads as JSON to an HTTP endpoint
pub struct WebhookNotificationSink {
    client: Client,
    url: String,
    sales_email: String,
}

impl WebhookNotificationSink {
    pub fn new(
        url: impl Into<String>,
        sales_email: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, IntegrationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IntegrationError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            sales_email: sales_email.into(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookNotificationSink {
    async fn notify(
        &self,
        lead_id: &str,
        lead: &LeadRecord,
    ) -> Result<NotificationReceipt, IntegrationError> {
        let payload = WebhookPayload {
            lead_id,
            sales_email: &self.sales_email,
            lead,
            email: render_lead_email(lead_id, lead, &self.sales_email),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| IntegrationError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => IntegrationError::AuthFailed(format!("Webhook returned {}", status)),
                404 => IntegrationError::NotFound(self.url.clone()),
                429 => IntegrationError::RateLimited,
                400..=499 => IntegrationError::InvalidRequest(format!("Webhook returned {}", status)),
                _ => IntegrationError::Internal(format!("Webhook returned {}", status)),
            });
        }

        tracing::info!(lead_id = %lead_id, url = %self.url, "Lead posted to webhook");
        Ok(NotificationReceipt {
            lead_id: lead_id.to_string(),
            recipient: self.url.clone(),
            channel: self.channel().to_string(),
            sent_at: Utc::now(),
        })
    }

    fn channel(&self) -> &'static str {
        "webhook"
    }
}
