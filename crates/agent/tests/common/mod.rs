//! Shared fixtures for agent integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use lead_agent_agent::{HandoffDispatcher, QualificationEngine};
use lead_agent_config::{PromptTemplates, QualificationPolicy, ReferenceData};
use lead_agent_core::{
    GenerateRequest, GenerateResponse, LanguageModel, LeadRecord, Result, ToolDefinition,
};
use lead_agent_tools::{IntegrationError, NotificationReceipt, NotificationSink};

/// Sink that keeps every lead it receives
#[derive(Default)]
pub struct RecordingSink {
    pub leads: Mutex<Vec<(String, LeadRecord)>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(
        &self,
        lead_id: &str,
        lead: &LeadRecord,
    ) -> std::result::Result<NotificationReceipt, IntegrationError> {
        self.leads.lock().push((lead_id.to_string(), lead.clone()));
        Ok(NotificationReceipt {
            lead_id: lead_id.to_string(),
            recipient: "sales@mealoutpost.com".to_string(),
            channel: "recording".to_string(),
            sent_at: chrono::Utc::now(),
        })
    }

    fn channel(&self) -> &'static str {
        "recording"
    }
}

/// Model that replays a fixed list of responses
pub struct ScriptedLlm {
    script: Mutex<VecDeque<GenerateResponse>>,
    pub requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedLlm {
    pub fn new(script: Vec<GenerateResponse>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        self.generate_with_tools(request, &[]).await
    }

    async fn generate_with_tools(
        &self,
        request: GenerateRequest,
        _tools: &[ToolDefinition],
    ) -> Result<GenerateResponse> {
        self.requests.lock().push(request);
        Ok(self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| GenerateResponse::text("Is there anything else I can help with?")))
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub fn reference_data() -> Arc<ReferenceData> {
    Arc::new(ReferenceData::builtin())
}

pub fn engine() -> Arc<QualificationEngine> {
    Arc::new(QualificationEngine::new(
        reference_data(),
        QualificationPolicy::default(),
        PromptTemplates::default(),
    ))
}

pub fn dispatcher(sink: Arc<RecordingSink>) -> Arc<HandoffDispatcher> {
    Arc::new(HandoffDispatcher::new(sink))
}
