//! Model gateway seam: one request to a hosted language model.

use crate::catalog::ToolCatalog;
use crate::shared::{ActionRequest, Turn};

/// Sampling settings forwarded to the model. `None` leaves the provider default.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationSettings {
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl GenerationSettings {
    /// Settings used for user chat turns.
    pub fn chat() -> Self {
        Self {
            temperature: Some(0.7),
            top_k: Some(1),
            top_p: Some(1.0),
            max_output_tokens: Some(2048),
        }
    }

    /// Follow-up narration keeps provider defaults.
    pub fn follow_up() -> Self {
        Self::default()
    }
}

/// Everything one model call needs. `history` must already be replay-normalised.
#[derive(Debug, Clone, Copy)]
pub struct ModelCall<'a> {
    pub system_prompt: &'a str,
    pub catalog: &'a ToolCatalog,
    pub history: &'a [Turn],
    pub message: &'a str,
    pub settings: GenerationSettings,
}

/// What the model answered: text, action requests, or both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub action_requests: Vec<ActionRequest>,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action_requests: Vec::new(),
        }
    }

    pub fn actions(text: impl Into<String>, action_requests: Vec<ActionRequest>) -> Self {
        Self {
            text: text.into(),
            action_requests,
        }
    }

    pub fn has_actions(&self) -> bool {
        !self.action_requests.is_empty()
    }

    /// Model text with surrounding whitespace removed; empty when the model said nothing.
    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("model service unreachable: {0}")]
    Transport(String),
    #[error("model service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed model reply: {0}")]
    MalformedReply(String),
    #[error("model gateway not configured: {0}")]
    NotConfigured(String),
}

/// A hosted language model session. One attempt per call; no retries.
#[async_trait::async_trait]
pub trait ModelGateway: Send + Sync {
    /// Short identifier for logs and `/api/v1/status`.
    fn mode(&self) -> &str;

    async fn converse(&self, call: ModelCall<'_>) -> Result<ModelReply, GatewayError>;
}
