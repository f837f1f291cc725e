//! Transport between the orchestrator and the chat service (in-process or over HTTP).

use crate::chat::{ChatError, ChatRequest, ChatResponse, ChatService, ToolResultsRequest};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The service refused the request (client error).
    #[error("request rejected: {0}")]
    Rejected(String),
    /// The service or the model behind it failed.
    #[error("chat backend unavailable: {0}")]
    Unavailable(String),
}

impl From<ChatError> for BackendError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::Validation(msg) => BackendError::Rejected(msg),
            ChatError::Model(e) => BackendError::Unavailable(e.to_string()),
        }
    }
}

#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError>;

    async fn send_tool_results(&self, request: &ToolResultsRequest) -> Result<ChatResponse, BackendError>;
}

/// In-process backend. Follow-up failures are reported rather than masked so the
/// orchestrator can pick an acknowledgement that matches the actual outcomes.
#[async_trait::async_trait]
impl ChatBackend for ChatService {
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError> {
        Ok(self.chat(request).await?)
    }

    async fn send_tool_results(&self, request: &ToolResultsRequest) -> Result<ChatResponse, BackendError> {
        Ok(self.try_follow_up(request).await?)
    }
}
