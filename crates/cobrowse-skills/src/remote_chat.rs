//! HTTP chat backend: drives a running gateway's `/api/chat` endpoints.

use cobrowse_core::{BackendError, ChatBackend, ChatRequest, ChatResponse, ToolResultsRequest};

pub struct RemoteChat {
    http: reqwest::Client,
    endpoint: String,
}

impl RemoteChat {
    /// `base_url` is the gateway root, e.g. `http://127.0.0.1:8001`.
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn read(&self, resp: reqwest::Response) -> Result<ChatResponse, BackendError> {
        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| BackendError::Unavailable(format!("unreadable response ({}): {}", status, e)))?;

        if status.is_client_error() {
            let reason = body["error"].as_str().unwrap_or("request rejected").to_string();
            return Err(BackendError::Rejected(reason));
        }
        if !status.is_success() {
            let detail = body["error"].as_str().or(body["message"].as_str()).unwrap_or_default();
            return Err(BackendError::Unavailable(format!("{}: {}", status, detail)));
        }
        serde_json::from_value(body).map_err(|e| BackendError::Unavailable(format!("malformed chat response: {}", e)))
    }
}

#[async_trait::async_trait]
impl ChatBackend for RemoteChat {
    async fn send_message(&self, request: &ChatRequest) -> Result<ChatResponse, BackendError> {
        tracing::debug!(target: "cobrowse::remote", endpoint = %self.endpoint, "POST chat");
        let resp = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        self.read(resp).await
    }

    async fn send_tool_results(&self, request: &ToolResultsRequest) -> Result<ChatResponse, BackendError> {
        tracing::debug!(target: "cobrowse::remote", endpoint = %self.endpoint, count = request.tool_results.len(), "PUT tool results");
        let resp = self
            .http
            .put(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        let response = self.read(resp).await?;
        // The gateway answers a failed narration with a 200 fallback carrying `note`; the
        // orchestrator picks the acknowledgement from the outcomes instead.
        match response.note {
            Some(note) => Err(BackendError::Unavailable(format!("follow-up not generated: {}", note))),
            None => Ok(response),
        }
    }
}
