//! Stateless chat service: one user turn or one tool-result submission per call.
//!
//! Every call replays the full history supplied by the client; nothing is kept between calls.

use crate::catalog::ToolCatalog;
use crate::conversation::replay_history;
use crate::gateway::{GatewayError, GenerationSettings, ModelCall, ModelGateway, ModelReply};
use crate::page::{contextual_message, extract_page_content};
use crate::shared::{ActionOutcome, ActionRequest, Turn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const ACTION_PLACEHOLDER: &str = "Let me do that for you...";
pub const FOLLOW_UP_ACTION_PLACEHOLDER: &str = "Let me do that next...";
pub const CLARIFICATION_PROMPT: &str = "I understand. Let me help with that. Please ask me something more specific.";
pub const FOLLOW_UP_DONE: &str = "Done! I've completed the action.";
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";
pub const FOLLOW_UP_FALLBACK: &str = "The action was completed successfully.";
pub const FOLLOW_UP_FALLBACK_NOTE: &str = "Follow-up response could not be generated, but the action succeeded.";

/// A `null` history reads like a missing one.
fn nullable_history<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Vec<Turn>, D::Error> {
    Ok(Option::<Vec<Turn>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default, deserialize_with = "nullable_history")]
    pub conversation_history: Vec<Turn>,
    #[serde(default)]
    pub page_content: Option<String>,
    #[serde(default)]
    pub section_id: Option<String>,
}

impl ChatRequest {
    /// Validates a raw JSON body. The message check runs before anything else so the
    /// client gets the same error whether the field is missing or mistyped.
    pub fn from_json(body: serde_json::Value) -> Result<Self, ChatError> {
        match body.get("message") {
            Some(serde_json::Value::String(_)) => {}
            _ => return Err(ChatError::Validation("Message is required and must be a string".to_string())),
        }
        let request: ChatRequest =
            serde_json::from_value(body).map_err(|e| ChatError::Validation(format!("Invalid chat request: {}", e)))?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), ChatError> {
        if self.message.trim().is_empty() {
            return Err(ChatError::Validation("Message cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Body of `PUT /api/chat`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultsRequest {
    pub tool_results: Vec<ActionOutcome>,
    #[serde(default, deserialize_with = "nullable_history")]
    pub conversation_history: Vec<Turn>,
}

impl ToolResultsRequest {
    pub fn from_json(body: serde_json::Value) -> Result<Self, ChatError> {
        match body.get("toolResults") {
            Some(serde_json::Value::Array(_)) => {}
            _ => return Err(ChatError::Validation("toolResults must be an array".to_string())),
        }
        serde_json::from_value(body).map_err(|e| ChatError::Validation(format!("Invalid tool results: {}", e)))
    }

    pub fn all_succeeded(&self) -> bool {
        self.tool_results.iter().all(|r| r.success)
    }
}

/// Response of both chat endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: String,
    #[serde(default)]
    pub tool_calls: Vec<ActionRequest>,
    #[serde(default)]
    pub requires_action: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_follow_up: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ChatResponse {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// True when the client should run `tool_calls`.
    pub fn wants_actions(&self) -> bool {
        self.requires_action && !self.tool_calls.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Model(#[from] GatewayError),
}

/// Builds the synthetic turn that reports action outcomes back to the model.
pub fn summarize_outcomes(outcomes: &[ActionOutcome]) -> String {
    let lines = outcomes
        .iter()
        .map(|o| format!("{} {}: {}", if o.success { '✓' } else { '✗' }, o.name, o.message))
        .collect::<Vec<_>>()
        .join("\n");
    let overall = if outcomes.iter().all(|o| o.success) {
        "All actions completed successfully."
    } else {
        "Some actions encountered issues."
    };
    format!(
        "The following actions were executed on the website:\n{}\n\n{}\n\nNow provide a natural follow-up response about the results. Be conversational and acknowledge what was done.",
        lines, overall
    )
}

/// Wraps the model gateway with the portfolio prompt and tool catalog.
pub struct ChatService {
    gateway: Arc<dyn ModelGateway>,
    catalog: Arc<ToolCatalog>,
    system_prompt: Arc<str>,
}

impl ChatService {
    pub fn new(gateway: Arc<dyn ModelGateway>, catalog: Arc<ToolCatalog>, system_prompt: impl Into<Arc<str>>) -> Self {
        Self {
            gateway,
            catalog,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    pub fn gateway_mode(&self) -> &str {
        self.gateway.mode()
    }

    /// Handles one user turn. Validation runs before the model is contacted.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        request.validate()?;

        let relevant = extract_page_content(request.page_content.as_deref().unwrap_or(""), request.section_id.as_deref());
        let history = replay_history(&request.conversation_history);
        let message = contextual_message(&relevant, &request.message);

        tracing::info!(
            target: "cobrowse::chat",
            message_len = message.len(),
            history_len = history.len(),
            "Sending message to model"
        );

        let reply = self.converse(&history, &message, GenerationSettings::chat()).await?;

        if reply.has_actions() {
            let text = reply.trimmed_text();
            tracing::info!(
                target: "cobrowse::chat",
                actions = ?reply.action_requests.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
                "Tool calls detected"
            );
            return Ok(ChatResponse {
                message: if text.is_empty() { ACTION_PLACEHOLDER.to_string() } else { reply.text.clone() },
                has_follow_up: Some(!text.is_empty()),
                requires_action: true,
                tool_calls: reply.action_requests,
                note: None,
            });
        }

        if reply.trimmed_text().is_empty() {
            tracing::warn!(target: "cobrowse::chat", "Empty response from model");
            return Ok(ChatResponse::text(CLARIFICATION_PROMPT));
        }
        Ok(ChatResponse::text(reply.text))
    }

    /// Narrates tool results; surfaces model failures to the caller.
    pub async fn try_follow_up(&self, request: &ToolResultsRequest) -> Result<ChatResponse, ChatError> {
        let history = replay_history(&request.conversation_history);
        let summary = summarize_outcomes(&request.tool_results);

        tracing::info!(
            target: "cobrowse::chat",
            count = request.tool_results.len(),
            all_succeeded = request.all_succeeded(),
            "Processing tool results"
        );

        let reply = self.converse(&history, &summary, GenerationSettings::follow_up()).await?;

        if reply.has_actions() {
            let text = reply.trimmed_text();
            return Ok(ChatResponse {
                message: if text.is_empty() { FOLLOW_UP_ACTION_PLACEHOLDER.to_string() } else { reply.text.clone() },
                requires_action: true,
                tool_calls: reply.action_requests,
                has_follow_up: None,
                note: None,
            });
        }

        let message = if reply.trimmed_text().is_empty() { FOLLOW_UP_DONE.to_string() } else { reply.text };
        Ok(ChatResponse::text(message))
    }

    /// Narrates tool results, degrading to a success-shaped acknowledgement on model failure.
    pub async fn follow_up(&self, request: &ToolResultsRequest) -> ChatResponse {
        match self.try_follow_up(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(target: "cobrowse::chat", error = %e, "Follow-up narration failed");
                ChatResponse {
                    message: FOLLOW_UP_FALLBACK.to_string(),
                    note: Some(FOLLOW_UP_FALLBACK_NOTE.to_string()),
                    ..ChatResponse::default()
                }
            }
        }
    }

    async fn converse(&self, history: &[Turn], message: &str, settings: GenerationSettings) -> Result<ModelReply, GatewayError> {
        let call = ModelCall {
            system_prompt: &self.system_prompt,
            catalog: &self.catalog,
            history,
            message,
            settings,
        };
        self.gateway.converse(call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{Role, DEFAULT_SECTIONS};
    use std::sync::Mutex;

    /// Replays canned replies and records what it was asked.
    struct Scripted {
        replies: Mutex<Vec<Result<ModelReply, GatewayError>>>,
        seen: Mutex<Vec<(Vec<Turn>, String)>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<ModelReply, GatewayError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl ModelGateway for Scripted {
        fn mode(&self) -> &str {
            "scripted"
        }

        async fn converse(&self, call: ModelCall<'_>) -> Result<ModelReply, GatewayError> {
            self.seen.lock().unwrap().push((call.history.to_vec(), call.message.to_string()));
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(GatewayError::Transport("script exhausted".into()));
            }
            replies.remove(0)
        }
    }

    fn service(gateway: Arc<Scripted>) -> ChatService {
        ChatService::new(gateway, Arc::new(ToolCatalog::standard(&DEFAULT_SECTIONS)), "be helpful")
    }

    fn request(message: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            ..ChatRequest::default()
        }
    }

    #[test]
    fn null_history_and_foreign_roles_are_accepted() {
        let req = ChatRequest::from_json(serde_json::json!({ "message": "hi", "conversationHistory": null })).unwrap();
        assert!(req.conversation_history.is_empty());

        let req = ChatRequest::from_json(serde_json::json!({
            "message": "hi",
            "conversationHistory": [{ "role": "user", "content": "a" }, { "role": "system", "content": "b" }]
        }))
        .unwrap();
        assert_eq!(req.conversation_history, vec![Turn::user("a"), Turn::assistant("b")]);

        let results = ToolResultsRequest::from_json(serde_json::json!({ "toolResults": [], "conversationHistory": null })).unwrap();
        assert!(results.conversation_history.is_empty());
    }

    #[test]
    fn from_json_rejects_missing_or_mistyped_message() {
        for body in [serde_json::json!({}), serde_json::json!({ "message": 42 })] {
            match ChatRequest::from_json(body) {
                Err(ChatError::Validation(msg)) => assert_eq!(msg, "Message is required and must be a string"),
                other => panic!("unexpected {:?}", other),
            }
        }
        match ChatRequest::from_json(serde_json::json!({ "message": "   " })) {
            Err(ChatError::Validation(msg)) => assert_eq!(msg, "Message cannot be empty"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn tool_results_must_be_an_array() {
        assert!(matches!(
            ToolResultsRequest::from_json(serde_json::json!({ "toolResults": "nope" })),
            Err(ChatError::Validation(_))
        ));
        let parsed = ToolResultsRequest::from_json(serde_json::json!({
            "toolResults": [{ "name": "click-element", "success": true, "message": "Clicked #send" }]
        }))
        .unwrap();
        assert!(parsed.all_succeeded());
        assert!(parsed.conversation_history.is_empty());
    }

    #[tokio::test]
    async fn blank_message_never_reaches_the_model() {
        let gateway = Scripted::new(vec![Ok(ModelReply::text("unused"))]);
        let svc = service(Arc::clone(&gateway));
        assert!(matches!(svc.chat(&request(" \n\t")).await, Err(ChatError::Validation(_))));
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn actions_without_text_get_placeholder() {
        let gateway = Scripted::new(vec![Ok(ModelReply::actions(
            "",
            vec![ActionRequest::new("navigate-to-section", serde_json::json!({ "section": "projects" }))],
        ))]);
        let response = service(gateway).chat(&request("go to the projects section")).await.unwrap();
        assert_eq!(response.message, ACTION_PLACEHOLDER);
        assert!(response.requires_action);
        assert_eq!(response.has_follow_up, Some(false));
        assert_eq!(response.tool_calls[0].arguments["section"], "projects");
    }

    #[tokio::test]
    async fn text_reply_is_exclusive_of_actions() {
        let gateway = Scripted::new(vec![Ok(ModelReply::text("Jane builds databases.")), Ok(ModelReply::text("  "))]);
        let svc = service(gateway);

        let answer = svc.chat(&request("who is this?")).await.unwrap();
        assert_eq!(answer.message, "Jane builds databases.");
        assert!(!answer.requires_action && answer.tool_calls.is_empty());

        let empty = svc.chat(&request("hmm")).await.unwrap();
        assert_eq!(empty.message, CLARIFICATION_PROMPT);
    }

    #[tokio::test]
    async fn chat_grounds_message_and_strips_leading_assistant_turns() {
        let gateway = Scripted::new(vec![Ok(ModelReply::text("ok"))]);
        let svc = service(Arc::clone(&gateway));
        let req = ChatRequest {
            message: "what did she build?".to_string(),
            conversation_history: vec![Turn::assistant("Hi!"), Turn::user("hello"), Turn::assistant("hey")],
            page_content: Some("=== HERO ===\nJane\n\n=== PROJECTS ===\nTiny DB\n\n".to_string()),
            section_id: Some("projects".to_string()),
        };
        svc.chat(&req).await.unwrap();

        let seen = gateway.seen.lock().unwrap();
        let (history, message) = &seen[0];
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(message, "Current page content:\nTiny DB\n\nUser question: what did she build?");
    }

    #[tokio::test]
    async fn model_failure_surfaces_as_model_error() {
        let gateway = Scripted::new(vec![Err(GatewayError::Transport("connection refused".into()))]);
        assert!(matches!(service(gateway).chat(&request("hi")).await, Err(ChatError::Model(_))));
    }

    #[test]
    fn summary_lists_each_outcome_and_overall_status() {
        let outcomes = vec![
            ActionOutcome::ok("navigate-to-section", "Scrolled to projects"),
            ActionOutcome::failed("highlight-element", "Element \".missing\" not found"),
        ];
        let summary = summarize_outcomes(&outcomes);
        assert!(summary.starts_with("The following actions were executed on the website:\n"));
        assert!(summary.contains("✓ navigate-to-section: Scrolled to projects\n✗ highlight-element: Element \".missing\" not found"));
        assert!(summary.contains("Some actions encountered issues."));
        assert!(summarize_outcomes(&outcomes[..1]).contains("All actions completed successfully."));
    }

    #[tokio::test]
    async fn follow_up_falls_back_to_success_shape_when_model_fails() {
        let gateway = Scripted::new(vec![Err(GatewayError::Status { status: 503, body: "overloaded".into() })]);
        let req = ToolResultsRequest {
            tool_results: vec![ActionOutcome::ok("navigate-to-section", "Scrolled to projects")],
            conversation_history: vec![],
        };
        let response = service(gateway).follow_up(&req).await;
        assert_eq!(response.message, FOLLOW_UP_FALLBACK);
        assert_eq!(response.note.as_deref(), Some(FOLLOW_UP_FALLBACK_NOTE));
        assert!(!response.requires_action);
    }

    #[tokio::test]
    async fn follow_up_can_request_more_actions() {
        let gateway = Scripted::new(vec![
            Ok(ModelReply::actions("", vec![ActionRequest::new("highlight-element", serde_json::json!({ "selector": ".project-card" }))])),
            Ok(ModelReply::text("")),
        ]);
        let svc = service(gateway);
        let req = ToolResultsRequest::default();

        let more = svc.follow_up(&req).await;
        assert_eq!(more.message, FOLLOW_UP_ACTION_PLACEHOLDER);
        assert!(more.wants_actions());

        let done = svc.follow_up(&req).await;
        assert_eq!(done.message, FOLLOW_UP_DONE);
    }
}
