//! Model Router: sends the conversation to an LLM (mock or live Gemini API) and returns text and/or
//! action requests.

use cobrowse_core::{
    ActionRequest, CoreConfig, GatewayError, GenerationSettings, ModelCall, ModelGateway, ModelReply, Role, NAVIGATE_TO_SECTION,
    SCROLL_BY_DIRECTION,
};
use serde_json::json;
use std::time::Instant;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const OUTCOME_SUMMARY_PREFIX: &str = "The following actions were executed on the website:";
const QUESTION_MARKER: &str = "User question: ";

/// Mode for LLM invocation: mock (deterministic, offline) or live (Gemini `generateContent`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LlmMode {
    #[default]
    Mock,
    Live,
}

impl LlmMode {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("live") {
            LlmMode::Live
        } else {
            LlmMode::Mock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LlmMode::Mock => "mock",
            LlmMode::Live => "live",
        }
    }
}

/// Routes one conversation turn to the mock model or to Gemini.
pub struct ModelRouter {
    mode: LlmMode,
    http: reqwest::Client,
    model: String,
    api_base_url: String,
    api_key: Option<String>,
}

impl ModelRouter {
    pub fn with_mode(mode: LlmMode) -> Self {
        Self {
            mode,
            http: reqwest::Client::new(),
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE.to_string(),
            api_key: None,
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            mode: LlmMode::parse(&config.llm_mode),
            http: reqwest::Client::new(),
            model: config.model.clone(),
            api_base_url: config.api_base_url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn llm_mode(&self) -> LlmMode {
        self.mode
    }

    /// Mock LLM: outcome summaries get an acknowledgement, navigation and scroll phrasing becomes
    /// an action request, anything else is echoed back.
    fn mock_generate(&self, call: &ModelCall<'_>) -> ModelReply {
        if call.message.starts_with(OUTCOME_SUMMARY_PREFIX) {
            return ModelReply::text(mock_acknowledgement(call.message));
        }

        let question = call
            .message
            .rsplit_once(QUESTION_MARKER)
            .map(|(_, q)| q)
            .unwrap_or(call.message);
        let lowered = question.to_lowercase();

        if let Some(direction) = ["top", "bottom", "up", "down"]
            .into_iter()
            .find(|d| lowered.contains("scroll") && lowered.contains(d))
        {
            return ModelReply::actions(
                "",
                vec![ActionRequest::new(SCROLL_BY_DIRECTION, json!({ "direction": direction }))],
            );
        }

        let wants_navigation = ["go to", "show", "navigate", "take me", "scroll to", "open"]
            .iter()
            .any(|verb| lowered.contains(verb));
        if wants_navigation {
            if let Some(section) = section_ids(call).into_iter().find(|s| lowered.contains(&s.to_lowercase())) {
                return ModelReply::actions(
                    format!("Taking you to the {} section.", section),
                    vec![ActionRequest::new(NAVIGATE_TO_SECTION, json!({ "section": section }))],
                );
            }
        }

        let preview: String = question.chars().take(80).collect();
        let ellipsis = if question.chars().count() > 80 { "…" } else { "" };
        ModelReply::text(format!(
            "[Mock LLM] You asked: {}{}\nSet llm_mode = \"live\" and GEMINI_API_KEY to get real answers.",
            preview, ellipsis
        ))
    }

    async fn live_generate(&self, call: &ModelCall<'_>) -> Result<ModelReply, GatewayError> {
        let key = self
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| GatewayError::NotConfigured("GEMINI_API_KEY is not set".to_string()))?;
        let url = format!("{}/models/{}:generateContent", self.api_base_url.trim_end_matches('/'), self.model);
        let body = build_request_body(call);

        let started = Instant::now();
        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(target: "cobrowse::model", status = status.as_u16(), "Gemini returned an error status");
            return Err(GatewayError::Status { status: status.as_u16(), body });
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::MalformedReply(e.to_string()))?;
        let reply = parse_reply(&data)?;
        tracing::info!(
            target: "cobrowse::model",
            model = %self.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            actions = reply.action_requests.len(),
            "Gemini reply received"
        );
        Ok(reply)
    }
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::with_mode(LlmMode::Mock)
    }
}

#[async_trait::async_trait]
impl ModelGateway for ModelRouter {
    fn mode(&self) -> &str {
        self.mode.as_str()
    }

    async fn converse(&self, call: ModelCall<'_>) -> Result<ModelReply, GatewayError> {
        match self.mode {
            LlmMode::Mock => Ok(self.mock_generate(&call)),
            LlmMode::Live => self.live_generate(&call).await,
        }
    }
}

fn section_ids(call: &ModelCall<'_>) -> Vec<String> {
    call.catalog
        .get(NAVIGATE_TO_SECTION)
        .and_then(|decl| decl.parameters["properties"]["section"]["enum"].as_array().cloned())
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn mock_acknowledgement(summary: &str) -> String {
    let lines: Vec<&str> = summary
        .lines()
        .filter(|l| l.starts_with('✓') || l.starts_with('✗'))
        .collect();
    let failed: Vec<&str> = lines.iter().filter(|l| l.starts_with('✗')).copied().collect();
    if failed.is_empty() {
        let done = lines
            .iter()
            .filter_map(|l| l.split_once(": ").map(|(_, msg)| msg))
            .collect::<Vec<_>>()
            .join(", ");
        format!("Done! {}.", done)
    } else {
        format!("Some of that didn't work out:\n{}", failed.join("\n"))
    }
}

/// Gemini `generateContent` body: system instruction, replayed turns plus the new user turn,
/// function declarations and sampling settings.
pub fn build_request_body(call: &ModelCall<'_>) -> serde_json::Value {
    let mut contents: Vec<serde_json::Value> = call
        .history
        .iter()
        .map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "model",
            };
            json!({ "role": role, "parts": [{ "text": turn.text }] })
        })
        .collect();
    contents.push(json!({ "role": "user", "parts": [{ "text": call.message }] }));

    let mut body = json!({
        "contents": contents,
        "tools": [call.catalog.function_declarations()],
    });
    if !call.system_prompt.is_empty() {
        body["system_instruction"] = json!({ "parts": [{ "text": call.system_prompt }] });
    }
    let generation = generation_config(&call.settings);
    if !generation.as_object().map_or(true, |m| m.is_empty()) {
        body["generationConfig"] = generation;
    }
    body
}

fn generation_config(settings: &GenerationSettings) -> serde_json::Value {
    let mut config = serde_json::Map::new();
    if let Some(t) = settings.temperature {
        config.insert("temperature".into(), json!(t));
    }
    if let Some(k) = settings.top_k {
        config.insert("topK".into(), json!(k));
    }
    if let Some(p) = settings.top_p {
        config.insert("topP".into(), json!(p));
    }
    if let Some(n) = settings.max_output_tokens {
        config.insert("maxOutputTokens".into(), json!(n));
    }
    serde_json::Value::Object(config)
}

/// Reads text parts and `functionCall` parts of the first candidate.
pub fn parse_reply(data: &serde_json::Value) -> Result<ModelReply, GatewayError> {
    let Some(candidate) = data["candidates"].get(0) else {
        let reason = data["promptFeedback"]["blockReason"].as_str().unwrap_or("no candidates");
        return Err(GatewayError::MalformedReply(reason.to_string()));
    };

    let mut reply = ModelReply::default();
    for part in candidate["content"]["parts"].as_array().into_iter().flatten() {
        if let Some(text) = part["text"].as_str() {
            reply.text.push_str(text);
        }
        if let Some(fc) = part.get("functionCall") {
            let name = fc["name"].as_str().unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            reply.action_requests.push(ActionRequest::new(name, fc["args"].clone()));
        }
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cobrowse_core::{ToolCatalog, Turn, DEFAULT_SECTIONS};

    fn call<'a>(catalog: &'a ToolCatalog, history: &'a [Turn], message: &'a str) -> ModelCall<'a> {
        ModelCall {
            system_prompt: "be helpful",
            catalog,
            history,
            message,
            settings: GenerationSettings::chat(),
        }
    }

    #[tokio::test]
    async fn mock_turns_navigation_phrasing_into_an_action() {
        let catalog = ToolCatalog::standard(&DEFAULT_SECTIONS);
        let router = ModelRouter::with_mode(LlmMode::Mock);
        let reply = router
            .converse(call(&catalog, &[], "Current page content:\n...\n\nUser question: go to the projects section"))
            .await
            .unwrap();
        assert_eq!(reply.action_requests.len(), 1);
        assert_eq!(reply.action_requests[0].name, NAVIGATE_TO_SECTION);
        assert_eq!(reply.action_requests[0].arguments["section"], "projects");

        let scroll = router.converse(call(&catalog, &[], "scroll down a bit")).await.unwrap();
        assert_eq!(scroll.action_requests[0].arguments["direction"], "down");
        assert!(scroll.text.is_empty());
    }

    #[tokio::test]
    async fn mock_acknowledges_outcome_summaries() {
        let catalog = ToolCatalog::standard(&DEFAULT_SECTIONS);
        let router = ModelRouter::default();
        let summary = cobrowse_core::summarize_outcomes(&[cobrowse_core::ActionOutcome::ok(
            NAVIGATE_TO_SECTION,
            "Scrolled to projects",
        )]);
        let reply = router.converse(call(&catalog, &[], &summary)).await.unwrap();
        assert_eq!(reply.text, "Done! Scrolled to projects.");
        assert!(!reply.has_actions());
    }

    #[tokio::test]
    async fn live_without_key_is_not_configured() {
        let catalog = ToolCatalog::standard(&DEFAULT_SECTIONS);
        let router = ModelRouter::with_mode(LlmMode::Live);
        let err = router.converse(call(&catalog, &[], "hi")).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotConfigured(_)));
    }

    #[test]
    fn request_body_maps_roles_and_settings() {
        let catalog = ToolCatalog::standard(&DEFAULT_SECTIONS);
        let history = vec![Turn::user("hello"), Turn::assistant("hi there")];
        let body = build_request_body(&call(&catalog, &history, "show projects"));
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "show projects");
        assert_eq!(body["system_instruction"]["parts"][0]["text"], "be helpful");
        assert_eq!(body["tools"][0]["function_declarations"].as_array().unwrap().len(), 10);
        assert_eq!(body["generationConfig"]["topK"], 1);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);

        let mut follow_up = call(&catalog, &history, "results");
        follow_up.settings = GenerationSettings::follow_up();
        assert!(build_request_body(&follow_up).get("generationConfig").is_none());
    }

    #[test]
    fn reply_parsing_collects_text_and_function_calls() {
        let data = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [
                    { "text": "Sure, " },
                    { "text": "heading there." },
                    { "functionCall": { "name": "navigate-to-section", "args": { "section": "contact" } } },
                    { "functionCall": { "name": "get-text-content" } }
                ]}
            }]
        });
        let reply = parse_reply(&data).unwrap();
        assert_eq!(reply.text, "Sure, heading there.");
        assert_eq!(reply.action_requests.len(), 2);
        assert_eq!(reply.action_requests[0].arguments["section"], "contact");
        assert!(reply.action_requests[1].arguments.is_empty());

        let blocked = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(matches!(parse_reply(&blocked), Err(GatewayError::MalformedReply(r)) if r == "SAFETY"));
    }
}
