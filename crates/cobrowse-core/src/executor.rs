//! Action dispatch: a fixed table from tool name to typed handler.

use crate::catalog::ToolCatalog;
use crate::shared::{ActionOutcome, ActionRequest};
use futures_util::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Implemented by every page action (one per catalog entry).
#[async_trait::async_trait]
pub trait ActionHandler: Send + Sync {
    /// Catalog name this handler serves.
    fn name(&self) -> &str;

    /// Runs one request. Target-resolution misses are `Ok` failure outcomes; `Err` is reserved
    /// for unexpected conditions and is converted into a failure outcome by the registry.
    async fn execute(&self, arguments: &serde_json::Map<String, serde_json::Value>) -> Result<ActionOutcome, HandlerError>;
}

/// Registry of action handlers that can be dispatched by name.
pub struct ActionRegistry {
    catalog: Arc<ToolCatalog>,
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    pub fn new(catalog: Arc<ToolCatalog>) -> Self {
        Self {
            catalog,
            handlers: HashMap::new(),
        }
    }

    /// Registers a handler. Names missing from the catalog are refused and logged.
    pub fn register(&mut self, handler: Arc<dyn ActionHandler>) -> bool {
        let name = handler.name().to_string();
        if !self.catalog.contains(&name) {
            tracing::warn!(target: "cobrowse::executor", action = %name, "refusing handler for undeclared action");
            return false;
        }
        self.handlers.insert(name, handler);
        true
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    /// Names with a registered handler, in catalog order.
    pub fn handler_names(&self) -> Vec<String> {
        self.catalog
            .names()
            .into_iter()
            .filter(|n| self.handlers.contains_key(*n))
            .map(str::to_string)
            .collect()
    }

    /// Executes one request. Always returns a populated outcome named after the request.
    pub async fn execute(&self, request: &ActionRequest) -> ActionOutcome {
        let name = request.name.as_str();
        if !self.catalog.contains(name) {
            tracing::warn!(target: "cobrowse::executor", action = %name, "unknown action requested");
            return ActionOutcome::failed(name, format!("Unknown action: {}", name));
        }
        let Some(handler) = self.handlers.get(name) else {
            return ActionOutcome::failed(name, format!("No handler registered for action: {}", name));
        };

        let run = AssertUnwindSafe(handler.execute(&request.arguments)).catch_unwind();
        let mut outcome = match run.await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => ActionOutcome::failed(name, e.to_string()),
            Err(panic) => ActionOutcome::failed(name, panic_message(panic.as_ref())),
        };
        outcome.name = name.to_string();

        tracing::info!(
            target: "cobrowse::executor",
            action = %name,
            success = outcome.success,
            "{}",
            outcome.message
        );
        outcome
    }

    /// Executes a batch strictly in order, one at a time, running every request even after a failure.
    pub async fn execute_batch(&self, requests: &[ActionRequest]) -> Vec<ActionOutcome> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            outcomes.push(self.execute(request).await);
        }
        outcomes
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "action handler panicked".to_string()
    }
}

/// Deserializes handler arguments, reporting schema mismatches as a handler error.
pub fn parse_arguments<T: serde::de::DeserializeOwned>(
    action: &str,
    arguments: &serde_json::Map<String, serde_json::Value>,
) -> Result<T, HandlerError> {
    serde_json::from_value(serde_json::Value::Object(arguments.clone()))
        .map_err(|e| format!("Invalid arguments for {}: {}", action, e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{GET_TEXT_CONTENT, NAVIGATE_TO_SECTION, QUERY_ELEMENTS};
    use crate::shared::DEFAULT_SECTIONS;
    use std::sync::Mutex;

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl ActionHandler for Recording {
        fn name(&self) -> &str {
            self.name
        }

        async fn execute(&self, arguments: &serde_json::Map<String, serde_json::Value>) -> Result<ActionOutcome, HandlerError> {
            let tag = arguments.get("tag").and_then(|v| v.as_str()).unwrap_or("").to_string();
            tokio::task::yield_now().await;
            self.log.lock().unwrap().push(tag.clone());
            match tag.as_str() {
                "boom" => Err("selector engine exploded".into()),
                "panic" => panic!("handler bug"),
                "miss" => Ok(ActionOutcome::failed("whatever", "Element \"#nope\" not found")),
                _ => Ok(ActionOutcome::ok("whatever", format!("did {}", tag))),
            }
        }
    }

    fn registry(log: &Arc<Mutex<Vec<String>>>) -> ActionRegistry {
        let catalog = Arc::new(ToolCatalog::standard(&DEFAULT_SECTIONS));
        let mut registry = ActionRegistry::new(catalog);
        for name in [NAVIGATE_TO_SECTION, QUERY_ELEMENTS] {
            assert!(registry.register(Arc::new(Recording { name, log: Arc::clone(log) })));
        }
        registry
    }

    fn req(name: &str, tag: &str) -> ActionRequest {
        ActionRequest::new(name, serde_json::json!({ "tag": tag }))
    }

    #[tokio::test]
    async fn unknown_action_degrades_to_failure_outcome() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let outcome = registry(&log).execute(&req("launch-rockets", "x")).await;
        assert!(!outcome.success);
        assert_eq!(outcome.name, "launch-rockets");
        assert_eq!(outcome.message, "Unknown action: launch-rockets");
    }

    #[tokio::test]
    async fn declared_action_without_handler_fails_softly() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let outcome = registry(&log).execute(&req(GET_TEXT_CONTENT, "x")).await;
        assert!(!outcome.success);
        assert!(outcome.message.contains("No handler"));
    }

    #[tokio::test]
    async fn batch_preserves_count_order_and_runs_past_failures() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(&log);
        let batch = vec![
            req(NAVIGATE_TO_SECTION, "one"),
            req(QUERY_ELEMENTS, "miss"),
            req("nope", "skipped"),
            req(QUERY_ELEMENTS, "boom"),
            req(QUERY_ELEMENTS, "panic"),
            req(NAVIGATE_TO_SECTION, "two"),
        ];
        let outcomes = registry.execute_batch(&batch).await;

        assert_eq!(outcomes.len(), batch.len());
        for (request, outcome) in batch.iter().zip(&outcomes) {
            assert_eq!(request.name, outcome.name);
        }
        assert!(outcomes[0].success);
        assert!(!outcomes[1].success);
        assert_eq!(outcomes[3].message, "selector engine exploded");
        assert_eq!(outcomes[4].message, "handler bug");
        assert_eq!(outcomes[5].message, "did two");
        assert_eq!(*log.lock().unwrap(), vec!["one", "miss", "boom", "panic", "two"]);
    }

    #[test]
    fn register_refuses_undeclared_names() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = registry(&log);
        assert!(!registry.register(Arc::new(Recording { name: "rogue", log })));
        assert_eq!(registry.handler_names(), vec![NAVIGATE_TO_SECTION, QUERY_ELEMENTS]);
    }
}
