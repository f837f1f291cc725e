//! focus-element: center an element, focus it and mark it for a few seconds.

use cobrowse_core::{
    parse_arguments, ActionHandler, ActionOutcome, ActionTimings, HandlerError, PageDocument, ScrollAlign, TemporaryClass,
    FOCUS_ELEMENT,
};
use serde::Deserialize;
use std::sync::Arc;

pub const FOCUSED_CLASS: &str = "ai-focused";

#[derive(Deserialize)]
struct Args {
    selector: String,
}

pub struct FocusElement {
    page: Arc<dyn PageDocument>,
    timings: ActionTimings,
}

impl FocusElement {
    pub fn new(page: Arc<dyn PageDocument>, timings: ActionTimings) -> Self {
        Self { page, timings }
    }
}

#[async_trait::async_trait]
impl ActionHandler for FocusElement {
    fn name(&self) -> &str {
        FOCUS_ELEMENT
    }

    async fn execute(&self, arguments: &serde_json::Map<String, serde_json::Value>) -> Result<ActionOutcome, HandlerError> {
        let args: Args = parse_arguments(FOCUS_ELEMENT, arguments)?;
        let Some(element) = self.page.query_selector(&args.selector)? else {
            return Ok(ActionOutcome::failed(FOCUS_ELEMENT, format!("Element \"{}\" not found", args.selector)));
        };

        self.page.scroll_into_view(element, ScrollAlign::Center).await?;
        self.page.focus(element)?;
        TemporaryClass::apply(&self.page, element, FOCUSED_CLASS)?.expire_after(self.timings.focus_emphasis());
        Ok(ActionOutcome::ok(FOCUS_ELEMENT, format!("Focused {}", args.selector)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html_page::tests::page;

    #[tokio::test(start_paused = true)]
    async fn outcome_returns_before_emphasis_expires() {
        let page = Arc::new(page());
        let timings = ActionTimings { element_settle_ms: 0, ..ActionTimings::default() };
        let handler = FocusElement::new(page.clone(), timings);
        let args = serde_json::json!({ "selector": "#contact-name" });
        let outcome = handler.execute(args.as_object().unwrap()).await.unwrap();
        assert_eq!(outcome.message, "Focused #contact-name");

        let field = page.element_by_id("contact-name").unwrap();
        assert_eq!(page.focused(), Some(field));
        assert!(page.inspect(field).unwrap().classes.contains(&FOCUSED_CLASS.to_string()));
        tokio::time::sleep(std::time::Duration::from_millis(3_001)).await;
        assert!(page.inspect(field).unwrap().classes.is_empty());
    }
}
