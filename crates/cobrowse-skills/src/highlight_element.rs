//! highlight-element: center an element and keep it glowing for the requested duration.

use cobrowse_core::{
    parse_arguments, ActionHandler, ActionOutcome, ActionTimings, HandlerError, PageDocument, ScrollAlign, TemporaryClass,
    HIGHLIGHT_ELEMENT,
};
use serde::Deserialize;
use std::sync::Arc;

pub const HIGHLIGHT_CLASS: &str = "ai-highlighted";

#[derive(Deserialize)]
struct Args {
    selector: String,
    #[serde(default)]
    duration: Option<f64>,
}

pub struct HighlightElement {
    page: Arc<dyn PageDocument>,
    timings: ActionTimings,
}

impl HighlightElement {
    pub fn new(page: Arc<dyn PageDocument>, timings: ActionTimings) -> Self {
        Self { page, timings }
    }
}

#[async_trait::async_trait]
impl ActionHandler for HighlightElement {
    fn name(&self) -> &str {
        HIGHLIGHT_ELEMENT
    }

    async fn execute(&self, arguments: &serde_json::Map<String, serde_json::Value>) -> Result<ActionOutcome, HandlerError> {
        let args: Args = parse_arguments(HIGHLIGHT_ELEMENT, arguments)?;
        let Some(element) = self.page.query_selector(&args.selector)? else {
            return Ok(ActionOutcome::failed(HIGHLIGHT_ELEMENT, format!("Element \"{}\" not found", args.selector)));
        };

        let _glow = TemporaryClass::apply(&self.page, element, HIGHLIGHT_CLASS)?;
        self.page.scroll_into_view(element, ScrollAlign::Center).await?;
        let hold = self.timings.highlight(args.duration.map(|ms| ms.max(0.0) as u64));
        if !hold.is_zero() {
            tokio::time::sleep(hold).await;
        }
        Ok(ActionOutcome::ok(HIGHLIGHT_ELEMENT, format!("Highlighted {}", args.selector)))
    }
}
