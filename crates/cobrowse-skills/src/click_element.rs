//! click-element: center the target, show a short click cue, then click it.

use cobrowse_core::{
    parse_arguments, ActionHandler, ActionOutcome, ActionTimings, HandlerError, PageDocument, ScrollAlign, TemporaryClass,
    CLICK_ELEMENT,
};
use serde::Deserialize;
use std::sync::Arc;

pub const CLICKING_CLASS: &str = "ai-clicking";

#[derive(Deserialize)]
struct Args {
    selector: String,
}

pub struct ClickElement {
    page: Arc<dyn PageDocument>,
    timings: ActionTimings,
}

impl ClickElement {
    pub fn new(page: Arc<dyn PageDocument>, timings: ActionTimings) -> Self {
        Self { page, timings }
    }
}

#[async_trait::async_trait]
impl ActionHandler for ClickElement {
    fn name(&self) -> &str {
        CLICK_ELEMENT
    }

    async fn execute(&self, arguments: &serde_json::Map<String, serde_json::Value>) -> Result<ActionOutcome, HandlerError> {
        let args: Args = parse_arguments(CLICK_ELEMENT, arguments)?;
        let Some(element) = self.page.query_selector(&args.selector)? else {
            return Ok(ActionOutcome::failed(CLICK_ELEMENT, format!("Element \"{}\" not found", args.selector)));
        };

        self.page.scroll_into_view(element, ScrollAlign::Center).await?;
        {
            let _cue = TemporaryClass::apply(&self.page, element, CLICKING_CLASS)?;
            let cue = self.timings.click_cue();
            if !cue.is_zero() {
                tokio::time::sleep(cue).await;
            }
            self.page.click(element)?;
        }
        Ok(ActionOutcome::ok(CLICK_ELEMENT, format!("Clicked {}", args.selector)))
    }
}
