//! fill-input-field: type a value into an input or textarea one character at a time.

use cobrowse_core::{
    parse_arguments, ActionHandler, ActionOutcome, ActionTimings, HandlerError, PageDocument, ScrollAlign, TemporaryClass,
    FILL_INPUT_FIELD,
};
use serde::Deserialize;
use std::sync::Arc;

pub const FILLED_CLASS: &str = "ai-filled";

#[derive(Deserialize)]
struct Args {
    selector: String,
    value: String,
}

pub struct FillInputField {
    page: Arc<dyn PageDocument>,
    timings: ActionTimings,
}

impl FillInputField {
    pub fn new(page: Arc<dyn PageDocument>, timings: ActionTimings) -> Self {
        Self { page, timings }
    }
}

#[async_trait::async_trait]
impl ActionHandler for FillInputField {
    fn name(&self) -> &str {
        FILL_INPUT_FIELD
    }

    async fn execute(&self, arguments: &serde_json::Map<String, serde_json::Value>) -> Result<ActionOutcome, HandlerError> {
        let args: Args = parse_arguments(FILL_INPUT_FIELD, arguments)?;
        let target = match self.page.query_selector(&args.selector)? {
            Some(el) if self.page.inspect(el)?.is_text_entry() => el,
            _ => return Ok(ActionOutcome::failed(FILL_INPUT_FIELD, format!("Invalid input: {}", args.selector))),
        };

        self.page.scroll_into_view(target, ScrollAlign::Center).await?;
        self.page.focus(target)?;

        // The field is replaced, not appended to.
        let mut typed = String::with_capacity(args.value.len());
        self.page.set_value(target, &typed)?;
        let keystroke = self.timings.keystroke();
        for ch in args.value.chars() {
            if !keystroke.is_zero() {
                tokio::time::sleep(keystroke).await;
            }
            typed.push(ch);
            self.page.set_value(target, &typed)?;
            self.page.dispatch_input(target)?;
        }

        TemporaryClass::apply(&self.page, target, FILLED_CLASS)?.expire_after(self.timings.fill_emphasis());
        Ok(ActionOutcome::ok(FILL_INPUT_FIELD, format!("Filled {}", args.selector)))
    }
}
