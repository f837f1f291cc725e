//! scroll-by-direction: viewport scroll up/down by an amount, or jump to top/bottom.

use cobrowse_core::{parse_arguments, ActionHandler, ActionOutcome, HandlerError, PageDocument, ViewportScroll, SCROLL_BY_DIRECTION};
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_AMOUNT: f64 = 500.0;

#[derive(Deserialize)]
struct Args {
    direction: String,
    #[serde(default)]
    amount: Option<f64>,
}

pub struct ScrollByDirection {
    page: Arc<dyn PageDocument>,
}

impl ScrollByDirection {
    pub fn new(page: Arc<dyn PageDocument>) -> Self {
        Self { page }
    }
}

#[async_trait::async_trait]
impl ActionHandler for ScrollByDirection {
    fn name(&self) -> &str {
        SCROLL_BY_DIRECTION
    }

    async fn execute(&self, arguments: &serde_json::Map<String, serde_json::Value>) -> Result<ActionOutcome, HandlerError> {
        let args: Args = parse_arguments(SCROLL_BY_DIRECTION, arguments)?;
        let amount = args.amount.unwrap_or(DEFAULT_AMOUNT);
        let scroll = match args.direction.as_str() {
            "up" => ViewportScroll::By(-amount),
            "down" => ViewportScroll::By(amount),
            "top" => ViewportScroll::Top,
            "bottom" => ViewportScroll::Bottom,
            other => {
                return Ok(ActionOutcome::failed(SCROLL_BY_DIRECTION, format!("Invalid direction: {}", other)));
            }
        };
        self.page.scroll_viewport(scroll).await?;
        Ok(ActionOutcome::ok(SCROLL_BY_DIRECTION, format!("Scrolled {}", args.direction)))
    }
}
