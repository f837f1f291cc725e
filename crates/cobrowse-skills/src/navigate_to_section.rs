//! navigate-to-section: smooth-scroll a section (by id) to the top of the viewport.

use cobrowse_core::{parse_arguments, ActionHandler, ActionOutcome, HandlerError, PageDocument, ScrollAlign, NAVIGATE_TO_SECTION};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
struct Args {
    section: String,
}

pub struct NavigateToSection {
    page: Arc<dyn PageDocument>,
}

impl NavigateToSection {
    pub fn new(page: Arc<dyn PageDocument>) -> Self {
        Self { page }
    }
}

#[async_trait::async_trait]
impl ActionHandler for NavigateToSection {
    fn name(&self) -> &str {
        NAVIGATE_TO_SECTION
    }

    async fn execute(&self, arguments: &serde_json::Map<String, serde_json::Value>) -> Result<ActionOutcome, HandlerError> {
        let args: Args = parse_arguments(NAVIGATE_TO_SECTION, arguments)?;
        let Some(section) = self.page.element_by_id(&args.section) else {
            return Ok(ActionOutcome::failed(NAVIGATE_TO_SECTION, format!("Section \"{}\" not found", args.section)));
        };
        self.page.scroll_into_view(section, ScrollAlign::Start).await?;
        Ok(ActionOutcome::ok(NAVIGATE_TO_SECTION, format!("Scrolled to {}", args.section)))
    }
}
