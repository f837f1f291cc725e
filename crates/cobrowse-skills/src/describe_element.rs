//! describe-element: tag, text, attributes and visibility of the first match.

use cobrowse_core::{parse_arguments, ActionHandler, ActionOutcome, HandlerError, PageDocument, DESCRIBE_ELEMENT};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const TEXT_PREVIEW_CHARS: usize = 200;

#[derive(Deserialize)]
struct Args {
    selector: String,
}

pub struct DescribeElement {
    page: Arc<dyn PageDocument>,
}

impl DescribeElement {
    pub fn new(page: Arc<dyn PageDocument>) -> Self {
        Self { page }
    }
}

#[async_trait::async_trait]
impl ActionHandler for DescribeElement {
    fn name(&self) -> &str {
        DESCRIBE_ELEMENT
    }

    async fn execute(&self, arguments: &serde_json::Map<String, serde_json::Value>) -> Result<ActionOutcome, HandlerError> {
        let args: Args = parse_arguments(DESCRIBE_ELEMENT, arguments)?;
        let Some(element) = self.page.query_selector(&args.selector)? else {
            return Ok(ActionOutcome::failed(DESCRIBE_ELEMENT, format!("Element \"{}\" not found", args.selector)));
        };
        let snapshot = self.page.inspect(element)?;
        let info = json!({
            "tagName": snapshot.tag_name,
            "textContent": snapshot.text_content.chars().take(TEXT_PREVIEW_CHARS).collect::<String>(),
            "attributes": snapshot.attributes,
            "visible": snapshot.visible,
            "dimensions": snapshot.dimensions,
        });
        Ok(ActionOutcome::ok(DESCRIBE_ELEMENT, "Info retrieved").with_data(info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html_page::tests::page;

    #[tokio::test]
    async fn describes_first_match() {
        let handler = DescribeElement::new(Arc::new(page()));
        let args = serde_json::json!({ "selector": "[data-project]" });
        let outcome = handler.execute(args.as_object().unwrap()).await.unwrap();
        assert_eq!(outcome.message, "Info retrieved");
        let data = outcome.data.unwrap();
        assert_eq!(data["tagName"], "DIV");
        assert_eq!(data["textContent"], "Tiny DBAn embedded store");
        assert_eq!(data["attributes"]["data-project"], "db");
        assert_eq!(data["visible"], true);
        assert!(data["dimensions"].is_null());
    }

    #[tokio::test]
    async fn missing_element_fails() {
        let handler = DescribeElement::new(Arc::new(page()));
        let args = serde_json::json!({ "selector": "#avatar" });
        let outcome = handler.execute(args.as_object().unwrap()).await.unwrap();
        assert_eq!(outcome.message, "Element \"#avatar\" not found");
    }
}
