//! query-elements: count or list every element matching a selector.

use cobrowse_core::{parse_arguments, ActionHandler, ActionOutcome, HandlerError, PageDocument, QUERY_ELEMENTS};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const TEXT_PREVIEW_CHARS: usize = 100;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Args {
    selector: String,
    #[serde(default)]
    get_count: bool,
}

pub struct QueryElements {
    page: Arc<dyn PageDocument>,
}

impl QueryElements {
    pub fn new(page: Arc<dyn PageDocument>) -> Self {
        Self { page }
    }
}

#[async_trait::async_trait]
impl ActionHandler for QueryElements {
    fn name(&self) -> &str {
        QUERY_ELEMENTS
    }

    async fn execute(&self, arguments: &serde_json::Map<String, serde_json::Value>) -> Result<ActionOutcome, HandlerError> {
        let args: Args = parse_arguments(QUERY_ELEMENTS, arguments)?;
        let matches = self.page.query_selector_all(&args.selector)?;
        if matches.is_empty() {
            return Ok(ActionOutcome::failed(QUERY_ELEMENTS, format!("No elements found for {}", args.selector)));
        }
        let message = format!("Found {} elements", matches.len());

        if args.get_count {
            return Ok(ActionOutcome::ok(QUERY_ELEMENTS, message).with_data(json!({
                "count": matches.len(),
                "selector": args.selector,
            })));
        }

        let mut elements = Vec::with_capacity(matches.len());
        for (index, element) in matches.iter().enumerate() {
            let snapshot = self.page.inspect(*element)?;
            elements.push(json!({
                "index": index,
                "tagName": snapshot.tag_name,
                "text": snapshot.text_content.chars().take(TEXT_PREVIEW_CHARS).collect::<String>(),
                "id": snapshot.id.filter(|id| !id.is_empty()),
                "classes": snapshot.classes,
            }));
        }
        Ok(ActionOutcome::ok(QUERY_ELEMENTS, message).with_data(json!({
            "count": matches.len(),
            "selector": args.selector,
            "elements": elements,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html_page::tests::page;

    #[tokio::test]
    async fn lists_matches_in_document_order() {
        let handler = QueryElements::new(Arc::new(page()));
        let args = serde_json::json!({ "selector": ".project-card" });
        let outcome = handler.execute(args.as_object().unwrap()).await.unwrap();
        assert_eq!(outcome.message, "Found 2 elements");
        let data = outcome.data.unwrap();
        assert_eq!(data["count"], 2);
        assert_eq!(data["elements"][1]["index"], 1);
        assert_eq!(data["elements"][1]["text"], "Co-browse");
        assert!(data["elements"][0]["id"].is_null());
        assert_eq!(data["elements"][0]["classes"], serde_json::json!(["project-card"]));
    }

    #[tokio::test]
    async fn count_mode_omits_element_list() {
        let handler = QueryElements::new(Arc::new(page()));
        let args = serde_json::json!({ "selector": "section", "getCount": true });
        let data = handler.execute(args.as_object().unwrap()).await.unwrap().data.unwrap();
        assert_eq!(data, serde_json::json!({ "count": 3, "selector": "section" }));
    }

    #[tokio::test]
    async fn no_matches_is_a_failure() {
        let handler = QueryElements::new(Arc::new(page()));
        let args = serde_json::json!({ "selector": ".testimonial" });
        let outcome = handler.execute(args.as_object().unwrap()).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "No elements found for .testimonial");
    }
}
