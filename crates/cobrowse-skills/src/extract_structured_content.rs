//! extract-structured-content: text, leading markup and child count of one section or all of them.

use cobrowse_core::{
    parse_arguments, ActionHandler, ActionOutcome, ElementSnapshot, HandlerError, PageDocument, EXTRACT_STRUCTURED_CONTENT,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const HTML_PREVIEW_CHARS: usize = 500;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Args {
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    include_attributes: bool,
}

pub struct ExtractStructuredContent {
    page: Arc<dyn PageDocument>,
}

impl ExtractStructuredContent {
    pub fn new(page: Arc<dyn PageDocument>) -> Self {
        Self { page }
    }
}

fn structured(snapshot: &ElementSnapshot, include_attributes: bool) -> serde_json::Value {
    let text = if snapshot.text.is_empty() { &snapshot.text_content } else { &snapshot.text };
    let mut content = json!({
        "text": text,
        "html": snapshot.inner_html.chars().take(HTML_PREVIEW_CHARS).collect::<String>(),
        "childCount": snapshot.child_count,
    });
    if include_attributes {
        content["attributes"] = json!(snapshot.attributes);
    }
    content
}

#[async_trait::async_trait]
impl ActionHandler for ExtractStructuredContent {
    fn name(&self) -> &str {
        EXTRACT_STRUCTURED_CONTENT
    }

    async fn execute(&self, arguments: &serde_json::Map<String, serde_json::Value>) -> Result<ActionOutcome, HandlerError> {
        let args: Args = parse_arguments(EXTRACT_STRUCTURED_CONTENT, arguments)?;

        if let Some(section_id) = args.section.filter(|s| !s.is_empty()) {
            let Some(section) = self.page.element_by_id(&section_id) else {
                return Ok(ActionOutcome::failed(
                    EXTRACT_STRUCTURED_CONTENT,
                    format!("Section \"{}\" not found", section_id),
                ));
            };
            let snapshot = self.page.inspect(section)?;
            return Ok(ActionOutcome::ok(EXTRACT_STRUCTURED_CONTENT, "Content extracted")
                .with_data(structured(&snapshot, args.include_attributes)));
        }

        let mut all = serde_json::Map::new();
        for section in self.page.sections() {
            let snapshot = self.page.inspect(section)?;
            let id = snapshot.id.clone().filter(|s| !s.is_empty()).unwrap_or_else(|| "unknown".to_string());
            all.insert(id, structured(&snapshot, args.include_attributes));
        }
        Ok(ActionOutcome::ok(EXTRACT_STRUCTURED_CONTENT, "Extracted all sections").with_data(serde_json::Value::Object(all)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html_page::tests::page;

    #[tokio::test]
    async fn single_section_with_attributes() {
        let handler = ExtractStructuredContent::new(Arc::new(page()));
        let args = serde_json::json!({ "section": "hero", "includeAttributes": true });
        let outcome = handler.execute(args.as_object().unwrap()).await.unwrap();
        assert_eq!(outcome.message, "Content extracted");
        let data = outcome.data.unwrap();
        assert_eq!(data["text"], "Jane Doe\nSystems engineer");
        assert_eq!(data["childCount"], 2);
        assert_eq!(data["attributes"]["id"], "hero");
        assert!(data["html"].as_str().unwrap().starts_with("<h1>Jane Doe</h1>"));
    }

    #[tokio::test]
    async fn all_sections_keyed_by_id_without_attributes() {
        let handler = ExtractStructuredContent::new(Arc::new(page()));
        let outcome = handler.execute(&serde_json::Map::new()).await.unwrap();
        assert_eq!(outcome.message, "Extracted all sections");
        let data = outcome.data.unwrap();
        let keys: Vec<_> = data.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 3);
        assert!(data["projects"].get("attributes").is_none());
        assert!(data["projects"]["html"].as_str().unwrap().chars().count() <= 500);
    }

    #[tokio::test]
    async fn unknown_section_fails() {
        let handler = ExtractStructuredContent::new(Arc::new(page()));
        let args = serde_json::json!({ "section": "blog" });
        let outcome = handler.execute(args.as_object().unwrap()).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Section \"blog\" not found");
    }
}
