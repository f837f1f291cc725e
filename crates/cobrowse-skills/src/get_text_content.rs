//! get-text-content: the page-content text format for one section or the whole page.

use cobrowse_core::{
    page_content_snapshot, parse_arguments, section_header, ActionHandler, ActionOutcome, HandlerError, PageDocument,
    GET_TEXT_CONTENT,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
struct Args {
    #[serde(default)]
    section: Option<String>,
}

pub struct GetTextContent {
    page: Arc<dyn PageDocument>,
}

impl GetTextContent {
    pub fn new(page: Arc<dyn PageDocument>) -> Self {
        Self { page }
    }
}

#[async_trait::async_trait]
impl ActionHandler for GetTextContent {
    fn name(&self) -> &str {
        GET_TEXT_CONTENT
    }

    async fn execute(&self, arguments: &serde_json::Map<String, serde_json::Value>) -> Result<ActionOutcome, HandlerError> {
        let args: Args = parse_arguments(GET_TEXT_CONTENT, arguments)?;
        let content = match args.section.filter(|s| !s.is_empty()) {
            Some(section_id) => {
                let Some(section) = self.page.element_by_id(&section_id) else {
                    return Ok(ActionOutcome::failed(GET_TEXT_CONTENT, format!("Section \"{}\" not found", section_id)));
                };
                let snapshot = self.page.inspect(section)?;
                format!("{}\n{}", section_header(&section_id), snapshot.text)
            }
            None => page_content_snapshot(self.page.as_ref()),
        };
        Ok(ActionOutcome::ok(GET_TEXT_CONTENT, "Content extracted").with_data(serde_json::Value::String(content)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html_page::tests::page;

    #[tokio::test]
    async fn section_and_full_page_formats() {
        let handler = GetTextContent::new(Arc::new(page()));
        let args = serde_json::json!({ "section": "hero" });
        let one = handler.execute(args.as_object().unwrap()).await.unwrap();
        assert_eq!(one.data.unwrap(), "=== HERO ===\nJane Doe\nSystems engineer");

        let all = handler.execute(&serde_json::Map::new()).await.unwrap();
        let text = all.data.unwrap().as_str().unwrap().to_string();
        assert!(text.starts_with("=== HERO ===\nJane Doe\nSystems engineer\n\n=== PROJECTS ===\n"));
        assert!(text.contains("=== CONTACT ===\nContact\nHello\nSend\n\n"));
        assert!(!text.contains("not content"));
    }
}
