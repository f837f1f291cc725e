//! Concrete co-browsing capabilities: page action handlers, the headless HTML page, the model
//! router and the remote chat client.

pub use cobrowse_core::{ActionHandler, ActionRegistry};

mod click_element;
mod describe_element;
mod extract_structured_content;
mod fill_input_field;
mod focus_element;
mod get_text_content;
mod highlight_element;
mod html_page;
mod model_router;
mod navigate_to_section;
mod query_elements;
mod remote_chat;
mod scroll_by_direction;

pub use click_element::{ClickElement, CLICKING_CLASS};
pub use describe_element::DescribeElement;
pub use extract_structured_content::ExtractStructuredContent;
pub use fill_input_field::{FillInputField, FILLED_CLASS};
pub use focus_element::{FocusElement, FOCUSED_CLASS};
pub use get_text_content::GetTextContent;
pub use highlight_element::{HighlightElement, HIGHLIGHT_CLASS};
pub use html_page::{HtmlPage, PageEvent};
pub use model_router::{build_request_body, parse_reply, LlmMode, ModelRouter};
pub use navigate_to_section::NavigateToSection;
pub use query_elements::QueryElements;
pub use remote_chat::RemoteChat;
pub use scroll_by_direction::ScrollByDirection;

use cobrowse_core::{ActionTimings, PageDocument, ToolCatalog};
use std::sync::Arc;

/// Registry with every page action bound to `page`.
pub fn page_action_registry(catalog: Arc<ToolCatalog>, page: Arc<dyn PageDocument>, timings: &ActionTimings) -> ActionRegistry {
    let mut registry = ActionRegistry::new(catalog);
    let handlers: Vec<Arc<dyn ActionHandler>> = vec![
        Arc::new(NavigateToSection::new(Arc::clone(&page))),
        Arc::new(ScrollByDirection::new(Arc::clone(&page))),
        Arc::new(HighlightElement::new(Arc::clone(&page), timings.clone())),
        Arc::new(FillInputField::new(Arc::clone(&page), timings.clone())),
        Arc::new(ClickElement::new(Arc::clone(&page), timings.clone())),
        Arc::new(FocusElement::new(Arc::clone(&page), timings.clone())),
        Arc::new(ExtractStructuredContent::new(Arc::clone(&page))),
        Arc::new(GetTextContent::new(Arc::clone(&page))),
        Arc::new(DescribeElement::new(Arc::clone(&page))),
        Arc::new(QueryElements::new(page)),
    ];
    for handler in handlers {
        registry.register(handler);
    }
    registry
}
