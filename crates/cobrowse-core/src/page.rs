//! Page capability surface: the live document the action handlers operate on.
//!
//! Handlers never reach into ambient globals; they receive an `Arc<dyn PageDocument>`.
//! Effects that animate (`scroll_into_view`, `scroll_viewport`) resolve only once the
//! implementation considers the motion finished, so outcome messages describe completed work.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Opaque handle to one element of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementHandle(pub usize);

/// Where a scrolled-to element should land in the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAlign {
    Start,
    Center,
}

/// Whole-viewport scroll commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportScroll {
    By(f64),
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

/// Read-only view of one element at the time of inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementSnapshot {
    /// Upper-case tag name, as the DOM reports it.
    pub tag_name: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    /// Rendered text, one line per block of visible text.
    pub text: String,
    /// Raw concatenated text content.
    pub text_content: String,
    pub inner_html: String,
    pub child_count: usize,
    pub visible: bool,
    pub dimensions: Option<Dimensions>,
}

impl ElementSnapshot {
    pub fn is_text_entry(&self) -> bool {
        matches!(self.tag_name.as_str(), "INPUT" | "TEXTAREA")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("invalid selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("element {0:?} is no longer attached to the document")]
    Detached(ElementHandle),
    #[error("{0}")]
    Unsupported(String),
}

#[async_trait::async_trait]
pub trait PageDocument: Send + Sync {
    /// `getElementById`.
    fn element_by_id(&self, id: &str) -> Option<ElementHandle>;

    /// First match of a CSS selector.
    fn query_selector(&self, selector: &str) -> Result<Option<ElementHandle>, PageError>;

    /// All matches of a CSS selector, in document order.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementHandle>, PageError>;

    /// Top-level content sections (elements carrying the `section` class), in document order.
    fn sections(&self) -> Vec<ElementHandle>;

    fn inspect(&self, element: ElementHandle) -> Result<ElementSnapshot, PageError>;

    fn add_class(&self, element: ElementHandle, class: &str) -> Result<(), PageError>;

    fn remove_class(&self, element: ElementHandle, class: &str) -> Result<(), PageError>;

    fn value(&self, element: ElementHandle) -> Result<String, PageError>;

    fn set_value(&self, element: ElementHandle, value: &str) -> Result<(), PageError>;

    /// Fires a bubbling `input` event on the element.
    fn dispatch_input(&self, element: ElementHandle) -> Result<(), PageError>;

    fn focus(&self, element: ElementHandle) -> Result<(), PageError>;

    fn click(&self, element: ElementHandle) -> Result<(), PageError>;

    /// Smooth-scrolls the element into view; resolves when the scroll has settled.
    async fn scroll_into_view(&self, element: ElementHandle, align: ScrollAlign) -> Result<(), PageError>;

    /// Smooth-scrolls the viewport; resolves when the scroll has settled.
    async fn scroll_viewport(&self, scroll: ViewportScroll) -> Result<(), PageError>;
}

/// Applies a CSS class for the lifetime of the guard. The class is removed on drop,
/// including when the owning handler bails out early with an error.
pub struct TemporaryClass {
    page: Arc<dyn PageDocument>,
    element: ElementHandle,
    class: &'static str,
}

impl TemporaryClass {
    pub fn apply(page: &Arc<dyn PageDocument>, element: ElementHandle, class: &'static str) -> Result<Self, PageError> {
        page.add_class(element, class)?;
        Ok(Self {
            page: Arc::clone(page),
            element,
            class,
        })
    }

    /// Keeps the class for `linger` more, then removes it from a background task.
    /// Without a tokio runtime the class is removed immediately.
    pub fn expire_after(self, linger: std::time::Duration) {
        if linger.is_zero() {
            return;
        }
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                tokio::time::sleep(linger).await;
                drop(self);
            });
        }
    }
}

impl Drop for TemporaryClass {
    fn drop(&mut self) {
        if let Err(e) = self.page.remove_class(self.element, self.class) {
            tracing::warn!(target: "cobrowse::page", class = self.class, error = %e, "failed to clear temporary class");
        }
    }
}

/// Header line that opens one section block of the page snapshot. ASCII upper-casing,
/// the same folding [`extract_page_content`] matches with.
pub fn section_header(section_id: &str) -> String {
    format!("=== {} ===", section_id.to_ascii_uppercase())
}

/// Serializes the visible text of every section: `=== ID ===\n<text>\n\n` per section.
pub fn page_content_snapshot(page: &dyn PageDocument) -> String {
    let mut content = String::new();
    for section in page.sections() {
        let Ok(snapshot) = page.inspect(section) else {
            continue;
        };
        let id = snapshot.id.as_deref().filter(|s| !s.is_empty()).unwrap_or("unknown");
        content.push_str(&section_header(id));
        content.push('\n');
        content.push_str(&snapshot.text);
        content.push_str("\n\n");
    }
    content
}

/// Extracts one section block from a page snapshot. The header match is case-insensitive and
/// the block runs to the next `===` or the end. Falls back to the full content when the section
/// is absent; an empty snapshot yields an empty string.
pub fn extract_page_content(full_content: &str, section_id: Option<&str>) -> String {
    if full_content.is_empty() {
        return String::new();
    }
    let Some(section_id) = section_id.filter(|s| !s.trim().is_empty()) else {
        return full_content.to_string();
    };

    // ASCII upper-casing keeps byte offsets aligned with the original text.
    let haystack = full_content.to_ascii_uppercase();
    let header = section_header(section_id);
    let Some(start) = haystack.find(&header) else {
        return full_content.to_string();
    };
    let body_start = start + header.len();
    let body_end = haystack[body_start..]
        .find("===")
        .map(|offset| body_start + offset)
        .unwrap_or(full_content.len());
    full_content[body_start..body_end].trim().to_string()
}

/// The message sent to the model for a user turn, grounded in page content when available.
pub fn contextual_message(relevant_content: &str, message: &str) -> String {
    if relevant_content.is_empty() {
        message.to_string()
    } else {
        format!("Current page content:\n{}\n\nUser question: {}", relevant_content, message)
    }
}
