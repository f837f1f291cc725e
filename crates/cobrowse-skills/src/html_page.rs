//! Headless `PageDocument` over a static HTML file.
//!
//! The markup is parsed with `scraper` on every lookup (the parsed tree is not `Send`), and element
//! handles are document-order indexes. Mutations (classes, values, focus) live in an overlay, and
//! every effect is appended to an event log so callers can see what the assistant did to the page.

use cobrowse_core::{
    ActionTimings, Dimensions, ElementHandle, ElementSnapshot, PageDocument, PageError, ScrollAlign, ViewportScroll,
};
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One observable effect on the page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    ScrolledIntoView { element: ElementHandle, align: ScrollAlign },
    ViewportScrolled(ViewportScroll),
    ClassAdded { element: ElementHandle, class: String },
    ClassRemoved { element: ElementHandle, class: String },
    ValueSet { element: ElementHandle, value: String },
    Input(ElementHandle),
    Focused(ElementHandle),
    Clicked(ElementHandle),
}

#[derive(Default)]
struct Overlay {
    classes: HashMap<usize, Vec<String>>,
    values: HashMap<usize, String>,
    focused: Option<ElementHandle>,
    events: Vec<PageEvent>,
}

pub struct HtmlPage {
    source: String,
    timings: ActionTimings,
    overlay: Mutex<Overlay>,
}

impl HtmlPage {
    pub fn parse(source: impl Into<String>, timings: ActionTimings) -> Self {
        Self {
            source: source.into(),
            timings,
            overlay: Mutex::new(Overlay::default()),
        }
    }

    pub fn from_file(path: &Path, timings: ActionTimings) -> std::io::Result<Self> {
        Ok(Self::parse(std::fs::read_to_string(path)?, timings))
    }

    /// Everything that happened to the page so far, oldest first.
    pub fn events(&self) -> Vec<PageEvent> {
        self.overlay().events.clone()
    }

    pub fn focused(&self) -> Option<ElementHandle> {
        self.overlay().focused
    }

    fn overlay(&self) -> MutexGuard<'_, Overlay> {
        self.overlay.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, event: PageEvent) {
        tracing::debug!(target: "cobrowse::page", event = ?event, "page effect");
        self.overlay().events.push(event);
    }

    /// Runs `f` over the parsed document and its elements in document order.
    fn with_elements<R>(&self, f: impl FnOnce(&[ElementRef<'_>]) -> R) -> R {
        let html = Html::parse_document(&self.source);
        let elements: Vec<ElementRef<'_>> = html.root_element().descendants().filter_map(ElementRef::wrap).collect();
        f(&elements)
    }

    fn select_all(&self, selector: &str) -> Result<Vec<ElementHandle>, PageError> {
        let parsed = Selector::parse(selector).map_err(|e| PageError::InvalidSelector {
            selector: selector.to_string(),
            reason: format!("{:?}", e),
        })?;
        Ok(self.with_elements(|elements| {
            elements
                .iter()
                .enumerate()
                .filter(|(_, el)| parsed.matches(el))
                .map(|(i, _)| ElementHandle(i))
                .collect()
        }))
    }

    fn ensure_attached(&self, element: ElementHandle) -> Result<(), PageError> {
        if self.with_elements(|elements| element.0 < elements.len()) {
            Ok(())
        } else {
            Err(PageError::Detached(element))
        }
    }

    fn classes_of(&self, element: ElementHandle) -> Result<Vec<String>, PageError> {
        if let Some(classes) = self.overlay().classes.get(&element.0) {
            return Ok(classes.clone());
        }
        self.with_elements(|elements| {
            elements
                .get(element.0)
                .map(|el| el.value().classes().map(str::to_string).collect())
                .ok_or(PageError::Detached(element))
        })
    }

    async fn settle(&self, delay: std::time::Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Visible text: trimmed non-empty text runs outside `<script>`/`<style>`, one per line.
fn rendered_text(el: &ElementRef<'_>) -> String {
    el.descendants()
        .filter_map(|node| node.value().as_text().map(|t| (node, t)))
        .filter(|(node, _)| {
            !node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .map_or(false, |e| matches!(e.name(), "script" | "style" | "noscript" | "template"))
            })
        })
        .map(|(_, t)| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn hidden(el: &ElementRef<'_>) -> bool {
    let is_hidden = |e: &scraper::node::Element| {
        e.attr("hidden").is_some()
            || e.attr("style")
                .map(|s| s.replace(' ', "").to_ascii_lowercase().contains("display:none"))
                .unwrap_or(false)
            || (e.name() == "input" && e.attr("type").map_or(false, |t| t.eq_ignore_ascii_case("hidden")))
    };
    is_hidden(el.value()) || el.ancestors().filter_map(|a| a.value().as_element()).any(is_hidden)
}

#[async_trait::async_trait]
impl PageDocument for HtmlPage {
    fn element_by_id(&self, id: &str) -> Option<ElementHandle> {
        self.with_elements(|elements| {
            elements
                .iter()
                .position(|el| el.value().id() == Some(id))
                .map(ElementHandle)
        })
    }

    fn query_selector(&self, selector: &str) -> Result<Option<ElementHandle>, PageError> {
        Ok(self.select_all(selector)?.into_iter().next())
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementHandle>, PageError> {
        self.select_all(selector)
    }

    fn sections(&self) -> Vec<ElementHandle> {
        self.with_elements(|elements| {
            elements
                .iter()
                .enumerate()
                .filter(|(_, el)| el.value().classes().any(|c| c == "section"))
                .map(|(i, _)| ElementHandle(i))
                .collect()
        })
    }

    fn inspect(&self, element: ElementHandle) -> Result<ElementSnapshot, PageError> {
        let classes = self.classes_of(element)?;
        let value_override = self.overlay().values.get(&element.0).cloned();
        self.with_elements(|elements| -> Result<ElementSnapshot, PageError> {
            let el = elements.get(element.0).ok_or(PageError::Detached(element))?;
            let mut attributes: BTreeMap<String, String> =
                el.value().attrs().map(|(k, v)| (k.to_string(), v.to_string())).collect();
            if classes.is_empty() {
                attributes.remove("class");
            } else {
                attributes.insert("class".to_string(), classes.join(" "));
            }
            if let Some(value) = &value_override {
                attributes.insert("value".to_string(), value.clone());
            }
            Ok(ElementSnapshot {
                tag_name: el.value().name().to_ascii_uppercase(),
                id: el.value().id().map(str::to_string),
                classes,
                attributes,
                text: rendered_text(el),
                text_content: el.text().collect(),
                inner_html: el.inner_html(),
                child_count: el.children().filter(|c| c.value().is_element()).count(),
                visible: !hidden(el),
                // No layout engine; sizes are unknown.
                dimensions: None::<Dimensions>,
            })
        })
    }

    fn add_class(&self, element: ElementHandle, class: &str) -> Result<(), PageError> {
        let mut classes = self.classes_of(element)?;
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
        self.overlay().classes.insert(element.0, classes);
        self.record(PageEvent::ClassAdded {
            element,
            class: class.to_string(),
        });
        Ok(())
    }

    fn remove_class(&self, element: ElementHandle, class: &str) -> Result<(), PageError> {
        let mut classes = self.classes_of(element)?;
        classes.retain(|c| c != class);
        self.overlay().classes.insert(element.0, classes);
        self.record(PageEvent::ClassRemoved {
            element,
            class: class.to_string(),
        });
        Ok(())
    }

    fn value(&self, element: ElementHandle) -> Result<String, PageError> {
        if let Some(value) = self.overlay().values.get(&element.0) {
            return Ok(value.clone());
        }
        self.with_elements(|elements| -> Result<String, PageError> {
            let el = elements.get(element.0).ok_or(PageError::Detached(element))?;
            Ok(match el.value().name() {
                "textarea" => el.text().collect(),
                _ => el.value().attr("value").unwrap_or_default().to_string(),
            })
        })
    }

    fn set_value(&self, element: ElementHandle, value: &str) -> Result<(), PageError> {
        self.ensure_attached(element)?;
        self.overlay().values.insert(element.0, value.to_string());
        self.record(PageEvent::ValueSet {
            element,
            value: value.to_string(),
        });
        Ok(())
    }

    fn dispatch_input(&self, element: ElementHandle) -> Result<(), PageError> {
        self.ensure_attached(element)?;
        self.record(PageEvent::Input(element));
        Ok(())
    }

    fn focus(&self, element: ElementHandle) -> Result<(), PageError> {
        self.ensure_attached(element)?;
        self.overlay().focused = Some(element);
        self.record(PageEvent::Focused(element));
        Ok(())
    }

    fn click(&self, element: ElementHandle) -> Result<(), PageError> {
        self.ensure_attached(element)?;
        self.record(PageEvent::Clicked(element));
        Ok(())
    }

    async fn scroll_into_view(&self, element: ElementHandle, align: ScrollAlign) -> Result<(), PageError> {
        self.ensure_attached(element)?;
        self.record(PageEvent::ScrolledIntoView { element, align });
        let delay = match align {
            ScrollAlign::Start => self.timings.section_settle(),
            ScrollAlign::Center => self.timings.element_settle(),
        };
        self.settle(delay).await;
        Ok(())
    }

    async fn scroll_viewport(&self, scroll: ViewportScroll) -> Result<(), PageError> {
        self.record(PageEvent::ViewportScrolled(scroll));
        self.settle(self.timings.page_scroll_settle()).await;
        Ok(())
    }
}
