//! Tool catalog: the fixed action vocabulary shared by the model gateway and the executor.

use serde::{Deserialize, Serialize};
use serde_json::json;

pub const NAVIGATE_TO_SECTION: &str = "navigate-to-section";
pub const SCROLL_BY_DIRECTION: &str = "scroll-by-direction";
pub const HIGHLIGHT_ELEMENT: &str = "highlight-element";
pub const FILL_INPUT_FIELD: &str = "fill-input-field";
pub const CLICK_ELEMENT: &str = "click-element";
pub const FOCUS_ELEMENT: &str = "focus-element";
pub const EXTRACT_STRUCTURED_CONTENT: &str = "extract-structured-content";
pub const GET_TEXT_CONTENT: &str = "get-text-content";
pub const DESCRIBE_ELEMENT: &str = "describe-element";
pub const QUERY_ELEMENTS: &str = "query-elements";

/// A named, schema-described capability the model can invoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON-schema-like description of the arguments. Descriptive only; never validated here.
    pub parameters: serde_json::Value,
}

impl ToolDeclaration {
    fn new(name: &str, description: &str, parameters: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// Immutable, ordered list of tool declarations. Build once and share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: Vec<ToolDeclaration>,
}

impl ToolCatalog {
    /// The portfolio tool set. `sections` become the enum of the navigate tool.
    pub fn standard<S: AsRef<str>>(sections: &[S]) -> Self {
        let section_ids: Vec<&str> = sections.iter().map(|s| s.as_ref()).collect();
        let section_list = section_ids.join(", ");

        let tools = vec![
            ToolDeclaration::new(
                NAVIGATE_TO_SECTION,
                "Smoothly scroll the page to a specific section. Use this when the user wants to navigate to different parts of the portfolio.",
                json!({
                    "type": "object",
                    "properties": {
                        "section": {
                            "type": "string",
                            "description": format!("Section ID to scroll to. Available sections: {}", section_list),
                            "enum": section_ids
                        }
                    },
                    "required": ["section"]
                }),
            ),
            ToolDeclaration::new(
                SCROLL_BY_DIRECTION,
                "Scroll the page up or down by a specific amount, or jump to the top or bottom.",
                json!({
                    "type": "object",
                    "properties": {
                        "direction": {
                            "type": "string",
                            "description": "Direction to scroll",
                            "enum": ["up", "down", "top", "bottom"]
                        },
                        "amount": {
                            "type": "number",
                            "description": "Scroll amount in pixels (optional, default: 500)",
                            "default": 500
                        }
                    },
                    "required": ["direction"]
                }),
            ),
            ToolDeclaration::new(
                HIGHLIGHT_ELEMENT,
                "Highlight and draw attention to a specific element on the page with a glowing animation.",
                json!({
                    "type": "object",
                    "properties": {
                        "selector": {
                            "type": "string",
                            "description": "CSS selector of the element to highlight (e.g., \"#projects .project-card:first-child\", \".skill-tag\")"
                        },
                        "duration": {
                            "type": "number",
                            "description": "Duration in milliseconds to keep the highlight (default: 3000)",
                            "default": 3000
                        }
                    },
                    "required": ["selector"]
                }),
            ),
            ToolDeclaration::new(
                FILL_INPUT_FIELD,
                "Fill a form input field with specified text. Useful for helping users fill out contact forms.",
                json!({
                    "type": "object",
                    "properties": {
                        "selector": {
                            "type": "string",
                            "description": "CSS selector of the input field (e.g., \"#contact-email\", \"#contact-name\")"
                        },
                        "value": {
                            "type": "string",
                            "description": "The text value to fill into the input field"
                        }
                    },
                    "required": ["selector", "value"]
                }),
            ),
            ToolDeclaration::new(
                CLICK_ELEMENT,
                "Click on a specific element like a button or link.",
                json!({
                    "type": "object",
                    "properties": {
                        "selector": { "type": "string", "description": "CSS selector of the element to click" }
                    },
                    "required": ["selector"]
                }),
            ),
            ToolDeclaration::new(
                FOCUS_ELEMENT,
                "Focus on a specific element and center it in the viewport.",
                json!({
                    "type": "object",
                    "properties": {
                        "selector": { "type": "string", "description": "CSS selector of the element to focus on" }
                    },
                    "required": ["selector"]
                }),
            ),
            ToolDeclaration::new(
                EXTRACT_STRUCTURED_CONTENT,
                "Extract structured content from the website. Reads the current state of the page and returns details about a specific section or all sections.",
                json!({
                    "type": "object",
                    "properties": {
                        "section": {
                            "type": "string",
                            "description": "Optional: specific section ID to extract from (e.g., \"projects\", \"skills\"). If not provided, extracts all visible sections."
                        },
                        "includeAttributes": {
                            "type": "boolean",
                            "description": "Whether to include HTML attributes in the extraction (default: false)",
                            "default": false
                        }
                    }
                }),
            ),
            ToolDeclaration::new(
                GET_TEXT_CONTENT,
                "Extract and return text content from the current page or a specific section.",
                json!({
                    "type": "object",
                    "properties": {
                        "section": {
                            "type": "string",
                            "description": "Optional: specific section ID to get content from. If not provided, returns all visible content."
                        }
                    }
                }),
            ),
            ToolDeclaration::new(
                DESCRIBE_ELEMENT,
                "Get detailed information about a specific element (text content, attributes, visibility).",
                json!({
                    "type": "object",
                    "properties": {
                        "selector": { "type": "string", "description": "CSS selector of the element to inspect" }
                    },
                    "required": ["selector"]
                }),
            ),
            ToolDeclaration::new(
                QUERY_ELEMENTS,
                "Query the page to find elements matching a selector and get their information.",
                json!({
                    "type": "object",
                    "properties": {
                        "selector": {
                            "type": "string",
                            "description": "CSS selector to query (e.g., \".project-card\", \"[data-project]\")"
                        },
                        "getCount": {
                            "type": "boolean",
                            "description": "If true, returns only the count of matching elements (default: false)",
                            "default": false
                        }
                    },
                    "required": ["selector"]
                }),
            ),
        ];

        Self { tools }
    }

    pub fn declarations(&self) -> &[ToolDeclaration] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDeclaration> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// Declarations in the Gemini `function_declarations` shape.
    pub fn function_declarations(&self) -> serde_json::Value {
        json!({
            "function_declarations": self.tools
                .iter()
                .map(|t| json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters
                }))
                .collect::<Vec<_>>()
        })
    }
}
