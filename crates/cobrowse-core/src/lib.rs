//! cobrowse-core: co-browsing assistant core (shared types, tool catalog, chat service,
//! action registry and the conversation orchestrator).
//!
//! The model gateway and the live document are traits here; concrete implementations
//! live in `cobrowse-skills` so the core stays free of network and HTML dependencies.

mod catalog;
mod chat;
mod conversation;
mod executor;
mod gateway;
mod orchestrator;
mod page;
mod prompt;
mod shared;

// Shared
pub use shared::{
    ActionOutcome, ActionRequest, ActionTimings, CoreConfig, Environment, Role, Turn, DEFAULT_SECTIONS,
};

// Tool catalog
pub use catalog::{
    ToolCatalog, ToolDeclaration, CLICK_ELEMENT, DESCRIBE_ELEMENT, EXTRACT_STRUCTURED_CONTENT, FILL_INPUT_FIELD,
    FOCUS_ELEMENT, GET_TEXT_CONTENT, HIGHLIGHT_ELEMENT, NAVIGATE_TO_SECTION, QUERY_ELEMENTS, SCROLL_BY_DIRECTION,
};

// Conversation + model gateway seam
pub use conversation::{replay_history, ConversationState};
pub use gateway::{GatewayError, GenerationSettings, ModelCall, ModelGateway, ModelReply};
pub use prompt::{load_system_prompt, DEFAULT_SYSTEM_PROMPT};

// Chat service (server side of POST/PUT /api/chat)
pub use chat::{
    summarize_outcomes, ChatError, ChatRequest, ChatResponse, ChatService, ToolResultsRequest, ACTION_PLACEHOLDER,
    APOLOGY, CLARIFICATION_PROMPT, FOLLOW_UP_ACTION_PLACEHOLDER, FOLLOW_UP_DONE, FOLLOW_UP_FALLBACK,
    FOLLOW_UP_FALLBACK_NOTE,
};

// Page capability + action execution
pub use executor::{parse_arguments, ActionHandler, ActionRegistry, HandlerError};
pub use page::{
    contextual_message, extract_page_content, page_content_snapshot, section_header, Dimensions, ElementHandle,
    ElementSnapshot, PageDocument, PageError, ScrollAlign, TemporaryClass, ViewportScroll,
};

// Orchestrator
pub use orchestrator::{
    BackendError, ChatBackend, Orchestrator, Phase, SubmitError, TurnReport, FOLLOW_UP_CAP_NOTE,
    FOLLOW_UP_FAILURE_ACK, FOLLOW_UP_SUCCESS_ACK,
};
