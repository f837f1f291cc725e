//! Shared types used across all co-browsing crates.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Section ids of the portfolio page when the config does not list any.
pub const DEFAULT_SECTIONS: [&str; 6] = ["hero", "about", "skills", "projects", "experience", "contact"];

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Only `user` is a user turn; `assistant`, `model` and anything else replay as model turns.
impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let role = String::deserialize(deserializer)?;
        Ok(if role == "user" { Role::User } else { Role::Assistant })
    }
}

/// One message exchanged in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    #[serde(rename = "content", alias = "text")]
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// A model-issued instruction to invoke one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub name: String,
    /// Argument map; serialized as `parameters` to match the chat wire format.
    #[serde(rename = "parameters", alias = "arguments", default = "empty_arguments")]
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

fn empty_arguments() -> serde_json::Map<String, serde_json::Value> {
    serde_json::Map::new()
}

impl ActionRequest {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        let arguments = match arguments {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Structured result of executing one [`ActionRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub name: String,
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ActionOutcome {
    pub fn ok(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: false,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Deployment flavour; controls whether diagnostic detail reaches HTTP responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Development,
}

/// Settle delays and emphasis durations used by the action handlers, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionTimings {
    /// Wait after a smooth scroll to a whole section.
    pub section_settle_ms: u64,
    /// Wait after a viewport scroll (up/down/top/bottom).
    pub page_scroll_settle_ms: u64,
    /// Wait after scrolling a single element into view.
    pub element_settle_ms: u64,
    /// Interval between simulated keystrokes.
    pub keystroke_ms: u64,
    /// Visual cue shown before a simulated click.
    pub click_cue_ms: u64,
    /// How long a filled field keeps its emphasis class.
    pub fill_emphasis_ms: u64,
    /// How long a focused element keeps its emphasis class.
    pub focus_emphasis_ms: u64,
    pub highlight_default_ms: u64,
    /// Upper bound on a model-requested highlight duration.
    pub highlight_max_ms: u64,
}

impl Default for ActionTimings {
    fn default() -> Self {
        Self {
            section_settle_ms: 800,
            page_scroll_settle_ms: 500,
            element_settle_ms: 500,
            keystroke_ms: 50,
            click_cue_ms: 300,
            fill_emphasis_ms: 2000,
            focus_emphasis_ms: 3000,
            highlight_default_ms: 3000,
            highlight_max_ms: 10_000,
        }
    }
}

impl ActionTimings {
    /// All delays zero; used by tests and by headless batch runs.
    pub fn instant() -> Self {
        Self {
            section_settle_ms: 0,
            page_scroll_settle_ms: 0,
            element_settle_ms: 0,
            keystroke_ms: 0,
            click_cue_ms: 0,
            fill_emphasis_ms: 0,
            focus_emphasis_ms: 0,
            highlight_default_ms: 0,
            highlight_max_ms: 0,
        }
    }

    pub fn section_settle(&self) -> Duration {
        Duration::from_millis(self.section_settle_ms)
    }

    pub fn page_scroll_settle(&self) -> Duration {
        Duration::from_millis(self.page_scroll_settle_ms)
    }

    pub fn element_settle(&self) -> Duration {
        Duration::from_millis(self.element_settle_ms)
    }

    pub fn keystroke(&self) -> Duration {
        Duration::from_millis(self.keystroke_ms)
    }

    pub fn click_cue(&self) -> Duration {
        Duration::from_millis(self.click_cue_ms)
    }

    pub fn fill_emphasis(&self) -> Duration {
        Duration::from_millis(self.fill_emphasis_ms)
    }

    pub fn focus_emphasis(&self) -> Duration {
        Duration::from_millis(self.focus_emphasis_ms)
    }

    /// Clamps a requested highlight duration; `None` selects the default.
    pub fn highlight(&self, requested_ms: Option<u64>) -> Duration {
        let ms = requested_ms
            .unwrap_or(self.highlight_default_ms)
            .min(self.highlight_max_ms);
        Duration::from_millis(ms)
    }
}

/// Global application configuration (gateway + model + page). Load from TOML or env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Application identity shown by `/api/v1/status`.
    pub app_name: String,
    /// HTTP port for the gateway.
    pub port: u16,
    /// LLM mode ("mock" or "live").
    pub llm_mode: String,
    #[serde(default)]
    pub environment: Environment,
    /// Hosted model id.
    pub model: String,
    /// Base URL of the generative language API.
    pub api_base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Optional file overriding the built-in system prompt.
    #[serde(default)]
    pub system_prompt_path: Option<String>,
    /// Section ids the navigate tool may target.
    #[serde(default = "default_sections")]
    pub sections: Vec<String>,
    /// If true, the gateway serves the static portfolio page from `frontend_dir`.
    #[serde(default, alias = "ui_enabled")]
    pub frontend_enabled: bool,
    #[serde(default = "default_frontend_dir")]
    pub frontend_dir: String,
    /// Upper bound on follow-up rounds within one user turn.
    pub max_follow_up_rounds: u32,
    #[serde(default)]
    pub timings: ActionTimings,
}

fn default_sections() -> Vec<String> {
    DEFAULT_SECTIONS.iter().map(|s| s.to_string()).collect()
}

fn default_frontend_dir() -> String {
    "site".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            app_name: "Portfolio Assistant".to_string(),
            port: 8001,
            llm_mode: "mock".to_string(),
            environment: Environment::Production,
            model: "gemini-2.5-flash".to_string(),
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            api_key: None,
            system_prompt_path: None,
            sections: default_sections(),
            frontend_enabled: false,
            frontend_dir: default_frontend_dir(),
            max_follow_up_rounds: 5,
            timings: ActionTimings::default(),
        }
    }
}

impl CoreConfig {
    /// Load config from file and environment. Precedence: env `COBROWSE__*` > file
    /// (`COBROWSE_CONFIG` path, else `config/gateway`) > defaults.
    /// `GEMINI_API_KEY` fills `api_key` when neither file nor `COBROWSE__API_KEY` set it.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var("COBROWSE_CONFIG").unwrap_or_else(|_| "config/gateway".to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Same as [`CoreConfig::load`] with an explicit file path. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let defaults = CoreConfig::default();
        let builder = config::Config::builder()
            .set_default("app_name", defaults.app_name)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("llm_mode", defaults.llm_mode)?
            .set_default("environment", "production")?
            .set_default("model", defaults.model)?
            .set_default("api_base_url", defaults.api_base_url)?
            .set_default("max_follow_up_rounds", i64::from(defaults.max_follow_up_rounds))?
            .set_default("frontend_enabled", false)?;

        let built = builder
            .add_source(config::File::with_name(&path.to_string_lossy()).required(false))
            .add_source(config::Environment::with_prefix("COBROWSE").separator("__"))
            .build()?;

        let mut cfg: CoreConfig = built.try_deserialize()?;
        if cfg.api_key.as_deref().map_or(true, str::is_empty) {
            cfg.api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty());
        }
        if cfg.sections.is_empty() {
            cfg.sections = default_sections();
        }
        Ok(cfg)
    }

    pub fn is_live(&self) -> bool {
        self.llm_mode.eq_ignore_ascii_case("live")
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}
