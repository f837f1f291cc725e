//! Axum-based chat gateway for the co-browsing portfolio assistant. Config-driven via CoreConfig.

mod handlers;
mod terminal;

use axum::http::Method;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
    routing::{get, post},
    Router,
};
use cobrowse_core::{load_system_prompt, ChatService, CoreConfig, ToolCatalog};
use cobrowse_skills::ModelRouter;
use std::path::Path as StdPath;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tracing::field::Visit;
use tracing_subscriber::layer::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Captures the "message" field from a tracing event.
struct MessageCollector<'a>(&'a mut String);

impl Visit for MessageCollector<'_> {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            *self.0 = value.to_string();
        }
    }
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.0 = format!("{:?}", value);
        }
    }
}

/// Sends each tracing event as a line to a broadcast channel for SSE log streaming.
#[derive(Clone)]
struct LogBroadcastLayer {
    tx: broadcast::Sender<String>,
}

impl LogBroadcastLayer {
    fn new(tx: broadcast::Sender<String>) -> Self {
        Self { tx }
    }
}

impl<S> tracing_subscriber::Layer<S> for LogBroadcastLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut message = String::new();
        event.record(&mut MessageCollector(&mut message));
        let line = format!("{} [{}] {}", event.metadata().level(), event.metadata().target(), message);
        let _ = self.tx.send(line);
    }
}

/// Pre-flight check: config, system prompt, model credentials and port.
fn run_verify() -> Result<(), String> {
    print!("Loading config... ");
    let config = CoreConfig::load().map_err(|e| format!("Config load failed: {}", e))?;
    println!("OK ({} sections, llm_mode = {})", config.sections.len(), config.llm_mode);

    print!("Checking system prompt... ");
    let prompt = load_system_prompt(config.system_prompt_path.as_deref())
        .map_err(|e| format!("System prompt unreadable: {}", e))?;
    println!("OK ({} chars)", prompt.len());

    if config.is_live() {
        print!("Checking model credentials... ");
        if config.api_key.as_deref().map_or(true, str::is_empty) {
            return Err("llm_mode is live but no API key is set (GEMINI_API_KEY or COBROWSE__API_KEY)".to_string());
        }
        println!("OK ({})", config.model);
    }

    if config.frontend_enabled {
        print!("Checking frontend... ");
        let index = StdPath::new(&config.frontend_dir).join("index.html");
        if !index.is_file() {
            return Err(format!("frontend_enabled but {} is missing", index.display()));
        }
        println!("OK");
    }

    let port = config.port;
    print!("Checking port {}... ", port);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    match std::net::TcpListener::bind(addr) {
        Ok(listener) => {
            drop(listener);
            println!("OK (available)");
        }
        Err(e) => {
            return Err(format!("Port {} BLOCKED: {}", port, e));
        }
    }

    println!("\n✅ SUCCESS: All systems GO. Ready to start gateway.");
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[cobrowse-gateway] .env not loaded: {} (using system environment)", e);
    }

    // Handle --verify flag for pre-flight check
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--verify") {
        match run_verify() {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("❌ PRE-FLIGHT FAILED: {}", e);
                std::process::exit(1);
            }
        }
    }

    let (log_tx, _) = broadcast::channel(1000);
    let log_layer = LogBroadcastLayer::new(log_tx.clone());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(log_layer)
        .init();

    let config = Arc::new(CoreConfig::load().expect("load CoreConfig"));

    if let Some((page, remote)) = terminal::parse_args(&args, &config.frontend_dir) {
        if let Err(e) = terminal::run(&config, StdPath::new(&page), remote.as_deref()).await {
            eprintln!("❌ chat session failed: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let system_prompt = load_system_prompt(config.system_prompt_path.as_deref()).expect("load system prompt");
    let catalog = Arc::new(ToolCatalog::standard(&config.sections));
    let model_router = Arc::new(ModelRouter::from_config(&config));
    if config.is_live() && config.api_key.is_none() {
        tracing::warn!(target: "cobrowse::gateway", "llm_mode is live but no API key is set; every chat turn will fail");
    }
    let chat = Arc::new(ChatService::new(model_router, catalog, system_prompt));

    let app = build_app(AppState {
        config: Arc::clone(&config),
        chat,
        log_tx,
    });

    let port = config.port;
    let app_name = config.app_name.clone();
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!(target: "cobrowse::gateway", "{} listening on {}", app_name, addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await.expect("bind gateway port"), app)
        .await
        .expect("gateway server");
}

fn frontend_root_dir(configured: &str) -> std::path::PathBuf {
    // Relative to the working directory first; then relative to the workspace root.
    let from_cwd = std::env::current_dir()
        .unwrap_or_else(|_| std::path::PathBuf::from("."))
        .join(configured);
    if from_cwd.exists() {
        return from_cwd;
    }

    std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join(configured)
}

fn build_app(state: AppState) -> Router {
    let frontend_enabled = state.config.frontend_enabled;
    let frontend_dir = frontend_root_dir(&state.config.frontend_dir);

    // CORS: allow Backend/API (8001-8099) and Frontend/UI (3001-3099) port ranges.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &axum::http::HeaderValue, _| {
            let s = origin.to_str().unwrap_or("");
            let port = s.split(':').last().and_then(|p| p.parse::<u16>().ok()).unwrap_or(0);
            (3001..=3099).contains(&port) || (8001..=8099).contains(&port)
        }))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
        .expose_headers(tower_http::cors::Any);

    let mut app = Router::new()
        .route("/api/chat", post(handlers::chat::chat_message).put(handlers::chat::tool_results))
        .route("/api/v1/health", get(health))
        .route("/api/v1/status", get(status))
        .route("/api/v1/tools", get(tools))
        .route("/api/v1/logs", get(logs_stream))
        .with_state(state);

    if frontend_enabled {
        let index_file = frontend_dir.join("index.html");
        let assets_dir = frontend_dir.join("assets");

        // Map `/` -> `<frontend_dir>/index.html`
        app = app.route_service("/", ServeFile::new(index_file));

        // Map `/assets/*` -> `<frontend_dir>/assets/*` (CSS, images, etc.)
        if assets_dir.exists() {
            app = app.nest_service("/assets", ServeDir::new(assets_dir));
        }
    }

    app.layer(cors)
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<CoreConfig>,
    pub(crate) chat: Arc<ChatService>,
    pub(crate) log_tx: broadcast::Sender<String>,
}

/// GET /api/v1/health – liveness check for the widget and scripts.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/v1/status – app identity, model mode and the tool names the model can call.
async fn status(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "app_name": state.config.app_name,
        "port": state.config.port,
        "llm_mode": state.chat.gateway_mode(),
        "environment": state.config.environment,
        "model": state.config.model,
        "sections": state.config.sections,
        "tools": state.chat.catalog().names(),
    }))
}

/// GET /api/v1/tools – the tool catalog as sent to the model.
async fn tools(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "tools": state.chat.catalog().declarations() }))
}

/// GET /api/v1/logs – Server-Sent Events stream of gateway logs (tracing output).
async fn logs_stream(
    State(state): State<AppState>,
) -> Sse<impl futures_util::Stream<Item = Result<Event, std::convert::Infallible>> + Send + 'static> {
    use async_stream::stream;
    let mut rx = state.log_tx.subscribe();
    let stream = stream! {
        loop {
            tokio::select! {
                r = rx.recv() => match r {
                    Ok(line) => yield Ok(Event::default().data(line)),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        yield Ok(Event::default().data(format!("... {} log lines dropped", n)));
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = tokio::time::sleep(Duration::from_secs(15)) => {
                    yield Ok(Event::default().comment("keepalive"));
                }
            }
        }
    };
    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use cobrowse_core::{
        ActionRequest, ActionTimings, Environment, GatewayError, ModelCall, ModelGateway, ModelReply, Orchestrator,
        ACTION_PLACEHOLDER, DEFAULT_SECTIONS, FOLLOW_UP_FAILURE_ACK, HIGHLIGHT_ELEMENT,
    };
    use cobrowse_skills::{page_action_registry, HtmlPage, RemoteChat};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Asks for one highlight that cannot land, then fails every later call.
    struct MissThenDown(AtomicUsize);

    #[async_trait::async_trait]
    impl ModelGateway for MissThenDown {
        fn mode(&self) -> &str {
            "scripted"
        }

        async fn converse(&self, _call: ModelCall<'_>) -> Result<ModelReply, GatewayError> {
            if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                let mut arguments = serde_json::Map::new();
                arguments.insert("selector".to_string(), serde_json::json!(".nothing"));
                return Ok(ModelReply {
                    text: String::new(),
                    action_requests: vec![ActionRequest {
                        name: HIGHLIGHT_ELEMENT.to_string(),
                        arguments,
                    }],
                });
            }
            Err(GatewayError::Status {
                status: 503,
                body: "model overloaded".into(),
            })
        }
    }

    fn test_log_tx() -> broadcast::Sender<String> {
        let (tx, _) = broadcast::channel(1);
        tx
    }

    fn test_config(environment: Environment) -> CoreConfig {
        CoreConfig {
            app_name: "Test Portfolio".to_string(),
            port: 8001,
            environment,
            ..CoreConfig::default()
        }
    }

    pub(crate) fn test_state(gateway: Arc<dyn ModelGateway>, environment: Environment) -> AppState {
        let catalog = Arc::new(ToolCatalog::standard(&DEFAULT_SECTIONS));
        AppState {
            config: Arc::new(test_config(environment)),
            chat: Arc::new(ChatService::new(gateway, catalog, "be helpful")),
            log_tx: test_log_tx(),
        }
    }

    pub(crate) async fn read_json(res: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_status_returns_identity_mode_and_tools() {
        let state = test_state(Arc::new(ModelRouter::default()), Environment::Development);
        let app = Router::new().route("/api/v1/status", get(status)).with_state(state);
        let res = app.oneshot(get_request("/api/v1/status")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = read_json(res).await;
        assert_eq!(json["app_name"], "Test Portfolio");
        assert_eq!(json["port"], 8001);
        assert_eq!(json["llm_mode"], "mock");
        assert_eq!(json["environment"], "development");
        assert_eq!(json["tools"].as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_tools_lists_declarations() {
        let state = test_state(Arc::new(ModelRouter::default()), Environment::Production);
        let app = Router::new().route("/api/v1/tools", get(tools)).with_state(state);
        let json = read_json(app.oneshot(get_request("/api/v1/tools")).await.unwrap()).await;
        assert_eq!(json["tools"][0]["name"], "navigate-to-section");
        assert_eq!(json["tools"][0]["parameters"]["required"], serde_json::json!(["section"]));
    }

    #[tokio::test]
    async fn test_build_app_serves_health_and_chat() {
        let app = build_app(test_state(Arc::new(ModelRouter::default()), Environment::Production));
        let res = app.clone().oneshot(get_request("/api/v1/health")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(read_json(res).await["status"], "ok");

        let req = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"message":"who built this?"}"#))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = read_json(res).await;
        assert_eq!(json["requiresAction"], false);
        assert!(json["message"].as_str().unwrap().contains("who built this?"));
    }

    #[tokio::test]
    async fn test_frontend_is_served_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html><body>portfolio</body></html>").unwrap();
        let mut state = test_state(Arc::new(ModelRouter::default()), Environment::Production);
        state.config = Arc::new(CoreConfig {
            frontend_enabled: true,
            frontend_dir: dir.path().to_string_lossy().to_string(),
            ..test_config(Environment::Production)
        });
        let res = build_app(state).oneshot(get_request("/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("portfolio"));
    }

    #[tokio::test]
    async fn test_remote_session_acknowledges_failed_actions_when_narration_fails() {
        let app = build_app(test_state(Arc::new(MissThenDown(AtomicUsize::new(0))), Environment::Production));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let timings = ActionTimings::instant();
        let page = Arc::new(HtmlPage::parse(
            r#"<html><body><section id="hero" class="section"><h1>Alex Rivera</h1></section></body></html>"#,
            timings.clone(),
        ));
        let catalog = Arc::new(ToolCatalog::standard(&DEFAULT_SECTIONS));
        let actions = Arc::new(page_action_registry(catalog, page.clone(), &timings));
        let remote = Arc::new(RemoteChat::new(&format!("http://{}", addr)));
        let orchestrator = Orchestrator::new(remote, actions, page);

        let report = orchestrator.submit("highlight the thing").await.unwrap();
        assert_eq!(report.batches.len(), 1);
        assert!(!report.batches[0][0].success);
        assert_eq!(
            report.replies,
            vec![ACTION_PLACEHOLDER.to_string(), FOLLOW_UP_FAILURE_ACK.to_string()]
        );
    }
}
