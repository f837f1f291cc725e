//! `--chat <page.html> [--remote <url>]`: terminal co-browsing session against a static page.

use cobrowse_core::{ChatBackend, ChatService, CoreConfig, Orchestrator, SubmitError, ToolCatalog};
use cobrowse_skills::{page_action_registry, HtmlPage, ModelRouter, RemoteChat};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

pub const GREETING: &str = "Hi! I'm your portfolio assistant. I can help you navigate this site, answer questions about projects and experience, or even fill out the contact form for you. What would you like to explore?";

/// Reads `--chat` and `--remote` from raw args. `None` when `--chat` is absent.
pub fn parse_args(args: &[String], frontend_dir: &str) -> Option<(String, Option<String>)> {
    let value_of = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .filter(|v| !v.starts_with("--"))
            .cloned()
    };
    if !args.iter().any(|a| a == "--chat") {
        return None;
    }
    let page = value_of("--chat").unwrap_or_else(|| format!("{}/index.html", frontend_dir.trim_end_matches('/')));
    Some((page, value_of("--remote")))
}

pub async fn run(config: &CoreConfig, page_path: &Path, remote: Option<&str>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let page = Arc::new(HtmlPage::from_file(page_path, config.timings.clone())?);
    let catalog = Arc::new(ToolCatalog::standard(&config.sections));
    let actions = Arc::new(page_action_registry(Arc::clone(&catalog), page.clone(), &config.timings));

    let backend: Arc<dyn ChatBackend> = match remote {
        Some(url) => {
            tracing::info!(target: "cobrowse::terminal", %url, "using remote gateway");
            Arc::new(RemoteChat::new(url))
        }
        None => {
            let prompt = cobrowse_core::load_system_prompt(config.system_prompt_path.as_deref())?;
            let gateway = Arc::new(ModelRouter::from_config(config));
            Arc::new(ChatService::new(gateway, catalog, prompt))
        }
    };

    let orchestrator = Orchestrator::new(backend, actions, page)
        .with_greeting(GREETING)
        .with_max_follow_up_rounds(config.max_follow_up_rounds);

    println!("assistant> {}", GREETING);
    println!("(type /quit or press Ctrl-D to leave)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "/quit" {
            break;
        }
        match orchestrator.submit(line).await {
            Ok(report) => {
                // Replies and batches alternate: reply, batch, reply, batch, ..., reply.
                for (i, reply) in report.replies.iter().enumerate() {
                    println!("assistant> {}", reply);
                    for outcome in report.batches.get(i).into_iter().flatten() {
                        println!("  {} {}: {}", if outcome.success { '✓' } else { '✗' }, outcome.name, outcome.message);
                    }
                }
            }
            Err(SubmitError::Empty) => continue,
            Err(e) => println!("(busy: {})", e),
        }
    }
    Ok(())
}
