use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chat_store::{DraftCache, FileStorage, HistoryStore, Role};
use clap::Parser;
use ollama_api::{ChatApiClient, ChatApiConfig, ChatMetrics};
use ollama_chat::config::AppConfig;
use ollama_chat::controller::{SessionController, SubmitOutcome};
use ollama_chat::observer::SessionListener;
use ollama_chat::session::SessionState;
use ollama_chat::transport::OllamaTransport;
use tokio::io::{AsyncBufReadExt, BufReader};

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Streaming chat console for the blog assistant.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Base URL of the chat service (overrides OLLAMA_CHAT_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Storage directory for history and draft (overrides OLLAMA_CHAT_STORAGE_DIR)
    #[arg(long)]
    storage_dir: Option<PathBuf>,
}

/// Prints stream output as it arrives: reasoning dimmed, content plain.
struct ConsoleListener;

impl SessionListener for ConsoleListener {
    fn on_reasoning_delta(&self, text: &str) {
        print!("{DIM}{text}{RESET}");
        let _ = std::io::stdout().flush();
    }

    fn on_content_delta(&self, text: &str) {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }

    fn on_done(&self, metrics: Option<&ChatMetrics>) {
        if let Some(metrics) = metrics {
            println!();
            println!(
                "{DIM}[{} tokens, {}]{RESET}",
                metrics.eval_count,
                metrics.rate_label()
            );
        }
    }

    fn on_error(&self, message: &str) {
        println!();
        println!("error: {message}");
    }

    fn on_state_change(&self, state: SessionState) {
        if state == SessionState::Cancelled {
            println!();
            println!("{DIM}[generation cancelled]{RESET}");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env();
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(storage_dir) = args.storage_dir {
        config.storage_dir = storage_dir;
    }

    let mut api = ChatApiConfig::new(&config.base_url);
    if let Some(timeout) = config.request_timeout {
        api = api.with_timeout(timeout);
    }
    let client = ChatApiClient::new(api).context("failed to build chat client")?;

    let storage = FileStorage::open(&config.storage_dir).with_context(|| {
        format!("failed to open storage directory {}", config.storage_dir.display())
    })?;
    let controller = SessionController::new(
        Arc::new(OllamaTransport::new(client)),
        HistoryStore::open(Box::new(storage.clone()), config.max_history),
        DraftCache::new(Box::new(storage)),
        Arc::new(ConsoleListener),
    );

    println!("Chat with the blog assistant ({})", config.base_url);
    println!("/clear drops history, /exit quits; Ctrl-C cancels a running generation.");
    println!();
    print_history(&controller);
    if let Some(draft) = controller.load_draft() {
        println!("{DIM}[restored draft: {draft}]{RESET}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            break;
        };

        match line.trim() {
            "/exit" => break,
            "/clear" => {
                controller.clear_history();
                println!("{DIM}[history cleared]{RESET}");
                continue;
            }
            _ => {}
        }

        controller.save_draft(&line);
        if controller.submit(&line).await != SubmitOutcome::Accepted {
            continue;
        }

        let cancelled = tokio::select! {
            _ = controller.wait() => false,
            _ = tokio::signal::ctrl_c() => {
                controller.cancel();
                true
            }
        };
        if cancelled {
            controller.wait().await;
        }
        println!();
    }

    controller.flush_draft();
    Ok(())
}

fn print_history(controller: &SessionController) {
    for turn in controller.history() {
        match turn.role {
            Role::User => println!("> {}", turn.content),
            Role::Assistant => {
                let marker = if turn.interrupted {
                    " [interrupted]"
                } else {
                    ""
                };
                println!("{}{marker}", turn.content);
            }
        }
    }
}
