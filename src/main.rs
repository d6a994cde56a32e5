use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod client;
mod config;
mod error;
mod handler;
mod theme;
mod tui;
mod ui;

use app::App;
use client::AnswerClient;
use config::{Config, Overrides, Settings};
use theme::ThemeMode;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "chatbox", version)]
#[command(about = "Terminal chat client for a question-answering endpoint")]
struct Cli {
    /// URL the questions are POSTed to
    #[arg(long, env = "CHATBOX_ENDPOINT")]
    endpoint: Option<String>,

    /// Initial theme (defaults to the config file, then the terminal's colours)
    #[arg(long, value_enum)]
    theme: Option<ThemeMode>,

    /// Seconds to wait for an answer before giving up
    #[arg(long)]
    timeout: Option<u64>,

    /// Where to write logs
    #[arg(long, env = "CHATBOX_LOG")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = match cli.log_file {
        Some(path) => path,
        None => default_log_path()?,
    };
    init_logging(&log_path)?;

    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "could not read config file, using defaults");
        Config::default()
    });
    let overrides = Overrides {
        endpoint: cli.endpoint,
        theme: cli.theme,
        timeout_secs: cli.timeout,
    };
    let settings = Settings::resolve(overrides, config, ThemeMode::detect());

    let client = AnswerClient::new(&settings.endpoint);
    info!(
        endpoint = client.endpoint(),
        theme = settings.theme.as_str(),
        timeout_secs = settings.request_timeout.as_secs(),
        "starting chatbox"
    );
    let mut app = App::new(Arc::new(client), &settings);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    info!("exiting");
    result
}

async fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        app.poll_pending();
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }

    Ok(())
}

fn default_log_path() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir().context("Could not determine cache directory")?;
    Ok(cache_dir.join("chatbox").join("chatbox.log"))
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Could not open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chatbox=info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
