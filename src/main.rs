use std::fs;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use bailian_chat::app::App;
use bailian_chat::config::Config;
use bailian_chat::dashscope::DashScopeClient;
use bailian_chat::handler;
use bailian_chat::models::DEFAULT_MODEL;
use bailian_chat::session::ChatSession;
use bailian_chat::tui::{self, EventHandler, Tui};
use bailian_chat::ui;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(err) = init_logging() {
        eprintln!("file logging disabled: {err}");
    }

    let config = Config::load().unwrap_or_else(|_| Config::new());
    let api_key = config.resolve_api_key();
    let model = config
        .default_model
        .clone()
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    tracing::info!(model = %model, key_present = api_key.is_some(), "starting session");

    let session = ChatSession::new(DashScopeClient::new(api_key), model);
    let mut app = App::new(session);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result = run(&mut app, &mut terminal, &mut events).await;

    tui::restore()?;
    result
}

async fn run(app: &mut App, terminal: &mut Tui, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }

        app.poll_completion().await;
    }

    Ok(())
}

/// Session log goes to a file so the terminal stays free for the UI.
fn init_logging() -> Result<()> {
    let log_path = Config::log_path()?;
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let log_file = fs::File::create(&log_path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .init();

    Ok(())
}
