mod agent;
mod app;
mod cli;
mod config;
mod llm;
mod logging;
mod prompt;
mod session;
mod types;
mod ui;

use crate::cli::Args;
use crate::config::Settings;
use crate::session::{ChatSession, SessionOptions};
use crate::ui::terminal::TerminalUI;
use crate::ui::UserInterface;
use anyhow::{Context, Result};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Environment variables may come from a .env file
    dotenv::dotenv().ok();

    let args = Args::parse();

    if args.message.is_some() {
        logging::setup_logging(args.verbose);
    } else {
        logging::setup_logging_for_terminal_ui(args.verbose);
    }

    let settings = Settings::load(args.config.as_deref(), &args.settings_overrides())
        .context("Failed to load settings")?;
    let provider = app::create_provider(&args, &settings)?;

    let user_interface: Arc<dyn UserInterface> = Arc::new(TerminalUI::new());
    let session = ChatSession::new(provider, user_interface, SessionOptions::from(&settings));

    match args.message {
        Some(message) => app::terminal::run_once(session, &message).await,
        None => app::terminal::run_interactive(session).await,
    }
}
