pub mod terminal;

use crate::cli::Args;
use crate::config::Settings;
use crate::llm::{LLMProvider, OpenRouterClient, PlaybackProvider};
use anyhow::{Context, Result};
use tracing::info;

/// Commands understood by the chat prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand {
    /// Show the current itinerary again
    Itinerary,
    /// Forget conversation and itinerary
    Clear,
    Help,
    Quit,
}

/// One line typed at the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Empty,
    Command(ReplCommand),
    UnknownCommand(String),
    Message(String),
}

impl ReplInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ReplInput::Empty;
        }

        let Some(command) = line.strip_prefix('/') else {
            return ReplInput::Message(line.to_string());
        };

        match command.to_ascii_lowercase().as_str() {
            "itinerary" | "i" => ReplInput::Command(ReplCommand::Itinerary),
            "clear" | "new" => ReplInput::Command(ReplCommand::Clear),
            "help" | "?" => ReplInput::Command(ReplCommand::Help),
            "quit" | "exit" | "q" => ReplInput::Command(ReplCommand::Quit),
            _ => ReplInput::UnknownCommand(line.to_string()),
        }
    }
}

pub const HELP_TEXT: &str = "Commands:
  /itinerary  show the current itinerary
  /clear      start over with an empty conversation and itinerary
  /help       show this help
  /quit       exit (or press Ctrl-D)
Press Ctrl-C while a response is streaming to cancel it.";

/// Create the provider for the configured mode
pub fn create_provider(args: &Args, settings: &Settings) -> Result<Box<dyn LLMProvider>> {
    if let Some(path) = &args.playback {
        let provider = PlaybackProvider::from_file(path, args.fast_playback)
            .with_context(|| format!("Failed to load recording {}", path.display()))?;
        info!("Playing back {} recorded responses", provider.session_count());
        return Ok(Box::new(provider));
    }

    let api_key = settings.require_api_key()?.to_string();
    let mut client = OpenRouterClient::new(
        api_key,
        settings.model.clone(),
        settings.base_url().to_string(),
        settings.site_url.clone(),
        settings.app_title.clone(),
    );
    if let Some(path) = &args.record {
        info!("Recording responses to {}", path.display());
        client = client.with_recorder(path);
    }

    info!(
        "Using model {} at {}",
        settings.model,
        settings.base_url()
    );
    Ok(Box::new(client))
}
