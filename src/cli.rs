use crate::config::SettingsOverrides;
use clap::Parser;
use std::path::PathBuf;

/// Define the application arguments
#[derive(Parser, Debug)]
#[command(version, about = "Chat with a travel planner that builds day-by-day itineraries", long_about = None)]
pub struct Args {
    /// Send a single message, print the answer and exit
    #[arg(long)]
    pub message: Option<String>,

    /// Model name to use (OpenRouter model ID)
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// API base URL of the OpenRouter compatible endpoint
    #[arg(long)]
    pub base_url: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum number of tokens per response
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Path to a settings file (defaults to ~/.config/itinerary-chat/settings.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Record API responses to a file
    #[arg(long, conflicts_with = "playback")]
    pub record: Option<PathBuf>,

    /// Play back a recorded session from a file
    #[arg(long)]
    pub playback: Option<PathBuf>,

    /// Fast playback mode - ignore chunk timing when playing recordings
    #[arg(long, requires = "playback")]
    pub fast_playback: bool,
}

impl Args {
    pub fn parse() -> Self {
        <Args as Parser>::parse()
    }

    pub fn settings_overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}
