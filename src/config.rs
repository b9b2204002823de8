use crate::llm::OpenRouterClient;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
const BASE_URL_ENV: &str = "OPENROUTER_BASE_URL";
const MODEL_ENV: &str = "OPENROUTER_MODEL";
const SITE_URL_ENVS: [&str; 2] = ["NEXT_PUBLIC_SITE_URL", "SITE_URL"];

/// Get the path to the settings file
pub fn get_config_path() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(home
        .join(".config")
        .join("itinerary-chat")
        .join("settings.json"))
}

/// Resolved application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Sent as `HTTP-Referer`
    pub site_url: String,
    /// Sent as `X-Title`
    pub app_title: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: OpenRouterClient::default_base_url(),
            model: "deepseek/deepseek-chat".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            site_url: "http://localhost:3000".to_string(),
            app_title: "Travel Planner".to_string(),
        }
    }
}

/// Values given on the command line, they win over everything else
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Settings {
    /// Resolve settings from defaults, the settings file, the environment and
    /// the command line, in that order.
    ///
    /// An explicitly given settings file must exist, the default one is optional.
    pub fn load(config_path: Option<&Path>, overrides: &SettingsOverrides) -> Result<Self> {
        Self::resolve(config_path, |name| std::env::var(name).ok(), overrides)
    }

    fn resolve(
        config_path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
        overrides: &SettingsOverrides,
    ) -> Result<Self> {
        let mut settings = match config_path {
            Some(path) => Self::from_file(path)?,
            None => match get_config_path() {
                Ok(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        settings.apply_env(env);
        settings.apply_overrides(overrides);
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading settings from {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| env(name).filter(|value| !value.trim().is_empty());

        if let Some(api_key) = var(API_KEY_ENV) {
            self.api_key = Some(api_key);
        }
        if let Some(base_url) = var(BASE_URL_ENV) {
            self.base_url = base_url;
        }
        if let Some(model) = var(MODEL_ENV) {
            self.model = model;
        }
        if let Some(site_url) = SITE_URL_ENVS.iter().find_map(|name| var(name)) {
            self.site_url = site_url;
        }
    }

    fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        if let Some(base_url) = &overrides.base_url {
            self.base_url = base_url.clone();
        }
        if let Some(model) = &overrides.model {
            self.model = model.clone();
        }
        if let Some(temperature) = overrides.temperature {
            self.temperature = temperature;
        }
        if let Some(max_tokens) = overrides.max_tokens {
            self.max_tokens = max_tokens;
        }
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "Temperature must be between 0 and 2, got {}",
                self.temperature
            );
        }
        if self.max_tokens == 0 {
            anyhow::bail!("max_tokens must be greater than 0");
        }
        Ok(())
    }

    /// The API key, which is required whenever the real API is used
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .with_context(|| format!("{API_KEY_ENV} is not set (environment or .env file)"))
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
