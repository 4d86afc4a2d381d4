use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ChatError;

/// Top-level application configuration, loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub chat: ChatConfig,
}

impl AppConfig {
    /// Load configuration from the default path (~/.config/pd2-chat/config.toml),
    /// falling back to defaults if the file doesn't exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Write current configuration to the default path.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;
        Ok(())
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pd2-chat")
            .join("config.toml")
    }

    /// Data directory for the REPL line history.
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pd2-chat")
    }
}

/// Gemini provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL for the Generative Language API.
    pub api_base: String,
    /// Model name.
    pub model: String,
    /// API key. Prefer `api_key_env` over putting the key in the file.
    pub api_key: Option<String>,
    /// Environment variable to read the API key from when `api_key` is unset.
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "https://generativelanguage.googleapis.com".into(),
            model: "gemini-2.5-flash-preview-05-20".into(),
            api_key: None,
            api_key_env: "GEMINI_API_KEY".into(),
            timeout_secs: 60,
        }
    }
}

impl ProviderConfig {
    /// Resolve the API key: config value first, then the configured env var,
    /// then the legacy `GOOGLE_API_KEY` variable.
    ///
    /// A missing key is a fatal startup error; the message tells the user
    /// exactly what to set.
    pub fn resolve_api_key(&self) -> Result<String, ChatError> {
        if let Some(key) = &self.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        if let Ok(key) = std::env::var(&self.api_key_env) {
            if !key.is_empty() {
                return Ok(key);
            }
        }
        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            if !key.is_empty() {
                return Ok(key);
            }
        }
        Err(ChatError::Config(format!(
            "No API key found. Set {} (e.g. in a local .env file) or provider.api_key in {}",
            self.api_key_env,
            AppConfig::default_path().display(),
        )))
    }
}

/// Chat behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Wiki the assistant should consult first.
    pub wiki_url: String,
    /// Override for the built-in system instruction.
    pub system_instruction: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            wiki_url: "https://wiki.projectdiablo2.com/wiki/Main_Page".into(),
            system_instruction: None,
        }
    }
}

impl ChatConfig {
    /// The system instruction sent with every request. Fixed for the session.
    pub fn effective_system_instruction(&self) -> String {
        match &self.system_instruction {
            Some(custom) => custom.clone(),
            None => format!(
                "You are a helpful assistant specializing in Project Diablo 2. \
                 When a user asks about game mechanics, items, skills, crafting \
                 recipes, or character builds, first attempt to find the answer by \
                 browsing the official wiki at {wiki}. Only fall back to general web \
                 search if the wiki doesn't yield relevant results or the query is \
                 broader than specific game data. While browsing, actively identify \
                 variable stats (ranges, 'can roll', min/max) and report the full \
                 possible range for each significant modifier. Always cite the direct \
                 URL of the page the information came from. If the information found \
                 is ambiguous or seems outdated, confirm against the patch notes on \
                 the wiki before answering.",
                wiki = self.wiki_url,
            ),
        }
    }
}
