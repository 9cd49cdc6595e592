//! Configuration loading, validation, and management for Vera.
//!
//! Loads configuration from `~/.vera/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.vera/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the generation provider (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default generation provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling cutoff
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Output cap per generation call
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// The assistant persona's name
    #[serde(default = "default_agent_name")]
    pub agent_name: String,

    /// Memory store configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Discord notification configuration
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Link fetching configuration
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Knowledge extraction configuration
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_temperature() -> f32 {
    0.8
}
fn default_top_p() -> f32 {
    0.9
}
fn default_max_output_tokens() -> u32 {
    512
}
fn default_agent_name() -> String {
    "Vera".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("agent_name", &self.agent_name)
            .field("memory", &self.memory)
            .field("gateway", &self.gateway)
            .field("discord", &self.discord)
            .field("fetch", &self.fetch)
            .field("knowledge", &self.knowledge)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// "in_memory", "file", or "none"
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// Location of the file backend (defaults to `~/.vera/memory/kv.jsonl`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_memory_backend() -> String {
    "in_memory".into()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            path: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// HMAC secret for inbound webhook signatures. None = no validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_secret: Option<String>,
}

fn default_port() -> u16 {
    3500
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            webhook_secret: None,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("port", &self.port)
            .field("host", &self.host)
            .field("webhook_secret", &redact(&self.webhook_secret))
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Incoming-webhook URL notifications are posted to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Display name on posted notifications
    #[serde(default = "default_agent_name")]
    pub username: String,

    /// The bot's own user id, used to detect mentions in relayed events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_user_id: Option<String>,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            username: default_agent_name(),
            bot_user_id: None,
        }
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("webhook_url", &redact(&self.webhook_url))
            .field("username", &self.username)
            .field("bot_user_id", &self.bot_user_id)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent sent with every link fetch
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Mirror host serving social posts in a fetchable form
    #[serde(default = "default_mirror_base_url")]
    pub mirror_base_url: String,
}

fn default_user_agent() -> String {
    "vera/1.0 (+https://github.com/vera-bot/vera)".into()
}
fn default_mirror_base_url() -> String {
    "https://xcancel.com".into()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            mirror_base_url: default_mirror_base_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Endpoint of a LangExtract-compatible extraction service. None = the
    /// library tier is skipped and generation-based extraction is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_url: Option<String>,

    /// Model the extraction service should use (defaults to `default_model`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_model: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.vera/config.toml),
    /// then apply environment overrides.
    ///
    /// API key lookup order when the file has none:
    /// - `VERA_API_KEY`
    /// - `GOOGLE_API_KEY`
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if self.api_key.is_none() {
            self.api_key = non_empty("VERA_API_KEY")
                .or_else(|| non_empty("GOOGLE_API_KEY"))
                .or_else(|| non_empty("OPENROUTER_API_KEY"))
                .or_else(|| non_empty("OPENAI_API_KEY"));
        }

        if let Some(provider) = non_empty("VERA_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = non_empty("VERA_MODEL") {
            self.default_model = model;
        }
        if let Some(url) = non_empty("DISCORD_WEBHOOK_URL") {
            self.discord.webhook_url = Some(url);
        }
        if let Some(id) = non_empty("DISCORD_BOT_USER_ID") {
            self.discord.bot_user_id = Some(id);
        }
        if let Some(base) = non_empty("XCANCEL_BASE_URL") {
            self.fetch.mirror_base_url = base;
        }
        if let Some(url) = non_empty("LANGEXTRACT_URL") {
            self.knowledge.library_url = Some(url);
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".vera")
    }

    /// Resolved path of the file memory backend.
    pub fn memory_path(&self) -> PathBuf {
        self.memory
            .path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| Self::config_dir().join("memory").join("kv.jsonl"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ConfigError::ValidationError(
                "top_p must be between 0.0 and 1.0".into(),
            ));
        }

        if !matches!(self.memory.backend.as_str(), "in_memory" | "file" | "none") {
            return Err(ConfigError::ValidationError(format!(
                "unknown memory backend '{}' (expected in_memory, file or none)",
                self.memory.backend
            )));
        }

        Ok(())
    }

    /// Check if an API key is available for the default provider, either
    /// top-level (config or environment) or under `[providers.<name>]`.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
            || self
                .providers
                .get(&self.default_provider)
                .and_then(|p| p.api_key.as_deref())
                .is_some_and(|k| !k.is_empty())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_output_tokens: default_max_output_tokens(),
            agent_name: default_agent_name(),
            memory: MemoryConfig::default(),
            gateway: GatewayConfig::default(),
            discord: DiscordConfig::default(),
            fetch: FetchConfig::default(),
            knowledge: KnowledgeConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing required setting: {0}")]
    Missing(String),
}
