//! Configuration management for Nimbus
//!
//! Loads and saves the weather, engine and assistant settings from
//! `~/.nimbus/config.json`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, sessions_dir, trace_log_path};

/// Environment variable consulted when `weather.api_key` is empty
pub const WEATHER_KEY_ENV: &str = "QWEATHER_API_KEY";

/// Environment variable consulted when `engine.api_key` is empty
pub const ENGINE_KEY_ENV: &str = "NIMBUS_ENGINE_API_KEY";

/// Errors raised while loading or saving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config not found: {0}")]
    NotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Weather provider (QWeather) access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_host")]
    pub api_host: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Seconds a geocode lookup stays cached; 0 disables the cache
    #[serde(default = "default_geo_cache_ttl")]
    pub geo_cache_ttl_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_host: default_weather_host(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            geo_cache_ttl_secs: default_geo_cache_ttl(),
        }
    }
}

fn default_weather_host() -> String {
    "https://devapi.qweather.com".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    2
}

fn default_geo_cache_ttl() -> u64 {
    300
}

/// Reasoning engine (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_engine_base")]
    pub api_base: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_engine_base(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_engine_base() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.7
}

/// Conversation behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_max_iterations")]
    pub max_tool_iterations: u32,
    #[serde(default = "default_session_max_messages")]
    pub session_max_messages: usize,
    /// Stored messages replayed to the engine on each turn
    #[serde(default = "default_history_messages")]
    pub history_messages: usize,
    #[serde(default = "default_thread")]
    pub default_thread: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            max_tool_iterations: default_max_iterations(),
            session_max_messages: default_session_max_messages(),
            history_messages: default_history_messages(),
            default_thread: default_thread(),
            system_prompt: None,
        }
    }
}

fn default_max_iterations() -> u32 {
    10
}

fn default_session_max_messages() -> usize {
    100
}

fn default_history_messages() -> usize {
    20
}

fn default_thread() -> String {
    "1".to_string()
}

/// Operator trace log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Where per-thread conversation state is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CheckpointConfig {
    #[serde(default)]
    pub backend: CheckpointBackend,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub trace: TraceConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

impl Config {
    /// Load from the default location
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_from(&path).await
    }

    /// Load from a specific location, falling back to defaults when absent
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("Reading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to a specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("Writing config to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// QWeather key, falling back to `QWEATHER_API_KEY`
    pub fn weather_api_key(&self) -> Option<String> {
        non_empty(&self.weather.api_key).or_else(|| env_non_empty(WEATHER_KEY_ENV))
    }

    /// Engine key, falling back to `NIMBUS_ENGINE_API_KEY`
    pub fn engine_api_key(&self) -> Option<String> {
        non_empty(&self.engine.api_key).or_else(|| env_non_empty(ENGINE_KEY_ENV))
    }

    pub fn has_weather_key(&self) -> bool {
        self.weather_api_key().is_some()
    }

    pub fn has_engine_key(&self) -> bool {
        self.engine_api_key().is_some()
    }

    pub fn model(&self) -> String {
        self.engine.model.clone()
    }

    pub fn session_max_messages(&self) -> usize {
        self.assistant.session_max_messages
    }

    /// Trace log location, `None` when tracing to file is disabled
    pub fn trace_path(&self) -> Option<PathBuf> {
        if !self.trace.enabled {
            return None;
        }
        Some(
            self.trace
                .path
                .as_deref()
                .map(expand_home)
                .unwrap_or_else(trace_log_path),
        )
    }

    /// Directory for the file checkpoint backend
    pub fn checkpoint_dir(&self) -> PathBuf {
        self.checkpoint
            .dir
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(sessions_dir)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| non_empty(&v))
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Create the data directory and a default config file
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("Config already exists at {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("Created config at {:?}", config_path);
    }

    tokio::fs::create_dir_all(sessions_dir()).await?;

    Config::load().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_trims() {
        assert_eq!(non_empty("  key "), Some("key".to_string()));
        assert_eq!(non_empty("   "), None);
        assert_eq!(non_empty(""), None);
    }

    #[test]
    fn test_expand_home_plain_path() {
        assert_eq!(expand_home("/tmp/trace.jsonl"), PathBuf::from("/tmp/trace.jsonl"));
        assert_eq!(expand_home("relative/dir"), PathBuf::from("relative/dir"));
    }

    #[test]
    fn test_trace_path_disabled() {
        let mut config = Config::default();
        config.trace.enabled = false;
        assert!(config.trace_path().is_none());
    }

    #[test]
    fn test_trace_path_override() {
        let mut config = Config::default();
        config.trace.path = Some("/var/log/nimbus.jsonl".to_string());
        assert_eq!(
            config.trace_path(),
            Some(PathBuf::from("/var/log/nimbus.jsonl"))
        );
    }
}
