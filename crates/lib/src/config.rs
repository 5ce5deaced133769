//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.courier/config.json`) and environment.
//! Environment variables override file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP control plane settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Telegram user-client settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Chat-completion backend settings.
    #[serde(default)]
    pub completion: CompletionConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 3000). Overridden by PORT env.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Telegram config. Credentials come from my.telegram.org; the session from `courier login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramConfig {
    /// Overridden by TELEGRAM_API_ID env.
    pub api_id: Option<i32>,
    /// Overridden by TELEGRAM_API_HASH env.
    pub api_hash: Option<String>,
    /// Base64 session string. Overridden by TELEGRAM_SESSION env.
    pub session: Option<String>,
    /// Placeholder first name for imported contacts.
    #[serde(default = "default_contact_first_name")]
    pub contact_first_name: String,
    /// Placeholder last name for imported contacts.
    #[serde(default = "default_contact_last_name")]
    pub contact_last_name: String,
}

fn default_contact_first_name() -> String {
    "Temp".to_string()
}

fn default_contact_last_name() -> String {
    "User".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_id: None,
            api_hash: None,
            session: None,
            contact_first_name: default_contact_first_name(),
            contact_last_name: default_contact_last_name(),
        }
    }
}

/// OpenAI-compatible completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionConfig {
    /// API base including the version segment. Overridden by OPENAI_BASE_URL env.
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,
    /// Overridden by OPENAI_API_KEY env.
    pub api_key: Option<String>,
    /// Overridden by OPENAI_MODEL env.
    #[serde(default = "default_completion_model")]
    pub model: String,
    /// Upper bound for one completion call, in seconds.
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_completion_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_completion_model() -> String {
    "gpt-5-nano".to_string()
}

fn default_completion_timeout_secs() -> u64 {
    60
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_completion_base_url(),
            api_key: None,
            model: default_completion_model(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

impl CompletionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Resolved Telegram credentials for connecting the client.
#[derive(Debug, Clone)]
pub struct TelegramCredentials {
    pub api_id: i32,
    pub api_hash: String,
    pub session: Option<String>,
}

/// Trimmed, non-empty env var.
fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Apply environment overrides (PORT, TELEGRAM_*, OPENAI_*) on top of the file config.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(port) = env_non_empty("PORT") {
        config.gateway.port = port
            .parse()
            .with_context(|| format!("parsing PORT={}", port))?;
    }
    if let Some(id) = env_non_empty("TELEGRAM_API_ID") {
        config.telegram.api_id = Some(
            id.parse()
                .with_context(|| format!("parsing TELEGRAM_API_ID={}", id))?,
        );
    }
    if let Some(hash) = env_non_empty("TELEGRAM_API_HASH") {
        config.telegram.api_hash = Some(hash);
    }
    if let Some(session) = env_non_empty("TELEGRAM_SESSION") {
        config.telegram.session = Some(session);
    }
    if let Some(key) = env_non_empty("OPENAI_API_KEY") {
        config.completion.api_key = Some(key);
    }
    if let Some(url) = env_non_empty("OPENAI_BASE_URL") {
        config.completion.base_url = url;
    }
    if let Some(model) = env_non_empty("OPENAI_MODEL") {
        config.completion.model = model;
    }
    Ok(())
}

/// Resolve Telegram credentials; api id and hash are required.
pub fn resolve_telegram_credentials(config: &Config) -> Result<TelegramCredentials> {
    let api_id = config
        .telegram
        .api_id
        .context("telegram api id not configured (set TELEGRAM_API_ID or telegram.apiId)")?;
    let api_hash = non_empty(config.telegram.api_hash.as_ref())
        .context("telegram api hash not configured (set TELEGRAM_API_HASH or telegram.apiHash)")?;
    Ok(TelegramCredentials {
        api_id,
        api_hash,
        session: non_empty(config.telegram.session.as_ref()),
    })
}

/// Resolve the completion API key (required to serve).
pub fn resolve_completion_api_key(config: &Config) -> Result<String> {
    non_empty(config.completion.api_key.as_ref())
        .context("completion api key not configured (set OPENAI_API_KEY or completion.apiKey)")
}

/// Log, per credential, whether it is present. Values are never logged.
pub fn log_credential_presence(config: &Config) {
    let presence = |present: bool| if present { "ok" } else { "missing" };
    log::info!(
        "TELEGRAM_API_ID: {}",
        presence(config.telegram.api_id.is_some())
    );
    log::info!(
        "TELEGRAM_API_HASH: {}",
        presence(non_empty(config.telegram.api_hash.as_ref()).is_some())
    );
    log::info!(
        "TELEGRAM_SESSION: {}",
        presence(non_empty(config.telegram.session.as_ref()).is_some())
    );
    log::info!(
        "OPENAI_API_KEY: {}",
        presence(non_empty(config.completion.api_key.as_ref()).is_some())
    );
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("COURIER_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".courier").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path (or the default). Missing file => default config.
/// Environment overrides are applied afterwards.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    apply_env_overrides(&mut config)?;
    Ok((config, path))
}
