use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::transport::DEFAULT_API_URL;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    #[serde(default)]
    pub api_id: i64,
    #[serde(default)]
    pub api_hash: String,
    /// Used for sign-in; the bot token stands in when absent
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// Returns the configured base_url, or the public Bot API when empty.
    pub fn effective_base_url(&self) -> &str {
        if self.base_url.is_empty() {
            DEFAULT_API_URL
        } else {
            &self.base_url
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_secs: default_request_timeout(),
        }
    }
}

/// Metadata sent with `createApplication`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_app_description")]
    pub description: String,
    #[serde(default = "default_app_url")]
    pub url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            description: default_app_description(),
            url: default_app_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PollingConfig {
    /// Long-poll timeout passed to `getUpdates`
    #[serde(default = "default_poll_timeout")]
    pub timeout_secs: u32,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub allowed_updates: Vec<String>,
    /// Retries after a transport error before polling stops. 0 stops on the first one.
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl PollingConfig {
    /// Delay before retry number `attempt` (1-based), doubling up to the cap
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(20);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_poll_timeout(),
            limit: None,
            allowed_updates: Vec::new(),
            max_retries: 0,
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

fn default_app_name() -> String {
    "MyTelegramApp".to_string()
}

fn default_app_description() -> String {
    "Description of my Telegram app".to_string()
}

fn default_app_url() -> String {
    "https://example.com".to_string()
}

fn default_poll_timeout() -> u32 {
    30
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Config {
    /// Phone number for sign-in, falling back to the bot token
    pub fn phone_or_token(&self) -> &str {
        self.telegram
            .phone_number
            .as_deref()
            .unwrap_or(&self.telegram.bot_token)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            bail!("telegram.bot_token must not be empty");
        }

        // The HTTP client would otherwise cut every long poll short
        if u64::from(self.polling.timeout_secs) >= self.api.timeout_secs {
            bail!(
                "polling.timeout_secs ({}) must be lower than api.timeout_secs ({})",
                self.polling.timeout_secs,
                self.api.timeout_secs
            );
        }

        if self.polling.initial_backoff_ms > self.polling.max_backoff_ms {
            bail!("polling.initial_backoff_ms must not exceed polling.max_backoff_ms");
        }

        Ok(())
    }
}
