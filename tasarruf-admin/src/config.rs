use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::RetryPolicy;
use crate::search::DEFAULT_QUIET_PERIOD;

/// Environment variable that overrides the saved API URL
pub const API_URL_ENV: &str = "TASARRUF_API_URL";

/// Backend used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

const CONFIG_FILE: &str = "config.json";
const TOKEN_FILE: &str = "token";

/// Settings saved in `~/.tasarruf/config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminConfig {
    pub api_url: String,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_search_quiet_ms")]
    pub search_quiet_ms: u64,
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

fn default_retry_attempts() -> u32 {
    RetryPolicy::default().max_attempts
}

fn default_search_quiet_ms() -> u64 {
    DEFAULT_QUIET_PERIOD.as_millis() as u64
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            retry_attempts: default_retry_attempts(),
            search_quiet_ms: default_search_quiet_ms(),
            last_updated: chrono::Utc::now(),
        }
    }
}

impl AdminConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts.max(1),
            ..RetryPolicy::default()
        }
    }

    pub fn search_quiet_period(&self) -> Duration {
        Duration::from_millis(self.search_quiet_ms)
    }
}

/// Configuration manager for the .tasarruf directory
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Opens `~/.tasarruf`, creating it if needed.
    pub fn new() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Could not determine home directory")?;
        Self::with_dir(home_dir.join(".tasarruf"))
    }

    /// Opens a config directory at an explicit location.
    pub fn with_dir(config_dir: impl Into<PathBuf>) -> Result<Self> {
        let config_dir = config_dir.into();
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).with_context(|| {
                format!("Failed to create config directory {}", config_dir.display())
            })?;
        }
        Ok(Self { config_dir })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Where the session token is persisted
    pub fn token_path(&self) -> PathBuf {
        self.config_dir.join(TOKEN_FILE)
    }

    fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn load_config(&self) -> Result<Option<AdminConfig>> {
        let config_file = self.config_file();
        if !config_file.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&config_file).context("Failed to read config file")?;
        let config: AdminConfig = serde_json::from_str(&json).context("Failed to parse config file")?;
        Ok(Some(config))
    }

    /// Saved settings, or the defaults when nothing has been saved.
    pub fn load_or_default(&self) -> Result<AdminConfig> {
        Ok(self.load_config()?.unwrap_or_default())
    }

    pub fn save_config(&self, config: &AdminConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
        fs::write(self.config_file(), json).context("Failed to write config file")?;
        Ok(())
    }

    /// Saves `api_url`, keeping the other settings.
    pub fn save_api_url(&self, api_url: String) -> Result<()> {
        let config = AdminConfig {
            api_url,
            last_updated: chrono::Utc::now(),
            ..self.load_or_default()?
        };
        self.save_config(&config)
    }

    /// Determine the API URL to use based on priority:
    /// 1. CLI argument
    /// 2. `TASARRUF_API_URL`
    /// 3. Saved configuration file
    /// 4. `http://localhost:8080`
    pub fn determine_api_url(&self, cli_override: Option<String>) -> Result<String> {
        self.resolve_api_url(cli_override, std::env::var(API_URL_ENV).ok())
    }

    fn resolve_api_url(&self, cli_override: Option<String>, env_value: Option<String>) -> Result<String> {
        if let Some(url) = non_empty(cli_override) {
            return Ok(url);
        }
        if let Some(url) = non_empty(env_value) {
            return Ok(url);
        }
        if let Some(config) = self.load_config()? {
            return Ok(config.api_url);
        }
        Ok(DEFAULT_API_URL.to_string())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
