//! Configuration infrastructure
//!
//! JSON configuration file with three sections that map onto the pipeline
//! (fetcher, scraper, parsing), plus logging and optional extra retailers.
//! Every field has a default, so a partial file is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use super::parsing::ParsingConfig;
use crate::domain::{ScrapeError, ScrapeResult, SiteAdapter};

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub fetcher: FetcherConfig,
    pub scraper: ScraperConfig,
    pub parsing: ParsingConfig,
    pub logging: LoggingConfig,
    /// Retailers registered after the built-in ones
    pub extra_sites: Vec<SiteAdapter>,
}

impl AppConfig {
    /// Reject values that would make the pipeline misbehave.
    pub fn validate(&self) -> ScrapeResult<()> {
        if self.fetcher.timeout_seconds == 0 {
            return Err(ScrapeError::configuration("fetcher.timeout_seconds", "must be positive"));
        }
        if self.fetcher.base_backoff_ms > self.fetcher.max_backoff_ms {
            return Err(ScrapeError::configuration(
                "fetcher.base_backoff_ms",
                "must not exceed fetcher.max_backoff_ms",
            ));
        }
        if self.fetcher.user_agent.trim().is_empty() {
            return Err(ScrapeError::configuration("fetcher.user_agent", "must not be empty"));
        }
        if self.scraper.site_timeout_secs == Some(0) {
            return Err(ScrapeError::configuration("scraper.site_timeout_secs", "must be positive"));
        }
        if self.parsing.max_json_depth == 0 {
            return Err(ScrapeError::configuration("parsing.max_json_depth", "must be positive"));
        }
        Ok(())
    }
}

/// HTTP fetcher settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Per-request timeout, body included
    pub timeout_seconds: u64,

    /// Retries after the first attempt
    pub max_retries: u32,

    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,

    /// Global request rate; 0 disables rate limiting
    pub max_requests_per_second: u32,

    pub user_agent: String,
    pub accept_language: String,
    pub follow_redirects: bool,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_retries: defaults::MAX_RETRIES,
            base_backoff_ms: defaults::BASE_BACKOFF_MS,
            max_backoff_ms: defaults::MAX_BACKOFF_MS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            user_agent: defaults::USER_AGENT.to_string(),
            accept_language: defaults::ACCEPT_LANGUAGE.to_string(),
            follow_redirects: true,
        }
    }
}

/// Aggregation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Sites processed at once; 0 means one worker per registered site
    pub concurrency: usize,

    /// Deadline for one site's whole discovery, fetch and extract unit
    pub site_timeout_secs: Option<u64>,

    /// Add a scoped web search to every site, not only those that enable it
    pub web_search_fallback: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            concurrency: defaults::CONCURRENCY,
            site_timeout_secs: Some(defaults::SITE_TIMEOUT_SECONDS),
            web_search_fallback: false,
        }
    }
}

impl ScraperConfig {
    /// Effective worker count for `site_count` sites
    pub fn effective_concurrency(&self, site_count: usize) -> usize {
        match self.concurrency {
            0 => site_count.max(1),
            n => n,
        }
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output (stderr)
    pub console_output: bool,

    /// Enable daily rolling file output
    pub file_output: bool,

    /// Log directory; defaults to the user data directory
    pub log_dir: Option<PathBuf>,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            max_files: defaults::LOG_MAX_FILES,
        }
    }
}

/// Configuration file manager
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Get application data directory
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(data_dir)
    }

    /// Manager for the default per-user config file
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join(defaults::CONFIG_FILE_NAME);
        Ok(Self { config_path })
    }

    /// Manager for an explicit config file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("Configuration file not found, creating default: {:?}", self.config_path);
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .with_context(|| format!("Failed to read configuration file {:?}", self.config_path))?;

        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => {
                info!("Loaded configuration from: {:?}", self.config_path);
                Ok(config)
            }
            Err(parse_error) => {
                warn!("⚠️  Configuration file is not valid: {}", parse_error);
                warn!("⚠️  Falling back to default configuration");

                // 손상된 설정 파일 백업
                let backup_path = self.config_path.with_extension("json.corrupted");
                match fs::copy(&self.config_path, &backup_path).await {
                    Ok(_) => info!("Backed up corrupted config to: {:?}", backup_path),
                    Err(e) => warn!("Failed to create backup of corrupted config: {}", e),
                }

                let default_config = AppConfig::default();
                self.save_config(&default_config)
                    .await
                    .context("Failed to save default configuration")?;
                Ok(default_config)
            }
        }
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Reset configuration to defaults
    pub async fn reset_to_defaults(&self) -> Result<AppConfig> {
        info!("🔄 Resetting configuration to defaults");
        let default_config = AppConfig::default();
        self.save_config(&default_config).await?;
        Ok(default_config)
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

/// Default configuration values
pub mod defaults {
    pub const APP_DIR_NAME: &str = "price-scout";
    pub const CONFIG_FILE_NAME: &str = "config.json";

    /// Per-request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 12;

    pub const MAX_RETRIES: u32 = 2;
    pub const BASE_BACKOFF_MS: u64 = 500;
    pub const MAX_BACKOFF_MS: u64 = 8_000;

    /// 0 = unlimited
    pub const MAX_REQUESTS_PER_SECOND: u32 = 0;

    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
    pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
    pub const ACCEPT_LANGUAGE: &str = "vi-VN,vi;q=0.9,en;q=0.8";

    /// 0 = one worker per registered site
    pub const CONCURRENCY: usize = 0;

    /// Discovery may walk several search pages; keep a ceiling on the whole unit
    pub const SITE_TIMEOUT_SECONDS: u64 = 60;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = false;
    pub const LOG_MAX_FILES: u32 = 7;
    pub const LOG_FILE_PREFIX: &str = "price-scout.log";
}
