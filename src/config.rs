//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! runtime constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token (`TELEGRAM_TOKEN`, or `BOT_TOKEN` as a fallback)
    #[serde(default)]
    pub telegram_token: String,

    /// JSON file holding all advertisements
    #[serde(default = "default_ads_file")]
    pub ads_file: PathBuf,

    /// Advertisements shown per listing page
    #[serde(default = "default_ads_per_page")]
    pub ads_per_page: usize,

    /// Seconds of inactivity after which a pending draft is dropped
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u64,

    /// Upper bound on simultaneously pending drafts
    #[serde(default = "default_pending_max_entries")]
    pub pending_max_entries: u64,
}

fn default_ads_file() -> PathBuf {
    PathBuf::from(DEFAULT_ADS_FILE)
}

const fn default_ads_per_page() -> usize {
    crate::pagination::DEFAULT_PAGE_SIZE
}

const fn default_pending_ttl_secs() -> u64 {
    DEFAULT_PENDING_TTL_SECS
}

const fn default_pending_max_entries() -> u64 {
    DEFAULT_PENDING_MAX_ENTRIES
}

/// Builds the layered configuration source.
///
/// # Errors
///
/// Returns a `ConfigError` if a present config file cannot be parsed.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        // Start off by merging in the "default" configuration file
        .add_source(File::with_name("config/default").required(false))
        // Add in the current environment file
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Add in a local configuration file
        // This file shouldn't be checked into git
        .add_source(File::with_name("config/local").required(false))
        // Add in settings from the environment (with a prefix of APP)
        // Eg.. `APP__ADS_PER_PAGE=10 ./target/ads-bot` would set the `ads_per_page` key
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Also add settings from environment variables directly (without prefix)
        // ignore_empty treats empty env vars as unset
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ads_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or no bot token is configured.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_config(build_config()?)
    }

    /// Deserialize and validate settings from an already built `Config`
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if deserialization fails or no bot token is configured.
    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        let mut settings: Self = config.try_deserialize()?;

        // Fallback: the token is commonly exported as BOT_TOKEN
        if settings.telegram_token.is_empty() {
            if let Ok(val) = std::env::var("BOT_TOKEN") {
                if !val.is_empty() {
                    settings.telegram_token = val;
                }
            }
        }

        if settings.telegram_token.is_empty() {
            return Err(ConfigError::Message(
                "TELEGRAM_TOKEN (or BOT_TOKEN) is missing".to_string(),
            ));
        }
        if settings.ads_per_page == 0 {
            return Err(ConfigError::Message(
                "ADS_PER_PAGE must be greater than zero".to_string(),
            ));
        }

        Ok(settings)
    }
}

/// Default location of the advertisements file
pub const DEFAULT_ADS_FILE: &str = "ads.json";
/// Default idle lifetime of a pending draft (1 hour)
pub const DEFAULT_PENDING_TTL_SECS: u64 = 3600;
/// Default capacity of the pending draft cache
pub const DEFAULT_PENDING_MAX_ENTRIES: u64 = 10_000;

/// Characters of user text included in incoming-update log lines
pub const LOG_PREVIEW_CHARS: usize = 30;

// Telegram limits, counted in visible characters after HTML parsing
/// Maximum length of a text message
pub const MESSAGE_TEXT_MAX_CHARS: usize = 4096;
/// Maximum length of a photo, audio or voice caption
pub const MEDIA_CAPTION_MAX_CHARS: usize = 1024;

// Telegram API retry configuration
/// Maximum retry attempts for Telegram API calls
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// Initial backoff delay in milliseconds
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Maximum backoff delay in milliseconds
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let mut builder = Config::builder();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value)?;
        }
        builder.build()
    }

    #[test]
    fn test_defaults_applied() -> Result<(), ConfigError> {
        let settings = Settings::from_config(config_with(&[("telegram_token", "dummy")])?)?;

        assert_eq!(settings.telegram_token, "dummy");
        assert_eq!(settings.ads_file, PathBuf::from("ads.json"));
        assert_eq!(settings.ads_per_page, 5);
        assert_eq!(settings.pending_ttl_secs, 3600);
        assert_eq!(settings.pending_max_entries, 10_000);
        Ok(())
    }

    #[test]
    fn test_overrides_parsed_from_strings() -> Result<(), ConfigError> {
        let settings = Settings::from_config(config_with(&[
            ("telegram_token", "dummy"),
            ("ads_file", "/var/lib/ads/board.json"),
            ("ads_per_page", "10"),
            ("pending_ttl_secs", "60"),
        ])?)?;

        assert_eq!(settings.ads_file, PathBuf::from("/var/lib/ads/board.json"));
        assert_eq!(settings.ads_per_page, 10);
        assert_eq!(settings.pending_ttl_secs, 60);
        Ok(())
    }

    #[test]
    fn test_zero_page_size_rejected() -> Result<(), ConfigError> {
        let result = Settings::from_config(config_with(&[
            ("telegram_token", "dummy"),
            ("ads_per_page", "0"),
        ])?);
        assert!(result.is_err());
        Ok(())
    }
}
