//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Placeholder substituted with the item id in URL templates.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Upstream catalog endpoints and HTTP behavior
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Batch and rate-limit settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Language whose addition is reported
    #[serde(default)]
    pub language: LanguageConfig,

    /// Output feed documents
    #[serde(default)]
    pub feeds: FeedsConfig,

    /// Persisted state location
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.catalog.user_agent.trim().is_empty() {
            return Err(AppError::validation("catalog.user_agent is empty"));
        }
        if self.catalog.timeout_secs == 0 {
            return Err(AppError::validation("catalog.timeout_secs must be > 0"));
        }
        Url::parse(&self.catalog.listing_url)?;
        Url::parse(&self.catalog.details_url)?;
        for (name, template) in [
            ("catalog.item_link_url", &self.catalog.item_link_url),
            ("catalog.image_fallback_url", &self.catalog.image_fallback_url),
        ] {
            if !template.contains(ID_PLACEHOLDER) {
                return Err(AppError::validation(format!(
                    "{name} must contain {ID_PLACEHOLDER}"
                )));
            }
        }
        if self.crawler.batch_size == 0 {
            return Err(AppError::validation("crawler.batch_size must be > 0"));
        }
        if self.language.keyword.trim().is_empty() {
            return Err(AppError::validation("language.keyword is empty"));
        }
        if self.feeds.max_items == 0 {
            return Err(AppError::validation("feeds.max_items must be > 0"));
        }
        if self.feeds.language.file_name.trim().is_empty()
            || self.feeds.release.file_name.trim().is_empty()
        {
            return Err(AppError::validation("feed file_name is empty"));
        }
        if self.feeds.language.file_name == self.feeds.release.file_name {
            return Err(AppError::validation(
                "feeds.language and feeds.release must write different files",
            ));
        }
        Ok(())
    }
}

/// Catalog endpoints and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Full item listing endpoint
    #[serde(default = "defaults::listing_url")]
    pub listing_url: String,

    /// Per-item detail endpoint
    #[serde(default = "defaults::details_url")]
    pub details_url: String,

    /// Language parameter sent with detail lookups
    #[serde(default = "defaults::locale")]
    pub locale: String,

    /// Country parameter sent with detail lookups
    #[serde(default = "defaults::region")]
    pub region: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Store page link for feed entries
    #[serde(default = "defaults::item_link_url")]
    pub item_link_url: String,

    /// Image used when the item carries none
    #[serde(default = "defaults::image_fallback_url")]
    pub image_fallback_url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            listing_url: defaults::listing_url(),
            details_url: defaults::details_url(),
            locale: defaults::locale(),
            region: defaults::region(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            item_link_url: defaults::item_link_url(),
            image_fallback_url: defaults::image_fallback_url(),
        }
    }
}

/// Crawl batch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Items attempted per run
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// Delay after each successful or unavailable lookup
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Delay after a transport failure
    #[serde(default = "defaults::backoff_delay")]
    pub backoff_delay_ms: u64,

    /// Listing older than this is fetched again
    #[serde(default = "defaults::universe_max_age")]
    pub universe_max_age_days: i64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::batch_size(),
            request_delay_ms: defaults::request_delay(),
            backoff_delay_ms: defaults::backoff_delay(),
            universe_max_age_days: defaults::universe_max_age(),
        }
    }
}

/// Target language detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// English name used in entry descriptions
    #[serde(default = "defaults::language_name")]
    pub name: String,

    /// Short tag used in entry titles
    #[serde(default = "defaults::language_tag")]
    pub tag: String,

    /// ASCII keyword, matched case-insensitively
    #[serde(default = "defaults::language_keyword")]
    pub keyword: String,

    /// Native-script name, matched verbatim
    #[serde(default = "defaults::language_native")]
    pub native_name: String,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            name: defaults::language_name(),
            tag: defaults::language_tag(),
            keyword: defaults::language_keyword(),
            native_name: defaults::language_native(),
        }
    }
}

/// Output feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    /// Entries kept in each rendered document
    #[serde(default = "defaults::max_items")]
    pub max_items: usize,

    /// Directory the documents are written to
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "defaults::language_feed")]
    pub language: FeedConfig,

    #[serde(default = "defaults::release_feed")]
    pub release: FeedConfig,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            max_items: defaults::max_items(),
            output_dir: defaults::output_dir(),
            language: defaults::language_feed(),
            release: defaults::release_feed(),
        }
    }
}

/// A single output document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub title: String,
    pub self_link: String,
    pub file_name: String,
}

/// Persisted state settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Compressed snapshot path
    #[serde(default = "defaults::state_path")]
    pub state_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: defaults::state_path(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use super::FeedConfig;

    // Catalog defaults
    pub fn listing_url() -> String {
        "https://api.steampowered.com/ISteamApps/GetAppList/v2/".into()
    }
    pub fn details_url() -> String {
        "https://store.steampowered.com/api/appdetails".into()
    }
    pub fn locale() -> String {
        "en".into()
    }
    pub fn region() -> String {
        "us".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; catalog-watch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn item_link_url() -> String {
        "https://store.steampowered.com/app/{id}/".into()
    }
    pub fn image_fallback_url() -> String {
        "https://shared.akamai.steamstatic.com/store_item_assets/steam/apps/{id}/capsule_231x87.jpg"
            .into()
    }

    // Crawler defaults
    pub fn batch_size() -> usize {
        250
    }
    pub fn request_delay() -> u64 {
        200
    }
    pub fn backoff_delay() -> u64 {
        1000
    }
    pub fn universe_max_age() -> i64 {
        7
    }

    // Language defaults
    pub fn language_name() -> String {
        "Japanese".into()
    }
    pub fn language_tag() -> String {
        "JA".into()
    }
    pub fn language_keyword() -> String {
        "japanese".into()
    }
    pub fn language_native() -> String {
        "日本語".into()
    }

    // Feed defaults
    pub fn max_items() -> usize {
        200
    }
    pub fn output_dir() -> PathBuf {
        PathBuf::from(".")
    }
    pub fn language_feed() -> FeedConfig {
        FeedConfig {
            title: "Steam: Japanese Language Added".into(),
            self_link: "https://example.invalid/rss_lang_ja_added.xml".into(),
            file_name: "rss_lang_ja_added.xml".into(),
        }
    }
    pub fn release_feed() -> FeedConfig {
        FeedConfig {
            title: "Steam: Release Date Added/Changed".into(),
            self_link: "https://example.invalid/rss_release_changed.xml".into(),
            file_name: "rss_release_changed.xml".into(),
        }
    }

    // Storage defaults
    pub fn state_path() -> PathBuf {
        PathBuf::from("state.json.gz")
    }
}
