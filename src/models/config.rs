//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variable overriding `delivery.webhook_url`.
pub const ENV_WEBHOOK_URL: &str = "NEWSWIRE_WEBHOOK_URL";
/// Environment variable overriding `source.url`.
pub const ENV_SOURCE_URL: &str = "NEWSWIRE_SOURCE_URL";
/// Environment variable overriding `history.path`.
pub const ENV_HISTORY_FILE: &str = "NEWSWIRE_HISTORY_FILE";

/// Root application configuration.
///
/// Built once at startup and handed to every component by reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Page to poll and how to fetch it
    #[serde(default)]
    pub source: SourceConfig,

    /// Webhook the new articles are posted to
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Loop timing
    #[serde(default)]
    pub poll: PollConfig,

    /// Where the dispatched identifiers are persisted
    #[serde(default)]
    pub history: HistoryConfig,

    /// Date window and dispatch policy
    #[serde(default)]
    pub policy: Policy,

    /// CSS selector chains for article extraction
    #[serde(default)]
    pub selectors: SelectorConfig,

    /// Diagnostics
    #[serde(default)]
    pub debug: DebugConfig,

    /// Log verbosity
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
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

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup; empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_WEBHOOK_URL) {
            self.delivery.webhook_url = url;
        }
        if let Some(url) = get(ENV_SOURCE_URL) {
            self.source.url = url;
        }
        if let Some(path) = get(ENV_HISTORY_FILE) {
            self.history.path = PathBuf::from(path);
        }
    }

    /// Validate configuration values for basic sanity.
    ///
    /// Called once before the loop starts; any error here is fatal.
    pub fn validate(&self) -> Result<()> {
        self.validate_source()?;
        self.validate_delivery()?;

        if self.poll.interval_secs == 0 {
            return Err(AppError::validation("poll.interval_secs must be > 0"));
        }
        if self.history.path.as_os_str().is_empty() {
            return Err(AppError::validation("history.path is empty"));
        }
        self.selectors.validate()
    }

    /// Validate only what is needed to fetch and parse the source page.
    pub fn validate_source(&self) -> Result<()> {
        let url = url::Url::parse(&self.source.url)
            .map_err(|e| AppError::validation(format!("source.url is invalid: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::validation("source.url must be http(s)"));
        }
        if self.source.user_agent.trim().is_empty() {
            return Err(AppError::validation("source.user_agent is empty"));
        }
        if self.source.timeout_secs == 0 {
            return Err(AppError::validation("source.timeout_secs must be > 0"));
        }
        Ok(())
    }

    fn validate_delivery(&self) -> Result<()> {
        if self.delivery.webhook_url.trim().is_empty() {
            return Err(AppError::config(format!(
                "delivery.webhook_url is not set (or export {ENV_WEBHOOK_URL})"
            )));
        }
        let url = url::Url::parse(&self.delivery.webhook_url)
            .map_err(|e| AppError::validation(format!("delivery.webhook_url is invalid: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::validation("delivery.webhook_url must be http(s)"));
        }
        if self.delivery.timeout_secs == 0 {
            return Err(AppError::validation("delivery.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Source page settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Homepage listing the articles
    #[serde(default = "defaults::source_url")]
    pub url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::fetch_timeout")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: defaults::source_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::fetch_timeout(),
        }
    }
}

/// Webhook delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Chat webhook endpoint (required)
    #[serde(default)]
    pub webhook_url: String,

    /// Message text; supports `{title}`, `{url}`, `{date}`, `{category}`, `{confidence}`
    #[serde(default = "defaults::content_template")]
    pub content_template: String,

    /// Display name override for the webhook
    #[serde(default)]
    pub username: Option<String>,

    /// Embed footer suffix
    #[serde(default = "defaults::footer")]
    pub footer: String,

    /// Embed accent color
    #[serde(default = "defaults::color")]
    pub color: u32,

    /// Request timeout in seconds
    #[serde(default = "defaults::delivery_timeout")]
    pub timeout_secs: u64,

    /// Delay between two posts in milliseconds
    #[serde(default = "defaults::delivery_delay")]
    pub delay_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            content_template: defaults::content_template(),
            username: None,
            footer: defaults::footer(),
            color: defaults::color(),
            timeout_secs: defaults::delivery_timeout(),
            delay_ms: defaults::delivery_delay(),
        }
    }
}

/// Polling loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Seconds between two cycles
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,

    /// Shorter wait used after a cycle whose fetch failed
    #[serde(default = "defaults::error_backoff")]
    pub error_backoff_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
            error_backoff_secs: defaults::error_backoff(),
        }
    }
}

/// History persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// JSON file holding the dispatched identifiers
    #[serde(default = "defaults::history_path")]
    pub path: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: defaults::history_path(),
        }
    }
}

/// Dispatch policy. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Only relay articles dated within the look-back window
    #[serde(default = "defaults::enabled")]
    pub current_date_only: bool,

    /// Days before today still considered current
    #[serde(default)]
    pub look_back_days: u32,

    /// Fall back to a `/YYYY/MM/DD/` fragment in the article URL
    #[serde(default = "defaults::enabled")]
    pub extract_date_from_url: bool,

    /// Drop articles whose date could not be confirmed
    #[serde(default)]
    pub strict_date_filtering: bool,

    /// Never assume an undated article was published today
    #[serde(default)]
    pub never_assume_today: bool,

    /// Cap per cycle, 0 = unlimited
    #[serde(default)]
    pub max_articles_per_run: usize,
}

impl Policy {
    /// Whether articles without a confirmed date must be dropped.
    pub fn requires_confirmed_date(&self) -> bool {
        self.strict_date_filtering || self.never_assume_today
    }

    /// The per-cycle cap, `None` when unlimited.
    pub fn cap(&self) -> Option<usize> {
        (self.max_articles_per_run > 0).then_some(self.max_articles_per_run)
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            current_date_only: true,
            look_back_days: 0,
            extract_date_from_url: true,
            strict_date_filtering: false,
            never_assume_today: false,
            max_articles_per_run: 0,
        }
    }
}

/// CSS selector chains used by the page parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Container selectors tried in order; first one with matches wins
    #[serde(default = "defaults::containers")]
    pub containers: Vec<String>,

    /// Tried only when no primary container matched
    #[serde(default = "defaults::fallback_containers")]
    pub fallback_containers: Vec<String>,

    /// Title element inside a container
    #[serde(default = "defaults::title_selector")]
    pub title: String,

    /// Link element inside a container
    #[serde(default = "defaults::link_selector")]
    pub link: String,

    /// Date element inside a container
    #[serde(default = "defaults::date_selector")]
    pub date: String,

    /// Category element inside a container
    #[serde(default = "defaults::category_selector")]
    pub category: String,

    /// Href substrings accepted by the bare-link fallback scan
    #[serde(default = "defaults::fallback_link_patterns")]
    pub fallback_link_patterns: Vec<String>,
}

impl SelectorConfig {
    /// Check that every selector parses.
    pub fn validate(&self) -> Result<()> {
        if self.containers.is_empty() && self.fallback_containers.is_empty() {
            return Err(AppError::validation("No container selectors defined"));
        }

        let singles = [&self.title, &self.link, &self.date, &self.category];
        for selector in self
            .containers
            .iter()
            .chain(self.fallback_containers.iter())
            .chain(singles)
        {
            scraper::Selector::parse(selector)
                .map_err(|e| AppError::selector(selector.as_str(), format!("{e:?}")))?;
        }
        Ok(())
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            containers: defaults::containers(),
            fallback_containers: defaults::fallback_containers(),
            title: defaults::title_selector(),
            link: defaults::link_selector(),
            date: defaults::date_selector(),
            category: defaults::category_selector(),
            fallback_link_patterns: defaults::fallback_link_patterns(),
        }
    }
}

/// Diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Write every fetched page verbatim to `dump_dir`
    #[serde(default)]
    pub dump_html: bool,

    /// Directory for HTML dumps
    #[serde(default = "defaults::dump_dir")]
    pub dump_dir: PathBuf,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            dump_html: false,
            dump_dir: defaults::dump_dir(),
        }
    }
}

/// Log verbosity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// env_logger filter used when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn enabled() -> bool {
        true
    }

    // Source defaults
    pub fn source_url() -> String {
        "https://www.warhammer-community.com/en-gb/".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; newswire/0.1)".into()
    }
    pub fn fetch_timeout() -> u64 {
        30
    }

    // Delivery defaults
    pub fn content_template() -> String {
        "New article: {title}".into()
    }
    pub fn footer() -> String {
        "Posted by newswire".into()
    }
    pub fn color() -> u32 {
        0x9370DB
    }
    pub fn delivery_timeout() -> u64 {
        10
    }
    pub fn delivery_delay() -> u64 {
        1000
    }

    // Poll defaults
    pub fn interval() -> u64 {
        3600
    }
    pub fn error_backoff() -> u64 {
        60
    }

    pub fn history_path() -> PathBuf {
        PathBuf::from("posted_articles.json")
    }

    // Selector defaults
    pub fn containers() -> Vec<String> {
        vec!["article".into(), ".post-item".into(), ".article-card".into()]
    }
    pub fn fallback_containers() -> Vec<String> {
        vec![".card".into(), ".news-item".into(), ".post".into()]
    }
    pub fn title_selector() -> String {
        "h2, h3, .title, .post-title".into()
    }
    pub fn link_selector() -> String {
        "a[href]".into()
    }
    pub fn date_selector() -> String {
        ".date, .post-date, time".into()
    }
    pub fn category_selector() -> String {
        ".category, .tag, .post-category".into()
    }
    pub fn fallback_link_patterns() -> Vec<String> {
        vec!["/posts/".into(), "/articles/".into()]
    }

    pub fn dump_dir() -> PathBuf {
        PathBuf::from("debug")
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
