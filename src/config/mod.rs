//! Configuration management for the reply bot
//!
//! Configuration is read once at startup: a TOML file (every section optional)
//! overlaid with environment variables, then validated. Nothing here changes
//! during a run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::content::{FallbackPools, DEFAULT_PROMPT_TEMPLATE, DEFAULT_SYSTEM_PROMPT};
use crate::pacing::PacingPolicy;
use crate::scheduler::Quota;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Run budget and targeting
    pub run: RunConfig,

    /// On-disk state
    pub storage: StorageConfig,

    /// Prompt and fallback pools
    pub content: ContentConfig,

    /// Completion providers
    pub llm: LlmConfig,

    /// WebDriver session
    pub browser: BrowserConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Run-level budget and targeting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Total replies per run
    pub max_replies: usize,

    /// Split the budget between the global feed and creators
    pub mix_enabled: bool,

    /// Share of the budget given to the global feed (0-100)
    pub mix_global_percent: i64,

    /// Search query for discovery
    pub search_query: String,

    /// Operator's own handle, never targeted
    pub own_handle: String,

    /// Periodic long rest breaks
    pub enable_long_pause: bool,

    /// Consecutive empty global discoveries before the feed is given up
    pub max_empty_global_batches: u32,
}

/// Paths of persisted state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Append-only processed-identifier log
    pub processed_log: PathBuf,

    /// One creator handle per line
    pub creators_file: PathBuf,
}

/// Prompt pools and fallback replies
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub fallback_questions: Vec<String>,
    pub fallback_positive: Vec<String>,
    pub fallback_negative: Vec<String>,
    pub fallback_general: Vec<String>,

    /// Handlebars templates with `{{search_query}}` and `{{tweet_text}}`
    pub prompt_templates: Vec<String>,

    pub system_prompts: Vec<String>,
}

/// Completion provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL
    pub base_url: String,

    pub model: String,

    /// One provider per key, tried in this order
    pub api_keys: Vec<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Completion length ceiling
    pub max_tokens: u32,
}

/// WebDriver and site settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// WebDriver server endpoint (chromedriver)
    pub webdriver_url: String,

    /// Site root
    pub site_url: String,

    pub headless: bool,

    /// JSON cookie export used to restore the session
    pub cookie_file: PathBuf,

    /// Page load timeout in seconds
    pub page_load_timeout_secs: u64,

    pub user_agent: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_replies: 30,
            mix_enabled: true,
            mix_global_percent: 60,
            search_query: String::from("rustlang"),
            own_handle: String::new(),
            enable_long_pause: true,
            max_empty_global_batches: 5,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            processed_log: PathBuf::from("processed_tweets_log.csv"),
            creators_file: PathBuf::from("creators.txt"),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://generativelanguage.googleapis.com/v1beta/openai/"),
            model: String::from("gemini-1.5-flash"),
            api_keys: Vec::new(),
            timeout_secs: 30,
            max_tokens: 40,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: String::from("http://localhost:9515"),
            site_url: String::from("https://x.com"),
            headless: false,
            cookie_file: PathBuf::from("cookies.json"),
            page_load_timeout_secs: 30,
            user_agent: String::from(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
            ),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl ContentConfig {
    /// Replace empty pools with the built-in single-entry pools
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        let pools = self.fallback_pools().with_defaults();
        self.fallback_questions = pools.questions;
        self.fallback_positive = pools.positive;
        self.fallback_negative = pools.negative;
        self.fallback_general = pools.general;

        self.prompt_templates.retain(|t| !t.trim().is_empty());
        if self.prompt_templates.is_empty() {
            self.prompt_templates.push(DEFAULT_PROMPT_TEMPLATE.to_string());
        }

        self.system_prompts.retain(|p| !p.trim().is_empty());
        if self.system_prompts.is_empty() {
            self.system_prompts.push(DEFAULT_SYSTEM_PROMPT.to_string());
        }

        self
    }

    pub fn fallback_pools(&self) -> FallbackPools {
        FallbackPools {
            questions: self.fallback_questions.clone(),
            positive: self.fallback_positive.clone(),
            negative: self.fallback_negative.clone(),
            general: self.fallback_general.clone(),
        }
    }
}

impl Config {
    /// Defaults overlaid with environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// File (when present) plus environment, validated
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            warn!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables onto the current values
    ///
    /// Unparsable numeric values are ignored.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_parse::<usize>("REPLYBOT_MAX_REPLIES") {
            self.run.max_replies = v;
        }

        if let Some(v) = env_parse::<i64>("REPLYBOT_MIX_GLOBAL_PERCENT") {
            self.run.mix_global_percent = v;
        }

        if let Ok(v) = std::env::var("REPLYBOT_SEARCH_QUERY") {
            self.run.search_query = v;
        }

        if let Ok(v) = std::env::var("REPLYBOT_OWN_HANDLE") {
            self.run.own_handle = v;
        }

        if let Ok(v) = std::env::var("REPLYBOT_WEBDRIVER_URL") {
            self.browser.webdriver_url = v;
        }

        if let Ok(v) = std::env::var("REPLYBOT_LOG_LEVEL") {
            self.logging.level = v;
        }

        if let Ok(v) = std::env::var("REPLYBOT_LOG_FORMAT") {
            self.logging.format = v;
        }

        if let Ok(v) = std::env::var("LLM_API_KEYS") {
            self.llm.api_keys = v
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect();
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.run.max_replies == 0 {
            anyhow::bail!("max_replies must be greater than 0");
        }

        if !(0..=100).contains(&self.run.mix_global_percent) {
            anyhow::bail!(
                "mix_global_percent must be between 0 and 100, got {}",
                self.run.mix_global_percent
            );
        }

        if self.run.search_query.trim().is_empty() {
            anyhow::bail!("search_query must not be empty");
        }

        if self.llm.timeout_secs == 0 {
            anyhow::bail!("llm.timeout_secs must be greater than 0");
        }

        if self.browser.page_load_timeout_secs == 0 {
            anyhow::bail!("browser.page_load_timeout_secs must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("logging.format must be 'text' or 'json'");
        }

        Ok(())
    }

    /// Quota for this run, honoring mix mode
    #[must_use]
    pub fn quota(&self) -> Quota {
        if self.run.mix_enabled {
            Quota::plan(self.run.max_replies, self.run.mix_global_percent)
        } else {
            Quota::creators_only(self.run.max_replies)
        }
    }

    #[must_use]
    pub fn pacing_policy(&self) -> PacingPolicy {
        PacingPolicy {
            long_pause_enabled: self.run.enable_long_pause,
            ..PacingPolicy::default()
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

/// Creator handles from a one-per-line file
///
/// Lines are trimmed, a leading `@` is dropped and blank lines are skipped.
/// A missing file yields an empty list.
pub fn load_creators(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        warn!(path = %path.display(), "Creators file not found, creator targeting disabled");
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read creators file: {}", path.display()))?;

    Ok(parse_creators(&content))
}

fn parse_creators(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim().trim_start_matches('@').trim())
        .filter(|handle| !handle.is_empty() && !handle.starts_with('#'))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_budget() {
        let mut config = Config::default();
        config.run.max_replies = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_percent() {
        let mut config = Config::default();
        config.run.mix_global_percent = 101;
        assert!(config.validate().is_err());
        config.run.mix_global_percent = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_search_query() {
        let mut config = Config::default();
        config.run.search_query = "   ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [run]
            max_replies = 10
            own_handle = "@Me"
            "#,
        )
        .unwrap();

        assert_eq!(config.run.max_replies, 10);
        assert_eq!(config.run.mix_global_percent, 60);
        assert_eq!(config.run.own_handle, "@Me");
        assert_eq!(config.llm.max_tokens, 40);
    }

    #[test]
    fn test_quota_respects_mix_mode() {
        let mut config = Config::default();
        config.run.max_replies = 10;
        assert_eq!(config.quota(), Quota::plan(10, 60));

        config.run.mix_enabled = false;
        assert_eq!(config.quota(), Quota::creators_only(10));
    }

    #[test]
    fn test_long_pause_flag_reaches_policy() {
        let mut config = Config::default();
        config.run.enable_long_pause = false;
        assert!(!config.pacing_policy().long_pause_enabled);
    }

    #[test]
    fn test_content_defaults_fill_empty_pools() {
        let content = ContentConfig {
            fallback_general: vec!["custom".into()],
            ..ContentConfig::default()
        }
        .with_defaults();

        assert_eq!(content.fallback_general, vec!["custom".to_string()]);
        assert_eq!(content.fallback_questions.len(), 1);
        assert_eq!(content.prompt_templates, vec![DEFAULT_PROMPT_TEMPLATE.to_string()]);
        assert_eq!(content.system_prompts, vec![DEFAULT_SYSTEM_PROMPT.to_string()]);
    }

    #[test]
    fn test_parse_creators() {
        let handles = parse_creators("@alice\n\n  bob  \n# comment\n@ carol\n");
        assert_eq!(handles, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_missing_creators_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let handles = load_creators(&dir.path().join("nope.txt")).unwrap();
        assert!(handles.is_empty());
    }
}
