//! Configuration file parser for ~/.config/newsdigest/config.toml.
//!
//! The config file is optional. A missing or empty file yields
//! `Config::default()`. Unknown keys are accepted but logged as warnings.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::ai::{GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MAX_INPUT_CHARS, DEFAULT_MODEL};
use crate::auth::{OAuthConfig, DEFAULT_REDIRECT_URI};
use crate::feed::FetcherConfig;
use crate::language::Language;
use crate::news::{HeadlinesConfig, DEFAULT_HEADLINE_FEEDS, DEFAULT_HEADLINE_LIMIT};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
///
/// SEC-015: Custom Debug impl masks `ai_api_key`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Target language used when none has been persisted.
    pub language: Language,

    /// Pass-through relay for public feeds. Empty string fetches directly.
    pub proxy_url: String,

    /// Inoreader API and OAuth base URL.
    pub inoreader_base_url: String,

    /// Fixed OAuth callback registered with the Inoreader app.
    pub redirect_uri: String,

    /// Number of items requested per Inoreader stream.
    pub stream_item_count: u32,

    pub ai_base_url: String,
    pub ai_model: String,

    /// AI API key. `GEMINI_API_KEY` and `API_KEY` take precedence.
    pub ai_api_key: Option<String>,

    /// Feed text beyond this many characters is cut before the AI call.
    pub max_input_chars: usize,

    /// Per-request timeout for every outgoing HTTP call.
    pub request_timeout_secs: u64,

    /// Headlines cache validity, also the background refresh period.
    pub cache_ttl_secs: u64,

    /// Maximum length of the merged headline lists.
    pub headline_limit: usize,

    pub headline_feeds: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: Language::default(),
            proxy_url: "https://corsproxy.io/".to_string(),
            inoreader_base_url: "https://www.inoreader.com".to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            stream_item_count: 50,
            ai_base_url: DEFAULT_BASE_URL.to_string(),
            ai_model: DEFAULT_MODEL.to_string(),
            ai_api_key: None,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            request_timeout_secs: 30,
            cache_ttl_secs: 300,
            headline_limit: DEFAULT_HEADLINE_LIMIT,
            headline_feeds: DEFAULT_HEADLINE_FEEDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// SEC-015: Mask ai_api_key in Debug output to prevent secret leakage.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("language", &self.language)
            .field("proxy_url", &self.proxy_url)
            .field("inoreader_base_url", &self.inoreader_base_url)
            .field("redirect_uri", &self.redirect_uri)
            .field("stream_item_count", &self.stream_item_count)
            .field("ai_base_url", &self.ai_base_url)
            .field("ai_model", &self.ai_model)
            .field("ai_api_key", &self.ai_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("max_input_chars", &self.max_input_chars)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("headline_limit", &self.headline_limit)
            .field("headline_feeds", &self.headline_feeds)
            .finish()
    }
}

const KNOWN_KEYS: [&str; 13] = [
    "language",
    "proxy_url",
    "inoreader_base_url",
    "redirect_uri",
    "stream_item_count",
    "ai_base_url",
    "ai_model",
    "ai_api_key",
    "max_input_chars",
    "request_timeout_secs",
    "cache_ttl_secs",
    "headline_limit",
    "headline_feeds",
];

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content)
    }

    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            tracing::debug!("Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(language = %config.language, model = %config.ai_model, "Loaded configuration");
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// AI API key: `GEMINI_API_KEY`, then `API_KEY`, then the config file.
    pub fn resolve_api_key(&self) -> Option<SecretString> {
        pick_api_key(
            std::env::var("GEMINI_API_KEY").ok(),
            std::env::var("API_KEY").ok(),
            self.ai_api_key.as_deref(),
        )
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            proxy_url: Some(self.proxy_url.clone()).filter(|p| !p.trim().is_empty()),
            inoreader_base_url: self.inoreader_base_url.clone(),
            stream_item_count: self.stream_item_count,
            timeout: self.request_timeout(),
        }
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            base_url: self.ai_base_url.clone(),
            model: self.ai_model.clone(),
            api_key: self.resolve_api_key(),
            max_input_chars: self.max_input_chars,
            timeout: self.request_timeout(),
        }
    }

    pub fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig {
            base_url: self.inoreader_base_url.clone(),
            redirect_uri: self.redirect_uri.clone(),
            timeout: self.request_timeout(),
        }
    }

    pub fn headlines_config(&self) -> HeadlinesConfig {
        HeadlinesConfig {
            feeds: self.headline_feeds.clone(),
            ttl: Duration::from_secs(self.cache_ttl_secs.max(1)),
            limit: self.headline_limit,
        }
    }
}

fn pick_api_key(
    gemini_env: Option<String>,
    api_env: Option<String>,
    from_config: Option<&str>,
) -> Option<SecretString> {
    [gemini_env, api_env, from_config.map(str::to_string)]
        .into_iter()
        .flatten()
        .find(|k| !k.trim().is_empty())
        .map(SecretString::from)
}

// ============================================================================
// Tests
// ============================================================================
