//! Configuration structures

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub cache: CacheSettings,
    pub sentiment: SentimentSettings,
    pub listings: ListingSettings,
    pub api: ApiSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    pub listing_ttl_secs: u64,
    pub token_detail_ttl_secs: u64,
    pub sentiment_ttl_secs: u64,
    pub retention_days: u64,
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            listing_ttl_secs: 300,      // 5 minutes
            token_detail_ttl_secs: 300, // 5 minutes
            sentiment_ttl_secs: 3600,   // 1 hour
            retention_days: 7,
            sweep_interval_secs: 21600, // every 6 hours
        }
    }
}

impl CacheSettings {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days * 24 * 60 * 60)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SentimentSettings {
    /// Fewer mentions than this never yield a directional label
    pub min_evidence: u32,
    pub search_timeout_secs: u64,
    pub legacy_timeout_secs: u64,
    pub address_length: usize,
}

impl Default for SentimentSettings {
    fn default() -> Self {
        Self {
            min_evidence: 5,
            search_timeout_secs: 60,
            legacy_timeout_secs: 30,
            address_length: 44,
        }
    }
}

impl SentimentSettings {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn legacy_timeout(&self) -> Duration {
        Duration::from_secs(self.legacy_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListingSettings {
    pub dexscreener_base_url: String,
    pub search_terms: Vec<String>,
    pub min_market_cap_usd: f64,
    pub max_market_cap_usd: f64,
    pub max_results: usize,
    pub request_timeout_secs: u64,
    /// Listings younger than this are skipped
    pub min_age_minutes: u64,
    /// Listings older than this are skipped; absent means no ceiling
    pub max_age_minutes: Option<u64>,
    pub page_size: usize,
    pub saved_filters_path: String,
}

impl Default for ListingSettings {
    fn default() -> Self {
        let terms = [
            "solana", "pump", "bonk", "dogwifhat", "pepe", "meme", "coin", "inu", "shiba", "doge",
            "elon", "moon", "rocket", "chad", "wojak", "token", "sol", "based", "trump", "cat",
            "dog", "frog",
        ];
        Self {
            dexscreener_base_url: "https://api.dexscreener.com".to_string(),
            search_terms: terms.iter().map(|t| t.to_string()).collect(),
            min_market_cap_usd: 1_000.0,
            max_market_cap_usd: 1_000_000_000.0,
            max_results: 200,
            request_timeout_secs: 15,
            min_age_minutes: 0,
            max_age_minutes: Some(7 * 24 * 60),
            page_size: 15,
            saved_filters_path: "data/saved_filters.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiSettings {
    pub xai_base_url: String,
    pub xai_api_key: Option<String>,
    pub search_model: String,
    pub classify_model: String,
    pub twitter_base_url: String,
    pub twitter_bearer_token: Option<String>,
    pub mention_limit: usize,
    pub mention_days_back: i64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            xai_base_url: "https://api.x.ai/v1".to_string(),
            xai_api_key: None,
            search_model: "grok-beta".to_string(),
            classify_model: "grok-3".to_string(),
            twitter_base_url: "https://api.twitter.com/2".to_string(),
            twitter_bearer_token: None,
            mention_limit: 50,
            mention_days_back: 2,
        }
    }
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Load the file when present, defaults otherwise; secrets from the
    /// environment win either way
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("XAI_API_KEY").filter(|v| !v.trim().is_empty()) {
            self.api.xai_api_key = Some(key);
        }
        if let Some(token) = lookup("TWITTER_BEARER_TOKEN").filter(|v| !v.trim().is_empty()) {
            self.api.twitter_bearer_token = Some(token);
        }
    }
}
