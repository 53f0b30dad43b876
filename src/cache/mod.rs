//! Time-boxed memo of expensive collaborator calls
//!
//! Entries are keyed by a fingerprint of (category, params) and expire per
//! category. Lookups evict expired entries lazily; the sweeper bounds storage
//! with a retention ceiling.

pub mod clock;
pub mod fingerprint;
pub mod store;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use fingerprint::Fingerprint;
pub use store::{CacheBackend, CacheEntry, CacheStats, MemoryBackend, ResultCache};
pub use sweeper::CacheSweeper;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::CacheSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheCategory {
    /// Market listing snapshots
    Listings,
    /// Single-token market data
    TokenDetail,
    /// Sentiment verdicts keyed by contract address
    Sentiment,
}

impl CacheCategory {
    pub fn name(self) -> &'static str {
        match self {
            CacheCategory::Listings => "listings",
            CacheCategory::TokenDetail => "token_detail",
            CacheCategory::Sentiment => "sentiment",
        }
    }
}

impl fmt::Display for CacheCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// TTL per category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub listings: Duration,
    pub token_detail: Duration,
    pub sentiment: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            listings: Duration::from_secs(5 * 60),
            token_detail: Duration::from_secs(5 * 60),
            sentiment: Duration::from_secs(60 * 60),
        }
    }
}

impl TtlPolicy {
    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self {
            listings: Duration::from_secs(settings.listing_ttl_secs),
            token_detail: Duration::from_secs(settings.token_detail_ttl_secs),
            sentiment: Duration::from_secs(settings.sentiment_ttl_secs),
        }
    }

    pub fn ttl(&self, category: CacheCategory) -> Duration {
        match category {
            CacheCategory::Listings => self.listings,
            CacheCategory::TokenDetail => self.token_detail,
            CacheCategory::Sentiment => self.sentiment,
        }
    }

    pub fn with_ttl(mut self, category: CacheCategory, ttl: Duration) -> Self {
        match category {
            CacheCategory::Listings => self.listings = ttl,
            CacheCategory::TokenDetail => self.token_detail = ttl,
            CacheCategory::Sentiment => self.sentiment = ttl,
        }
        self
    }
}
