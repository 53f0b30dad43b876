//! Collaborator contracts for market data, social search and inference,
//! plus the HTTP adapters that implement them

pub mod dexscreener;
pub mod grok;
pub mod twitter;

pub use dexscreener::DexScreenerClient;
pub use grok::GrokClient;
pub use twitter::TwitterClient;

use async_trait::async_trait;

use crate::core::{Classification, ListingRecord, RawMentions, SentimentLabel};
use crate::error::CollaboratorError;
use crate::filter::FilterSet;

#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Current listings. `filters` is a hint that may narrow the answer, so
    /// callers that cache one shared snapshot pass `None`.
    async fn fetch_listings(
        &self,
        filters: Option<&FilterSet>,
    ) -> Result<Vec<ListingRecord>, CollaboratorError>;

    async fn fetch_token(&self, address: &str) -> Result<Option<ListingRecord>, CollaboratorError>;
}

/// Single round trip that searches social posts and classifies them
#[async_trait]
pub trait SentimentSearch: Send + Sync {
    async fn search_and_classify(&self, address: &str) -> Result<Classification, CollaboratorError>;
}

#[async_trait]
pub trait MentionSource: Send + Sync {
    async fn fetch_raw_mentions(&self, address: &str) -> Result<RawMentions, CollaboratorError>;
}

#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(
        &self,
        address: &str,
        mentions: &str,
    ) -> Result<(SentimentLabel, String), CollaboratorError>;
}
