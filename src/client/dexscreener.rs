//! DexScreener adapter: Solana pair search mapped to listing records

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::ListingSource;
use crate::config::ListingSettings;
use crate::core::ListingRecord;
use crate::error::CollaboratorError;
use crate::filter::FilterSet;

/// Base tokens that are never memecoins
const KNOWN_TOKENS: &[&str] = &["sol", "wsol", "usdc", "usdt", "btc", "eth", "ray", "orca", "serum"];

#[derive(Debug, Clone, Deserialize)]
pub struct DexScreenerResponse {
    pub pairs: Option<Vec<TokenPair>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "chainId")]
    pub chain_id: String,
    pub url: Option<String>,
    #[serde(rename = "baseToken")]
    pub base_token: BaseToken,
    #[serde(rename = "priceUsd")]
    pub price_usd: Option<String>,
    pub volume: Option<Volume>,
    #[serde(rename = "priceChange")]
    pub price_change: Option<PriceChange>,
    pub liquidity: Option<Liquidity>,
    pub fdv: Option<f64>,
    #[serde(rename = "marketCap")]
    pub market_cap: Option<f64>,
    #[serde(rename = "pairCreatedAt")]
    pub pair_created_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BaseToken {
    pub address: String,
    pub name: String,
    pub symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Volume {
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceChange {
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Liquidity {
    pub usd: Option<f64>,
}

impl TokenPair {
    /// Holder counts are not published; estimate from liquidity and volume
    pub fn estimated_holders(&self) -> u64 {
        let liquidity = self.liquidity_usd();
        let volume = self.volume_24h();
        ((liquidity / 1_000.0) + (volume / 10_000.0)).max(10.0) as u64
    }

    pub fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }

    pub fn volume_24h(&self) -> f64 {
        self.volume.as_ref().and_then(|v| v.h24).unwrap_or(0.0)
    }

    pub fn to_listing(&self, fetched_at: DateTime<Utc>) -> ListingRecord {
        let discovered_at = self
            .pair_created_at
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or(fetched_at);

        ListingRecord {
            token_address: self.base_token.address.clone(),
            name: self.base_token.name.clone(),
            symbol: self.base_token.symbol.clone(),
            market_cap: self.market_cap.or(self.fdv).unwrap_or(0.0),
            volume_24h: self.volume_24h(),
            liquidity: self.liquidity_usd(),
            holder_count: self.estimated_holders(),
            discovered_at,
            price_usd: self.price_usd.as_deref().and_then(|p| p.parse().ok()),
            price_change_24h: self.price_change.as_ref().and_then(|p| p.h24),
            url: self.url.clone(),
        }
    }
}

pub struct DexScreenerClient {
    client: Client,
    settings: ListingSettings,
}

impl DexScreenerClient {
    pub fn new(settings: ListingSettings) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self { client, settings })
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<DexScreenerResponse, CollaboratorError> {
        let url = format!("{}{}", self.settings.dexscreener_base_url, path);
        debug!("🌐 DexScreener request: {}", url);

        let response = self.client.get(&url).query(query).send().await?;
        if !response.status().is_success() {
            return Err(CollaboratorError::Transport(format!(
                "DexScreener API error: {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    /// Solana pairs worth listing: not a well-known base token and inside the
    /// configured market cap window
    fn keep_pair(&self, pair: &TokenPair) -> bool {
        if pair.chain_id != "solana" {
            return false;
        }
        let symbol = pair.base_token.symbol.to_lowercase();
        if KNOWN_TOKENS.contains(&symbol.as_str()) {
            return false;
        }
        let cap = pair.market_cap.or(pair.fdv).unwrap_or(0.0);
        cap >= self.settings.min_market_cap_usd && cap <= self.settings.max_market_cap_usd
    }
}

#[async_trait]
impl ListingSource for DexScreenerClient {
    async fn fetch_listings(
        &self,
        _filters: Option<&FilterSet>,
    ) -> Result<Vec<ListingRecord>, CollaboratorError> {
        let fetched_at = Utc::now();
        let mut seen = HashSet::new();
        let mut listings = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0usize;

        for term in &self.settings.search_terms {
            match self.get("/latest/dex/search", &[("q", term.as_str())]).await {
                Ok(response) => {
                    succeeded += 1;
                    for pair in response.pairs.unwrap_or_default() {
                        if self.keep_pair(&pair) && seen.insert(pair.base_token.address.clone()) {
                            listings.push(pair.to_listing(fetched_at));
                        }
                    }
                }
                Err(e) => {
                    warn!("DexScreener search for {:?} failed: {}", term, e);
                    last_error = Some(e);
                }
            }
            if listings.len() >= self.settings.max_results {
                break;
            }
        }

        if succeeded == 0 {
            return Err(last_error
                .unwrap_or_else(|| CollaboratorError::Unavailable("no search terms configured".into())));
        }

        listings.truncate(self.settings.max_results);
        info!("📊 DexScreener returned {} unique Solana listings", listings.len());
        Ok(listings)
    }

    async fn fetch_token(&self, address: &str) -> Result<Option<ListingRecord>, CollaboratorError> {
        let response = self
            .get(&format!("/latest/dex/tokens/{}", address), &[])
            .await?;
        let listing = response
            .pairs
            .unwrap_or_default()
            .into_iter()
            .find(|pair| pair.chain_id == "solana")
            .map(|pair| pair.to_listing(Utc::now()));
        Ok(listing)
    }
}
