use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::Metric;

/// One token listing as supplied by the market-data collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    /// Base token contract address
    pub token_address: String,
    pub name: String,
    pub symbol: String,
    pub market_cap: f64,
    pub volume_24h: f64,
    pub liquidity: f64,
    /// Estimated, the market-data provider does not report holders
    pub holder_count: u64,
    pub discovered_at: DateTime<Utc>,
    pub price_usd: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub url: Option<String>,
}

impl ListingRecord {
    pub fn metric_value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::MarketCap => self.market_cap,
            Metric::Volume24h => self.volume_24h,
            Metric::HolderCount => self.holder_count as f64,
            Metric::Liquidity => self.liquidity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Bullish,
    Bearish,
    Neutral,
    InsufficientData,
}

impl SentimentLabel {
    pub fn is_directional(self) -> bool {
        matches!(self, SentimentLabel::Bullish | SentimentLabel::Bearish)
    }

    /// Loose reading of a classifier label; anything unrecognized is neutral
    pub fn from_classifier(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        if lowered.contains("bullish") {
            SentimentLabel::Bullish
        } else if lowered.contains("bearish") {
            SentimentLabel::Bearish
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            SentimentLabel::Bullish => "🟢",
            SentimentLabel::Bearish => "🔴",
            SentimentLabel::Neutral => "🟡",
            SentimentLabel::InsufficientData => "⚪",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SentimentLabel::Bullish => "bullish",
            SentimentLabel::Bearish => "bearish",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::InsufficientData => "insufficient_data",
        })
    }
}

/// Output of a sentiment classifier call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: SentimentLabel,
    pub explanation: String,
    pub evidence_count: u32,
}

/// Raw social mentions gathered for the legacy two-step path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMentions {
    /// Mentions joined into one blob, one per line
    pub text: String,
    pub count: u32,
}

impl RawMentions {
    pub fn is_empty(&self) -> bool {
        self.count == 0 || self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    /// Combined web-search-and-classify call
    WebSearch,
    /// Raw mention fetch followed by a separate classification
    LegacySearch,
}

/// Final sentiment read for one contract address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentVerdict {
    pub address: String,
    pub label: SentimentLabel,
    pub explanation: String,
    pub evidence_count: u32,
    pub source: VerdictSource,
    pub analyzed_at: DateTime<Utc>,
}

impl fmt::Display for SentimentVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} Sentiment: {}", self.label.emoji(), self.label)?;
        writeln!(f, "📊 Based on {} mentions", self.evidence_count)?;
        write!(f, "💬 {}", self.explanation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifier_label_reading() {
        assert_eq!(SentimentLabel::from_classifier("Bullish"), SentimentLabel::Bullish);
        assert_eq!(SentimentLabel::from_classifier(" very BEARISH "), SentimentLabel::Bearish);
        assert_eq!(SentimentLabel::from_classifier("mixed"), SentimentLabel::Neutral);
        assert!(!SentimentLabel::InsufficientData.is_directional());
    }

    #[test]
    fn test_label_serializes_snake_case() {
        let json = serde_json::to_string(&SentimentLabel::InsufficientData).unwrap();
        assert_eq!(json, "\"insufficient_data\"");
    }
}
