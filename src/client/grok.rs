//! xAI Grok adapter for web-search sentiment and plain classification

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, warn};

use super::{SentimentClassifier, SentimentSearch};
use crate::config::{ApiSettings, SentimentSettings};
use crate::core::{Classification, SentimentLabel};
use crate::error::CollaboratorError;

const SEARCH_SYSTEM_PROMPT: &str = "You are a crypto sentiment analyst with live web search access. \
Search Twitter in real time for current posts about the token and analyze actual recent discussion.";

const CLASSIFY_SYSTEM_PROMPT: &str = "You are a financial sentiment analyst specializing in \
cryptocurrency and memecoins. Provide accurate, unbiased sentiment analysis based on social media content.";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub struct GrokClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    search_model: String,
    classify_model: String,
}

impl GrokClient {
    pub fn new(api: &ApiSettings, sentiment: &SentimentSettings) -> Result<Self, CollaboratorError> {
        // backstop only; the orchestrator enforces its own deadlines
        let timeout = sentiment.search_timeout() + Duration::from_secs(5);
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: api.xai_base_url.clone(),
            api_key: api.xai_api_key.clone(),
            search_model: api.search_model.clone(),
            classify_model: api.classify_model.clone(),
        })
    }

    async fn complete(&self, body: serde_json::Value) -> Result<String, CollaboratorError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CollaboratorError::Unavailable("XAI_API_KEY not configured".into()))?;

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Grok API rate limit exceeded");
                return Err(CollaboratorError::Unavailable("rate limited".into()));
            }
            StatusCode::UNAUTHORIZED => {
                error!("Grok API unauthorized - check API key");
                return Err(CollaboratorError::Unavailable("unauthorized".into()));
            }
            status => {
                let detail = response.text().await.unwrap_or_default();
                error!("Grok API error {}: {}", status, detail);
                return Err(CollaboratorError::Transport(format!("Grok API error: {}", status)));
            }
        }

        let data: ChatResponse = response.json().await?;
        let content = data
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        debug!("Grok reply: {} chars", content.len());
        Ok(content)
    }
}

#[async_trait]
impl SentimentSearch for GrokClient {
    async fn search_and_classify(&self, address: &str) -> Result<Classification, CollaboratorError> {
        let prompt = format!(
            "Search Twitter right now for live posts about the Solana token with contract address {address}.\n\
             Only consider posts from the last 24-48 hours.\n\n\
             Bullish signals: buying, accumulating, holding, positive price predictions, growing buzz.\n\
             Bearish signals: selling, dump worries, scam or rug accusations, loss posts, dead project talk.\n\
             Neutral signals: mixed opinions, low activity, purely informational posts.\n\n\
             Respond in this exact format:\n\
             SENTIMENT: [Bullish/Bearish/Neutral]\n\
             EXPLANATION: [3-4 sentences on what the live posts show]\n\
             TWEET_COUNT: [number of relevant posts analyzed]"
        );

        let body = json!({
            "model": self.search_model,
            "messages": [
                {"role": "system", "content": SEARCH_SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "stream": false,
            "temperature": 0.4,
            "max_tokens": 1200,
            "web_search": true,
        });

        let content = self.complete(body).await?;
        Ok(parse_search_reply(&content))
    }
}

#[async_trait]
impl SentimentClassifier for GrokClient {
    async fn classify(
        &self,
        address: &str,
        mentions: &str,
    ) -> Result<(SentimentLabel, String), CollaboratorError> {
        let prompt = format!(
            "Analyze these tweets for bullish/bearish sentiment on this Solana memecoin.\n\n\
             Contract Address: {address}\n\n\
             Recent Tweets to analyze:\n{mentions}\n\n\
             Respond in this exact format:\n\
             SENTIMENT: [Bullish/Bearish/Neutral]\n\
             EXPLANATION: [3-4 line explanation]"
        );

        let body = json!({
            "model": self.classify_model,
            "messages": [
                {"role": "system", "content": CLASSIFY_SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "stream": false,
            "temperature": 0.3,
            "max_tokens": 500,
        });

        let content = self.complete(body).await?;
        Ok(parse_classification_reply(&content))
    }
}

/// Evidence credited to a reply that leaves out `TWEET_COUNT`. No count is
/// guessed, so such a reply always falls under the evidence floor.
pub const MISSING_COUNT_EVIDENCE: u32 = 0;

/// Read a `SENTIMENT:` / `EXPLANATION:` / `TWEET_COUNT:` reply. The
/// explanation may continue over several lines.
pub fn parse_search_reply(content: &str) -> Classification {
    let (label, explanation) = parse_classification_reply(content);
    let evidence_count = content
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("TWEET_COUNT:"))
        .and_then(first_number)
        .unwrap_or(MISSING_COUNT_EVIDENCE);

    Classification {
        label,
        explanation,
        evidence_count,
    }
}

pub fn parse_classification_reply(content: &str) -> (SentimentLabel, String) {
    let lines: Vec<&str> = content.lines().map(str::trim).collect();

    let label = lines
        .iter()
        .find_map(|line| line.strip_prefix("SENTIMENT:"))
        .map(SentimentLabel::from_classifier);

    let explanation = lines
        .iter()
        .position(|line| line.starts_with("EXPLANATION:"))
        .map(|start| {
            let mut parts = vec![lines[start].trim_start_matches("EXPLANATION:").trim()];
            parts.extend(
                lines[start + 1..]
                    .iter()
                    .take_while(|line| !line.starts_with("TWEET_COUNT:") && !line.starts_with("SENTIMENT:"))
                    .filter(|line| !line.is_empty()),
            );
            parts.retain(|p| !p.is_empty());
            parts.join(" ")
        })
        .filter(|text| !text.is_empty());

    match (label, explanation) {
        (Some(label), Some(explanation)) => (label, explanation),
        (Some(label), None) => (label, "No explanation provided".to_string()),
        (None, explanation) => {
            // free-form reply: look for the keywords anywhere
            let label = SentimentLabel::from_classifier(content);
            let explanation = explanation.unwrap_or_else(|| summarize(content));
            (label, explanation)
        }
    }
}

fn first_number(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// First three sentences, capped at 300 characters
fn summarize(content: &str) -> String {
    let summary = content
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(3)
        .collect::<Vec<_>>()
        .join(". ");
    if summary.chars().count() > 300 {
        let cut: String = summary.chars().take(297).collect();
        format!("{}...", cut)
    } else if summary.is_empty() {
        "Unable to determine sentiment".to_string()
    } else {
        summary
    }
}
