//! Twitter v2 recent-search adapter used by the legacy sentiment path

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use super::MentionSource;
use crate::config::ApiSettings;
use crate::core::RawMentions;
use crate::error::CollaboratorError;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    text: String,
}

pub struct TwitterClient {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
    limit: usize,
    days_back: i64,
}

impl TwitterClient {
    pub fn new(api: &ApiSettings, timeout: Duration) -> Result<Self, CollaboratorError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: api.twitter_base_url.clone(),
            bearer_token: api.twitter_bearer_token.clone(),
            limit: api.mention_limit,
            days_back: api.mention_days_back,
        })
    }
}

#[async_trait]
impl MentionSource for TwitterClient {
    async fn fetch_raw_mentions(&self, address: &str) -> Result<RawMentions, CollaboratorError> {
        let token = self
            .bearer_token
            .as_deref()
            .ok_or_else(|| CollaboratorError::Unavailable("TWITTER_BEARER_TOKEN not configured".into()))?;

        let start_time = (Utc::now() - ChronoDuration::days(self.days_back))
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let query = search_query(address);
        let max_results = self.limit.clamp(10, 100).to_string();

        let response = self
            .client
            .get(format!("{}/tweets/search/recent", self.base_url))
            .bearer_auth(token)
            .query(&[
                ("query", query.as_str()),
                ("max_results", max_results.as_str()),
                ("start_time", start_time.as_str()),
                ("tweet.fields", "created_at,public_metrics,lang"),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Twitter API rate limit exceeded");
                return Err(CollaboratorError::Unavailable("rate limited".into()));
            }
            status => {
                return Err(CollaboratorError::Transport(format!("Twitter API error: {}", status)));
            }
        }

        let body: SearchResponse = response.json().await?;
        let texts: Vec<String> = body
            .data
            .iter()
            .map(|tweet| clean_tweet_text(&tweet.text))
            .filter(|text| !text.is_empty())
            .collect();

        info!("🐦 Fetched {} tweets for {}", texts.len(), address);
        Ok(join_mentions(&texts))
    }
}

/// Full address plus its leading and trailing ten characters, since posts
/// often truncate long addresses
fn search_query(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 20 {
        return format!("{} -is:retweet lang:en", address);
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 10..].iter().collect();
    format!("({} OR {} OR {}) -is:retweet lang:en", address, head, tail)
}

fn clean_tweet_text(text: &str) -> String {
    text.split_whitespace()
        .filter(|word| !word.starts_with("http://") && !word.starts_with("https://"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_mentions(texts: &[String]) -> RawMentions {
    let text = texts
        .iter()
        .enumerate()
        .map(|(i, t)| format!("Tweet {}: {}", i + 1, t))
        .collect::<Vec<_>>()
        .join("\n");
    RawMentions {
        text,
        count: texts.len() as u32,
    }
}
