//! Error taxonomy shared by the filter, cache and sentiment layers

use std::time::Duration;
use thiserror::Error;

/// Failures while turning user text into filter constraints
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("invalid quantity: {0:?}")]
    InvalidQuantity(String),

    #[error("unresolvable filter: {0:?}")]
    UnresolvableFilter(String),
}

/// Input rejected before any external call is attempted
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("bad contract address: {0:?}")]
    BadAddress(String),
}

/// Failures reported by the market-data, social and inference collaborators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not report the configured limit back
            CollaboratorError::Timeout(Duration::ZERO)
        } else {
            CollaboratorError::Transport(err.to_string())
        }
    }
}

/// Cache storage problems. Never surfaced to users; the cache degrades to a
/// pass-through fetch instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("cache storage unavailable: {0}")]
    Unavailable(String),

    #[error("cache payload codec error: {0}")]
    Codec(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Codec(err.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SentimentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("sentiment analysis failed (search: {search}; legacy: {legacy})")]
    Failed {
        search: CollaboratorError,
        legacy: CollaboratorError,
    },
}

impl SentimentError {
    pub fn user_message(&self) -> String {
        match self {
            SentimentError::Validation(_) => {
                "❌ Invalid contract address. Please send a valid Solana token address.".to_string()
            }
            SentimentError::Failed { .. } => {
                "⚠️ Could not complete the sentiment analysis right now. Please try again later."
                    .to_string()
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoutError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("listing fetch failed: {0}")]
    Listing(#[from] CollaboratorError),
}

impl ScoutError {
    pub fn user_message(&self) -> String {
        match self {
            ScoutError::Parse(ParseError::InvalidQuantity(raw)) => {
                format!("❌ '{}' is not a valid amount. Try values like 100k, 1.5m or 2b.", raw)
            }
            ScoutError::Parse(ParseError::UnresolvableFilter(raw)) => {
                format!("❌ Unknown filter '{}'.", raw)
            }
            ScoutError::Validation(_) => {
                "❌ Invalid contract address. Please send a valid Solana token address.".to_string()
            }
            ScoutError::Listing(_) => {
                "⚠️ Could not complete the request: market data is unavailable. Please try again."
                    .to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_distinguish_failure_kinds() {
        let invalid = ScoutError::from(ParseError::InvalidQuantity("12x".into()));
        assert!(invalid.user_message().contains("12x"));

        let transport = ScoutError::from(CollaboratorError::Transport("503".into()));
        assert!(transport.user_message().contains("try again"));

        let failed = SentimentError::Failed {
            search: CollaboratorError::Timeout(Duration::from_secs(60)),
            legacy: CollaboratorError::Transport("reset".into()),
        };
        assert!(failed.user_message().contains("try again"));
        assert!(failed.to_string().contains("legacy"));
    }
}
