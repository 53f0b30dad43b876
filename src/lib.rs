// Criteria filters and parsing
pub mod filter;

// Shared result cache
pub mod cache;

// Collaborator contracts and HTTP adapters
pub mod client;

// Listing search and sentiment orchestration
pub mod scout;
pub mod sentiment;

pub mod config;
pub mod core;
pub mod error;

// Re-export commonly used types for convenience
pub use crate::core::*;
pub use error::{CollaboratorError, ParseError, ScoutError, SentimentError, ValidationError};
pub use filter::{parse_filter, FilterParser, FilterRequest, FilterSet};
pub use scout::{ListingOutcome, ScoutService};
pub use sentiment::SentimentOrchestrator;
