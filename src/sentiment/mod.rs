//! Sentiment orchestration over the social search and inference collaborators

pub mod orchestrator;

pub use orchestrator::{SentimentCollaborators, SentimentOrchestrator};
