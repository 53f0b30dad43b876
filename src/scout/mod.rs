//! Listing discovery: filter evaluation and ranked, cached listing search

pub mod evaluator;
pub mod service;

pub use evaluator::{matches, rank, select_matches, select_matches_within};
pub use service::{ListingOutcome, ScoutService, RESULTS_PER_PAGE};
