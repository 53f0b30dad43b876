use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::core::ListingRecord;
use crate::filter::{AgeWindow, FilterSet};

/// A record matches only when every constraint accepts it. An empty set
/// matches everything.
pub fn matches(filters: &FilterSet, record: &ListingRecord) -> bool {
    filters
        .iter()
        .all(|constraint| constraint.accepts(record.metric_value(constraint.metric)))
}

/// Newest discovery first, then larger market cap
pub fn rank(a: &ListingRecord, b: &ListingRecord) -> Ordering {
    b.discovered_at
        .cmp(&a.discovered_at)
        .then_with(|| b.market_cap.total_cmp(&a.market_cap))
}

/// Keep the matching records, ranked
pub fn select_matches(filters: &FilterSet, records: Vec<ListingRecord>) -> Vec<ListingRecord> {
    select_matches_within(filters, &AgeWindow::unbounded(), records, Utc::now())
}

/// As [`select_matches`], also dropping records whose age at `now` falls
/// outside `window`
pub fn select_matches_within(
    filters: &FilterSet,
    window: &AgeWindow,
    records: Vec<ListingRecord>,
    now: DateTime<Utc>,
) -> Vec<ListingRecord> {
    let mut matched: Vec<ListingRecord> = records
        .into_iter()
        .filter(|record| window.accepts(record.discovered_at, now) && matches(filters, record))
        .collect();
    matched.sort_by(rank);
    matched
}
