use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::evaluator::select_matches_within;
use crate::cache::{CacheCategory, ResultCache};
use crate::client::ListingSource;
use crate::core::{validate_contract_address, ListingRecord};
use crate::error::{CollaboratorError, ScoutError};
use crate::filter::{resolve_request, AgeWindow, FilterRequest};

/// Cache params for the shared listing snapshot. The snapshot is fetched
/// unfiltered and filters are applied after the read, so every request
/// shares one entry.
const LISTING_SNAPSHOT: &str = "trending";

pub const RESULTS_PER_PAGE: usize = 15;

/// Result of a listing search; an empty match is a success, not a failure
#[derive(Debug, Clone, PartialEq)]
pub enum ListingOutcome {
    Matches(Vec<ListingRecord>),
    NoMatches,
}

impl ListingOutcome {
    pub fn len(&self) -> usize {
        match self {
            ListingOutcome::Matches(records) => records.len(),
            ListingOutcome::NoMatches => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&self) -> &[ListingRecord] {
        match self {
            ListingOutcome::Matches(records) => records,
            ListingOutcome::NoMatches => &[],
        }
    }

    pub fn page_count(&self, per_page: usize) -> usize {
        self.len().div_ceil(per_page.max(1))
    }

    /// One page of matches, numbered from 1. `None` past the last page.
    pub fn page(&self, number: usize, per_page: usize) -> Option<&[ListingRecord]> {
        let per_page = per_page.max(1);
        if number == 0 || number > self.page_count(per_page) {
            return None;
        }
        let records = self.records();
        let start = (number - 1) * per_page;
        let end = (start + per_page).min(records.len());
        Some(&records[start..end])
    }
}

/// Filtered, cached access to market listings
pub struct ScoutService {
    cache: Arc<ResultCache>,
    source: Arc<dyn ListingSource>,
    address_length: usize,
    age_window: AgeWindow,
}

impl ScoutService {
    pub fn new(cache: Arc<ResultCache>, source: Arc<dyn ListingSource>, address_length: usize) -> Self {
        Self {
            cache,
            source,
            address_length,
            age_window: AgeWindow::default(),
        }
    }

    /// Only listings whose discovery age falls inside `window` can match
    pub fn with_age_window(mut self, window: AgeWindow) -> Self {
        self.age_window = window;
        self
    }

    /// Resolve the request, read listings through the cache and return the
    /// ranked matches
    pub async fn search(&self, request: &FilterRequest) -> Result<ListingOutcome, ScoutError> {
        let filters = resolve_request(request)?;
        info!("🔍 Scouting listings with {}", filters);

        let listings = self.listings().await.map_err(|e| {
            warn!("Listing fetch failed: {}", e);
            ScoutError::Listing(e)
        })?;
        let total = listings.len();
        let matched = select_matches_within(&filters, &self.age_window, listings, Utc::now());

        info!("✅ {} of {} listings match", matched.len(), total);
        if matched.is_empty() {
            Ok(ListingOutcome::NoMatches)
        } else {
            Ok(ListingOutcome::Matches(matched))
        }
    }

    /// Market data for one contract address; `None` when the provider does
    /// not know the token
    pub async fn token_details(&self, address: &str) -> Result<Option<ListingRecord>, ScoutError> {
        let address = validate_contract_address(address, self.address_length)?;
        let source = Arc::clone(&self.source);

        let details = self
            .cache
            .get_or_fetch(CacheCategory::TokenDetail, &[address], || async move {
                source.fetch_token(address).await
            })
            .await?;
        Ok(details)
    }

    async fn listings(&self) -> Result<Vec<ListingRecord>, CollaboratorError> {
        let source = Arc::clone(&self.source);
        self.cache
            .get_or_fetch(CacheCategory::Listings, &[LISTING_SNAPSHOT], || async move {
                source.fetch_listings(None).await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlPolicy;
    use crate::core::CONTRACT_ADDRESS_LEN;
    use crate::filter::FilterSet;
    use crate::scout::evaluator::select_matches;
    use crate::scout::evaluator::tests::record;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ADDRESS: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    struct MockSource {
        listings: Vec<ListingRecord>,
        fail: bool,
        listing_calls: AtomicUsize,
        token_calls: AtomicUsize,
    }

    impl MockSource {
        fn new(listings: Vec<ListingRecord>) -> Self {
            Self {
                listings,
                fail: false,
                listing_calls: AtomicUsize::new(0),
                token_calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self { fail: true, ..Self::new(vec![]) }
        }
    }

    #[async_trait]
    impl ListingSource for MockSource {
        async fn fetch_listings(
            &self,
            _filters: Option<&FilterSet>,
        ) -> Result<Vec<ListingRecord>, CollaboratorError> {
            self.listing_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CollaboratorError::Transport("connection reset".into()));
            }
            Ok(self.listings.clone())
        }

        async fn fetch_token(&self, address: &str) -> Result<Option<ListingRecord>, CollaboratorError> {
            self.token_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.listings.iter().find(|r| r.token_address == address).cloned())
        }
    }

    /// Narrows its answer to the filters it is handed
    struct NarrowingSource {
        listings: Vec<ListingRecord>,
    }

    #[async_trait]
    impl ListingSource for NarrowingSource {
        async fn fetch_listings(
            &self,
            filters: Option<&FilterSet>,
        ) -> Result<Vec<ListingRecord>, CollaboratorError> {
            Ok(match filters {
                Some(filters) => select_matches(filters, self.listings.clone()),
                None => self.listings.clone(),
            })
        }

        async fn fetch_token(&self, _address: &str) -> Result<Option<ListingRecord>, CollaboratorError> {
            Ok(None)
        }
    }

    fn service(source: Arc<MockSource>) -> ScoutService {
        let cache = Arc::new(ResultCache::new(TtlPolicy::default()));
        ScoutService::new(cache, source, CONTRACT_ADDRESS_LEN)
    }

    fn market() -> Vec<ListingRecord> {
        let now = Utc::now();
        vec![
            record("OLD", now - Duration::hours(2), 900_000.0),
            record("NEW", now, 300_000.0),
            record("TINY", now, 5_000.0),
        ]
    }

    #[tokio::test]
    async fn test_search_returns_ranked_matches() {
        let source = Arc::new(MockSource::new(market()));
        let scout = service(source.clone());

        let outcome = scout
            .search(&FilterRequest::Text("mc > 100k".into()))
            .await
            .unwrap();
        match outcome {
            ListingOutcome::Matches(records) => {
                let symbols: Vec<_> = records.iter().map(|r| r.symbol.as_str()).collect();
                assert_eq!(symbols, vec!["NEW", "OLD"]);
            }
            ListingOutcome::NoMatches => panic!("expected matches"),
        }

        // second request with different filters reuses the cached snapshot
        let outcome = scout
            .search(&FilterRequest::Preset("small_cap".into()))
            .await
            .unwrap();
        assert_eq!(outcome.len(), 3);
        assert_eq!(source.listing_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_matches_is_not_an_error() {
        let scout = service(Arc::new(MockSource::new(market())));
        let outcome = scout
            .search(&FilterRequest::Text("mc > 5b".into()))
            .await
            .unwrap();
        assert_eq!(outcome, ListingOutcome::NoMatches);
    }

    #[tokio::test]
    async fn test_listing_failure_surfaces_and_is_not_cached() {
        let source = Arc::new(MockSource::failing());
        let scout = service(source.clone());

        for _ in 0..2 {
            let err = scout
                .search(&FilterRequest::Text("vol > 1k".into()))
                .await
                .unwrap_err();
            assert!(matches!(err, ScoutError::Listing(_)));
        }
        assert_eq!(source.listing_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_preset_makes_no_call() {
        let source = Arc::new(MockSource::new(market()));
        let scout = service(source.clone());

        let err = scout
            .search(&FilterRequest::Preset("lambo".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, ScoutError::Parse(_)));
        assert_eq!(source.listing_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_token_details_validates_and_caches() {
        let mut listings = market();
        listings[0].token_address = ADDRESS.to_string();
        let source = Arc::new(MockSource::new(listings));
        let scout = service(source.clone());

        let err = scout.token_details("not-an-address").await.unwrap_err();
        assert!(matches!(err, ScoutError::Validation(_)));
        assert_eq!(source.token_calls.load(Ordering::SeqCst), 0);

        let first = scout.token_details(ADDRESS).await.unwrap();
        let second = scout.token_details(ADDRESS).await.unwrap();
        assert_eq!(first.map(|r| r.symbol), Some("OLD".to_string()));
        assert_eq!(second.map(|r| r.symbol), Some("OLD".to_string()));
        assert_eq!(source.token_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shared_snapshot_is_not_narrowed_by_first_filters() {
        let cache = Arc::new(ResultCache::new(TtlPolicy::default()));
        let source = Arc::new(NarrowingSource { listings: market() });
        let scout = ScoutService::new(cache, source, CONTRACT_ADDRESS_LEN);

        let big = scout
            .search(&FilterRequest::Text("mc > 100k".into()))
            .await
            .unwrap();
        assert_eq!(big.len(), 2);

        let small = scout
            .search(&FilterRequest::Text("mc < 10k".into()))
            .await
            .unwrap();
        let symbols: Vec<_> = small.records().iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["TINY"]);
    }

    #[tokio::test]
    async fn test_age_window_limits_matches() {
        let now = Utc::now();
        let mut listings = market();
        listings.push(record("STALE", now - Duration::days(8), 2_000_000.0));
        let source = Arc::new(MockSource::new(listings));

        let scout = service(source.clone());
        let outcome = scout
            .search(&FilterRequest::Text("mc > 1m".into()))
            .await
            .unwrap();
        assert_eq!(outcome, ListingOutcome::NoMatches);

        let scout = service(source).with_age_window(AgeWindow::minutes(60, None));
        let outcome = scout
            .search(&FilterRequest::Text("mc > 100k".into()))
            .await
            .unwrap();
        let symbols: Vec<_> = outcome.records().iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["OLD", "STALE"]);
    }

    #[test]
    fn test_pages_of_fifteen() {
        let now = Utc::now();
        let records: Vec<_> = (0..32)
            .map(|i| record(&format!("T{}", i), now - Duration::minutes(i), 50_000.0))
            .collect();
        let outcome = ListingOutcome::Matches(records);

        assert_eq!(outcome.page_count(RESULTS_PER_PAGE), 3);
        assert_eq!(outcome.page(1, RESULTS_PER_PAGE).unwrap().len(), 15);
        assert_eq!(outcome.page(2, RESULTS_PER_PAGE).unwrap()[0].symbol, "T15");
        assert_eq!(outcome.page(3, RESULTS_PER_PAGE).unwrap().len(), 2);
        assert!(outcome.page(0, RESULTS_PER_PAGE).is_none());
        assert!(outcome.page(4, RESULTS_PER_PAGE).is_none());

        assert_eq!(ListingOutcome::NoMatches.page_count(RESULTS_PER_PAGE), 0);
        assert!(ListingOutcome::NoMatches.page(1, RESULTS_PER_PAGE).is_none());
    }
}
