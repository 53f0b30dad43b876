use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use crate::cache::{CacheCategory, ResultCache};
use crate::client::{MentionSource, SentimentClassifier, SentimentSearch};
use crate::config::SentimentSettings;
use crate::core::{
    validate_contract_address, Classification, SentimentLabel, SentimentVerdict, VerdictSource,
};
use crate::error::{CollaboratorError, SentimentError};

/// Collaborators the orchestrator sequences
pub struct SentimentCollaborators {
    pub search: Arc<dyn SentimentSearch>,
    pub mentions: Arc<dyn MentionSource>,
    pub classifier: Arc<dyn SentimentClassifier>,
}

/// Contract address in, cached sentiment verdict out.
///
/// The combined search call is tried first under the search deadline; on
/// timeout or failure the legacy mention fetch plus classification runs
/// once. Verdicts are cached only when one of the two paths succeeds.
pub struct SentimentOrchestrator {
    cache: Arc<ResultCache>,
    collaborators: SentimentCollaborators,
    min_evidence: u32,
    address_length: usize,
    search_timeout: Duration,
    legacy_timeout: Duration,
}

impl SentimentOrchestrator {
    pub fn new(
        cache: Arc<ResultCache>,
        collaborators: SentimentCollaborators,
        settings: &SentimentSettings,
    ) -> Self {
        Self {
            cache,
            collaborators,
            min_evidence: settings.min_evidence,
            address_length: settings.address_length,
            search_timeout: settings.search_timeout(),
            legacy_timeout: settings.legacy_timeout(),
        }
    }

    pub fn with_timeouts(mut self, search: Duration, legacy: Duration) -> Self {
        self.search_timeout = search;
        self.legacy_timeout = legacy;
        self
    }

    #[instrument(skip(self))]
    pub async fn analyze(&self, address: &str) -> Result<SentimentVerdict, SentimentError> {
        let address = validate_contract_address(address, self.address_length)?;

        self.cache
            .get_or_fetch(CacheCategory::Sentiment, &[address], || self.run(address))
            .await
    }

    async fn run(&self, address: &str) -> Result<SentimentVerdict, SentimentError> {
        info!("🔎 Analyzing sentiment for {}", address);

        let (classification, source) = match self.search(address).await {
            Ok(classification) => (classification, VerdictSource::WebSearch),
            Err(search) => {
                warn!("Web search sentiment failed ({}), falling back to legacy search", search);
                match self.legacy(address).await {
                    Ok(classification) => (classification, VerdictSource::LegacySearch),
                    Err(legacy) => {
                        warn!("❌ Legacy sentiment path failed too: {}", legacy);
                        return Err(SentimentError::Failed { search, legacy });
                    }
                }
            }
        };

        let verdict = self.evaluate(address, classification, source);
        info!(
            "{} {} sentiment for {} from {} mentions",
            verdict.label.emoji(),
            verdict.label,
            address,
            verdict.evidence_count
        );
        Ok(verdict)
    }

    async fn search(&self, address: &str) -> Result<Classification, CollaboratorError> {
        with_deadline(
            self.search_timeout,
            self.collaborators.search.search_and_classify(address),
        )
        .await
    }

    async fn legacy(&self, address: &str) -> Result<Classification, CollaboratorError> {
        let mentions = with_deadline(
            self.legacy_timeout,
            self.collaborators.mentions.fetch_raw_mentions(address),
        )
        .await?;

        if mentions.is_empty() {
            return Ok(Classification {
                label: SentimentLabel::Neutral,
                explanation: "No recent mentions found for this token.".to_string(),
                evidence_count: 0,
            });
        }

        let (label, explanation) = with_deadline(
            self.legacy_timeout,
            self.collaborators.classifier.classify(address, &mentions.text),
        )
        .await?;

        Ok(Classification {
            label,
            explanation,
            evidence_count: mentions.count,
        })
    }

    /// The evidence floor overrides whatever the classifier said
    fn evaluate(
        &self,
        address: &str,
        classification: Classification,
        source: VerdictSource,
    ) -> SentimentVerdict {
        let label = if classification.evidence_count < self.min_evidence {
            SentimentLabel::InsufficientData
        } else {
            classification.label
        };

        SentimentVerdict {
            address: address.to_string(),
            label,
            explanation: classification.explanation,
            evidence_count: classification.evidence_count,
            source,
            analyzed_at: Utc::now(),
        }
    }
}

async fn with_deadline<T, F>(limit: Duration, call: F) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlPolicy;
    use crate::core::RawMentions;
    use crate::error::ValidationError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ADDRESS: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    enum SearchBehavior {
        Reply(SentimentLabel, u32),
        Fail,
        Hang,
    }

    struct MockSearch {
        behavior: SearchBehavior,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SentimentSearch for MockSearch {
        async fn search_and_classify(&self, _address: &str) -> Result<Classification, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                SearchBehavior::Reply(label, evidence_count) => Ok(Classification {
                    label,
                    explanation: "Posts are mostly about buying the dip.".to_string(),
                    evidence_count,
                }),
                SearchBehavior::Fail => Err(CollaboratorError::Transport("502 bad gateway".into())),
                SearchBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Err(CollaboratorError::Transport("unreachable".into()))
                }
            }
        }
    }

    struct MockMentions {
        mentions: Option<RawMentions>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MentionSource for MockMentions {
        async fn fetch_raw_mentions(&self, _address: &str) -> Result<RawMentions, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.mentions
                .clone()
                .ok_or_else(|| CollaboratorError::Unavailable("no bearer token".into()))
        }
    }

    struct MockClassifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SentimentClassifier for MockClassifier {
        async fn classify(
            &self,
            _address: &str,
            _mentions: &str,
        ) -> Result<(SentimentLabel, String), CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((SentimentLabel::Bearish, "Holders complain about a dump.".to_string()))
        }
    }

    struct Harness {
        search: Arc<MockSearch>,
        mentions: Arc<MockMentions>,
        classifier: Arc<MockClassifier>,
        cache: Arc<ResultCache>,
        orchestrator: SentimentOrchestrator,
    }

    impl Harness {
        fn new(behavior: SearchBehavior, mentions: Option<RawMentions>) -> Self {
            let search = Arc::new(MockSearch {
                behavior,
                calls: AtomicUsize::new(0),
            });
            let mentions = Arc::new(MockMentions {
                mentions,
                calls: AtomicUsize::new(0),
            });
            let classifier = Arc::new(MockClassifier {
                calls: AtomicUsize::new(0),
            });
            let cache = Arc::new(ResultCache::new(TtlPolicy::default()));
            let orchestrator = SentimentOrchestrator::new(
                cache.clone(),
                SentimentCollaborators {
                    search: search.clone(),
                    mentions: mentions.clone(),
                    classifier: classifier.clone(),
                },
                &SentimentSettings::default(),
            )
            .with_timeouts(Duration::from_millis(50), Duration::from_millis(50));

            Self {
                search,
                mentions,
                classifier,
                cache,
                orchestrator,
            }
        }

        fn external_calls(&self) -> usize {
            self.search.calls.load(Ordering::SeqCst)
                + self.mentions.calls.load(Ordering::SeqCst)
                + self.classifier.calls.load(Ordering::SeqCst)
        }
    }

    fn twelve_mentions() -> Option<RawMentions> {
        Some(RawMentions {
            text: "Tweet 1: dumping my bag".to_string(),
            count: 12,
        })
    }

    #[tokio::test]
    async fn test_directional_verdict_from_search() {
        let h = Harness::new(SearchBehavior::Reply(SentimentLabel::Bullish, 20), None);
        let verdict = h.orchestrator.analyze(ADDRESS).await.unwrap();

        assert_eq!(verdict.label, SentimentLabel::Bullish);
        assert_eq!(verdict.evidence_count, 20);
        assert_eq!(verdict.source, VerdictSource::WebSearch);
        assert_eq!(h.mentions.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_evidence_floor_overrides_bullish() {
        let h = Harness::new(SearchBehavior::Reply(SentimentLabel::Bullish, 3), None);
        let verdict = h.orchestrator.analyze(ADDRESS).await.unwrap();

        assert_eq!(verdict.label, SentimentLabel::InsufficientData);
        assert_eq!(verdict.evidence_count, 3);
    }

    #[tokio::test]
    async fn test_floor_boundary_is_directional() {
        let h = Harness::new(SearchBehavior::Reply(SentimentLabel::Bearish, 5), None);
        let verdict = h.orchestrator.analyze(ADDRESS).await.unwrap();
        assert_eq!(verdict.label, SentimentLabel::Bearish);
    }

    #[tokio::test]
    async fn test_bad_address_makes_no_external_call() {
        let h = Harness::new(SearchBehavior::Reply(SentimentLabel::Bullish, 20), twelve_mentions());

        for bad in ["", "short", "0PjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"] {
            let err = h.orchestrator.analyze(bad).await.unwrap_err();
            assert_eq!(err, SentimentError::Validation(ValidationError::BadAddress(bad.to_string())));
        }
        assert_eq!(h.external_calls(), 0);
    }

    #[tokio::test]
    async fn test_search_timeout_falls_back_to_legacy() {
        let h = Harness::new(SearchBehavior::Hang, twelve_mentions());
        let verdict = h.orchestrator.analyze(ADDRESS).await.unwrap();

        assert_eq!(verdict.source, VerdictSource::LegacySearch);
        assert_eq!(verdict.label, SentimentLabel::Bearish);
        assert_eq!(verdict.evidence_count, 12);
        assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_legacy_without_mentions_is_insufficient() {
        let empty = Some(RawMentions::default());
        let h = Harness::new(SearchBehavior::Fail, empty);
        let verdict = h.orchestrator.analyze(ADDRESS).await.unwrap();

        assert_eq!(verdict.label, SentimentLabel::InsufficientData);
        assert_eq!(h.classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_both_paths_failing_caches_nothing() {
        let h = Harness::new(SearchBehavior::Fail, None);

        let err = h.orchestrator.analyze(ADDRESS).await.unwrap_err();
        match err {
            SentimentError::Failed { search, legacy } => {
                assert!(matches!(search, CollaboratorError::Transport(_)));
                assert!(matches!(legacy, CollaboratorError::Unavailable(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(h
            .cache
            .lookup::<SentimentVerdict>(CacheCategory::Sentiment, &[ADDRESS])
            .is_none());

        // nothing cached, so the next request tries again
        let _ = h.orchestrator.analyze(ADDRESS).await;
        assert_eq!(h.search.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cached_verdict_skips_collaborators() {
        let h = Harness::new(SearchBehavior::Reply(SentimentLabel::Neutral, 9), None);

        let first = h.orchestrator.analyze(ADDRESS).await.unwrap();
        // surrounding whitespace resolves to the same cache entry
        let second = h.orchestrator.analyze(&format!(" {} ", ADDRESS)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(h.search.calls.load(Ordering::SeqCst), 1);
    }
}
