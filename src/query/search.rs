//! Plain similarity search.

use super::{Query, RequestGate, RetrievalParams, Submission, SubmissionState};
use crate::api::{Backend, RetrievalRequest, SearchResultItem};
use crate::error::Result;
use crate::notify::{Notice, Notifier};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, instrument, warn};

/// Coarse label for a similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchQuality {
    Excellent,
    Good,
    Low,
}

impl MatchQuality {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            MatchQuality::Excellent
        } else if score >= 0.6 {
            MatchQuality::Good
        } else {
            MatchQuality::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MatchQuality::Excellent => "Excellent Match",
            MatchQuality::Good => "Good Match",
            MatchQuality::Low => "Low Match",
        }
    }
}

impl std::fmt::Display for MatchQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Runs searches and holds the latest result list.
///
/// Failures are reported through the [`Notifier`]; the result list is simply emptied.
pub struct SearchOrchestrator {
    backend: Arc<dyn Backend>,
    notifier: Arc<dyn Notifier>,
    gate: RequestGate,
    params: RetrievalParams,
    results: RwLock<Vec<SearchResultItem>>,
}

impl SearchOrchestrator {
    pub fn new(backend: Arc<dyn Backend>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend,
            notifier,
            gate: RequestGate::default(),
            params: RetrievalParams::SEARCH,
            results: RwLock::new(Vec::new()),
        }
    }

    pub fn with_params(mut self, params: RetrievalParams) -> Self {
        self.params = params;
        self
    }

    pub fn state(&self) -> SubmissionState {
        self.gate.state()
    }

    /// The results of the last settled search.
    pub fn results(&self) -> Vec<SearchResultItem> {
        self.results
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn reset(&self) {
        self.gate.reset();
    }

    #[instrument(skip(self, query))]
    pub async fn search(&self, query: &Query) -> Result<Submission<Vec<SearchResultItem>>> {
        let text = query.validated_text()?.to_string();
        let token = self.gate.begin("search")?;
        info!(token, "Searching: {}", text);

        let request = RetrievalRequest {
            query: text,
            book_ids: query.book_filter(),
            top_k: self.params.top_k,
            min_similarity: self.params.min_similarity,
        };

        let (items, state, failure) = match self.backend.search(&request).await {
            Ok(items) => {
                debug!(hits = items.len(), "Search returned");
                (items, SubmissionState::Success, None)
            }
            Err(e) => {
                let message = e.user_message();
                warn!(token, "Search failed: {}", message);
                (Vec::new(), SubmissionState::Error(message.clone()), Some(message))
            }
        };

        let applied = self.gate.settle(token, state, || {
            *self.results.write().unwrap_or_else(PoisonError::into_inner) = items.clone();
        });
        if !applied {
            debug!(token, "Discarding results for an abandoned search");
            return Ok(Submission::Discarded);
        }

        if let Some(message) = failure {
            self.notifier
                .notify(Notice::error(format!("Search failed: {}", message)));
        }

        Ok(Submission::Settled(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeBackend;
    use crate::api::ApiError;
    use crate::error::LecternError;
    use crate::notify::testing::RecordingNotifier;
    use crate::notify::NoticeLevel;

    fn hit(chunk_id: &str, score: f64) -> SearchResultItem {
        SearchResultItem {
            chunk_id: chunk_id.to_string(),
            book_id: "B1".to_string(),
            book_filename: "bio.pdf".to_string(),
            similarity_score: score,
            content: "Cells divide by mitosis.".to_string(),
            page: Some(12),
            ..Default::default()
        }
    }

    fn orchestrator() -> (Arc<FakeBackend>, Arc<RecordingNotifier>, Arc<SearchOrchestrator>) {
        let backend = Arc::new(FakeBackend::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let search = Arc::new(SearchOrchestrator::new(backend.clone(), notifier.clone()));
        (backend, notifier, search)
    }

    #[test]
    fn test_match_quality_thresholds() {
        assert_eq!(MatchQuality::from_score(0.95), MatchQuality::Excellent);
        assert_eq!(MatchQuality::from_score(0.8), MatchQuality::Excellent);
        assert_eq!(MatchQuality::from_score(0.79), MatchQuality::Good);
        assert_eq!(MatchQuality::from_score(0.6), MatchQuality::Good);
        assert_eq!(MatchQuality::from_score(0.59), MatchQuality::Low);
        assert_eq!(MatchQuality::from_score(0.0).label(), "Low Match");
    }

    #[tokio::test]
    async fn test_blank_search_sends_nothing() {
        let (backend, notifier, search) = orchestrator();

        let err = search.search(&Query::new("  ")).await.unwrap_err();
        assert!(matches!(err, LecternError::InvalidInput(_)));
        assert_eq!(backend.call_count(), 0);
        assert!(notifier.notices().is_empty());
        assert_eq!(search.state(), SubmissionState::Idle);
    }

    #[tokio::test]
    async fn test_success_replaces_results() {
        let (backend, notifier, search) = orchestrator();
        *backend.search_results.lock().unwrap() = Ok(vec![hit("c1", 0.91), hit("c2", 0.42)]);

        let items = search
            .search(&Query::new("mitosis"))
            .await
            .unwrap()
            .settled()
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(search.results(), items);
        assert_eq!(search.state(), SubmissionState::Success);
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn test_failure_empties_results_and_notifies() {
        let (backend, notifier, search) = orchestrator();
        *backend.search_results.lock().unwrap() = Ok(vec![hit("c1", 0.91)]);
        search.search(&Query::new("mitosis")).await.unwrap();

        *backend.search_results.lock().unwrap() = Err(ApiError::Status {
            status: 500,
            detail: Some("Vector index unavailable".to_string()),
        });
        let items = search
            .search(&Query::new("meiosis"))
            .await
            .unwrap()
            .settled()
            .unwrap();

        assert!(items.is_empty());
        assert!(search.results().is_empty());
        assert_eq!(
            search.state(),
            SubmissionState::Error("Vector index unavailable".to_string())
        );
        assert_eq!(
            notifier.notices(),
            vec![Notice {
                level: NoticeLevel::Error,
                message: "Search failed: Vector index unavailable".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_abandoned_search_is_discarded_quietly() {
        let (backend, notifier, search) = orchestrator();
        *backend.search_results.lock().unwrap() = Err(ApiError::Timeout);
        let release = backend.hold_next();

        let pending = tokio::spawn({
            let search = search.clone();
            async move { search.search(&Query::new("slow")).await }
        });
        backend.entered.notified().await;

        let err = search.search(&Query::new("again")).await.unwrap_err();
        assert!(matches!(err, LecternError::Busy(_)));

        search.reset();
        release.send(()).unwrap();

        assert_eq!(pending.await.unwrap().unwrap(), Submission::Discarded);
        assert!(notifier.notices().is_empty());
        assert_eq!(search.state(), SubmissionState::Idle);
    }
}
