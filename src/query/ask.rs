//! Asking questions, with or without a spoken answer.

use super::{AnswerSlot, Query, RequestGate, RetrievalParams, Submission, SubmissionState};
use crate::api::{AnswerResult, AskWithAudioRequest, Backend, RetrievalRequest};
use crate::error::Result;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    WithAudio,
    AnswerOnly,
}

/// Sends questions to the backend and installs the answer as the current result.
///
/// Transport failures never escape as errors: they become a failed [`AnswerResult`]
/// whose answer text carries the reason.
pub struct QueryOrchestrator {
    backend: Arc<dyn Backend>,
    slot: AnswerSlot,
    gate: RequestGate,
    params: RetrievalParams,
}

impl QueryOrchestrator {
    pub fn new(backend: Arc<dyn Backend>, slot: AnswerSlot) -> Self {
        Self {
            backend,
            slot,
            gate: RequestGate::default(),
            params: RetrievalParams::ANSWER,
        }
    }

    /// Retrieval settings for the answer-only route.
    pub fn with_params(mut self, params: RetrievalParams) -> Self {
        self.params = params;
        self
    }

    pub fn state(&self) -> SubmissionState {
        self.gate.state()
    }

    pub fn slot(&self) -> &AnswerSlot {
        &self.slot
    }

    pub fn current(&self) -> Option<AnswerResult> {
        self.slot.current()
    }

    /// Return to idle. A response still in flight will be discarded when it lands.
    pub fn reset(&self) {
        self.gate.reset();
    }

    /// Ask via `/ask-with-audio`, letting the backend synthesize speech if requested.
    pub async fn ask_with_audio(&self, query: &Query) -> Result<Submission<AnswerResult>> {
        self.submit(query, Route::WithAudio).await
    }

    /// Ask via `/ask`; the answer carries no audio.
    pub async fn ask(&self, query: &Query) -> Result<Submission<AnswerResult>> {
        self.submit(query, Route::AnswerOnly).await
    }

    #[instrument(skip(self, query))]
    async fn submit(&self, query: &Query, route: Route) -> Result<Submission<AnswerResult>> {
        let text = query.validated_text()?.to_string();
        let token = self.gate.begin("question")?;
        info!(token, "Asking: {}", text);

        let response = match route {
            Route::WithAudio => {
                let request = AskWithAudioRequest {
                    query: text.clone(),
                    book_ids: query.book_filter(),
                    voice_id: query.voice_id().to_string(),
                    generate_audio: query.generate_audio(),
                };
                self.backend.ask_with_audio(&request).await
            }
            Route::AnswerOnly => {
                let request = RetrievalRequest {
                    query: text.clone(),
                    book_ids: query.book_filter(),
                    top_k: self.params.top_k,
                    min_similarity: self.params.min_similarity,
                };
                self.backend.ask(&request).await
            }
        };

        let (result, state) = match response {
            Ok(mut result) => {
                if result.query.is_empty() {
                    result.query = text;
                }
                debug!(
                    success = result.success,
                    excerpts = result.chunks_used.len(),
                    audio = result.has_playable_audio(),
                    "Answer received"
                );
                (result, SubmissionState::Success)
            }
            Err(e) => {
                let message = e.user_message();
                warn!(token, "Question failed: {}", message);
                (AnswerResult::failure(text, &message), SubmissionState::Error(message))
            }
        };

        let applied = self.gate.settle(token, state, || {
            self.slot.replace(result.clone());
        });
        if !applied {
            debug!(token, "Discarding answer for an abandoned request");
            return Ok(Submission::Discarded);
        }

        Ok(Submission::Settled(result))
    }
}
