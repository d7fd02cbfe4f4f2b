//! Question and search flows.
//!
//! Both orchestrators share the same discipline: the question is validated before any
//! network traffic, only one request may be in flight per orchestrator, and a response
//! that arrives after its request was abandoned is dropped instead of overwriting newer
//! state.

mod ask;
mod search;
mod slot;

pub use ask::QueryOrchestrator;
pub use search::{MatchQuality, SearchOrchestrator};
pub use slot::{AnswerSlot, SlotSnapshot};

use crate::error::{LecternError, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Voice used when the caller does not pick one.
pub const DEFAULT_VOICE: &str = "en-US-ken";

/// A question as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    book_ids: Vec<String>,
    voice_id: String,
    generate_audio: bool,
}

impl Query {
    /// A question over all ready books, spoken with the default voice.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            book_ids: Vec::new(),
            voice_id: DEFAULT_VOICE.to_string(),
            generate_audio: true,
        }
    }

    /// Restrict the question to these books. `None` or an empty list means all.
    pub fn with_scope(mut self, book_ids: Option<Vec<String>>) -> Self {
        self.book_ids = book_ids.unwrap_or_default();
        self
    }

    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    pub fn with_audio(mut self, generate_audio: bool) -> Self {
        self.generate_audio = generate_audio;
        self
    }

    /// The text as entered, untrimmed.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn voice_id(&self) -> &str {
        &self.voice_id
    }

    pub fn generate_audio(&self) -> bool {
        self.generate_audio
    }

    /// The trimmed question, or a validation error when nothing is left.
    pub fn validated_text(&self) -> Result<&str> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return Err(LecternError::InvalidInput(
                "Please enter a question".to_string(),
            ));
        }
        Ok(trimmed)
    }

    /// The `book_ids` wire value.
    pub fn book_filter(&self) -> Option<Vec<String>> {
        if self.book_ids.is_empty() {
            None
        } else {
            Some(self.book_ids.clone())
        }
    }
}

/// Retrieval knobs sent with `/ask` and `/search`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalParams {
    pub top_k: u32,
    pub min_similarity: f32,
}

impl RetrievalParams {
    /// Answers use a stricter similarity floor than raw search.
    pub const ANSWER: RetrievalParams = RetrievalParams { top_k: 5, min_similarity: 0.3 };
    pub const SEARCH: RetrievalParams = RetrievalParams { top_k: 5, min_similarity: 0.1 };
}

/// Where an orchestrator is in its request cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    Success,
    /// The last request failed with this message.
    Error(String),
}

impl SubmissionState {
    pub fn is_submitting(&self) -> bool {
        matches!(self, SubmissionState::Submitting)
    }
}

/// Outcome of a request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission<T> {
    /// The request was the latest one and its result was applied.
    Settled(T),
    /// The request was abandoned before its response arrived; nothing was applied.
    Discarded,
}

impl<T> Submission<T> {
    pub fn settled(self) -> Option<T> {
        match self {
            Submission::Settled(value) => Some(value),
            Submission::Discarded => None,
        }
    }
}

/// Submission state plus the monotonic request token.
#[derive(Debug)]
pub(crate) struct RequestGate {
    inner: Mutex<GateInner>,
}

#[derive(Debug)]
struct GateInner {
    state: SubmissionState,
    latest: u64,
}

impl Default for RequestGate {
    fn default() -> Self {
        Self {
            inner: Mutex::new(GateInner {
                state: SubmissionState::Idle,
                latest: 0,
            }),
        }
    }
}

impl RequestGate {
    fn lock(&self) -> MutexGuard<'_, GateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enter `Submitting` and issue a token, unless a request is already in flight.
    pub(crate) fn begin(&self, what: &str) -> Result<u64> {
        let mut inner = self.lock();
        if inner.state.is_submitting() {
            return Err(LecternError::Busy(format!("a {} is still being processed", what)));
        }
        inner.latest += 1;
        inner.state = SubmissionState::Submitting;
        Ok(inner.latest)
    }

    /// Apply a response if `token` is still the latest. Returns whether it was applied.
    pub(crate) fn settle(&self, token: u64, state: SubmissionState, apply: impl FnOnce()) -> bool {
        let mut inner = self.lock();
        if inner.latest != token {
            return false;
        }
        apply();
        inner.state = state;
        true
    }

    /// Back to `Idle`; any in-flight response will be discarded.
    pub(crate) fn reset(&self) {
        let mut inner = self.lock();
        inner.latest += 1;
        inner.state = SubmissionState::Idle;
    }

    pub(crate) fn state(&self) -> SubmissionState {
        self.lock().state.clone()
    }
}
