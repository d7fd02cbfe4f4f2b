//! Wiring for a Lectern session.
//!
//! [`App`] owns one of each component and applies the readiness gate before questions
//! and searches are sent.

use crate::api::{AnswerResult, Backend, HttpBackend, SearchResultItem};
use crate::audio::{AudioLifecycleController, AudioRegenerator, MediaPort};
use crate::config::Settings;
use crate::error::{LecternError, Result};
use crate::library::{BookReadinessTracker, LibraryManager};
use crate::notify::{Confirmer, Notice, Notifier};
use crate::query::{AnswerSlot, Query, QueryOrchestrator, SearchOrchestrator, Submission};
use crate::voices::VoiceCatalog;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// How a question should be answered.
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    /// Books to restrict the question to, by id or file name. Empty means all ready books.
    pub scope: Vec<String>,
    /// Voice for the spoken answer; the configured default when `None`.
    pub voice: Option<String>,
    /// Whether to synthesize speech. Without it the answer-only endpoint is used.
    pub speak: bool,
}

/// One client session against the backend.
pub struct App {
    settings: Settings,
    backend: Arc<dyn Backend>,
    http: Option<reqwest::Client>,
    notifier: Arc<dyn Notifier>,
    pub tracker: BookReadinessTracker,
    pub voices: VoiceCatalog,
    pub library: LibraryManager,
    questions: Arc<QueryOrchestrator>,
    search: SearchOrchestrator,
    slot: AnswerSlot,
    regenerator: AudioRegenerator,
}

impl App {
    /// Connect to the backend named in `settings`.
    pub fn new(
        settings: Settings,
        notifier: Arc<dyn Notifier>,
        confirmer: Arc<dyn Confirmer>,
    ) -> Result<Self> {
        let http = HttpBackend::with_timeout(&settings.backend.base_url, settings.timeout())?;
        let client = http.client().clone();
        let mut app = Self::with_backend(settings, Arc::new(http), notifier, confirmer);
        app.http = Some(client);
        Ok(app)
    }

    /// Build a session over any backend.
    pub fn with_backend(
        settings: Settings,
        backend: Arc<dyn Backend>,
        notifier: Arc<dyn Notifier>,
        confirmer: Arc<dyn Confirmer>,
    ) -> Self {
        let slot = AnswerSlot::new();
        let questions = Arc::new(
            QueryOrchestrator::new(backend.clone(), slot.clone())
                .with_params(settings.answer_params()),
        );
        let search = SearchOrchestrator::new(backend.clone(), notifier.clone())
            .with_params(settings.search_params());

        Self {
            tracker: BookReadinessTracker::new(backend.clone()),
            voices: VoiceCatalog::new(backend.clone()),
            library: LibraryManager::new(backend.clone(), notifier.clone(), confirmer),
            regenerator: AudioRegenerator::new(backend.clone(), slot.clone()),
            questions,
            search,
            slot,
            backend,
            http: None,
            notifier,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn backend(&self) -> Arc<dyn Backend> {
        self.backend.clone()
    }

    /// The HTTP client, when talking to a real backend.
    pub fn http_client(&self) -> Option<&reqwest::Client> {
        self.http.as_ref()
    }

    pub fn slot(&self) -> &AnswerSlot {
        &self.slot
    }

    pub fn questions(&self) -> &QueryOrchestrator {
        &self.questions
    }

    pub fn searcher(&self) -> &SearchOrchestrator {
        &self.search
    }

    /// Fetch the catalog and the voice list together.
    ///
    /// A voice failure only produces a warning; a catalog failure is returned.
    #[instrument(skip(self))]
    pub async fn load(&mut self) -> Result<()> {
        let (books, voices) = futures::join!(self.tracker.refresh(), self.voices.refresh());
        let books = books.map(|b| b.len());
        let voices = voices.map(|v| v.len());

        if let Err(e) = &voices {
            warn!("Voice list unavailable: {}", e);
            self.notifier.notify(Notice::warning(format!(
                "Could not load voices: {}",
                e.user_message()
            )));
        }

        let books = books?;
        info!(books, voices = voices.unwrap_or(0), "Session loaded");
        Ok(())
    }

    /// Fail unless at least one book can answer questions.
    fn require_ready(&self) -> Result<()> {
        if self.tracker.can_query() {
            Ok(())
        } else {
            Err(LecternError::BookNotReady(
                "no books are ready yet; upload a PDF and wait for its embeddings".to_string(),
            ))
        }
    }

    /// Ask a question over the ready books.
    pub async fn ask(&self, text: &str, options: &AskOptions) -> Result<Submission<AnswerResult>> {
        self.start_ask(text, options)?.await
    }

    /// Check a question now and hand back the request as a detached future.
    ///
    /// The future owns what it needs, so it can be spawned while the session keeps
    /// taking input. Resetting the question orchestrator in the meantime makes it
    /// resolve to `Discarded`.
    pub fn start_ask(
        &self,
        text: &str,
        options: &AskOptions,
    ) -> Result<impl Future<Output = Result<Submission<AnswerResult>>> + Send + 'static> {
        let query = self.prepare(text, &options.scope)?;
        let voice = options
            .voice
            .clone()
            .unwrap_or_else(|| self.settings.ask.default_voice.clone());
        let query = query.with_voice(voice).with_audio(options.speak);
        let questions = self.questions.clone();
        let speak = options.speak;

        Ok(async move {
            if speak {
                questions.ask_with_audio(&query).await
            } else {
                questions.ask(&query).await
            }
        })
    }

    /// Run a plain similarity search over the ready books.
    pub async fn search(&self, text: &str, scope: &[String]) -> Result<Submission<Vec<SearchResultItem>>> {
        let query = self.prepare(text, scope)?;
        self.search.search(&query).await
    }

    /// Validate text, readiness and scope, all before any request is made.
    fn prepare(&self, text: &str, scope: &[String]) -> Result<Query> {
        let query = Query::new(text);
        query.validated_text()?;
        self.require_ready()?;
        let scope = self.tracker.resolve_scope(scope)?;
        Ok(query.with_scope(scope))
    }

    /// A playback controller for the current answer.
    pub fn audio<M: MediaPort>(&self, media: M) -> AudioLifecycleController<M> {
        AudioLifecycleController::new(
            media,
            self.regenerator.clone(),
            self.slot.clone(),
            self.backend.origin().clone(),
        )
    }
}
