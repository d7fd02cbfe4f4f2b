//! Scriptable in-memory backend for unit tests.

use super::{
    AnswerResult, ApiError, ApiResult, AskWithAudioRequest, AudioAsset, Backend, BookStats,
    DeleteResult, Document, EmbeddingJob, EmbeddingStatus, GenerateAudioRequest, HealthStatus,
    RetrievalRequest, SearchResultItem, UploadResult, Voice,
};
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::{oneshot, Notify};
use url::Url;

/// Backend whose responses are set per endpoint. Every call is recorded by name.
pub(crate) struct FakeBackend {
    origin: Url,
    calls: Mutex<Vec<String>>,
    pub books: Mutex<ApiResult<Vec<Document>>>,
    pub voices: Mutex<ApiResult<Vec<Voice>>>,
    pub answer: Mutex<ApiResult<AnswerResult>>,
    pub audio: Mutex<ApiResult<AudioAsset>>,
    /// Requests received by `generate_audio`.
    pub audio_requests: Mutex<Vec<GenerateAudioRequest>>,
    pub search_results: Mutex<ApiResult<Vec<SearchResultItem>>>,
    pub delete: Mutex<ApiResult<DeleteResult>>,
    pub upload: Mutex<ApiResult<UploadResult>>,
    /// Signalled whenever a gated call has started.
    pub entered: Notify,
    hold: Mutex<Option<oneshot::Receiver<()>>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            origin: Url::parse("http://localhost:8000/").unwrap(),
            calls: Mutex::new(Vec::new()),
            books: Mutex::new(Ok(Vec::new())),
            voices: Mutex::new(Ok(Vec::new())),
            answer: Mutex::new(Ok(AnswerResult::default())),
            audio: Mutex::new(Ok(AudioAsset::default())),
            audio_requests: Mutex::new(Vec::new()),
            search_results: Mutex::new(Ok(Vec::new())),
            delete: Mutex::new(Ok(DeleteResult {
                success: true,
                message: "Successfully deleted book".to_string(),
                book_id: String::new(),
                chunks_deleted: 0,
                book_deleted: true,
            })),
            upload: Mutex::new(Err(ApiError::Status { status: 400, detail: None })),
            entered: Notify::new(),
            hold: Mutex::new(None),
        }
    }
}

impl FakeBackend {
    /// Names of the endpoints called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Make the next ask/search/generate call wait until the returned sender fires.
    pub fn hold_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.hold.lock().unwrap() = Some(rx);
        tx
    }

    pub fn set_books(&self, books: Vec<Document>) {
        *self.books.lock().unwrap() = Ok(books);
    }

    pub fn set_answer(&self, answer: ApiResult<AnswerResult>) {
        *self.answer.lock().unwrap() = answer;
    }

    pub fn set_audio(&self, audio: ApiResult<AudioAsset>) {
        *self.audio.lock().unwrap() = audio;
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }

    async fn gate(&self) {
        self.entered.notify_one();
        let hold = self.hold.lock().unwrap().take();
        if let Some(rx) = hold {
            let _ = rx.await;
        }
    }
}

/// Build a catalog entry for tests.
pub(crate) fn document(id: &str, chunk_count: u32, embedded_chunks: u32) -> Document {
    Document {
        id: id.to_string(),
        filename: format!("{}.pdf", id.to_lowercase()),
        total_pages: 10,
        text_length: 1_000,
        chunk_count,
        embedded_chunks,
        upload_date: None,
    }
}

/// Build a voice for tests.
pub(crate) fn voice(id: &str, language_name: Option<&str>) -> Voice {
    Voice {
        id: id.to_string(),
        name: id.to_string(),
        language: None,
        language_name: language_name.map(str::to_string),
    }
}

/// A successful audio asset served from `/audio/{name}`.
pub(crate) fn audio_asset(name: &str, voice_id: &str) -> AudioAsset {
    AudioAsset {
        success: true,
        audio_url: Some(format!("/audio/{}", name)),
        audio_filename: Some(name.to_string()),
        voice_id: Some(voice_id.to_string()),
        text_length: Some(42),
        ..Default::default()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn list_books(&self) -> ApiResult<Vec<Document>> {
        self.record("list_books");
        self.books.lock().unwrap().clone()
    }

    async fn book_stats(&self, book_id: &str) -> ApiResult<BookStats> {
        self.record("book_stats");
        Ok(BookStats {
            book_id: book_id.to_string(),
            filename: format!("{}.pdf", book_id),
            original_text_length: 1_000,
            total_chunks: 4,
            total_chunk_chars: 990,
            coverage_percentage: 99.0,
            avg_chunk_size: 247,
            min_chunk_size: 200,
            max_chunk_size: 300,
            first_chunk_preview: None,
            last_chunk_preview: None,
        })
    }

    async fn embedding_status(&self, book_id: &str) -> ApiResult<EmbeddingStatus> {
        self.record("embedding_status");
        Ok(EmbeddingStatus {
            book_id: book_id.to_string(),
            total_chunks: 4,
            embedded_chunks: 2,
            progress_percentage: 50.0,
            status: "in_progress".to_string(),
        })
    }

    async fn generate_embeddings(&self, book_id: &str) -> ApiResult<EmbeddingJob> {
        self.record("generate_embeddings");
        Ok(EmbeddingJob {
            message: "Embedding generation started".to_string(),
            book_id: book_id.to_string(),
        })
    }

    async fn delete_book(&self, _book_id: &str) -> ApiResult<DeleteResult> {
        self.record("delete_book");
        self.delete.lock().unwrap().clone()
    }

    async fn upload(&self, _filename: &str, _contents: Vec<u8>) -> ApiResult<UploadResult> {
        self.record("upload");
        self.upload.lock().unwrap().clone()
    }

    async fn voices(&self) -> ApiResult<Vec<Voice>> {
        self.record("voices");
        self.voices.lock().unwrap().clone()
    }

    async fn ask_with_audio(&self, _request: &AskWithAudioRequest) -> ApiResult<AnswerResult> {
        self.record("ask_with_audio");
        self.gate().await;
        self.answer.lock().unwrap().clone()
    }

    async fn ask(&self, _request: &RetrievalRequest) -> ApiResult<AnswerResult> {
        self.record("ask");
        self.gate().await;
        self.answer.lock().unwrap().clone()
    }

    async fn generate_audio(&self, request: &GenerateAudioRequest) -> ApiResult<AudioAsset> {
        self.record("generate_audio");
        self.audio_requests.lock().unwrap().push(request.clone());
        self.gate().await;
        self.audio.lock().unwrap().clone()
    }

    async fn search(&self, _request: &RetrievalRequest) -> ApiResult<Vec<SearchResultItem>> {
        self.record("search");
        self.gate().await;
        self.search_results.lock().unwrap().clone()
    }

    async fn health(&self) -> ApiResult<HealthStatus> {
        self.record("health");
        Ok(HealthStatus {
            status: "healthy".to_string(),
            database: Some("connected".to_string()),
        })
    }

    fn origin(&self) -> &Url {
        &self.origin
    }
}
