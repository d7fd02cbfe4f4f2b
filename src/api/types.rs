//! Wire types exchanged with the textbook backend.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// An uploaded book as listed by `GET /books`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Backend identifier.
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// Original file name of the upload.
    pub filename: String,
    #[serde(default)]
    pub total_pages: u32,
    /// Length of the extracted text in characters.
    #[serde(default)]
    pub text_length: u64,
    #[serde(default)]
    pub chunk_count: u32,
    /// Chunks that already carry an embedding.
    #[serde(default)]
    pub embedded_chunks: u32,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub upload_date: Option<NaiveDateTime>,
}

impl Document {
    /// A book can be queried once every one of its chunks is embedded.
    pub fn is_ready(&self) -> bool {
        self.embedded_chunks > 0 && self.embedded_chunks == self.chunk_count
    }

    /// Embedding progress in percent (0 when the book has no chunks).
    pub fn embedding_progress(&self) -> f64 {
        if self.chunk_count == 0 {
            return 0.0;
        }
        (self.embedded_chunks as f64 / self.chunk_count as f64 * 100.0).min(100.0)
    }
}

/// Accepts RFC 3339 or naive ISO-8601 timestamps; anything else becomes `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok())
}

/// A speech synthesis voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    /// Locale code, e.g. `en-US`.
    #[serde(default)]
    pub language: Option<String>,
    /// Human readable language, used for grouping.
    #[serde(default)]
    pub language_name: Option<String>,
}

/// A chunk quoted as evidence for an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Excerpt {
    #[serde(default)]
    pub chunk_id: String,
    #[serde(default)]
    pub book_filename: String,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub similarity_score: f64,
    #[serde(default)]
    pub content: String,
}

/// Generated speech for an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AudioAsset {
    #[serde(default)]
    pub success: bool,
    /// Path relative to the backend origin, e.g. `/audio/abc.mp3`.
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub audio_filename: Option<String>,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub text_length: Option<usize>,
    /// Rough duration estimate in minutes.
    #[serde(default)]
    pub duration_estimate: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AudioAsset {
    /// The relative URL, only when generation succeeded.
    pub fn playable_url(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.audio_url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

/// The synthesized answer to a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnswerResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub answer: String,
    /// The question this answers.
    #[serde(default)]
    pub query: String,
    /// Distinct book labels the answer drew on.
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub chunks_used: Vec<Excerpt>,
    #[serde(default)]
    pub audio: Option<AudioAsset>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub voice_used: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub total_chunks_found: Option<usize>,
}

impl AnswerResult {
    /// Synthetic result standing in for a request that never produced an answer.
    pub fn failure(query: impl Into<String>, message: &str) -> Self {
        Self {
            success: false,
            answer: format!("Error: {}", message),
            query: query.into(),
            sources: Vec::new(),
            chunks_used: Vec::new(),
            audio: None,
            ..Default::default()
        }
    }

    /// Whether an audio asset is attached and playable.
    pub fn has_playable_audio(&self) -> bool {
        self.audio.as_ref().and_then(|a| a.playable_url()).is_some()
    }
}

/// One hit from the plain similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SearchResultItem {
    #[serde(default)]
    pub chunk_id: String,
    #[serde(default)]
    pub book_id: String,
    #[serde(default)]
    pub book_filename: String,
    #[serde(default)]
    pub chapter: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub similarity_score: f64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub chunk_index: Option<u32>,
    #[serde(default, alias = "page_number")]
    pub page: Option<u32>,
}

/// Per-book chunking statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookStats {
    pub book_id: String,
    pub filename: String,
    #[serde(default)]
    pub original_text_length: u64,
    #[serde(default)]
    pub total_chunks: u32,
    #[serde(default)]
    pub total_chunk_chars: u64,
    #[serde(default)]
    pub coverage_percentage: f64,
    #[serde(default)]
    pub avg_chunk_size: u64,
    #[serde(default)]
    pub min_chunk_size: u64,
    #[serde(default)]
    pub max_chunk_size: u64,
    #[serde(default)]
    pub first_chunk_preview: Option<String>,
    #[serde(default)]
    pub last_chunk_preview: Option<String>,
}

/// Embedding progress for a single book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingStatus {
    pub book_id: String,
    #[serde(default)]
    pub total_chunks: u32,
    #[serde(default)]
    pub embedded_chunks: u32,
    #[serde(default)]
    pub progress_percentage: f64,
    /// `completed` or `in_progress`.
    #[serde(default)]
    pub status: String,
}

/// Acknowledgement of a manual embedding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingJob {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub book_id: String,
}

/// Response to a PDF upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    #[serde(default)]
    pub success: bool,
    pub book_id: String,
    pub filename: String,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub text_length: u64,
    #[serde(default)]
    pub text_preview: Option<String>,
    #[serde(default)]
    pub chunks_created: u32,
    #[serde(default)]
    pub average_chunk_size: u64,
    #[serde(default)]
    pub chunk_preview: Option<String>,
    #[serde(default)]
    pub embeddings_status: Option<String>,
}

/// Response to `DELETE /books/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub book_id: String,
    #[serde(default)]
    pub chunks_deleted: u64,
    #[serde(default)]
    pub book_deleted: bool,
}

/// Backend liveness report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub database: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BooksResponse {
    #[serde(default)]
    pub books: Vec<Document>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VoicesResponse {
    #[serde(default)]
    pub voices: Vec<Voice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResultItem>,
}

/// Body of `POST /ask-with-audio`.
#[derive(Debug, Clone, Serialize)]
pub struct AskWithAudioRequest {
    pub query: String,
    /// `None` searches every ready book.
    pub book_ids: Option<Vec<String>>,
    pub voice_id: String,
    pub generate_audio: bool,
}

/// Body shared by `POST /ask` and `POST /search`.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalRequest {
    pub query: String,
    pub book_ids: Option<Vec<String>>,
    pub top_k: u32,
    pub min_similarity: f32,
}

/// Body of `POST /generate-audio`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateAudioRequest {
    pub text: String,
    pub voice_id: String,
}
