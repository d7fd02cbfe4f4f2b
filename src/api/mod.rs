//! Client side of the textbook backend.
//!
//! The [`Backend`] trait is the seam every orchestrator talks through; [`HttpBackend`]
//! is the reqwest implementation used by the CLI.

mod http;
#[cfg(test)]
pub(crate) mod testing;
mod types;

pub(crate) use http::transport_error;
pub use http::{resolve_url, HttpBackend, DEFAULT_TIMEOUT_SECS};
pub use types::{
    AnswerResult, AskWithAudioRequest, AudioAsset, BookStats, DeleteResult, Document,
    EmbeddingJob, EmbeddingStatus, Excerpt, GenerateAudioRequest, HealthStatus,
    RetrievalRequest, SearchResultItem, UploadResult, Voice,
};

use async_trait::async_trait;
use thiserror::Error;

/// Transport or backend failure for a single request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// Non-2xx response. `detail` is the server's `detail` field when it sent one.
    #[error("Request failed with status code {status}")]
    Status { status: u16, detail: Option<String> },

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Server-provided detail text, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// The detail when present, otherwise the transport error message.
    pub fn user_message(&self) -> String {
        match self.detail() {
            Some(detail) => detail.to_string(),
            None => self.to_string(),
        }
    }
}

/// Result of a single backend call.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Operations offered by the textbook backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// `GET /books`
    async fn list_books(&self) -> ApiResult<Vec<Document>>;

    /// `GET /books/{id}/stats`
    async fn book_stats(&self, book_id: &str) -> ApiResult<BookStats>;

    /// `GET /books/{id}/embedding-status`
    async fn embedding_status(&self, book_id: &str) -> ApiResult<EmbeddingStatus>;

    /// `POST /books/{id}/generate-embeddings`
    async fn generate_embeddings(&self, book_id: &str) -> ApiResult<EmbeddingJob>;

    /// `DELETE /books/{id}`
    async fn delete_book(&self, book_id: &str) -> ApiResult<DeleteResult>;

    /// `POST /upload` as multipart field `file`.
    async fn upload(&self, filename: &str, contents: Vec<u8>) -> ApiResult<UploadResult>;

    /// `GET /voices`
    async fn voices(&self) -> ApiResult<Vec<Voice>>;

    /// `POST /ask-with-audio`
    async fn ask_with_audio(&self, request: &AskWithAudioRequest) -> ApiResult<AnswerResult>;

    /// `POST /ask`
    async fn ask(&self, request: &RetrievalRequest) -> ApiResult<AnswerResult>;

    /// `POST /generate-audio`
    async fn generate_audio(&self, request: &GenerateAudioRequest) -> ApiResult<AudioAsset>;

    /// `POST /search`
    async fn search(&self, request: &RetrievalRequest) -> ApiResult<Vec<SearchResultItem>>;

    /// `GET /health`
    async fn health(&self) -> ApiResult<HealthStatus>;

    /// Origin that relative asset paths are served from.
    fn origin(&self) -> &url::Url;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_detail() {
        let err = ApiError::Status {
            status: 500,
            detail: Some("Gemini client not available".to_string()),
        };
        assert_eq!(err.user_message(), "Gemini client not available");

        let err = ApiError::Status { status: 502, detail: None };
        assert_eq!(err.user_message(), "Request failed with status code 502");

        assert_eq!(ApiError::Timeout.user_message(), "Request timed out");
    }
}
