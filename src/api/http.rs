//! reqwest implementation of [`Backend`].

use super::types::{BooksResponse, SearchResponse, VoicesResponse};
use super::{
    AnswerResult, ApiError, ApiResult, AskWithAudioRequest, AudioAsset, Backend, BookStats,
    DeleteResult, Document, EmbeddingJob, EmbeddingStatus, GenerateAudioRequest, HealthStatus,
    RetrievalRequest, SearchResultItem, UploadResult, Voice,
};
use crate::error::{LecternError, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Default timeout for backend requests (2 minutes, audio synthesis is slow).
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// HTTP client for the textbook backend.
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    /// Create a client with the default timeout.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with a custom timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(LecternError::Config(format!(
                "Backend URL must be an http(s) origin: {}",
                base_url
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LecternError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base })
    }

    /// The underlying HTTP client, shared with audio downloads.
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        resolve_url(&self.base, path).map_err(|e| ApiError::Network(format!("Bad endpoint {}: {}", path, e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.endpoint(path)?;
        debug!(url = %url, "GET");
        let response = self.client.get(url).send().await.map_err(transport_error)?;
        read_json(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> ApiResult<T> {
        let url = self.endpoint(path)?;
        debug!(url = %url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }
}

#[async_trait]
impl Backend for HttpBackend {
    #[instrument(skip(self))]
    async fn list_books(&self) -> ApiResult<Vec<Document>> {
        let response: BooksResponse = self.get("books").await?;
        debug!("Catalog lists {} books", response.books.len());
        Ok(response.books)
    }

    #[instrument(skip(self))]
    async fn book_stats(&self, book_id: &str) -> ApiResult<BookStats> {
        self.get(&format!("books/{}/stats", book_id)).await
    }

    #[instrument(skip(self))]
    async fn embedding_status(&self, book_id: &str) -> ApiResult<EmbeddingStatus> {
        self.get(&format!("books/{}/embedding-status", book_id)).await
    }

    #[instrument(skip(self))]
    async fn generate_embeddings(&self, book_id: &str) -> ApiResult<EmbeddingJob> {
        self.post(&format!("books/{}/generate-embeddings", book_id), &serde_json::json!({}))
            .await
    }

    #[instrument(skip(self))]
    async fn delete_book(&self, book_id: &str) -> ApiResult<DeleteResult> {
        let url = self.endpoint(&format!("books/{}", book_id))?;
        let response = self.client.delete(url).send().await.map_err(transport_error)?;
        read_json(response).await
    }

    #[instrument(skip(self, contents), fields(bytes = contents.len()))]
    async fn upload(&self, filename: &str, contents: Vec<u8>) -> ApiResult<UploadResult> {
        let part = multipart::Part::bytes(contents)
            .file_name(filename.to_string())
            .mime_str("application/pdf")
            .map_err(transport_error)?;
        let form = multipart::Form::new().part("file", part);

        let url = self.endpoint("upload")?;
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    #[instrument(skip(self))]
    async fn voices(&self) -> ApiResult<Vec<Voice>> {
        let response: VoicesResponse = self.get("voices").await?;
        Ok(response.voices)
    }

    #[instrument(skip(self, request), fields(voice = %request.voice_id, audio = request.generate_audio))]
    async fn ask_with_audio(&self, request: &AskWithAudioRequest) -> ApiResult<AnswerResult> {
        self.post("ask-with-audio", request).await
    }

    #[instrument(skip(self, request), fields(top_k = request.top_k))]
    async fn ask(&self, request: &RetrievalRequest) -> ApiResult<AnswerResult> {
        self.post("ask", request).await
    }

    #[instrument(skip(self, request), fields(voice = %request.voice_id, text_len = request.text.len()))]
    async fn generate_audio(&self, request: &GenerateAudioRequest) -> ApiResult<AudioAsset> {
        self.post("generate-audio", request).await
    }

    #[instrument(skip(self, request), fields(top_k = request.top_k))]
    async fn search(&self, request: &RetrievalRequest) -> ApiResult<Vec<SearchResultItem>> {
        let response: SearchResponse = self.post("search", request).await?;
        Ok(response.results)
    }

    #[instrument(skip(self))]
    async fn health(&self) -> ApiResult<HealthStatus> {
        self.get("health").await
    }

    fn origin(&self) -> &Url {
        &self.base
    }
}

/// Resolve a backend-relative path (`/audio/x.mp3`) or absolute URL against `base`.
///
/// Paths are appended below the base path, so a base of `http://host/api/` serves
/// `/audio/x.mp3` from `http://host/api/audio/x.mp3`.
pub fn resolve_url(base: &Url, path: &str) -> std::result::Result<Url, url::ParseError> {
    match Url::parse(path) {
        Ok(absolute) => Ok(absolute),
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(path.trim_start_matches('/')),
        Err(e) => Err(e),
    }
}

pub(crate) fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else if err.is_decode() {
        ApiError::Decode(err.to_string())
    } else if err.is_connect() {
        ApiError::Network(format!("Cannot connect to backend: {}", err))
    } else {
        ApiError::Network(err.to_string())
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            detail: extract_detail(&body),
        });
    }

    let body = response.text().await.map_err(transport_error)?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Pull the `detail` field out of an error body. Validation errors carry structured
/// detail, which is passed through as JSON text.
fn extract_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let backend = HttpBackend::new("http://localhost:8000/api").unwrap();
        assert_eq!(backend.origin().as_str(), "http://localhost:8000/api/");
        assert_eq!(
            backend.endpoint("/books").unwrap().as_str(),
            "http://localhost:8000/api/books"
        );
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let base = Url::parse("http://localhost:8000/").unwrap();
        assert_eq!(
            resolve_url(&base, "/audio/answer.mp3").unwrap().as_str(),
            "http://localhost:8000/audio/answer.mp3"
        );
        assert_eq!(
            resolve_url(&base, "https://cdn.example.com/a.mp3").unwrap().as_str(),
            "https://cdn.example.com/a.mp3"
        );
    }

    #[test]
    fn test_rejects_non_base_url() {
        assert!(HttpBackend::new("mailto:someone@example.com").is_err());
        assert!(HttpBackend::new("not a url").is_err());
    }

    #[test]
    fn test_extract_detail() {
        assert_eq!(
            extract_detail(r#"{"detail":"Book not found"}"#).as_deref(),
            Some("Book not found")
        );
        assert_eq!(
            extract_detail(r#"{"detail":[{"loc":["body","query"]}]}"#).as_deref(),
            Some(r#"[{"loc":["body","query"]}]"#)
        );
        assert_eq!(extract_detail("<html>Bad Gateway</html>"), None);
        assert_eq!(extract_detail(r#"{"error":"x"}"#), None);
    }
}
