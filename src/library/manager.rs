//! Upload, inspection and deletion of books.

use super::BookReadinessTracker;
use crate::api::{Backend, BookStats, DeleteResult, EmbeddingJob, EmbeddingStatus, UploadResult};
use crate::error::{LecternError, Result};
use crate::notify::{Confirmer, Notice, Notifier};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// What happened to a delete request.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted(DeleteResult),
    /// The user declined the confirmation.
    Cancelled,
    /// The backend refused; the message is the server detail verbatim.
    Failed(String),
}

/// Library operations that go beyond readiness tracking.
pub struct LibraryManager {
    backend: Arc<dyn Backend>,
    notifier: Arc<dyn Notifier>,
    confirmer: Arc<dyn Confirmer>,
}

impl LibraryManager {
    pub fn new(
        backend: Arc<dyn Backend>,
        notifier: Arc<dyn Notifier>,
        confirmer: Arc<dyn Confirmer>,
    ) -> Self {
        Self {
            backend,
            notifier,
            confirmer,
        }
    }

    /// Delete a book after confirmation, then refresh the catalog.
    ///
    /// Failures are reported through the notifier and leave the catalog as it was.
    #[instrument(skip(self, tracker))]
    pub async fn delete(&self, tracker: &mut BookReadinessTracker, book_id: &str) -> DeleteOutcome {
        let (book_id, label) = match tracker.find(book_id) {
            Some(doc) => (doc.id.clone(), doc.filename.clone()),
            None => (book_id.to_string(), book_id.to_string()),
        };

        let prompt = format!(
            "Are you sure you want to delete \"{}\" and all its chunks?",
            label
        );
        if !self.confirmer.confirm(&prompt).await {
            info!("Delete of {} cancelled", book_id);
            return DeleteOutcome::Cancelled;
        }

        match self.backend.delete_book(&book_id).await {
            Ok(result) => {
                self.notifier.notify(Notice::success(format!(
                    "Successfully deleted: {} chunks and 1 book",
                    result.chunks_deleted
                )));
                if let Err(e) = tracker.refresh().await {
                    warn!("Catalog refresh after delete failed: {}", e);
                    self.notifier.notify(Notice::warning(format!(
                        "Could not refresh library: {}",
                        e.user_message()
                    )));
                }
                DeleteOutcome::Deleted(result)
            }
            Err(e) => {
                let detail = e.user_message();
                self.notifier
                    .notify(Notice::error(format!("Error deleting book: {}", detail)));
                DeleteOutcome::Failed(detail)
            }
        }
    }

    /// Upload a PDF from disk.
    #[instrument(skip(self))]
    pub async fn upload(&self, path: &Path) -> Result<UploadResult> {
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            return Err(LecternError::InvalidInput(
                "Please select a valid PDF file".to_string(),
            ));
        }

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| LecternError::InvalidInput(format!("Bad file name: {}", path.display())))?
            .to_string();

        let contents = tokio::fs::read(path).await?;
        info!("Uploading {} ({} bytes)", filename, contents.len());

        Ok(self.backend.upload(&filename, contents).await?)
    }

    /// Chunking statistics for one book.
    pub async fn stats(&self, book_id: &str) -> Result<BookStats> {
        Ok(self.backend.book_stats(book_id).await?)
    }

    /// Embedding progress for one book.
    pub async fn embedding_status(&self, book_id: &str) -> Result<EmbeddingStatus> {
        Ok(self.backend.embedding_status(book_id).await?)
    }

    /// Ask the backend to (re)embed a book.
    pub async fn generate_embeddings(&self, book_id: &str) -> Result<EmbeddingJob> {
        Ok(self.backend.generate_embeddings(book_id).await?)
    }
}
