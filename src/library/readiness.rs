//! Tracks which uploaded books can be queried.

use crate::api::{Backend, Document};
use crate::error::{LecternError, Result};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Aggregate figures over the whole catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LibraryTotals {
    pub books: usize,
    pub ready: usize,
    pub pages: u64,
    pub chunks: u64,
    pub characters: u64,
}

/// Holds the last fetched catalog and derives the ready subset from it.
pub struct BookReadinessTracker {
    backend: Arc<dyn Backend>,
    catalog: Vec<Document>,
}

impl BookReadinessTracker {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            catalog: Vec::new(),
        }
    }

    /// Re-fetch the catalog. On failure the previous catalog is kept.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> Result<&[Document]> {
        match self.backend.list_books().await {
            Ok(books) => {
                self.catalog = books;
                info!(
                    total = self.catalog.len(),
                    ready = self.ready_books().len(),
                    "Catalog refreshed"
                );
                Ok(self.catalog.as_slice())
            }
            Err(e) => {
                warn!(error = %e, "Catalog refresh failed, keeping {} cached books", self.catalog.len());
                Err(e.into())
            }
        }
    }

    /// Every book, ready or not.
    pub fn catalog(&self) -> &[Document] {
        &self.catalog
    }

    /// Books whose chunks are all embedded.
    pub fn ready_books(&self) -> Vec<&Document> {
        self.catalog.iter().filter(|d| d.is_ready()).collect()
    }

    /// Querying is only possible once at least one book is ready.
    pub fn can_query(&self) -> bool {
        self.catalog.iter().any(Document::is_ready)
    }

    /// Look a book up by id or file name.
    pub fn find(&self, key: &str) -> Option<&Document> {
        self.catalog
            .iter()
            .find(|d| d.id == key)
            .or_else(|| self.catalog.iter().find(|d| d.filename == key))
    }

    /// Turn a user selection into the `book_ids` filter for a query.
    ///
    /// An empty selection means "all ready books" and maps to `None`. Every selected
    /// book must exist and be ready.
    pub fn resolve_scope(&self, selected: &[String]) -> Result<Option<Vec<String>>> {
        if selected.is_empty() {
            return Ok(None);
        }

        let mut ids: Vec<String> = Vec::with_capacity(selected.len());
        for key in selected {
            let doc = self
                .find(key.trim())
                .ok_or_else(|| LecternError::InvalidInput(format!("Unknown book: {}", key)))?;

            if !doc.is_ready() {
                return Err(LecternError::BookNotReady(format!(
                    "{} ({}/{} chunks embedded)",
                    doc.filename, doc.embedded_chunks, doc.chunk_count
                )));
            }

            if !ids.contains(&doc.id) {
                ids.push(doc.id.clone());
            }
        }

        Ok(Some(ids))
    }

    /// Totals for the library summary line.
    pub fn totals(&self) -> LibraryTotals {
        LibraryTotals {
            books: self.catalog.len(),
            ready: self.ready_books().len(),
            pages: self.catalog.iter().map(|d| d.total_pages as u64).sum(),
            chunks: self.catalog.iter().map(|d| d.chunk_count as u64).sum(),
            characters: self.catalog.iter().map(|d| d.text_length).sum(),
        }
    }
}
