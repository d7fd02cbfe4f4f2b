//! Library management commands: stats, status, embed, delete and upload.

use super::connect;
use crate::app::App;
use crate::cli::Output;
use crate::config::Settings;
use crate::library::DeleteOutcome;
use anyhow::Result;
use std::path::Path;

/// Map a user-supplied id or file name to a book id.
fn book_id(app: &App, key: &str) -> String {
    app.tracker
        .find(key)
        .map(|doc| doc.id.clone())
        .unwrap_or_else(|| key.to_string())
}

/// Run the stats command.
pub async fn run_stats(book: &str, settings: Settings) -> Result<()> {
    let app = connect(settings, false).await?;
    let id = book_id(&app, book);

    let stats = app.library.stats(&id).await.map_err(|e| {
        Output::error(&format!("Failed to load stats: {}", e.user_message()));
        e
    })?;

    Output::header(&stats.filename);
    Output::kv("Book id", &stats.book_id);
    Output::kv("Original text", &format!("{} characters", stats.original_text_length));
    Output::kv("Chunks", &stats.total_chunks.to_string());
    Output::kv("Chunked text", &format!("{} characters", stats.total_chunk_chars));
    Output::kv("Coverage", &format!("{:.1}%", stats.coverage_percentage));
    Output::kv(
        "Chunk size",
        &format!(
            "avg {}, min {}, max {}",
            stats.avg_chunk_size, stats.min_chunk_size, stats.max_chunk_size
        ),
    );
    if let Some(first) = &stats.first_chunk_preview {
        Output::kv("First chunk", first);
    }
    if let Some(last) = &stats.last_chunk_preview {
        Output::kv("Last chunk", last);
    }

    Ok(())
}

/// Run the status command.
pub async fn run_status(book: &str, settings: Settings) -> Result<()> {
    let app = connect(settings, false).await?;
    let id = book_id(&app, book);

    let status = app.library.embedding_status(&id).await.map_err(|e| {
        Output::error(&format!("Failed to load embedding status: {}", e.user_message()));
        e
    })?;

    let bar = Output::percent_bar(
        status.progress_percentage,
        &format!(
            "{}/{} chunks embedded ({})",
            status.embedded_chunks, status.total_chunks, status.status
        ),
    );
    bar.abandon();

    Ok(())
}

/// Run the embed command.
pub async fn run_embed(book: &str, settings: Settings) -> Result<()> {
    let app = connect(settings, false).await?;
    let id = book_id(&app, book);

    match app.library.generate_embeddings(&id).await {
        Ok(job) => {
            Output::success(&job.message);
            Output::info(&format!("Check progress with 'lectern status {}'", job.book_id));
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to start embeddings: {}", e.user_message()));
            Err(e.into())
        }
    }
}

/// Run the delete command.
pub async fn run_delete(book: &str, yes: bool, settings: Settings) -> Result<()> {
    let mut app = connect(settings, yes).await?;

    // Split borrows: the manager refreshes the tracker after a delete.
    let App { library, tracker, .. } = &mut app;
    match library.delete(tracker, book).await {
        DeleteOutcome::Deleted(_) => Ok(()),
        DeleteOutcome::Cancelled => {
            Output::info("Nothing deleted.");
            Ok(())
        }
        DeleteOutcome::Failed(detail) => Err(anyhow::anyhow!(detail)),
    }
}

/// Run the upload command.
pub async fn run_upload(path: &str, settings: Settings) -> Result<()> {
    let app = connect(settings, false).await?;
    let path = Settings::expand_path(path);

    let spinner = Output::spinner(&format!("Uploading {}...", display_name(&path)));
    let result = app.library.upload(&path).await;
    spinner.finish_and_clear();

    match result {
        Ok(upload) => {
            Output::success(&format!("Uploaded {}", upload.filename));
            Output::kv("Book id", &upload.book_id);
            Output::kv("Pages", &upload.total_pages.to_string());
            Output::kv("Characters", &upload.text_length.to_string());
            Output::kv(
                "Chunks",
                &format!(
                    "{} (avg {} characters)",
                    upload.chunks_created, upload.average_chunk_size
                ),
            );
            if let Some(status) = &upload.embeddings_status {
                Output::kv("Embeddings", status);
            }
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Upload failed: {}", e.user_message()));
            Err(e.into())
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
