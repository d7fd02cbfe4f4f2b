//! Books command implementation.

use super::connect;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the books command.
pub async fn run_books(settings: Settings) -> Result<()> {
    let app = connect(settings, false).await?;
    let catalog = app.tracker.catalog();

    if catalog.is_empty() {
        Output::info("No books uploaded yet. Use 'lectern upload <file.pdf>' to add one.");
        return Ok(());
    }

    Output::header(&format!("Books ({})", catalog.len()));
    println!();
    for doc in catalog {
        Output::book(doc);
    }

    let totals = app.tracker.totals();
    println!();
    Output::kv("Ready for questions", &format!("{} of {}", totals.ready, totals.books));
    Output::kv("Total pages", &totals.pages.to_string());
    Output::kv("Total chunks", &totals.chunks.to_string());
    Output::kv("Total characters", &totals.characters.to_string());

    if !app.tracker.can_query() {
        Output::warning("No book is ready yet. Embeddings may still be generating.");
    }

    Ok(())
}
