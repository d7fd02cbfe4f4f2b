//! Search command implementation.

use super::connect;
use crate::app::App;
use crate::cli::Output;
use crate::config::Settings;
use crate::query::{Submission, SubmissionState};
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, books: &[String], settings: Settings) -> Result<()> {
    let app = connect(settings, false).await?;

    let spinner = Output::spinner("Searching...");
    let outcome = app.search(query, books).await;
    spinner.finish_and_clear();

    let results = match outcome {
        Ok(Submission::Settled(results)) => results,
        Ok(Submission::Discarded) => return Ok(()),
        Err(e) => {
            Output::error(&e.user_message());
            return Err(e.into());
        }
    };

    if let Some(message) = failure_message(&app) {
        // Already reported through the notifier.
        return Err(anyhow::anyhow!(message));
    }

    if results.is_empty() {
        Output::warning("No results found matching your query.");
    } else {
        Output::success(&format!("Found {} results", results.len()));
        for item in &results {
            Output::search_result(item);
        }
    }

    Ok(())
}

fn failure_message(app: &App) -> Option<String> {
    match app.searcher().state() {
        SubmissionState::Error(message) => Some(message),
        _ => None,
    }
}
