//! CLI command implementations.

mod ask;
mod books;
mod config;
mod health;
mod library;
mod listen;
mod search;
mod voices;

pub use ask::{run_ask, AskFlags};
pub use books::run_books;
pub use config::run_config;
pub use health::run_health;
pub use library::{run_delete, run_embed, run_stats, run_status, run_upload};
pub use listen::run_listen;
pub use search::run_search;
pub use voices::run_voices;

use crate::app::App;
use crate::cli::{ConsoleNotifier, Output, StdinConfirmer};
use crate::config::Settings;
use anyhow::Result;
use std::sync::Arc;

/// Open a session and load the catalog and voices.
async fn connect(settings: Settings, assume_yes: bool) -> Result<App> {
    let mut app = App::new(
        settings,
        Arc::new(ConsoleNotifier),
        Arc::new(StdinConfirmer { assume_yes }),
    )?;

    let spinner = Output::spinner("Loading library...");
    let loaded = app.load().await;
    spinner.finish_and_clear();

    if let Err(e) = loaded {
        Output::error(&format!("Could not reach the backend: {}", e.user_message()));
        Output::info(&format!(
            "Is it running at {}? Run 'lectern health' for details.",
            app.settings().backend.base_url
        ));
        return Err(e.into());
    }
    Ok(app)
}
