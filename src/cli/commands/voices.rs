//! Voices command implementation.

use super::connect;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the voices command.
pub async fn run_voices(settings: Settings) -> Result<()> {
    let app = connect(settings, false).await?;
    let groups = app.voices.group_by_language();

    if groups.is_empty() {
        Output::warning("The backend offered no voices.");
        return Ok(());
    }

    Output::header(&format!(
        "Voices ({} in {} languages)",
        groups.voice_count(),
        groups.len()
    ));
    let default_voice = &app.settings().ask.default_voice;
    for (language, voices) in groups.iter() {
        Output::voice_group(language, voices, default_voice);
    }

    if app.voices.find(default_voice).is_none() {
        println!();
        Output::warning(&format!(
            "The configured default voice '{}' is not offered by the backend.",
            default_voice
        ));
    }

    Ok(())
}
