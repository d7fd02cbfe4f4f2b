//! Ask command implementation.

use super::connect;
use crate::app::{App, AskOptions};
use crate::audio::player::FfplayMedia;
use crate::audio::{download, format_time, AudioLifecycleController, MediaPort};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::query::Submission;
use anyhow::Result;
use std::path::PathBuf;

/// Flags of the ask command.
#[derive(Debug, Clone, Default)]
pub struct AskFlags {
    pub books: Vec<String>,
    pub voice: Option<String>,
    pub no_audio: bool,
    pub play: bool,
    pub download: bool,
}

/// Run the ask command.
pub async fn run_ask(question: &str, flags: AskFlags, settings: Settings) -> Result<()> {
    if flags.play {
        if let Err(e) = preflight::check(Operation::Playback, &settings) {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    }

    let app = connect(settings, false).await?;
    let options = AskOptions {
        scope: flags.books.clone(),
        voice: flags.voice.clone(),
        speak: !flags.no_audio && app.settings().ask.generate_audio,
    };

    let spinner = Output::spinner(if options.speak {
        "Thinking and recording the answer..."
    } else {
        "Thinking..."
    });
    let outcome = app.ask(question, &options).await;
    spinner.finish_and_clear();

    let result = match outcome {
        Ok(Submission::Settled(result)) => result,
        Ok(Submission::Discarded) => return Ok(()),
        Err(e) => {
            Output::error(&e.user_message());
            return Err(e.into());
        }
    };

    Output::answer(&result);
    if !result.success {
        return Err(anyhow::anyhow!("the backend could not answer"));
    }

    if !result.has_playable_audio() {
        if flags.play || flags.download {
            Output::warning("This answer has no audio.");
        }
        return Ok(());
    }

    let media = FfplayMedia::new(&app.settings().player.program, &app.settings().player.probe_program);
    let mut audio = app.audio(media);
    if flags.download {
        save_audio(&app, &audio).await?;
    }
    if flags.play {
        play_to_end(&mut audio).await?;
    }

    Ok(())
}

/// Download the current answer's audio into the configured directory.
pub(super) async fn save_audio<M: MediaPort>(
    app: &App,
    audio: &AudioLifecycleController<M>,
) -> Result<PathBuf> {
    let request = audio.download()?;
    let client = app
        .http_client()
        .ok_or_else(|| anyhow::anyhow!("downloads need an HTTP backend"))?;

    let spinner = Output::spinner(&format!("Saving {}...", request.filename));
    let saved = download::save(client, &request, &app.settings().download_dir()).await;
    spinner.finish_and_clear();

    match saved {
        Ok(path) => {
            Output::success(&format!("Saved audio to {}", path.display()));
            Ok(path)
        }
        Err(e) => {
            Output::error(&format!("Download failed: {}", e.user_message()));
            Err(e.into())
        }
    }
}

/// Play the loaded answer until it ends or the user presses Ctrl-C.
async fn play_to_end(audio: &mut AudioLifecycleController<FfplayMedia>) -> Result<()> {
    let mut events = audio
        .media_mut()
        .take_events()
        .ok_or_else(|| anyhow::anyhow!("media events already taken"))?;

    audio.sync().await?;
    audio.toggle_playback().await?;
    Output::info("Playing answer (Ctrl-C to stop)");

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(update) = event else { break };
                if let Err(e) = audio.handle_update(update) {
                    Output::error(&e.to_string());
                    break;
                }
                // Only an end of the current source stops playback.
                if !audio.is_playing() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if audio.is_playing() {
                    audio.toggle_playback().await?;
                }
                println!();
                break;
            }
        }
    }

    Output::info(&format!(
        "Stopped at {} of {}",
        format_time(audio.position()),
        format_time(audio.duration().unwrap_or(0.0))
    ));
    Ok(())
}
