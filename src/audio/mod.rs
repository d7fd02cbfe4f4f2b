//! Audio for the current answer: regeneration, playback and download.
//!
//! [`AudioLifecycleController`] follows the [`AnswerSlot`]: whenever the answer or its
//! audio changes, the old audio is stopped and the new one loaded. Playback itself is
//! delegated to a [`MediaPort`].

pub mod download;
mod media;
pub mod player;
mod regenerate;

pub use download::DownloadRequest;
pub use media::{MediaEvent, MediaPort, MediaUpdate};
pub use regenerate::AudioRegenerator;

#[cfg(test)]
pub(crate) use media::testing;

use crate::api::{resolve_url, AudioAsset};
use crate::error::{LecternError, Result};
use crate::query::{AnswerSlot, Submission};
use tracing::{debug, info, warn};
use url::Url;

/// Where playback of the current audio stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No playable audio.
    Idle,
    /// Audio loaded, not started yet.
    Loaded,
    Playing,
    Paused,
}

/// Format seconds as `m:ss`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Drives playback of the audio attached to the current answer.
pub struct AudioLifecycleController<M> {
    media: M,
    slot: AnswerSlot,
    origin: Url,
    regenerator: AudioRegenerator,
    loaded_revision: Option<u64>,
    source: Option<Url>,
    /// Load id of `source`; updates stamped with anything else are stale.
    load: Option<u64>,
    state: PlaybackState,
    position: f64,
    duration: Option<f64>,
    ended: bool,
}

impl<M: MediaPort> AudioLifecycleController<M> {
    /// `origin` is the backend base that relative audio paths resolve against.
    pub fn new(media: M, regenerator: AudioRegenerator, slot: AnswerSlot, origin: Url) -> Self {
        Self {
            media,
            slot,
            origin,
            regenerator,
            loaded_revision: None,
            source: None,
            load: None,
            state: PlaybackState::Idle,
            position: 0.0,
            duration: None,
            ended: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    /// A handle for running regenerations outside this controller.
    pub fn regenerator(&self) -> AudioRegenerator {
        self.regenerator.clone()
    }

    /// The URL currently loaded into the media port.
    pub fn source(&self) -> Option<&Url> {
        self.source.as_ref()
    }

    /// The audio asset of the current answer, if any.
    pub fn current_audio(&self) -> Option<AudioAsset> {
        self.slot.current().and_then(|result| result.audio)
    }

    /// Regenerate the current answer's audio in `voice_id`, then load it.
    pub async fn regenerate(&mut self, voice_id: &str) -> Result<Submission<AudioAsset>> {
        let outcome = self.regenerator.regenerate(voice_id).await?;
        self.sync().await?;
        Ok(outcome)
    }

    /// Bring playback in line with the slot.
    ///
    /// Returns `true` when the audio changed. Any change stops playback and resets the
    /// position, even when the new audio is the same URL.
    pub async fn sync(&mut self) -> Result<bool> {
        let snapshot = self.slot.snapshot();
        let revision = snapshot.as_ref().map(|s| s.revision);
        if revision == self.loaded_revision {
            return Ok(false);
        }

        if self.state == PlaybackState::Playing {
            self.media.pause().await?;
        }
        self.loaded_revision = revision;
        self.load = None;
        self.position = 0.0;
        self.duration = None;
        self.ended = false;

        let target = snapshot
            .as_ref()
            .and_then(|s| s.result.audio.as_ref())
            .and_then(AudioAsset::playable_url)
            .map(|path| resolve_url(&self.origin, path))
            .transpose()?;

        match target {
            Some(url) => {
                info!(url = %url, "Loading audio");
                self.source = Some(url.clone());
                self.state = PlaybackState::Loaded;
                match self.media.load(&url).await {
                    Ok(load) => self.load = Some(load),
                    Err(e) => {
                        self.source = None;
                        self.state = PlaybackState::Idle;
                        return Err(e);
                    }
                }
            }
            None => {
                debug!("No playable audio for the current answer");
                if self.source.take().is_some() {
                    self.media.unload().await?;
                }
                self.state = PlaybackState::Idle;
            }
        }
        Ok(true)
    }

    /// Play when paused or loaded, pause when playing.
    pub async fn toggle_playback(&mut self) -> Result<PlaybackState> {
        match self.state {
            PlaybackState::Idle => {
                return Err(LecternError::Media("No audio loaded".to_string()));
            }
            PlaybackState::Playing => {
                self.media.pause().await?;
                self.state = PlaybackState::Paused;
            }
            PlaybackState::Loaded | PlaybackState::Paused => {
                if self.ended {
                    self.media.seek_to(0.0).await?;
                    self.position = 0.0;
                    self.ended = false;
                }
                self.media.play().await?;
                self.state = PlaybackState::Playing;
            }
        }
        Ok(self.state)
    }

    /// Apply an update read from the media port's event stream.
    ///
    /// Updates left over from a source that has since been replaced or unloaded are
    /// dropped, so they never touch the time tracking of the current audio.
    pub fn handle_update(&mut self, update: MediaUpdate) -> Result<()> {
        if self.load != Some(update.load) {
            debug!(load = update.load, event = ?update.event, "Dropping event from a replaced source");
            return Ok(());
        }
        self.handle_event(update.event)
    }

    /// Apply an event for the currently loaded source.
    ///
    /// A `Failed` event pauses playback and comes back as an error for the caller to show.
    pub fn handle_event(&mut self, event: MediaEvent) -> Result<()> {
        if self.state == PlaybackState::Idle {
            debug!(?event, "Ignoring media event with nothing loaded");
            return Ok(());
        }

        match event {
            MediaEvent::MetadataLoaded { duration } => {
                self.duration = Some(duration).filter(|d| d.is_finite() && *d > 0.0);
            }
            MediaEvent::TimeUpdate { position } => {
                if position.is_finite() {
                    let position = position.max(0.0);
                    self.position = match self.duration {
                        Some(duration) => position.min(duration),
                        None => position,
                    };
                }
            }
            MediaEvent::Ended => {
                if let Some(duration) = self.duration {
                    self.position = duration;
                }
                self.ended = true;
                if self.state == PlaybackState::Playing {
                    self.state = PlaybackState::Paused;
                }
            }
            MediaEvent::Failed(message) => {
                warn!("Playback failed: {}", message);
                self.state = PlaybackState::Paused;
                return Err(LecternError::Media(message));
            }
        }
        Ok(())
    }

    /// Jump to `fraction` of the duration. Does nothing while the duration is unknown.
    ///
    /// Returns whether a seek happened.
    pub async fn seek(&mut self, fraction: f64) -> Result<bool> {
        let duration = match self.duration {
            Some(d) if d > 0.0 => d,
            _ => return Ok(false),
        };
        if fraction.is_nan() || self.state == PlaybackState::Idle {
            return Ok(false);
        }

        let target = fraction.clamp(0.0, 1.0) * duration;
        self.media.seek_to(target).await?;
        self.position = target;
        self.ended = false;
        Ok(true)
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// Fraction played, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        match self.duration {
            Some(d) if d > 0.0 => (self.position / d).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// `elapsed / total`, e.g. `0:42 / 3:05`.
    pub fn time_label(&self) -> String {
        format!(
            "{} / {}",
            format_time(self.position),
            format_time(self.duration.unwrap_or(0.0))
        )
    }

    /// What to fetch to save the current audio.
    pub fn download(&self) -> Result<DownloadRequest> {
        let audio = self
            .current_audio()
            .filter(|a| a.playable_url().is_some())
            .ok_or_else(|| LecternError::Audio("No audio available to download".to_string()))?;
        let path = audio.playable_url().unwrap_or_default();
        let url = resolve_url(&self.origin, path)?;
        Ok(DownloadRequest::new(url, audio.audio_filename.as_deref()))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeMedia;
    use super::*;
    use crate::api::testing::{audio_asset, FakeBackend};
    use crate::api::{AnswerResult, Backend};
    use std::sync::Arc;

    fn controller() -> (Arc<FakeBackend>, AnswerSlot, AudioLifecycleController<FakeMedia>) {
        let backend = Arc::new(FakeBackend::default());
        let slot = AnswerSlot::new();
        let regenerator = AudioRegenerator::new(backend.clone(), slot.clone());
        let controller = AudioLifecycleController::new(
            FakeMedia::new(),
            regenerator,
            slot.clone(),
            backend.origin().clone(),
        );
        (backend, slot, controller)
    }

    fn answer_with(audio: Option<AudioAsset>) -> AnswerResult {
        AnswerResult {
            success: true,
            answer: "Enzymes lower activation energy.".to_string(),
            query: "What do enzymes do?".to_string(),
            audio,
            ..Default::default()
        }
    }

    async fn loaded() -> (Arc<FakeBackend>, AnswerSlot, AudioLifecycleController<FakeMedia>) {
        let (backend, slot, mut controller) = controller();
        slot.replace(answer_with(Some(audio_asset("first.mp3", "en-US-ken"))));
        controller.sync().await.unwrap();
        (backend, slot, controller)
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(5.9), "0:05");
        assert_eq!(format_time(65.0), "1:05");
        assert_eq!(format_time(3600.0), "60:00");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(-3.0), "0:00");
    }

    #[tokio::test]
    async fn test_sync_loads_resolved_url() {
        let (_, _, controller) = loaded().await;

        assert_eq!(controller.state(), PlaybackState::Loaded);
        assert_eq!(
            controller.media.commands(),
            vec!["load http://localhost:8000/audio/first.mp3"]
        );
    }

    #[tokio::test]
    async fn test_sync_without_audio_stays_idle() {
        let (_, slot, mut controller) = controller();
        slot.replace(answer_with(Some(AudioAsset {
            success: false,
            error: Some("TTS unavailable".to_string()),
            ..Default::default()
        })));

        assert!(controller.sync().await.unwrap());
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert!(controller.media.commands().is_empty());
        assert!(!controller.sync().await.unwrap());
        assert!(controller.toggle_playback().await.is_err());
    }

    #[tokio::test]
    async fn test_play_then_pause() {
        let (_, _, mut controller) = loaded().await;

        assert_eq!(controller.toggle_playback().await.unwrap(), PlaybackState::Playing);
        assert!(controller.is_playing());
        assert_eq!(controller.toggle_playback().await.unwrap(), PlaybackState::Paused);
        assert!(!controller.is_playing());
        assert_eq!(controller.toggle_playback().await.unwrap(), PlaybackState::Playing);
    }

    #[tokio::test]
    async fn test_ended_while_playing_pauses() {
        let (_, _, mut controller) = loaded().await;
        controller
            .handle_event(MediaEvent::MetadataLoaded { duration: 90.0 })
            .unwrap();
        controller.toggle_playback().await.unwrap();

        controller.handle_event(MediaEvent::Ended).unwrap();
        assert!(!controller.is_playing());
        assert_eq!(controller.state(), PlaybackState::Paused);
        assert_eq!(controller.progress(), 1.0);

        // Playing again starts over.
        controller.toggle_playback().await.unwrap();
        assert_eq!(controller.position(), 0.0);
        assert_eq!(
            controller.media.commands()[1..],
            ["play", "seek 0.0", "play"]
        );
    }

    #[tokio::test]
    async fn test_seek_needs_known_duration() {
        let (_, _, mut controller) = loaded().await;

        assert!(!controller.seek(0.5).await.unwrap());
        controller
            .handle_event(MediaEvent::MetadataLoaded { duration: 0.0 })
            .unwrap();
        assert!(!controller.seek(0.5).await.unwrap());
        assert_eq!(controller.position(), 0.0);
        assert_eq!(controller.progress(), 0.0);
        assert!(!controller.media.commands().iter().any(|c| c.starts_with("seek")));

        controller
            .handle_event(MediaEvent::MetadataLoaded { duration: 120.0 })
            .unwrap();
        assert!(!controller.seek(f64::NAN).await.unwrap());
        assert!(controller.seek(0.25).await.unwrap());
        assert_eq!(controller.position(), 30.0);
        assert!(controller.seek(7.0).await.unwrap());
        assert_eq!(controller.position(), 120.0);
        assert_eq!(controller.time_label(), "2:00 / 2:00");
    }

    #[tokio::test]
    async fn test_time_updates_and_failure() {
        let (_, _, mut controller) = loaded().await;
        controller
            .handle_event(MediaEvent::MetadataLoaded { duration: 200.0 })
            .unwrap();
        controller.toggle_playback().await.unwrap();

        controller
            .handle_event(MediaEvent::TimeUpdate { position: 50.0 })
            .unwrap();
        assert_eq!(controller.progress(), 0.25);
        assert_eq!(controller.time_label(), "0:50 / 3:20");

        let err = controller
            .handle_event(MediaEvent::Failed("decoder error".to_string()))
            .unwrap_err();
        assert!(matches!(err, LecternError::Media(_)));
        assert_eq!(controller.state(), PlaybackState::Paused);
    }

    #[tokio::test]
    async fn test_new_answer_stops_and_reloads() {
        let (_, slot, mut controller) = loaded().await;
        controller
            .handle_event(MediaEvent::MetadataLoaded { duration: 60.0 })
            .unwrap();
        controller.toggle_playback().await.unwrap();
        controller
            .handle_event(MediaEvent::TimeUpdate { position: 20.0 })
            .unwrap();

        slot.replace(answer_with(Some(audio_asset("second.mp3", "en-US-ken"))));
        assert!(controller.sync().await.unwrap());

        assert_eq!(controller.state(), PlaybackState::Loaded);
        assert_eq!(controller.position(), 0.0);
        assert_eq!(controller.duration(), None);
        assert_eq!(
            controller.media.commands()[1..],
            ["play", "pause", "load http://localhost:8000/audio/second.mp3"]
        );

        slot.replace(answer_with(None));
        controller.sync().await.unwrap();
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert_eq!(controller.media.commands().last().unwrap(), "unload");
    }

    #[tokio::test]
    async fn test_events_from_the_media_port() {
        let (_, _, mut controller) = loaded().await;
        let mut events = controller.media_mut().take_events().unwrap();

        controller.media.emit(MediaEvent::MetadataLoaded { duration: 40.0 });
        controller.media.emit(MediaEvent::TimeUpdate { position: 10.0 });
        for _ in 0..2 {
            let update = events.recv().await.unwrap();
            controller.handle_update(update).unwrap();
        }
        assert_eq!(controller.time_label(), "0:10 / 0:40");
    }

    #[tokio::test]
    async fn test_events_from_a_replaced_source_are_dropped() {
        let (_, slot, mut controller) = loaded().await;
        let mut events = controller.media_mut().take_events().unwrap();
        controller
            .handle_event(MediaEvent::MetadataLoaded { duration: 60.0 })
            .unwrap();
        controller.toggle_playback().await.unwrap();

        // The first player is still reporting when the next answer arrives.
        controller.media.emit(MediaEvent::TimeUpdate { position: 45.0 });
        controller.media.emit(MediaEvent::Ended);
        slot.replace(answer_with(Some(audio_asset("second.mp3", "en-US-ken"))));
        controller.sync().await.unwrap();
        controller.media.emit(MediaEvent::MetadataLoaded { duration: 90.0 });
        controller.media.emit_for(1, MediaEvent::TimeUpdate { position: 46.0 });

        while let Ok(update) = events.try_recv() {
            controller.handle_update(update).unwrap();
        }
        assert_eq!(controller.state(), PlaybackState::Loaded);
        assert_eq!(controller.position(), 0.0);
        assert_eq!(controller.progress(), 0.0);
        assert_eq!(controller.time_label(), "0:00 / 1:30");

        // Not marked as ended, so playing does not rewind first.
        controller.toggle_playback().await.unwrap();
        assert_eq!(controller.media.commands().last().unwrap(), "play");
        assert!(!controller.media.commands().iter().any(|c| c.starts_with("seek")));
    }

    #[tokio::test]
    async fn test_events_after_unload_are_dropped() {
        let (_, slot, mut controller) = loaded().await;
        let mut events = controller.media_mut().take_events().unwrap();
        controller.media.emit(MediaEvent::MetadataLoaded { duration: 30.0 });

        slot.replace(answer_with(None));
        controller.sync().await.unwrap();
        slot.replace(answer_with(Some(audio_asset("third.mp3", "en-US-ken"))));
        controller.sync().await.unwrap();

        controller.handle_update(events.try_recv().unwrap()).unwrap();
        assert_eq!(controller.duration(), None);
    }

    #[tokio::test]
    async fn test_failed_play_stays_loaded() {
        let (_, _, mut controller) = loaded().await;
        controller.media_mut().fail_play = true;

        assert!(matches!(
            controller.toggle_playback().await,
            Err(LecternError::Media(_))
        ));
        assert_eq!(controller.state(), PlaybackState::Loaded);
    }

    #[tokio::test]
    async fn test_regenerate_loads_new_audio() {
        let (backend, slot, mut controller) = loaded().await;
        backend.set_audio(Ok(audio_asset("kabir.mp3", "hi-IN-kabir")));

        let asset = controller
            .regenerate("hi-IN-kabir")
            .await
            .unwrap()
            .settled()
            .unwrap();

        assert_eq!(asset.audio_filename.as_deref(), Some("kabir.mp3"));
        assert_eq!(slot.current().unwrap().voice_used.as_deref(), Some("hi-IN-kabir"));
        assert_eq!(
            controller.source().map(Url::as_str),
            Some("http://localhost:8000/audio/kabir.mp3")
        );
    }

    #[tokio::test]
    async fn test_failed_regeneration_keeps_playing_audio() {
        let (backend, slot, mut controller) = loaded().await;
        let before = slot.current();
        controller.toggle_playback().await.unwrap();
        backend.set_audio(Err(crate::api::ApiError::Timeout));

        assert!(controller.regenerate("hi-IN-kabir").await.is_err());
        assert_eq!(slot.current(), before);
        assert!(controller.is_playing());
    }

    #[tokio::test]
    async fn test_download_request() {
        let (_, slot, controller) = loaded().await;
        let request = controller.download().unwrap();
        assert_eq!(request.url.as_str(), "http://localhost:8000/audio/first.mp3");
        assert_eq!(request.filename, "first.mp3");

        slot.replace(answer_with(Some(AudioAsset {
            success: true,
            audio_url: Some("/audio/x.mp3".to_string()),
            ..Default::default()
        })));
        assert_eq!(controller.download().unwrap().filename, "audio.mp3");

        slot.replace(answer_with(None));
        assert!(controller.download().is_err());
    }
}
