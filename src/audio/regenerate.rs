//! On-demand regeneration of the spoken answer.

use crate::api::{AudioAsset, Backend, GenerateAudioRequest};
use crate::error::{LecternError, Result};
use crate::query::{AnswerSlot, Submission};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Re-synthesizes the current answer with another voice.
///
/// Cheap to clone. All clones share one busy flag, so at most one regeneration runs at a
/// time regardless of which clone started it. It never touches the question flow's
/// submission state.
#[derive(Clone)]
pub struct AudioRegenerator {
    backend: Arc<dyn Backend>,
    slot: AnswerSlot,
    busy: Arc<AtomicBool>,
}

/// Clears the busy flag when the regeneration finishes, however it finishes.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AudioRegenerator {
    pub fn new(backend: Arc<dyn Backend>, slot: AnswerSlot) -> Self {
        Self {
            backend,
            slot,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Generate audio for the current answer in `voice_id` and patch it into the slot.
    ///
    /// Returns `Discarded` when the answer was replaced while the audio was generated.
    /// On any failure the current answer is left exactly as it was.
    #[instrument(skip(self))]
    pub async fn regenerate(&self, voice_id: &str) -> Result<Submission<AudioAsset>> {
        let voice_id = voice_id.trim();
        if voice_id.is_empty() {
            return Err(LecternError::InvalidInput("Please select a voice".to_string()));
        }

        let snapshot = self.slot.snapshot().ok_or_else(|| {
            LecternError::InvalidInput("There is no answer to read aloud".to_string())
        })?;
        let text = snapshot.result.answer.clone();
        if text.trim().is_empty() {
            return Err(LecternError::InvalidInput(
                "The current answer has no text to read aloud".to_string(),
            ));
        }

        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(LecternError::Busy(
                "audio is already being regenerated".to_string(),
            ));
        }
        let _guard = BusyGuard(&self.busy);

        info!(generation = snapshot.generation, "Regenerating audio");
        let request = GenerateAudioRequest {
            text,
            voice_id: voice_id.to_string(),
        };
        let asset = self.backend.generate_audio(&request).await.map_err(|e| {
            warn!("Audio generation failed: {}", e.user_message());
            LecternError::from(e)
        })?;

        if asset.playable_url().is_none() {
            let reason = asset
                .error
                .clone()
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| "Audio generation failed".to_string());
            warn!("Backend returned unusable audio: {}", reason);
            return Err(LecternError::Audio(reason));
        }

        if !self.slot.patch_audio(snapshot.generation, asset.clone(), voice_id) {
            debug!("Answer changed during regeneration, dropping new audio");
            return Ok(Submission::Discarded);
        }

        Ok(Submission::Settled(asset))
    }
}
