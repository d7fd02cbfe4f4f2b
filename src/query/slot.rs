//! The single "current answer" shared by the question flow and the audio controller.

use crate::api::{AnswerResult, AudioAsset};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A copy of the current answer tagged with the generation it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSnapshot {
    pub generation: u64,
    /// Bumped by every write, including audio patches.
    pub revision: u64,
    pub result: AnswerResult,
}

/// Shared holder of the current [`AnswerResult`].
///
/// Every full replacement bumps the generation, so a late audio patch can tell that the
/// answer it was generated for is gone.
#[derive(Debug, Clone, Default)]
pub struct AnswerSlot {
    inner: Arc<RwLock<SlotInner>>,
}

#[derive(Debug, Default)]
struct SlotInner {
    generation: u64,
    revision: u64,
    current: Option<AnswerResult>,
}

impl AnswerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, SlotInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SlotInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current(&self) -> Option<AnswerResult> {
        self.read().current.clone()
    }

    pub fn snapshot(&self) -> Option<SlotSnapshot> {
        let inner = self.read();
        inner.current.as_ref().map(|result| SlotSnapshot {
            generation: inner.generation,
            revision: inner.revision,
            result: result.clone(),
        })
    }

    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    /// Install a new answer, discarding the old one and its audio.
    pub(crate) fn replace(&self, result: AnswerResult) -> u64 {
        let mut inner = self.write();
        inner.generation += 1;
        inner.revision += 1;
        inner.current = Some(result);
        inner.generation
    }

    /// Swap in new audio for the answer of `generation`. Returns `false` when that answer
    /// has since been replaced.
    pub(crate) fn patch_audio(&self, generation: u64, audio: AudioAsset, voice_id: &str) -> bool {
        let mut guard = self.write();
        let inner = &mut *guard;
        if inner.generation != generation {
            return false;
        }
        match inner.current.as_mut() {
            Some(current) => {
                current.audio = Some(audio);
                current.voice_used = Some(voice_id.to_string());
                inner.revision += 1;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::audio_asset;

    #[test]
    fn test_patch_touches_only_audio() {
        let slot = AnswerSlot::new();
        let original = AnswerResult {
            success: true,
            answer: "Mitochondria produce ATP.".to_string(),
            query: "What do mitochondria do?".to_string(),
            sources: vec!["bio.pdf".to_string()],
            ..Default::default()
        };
        let generation = slot.replace(original.clone());

        let before = slot.snapshot().unwrap().revision;
        assert!(slot.patch_audio(generation, audio_asset("a.mp3", "en-GB-charles"), "en-GB-charles"));
        assert_eq!(slot.generation(), generation);
        assert!(slot.snapshot().unwrap().revision > before);

        let patched = slot.current().unwrap();
        assert_eq!(patched.voice_used.as_deref(), Some("en-GB-charles"));
        assert_eq!(
            AnswerResult { audio: None, voice_used: None, ..patched },
            original
        );
    }

    #[test]
    fn test_patch_for_replaced_answer_is_rejected() {
        let slot = AnswerSlot::new();
        let old = slot.replace(AnswerResult::default());
        slot.replace(AnswerResult { answer: "newer".to_string(), ..Default::default() });

        assert!(!slot.patch_audio(old, audio_asset("a.mp3", "v"), "v"));
        assert!(slot.current().unwrap().audio.is_none());
    }

    #[test]
    fn test_patch_on_empty_slot() {
        let slot = AnswerSlot::new();
        assert!(!slot.patch_audio(0, audio_asset("a.mp3", "v"), "v"));
        assert!(slot.snapshot().is_none());
    }
}
