//! Available synthesis voices, grouped by language.

use crate::api::{Backend, Voice};
use crate::error::Result;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Group label for voices that carry no language name.
pub const OTHER_GROUP: &str = "Other";

/// Voices partitioned by language name, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceGroups {
    groups: Vec<(String, Vec<Voice>)>,
}

impl VoiceGroups {
    /// Stable partition of `voices` by `language_name`.
    pub fn from_voices(voices: &[Voice]) -> Self {
        let mut groups: Vec<(String, Vec<Voice>)> = Vec::new();

        for voice in voices {
            let language = voice
                .language_name
                .as_deref()
                .filter(|name| !name.is_empty())
                .unwrap_or(OTHER_GROUP);

            match groups.iter_mut().find(|(name, _)| name == language) {
                Some((_, members)) => members.push(voice.clone()),
                None => groups.push((language.to_string(), vec![voice.clone()])),
            }
        }

        Self { groups }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Voice])> {
        self.groups.iter().map(|(name, members)| (name.as_str(), members.as_slice()))
    }

    /// Language names in display order.
    pub fn languages(&self) -> Vec<&str> {
        self.groups.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn get(&self, language: &str) -> Option<&[Voice]> {
        self.groups
            .iter()
            .find(|(name, _)| name == language)
            .map(|(_, members)| members.as_slice())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of voices across all groups.
    pub fn voice_count(&self) -> usize {
        self.groups.iter().map(|(_, members)| members.len()).sum()
    }
}

/// Voices offered by the backend.
pub struct VoiceCatalog {
    backend: Arc<dyn Backend>,
    voices: Vec<Voice>,
}

impl VoiceCatalog {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            voices: Vec::new(),
        }
    }

    /// Fetch the voice list. On failure the previous list is kept.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> Result<&[Voice]> {
        match self.backend.voices().await {
            Ok(voices) => {
                debug!("Fetched {} voices", voices.len());
                self.voices = voices;
                Ok(self.voices.as_slice())
            }
            Err(e) => {
                warn!(error = %e, "Voice refresh failed");
                Err(e.into())
            }
        }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn find(&self, id: &str) -> Option<&Voice> {
        self.voices.iter().find(|v| v.id == id)
    }

    pub fn group_by_language(&self) -> VoiceGroups {
        VoiceGroups::from_voices(&self.voices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{voice, FakeBackend};
    use crate::api::ApiError;

    fn sample() -> Vec<Voice> {
        vec![
            voice("hi-IN-kabir", Some("Hindi")),
            voice("en-US-ken", Some("English")),
            voice("xx-robot", None),
            voice("hi-IN-ayushi", Some("Hindi")),
            voice("en-GB-charles", Some("English")),
            voice("yy-blank", Some("")),
        ]
    }

    #[test]
    fn test_groups_follow_first_occurrence() {
        let groups = VoiceGroups::from_voices(&sample());

        assert_eq!(groups.languages(), vec!["Hindi", "English", "Other"]);
        let hindi: Vec<&str> = groups.get("Hindi").unwrap().iter().map(|v| v.id.as_str()).collect();
        assert_eq!(hindi, vec!["hi-IN-kabir", "hi-IN-ayushi"]);
        let other: Vec<&str> = groups.get(OTHER_GROUP).unwrap().iter().map(|v| v.id.as_str()).collect();
        assert_eq!(other, vec!["xx-robot", "yy-blank"]);
    }

    #[test]
    fn test_whitespace_name_is_its_own_group() {
        let voices = vec![voice("zz-spaced", Some(" ")), voice("xx-robot", None)];
        let groups = VoiceGroups::from_voices(&voices);

        assert_eq!(groups.languages(), vec![" ", OTHER_GROUP]);
        assert_eq!(groups.get(" ").unwrap()[0].id, "zz-spaced");
    }

    #[test]
    fn test_grouping_is_a_partition() {
        let voices = sample();
        let groups = VoiceGroups::from_voices(&voices);

        assert_eq!(groups.voice_count(), voices.len());
        for v in &voices {
            let hits = groups
                .iter()
                .filter(|(_, members)| members.contains(v))
                .count();
            assert_eq!(hits, 1, "{} should appear in exactly one group", v.id);
        }
    }

    #[test]
    fn test_grouping_is_idempotent() {
        let groups = VoiceGroups::from_voices(&sample());
        let flattened: Vec<Voice> = groups.iter().flat_map(|(_, m)| m.to_vec()).collect();
        assert_eq!(VoiceGroups::from_voices(&flattened), groups);
    }

    #[test]
    fn test_empty_list() {
        let groups = VoiceGroups::from_voices(&[]);
        assert!(groups.is_empty());
        assert_eq!(groups.voice_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_keeps_voices_on_failure() {
        let backend = Arc::new(FakeBackend::default());
        *backend.voices.lock().unwrap() = Ok(sample());

        let mut catalog = VoiceCatalog::new(backend.clone());
        catalog.refresh().await.unwrap();
        assert!(catalog.find("en-US-ken").is_some());

        *backend.voices.lock().unwrap() = Err(ApiError::Timeout);
        assert!(catalog.refresh().await.is_err());
        assert_eq!(catalog.voices().len(), 6);
        assert_eq!(catalog.group_by_language().len(), 3);
    }
}
