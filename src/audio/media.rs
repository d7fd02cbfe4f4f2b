//! The media element the playback controller drives.

use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

/// Something reported by the media element while it works.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// The duration of the loaded source is known, in seconds.
    MetadataLoaded { duration: f64 },
    /// Playback has reached `position` seconds.
    TimeUpdate { position: f64 },
    /// Playback reached the end of the source.
    Ended,
    /// Playback stopped because of an error.
    Failed(String),
}

/// A [`MediaEvent`] stamped with the load of the source it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaUpdate {
    /// The id returned by the [`MediaPort::load`] call for that source.
    pub load: u64,
    pub event: MediaEvent,
}

/// A player for a single audio source.
#[async_trait]
pub trait MediaPort: Send {
    /// Replace the current source. Stops anything playing.
    ///
    /// Returns a fresh load id. Every update produced for this source carries it.
    async fn load(&mut self, url: &Url) -> Result<u64>;

    /// Drop the current source.
    async fn unload(&mut self) -> Result<()>;

    async fn play(&mut self) -> Result<()>;

    async fn pause(&mut self) -> Result<()>;

    async fn seek_to(&mut self, seconds: f64) -> Result<()>;

    /// The event stream. Only the first caller gets it.
    fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<MediaUpdate>>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::LecternError;
    use std::sync::{Arc, Mutex};

    /// Records every command; events are pushed by the test.
    pub(crate) struct FakeMedia {
        pub commands: Arc<Mutex<Vec<String>>>,
        pub fail_play: bool,
        loads: u64,
        events: Option<mpsc::UnboundedReceiver<MediaUpdate>>,
        sender: mpsc::UnboundedSender<MediaUpdate>,
    }

    impl FakeMedia {
        pub fn new() -> Self {
            let (sender, events) = mpsc::unbounded_channel();
            Self {
                commands: Arc::new(Mutex::new(Vec::new())),
                fail_play: false,
                loads: 0,
                events: Some(events),
                sender,
            }
        }

        pub fn commands(&self) -> Vec<String> {
            self.commands.lock().unwrap().clone()
        }

        /// Queue `event` as if the source of `load` produced it.
        pub fn emit_for(&self, load: u64, event: MediaEvent) {
            self.sender.send(MediaUpdate { load, event }).unwrap();
        }

        /// Queue `event` for the current source.
        pub fn emit(&self, event: MediaEvent) {
            self.emit_for(self.loads, event);
        }

        fn record(&self, command: String) {
            self.commands.lock().unwrap().push(command);
        }
    }

    #[async_trait]
    impl MediaPort for FakeMedia {
        async fn load(&mut self, url: &Url) -> Result<u64> {
            self.record(format!("load {}", url));
            self.loads += 1;
            Ok(self.loads)
        }

        async fn unload(&mut self) -> Result<()> {
            self.record("unload".to_string());
            self.loads += 1;
            Ok(())
        }

        async fn play(&mut self) -> Result<()> {
            if self.fail_play {
                return Err(LecternError::Media("device busy".to_string()));
            }
            self.record("play".to_string());
            Ok(())
        }

        async fn pause(&mut self) -> Result<()> {
            self.record("pause".to_string());
            Ok(())
        }

        async fn seek_to(&mut self, seconds: f64) -> Result<()> {
            self.record(format!("seek {:.1}", seconds));
            Ok(())
        }

        fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<MediaUpdate>> {
            self.events.take()
        }
    }
}
