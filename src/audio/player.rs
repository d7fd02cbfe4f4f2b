//! Terminal playback through `ffplay`, with `ffprobe` for durations.

use super::media::{MediaEvent, MediaPort, MediaUpdate};
use crate::error::{LecternError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};
use url::Url;

/// How often a running player reports its position.
const TICK: Duration = Duration::from_millis(500);

/// A [`MediaPort`] that runs one `ffplay` process per play span.
///
/// Pausing stops the process and remembers the position; playing starts a new process
/// at that offset.
pub struct FfplayMedia {
    program: String,
    probe_program: String,
    source: Option<Url>,
    duration: Option<f64>,
    position: f64,
    running: Option<Running>,
    /// Bumped on every load and unload.
    loads: u64,
    sender: mpsc::UnboundedSender<MediaUpdate>,
    events: Option<mpsc::UnboundedReceiver<MediaUpdate>>,
}

struct Running {
    started: Instant,
    offset: f64,
    _stop: oneshot::Sender<()>,
    watcher: JoinHandle<()>,
}

impl Running {
    fn is_alive(&self) -> bool {
        !self.watcher.is_finished()
    }

    fn position(&self) -> f64 {
        self.offset + self.started.elapsed().as_secs_f64()
    }
}

impl FfplayMedia {
    pub fn new(program: impl Into<String>, probe_program: impl Into<String>) -> Self {
        let (sender, events) = mpsc::unbounded_channel();
        Self {
            program: program.into(),
            probe_program: probe_program.into(),
            source: None,
            duration: None,
            position: 0.0,
            running: None,
            loads: 0,
            sender,
            events: Some(events),
        }
    }

    /// Stop the running process, keeping the position it reached.
    fn halt(&mut self) {
        if let Some(running) = self.running.take() {
            let position = if running.is_alive() {
                running.position()
            } else {
                self.duration.unwrap_or_else(|| running.position())
            };
            self.position = match self.duration {
                Some(duration) => position.min(duration),
                None => position,
            };
            // Dropping the sender wakes the watcher, which drops (and kills) the child.
        }
    }

    fn spawn(&mut self, source: &Url) -> Result<()> {
        let child = Command::new(&self.program)
            .arg("-nodisp")
            .arg("-autoexit")
            .arg("-loglevel").arg("quiet")
            .arg("-ss").arg(format!("{:.3}", self.position))
            .arg(source.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let mut child = match child {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LecternError::ToolNotFound(self.program.clone()));
            }
            Err(e) => {
                return Err(LecternError::Media(format!("{} failed to start: {e}", self.program)));
            }
        };

        let (stop, mut stopped) = oneshot::channel::<()>();
        let sender = self.sender.clone();
        let program = self.program.clone();
        let load = self.loads;
        let offset = self.position;
        let started = Instant::now();

        let watcher = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK);
            loop {
                tokio::select! {
                    _ = &mut stopped => return,
                    status = child.wait() => {
                        let event = match status {
                            Ok(s) if s.success() => MediaEvent::Ended,
                            Ok(s) => MediaEvent::Failed(format!("{} exited with {}", program, s)),
                            Err(e) => MediaEvent::Failed(format!("{} failed: {}", program, e)),
                        };
                        let _ = sender.send(MediaUpdate { load, event });
                        return;
                    }
                    _ = ticker.tick() => {
                        let position = offset + started.elapsed().as_secs_f64();
                        let event = MediaEvent::TimeUpdate { position };
                        let _ = sender.send(MediaUpdate { load, event });
                    }
                }
            }
        });

        self.running = Some(Running {
            started,
            offset,
            _stop: stop,
            watcher,
        });
        Ok(())
    }

    /// Query the duration of `source` using ffprobe with JSON output.
    async fn probe_duration(&self, source: &Url) -> Result<f64> {
        let result = Command::new(&self.probe_program)
            .arg("-v").arg("quiet")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .arg(source.as_str())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LecternError::ToolNotFound(self.probe_program.clone()));
            }
            Err(e) => {
                return Err(LecternError::Media(format!("ffprobe failed: {e}")));
            }
        };

        if !output.status.success() {
            return Err(LecternError::Media("ffprobe returned error".into()));
        }

        parse_probe_duration(&output.stdout)
    }
}

/// Read `format.duration` from ffprobe's JSON output.
fn parse_probe_duration(stdout: &[u8]) -> Result<f64> {
    let parsed: serde_json::Value = serde_json::from_slice(stdout)
        .map_err(|_| LecternError::Media("Invalid ffprobe output".into()))?;

    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| LecternError::Media("Could not determine audio duration".into()))
}

#[async_trait]
impl MediaPort for FfplayMedia {
    #[instrument(skip(self, url), fields(url = %url))]
    async fn load(&mut self, url: &Url) -> Result<u64> {
        self.halt();
        self.loads += 1;
        self.source = Some(url.clone());
        self.position = 0.0;
        self.duration = None;

        match self.probe_duration(url).await {
            Ok(duration) => {
                debug!(duration, "Probed audio");
                self.duration = Some(duration);
                let event = MediaEvent::MetadataLoaded { duration };
                let _ = self.sender.send(MediaUpdate { load: self.loads, event });
            }
            Err(e @ LecternError::ToolNotFound(_)) => return Err(e),
            Err(e) => warn!("Duration unknown: {}", e),
        }
        Ok(self.loads)
    }

    async fn unload(&mut self) -> Result<()> {
        self.halt();
        self.loads += 1;
        self.source = None;
        self.duration = None;
        self.position = 0.0;
        Ok(())
    }

    async fn play(&mut self) -> Result<()> {
        if self.running.as_ref().is_some_and(Running::is_alive) {
            return Ok(());
        }
        self.running = None;

        let source = self
            .source
            .clone()
            .ok_or_else(|| LecternError::Media("No audio loaded".into()))?;
        self.spawn(&source)
    }

    async fn pause(&mut self) -> Result<()> {
        self.halt();
        Ok(())
    }

    async fn seek_to(&mut self, seconds: f64) -> Result<()> {
        let was_playing = self.running.as_ref().is_some_and(Running::is_alive);
        self.halt();
        self.position = seconds.max(0.0);
        match (was_playing, self.source.clone()) {
            (true, Some(source)) => self.spawn(&source),
            _ => Ok(()),
        }
    }

    fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<MediaUpdate>> {
        self.events.take()
    }
}
