//! Interactive question and listening session.

use super::ask::save_audio;
use super::connect;
use crate::api::{AnswerResult, AudioAsset};
use crate::app::{App, AskOptions};
use crate::audio::player::FfplayMedia;
use crate::audio::{AudioLifecycleController, MediaPort, PlaybackState};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::Result as LecternResult;
use crate::query::Submission;
use anyhow::Result;
use console::style;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::{JoinError, JoinHandle};
use tracing::debug;

const HELP: &str = "\
  <question>        ask a question
  :play, :p         play or pause the answer
  :seek <percent>   jump to a position, e.g. :seek 50
  :time             show the playback position
  :voice <id>       re-record the answer with another voice
  :voices           list voices
  :download         save the answer's audio
  :books <id>...    restrict questions to these books
  :all              ask across all ready books
  :text             toggle spoken answers
  :reset            abandon the question in progress
  :help             show this help
  :quit             leave";

/// A command typed at the prompt.
#[derive(Debug, Clone, PartialEq)]
enum Input {
    Ask(String),
    Toggle,
    Seek(f64),
    Time,
    Voice(String),
    Voices,
    Download,
    Books(Vec<String>),
    AllBooks,
    TextOnly,
    Reset,
    Help,
    Quit,
    Unknown(String),
}

impl Input {
    fn parse(line: &str) -> Option<Input> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix(':') else {
            if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                return Some(Input::Quit);
            }
            return Some(Input::Ask(line.to_string()));
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default().to_lowercase();
        let args: Vec<String> = parts.map(str::to_string).collect();

        let input = match name.as_str() {
            "play" | "pause" | "p" => Input::Toggle,
            "seek" => match args.first().and_then(|a| a.trim_end_matches('%').parse::<f64>().ok()) {
                Some(percent) => Input::Seek(percent / 100.0),
                None => Input::Unknown("usage: :seek <percent>".to_string()),
            },
            "time" => Input::Time,
            "voice" => match args.first() {
                Some(id) => Input::Voice(id.clone()),
                None => Input::Unknown("usage: :voice <id>".to_string()),
            },
            "voices" => Input::Voices,
            "download" | "save" => Input::Download,
            "books" | "book" if !args.is_empty() => Input::Books(args),
            "all" => Input::AllBooks,
            "text" => Input::TextOnly,
            "reset" => Input::Reset,
            "help" | "h" | "?" => Input::Help,
            "quit" | "q" | "exit" => Input::Quit,
            other => Input::Unknown(format!("unknown command ':{}'", other)),
        };
        Some(input)
    }
}

struct Session {
    app: App,
    audio: AudioLifecycleController<FfplayMedia>,
    options: AskOptions,
    question: Option<JoinHandle<LecternResult<Submission<AnswerResult>>>>,
    regeneration: Option<JoinHandle<LecternResult<Submission<AudioAsset>>>>,
}

/// Run the listen command.
pub async fn run_listen(books: Vec<String>, voice: Option<String>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Playback, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let app = connect(settings, false).await?;
    if !app.tracker.can_query() {
        Output::warning("No book is ready yet. Questions will be refused until one is.");
    }

    let media = FfplayMedia::new(&app.settings().player.program, &app.settings().player.probe_program);
    let mut audio = app.audio(media);
    let mut events = audio
        .media_mut()
        .take_events()
        .ok_or_else(|| anyhow::anyhow!("media events already taken"))?;

    let options = AskOptions {
        scope: books,
        voice,
        speak: app.settings().ask.generate_audio,
    };
    let mut session = Session {
        app,
        audio,
        options,
        question: None,
        regeneration: None,
    };

    println!("\n{}", style("Lectern").bold().cyan());
    println!("{}\n", style("Ask a question, or ':help' for commands.").dim());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if let Some(input) = Input::parse(&line) {
                    if input == Input::Quit {
                        break;
                    }
                    session.handle(input).await;
                }
                prompt();
            }
            Some(update) = events.recv() => {
                if let Err(e) = session.audio.handle_update(update) {
                    Output::error(&e.to_string());
                }
            }
            joined = task_done(&mut session.question) => {
                session.question = None;
                session.finish_ask(joined).await;
                prompt();
            }
            joined = task_done(&mut session.regeneration) => {
                session.regeneration = None;
                session.finish_regeneration(joined).await;
                prompt();
            }
        }
    }

    if session.audio.is_playing() {
        let _ = session.audio.toggle_playback().await;
    }
    Output::info("Goodbye!");
    Ok(())
}

/// Resolves when a background task finishes; never resolves without one.
async fn task_done<T>(pending: &mut Option<JoinHandle<T>>) -> std::result::Result<T, JoinError> {
    match pending {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

fn prompt() {
    print!("{} ", style("?").green().bold());
    let _ = std::io::stdout().flush();
}

impl Session {
    async fn handle(&mut self, input: Input) {
        match input {
            Input::Ask(question) => self.ask(&question),
            Input::Toggle => match self.audio.toggle_playback().await {
                Ok(PlaybackState::Playing) => Output::info("Playing"),
                Ok(_) => Output::info(&format!("Paused at {}", self.audio.time_label())),
                Err(e) => Output::error(&e.to_string()),
            },
            Input::Seek(fraction) => match self.audio.seek(fraction).await {
                Ok(true) => Output::info(&self.audio.time_label()),
                Ok(false) => Output::warning("The length of this audio is not known yet."),
                Err(e) => Output::error(&e.to_string()),
            },
            Input::Time => {
                let bar = Output::percent_bar(self.audio.progress() * 100.0, &self.audio.time_label());
                bar.abandon();
            }
            Input::Voice(voice_id) => self.regenerate(voice_id),
            Input::Voices => {
                for (language, voices) in self.app.voices.group_by_language().iter() {
                    Output::voice_group(language, voices, &self.app.settings().ask.default_voice);
                }
            }
            Input::Download => {
                let _ = save_audio(&self.app, &self.audio).await;
            }
            Input::Books(books) => match self.app.tracker.resolve_scope(&books) {
                Ok(_) => {
                    Output::info(&format!("Asking only: {}", books.join(", ")));
                    self.options.scope = books;
                }
                Err(e) => Output::error(&e.to_string()),
            },
            Input::AllBooks => {
                self.options.scope.clear();
                Output::info("Asking across all ready books");
            }
            Input::TextOnly => {
                self.options.speak = !self.options.speak;
                Output::info(if self.options.speak {
                    "Answers will be spoken"
                } else {
                    "Answers will be text only"
                });
            }
            Input::Reset => {
                // The detached request still runs; its answer is discarded when it lands.
                if self.question.take().is_some() {
                    debug!("Abandoning the question in progress");
                }
                self.app.questions().reset();
                Output::info("Ready for a new question");
            }
            Input::Help => println!("{}", HELP),
            Input::Quit => {}
            Input::Unknown(message) => Output::warning(&message),
        }
    }

    fn ask(&mut self, question: &str) {
        if self.question.is_some() {
            Output::warning("Still working on the last question. Type ':reset' to abandon it.");
            return;
        }
        match self.app.start_ask(question, &self.options) {
            Ok(request) => {
                Output::info("Thinking...");
                self.question = Some(tokio::spawn(request));
            }
            Err(e) => Output::error(&e.user_message()),
        }
    }

    async fn finish_ask(
        &mut self,
        joined: std::result::Result<LecternResult<Submission<AnswerResult>>, JoinError>,
    ) {
        match joined {
            Ok(Ok(Submission::Settled(result))) => {
                Output::answer(&result);
                self.reload_audio().await;
                if self.audio.state() == PlaybackState::Loaded {
                    Output::info("Type ':play' to listen");
                }
            }
            Ok(Ok(Submission::Discarded)) => debug!("Answer arrived after reset"),
            Ok(Err(e)) => Output::error(&e.user_message()),
            Err(e) => Output::error(&format!("Question task failed: {}", e)),
        }
    }

    fn regenerate(&mut self, voice_id: String) {
        if self.regeneration.is_some() {
            Output::warning("Audio is already being re-recorded.");
            return;
        }
        if self.app.voices.find(&voice_id).is_none() && !self.app.voices.voices().is_empty() {
            Output::warning(&format!("Unknown voice '{}'; trying anyway.", voice_id));
        }

        Output::info(&format!("Re-recording the answer with {}...", voice_id));
        let regenerator = self.audio.regenerator();
        self.regeneration = Some(tokio::spawn(async move {
            regenerator.regenerate(&voice_id).await
        }));
    }

    async fn finish_regeneration(
        &mut self,
        joined: std::result::Result<LecternResult<Submission<AudioAsset>>, JoinError>,
    ) {
        match joined {
            Ok(Ok(Submission::Settled(_))) => {
                self.reload_audio().await;
                Output::success("New audio is ready. Type ':play' to listen.");
            }
            Ok(Ok(Submission::Discarded)) => {
                Output::info("The answer changed before the new audio was ready.");
            }
            Ok(Err(e)) => Output::error(&format!("Could not re-record audio: {}", e.user_message())),
            Err(e) => Output::error(&format!("Audio task failed: {}", e)),
        }
    }

    async fn reload_audio(&mut self) {
        if let Err(e) = self.audio.sync().await {
            Output::error(&format!("Could not load audio: {}", e));
        }
    }
}
