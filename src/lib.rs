//! Lectern - ask your textbooks
//!
//! A terminal client for a textbook question-answering backend.
//!
//! # Overview
//!
//! Lectern allows you to:
//! - Track which uploaded books are embedded and ready to query
//! - Ask questions across all ready books or a chosen subset
//! - Listen to spoken answers, switch voices and download the audio
//! - Search the books for matching passages
//!
//! # Architecture
//!
//! - `api` - Backend contract and its HTTP implementation
//! - `library` - Book readiness tracking and library management
//! - `voices` - Voice catalog grouped by language
//! - `query` - Question and search orchestration
//! - `audio` - Playback lifecycle, voice regeneration and downloads
//! - `app` - Session wiring
//! - `config` - Configuration management
//! - `notify` - Notification and confirmation ports
//!
//! # Example
//!
//! ```rust,no_run
//! use lectern::app::{App, AskOptions};
//! use lectern::cli::{ConsoleNotifier, StdinConfirmer};
//! use lectern::config::Settings;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let mut app = App::new(
//!         settings,
//!         Arc::new(ConsoleNotifier),
//!         Arc::new(StdinConfirmer { assume_yes: false }),
//!     )?;
//!     app.load().await?;
//!
//!     let options = AskOptions::default();
//!     if let Some(answer) = app.ask("What is entropy?", &options).await?.settled() {
//!         println!("{}", answer.answer);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app;
pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod library;
pub mod notify;
pub mod query;
pub mod voices;

pub use error::{LecternError, Result};
