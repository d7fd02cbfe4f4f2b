//! CLI module for Lectern.

pub mod commands;
mod output;
pub mod preflight;

pub use output::{ConsoleNotifier, Output, StdinConfirmer};

use clap::{Parser, Subcommand};

/// Lectern - ask your textbooks, hear the answers
///
/// A terminal client for a textbook question-answering backend: upload PDFs, ask
/// questions, search passages and listen to spoken answers.
#[derive(Parser, Debug)]
#[command(name = "lectern")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Backend base URL (overrides the config file)
    #[arg(long, env = "LECTERN_BACKEND_URL", global = true)]
    pub backend_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List uploaded books and whether they are ready for questions
    Books,

    /// Show chunking statistics for a book
    Stats {
        /// Book id or file name
        book: String,
    },

    /// Show embedding progress for a book
    Status {
        /// Book id or file name
        book: String,
    },

    /// Start embedding generation for a book
    Embed {
        /// Book id or file name
        book: String,
    },

    /// Delete a book and all its chunks
    Delete {
        /// Book id or file name
        book: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Upload a PDF
    Upload {
        /// Path to the PDF file
        path: String,
    },

    /// List available voices by language
    Voices,

    /// Ask a question and get an answer from your books
    Ask {
        /// The question to ask
        question: String,

        /// Restrict to these books (id or file name, repeatable)
        #[arg(short, long = "book")]
        books: Vec<String>,

        /// Voice for the spoken answer
        #[arg(long)]
        voice: Option<String>,

        /// Answer in text only
        #[arg(long)]
        no_audio: bool,

        /// Play the spoken answer
        #[arg(short, long)]
        play: bool,

        /// Save the spoken answer to the download directory
        #[arg(short, long)]
        download: bool,
    },

    /// Search for relevant passages
    Search {
        /// Search query
        query: String,

        /// Restrict to these books (id or file name, repeatable)
        #[arg(short, long = "book")]
        books: Vec<String>,
    },

    /// Start an interactive question and listening session
    Listen {
        /// Restrict to these books (id or file name, repeatable)
        #[arg(short, long = "book")]
        books: Vec<String>,

        /// Voice for spoken answers
        #[arg(long)]
        voice: Option<String>,
    },

    /// Check the backend and local playback tools
    Health,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "backend.base_url")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
