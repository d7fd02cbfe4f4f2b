//! CLI output formatting utilities.

use crate::api::{AnswerResult, AudioAsset, Document, SearchResultItem, Voice};
use crate::notify::{Confirmer, Notice, NoticeLevel, Notifier};
use crate::query::MatchQuality;
use async_trait::async_trait;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one catalog entry with its readiness.
    pub fn book(doc: &Document) {
        let readiness = if doc.is_ready() {
            style("ready".to_string()).green()
        } else if doc.chunk_count == 0 {
            style("no chunks".to_string()).red()
        } else {
            style(format!("embedding {:.0}%", doc.embedding_progress())).yellow()
        };
        let uploaded = doc
            .upload_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown date".to_string());

        println!(
            "  {} {} ({}, {} pages, {} chunks, {}) [{}]",
            style("*").cyan(),
            style(&doc.filename).bold(),
            style(&doc.id).dim(),
            doc.total_pages,
            doc.chunk_count,
            uploaded,
            readiness
        );
    }

    /// Print a synthesized answer with its sources and excerpts.
    pub fn answer(result: &AnswerResult) {
        if result.success {
            println!("\n{}\n", result.answer);
        } else {
            Output::error(&result.answer);
            return;
        }

        if let Some(note) = result.note.as_deref().filter(|n| !n.is_empty()) {
            Output::info(note);
        }
        if let Some(language) = &result.language {
            Output::kv("Language", language);
        }

        if !result.sources.is_empty() {
            Output::header("Sources");
            for source in &result.sources {
                Output::list_item(source);
            }
        }

        if !result.chunks_used.is_empty() {
            Output::header(&format!("Excerpts ({})", result.chunks_used.len()));
            for excerpt in &result.chunks_used {
                let location = [excerpt.chapter.as_deref(), excerpt.section.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" / ");
                Output::passage(
                    &excerpt.book_filename,
                    &location,
                    excerpt.similarity_score,
                    &excerpt.content,
                );
            }
        }

        if let Some(audio) = &result.audio {
            Output::audio(audio, result.voice_used.as_deref());
        }
    }

    /// Print what is known about the spoken answer.
    pub fn audio(audio: &AudioAsset, voice_used: Option<&str>) {
        Output::header("Audio");
        if audio.playable_url().is_none() {
            let reason = audio.error.as_deref().unwrap_or("no audio was produced");
            Output::warning(&format!("Audio unavailable: {}", reason));
            return;
        }
        if let Some(voice) = voice_used.or(audio.voice_id.as_deref()) {
            Output::kv("Voice", voice);
        }
        if let Some(length) = audio.text_length {
            Output::kv("Text length", &format!("{} characters", length));
        }
        if let Some(minutes) = audio.duration_estimate {
            Output::kv("Estimated duration", &format!("{:.1} min", minutes));
        }
    }

    /// Print a search hit.
    pub fn search_result(item: &SearchResultItem) {
        let mut location = Vec::new();
        if let Some(chapter) = &item.chapter {
            location.push(chapter.clone());
        }
        if let Some(section) = &item.section {
            location.push(section.clone());
        }
        if let Some(page) = item.page {
            location.push(format!("p. {}", page));
        }
        Output::passage(
            &item.book_filename,
            &location.join(" / "),
            item.similarity_score,
            &item.content,
        );
    }

    fn passage(book: &str, location: &str, score: f64, content: &str) {
        let quality = MatchQuality::from_score(score);
        let label = match quality {
            MatchQuality::Excellent => style(quality.label()).green(),
            MatchQuality::Good => style(quality.label()).yellow(),
            MatchQuality::Low => style(quality.label()).dim(),
        };
        println!(
            "\n{} {} {} ({}, {:.0}%)",
            style(">>").green(),
            style(book).bold(),
            style(location).cyan(),
            label,
            score * 100.0
        );
        println!("   {}", content_preview(content, 200));
    }

    /// Print one language group of voices.
    pub fn voice_group(language: &str, voices: &[Voice], default_voice: &str) {
        println!("\n{}", style(language).bold());
        for voice in voices {
            let marker = if voice.id == default_voice { " (default)" } else { "" };
            println!(
                "  {} {} {}{}",
                style("*").cyan(),
                voice.name,
                style(&voice.id).dim(),
                marker
            );
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }

    /// Create a bar for a percentage.
    pub fn percent_bar(percent: f64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(100);
        if let Ok(bar_style) = ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}% {msg}")
        {
            pb.set_style(bar_style.progress_chars("#>-"));
        }
        pb.set_position(percent.clamp(0.0, 100.0).round() as u64);
        pb.set_message(msg.to_string());
        pb
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}

/// Shows notices on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => Output::info(&notice.message),
            NoticeLevel::Success => Output::success(&notice.message),
            NoticeLevel::Warning => Output::warning(&notice.message),
            NoticeLevel::Error => Output::error(&notice.message),
        }
    }
}

/// Asks yes/no questions on stdin. `assume_yes` skips the prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirmer {
    pub assume_yes: bool,
}

#[async_trait]
impl Confirmer for StdinConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        print!("{} {} [y/N] ", style("??").yellow().bold(), prompt);
        if std::io::stdout().flush().is_err() {
            return false;
        }

        let answer = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => matches!(line.trim().to_lowercase().as_str(), "y" | "yes"),
            _ => false,
        }
    }
}
