//! Health command: is the backend up, can answers be played, is there a config file.

use crate::api::{Backend, HttpBackend};
use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Pass,
    Warn,
    Fail,
}

impl Status {
    fn icon(self) -> console::StyledObject<&'static str> {
        match self {
            Status::Pass => style("✓").green(),
            Status::Warn => style("!").yellow(),
            Status::Fail => style("✗").red(),
        }
    }
}

/// One line of the report.
#[derive(Debug)]
struct Check {
    name: String,
    status: Status,
    detail: String,
    hint: Option<String>,
}

impl Check {
    fn new(name: impl Into<String>, status: Status, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            detail: detail.into(),
            hint: None,
        }
    }

    fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Checks grouped under a heading.
struct Section {
    title: &'static str,
    checks: Vec<Check>,
}

impl Section {
    fn print(&self) {
        println!("{}", style(self.title).bold());
        for check in &self.checks {
            println!(
                "  {} {} - {}",
                check.status.icon(),
                style(&check.name).bold(),
                check.detail
            );
            if let Some(hint) = &check.hint {
                println!("    {} {}", style("→").dim(), style(hint).dim());
            }
        }
        println!();
    }
}

/// Number of failed and warned checks across sections.
fn tally(sections: &[Section]) -> (usize, usize) {
    sections
        .iter()
        .flat_map(|s| &s.checks)
        .fold((0, 0), |(fail, warn), check| match check.status {
            Status::Fail => (fail + 1, warn),
            Status::Warn => (fail, warn + 1),
            Status::Pass => (fail, warn),
        })
}

/// Run the health command. Fails when any check fails; warnings are reported only.
pub async fn run_health(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Lectern Health");
    println!();

    // Playback is optional: answers can still be read and downloaded without it.
    let tools = [&settings.player.program, &settings.player.probe_program]
        .into_iter()
        .map(|program| probe_tool(program))
        .collect();

    let sections = [
        Section {
            title: "Backend",
            checks: backend_checks(settings).await,
        },
        Section {
            title: "Playback Tools",
            checks: tools,
        },
        Section {
            title: "Configuration",
            checks: vec![config_file_check()],
        },
    ];
    for section in &sections {
        section.print();
    }

    match tally(&sections) {
        (0, 0) => Output::success("Everything looks good."),
        (0, warnings) => Output::warning(&format!("Usable, with {} warning(s).", warnings)),
        (failures, _) => {
            Output::error(&format!("{} check(s) failed.", failures));
            anyhow::bail!("health check failed");
        }
    }
    Ok(())
}

async fn backend_checks(settings: &Settings) -> Vec<Check> {
    let url = &settings.backend.base_url;
    let backend = match HttpBackend::with_timeout(url, settings.timeout()) {
        Ok(backend) => backend,
        Err(e) => {
            return vec![Check::new("Backend URL", Status::Fail, e.to_string())
                .hint("lectern config set backend.base_url http://host:port")];
        }
    };

    let health = match backend.health().await {
        Ok(health) => health,
        Err(e) => {
            return vec![Check::new("Backend", Status::Fail, format!("{}: {}", url, e.user_message()))
                .hint("Start the backend or point --backend-url at it")];
        }
    };

    let mut checks = vec![if health.status.eq_ignore_ascii_case("healthy") {
        Check::new("Backend", Status::Pass, format!("{} ({})", url, health.status))
    } else {
        Check::new("Backend", Status::Warn, format!("{} reports '{}'", url, health.status))
            .hint("See the backend logs")
    }];

    if let Some(database) = health.database {
        checks.push(if database == "connected" {
            Check::new("Database", Status::Pass, database)
        } else {
            Check::new("Database", Status::Fail, database)
                .hint("The backend cannot reach its database")
        });
    }
    checks
}

/// Run `<program> -version` and report the first line of its banner.
fn probe_tool(program: &str) -> Check {
    let output = match Command::new(program).arg("-version").output() {
        Ok(output) => output,
        Err(e) => {
            let detail = if e.kind() == std::io::ErrorKind::NotFound {
                "not found (playback disabled)".to_string()
            } else {
                format!("could not run: {}", e)
            };
            return Check::new(program, Status::Warn, detail).hint(ffmpeg_hint());
        }
    };

    if !output.status.success() {
        return Check::new(program, Status::Warn, "installed but not working").hint(ffmpeg_hint());
    }
    let banner = String::from_utf8_lossy(&output.stdout);
    let first_line = banner.lines().next().unwrap_or("installed").trim();
    Check::new(program, Status::Pass, shorten(first_line, 50))
}

fn shorten(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn config_file_check() -> Check {
    let path = Settings::default_config_path();
    if path.exists() {
        Check::new("Config file", Status::Pass, path.display().to_string())
    } else {
        Check::new("Config file", Status::Warn, "not found, using defaults")
            .hint("lectern config edit")
    }
}

fn ffmpeg_hint() -> &'static str {
    if cfg!(target_os = "macos") {
        "brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install ffmpeg with your package manager, e.g. sudo apt install ffmpeg"
    } else {
        "Download ffmpeg from https://ffmpeg.org/download.html"
    }
}
