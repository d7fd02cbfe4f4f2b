//! Config command implementation.

use crate::cli::{ConfigAction, Output};
use crate::config::Settings;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Run the config command against `path`, or the default location when `None`.
///
/// `settings` is the effective configuration, including command-line overrides.
pub fn run_config(action: &ConfigAction, settings: Settings, path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(Settings::default_config_path);

    match action {
        ConfigAction::Show => {
            let rendered = toml::to_string_pretty(&settings).context("rendering configuration")?;
            println!("# {}\n{}", path.display(), rendered);
        }
        ConfigAction::Set { key, value } => {
            set_value(&path, key, value)?;
            Output::success(&format!("{} = {}", key, value));
        }
        ConfigAction::Edit => edit(&path)?,
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}

/// Update one key in the stored file. Overrides from flags or the environment are not
/// written back.
fn set_value(path: &Path, key: &str, value: &str) -> Result<()> {
    let path = path.to_path_buf();
    let mut stored = Settings::load_from(Some(&path))?;
    stored.set(key, value)?;
    stored.save_to(&path)?;
    Ok(())
}

/// Open the file in `$VISUAL` or `$EDITOR`, creating it with defaults first.
fn edit(path: &Path) -> Result<()> {
    let path = path.to_path_buf();
    if !path.exists() {
        Settings::default().save_to(&path)?;
        Output::info(&format!("Wrote defaults to {}", path.display()));
    }

    let editor = std::env::var("VISUAL")
        .or_else(|_| std::env::var("EDITOR"))
        .unwrap_or_else(|_| "vi".to_string());

    let status = std::process::Command::new(&editor)
        .arg(&path)
        .status()
        .with_context(|| format!("starting {}", editor))?;
    if !status.success() {
        Output::warning(&format!("{} exited with {}", editor, status));
        return Ok(());
    }

    match Settings::load_from(Some(&path)) {
        Ok(_) => Output::success("Configuration is valid."),
        Err(e) => Output::warning(&format!("The edited file does not load: {}", e)),
    }
    Ok(())
}
