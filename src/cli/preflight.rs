//! Pre-flight checks before operations that need local tools.
//!
//! Validates that required tools are available before starting operations that would
//! otherwise fail midway.

use crate::config::Settings;
use crate::error::{LecternError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Playing answers needs the player and the prober.
    Playback,
    /// Asking, searching and library management only need the backend.
    Remote,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Playback => {
            check_tool(&settings.player.program)?;
            check_tool(&settings.player.probe_program)?;
        }
        Operation::Remote => {
            url::Url::parse(&settings.backend.base_url)?;
        }
    }
    Ok(())
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("-version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(LecternError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(LecternError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(LecternError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
