//! Shared process and logging helpers

use std::ffi::OsStr;
use std::path::Path;
use std::process::Command;

#[cfg(windows)]
use std::os::windows::process::CommandExt;

/// Windows CREATE_NO_WINDOW flag to prevent console windows from appearing
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Create a Command that won't show a console window on Windows.
///
/// The agent runs hidden; a command prompt flashing up for every child
/// process would defeat that.
#[cfg(windows)]
pub fn hidden_command<S: AsRef<OsStr>>(program: S) -> Command {
    let mut cmd = Command::new(program);
    cmd.creation_flags(CREATE_NO_WINDOW);
    cmd
}

/// Create a Command (no special flags needed outside Windows)
#[cfg(not(windows))]
pub fn hidden_command<S: AsRef<OsStr>>(program: S) -> Command {
    Command::new(program)
}

/// Maximum log file size before rotation (1MB)
const MAX_LOG_SIZE: u64 = 1024 * 1024;

/// Rotate the log file if it exceeds the maximum size.
///
/// Renames the current log to .old (deleting the previous .old) when it's
/// too large. Returns Ok(true) if rotation occurred, Ok(false) if not
/// needed.
pub fn rotate_log_if_needed(log_path: &Path) -> std::io::Result<bool> {
    if !log_path.exists() {
        return Ok(false);
    }

    let metadata = std::fs::metadata(log_path)?;
    if metadata.len() <= MAX_LOG_SIZE {
        return Ok(false);
    }

    let old_path = log_path.with_extension("log.old");
    if old_path.exists() {
        let _ = std::fs::remove_file(&old_path);
    }
    std::fs::rename(log_path, &old_path)?;

    log::info!(
        "Rotated log file: {} -> {}",
        log_path.display(),
        old_path.display()
    );
    Ok(true)
}
