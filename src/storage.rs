//! Local persistence for the overlay's NDJSON files.
//!
//! Every file lives under one log directory and carries the calendar date
//! inserted before its extension:
//!
//! ```text
//! <log-dir>/
//!   overlay_cmd_2026-10-19.ndjson           # Command queue, truncated after each drain
//!   overlay_cmd_history_2026-10-19.ndjson   # Every command sent (append-only)
//!   overlay_actions_2026-10-19.ndjson       # Event log: shown, actions, diagnostics
//! ```
//!
//! Paths are derived from the date at the moment of use, so a process running
//! across midnight moves on to the next day's files.

mod command_queue;
mod event_log;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use jiff::{ToSpan, civil::Date};
use tracing::{debug, warn};

pub use command_queue::CommandQueue;
pub use event_log::EventLog;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// Today's date in the system time zone.
pub fn today() -> Date {
    jiff::Zoned::now().date()
}

/// Inserts `_YYYY-MM-DD` before the extension of `base`.
///
/// `logs/overlay_cmd.ndjson` on 2026-10-19 becomes
/// `logs/overlay_cmd_2026-10-19.ndjson`.
pub fn dated_path(base: &Path, date: Date) -> PathBuf {
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{stem}_{date}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{date}"),
    };
    base.with_file_name(name)
}

/// Creates the parent directory and an empty file if either is missing.
///
/// Never truncates an existing file.
pub fn ensure_file(path: &Path) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::OpenOptions::new().create(true).append(true).open(path)?;
    Ok(())
}

/// Removes dated siblings of `base` older than `keep_days` days before `today`.
///
/// Files whose date suffix doesn't parse are left alone, which also keeps
/// `overlay_cmd_history_*` safe when pruning `overlay_cmd`.
/// A `keep_days` of zero disables pruning. Returns the number of files removed.
pub fn prune_dated(base: &Path, keep_days: u32, today: Date) -> Result<usize> {
    if keep_days == 0 {
        return Ok(0);
    }
    let cutoff = today.saturating_sub(i64::from(keep_days).days());

    let dir = base
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = format!("{stem}_");
    let suffix = base
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Some(stamp) = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(&suffix))
        else {
            continue;
        };
        let Ok(date) = stamp.parse::<Date>() else {
            continue;
        };
        if date >= cutoff {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => {
                debug!(path = %entry.path().display(), "pruned dated log");
                removed += 1;
            }
            Err(e) => warn!(path = %entry.path().display(), error = %e, "failed to prune dated log"),
        }
    }
    Ok(removed)
}
