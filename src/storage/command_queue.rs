//! Command queue writer: the scheduler's side of the command file.
//!
//! The overlay tails and truncates the dated command file; the history file
//! keeps every command ever sent for the day and is never truncated.

use std::{fs, io::Write, path::PathBuf};

use jiff::civil::Date;

use crate::model::Command;

use super::{Result, dated_path};

/// Appends commands for the overlay to pick up.
pub struct CommandQueue {
    base: PathBuf,
}

impl CommandQueue {
    /// `base` is the undated command path, e.g. `logs/overlay_cmd.ndjson`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn path_for(&self, date: Date) -> PathBuf {
        dated_path(&self.base, date)
    }

    /// Undated history path: `overlay_cmd.ndjson` → `overlay_cmd_history.ndjson`.
    pub fn history_base(&self) -> PathBuf {
        let stem = self
            .base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match self.base.extension() {
            Some(ext) => format!("{stem}_history.{}", ext.to_string_lossy()),
            None => format!("{stem}_history"),
        };
        self.base.with_file_name(name)
    }

    pub fn history_path_for(&self, date: Date) -> PathBuf {
        dated_path(&self.history_base(), date)
    }

    /// Appends one command line to the queue and to the history.
    ///
    /// The line is written with a single `write_all` so the tailer never
    /// observes a command without its trailing newline under normal conditions.
    pub fn send(&self, date: Date, command: &Command) -> Result<()> {
        let mut line = serde_json::to_string(command)?;
        line.push('\n');
        for path in [self.path_for(date), self.history_path_for(date)] {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            file.write_all(line.as_bytes())?;
        }
        Ok(())
    }
}
