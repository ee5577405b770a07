//! Event log: append-only sink for shown/action/diagnostic records.

use std::{fs, io, path::PathBuf};

// Traits must be in scope for `.lines()` on BufReader and `.write_all()` on File.
use io::{BufRead, Write};

use jiff::civil::Date;
use tracing::warn;

use crate::model::Record;

use super::{Result, dated_path, today};

/// Date-partitioned NDJSON log of everything the overlay showed and heard.
pub struct EventLog {
    base: PathBuf,
}

impl EventLog {
    /// `base` is the undated path, e.g. `logs/overlay_actions.ndjson`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// The log file for a given day.
    pub fn path_for(&self, date: Date) -> PathBuf {
        dated_path(&self.base, date)
    }

    /// Appends a record to today's log.
    ///
    /// Failures are reported and swallowed: losing a telemetry line must
    /// never take the prompt flow down with it.
    pub fn append(&self, record: &Record) {
        if let Err(e) = self.try_append_on(today(), record) {
            warn!(base = %self.base.display(), error = %e, "failed to append event record");
        }
    }

    /// Appends a record to the log for `date`, creating directory and file as needed.
    pub fn try_append_on(&self, date: Date, record: &Record) -> Result<()> {
        let path = self.path_for(date);
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Loads every record logged on `date` as raw JSON.
    ///
    /// A missing file is an empty log. Blank lines are skipped.
    pub fn load(&self, date: Date) -> Result<Vec<serde_json::Value>> {
        let path = self.path_for(date);
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let reader = io::BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(&line)?);
            }
        }
        Ok(records)
    }
}
