//! Event log commands: actions, prune.

use jiff::civil::Date;

use crate::{
    config::Config,
    storage::{CommandQueue, EventLog, prune_dated, today},
};

pub(super) fn cmd_actions(config: &Config, date: Option<Date>) -> Result<(), String> {
    let date = date.unwrap_or_else(today);
    let records = EventLog::new(config.actions_path())
        .load(date)
        .map_err(|e| format!("failed to read event log: {e}"))?;

    if records.is_empty() {
        eprintln!("No records for {date}");
        return Ok(());
    }

    for record in &records {
        println!("{record}");
    }
    Ok(())
}

pub(super) fn cmd_prune(config: &Config) -> Result<(), String> {
    let removed = prune(config)?;
    if config.log_keep_days == 0 {
        eprintln!("Pruning disabled (log-keep-days = 0)");
    } else {
        eprintln!("Removed {removed} file(s) older than {} day(s)", config.log_keep_days);
    }
    Ok(())
}

/// Prunes the command queue, its history and the event log. Returns files removed.
pub(super) fn prune(config: &Config) -> Result<usize, String> {
    let queue = CommandQueue::new(config.command_path());
    let bases = [
        config.command_path(),
        queue.history_base(),
        config.actions_path(),
    ];

    let date = today();
    let mut removed = 0;
    for base in &bases {
        removed += prune_dated(base, config.log_keep_days, date)
            .map_err(|e| format!("failed to prune {}: {e}", base.display()))?;
    }
    Ok(removed)
}
