//! CLI interface for the coach overlay.
//!
//! `coach run` is the long-running overlay core. The other commands are
//! one-shot helpers around its files: `send` plays the scheduler's part,
//! `actions` reads the event log back, `prune` clears out old days.

mod log;
mod run;
mod send;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use jiff::civil::Date;

use crate::config::Config;

use send::SendArgs;

/// Coach: a tiny on-screen nudge driven by a command file.
#[derive(Debug, Parser)]
#[command(name = "coach", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Config file. Defaults to `~/.coach/config.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for command and event log files, overriding the config.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r#"Workflow:
  1. coach run --ui ./coach-ui -- --theme dark
     → tails today's overlay_cmd_<date>.ndjson and drives the UI
  2. coach send --headline "Back to the draft" --level A
     → prints the cmd_id; the overlay shows it on the next poll
  3. coach actions
     → today's shown/action records, one JSON object per line"#;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the overlay core until the surface exits.
    ///
    /// With `--ui`, the UI program is spawned and spoken to over its stdio.
    /// Without it, the wire protocol runs over this process's stdin/stdout.
    Run {
        /// UI program to launch.
        #[arg(long)]
        ui: Option<PathBuf>,

        /// Arguments passed to the UI program, after `--`.
        #[arg(last = true, requires = "ui")]
        ui_args: Vec<String>,
    },

    /// Queue a command for the overlay. Prints the cmd_id.
    Send(SendArgs),

    /// Print a day's event log as JSON lines.
    Actions {
        /// Day to read (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<Date>,
    },

    /// Remove dated files older than `log-keep-days`.
    Prune,
}

/// Run the CLI, returning an error message on failure.
pub fn run() -> Result<(), String> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.log_dir {
        config.log_dir = dir;
    }

    match cli.command {
        Command::Run { ui, ui_args } => run::cmd_run(&config, ui, ui_args),
        Command::Send(args) => send::cmd_send(&config, &args),
        Command::Actions { date } => log::cmd_actions(&config, date),
        Command::Prune => log::cmd_prune(&config),
    }
}
