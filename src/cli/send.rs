//! `coach send`: queue a command the way the scheduler would.

use clap::{Args, ValueEnum};
use jiff::Timestamp;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    config::Config,
    model::{Command, Level},
    storage::{CommandQueue, today},
};

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Main line of the prompt.
    #[arg(long)]
    headline: String,

    /// How intrusive the prompt is.
    #[arg(long, value_enum, ignore_case = true, default_value_t = LevelArg::B)]
    level: LevelArg,

    #[arg(long)]
    human_line: Option<String>,

    #[arg(long)]
    diagnosis: Option<String>,

    #[arg(long)]
    next_action: Option<String>,

    #[arg(long)]
    block_id: Option<String>,

    #[arg(long)]
    block_name: Option<String>,

    #[arg(long)]
    event_type: Option<String>,

    /// Answer offered to the user. Repeat for several; any turns on align mode.
    #[arg(long = "choice")]
    choices: Vec<String>,
}

/// CLI-facing level, mapped to the domain `Level`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LevelArg {
    /// Corner banner.
    A,
    /// Centered card.
    B,
    /// Centered card, strongest wording.
    C,
}

impl LevelArg {
    fn to_domain(self) -> Level {
        match self {
            Self::A => Level::A,
            Self::B => Level::B,
            Self::C => Level::C,
        }
    }
}

impl SendArgs {
    fn to_command(&self) -> Command {
        let mut command = Command {
            cmd_id: Some(Uuid::new_v4().to_string()),
            level: Some(self.level.to_domain()),
            block_id: self.block_id.clone().map(Value::String),
            block_name: self.block_name.clone(),
            headline: Some(self.headline.clone()),
            human_line: self.human_line.clone(),
            diagnosis: self.diagnosis.clone(),
            next_action: self.next_action.clone(),
            choices: (!self.choices.is_empty()).then(|| self.choices.clone()),
            event_type: self.event_type.clone(),
            ..Command::default()
        };
        command
            .extra
            .insert("ts".into(), Value::String(Timestamp::now().to_string()));
        command.extra.insert("source".into(), Value::from("cli"));
        command
    }
}

pub(super) fn cmd_send(config: &Config, args: &SendArgs) -> Result<(), String> {
    let command = args.to_command();
    CommandQueue::new(config.command_path())
        .send(today(), &command)
        .map_err(|e| format!("failed to queue command: {e}"))?;

    if let Some(id) = &command.cmd_id {
        println!("{id}");
    }
    Ok(())
}
