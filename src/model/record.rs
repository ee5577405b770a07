//! Records: one line of the day's event log.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Action, Command, Level, Platform};

/// A single entry in the event log, serialized as one line of NDJSON.
///
/// Tagged by `type` so each line is self-describing when read back.
/// Correlation fields are written as `null` rather than omitted, so
/// downstream readers can rely on their presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Record {
    /// A command was handed to the surface.
    OverlayShown {
        ts: Timestamp,
        cmd_id: Option<String>,
        source_event_id: Option<Value>,
        level: Level,
        block_id: Option<Value>,
        /// Re-shown after a renderer recovery rather than freshly dispatched.
        replay: bool,
    },

    /// The surface refused a command. The command is still current, so a
    /// later recovery replays it.
    OverlayShowFailed {
        ts: Timestamp,
        cmd_id: Option<String>,
        source_event_id: Option<Value>,
        level: Level,
        block_id: Option<Value>,
        replay: bool,
        error: String,
    },

    /// The user responded, stamped with the command on screen at the time.
    OverlayAction {
        ts: Timestamp,
        cmd_id: Option<String>,
        source_event_id: Option<Value>,
        level: Level,
        block_id: Option<Value>,
        #[serde(flatten)]
        action: Action,
    },

    /// A command line was not a valid command.
    CommandParseError {
        ts: Timestamp,
        /// The offending line, truncated.
        line: String,
        error: String,
        platform: String,
        arch: String,
    },

    /// The renderer was recovered.
    Rehydrate {
        ts: Timestamp,
        reason: String,
        visible_before: bool,
        recreated: bool,
        replayed_cmd_id: Option<String>,
        attempt: u32,
    },

    /// A recovery attempt failed. Still counts against the budget.
    RehydrateFailed {
        ts: Timestamp,
        reason: String,
        error: String,
        attempt: u32,
    },

    /// Recovery was refused because the budget for the window is spent.
    RehydrateThrottled {
        ts: Timestamp,
        reason: String,
        count: u32,
        window_ms: u64,
    },

    /// Free-form telemetry from the surface.
    UiEvent {
        ts: Timestamp,
        name: String,
        platform: String,
        arch: String,
        #[serde(flatten)]
        meta: Map<String, Value>,
    },
}

impl Record {
    pub fn shown(command: &Command, replay: bool) -> Self {
        Self::OverlayShown {
            ts: Timestamp::now(),
            cmd_id: command.cmd_id.clone(),
            source_event_id: command.source_event_id.clone(),
            level: command.level(),
            block_id: command.block_id.clone(),
            replay,
        }
    }

    pub fn show_failed(command: &Command, replay: bool, error: &str) -> Self {
        Self::OverlayShowFailed {
            ts: Timestamp::now(),
            cmd_id: command.cmd_id.clone(),
            source_event_id: command.source_event_id.clone(),
            level: command.level(),
            block_id: command.block_id.clone(),
            replay,
            error: error.to_string(),
        }
    }

    /// Stamps an action with the current command's correlation fields.
    ///
    /// With nothing on screen the level falls back to [`Level::A`], the
    /// banner level, which is what a bare hotkey press implies.
    pub fn action(current: Option<&Command>, action: Action) -> Self {
        Self::OverlayAction {
            ts: Timestamp::now(),
            cmd_id: current.and_then(|c| c.cmd_id.clone()),
            source_event_id: current.and_then(|c| c.source_event_id.clone()),
            level: current.map_or(Level::A, Command::level),
            block_id: current.and_then(|c| c.block_id.clone()),
            action: action.without_reserved(),
        }
    }

    pub fn parse_error(line: &str, error: &str, max_chars: usize, platform: &Platform) -> Self {
        Self::CommandParseError {
            ts: Timestamp::now(),
            line: line.chars().take(max_chars).collect(),
            error: error.to_string(),
            platform: platform.os.clone(),
            arch: platform.arch.clone(),
        }
    }

    pub fn ui_event(name: &str, mut meta: Map<String, Value>, platform: &Platform) -> Self {
        for key in ["type", "ts", "name", "platform", "arch"] {
            meta.remove(key);
        }
        Self::UiEvent {
            ts: Timestamp::now(),
            name: name.to_string(),
            platform: platform.os.clone(),
            arch: platform.arch.clone(),
            meta,
        }
    }
}
