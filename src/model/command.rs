//! Commands: what the scheduler asks the overlay to show.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// How intrusive a prompt is. Controls placement and size on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    /// Small banner in the corner.
    A,

    /// Centered card.
    #[default]
    B,

    /// Centered card, strongest wording.
    C,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        };
        f.write_str(s)
    }
}

/// One line of the command file.
///
/// Every field is optional on the wire. Keys the overlay doesn't interpret
/// (`style_id`, `question_id`, `ts`, ...) are kept in `extra` and forwarded
/// to the surface untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd_id: Option<String>,

    /// Missing or `null` means [`Level::B`]; see [`Command::level`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_event_id: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_line: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,

    /// Ordered answers. Presence switches the surface into align mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Command {
    pub const DATA_ERROR: &'static str = "DATA_ERROR";
    pub const RENDERER_ISSUE: &'static str = "RENDERER_ISSUE";
    pub const RELAUNCH_CHOICE: &'static str = "Relaunch overlay";

    /// Parses one command line. Anything but a JSON object is rejected.
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    pub fn level(&self) -> Level {
        self.level.unwrap_or_default()
    }

    /// Whether the surface should render the choice buttons.
    pub fn is_align(&self) -> bool {
        self.choices.is_some()
    }

    /// Shown in place of a command line that could not be parsed.
    pub fn data_error(error: &str) -> Self {
        Self::synthetic(
            Self::DATA_ERROR,
            "Coach data error",
            "A coaching prompt could not be read.",
            error,
            "Check the scheduler output, then carry on with your current block.",
        )
    }

    /// Shown when automatic renderer recovery has been throttled.
    pub fn renderer_issue(reason: &str) -> Self {
        Self {
            choices: Some(vec![Self::RELAUNCH_CHOICE.to_string()]),
            ..Self::synthetic(
                Self::RENDERER_ISSUE,
                "Overlay needs a relaunch",
                "The overlay stopped responding and automatic recovery is paused.",
                reason,
                "Relaunch the overlay to continue.",
            )
        }
    }

    fn synthetic(
        event_type: &str,
        headline: &str,
        human_line: &str,
        diagnosis: &str,
        next_action: &str,
    ) -> Self {
        let mut extra = Map::new();
        extra.insert("source".into(), Value::from("overlay"));
        Self {
            cmd_id: Some(Uuid::new_v4().to_string()),
            level: Some(Level::B),
            headline: Some(headline.into()),
            human_line: Some(human_line.into()),
            diagnosis: Some(diagnosis.into()),
            next_action: Some(next_action.into()),
            event_type: Some(event_type.into()),
            extra,
            ..Self::default()
        }
    }
}
