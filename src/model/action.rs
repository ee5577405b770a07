//! Actions: the user's response to a prompt, as reported by the surface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A user response. Logged once, never retained.
///
/// Only `action` is typed. The optional fields are carried as raw JSON so a
/// surface sending `"minutes": "5"` still gets its response logged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// What the user did (`back_on_track`, `stuck`, `snooze`, `align_choice`, ...).
    pub action: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_action_ms: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Action {
    /// The one action that leaves the surface on screen.
    pub const PAUSE: &'static str = "pause_15";

    /// Keys owned by the log record; a surface can't override them.
    const RESERVED: [&'static str; 6] = ["type", "ts", "cmd_id", "source_event_id", "level", "block_id"];

    /// The pause hotkey, expressed as an action.
    pub fn pause() -> Self {
        Self {
            action: Self::PAUSE.into(),
            time_to_action_ms: Some(Value::from(0)),
            ..Self::default()
        }
    }

    pub fn is_pause(&self) -> bool {
        self.action == Self::PAUSE
    }

    /// Drops extra keys that would collide with the record's own fields.
    pub(crate) fn without_reserved(mut self) -> Self {
        for key in Self::RESERVED {
            self.extra.remove(key);
        }
        self
    }
}
