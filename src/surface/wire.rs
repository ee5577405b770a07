//! Wire protocol between the core and a surface: one JSON object per line,
//! tagged by `type`.
//!
//! ```text
//! core → surface   {"type":"show","command":{...}}  {"type":"hide"}  {"type":"pause"}
//!                  {"type":"place","x":..,"y":..,"width":..,"height":..}  {"type":"reload"}
//! surface → core   {"type":"ready"}  {"type":"display","x":..,"y":..,"width":..,"height":..}
//!                  {"type":"action","action":"snooze","minutes":5}
//!                  {"type":"relaunch_request",...}  {"type":"ui_event","name":"...",...}
//!                  {"type":"pause"}  {"type":"unresponsive"}  {"type":"renderer_gone","reason":"..."}
//! ```
//!
//! A surface sends `ready` once its content has loaded, at startup and after
//! every `reload`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{Action, Command};

use super::Rect;

/// Messages the core sends to a surface.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound<'a> {
    Show { command: &'a Command },
    Hide,
    Pause,
    Place(Rect),
    Reload,
}

/// Messages a surface sends to the core.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// Content finished loading.
    Ready,

    /// Work area of the display the surface lives on.
    Display(Rect),

    /// The user responded to the current prompt.
    Action(Action),

    /// The user asked for a relaunch from the recovery prompt.
    RelaunchRequest {
        #[serde(flatten)]
        meta: Map<String, Value>,
    },

    /// Free-form telemetry, logged verbatim.
    UiEvent {
        name: String,
        #[serde(flatten)]
        meta: Map<String, Value>,
    },

    /// The pause hotkey fired.
    Pause,

    /// The renderer stopped responding to input.
    Unresponsive,

    /// The renderer process went away.
    RendererGone {
        #[serde(default)]
        reason: Option<String>,
    },
}

impl Inbound {
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}
