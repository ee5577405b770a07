//! The display surface: whatever actually puts a prompt on screen.
//!
//! The overlay core never renders anything itself. It drives a [`Surface`]
//! through a small contract (place, show, hide, pause, reload) and hears back
//! from it through [`Inbound`] messages delivered on a channel.
//!
//! Two surfaces ship with the binary, both speaking the line-delimited JSON
//! protocol in [`wire`]:
//!
//! - [`ProcessSurface`] spawns the UI as a child process and talks over its stdio.
//! - [`StdioSurface`] talks over this process's own stdin/stdout.

mod link;
mod process;
mod stdio;
pub mod wire;

use std::{io, time::Duration};

use serde::{Deserialize, Serialize};

use crate::model::{Command, Level};

pub use process::ProcessSurface;
pub use stdio::StdioSurface;
pub use wire::Inbound;

/// Errors raised while driving a surface.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("surface did not report ready within {0:?}")]
    Timeout(Duration),

    #[error("surface is not running")]
    Gone,
}

/// A screen rectangle in display points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Work area assumed until the surface reports its display.
    pub const DEFAULT_WORK_AREA: Self = Self {
        x: 0,
        y: 0,
        width: 1440,
        height: 900,
    };
}

/// Liveness of the surface, as far as the core can tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    Alive,

    /// Closed on purpose; the overlay should shut down with it.
    Exited,

    /// Gone without being asked to.
    Crashed { reason: String },
}

/// The contract the core drives a display surface through.
///
/// Calls are made from the event loop only, never concurrently.
pub trait Surface {
    fn health(&mut self) -> Health;

    fn is_visible(&self) -> bool;

    /// Work area of the display prompts are placed on.
    fn work_area(&self) -> Rect;

    fn place(&mut self, bounds: Rect) -> Result<(), SurfaceError>;

    /// Makes the surface visible and renders `command`.
    fn show(&mut self, command: &Command) -> Result<(), SurfaceError>;

    fn hide(&mut self) -> Result<(), SurfaceError>;

    /// Tells the surface the user paused prompts.
    fn pause(&mut self) -> Result<(), SurfaceError>;

    /// Reloads content in place and waits for the surface to report ready.
    fn reload(&mut self, timeout: Duration) -> Result<(), SurfaceError>;

    /// Rebuilds a surface that is gone and waits for it to report ready.
    fn recreate(&mut self, timeout: Duration) -> Result<(), SurfaceError>;
}

const BANNER: (u32, u32) = (360, 140);
const CARD: (u32, u32) = (640, 360);
const BANNER_MARGIN_RIGHT: i64 = 20;
const BANNER_MARGIN_TOP: i64 = 24;

/// Where a prompt of `level` goes within `work_area`.
///
/// Level A is a banner in the top-right corner; B and C are a centered card.
pub fn placement(level: Level, work_area: Rect) -> Rect {
    let wa_x = i64::from(work_area.x);
    let wa_y = i64::from(work_area.y);
    let wa_w = i64::from(work_area.width);
    let wa_h = i64::from(work_area.height);

    match level {
        Level::A => {
            let (width, height) = BANNER;
            Rect {
                x: clamp_i32(wa_x + wa_w - i64::from(width) - BANNER_MARGIN_RIGHT),
                y: clamp_i32(wa_y + BANNER_MARGIN_TOP),
                width,
                height,
            }
        }
        Level::B | Level::C => {
            let (width, height) = CARD;
            Rect {
                x: clamp_i32(wa_x + half_rounded(wa_w - i64::from(width))),
                y: clamp_i32(wa_y + half_rounded(wa_h - i64::from(height))),
                width,
                height,
            }
        }
    }
}

/// Halves, rounding .5 up.
fn half_rounded(n: i64) -> i64 {
    (n + 1).div_euclid(2)
}

fn clamp_i32(n: i64) -> i32 {
    i32::try_from(n).unwrap_or(if n < 0 { i32::MIN } else { i32::MAX })
}
