//! Test doubles shared across modules.

use std::time::Duration;

use crate::{
    model::Command,
    surface::{Health, Rect, Surface, SurfaceError},
};

/// One call the core made on a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Place(Rect),
    Show(Command),
    Hide,
    Pause,
    Reload,
    Recreate,
}

/// In-memory surface that records every call and never blocks.
#[derive(Debug)]
pub(crate) struct RecordingSurface {
    pub(crate) calls: Vec<Call>,
    pub(crate) health: Health,
    pub(crate) visible: bool,
    /// Makes `reload` and `recreate` fail as if `ready` never arrived.
    pub(crate) fail_reload: bool,
    /// Makes `show` fail as if the surface went away.
    pub(crate) fail_show: bool,
    pub(crate) work_area: Rect,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            health: Health::Alive,
            visible: false,
            fail_reload: false,
            fail_show: false,
            work_area: Rect::DEFAULT_WORK_AREA,
        }
    }
}

impl RecordingSurface {
    /// `cmd_id`s of every command shown, in order.
    pub(crate) fn shown_ids(&self) -> Vec<Option<String>> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Show(cmd) => Some(cmd.cmd_id.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn shown(&self) -> Vec<&Command> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Show(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl Surface for RecordingSurface {
    fn health(&mut self) -> Health {
        self.health.clone()
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn work_area(&self) -> Rect {
        self.work_area
    }

    fn place(&mut self, bounds: Rect) -> Result<(), SurfaceError> {
        self.calls.push(Call::Place(bounds));
        Ok(())
    }

    fn show(&mut self, command: &Command) -> Result<(), SurfaceError> {
        self.calls.push(Call::Show(command.clone()));
        if self.fail_show {
            return Err(SurfaceError::Gone);
        }
        self.visible = true;
        Ok(())
    }

    fn hide(&mut self) -> Result<(), SurfaceError> {
        self.calls.push(Call::Hide);
        self.visible = false;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), SurfaceError> {
        self.calls.push(Call::Pause);
        Ok(())
    }

    fn reload(&mut self, timeout: Duration) -> Result<(), SurfaceError> {
        self.calls.push(Call::Reload);
        self.visible = false;
        if self.fail_reload {
            return Err(SurfaceError::Timeout(timeout));
        }
        Ok(())
    }

    fn recreate(&mut self, timeout: Duration) -> Result<(), SurfaceError> {
        self.calls.push(Call::Recreate);
        self.visible = false;
        if self.fail_reload {
            return Err(SurfaceError::Timeout(timeout));
        }
        self.health = Health::Alive;
        Ok(())
    }
}
