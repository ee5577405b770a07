//! Headless surface: the wire protocol over this process's stdin and stdout.
//!
//! Useful when something else owns the window (a wrapper script, an editor
//! plugin, a test harness) and pipes the protocol through us.

use std::{
    io::{self, Stdout},
    sync::{Arc, mpsc::Sender},
    time::Duration,
};

use crate::model::Command;

use super::{
    Health, Rect, Surface, SurfaceError,
    link::{Link, Shared, spawn_reader},
    wire::Inbound,
};

/// A surface on the other end of our own stdio.
///
/// There is no process to rebuild, so `recreate` is a `reload`.
pub struct StdioSurface {
    link: Link<Stdout>,
}

impl StdioSurface {
    /// Starts reading stdin. The inbox disconnects when stdin closes.
    pub fn attach(inbox: Sender<Inbound>) -> Self {
        let shared = Shared::new();
        spawn_reader(io::stdin(), inbox, Arc::clone(&shared));
        Self {
            link: Link::new(io::stdout(), shared),
        }
    }
}

impl Surface for StdioSurface {
    fn health(&mut self) -> Health {
        Health::Alive
    }

    fn is_visible(&self) -> bool {
        self.link.is_visible()
    }

    fn work_area(&self) -> Rect {
        self.link.work_area()
    }

    fn place(&mut self, bounds: Rect) -> Result<(), SurfaceError> {
        self.link.place(bounds)
    }

    fn show(&mut self, command: &Command) -> Result<(), SurfaceError> {
        self.link.show(command)
    }

    fn hide(&mut self) -> Result<(), SurfaceError> {
        self.link.hide()
    }

    fn pause(&mut self) -> Result<(), SurfaceError> {
        self.link.pause()
    }

    fn reload(&mut self, timeout: Duration) -> Result<(), SurfaceError> {
        self.link.reload(timeout)
    }

    fn recreate(&mut self, timeout: Duration) -> Result<(), SurfaceError> {
        self.link.reload(timeout)
    }
}
