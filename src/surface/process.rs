//! Surface backed by a child UI process speaking the wire protocol on its stdio.

use std::{
    path::PathBuf,
    process::{Child, ChildStdin, Command as Process, Stdio},
    sync::{Arc, mpsc::Sender},
    time::Duration,
};

use tracing::{info, warn};

use crate::model::Command;

use super::{
    Health, Rect, Surface, SurfaceError,
    link::{Link, Shared, spawn_reader},
    wire::Inbound,
};

/// A UI collaborator running as a child process.
///
/// `recreate` kills whatever is left of the child and spawns a fresh one;
/// `reload` asks the running child to reload its content.
pub struct ProcessSurface {
    program: PathBuf,
    args: Vec<String>,
    inbox: Sender<Inbound>,
    shared: Arc<Shared>,
    child: Option<Child>,
    link: Option<Link<ChildStdin>>,
}

impl ProcessSurface {
    /// Spawns the UI and waits up to `timeout` for its first `ready`.
    ///
    /// A slow first load is reported but not fatal: the surface is still
    /// returned and will render once it catches up.
    pub fn launch(
        program: impl Into<PathBuf>,
        args: Vec<String>,
        inbox: Sender<Inbound>,
        timeout: Duration,
    ) -> Result<Self, SurfaceError> {
        let mut surface = Self {
            program: program.into(),
            args,
            inbox,
            shared: Shared::new(),
            child: None,
            link: None,
        };
        surface.spawn()?;
        if let Err(e) = surface.link()?.await_ready(0, timeout) {
            warn!(error = %e, "surface has not reported ready yet");
        }
        Ok(surface)
    }

    /// Starts the child and its reader thread.
    ///
    /// Each child gets its own [`Shared`], so a `ready` still in flight from
    /// a previous child can't satisfy the wait for this one.
    fn spawn(&mut self) -> Result<(), SurfaceError> {
        let mut child = Process::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(SurfaceError::Gone);
        };

        self.shared = Shared::with_work_area(self.shared.work_area());
        spawn_reader(stdout, self.inbox.clone(), Arc::clone(&self.shared));
        info!(pid = child.id(), program = %self.program.display(), "surface launched");

        self.child = Some(child);
        self.link = Some(Link::new(stdin, Arc::clone(&self.shared)));
        Ok(())
    }

    fn link(&mut self) -> Result<&mut Link<ChildStdin>, SurfaceError> {
        self.link.as_mut().ok_or(SurfaceError::Gone)
    }

    fn stop(&mut self) {
        self.link = None;
        if let Some(mut child) = self.child.take() {
            // Already exited is fine.
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Surface for ProcessSurface {
    fn health(&mut self) -> Health {
        let Some(child) = self.child.as_mut() else {
            return Health::Crashed {
                reason: "not running".into(),
            };
        };
        match child.try_wait() {
            Ok(None) => Health::Alive,
            Ok(Some(status)) if status.success() => Health::Exited,
            Ok(Some(status)) => Health::Crashed {
                reason: status.to_string(),
            },
            Err(e) => Health::Crashed {
                reason: e.to_string(),
            },
        }
    }

    fn is_visible(&self) -> bool {
        self.link.as_ref().is_some_and(Link::is_visible)
    }

    fn work_area(&self) -> Rect {
        self.shared.work_area()
    }

    fn place(&mut self, bounds: Rect) -> Result<(), SurfaceError> {
        self.link()?.place(bounds)
    }

    fn show(&mut self, command: &Command) -> Result<(), SurfaceError> {
        self.link()?.show(command)
    }

    fn hide(&mut self) -> Result<(), SurfaceError> {
        self.link()?.hide()
    }

    fn pause(&mut self) -> Result<(), SurfaceError> {
        self.link()?.pause()
    }

    fn reload(&mut self, timeout: Duration) -> Result<(), SurfaceError> {
        self.link()?.reload(timeout)
    }

    fn recreate(&mut self, timeout: Duration) -> Result<(), SurfaceError> {
        self.stop();
        self.spawn()?;
        self.link()?.await_ready(0, timeout)
    }
}

impl Drop for ProcessSurface {
    fn drop(&mut self) {
        self.stop();
    }
}
