//! A wire connection to a surface: writer half, reader thread, shared state.
//!
//! The reader thread parses inbound lines. `ready` and `display` are folded
//! into [`LinkState`] (the writer side waits on them); everything else goes
//! to the event loop through the inbox channel.

use std::{
    io::{BufRead, BufReader, Read, Write},
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, mpsc::Sender},
    thread,
    time::Duration,
};

use tracing::{debug, warn};

use crate::model::Command;

use super::{
    Rect, SurfaceError,
    wire::{Inbound, Outbound},
};

#[derive(Debug)]
struct LinkState {
    /// Bumped on every `ready`.
    generation: u64,
    work_area: Rect,
}

/// State written by the reader thread and read by the surface.
#[derive(Debug)]
pub(super) struct Shared {
    state: Mutex<LinkState>,
    ready: Condvar,
}

impl Shared {
    pub(super) fn new() -> Arc<Self> {
        Self::with_work_area(Rect::DEFAULT_WORK_AREA)
    }

    /// Fresh state for a new connection that keeps the last known display.
    pub(super) fn with_work_area(work_area: Rect) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(LinkState {
                generation: 0,
                work_area,
            }),
            ready: Condvar::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, LinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub(super) fn work_area(&self) -> Rect {
        self.lock().work_area
    }

    fn mark_ready(&self) {
        self.lock().generation += 1;
        self.ready.notify_all();
    }

    fn set_work_area(&self, work_area: Rect) {
        self.lock().work_area = work_area;
    }

    /// Waits until a `ready` newer than `since` arrives. False on timeout.
    pub(super) fn wait_ready(&self, since: u64, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .ready
            .wait_timeout_while(guard, timeout, |state| state.generation <= since)
            .unwrap_or_else(PoisonError::into_inner);
        guard.generation > since
    }
}

/// Spawns the thread that reads a surface's output until it closes.
pub(super) fn spawn_reader<R>(reader: R, inbox: Sender<Inbound>, shared: Arc<Shared>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || read_messages(reader, &inbox, &shared));
}

fn read_messages(reader: impl Read, inbox: &Sender<Inbound>, shared: &Shared) {
    for line in BufReader::new(reader).lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to read from surface");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match Inbound::parse(line) {
            Ok(Inbound::Ready) => shared.mark_ready(),
            Ok(Inbound::Display(work_area)) => shared.set_work_area(work_area),
            Ok(message) => {
                if inbox.send(message).is_err() {
                    break;
                }
            }
            Err(e) => warn!(error = %e, line, "ignoring malformed surface message"),
        }
    }
    debug!("surface output closed");
}

/// Writer half of a connection, plus the visibility the core last asked for.
pub(super) struct Link<W: Write> {
    writer: W,
    shared: Arc<Shared>,
    visible: bool,
}

impl<W: Write> Link<W> {
    pub(super) fn new(writer: W, shared: Arc<Shared>) -> Self {
        Self {
            writer,
            shared,
            visible: false,
        }
    }

    pub(super) fn is_visible(&self) -> bool {
        self.visible
    }

    pub(super) fn work_area(&self) -> Rect {
        self.shared.work_area()
    }

    fn send(&mut self, message: &Outbound<'_>) -> Result<(), SurfaceError> {
        serde_json::to_writer(&mut self.writer, message)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    pub(super) fn place(&mut self, bounds: Rect) -> Result<(), SurfaceError> {
        self.send(&Outbound::Place(bounds))
    }

    pub(super) fn show(&mut self, command: &Command) -> Result<(), SurfaceError> {
        self.send(&Outbound::Show { command })?;
        self.visible = true;
        Ok(())
    }

    pub(super) fn hide(&mut self) -> Result<(), SurfaceError> {
        self.send(&Outbound::Hide)?;
        self.visible = false;
        Ok(())
    }

    pub(super) fn pause(&mut self) -> Result<(), SurfaceError> {
        self.send(&Outbound::Pause)
    }

    /// Asks for a reload; the surface comes back hidden.
    pub(super) fn reload(&mut self, timeout: Duration) -> Result<(), SurfaceError> {
        let since = self.shared.generation();
        self.send(&Outbound::Reload)?;
        self.visible = false;
        self.await_ready(since, timeout)
    }

    pub(super) fn await_ready(&self, since: u64, timeout: Duration) -> Result<(), SurfaceError> {
        if self.shared.wait_ready(since, timeout) {
            Ok(())
        } else {
            Err(SurfaceError::Timeout(timeout))
        }
    }
}
