//! The overlay core: tail commands, drive the surface, recover it when it breaks.
//!
//! One thread does all the work. Each tick polls the command file and checks
//! on the surface; between ticks the loop waits on the surface's inbound
//! channel, so file handling and surface messages never interleave.

mod presenter;

use std::{
    sync::mpsc::{Receiver, RecvTimeoutError},
    time::{Duration, Instant},
};

use jiff::civil::Date;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    model::Platform,
    rehydrate::{Decision, RehydrationBudget, Rehydrator, Trigger},
    storage::{EventLog, today},
    surface::{Health, Inbound, Surface},
    tailer::CommandTailer,
};

use presenter::Presenter;

pub struct Overlay<S> {
    tailer: CommandTailer,
    rehydrator: Rehydrator,
    presenter: Presenter<S>,
    /// Set while the surface is crashed. The first crashed tick always
    /// reports; later ones retry only when the budget has room.
    surface_down: bool,
}

impl<S: Surface> Overlay<S> {
    /// Opens today's command file (discarding stale commands) and takes over `surface`.
    pub fn new(surface: S, config: &Config, date: Date) -> Self {
        Self::with_platform(surface, config, date, Platform::current())
    }

    pub fn with_platform(surface: S, config: &Config, date: Date, platform: Platform) -> Self {
        let rehydrator = Rehydrator::new(
            platform.clone(),
            RehydrationBudget::new(config.rehydrate_max_per_window, config.rehydrate_window()),
            config.reload_timeout(),
        );
        Self {
            tailer: CommandTailer::open(config.command_path(), date),
            rehydrator,
            presenter: Presenter::new(
                surface,
                EventLog::new(config.actions_path()),
                platform,
                config.parse_error_max_chars,
            ),
            surface_down: false,
        }
    }

    /// Dispatches every command appended since the last poll.
    pub fn poll(&mut self, date: Date) {
        let presenter = &mut self.presenter;
        match self.tailer.poll(date, |outcome| presenter.accept(outcome)) {
            Ok(0) => {}
            Ok(n) => debug!(lines = n, "drained command file"),
            Err(e) => warn!(path = %self.tailer.path().display(), error = %e, "command poll failed"),
        }
    }

    /// Checks the surface. Returns false once it has exited for good.
    ///
    /// A surface that stays crashed after a failed recreate is retried on
    /// later ticks, but only while an attempt would be admitted. A spent
    /// budget leaves it alone until the window reopens instead of logging
    /// a throttle every tick.
    pub fn check_health(&mut self, now: Instant) -> bool {
        match self.presenter.surface_mut().health() {
            Health::Alive => {
                self.surface_down = false;
                true
            }
            Health::Exited => false,
            Health::Crashed { reason } => {
                if !self.surface_down {
                    self.surface_down = true;
                    warn!(%reason, "surface crashed");
                    self.rehydrate(Trigger::ProcessGone { reason }, now);
                } else if self.rehydrator.can_attempt(now) {
                    debug!(%reason, "surface still down, retrying");
                    self.rehydrate(Trigger::ProcessGone { reason }, now);
                }
                true
            }
        }
    }

    /// Handles one message from the surface.
    pub fn handle(&mut self, message: Inbound, now: Instant) {
        match message {
            Inbound::Action(action) => self.presenter.record_action(action),
            Inbound::Pause => self.presenter.pause(),
            Inbound::UiEvent { name, meta } => self.presenter.ui_event(&name, meta),
            Inbound::RelaunchRequest { meta } => {
                info!(?meta, "relaunch requested");
                self.rehydrate(Trigger::Manual, now);
            }
            Inbound::Unresponsive => self.rehydrate(Trigger::Unresponsive, now),
            Inbound::RendererGone { reason } => {
                let reason = reason.unwrap_or_else(|| "unknown".into());
                self.rehydrate(Trigger::ProcessGone { reason }, now);
            }
            // Consumed by the surface's reader; nothing left to do here.
            Inbound::Ready | Inbound::Display(_) => {}
        }
    }

    /// Runs a trigger through the rehydration policy and acts on the decision.
    pub fn rehydrate(&mut self, trigger: Trigger, now: Instant) {
        match self.rehydrator.decide(&trigger, now) {
            Decision::Skip => {}
            Decision::Throttled { count } => {
                self.presenter
                    .throttled(&trigger, count, self.rehydrator.window());
            }
            Decision::Attempt { attempt } => {
                self.presenter
                    .recover(&trigger, attempt, self.rehydrator.reload_timeout());
            }
        }
    }

    /// Runs until the surface exits or its inbound channel closes.
    pub fn run(&mut self, inbox: &Receiver<Inbound>, interval: Duration) {
        info!(
            path = %self.tailer.path().display(),
            interval_ms = interval.as_millis(),
            "overlay running"
        );
        let mut next_tick = Instant::now();
        loop {
            let now = Instant::now();
            if now >= next_tick {
                if !self.check_health(now) {
                    info!("surface exited, shutting down");
                    return;
                }
                self.poll(today());
                next_tick = now + interval;
                continue;
            }

            match inbox.recv_timeout(next_tick - now) {
                Ok(message) => self.handle(message, Instant::now()),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!("surface disconnected, shutting down");
                    return;
                }
            }
        }
    }

    #[cfg(test)]
    fn surface(&self) -> &S {
        self.presenter.surface()
    }
}
