//! Renderer rehydration policy: when a broken surface may be rebuilt.
//!
//! Two gates stand between a trigger and a reload:
//!
//! 1. Platform: automatic triggers are only honored on Apple Silicon Macs,
//!    where the renderer is known to go blank after a GPU handoff. Manual
//!    relaunch requests skip this gate.
//! 2. Budget: at most `max_per_window` attempts within a sliding window.
//!    A spent budget surfaces a recovery prompt instead of reloading again.
//!
//! The recovery procedure itself lives with the presenter, which owns the
//! surface and the last command.

use std::{
    fmt,
    time::{Duration, Instant},
};

use tracing::debug;

use crate::model::Platform;

/// Why a rehydration was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// The surface's process died.
    ProcessGone { reason: String },

    /// The surface stopped responding to input.
    Unresponsive,

    /// The user asked for a relaunch.
    Manual,
}

impl Trigger {
    /// Forced triggers bypass the platform gate and the budget.
    pub fn is_forced(&self) -> bool {
        matches!(self, Self::Manual)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProcessGone { reason } => write!(f, "render-process-gone: {reason}"),
            Self::Unresponsive => f.write_str("unresponsive"),
            Self::Manual => f.write_str("manual"),
        }
    }
}

/// What to do about a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Ignore it: automatic trigger on a platform that doesn't need recovery.
    Skip,

    /// Budget spent; surface the manual recovery prompt.
    Throttled { count: u32 },

    /// Go ahead. `attempt` is the attempt number within the current window.
    Attempt { attempt: u32 },
}

/// Sliding-window counter bounding recovery attempts.
///
/// The count resets once `window` has passed since the last admitted
/// attempt. Refused requests don't move the window, so a storm of triggers
/// can't keep it closed forever.
#[derive(Debug, Clone)]
pub struct RehydrationBudget {
    max_per_window: u32,
    window: Duration,
    count: u32,
    window_start: Option<Instant>,
    last_attempt: Option<Instant>,
}

impl RehydrationBudget {
    pub fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            count: 0,
            window_start: None,
            last_attempt: None,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether [`try_acquire`](Self::try_acquire) would admit an attempt at `now`.
    pub fn has_room(&self, now: Instant) -> bool {
        self.count < self.max_per_window
            || self
                .last_attempt
                .is_some_and(|last| now.saturating_duration_since(last) >= self.window)
    }

    /// Admits an attempt, returning its number, or `None` when throttled.
    pub fn try_acquire(&mut self, now: Instant) -> Option<u32> {
        self.expire(now);
        if self.count >= self.max_per_window {
            return None;
        }
        if self.count == 0 {
            self.window_start = Some(now);
        }
        self.count += 1;
        self.last_attempt = Some(now);
        Some(self.count)
    }

    /// Starts a fresh window holding one attempt.
    pub fn restart(&mut self, now: Instant) -> u32 {
        self.count = 1;
        self.window_start = Some(now);
        self.last_attempt = Some(now);
        self.count
    }

    fn expire(&mut self, now: Instant) {
        if let Some(last) = self.last_attempt
            && now.saturating_duration_since(last) >= self.window
        {
            if let Some(start) = self.window_start {
                debug!(
                    count = self.count,
                    open_for_ms = now.saturating_duration_since(start).as_millis(),
                    "rehydration window expired"
                );
            }
            self.count = 0;
            self.window_start = None;
        }
    }
}

/// Decides whether a trigger turns into a recovery attempt.
///
/// A manual relaunch restarts the window with one attempt, so automatic
/// triggers that follow get the rest of a fresh budget.
pub struct Rehydrator {
    platform: Platform,
    budget: RehydrationBudget,
    reload_timeout: Duration,
}

impl Rehydrator {
    pub fn new(platform: Platform, budget: RehydrationBudget, reload_timeout: Duration) -> Self {
        Self {
            platform,
            budget,
            reload_timeout,
        }
    }

    pub fn decide(&mut self, trigger: &Trigger, now: Instant) -> Decision {
        if trigger.is_forced() {
            return Decision::Attempt {
                attempt: self.budget.restart(now),
            };
        }
        if !self.platform.is_apple_silicon() {
            debug!(
                %trigger,
                os = %self.platform.os,
                arch = %self.platform.arch,
                "automatic rehydration disabled on this platform"
            );
            return Decision::Skip;
        }
        match self.budget.try_acquire(now) {
            Some(attempt) => Decision::Attempt { attempt },
            None => Decision::Throttled {
                count: self.budget.count(),
            },
        }
    }

    /// Whether an automatic trigger at `now` would be attempted.
    pub fn can_attempt(&self, now: Instant) -> bool {
        self.platform.is_apple_silicon() && self.budget.has_room(now)
    }

    /// Upper bound on waiting for a reloaded surface to report ready.
    pub fn reload_timeout(&self) -> Duration {
        self.reload_timeout
    }

    pub fn window(&self) -> Duration {
        self.budget.window()
    }

    #[cfg(test)]
    pub fn budget(&self) -> &RehydrationBudget {
        &self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(30_000);

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn apple_silicon() -> Rehydrator {
        Rehydrator::new(
            Platform::new("macos", "aarch64"),
            RehydrationBudget::new(3, WINDOW),
            secs(10),
        )
    }

    fn gone() -> Trigger {
        Trigger::ProcessGone {
            reason: "crashed".into(),
        }
    }

    #[test]
    fn fourth_trigger_within_window_is_throttled() {
        let mut rehydrator = apple_silicon();
        let t0 = Instant::now();

        let decisions: Vec<Decision> = [0, 2, 5, 9]
            .into_iter()
            .map(|s| rehydrator.decide(&gone(), t0 + secs(s)))
            .collect();

        assert_eq!(
            decisions,
            vec![
                Decision::Attempt { attempt: 1 },
                Decision::Attempt { attempt: 2 },
                Decision::Attempt { attempt: 3 },
                Decision::Throttled { count: 3 },
            ]
        );
    }

    #[test]
    fn window_reopens_after_quiet_period_since_last_attempt() {
        let mut rehydrator = apple_silicon();
        let t0 = Instant::now();
        for s in [0, 2, 4] {
            rehydrator.decide(&Trigger::Unresponsive, t0 + secs(s));
        }

        // Still within 30 s of the last attempt at t=4.
        assert_eq!(
            rehydrator.decide(&Trigger::Unresponsive, t0 + secs(33)),
            Decision::Throttled { count: 3 }
        );
        assert_eq!(
            rehydrator.decide(&Trigger::Unresponsive, t0 + secs(34)),
            Decision::Attempt { attempt: 1 }
        );
    }

    #[test]
    fn throttled_triggers_do_not_extend_the_window() {
        let mut budget = RehydrationBudget::new(1, WINDOW);
        let t0 = Instant::now();

        assert_eq!(budget.try_acquire(t0), Some(1));
        assert_eq!(budget.try_acquire(t0 + secs(20)), None);
        assert_eq!(budget.try_acquire(t0 + secs(30)), Some(1));
    }

    #[test]
    fn has_room_matches_what_try_acquire_admits() {
        let mut budget = RehydrationBudget::new(2, WINDOW);
        let t0 = Instant::now();

        assert!(budget.has_room(t0));
        budget.try_acquire(t0);
        budget.try_acquire(t0 + secs(1));
        assert!(!budget.has_room(t0 + secs(30)));
        assert!(budget.has_room(t0 + secs(31)));
        assert_eq!(budget.try_acquire(t0 + secs(31)), Some(1));
    }

    #[test]
    fn can_attempt_respects_gate_and_budget() {
        let t0 = Instant::now();
        let linux = Rehydrator::new(
            Platform::new("linux", "x86_64"),
            RehydrationBudget::new(3, WINDOW),
            secs(10),
        );
        assert!(!linux.can_attempt(t0));

        let mut rehydrator = apple_silicon();
        assert!(rehydrator.can_attempt(t0));
        for s in 0..3 {
            rehydrator.decide(&gone(), t0 + secs(s));
        }
        assert!(!rehydrator.can_attempt(t0 + secs(3)));
        assert!(rehydrator.can_attempt(t0 + secs(32)));
    }

    #[test]
    fn automatic_triggers_are_skipped_off_apple_silicon() {
        for (os, arch) in [("linux", "x86_64"), ("macos", "x86_64"), ("windows", "aarch64")] {
            let mut rehydrator = Rehydrator::new(
                Platform::new(os, arch),
                RehydrationBudget::new(3, WINDOW),
                secs(10),
            );
            let now = Instant::now();

            assert_eq!(rehydrator.decide(&gone(), now), Decision::Skip);
            assert_eq!(rehydrator.decide(&Trigger::Unresponsive, now), Decision::Skip);
            assert_eq!(rehydrator.budget().count(), 0);
        }
    }

    #[test]
    fn manual_requests_bypass_gate_and_budget() {
        let mut rehydrator = Rehydrator::new(
            Platform::new("linux", "x86_64"),
            RehydrationBudget::new(3, WINDOW),
            secs(10),
        );
        let now = Instant::now();

        assert_eq!(
            rehydrator.decide(&Trigger::Manual, now),
            Decision::Attempt { attempt: 1 }
        );

        let mut rehydrator = apple_silicon();
        for s in 0..4 {
            rehydrator.decide(&gone(), now + secs(s));
        }
        assert_eq!(
            rehydrator.decide(&Trigger::Manual, now + secs(5)),
            Decision::Attempt { attempt: 1 }
        );
        // The manual attempt opened a fresh window.
        assert_eq!(
            rehydrator.decide(&gone(), now + secs(6)),
            Decision::Attempt { attempt: 2 }
        );
    }

    #[test]
    fn trigger_reasons() {
        assert_eq!(gone().to_string(), "render-process-gone: crashed");
        assert_eq!(Trigger::Unresponsive.to_string(), "unresponsive");
        assert_eq!(Trigger::Manual.to_string(), "manual");
    }
}
