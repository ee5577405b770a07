//! Presenter: owns the surface and the command on screen.
//!
//! Everything that shows, hides or replays a command goes through here, and
//! every one of those moves leaves a record in the event log.

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::{
    model::{Action, Command, Platform, Record},
    rehydrate::Trigger,
    storage::EventLog,
    surface::{Health, Surface, SurfaceError, placement},
    tailer::{LineOutcome, ParseFailure},
};

pub struct Presenter<S> {
    surface: S,
    log: EventLog,
    platform: Platform,
    /// Last command dispatched. Actions are stamped with it and recovery replays it.
    current: Option<Command>,
    /// Command the renderer-issue prompt took the place of, restored after a
    /// successful recovery.
    displaced: Option<Command>,
    parse_error_max_chars: usize,
}

impl<S: Surface> Presenter<S> {
    pub fn new(surface: S, log: EventLog, platform: Platform, parse_error_max_chars: usize) -> Self {
        Self {
            surface,
            log,
            platform,
            current: None,
            displaced: None,
            parse_error_max_chars,
        }
    }

    #[cfg(test)]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<&Command> {
        self.current.as_ref()
    }

    /// Handles one line from the command tailer.
    pub fn accept(&mut self, outcome: LineOutcome) {
        match outcome {
            Ok(command) => self.dispatch(command),
            Err(ParseFailure { line, error }) => {
                warn!(%error, "malformed command line");
                self.log.append(&Record::parse_error(
                    &line,
                    &error,
                    self.parse_error_max_chars,
                    &self.platform,
                ));
                self.dispatch(Command::data_error(&error));
            }
        }
    }

    /// Puts a fresh command on screen. It supersedes anything displaced.
    pub fn dispatch(&mut self, command: Command) {
        self.displaced = None;
        self.present(command);
    }

    fn present(&mut self, command: Command) {
        debug!(
            cmd_id = ?command.cmd_id,
            level = %command.level(),
            align = command.is_align(),
            "dispatching command"
        );
        let bounds = placement(command.level(), self.surface.work_area());
        match self
            .surface
            .place(bounds)
            .and_then(|()| self.surface.show(&command))
        {
            Ok(()) => self.log.append(&Record::shown(&command, false)),
            Err(e) => {
                warn!(cmd_id = ?command.cmd_id, error = %e, "surface failed to show command");
                self.log
                    .append(&Record::show_failed(&command, false, &e.to_string()));
            }
        }
        self.current = Some(command);
    }

    /// Logs a user response. Anything but a pause also dismisses the prompt.
    pub fn record_action(&mut self, action: Action) {
        let dismiss = !action.is_pause();
        let cmd_id = self.current.as_ref().and_then(|c| c.cmd_id.as_deref());
        info!(action = %action.action, ?cmd_id, "user action");
        self.log.append(&Record::action(self.current.as_ref(), action));
        if dismiss && let Err(e) = self.surface.hide() {
            warn!(error = %e, "failed to hide surface after action");
        }
    }

    /// The pause hotkey: logged like an action, then the prompt steps aside.
    pub fn pause(&mut self) {
        self.log
            .append(&Record::action(self.current.as_ref(), Action::pause()));
        if !self.surface.is_visible() {
            return;
        }
        if let Err(e) = self.surface.pause().and_then(|()| self.surface.hide()) {
            warn!(error = %e, "failed to pause surface");
        }
    }

    pub fn ui_event(&mut self, name: &str, meta: Map<String, Value>) {
        self.log.append(&Record::ui_event(name, meta, &self.platform));
    }

    /// Recovery refused: log it and ask the user to relaunch by hand.
    pub fn throttled(&mut self, trigger: &Trigger, count: u32, window: Duration) {
        let reason = trigger.to_string();
        warn!(%reason, count, "renderer recovery throttled");
        self.log.append(&Record::RehydrateThrottled {
            ts: jiff::Timestamp::now(),
            reason: reason.clone(),
            count,
            window_ms: u64::try_from(window.as_millis()).unwrap_or(u64::MAX),
        });

        let showing_issue = self
            .current
            .as_ref()
            .is_some_and(|c| c.event_type.as_deref() == Some(Command::RENDERER_ISSUE));
        if !showing_issue {
            self.displaced = self.current.take();
        }
        self.present(Command::renderer_issue(&reason));
    }

    /// Rebuilds or reloads the surface and replays the last command.
    ///
    /// Never fails: the outcome is logged either way.
    pub fn recover(&mut self, trigger: &Trigger, attempt: u32, timeout: Duration) {
        let reason = trigger.to_string();
        let visible_before = self.surface.is_visible();
        let recreated = self.surface.health() != Health::Alive;
        info!(%reason, attempt, recreated, "rehydrating renderer");

        match self.restore(recreated, visible_before, timeout) {
            Ok(replayed_cmd_id) => self.log.append(&Record::Rehydrate {
                ts: jiff::Timestamp::now(),
                reason,
                visible_before,
                recreated,
                replayed_cmd_id,
                attempt,
            }),
            Err(e) => {
                warn!(%reason, attempt, error = %e, "renderer rehydration failed");
                self.log.append(&Record::RehydrateFailed {
                    ts: jiff::Timestamp::now(),
                    reason,
                    error: e.to_string(),
                    attempt,
                });
            }
        }
    }

    fn restore(
        &mut self,
        recreate: bool,
        visible_before: bool,
        timeout: Duration,
    ) -> Result<Option<String>, SurfaceError> {
        if recreate {
            self.surface.recreate(timeout)?;
        } else {
            self.surface.reload(timeout)?;
        }

        if let Some(command) = self.displaced.take() {
            self.current = Some(command);
        }
        let Some(command) = self.current.as_ref() else {
            return Ok(None);
        };

        self.surface
            .place(placement(command.level(), self.surface.work_area()))?;
        self.surface.show(command)?;
        self.log.append(&Record::shown(command, true));
        if !visible_before {
            self.surface.hide()?;
        }
        Ok(command.cmd_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::civil::Date;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::{
        storage::today,
        test_support::{Call, RecordingSurface},
    };

    fn presenter(dir: &TempDir) -> Presenter<RecordingSurface> {
        Presenter::new(
            RecordingSurface::default(),
            EventLog::new(dir.path().join("overlay_actions.ndjson")),
            Platform::new("macos", "aarch64"),
            500,
        )
    }

    fn records(dir: &TempDir, date: Date) -> Vec<Value> {
        EventLog::new(dir.path().join("overlay_actions.ndjson"))
            .load(date)
            .unwrap()
    }

    fn cmd(json: &str) -> Command {
        Command::parse(json).unwrap()
    }

    #[test]
    fn dispatch_places_shows_and_logs() {
        let dir = TempDir::new().unwrap();
        let mut p = presenter(&dir);

        p.dispatch(cmd(r#"{"cmd_id":"c1","level":"A"}"#));

        let calls = &p.surface().calls;
        assert_eq!(calls.len(), 2);
        assert!(matches!(calls[0], Call::Place(r) if r.width == 360 && r.height == 140));
        assert!(matches!(&calls[1], Call::Show(c) if c.cmd_id.as_deref() == Some("c1")));

        let log = records(&dir, today());
        assert_eq!(log.len(), 1);
        assert_eq!(log[0]["type"], "OVERLAY_SHOWN");
        assert_eq!(log[0]["level"], "A");
        assert_eq!(p.current().and_then(|c| c.cmd_id.as_deref()), Some("c1"));
    }

    #[test]
    fn refused_show_is_logged_as_a_failure() {
        let dir = TempDir::new().unwrap();
        let mut p = presenter(&dir);
        p.surface_mut().fail_show = true;

        p.dispatch(cmd(r#"{"cmd_id":"c1","level":"B"}"#));

        let log = records(&dir, today());
        assert_eq!(log.len(), 1);
        assert_eq!(log[0]["type"], "OVERLAY_SHOW_FAILED");
        assert_eq!(log[0]["cmd_id"], "c1");
        assert!(log[0]["error"].as_str().is_some_and(|e| !e.is_empty()));
        assert!(!p.surface().visible);

        p.surface_mut().fail_show = false;
        p.recover(&Trigger::Unresponsive, 1, Duration::from_secs(1));

        let log = records(&dir, today());
        let shown: Vec<&Value> = log.iter().filter(|r| r["type"] == "OVERLAY_SHOWN").collect();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0]["replay"], true);
        assert_eq!(shown[0]["cmd_id"], "c1");
    }

    #[test]
    fn parse_failure_logs_and_shows_data_error() {
        let dir = TempDir::new().unwrap();
        let mut p = presenter(&dir);

        p.accept(Err(ParseFailure {
            line: "not json".into(),
            error: "expected value at line 1 column 1".into(),
        }));

        let shown = p.surface().shown();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].event_type.as_deref(), Some(Command::DATA_ERROR));

        let log = records(&dir, today());
        assert_eq!(log[0]["type"], "COMMAND_PARSE_ERROR");
        assert_eq!(log[0]["line"], "not json");
        assert_eq!(log[0]["platform"], "macos");
        assert_eq!(log[1]["type"], "OVERLAY_SHOWN");
    }

    #[test]
    fn actions_are_stamped_and_dismiss_the_prompt() {
        let dir = TempDir::new().unwrap();
        let mut p = presenter(&dir);
        p.dispatch(cmd(
            r#"{"cmd_id":"c1","level":"C","source_event_id":7,"block_id":"deep-work"}"#,
        ));

        let action: Action =
            serde_json::from_value(json!({"action": "stuck", "cmd_id": "forged"})).unwrap();
        p.record_action(action);

        assert_eq!(p.surface().calls.last(), Some(&Call::Hide));
        let log = records(&dir, today());
        let logged = &log[1];
        assert_eq!(logged["type"], "OVERLAY_ACTION");
        assert_eq!(logged["action"], "stuck");
        assert_eq!(logged["cmd_id"], "c1");
        assert_eq!(logged["source_event_id"], 7);
        assert_eq!(logged["level"], "C");
        assert_eq!(logged["block_id"], "deep-work");
    }

    #[test]
    fn loosely_typed_action_is_still_logged() {
        let dir = TempDir::new().unwrap();
        let mut p = presenter(&dir);
        p.dispatch(cmd(r#"{"cmd_id":"c1"}"#));

        let action: Action = serde_json::from_value(json!({
            "action": "snooze",
            "minutes": "5",
            "reason": {"code": 3},
            "time_to_action_ms": 2.5,
        }))
        .unwrap();
        p.record_action(action);

        let log = records(&dir, today());
        let logged = &log[1];
        assert_eq!(logged["type"], "OVERLAY_ACTION");
        assert_eq!(logged["cmd_id"], "c1");
        assert_eq!(logged["minutes"], "5");
        assert_eq!(logged["reason"], json!({"code": 3}));
        assert_eq!(logged["time_to_action_ms"], 2.5);
    }

    #[test]
    fn pause_action_leaves_prompt_up() {
        let dir = TempDir::new().unwrap();
        let mut p = presenter(&dir);
        p.dispatch(cmd(r#"{"cmd_id":"c1"}"#));

        p.record_action(Action::pause());

        assert_eq!(p.surface().count(&Call::Hide), 0);
        assert!(p.surface().visible);
    }

    #[test]
    fn pause_hotkey_pauses_then_hides_visible_surface() {
        let dir = TempDir::new().unwrap();
        let mut p = presenter(&dir);
        p.dispatch(cmd(r#"{"cmd_id":"c1"}"#));

        p.pause();

        let calls = &p.surface().calls;
        assert_eq!(&calls[calls.len() - 2..], &[Call::Pause, Call::Hide]);
        let log = records(&dir, today());
        assert_eq!(log[1]["action"], "pause_15");
        assert_eq!(log[1]["time_to_action_ms"], 0);
        assert_eq!(log[1]["cmd_id"], "c1");
    }

    #[test]
    fn pause_hotkey_with_nothing_on_screen_only_logs() {
        let dir = TempDir::new().unwrap();
        let mut p = presenter(&dir);

        p.pause();

        assert!(p.surface().calls.is_empty());
        let log = records(&dir, today());
        assert_eq!(log.len(), 1);
        assert_eq!(log[0]["level"], "A");
        assert_eq!(log[0]["cmd_id"], Value::Null);
    }

    #[test]
    fn recover_replays_last_command_once() {
        let dir = TempDir::new().unwrap();
        let mut p = presenter(&dir);
        p.dispatch(cmd(r#"{"cmd_id":"c1"}"#));

        p.recover(&Trigger::Unresponsive, 1, Duration::from_secs(1));

        assert_eq!(p.surface().count(&Call::Reload), 1);
        assert_eq!(p.surface().shown_ids(), vec![Some("c1".into()); 2]);
        assert!(p.surface().visible);

        let log = records(&dir, today());
        let replays: Vec<&Value> = log
            .iter()
            .filter(|r| r["type"] == "OVERLAY_SHOWN" && r["replay"] == true)
            .collect();
        assert_eq!(replays.len(), 1);
        let rehydrate = log.iter().find(|r| r["type"] == "REHYDRATE").unwrap();
        assert_eq!(rehydrate["replayed_cmd_id"], "c1");
        assert_eq!(rehydrate["visible_before"], true);
        assert_eq!(rehydrate["recreated"], false);
        assert_eq!(rehydrate["reason"], "unresponsive");
    }

    #[test]
    fn recover_with_nothing_shown_replays_nothing() {
        let dir = TempDir::new().unwrap();
        let mut p = presenter(&dir);

        p.recover(&Trigger::Unresponsive, 1, Duration::from_secs(1));

        assert_eq!(p.surface().calls, vec![Call::Reload]);
        let log = records(&dir, today());
        assert_eq!(log.len(), 1);
        assert_eq!(log[0]["type"], "REHYDRATE");
        assert_eq!(log[0]["replayed_cmd_id"], Value::Null);
    }

    #[test]
    fn recover_keeps_hidden_prompt_hidden() {
        let dir = TempDir::new().unwrap();
        let mut p = presenter(&dir);
        p.dispatch(cmd(r#"{"cmd_id":"c1"}"#));
        p.record_action(serde_json::from_value(json!({"action": "back_on_track"})).unwrap());

        p.recover(&Trigger::Unresponsive, 1, Duration::from_secs(1));

        let calls = &p.surface().calls;
        assert!(matches!(calls[calls.len() - 2], Call::Show(_)));
        assert_eq!(calls.last(), Some(&Call::Hide));
        assert!(!p.surface().visible);
    }

    #[test]
    fn dead_surface_is_recreated() {
        let dir = TempDir::new().unwrap();
        let mut p = presenter(&dir);
        p.surface_mut().health = Health::Crashed {
            reason: "signal: 9".into(),
        };

        let trigger = Trigger::ProcessGone {
            reason: "signal: 9".into(),
        };
        p.recover(&trigger, 1, Duration::from_secs(1));

        assert_eq!(p.surface().calls, vec![Call::Recreate]);
        let log = records(&dir, today());
        assert_eq!(log[0]["recreated"], true);
        assert_eq!(log[0]["reason"], "render-process-gone: signal: 9");
    }

    #[test]
    fn failed_recovery_is_logged_not_raised() {
        let dir = TempDir::new().unwrap();
        let mut p = presenter(&dir);
        p.dispatch(cmd(r#"{"cmd_id":"c1"}"#));
        p.surface_mut().fail_reload = true;

        p.recover(&Trigger::Unresponsive, 2, Duration::from_millis(10));

        let log = records(&dir, today());
        let failed = log.last().unwrap();
        assert_eq!(failed["type"], "REHYDRATE_FAILED");
        assert_eq!(failed["attempt"], 2);
        assert!(failed["error"].as_str().unwrap().contains("ready"));
        assert_eq!(p.surface().shown_ids().len(), 1);
    }

    #[test]
    fn throttle_shows_renderer_issue_and_recovery_restores_displaced() {
        let dir = TempDir::new().unwrap();
        let mut p = presenter(&dir);
        p.dispatch(cmd(r#"{"cmd_id":"c1"}"#));

        p.throttled(&Trigger::Unresponsive, 3, Duration::from_secs(30));
        p.throttled(&Trigger::Unresponsive, 3, Duration::from_secs(30));

        let issue = p.current().unwrap();
        assert_eq!(issue.event_type.as_deref(), Some(Command::RENDERER_ISSUE));
        assert_eq!(issue.choices, Some(vec![Command::RELAUNCH_CHOICE.to_string()]));

        p.recover(&Trigger::Manual, 1, Duration::from_secs(1));

        assert_eq!(p.current().and_then(|c| c.cmd_id.as_deref()), Some("c1"));
        assert_eq!(p.surface().shown_ids().last(), Some(&Some("c1".into())));

        let log = records(&dir, today());
        let throttled: Vec<&Value> = log
            .iter()
            .filter(|r| r["type"] == "REHYDRATE_THROTTLED")
            .collect();
        assert_eq!(throttled.len(), 2);
        assert_eq!(throttled[0]["window_ms"], 30_000);
        assert_eq!(throttled[0]["count"], 3);
    }

    #[test]
    fn new_command_supersedes_displaced_one() {
        let dir = TempDir::new().unwrap();
        let mut p = presenter(&dir);
        p.dispatch(cmd(r#"{"cmd_id":"c1"}"#));
        p.throttled(&Trigger::Unresponsive, 3, Duration::from_secs(30));
        p.dispatch(cmd(r#"{"cmd_id":"c2"}"#));

        p.recover(&Trigger::Manual, 1, Duration::from_secs(1));

        assert_eq!(p.surface().shown_ids().last(), Some(&Some("c2".into())));
    }

    #[test]
    fn ui_events_are_logged_with_platform() {
        let dir = TempDir::new().unwrap();
        let mut p = presenter(&dir);
        let mut meta = Map::new();
        meta.insert("key".into(), json!("Escape"));

        p.ui_event("hotkey_blocked", meta);

        let log = records(&dir, today());
        assert_eq!(log[0]["type"], "UI_EVENT");
        assert_eq!(log[0]["name"], "hotkey_blocked");
        assert_eq!(log[0]["key"], "Escape");
        assert_eq!(log[0]["arch"], "aarch64");
    }
}
