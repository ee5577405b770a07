//! Coach configuration.
//!
//! Loaded from `~/.coach/config.toml`. Every key is optional; a missing file
//! means all defaults.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

/// Coach configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the command file and the event log.
    pub log_dir: PathBuf,

    /// Undated command file name; the date is inserted before the extension.
    pub command_base: String,

    /// Undated event log file name.
    pub actions_base: String,

    pub poll_interval_ms: u64,

    pub rehydrate_window_ms: u64,

    pub rehydrate_max_per_window: u32,

    /// How long a reloaded surface gets to report ready.
    pub reload_timeout_ms: u64,

    /// Dated files older than this many days are pruned. Zero keeps everything.
    pub log_keep_days: u32,

    /// Longest prefix of a malformed command line kept in the event log.
    pub parse_error_max_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_dir: Self::home().map_or_else(|| PathBuf::from("logs"), |h| h.join("logs")),
            command_base: "overlay_cmd.ndjson".into(),
            actions_base: "overlay_actions.ndjson".into(),
            poll_interval_ms: 500,
            rehydrate_window_ms: 30_000,
            rehydrate_max_per_window: 3,
            reload_timeout_ms: 10_000,
            log_keep_days: 7,
            parse_error_max_chars: 500,
        }
    }
}

impl Config {
    /// Load config from `path`, or from `~/.coach/config.toml` when `None`.
    ///
    /// An explicitly named file must exist; the default one may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if required {
                return Err(format!("no config file found at {}", path.display()));
            }
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;

        Self::parse(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// Parse and validate TOML config text.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(contents).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.poll_interval_ms == 0 {
            return Err("poll-interval-ms must be greater than zero".into());
        }
        if self.rehydrate_max_per_window == 0 {
            return Err("rehydrate-max-per-window must be greater than zero".into());
        }
        for (key, name) in [
            ("command-base", &self.command_base),
            ("actions-base", &self.actions_base),
        ] {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(format!("{key} must be a plain file name, got {name:?}"));
            }
        }
        if self.command_base == self.actions_base {
            return Err("command-base and actions-base must differ".into());
        }
        Ok(())
    }

    /// The config file path: `~/.coach/config.toml`.
    pub fn path() -> Option<PathBuf> {
        Self::home().map(|h| h.join("config.toml"))
    }

    /// `~/.coach`.
    fn home() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".coach"))
    }

    pub fn command_path(&self) -> PathBuf {
        self.log_dir.join(&self.command_base)
    }

    pub fn actions_path(&self) -> PathBuf {
        self.log_dir.join(&self.actions_base)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn rehydrate_window(&self) -> Duration {
        Duration::from_millis(self.rehydrate_window_ms)
    }

    pub fn reload_timeout(&self) -> Duration {
        Duration::from_millis(self.reload_timeout_ms)
    }
}
