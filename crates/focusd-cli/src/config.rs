//! Daemon configuration.
//!
//! Loaded from TOML at `~/.config/focusd/config.toml`, with every value
//! overridable from the command line. Flag beats file beats default.

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use focusd_core::{ConfigError, PhaseDurations, StatusDuration};

/// Schedule-specific configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_work")]
    pub work: StatusDuration,
    #[serde(default = "default_short_break")]
    pub short_break: StatusDuration,
    #[serde(default = "default_long_break")]
    pub long_break: StatusDuration,
    /// Completed work periods between long breaks.
    #[serde(default = "default_work_sessions")]
    pub work_sessions: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            work: default_work(),
            short_break: default_short_break(),
            long_break: default_long_break(),
            work_sessions: default_work_sessions(),
        }
    }
}

/// Event hook configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HooksConfig {
    /// Command run once per controller event.
    #[serde(default)]
    pub event_command: Option<String>,
}

/// Daemon configuration, serialized to/from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Unix socket path the daemon listens on.
    #[serde(default = "default_socket")]
    pub socket: PathBuf,
    /// TCP listen address; takes precedence over the socket when set.
    #[serde(default)]
    pub tcp: Option<String>,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub hooks: HooksConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: default_socket(),
            tcp: None,
            schedule: ScheduleConfig::default(),
            hooks: HooksConfig::default(),
        }
    }
}

fn default_work() -> StatusDuration {
    Duration::from_secs(25 * 60).into()
}
fn default_short_break() -> StatusDuration {
    Duration::from_secs(5 * 60).into()
}
fn default_long_break() -> StatusDuration {
    Duration::from_secs(15 * 60).into()
}
fn default_work_sessions() -> u32 {
    4
}
fn default_socket() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".focusd.socket")
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("focusd").join("config.toml"))
    }

    /// Load from `path`, or from the default location.
    ///
    /// A missing file at the default location falls back to defaults; a
    /// missing file at an explicitly requested path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(path) => (Some(path.to_owned()), true),
            None => (Self::default_path(), false),
        };
        let Some(path) = path else {
            return Ok(Self::default());
        };

        match std::fs::read_to_string(&path) {
            Ok(raw) => toml::from_str(&raw).map_err(|err| ConfigError::ParseFailed(err.to_string())),
            Err(err) if !explicit && err.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::LoadFailed {
                path: path.display().to_string(),
                message: err.to_string(),
            }),
        }
    }

    /// Validated long-break cadence.
    pub fn cadence(&self) -> Result<NonZeroU32, ConfigError> {
        NonZeroU32::new(self.schedule.work_sessions).ok_or_else(|| ConfigError::InvalidValue {
            key: "schedule.work_sessions".into(),
            message: "must be at least 1".into(),
        })
    }

    /// Phase duration table for the controller.
    pub fn durations(&self) -> PhaseDurations {
        PhaseDurations {
            work: self.schedule.work.into(),
            short_break: self.schedule.short_break.into(),
            long_break: self.schedule.long_break.into(),
        }
    }
}
