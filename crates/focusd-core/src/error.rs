//! Error types for focusd-core.
//!
//! One enum per concern: controller actions, timer protocol, container
//! lifecycle and daemon configuration.

use thiserror::Error;

/// Errors returned by controller actions.
///
/// The first three variants reject an action that is incompatible with the
/// controller's current derived state. Timer protocol errors surface through
/// the same channel because every action that touches the timer reports its
/// failure to the caller unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// Action requires a running or paused controller.
    #[error("cannot execute action on stopped timer")]
    StoppedTimer,

    /// Action requires a controller that is not paused.
    #[error("cannot execute action on paused timer")]
    PausedTimer,

    /// Action requires a controller that is not running.
    #[error("cannot execute action on running timer")]
    RunningTimer,

    /// Timer protocol failure bubbled up through a controller action.
    #[error(transparent)]
    Timer(#[from] TimerError),
}

/// Timer protocol misuse.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// A wait is already armed; it must be cancelled before arming another.
    #[error("timer already waiting, cannot wait twice")]
    AlreadyWaiting,

    /// No wait is armed, so there is nothing to cancel.
    #[error("timer not waiting, cannot cancel")]
    NotWaiting,
}

/// Controller lifecycle misuse, reported to the transport layer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerError {
    /// No controller is held; create one first.
    #[error("must create a controller first")]
    NoController,

    /// A controller is already held; remove it first.
    #[error("must remove the existing controller first")]
    ExistingController,
}

/// Invalid daemon configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("failed to load configuration from {path}: {message}")]
    LoadFailed { path: String, message: String },

    /// A configuration value is out of range or malformed.
    #[error("invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// The configuration file did not parse.
    #[error("failed to parse configuration: {0}")]
    ParseFailed(String),
}
