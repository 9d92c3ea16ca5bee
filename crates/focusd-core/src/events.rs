//! Controller lifecycle events and their optional sinks.
//!
//! Every transition emits at most one event. Sinks run synchronously on
//! whatever thread triggered the transition -- the user-call context for
//! play/pause/skip/stop, the timer's background context for an expiry --
//! and are side-effect triggers only: the controller never awaits them and
//! never depends on them for correctness.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::controller::ControllerState;
use crate::error::ControlError;

/// Emitted when a stopped or paused controller starts counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayEvent {
    pub at: DateTime<Utc>,
    pub current_state: ControllerState,
    pub next_state: ControllerState,
    pub current_state_duration: Duration,
}

/// Emitted when a running countdown freezes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseEvent {
    pub at: DateTime<Utc>,
    pub current_state: ControllerState,
    pub time_spent: TimeDelta,
    pub time_left: TimeDelta,
}

/// Emitted when the controller is reset to stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopEvent {
    pub at: DateTime<Utc>,
    pub current_state: ControllerState,
    pub time_spent: TimeDelta,
    pub time_left: TimeDelta,
}

/// Emitted when the session advances, on timer expiry or on skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextStateEvent {
    pub at: DateTime<Utc>,
    pub current_state: ControllerState,
    pub next_state: ControllerState,
    pub time_left: TimeDelta,
}

/// An observer for one event kind.
pub type EventSink<E> = Box<dyn Fn(&E) + Send + Sync>;

/// Optional observers for controller transitions.
///
/// Each sink is independently optional; absent means "do nothing". Sinks
/// are treated as untrusted foreign code with no completion deadline.
#[derive(Default)]
pub struct EventSinks {
    pub play: Option<EventSink<PlayEvent>>,
    pub pause: Option<EventSink<PauseEvent>>,
    pub stop: Option<EventSink<StopEvent>>,
    pub next_state: Option<EventSink<NextStateEvent>>,
    pub error: Option<EventSink<ControlError>>,
}
