//! # focusd core library
//!
//! Business logic for focusd, a single-session work/break timer daemon.
//! The daemon binary is a thin transport layer over this crate.
//!
//! ## Key components
//!
//! - [`Session`]: pure state machine for the work/break cycle
//! - [`Timer`]: cancellable one-shot delay with at-most-once resolution of
//!   the cancel-vs-expiry race
//! - [`Controller`]: orchestrates session and timer behind one exclusive
//!   lock and emits lifecycle events
//! - [`SingleControllerContainer`]: create-once lifecycle guard used by the
//!   transport layer
//! - [`hooks`]: optional external-process invocation per event

pub mod container;
pub mod controller;
pub mod duration;
pub mod error;
pub mod events;
pub mod hooks;
pub mod session;
pub mod timer;

pub use container::{ControllerFactory, SingleControllerContainer};
pub use controller::{Controller, ControllerConfig, ControllerState, StatusReport};
pub use duration::StatusDuration;
pub use error::{ConfigError, ContainerError, ControlError, TimerError};
pub use events::{EventSinks, NextStateEvent, PauseEvent, PlayEvent, StopEvent};
pub use session::{Phase, PhaseDurations, Session};
pub use timer::{MockTimer, RuntimeTimer, Timer, TimerCallback};

/// A poisoned lock still guards structurally consistent state here; recover
/// the guard instead of propagating the panic.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
