//! Cancellable one-shot timer.
//!
//! The controller schedules every phase transition through this interface:
//! arm a wait, and either the wait expires and runs its callback on a
//! background execution context, or the wait is cancelled first. The two
//! outcomes are mutually exclusive per armed wait.

mod mock;
mod runtime;

pub use mock::MockTimer;
pub use runtime::RuntimeTimer;

use std::time::Duration;

use crate::error::TimerError;

/// Callback invoked when an armed wait expires.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Single-shot, cancellable delay.
///
/// At most one wait may be armed at a time, and for every armed wait at
/// most one of {callback invocation, successful cancellation} ever happens.
/// Both operations are bounded -- they may be called while holding an outer
/// lock.
pub trait Timer: Send + Sync {
    /// Schedule `callback` to run once after `duration` unless cancelled
    /// first. Fails with [`TimerError::AlreadyWaiting`] while a wait is
    /// armed.
    fn arm(&self, duration: Duration, callback: TimerCallback) -> Result<(), TimerError>;

    /// Abort the pending wait. After an `Ok` return the callback will not
    /// run. Fails with [`TimerError::NotWaiting`] when nothing is armed --
    /// including when an in-flight expiry already claimed the wait.
    fn cancel(&self) -> Result<(), TimerError>;
}
