//! Deterministic timer for tests and fixtures.

use std::sync::Mutex;
use std::time::Duration;

use super::{Timer, TimerCallback};
use crate::error::TimerError;
use crate::lock;

/// Timer that never fires on its own.
///
/// [`MockTimer::force_fire`] runs the armed callback synchronously on the
/// calling thread, which makes timer-driven transitions deterministic in
/// tests. The caller must not hold a lock the callback re-enters.
#[derive(Default)]
pub struct MockTimer {
    armed: Mutex<Option<(Duration, TimerCallback)>>,
}

impl MockTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire the pending wait now, running its callback before returning.
    pub fn force_fire(&self) -> Result<(), TimerError> {
        let (_, callback) = lock(&self.armed).take().ok_or(TimerError::NotWaiting)?;
        callback();
        Ok(())
    }

    /// Duration of the armed wait, if any.
    pub fn armed_duration(&self) -> Option<Duration> {
        lock(&self.armed).as_ref().map(|(duration, _)| *duration)
    }

    pub fn is_armed(&self) -> bool {
        lock(&self.armed).is_some()
    }
}

impl Timer for MockTimer {
    fn arm(&self, duration: Duration, callback: TimerCallback) -> Result<(), TimerError> {
        let mut armed = lock(&self.armed);
        if armed.is_some() {
            return Err(TimerError::AlreadyWaiting);
        }
        *armed = Some((duration, callback));
        Ok(())
    }

    fn cancel(&self) -> Result<(), TimerError> {
        lock(&self.armed)
            .take()
            .map(drop)
            .ok_or(TimerError::NotWaiting)
    }
}
