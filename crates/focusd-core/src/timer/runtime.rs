//! Timer backed by a tokio runtime.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use super::{Timer, TimerCallback};
use crate::error::TimerError;
use crate::lock;

/// State of the armed wait, shared between the arming side and the task.
///
/// `seq` tags each wait so a task whose cancellation raced its own expiry
/// can never claim a wait armed after it.
struct ArmedWait {
    seq: u64,
    cancel_tx: oneshot::Sender<()>,
}

#[derive(Default)]
struct Slot {
    next_seq: u64,
    armed: Option<ArmedWait>,
}

/// Timer that arms each wait as a task on a tokio runtime.
///
/// The expiry path and [`Timer::cancel`] both claim the same mutex-guarded
/// slot; whichever claims first wins and the loser observes a no-op. The
/// slot mutex is only ever held for the claim itself, so both operations
/// stay bounded.
pub struct RuntimeTimer {
    handle: Handle,
    slot: Arc<Mutex<Slot>>,
}

impl RuntimeTimer {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    /// Timer on the current runtime.
    ///
    /// # Panics
    /// Panics outside a tokio runtime context, like [`Handle::current`].
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Timer for RuntimeTimer {
    fn arm(&self, duration: Duration, callback: TimerCallback) -> Result<(), TimerError> {
        let mut slot = lock(&self.slot);
        if slot.armed.is_some() {
            return Err(TimerError::AlreadyWaiting);
        }
        let seq = slot.next_seq;
        slot.next_seq += 1;
        let (cancel_tx, cancel_rx) = oneshot::channel();
        slot.armed = Some(ArmedWait { seq, cancel_tx });

        let shared = Arc::clone(&self.slot);
        self.handle.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {
                    let claimed = {
                        let mut slot = lock(&shared);
                        match &slot.armed {
                            Some(armed) if armed.seq == seq => {
                                slot.armed = None;
                                true
                            }
                            // a cancel won the race, or this wait was
                            // already superseded
                            _ => false,
                        }
                    };
                    if claimed {
                        callback();
                    }
                }
                _ = cancel_rx => {}
            }
        });
        Ok(())
    }

    fn cancel(&self) -> Result<(), TimerError> {
        let armed = lock(&self.slot).armed.take().ok_or(TimerError::NotWaiting)?;
        // the task may have exited already; the claim above is what counts
        let _ = armed.cancel_tx.send(());
        Ok(())
    }
}
