//! Controller orchestrating one session behind an exclusive lock.
//!
//! The controller owns the session state machine and the timer. Every
//! public action and the internal timer-fired transition serialize on the
//! same mutex, so no transition ever observes torn state: a fire that
//! races a concurrent pause or stop loses the timer's claim race, or
//! re-validates under the lock and backs off through the error sink.

use std::fmt;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::StatusDuration;
use crate::error::{ControlError, TimerError};
use crate::events::{EventSinks, NextStateEvent, PauseEvent, PlayEvent, StopEvent};
use crate::lock;
use crate::session::{Phase, PhaseDurations, Session};
use crate::timer::Timer;

/// Externally visible controller state.
///
/// Extends the session phases with the two states only the controller can
/// derive: Paused (a pause timestamp is recorded) and Stopped (no active
/// timer window). Exactly one of stopped, paused and running holds at any
/// instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    Work,
    ShortBreak,
    LongBreak,
    Paused,
    Stopped,
}

impl From<Phase> for ControllerState {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Work => ControllerState::Work,
            Phase::ShortBreak => ControllerState::ShortBreak,
            Phase::LongBreak => ControllerState::LongBreak,
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerState::Work => "Work",
            ControllerState::ShortBreak => "ShortBreak",
            ControllerState::LongBreak => "LongBreak",
            ControllerState::Paused => "Paused",
            ControllerState::Stopped => "Stopped",
        };
        f.write_str(name)
    }
}

/// Status report for one controller.
///
/// `time_left` is present iff running, `paused_at` iff paused, and
/// `worked_sessions` is zero while stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub state: ControllerState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_left: Option<StatusDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,
    pub worked_sessions: u32,
}

/// Everything needed to build a [`Controller`].
pub struct ControllerConfig {
    /// Completed work periods between long breaks. Non-zero by type.
    pub cadence: NonZeroU32,
    pub durations: PhaseDurations,
    pub timer: Arc<dyn Timer>,
    pub sinks: EventSinks,
}

struct ControllerInner {
    session: Session,
    /// Set while paused; the instant the countdown froze.
    pause_at: Option<DateTime<Utc>>,
    /// Wall-clock deadline of the scheduled phase. `None` iff stopped.
    end_of_state: Option<DateTime<Utc>>,
}

/// Orchestrates a session and a timer behind one exclusive lock.
///
/// Built once per session by the container. The timer callback re-enters
/// through a weak reference, so a callback still scheduled when the
/// controller is dropped degrades to a no-op instead of keeping the
/// controller alive.
pub struct Controller {
    inner: Mutex<ControllerInner>,
    timer: Arc<dyn Timer>,
    durations: PhaseDurations,
    sinks: EventSinks,
    weak_self: Weak<Controller>,
}

impl Controller {
    pub fn new(config: ControllerConfig) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Self {
            inner: Mutex::new(ControllerInner {
                session: Session::new(config.cadence),
                pause_at: None,
                end_of_state: None,
            }),
            timer: config.timer,
            durations: config.durations,
            sinks: config.sinks,
            weak_self: weak_self.clone(),
        })
    }

    /// Status snapshot, with `time_left` measured against the wall clock.
    pub fn status(&self) -> StatusReport {
        self.status_at(Utc::now())
    }

    /// Status snapshot with an explicit observation instant.
    pub fn status_at(&self, now: DateTime<Utc>) -> StatusReport {
        let inner = lock(&self.inner);

        let Some(end_of_state) = inner.end_of_state else {
            return StatusReport {
                state: ControllerState::Stopped,
                time_left: None,
                paused_at: None,
                worked_sessions: 0,
            };
        };

        let worked_sessions = inner.session.completed_work_sessions();

        if let Some(pause_at) = inner.pause_at {
            return StatusReport {
                state: ControllerState::Paused,
                time_left: None,
                paused_at: Some(pause_at),
                worked_sessions,
            };
        }

        let time_left = (end_of_state - now).to_std().unwrap_or_default();
        StatusReport {
            state: inner.session.phase().into(),
            time_left: Some(StatusDuration::new(time_left)),
            paused_at: None,
            worked_sessions,
        }
    }

    /// Start from stopped, or resume from paused with the frozen remaining
    /// duration rescheduled relative to `now`.
    pub fn play(&self, now: DateTime<Utc>) -> Result<(), ControlError> {
        let mut inner = lock(&self.inner);

        match (inner.end_of_state, inner.pause_at) {
            // fresh start
            (None, _) => {
                inner.session.reset();
                let phase = inner.session.phase();
                self.run_timer(&mut inner, now, phase)
                    .map_err(|err| self.emit_error(err))?;
                self.emit_play(&inner, now);
                Ok(())
            }
            // resume
            (Some(end_of_state), Some(pause_at)) => {
                let remaining = end_of_state - pause_at;
                self.arm_wait(now + remaining, remaining.to_std().unwrap_or_default())
                    .map_err(|err| self.emit_error(err.into()))?;
                inner.pause_at = None;
                inner.end_of_state = Some(now + remaining);
                self.emit_play(&inner, now);
                Ok(())
            }
            (Some(_), None) => Err(self.emit_error(ControlError::RunningTimer)),
        }
    }

    /// Freeze the countdown without advancing the session.
    pub fn pause(&self, now: DateTime<Utc>) -> Result<(), ControlError> {
        let mut inner = lock(&self.inner);

        if inner.pause_at.is_some() {
            return Err(self.emit_error(ControlError::PausedTimer));
        }
        if inner.end_of_state.is_none() {
            return Err(self.emit_error(ControlError::StoppedTimer));
        }

        inner.pause_at = Some(now);
        self.timer
            .cancel()
            .map_err(|err| self.emit_error(err.into()))?;
        self.emit_pause(&inner, now);
        Ok(())
    }

    /// Jump to the next phase immediately, pre-empting the pending wait.
    pub fn skip(&self, now: DateTime<Utc>) -> Result<(), ControlError> {
        let mut inner = lock(&self.inner);

        if inner.end_of_state.is_none() {
            return Err(self.emit_error(ControlError::StoppedTimer));
        }
        // skipping while paused lands here: pause already cancelled the wait
        self.timer
            .cancel()
            .map_err(|err| self.emit_error(err.into()))?;

        let next = inner.session.next_phase();
        // NextState is announced before the new wait is armed; an arming
        // failure at this point leaves the announced phase uncommitted.
        self.emit_next_state(&inner, now);
        self.run_timer(&mut inner, now, next)
            .map_err(|err| self.emit_error(err))
    }

    /// Reset to stopped, discarding the pending wait.
    pub fn stop(&self, now: DateTime<Utc>) -> Result<(), ControlError> {
        let mut inner = lock(&self.inner);

        if inner.end_of_state.is_none() {
            return Err(self.emit_error(ControlError::StoppedTimer));
        }
        // while paused there is no armed wait left to cancel
        if inner.pause_at.is_none() {
            self.timer
                .cancel()
                .map_err(|err| self.emit_error(err.into()))?;
        }

        self.emit_stop(&inner, now);
        // entering stopped clears both timestamps together
        inner.end_of_state = None;
        inner.pause_at = None;
        Ok(())
    }

    /// Timer expiry entry point; runs on the timer's execution context.
    ///
    /// Re-validates under the lock: a fire that raced a concurrent pause or
    /// stop must not advance the session. Errors here have no caller and
    /// are observable only through the error sink.
    fn on_timer_fired(&self, then: DateTime<Utc>) -> Result<(), ControlError> {
        let mut inner = lock(&self.inner);

        if inner.pause_at.is_some() {
            return Err(self.emit_error(ControlError::PausedTimer));
        }
        if inner.end_of_state.is_none() {
            return Err(self.emit_error(ControlError::StoppedTimer));
        }

        let next = inner.session.next_phase();
        self.run_timer(&mut inner, then, next)
            .map_err(|err| self.emit_error(err))?;
        self.emit_next_state(&inner, then);
        Ok(())
    }

    /// Arm the wait for `phase`, then commit it as the current phase and
    /// record its deadline. The session is untouched when arming fails.
    fn run_timer(
        &self,
        inner: &mut ControllerInner,
        now: DateTime<Utc>,
        phase: Phase,
    ) -> Result<(), ControlError> {
        let duration = self.durations.for_phase(phase);
        let then = now + TimeDelta::from_std(duration).unwrap_or_else(|_| TimeDelta::zero());
        self.arm_wait(then, duration)?;
        inner.session.advance_to(phase);
        inner.end_of_state = Some(then);
        Ok(())
    }

    fn arm_wait(&self, then: DateTime<Utc>, duration: Duration) -> Result<(), TimerError> {
        let weak = self.weak_self.clone();
        self.timer.arm(
            duration,
            Box::new(move || {
                if let Some(controller) = weak.upgrade() {
                    // already routed to the error sink; no caller to notify
                    let _ = controller.on_timer_fired(then);
                }
            }),
        )
    }

    // ── Event emission ───────────────────────────────────────────────

    fn emit_error(&self, err: ControlError) -> ControlError {
        if let Some(sink) = &self.sinks.error {
            sink(&err);
        }
        err
    }

    fn emit_play(&self, inner: &ControllerInner, now: DateTime<Utc>) {
        let Some(sink) = &self.sinks.play else { return };
        let phase = inner.session.phase();
        sink(&PlayEvent {
            at: now,
            current_state: phase.into(),
            next_state: inner.session.next_phase().into(),
            current_state_duration: self.durations.for_phase(phase),
        });
    }

    fn emit_pause(&self, inner: &ControllerInner, now: DateTime<Utc>) {
        let Some(sink) = &self.sinks.pause else { return };
        let (time_spent, time_left) = self.spent_and_left(inner, now);
        sink(&PauseEvent {
            at: now,
            current_state: inner.session.phase().into(),
            time_spent,
            time_left,
        });
    }

    fn emit_stop(&self, inner: &ControllerInner, now: DateTime<Utc>) {
        let Some(sink) = &self.sinks.stop else { return };
        let (time_spent, time_left) = self.spent_and_left(inner, now);
        sink(&StopEvent {
            at: now,
            current_state: inner.session.phase().into(),
            time_spent,
            time_left,
        });
    }

    fn emit_next_state(&self, inner: &ControllerInner, now: DateTime<Utc>) {
        let Some(sink) = &self.sinks.next_state else { return };
        let time_left = inner
            .end_of_state
            .map(|end| end - now)
            .unwrap_or_else(TimeDelta::zero);
        sink(&NextStateEvent {
            at: now,
            current_state: inner.session.phase().into(),
            next_state: inner.session.next_phase().into(),
            time_left,
        });
    }

    fn spent_and_left(&self, inner: &ControllerInner, now: DateTime<Utc>) -> (TimeDelta, TimeDelta) {
        let duration = TimeDelta::from_std(self.durations.for_phase(inner.session.phase()))
            .unwrap_or_else(|_| TimeDelta::zero());
        let time_left = inner
            .end_of_state
            .map(|end| end - now)
            .unwrap_or_else(TimeDelta::zero);
        (duration - time_left, time_left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::MockTimer;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 4, 0, 0, 0).unwrap()
    }

    fn minutes(m: i64) -> TimeDelta {
        TimeDelta::minutes(m)
    }

    fn controller_with(sinks: EventSinks) -> (Arc<Controller>, Arc<MockTimer>) {
        let timer = Arc::new(MockTimer::new());
        let controller = Controller::new(ControllerConfig {
            cadence: NonZeroU32::new(4).unwrap(),
            durations: PhaseDurations::default(),
            timer: Arc::clone(&timer) as Arc<dyn Timer>,
            sinks,
        });
        (controller, timer)
    }

    fn controller() -> (Arc<Controller>, Arc<MockTimer>) {
        controller_with(EventSinks::default())
    }

    #[test]
    fn starts_stopped_and_plays_into_work() {
        let (ctrl, timer) = controller();
        assert_eq!(ctrl.status_at(t0()).state, ControllerState::Stopped);

        ctrl.play(t0()).unwrap();
        let status = ctrl.status_at(t0());
        assert_eq!(status.state, ControllerState::Work);
        assert_eq!(status.time_left, Some(Duration::from_secs(25 * 60).into()));
        assert_eq!(status.worked_sessions, 0);
        assert_eq!(timer.armed_duration(), Some(Duration::from_secs(25 * 60)));

        ctrl.stop(t0()).unwrap();
        assert_eq!(ctrl.status_at(t0()).state, ControllerState::Stopped);
        assert!(!timer.is_armed());
    }

    #[test]
    fn play_on_running_fails_and_leaves_state_unchanged() {
        let (ctrl, _timer) = controller();
        ctrl.play(t0()).unwrap();
        let before = ctrl.status_at(t0());
        assert_eq!(ctrl.play(t0()), Err(ControlError::RunningTimer));
        assert_eq!(ctrl.status_at(t0()), before);
    }

    #[test]
    fn stop_on_stopped_fails() {
        let (ctrl, _timer) = controller();
        assert_eq!(ctrl.stop(t0()), Err(ControlError::StoppedTimer));
    }

    #[test]
    fn pause_on_stopped_fails() {
        let (ctrl, _timer) = controller();
        assert_eq!(ctrl.pause(t0()), Err(ControlError::StoppedTimer));
        // the rejected pause must not leave a pause mark behind
        assert_eq!(ctrl.status_at(t0()).state, ControllerState::Stopped);
    }

    #[test]
    fn pause_on_paused_fails() {
        let (ctrl, _timer) = controller();
        ctrl.play(t0()).unwrap();
        ctrl.pause(t0() + minutes(1)).unwrap();
        assert_eq!(
            ctrl.pause(t0() + minutes(2)),
            Err(ControlError::PausedTimer)
        );
    }

    #[test]
    fn pause_then_resume_preserves_remaining_time() {
        let (ctrl, timer) = controller();
        ctrl.play(t0()).unwrap();

        ctrl.pause(t0() + minutes(10)).unwrap();
        let paused = ctrl.status_at(t0() + minutes(10));
        assert_eq!(paused.state, ControllerState::Paused);
        assert_eq!(paused.paused_at, Some(t0() + minutes(10)));
        assert_eq!(paused.time_left, None);
        assert!(!timer.is_armed());

        // resume much later; the frozen 15 minutes are rescheduled as-is
        ctrl.play(t0() + minutes(20)).unwrap();
        let resumed = ctrl.status_at(t0() + minutes(20));
        assert_eq!(resumed.state, ControllerState::Work);
        assert_eq!(resumed.time_left, Some(Duration::from_secs(15 * 60).into()));
        assert_eq!(timer.armed_duration(), Some(Duration::from_secs(15 * 60)));
    }

    #[test]
    fn skip_on_stopped_fails() {
        let (ctrl, _timer) = controller();
        assert_eq!(ctrl.skip(t0()), Err(ControlError::StoppedTimer));
    }

    #[test]
    fn skip_while_paused_surfaces_the_cancel_error() {
        let (ctrl, _timer) = controller();
        ctrl.play(t0()).unwrap();
        ctrl.pause(t0()).unwrap();
        assert_eq!(
            ctrl.skip(t0()),
            Err(ControlError::Timer(TimerError::NotWaiting))
        );
    }

    #[test]
    fn skip_sequence_visits_the_expected_phases() {
        let (ctrl, _timer) = controller();
        ctrl.play(t0()).unwrap();

        let mut visited = vec![ctrl.status_at(t0()).state];
        for _ in 0..7 {
            ctrl.skip(t0()).unwrap();
            visited.push(ctrl.status_at(t0()).state);
        }
        assert_eq!(
            visited,
            [
                ControllerState::Work,
                ControllerState::ShortBreak,
                ControllerState::Work,
                ControllerState::ShortBreak,
                ControllerState::Work,
                ControllerState::ShortBreak,
                ControllerState::Work,
                ControllerState::LongBreak,
            ]
        );

        ctrl.skip(t0()).unwrap();
        let status = ctrl.status_at(t0());
        assert_eq!(status.state, ControllerState::Work);
        assert_eq!(status.worked_sessions, 4);
    }

    #[test]
    fn fired_transitions_follow_the_session() {
        let (ctrl, timer) = controller();
        ctrl.play(t0()).unwrap();

        let mut expected = Session::new(NonZeroU32::new(4).unwrap());
        for i in 0..50 {
            timer.force_fire().unwrap();
            expected.advance_to(expected.next_phase());
            let status = ctrl.status_at(t0());
            assert_eq!(
                status.state,
                expected.phase().into(),
                "diverged at iteration {i}"
            );
            assert_eq!(status.worked_sessions, expected.completed_work_sessions());
        }
    }

    #[test]
    fn stop_while_paused_clears_both_timestamps() {
        let (ctrl, _timer) = controller();
        ctrl.play(t0()).unwrap();
        ctrl.pause(t0() + minutes(5)).unwrap();
        ctrl.stop(t0() + minutes(6)).unwrap();

        let status = ctrl.status_at(t0() + minutes(6));
        assert_eq!(status.state, ControllerState::Stopped);
        assert_eq!(status.paused_at, None);

        // a fresh play starts over instead of resuming
        ctrl.play(t0() + minutes(7)).unwrap();
        let status = ctrl.status_at(t0() + minutes(7));
        assert_eq!(status.state, ControllerState::Work);
        assert_eq!(status.time_left, Some(Duration::from_secs(25 * 60).into()));
    }

    #[test]
    fn fire_racing_a_pause_is_rejected_through_the_error_sink() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink_errors = Arc::clone(&errors);
        let sinks = EventSinks {
            error: Some(Box::new(move |err: &ControlError| {
                lock(&sink_errors).push(err.clone());
            })),
            ..EventSinks::default()
        };
        let (ctrl, _timer) = controller_with(sinks);

        ctrl.play(t0()).unwrap();
        ctrl.pause(t0() + minutes(1)).unwrap();

        // a fire that lost the claim race would re-enter here
        assert_eq!(
            ctrl.on_timer_fired(t0() + minutes(25)),
            Err(ControlError::PausedTimer)
        );
        assert_eq!(ctrl.status_at(t0() + minutes(1)).state, ControllerState::Paused);
        assert_eq!(lock(&errors).as_slice(), [ControlError::PausedTimer]);
    }

    #[test]
    fn fire_on_a_stopped_controller_is_rejected() {
        let (ctrl, _timer) = controller();
        assert_eq!(
            ctrl.on_timer_fired(t0()),
            Err(ControlError::StoppedTimer)
        );
    }

    #[test]
    fn play_event_reports_current_and_next_state() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        let sinks = EventSinks {
            play: Some(Box::new(move |event: &PlayEvent| {
                lock(&sink_events).push(*event);
            })),
            ..EventSinks::default()
        };
        let (ctrl, _timer) = controller_with(sinks);

        ctrl.play(t0()).unwrap();
        let seen = lock(&events);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].at, t0());
        assert_eq!(seen[0].current_state, ControllerState::Work);
        assert_eq!(seen[0].next_state, ControllerState::ShortBreak);
        assert_eq!(seen[0].current_state_duration, Duration::from_secs(25 * 60));
    }

    #[test]
    fn pause_event_carries_spent_and_left_time() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        let sinks = EventSinks {
            pause: Some(Box::new(move |event: &PauseEvent| {
                lock(&sink_events).push(*event);
            })),
            ..EventSinks::default()
        };
        let (ctrl, _timer) = controller_with(sinks);

        ctrl.play(t0()).unwrap();
        ctrl.pause(t0() + minutes(10)).unwrap();

        let seen = lock(&events);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].current_state, ControllerState::Work);
        assert_eq!(seen[0].time_spent, minutes(10));
        assert_eq!(seen[0].time_left, minutes(15));
    }

    #[test]
    fn skip_announces_next_state_before_committing() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        let sinks = EventSinks {
            next_state: Some(Box::new(move |event: &NextStateEvent| {
                lock(&sink_events).push(*event);
            })),
            ..EventSinks::default()
        };
        let (ctrl, _timer) = controller_with(sinks);

        ctrl.play(t0()).unwrap();
        ctrl.skip(t0()).unwrap();

        // the event saw the pre-commit phase
        let seen = lock(&events);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].current_state, ControllerState::Work);
        assert_eq!(seen[0].next_state, ControllerState::ShortBreak);
        // while the controller itself has moved on
        assert_eq!(ctrl.status_at(t0()).state, ControllerState::ShortBreak);
    }

    #[test]
    fn fired_transition_announces_the_committed_state() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        let sinks = EventSinks {
            next_state: Some(Box::new(move |event: &NextStateEvent| {
                lock(&sink_events).push(*event);
            })),
            ..EventSinks::default()
        };
        let (ctrl, timer) = controller_with(sinks);

        ctrl.play(t0()).unwrap();
        timer.force_fire().unwrap();

        let seen = lock(&events);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].current_state, ControllerState::ShortBreak);
        assert_eq!(seen[0].next_state, ControllerState::Work);
    }

    #[test]
    fn error_sink_sees_invalid_transitions() {
        let count = Arc::new(AtomicUsize::new(0));
        let sink_count = Arc::clone(&count);
        let sinks = EventSinks {
            error: Some(Box::new(move |_err: &ControlError| {
                sink_count.fetch_add(1, Ordering::SeqCst);
            })),
            ..EventSinks::default()
        };
        let (ctrl, _timer) = controller_with(sinks);

        let _ = ctrl.stop(t0());
        let _ = ctrl.skip(t0());
        ctrl.play(t0()).unwrap();
        let _ = ctrl.play(t0());
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn status_serializes_tokens_and_duration_strings() {
        let (ctrl, _timer) = controller();
        ctrl.play(t0()).unwrap();

        let value = serde_json::to_value(ctrl.status_at(t0())).unwrap();
        assert_eq!(value["state"], "Work");
        assert_eq!(value["time_left"], "25m0s");
        assert_eq!(value["worked_sessions"], 0);
        assert!(value.get("paused_at").is_none());

        let report: StatusReport = serde_json::from_value(value).unwrap();
        assert_eq!(report, ctrl.status_at(t0()));
    }
}
