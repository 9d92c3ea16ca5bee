//! End-to-end controller runs against the runtime-backed timer.

use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::runtime::Handle;

use focusd_core::{
    Controller, ControllerConfig, ControllerState, EventSinks, NextStateEvent, PhaseDurations,
    RuntimeTimer, Timer,
};

fn fast_durations() -> PhaseDurations {
    PhaseDurations {
        work: Duration::from_millis(20),
        short_break: Duration::from_millis(20),
        long_break: Duration::from_millis(20),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timer_driven_transitions_advance_the_session() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    let sinks = EventSinks {
        next_state: Some(Box::new(move |event: &NextStateEvent| {
            sink_seen.lock().unwrap().push(event.current_state);
        })),
        ..EventSinks::default()
    };
    let controller = Controller::new(ControllerConfig {
        cadence: NonZeroU32::new(2).unwrap(),
        durations: fast_durations(),
        timer: Arc::new(RuntimeTimer::new(Handle::current())) as Arc<dyn Timer>,
        sinks,
    });

    controller.play(Utc::now()).unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while seen.lock().unwrap().len() < 4 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "expected four timer-driven transitions, saw {:?}",
            seen.lock().unwrap()
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // a stop can lose the cancel race to an in-flight expiry; retry until
    // it lands between transitions
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while controller.stop(Utc::now()).is_err() {
        assert!(tokio::time::Instant::now() < deadline, "stop never landed");
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert_eq!(controller.status().state, ControllerState::Stopped);

    // with a cadence of two: work, short break, work, long break, work, ...
    let states = seen.lock().unwrap().clone();
    assert_eq!(
        &states[..4],
        [
            ControllerState::ShortBreak,
            ControllerState::Work,
            ControllerState::LongBreak,
            ControllerState::Work,
        ]
    );

    // stopped means stopped: no further transitions arrive
    let settled = seen.lock().unwrap().len();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(seen.lock().unwrap().len(), settled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pause_freezes_timer_driven_progress() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    let sinks = EventSinks {
        next_state: Some(Box::new(move |event: &NextStateEvent| {
            sink_seen.lock().unwrap().push(event.current_state);
        })),
        ..EventSinks::default()
    };
    let controller = Controller::new(ControllerConfig {
        cadence: NonZeroU32::new(4).unwrap(),
        durations: PhaseDurations {
            work: Duration::from_millis(50),
            ..fast_durations()
        },
        timer: Arc::new(RuntimeTimer::new(Handle::current())) as Arc<dyn Timer>,
        sinks,
    });

    controller.play(Utc::now()).unwrap();
    controller.pause(Utc::now()).unwrap();
    assert_eq!(controller.status().state, ControllerState::Paused);

    // well past the work duration: the frozen countdown must not advance
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(controller.status().state, ControllerState::Paused);
    assert!(seen.lock().unwrap().is_empty());

    controller.play(Utc::now()).unwrap();
    let state = controller.status().state;
    assert!(
        state == ControllerState::Work || state == ControllerState::ShortBreak,
        "resumed controller should be running, got {state:?}"
    );
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while controller.stop(Utc::now()).is_err() {
        assert!(tokio::time::Instant::now() < deadline, "stop never landed");
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}
