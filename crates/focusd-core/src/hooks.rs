//! External-process event hooks.
//!
//! Optional integration point: one command invoked per controller event,
//! with the event described through environment variables. Invocation is
//! fire and forget -- a hook can never block or fail the transition that
//! emitted it; failures are only logged.

use chrono::{DateTime, Utc};

use crate::error::ControlError;
use crate::events::{EventSinks, NextStateEvent, PauseEvent, PlayEvent, StopEvent};

/// Event timestamp, RFC 3339.
pub const ENV_AT: &str = "FOCUSD_AT";
/// Resulting state token, or the error text for error events.
pub const ENV_STATUS: &str = "FOCUSD_STATUS";
/// One of `Play | Pause | Stop | EndOfState | Error`.
pub const ENV_EVENT: &str = "FOCUSD_EVENT";

/// Sinks that run `command` once per controller event.
///
/// NextState reports the announced next state; all other events report the
/// state the transition acted on.
pub fn exec_hook_sinks(command: &str) -> EventSinks {
    EventSinks {
        play: Some(Box::new({
            let command = command.to_owned();
            move |event: &PlayEvent| {
                spawn_hook(&command, event.at, event.current_state.to_string(), "Play");
            }
        })),
        pause: Some(Box::new({
            let command = command.to_owned();
            move |event: &PauseEvent| {
                spawn_hook(&command, event.at, event.current_state.to_string(), "Pause");
            }
        })),
        stop: Some(Box::new({
            let command = command.to_owned();
            move |event: &StopEvent| {
                spawn_hook(&command, event.at, event.current_state.to_string(), "Stop");
            }
        })),
        next_state: Some(Box::new({
            let command = command.to_owned();
            move |event: &NextStateEvent| {
                spawn_hook(&command, event.at, event.next_state.to_string(), "EndOfState");
            }
        })),
        error: Some(Box::new({
            let command = command.to_owned();
            move |err: &ControlError| {
                spawn_hook(&command, Utc::now(), err.to_string(), "Error");
            }
        })),
    }
}

fn spawn_hook(command: &str, at: DateTime<Utc>, status: String, event_type: &'static str) {
    let mut command = std::process::Command::new(command);
    command
        .env(ENV_AT, at.to_rfc3339())
        .env(ENV_STATUS, status)
        .env(ENV_EVENT, event_type);
    std::thread::spawn(move || match command.status() {
        Ok(exit) if !exit.success() => {
            tracing::warn!(event = event_type, code = ?exit.code(), "event hook exited with failure");
        }
        Err(err) => {
            tracing::warn!(event = event_type, error = %err, "failed to run event hook");
        }
        Ok(_) => {}
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerState;
    use chrono::TimeZone;
    use std::os::unix::fs::PermissionsExt;
    use std::time::{Duration, Instant};

    #[test]
    fn builds_a_sink_for_every_event() {
        let sinks = exec_hook_sinks("/bin/true");
        assert!(sinks.play.is_some());
        assert!(sinks.pause.is_some());
        assert!(sinks.stop.is_some());
        assert!(sinks.next_state.is_some());
        assert!(sinks.error.is_some());
    }

    #[test]
    fn hook_receives_the_event_environment() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("event.env");
        let script = dir.path().join("hook.sh");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\nprintf '%s %s %s' \"$FOCUSD_EVENT\" \"$FOCUSD_STATUS\" \"$FOCUSD_AT\" > {}\n",
                out.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let sinks = exec_hook_sinks(script.to_str().unwrap());
        let at = Utc.with_ymd_and_hms(2024, 12, 4, 0, 0, 0).unwrap();
        let play = sinks.play.as_ref().unwrap();
        play(&PlayEvent {
            at,
            current_state: ControllerState::Work,
            next_state: ControllerState::ShortBreak,
            current_state_duration: Duration::from_secs(25 * 60),
        });

        let deadline = Instant::now() + Duration::from_secs(5);
        let contents = loop {
            if let Ok(contents) = std::fs::read_to_string(&out) {
                if !contents.is_empty() {
                    break contents;
                }
            }
            assert!(Instant::now() < deadline, "hook never produced output");
            std::thread::sleep(Duration::from_millis(10));
        };
        assert_eq!(contents, format!("Play Work {}", at.to_rfc3339()));
    }
}
