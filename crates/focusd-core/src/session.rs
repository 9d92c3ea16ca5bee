//! Work/break session state machine.
//!
//! A [`Session`] is a pure state machine: it knows the current phase, how
//! many work periods have completed, and what comes next. It never touches
//! the clock -- scheduling is the controller's job.

use std::num::NonZeroU32;
use std::time::Duration;

/// A step in the work/break cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Work,
    ShortBreak,
    LongBreak,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Work => "Work",
            Phase::ShortBreak => "ShortBreak",
            Phase::LongBreak => "LongBreak",
        };
        f.write_str(name)
    }
}

/// Deterministic work/break cycle with a long-break cadence.
///
/// After any break the next phase is always Work. After Work the next phase
/// is LongBreak when the post-increment completed-work count is a multiple
/// of the cadence, ShortBreak otherwise. The cadence is non-zero by
/// construction, so the modulo can never divide by zero.
#[derive(Debug, Clone)]
pub struct Session {
    phase: Phase,
    completed_work: u32,
    cadence: NonZeroU32,
}

impl Session {
    /// New session at the start of a work period.
    pub fn new(cadence: NonZeroU32) -> Self {
        Self {
            phase: Phase::Work,
            completed_work: 0,
            cadence,
        }
    }

    /// Current phase, no side effect.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of work periods completed so far.
    pub fn completed_work_sessions(&self) -> u32 {
        self.completed_work
    }

    /// The phase that follows the current one. Pure; does not mutate.
    pub fn next_phase(&self) -> Phase {
        if self.phase != Phase::Work {
            return Phase::Work;
        }
        let worked = self.completed_work + 1;
        if worked % self.cadence.get() == 0 {
            Phase::LongBreak
        } else {
            Phase::ShortBreak
        }
    }

    /// Commit `phase` as the current phase.
    ///
    /// The sole mutator: entering Work from a non-Work phase counts one
    /// completed work period, nothing else does.
    pub fn advance_to(&mut self, phase: Phase) {
        if self.phase != Phase::Work && phase == Phase::Work {
            self.completed_work += 1;
        }
        self.phase = phase;
    }

    /// Back to the start of a fresh work period.
    pub fn reset(&mut self) {
        self.phase = Phase::Work;
        self.completed_work = 0;
    }
}

/// Phase-to-duration lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDurations {
    pub work: Duration,
    pub short_break: Duration,
    pub long_break: Duration,
}

impl PhaseDurations {
    pub fn for_phase(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Work => self.work,
            Phase::ShortBreak => self.short_break,
            Phase::LongBreak => self.long_break,
        }
    }
}

impl Default for PhaseDurations {
    /// The classic 25/5/15 split.
    fn default() -> Self {
        Self {
            work: Duration::from_secs(25 * 60),
            short_break: Duration::from_secs(5 * 60),
            long_break: Duration::from_secs(15 * 60),
        }
    }
}
