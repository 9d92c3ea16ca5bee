//! Human-readable durations for the wire protocol.
//!
//! Status replies carry remaining time as strings like `"25m0s"` or
//! `"1h5m30s"`, and the same grammar is accepted for duration-valued
//! configuration entries and command-line flags.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A non-negative duration with a human-readable serialized form.
///
/// Formatting rules: `0s` for zero; sub-second values use the largest unit
/// that keeps the number above one (`500ms`, `250µs`, `75ns`); everything
/// else prints hours, minutes and seconds with the leading zero components
/// omitted (`40s`, `25m0s`, `1h0m40s`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StatusDuration(Duration);

impl StatusDuration {
    pub const ZERO: StatusDuration = StatusDuration(Duration::ZERO);

    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl From<Duration> for StatusDuration {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl From<StatusDuration> for Duration {
    fn from(duration: StatusDuration) -> Self {
        duration.0
    }
}

impl fmt::Display for StatusDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.0.as_nanos();
        if nanos == 0 {
            return write!(f, "0s");
        }
        if nanos < 1_000 {
            return write!(f, "{nanos}ns");
        }
        if nanos < 1_000_000 {
            return write_scaled(f, nanos, 1_000, "µs");
        }
        if nanos < 1_000_000_000 {
            return write_scaled(f, nanos, 1_000_000, "ms");
        }

        let secs = self.0.as_secs();
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        let seconds = secs % 60;
        if hours > 0 {
            write!(f, "{hours}h")?;
        }
        if hours > 0 || minutes > 0 {
            write!(f, "{minutes}m")?;
        }
        let frac = self.0.subsec_nanos();
        if frac == 0 {
            write!(f, "{seconds}s")
        } else {
            let digits = format!("{frac:09}");
            write!(f, "{seconds}.{}s", digits.trim_end_matches('0'))
        }
    }
}

fn write_scaled(f: &mut fmt::Formatter<'_>, nanos: u128, unit: u128, suffix: &str) -> fmt::Result {
    let whole = nanos / unit;
    let rem = nanos % unit;
    if rem == 0 {
        return write!(f, "{whole}{suffix}");
    }
    let width = if unit == 1_000 { 3 } else { 6 };
    let digits = format!("{rem:0width$}");
    write!(f, "{whole}.{}{suffix}", digits.trim_end_matches('0'))
}

/// A duration string did not match the `<number><unit>...` grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid duration: {0:?}")]
pub struct ParseDurationError(String);

impl FromStr for StatusDuration {
    type Err = ParseDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let src = s.trim();
        if src.is_empty() {
            return Err(ParseDurationError(s.to_owned()));
        }
        if src == "0" {
            return Ok(Self::ZERO);
        }

        let mut total = Duration::ZERO;
        let mut rest = src;
        while !rest.is_empty() {
            let number_end = rest
                .find(|c: char| !c.is_ascii_digit() && c != '.')
                .ok_or_else(|| ParseDurationError(s.to_owned()))?;
            if number_end == 0 {
                return Err(ParseDurationError(s.to_owned()));
            }
            let value: f64 = rest[..number_end]
                .parse()
                .map_err(|_| ParseDurationError(s.to_owned()))?;
            rest = &rest[number_end..];

            let unit_end = rest
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(rest.len());
            let unit_secs = match &rest[..unit_end] {
                "ns" => 1e-9,
                "us" | "µs" => 1e-6,
                "ms" => 1e-3,
                "s" => 1.0,
                "m" => 60.0,
                "h" => 3600.0,
                _ => return Err(ParseDurationError(s.to_owned())),
            };
            rest = &rest[unit_end..];

            let part = Duration::try_from_secs_f64(value * unit_secs)
                .map_err(|_| ParseDurationError(s.to_owned()))?;
            total = total
                .checked_add(part)
                .ok_or_else(|| ParseDurationError(s.to_owned()))?;
        }
        Ok(Self(total))
    }
}

impl Serialize for StatusDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StatusDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}
