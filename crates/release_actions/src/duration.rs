//! Durations in the notation used by Kubernetes resources.
//!
//! Release specs write timeouts as `"5m"`, `"1h30m"` or `"2.5s"`. The
//! notation is a sequence of decimal numbers, each followed by a unit
//! (`ns`, `us`/`µs`, `ms`, `s`, `m`, `h`). A bare `"0"` is also accepted.
//! Negative durations make no sense for a timeout and are rejected.

use crate::errors::{ActionError, ActionResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MINUTE;

// Digits beyond this are below nanosecond precision for every unit.
const MAX_FRACTION_DIGITS: usize = 18;

// Largest duration representable by the signed nanosecond counters used by
// the release tooling.
const MAX_NANOS: u128 = i64::MAX as u128;

/// A non-negative duration that reads and writes the Kubernetes notation.
///
/// # Examples
///
/// ```
/// use release_actions::KubeDuration;
/// use std::time::Duration;
///
/// let timeout: KubeDuration = "1h30m".parse()?;
/// assert_eq!(timeout.as_duration(), Duration::from_secs(90 * 60));
/// assert_eq!(timeout.to_string(), "1h30m0s");
/// # Ok::<(), release_actions::ActionError>(())
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct KubeDuration(Duration);

impl KubeDuration {
    pub const ZERO: Self = Self(Duration::ZERO);

    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub const fn as_duration(&self) -> Duration {
        self.0
    }

    /// Parses a duration such as `"300ms"`, `"1.5h"` or `"2h45m"`.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::InvalidDuration` for empty or negative input, a
    /// number without a unit, an unknown unit, or a value that overflows.
    pub fn parse(input: &str) -> ActionResult<Self> {
        let mut rest = input;
        if let Some(unsigned) = rest.strip_prefix('+') {
            rest = unsigned;
        } else if rest.starts_with('-') {
            return Err(ActionError::invalid_duration(
                input,
                "negative durations are not allowed",
            ));
        }

        if rest == "0" {
            return Ok(Self::ZERO);
        }
        if rest.is_empty() {
            return Err(ActionError::invalid_duration(input, "duration is empty"));
        }

        let mut total: u128 = 0;
        while !rest.is_empty() {
            let (whole, after) = split_digits(rest);
            let (fraction, after) = match after.strip_prefix('.') {
                Some(after_dot) => split_digits(after_dot),
                None => ("", after),
            };
            if whole.is_empty() && fraction.is_empty() {
                return Err(ActionError::invalid_duration(input, "expected a number"));
            }

            let unit_len = after
                .find(|c: char| c == '.' || c.is_ascii_digit())
                .unwrap_or(after.len());
            let (unit, after) = after.split_at(unit_len);
            let scale = unit_scale(unit).ok_or_else(|| {
                if unit.is_empty() {
                    ActionError::invalid_duration(input, "missing unit")
                } else {
                    ActionError::invalid_duration(input, format!("unknown unit '{}'", unit))
                }
            })?;

            let nanos = component_nanos(whole, fraction, scale)
                .ok_or_else(|| ActionError::invalid_duration(input, "duration is too large"))?;
            total = total
                .checked_add(nanos)
                .filter(|total| *total <= MAX_NANOS)
                .ok_or_else(|| ActionError::invalid_duration(input, "duration is too large"))?;

            rest = after;
        }

        let nanos = u64::try_from(total)
            .map_err(|_| ActionError::invalid_duration(input, "duration is too large"))?;
        Ok(Self(Duration::from_nanos(nanos)))
    }
}

fn split_digits(s: &str) -> (&str, &str) {
    let len = s.bytes().take_while(u8::is_ascii_digit).count();
    s.split_at(len)
}

fn unit_scale(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(NANOS_PER_MICRO),
        "ms" => Some(NANOS_PER_MILLI),
        "s" => Some(NANOS_PER_SECOND),
        "m" => Some(NANOS_PER_MINUTE),
        "h" => Some(NANOS_PER_HOUR),
        _ => None,
    }
}

fn component_nanos(whole: &str, fraction: &str, scale: u128) -> Option<u128> {
    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut nanos = whole.checked_mul(scale)?;

    let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
    if !fraction.is_empty() {
        let numerator: u128 = fraction.parse().ok()?;
        let denominator = 10u128.checked_pow(u32::try_from(fraction.len()).ok()?)?;
        nanos = nanos.checked_add(numerator.checked_mul(scale)? / denominator)?;
    }
    Some(nanos)
}

fn write_decimal(
    f: &mut fmt::Formatter<'_>,
    nanos: u128,
    scale: u128,
    digits: usize,
) -> fmt::Result {
    write!(f, "{}", nanos / scale)?;
    let fraction = nanos % scale;
    if fraction > 0 {
        let padded = format!("{:0width$}", fraction, width = digits);
        write!(f, ".{}", padded.trim_end_matches('0'))?;
    }
    Ok(())
}

impl fmt::Display for KubeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.0.as_nanos();
        if nanos == 0 {
            return f.write_str("0s");
        }

        if nanos < NANOS_PER_MICRO {
            return write!(f, "{}ns", nanos);
        }
        if nanos < NANOS_PER_MILLI {
            write_decimal(f, nanos, NANOS_PER_MICRO, 3)?;
            return f.write_str("µs");
        }
        if nanos < NANOS_PER_SECOND {
            write_decimal(f, nanos, NANOS_PER_MILLI, 6)?;
            return f.write_str("ms");
        }

        let hours = nanos / NANOS_PER_HOUR;
        let minutes = (nanos % NANOS_PER_HOUR) / NANOS_PER_MINUTE;
        if hours > 0 {
            write!(f, "{}h", hours)?;
        }
        if hours > 0 || minutes > 0 {
            write!(f, "{}m", minutes)?;
        }
        write_decimal(f, nanos % NANOS_PER_MINUTE, NANOS_PER_SECOND, 9)?;
        f.write_str("s")
    }
}

impl FromStr for KubeDuration {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for KubeDuration {
    type Error = ActionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<KubeDuration> for String {
    fn from(value: KubeDuration) -> Self {
        value.to_string()
    }
}

impl From<Duration> for KubeDuration {
    fn from(value: Duration) -> Self {
        Self(value)
    }
}

impl From<KubeDuration> for Duration {
    fn from(value: KubeDuration) -> Self {
        value.0
    }
}
