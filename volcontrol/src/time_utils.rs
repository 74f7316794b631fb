//! Time parsing and formatting utilities for player payloads.
//!
//! Players report elapsed time and track length in whatever shape their
//! firmware or plugin chose:
//! - plain seconds or milliseconds, as JSON numbers or numeric strings
//! - colon timecodes (`H:M:S`, `M:S`)
//!
//! Every parser here returns an `Option` or a `Result`: an unparseable value
//! is an ordinary outcome, never a panic.

use crate::errors::ControlError;
use crate::raw::RawSnapshot;

/// Values strictly above this are taken to be milliseconds by the rough
/// heuristic used for comparisons.
pub const MILLIS_THRESHOLD: f64 = 1000.0;

/// Parses a time string in H:M:S, M:S, or S format to seconds.
///
/// Each component may carry a fractional part.
///
/// # Examples
/// ```
/// # use volcontrol::time_utils::parse_timecode;
/// assert_eq!(parse_timecode("01:02:03").unwrap(), 3723.0);
/// assert_eq!(parse_timecode("02:03").unwrap(), 123.0);
/// assert_eq!(parse_timecode("42.5").unwrap(), 42.5);
/// ```
///
/// # Errors
/// Returns an error if:
/// - The input has more than 3 parts
/// - Any part is not a valid number
pub fn parse_timecode(input: &str) -> Result<f64, ControlError> {
    let parts: Vec<&str> = input.trim().split(':').collect();

    if parts.len() > 3 {
        return Err(ControlError::InvalidTimeFormat(format!(
            "Invalid time format '{}': expected H:M:S, M:S, or S",
            input
        )));
    }

    let mut total = 0f64;
    for part in parts {
        let value = part.trim().parse::<f64>().map_err(|_| {
            ControlError::InvalidTimeFormat(format!(
                "Invalid numeric value '{}' in time string '{}'",
                part, input
            ))
        })?;
        total = total * 60.0 + value;
    }

    if !total.is_finite() {
        return Err(ControlError::InvalidTimeFormat(format!(
            "Non-finite time value '{}'",
            input
        )));
    }

    Ok(total)
}

/// Turns a raw payload value into a number of (unscaled) units.
///
/// Numbers pass through, strings are parsed as a plain number and then as a
/// timecode. Anything else, or anything that fails to parse, yields `None`.
pub fn parse_time_value(value: &RawSnapshot) -> Option<f64> {
    match value {
        RawSnapshot::Number(n) if n.is_finite() => Some(*n),
        RawSnapshot::String(s) => {
            let s = s.trim();
            match s.parse::<f64>() {
                Ok(n) if n.is_finite() => Some(n),
                Ok(_) => None,
                Err(_) => parse_timecode(s).ok(),
            }
        }
        _ => None,
    }
}

/// Rough unit normalization: anything above 1000 is assumed to be
/// milliseconds.
///
/// Only meant for comparisons against a known target; display values go
/// through [`crate::resolver::resolve_times`].
#[inline]
pub fn normalize_seconds_simple(value: f64) -> f64 {
    if value > MILLIS_THRESHOLD {
        value / 1000.0
    } else {
        value
    }
}

/// Formats seconds as `MM:SS`; minutes are not wrapped into hours.
///
/// # Examples
/// ```
/// # use volcontrol::time_utils::format_clock;
/// assert_eq!(format_clock(0.0), "00:00");
/// assert_eq!(format_clock(61.9), "01:01");
/// assert_eq!(format_clock(3725.0), "62:05");
/// ```
pub fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}
