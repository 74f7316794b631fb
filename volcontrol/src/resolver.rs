//! Best-guess elapsed/duration extraction from an unversioned payload.
//!
//! The player does not commit to a schema: elapsed time may be reported as
//! `seek` in milliseconds next to a `duration` in seconds, or nested under a
//! plugin-specific key as a `M:S` string. [`resolve_times`] gathers every
//! plausible candidate and tries each pairing under both unit hypotheses
//! (seconds, milliseconds), keeping the first one that makes physical sense.

use crate::raw::RawSnapshot;
use crate::time_utils::{MILLIS_THRESHOLD, parse_time_value};

/// Top-level keys read first, in priority order, for the elapsed time.
pub const POSITION_KEYS: [&str; 4] = ["seek", "position", "elapsed", "progress"];
/// Top-level keys read first, in priority order, for the track length.
pub const DURATION_KEYS: [&str; 5] = [
    "duration",
    "trackDuration",
    "totalTime",
    "length",
    "tracklength",
];

const POSITION_NEEDLES: [&str; 4] = ["seek", "position", "elapsed", "progress"];
const DURATION_NEEDLES: [&str; 7] = [
    "duration",
    "trackduration",
    "totaltime",
    "length",
    "tracklength",
    "time",
    "total",
];

/// Tracks longer than ten hours are not believed.
pub const MAX_DURATION_SECS: f64 = 36000.0;
/// Elapsed time may overshoot the duration by this factor.
pub const OVERSHOOT: f64 = 1.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitScale {
    Seconds,
    Millis,
}

impl UnitScale {
    const ALL: [UnitScale; 2] = [UnitScale::Seconds, UnitScale::Millis];

    #[inline]
    pub fn apply(self, value: f64) -> f64 {
        match self {
            UnitScale::Seconds => value,
            UnitScale::Millis => value / 1000.0,
        }
    }
}

/// How much trust the renderer can put in a [`ResolvedTimes`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// A position/duration pairing passed the plausibility checks.
    Matched,
    /// No pairing passed; each value was picked on its own.
    Fallback,
    /// No usable duration; the renderer shows a placeholder.
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedTimes {
    pub elapsed: f64,
    pub duration: f64,
    pub resolution: Resolution,
}

impl ResolvedTimes {
    pub fn unknown() -> Self {
        Self {
            elapsed: 0.0,
            duration: 0.0,
            resolution: Resolution::Unknown,
        }
    }

    pub fn is_known(&self) -> bool {
        self.resolution != Resolution::Unknown
    }

    /// `(elapsed, duration)` in seconds, or `None` when unknown.
    pub fn pair(&self) -> Option<(f64, f64)> {
        self.is_known().then_some((self.elapsed, self.duration))
    }

    /// Completion ratio clamped to `[0, 1]`; zero when unknown.
    pub fn ratio(&self) -> f64 {
        if !self.is_known() || self.duration <= 0.0 {
            return 0.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug)]
struct Combination {
    elapsed: f64,
    duration: f64,
    duration_scale: UnitScale,
}

#[inline]
fn plausible_duration(duration: f64) -> bool {
    duration > 0.0 && duration < MAX_DURATION_SECS
}

#[inline]
fn plausible_pair(elapsed: f64, duration: f64) -> bool {
    elapsed >= 0.0 && elapsed <= duration * OVERSHOOT && plausible_duration(duration)
}

/// Collects the parseable candidates for one quantity: exact top-level keys
/// first, then every key anywhere in the tree containing one of `needles`.
fn collect_candidates(raw: &RawSnapshot, keys: &[&str], needles: &[&str]) -> Vec<f64> {
    let top_level = keys.iter().filter_map(|key| raw.get(key));
    top_level
        .chain(raw.deep_find(needles))
        .filter_map(parse_time_value)
        .collect()
}

/// Resolves the elapsed time and track length of a payload, in seconds.
///
/// Every (position, duration) candidate pair is tried under the four unit
/// hypotheses. A combination survives when `0 <= elapsed <= duration * 1.1`
/// and `0 < duration < 36000`. Survivors are ranked by unscaled duration
/// first, then by the smaller duration; ties keep candidate order.
///
/// When nothing survives, each value is picked independently (see
/// [`fallback`]) and the result is flagged accordingly.
///
/// # Examples
/// ```
/// # use volcontrol::raw::RawSnapshot;
/// # use volcontrol::resolver::resolve_times;
/// let raw = RawSnapshot::from_json_str(r#"{"seek": 45000, "duration": 180}"#).unwrap();
/// assert_eq!(resolve_times(&raw).pair(), Some((45.0, 180.0)));
/// ```
pub fn resolve_times(raw: &RawSnapshot) -> ResolvedTimes {
    let positions = collect_candidates(raw, &POSITION_KEYS, &POSITION_NEEDLES);
    let durations = collect_candidates(raw, &DURATION_KEYS, &DURATION_NEEDLES);

    let mut combinations = Vec::new();
    for &position in &positions {
        for &duration in &durations {
            for position_scale in UnitScale::ALL {
                for duration_scale in UnitScale::ALL {
                    let elapsed = position_scale.apply(position);
                    let scaled = duration_scale.apply(duration);
                    if plausible_pair(elapsed, scaled) {
                        combinations.push(Combination {
                            elapsed,
                            duration: scaled,
                            duration_scale,
                        });
                    }
                }
            }
        }
    }

    // Stable sort: equal keys keep candidate order.
    combinations.sort_by(|a, b| {
        let rank = |c: &Combination| u8::from(c.duration_scale == UnitScale::Millis);
        rank(a)
            .cmp(&rank(b))
            .then_with(|| a.duration.total_cmp(&b.duration))
    });

    match combinations.first() {
        Some(best) => ResolvedTimes {
            elapsed: best.elapsed,
            duration: best.duration,
            resolution: Resolution::Matched,
        },
        None => fallback(&positions, &durations),
    }
}

/// Independent per-value choice used when no pairing is plausible.
///
/// Duration: the first candidate plausible as-is, or as milliseconds when it
/// exceeds 1000. Elapsed: the first candidate within the overshoot bound of
/// that duration (unbounded when the duration is unknown), else the first
/// one above 1000 read as milliseconds, else the first parseable one.
fn fallback(positions: &[f64], durations: &[f64]) -> ResolvedTimes {
    let duration = durations.iter().find_map(|&d| {
        if plausible_duration(d) {
            Some(d)
        } else if d > MILLIS_THRESHOLD && plausible_duration(d / 1000.0) {
            Some(d / 1000.0)
        } else {
            None
        }
    });

    let bound = duration.map_or(f64::INFINITY, |d| d * OVERSHOOT);
    let elapsed = positions
        .iter()
        .copied()
        .find(|&p| p >= 0.0 && p <= bound)
        .or_else(|| {
            positions
                .iter()
                .find(|&&p| p > MILLIS_THRESHOLD)
                .map(|&p| p / 1000.0)
                .or_else(|| positions.first().copied())
                .map(|p| p.clamp(0.0, bound))
        })
        .unwrap_or(0.0);

    match duration {
        Some(duration) => ResolvedTimes {
            elapsed,
            duration,
            resolution: Resolution::Fallback,
        },
        None => ResolvedTimes {
            elapsed,
            duration: 0.0,
            resolution: Resolution::Unknown,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawSnapshot {
        RawSnapshot::from_json_str(json).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_seek_millis_duration_seconds() {
        let times = resolve_times(&raw(r#"{"seek": 45000, "duration": 180}"#));
        assert_eq!(times.resolution, Resolution::Matched);
        assert_close(times.elapsed, 45.0);
        assert_close(times.duration, 180.0);
    }

    #[test]
    fn test_unit_invariance() {
        for &duration in &[40.0, 180.0, 245.0, 1200.0, 3600.0] {
            for &seek in &[0.0, 5.0, 45.0, 30.0, 39.0] {
                if seek > duration {
                    continue;
                }
                let variants = [
                    (seek, duration),
                    (seek * 1000.0, duration),
                    (seek, duration * 1000.0),
                    (seek * 1000.0, duration * 1000.0),
                ];
                for (s, d) in variants {
                    let payload = raw(&format!(r#"{{"seek": {s}, "duration": {d}}}"#));
                    let (elapsed, dur) = resolve_times(&payload)
                        .pair()
                        .unwrap_or_else(|| panic!("unresolved for seek={s} duration={d}"));
                    assert_close(elapsed, seek);
                    assert_close(dur, duration);
                }
            }
        }
    }

    #[test]
    fn test_queue_position_does_not_shadow_seek() {
        // `position` is the queue index on Volumio
        let times = resolve_times(&raw(r#"{"seek": 45000, "position": 3, "duration": 180}"#));
        assert_eq!(times.pair(), Some((45.0, 180.0)));
    }

    #[test]
    fn test_prefers_unscaled_duration_over_smaller() {
        // 240 s unscaled beats the smaller 0.24 s reading
        let times = resolve_times(&raw(r#"{"elapsed": 0.1, "duration": 240}"#));
        assert_close(times.duration, 240.0);
        assert_close(times.elapsed, 0.1);
    }

    #[test]
    fn test_prefers_smaller_duration_within_same_scale() {
        let times = resolve_times(&raw(r#"{"seek": 30, "length": 600, "duration": 200}"#));
        assert_close(times.elapsed, 30.0);
        assert_close(times.duration, 200.0);
    }

    #[test]
    fn test_nested_timecode_strings() {
        let payload = raw(
            r#"{"status": "play", "track": {"Progress": "1:30", "TrackLength": "4:00"}}"#,
        );
        let times = resolve_times(&payload);
        assert_eq!(times.pair(), Some((90.0, 240.0)));
    }

    #[test]
    fn test_unparseable_candidates_are_dropped() {
        let payload = raw(r#"{"seek": "n/a", "elapsed": "2:00", "duration": null, "totalTime": 300}"#);
        assert_eq!(resolve_times(&payload).pair(), Some((120.0, 300.0)));
    }

    #[test]
    fn test_fallback_duration_only() {
        // a negative position fails every hypothesis
        let times = resolve_times(&raw(r#"{"seek": -5, "duration": 100}"#));
        assert_eq!(times.resolution, Resolution::Fallback);
        assert_close(times.duration, 100.0);
        assert_close(times.elapsed, 0.0);
    }

    #[test]
    fn test_fallback_reads_large_duration_as_millis() {
        let times = fallback(&[-1.0], &[0.0, 200000.0]);
        assert_eq!(times.resolution, Resolution::Fallback);
        assert_close(times.duration, 200.0);
    }

    #[test]
    fn test_fallback_skips_to_millisecond_position() {
        let times = fallback(&[-5.0, 5000.0], &[3.0]);
        assert_eq!(times.resolution, Resolution::Fallback);
        assert_close(times.duration, 3.0);
        assert_close(times.elapsed, 3.3);

        let times = fallback(&[-5.0, 2000.0], &[100.0]);
        assert_close(times.elapsed, 2.0);
    }

    #[test]
    fn test_unknown_without_duration() {
        let times = resolve_times(&raw(r#"{"seek": 45000, "title": "x"}"#));
        assert_eq!(times.resolution, Resolution::Unknown);
        assert_eq!(times.pair(), None);
        assert_eq!(times.duration, 0.0);
        assert_eq!(times.ratio(), 0.0);
    }

    #[test]
    fn test_implausible_duration_is_unknown() {
        let times = resolve_times(&raw(r#"{"seek": 10, "duration": 0}"#));
        assert_eq!(times.resolution, Resolution::Unknown);
        assert_eq!(times.duration, 0.0);
    }

    #[test]
    fn test_non_mapping_payload() {
        assert_eq!(resolve_times(&RawSnapshot::from("hello")).pair(), None);
    }

    #[test]
    fn test_ratio() {
        let times = resolve_times(&raw(r#"{"seek": 90, "duration": 180}"#));
        assert_close(times.ratio(), 0.5);
        let overshoot = resolve_times(&raw(r#"{"seek": 190, "duration": 180}"#));
        assert_close(overshoot.ratio(), 1.0);
    }
}
