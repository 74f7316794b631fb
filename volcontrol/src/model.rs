use std::fmt;

use crate::raw::{RawMapping, RawSnapshot};
use crate::resolver::{ResolvedTimes, resolve_times};

pub const TITLE_KEY: &str = "title";
pub const ARTIST_KEY: &str = "artist";
pub const ALBUM_KEY: &str = "album";
pub const STATUS_KEY: &str = "status";
pub const VOLUME_KEY: &str = "volume";
pub const SAMPLE_RATE_KEY: &str = "samplerate";
pub const BITRATE_KEY: &str = "bitrate";

/// Transport state as reported by the player's `status` field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    Stopped,
    Unknown(String),
}

impl PlaybackStatus {
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "play" => PlaybackStatus::Playing,
            "pause" => PlaybackStatus::Paused,
            "stop" => PlaybackStatus::Stopped,
            other => PlaybackStatus::Unknown(other.to_string()),
        }
    }

    /// The value the player itself uses for this state.
    pub fn as_raw(&self) -> &str {
        match self {
            PlaybackStatus::Playing => "play",
            PlaybackStatus::Paused => "pause",
            PlaybackStatus::Stopped => "stop",
            PlaybackStatus::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_raw())
    }
}

/// The store's merged view of the player.
///
/// No schema is imposed: every key the player ever sent is kept, with the
/// last reported value. The accessors below only interpret the handful of
/// keys the UI shows.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CanonicalSnapshot {
    fields: RawMapping,
}

impl CanonicalSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mapping(fields: RawMapping) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &RawMapping {
        &self.fields
    }

    pub(crate) fn fields_mut(&mut self) -> &mut RawMapping {
        &mut self.fields
    }

    pub fn get(&self, key: &str) -> Option<&RawSnapshot> {
        self.fields.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn text(&self, key: &str) -> Option<String> {
        self.fields.get(key).and_then(RawSnapshot::as_text)
    }

    pub fn title(&self) -> Option<String> {
        self.text(TITLE_KEY)
    }

    pub fn artist(&self) -> Option<String> {
        self.text(ARTIST_KEY)
    }

    pub fn album(&self) -> Option<String> {
        self.text(ALBUM_KEY)
    }

    pub fn playback_status(&self) -> Option<PlaybackStatus> {
        self.text(STATUS_KEY).map(|s| PlaybackStatus::from_raw(&s))
    }

    /// Raw `status` text, used by the play/pause toggle.
    pub fn status_text(&self) -> Option<String> {
        self.text(STATUS_KEY)
    }

    /// Sample rate, falling back to the bitrate when the player omits it.
    pub fn sample_rate(&self) -> Option<String> {
        match self.fields.get(SAMPLE_RATE_KEY) {
            Some(RawSnapshot::Null) | None => self.text(BITRATE_KEY),
            Some(value) => value.as_text(),
        }
    }

    /// Volume in `[0, 100]`; numeric strings are accepted.
    pub fn volume(&self) -> Option<u8> {
        let value = match self.fields.get(VOLUME_KEY)? {
            RawSnapshot::Number(n) => *n,
            RawSnapshot::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        if !value.is_finite() {
            return None;
        }
        Some(value.trunc().clamp(0.0, 100.0) as u8)
    }

    /// Display times resolved from the current fields.
    pub fn times(&self) -> ResolvedTimes {
        resolve_times(&RawSnapshot::Mapping(self.fields.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(json: &str) -> CanonicalSnapshot {
        CanonicalSnapshot::from_mapping(
            RawSnapshot::from_json_str(json)
                .unwrap()
                .into_mapping()
                .unwrap(),
        )
    }

    #[test]
    fn test_accessors() {
        let s = snapshot(
            r#"{"title": "So What", "artist": "Miles Davis", "album": "Kind of Blue",
                "status": "play", "samplerate": "44.1 kHz", "volume": 42}"#,
        );
        assert_eq!(s.title().as_deref(), Some("So What"));
        assert_eq!(s.artist().as_deref(), Some("Miles Davis"));
        assert_eq!(s.album().as_deref(), Some("Kind of Blue"));
        assert_eq!(s.playback_status(), Some(PlaybackStatus::Playing));
        assert_eq!(s.sample_rate().as_deref(), Some("44.1 kHz"));
        assert_eq!(s.volume(), Some(42));
    }

    #[test]
    fn test_sample_rate_falls_back_to_bitrate() {
        let s = snapshot(r#"{"samplerate": null, "bitrate": "320 kbps"}"#);
        assert_eq!(s.sample_rate().as_deref(), Some("320 kbps"));
        assert_eq!(snapshot("{}").sample_rate(), None);
    }

    #[test]
    fn test_volume_parsing() {
        assert_eq!(snapshot(r#"{"volume": "57"}"#).volume(), Some(57));
        assert_eq!(snapshot(r#"{"volume": 12.9}"#).volume(), Some(12));
        assert_eq!(snapshot(r#"{"volume": 140}"#).volume(), Some(100));
        assert_eq!(snapshot(r#"{"volume": "loud"}"#).volume(), None);
        assert_eq!(snapshot(r#"{}"#).volume(), None);
    }

    #[test]
    fn test_unknown_status_keeps_raw_text() {
        let s = snapshot(r#"{"status": "buffering"}"#);
        assert_eq!(
            s.playback_status(),
            Some(PlaybackStatus::Unknown("buffering".to_string()))
        );
        assert_eq!(s.playback_status().unwrap().to_string(), "buffering");
    }
}
