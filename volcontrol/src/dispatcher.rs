//! Optimistic user commands.
//!
//! Each entry point computes the new value from the current state, writes
//! it to the [`StateStore`] at once so the next frame shows it, then hands
//! the remote side to a detached thread: the command(s), followed by one
//! out-of-band fetch. That thread is never joined and its failures are
//! logged at debug level and otherwise discarded.

use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use crate::model::{CanonicalSnapshot, PlaybackStatus};
use crate::poller::poll_once;
use crate::reconcile::EditTarget;
use crate::resolver::POSITION_KEYS;
use crate::store::StateStore;
use crate::time_utils::{normalize_seconds_simple, parse_time_value};
use crate::volumio_client::{PlayerApi, PlayerCommand, SeekParam};

#[derive(Clone)]
pub struct CommandDispatcher {
    api: Arc<dyn PlayerApi>,
    store: StateStore,
}

impl CommandDispatcher {
    pub fn new(api: Arc<dyn PlayerApi>, store: StateStore) -> Self {
        Self { api, store }
    }

    /// Shifts the volume by `delta`, clamped to `[0, 100]`. Returns the new
    /// volume.
    pub fn change_volume(&self, delta: i32) -> u8 {
        let mut volume = 0;
        self.store.edit_with(|snapshot| {
            volume = next_volume(snapshot, delta);
            Some(EditTarget::Volume(volume))
        });
        self.dispatch(vec![PlayerCommand::Volume(volume)]);
        volume
    }

    /// Pauses when the player reports a playing state, plays otherwise.
    /// Returns the requested status.
    pub fn toggle_play(&self) -> PlaybackStatus {
        let mut status = PlaybackStatus::Playing;
        self.store.edit_with(|snapshot| {
            status = toggled_status(snapshot);
            Some(EditTarget::PlaybackStatus(status.clone()))
        });
        let command = match status {
            PlaybackStatus::Paused => PlayerCommand::Pause,
            _ => PlayerCommand::Play,
        };
        self.dispatch(vec![command]);
        status
    }

    pub fn previous(&self) {
        self.dispatch(vec![PlayerCommand::Previous]);
    }

    pub fn next(&self) {
        self.dispatch(vec![PlayerCommand::Next]);
    }

    /// Seeks `delta` seconds from the current position, clamped to the
    /// track. Returns the new position in seconds.
    pub fn seek_relative(&self, delta: f64) -> f64 {
        let mut position = 0.0;
        self.store.edit_with(|snapshot| {
            position = seek_target(snapshot, delta);
            Some(EditTarget::Position(position))
        });
        self.dispatch(seek_commands(position));
        position
    }

    /// Sends `commands` in order on a detached thread, then refreshes the
    /// state once.
    fn dispatch(&self, commands: Vec<PlayerCommand>) {
        let api = Arc::clone(&self.api);
        let store = self.store.clone();

        let spawned = thread::Builder::new()
            .name("volumito-command".to_string())
            .spawn(move || {
                for command in &commands {
                    if let Err(err) = api.send_command(command) {
                        debug!(error = %err, query = %command.query(), "Player command failed");
                    }
                }
                poll_once(api.as_ref(), &store);
            });

        // Dropping the handle detaches the thread.
        if let Err(err) = spawned {
            warn!(error = %err, "Failed to spawn command thread");
        }
    }
}

pub fn next_volume(snapshot: &CanonicalSnapshot, delta: i32) -> u8 {
    let current = i32::from(snapshot.volume().unwrap_or(0));
    current.saturating_add(delta).clamp(0, 100) as u8
}

pub fn toggled_status(snapshot: &CanonicalSnapshot) -> PlaybackStatus {
    let playing = snapshot
        .status_text()
        .is_some_and(|s| s.to_lowercase().contains("play"));
    if playing {
        PlaybackStatus::Paused
    } else {
        PlaybackStatus::Playing
    }
}

/// New position for a relative seek, in `[0, duration]`.
///
/// Starts from the resolved display position so the jump is relative to
/// what the user sees; with no usable pair the rough position reading is
/// used and only the lower bound applies.
pub fn seek_target(snapshot: &CanonicalSnapshot, delta: f64) -> f64 {
    let times = snapshot.times();
    let (current, duration) = match times.pair() {
        Some((elapsed, duration)) => (elapsed, Some(duration)),
        None => (rough_position(snapshot).unwrap_or(0.0), None),
    };

    let target = (current + delta).max(0.0);
    match duration {
        Some(duration) => target.min(duration),
        None => target,
    }
}

fn rough_position(snapshot: &CanonicalSnapshot) -> Option<f64> {
    POSITION_KEYS
        .iter()
        .filter_map(|key| snapshot.get(key))
        .find_map(parse_time_value)
        .map(normalize_seconds_simple)
}

/// Every seek spelling the player might honor, in the order they are tried.
pub fn seek_commands(position: f64) -> Vec<PlayerCommand> {
    let secs = position.max(0.0).trunc() as u64;
    let millis = (position.max(0.0) * 1000.0).trunc() as u64;
    vec![
        PlayerCommand::Seek {
            param: SeekParam::Value,
            value: secs,
        },
        PlayerCommand::Seek {
            param: SeekParam::Position,
            value: secs,
        },
        PlayerCommand::Seek {
            param: SeekParam::Seek,
            value: millis,
        },
        PlayerCommand::Seek {
            param: SeekParam::Seek,
            value: secs,
        },
    ]
}
