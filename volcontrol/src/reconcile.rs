//! Anti-bounce merge policy.
//!
//! A seek issued by the user is written locally right away, but the player
//! keeps reporting the old position for a moment. Without protection the
//! progress bar would jump back, then forward again once the seek lands.
//!
//! Each field class carries at most one [`PendingEdit`]. Only `Position` is
//! protected: while its edit is younger than [`ANTI_BOUNCE_WINDOW`], incoming
//! position keys are dropped unless they agree with the target within
//! [`SEEK_TOLERANCE_SECS`]. `Volume` and `PlaybackStatus` edits are simply
//! overwritten by the next report carrying their key.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::model::{PlaybackStatus, STATUS_KEY, VOLUME_KEY};
use crate::raw::RawMapping;
use crate::resolver::POSITION_KEYS;
use crate::time_utils::{normalize_seconds_simple, parse_time_value};

pub const ANTI_BOUNCE_WINDOW: Duration = Duration::from_secs(3);
pub const SEEK_TOLERANCE_SECS: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldClass {
    Position,
    Volume,
    PlaybackStatus,
}

/// Value asserted locally by a user command.
#[derive(Clone, Debug, PartialEq)]
pub enum EditTarget {
    /// Elapsed time, in seconds.
    Position(f64),
    Volume(u8),
    PlaybackStatus(PlaybackStatus),
}

impl EditTarget {
    pub fn field_class(&self) -> FieldClass {
        match self {
            EditTarget::Position(_) => FieldClass::Position,
            EditTarget::Volume(_) => FieldClass::Volume,
            EditTarget::PlaybackStatus(_) => FieldClass::PlaybackStatus,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PendingEdit {
    pub target: EditTarget,
    pub issued_at: Instant,
}

impl PendingEdit {
    pub fn new(target: EditTarget, issued_at: Instant) -> Self {
        Self { target, issued_at }
    }

    pub fn field_class(&self) -> FieldClass {
        self.target.field_class()
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.issued_at)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.age(now) >= ANTI_BOUNCE_WINDOW
    }
}

/// Per-field reconciliation state.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldState {
    Stable,
    PendingConfirmation(PendingEdit),
}

/// What a merge did with the position family of keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No position edit was pending; everything merged.
    Unconditional,
    /// The player caught up with the pending seek; everything merged and
    /// the edit cleared.
    Confirmed,
    /// The pending seek outlived its window; everything merged and the edit
    /// cleared.
    Expired,
    /// The report disagreed with the pending seek; position keys were
    /// dropped, the rest merged.
    PositionHeld,
}

#[derive(Clone, Debug, Default)]
pub struct ReconciliationPolicy {
    position: Option<PendingEdit>,
    volume: Option<PendingEdit>,
    status: Option<PendingEdit>,
}

impl ReconciliationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, class: FieldClass) -> &Option<PendingEdit> {
        match class {
            FieldClass::Position => &self.position,
            FieldClass::Volume => &self.volume,
            FieldClass::PlaybackStatus => &self.status,
        }
    }

    fn slot_mut(&mut self, class: FieldClass) -> &mut Option<PendingEdit> {
        match class {
            FieldClass::Position => &mut self.position,
            FieldClass::Volume => &mut self.volume,
            FieldClass::PlaybackStatus => &mut self.status,
        }
    }

    /// Installs `edit`, replacing any edit of the same class. Returns the
    /// superseded edit.
    pub fn begin(&mut self, edit: PendingEdit) -> Option<PendingEdit> {
        self.slot_mut(edit.field_class()).replace(edit)
    }

    pub fn pending(&self, class: FieldClass) -> Option<&PendingEdit> {
        self.slot(class).as_ref()
    }

    /// State of `class` as seen at `now`: an edit past its window counts as
    /// stable even before the next merge clears it.
    pub fn state(&self, class: FieldClass, now: Instant) -> FieldState {
        match self.slot(class) {
            Some(edit) if !edit.is_expired(now) => FieldState::PendingConfirmation(edit.clone()),
            _ => FieldState::Stable,
        }
    }

    /// Merges `incoming` into `canonical` according to the pending edits.
    pub fn merge(
        &mut self,
        canonical: &mut RawMapping,
        mut incoming: RawMapping,
        now: Instant,
    ) -> MergeOutcome {
        let carries_volume = incoming.contains_key(VOLUME_KEY);
        let carries_status = incoming.contains_key(STATUS_KEY);

        let outcome = match self.position.take() {
            None => MergeOutcome::Unconditional,
            Some(edit) if edit.is_expired(now) => MergeOutcome::Expired,
            Some(edit) => match edit.target {
                EditTarget::Position(target) => match reported_position(&incoming) {
                    Some(reported) if (reported - target).abs() <= SEEK_TOLERANCE_SECS => {
                        MergeOutcome::Confirmed
                    }
                    _ => {
                        strip_position_keys(&mut incoming);
                        self.position = Some(edit);
                        MergeOutcome::PositionHeld
                    }
                },
                _ => MergeOutcome::Unconditional,
            },
        };

        trace!(?outcome, keys = incoming.len(), "Merging player state");
        canonical.update(incoming);

        self.settle_simple(FieldClass::Volume, carries_volume, now);
        self.settle_simple(FieldClass::PlaybackStatus, carries_status, now);

        outcome
    }

    /// Volume and status edits are not protected: once a report carries the
    /// field, the reported value stands and the edit is done.
    fn settle_simple(&mut self, class: FieldClass, reported: bool, now: Instant) {
        let slot = self.slot_mut(class);
        if slot.as_ref().is_some_and(|edit| reported || edit.is_expired(now)) {
            *slot = None;
        }
    }
}

/// Position reported by the player, normalized with the rough millisecond
/// rule. Keys are tried in priority order; an unparseable value moves on to
/// the next key.
pub fn reported_position(incoming: &RawMapping) -> Option<f64> {
    POSITION_KEYS
        .iter()
        .filter_map(|key| incoming.get(key))
        .find_map(parse_time_value)
        .map(normalize_seconds_simple)
}

fn strip_position_keys(incoming: &mut RawMapping) {
    for key in POSITION_KEYS {
        incoming.remove(key);
    }
}
