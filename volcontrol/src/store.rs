//! Shared player state.
//!
//! [`StateStore`] is the only mutable state shared between the poller, the
//! command dispatcher and the renderer. Every operation takes the single
//! lock for the shortest possible time; readers get an owned copy and work
//! on it after the lock is released.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, trace};

use crate::model::{CanonicalSnapshot, STATUS_KEY, VOLUME_KEY};
use crate::raw::{RawMapping, RawSnapshot};
use crate::reconcile::{
    EditTarget, FieldClass, FieldState, MergeOutcome, PendingEdit, ReconciliationPolicy,
};
use crate::resolver::POSITION_KEYS;
use crate::time_utils::MILLIS_THRESHOLD;

#[derive(Debug, Default)]
struct StoreInner {
    snapshot: CanonicalSnapshot,
    policy: ReconciliationPolicy,
}

/// Cloneable handle on the shared state.
#[derive(Clone, Debug, Default)]
pub struct StateStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    // The guarded data is plain values, always consistent between
    // statements, so a panic elsewhere does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Merges a freshly fetched payload. A payload that is not a mapping
    /// carries no data and is ignored.
    pub fn merge(&self, raw: RawSnapshot) -> Option<MergeOutcome> {
        self.merge_at(raw, Instant::now())
    }

    pub fn merge_at(&self, raw: RawSnapshot, now: Instant) -> Option<MergeOutcome> {
        let Some(incoming) = raw.into_mapping() else {
            debug!("Ignoring player state that is not a mapping");
            return None;
        };
        let mut guard = self.lock();
        let StoreInner { snapshot, policy } = &mut *guard;
        Some(policy.merge(snapshot.fields_mut(), incoming, now))
    }

    /// Owned copy of the canonical state for rendering.
    pub fn snapshot(&self) -> CanonicalSnapshot {
        self.lock().snapshot.clone()
    }

    /// Writes `target` into the canonical state and records it as the
    /// pending edit of its class. The last writer wins: a previous edit of
    /// the same class is returned and forgotten.
    pub fn begin_edit(&self, target: EditTarget) -> Option<PendingEdit> {
        self.begin_edit_at(target, Instant::now())
    }

    pub fn begin_edit_at(&self, target: EditTarget, now: Instant) -> Option<PendingEdit> {
        let mut guard = self.lock();
        let StoreInner { snapshot, policy } = &mut *guard;
        write_optimistic(snapshot.fields_mut(), &target);
        trace!(?target, "Optimistic edit");
        policy.begin(PendingEdit::new(target, now))
    }

    /// Computes an edit from the current state and installs it, all under
    /// the lock, so concurrent commands never build on a stale value.
    ///
    /// Returns the installed target, or `None` when `compute` declined.
    pub fn edit_with<F>(&self, compute: F) -> Option<EditTarget>
    where
        F: FnOnce(&CanonicalSnapshot) -> Option<EditTarget>,
    {
        let now = Instant::now();
        let mut guard = self.lock();
        let StoreInner { snapshot, policy } = &mut *guard;
        let target = compute(snapshot)?;
        write_optimistic(snapshot.fields_mut(), &target);
        trace!(?target, "Optimistic edit");
        policy.begin(PendingEdit::new(target.clone(), now));
        Some(target)
    }

    pub fn pending(&self, class: FieldClass) -> Option<PendingEdit> {
        self.lock().policy.pending(class).cloned()
    }

    pub fn field_state(&self, class: FieldClass) -> FieldState {
        self.field_state_at(class, Instant::now())
    }

    pub fn field_state_at(&self, class: FieldClass, now: Instant) -> FieldState {
        self.lock().policy.state(class, now)
    }
}

/// Reflects a local edit in the canonical fields.
///
/// A position is written to every position key already present, keeping the
/// unit each key appears to use, or to `seek` when the player never reported
/// one.
fn write_optimistic(fields: &mut RawMapping, target: &EditTarget) {
    match target {
        EditTarget::Position(seconds) => {
            let seconds = seconds.max(0.0);
            let present: Vec<&str> = POSITION_KEYS
                .iter()
                .copied()
                .filter(|key| fields.contains_key(key))
                .collect();
            if present.is_empty() {
                fields.insert(POSITION_KEYS[0], RawSnapshot::Number(seconds.trunc()));
                return;
            }
            for key in present {
                let in_millis = matches!(
                    fields.get(key),
                    Some(RawSnapshot::Number(n)) if *n > MILLIS_THRESHOLD
                );
                let value = if in_millis {
                    (seconds * 1000.0).trunc()
                } else {
                    seconds.trunc()
                };
                fields.insert(key, RawSnapshot::Number(value));
            }
        }
        EditTarget::Volume(volume) => {
            fields.insert(VOLUME_KEY, RawSnapshot::Number(f64::from((*volume).min(100))));
        }
        EditTarget::PlaybackStatus(status) => {
            fields.insert(STATUS_KEY, RawSnapshot::String(status.as_raw().to_string()));
        }
    }
}
