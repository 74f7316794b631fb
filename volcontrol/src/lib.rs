//! Player state reconciliation core for Volumito.
//!
//! The player is polled for a loosely structured JSON state; user commands
//! are applied locally first and confirmed by later polls. See
//! [`store::StateStore`] for the shared state, [`resolver`] for how elapsed
//! time and duration are read out of payloads of unknown shape, and
//! [`reconcile`] for how a pending seek survives stale reports.

pub mod dispatcher;
pub mod errors;
pub mod model;
pub mod poller;
pub mod raw;
pub mod reconcile;
pub mod resolver;
pub mod store;
pub mod time_utils;
pub mod volumio_client;

pub use dispatcher::CommandDispatcher;
pub use errors::ControlError;
pub use model::{CanonicalSnapshot, PlaybackStatus};
pub use poller::{Poller, poll_once};
pub use raw::{RawMapping, RawSnapshot};
pub use reconcile::{
    ANTI_BOUNCE_WINDOW, EditTarget, FieldClass, FieldState, MergeOutcome, PendingEdit,
    ReconciliationPolicy,
};
pub use resolver::{Resolution, ResolvedTimes, resolve_times};
pub use store::StateStore;
pub use volumio_client::{PlayerApi, PlayerCommand, SeekParam, VolumioClient};
