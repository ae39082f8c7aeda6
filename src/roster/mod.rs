//! Attendance roster: stable identity, reconciliation, and the poll task.

pub mod participant;
pub mod reconcile;
pub mod watcher;

pub use participant::{NameChange, Participant, Roster, RosterDelta};
pub use reconcile::{Reconciliation, TagAssignment};
pub use watcher::{RosterHandle, RosterWatcher};
