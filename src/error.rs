//! Typed errors for the join flow and roster reconciliation.

use std::time::Duration;

use thiserror::Error;

use crate::meeting::MeetingStatus;
use crate::page::ParticipantId;

/// Terminal failures of a join run.
///
/// None of these are retried: a page error and a phase timeout are final by
/// contract, and driver failures are propagated to the caller unchanged.
#[derive(Debug, Error)]
pub enum JoinError {
    /// The page surfaced an explicit error message (bad meeting id, expired
    /// link, removed from meeting, ...).
    #[error("meeting page reported an error: {0}")]
    Page(String),

    /// A phase exceeded its configured wait budget.
    #[error("gave up in the {} phase after {}s", .status.as_str(), .budget.as_secs())]
    PhaseTimeout {
        status: MeetingStatus,
        budget: Duration,
    },

    /// The browser collaborator failed (navigation, element query, session).
    #[error(transparent)]
    Driver(#[from] anyhow::Error),
}

/// Contract violations detected while reconciling a participants poll.
///
/// Both variants mean the collaborator handed us an impossible snapshot.
/// The violating poll's delta is discarded whole; the roster is untouched.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RosterError {
    /// Two entries in one poll carried the same marker.
    #[error("duplicate marker {0} in one participants poll")]
    DuplicateMarker(ParticipantId),

    /// An entry carried a marker no participant was ever assigned.
    #[error("marker {0} does not match any known participant")]
    UnknownMarker(ParticipantId),
}
