//! Periodic roster polling task.
//!
//! Started by the join machine when the meeting is joined. Polls strictly
//! sequentially: a poll's reconcile fully applies before the next one
//! starts, and external readers only see the roster through [`RosterHandle`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::page::MeetingPage;

use super::participant::{Participant, Roster, RosterDelta};

/// Thread-safe handle for sharing the roster between the watcher and
/// external readers.
#[derive(Clone, Default)]
pub struct RosterHandle {
    inner: Arc<Mutex<Roster>>,
}

impl RosterHandle {
    /// Point-in-time copy. Never observes a reconcile mid-flight.
    pub async fn snapshot(&self) -> Vec<Participant> {
        self.inner.lock().await.snapshot()
    }

    pub(crate) async fn lock(&self) -> MutexGuard<'_, Roster> {
        self.inner.lock().await
    }
}

/// Runs the participants poll loop until cancelled.
pub struct RosterWatcher {
    page: Arc<dyn MeetingPage>,
    roster: RosterHandle,
    events: broadcast::Sender<RosterDelta>,
    poll_interval: Duration,
    halt_on_violation: bool,
    cancel: CancellationToken,
}

impl RosterWatcher {
    pub fn new(
        page: Arc<dyn MeetingPage>,
        roster: RosterHandle,
        events: broadcast::Sender<RosterDelta>,
        poll_interval: Duration,
        halt_on_violation: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            page,
            roster,
            events,
            poll_interval,
            halt_on_violation,
            cancel,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        info!(
            "Roster watcher started, polling every {}s",
            self.poll_interval.as_secs()
        );

        loop {
            if !self.poll_once().await {
                break;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!("Roster watcher stopped");
    }

    /// One complete poll. Returns false when the watcher should stop.
    async fn poll_once(&self) -> bool {
        let entries = match self.page.participant_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                // one bad read must not end a multi-hour session
                warn!("Failed to read participants list: {e:#}");
                return true;
            }
        };

        let result = {
            let mut roster = self.roster.lock().await;
            roster.reconcile(&entries)
        };

        let reconciliation = match result {
            Ok(reconciliation) => reconciliation,
            Err(violation) => {
                error!("Discarding participants poll: {violation}");
                return !self.halt_on_violation;
            }
        };

        for assignment in &reconciliation.assignments {
            let entry = &entries[assignment.entry_index];
            if let Err(e) = self.page.tag_entry(entry, assignment.marker).await {
                // untagged nodes simply show up as joins again next poll
                warn!("Failed to tag entry for {:?}: {e:#}", entry.name);
            }
        }

        let delta = reconciliation.delta;
        for participant in &delta.joined {
            info!(
                "Participant joined: {} (id {})",
                participant.display_name, participant.id
            );
        }
        for change in &delta.renamed {
            info!(
                "Participant renamed: {} -> {} (id {})",
                change.previous_name, change.participant.display_name, change.participant.id
            );
        }
        for participant in &delta.left {
            info!(
                "Participant left: {} (id {})",
                participant.display_name, participant.id
            );
        }

        // one delta per completed poll, empty ones included
        if self.events.send(delta).is_err() {
            debug!("No roster delta subscribers");
        }

        true
    }
}
