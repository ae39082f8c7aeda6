//! Join flow orchestrator.
//!
//! Drives the classifier over fresh signal snapshots until the meeting is
//! joined, ended, or failed. Entry actions run exactly once per distinct
//! status reached; reaching `Joined` hands off to the roster watcher, which
//! runs as an independent task until stopped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::JoinError;
use crate::page::MeetingPage;
use crate::roster::{RosterDelta, RosterHandle, RosterWatcher};

use super::classifier::classify;
use super::status::{JoinStatusHandle, MeetingStatus};

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// In the meeting; the roster watcher is running.
    Joined,
    /// The meeting was over before we got in.
    Ended,
}

/// Wait budgets for the non-terminal phases of the join flow.
///
/// Exceeding a budget is a terminal [`JoinError::PhaseTimeout`], never a
/// silent retry past the bound. The clock restarts whenever a new distinct
/// status is reached.
#[derive(Debug, Clone, Copy)]
pub struct PhaseTimeouts {
    /// Waiting for the first meaningful signal after the join handshake.
    pub unstarted: Duration,
    /// Waiting for the host to start the meeting.
    pub not_started: Duration,
    /// Waiting in the waiting room to be let in.
    pub waiting_room: Duration,
}

impl Default for PhaseTimeouts {
    fn default() -> Self {
        Self {
            unstarted: Duration::from_secs(180),
            not_started: Duration::from_secs(1800),
            waiting_room: Duration::from_secs(1800),
        }
    }
}

impl PhaseTimeouts {
    fn budget(&self, status: MeetingStatus) -> Duration {
        match status {
            MeetingStatus::Unstarted => self.unstarted,
            MeetingStatus::NotStarted => self.not_started,
            MeetingStatus::WaitingRoom => self.waiting_room,
            // the poll loop exits on these before the budget is consulted
            MeetingStatus::Joined | MeetingStatus::Ended => Duration::MAX,
        }
    }
}

/// Tunables for a join run.
#[derive(Debug, Clone)]
pub struct JoinOptions {
    pub display_name: String,
    /// Delay between signal polls.
    pub poll_interval: Duration,
    /// Delay between participants polls once joined.
    pub roster_poll_interval: Duration,
    pub phase_timeouts: PhaseTimeouts,
    /// Stop the roster watcher on a reconciliation contract violation
    /// instead of discarding the poll and carrying on.
    pub halt_on_violation: bool,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            display_name: "RollcallBot".to_string(),
            poll_interval: Duration::from_secs(5),
            roster_poll_interval: Duration::from_secs(5),
            phase_timeouts: PhaseTimeouts::default(),
            halt_on_violation: false,
        }
    }
}

pub struct JoinMachine {
    page: Arc<dyn MeetingPage>,
    options: JoinOptions,
    status: JoinStatusHandle,
    roster: RosterHandle,
    events: broadcast::Sender<RosterDelta>,
    cancel: CancellationToken,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl JoinMachine {
    pub fn new(page: Arc<dyn MeetingPage>, options: JoinOptions) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            page,
            options,
            status: JoinStatusHandle::default(),
            roster: RosterHandle::default(),
            events,
            cancel: CancellationToken::new(),
            watcher: Mutex::new(None),
        }
    }

    /// Shared join-state handle for external readers.
    pub fn status(&self) -> JoinStatusHandle {
        self.status.clone()
    }

    /// Shared roster handle for external readers.
    pub fn roster(&self) -> RosterHandle {
        self.roster.clone()
    }

    /// One [`RosterDelta`] per completed participants poll.
    pub fn subscribe(&self) -> broadcast::Receiver<RosterDelta> {
        self.events.subscribe()
    }

    /// Run the join flow to a terminal outcome.
    ///
    /// On `Joined` the roster watcher keeps running after this returns;
    /// stop it with [`shutdown`](Self::shutdown).
    pub async fn run(
        &self,
        meeting_id: &str,
        passcode: &str,
    ) -> Result<JoinOutcome, JoinError> {
        let result = self.drive(meeting_id, passcode).await;
        if let Err(e) = &result {
            self.status.set_error(e.to_string()).await;
        }
        result
    }

    async fn drive(
        &self,
        meeting_id: &str,
        passcode: &str,
    ) -> Result<JoinOutcome, JoinError> {
        self.status.begin(meeting_id).await;

        info!("Joining meeting {}", meeting_id);
        self.page.load_join_page(meeting_id).await?;
        self.page
            .submit_display_name(&self.options.display_name)
            .await?;

        let mut current = MeetingStatus::Unstarted;
        let mut phase_started = Instant::now();

        loop {
            let snapshot = self.page.signal_snapshot().await?;
            let next = classify(&snapshot, current)?;

            if next != current {
                self.transition(next, passcode).await?;
                current = next;
                phase_started = Instant::now();
            }

            match current {
                MeetingStatus::Joined => {
                    info!("Joined meeting {}", meeting_id);
                    return Ok(JoinOutcome::Joined);
                }
                MeetingStatus::Ended => {
                    info!("Meeting {} has ended", meeting_id);
                    return Ok(JoinOutcome::Ended);
                }
                _ => {}
            }

            let budget = self.options.phase_timeouts.budget(current);
            if phase_started.elapsed() >= budget {
                return Err(JoinError::PhaseTimeout {
                    status: current,
                    budget,
                });
            }

            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    /// Entry action for a newly reached status. The caller only invokes
    /// this on an actual change, so re-observing a status is a no-op.
    async fn transition(
        &self,
        next: MeetingStatus,
        passcode: &str,
    ) -> Result<(), JoinError> {
        info!("Meeting status: {}", next.as_str());
        self.status.set_status(next).await;

        match next {
            MeetingStatus::NotStarted => {
                // the passcode form is on this page; fill it once and keep
                // polling until the host starts the meeting
                self.page.submit_passcode(passcode).await?;
            }
            MeetingStatus::Joined => {
                self.start_roster_watcher().await;
            }
            _ => {}
        }

        Ok(())
    }

    async fn start_roster_watcher(&self) {
        let watcher = RosterWatcher::new(
            Arc::clone(&self.page),
            self.roster.clone(),
            self.events.clone(),
            self.options.roster_poll_interval,
            self.options.halt_on_violation,
            self.cancel.child_token(),
        );
        *self.watcher.lock().await = Some(watcher.spawn());
    }

    /// Stop the roster watcher and wait for it to finish its current poll.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.watcher.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("Roster watcher task failed: {}", e);
            }
        }
    }
}
