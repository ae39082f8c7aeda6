//! Meeting status types and shared join-state handle.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Where the join flow currently stands.
///
/// `Ended` is terminal. Errors are terminal too but travel as
/// [`crate::error::JoinError`] rather than as a status of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    Unstarted,
    NotStarted,
    WaitingRoom,
    Joined,
    Ended,
}

impl MeetingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unstarted => "unstarted",
            Self::NotStarted => "not_started",
            Self::WaitingRoom => "waiting_room",
            Self::Joined => "joined",
            Self::Ended => "ended",
        }
    }

    /// Statuses from which no further transition can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended)
    }
}

/// Current join state, readable by API handlers.
#[derive(Debug, Clone)]
pub struct JoinState {
    pub status: MeetingStatus,
    pub meeting_id: Option<String>,
    pub joined_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_error: Option<String>,
}

impl Default for JoinState {
    fn default() -> Self {
        Self {
            status: MeetingStatus::Unstarted,
            meeting_id: None,
            joined_at: None,
            last_error: None,
        }
    }
}

/// Thread-safe handle for sharing join state between the machine and API
/// handlers.
#[derive(Clone, Default)]
pub struct JoinStatusHandle {
    inner: Arc<Mutex<JoinState>>,
}

impl JoinStatusHandle {
    pub async fn get(&self) -> JoinState {
        self.inner.lock().await.clone()
    }

    pub async fn begin(&self, meeting_id: &str) {
        let mut state = self.inner.lock().await;
        *state = JoinState::default();
        state.meeting_id = Some(meeting_id.to_string());
    }

    pub async fn set_status(&self, status: MeetingStatus) {
        let mut state = self.inner.lock().await;
        state.status = status;
        if status == MeetingStatus::Joined && state.joined_at.is_none() {
            state.joined_at = Some(chrono::Utc::now());
        }
    }

    pub async fn set_error(&self, error: String) {
        let mut state = self.inner.lock().await;
        state.last_error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(MeetingStatus::Unstarted.as_str(), "unstarted");
        assert_eq!(MeetingStatus::NotStarted.as_str(), "not_started");
        assert_eq!(MeetingStatus::WaitingRoom.as_str(), "waiting_room");
        assert_eq!(MeetingStatus::Joined.as_str(), "joined");
        assert_eq!(MeetingStatus::Ended.as_str(), "ended");
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&MeetingStatus::WaitingRoom).unwrap();
        assert_eq!(json, "\"waiting_room\"");

        let parsed: MeetingStatus = serde_json::from_str("\"joined\"").unwrap();
        assert_eq!(parsed, MeetingStatus::Joined);
    }

    #[test]
    fn test_only_ended_is_terminal() {
        assert!(MeetingStatus::Ended.is_terminal());
        assert!(!MeetingStatus::Unstarted.is_terminal());
        assert!(!MeetingStatus::NotStarted.is_terminal());
        assert!(!MeetingStatus::WaitingRoom.is_terminal());
        assert!(!MeetingStatus::Joined.is_terminal());
    }

    #[tokio::test]
    async fn test_handle_begin_resets_state() {
        let handle = JoinStatusHandle::default();
        handle.set_status(MeetingStatus::Joined).await;
        handle.set_error("old failure".to_string()).await;

        handle.begin("123 456 7890").await;

        let state = handle.get().await;
        assert_eq!(state.status, MeetingStatus::Unstarted);
        assert_eq!(state.meeting_id.as_deref(), Some("123 456 7890"));
        assert!(state.joined_at.is_none());
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn test_handle_records_joined_at_once() {
        let handle = JoinStatusHandle::default();
        handle.set_status(MeetingStatus::Joined).await;
        let first = handle.get().await.joined_at;
        assert!(first.is_some());

        handle.set_status(MeetingStatus::Joined).await;
        assert_eq!(handle.get().await.joined_at, first);
    }

    #[tokio::test]
    async fn test_handle_set_error() {
        let handle = JoinStatusHandle::default();
        handle.set_error("page blew up".to_string()).await;
        assert_eq!(
            handle.get().await.last_error,
            Some("page blew up".to_string())
        );
    }
}
