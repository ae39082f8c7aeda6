//! Join-status and roster endpoints.

use axum::{extract::State, response::Json, routing::get, Router};
use serde_json::{json, Value};

use crate::meeting::JoinStatusHandle;
use crate::roster::RosterHandle;

/// Shared state for meeting routes.
#[derive(Clone)]
pub struct MeetingApiState {
    pub status: JoinStatusHandle,
    pub roster: RosterHandle,
}

pub fn router(state: MeetingApiState) -> Router {
    Router::new()
        .route("/status", get(join_status))
        .route("/roster", get(roster))
        .with_state(state)
}

async fn join_status(State(state): State<MeetingApiState>) -> Json<Value> {
    let state = state.status.get().await;
    Json(json!({
        "status": state.status.as_str(),
        "meeting_id": state.meeting_id,
        "joined_at": state.joined_at,
        "last_error": state.last_error,
    }))
}

async fn roster(State(state): State<MeetingApiState>) -> Json<Value> {
    let participants = state.roster.snapshot().await;
    let present = participants.iter().filter(|p| p.present).count();
    Json(json!({
        "total_seen": participants.len(),
        "present": present,
        "participants": participants,
    }))
}
