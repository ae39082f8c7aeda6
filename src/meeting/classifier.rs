//! Pure classification of a signal snapshot into a meeting status.

use crate::error::JoinError;
use crate::page::SignalSnapshot;

use super::status::MeetingStatus;

/// Classify one snapshot given the previously-known status.
///
/// Total over all snapshots: every call yields either the next status or
/// the terminal page error. Signals can co-occur transiently while the DOM
/// is mid-transition, so the checks run in a fixed order and the first
/// match wins:
///
/// 1. an error banner fails the whole join, regardless of anything else;
/// 2. the ended modal and the audio control only count once the waiting
///    room has actually been entered — before that they can be stale
///    fragments of a cached page;
/// 3. the not-started prompt, then the waiting-room text;
/// 4. no match: an ambiguous frame, keep the previous status and re-poll.
pub fn classify(
    snapshot: &SignalSnapshot,
    previous: MeetingStatus,
) -> Result<MeetingStatus, JoinError> {
    if let Some(message) = &snapshot.error_message {
        return Err(JoinError::Page(message.clone()));
    }

    if previous == MeetingStatus::WaitingRoom {
        if snapshot.ended_modal {
            return Ok(MeetingStatus::Ended);
        }
        if snapshot.joined_audio_control {
            return Ok(MeetingStatus::Joined);
        }
    }

    if snapshot.not_started_prompt {
        return Ok(MeetingStatus::NotStarted);
    }

    if snapshot.waiting_room_text {
        return Ok(MeetingStatus::WaitingRoom);
    }

    Ok(previous)
}
