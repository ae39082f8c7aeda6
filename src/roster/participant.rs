//! Participant identity and the authoritative roster.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::page::ParticipantId;

/// One known participant.
///
/// The id is assigned at first observation and never changes; the display
/// name always holds the most recently observed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    /// Whether the participant appeared in the latest poll.
    pub present: bool,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// A detected display-name change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameChange {
    /// The participant, already carrying the new name.
    pub participant: Participant,
    pub previous_name: String,
}

/// What one reconciled poll changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterDelta {
    pub joined: Vec<Participant>,
    pub renamed: Vec<NameChange>,
    pub left: Vec<Participant>,
}

impl RosterDelta {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.renamed.is_empty() && self.left.is_empty()
    }
}

/// All participants ever seen in this session, ordered by first sight.
///
/// Append-only by identity: a departed participant is marked absent, never
/// removed, so a later re-join is distinguishable from a first join. Ids
/// are dense and double as the storage index.
#[derive(Debug, Default)]
pub struct Roster {
    pub(crate) participants: Vec<Participant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(id as usize)
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn present_count(&self) -> usize {
        self.participants.iter().filter(|p| p.present).count()
    }

    /// Point-in-time copy for external readers.
    pub fn snapshot(&self) -> Vec<Participant> {
        self.participants.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn someone(id: ParticipantId, name: &str, present: bool) -> Participant {
        let now = Utc::now();
        Participant {
            id,
            display_name: name.to_string(),
            present,
            first_seen: now,
            last_seen: now,
        }
    }

    #[test]
    fn test_empty_roster() {
        let roster = Roster::new();
        assert!(roster.is_empty());
        assert_eq!(roster.len(), 0);
        assert_eq!(roster.present_count(), 0);
        assert!(roster.get(0).is_none());
    }

    #[test]
    fn test_present_count_ignores_departed() {
        let roster = Roster {
            participants: vec![
                someone(0, "Alice", true),
                someone(1, "Bob", false),
                someone(2, "Carol", true),
            ],
        };
        assert_eq!(roster.len(), 3);
        assert_eq!(roster.present_count(), 2);
    }

    #[test]
    fn test_delta_is_empty() {
        let mut delta = RosterDelta::default();
        assert!(delta.is_empty());

        delta.left.push(someone(0, "Alice", false));
        assert!(!delta.is_empty());
    }

    #[test]
    fn test_participant_serialization() {
        let json = serde_json::to_value(someone(3, "Dan", true)).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["display_name"], "Dan");
        assert_eq!(json["present"], true);
    }
}
