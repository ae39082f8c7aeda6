//! Merging one poll's observed entries into the roster.

use std::collections::HashSet;

use chrono::Utc;

use crate::error::RosterError;
use crate::page::{ObservedEntry, ParticipantId};

use super::participant::{NameChange, Participant, Roster, RosterDelta};

/// Instruction to write a freshly assigned marker back onto an entry.
///
/// The roster has no access to the page; the caller performs the write-back
/// so the next poll recognizes the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagAssignment {
    /// Index into the entries slice this reconciliation was given.
    pub entry_index: usize,
    pub marker: ParticipantId,
}

/// Outcome of one reconciled poll: the delta plus pending tag write-backs.
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub delta: RosterDelta,
    pub assignments: Vec<TagAssignment>,
}

impl Roster {
    /// Merge one poll's entries into the roster.
    ///
    /// Single pass over the entries, then one over the roster for
    /// departures. Validation runs before any mutation: a duplicate or
    /// unknown marker rejects the whole poll and leaves the roster exactly
    /// as it was.
    ///
    /// Not safe to run concurrently with itself on one roster; callers
    /// serialize polls (the watcher holds the roster lock for the whole
    /// call).
    pub fn reconcile(
        &mut self,
        entries: &[ObservedEntry],
    ) -> Result<Reconciliation, RosterError> {
        let mut observed = HashSet::with_capacity(entries.len());
        for entry in entries {
            if let Some(marker) = entry.marker {
                if !observed.insert(marker) {
                    return Err(RosterError::DuplicateMarker(marker));
                }
                if marker as usize >= self.participants.len() {
                    return Err(RosterError::UnknownMarker(marker));
                }
            }
        }

        let mut reconciliation = Reconciliation::default();
        let now = Utc::now();

        for (entry_index, entry) in entries.iter().enumerate() {
            match entry.marker {
                None => {
                    let id = self.participants.len() as ParticipantId;
                    let participant = Participant {
                        id,
                        display_name: entry.name.clone(),
                        present: true,
                        first_seen: now,
                        last_seen: now,
                    };
                    self.participants.push(participant.clone());
                    observed.insert(id);
                    reconciliation.delta.joined.push(participant);
                    reconciliation.assignments.push(TagAssignment {
                        entry_index,
                        marker: id,
                    });
                }
                Some(marker) => {
                    let participant = &mut self.participants[marker as usize];
                    if participant.display_name != entry.name {
                        let previous_name = std::mem::replace(
                            &mut participant.display_name,
                            entry.name.clone(),
                        );
                        reconciliation.delta.renamed.push(NameChange {
                            participant: participant.clone(),
                            previous_name,
                        });
                    }
                    participant.present = true;
                    participant.last_seen = now;
                }
            }
        }

        for participant in &mut self.participants {
            if participant.present && !observed.contains(&participant.id) {
                participant.present = false;
                reconciliation.delta.left.push(participant.clone());
            }
        }

        Ok(reconciliation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Apply the write-backs a collaborator would perform, so the next
    /// poll's entries carry their markers.
    fn apply_tags(entries: &mut [ObservedEntry], reconciliation: &Reconciliation) {
        for assignment in &reconciliation.assignments {
            entries[assignment.entry_index].marker = Some(assignment.marker);
        }
    }

    #[test]
    fn test_first_poll_assigns_sequential_ids() {
        let mut roster = Roster::new();
        let entries = vec![
            ObservedEntry::untagged("Alice", "n0"),
            ObservedEntry::untagged("Bob", "n1"),
            ObservedEntry::untagged("Carol", "n2"),
        ];

        let rec = roster.reconcile(&entries).unwrap();

        let ids: Vec<_> = rec.delta.joined.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(
            rec.assignments,
            vec![
                TagAssignment { entry_index: 0, marker: 0 },
                TagAssignment { entry_index: 1, marker: 1 },
                TagAssignment { entry_index: 2, marker: 2 },
            ]
        );
        assert!(rec.delta.renamed.is_empty());
        assert!(rec.delta.left.is_empty());
        assert_eq!(roster.len(), 3);
        assert_eq!(roster.present_count(), 3);
    }

    #[test]
    fn test_reconcile_is_idempotent_once_tagged() {
        let mut roster = Roster::new();
        let mut entries = vec![
            ObservedEntry::untagged("Alice", "n0"),
            ObservedEntry::untagged("Bob", "n1"),
        ];

        let rec = roster.reconcile(&entries).unwrap();
        apply_tags(&mut entries, &rec);

        let rec = roster.reconcile(&entries).unwrap();
        assert!(rec.delta.is_empty());
        assert!(rec.assignments.is_empty());
        assert_eq!(roster.present_count(), 2);
    }

    #[test]
    fn test_marker_round_trip_keeps_identity() {
        let mut roster = Roster::new();
        let mut entries = vec![ObservedEntry::untagged("Alice", "n0")];
        let rec = roster.reconcile(&entries).unwrap();
        apply_tags(&mut entries, &rec);

        // unordered next poll, same node
        let rec = roster.reconcile(&entries).unwrap();
        assert!(rec.delta.is_empty());

        let alice = roster.get(0).unwrap();
        assert_eq!(alice.id, 0);
        assert_eq!(alice.display_name, "Alice");
        assert!(alice.present);
    }

    #[test]
    fn test_rename_detected_with_old_name() {
        let mut roster = Roster::new();
        let rec = roster
            .reconcile(&[ObservedEntry::untagged("Alice", "n0")])
            .unwrap();
        assert_eq!(rec.delta.joined.len(), 1);

        let rec = roster
            .reconcile(&[ObservedEntry::tagged(0, "Alice B.", "n0")])
            .unwrap();
        assert_eq!(rec.delta.renamed.len(), 1);
        assert_eq!(rec.delta.renamed[0].previous_name, "Alice");
        assert_eq!(rec.delta.renamed[0].participant.display_name, "Alice B.");
        assert!(rec.delta.joined.is_empty());
        assert_eq!(roster.get(0).unwrap().display_name, "Alice B.");
    }

    #[test]
    fn test_departure_marks_absent_exactly_once() {
        let mut roster = Roster::new();
        roster
            .reconcile(&[ObservedEntry::untagged("Alice", "n0")])
            .unwrap();

        let rec = roster.reconcile(&[]).unwrap();
        assert_eq!(rec.delta.left.len(), 1);
        assert_eq!(rec.delta.left[0].id, 0);
        assert!(!roster.get(0).unwrap().present);

        // still gone: no second departure event
        let rec = roster.reconcile(&[]).unwrap();
        assert!(rec.delta.is_empty());
    }

    #[test]
    fn test_three_poll_alice_scenario() {
        let mut roster = Roster::new();

        // poll 1: new entry
        let rec = roster
            .reconcile(&[ObservedEntry::untagged("Alice", "n0")])
            .unwrap();
        assert_eq!(rec.delta.joined.len(), 1);
        assert_eq!(rec.delta.joined[0].id, 0);
        assert_eq!(rec.delta.joined[0].display_name, "Alice");
        assert!(roster.get(0).unwrap().present);

        // poll 2: same node, new name
        let rec = roster
            .reconcile(&[ObservedEntry::tagged(0, "Alice B.", "n0")])
            .unwrap();
        assert_eq!(rec.delta.renamed.len(), 1);
        assert_eq!(rec.delta.renamed[0].previous_name, "Alice");
        assert_eq!(roster.get(0).unwrap().display_name, "Alice B.");

        // poll 3: gone
        let rec = roster.reconcile(&[]).unwrap();
        assert_eq!(rec.delta.left.len(), 1);
        assert_eq!(rec.delta.left[0].id, 0);
        assert!(!roster.get(0).unwrap().present);
    }

    #[test]
    fn test_rejoin_with_fresh_node_is_new_join() {
        let mut roster = Roster::new();
        roster
            .reconcile(&[ObservedEntry::untagged("Alice", "n0")])
            .unwrap();
        roster.reconcile(&[]).unwrap();

        // the page destroyed and recreated the node, so it comes back
        // unmarked and gets a fresh identity
        let rec = roster
            .reconcile(&[ObservedEntry::untagged("Alice", "n7")])
            .unwrap();
        assert_eq!(rec.delta.joined.len(), 1);
        assert_eq!(rec.delta.joined[0].id, 1);
        assert_eq!(roster.len(), 2);
        assert!(!roster.get(0).unwrap().present);
        assert!(roster.get(1).unwrap().present);
    }

    #[test]
    fn test_persisting_marker_is_same_participant() {
        let mut roster = Roster::new();
        let mut entries = vec![ObservedEntry::untagged("Alice", "n0")];
        let rec = roster.reconcile(&entries).unwrap();
        apply_tags(&mut entries, &rec);
        roster.reconcile(&[]).unwrap();

        // same marker survives: continuously-known participant coming back
        let rec = roster.reconcile(&entries).unwrap();
        assert!(rec.delta.joined.is_empty());
        assert_eq!(roster.len(), 1);
        assert!(roster.get(0).unwrap().present);
    }

    #[test]
    fn test_ids_monotonic_and_never_reused() {
        let mut roster = Roster::new();
        let rec = roster
            .reconcile(&[
                ObservedEntry::untagged("Alice", "n0"),
                ObservedEntry::untagged("Bob", "n1"),
            ])
            .unwrap();
        assert_eq!(
            rec.delta.joined.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![0, 1]
        );

        // everyone leaves, two new arrivals: ids keep climbing
        roster.reconcile(&[]).unwrap();
        let rec = roster
            .reconcile(&[
                ObservedEntry::untagged("Carol", "n2"),
                ObservedEntry::untagged("Dan", "n3"),
            ])
            .unwrap();
        assert_eq!(
            rec.delta.joined.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![2, 3]
        );

        let mut seen = std::collections::HashSet::new();
        for participant in roster.participants() {
            assert!(seen.insert(participant.id), "id {} reused", participant.id);
        }
    }

    #[test]
    fn test_duplicate_marker_rejects_poll_untouched() {
        let mut roster = Roster::new();
        let mut entries = vec![
            ObservedEntry::untagged("Alice", "n0"),
            ObservedEntry::untagged("Bob", "n1"),
        ];
        let rec = roster.reconcile(&entries).unwrap();
        apply_tags(&mut entries, &rec);

        let bad = vec![
            ObservedEntry::tagged(0, "Alice", "n0"),
            ObservedEntry::tagged(0, "Impostor", "n9"),
            ObservedEntry::untagged("Carol", "n2"),
        ];
        let err = roster.reconcile(&bad).unwrap_err();
        assert_eq!(err, RosterError::DuplicateMarker(0));

        // nothing applied from the rejected poll
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get(0).unwrap().display_name, "Alice");
        assert!(roster.get(0).unwrap().present);
    }

    #[test]
    fn test_unknown_marker_rejects_poll_untouched() {
        let mut roster = Roster::new();
        roster
            .reconcile(&[ObservedEntry::untagged("Alice", "n0")])
            .unwrap();

        let bad = vec![ObservedEntry::tagged(17, "Ghost", "n9")];
        let err = roster.reconcile(&bad).unwrap_err();
        assert_eq!(err, RosterError::UnknownMarker(17));
        assert_eq!(roster.len(), 1);
        assert!(roster.get(0).unwrap().present);
    }

    #[test]
    fn test_mixed_poll_joins_renames_and_departures() {
        let mut roster = Roster::new();
        let mut entries = vec![
            ObservedEntry::untagged("Alice", "n0"),
            ObservedEntry::untagged("Bob", "n1"),
        ];
        let rec = roster.reconcile(&entries).unwrap();
        apply_tags(&mut entries, &rec);

        // Bob leaves, Alice renames, Carol joins
        let poll = vec![
            ObservedEntry::tagged(0, "Alice (host)", "n0"),
            ObservedEntry::untagged("Carol", "n2"),
        ];
        let rec = roster.reconcile(&poll).unwrap();

        assert_eq!(rec.delta.joined.len(), 1);
        assert_eq!(rec.delta.joined[0].display_name, "Carol");
        assert_eq!(rec.delta.joined[0].id, 2);
        assert_eq!(rec.delta.renamed.len(), 1);
        assert_eq!(rec.delta.renamed[0].previous_name, "Alice");
        assert_eq!(rec.delta.left.len(), 1);
        assert_eq!(rec.delta.left[0].display_name, "Bob");
        assert_eq!(roster.present_count(), 2);
    }
}
