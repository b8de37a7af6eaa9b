//! Conflict resolution between a local whiteboard and the remote copy.
//!
//! The default [`Strategy::Merge`] matches notes and sections by id and keeps
//! everything either side has. When both sides hold different copies of the
//! same entity the remote copy wins; the losing local copy is kept in the
//! [`ConflictRecord`].

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::models::{Identified, Note, Section, WhiteboardDocument};

/// How to reconcile a local document with a newer remote one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Discard local changes.
    Remote,
    /// Keep local entities, adopt the remote version so the next save overwrites.
    Local,
    /// Entity-by-entity merge.
    #[default]
    Merge,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Remote => write!(f, "remote"),
            Strategy::Local => write!(f, "local"),
            Strategy::Merge => write!(f, "merge"),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remote" => Ok(Strategy::Remote),
            "local" => Ok(Strategy::Local),
            "merge" => Ok(Strategy::Merge),
            _ => Err(format!(
                "Invalid strategy '{}'. Valid options: merge, local, remote",
                s
            )),
        }
    }
}

/// One detected divergence, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConflictRecord {
    Overwrite {
        message: String,
    },
    Force {
        message: String,
    },
    NoteModified {
        id: u64,
        message: String,
        local: Note,
        remote: Note,
    },
    NoteLocalOnly {
        id: u64,
        message: String,
        local: Note,
    },
    NoteRemoteOnly {
        id: u64,
        message: String,
        remote: Note,
    },
    SectionModified {
        id: u64,
        message: String,
        local: Section,
        remote: Section,
    },
    SectionLocalOnly {
        id: u64,
        message: String,
        local: Section,
    },
    SectionRemoteOnly {
        id: u64,
        message: String,
        remote: Section,
    },
}

impl ConflictRecord {
    /// The wire `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            ConflictRecord::Overwrite { .. } => "overwrite",
            ConflictRecord::Force { .. } => "force",
            ConflictRecord::NoteModified { .. } => "note_modified",
            ConflictRecord::NoteLocalOnly { .. } => "note_local_only",
            ConflictRecord::NoteRemoteOnly { .. } => "note_remote_only",
            ConflictRecord::SectionModified { .. } => "section_modified",
            ConflictRecord::SectionLocalOnly { .. } => "section_local_only",
            ConflictRecord::SectionRemoteOnly { .. } => "section_remote_only",
        }
    }

    /// Entity id, absent for whole-document records.
    pub fn id(&self) -> Option<u64> {
        match self {
            ConflictRecord::Overwrite { .. } | ConflictRecord::Force { .. } => None,
            ConflictRecord::NoteModified { id, .. }
            | ConflictRecord::NoteLocalOnly { id, .. }
            | ConflictRecord::NoteRemoteOnly { id, .. }
            | ConflictRecord::SectionModified { id, .. }
            | ConflictRecord::SectionLocalOnly { id, .. }
            | ConflictRecord::SectionRemoteOnly { id, .. } => Some(*id),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ConflictRecord::Overwrite { message }
            | ConflictRecord::Force { message }
            | ConflictRecord::NoteModified { message, .. }
            | ConflictRecord::NoteLocalOnly { message, .. }
            | ConflictRecord::NoteRemoteOnly { message, .. }
            | ConflictRecord::SectionModified { message, .. }
            | ConflictRecord::SectionLocalOnly { message, .. }
            | ConflictRecord::SectionRemoteOnly { message, .. } => message,
        }
    }
}

impl fmt::Display for ConflictRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind(), self.message())
    }
}

/// Output of [`resolve_conflicts`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub merged: WhiteboardDocument,
    pub conflicts: Vec<ConflictRecord>,
}

impl Resolution {
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }
}

/// Entities the structural merge knows how to report on.
trait Mergeable: Identified + Clone + PartialEq {
    fn modified(local: Self, remote: Self) -> ConflictRecord;
    fn local_only(local: Self) -> ConflictRecord;
    fn remote_only(remote: Self) -> ConflictRecord;
}

impl Mergeable for Note {
    fn modified(local: Self, remote: Self) -> ConflictRecord {
        ConflictRecord::NoteModified {
            id: remote.id,
            message: format!("Note {} was changed on both sides", remote.id),
            local,
            remote,
        }
    }

    fn local_only(local: Self) -> ConflictRecord {
        ConflictRecord::NoteLocalOnly {
            id: local.id,
            message: format!(
                "Note {} exists only locally (created here or deleted remotely)",
                local.id
            ),
            local,
        }
    }

    fn remote_only(remote: Self) -> ConflictRecord {
        ConflictRecord::NoteRemoteOnly {
            id: remote.id,
            message: format!("Note {} exists only remotely", remote.id),
            remote,
        }
    }
}

impl Mergeable for Section {
    fn modified(local: Self, remote: Self) -> ConflictRecord {
        ConflictRecord::SectionModified {
            id: remote.id,
            message: format!("Section {} was changed on both sides", remote.id),
            local,
            remote,
        }
    }

    fn local_only(local: Self) -> ConflictRecord {
        ConflictRecord::SectionLocalOnly {
            id: local.id,
            message: format!("Section {} exists only locally", local.id),
            local,
        }
    }

    fn remote_only(remote: Self) -> ConflictRecord {
        ConflictRecord::SectionRemoteOnly {
            id: remote.id,
            message: format!("Section {} exists only remotely", remote.id),
            remote,
        }
    }
}

/// Merges one entity collection by id.
///
/// Output order is local order followed by remote-only entities in remote
/// order. A repeated id within one side keeps the last occurrence.
fn merge_collection<T: Mergeable>(
    local: &[T],
    remote: &[T],
    conflicts: &mut Vec<ConflictRecord>,
) -> Vec<T> {
    let mut order: Vec<u64> = Vec::new();
    let mut pairs: HashMap<u64, (Option<&T>, Option<&T>)> = HashMap::new();

    for entity in local {
        let id = entity.id();
        pairs
            .entry(id)
            .or_insert_with(|| {
                order.push(id);
                (None, None)
            })
            .0 = Some(entity);
    }
    for entity in remote {
        let id = entity.id();
        pairs
            .entry(id)
            .or_insert_with(|| {
                order.push(id);
                (None, None)
            })
            .1 = Some(entity);
    }

    let mut merged = Vec::with_capacity(order.len());
    for id in order {
        match pairs.remove(&id) {
            Some((Some(l), Some(r))) if l == r => merged.push(l.clone()),
            Some((Some(l), Some(r))) => {
                conflicts.push(T::modified(l.clone(), r.clone()));
                merged.push(r.clone());
            }
            Some((Some(l), None)) => {
                conflicts.push(T::local_only(l.clone()));
                merged.push(l.clone());
            }
            Some((None, Some(r))) => {
                conflicts.push(T::remote_only(r.clone()));
                merged.push(r.clone());
            }
            Some((None, None)) | None => {}
        }
    }
    merged
}

/// Reconciles `local` with `remote` according to `strategy`.
///
/// The merged document always carries the remote version: it is a rebase onto
/// the remote baseline and the following save increments from there.
pub fn resolve_conflicts(
    local: &WhiteboardDocument,
    remote: &WhiteboardDocument,
    strategy: Strategy,
) -> Resolution {
    match strategy {
        Strategy::Remote => Resolution {
            merged: remote.clone(),
            conflicts: vec![ConflictRecord::Overwrite {
                message: "Local changes were replaced by the remote board".to_string(),
            }],
        },
        Strategy::Local => Resolution {
            merged: WhiteboardDocument {
                version: remote.version,
                ..local.clone()
            },
            conflicts: vec![ConflictRecord::Force {
                message: "Local changes will overwrite the remote board".to_string(),
            }],
        },
        Strategy::Merge => {
            let mut conflicts = Vec::new();
            let notes = merge_collection(&local.notes, &remote.notes, &mut conflicts);
            let sections = merge_collection(&local.sections, &remote.sections, &mut conflicts);

            let merged = WhiteboardDocument {
                notes,
                sections,
                next_note_id: local.next_note_id.max(remote.next_note_id),
                next_section_id: local.next_section_id.max(remote.next_section_id),
                version: remote.version,
                last_updated: remote.last_updated,
                timestamp: remote.timestamp,
            };

            tracing::debug!(
                "Merged local v{} onto remote v{}: {} conflict(s)",
                local.version,
                remote.version,
                conflicts.len()
            );

            Resolution { merged, conflicts }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewNote, NewSection};

    fn doc(notes: Vec<Note>, sections: Vec<Section>, version: u64) -> WhiteboardDocument {
        let mut doc = WhiteboardDocument {
            notes,
            sections,
            version,
            ..Default::default()
        };
        doc.repair_counters();
        doc
    }

    fn note(id: u64, content: &str) -> Note {
        Note::new(id, content).at(10.0, 20.0)
    }

    fn section(id: u64, title: &str) -> Section {
        Section::new(id, title).with_bounds(0.0, 0.0, 200.0, 100.0)
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("merge".parse::<Strategy>(), Ok(Strategy::Merge));
        assert_eq!("LOCAL".parse::<Strategy>(), Ok(Strategy::Local));
        assert_eq!("remote".parse::<Strategy>(), Ok(Strategy::Remote));
        assert!("theirs".parse::<Strategy>().is_err());
        assert_eq!(Strategy::default(), Strategy::Merge);
    }

    #[test]
    fn test_merge_identical_is_clean() {
        let mut d = doc(
            vec![note(1, "A"), note(2, "B").in_section(1)],
            vec![section(1, "Todo")],
            6,
        );
        d.add_note(NewNote::default());
        d.add_section(NewSection::default());

        let resolution = resolve_conflicts(&d, &d, Strategy::Merge);

        assert_eq!(resolution.conflict_count(), 0);
        assert_eq!(resolution.merged, d);
    }

    #[test]
    fn test_merge_empty_documents() {
        let d = WhiteboardDocument::default();
        let resolution = resolve_conflicts(&d, &d, Strategy::Merge);
        assert_eq!(resolution.conflict_count(), 0);
        assert_eq!(resolution.merged, d);
    }

    #[test]
    fn test_merge_disjoint_keeps_union() {
        let local = doc(vec![note(1, "mine"), note(3, "also mine")], vec![], 2);
        let remote = doc(vec![note(2, "theirs")], vec![section(4, "S")], 3);

        let resolution = resolve_conflicts(&local, &remote, Strategy::Merge);

        let ids: Vec<u64> = resolution.merged.notes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
        assert_eq!(resolution.merged.sections.len(), 1);

        let kinds: Vec<&str> = resolution.conflicts.iter().map(|c| c.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                "note_local_only",
                "note_local_only",
                "note_remote_only",
                "section_remote_only"
            ]
        );
    }

    #[test]
    fn test_merge_modified_remote_wins() {
        let local = doc(vec![note(1, "A")], vec![], 3);
        let remote = doc(vec![note(1, "B")], vec![], 4);

        let resolution = resolve_conflicts(&local, &remote, Strategy::Merge);

        assert_eq!(resolution.merged.notes, vec![note(1, "B")]);
        assert_eq!(resolution.merged.version, 4);
        assert_eq!(resolution.conflict_count(), 1);
        match &resolution.conflicts[0] {
            ConflictRecord::NoteModified {
                id, local, remote, ..
            } => {
                assert_eq!(*id, 1);
                assert_eq!(local.content, "A");
                assert_eq!(remote.content, "B");
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_merge_modified_section_remote_wins() {
        let local = doc(vec![], vec![section(1, "Old")], 1);
        let remote = doc(vec![], vec![section(1, "New")], 2);

        let resolution = resolve_conflicts(&local, &remote, Strategy::Merge);

        assert_eq!(resolution.merged.sections[0].title, "New");
        assert_eq!(resolution.conflicts[0].kind(), "section_modified");
        assert_eq!(resolution.conflicts[0].id(), Some(1));
    }

    #[test]
    fn test_merge_counters_take_max() {
        let mut local = doc(vec![note(1, "A")], vec![], 1);
        local.next_note_id = 10;
        local.next_section_id = 2;
        let mut remote = doc(vec![note(1, "A")], vec![], 2);
        remote.next_note_id = 4;
        remote.next_section_id = 7;

        let merged = resolve_conflicts(&local, &remote, Strategy::Merge).merged;

        assert_eq!(merged.next_note_id, 10);
        assert_eq!(merged.next_section_id, 7);
    }

    #[test]
    fn test_merge_tolerates_dangling_section_reference() {
        let local = doc(vec![note(1, "orphan").in_section(9)], vec![], 0);
        let remote = doc(vec![], vec![], 1);

        let resolution = resolve_conflicts(&local, &remote, Strategy::Merge);

        assert_eq!(resolution.merged.notes[0].section_id, Some(9));
        assert_eq!(resolution.conflicts[0].kind(), "note_local_only");
    }

    #[test]
    fn test_remote_strategy() {
        let local = doc(vec![note(1, "A")], vec![], 1);
        let remote = doc(vec![note(2, "B")], vec![], 5);

        let resolution = resolve_conflicts(&local, &remote, Strategy::Remote);

        assert_eq!(resolution.merged, remote);
        assert_eq!(resolution.conflict_count(), 1);
        assert_eq!(resolution.conflicts[0].kind(), "overwrite");
        assert_eq!(resolution.conflicts[0].id(), None);
    }

    #[test]
    fn test_local_strategy_adopts_remote_version() {
        let local = doc(vec![note(1, "A")], vec![], 1);
        let remote = doc(vec![note(2, "B")], vec![], 5);

        let resolution = resolve_conflicts(&local, &remote, Strategy::Local);

        assert_eq!(resolution.merged.notes, local.notes);
        assert_eq!(resolution.merged.version, 5);
        assert_eq!(resolution.conflicts[0].kind(), "force");
    }

    #[test]
    fn test_record_serializes_with_type_tag() {
        let local = doc(vec![note(1, "A")], vec![], 0);
        let remote = doc(vec![], vec![], 1);
        let resolution = resolve_conflicts(&local, &remote, Strategy::Merge);

        let json = serde_json::to_value(&resolution.conflicts[0]).unwrap();
        assert_eq!(json["type"], "note_local_only");
        assert_eq!(json["id"], 1);
        assert_eq!(json["local"]["content"], "A");
    }
}
