//! Client-side document store.
//!
//! Owns the in-memory whiteboard, applies edits through the entity rules on
//! [`WhiteboardDocument`], and publishes a [`StoreEvent`] for every change so
//! observers (the auto-saver, a UI) can react without polling.

use chrono::Utc;
use tokio::sync::broadcast;

use crate::models::{
    Identified, NewNote, NewSection, Note, NoteUpdate, Section, SectionUpdate, WhiteboardDocument,
};

const EVENT_BUFFER: usize = 64;

/// A change to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    NoteCreated(u64),
    NoteUpdated(u64),
    NoteDeleted(u64),
    SectionCreated(u64),
    /// A section was resized, moved or renamed.
    SectionUpdated(u64),
    /// A section and the notes it owned were deleted.
    SectionDeleted { id: u64, notes: Vec<u64> },
    Cleared,
    Reset,
    /// Whole document replaced from storage.
    Loaded { version: u64 },
    /// A save landed and the store adopted the persisted version.
    Saved { version: u64 },
}

impl StoreEvent {
    /// Whether the event is a local edit that still needs saving.
    pub fn is_edit(&self) -> bool {
        !matches!(self, StoreEvent::Loaded { .. } | StoreEvent::Saved { .. })
    }
}

/// The local half of every merge.
///
/// Tracks a revision counter bumped by each edit and the revision covered by
/// the last successful save, so callers can tell whether anything is unsaved.
#[derive(Debug)]
pub struct DocumentStore {
    doc: WhiteboardDocument,
    revision: u64,
    saved_revision: u64,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::from_document(WhiteboardDocument::default())
    }

    pub fn from_document(doc: WhiteboardDocument) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            doc,
            revision: 0,
            saved_revision: 0,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub fn document(&self) -> &WhiteboardDocument {
        &self.doc
    }

    pub fn into_document(self) -> WhiteboardDocument {
        self.doc
    }

    pub fn version(&self) -> u64 {
        self.doc.version
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    pub fn notes(&self) -> &[Note] {
        &self.doc.notes
    }

    pub fn sections(&self) -> &[Section] {
        &self.doc.sections
    }

    pub fn notes_in_section(&self, section_id: u64) -> Vec<&Note> {
        self.doc.notes_in_section(section_id).collect()
    }

    pub fn standalone_notes(&self) -> Vec<&Note> {
        self.doc.standalone_notes().collect()
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn edited(&mut self, event: StoreEvent) {
        self.revision += 1;
        self.emit(event);
    }

    pub fn create_note(&mut self, options: NewNote) -> Note {
        let note = self.doc.add_note(options);
        self.edited(StoreEvent::NoteCreated(note.id));
        note
    }

    pub fn create_section(&mut self, options: NewSection) -> Section {
        let section = self.doc.add_section(options);
        self.edited(StoreEvent::SectionCreated(section.id));
        section
    }

    /// Returns false when the note does not exist.
    pub fn update_note(&mut self, id: u64, update: &NoteUpdate) -> bool {
        match self.doc.update_note(id, update) {
            Some(true) => {
                self.edited(StoreEvent::NoteUpdated(id));
                true
            }
            Some(false) => true,
            None => false,
        }
    }

    /// Returns false when the section does not exist.
    pub fn update_section(&mut self, id: u64, update: &SectionUpdate) -> bool {
        match self.doc.update_section(id, update) {
            Some(true) => {
                self.edited(StoreEvent::SectionUpdated(id));
                true
            }
            Some(false) => true,
            None => false,
        }
    }

    pub fn delete_note(&mut self, id: u64) -> bool {
        if self.doc.remove_note(id).is_some() {
            self.edited(StoreEvent::NoteDeleted(id));
            true
        } else {
            false
        }
    }

    /// Deletes a section together with every note inside it.
    pub fn delete_section(&mut self, id: u64) -> bool {
        match self.doc.remove_section(id) {
            Some((_, removed)) => {
                let notes = removed.iter().map(|n| n.id).collect();
                self.edited(StoreEvent::SectionDeleted { id, notes });
                true
            }
            None => false,
        }
    }

    /// Replaces the whole document, e.g. after loading it from storage.
    /// The store is clean afterwards.
    pub fn load_data(&mut self, doc: WhiteboardDocument) {
        let version = doc.version;
        self.doc = doc;
        self.doc.repair_counters();
        self.revision += 1;
        self.saved_revision = self.revision;
        self.emit(StoreEvent::Loaded { version });
    }

    /// Flags the current document as unsaved without changing it.
    pub fn mark_dirty(&mut self) {
        self.revision += 1;
    }

    /// Replaces the entities with the starter board, keeping the version.
    pub fn initialize_default_data(&mut self) {
        self.doc.load_entities(WhiteboardDocument::starter());
        self.edited(StoreEvent::Reset);
    }

    pub fn clear_all(&mut self) {
        self.doc.clear();
        self.edited(StoreEvent::Cleared);
    }

    /// Copy of the document to hand to a save, stamped with the current time.
    pub fn snapshot(&self) -> WhiteboardDocument {
        WhiteboardDocument {
            last_updated: Some(Utc::now()),
            ..self.doc.clone()
        }
    }

    /// Adopts the result of a save that started from `snapshot` at
    /// `snapshot_revision`.
    ///
    /// With no edits since the snapshot the persisted document replaces the
    /// local one. Otherwise the edits made in the meantime are replayed on top
    /// of the persisted document and the store stays dirty.
    pub fn apply_saved(
        &mut self,
        snapshot_revision: u64,
        snapshot: &WhiteboardDocument,
        persisted: &WhiteboardDocument,
    ) {
        if self.revision == snapshot_revision {
            self.doc = persisted.clone();
            self.saved_revision = self.revision;
        } else {
            let mut rebased = persisted.clone();
            replay_edits(&snapshot.notes, &self.doc.notes, &mut rebased.notes);
            replay_edits(&snapshot.sections, &self.doc.sections, &mut rebased.sections);
            rebased.next_note_id = rebased.next_note_id.max(self.doc.next_note_id);
            rebased.next_section_id = rebased.next_section_id.max(self.doc.next_section_id);
            rebased.repair_counters();
            rebased.last_updated = self.doc.last_updated;

            tracing::debug!(
                "Replayed {} edit(s) made during save onto v{}",
                self.revision - snapshot_revision,
                persisted.version
            );
            self.doc = rebased;
            self.saved_revision = snapshot_revision;
        }
        self.emit(StoreEvent::Saved {
            version: persisted.version,
        });
    }
}

/// Applies the difference between `base` and `current` to `target`:
/// entities added or changed since `base` are upserted, entities removed since
/// `base` are dropped.
fn replay_edits<T: Identified + Clone + PartialEq>(base: &[T], current: &[T], target: &mut Vec<T>) {
    for entity in current {
        let unchanged = base
            .iter()
            .find(|b| b.id() == entity.id())
            .is_some_and(|b| b == entity);
        if unchanged {
            continue;
        }
        match target.iter_mut().find(|t| t.id() == entity.id()) {
            Some(slot) => *slot = entity.clone(),
            None => target.push(entity.clone()),
        }
    }

    for removed in base
        .iter()
        .filter(|b| !current.iter().any(|c| c.id() == b.id()))
    {
        target.retain(|t| t.id() != removed.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_opts(content: &str) -> NewNote {
        NewNote {
            content: Some(content.to_string()),
            top: Some(10.0),
            left: Some(10.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_edits_bump_revision_and_dirty() {
        let mut store = DocumentStore::new();
        assert!(!store.is_dirty());

        store.create_note(note_opts("A"));
        assert_eq!(store.revision(), 1);
        assert!(store.is_dirty());
    }

    #[test]
    fn test_update_without_change_is_not_an_edit() {
        let mut store = DocumentStore::new();
        let note = store.create_note(note_opts("A"));
        let revision = store.revision();

        assert!(store.update_note(
            note.id,
            &NoteUpdate {
                content: Some("A".into()),
                ..Default::default()
            }
        ));
        assert_eq!(store.revision(), revision);
        assert!(!store.update_note(99, &NoteUpdate::default()));
    }

    #[test]
    fn test_delete_section_cascades() {
        let mut doc = WhiteboardDocument::default();
        doc.sections.push(Section::new(2, "Done"));
        doc.notes.push(Note::new(5, "a").in_section(2));
        doc.notes.push(Note::new(6, "b").in_section(2));
        doc.repair_counters();
        let mut store = DocumentStore::from_document(doc);
        let mut events = store.subscribe();

        assert!(store.delete_section(2));

        assert!(store.notes().iter().all(|n| n.id != 5 && n.id != 6));
        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::SectionDeleted {
                id: 2,
                notes: vec![5, 6]
            }
        );
    }

    #[test]
    fn test_subscribers_see_edits() {
        let mut store = DocumentStore::new();
        let mut events = store.subscribe();

        let note = store.create_note(note_opts("A"));
        store.delete_note(note.id);

        assert_eq!(events.try_recv().unwrap(), StoreEvent::NoteCreated(note.id));
        assert_eq!(events.try_recv().unwrap(), StoreEvent::NoteDeleted(note.id));
    }

    #[test]
    fn test_load_data_is_clean() {
        let mut store = DocumentStore::new();
        store.create_note(note_opts("A"));

        let doc = WhiteboardDocument {
            version: 7,
            ..Default::default()
        };
        store.load_data(doc);

        assert!(!store.is_dirty());
        assert_eq!(store.version(), 7);
        assert!(store.notes().is_empty());

        store.mark_dirty();
        assert!(store.is_dirty());
    }

    #[test]
    fn test_initialize_and_clear() {
        let mut store = DocumentStore::new();
        store.initialize_default_data();
        assert_eq!(store.notes().len(), 2);
        assert_eq!(store.standalone_notes().len(), 2);
        assert!(store.notes_in_section(1).is_empty());

        store.clear_all();
        assert!(store.notes().is_empty());
        assert!(store.sections().is_empty());
        assert_eq!(store.document().next_note_id, 1);
    }

    #[test]
    fn test_apply_saved_without_concurrent_edits() {
        let mut store = DocumentStore::new();
        store.create_note(note_opts("A"));

        let revision = store.revision();
        let snapshot = store.snapshot();
        let mut persisted = snapshot.clone();
        persisted.version = 1;
        persisted.notes.push(Note::new(9, "remote"));

        store.apply_saved(revision, &snapshot, &persisted);

        assert!(!store.is_dirty());
        assert_eq!(store.document(), &persisted);
    }

    #[test]
    fn test_apply_saved_replays_edits_made_in_flight() {
        let mut store = DocumentStore::new();
        let a = store.create_note(note_opts("A"));
        let b = store.create_note(note_opts("B"));

        let revision = store.revision();
        let snapshot = store.snapshot();

        // Edits while the save is in flight
        store.update_note(
            a.id,
            &NoteUpdate {
                content: Some("A2".into()),
                ..Default::default()
            },
        );
        store.delete_note(b.id);
        let c = store.create_note(note_opts("C"));

        // Persisted result includes a note that arrived from the remote
        let mut persisted = snapshot.clone();
        persisted.version = 4;
        persisted.notes.push(Note::new(20, "remote"));
        persisted.next_note_id = 21;

        store.apply_saved(revision, &snapshot, &persisted);

        assert!(store.is_dirty());
        assert_eq!(store.version(), 4);
        let contents: Vec<&str> = store.notes().iter().map(|n| n.content.as_str()).collect();
        assert_eq!(contents, vec!["A2", "remote", "C"]);
        assert_eq!(store.document().next_note_id, 21);
        assert!(store.notes().iter().any(|n| n.id == c.id));
    }
}
