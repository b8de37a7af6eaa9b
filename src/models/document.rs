use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::note::{NewNote, Note, NoteUpdate};
use super::section::{NewSection, Section, SectionUpdate};

/// First id handed out by a fresh board's counters.
pub const FIRST_ID: u64 = 1;

fn first_id() -> u64 {
    FIRST_ID
}

/// The persisted unit: one whiteboard with its entities, id counters and
/// optimistic-concurrency version.
///
/// Serialized with camelCase field names, which is the wire format shared by
/// every gateway backend and the HTTP API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhiteboardDocument {
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default = "first_id")]
    pub next_note_id: u64,
    #[serde(default = "first_id")]
    pub next_section_id: u64,
    /// Incremented by exactly one on every persisted save.
    #[serde(default)]
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Set by whoever persists the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Default for WhiteboardDocument {
    fn default() -> Self {
        Self {
            notes: Vec::new(),
            sections: Vec::new(),
            next_note_id: FIRST_ID,
            next_section_id: FIRST_ID,
            version: 0,
            last_updated: None,
            timestamp: None,
        }
    }
}

impl WhiteboardDocument {
    /// An empty board stamped with the current time, served when nothing is stored.
    pub fn fresh() -> Self {
        Self {
            last_updated: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// A board pre-populated with two sample notes and two sections.
    pub fn starter() -> Self {
        let mut doc = Self {
            notes: vec![
                Note::new(1, "Double-click to edit").at(50.0, 50.0),
                Note::new(2, "Drag to move").at(150.0, 150.0),
            ],
            sections: vec![
                Section::new(1, "To do").with_bounds(300.0, 100.0, 300.0, 200.0),
                Section::new(2, "Important").with_bounds(300.0, 500.0, 300.0, 200.0),
            ],
            ..Self::default()
        };
        doc.next_note_id = doc.max_note_id() + 1;
        doc.next_section_id = doc.max_section_id() + 1;
        doc
    }

    /// Parses a stored document and repairs its id counters.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut doc: Self = serde_json::from_str(text)?;
        doc.repair_counters();
        Ok(doc)
    }

    /// Parses a stored document, substituting an empty board when the text is
    /// not a valid document.
    pub fn decode_or_default(text: &str) -> Self {
        match Self::from_json(text) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!("Stored whiteboard is not valid JSON, using empty board: {}", e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn max_note_id(&self) -> u64 {
        self.notes.iter().map(|n| n.id).max().unwrap_or(0)
    }

    pub fn max_section_id(&self) -> u64 {
        self.sections.iter().map(|s| s.id).max().unwrap_or(0)
    }

    /// Raises each counter above the largest id in use.
    pub fn repair_counters(&mut self) {
        self.next_note_id = self.next_note_id.max(self.max_note_id() + 1);
        self.next_section_id = self.next_section_id.max(self.max_section_id() + 1);
    }

    pub fn note(&self, id: u64) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn section(&self, id: u64) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn notes_in_section(&self, section_id: u64) -> impl Iterator<Item = &Note> {
        self.notes
            .iter()
            .filter(move |n| n.section_id == Some(section_id))
    }

    pub fn standalone_notes(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter().filter(|n| n.section_id.is_none())
    }

    /// Allocates the next note id and appends the note.
    pub fn add_note(&mut self, options: NewNote) -> Note {
        let id = self.next_note_id;
        self.next_note_id += 1;
        let note = options.build(id);
        self.notes.push(note.clone());
        note
    }

    /// Allocates the next section id and appends the section.
    pub fn add_section(&mut self, options: NewSection) -> Section {
        let id = self.next_section_id;
        self.next_section_id += 1;
        let section = options.build(id);
        self.sections.push(section.clone());
        section
    }

    /// Returns `None` when no note has this id, otherwise whether it changed.
    pub fn update_note(&mut self, id: u64, update: &NoteUpdate) -> Option<bool> {
        self.notes
            .iter_mut()
            .find(|n| n.id == id)
            .map(|note| note.apply(update))
    }

    /// Returns `None` when no section has this id, otherwise whether it changed.
    pub fn update_section(&mut self, id: u64, update: &SectionUpdate) -> Option<bool> {
        self.sections
            .iter_mut()
            .find(|s| s.id == id)
            .map(|section| section.apply(update))
    }

    pub fn remove_note(&mut self, id: u64) -> Option<Note> {
        let index = self.notes.iter().position(|n| n.id == id)?;
        Some(self.notes.remove(index))
    }

    /// Removes a section and every note that belongs to it.
    ///
    /// Returns the removed section and the notes removed with it.
    pub fn remove_section(&mut self, id: u64) -> Option<(Section, Vec<Note>)> {
        let index = self.sections.iter().position(|s| s.id == id)?;
        let section = self.sections.remove(index);

        let (removed, kept): (Vec<Note>, Vec<Note>) = std::mem::take(&mut self.notes)
            .into_iter()
            .partition(|n| n.section_id == Some(id));
        self.notes = kept;

        Some((section, removed))
    }

    /// Replaces entities and counters with those of `other`, keeping the version.
    pub fn load_entities(&mut self, other: WhiteboardDocument) {
        self.notes = other.notes;
        self.sections = other.sections;
        self.next_note_id = other.next_note_id;
        self.next_section_id = other.next_section_id;
        self.repair_counters();
    }

    /// Drops every entity and resets the counters. The version is kept so the
    /// next save still passes the version check.
    pub fn clear(&mut self) {
        self.notes.clear();
        self.sections.clear();
        self.next_note_id = FIRST_ID;
        self.next_section_id = FIRST_ID;
    }
}
