use serde::{Deserialize, Serialize};
use std::fmt;

use super::random_offset;

pub const DEFAULT_NOTE_CONTENT: &str = "New note";
pub const DEFAULT_NOTE_COLOR: &str = "#ffeb3b";

fn default_color() -> String {
    DEFAULT_NOTE_COLOR.to_string()
}

/// A sticky note placed on the board, optionally grouped into a section.
///
/// `section_id` is a back-reference only: the section does not own the note
/// in storage, but deleting the section cascades to every note pointing at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: u64,
    pub content: String,
    #[serde(default = "default_color")]
    pub color: String,
    pub top: f64,
    pub left: f64,
    #[serde(default)]
    pub section_id: Option<u64>,
}

impl Note {
    pub fn new(id: u64, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            color: default_color(),
            top: random_offset(400),
            left: random_offset(400),
            section_id: None,
        }
    }

    pub fn at(mut self, top: f64, left: f64) -> Self {
        self.top = top;
        self.left = left;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn in_section(mut self, section_id: u64) -> Self {
        self.section_id = Some(section_id);
        self
    }

    /// Applies every field set in `update`, returning whether anything changed.
    pub fn apply(&mut self, update: &NoteUpdate) -> bool {
        let before = self.clone();
        if let Some(content) = &update.content {
            self.content = content.clone();
        }
        if let Some(color) = &update.color {
            self.color = color.clone();
        }
        if let Some(top) = update.top {
            self.top = top;
        }
        if let Some(left) = update.left {
            self.left = left;
        }
        if let Some(section_id) = update.section_id {
            self.section_id = section_id;
        }
        *self != before
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} \"{}\" {} at ({}, {})",
            self.id, self.content, self.color, self.top, self.left
        )?;
        if let Some(section_id) = self.section_id {
            write!(f, " in section #{}", section_id)?;
        }
        Ok(())
    }
}

/// Options for creating a note. Unset fields fall back to the note defaults.
#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub content: Option<String>,
    pub color: Option<String>,
    pub top: Option<f64>,
    pub left: Option<f64>,
    pub section_id: Option<u64>,
}

impl NewNote {
    pub fn build(self, id: u64) -> Note {
        let mut note = Note::new(
            id,
            self.content
                .unwrap_or_else(|| DEFAULT_NOTE_CONTENT.to_string()),
        );
        if let Some(color) = self.color {
            note.color = color;
        }
        if let Some(top) = self.top {
            note.top = top;
        }
        if let Some(left) = self.left {
            note.left = left;
        }
        note.section_id = self.section_id;
        note
    }
}

/// A partial note update. `section_id: Some(None)` detaches the note.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub content: Option<String>,
    pub color: Option<String>,
    pub top: Option<f64>,
    pub left: Option<f64>,
    pub section_id: Option<Option<u64>>,
}

impl NoteUpdate {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.color.is_none()
            && self.top.is_none()
            && self.left.is_none()
            && self.section_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_note_defaults() {
        let note = NewNote::default().build(7);

        assert_eq!(note.id, 7);
        assert_eq!(note.content, DEFAULT_NOTE_CONTENT);
        assert_eq!(note.color, DEFAULT_NOTE_COLOR);
        assert!((50.0..450.0).contains(&note.top));
        assert!((50.0..450.0).contains(&note.left));
        assert!(note.section_id.is_none());
    }

    #[test]
    fn test_new_note_with_options() {
        let note = NewNote {
            content: Some("Plan sprint".to_string()),
            color: Some("#90caf9".to_string()),
            top: Some(0.0),
            left: Some(12.5),
            section_id: Some(3),
        }
        .build(1);

        assert_eq!(note.content, "Plan sprint");
        assert_eq!(note.color, "#90caf9");
        assert_eq!(note.top, 0.0);
        assert_eq!(note.left, 12.5);
        assert_eq!(note.section_id, Some(3));
    }

    #[test]
    fn test_apply_update() {
        let mut note = Note::new(1, "A").at(10.0, 10.0).in_section(2);

        let changed = note.apply(&NoteUpdate {
            content: Some("B".to_string()),
            section_id: Some(None),
            ..Default::default()
        });

        assert!(changed);
        assert_eq!(note.content, "B");
        assert!(note.section_id.is_none());
        assert_eq!(note.top, 10.0);
    }

    #[test]
    fn test_apply_same_values_reports_unchanged() {
        let mut note = Note::new(1, "A").at(10.0, 20.0);
        let changed = note.apply(&NoteUpdate {
            content: Some("A".to_string()),
            top: Some(10.0),
            ..Default::default()
        });
        assert!(!changed);
    }

    #[test]
    fn test_json_uses_camel_case_and_null_section() {
        let note = Note::new(1, "A").at(1.0, 2.0);
        let json = serde_json::to_value(&note).unwrap();

        assert_eq!(json["sectionId"], serde_json::Value::Null);
        assert!(json.get("section_id").is_none());
    }

    #[test]
    fn test_missing_color_gets_default() {
        let note: Note =
            serde_json::from_str(r#"{"id":1,"content":"x","top":50,"left":50,"sectionId":null}"#)
                .unwrap();
        assert_eq!(note.color, DEFAULT_NOTE_COLOR);
    }
}
