mod document;
mod note;
mod section;

use rand::Rng;

pub use document::{WhiteboardDocument, FIRST_ID};
pub use note::{NewNote, Note, NoteUpdate, DEFAULT_NOTE_COLOR, DEFAULT_NOTE_CONTENT};
pub use section::{NewSection, Section, SectionUpdate};

/// Board entities keyed by a per-board integer id.
pub trait Identified {
    fn id(&self) -> u64;
}

impl Identified for Note {
    fn id(&self) -> u64 {
        self.id
    }
}

impl Identified for Section {
    fn id(&self) -> u64 {
        self.id
    }
}

/// Random whole-pixel position in `[50, 50 + span)`.
pub(crate) fn random_offset(span: u32) -> f64 {
    f64::from(rand::rng().random_range(0..span) + 50)
}
