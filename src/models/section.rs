use serde::{Deserialize, Serialize};
use std::fmt;

use super::random_offset;

pub const DEFAULT_SECTION_WIDTH: f64 = 250.0;
pub const DEFAULT_SECTION_HEIGHT: f64 = 180.0;

/// A titled rectangle that groups notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: u64,
    pub title: String,
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Section {
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            top: random_offset(300),
            left: random_offset(500),
            width: DEFAULT_SECTION_WIDTH,
            height: DEFAULT_SECTION_HEIGHT,
        }
    }

    pub fn with_bounds(mut self, top: f64, left: f64, width: f64, height: f64) -> Self {
        self.top = top;
        self.left = left;
        self.width = width;
        self.height = height;
        self
    }

    /// Applies every field set in `update`, returning whether anything changed.
    pub fn apply(&mut self, update: &SectionUpdate) -> bool {
        let before = self.clone();
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(top) = update.top {
            self.top = top;
        }
        if let Some(left) = update.left {
            self.left = left;
        }
        if let Some(width) = update.width {
            self.width = width;
        }
        if let Some(height) = update.height {
            self.height = height;
        }
        *self != before
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} \"{}\" at ({}, {}) size {}x{}",
            self.id, self.title, self.top, self.left, self.width, self.height
        )
    }
}

/// Options for creating a section.
#[derive(Debug, Clone, Default)]
pub struct NewSection {
    pub title: Option<String>,
    pub top: Option<f64>,
    pub left: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl NewSection {
    pub fn build(self, id: u64) -> Section {
        let title = self.title.unwrap_or_else(|| format!("Section {}", id));
        let mut section = Section::new(id, title);
        if let Some(top) = self.top {
            section.top = top;
        }
        if let Some(left) = self.left {
            section.left = left;
        }
        if let Some(width) = self.width {
            section.width = width;
        }
        if let Some(height) = self.height {
            section.height = height;
        }
        section
    }
}

#[derive(Debug, Clone, Default)]
pub struct SectionUpdate {
    pub title: Option<String>,
    pub top: Option<f64>,
    pub left: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl SectionUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.top.is_none()
            && self.left.is_none()
            && self.width.is_none()
            && self.height.is_none()
    }
}
