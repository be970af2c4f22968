//! Board domain model.
//!
//! # Responsibility
//! - Define the board document shape persisted as one whole JSON record.
//! - Provide constructors that generate stable identifiers.
//! - Validate tree-wide identifier invariants for externally sourced boards.
//!
//! # Invariants
//! - Section ids are unique across the whole tree of one board.
//! - Subsections are only appended to their own parent, so the tree stays
//!   finite and acyclic without explicit checks.
//! - Ordered sequences keep insertion order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Board identifier as stored in the document key.
pub type BoardId = String;
/// Section identifier, unique within one board.
pub type SectionId = String;
/// Todo identifier, unique within one section.
pub type TodoId = String;
/// File attachment identifier, unique within one section.
pub type FileId = String;

/// Generates a fresh collision-resistant identifier.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Validation failures for board-level model data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Title is blank after trim.
    EmptyTitle,
    /// A section carries an empty identifier.
    EmptyIdentifier,
    /// Two sections in one board share the same identifier.
    DuplicateSectionId(SectionId),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be blank"),
            Self::EmptyIdentifier => write!(f, "section id must not be empty"),
            Self::DuplicateSectionId(id) => write!(f, "duplicate section id: {id}"),
        }
    }
}

impl Error for ModelError {}

/// Cosmetic board theme. Has no effect on core behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Pastel,
    Dark,
    Elegant,
    Playful,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Pastel, Theme::Dark, Theme::Elegant, Theme::Playful];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Pastel => "pastel",
            Theme::Dark => "dark",
            Theme::Elegant => "elegant",
            Theme::Playful => "playful",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pastel" => Some(Theme::Pastel),
            "dark" => Some(Theme::Dark),
            "elegant" => Some(Theme::Elegant),
            "playful" => Some(Theme::Playful),
            _ => None,
        }
    }
}

/// File stored inline in a section as a data URI.
///
/// Immutable once created; removed by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAttachment {
    pub id: FileId,
    pub name: String,
    /// MIME type, serialized as `type`.
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Size of the original bytes.
    pub size: u64,
    /// `data:<mime>;base64,<payload>`, serialized as `data`.
    #[serde(rename = "data")]
    pub data_uri: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Checklist entry inside one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: TodoId,
    pub text: String,
    pub completed: bool,
}

impl TodoItem {
    /// Creates an open todo with a generated id.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            text: text.into(),
            completed: false,
        }
    }
}

/// One node of the board tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: SectionId,
    pub title: String,
    /// Free text, saved explicitly by the caller.
    pub notes: String,
    pub todos: Vec<TodoItem>,
    pub files: Vec<FileAttachment>,
    pub subsections: Vec<Section>,
    /// UI-only expansion flag.
    pub is_expanded: bool,
}

impl Section {
    /// Creates an empty section with a generated id.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(new_id(), title)
    }

    /// Creates an empty section with a caller-provided id.
    pub fn with_id(id: impl Into<SectionId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            notes: String::new(),
            todos: Vec::new(),
            files: Vec::new(),
            subsections: Vec::new(),
            is_expanded: true,
        }
    }
}

/// Top-level organizational document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: BoardId,
    pub title: String,
    pub theme: Theme,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sections: Vec<Section>,
}

impl Board {
    /// Creates an empty board with a generated id.
    ///
    /// # Errors
    /// - `ModelError::EmptyTitle` when `title` is blank after trim.
    pub fn new(title: &str, theme: Theme) -> Result<Self, ModelError> {
        let title = normalize_title(title)?;
        let now = Utc::now();
        Ok(Self {
            id: new_id(),
            title,
            theme,
            created_at: now,
            updated_at: now,
            sections: Vec::new(),
        })
    }

    /// Refreshes `updated_at`. Called on every persisted mutation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Depth-first lookup of one section anywhere in the tree.
    pub fn find_section(&self, id: &str) -> Option<&Section> {
        super::section_tree::find_section(&self.sections, id)
    }

    /// Counts every section in the tree, nested ones included.
    pub fn section_count(&self) -> usize {
        fn count(sections: &[Section]) -> usize {
            sections
                .iter()
                .map(|section| 1 + count(&section.subsections))
                .sum()
        }
        count(&self.sections)
    }

    /// Checks that every section id is non-empty and unique across the tree.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen = HashSet::new();
        let mut stack: Vec<&Section> = self.sections.iter().collect();
        while let Some(section) = stack.pop() {
            if section.id.trim().is_empty() {
                return Err(ModelError::EmptyIdentifier);
            }
            if !seen.insert(section.id.as_str()) {
                return Err(ModelError::DuplicateSectionId(section.id.clone()));
            }
            stack.extend(section.subsections.iter());
        }
        Ok(())
    }
}

/// Trims a user-facing title and rejects blank values.
pub fn normalize_title(value: &str) -> Result<String, ModelError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ModelError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}
