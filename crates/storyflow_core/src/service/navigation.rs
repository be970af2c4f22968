//! Breadcrumb navigation over a board's section tree.
//!
//! # Responsibility
//! - Track the path from the board root to the section being drilled into.
//! - Track the sibling list shown at the current depth and the focused section.
//!
//! # Invariants
//! - The display list is the top level when the path is empty, otherwise the
//!   subsections of the last path entry.
//! - Failed transitions leave the state unchanged.

use crate::model::board::{Section, SectionId};
use crate::model::section_tree::find_section;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Index accepted by `jump_to` meaning "board root".
pub const ROOT_PATH_INDEX: i64 = -1;

/// Rejected navigation transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    /// `descend` was called with no section in detail view.
    NoFocusedSection,
    /// Child id is not a direct subsection of the focused section.
    ChildNotFound(SectionId),
    /// Breadcrumb index is outside the current path.
    InvalidPathIndex { index: i64, depth: usize },
    /// Section id is not in the current display list.
    SectionNotVisible(SectionId),
}

impl Display for NavigationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoFocusedSection => write!(f, "no section is focused"),
            Self::ChildNotFound(id) => write!(f, "subsection not found under focus: {id}"),
            Self::InvalidPathIndex { index, depth } => {
                write!(f, "breadcrumb index {index} is outside path of depth {depth}")
            }
            Self::SectionNotVisible(id) => write!(f, "section is not in the display list: {id}"),
        }
    }
}

impl Error for NavigationError {}

/// One breadcrumb label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub id: SectionId,
    pub title: String,
}

/// Navigation snapshot for one open board.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NavigationState {
    path: Vec<Section>,
    display: Vec<Section>,
    focused: Option<Section>,
}

impl NavigationState {
    /// Initial state: empty path, top level displayed, nothing focused.
    pub fn new(top_level: &[Section]) -> Self {
        Self {
            path: Vec::new(),
            display: top_level.to_vec(),
            focused: None,
        }
    }

    pub fn path(&self) -> &[Section] {
        &self.path
    }

    pub fn display_list(&self) -> &[Section] {
        &self.display
    }

    pub fn focused(&self) -> Option<&Section> {
        self.focused.as_ref()
    }

    pub fn is_at_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Id of the section new sections are appended to, if below the root.
    pub fn parent_id(&self) -> Option<&str> {
        self.path.last().map(|section| section.id.as_str())
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        self.path
            .iter()
            .map(|section| Breadcrumb {
                id: section.id.clone(),
                title: section.title.clone(),
            })
            .collect()
    }

    /// Opens one direct subsection of the focused section.
    pub fn descend(&mut self, child_id: &str) -> Result<(), NavigationError> {
        let focused = self
            .focused
            .as_ref()
            .ok_or(NavigationError::NoFocusedSection)?;
        let child = focused
            .subsections
            .iter()
            .find(|section| section.id == child_id)
            .cloned()
            .ok_or_else(|| NavigationError::ChildNotFound(child_id.to_string()))?;

        if let Some(parent) = self.focused.take() {
            self.display = parent.subsections.clone();
            self.path.push(parent);
        }
        self.focused = Some(child);
        Ok(())
    }

    pub fn ascend_to_root(&mut self, top_level: &[Section]) {
        self.path.clear();
        self.display = top_level.to_vec();
        self.focused = None;
    }

    /// Truncates the path to `index + 1` entries; `ROOT_PATH_INDEX` goes to the root.
    pub fn jump_to(&mut self, index: i64, top_level: &[Section]) -> Result<(), NavigationError> {
        if index == ROOT_PATH_INDEX {
            self.ascend_to_root(top_level);
            return Ok(());
        }
        let depth = self.path.len();
        let keep = usize::try_from(index)
            .ok()
            .filter(|position| *position < depth)
            .ok_or(NavigationError::InvalidPathIndex { index, depth })?
            + 1;

        self.path.truncate(keep);
        self.display = self
            .path
            .last()
            .map(|section| section.subsections.clone())
            .unwrap_or_default();
        self.focused = None;
        Ok(())
    }

    /// Focuses a section without touching the path.
    pub fn select(&mut self, section: Section) {
        self.focused = Some(section);
    }

    /// Focuses a section from the current display list by id.
    pub fn select_visible(&mut self, id: &str) -> Result<(), NavigationError> {
        let section = self
            .display
            .iter()
            .find(|section| section.id == id)
            .cloned()
            .ok_or_else(|| NavigationError::SectionNotVisible(id.to_string()))?;
        self.select(section);
        Ok(())
    }

    /// Leaves the detail view; path and display list stay.
    pub fn unfocus(&mut self) {
        self.focused = None;
    }

    /// Re-resolves path, display list and focus against the current tree.
    ///
    /// The path is cut at the first entry that no longer exists; focus is
    /// cleared when its section is gone.
    pub fn refresh(&mut self, top_level: &[Section]) {
        let mut path = Vec::with_capacity(self.path.len());
        for entry in &self.path {
            match find_section(top_level, &entry.id) {
                Some(current) => path.push(current.clone()),
                None => break,
            }
        }
        self.path = path;
        self.display = match self.path.last() {
            Some(parent) => parent.subsections.clone(),
            None => top_level.to_vec(),
        };
        self.focused = self
            .focused
            .as_ref()
            .and_then(|focused| find_section(top_level, &focused.id))
            .cloned();
    }
}
