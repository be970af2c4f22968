//! Board use-case service.
//!
//! # Responsibility
//! - Create, list, delete, import and export whole boards.
//! - Apply id-addressed section changes for stateless callers (CLI/FFI).
//!
//! # Invariants
//! - Every persisted mutation refreshes `Board.updated_at` first.
//! - Validation failures are reported before any store write.
//! - Destructive actions pass through a synchronous confirmation gate.

use crate::model::board::{Board, BoardId, ModelError, Section, SectionId, Theme};
use crate::model::section_tree::{find_section, remove_section, replace_section};
use crate::repo::board_store::{BoardStore, BoardSummary, StoreError};
use crate::service::board_transfer::{self, ExportedBoard, TransferError};
use crate::service::navigation::NavigationError;
use crate::service::section_edit::{EditError, SectionEdit};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced to board callers as user-visible notices.
#[derive(Debug)]
pub enum ServiceError {
    /// Board title is blank after trim.
    InvalidTitle,
    /// Section edit input was rejected.
    Edit(EditError),
    /// No stored board has this id.
    BoardNotFound(BoardId),
    /// No section in the board has this id.
    SectionNotFound(SectionId),
    /// Import input failed JSON parsing or shape validation.
    MalformedImport(String),
    /// Navigation transition was rejected.
    Navigation(NavigationError),
    /// Board could not be encoded for export.
    Export(TransferError),
    /// Persistence-layer failure.
    Store(StoreError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle => write!(f, "board title must not be blank"),
            Self::Edit(err) => write!(f, "{err}"),
            Self::BoardNotFound(id) => write!(f, "board not found: {id}"),
            Self::SectionNotFound(id) => write!(f, "section not found: {id}"),
            Self::MalformedImport(message) => write!(f, "invalid board file: {message}"),
            Self::Navigation(err) => write!(f, "{err}"),
            Self::Export(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Edit(err) => Some(err),
            Self::Navigation(err) => Some(err),
            Self::Export(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(id) => Self::BoardNotFound(id),
            other => Self::Store(other),
        }
    }
}

impl From<EditError> for ServiceError {
    fn from(value: EditError) -> Self {
        Self::Edit(value)
    }
}

impl From<NavigationError> for ServiceError {
    fn from(value: NavigationError) -> Self {
        Self::Navigation(value)
    }
}

impl From<ModelError> for ServiceError {
    fn from(value: ModelError) -> Self {
        match value {
            ModelError::EmptyTitle => Self::InvalidTitle,
            other => Self::MalformedImport(other.to_string()),
        }
    }
}

impl From<TransferError> for ServiceError {
    fn from(value: TransferError) -> Self {
        match value {
            TransferError::Malformed(message) => Self::MalformedImport(message),
            other => Self::Export(other),
        }
    }
}

/// Board use-case facade over a store implementation.
pub struct BoardService<S: BoardStore> {
    store: S,
}

impl<S: BoardStore> BoardService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates and persists an empty board.
    pub fn create_board(&self, title: &str, theme: Theme) -> ServiceResult<Board> {
        let board = Board::new(title, theme)?;
        self.store.persist_board(&board)?;
        info!(
            "event=board_create module=service status=ok board_id={} theme={}",
            board.id,
            theme.as_str()
        );
        Ok(board)
    }

    /// Loads one board or fails with `BoardNotFound`.
    pub fn get_board(&self, board_id: &str) -> ServiceResult<Board> {
        self.store
            .fetch_board(board_id)?
            .ok_or_else(|| ServiceError::BoardNotFound(board_id.to_string()))
    }

    pub fn list_boards(&self) -> ServiceResult<Vec<BoardSummary>> {
        self.store.list_boards().map_err(Into::into)
    }

    /// Deletes a board once `confirm` agrees. Returns whether it was deleted.
    pub fn delete_board<F>(&self, board_id: &str, confirm: F) -> ServiceResult<bool>
    where
        F: FnOnce(&Board) -> bool,
    {
        let board = self.get_board(board_id)?;
        if !confirm(&board) {
            info!("event=board_delete module=service status=cancelled board_id={board_id}");
            return Ok(false);
        }
        self.store.delete_board(board_id)?;
        Ok(true)
    }

    /// Appends a new section under `parent_id`, or at the top level when `None`.
    pub fn add_section(&self, board_id: &str, parent_id: Option<&str>) -> ServiceResult<Section> {
        let mut board = self.get_board(board_id)?;
        let sibling_count = match parent_id {
            Some(parent_id) => {
                find_section(&board.sections, parent_id)
                    .ok_or_else(|| ServiceError::SectionNotFound(parent_id.to_string()))?
                    .subsections
                    .len()
            }
            None => board.sections.len(),
        };
        let section = Section::new(default_section_title(sibling_count));
        board.sections = append_section(&board.sections, parent_id, &section);
        self.save(&mut board)?;
        Ok(section)
    }

    /// Applies one field-level edit to a section by id.
    pub fn edit_section(
        &self,
        board_id: &str,
        section_id: &str,
        edit: &SectionEdit,
    ) -> ServiceResult<Section> {
        let mut board = self.get_board(board_id)?;
        let updated = apply_edit(&board.sections, section_id, edit)?;
        board.sections = replace_section(&board.sections, section_id, |_| updated.clone());
        self.save(&mut board)?;
        info!(
            "event=section_edit module=service status=ok board_id={} section_id={} edit={}",
            board_id,
            section_id,
            edit.kind()
        );
        Ok(updated)
    }

    /// Removes a section and its subtree once `confirm` agrees.
    /// Returns whether it was deleted.
    pub fn delete_section<F>(
        &self,
        board_id: &str,
        section_id: &str,
        confirm: F,
    ) -> ServiceResult<bool>
    where
        F: FnOnce(&Section) -> bool,
    {
        let mut board = self.get_board(board_id)?;
        let target = find_section(&board.sections, section_id)
            .ok_or_else(|| ServiceError::SectionNotFound(section_id.to_string()))?;
        if !confirm(target) {
            info!(
                "event=section_delete module=service status=cancelled board_id={board_id} section_id={section_id}"
            );
            return Ok(false);
        }
        board.sections = remove_section(&board.sections, section_id);
        self.save(&mut board)?;
        Ok(true)
    }

    pub fn export_board(&self, board_id: &str) -> ServiceResult<ExportedBoard> {
        let board = self.get_board(board_id)?;
        board_transfer::export_board(&board).map_err(Into::into)
    }

    /// Imports a JSON document as a new board. Nothing is written on failure.
    pub fn import_board(&self, document: &str) -> ServiceResult<Board> {
        let board = match board_transfer::parse_board_import(document) {
            Ok(board) => board,
            Err(err) => {
                warn!("event=board_import module=service status=error error={err}");
                return Err(err.into());
            }
        };
        self.store.persist_board(&board)?;
        info!(
            "event=board_import module=service status=ok board_id={} sections={}",
            board.id,
            board.section_count()
        );
        Ok(board)
    }

    fn save(&self, board: &mut Board) -> ServiceResult<()> {
        board.touch();
        self.store.persist_board(board).map_err(Into::into)
    }
}

/// Title given to a section created as the `existing + 1`-th sibling.
pub fn default_section_title(existing: usize) -> String {
    format!("Section {}", existing + 1)
}

/// Returns `forest` with `section` appended to `parent_id`'s subsections, or
/// to the top level when `parent_id` is `None`.
pub(crate) fn append_section(
    forest: &[Section],
    parent_id: Option<&str>,
    section: &Section,
) -> Vec<Section> {
    match parent_id {
        None => {
            let mut sections = forest.to_vec();
            sections.push(section.clone());
            sections
        }
        Some(parent_id) => replace_section(forest, parent_id, |parent| {
            let mut parent = parent.clone();
            parent.subsections.push(section.clone());
            parent
        }),
    }
}

/// Validates and applies `edit` to the section `section_id` in `forest`.
pub(crate) fn apply_edit(
    forest: &[Section],
    section_id: &str,
    edit: &SectionEdit,
) -> ServiceResult<Section> {
    let target = find_section(forest, section_id)
        .ok_or_else(|| ServiceError::SectionNotFound(section_id.to_string()))?;
    edit.apply(target).map_err(Into::into)
}
