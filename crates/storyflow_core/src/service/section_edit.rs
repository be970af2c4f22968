//! Field-level edits applied to one section.
//!
//! # Responsibility
//! - Validate user input for section edits before any tree update.
//! - Produce the updated section value handed to `replace_section`.
//! - Encode attached file bytes as inline data URIs.
//!
//! # Invariants
//! - Rejected edits never produce a section value.
//! - Oversized files are rejected before encoding.
//! - Toggling or deleting an unknown todo/file id leaves the section unchanged.

use crate::model::board::{
    new_id, normalize_title, FileAttachment, FileId, Section, TodoId, TodoItem,
};
use base64::Engine;
use chrono::Utc;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Largest accepted attachment, in bytes.
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Validation failures for section edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// Section title is blank after trim.
    EmptyTitle,
    /// Todo text is blank after trim.
    EmptyTodoText,
    /// Attachment exceeds `MAX_ATTACHMENT_BYTES`.
    FileTooLarge { name: String, size: u64, max: u64 },
}

impl Display for EditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "section title must not be blank"),
            Self::EmptyTodoText => write!(f, "todo text must not be blank"),
            Self::FileTooLarge { name, size, max } => {
                write!(f, "{name} is too large ({size} bytes, max {max})")
            }
        }
    }
}

impl Error for EditError {}

/// File selected for attachment, before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl NewAttachment {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Rejects files above the attachment limit.
    pub fn check_size(&self) -> Result<(), EditError> {
        let size = self.size();
        if size > MAX_ATTACHMENT_BYTES {
            return Err(EditError::FileTooLarge {
                name: self.name.clone(),
                size,
                max: MAX_ATTACHMENT_BYTES,
            });
        }
        Ok(())
    }

    /// Encodes into a stored attachment with a fresh id.
    pub fn encode(&self) -> Result<FileAttachment, EditError> {
        self.check_size()?;
        Ok(FileAttachment {
            id: new_id(),
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            size: self.size(),
            data_uri: encode_data_uri(&self.mime_type, &self.bytes),
            uploaded_at: Utc::now(),
        })
    }
}

/// Builds `data:<mime>;base64,<payload>`.
pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    let mime_type = match mime_type.trim() {
        "" => FALLBACK_MIME_TYPE,
        value => value,
    };
    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime_type};base64,{payload}")
}

/// One user-facing change to a section's own fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionEdit {
    Rename(String),
    SaveNotes(String),
    AddTodo(String),
    ToggleTodo(TodoId),
    DeleteTodo(TodoId),
    AttachFile(NewAttachment),
    DeleteFile(FileId),
}

impl SectionEdit {
    /// Short stable name for log events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Rename(_) => "rename",
            Self::SaveNotes(_) => "save_notes",
            Self::AddTodo(_) => "add_todo",
            Self::ToggleTodo(_) => "toggle_todo",
            Self::DeleteTodo(_) => "delete_todo",
            Self::AttachFile(_) => "attach_file",
            Self::DeleteFile(_) => "delete_file",
        }
    }

    /// Returns the edited copy of `section`.
    pub fn apply(&self, section: &Section) -> Result<Section, EditError> {
        let mut updated = section.clone();
        match self {
            Self::Rename(title) => {
                updated.title = normalize_title(title).map_err(|_| EditError::EmptyTitle)?;
            }
            Self::SaveNotes(notes) => updated.notes = notes.clone(),
            Self::AddTodo(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(EditError::EmptyTodoText);
                }
                updated.todos.push(TodoItem::new(text));
            }
            Self::ToggleTodo(todo_id) => {
                if let Some(todo) = updated.todos.iter_mut().find(|todo| &todo.id == todo_id) {
                    todo.completed = !todo.completed;
                }
            }
            Self::DeleteTodo(todo_id) => updated.todos.retain(|todo| &todo.id != todo_id),
            Self::AttachFile(file) => updated.files.push(file.encode()?),
            Self::DeleteFile(file_id) => updated.files.retain(|file| &file.id != file_id),
        }
        Ok(updated)
    }
}
