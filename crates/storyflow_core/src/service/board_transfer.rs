//! JSON export and import of whole boards.
//!
//! # Responsibility
//! - Serialize a board into a pretty-printed downloadable document.
//! - Parse and validate an imported document into a new board identity.
//!
//! # Invariants
//! - Import always assigns a fresh id and stamps `updatedAt`; every other
//!   field is taken from the document as-is.
//! - A rejected import never yields a partial board.

use crate::model::board::{new_id, Board};
use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Failures while moving boards in or out as JSON.
#[derive(Debug)]
pub enum TransferError {
    /// Board could not be encoded.
    Encode(serde_json::Error),
    /// Input is not a valid board document.
    Malformed(String),
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(err) => write!(f, "failed to encode board: {err}"),
            Self::Malformed(message) => write!(f, "malformed board document: {message}"),
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encode(err) => Some(err),
            Self::Malformed(_) => None,
        }
    }
}

/// Export payload ready to be offered as a download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedBoard {
    /// `<title-with-dashes>-<epoch-millis>.json`
    pub file_name: String,
    /// Pretty-printed UTF-8 JSON.
    pub contents: String,
}

/// Serializes `board` for download.
pub fn export_board(board: &Board) -> Result<ExportedBoard, TransferError> {
    let contents = serde_json::to_string_pretty(board).map_err(TransferError::Encode)?;
    Ok(ExportedBoard {
        file_name: export_file_name(&board.title, Utc::now().timestamp_millis()),
        contents,
    })
}

/// Replaces every whitespace run in `title` with `-` and appends the timestamp.
pub fn export_file_name(title: &str, epoch_millis: i64) -> String {
    let slug = WHITESPACE_RE.replace_all(title, "-");
    format!("{slug}-{epoch_millis}.json")
}

/// Parses an exported document into a board with a new identity.
///
/// `id` and `updatedAt` may be absent in the input; they are overwritten.
pub fn parse_board_import(document: &str) -> Result<Board, TransferError> {
    let mut value: Value = serde_json::from_str(document)
        .map_err(|err| TransferError::Malformed(format!("invalid JSON: {err}")))?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| TransferError::Malformed("top-level value must be an object".to_string()))?;

    object.insert("id".to_string(), Value::String(new_id()));
    object.insert(
        "updatedAt".to_string(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );

    let board: Board = serde_json::from_value(value)
        .map_err(|err| TransferError::Malformed(err.to_string()))?;
    board
        .validate()
        .map_err(|err| TransferError::Malformed(err.to_string()))?;
    Ok(board)
}
