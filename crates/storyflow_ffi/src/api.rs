//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose board and section use cases to Dart via FRB.
//! - Open the board database per call so no connection crosses the boundary.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures are reported in response envelopes, never as thrown errors.
//! - Confirmation prompts happen in the UI; a delete call here is final.

use std::path::PathBuf;
use std::sync::OnceLock;
use storyflow_core::db::open_db;
use storyflow_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    BoardService, BoardSummary, NewAttachment, Section, SectionEdit, ServiceError,
    ServiceResult, SqliteBoardStore, Theme,
};

const BOARD_DB_FILE_NAME: &str = "storyflow_boards.sqlite3";
static BOARD_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts return an error message.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Sets the board database file before first use.
///
/// # FFI contract
/// - Must run before any board call; later calls use the temp-dir default.
/// - Repeating the same path is accepted; a different path is rejected.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_db_path(path: String) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return "db path cannot be empty".to_string();
    }
    let requested = PathBuf::from(trimmed);
    let active = BOARD_DB_PATH.get_or_init(|| requested.clone());
    if *active == requested {
        String::new()
    } else {
        format!(
            "db path already set to `{}`; refusing to switch to `{}`",
            active.display(),
            requested.display()
        )
    }
}

/// One row of the board picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardListItem {
    pub board_id: String,
    pub title: String,
    /// `pastel|dark|elegant|playful`.
    pub theme: String,
    /// Number of top-level sections.
    pub section_count: u32,
    pub updated_at_epoch_ms: i64,
}

/// Board picker response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardListResponse {
    pub ok: bool,
    /// Most recently updated first.
    pub items: Vec<BoardListItem>,
    pub message: String,
}

/// Generic action response envelope for board and section commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Board touched by the operation.
    pub board_id: Option<String>,
    /// Section created or edited, when the command targets one.
    pub section_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl BoardActionResponse {
    fn success(message: impl Into<String>, board_id: String, section_id: Option<String>) -> Self {
        Self {
            ok: true,
            board_id: Some(board_id),
            section_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            board_id: None,
            section_id: None,
            message: message.into(),
        }
    }
}

/// Serialized board document, as used for detail views and downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardDocumentResponse {
    pub ok: bool,
    /// Suggested download name; empty on failure.
    pub file_name: String,
    /// Pretty-printed board JSON; empty on failure.
    pub json: String,
    pub message: String,
}

/// Lists stored boards.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn list_boards() -> BoardListResponse {
    match with_board_service(|service| service.list_boards()) {
        Ok(summaries) => {
            let items = summaries.into_iter().map(to_list_item).collect::<Vec<_>>();
            BoardListResponse {
                ok: true,
                message: format!("Found {} board(s).", items.len()),
                items,
            }
        }
        Err(err) => BoardListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("list_boards failed: {err}"),
        },
    }
}

/// Creates an empty board.
///
/// `theme` must be one of `pastel|dark|elegant|playful` (case-insensitive).
#[flutter_rust_bridge::frb(sync)]
pub fn create_board(title: String, theme: String) -> BoardActionResponse {
    let Some(parsed_theme) = Theme::parse(&theme) else {
        return BoardActionResponse::failure(format!(
            "create_board failed: unknown theme `{}`",
            theme.trim()
        ));
    };
    match with_board_service(|service| service.create_board(&title, parsed_theme)) {
        Ok(board) => BoardActionResponse::success("Board created.", board.id, None),
        Err(err) => BoardActionResponse::failure(format!("create_board failed: {err}")),
    }
}

/// Deletes a board the user already confirmed.
#[flutter_rust_bridge::frb(sync)]
pub fn delete_board(board_id: String) -> BoardActionResponse {
    match with_board_service(|service| service.delete_board(&board_id, |_| true)) {
        Ok(_) => BoardActionResponse::success("Board deleted.", board_id, None),
        Err(err) => BoardActionResponse::failure(format!("delete_board failed: {err}")),
    }
}

/// Returns the full board document for rendering or download.
#[flutter_rust_bridge::frb(sync)]
pub fn export_board(board_id: String) -> BoardDocumentResponse {
    match with_board_service(|service| service.export_board(&board_id)) {
        Ok(exported) => BoardDocumentResponse {
            ok: true,
            file_name: exported.file_name,
            json: exported.contents,
            message: "Board exported.".to_string(),
        },
        Err(err) => BoardDocumentResponse {
            ok: false,
            file_name: String::new(),
            json: String::new(),
            message: format!("export_board failed: {err}"),
        },
    }
}

/// Imports a board document as a new board with a fresh id.
#[flutter_rust_bridge::frb(sync)]
pub fn import_board(json: String) -> BoardActionResponse {
    match with_board_service(|service| service.import_board(&json)) {
        Ok(board) => BoardActionResponse::success("Board imported.", board.id, None),
        Err(err) => BoardActionResponse::failure(format!("import_board failed: {err}")),
    }
}

/// Appends a section at the top level, or under `parent_id` when given.
#[flutter_rust_bridge::frb(sync)]
pub fn add_section(board_id: String, parent_id: Option<String>) -> BoardActionResponse {
    section_action("add_section", "Section added.", &board_id, |service| {
        service.add_section(&board_id, parent_id.as_deref())
    })
}

/// Removes a section and its whole subtree.
#[flutter_rust_bridge::frb(sync)]
pub fn delete_section(board_id: String, section_id: String) -> BoardActionResponse {
    match with_board_service(|service| service.delete_section(&board_id, &section_id, |_| true)) {
        Ok(_) => BoardActionResponse::success("Section deleted.", board_id, Some(section_id)),
        Err(err) => BoardActionResponse::failure(format!("delete_section failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn rename_section(board_id: String, section_id: String, title: String) -> BoardActionResponse {
    edit_action(
        "rename_section",
        &board_id,
        &section_id,
        SectionEdit::Rename(title),
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn save_section_notes(
    board_id: String,
    section_id: String,
    notes: String,
) -> BoardActionResponse {
    edit_action(
        "save_section_notes",
        &board_id,
        &section_id,
        SectionEdit::SaveNotes(notes),
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn add_todo(board_id: String, section_id: String, text: String) -> BoardActionResponse {
    edit_action("add_todo", &board_id, &section_id, SectionEdit::AddTodo(text))
}

#[flutter_rust_bridge::frb(sync)]
pub fn toggle_todo(board_id: String, section_id: String, todo_id: String) -> BoardActionResponse {
    edit_action(
        "toggle_todo",
        &board_id,
        &section_id,
        SectionEdit::ToggleTodo(todo_id),
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn delete_todo(board_id: String, section_id: String, todo_id: String) -> BoardActionResponse {
    edit_action(
        "delete_todo",
        &board_id,
        &section_id,
        SectionEdit::DeleteTodo(todo_id),
    )
}

/// Attaches raw file bytes to a section.
///
/// Files over 10 MiB are rejected before anything is written.
#[flutter_rust_bridge::frb(sync)]
pub fn attach_file(
    board_id: String,
    section_id: String,
    name: String,
    mime_type: String,
    bytes: Vec<u8>,
) -> BoardActionResponse {
    let file = NewAttachment::new(name, mime_type, bytes);
    edit_action(
        "attach_file",
        &board_id,
        &section_id,
        SectionEdit::AttachFile(file),
    )
}

#[flutter_rust_bridge::frb(sync)]
pub fn delete_file(board_id: String, section_id: String, file_id: String) -> BoardActionResponse {
    edit_action(
        "delete_file",
        &board_id,
        &section_id,
        SectionEdit::DeleteFile(file_id),
    )
}

fn edit_action(
    action: &str,
    board_id: &str,
    section_id: &str,
    edit: SectionEdit,
) -> BoardActionResponse {
    section_action(action, "Section updated.", board_id, |service| {
        service.edit_section(board_id, section_id, &edit)
    })
}

fn section_action(
    action: &str,
    message: &str,
    board_id: &str,
    f: impl FnOnce(&BoardService<SqliteBoardStore<'_>>) -> ServiceResult<Section>,
) -> BoardActionResponse {
    match with_board_service(f) {
        Ok(section) => BoardActionResponse::success(message, board_id.to_string(), Some(section.id)),
        Err(err) => BoardActionResponse::failure(format!("{action} failed: {err}")),
    }
}

fn resolve_board_db_path() -> PathBuf {
    BOARD_DB_PATH
        .get_or_init(|| std::env::temp_dir().join(BOARD_DB_FILE_NAME))
        .clone()
}

fn with_board_service<T>(
    f: impl FnOnce(&BoardService<SqliteBoardStore<'_>>) -> ServiceResult<T>,
) -> Result<T, String> {
    let db_path = resolve_board_db_path();
    let conn = open_db(&db_path).map_err(|err| format!("board DB open failed: {err}"))?;
    let store = SqliteBoardStore::try_new(&conn)
        .map_err(|err| format!("board store init failed: {err}"))?;
    let service = BoardService::new(store);
    f(&service).map_err(|err: ServiceError| err.to_string())
}

fn to_list_item(summary: BoardSummary) -> BoardListItem {
    BoardListItem {
        board_id: summary.id,
        title: summary.title,
        theme: summary.theme.as_str().to_string(),
        section_count: u32::try_from(summary.section_count).unwrap_or(u32::MAX),
        updated_at_epoch_ms: summary.updated_at.timestamp_millis(),
    }
}
