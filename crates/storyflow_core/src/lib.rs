//! Core domain logic for StoryFlow boards.
//! This crate is the single source of truth for board tree invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::board::{
    new_id, Board, BoardId, FileAttachment, FileId, ModelError, Section, SectionId, Theme,
    TodoId, TodoItem,
};
pub use model::section_tree::{contains_section, find_section, remove_section, replace_section};
pub use repo::board_store::{
    BoardListener, BoardStore, BoardSummary, ListenerRegistry, SqliteBoardStore, StoreError,
    StoreResult, Subscription,
};
pub use service::board_service::{BoardService, ServiceError, ServiceResult};
pub use service::board_session::BoardSession;
pub use service::board_transfer::{export_file_name, ExportedBoard, TransferError};
pub use service::navigation::{Breadcrumb, NavigationError, NavigationState, ROOT_PATH_INDEX};
pub use service::section_edit::{
    encode_data_uri, EditError, NewAttachment, SectionEdit, MAX_ATTACHMENT_BYTES,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
