//! Interactive orchestration for one open board.
//!
//! # Responsibility
//! - Turn user actions into tree updates plus whole-document writes.
//! - Keep navigation state consistent with the latest local or pushed board.
//! - Own the push subscription for the open board.
//!
//! # Invariants
//! - Local state is updated before the write and is not rolled back when the
//!   write fails; the error is returned to the caller.
//! - Pushed boards overwrite local state wholesale (last writer wins).
//! - The session never applies its own writes echoed back by the store.
//! - At most one pushed board is held until `sync_remote` takes it.
//! - Dropping the session tears the subscription down.

use crate::model::board::{Board, Section};
use crate::model::section_tree::{remove_section, replace_section};
use crate::repo::board_store::{BoardStore, Subscription};
use crate::service::board_service::{
    append_section, apply_edit, default_section_title, ServiceError, ServiceResult,
};
use crate::service::board_transfer::{self, ExportedBoard};
use crate::service::navigation::{Breadcrumb, NavigationError, NavigationState};
use crate::service::section_edit::{NewAttachment, SectionEdit};
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// How many of the session's own recent writes are recognized as echoes.
const OWN_WRITE_HISTORY: usize = 32;

/// Latest pushed version not yet applied by the session.
#[derive(Default)]
struct RemoteInbox {
    latest: Option<Board>,
    received: usize,
    /// Set while the session's own write is in flight.
    own_write: bool,
}

fn lock_inbox(inbox: &Mutex<RemoteInbox>) -> MutexGuard<'_, RemoteInbox> {
    inbox.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One board opened for interactive editing.
pub struct BoardSession<S: BoardStore> {
    store: S,
    board: Board,
    navigation: NavigationState,
    remote: Arc<Mutex<RemoteInbox>>,
    /// `updated_at` of versions this session persisted, oldest first.
    written: VecDeque<DateTime<Utc>>,
    subscription: Option<Subscription>,
}

impl<S: BoardStore> BoardSession<S> {
    /// Loads `board_id` and subscribes to its pushed updates.
    ///
    /// # Errors
    /// - `ServiceError::BoardNotFound` when the store has no such board.
    pub fn open(store: S, board_id: &str) -> ServiceResult<Self> {
        let board = store
            .fetch_board(board_id)?
            .ok_or_else(|| ServiceError::BoardNotFound(board_id.to_string()))?;

        let remote = Arc::new(Mutex::new(RemoteInbox::default()));
        let inbox = Arc::clone(&remote);
        let subscription = store.subscribe_board(
            board_id,
            Arc::new(move |pushed: &Board| {
                let mut inbox = lock_inbox(&inbox);
                if inbox.own_write {
                    return;
                }
                inbox.latest = Some(pushed.clone());
                inbox.received += 1;
            }),
        )?;

        info!(
            "event=session_open module=service status=ok board_id={} sections={}",
            board.id,
            board.section_count()
        );
        let navigation = NavigationState::new(&board.sections);
        Ok(Self {
            store,
            board,
            navigation,
            remote,
            written: VecDeque::with_capacity(OWN_WRITE_HISTORY),
            subscription: Some(subscription),
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    pub fn focused(&self) -> Option<&Section> {
        self.navigation.focused()
    }

    pub fn display_list(&self) -> &[Section] {
        self.navigation.display_list()
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        self.navigation.breadcrumbs()
    }

    /// Applies the newest board version pushed by other writers since the
    /// last call. It replaces local state wholesale.
    ///
    /// Returns how many pushed versions arrived; only the newest is kept.
    pub fn sync_remote(&mut self) -> usize {
        let (latest, received) = {
            let mut inbox = lock_inbox(&self.remote);
            let received = inbox.received;
            inbox.received = 0;
            (inbox.latest.take(), received)
        };
        let Some(board) = latest else {
            return received;
        };
        // Late echoes of this session's writes carry their timestamps.
        if self.written.contains(&board.updated_at) {
            return received;
        }
        self.board = board;
        self.navigation.refresh(&self.board.sections);
        received
    }

    /// Opens the detail view of a section from the display list.
    pub fn select(&mut self, section_id: &str) -> ServiceResult<()> {
        self.navigation.select_visible(section_id)?;
        Ok(())
    }

    pub fn descend(&mut self, child_id: &str) -> ServiceResult<()> {
        self.navigation.descend(child_id)?;
        Ok(())
    }

    pub fn ascend_to_root(&mut self) {
        self.navigation.ascend_to_root(&self.board.sections);
    }

    pub fn jump_to(&mut self, path_index: i64) -> ServiceResult<()> {
        self.navigation.jump_to(path_index, &self.board.sections)?;
        Ok(())
    }

    pub fn unfocus(&mut self) {
        self.navigation.unfocus();
    }

    /// Creates a section at the current depth.
    ///
    /// At the root it joins the top level; below it, it is appended to the
    /// last breadcrumb entry.
    pub fn add_section(&mut self) -> ServiceResult<Section> {
        let section = Section::new(default_section_title(self.navigation.display_list().len()));
        let parent_id = self.navigation.parent_id().map(str::to_string);
        let sections = append_section(&self.board.sections, parent_id.as_deref(), &section);
        self.commit(sections, "add_section")?;
        Ok(section)
    }

    /// Applies one field-level edit to `section_id` and persists the board.
    pub fn edit_section(&mut self, section_id: &str, edit: SectionEdit) -> ServiceResult<Section> {
        let updated = apply_edit(&self.board.sections, section_id, &edit)?;
        let sections = replace_section(&self.board.sections, section_id, |_| updated.clone());
        self.commit(sections, edit.kind())?;
        Ok(updated)
    }

    pub fn rename_section(&mut self, section_id: &str, title: &str) -> ServiceResult<Section> {
        self.edit_section(section_id, SectionEdit::Rename(title.to_string()))
    }

    pub fn save_notes(&mut self, section_id: &str, notes: &str) -> ServiceResult<Section> {
        self.edit_section(section_id, SectionEdit::SaveNotes(notes.to_string()))
    }

    pub fn add_todo(&mut self, section_id: &str, text: &str) -> ServiceResult<Section> {
        self.edit_section(section_id, SectionEdit::AddTodo(text.to_string()))
    }

    pub fn toggle_todo(&mut self, section_id: &str, todo_id: &str) -> ServiceResult<Section> {
        self.edit_section(section_id, SectionEdit::ToggleTodo(todo_id.to_string()))
    }

    pub fn delete_todo(&mut self, section_id: &str, todo_id: &str) -> ServiceResult<Section> {
        self.edit_section(section_id, SectionEdit::DeleteTodo(todo_id.to_string()))
    }

    pub fn attach_file(
        &mut self,
        section_id: &str,
        file: NewAttachment,
    ) -> ServiceResult<Section> {
        self.edit_section(section_id, SectionEdit::AttachFile(file))
    }

    /// Attaches each file independently, in the given order.
    ///
    /// A rejected file does not stop the rest; one result per input.
    pub fn attach_files(
        &mut self,
        section_id: &str,
        files: Vec<NewAttachment>,
    ) -> Vec<ServiceResult<Section>> {
        files
            .into_iter()
            .map(|file| self.attach_file(section_id, file))
            .collect()
    }

    pub fn delete_file(&mut self, section_id: &str, file_id: &str) -> ServiceResult<Section> {
        self.edit_section(section_id, SectionEdit::DeleteFile(file_id.to_string()))
    }

    /// Deletes the focused section and its subtree once `confirm` agrees.
    ///
    /// Returns `Ok(false)` when the gate declines; nothing changes then.
    pub fn delete_section<F>(&mut self, confirm: F) -> ServiceResult<bool>
    where
        F: FnOnce(&Section) -> bool,
    {
        let focused = self
            .navigation
            .focused()
            .cloned()
            .ok_or(NavigationError::NoFocusedSection)?;
        if !confirm(&focused) {
            return Ok(false);
        }

        let sections = remove_section(&self.board.sections, &focused.id);
        self.navigation.unfocus();
        self.commit(sections, "delete_section")?;
        Ok(true)
    }

    pub fn export(&self) -> ServiceResult<ExportedBoard> {
        board_transfer::export_board(&self.board).map_err(Into::into)
    }

    /// Tears the push subscription down explicitly.
    pub fn close(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        info!(
            "event=session_close module=service status=ok board_id={}",
            self.board.id
        );
    }

    fn commit(&mut self, sections: Vec<Section>, action: &str) -> ServiceResult<()> {
        self.board.sections = sections;
        self.board.touch();
        self.navigation.refresh(&self.board.sections);

        lock_inbox(&self.remote).own_write = true;
        let written = self.store.persist_board(&self.board);
        lock_inbox(&self.remote).own_write = false;

        if let Err(err) = written {
            warn!(
                "event=session_commit module=service status=error board_id={} action={} error={}",
                self.board.id, action, err
            );
            return Err(err.into());
        }
        if self.written.len() == OWN_WRITE_HISTORY {
            self.written.pop_front();
        }
        self.written.push_back(self.board.updated_at);
        info!(
            "event=session_commit module=service status=ok board_id={} action={}",
            self.board.id, action
        );
        Ok(())
    }
}
