use std::cell::Cell;
use storyflow_core::db::open_db_in_memory;
use storyflow_core::{
    find_section, Board, BoardListener, BoardService, BoardSession, BoardStore, BoardSummary,
    EditError, NavigationError, NewAttachment, ServiceError, SqliteBoardStore, StoreError,
    StoreResult, Subscription, Theme, ROOT_PATH_INDEX,
};

/// Wraps the SQLite store to count writes and optionally fail them.
struct CountingStore<'a> {
    inner: SqliteBoardStore<'a>,
    persists: Cell<usize>,
    fail_writes: Cell<bool>,
}

impl<'a> CountingStore<'a> {
    fn new(inner: SqliteBoardStore<'a>) -> Self {
        Self {
            inner,
            persists: Cell::new(0),
            fail_writes: Cell::new(false),
        }
    }
}

impl BoardStore for CountingStore<'_> {
    fn fetch_board(&self, id: &str) -> StoreResult<Option<Board>> {
        self.inner.fetch_board(id)
    }

    fn subscribe_board(&self, id: &str, listener: BoardListener) -> StoreResult<Subscription> {
        self.inner.subscribe_board(id, listener)
    }

    fn persist_board(&self, board: &Board) -> StoreResult<()> {
        self.persists.set(self.persists.get() + 1);
        if self.fail_writes.get() {
            return Err(StoreError::InvalidData("write rejected".to_string()));
        }
        self.inner.persist_board(board)
    }

    fn list_boards(&self) -> StoreResult<Vec<BoardSummary>> {
        self.inner.list_boards()
    }

    fn delete_board(&self, id: &str) -> StoreResult<()> {
        self.inner.delete_board(id)
    }
}

fn setup() -> rusqlite::Connection {
    open_db_in_memory().unwrap()
}

fn create_board(store: &SqliteBoardStore<'_>) -> Board {
    BoardService::new(store)
        .create_board("Summer Trip", Theme::Playful)
        .unwrap()
}

#[test]
fn open_unknown_board_is_not_found() {
    let conn = setup();
    let store = SqliteBoardStore::try_new(&conn).unwrap();

    let err = BoardSession::open(&store, "nope").err().unwrap();
    assert!(matches!(err, ServiceError::BoardNotFound(id) if id == "nope"));
}

#[test]
fn add_section_on_empty_board_creates_titled_top_level_section() {
    let conn = setup();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let board = create_board(&store);
    let mut session = BoardSession::open(&store, &board.id).unwrap();

    let section = session.add_section().unwrap();

    assert_eq!(session.board().sections.len(), 1);
    assert_eq!(section.title, "Section 1");
    assert!(!section.title.trim().is_empty());
    assert_eq!(session.display_list().len(), 1);

    let stored = store.fetch_board(&board.id).unwrap().unwrap();
    assert_eq!(stored.sections[0].id, section.id);
    assert!(stored.updated_at >= board.updated_at);
}

#[test]
fn add_section_below_root_appends_to_last_breadcrumb() {
    let conn = setup();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let board = create_board(&store);
    let service = BoardService::new(&store);
    let trip = service.add_section(&board.id, None).unwrap();
    let flights = service.add_section(&board.id, Some(&trip.id)).unwrap();
    assert_eq!(flights.title, "Section 1");

    let mut session = BoardSession::open(&store, &board.id).unwrap();
    session.select(&trip.id).unwrap();
    // Focus alone does not change depth.
    let sibling = session.add_section().unwrap();
    assert_eq!(sibling.title, "Section 2");
    assert_eq!(session.board().sections.len(), 2);

    session.select(&trip.id).unwrap();
    session.descend(&flights.id).unwrap();
    let nested = session.add_section().unwrap();

    let parent = find_section(&session.board().sections, &trip.id).unwrap();
    let titles: Vec<&str> = parent.subsections.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Section 1", "Section 2"]);
    assert_eq!(parent.subsections[1].id, nested.id);
    assert_eq!(session.display_list().len(), 2);
    assert_eq!(session.board().sections.len(), 2);
}

#[test]
fn add_todo_appends_open_item() {
    let conn = setup();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let board = create_board(&store);
    let mut session = BoardSession::open(&store, &board.id).unwrap();
    let section = session.add_section().unwrap();
    session.select(&section.id).unwrap();

    let updated = session.add_todo(&section.id, "buy milk").unwrap();

    assert_eq!(updated.todos.len(), 1);
    assert_eq!(updated.todos[0].text, "buy milk");
    assert!(!updated.todos[0].completed);
    assert_eq!(session.focused().unwrap().todos, updated.todos);

    let todo_id = updated.todos[0].id.clone();
    let toggled = session.toggle_todo(&section.id, &todo_id).unwrap();
    assert!(toggled.todos[0].completed);
    let removed = session.delete_todo(&section.id, &todo_id).unwrap();
    assert!(removed.todos.is_empty());
}

#[test]
fn blank_todo_is_rejected_without_write() {
    let conn = setup();
    let inner = SqliteBoardStore::try_new(&conn).unwrap();
    let board = create_board(&inner);
    let store = CountingStore::new(inner);
    let mut session = BoardSession::open(&store, &board.id).unwrap();
    let section = session.add_section().unwrap();
    let writes = store.persists.get();

    let err = session.add_todo(&section.id, "   ").unwrap_err();
    assert!(matches!(err, ServiceError::Edit(EditError::EmptyTodoText)));
    assert_eq!(store.persists.get(), writes);
}

#[test]
fn rename_and_save_notes_refresh_focus() {
    let conn = setup();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let board = create_board(&store);
    let mut session = BoardSession::open(&store, &board.id).unwrap();
    let section = session.add_section().unwrap();
    session.select(&section.id).unwrap();

    session.rename_section(&section.id, "  Flights ").unwrap();
    session.save_notes(&section.id, "window seat").unwrap();

    let focused = session.focused().unwrap();
    assert_eq!(focused.title, "Flights");
    assert_eq!(focused.notes, "window seat");

    let err = session.rename_section(&section.id, " ").unwrap_err();
    assert!(matches!(err, ServiceError::Edit(EditError::EmptyTitle)));

    let err = session.save_notes("ghost", "x").unwrap_err();
    assert!(matches!(err, ServiceError::SectionNotFound(id) if id == "ghost"));
}

#[test]
fn oversized_attachment_is_rejected_before_persistence() {
    let conn = setup();
    let inner = SqliteBoardStore::try_new(&conn).unwrap();
    let board = create_board(&inner);
    let store = CountingStore::new(inner);
    let mut session = BoardSession::open(&store, &board.id).unwrap();
    let section = session.add_section().unwrap();
    let writes = store.persists.get();

    let big = NewAttachment::new("video.mp4", "video/mp4", vec![0; 11 * 1024 * 1024]);
    let err = session.attach_file(&section.id, big).unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Edit(EditError::FileTooLarge { ref name, .. }) if name == "video.mp4"
    ));
    assert_eq!(store.persists.get(), writes);
    assert!(session.board().sections[0].files.is_empty());
}

#[test]
fn attach_files_keeps_selection_order_and_skips_rejects() {
    let conn = setup();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let board = create_board(&store);
    let mut session = BoardSession::open(&store, &board.id).unwrap();
    let section = session.add_section().unwrap();

    let results = session.attach_files(
        &section.id,
        vec![
            NewAttachment::new("a.txt", "text/plain", b"alpha".to_vec()),
            NewAttachment::new("huge.bin", "", vec![0; 10 * 1024 * 1024 + 1]),
            NewAttachment::new("b.png", "image/png", vec![1, 2, 3]),
        ],
    );

    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert!(results[2].is_ok());
    let files = &session.board().sections[0].files;
    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.png"]);
    assert_eq!(files[0].data_uri, "data:text/plain;base64,YWxwaGE=");
    assert_eq!(files[0].size, 5);

    let file_id = files[0].id.clone();
    let updated = session.delete_file(&section.id, &file_id).unwrap();
    assert_eq!(updated.files.len(), 1);
    assert_eq!(updated.files[0].name, "b.png");
}

#[test]
fn delete_section_removes_whole_subtree() {
    let conn = setup();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let board = create_board(&store);
    let service = BoardService::new(&store);

    let parent = service.add_section(&board.id, None).unwrap();
    let child_a = service.add_section(&board.id, Some(&parent.id)).unwrap();
    let child_b = service.add_section(&board.id, Some(&parent.id)).unwrap();
    service.add_section(&board.id, None).unwrap();

    let mut session = BoardSession::open(&store, &board.id).unwrap();
    session.select(&parent.id).unwrap();
    let deleted = session.delete_section(|_| true).unwrap();

    assert!(deleted);
    assert!(session.focused().is_none());
    for id in [&parent.id, &child_a.id, &child_b.id] {
        assert!(find_section(&session.board().sections, id).is_none());
    }
    assert_eq!(session.display_list().len(), 1);

    let stored = store.fetch_board(&board.id).unwrap().unwrap();
    assert!(stored.find_section(&child_a.id).is_none());
    assert!(stored.find_section(&child_b.id).is_none());
}

#[test]
fn declined_delete_changes_nothing() {
    let conn = setup();
    let inner = SqliteBoardStore::try_new(&conn).unwrap();
    let board = create_board(&inner);
    let store = CountingStore::new(inner);
    let mut session = BoardSession::open(&store, &board.id).unwrap();
    let section = session.add_section().unwrap();
    session.select(&section.id).unwrap();
    let writes = store.persists.get();

    let deleted = session
        .delete_section(|focused| {
            assert_eq!(focused.id, section.id);
            false
        })
        .unwrap();

    assert!(!deleted);
    assert_eq!(store.persists.get(), writes);
    assert_eq!(session.focused().unwrap().id, section.id);
}

#[test]
fn delete_without_focus_is_rejected() {
    let conn = setup();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let board = create_board(&store);
    let mut session = BoardSession::open(&store, &board.id).unwrap();

    let err = session.delete_section(|_| true).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Navigation(NavigationError::NoFocusedSection)
    ));
}

#[test]
fn failed_write_keeps_optimistic_local_state() {
    let conn = setup();
    let inner = SqliteBoardStore::try_new(&conn).unwrap();
    let board = create_board(&inner);
    let store = CountingStore::new(inner);
    let mut session = BoardSession::open(&store, &board.id).unwrap();

    store.fail_writes.set(true);
    let err = session.add_section().unwrap_err();

    assert!(matches!(err, ServiceError::Store(StoreError::InvalidData(_))));
    assert_eq!(session.board().sections.len(), 1);
    let stored = store.fetch_board(&board.id).unwrap().unwrap();
    assert!(stored.sections.is_empty());
}

#[test]
fn remote_write_overwrites_local_state_on_sync() {
    let conn = setup();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let board = create_board(&store);
    let mut local = BoardSession::open(&store, &board.id).unwrap();
    let mut remote = BoardSession::open(&store, &board.id).unwrap();

    remote.add_section().unwrap();
    remote.add_section().unwrap();
    assert!(local.board().sections.is_empty());

    let drained = local.sync_remote();
    assert_eq!(drained, 2);
    assert_eq!(local.board().sections.len(), 2);
    assert_eq!(local.display_list().len(), 2);
    assert_eq!(local.board(), remote.board());
}

#[test]
fn closing_session_unsubscribes() {
    let conn = setup();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let board = create_board(&store);

    let session = BoardSession::open(&store, &board.id).unwrap();
    let dropped = BoardSession::open(&store, &board.id).unwrap();
    assert_eq!(store.subscriber_count(&board.id), 2);

    session.close();
    drop(dropped);
    assert_eq!(store.subscriber_count(&board.id), 0);
}

#[test]
fn breadcrumb_navigation_round_trip() {
    let conn = setup();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let board = create_board(&store);
    let service = BoardService::new(&store);
    let trip = service.add_section(&board.id, None).unwrap();
    let flights = service.add_section(&board.id, Some(&trip.id)).unwrap();

    let mut session = BoardSession::open(&store, &board.id).unwrap();
    let top_level = session.display_list().to_vec();
    session.select(&trip.id).unwrap();
    session.descend(&flights.id).unwrap();

    let crumbs = session.breadcrumbs();
    assert_eq!(crumbs.len(), 1);
    assert_eq!(crumbs[0].id, trip.id);
    assert_eq!(session.focused().unwrap().id, flights.id);

    session.jump_to(ROOT_PATH_INDEX).unwrap();
    assert_eq!(session.display_list(), top_level.as_slice());
    assert!(session.focused().is_none());
}

#[test]
fn sync_after_failed_write_keeps_local_edit() {
    let conn = setup();
    let inner = SqliteBoardStore::try_new(&conn).unwrap();
    let board = create_board(&inner);
    let store = CountingStore::new(inner);
    let mut session = BoardSession::open(&store, &board.id).unwrap();

    session.add_section().unwrap();
    store.fail_writes.set(true);
    session.add_section().unwrap_err();
    assert_eq!(session.board().sections.len(), 2);

    assert_eq!(session.sync_remote(), 0);
    assert_eq!(session.board().sections.len(), 2);
    assert_eq!(session.display_list().len(), 2);
}

#[test]
fn own_writes_are_not_queued_for_sync() {
    let conn = setup();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let board = create_board(&store);
    let mut session = BoardSession::open(&store, &board.id).unwrap();
    let section = session.add_section().unwrap();
    session
        .attach_file(
            &section.id,
            NewAttachment::new("map.bin", "", vec![7; 64 * 1024]),
        )
        .unwrap();

    for round in 0..50 {
        session.save_notes(&section.id, &format!("draft {round}")).unwrap();
    }

    assert_eq!(session.sync_remote(), 0);
    assert_eq!(session.board().sections[0].notes, "draft 49");
}

#[test]
fn only_newest_remote_version_is_kept() {
    let conn = setup();
    let store = SqliteBoardStore::try_new(&conn).unwrap();
    let board = create_board(&store);
    let mut local = BoardSession::open(&store, &board.id).unwrap();
    let service = BoardService::new(&store);

    for _ in 0..3 {
        service.add_section(&board.id, None).unwrap();
    }

    assert_eq!(local.sync_remote(), 3);
    assert_eq!(local.board().sections.len(), 3);
    assert_eq!(local.sync_remote(), 0);
}
