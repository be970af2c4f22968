//! Board document store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the one-shot read, push subscription, and whole-document upsert
//!   operations the orchestration layer depends on.
//! - Keep SQL and JSON document encoding inside the persistence boundary.
//!
//! # Invariants
//! - One row per board, keyed by board id; writes replace the whole document.
//! - Subscribers are notified only after a write succeeded.
//! - Listeners run outside the registry lock.
//! - Read paths reject corrupt documents instead of masking them.

use crate::db::migrations::{latest_version, missing_board_tables, schema_version};
use crate::db::DbError;
use crate::model::board::{Board, BoardId, Theme};
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

pub type StoreResult<T> = Result<T, StoreError>;

/// Callback receiving every persisted version of a subscribed board.
pub type BoardListener = Arc<dyn Fn(&Board) + Send + Sync>;

/// Errors from board store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target board does not exist.
    NotFound(BoardId),
    /// Stored document or schema is not usable.
    InvalidData(String),
    /// Board could not be encoded as JSON.
    Serialize(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "board not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid board data: {message}"),
            Self::Serialize(err) => write!(f, "failed to encode board document: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Listing projection of one stored board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSummary {
    pub id: BoardId,
    pub title: String,
    pub theme: Theme,
    /// Number of top-level sections.
    pub section_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Board> for BoardSummary {
    fn from(board: &Board) -> Self {
        Self {
            id: board.id.clone(),
            title: board.title.clone(),
            theme: board.theme,
            section_count: board.sections.len(),
            created_at: board.created_at,
            updated_at: board.updated_at,
        }
    }
}

/// Persistence gateway for whole board documents.
pub trait BoardStore {
    /// Loads one board, or `None` when no document exists for `id`.
    fn fetch_board(&self, id: &str) -> StoreResult<Option<Board>>;
    /// Registers `listener` for every later write of board `id`.
    fn subscribe_board(&self, id: &str, listener: BoardListener) -> StoreResult<Subscription>;
    /// Upserts the whole document keyed by `board.id`.
    fn persist_board(&self, board: &Board) -> StoreResult<()>;
    /// Lists stored boards, most recently updated first.
    fn list_boards(&self) -> StoreResult<Vec<BoardSummary>>;
    /// Deletes one board document.
    fn delete_board(&self, id: &str) -> StoreResult<()>;
}

impl<T: BoardStore + ?Sized> BoardStore for &T {
    fn fetch_board(&self, id: &str) -> StoreResult<Option<Board>> {
        (**self).fetch_board(id)
    }

    fn subscribe_board(&self, id: &str, listener: BoardListener) -> StoreResult<Subscription> {
        (**self).subscribe_board(id, listener)
    }

    fn persist_board(&self, board: &Board) -> StoreResult<()> {
        (**self).persist_board(board)
    }

    fn list_boards(&self) -> StoreResult<Vec<BoardSummary>> {
        (**self).list_boards()
    }

    fn delete_board(&self, id: &str) -> StoreResult<()> {
        (**self).delete_board(id)
    }
}

/// Handle for one active board subscription.
///
/// Dropping the handle unsubscribes; `unsubscribe` does the same eagerly.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wraps a teardown callback run exactly once.
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// Stops delivery immediately.
    pub fn unsubscribe(mut self) {
        self.run_teardown();
    }

    fn run_teardown(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_teardown();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.teardown.is_some())
            .finish()
    }
}

#[derive(Default)]
struct RegistryInner {
    next_token: u64,
    listeners: BTreeMap<BoardId, Vec<(u64, BoardListener)>>,
}

/// In-process fan-out of persisted boards to their subscribers.
///
/// Cloning shares the same registry.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one listener and returns its teardown handle.
    pub fn register(&self, board_id: &str, listener: BoardListener) -> Subscription {
        let token = {
            let mut inner = lock(&self.inner);
            let token = inner.next_token;
            inner.next_token += 1;
            inner
                .listeners
                .entry(board_id.to_string())
                .or_default()
                .push((token, listener));
            token
        };
        debug!("event=board_subscribe module=repo status=ok board_id={board_id} token={token}");

        let weak: Weak<Mutex<RegistryInner>> = Arc::downgrade(&self.inner);
        let board_id = board_id.to_string();
        Subscription::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut inner = lock(&inner);
            if let Some(entries) = inner.listeners.get_mut(&board_id) {
                entries.retain(|(current, _)| *current != token);
                if entries.is_empty() {
                    inner.listeners.remove(&board_id);
                }
            }
            debug!(
                "event=board_unsubscribe module=repo status=ok board_id={board_id} token={token}"
            );
        })
    }

    /// Delivers `board` to every listener registered for its id.
    pub fn notify(&self, board: &Board) {
        let listeners: Vec<BoardListener> = {
            let inner = lock(&self.inner);
            inner
                .listeners
                .get(&board.id)
                .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default()
        };
        for listener in listeners {
            listener(board);
        }
    }

    /// Number of live listeners for one board.
    pub fn listener_count(&self, board_id: &str) -> usize {
        lock(&self.inner)
            .listeners
            .get(board_id)
            .map_or(0, Vec::len)
    }
}

fn lock(inner: &Mutex<RegistryInner>) -> MutexGuard<'_, RegistryInner> {
    // A panicking listener never runs under the lock, so poisoned state is still consistent.
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// SQLite-backed board document store.
pub struct SqliteBoardStore<'conn> {
    conn: &'conn Connection,
    listeners: ListenerRegistry,
}

impl<'conn> SqliteBoardStore<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_board_connection_ready(conn)?;
        Ok(Self {
            conn,
            listeners: ListenerRegistry::new(),
        })
    }

    /// Number of live subscriptions for one board.
    pub fn subscriber_count(&self, board_id: &str) -> usize {
        self.listeners.listener_count(board_id)
    }
}

impl BoardStore for SqliteBoardStore<'_> {
    fn fetch_board(&self, id: &str) -> StoreResult<Option<Board>> {
        let document: Option<String> = self
            .conn
            .query_row(
                "SELECT document FROM boards WHERE board_id = ?1;",
                [id],
                |row| row.get(0),
            )
            .optional()?;

        document
            .map(|text| parse_board_document(id, &text))
            .transpose()
    }

    fn subscribe_board(&self, id: &str, listener: BoardListener) -> StoreResult<Subscription> {
        Ok(self.listeners.register(id, listener))
    }

    fn persist_board(&self, board: &Board) -> StoreResult<()> {
        if board.id.trim().is_empty() {
            return Err(StoreError::InvalidData(
                "board id must not be empty".to_string(),
            ));
        }
        let document = serde_json::to_string(board).map_err(StoreError::Serialize)?;

        let result = self.conn.execute(
            "INSERT INTO boards (board_id, title, document, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(board_id) DO UPDATE SET
                title = excluded.title,
                document = excluded.document,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at;",
            params![
                board.id.as_str(),
                board.title.as_str(),
                document,
                board.created_at.timestamp_millis(),
                board.updated_at.timestamp_millis(),
            ],
        );
        if let Err(err) = result {
            error!(
                "event=board_persist module=repo status=error board_id={} error={}",
                board.id, err
            );
            return Err(err.into());
        }

        info!(
            "event=board_persist module=repo status=ok board_id={} sections={} bytes={}",
            board.id,
            board.section_count(),
            document.len()
        );
        self.listeners.notify(board);
        Ok(())
    }

    fn list_boards(&self) -> StoreResult<Vec<BoardSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT board_id, document
             FROM boards
             ORDER BY updated_at DESC, board_id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            let board = parse_board_row(row)?;
            items.push(BoardSummary::from(&board));
        }
        Ok(items)
    }

    fn delete_board(&self, id: &str) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM boards WHERE board_id = ?1;", [id])?;
        if changed == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        info!("event=board_delete module=repo status=ok board_id={id}");
        Ok(())
    }
}

fn parse_board_row(row: &Row<'_>) -> StoreResult<Board> {
    let id: String = row.get("board_id")?;
    let document: String = row.get("document")?;
    parse_board_document(&id, &document)
}

fn parse_board_document(id: &str, document: &str) -> StoreResult<Board> {
    let board: Board = serde_json::from_str(document).map_err(|err| {
        StoreError::InvalidData(format!("board `{id}` has unreadable document: {err}"))
    })?;
    if board.id != id {
        return Err(StoreError::InvalidData(format!(
            "board document id `{}` does not match key `{id}`",
            board.id
        )));
    }
    Ok(board)
}

fn ensure_board_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(StoreError::InvalidData(format!(
            "board store requires schema version {expected_version}, got {actual_version}"
        )));
    }

    let missing = missing_board_tables(conn)?;
    if !missing.is_empty() {
        return Err(StoreError::InvalidData(format!(
            "board store requires tables: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}
