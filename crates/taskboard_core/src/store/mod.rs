//! Persistence contract consumed by the board engine.
//!
//! # Responsibility
//! - Define the two external calls the engine depends on: bulk fetch and
//!   single-item reassign.
//! - Provide the SQLite-backed implementation used by the app shell.
//!
//! # Invariants
//! - `reassign` stores the new stage and a rank consistent with the
//!   requested order; raw rank values may differ from the client's guess.
//! - Replaying the same `reassign` request yields the same final ordering.

use crate::db::DbError;
use crate::model::item::{Item, ItemId, WorkAreaId};
use crate::model::stage::Stage;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod sqlite_store;

pub use sqlite_store::SqliteBoardStore;

/// Monotonic id of one issued reassign request within a board session.
pub type MoveTicket = u64;

pub type StoreResult<T> = Result<T, StoreError>;

/// One persistence call describing an optimistic move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignRequest {
    /// Session-local correlation id; not sent to storage.
    pub ticket: MoveTicket,
    pub item_id: ItemId,
    pub new_stage: Stage,
    pub new_rank: i64,
    pub previous_stage: Stage,
}

/// Errors from board persistence.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Item does not exist in storage.
    ItemNotFound(ItemId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted rows cannot be converted into a valid board.
    InvalidData(String),
    /// Request refused by validation.
    Rejected(String),
}

impl StoreError {
    /// Whether retrying the same request may succeed without user changes.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Db(err) => err.is_transient(),
            _ => false,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ItemNotFound(id) => write!(f, "board item not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "board store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "board store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "board store requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid board data: {message}"),
            Self::Rejected(message) => write!(f, "request rejected: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
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

/// Storage operations the board engine consumes.
pub trait BoardStore {
    /// Loads every item of one work area, ordered by stage then rank.
    fn fetch_items(&self, work_area: WorkAreaId) -> StoreResult<Vec<Item>>;
    /// Durably moves one item to `new_stage` at `new_rank`.
    fn reassign(&self, request: &ReassignRequest) -> StoreResult<()>;
}

impl<S: BoardStore + ?Sized> BoardStore for &S {
    fn fetch_items(&self, work_area: WorkAreaId) -> StoreResult<Vec<Item>> {
        (**self).fetch_items(work_area)
    }

    fn reassign(&self, request: &ReassignRequest) -> StoreResult<()> {
        (**self).reassign(request)
    }
}
