//! Core ordering engine for the task board.
//! This crate is the single source of truth for board ordering invariants.

pub mod board;
pub mod cache;
pub mod db;
pub mod drag;
pub mod logging;
pub mod model;
pub mod reorder;
pub mod store;

pub use board::{
    BoardConfig, BoardError, BoardEvent, BoardSession, Completion, FailureDecision, ItemCache,
    MoveCoordinator, MoveFailure,
};
pub use cache::{CacheKey, CacheStats, DataKind, ReadCache};
pub use drag::{
    CancelReason, DragConfig, DragController, DragOutcome, DragSession, DragState, Point,
    PointerEvent,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::item::{parse_priority, Item, ItemId, Placement, Priority, WorkAreaId};
pub use model::order::{OrderModel, OrderViolation};
pub use model::stage::{parse_stage, Stage};
pub use reorder::{reorder, DropTarget, ReorderError, ReorderOutcome, ReorderPlan};
pub use store::{
    BoardStore, MoveTicket, ReassignRequest, SqliteBoardStore, StoreError, StoreResult,
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
