//! Board session: one mounted board wired end to end.
//!
//! # Responsibility
//! - Load a work area through the read cache, fetching only on a miss.
//! - Route pointer events through the drag controller into the coordinator.
//! - Persist issued requests and keep the cache consistent with results.
//!
//! # Invariants
//! - Local state changes before any persistence call is made.
//! - Local moves and rollbacks are written through to the cache; a
//!   confirmed move invalidates the `(Items, work area)` entry.
//! - The session never owns the cache or the store; both outlive it.

use crate::board::coordinator::{Completion, MoveCoordinator};
use crate::board::{BoardConfig, ItemCache};
use crate::cache::CacheKey;
use crate::drag::{DragController, DragOutcome, PointerEvent};
use crate::model::item::{Item, ItemId, WorkAreaId};
use crate::model::order::OrderViolation;
use crate::reorder::{DropTarget, ReorderError};
use crate::store::{BoardStore, MoveTicket, ReassignRequest, StoreError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from board session setup and refresh.
#[derive(Debug)]
pub enum BoardError {
    Store(StoreError),
    /// Loaded data breaks ordering invariants.
    InvalidBoard(OrderViolation),
}

impl Display for BoardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::InvalidBoard(violation) => write!(f, "invalid board: {violation}"),
        }
    }
}

impl Error for BoardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::InvalidBoard(violation) => Some(violation),
        }
    }
}

impl From<StoreError> for BoardError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<OrderViolation> for BoardError {
    fn from(value: OrderViolation) -> Self {
        Self::InvalidBoard(value)
    }
}

/// User decision on a rolled-back move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDecision {
    /// Replay the identical persistence call.
    Retry,
    /// Keep the rollback.
    Cancel,
}

/// What one pointer event did to the board.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    /// Drag bookkeeping only; board unchanged.
    Gesture(DragOutcome),
    /// Press-and-release without drag: open the item's detail view.
    OpenItem(ItemId),
    /// Drop applied locally; the request still has to be persisted.
    MoveApplied(ReassignRequest),
    /// Drop landed where it already was.
    NoChange,
    /// Drop could not be computed; board unchanged.
    MoveRejected(ReorderError),
}

/// One visible board.
#[derive(Debug, Clone)]
pub struct BoardSession {
    drag: DragController,
    coordinator: MoveCoordinator,
}

impl BoardSession {
    /// Opens `work_area`, serving from `cache` when possible.
    ///
    /// # Errors
    /// - Store failures on a cache miss.
    /// - `InvalidBoard` when the loaded items break ordering invariants.
    pub fn open<S: BoardStore>(
        work_area: WorkAreaId,
        store: &S,
        cache: &mut ItemCache,
        config: BoardConfig,
    ) -> Result<Self, BoardError> {
        let key = CacheKey::items(work_area);
        let items = match cache.get(&key) {
            Some(cached) => {
                info!("event=board_open module=board source=cache work_area={work_area}");
                (*cached).clone()
            }
            None => {
                let fetched = store.fetch_items(work_area)?;
                info!(
                    "event=board_open module=board source=store work_area={} count={}",
                    work_area,
                    fetched.len()
                );
                cache.set(key, fetched.clone());
                fetched
            }
        };

        Ok(Self {
            drag: DragController::new(config.drag),
            coordinator: MoveCoordinator::new(work_area, items)?,
        })
    }

    pub fn work_area(&self) -> WorkAreaId {
        self.coordinator.work_area()
    }

    pub fn items(&self) -> &[Item] {
        self.coordinator.items()
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn coordinator(&self) -> &MoveCoordinator {
        &self.coordinator
    }

    /// Feeds one pointer event; a finished drag is applied immediately.
    pub fn handle_pointer(&mut self, event: PointerEvent, cache: &mut ItemCache) -> BoardEvent {
        match self.drag.handle(event) {
            DragOutcome::Clicked { item_id } => BoardEvent::OpenItem(item_id),
            DragOutcome::Dropped {
                item_id, target, ..
            } => self.drop_item(item_id, target, cache),
            other => BoardEvent::Gesture(other),
        }
    }

    /// Applies a drop that did not come from the pointer stream
    /// (keyboard moves, context-menu "move to").
    pub fn drop_item(
        &mut self,
        item_id: ItemId,
        target: DropTarget,
        cache: &mut ItemCache,
    ) -> BoardEvent {
        match self.coordinator.move_item(item_id, target) {
            Ok(Some(request)) => {
                self.write_through(cache);
                BoardEvent::MoveApplied(request)
            }
            Ok(None) => BoardEvent::NoChange,
            Err(err) => {
                warn!("event=board_move module=board status=rejected item={item_id} error={err}");
                BoardEvent::MoveRejected(err)
            }
        }
    }

    /// Sends `request` to storage and reconciles the response.
    pub fn persist<S: BoardStore>(
        &mut self,
        request: &ReassignRequest,
        store: &S,
        cache: &mut ItemCache,
    ) -> Completion {
        let result = store.reassign(request);
        self.complete(request.ticket, result, cache)
    }

    /// Reconciles a response that arrived through another channel.
    ///
    /// Success drops the cached items of this work area so the next open
    /// reads authoritative ranks; a rollback is written through instead.
    pub fn complete(
        &mut self,
        ticket: MoveTicket,
        result: Result<(), StoreError>,
        cache: &mut ItemCache,
    ) -> Completion {
        let completion = self.coordinator.complete(ticket, result);
        match &completion {
            Completion::Confirmed { work_area, .. } => {
                cache.invalidate(&CacheKey::items(*work_area));
            }
            Completion::RolledBack(_) => self.write_through(cache),
            Completion::Unknown(_) => {}
        }
        completion
    }

    /// Applies the user's decision on a parked failure.
    ///
    /// Returns the replayed request for `Retry`, which the caller persists
    /// like any other.
    pub fn resolve_failure(
        &mut self,
        ticket: MoveTicket,
        decision: FailureDecision,
        cache: &mut ItemCache,
    ) -> Option<ReassignRequest> {
        match decision {
            FailureDecision::Retry => {
                let request = self.coordinator.retry(ticket)?;
                self.write_through(cache);
                Some(request)
            }
            FailureDecision::Cancel => {
                self.coordinator.cancel(ticket);
                None
            }
        }
    }

    /// Reloads authoritative data into the board and the cache.
    ///
    /// Returns `Ok(false)` without fetching while requests are in flight.
    pub fn refresh<S: BoardStore>(
        &mut self,
        store: &S,
        cache: &mut ItemCache,
    ) -> Result<bool, BoardError> {
        if self.coordinator.in_flight_count() > 0 {
            return Ok(false);
        }
        let work_area = self.work_area();
        let items = store.fetch_items(work_area)?;
        self.coordinator.reload(items.clone())?;
        cache.set(CacheKey::items(work_area), items);
        Ok(true)
    }

    fn write_through(&self, cache: &mut ItemCache) {
        cache.set(CacheKey::items(self.work_area()), self.items().to_vec());
    }
}
