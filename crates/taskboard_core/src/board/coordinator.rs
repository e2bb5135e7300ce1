//! Optimistic move coordinator.
//!
//! # Responsibility
//! - Apply reorder results to the local board synchronously.
//! - Hand out one reassign request per applied move and reconcile its result.
//! - Roll back failed moves and keep them parked until the user retries or
//!   cancels.
//!
//! # Invariants
//! - A move that leaves display order unchanged issues no request.
//! - Every applied move is journaled with the exact collection it replaced.
//! - Rolling back the only outstanding move restores that collection exactly.
//! - Rolling back a move with later journaled moves restores its snapshot and
//!   re-applies the later moves, in order, on top of it.
//! - A parked failure never blocks further moves.

use crate::model::item::{Item, ItemId, WorkAreaId};
use crate::model::order::{OrderModel, OrderViolation};
use crate::reorder::{reorder, DropTarget, ReorderError, ReorderOutcome};
use crate::store::{MoveTicket, ReassignRequest, StoreResult};
use log::{info, warn};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandStatus {
    InFlight,
    Confirmed,
}

/// One applied move together with its inverse (the replaced collection).
#[derive(Debug, Clone)]
struct MoveCommand {
    request: ReassignRequest,
    target: DropTarget,
    snapshot: Vec<Item>,
    status: CommandStatus,
}

/// Rolled-back move awaiting a retry/cancel decision.
#[derive(Debug, Clone)]
struct ParkedMove {
    request: ReassignRequest,
    target: DropTarget,
    message: String,
    transient: bool,
}

/// Failure surfaced to the user after a rollback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveFailure {
    pub ticket: MoveTicket,
    pub item_id: ItemId,
    /// Persistence error text, for the prompt.
    pub message: String,
    /// Storage was busy; a retry is likely to succeed as-is.
    pub transient: bool,
}

/// Result of reconciling one persistence response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Stored; cached reads of the work area are now stale.
    Confirmed {
        ticket: MoveTicket,
        work_area: WorkAreaId,
    },
    /// Failed; local state was rolled back and the move is parked.
    RolledBack(MoveFailure),
    /// Ticket is not in flight (already completed or never issued).
    Unknown(MoveTicket),
}

/// Owner of one mounted board's authoritative item collection.
#[derive(Debug, Clone)]
pub struct MoveCoordinator {
    work_area: WorkAreaId,
    items: Vec<Item>,
    journal: Vec<MoveCommand>,
    parked: BTreeMap<MoveTicket, ParkedMove>,
    next_ticket: MoveTicket,
}

impl MoveCoordinator {
    /// Takes ownership of a freshly loaded board.
    ///
    /// # Errors
    /// - Returns the first invariant violation found in `items`.
    pub fn new(work_area: WorkAreaId, items: Vec<Item>) -> Result<Self, OrderViolation> {
        OrderModel::new(&items).validate()?;
        Ok(Self {
            work_area,
            items,
            journal: Vec::new(),
            parked: BTreeMap::new(),
            next_ticket: 1,
        })
    }

    pub fn work_area(&self) -> WorkAreaId {
        self.work_area
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn order_model(&self) -> OrderModel<'_> {
        OrderModel::new(&self.items)
    }

    /// Number of issued requests without a response yet.
    pub fn in_flight_count(&self) -> usize {
        self.journal
            .iter()
            .filter(|command| command.status == CommandStatus::InFlight)
            .count()
    }

    /// Parked failures in ticket order.
    pub fn pending_failures(&self) -> Vec<MoveFailure> {
        self.parked
            .iter()
            .map(|(ticket, parked)| MoveFailure {
                ticket: *ticket,
                item_id: parked.request.item_id,
                message: parked.message.clone(),
                transient: parked.transient,
            })
            .collect()
    }

    /// Replaces the board with authoritative data.
    ///
    /// Only valid while nothing is in flight; returns `Ok(false)` otherwise
    /// and leaves state untouched. Parked failures survive a reload.
    pub fn reload(&mut self, items: Vec<Item>) -> Result<bool, OrderViolation> {
        if self.in_flight_count() > 0 {
            return Ok(false);
        }
        OrderModel::new(&items).validate()?;
        self.items = items;
        self.journal.clear();
        Ok(true)
    }

    /// Applies a drop locally and returns the request to persist it.
    ///
    /// Returns `Ok(None)` when display order would not change; nothing is
    /// snapshotted or journaled in that case.
    ///
    /// # Errors
    /// - `ReorderError` when the item or target is unknown; state untouched.
    pub fn move_item(
        &mut self,
        item_id: ItemId,
        target: DropTarget,
    ) -> Result<Option<ReassignRequest>, ReorderError> {
        let plan = match reorder(&self.items, item_id, target)? {
            ReorderOutcome::Unchanged => return Ok(None),
            ReorderOutcome::Moved(plan) => plan,
        };

        let request = ReassignRequest {
            ticket: self.issue_ticket(),
            item_id,
            new_stage: plan.to.stage,
            new_rank: plan.to.rank,
            previous_stage: plan.from.stage,
        };
        let snapshot = std::mem::replace(&mut self.items, plan.items);
        self.journal.push(MoveCommand {
            request: request.clone(),
            target,
            snapshot,
            status: CommandStatus::InFlight,
        });

        info!(
            "event=board_move module=board status=applied ticket={} item={} from_stage={} to_stage={} rank={}",
            request.ticket,
            item_id,
            plan.from.stage.as_str(),
            plan.to.stage.as_str(),
            plan.to.rank
        );
        Ok(Some(request))
    }

    /// Reconciles the persistence response for `ticket`.
    pub fn complete(&mut self, ticket: MoveTicket, result: StoreResult<()>) -> Completion {
        let Some(index) = self.journal.iter().position(|command| {
            command.request.ticket == ticket && command.status == CommandStatus::InFlight
        }) else {
            warn!("event=board_complete module=board status=unknown_ticket ticket={ticket}");
            return Completion::Unknown(ticket);
        };

        match result {
            Ok(()) => {
                self.journal[index].status = CommandStatus::Confirmed;
                self.prune_settled();
                info!("event=board_complete module=board status=ok ticket={ticket}");
                Completion::Confirmed {
                    ticket,
                    work_area: self.work_area,
                }
            }
            Err(err) => {
                let failed = self.journal.remove(index);
                let replayed = self.journal.len() - index;
                self.items = failed.snapshot;
                self.replay_from(index);
                self.prune_settled();

                let message = err.to_string();
                let transient = err.is_transient();
                warn!(
                    "event=board_rollback module=board status=rolled_back ticket={} item={} replayed={} transient={} error={}",
                    ticket, failed.request.item_id, replayed, transient, message
                );
                let failure = MoveFailure {
                    ticket,
                    item_id: failed.request.item_id,
                    message: message.clone(),
                    transient,
                };
                self.parked.insert(
                    ticket,
                    ParkedMove {
                        request: failed.request,
                        target: failed.target,
                        message,
                        transient,
                    },
                );
                Completion::RolledBack(failure)
            }
        }
    }

    /// Re-applies a parked move and returns the identical request to replay.
    ///
    /// The local result is recomputed from the original drop target against
    /// the current board. Returns `None` for unknown tickets, or when the
    /// move can no longer be computed (the failure then stays parked).
    pub fn retry(&mut self, ticket: MoveTicket) -> Option<ReassignRequest> {
        let parked = self.parked.remove(&ticket)?;
        let snapshot = match reorder(&self.items, parked.request.item_id, parked.target) {
            Ok(ReorderOutcome::Moved(plan)) => std::mem::replace(&mut self.items, plan.items),
            Ok(ReorderOutcome::Unchanged) => self.items.clone(),
            Err(err) => {
                warn!(
                    "event=board_retry module=board status=error ticket={ticket} error={err}"
                );
                self.parked.insert(ticket, parked);
                return None;
            }
        };

        self.journal.push(MoveCommand {
            request: parked.request.clone(),
            target: parked.target,
            snapshot,
            status: CommandStatus::InFlight,
        });
        info!("event=board_retry module=board status=reissued ticket={ticket}");
        Some(parked.request)
    }

    /// Accepts the rollback of a parked move as final.
    ///
    /// Returns whether `ticket` was parked.
    pub fn cancel(&mut self, ticket: MoveTicket) -> bool {
        let removed = self.parked.remove(&ticket).is_some();
        if removed {
            info!("event=board_cancel module=board status=ok ticket={ticket}");
        }
        removed
    }

    fn issue_ticket(&mut self) -> MoveTicket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }

    /// Re-applies journaled moves from `start` on top of current items.
    fn replay_from(&mut self, start: usize) {
        for command in self.journal.iter_mut().skip(start) {
            command.snapshot = self.items.clone();
            match reorder(&self.items, command.request.item_id, command.target) {
                Ok(ReorderOutcome::Moved(plan)) => self.items = plan.items,
                Ok(ReorderOutcome::Unchanged) => {}
                Err(err) => warn!(
                    "event=board_replay module=board status=skipped ticket={} error={}",
                    command.request.ticket, err
                ),
            }
        }
    }

    /// Drops leading confirmed commands; nothing before them can roll back.
    fn prune_settled(&mut self) {
        let settled = self
            .journal
            .iter()
            .take_while(|command| command.status == CommandStatus::Confirmed)
            .count();
        self.journal.drain(..settled);
    }
}
