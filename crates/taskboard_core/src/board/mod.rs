//! Board orchestration: optimistic moves and session wiring.
//!
//! # Responsibility
//! - Own the authoritative item collection of a mounted board.
//! - Connect drag intents, local apply, persistence and cache invalidation.
//!
//! # Invariants
//! - All mutation happens on the caller's thread; there is no internal
//!   locking.

use crate::cache::ReadCache;
use crate::drag::DragConfig;
use crate::model::item::Item;
use serde::{Deserialize, Serialize};

pub mod coordinator;
pub mod session;

pub use coordinator::{Completion, MoveCoordinator, MoveFailure};
pub use session::{BoardError, BoardEvent, BoardSession, FailureDecision};

/// Read cache holding board item collections.
pub type ItemCache = ReadCache<Vec<Item>>;

/// Host-supplied board settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub drag: DragConfig,
}
