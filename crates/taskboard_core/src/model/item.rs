//! Board item record.
//!
//! # Responsibility
//! - Define the unit of work shown on the board.
//! - Keep ordering fields (`stage`, `rank`) separate from CRUD payload.
//!
//! # Invariants
//! - `id` is stable and never reused for another item.
//! - `rank` is meaningful only relative to other items of the same stage.

use crate::model::stage::Stage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable item identifier.
pub type ItemId = Uuid;

/// Identifier of one board (work area). Cache keys and item collections are
/// partitioned by it.
pub type WorkAreaId = Uuid;

/// Optional priority label owned by the CRUD layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// Parses one priority from its stable string id.
pub fn parse_priority(value: &str) -> Option<Priority> {
    match value.trim() {
        "low" => Some(Priority::Low),
        "medium" => Some(Priority::Medium),
        "high" => Some(Priority::High),
        "urgent" => Some(Priority::Urgent),
        _ => None,
    }
}

/// Position of one item on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub stage: Stage,
    pub rank: i64,
}

impl Placement {
    pub fn new(stage: Stage, rank: i64) -> Self {
        Self { stage, rank }
    }
}

/// One unit of work on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable id used by persistence and drag sessions.
    pub id: ItemId,
    /// Column the item currently belongs to.
    pub stage: Stage,
    /// Relative order key within `stage`. Not guaranteed contiguous at rest.
    pub rank: i64,
    /// Display title. Opaque to ordering.
    pub title: String,
    /// Opaque to ordering.
    pub priority: Option<Priority>,
}

impl Item {
    /// Creates an item with a generated id.
    pub fn new(stage: Stage, rank: i64, title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), stage, rank, title)
    }

    /// Creates an item with a caller-provided id.
    ///
    /// Used by storage and fixtures where identity already exists.
    pub fn with_id(id: ItemId, stage: Stage, rank: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            stage,
            rank,
            title: title.into(),
            priority: None,
        }
    }

    pub fn placement(&self) -> Placement {
        Placement::new(self.stage, self.rank)
    }

    /// Returns a copy of this item at `placement`.
    ///
    /// Stage and rank change together so a moved item is never observed
    /// half-updated.
    pub fn placed_at(&self, placement: Placement) -> Self {
        Self {
            stage: placement.stage,
            rank: placement.rank,
            ..self.clone()
        }
    }
}
