//! Read-only ordering projection over a board's item collection.
//!
//! # Responsibility
//! - Answer "which items are in this stage, in which order".
//! - Detect collections that break ordering invariants.
//!
//! # Invariants
//! - Two items of one stage never share a rank.
//! - Display order within a stage is ascending rank order.
//! - Every item belongs to exactly one stage (one `Item` per id).

use crate::model::item::{Item, ItemId, Placement};
use crate::model::stage::Stage;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Invariant violation found in an item collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderViolation {
    /// Same id appears more than once (breaks stage closure).
    DuplicateItem(ItemId),
    /// Two items of one stage share a rank.
    DuplicateRank { stage: Stage, rank: i64 },
}

impl Display for OrderViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateItem(id) => write!(f, "item appears more than once: {id}"),
            Self::DuplicateRank { stage, rank } => write!(
                f,
                "stage `{}` has more than one item at rank {rank}",
                stage.as_str()
            ),
        }
    }
}

impl Error for OrderViolation {}

/// Ordering view over a borrowed item slice.
#[derive(Debug, Clone, Copy)]
pub struct OrderModel<'a> {
    items: &'a [Item],
}

impl<'a> OrderModel<'a> {
    pub fn new(items: &'a [Item]) -> Self {
        Self { items }
    }

    /// Fixed stage list in display order. Never derived from data.
    pub fn all_stages() -> &'static [Stage] {
        &Stage::ALL
    }

    pub fn items(&self) -> &'a [Item] {
        self.items
    }

    /// Items of `stage`, ascending by rank.
    pub fn items_in_stage(&self, stage: Stage) -> Vec<&'a Item> {
        let mut items = self
            .items
            .iter()
            .filter(|item| item.stage == stage)
            .collect::<Vec<_>>();
        // Id tie-break keeps output deterministic even for invalid input.
        items.sort_by(|left, right| left.rank.cmp(&right.rank).then(left.id.cmp(&right.id)));
        items
    }

    /// Display order of `stage` as item ids.
    pub fn order_of(&self, stage: Stage) -> Vec<ItemId> {
        self.items_in_stage(stage)
            .into_iter()
            .map(|item| item.id)
            .collect()
    }

    /// Display order of every stage, in stage order.
    pub fn display_order(&self) -> Vec<(Stage, Vec<ItemId>)> {
        Self::all_stages()
            .iter()
            .map(|stage| (*stage, self.order_of(*stage)))
            .collect()
    }

    pub fn get(&self, id: ItemId) -> Option<&'a Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn placement_of(&self, id: ItemId) -> Option<Placement> {
        self.get(id).map(Item::placement)
    }

    /// Highest rank present in `stage`, if the stage is not empty.
    pub fn max_rank(&self, stage: Stage) -> Option<i64> {
        self.items
            .iter()
            .filter(|item| item.stage == stage)
            .map(|item| item.rank)
            .max()
    }

    /// Checks rank uniqueness per stage and id uniqueness over the collection.
    ///
    /// # Errors
    /// - `DuplicateItem` when an id occurs twice.
    /// - `DuplicateRank` when a stage holds two items with the same rank.
    pub fn validate(&self) -> Result<(), OrderViolation> {
        let mut seen_ids = HashSet::with_capacity(self.items.len());
        let mut seen_ranks: HashMap<Stage, HashSet<i64>> = HashMap::new();
        for item in self.items {
            if !seen_ids.insert(item.id) {
                return Err(OrderViolation::DuplicateItem(item.id));
            }
            if !seen_ranks.entry(item.stage).or_default().insert(item.rank) {
                return Err(OrderViolation::DuplicateRank {
                    stage: item.stage,
                    rank: item.rank,
                });
            }
        }
        Ok(())
    }
}
