//! Pure reorder computation for drag-and-drop moves.
//!
//! # Responsibility
//! - Turn "item X dropped on target T" into a full replacement collection.
//! - Detect drops that leave every stage's display order unchanged.
//!
//! # Invariants
//! - Same inputs always produce the same output; the input is never mutated.
//! - Output has unique ranks per stage and unique ids, or no output is
//!   produced.
//! - Output keeps the input's item sequence, so results compare by value.

use crate::model::item::{Item, ItemId, Placement};
use crate::model::order::{OrderModel, OrderViolation};
use crate::model::stage::Stage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Where a dragged item was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DropTarget {
    /// Column background: append to the end of that stage.
    Stage(Stage),
    /// Another card: insert adjacent to it, in its stage.
    Item(ItemId),
}

/// Result of a successful reorder computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// Display order would not change; nothing to apply or persist.
    Unchanged,
    Moved(ReorderPlan),
}

/// Replacement collection plus the moved item's before/after placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan {
    pub items: Vec<Item>,
    pub item_id: ItemId,
    pub from: Placement,
    pub to: Placement,
}

/// Misuse of the reorder algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderError {
    /// Moved item is not part of the collection.
    ItemNotFound(ItemId),
    /// Target item is not part of the collection.
    TargetNotFound(ItemId),
    /// Input collection already breaks ordering invariants.
    InvalidInput(OrderViolation),
    /// Computed collection would break ordering invariants.
    InvariantBroken(OrderViolation),
}

impl Display for ReorderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemNotFound(id) => write!(f, "moved item not found: {id}"),
            Self::TargetNotFound(id) => write!(f, "drop target item not found: {id}"),
            Self::InvalidInput(violation) => write!(f, "invalid board state: {violation}"),
            Self::InvariantBroken(violation) => {
                write!(f, "reorder would break board ordering: {violation}")
            }
        }
    }
}

impl Error for ReorderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(violation) | Self::InvariantBroken(violation) => Some(violation),
            Self::ItemNotFound(_) | Self::TargetNotFound(_) => None,
        }
    }
}

enum Insertion {
    /// Append after the current maximum rank of the stage.
    Append(Stage),
    /// Insert at a display index of the moved item's own stage.
    Within { stage: Stage, index: usize },
}

/// Computes the board after dropping `moved_id` on `target`.
///
/// Rules:
/// - Stage target: the item takes `max rank + 1` in that stage (0 when empty).
///   When `max rank` is already `i64::MAX`, the stage is re-ranked densely from
///   zero and the item appended after it.
/// - Item target in the same stage: the item is removed and re-inserted at the
///   target's display index, so it lands after the target when moving down and
///   before it when moving up. The stage is re-ranked densely from zero.
/// - Item target in another stage: same as dropping on that stage.
/// - The origin stage is re-ranked densely from zero when the item leaves it.
///
/// # Errors
/// - `ItemNotFound` / `TargetNotFound` for ids missing from `items`.
/// - `InvalidInput` when `items` already holds duplicate ids or ranks.
pub fn reorder(
    items: &[Item],
    moved_id: ItemId,
    target: DropTarget,
) -> Result<ReorderOutcome, ReorderError> {
    let model = OrderModel::new(items);
    model.validate().map_err(ReorderError::InvalidInput)?;

    let from = model
        .placement_of(moved_id)
        .ok_or(ReorderError::ItemNotFound(moved_id))?;

    let insertion = match target {
        DropTarget::Stage(stage) => Insertion::Append(stage),
        DropTarget::Item(target_id) if target_id == moved_id => {
            return Ok(ReorderOutcome::Unchanged);
        }
        DropTarget::Item(target_id) => {
            let target_item = model
                .get(target_id)
                .ok_or(ReorderError::TargetNotFound(target_id))?;
            if target_item.stage == from.stage {
                let index = model
                    .order_of(from.stage)
                    .iter()
                    .position(|id| *id == target_id)
                    .ok_or(ReorderError::TargetNotFound(target_id))?;
                Insertion::Within {
                    stage: from.stage,
                    index,
                }
            } else {
                Insertion::Append(target_item.stage)
            }
        }
    };

    let mut origin_order = model.order_of(from.stage);
    origin_order.retain(|id| *id != moved_id);

    let mut placements: HashMap<ItemId, Placement> = HashMap::new();
    let to = match insertion {
        Insertion::Within { stage, index } => {
            let index = index.min(origin_order.len());
            origin_order.insert(index, moved_id);
            assign_dense(&mut placements, stage, &origin_order);
            placements[&moved_id]
        }
        Insertion::Append(stage) if stage == from.stage => {
            origin_order.push(moved_id);
            assign_dense(&mut placements, stage, &origin_order);
            placements[&moved_id]
        }
        Insertion::Append(stage) => {
            assign_dense(&mut placements, from.stage, &origin_order);
            match model.max_rank(stage).map(|max| max.checked_add(1)) {
                None => {
                    placements.insert(moved_id, Placement::new(stage, 0));
                }
                Some(Some(rank)) => {
                    placements.insert(moved_id, Placement::new(stage, rank));
                }
                Some(None) => {
                    let mut order = model.order_of(stage);
                    order.push(moved_id);
                    assign_dense(&mut placements, stage, &order);
                }
            }
            placements[&moved_id]
        }
    };

    let next_items = items
        .iter()
        .map(|item| match placements.get(&item.id) {
            Some(placement) if *placement != item.placement() => item.placed_at(*placement),
            _ => item.clone(),
        })
        .collect::<Vec<_>>();

    let next_model = OrderModel::new(&next_items);
    next_model
        .validate()
        .map_err(ReorderError::InvariantBroken)?;

    if next_model.display_order() == model.display_order() {
        return Ok(ReorderOutcome::Unchanged);
    }

    Ok(ReorderOutcome::Moved(ReorderPlan {
        items: next_items,
        item_id: moved_id,
        from,
        to,
    }))
}

fn assign_dense(placements: &mut HashMap<ItemId, Placement>, stage: Stage, order: &[ItemId]) {
    for (index, id) in order.iter().enumerate() {
        placements.insert(*id, Placement::new(stage, index as i64));
    }
}

#[cfg(test)]
mod tests {
    use super::{reorder, DropTarget, ReorderError, ReorderOutcome};
    use crate::model::item::Item;
    use crate::model::stage::Stage;
    use uuid::Uuid;

    #[test]
    fn unknown_moved_item_is_refused() {
        let items = vec![Item::new(Stage::Backlog, 0, "a")];
        let missing = Uuid::new_v4();
        assert_eq!(
            reorder(&items, missing, DropTarget::Stage(Stage::Done)),
            Err(ReorderError::ItemNotFound(missing))
        );
    }

    #[test]
    fn unknown_target_item_is_refused() {
        let items = vec![Item::new(Stage::Backlog, 0, "a")];
        let missing = Uuid::new_v4();
        assert_eq!(
            reorder(&items, items[0].id, DropTarget::Item(missing)),
            Err(ReorderError::TargetNotFound(missing))
        );
    }

    #[test]
    fn invalid_input_is_refused() {
        let items = vec![
            Item::new(Stage::Backlog, 0, "a"),
            Item::new(Stage::Backlog, 0, "b"),
        ];
        let result = reorder(&items, items[0].id, DropTarget::Stage(Stage::Done));
        assert!(matches!(result, Err(ReorderError::InvalidInput(_))));
    }

    #[test]
    fn append_after_max_rank_densifies_destination() {
        let items = vec![
            Item::new(Stage::Backlog, i64::MAX, "a"),
            Item::new(Stage::Done, 0, "b"),
        ];
        let Ok(ReorderOutcome::Moved(plan)) =
            reorder(&items, items[1].id, DropTarget::Stage(Stage::Backlog))
        else {
            panic!("move into a saturated stage should apply");
        };
        assert_eq!(plan.items[0].rank, 0);
        assert_eq!(plan.items[1].stage, Stage::Backlog);
        assert_eq!(plan.items[1].rank, 1);
        assert_eq!(plan.to.rank, 1);
    }

    #[test]
    fn drop_on_own_stage_when_already_last_is_unchanged() {
        let items = vec![
            Item::new(Stage::Backlog, 0, "a"),
            Item::new(Stage::Backlog, 1, "b"),
        ];
        assert_eq!(
            reorder(&items, items[1].id, DropTarget::Stage(Stage::Backlog)),
            Ok(ReorderOutcome::Unchanged)
        );
    }
}
