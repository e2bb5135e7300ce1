//! Abstract pointer event stream fed into the drag controller.
//!
//! Any concrete drag-and-drop toolkit can be adapted to emit these events.

use crate::model::item::{ItemId, Placement};
use crate::reorder::DropTarget;
use serde::{Deserialize, Serialize};

/// Pointer position in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Why a gesture ended without a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// User pressed escape.
    Escape,
    /// Pointer capture was lost (window blur, OS gesture, ...).
    LostCapture,
}

/// One raw pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEvent {
    /// Pointer pressed on an item card.
    Down {
        item_id: ItemId,
        origin: Placement,
        at: Point,
    },
    /// Pointer moved; `hover` is whatever stage or card is under it.
    Move {
        at: Point,
        hover: Option<DropTarget>,
    },
    /// Pointer released.
    Up,
    Cancel { reason: CancelReason },
}
