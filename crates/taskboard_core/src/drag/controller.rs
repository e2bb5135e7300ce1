//! Drag gesture state machine.
//!
//! # Responsibility
//! - Tell clicks apart from drags using a distance threshold.
//! - Track the hover target while dragging and report the final drop.
//!
//! # Invariants
//! - States: `Idle -> Armed -> Dragging -> Idle`; `Armed` may return to
//!   `Idle` directly on release (click) or cancel.
//! - Release while `Armed` is a click and never a reorder.
//! - Cancel never produces a drop.
//! - Only one session exists at a time; extra pointer-downs are ignored.

use crate::drag::event::{CancelReason, Point, PointerEvent};
use crate::model::item::{ItemId, Placement};
use crate::reorder::DropTarget;
use log::debug;
use serde::{Deserialize, Serialize};

/// Default drag activation distance in logical pixels.
pub const DEFAULT_DRAG_THRESHOLD_PX: f64 = 5.0;

/// Drag detection settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// Minimum pointer travel before a press becomes a drag.
    pub threshold_px: f64,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            threshold_px: DEFAULT_DRAG_THRESHOLD_PX,
        }
    }
}

/// Transient data of one in-progress gesture. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragSession {
    pub item_id: ItemId,
    /// Placement when the pointer went down.
    pub origin: Placement,
    /// Pointer position when the pointer went down.
    pub start: Point,
    /// Last stage or card reported under the pointer.
    pub hover: Option<DropTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "session", rename_all = "snake_case")]
pub enum DragState {
    #[default]
    Idle,
    /// Pressed on an item, threshold not exceeded yet.
    Armed(DragSession),
    Dragging(DragSession),
}

/// What a single pointer event meant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DragOutcome {
    /// Event had no effect in the current state.
    Ignored,
    Armed { item_id: ItemId },
    DragStarted {
        item_id: ItemId,
        hover: Option<DropTarget>,
    },
    HoverChanged { hover: Option<DropTarget> },
    /// Press and release without passing the threshold: open item detail.
    Clicked { item_id: ItemId },
    /// Drag finished over a target other than the item itself.
    Dropped {
        item_id: ItemId,
        origin: Placement,
        target: DropTarget,
    },
    /// Drag finished over nothing, or over the dragged item itself.
    DropIgnored { item_id: ItemId },
    Cancelled {
        item_id: ItemId,
        reason: CancelReason,
    },
}

/// Pure transition function of the drag state machine.
pub fn transition(
    config: &DragConfig,
    state: DragState,
    event: PointerEvent,
) -> (DragState, DragOutcome) {
    match (state, event) {
        (DragState::Idle, PointerEvent::Down { item_id, origin, at }) => (
            DragState::Armed(DragSession {
                item_id,
                origin,
                start: at,
                hover: None,
            }),
            DragOutcome::Armed { item_id },
        ),
        (DragState::Idle, _) => (DragState::Idle, DragOutcome::Ignored),

        (DragState::Armed(mut session), PointerEvent::Move { at, hover }) => {
            if session.start.distance_to(at) < config.threshold_px {
                return (DragState::Armed(session), DragOutcome::Ignored);
            }
            session.hover = hover;
            (
                DragState::Dragging(session),
                DragOutcome::DragStarted {
                    item_id: session.item_id,
                    hover,
                },
            )
        }
        (DragState::Armed(session), PointerEvent::Up) => (
            DragState::Idle,
            DragOutcome::Clicked {
                item_id: session.item_id,
            },
        ),
        (DragState::Armed(session), PointerEvent::Cancel { reason })
        | (DragState::Dragging(session), PointerEvent::Cancel { reason }) => (
            DragState::Idle,
            DragOutcome::Cancelled {
                item_id: session.item_id,
                reason,
            },
        ),
        (DragState::Armed(session), PointerEvent::Down { .. }) => {
            (DragState::Armed(session), DragOutcome::Ignored)
        }

        (DragState::Dragging(mut session), PointerEvent::Move { hover, .. }) => {
            if session.hover == hover {
                return (DragState::Dragging(session), DragOutcome::Ignored);
            }
            session.hover = hover;
            (
                DragState::Dragging(session),
                DragOutcome::HoverChanged { hover },
            )
        }
        (DragState::Dragging(session), PointerEvent::Up) => {
            let outcome = match session.hover {
                Some(target) if target != DropTarget::Item(session.item_id) => {
                    DragOutcome::Dropped {
                        item_id: session.item_id,
                        origin: session.origin,
                        target,
                    }
                }
                _ => DragOutcome::DropIgnored {
                    item_id: session.item_id,
                },
            };
            (DragState::Idle, outcome)
        }
        (DragState::Dragging(session), PointerEvent::Down { .. }) => {
            (DragState::Dragging(session), DragOutcome::Ignored)
        }
    }
}

/// Stateful wrapper around [`transition`] owned by one board.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    config: DragConfig,
    state: DragState,
}

impl DragController {
    pub fn new(config: DragConfig) -> Self {
        Self {
            config,
            state: DragState::Idle,
        }
    }

    pub fn config(&self) -> &DragConfig {
        &self.config
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, DragState::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Feeds one pointer event and returns what it meant.
    pub fn handle(&mut self, event: PointerEvent) -> DragOutcome {
        let (next, outcome) = transition(&self.config, self.state, event);
        self.state = next;
        if !matches!(outcome, DragOutcome::Ignored | DragOutcome::HoverChanged { .. }) {
            debug!("event=drag_transition module=drag outcome={outcome:?}");
        }
        outcome
    }
}
