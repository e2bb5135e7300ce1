//! Drag gesture detection.
//!
//! # Responsibility
//! - Translate raw pointer events into discrete click/drop intents.
//! - Own the transient state of an in-progress drag.
//!
//! # Invariants
//! - No component other than the controller mutates a drag session.

pub mod controller;
pub mod event;

pub use controller::{
    transition, DragConfig, DragController, DragOutcome, DragSession, DragState,
    DEFAULT_DRAG_THRESHOLD_PX,
};
pub use event::{CancelReason, Point, PointerEvent};
