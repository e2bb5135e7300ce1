//! Board domain model.
//!
//! # Responsibility
//! - Define items, stages and placements shared by every board component.
//! - Provide the read-only ordering projection (`OrderModel`).
//!
//! # Invariants
//! - Every item is identified by a stable `ItemId`.
//! - The stage set is fixed; it is never derived from stored data.

pub mod item;
pub mod order;
pub mod stage;
