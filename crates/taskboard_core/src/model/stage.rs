//! Board stage enumeration.
//!
//! # Invariants
//! - The stage set and its display order are fixed at compile time.
//! - Derived `Ord` follows display order (left-most column first).

use serde::{Deserialize, Serialize};

/// One named board column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Captured but not scheduled.
    Backlog,
    /// Queued for the next work slot.
    Next,
    /// Actively being worked on.
    InProgress,
    /// Waiting for review or sign-off.
    Review,
    /// Finished.
    Done,
}

impl Stage {
    /// All stages in display order.
    pub const ALL: [Stage; 5] = [
        Stage::Backlog,
        Stage::Next,
        Stage::InProgress,
        Stage::Review,
        Stage::Done,
    ];

    /// Stable string id used in storage and FFI payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Next => "next",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Done => "done",
        }
    }
}

/// Parses one stage from its stable string id.
///
/// Surrounding whitespace is ignored; matching is case-sensitive.
pub fn parse_stage(value: &str) -> Option<Stage> {
    match value.trim() {
        "backlog" => Some(Stage::Backlog),
        "next" => Some(Stage::Next),
        "in_progress" => Some(Stage::InProgress),
        "review" => Some(Stage::Review),
        "done" => Some(Stage::Done),
        _ => None,
    }
}
