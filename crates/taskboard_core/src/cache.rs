//! Session-wide read cache for previously fetched view data.
//!
//! # Responsibility
//! - Remember the last-known-good payload per `(data kind, work area)`.
//! - Drop entries on explicit invalidation, per key or per work area.
//!
//! # Invariants
//! - `set` replaces an entry wholesale; there is no merge.
//! - A miss looks the same whether the key was never set or was invalidated.
//! - The cache never fetches on its own; callers fetch and `set` on miss.
//! - Payloads are handed out behind `Arc` and are never mutated in place.

use crate::model::item::WorkAreaId;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;

/// View data kinds cached per work area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Board items (the ordering engine's data).
    Items,
    Clients,
    Businesses,
    Billing,
    Notes,
    Documents,
}

impl DataKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Items => "items",
            Self::Clients => "clients",
            Self::Businesses => "businesses",
            Self::Billing => "billing",
            Self::Notes => "notes",
            Self::Documents => "documents",
        }
    }
}

/// Cache key: one data kind within one work area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub kind: DataKind,
    pub area: WorkAreaId,
}

impl CacheKey {
    pub fn new(kind: DataKind, area: WorkAreaId) -> Self {
        Self { kind, area }
    }

    pub fn items(area: WorkAreaId) -> Self {
        Self::new(DataKind::Items, area)
    }
}

/// Hit/miss counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Keyed last-known-good payload store.
///
/// One instance lives for an application session; it outlives navigation
/// between work areas and is dropped (or `clear`ed) on full reload.
#[derive(Debug)]
pub struct ReadCache<V> {
    entries: HashMap<CacheKey, Arc<V>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl<V> Default for ReadCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }
}

impl<V> ReadCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached payload for `key`, if any.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<V>> {
        match self.entries.get(key) {
            Some(payload) => {
                self.hits.set(self.hits.get() + 1);
                Some(Arc::clone(payload))
            }
            None => {
                self.misses.set(self.misses.get() + 1);
                None
            }
        }
    }

    /// Stores `payload` under `key`, replacing any previous entry.
    pub fn set(&mut self, key: CacheKey, payload: V) -> Arc<V> {
        let payload = Arc::new(payload);
        self.entries.insert(key, Arc::clone(&payload));
        payload
    }

    /// Removes one entry. Returns whether an entry was present.
    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        let removed = self.entries.remove(key).is_some();
        debug!(
            "event=cache_invalidate module=cache scope=key kind={} area={} removed={}",
            key.kind.as_str(),
            key.area,
            removed
        );
        removed
    }

    /// Removes every entry of `area`, whatever its data kind.
    ///
    /// Returns the number of removed entries.
    pub fn invalidate_area(&mut self, area: WorkAreaId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.area != area);
        let removed = before - self.entries.len();
        debug!(
            "event=cache_invalidate module=cache scope=area area={} removed={}",
            area, removed
        );
        removed
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry; used on full application reload.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
        }
    }
}
