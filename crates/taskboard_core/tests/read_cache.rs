use std::sync::Arc;
use taskboard_core::{CacheKey, DataKind, Item, ItemCache, ReadCache, Stage};
use uuid::Uuid;

#[test]
fn set_then_get_returns_shared_payload() {
    let mut cache: ItemCache = ReadCache::new();
    let key = CacheKey::items(Uuid::new_v4());
    let items = vec![Item::new(Stage::Backlog, 0, "a")];

    let stored = cache.set(key, items.clone());
    let fetched = cache.get(&key).expect("entry should be cached");

    assert!(Arc::ptr_eq(&stored, &fetched));
    assert_eq!(*fetched, items);
}

#[test]
fn set_replaces_previous_payload_wholesale() {
    let mut cache: ItemCache = ReadCache::new();
    let key = CacheKey::items(Uuid::new_v4());
    cache.set(
        key,
        vec![
            Item::new(Stage::Backlog, 0, "a"),
            Item::new(Stage::Backlog, 1, "b"),
        ],
    );

    let replacement = vec![Item::new(Stage::Done, 0, "only")];
    cache.set(key, replacement.clone());

    assert_eq!(*cache.get(&key).unwrap(), replacement);
    assert_eq!(cache.len(), 1);
}

#[test]
fn earlier_handle_keeps_old_payload_after_replace() {
    let mut cache = ReadCache::new();
    let key = CacheKey::new(DataKind::Notes, Uuid::new_v4());
    cache.set(key, "v1".to_string());
    let held = cache.get(&key).unwrap();

    cache.set(key, "v2".to_string());

    assert_eq!(held.as_str(), "v1");
    assert_eq!(cache.get(&key).unwrap().as_str(), "v2");
}

#[test]
fn invalidated_key_reads_like_never_set() {
    let mut cache = ReadCache::new();
    let area = Uuid::new_v4();
    let key = CacheKey::items(area);
    let never = CacheKey::items(Uuid::new_v4());
    cache.set(key, 42_u32);

    assert!(cache.invalidate(&key));
    assert!(!cache.invalidate(&key));

    assert_eq!(cache.get(&key), cache.get(&never));
    assert!(!cache.contains(&key));
    assert!(cache.is_empty());
}

#[test]
fn invalidate_area_drops_every_kind_of_that_area_only() {
    let mut cache = ReadCache::new();
    let area = Uuid::new_v4();
    let other = Uuid::new_v4();
    cache.set(CacheKey::new(DataKind::Items, area), 1_u8);
    cache.set(CacheKey::new(DataKind::Clients, area), 2);
    cache.set(CacheKey::new(DataKind::Billing, area), 3);
    cache.set(CacheKey::new(DataKind::Items, other), 4);

    assert_eq!(cache.invalidate_area(area), 3);

    assert_eq!(cache.len(), 1);
    assert_eq!(
        cache.get(&CacheKey::new(DataKind::Items, other)).as_deref(),
        Some(&4)
    );
    assert!(cache.get(&CacheKey::new(DataKind::Clients, area)).is_none());
}

#[test]
fn same_area_different_kinds_are_independent() {
    let mut cache = ReadCache::new();
    let area = Uuid::new_v4();
    cache.set(CacheKey::new(DataKind::Documents, area), "docs");
    cache.set(CacheKey::new(DataKind::Businesses, area), "biz");

    cache.invalidate(&CacheKey::new(DataKind::Documents, area));

    assert_eq!(
        cache
            .get(&CacheKey::new(DataKind::Businesses, area))
            .as_deref(),
        Some(&"biz")
    );
}

#[test]
fn clear_empties_cache() {
    let mut cache = ReadCache::new();
    cache.set(CacheKey::items(Uuid::new_v4()), ());
    cache.set(CacheKey::items(Uuid::new_v4()), ());

    cache.clear();

    assert!(cache.is_empty());
}
