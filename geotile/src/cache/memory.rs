use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

use crate::cache::entry::{CacheEntry, EntryState};
use crate::tile_spec::TileSpec;

pub(super) struct MemoryEntry {
    bytes: Bytes,
    format: String,
    cost: usize,
    last_access: AtomicU64,
    seq: u64,
    state: EntryState,
}

impl MemoryEntry {
    fn snapshot(&self, spec: &TileSpec) -> CacheEntry {
        CacheEntry {
            spec: spec.clone(),
            bytes: self.bytes.clone(),
            format: self.format.clone(),
            size: self.cost,
            last_access: self.last_access.load(Ordering::Relaxed),
            state: self.state,
        }
    }

    fn lru_key(&self) -> (u64, u64) {
        (self.last_access.load(Ordering::Relaxed), self.seq)
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn state(&self) -> EntryState {
        self.state
    }
}

/// Memory tier of the cache.
///
/// Lookups need only a shared reference: access time is bumped atomically. Entries are evicted in
/// order of the last access, ties are broken by insertion order.
#[derive(Default)]
pub(super) struct MemoryTier {
    entries: HashMap<TileSpec, MemoryEntry, ahash::RandomState>,
    usage: usize,
    next_seq: u64,
}

impl MemoryTier {
    pub fn get(&self, spec: &TileSpec, tick: u64) -> Option<CacheEntry> {
        let entry = self.entries.get(spec)?;
        entry.last_access.fetch_max(tick, Ordering::Relaxed);
        Some(entry.snapshot(spec))
    }

    pub fn peek(&self, spec: &TileSpec) -> Option<&MemoryEntry> {
        self.entries.get(spec)
    }

    pub fn contains(&self, spec: &TileSpec) -> bool {
        self.entries.contains_key(spec)
    }

    /// Inserts or replaces the entry and returns the snapshot of the new one.
    pub fn insert(
        &mut self,
        spec: TileSpec,
        bytes: Bytes,
        format: String,
        cost: usize,
        state: EntryState,
        tick: u64,
    ) -> CacheEntry {
        let seq = self.next_seq;
        self.next_seq += 1;

        let entry = MemoryEntry {
            bytes,
            format,
            cost,
            last_access: AtomicU64::new(tick),
            seq,
            state,
        };
        let snapshot = entry.snapshot(&spec);

        self.usage += cost;
        if let Some(replaced) = self.entries.insert(spec, entry) {
            self.usage -= replaced.cost;
        }

        snapshot
    }

    pub fn mark_persisted(&mut self, spec: &TileSpec) {
        if let Some(entry) = self.entries.get_mut(spec) {
            if entry.state == EntryState::Fresh {
                entry.state = EntryState::Cached;
            }
        }
    }

    /// Evicts least recently used entries until the usage is not larger than `target`.
    pub fn evict_to(&mut self, target: usize) -> Vec<CacheEntry> {
        if self.usage <= target {
            return vec![];
        }

        let mut candidates: Vec<((u64, u64), TileSpec)> = self
            .entries
            .iter()
            .map(|(spec, entry)| (entry.lru_key(), spec.clone()))
            .collect();
        candidates.sort_unstable_by_key(|(key, _)| *key);

        let mut evicted = vec![];
        for (_, spec) in candidates {
            if self.usage <= target {
                break;
            }

            if let Some(entry) = self.remove(&spec) {
                evicted.push(entry);
            }
        }

        evicted
    }

    /// Removes all entries matching the predicate.
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&TileSpec) -> bool) -> usize {
        let to_remove: Vec<TileSpec> = self
            .entries
            .keys()
            .filter(|spec| predicate(spec))
            .cloned()
            .collect();

        for spec in &to_remove {
            self.remove(spec);
        }

        to_remove.len()
    }

    pub fn usage(&self) -> usize {
        self.usage
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn remove(&mut self, spec: &TileSpec) -> Option<CacheEntry> {
        let entry = self.entries.remove(spec)?;
        self.usage -= entry.cost;

        let mut snapshot = entry.snapshot(spec);
        snapshot.state = EntryState::Evicted;
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(x: u32) -> TileSpec {
        TileSpec::new("test", 0, 10, x, 0)
    }

    fn insert(tier: &mut MemoryTier, x: u32, size: usize, tick: u64) {
        tier.insert(
            spec(x),
            Bytes::from(vec![0; size]),
            "png".into(),
            size,
            EntryState::Fresh,
            tick,
        );
    }

    #[test]
    fn replacing_entry_keeps_usage_consistent() {
        let mut tier = MemoryTier::default();
        insert(&mut tier, 1, 100, 1);
        insert(&mut tier, 1, 30, 2);
        assert_eq!(tier.usage(), 30);
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn evicts_least_recently_accessed() {
        let mut tier = MemoryTier::default();
        insert(&mut tier, 1, 10, 1);
        insert(&mut tier, 2, 10, 2);
        insert(&mut tier, 3, 10, 3);
        assert!(tier.get(&spec(1), 4).is_some());

        let evicted = tier.evict_to(20);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].spec, spec(2));
        assert_eq!(evicted[0].state, EntryState::Evicted);
        assert!(tier.contains(&spec(1)));
        assert!(tier.contains(&spec(3)));
    }

    #[test]
    fn equal_access_times_evict_in_insertion_order() {
        let mut tier = MemoryTier::default();
        insert(&mut tier, 5, 10, 1);
        insert(&mut tier, 4, 10, 1);
        insert(&mut tier, 3, 10, 1);

        let evicted: Vec<_> = tier.evict_to(0).into_iter().map(|e| e.spec).collect();
        assert_eq!(evicted, vec![spec(5), spec(4), spec(3)]);
        assert_eq!(tier.usage(), 0);
    }

    #[test]
    fn evicts_many_entries_in_access_order() {
        let mut tier = MemoryTier::default();
        for x in 0..100 {
            insert(&mut tier, x, 10, 100 - x as u64);
        }

        let evicted: Vec<_> = tier.evict_to(500).into_iter().map(|e| e.spec).collect();
        let expected: Vec<_> = (50..100).rev().map(spec).collect();
        assert_eq!(evicted, expected);
        assert_eq!(tier.usage(), 500);
        assert!(tier.contains(&spec(0)));
    }

    #[test]
    fn stale_tick_does_not_move_access_time_back() {
        let mut tier = MemoryTier::default();
        insert(&mut tier, 1, 10, 10);
        let entry = tier.get(&spec(1), 5).expect("present");
        assert_eq!(entry.last_access, 10);
    }

    #[test]
    fn remove_where() {
        let mut tier = MemoryTier::default();
        for x in 0..5 {
            insert(&mut tier, x, 10, x as u64);
        }

        assert_eq!(tier.remove_where(|spec| spec.x() % 2 == 0), 3);
        assert_eq!(tier.len(), 2);
        assert_eq!(tier.usage(), 20);
    }
}
