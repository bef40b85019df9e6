use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of cache usage and hit counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of tiles in memory.
    pub memory_entries: usize,
    /// Memory usage under the memory cost strategy.
    pub memory_usage: usize,
    /// Memory limit.
    pub max_memory_usage: usize,
    /// Number of tiles on disk.
    pub disk_entries: usize,
    /// Disk usage under the disk cost strategy.
    pub disk_usage: usize,
    /// Disk limit.
    pub max_disk_usage: usize,
    /// Tiles whose disk write failed and waits for a retry.
    pub pending_writes: usize,
    /// Lookups served from memory.
    pub memory_hits: u64,
    /// Lookups served from disk.
    pub disk_hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
}

impl Display for CacheStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "memory: {} tiles, {}/{}; disk: {} tiles, {}/{}; pending writes: {}; \
             hits: {} memory, {} disk; misses: {}",
            self.memory_entries,
            self.memory_usage,
            self.max_memory_usage,
            self.disk_entries,
            self.disk_usage,
            self.max_disk_usage,
            self.pending_writes,
            self.memory_hits,
            self.disk_hits,
            self.misses
        )
    }
}

#[derive(Debug, Default)]
pub(crate) struct HitCounters {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    misses: AtomicU64,
}

impl HitCounters {
    pub fn memory_hit(&self) {
        self.memory_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn disk_hit(&self) {
        self.disk_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fill(&self, stats: &mut CacheStats) {
        stats.memory_hits = self.memory_hits.load(Ordering::Relaxed);
        stats.disk_hits = self.disk_hits.load(Ordering::Relaxed);
        stats.misses = self.misses.load(Ordering::Relaxed);
    }
}
