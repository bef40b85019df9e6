use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

use crate::tile_spec::TileSpec;

/// Lifecycle state of a cached tile.
///
/// `Fresh -> Cached` when the tile is written to disk, `Fresh | Cached -> Evicted` when it is
/// dropped from memory. Evicted entries never come back: a tile loaded again is a new entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Stored in memory only.
    Fresh,
    /// Stored in memory and persisted to disk.
    Cached,
    /// Removed from memory.
    Evicted,
}

/// Snapshot of a cached tile.
///
/// The bytes are immutable and shared with the cache, so taking a snapshot is cheap and it never
/// changes, even if the tile is replaced or evicted afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Tile identifier.
    pub spec: TileSpec,
    /// Encoded tile image.
    pub bytes: Bytes,
    /// Image format of the tile (file extension).
    pub format: String,
    /// Cost of the tile against the memory limit.
    pub size: usize,
    /// Logical time of the last access.
    pub last_access: u64,
    /// Lifecycle state at the moment of the snapshot.
    pub state: EntryState,
}

/// Monotonic counter used to order accesses.
#[derive(Debug, Default)]
pub(crate) struct LogicalClock(AtomicU64);

impl LogicalClock {
    pub fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}
