use std::path::PathBuf;

use crate::cache::entry::CacheEntry;
use crate::tile_spec::TileSpec;

/// Change of the cache state reported to [observers](CacheObserver).
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// Tile was added to the memory tier.
    Inserted(TileSpec),
    /// Tile was written to the given file.
    Persisted {
        /// Tile.
        spec: TileSpec,
        /// File the tile was written to.
        path: PathBuf,
    },
    /// Tile was dropped from the memory tier. The entry is in [`Evicted`] state.
    ///
    /// [`Evicted`]: crate::cache::EntryState::Evicted
    EvictedFromMemory(CacheEntry),
    /// Tile file was deleted to keep the disk tier in its limit.
    EvictedFromDisk {
        /// Tile.
        spec: TileSpec,
        /// Deleted file.
        path: PathBuf,
    },
    /// Tile could not be written. It stays in memory and is retried later.
    DiskWriteFailed {
        /// Tile.
        spec: TileSpec,
        /// Error description.
        error: String,
    },
    /// A file of this cache could not be read or has a malformed name and was deleted.
    CorruptTile {
        /// Tile, if the file name was decoded.
        spec: Option<TileSpec>,
        /// Deleted file.
        path: PathBuf,
    },
    /// All tiles, or all tiles of one map, were removed.
    Cleared {
        /// Map id, if only one map was cleared.
        map_id: Option<u32>,
    },
}

/// Receiver of [`CacheEvent`]s.
///
/// Observers are called synchronously from the thread that changed the cache, after the cache
/// released its locks, so they may call back into the cache.
pub trait CacheObserver: Send + Sync {
    /// Handles an event.
    fn on_event(&self, event: &CacheEvent);
}

impl<F> CacheObserver for F
where
    F: Fn(&CacheEvent) + Send + Sync,
{
    fn on_event(&self, event: &CacheEvent) {
        self(event)
    }
}
