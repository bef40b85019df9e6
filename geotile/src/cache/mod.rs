//! Persistent, size bounded tile cache.
//!
//! [`TileCache`] stores encoded tile images in two tiers:
//!
//! * **memory** - tiles that were recently inserted or read, served without any I/O,
//! * **disk** - one file per tile in the cache directory, named by a [`TileSpecCodec`].
//!
//! Both tiers have their own limit and evict least recently used tiles when the limit is
//! exceeded. The limits hold every time a mutating method returns.
//!
//! # Concurrency
//!
//! The cache is `Send + Sync` and is meant to be shared behind an `Arc`. Lookups of tiles in
//! memory take only a shared lock and never wait for disk I/O. Mutations are serialized.
//! Entries are immutable [`Bytes`], so a reader never observes a partially replaced tile.
//!
//! Methods that touch the disk ([`TileCache::open`], [`TileCache::insert`], lookups that miss
//! the memory tier, [`TileCache::clear`]) block on file I/O. Async code should call them through
//! [`CachedTileSource`](crate::provider::CachedTileSource) or `spawn_blocking`.
//!
//! # Disk write failures
//!
//! A tile that cannot be written stays in memory as [`EntryState::Fresh`] and is remembered as
//! pending. Pending tiles do not count against the disk limit. They are written again by
//! [`TileCache::flush`] and every time a disk eviction frees space.

mod config;
mod disk;
mod entry;
mod events;
mod memory;
mod stats;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};

pub use config::{CostStrategy, TileCacheConfig};
pub use entry::{CacheEntry, EntryState};
pub use events::{CacheEvent, CacheObserver};
pub use stats::CacheStats;

use crate::codec::{DefaultTileSpecCodec, TileSpecCodec};
use crate::error::TileCacheError;
use crate::tile_spec::TileSpec;
use disk::DiskTier;
use entry::LogicalClock;
use memory::MemoryTier;
use stats::HitCounters;

/// Disk and memory backed tile cache. See [module documentation](self) for details.
pub struct TileCache {
    config: TileCacheConfig,
    codec: Box<dyn TileSpecCodec>,
    memory: RwLock<MemoryTier>,
    disk: Mutex<DiskTier>,
    writer: Mutex<()>,
    clock: LogicalClock,
    counters: HitCounters,
    observers: RwLock<Vec<Arc<dyn CacheObserver>>>,
}

impl std::fmt::Debug for TileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl TileCache {
    /// Opens the cache in the configured directory.
    ///
    /// The directory is created if it doesn't exist. All files recognized by the codec are
    /// indexed; files with malformed names and unfinished writes are deleted. If the indexed
    /// files exceed the disk limit, the oldest of them are deleted.
    pub fn open(
        config: TileCacheConfig,
        codec: impl TileSpecCodec + 'static,
    ) -> Result<Self, TileCacheError> {
        config.validate()?;
        std::fs::create_dir_all(config.directory()).map_err(|err| {
            warn!(
                "Failed to initialize tile cache folder {:?}: {err}",
                config.directory()
            );
            TileCacheError::Io(err)
        })?;

        let cache = Self {
            memory: RwLock::new(MemoryTier::default()),
            disk: Mutex::new(DiskTier::new(
                config.directory(),
                config.disk_cost_strategy(),
            )),
            codec: Box::new(codec),
            writer: Mutex::new(()),
            clock: LogicalClock::default(),
            counters: HitCounters::default(),
            observers: RwLock::new(vec![]),
            config,
        };

        let mut disk = cache.disk.lock();
        let report = disk.scan(cache.codec.as_ref(), &cache.clock)?;
        let evicted = disk.evict_to(cache.config.max_disk_usage());
        info!(
            "Tile cache {:?}: loaded {} tiles (usage {} of {}), removed {} corrupt files and {} \
             unfinished writes, evicted {} tiles over the limit, skipped {} foreign files",
            cache.config.directory(),
            report.indexed,
            disk.usage(),
            cache.config.max_disk_usage(),
            report.corrupt.len(),
            report.removed_temp,
            evicted.len(),
            report.foreign
        );
        drop(disk);

        Ok(cache)
    }

    /// Opens the cache with [`DefaultTileSpecCodec`] using the configured ppi suffix.
    pub fn with_default_codec(config: TileCacheConfig) -> Result<Self, TileCacheError> {
        let codec = DefaultTileSpecCodec::new(config.ppi())?;
        Self::open(config, codec)
    }

    /// Registers an observer of cache events.
    pub fn add_observer(&self, observer: Arc<dyn CacheObserver>) {
        self.observers.write().push(observer);
    }

    /// Returns the tile from memory or, if it is not there, from disk.
    ///
    /// A tile read from disk is added to the memory tier. If the file cannot be read, it is
    /// deleted and `None` is returned.
    pub fn get(&self, spec: &TileSpec) -> Option<CacheEntry> {
        if let Some(entry) = self.lookup_memory(spec) {
            return Some(entry);
        }

        let tick = self.clock.tick();
        let Some((path, format)) = self.disk.lock().lookup(spec, tick) else {
            self.counters.miss();
            return None;
        };

        match std::fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() => {
                self.counters.disk_hit();
                Some(self.populate_from_disk(spec, Bytes::from(bytes), format))
            }
            Ok(_) => {
                self.discard_corrupt(spec, &path, "file is empty");
                None
            }
            Err(err) => {
                self.discard_corrupt(spec, &path, &err.to_string());
                None
            }
        }
    }

    /// Returns the tile only if it is in the memory tier. Never touches the disk.
    pub fn get_from_memory(&self, spec: &TileSpec) -> Option<CacheEntry> {
        let entry = self.lookup_memory(spec);
        if entry.is_none() {
            self.counters.miss();
        }

        entry
    }

    /// Returns true if the tile is stored in any of the tiers. Doesn't change access order.
    pub fn contains(&self, spec: &TileSpec) -> bool {
        let in_memory = self.memory.read().contains(spec);
        in_memory || self.disk.lock().contains(spec)
    }

    /// Inserts the tile with the [default format](TileCacheConfig::default_format).
    pub fn insert(&self, spec: TileSpec, bytes: impl Into<Bytes>) -> Result<(), TileCacheError> {
        let format = self.config.default_format().to_owned();
        self.insert_with_format(spec, bytes, &format)
    }

    /// Inserts the tile into memory and writes it to disk.
    ///
    /// Returns an error only if the spec or the format cannot be encoded into a file name, in
    /// which case the cache is not changed. Disk write failures are reported to observers as
    /// [`CacheEvent::DiskWriteFailed`] and the tile stays in memory.
    ///
    /// Tiles larger than the limit of a tier evict everything from that tier, themselves
    /// included.
    pub fn insert_with_format(
        &self,
        spec: TileSpec,
        bytes: impl Into<Bytes>,
        format: &str,
    ) -> Result<(), TileCacheError> {
        let bytes = bytes.into();
        let filename = self.codec.encode(&spec, format)?;
        let persistable = !bytes.is_empty() && !self.codec.is_tile_bogus(&bytes);

        let mut events = vec![CacheEvent::Inserted(spec.clone())];
        {
            let _writer = self.writer.lock();

            let cost = self.config.memory_cost_strategy().cost(bytes.len());
            {
                let mut memory = self.memory.write();
                memory.insert(
                    spec.clone(),
                    bytes.clone(),
                    format.to_owned(),
                    cost,
                    EntryState::Fresh,
                    self.clock.tick(),
                );
            }
            self.evict_memory_locked(self.config.max_memory_usage(), &mut events);

            if persistable {
                self.persist_locked(&spec, &filename, format, &bytes, &mut events);
            } else {
                debug!("Tile {spec} is not persisted: bogus or empty payload");
                self.disk.lock().remove_pending(&spec);
                self.remove_outdated_file_locked(&spec, &mut events);
            }

            self.evict_disk_locked(self.config.max_disk_usage(), true, &mut events);
        }

        self.notify(&events);
        Ok(())
    }

    /// Evicts least recently used tiles from memory until its usage is not larger than
    /// `target`. Then brings the disk tier back to its limit.
    pub fn evict(&self, target: usize) {
        let mut events = vec![];
        {
            let _writer = self.writer.lock();
            self.evict_memory_locked(target, &mut events);
            self.evict_disk_locked(self.config.max_disk_usage(), true, &mut events);
        }

        self.notify(&events);
    }

    /// Deletes least recently used tile files until the disk usage is not larger than `target`.
    /// Tiles in memory are not affected.
    pub fn evict_disk(&self, target: usize) {
        let mut events = vec![];
        {
            let _writer = self.writer.lock();
            self.evict_disk_locked(target, false, &mut events);
        }

        self.notify(&events);
    }

    /// Removes all tiles from memory and deletes all files of this cache. Files in the
    /// directory that are not recognized by the codec are left untouched.
    pub fn clear(&self) -> Result<usize, TileCacheError> {
        self.clear_filtered(None)
    }

    /// Removes all tiles of the given map from memory and disk.
    pub fn clear_map_id(&self, map_id: u32) -> Result<usize, TileCacheError> {
        self.clear_filtered(Some(map_id))
    }

    /// Writes tiles whose disk write failed earlier. Returns the number of written tiles.
    pub fn flush(&self) -> usize {
        let mut events = vec![];
        let persisted = {
            let _writer = self.writer.lock();
            let persisted = self.retry_pending_locked(&mut events);
            self.evict_disk_locked(self.config.max_disk_usage(), false, &mut events);
            persisted
        };

        self.notify(&events);
        persisted
    }

    /// Current usage and hit counters.
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            max_memory_usage: self.config.max_memory_usage(),
            max_disk_usage: self.config.max_disk_usage(),
            ..Default::default()
        };

        {
            let memory = self.memory.read();
            stats.memory_entries = memory.len();
            stats.memory_usage = memory.usage();
        }
        {
            let disk = self.disk.lock();
            stats.disk_entries = disk.len();
            stats.disk_usage = disk.usage();
            stats.pending_writes = disk.pending_len();
        }
        self.counters.fill(&mut stats);

        stats
    }

    /// Logs current statistics with `info` level.
    pub fn log_stats(&self) {
        info!("Tile cache {:?}: {}", self.config.directory(), self.stats());
    }

    /// Memory usage under the memory cost strategy.
    pub fn memory_usage(&self) -> usize {
        self.memory.read().usage()
    }

    /// Disk usage under the disk cost strategy.
    pub fn disk_usage(&self) -> usize {
        self.disk.lock().usage()
    }

    /// Memory limit.
    pub fn max_memory_usage(&self) -> usize {
        self.config.max_memory_usage()
    }

    /// Disk limit.
    pub fn max_disk_usage(&self) -> usize {
        self.config.max_disk_usage()
    }

    /// Cache directory.
    pub fn directory(&self) -> &Path {
        self.config.directory()
    }

    /// Configuration the cache was opened with.
    pub fn config(&self) -> &TileCacheConfig {
        &self.config
    }

    /// Path of the file the tile is (or would be) stored in with the given format.
    pub fn file_path(&self, spec: &TileSpec, format: &str) -> Result<PathBuf, TileCacheError> {
        Ok(self.config.directory().join(self.codec.encode(spec, format)?))
    }

    /// Memory tier lookup that counts a hit but not a miss, for callers that go on to the disk.
    pub(crate) fn lookup_memory(&self, spec: &TileSpec) -> Option<CacheEntry> {
        let entry = self.memory.read().get(spec, self.clock.tick());
        if entry.is_some() {
            self.counters.memory_hit();
        }

        entry
    }

    fn populate_from_disk(&self, spec: &TileSpec, bytes: Bytes, format: String) -> CacheEntry {
        let mut events = vec![];
        let entry = {
            let _writer = self.writer.lock();

            // A newer version of the tile may have been inserted while the file was read.
            let existing = self.memory.read().get(spec, self.clock.tick());
            match existing {
                Some(entry) => entry,
                None => {
                    let cost = self.config.memory_cost_strategy().cost(bytes.len());
                    let entry = self.memory.write().insert(
                        spec.clone(),
                        bytes,
                        format,
                        cost,
                        EntryState::Cached,
                        self.clock.tick(),
                    );
                    self.evict_memory_locked(self.config.max_memory_usage(), &mut events);
                    entry
                }
            }
        };

        self.notify(&events);
        entry
    }

    fn discard_corrupt(&self, spec: &TileSpec, path: &Path, reason: &str) {
        self.counters.miss();
        let removed = {
            let _writer = self.writer.lock();
            self.disk.lock().remove_if_stored_at(spec, path)
        };

        // The file could have been evicted or replaced while it was read.
        if removed {
            warn!("Removed corrupt cache file {path:?} of tile {spec}: {reason}");
            self.notify(&[CacheEvent::CorruptTile {
                spec: Some(spec.clone()),
                path: path.to_owned(),
            }]);
        }
    }

    fn persist_locked(
        &self,
        spec: &TileSpec,
        filename: &str,
        format: &str,
        bytes: &[u8],
        events: &mut Vec<CacheEvent>,
    ) -> bool {
        let in_memory = self.memory.read().contains(spec);
        let written = self
            .disk
            .lock()
            .write(spec, filename, format, bytes, self.clock.tick());
        match written {
            Ok(path) => {
                self.memory.write().mark_persisted(spec);
                events.push(CacheEvent::Persisted {
                    spec: spec.clone(),
                    path,
                });
                true
            }
            Err(err) => {
                warn!("Failed to write tile {spec} to the cache: {err}");
                if in_memory {
                    self.disk.lock().add_pending(spec.clone());
                }
                self.remove_outdated_file_locked(spec, events);
                events.push(CacheEvent::DiskWriteFailed {
                    spec: spec.clone(),
                    error: err.to_string(),
                });
                false
            }
        }
    }

    /// Drops the file of a tile whose newer version could not be written to disk.
    fn remove_outdated_file_locked(&self, spec: &TileSpec, events: &mut Vec<CacheEvent>) {
        if let Some(path) = self.disk.lock().remove(spec) {
            debug!("Removed outdated cache file {path:?} of tile {spec}");
            events.push(CacheEvent::EvictedFromDisk {
                spec: spec.clone(),
                path,
            });
        }
    }

    fn evict_memory_locked(&self, target: usize, events: &mut Vec<CacheEvent>) {
        let evicted = self.memory.write().evict_to(target);
        if evicted.is_empty() {
            return;
        }

        let mut disk = self.disk.lock();
        for entry in evicted {
            debug!("Evicting tile {} from memory", entry.spec);
            disk.remove_pending(&entry.spec);
            events.push(CacheEvent::EvictedFromMemory(entry));
        }
    }

    fn evict_disk_locked(&self, target: usize, retry_pending: bool, events: &mut Vec<CacheEvent>) {
        let evicted = self.disk.lock().evict_to(target);
        let freed_space = !evicted.is_empty();
        events.extend(
            evicted
                .into_iter()
                .map(|(spec, path)| CacheEvent::EvictedFromDisk { spec, path }),
        );

        if retry_pending && freed_space && self.disk.lock().pending_len() > 0 {
            self.retry_pending_locked(events);
            self.evict_disk_locked(target, false, events);
        }
    }

    fn retry_pending_locked(&self, events: &mut Vec<CacheEvent>) -> usize {
        let pending = self.disk.lock().pending();
        let mut persisted = 0;
        for spec in pending {
            let payload = self
                .memory
                .read()
                .peek(&spec)
                .filter(|entry| entry.state() == EntryState::Fresh)
                .map(|entry| (entry.bytes().clone(), entry.format().to_owned()));

            let Some((bytes, format)) = payload else {
                self.disk.lock().remove_pending(&spec);
                continue;
            };

            let filename = match self.codec.encode(&spec, &format) {
                Ok(v) => v,
                Err(err) => {
                    warn!("Dropping pending write of tile {spec}: {err}");
                    self.disk.lock().remove_pending(&spec);
                    continue;
                }
            };

            if self.persist_locked(&spec, &filename, &format, &bytes, events) {
                persisted += 1;
            }
        }

        persisted
    }

    fn clear_filtered(&self, map_id: Option<u32>) -> Result<usize, TileCacheError> {
        let removed = {
            let _writer = self.writer.lock();
            let removed = self.disk.lock().clear(self.codec.as_ref(), map_id)?;
            self.memory
                .write()
                .remove_where(|spec| map_id.map_or(true, |id| spec.map_id() == id));
            removed
        };

        info!(
            "Cleared tile cache {:?} (map id: {map_id:?}), {removed} files deleted",
            self.config.directory()
        );
        self.notify(&[CacheEvent::Cleared { map_id }]);
        Ok(removed)
    }

    fn notify(&self, events: &[CacheEvent]) {
        if events.is_empty() {
            return;
        }

        let observers = self.observers.read().clone();
        for observer in &observers {
            for event in events {
                observer.on_event(event);
            }
        }
    }
}
