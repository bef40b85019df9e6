//! Loading tiles through the cache from an external source.

use std::sync::Arc;

use bytes::Bytes;

use crate::cache::TileCache;
use crate::error::TileCacheError;
use crate::tile_spec::TileSpec;

/// Source of tiles that are not in the cache, e.g. a tile server.
#[async_trait::async_trait]
pub trait TileFetcher: Send + Sync {
    /// Loads encoded tile image.
    async fn fetch(&self, spec: &TileSpec) -> Result<Bytes, TileCacheError>;
}

/// Tile source that returns tiles from the [`TileCache`] and fetches the missing ones.
///
/// Fetched tiles are inserted into the cache. Blocking cache operations run on the tokio
/// blocking thread pool, so the source must be used inside a tokio runtime.
///
/// In offline mode only cached tiles are returned, and missing tiles result in
/// [`TileCacheError::NotFound`].
pub struct CachedTileSource {
    cache: Arc<TileCache>,
    fetcher: Arc<dyn TileFetcher>,
    offline_mode: bool,
}

impl CachedTileSource {
    /// Creates a new instance of the source.
    pub fn new(
        cache: Arc<TileCache>,
        fetcher: impl TileFetcher + 'static,
        offline_mode: bool,
    ) -> Self {
        Self {
            cache,
            fetcher: Arc::new(fetcher),
            offline_mode,
        }
    }

    /// Cache used by the source.
    pub fn cache(&self) -> &Arc<TileCache> {
        &self.cache
    }

    /// Whether the source never calls the fetcher.
    pub fn offline_mode(&self) -> bool {
        self.offline_mode
    }

    /// Returns the tile from the cache, or fetches and caches it.
    ///
    /// Failure to insert the fetched tile into the cache is logged and doesn't fail the load.
    pub async fn load(&self, spec: &TileSpec) -> Result<Bytes, TileCacheError> {
        if let Some(entry) = self.cache.lookup_memory(spec) {
            return Ok(entry.bytes);
        }

        let cache = self.cache.clone();
        let key = spec.clone();
        if let Some(entry) = tokio::task::spawn_blocking(move || cache.get(&key)).await? {
            return Ok(entry.bytes);
        }

        if self.offline_mode {
            return Err(TileCacheError::NotFound);
        }

        log::debug!("Fetching tile {spec}");
        let data = self.fetcher.fetch(spec).await?;

        let cache = self.cache.clone();
        let key = spec.clone();
        let payload = data.clone();
        match tokio::task::spawn_blocking(move || cache.insert(key, payload)).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => log::warn!("Failed to write tile {spec} to the cache: {error}"),
            Err(error) => log::warn!("Tile cache insert task for {spec} failed: {error}"),
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use tempfile::TempDir;

    use super::*;
    use crate::cache::TileCacheConfig;

    #[derive(Clone, Default)]
    struct CountingFetcher {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl TileFetcher for CountingFetcher {
        async fn fetch(&self, spec: &TileSpec) -> Result<Bytes, TileCacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from(format!("tile {spec}")))
        }
    }

    struct FailingFetcher;

    #[async_trait::async_trait]
    impl TileFetcher for FailingFetcher {
        async fn fetch(&self, _spec: &TileSpec) -> Result<Bytes, TileCacheError> {
            Err(TileCacheError::Fetch("connection refused".into()))
        }
    }

    fn cache(dir: &TempDir) -> Arc<TileCache> {
        Arc::new(
            TileCache::with_default_codec(TileCacheConfig::new(dir.path())).expect("cache opens"),
        )
    }

    #[tokio::test]
    async fn fetches_once_and_caches() {
        let dir = TempDir::new().expect("temp dir");
        let fetcher = CountingFetcher::default();
        let source = CachedTileSource::new(cache(&dir), fetcher.clone(), false);
        let spec = TileSpec::new("osm", 0, 3, 5, 3);

        let first = source.load(&spec).await.expect("loaded");
        let second = source.load(&spec).await.expect("loaded");
        assert_eq!(first, second);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(source.cache().contains(&spec));
    }

    #[tokio::test]
    async fn each_load_is_counted_once() {
        let dir = TempDir::new().expect("temp dir");
        let on_disk = TileSpec::new("osm", 0, 1, 1, 1);
        cache(&dir).insert(on_disk.clone(), &b"on disk"[..]).expect("insert");

        let source = CachedTileSource::new(cache(&dir), CountingFetcher::default(), false);
        source.load(&on_disk).await.expect("from disk");
        source.load(&on_disk).await.expect("from memory");
        source.load(&TileSpec::new("osm", 0, 1, 0, 0)).await.expect("fetched");

        let stats = source.cache().stats();
        assert_eq!(stats.disk_hits, 1);
        assert_eq!(stats.memory_hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn offline_mode_uses_only_cache() {
        let dir = TempDir::new().expect("temp dir");
        let fetcher = CountingFetcher::default();
        let cache = cache(&dir);
        let cached = TileSpec::new("osm", 0, 1, 0, 0);
        cache.insert(cached.clone(), &b"cached"[..]).expect("insert");

        let source = CachedTileSource::new(cache, fetcher.clone(), true);
        assert_eq!(
            source.load(&cached).await.expect("cached"),
            Bytes::from_static(b"cached")
        );
        assert_matches!(
            source.load(&TileSpec::new("osm", 0, 1, 1, 0)).await,
            Err(TileCacheError::NotFound)
        );
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reads_tiles_from_disk() {
        let dir = TempDir::new().expect("temp dir");
        let spec = TileSpec::new("osm", 0, 1, 1, 1);
        cache(&dir).insert(spec.clone(), &b"on disk"[..]).expect("insert");

        let source = CachedTileSource::new(cache(&dir), FailingFetcher, false);
        assert_eq!(
            source.load(&spec).await.expect("from disk"),
            Bytes::from_static(b"on disk")
        );
    }

    #[test]
    fn fetch_error_is_returned() {
        let dir = TempDir::new().expect("temp dir");
        let source = CachedTileSource::new(cache(&dir), FailingFetcher, false);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let result = runtime.block_on(source.load(&TileSpec::new("osm", 0, 0, 0, 0)));
        assert_matches!(result, Err(TileCacheError::Fetch(_)));
        assert_eq!(source.cache().stats().memory_entries, 0);
    }

    #[test]
    fn unencodable_spec_is_still_loaded() {
        let dir = TempDir::new().expect("temp dir");
        let source = CachedTileSource::new(cache(&dir), CountingFetcher::default(), false);
        let spec = TileSpec::new("not/valid", 0, 0, 0, 0);

        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        let data = runtime.block_on(source.load(&spec)).expect("fetched");
        assert_eq!(data, Bytes::from(format!("tile {spec}")));
        assert!(!source.cache().contains(&spec));
        tokio_test::assert_ok!(runtime.block_on(source.load(&spec)));
    }
}
