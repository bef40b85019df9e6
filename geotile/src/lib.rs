//! Geotile is a persistent cache of map tiles with the projection math needed to place and
//! animate them.
//!
//! # Quick start
//!
//! ```no_run
//! use geotile::{TileCache, TileCacheConfig, TileSpec};
//!
//! let cache = TileCache::with_default_codec(
//!     TileCacheConfig::new("/tmp/tiles")
//!         .with_max_memory_usage(16 * 1024 * 1024)
//!         .with_max_disk_usage(256 * 1024 * 1024),
//! )
//! .expect("cache directory is writable");
//!
//! let spec = TileSpec::new("osm", 0, 3, 5, 3);
//! cache.insert(spec.clone(), std::fs::read("tile.png").unwrap()).unwrap();
//! assert!(cache.get(&spec).is_some());
//! ```
//!
//! # Main components
//!
//! * [`TileSpec`] identifies a tile by provider, map, zoom, column, row and version.
//! * [`TileSpecCodec`] maps specs to file names and back. [`DefaultTileSpecCodec`] uses
//!   `plugin-map-zoom-x-y[-version]-ppi.format` names.
//! * [`TileCache`] keeps tiles in memory and in a directory, both bounded and evicted in least
//!   recently used order. Changes are reported to [`CacheObserver`]s.
//! * [`CachedTileSource`] loads missing tiles with a [`TileFetcher`] from async code.
//! * [`TileGrid`] resolves tiles that cover a part of the map, wrapping over the anti-meridian.
//! * [`geotile_types`] contains coordinates and projections. [`CameraState`] uses them to
//!   animate the camera.

pub mod cache;
pub mod camera;
pub mod codec;
pub mod error;
pub mod provider;
pub mod tile_grid;
pub mod tile_spec;

pub use cache::{
    CacheEntry, CacheEvent, CacheObserver, CacheStats, CostStrategy, EntryState, TileCache,
    TileCacheConfig,
};
pub use camera::CameraState;
pub use codec::{DecodedFilename, DefaultTileSpecCodec, TileSpecCodec};
pub use error::TileCacheError;
pub use geotile_types;
pub use provider::{CachedTileSource, TileFetcher};
pub use tile_grid::{TileGrid, TileIndex, WrappingTileIndex};
pub use tile_spec::TileSpec;
