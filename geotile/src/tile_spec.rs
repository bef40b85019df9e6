//! [`TileSpec`] identifies a single tile in the cache.

use std::fmt::{Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::tile_grid::TileIndex;

/// Identifier of one tile: provider, map, zoom level, column, row and optional version.
///
/// Specs are ordered lexicographically by `plugin_id`, `map_id`, `zoom`, `x`, `y` and `version`
/// (unversioned first). Two specs that differ only in version are different tiles and are stored
/// in different files.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileSpec {
    plugin_id: String,
    map_id: u32,
    zoom: u32,
    x: u32,
    y: u32,
    version: Option<u32>,
}

impl TileSpec {
    /// Creates an unversioned spec.
    pub fn new(plugin_id: impl Into<String>, map_id: u32, zoom: u32, x: u32, y: u32) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            map_id,
            zoom,
            x,
            y,
            version: None,
        }
    }

    /// Creates an unversioned spec for a tile index.
    pub fn from_index(plugin_id: impl Into<String>, map_id: u32, index: TileIndex) -> Self {
        Self::new(plugin_id, map_id, index.z, index.x, index.y)
    }

    /// Returns the same spec with the given version.
    pub fn with_version(self, version: Option<u32>) -> Self {
        Self { version, ..self }
    }

    /// Tile provider id.
    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    /// Logical map (style) id.
    pub fn map_id(&self) -> u32 {
        self.map_id
    }

    /// Zoom level.
    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    /// Tile column.
    pub fn x(&self) -> u32 {
        self.x
    }

    /// Tile row.
    pub fn y(&self) -> u32 {
        self.y
    }

    /// Tile version, `None` for unversioned tiles.
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    /// Tile index of the spec.
    pub fn index(&self) -> TileIndex {
        TileIndex::new(self.x, self.y, self.zoom)
    }

    /// Plugin id can be used as the first field of a cache file name: it is not empty and has no
    /// field separators, extension separators or path separators in it.
    pub fn has_encodable_plugin_id(&self) -> bool {
        !self.plugin_id.is_empty()
            && !self
                .plugin_id
                .contains(['-', '.', '/', '\\', '\0'])
    }
}

impl Display for TileSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}/{}/{}/{}",
            self.plugin_id, self.map_id, self.zoom, self.x, self.y
        )?;
        if let Some(version) = self.version {
            write!(f, "@v{version}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_covers_all_fields() {
        let base = TileSpec::new("osm", 1, 5, 10, 12);
        assert!(TileSpec::new("apple", 9, 9, 9, 9) < base);
        assert!(TileSpec::new("osm", 0, 9, 9, 9) < base);
        assert!(TileSpec::new("osm", 1, 4, 90, 90) < base);
        assert!(TileSpec::new("osm", 1, 5, 9, 90) < base);
        assert!(TileSpec::new("osm", 1, 5, 10, 11) < base);
        assert!(base < base.clone().with_version(Some(0)));
        assert!(base.clone().with_version(Some(1)) < base.clone().with_version(Some(2)));
    }

    #[test]
    fn version_distinguishes_specs() {
        let base = TileSpec::new("osm", 1, 5, 10, 12);
        assert_ne!(base, base.clone().with_version(Some(3)));
        assert_eq!(
            base.clone().with_version(Some(3)),
            base.with_version(Some(3))
        );
    }

    #[test]
    fn encodable_plugin_ids() {
        assert!(TileSpec::new("osm", 0, 0, 0, 0).has_encodable_plugin_id());
        assert!(TileSpec::new("here_maps", 0, 0, 0, 0).has_encodable_plugin_id());
        assert!(!TileSpec::new("", 0, 0, 0, 0).has_encodable_plugin_id());
        assert!(!TileSpec::new("my-plugin", 0, 0, 0, 0).has_encodable_plugin_id());
        assert!(!TileSpec::new("a.b", 0, 0, 0, 0).has_encodable_plugin_id());
        assert!(!TileSpec::new("../x", 0, 0, 0, 0).has_encodable_plugin_id());
    }

    #[test]
    fn from_index() {
        let spec = TileSpec::from_index("osm", 2, TileIndex::new(5, 3, 4));
        assert_eq!(spec, TileSpec::new("osm", 2, 4, 5, 3));
        assert_eq!(spec.index(), TileIndex::new(5, 3, 4));
    }

    #[test]
    fn display() {
        let spec = TileSpec::new("osm", 2, 3, 4, 5);
        assert_eq!(spec.to_string(), "osm:2/3/4/5");
        assert_eq!(spec.with_version(Some(7)).to_string(), "osm:2/3/4/5@v7");
    }
}
