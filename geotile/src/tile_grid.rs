//! [`TileGrid`] calculates [tile indices](TileIndex) that cover a part of the normalized
//! mercator space.
//!
//! The grid follows the usual web map convention: zoom level `z` splits the world into
//! `2^z x 2^z` tiles, tile `(0, 0)` is in the north-west corner and `y` grows to the south.

use geotile_types::cartesian::CartesianPoint2d;
use geotile_types::geo::MercatorPoint;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Largest zoom level supported by the grid.
pub const MAX_ZOOM: u32 = 30;

/// Tile index with additional virtual `display_x` index that can be used to wrap tiles
/// over 180 longitude line.
///
/// `x` is always in the valid range of the zoom level, while `display_x` tells where the tile
/// should be drawn: `-1` is the last column of the world to the west of the anti-meridian, `2^z`
/// is the first column of the next world copy to the east.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WrappingTileIndex {
    /// Z index.
    pub z: u32,
    /// X index.
    pub x: u32,
    /// Y index.
    pub y: u32,
    /// Virtual wrapping X index.
    pub display_x: i64,
}

impl WrappingTileIndex {
    /// Create a new index instance without wrapping.
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self {
            x,
            y,
            z,
            display_x: x as i64,
        }
    }
}

/// Tile index.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileIndex {
    /// X index.
    pub x: u32,
    /// Y index.
    pub y: u32,
    /// Z index.
    pub z: u32,
}

impl TileIndex {
    /// Create a new index instance.
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Converts the tile index into a wrapping tile index by setting `display_x` equal to `x`.
    pub fn into_wrapping(self) -> WrappingTileIndex {
        WrappingTileIndex::new(self.x, self.y, self.z)
    }
}

impl From<WrappingTileIndex> for TileIndex {
    fn from(value: WrappingTileIndex) -> Self {
        Self {
            x: value.x,
            y: value.y,
            z: value.z,
        }
    }
}

impl From<TileIndex> for WrappingTileIndex {
    fn from(value: TileIndex) -> Self {
        value.into_wrapping()
    }
}

/// Quad-tree tile grid over the normalized mercator space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileGrid {
    max_zoom: u32,
}

impl Default for TileGrid {
    fn default() -> Self {
        Self { max_zoom: MAX_ZOOM }
    }
}

impl TileGrid {
    /// Creates a grid with zoom levels `0..=max_zoom`. Values above [`MAX_ZOOM`] are capped.
    pub fn new(max_zoom: u32) -> Self {
        Self {
            max_zoom: max_zoom.min(MAX_ZOOM),
        }
    }

    /// The largest zoom level of the grid.
    pub fn max_zoom(&self) -> u32 {
        self.max_zoom
    }

    /// Number of tile columns (and rows) at the zoom level.
    pub fn tiles_per_side(&self, zoom: u32) -> Option<u32> {
        (zoom <= self.max_zoom).then(|| 1 << zoom)
    }

    /// Index of the tile containing the point. Points outside of `[0, 1]` are wrapped by `x`
    /// and clamped by `y`.
    pub fn tile_at(&self, point: &MercatorPoint, zoom: u32) -> Option<TileIndex> {
        let n = self.tiles_per_side(zoom)? as i64;
        if !point.x().is_finite() || !point.y().is_finite() {
            return None;
        }

        let x = ((point.x() * n as f64).floor() as i64).rem_euclid(n);
        let y = ((point.y() * n as f64).floor() as i64).clamp(0, n - 1);

        Some(TileIndex::new(x as u32, y as u32, zoom))
    }

    /// Iterate over tile indices that cover the rectangle between the two points.
    ///
    /// If `top_left.x` is larger than `bottom_right.x`, the rectangle is considered to cross the
    /// anti-meridian. Tiles to the east of it get `display_x` beyond the last column. A view
    /// wider than the world yields every column once.
    pub fn tiles_in_view(
        &self,
        top_left: &MercatorPoint,
        bottom_right: &MercatorPoint,
        zoom: u32,
    ) -> Option<impl Iterator<Item = WrappingTileIndex>> {
        let n = self.tiles_per_side(zoom)? as i64;
        let coords = [top_left.x(), top_left.y(), bottom_right.x(), bottom_right.y()];
        if coords.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let left = top_left.x();
        let right = if bottom_right.x() < left {
            bottom_right.x() + 1.0
        } else {
            bottom_right.x()
        };

        let x_min = (left * n as f64).floor() as i64;
        // Float to int casts saturate, so the bounds of far away views must not overflow.
        let x_max = ((right * n as f64).ceil() as i64)
            .saturating_sub(1)
            .min(x_min.saturating_add(n - 1));

        let y_min = ((top_left.y().clamp(0.0, 1.0) * n as f64).floor() as i64).min(n - 1);
        let y_max = ((bottom_right.y().clamp(0.0, 1.0) * n as f64).ceil() as i64 - 1).min(n - 1);

        Some((x_min..=x_max).flat_map(move |display_x| {
            (y_min..=y_max).map(move |y| WrappingTileIndex {
                x: display_x.rem_euclid(n) as u32,
                y: y as u32,
                z: zoom,
                display_x,
            })
        }))
    }

    /// Top left and bottom right corners of the tile at its display position.
    pub fn tile_bounds(
        &self,
        index: impl Into<WrappingTileIndex>,
    ) -> Option<(MercatorPoint, MercatorPoint)> {
        let index = index.into();
        let n = self.tiles_per_side(index.z)? as f64;
        if index.y as f64 >= n {
            return None;
        }

        let size = 1.0 / n;
        let x = index.display_x as f64 * size;
        let y = index.y as f64 * size;

        Some((
            MercatorPoint::new(x, y),
            MercatorPoint::new(x + size, y + size),
        ))
    }
}
