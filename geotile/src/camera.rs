//! Camera position and its interpolation for animated transitions.

use geotile_types::geo::{GeoCoordinate, SceneProjection};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Position and orientation of the map camera.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CameraState {
    /// Point the camera looks at.
    pub center: GeoCoordinate,
    /// Rotation around the vertical axis in degrees.
    pub bearing: f64,
    /// Angle between the view direction and the vertical axis in degrees.
    pub tilt: f64,
    /// Rotation around the view direction in degrees.
    pub roll: f64,
    /// Zoom level, may be fractional.
    pub zoom: f64,
}

impl CameraState {
    /// Creates a camera looking straight down at `center`.
    pub fn new(center: GeoCoordinate, zoom: f64) -> Self {
        Self {
            center,
            bearing: 0.0,
            tilt: 0.0,
            roll: 0.0,
            zoom,
        }
    }

    /// Returns the same camera with the given bearing.
    pub fn with_bearing(self, bearing: f64) -> Self {
        Self { bearing, ..self }
    }

    /// Returns the same camera with the given tilt.
    pub fn with_tilt(self, tilt: f64) -> Self {
        Self { tilt, ..self }
    }

    /// Returns the same camera with the given roll.
    pub fn with_roll(self, roll: f64) -> Self {
        Self { roll, ..self }
    }

    /// Camera state at `progress` of the transition from `start` to `end`.
    ///
    /// The center moves along the shortest path in scene space (see
    /// [`SceneProjection::interpolate`]), all other parameters change linearly. Angles are
    /// blended as plain numbers, so a bearing change from 350 to 10 degrees goes through 180.
    pub fn interpolate(
        start: &CameraState,
        end: &CameraState,
        progress: f64,
        projection: &SceneProjection,
    ) -> CameraState {
        let lerp = |a: f64, b: f64| (1.0 - progress) * a + progress * b;

        CameraState {
            center: projection.interpolate(&start.center, &end.center, progress),
            bearing: lerp(start.bearing, end.bearing),
            tilt: lerp(start.tilt, end.tilt),
            roll: lerp(start.roll, end.roll),
            zoom: lerp(start.zoom, end.zoom),
        }
    }
}
