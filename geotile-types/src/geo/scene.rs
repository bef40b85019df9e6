use crate::cartesian::{CartesianPoint2d, Point3d};
use crate::error::GeoTypesError;
use crate::geo::coordinate::GeoCoordinate;
use crate::geo::mercator_point::MercatorPoint;
use crate::geo::projection::Projection;
use crate::geo::web_mercator::WebMercator;

/// Projection of geographic coordinates into a 3d scene.
///
/// The mercator square is scaled to `side_length` and flipped vertically, so that `y` grows to
/// the north. Altitude becomes the `z` coordinate, offset by a base height given on each call.
/// Coordinates without altitude are placed at `z == base_height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneProjection {
    side_length: f64,
    mercator: WebMercator,
}

impl SceneProjection {
    /// Creates a projection onto a square with the given side. The side must be finite and
    /// positive.
    pub fn new(side_length: f64) -> Result<Self, GeoTypesError> {
        Self::with_mercator(side_length, WebMercator::default())
    }

    /// Same as [`SceneProjection::new`] with a custom mercator projection.
    pub fn with_mercator(side_length: f64, mercator: WebMercator) -> Result<Self, GeoTypesError> {
        if !(side_length.is_finite() && side_length > 0.0) {
            return Err(GeoTypesError::InvalidParameter(format!(
                "side length must be finite and positive, got {side_length}"
            )));
        }

        Ok(Self {
            side_length,
            mercator,
        })
    }

    /// Side of the scene square.
    pub fn side_length(&self) -> f64 {
        self.side_length
    }

    /// Underlying mercator projection.
    pub fn mercator(&self) -> &WebMercator {
        &self.mercator
    }

    /// Converts a coordinate into a scene point.
    pub fn coordinate_to_point(&self, coordinate: &GeoCoordinate, base_height: f64) -> Point3d {
        let mercator = self.mercator.coordinate_to_mercator(coordinate);
        self.scene_point(&mercator, altitude_or_zero(coordinate) + base_height)
    }

    /// Converts a scene point back into a coordinate. Altitude is `z - base_height`.
    pub fn point_to_coordinate(&self, point: &Point3d, base_height: f64) -> GeoCoordinate {
        self.mercator
            .mercator_to_coordinate(&self.mercator_point(point))
            .set_altitude(point.z - base_height)
    }

    /// Interpolates between two coordinates for the given `progress` in `[0, 1]`.
    ///
    /// Interpolation is linear in scene space and follows the shorter way around the globe: if
    /// the two points are more than half the scene apart horizontally, the path crosses the
    /// anti-meridian. Altitude is interpolated separately and is absent in the result if it is
    /// absent in either end.
    ///
    /// Equal ends produce `start` for `progress < 0.5` and `end` otherwise.
    pub fn interpolate(
        &self,
        start: &GeoCoordinate,
        end: &GeoCoordinate,
        progress: f64,
    ) -> GeoCoordinate {
        if start == end {
            return if progress < 0.5 { *start } else { *end };
        }

        if progress <= 0.0 {
            return *start;
        }

        if progress >= 1.0 {
            return *end;
        }

        let (Some(from), Some(to)) = (self.project(start), self.project(end)) else {
            return if progress < 0.5 { *start } else { *end };
        };

        let mut from_x = from.x;
        let mut to_x = to.x;
        if (to_x - from_x).abs() > self.side_length / 2.0 {
            // Dateline crossing: move the western point one world to the east.
            if from_x < to_x {
                from_x += self.side_length;
            } else {
                to_x += self.side_length;
            }
        }

        let x = (from_x + (to_x - from_x) * progress).rem_euclid(self.side_length);
        let y = from.y + (to.y - from.y) * progress;
        let altitude = start.altitude() + (end.altitude() - start.altitude()) * progress;

        let mercator = self.mercator_point(&Point3d::new(x, y, 0.0));
        self.mercator
            .mercator_to_coordinate(&mercator)
            .set_altitude(altitude)
    }

    fn scene_point(&self, mercator: &MercatorPoint, z: f64) -> Point3d {
        Point3d::new(
            mercator.x() * self.side_length,
            (1.0 - mercator.y()) * self.side_length,
            z,
        )
    }

    fn mercator_point(&self, point: &Point3d) -> MercatorPoint {
        MercatorPoint::new(
            point.x / self.side_length,
            1.0 - point.y / self.side_length,
        )
    }
}

fn altitude_or_zero(coordinate: &GeoCoordinate) -> f64 {
    if coordinate.has_altitude() {
        coordinate.altitude()
    } else {
        0.0
    }
}

/// Scene projection with zero base height. Coordinates with non-finite latitude or longitude and
/// points with non-finite `x` or `y` cannot be projected.
impl Projection for SceneProjection {
    type InPoint = GeoCoordinate;
    type OutPoint = Point3d;

    fn project(&self, input: &GeoCoordinate) -> Option<Point3d> {
        let mercator = self.mercator.project(input)?;
        Some(self.scene_point(&mercator, altitude_or_zero(input)))
    }

    fn unproject(&self, input: &Point3d) -> Option<GeoCoordinate> {
        let coordinate = self.mercator.unproject(&self.mercator_point(input))?;
        Some(coordinate.set_altitude(input.z))
    }
}
