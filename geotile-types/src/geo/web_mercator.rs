use std::f64::consts::{FRAC_PI_4, PI};

use crate::cartesian::CartesianPoint2d;
use crate::error::GeoTypesError;
use crate::geo::coordinate::{GeoCoordinate, GeoPoint};
use crate::geo::mercator_point::MercatorPoint;
use crate::geo::projection::Projection;

/// Latitude at which the spherical web mercator square ends, in degrees.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Spherical web mercator projection into the normalized `[0, 1] x [0, 1]` square.
///
/// Longitude maps linearly onto `x`, latitude onto `y` via the mercator stretch. `y == 0` is the
/// northern bound of the projection and `y == 1` the southern one. Poles are asymptotic, so
/// latitudes are clamped to `±max_latitude` in both directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebMercator {
    max_latitude: f64,
}

impl Default for WebMercator {
    fn default() -> Self {
        Self {
            max_latitude: MAX_LATITUDE,
        }
    }
}

impl WebMercator {
    /// Projection clamped at the standard web mercator latitude.
    pub fn new() -> Self {
        Self::default()
    }

    /// Projection clamped at a custom latitude. The value must be in `(0, 90)`.
    pub fn with_max_latitude(max_latitude: f64) -> Result<Self, GeoTypesError> {
        if !(max_latitude > 0.0 && max_latitude < 90.0) {
            return Err(GeoTypesError::InvalidParameter(format!(
                "max latitude must be in (0, 90), got {max_latitude}"
            )));
        }

        Ok(Self { max_latitude })
    }

    /// Maximum absolute latitude representable by the projection.
    pub fn max_latitude(&self) -> f64 {
        self.max_latitude
    }

    /// Forward projection. Altitude of the coordinate is ignored.
    pub fn coordinate_to_mercator(&self, coordinate: &GeoCoordinate) -> MercatorPoint {
        let lat = coordinate
            .lat()
            .clamp(-self.max_latitude, self.max_latitude)
            .to_radians();

        let x = coordinate.lon() / 360.0 + 0.5;
        let y = 0.5 - (FRAC_PI_4 + lat / 2.0).tan().ln() / (2.0 * PI);

        MercatorPoint::new(x, y).clamped()
    }

    /// Inverse projection. The returned coordinate has no altitude and its longitude is in
    /// `(-180, 180]`.
    pub fn mercator_to_coordinate(&self, point: &MercatorPoint) -> GeoCoordinate {
        let mut lon = 360.0 * (point.x() - 0.5);
        if lon <= -180.0 {
            lon += 360.0;
        }

        let lat = (PI * (1.0 - 2.0 * point.y()))
            .sinh()
            .atan()
            .to_degrees()
            .clamp(-self.max_latitude, self.max_latitude);

        GeoCoordinate::new(lat, lon)
    }
}

impl Projection for WebMercator {
    type InPoint = GeoCoordinate;
    type OutPoint = MercatorPoint;

    fn project(&self, input: &GeoCoordinate) -> Option<MercatorPoint> {
        if !input.lat().is_finite() || !input.lon().is_finite() {
            return None;
        }

        Some(self.coordinate_to_mercator(input))
    }

    fn unproject(&self, input: &MercatorPoint) -> Option<GeoCoordinate> {
        if !input.x().is_finite() || !input.y().is_finite() {
            return None;
        }

        Some(self.mercator_to_coordinate(input))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;

    use super::*;
    use crate::latlon;

    #[test]
    fn projects_corners() {
        let projection = WebMercator::new();

        let center = projection.coordinate_to_mercator(&latlon!(0.0, 0.0));
        assert_abs_diff_eq!(center, MercatorPoint::new(0.5, 0.5), epsilon = 1e-12);

        let north_west = projection.coordinate_to_mercator(&latlon!(MAX_LATITUDE, -180.0));
        assert_abs_diff_eq!(north_west.x(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(north_west.y(), 0.0, epsilon = 1e-9);

        let south_east = projection.coordinate_to_mercator(&latlon!(-MAX_LATITUDE, 180.0));
        assert_abs_diff_eq!(south_east.x(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(south_east.y(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn clamps_poles() {
        let projection = WebMercator::new();
        let north = projection.coordinate_to_mercator(&latlon!(90.0, 10.0));
        assert!(north.y().is_finite());
        assert_abs_diff_eq!(north.y(), 0.0, epsilon = 1e-9);

        let back = projection.mercator_to_coordinate(&MercatorPoint::new(0.5, 0.0));
        assert_abs_diff_eq!(back.lat(), MAX_LATITUDE, epsilon = 1e-9);
    }

    #[test]
    fn round_trip() {
        let projection = WebMercator::new();
        for (lat, lon) in [
            (0.0, 0.0),
            (55.75, 37.61),
            (-33.86, 151.2),
            (85.05, 179.99),
            (-85.05, -179.99),
            (12.3, 180.0),
        ] {
            let point = projection.coordinate_to_mercator(&latlon!(lat, lon));
            let coordinate = projection.mercator_to_coordinate(&point);
            assert_abs_diff_eq!(coordinate, latlon!(lat, lon), epsilon = 1e-9);
        }
    }

    #[test]
    fn west_edge_maps_to_positive_antimeridian() {
        let projection = WebMercator::new();
        let coordinate = projection.mercator_to_coordinate(&MercatorPoint::new(0.0, 0.5));
        assert_eq!(coordinate.lon(), 180.0);
    }

    #[test]
    fn projection_trait_rejects_non_finite() {
        let projection = WebMercator::new();
        assert!(projection.project(&latlon!(f64::NAN, 0.0)).is_none());
        assert!(projection
            .unproject(&MercatorPoint::new(f64::INFINITY, 0.0))
            .is_none());
        assert!(projection.project(&latlon!(10.0, 10.0)).is_some());
    }

    #[test]
    fn invalid_max_latitude() {
        assert_matches!(
            WebMercator::with_max_latitude(0.0),
            Err(GeoTypesError::InvalidParameter(_))
        );
        assert!(WebMercator::with_max_latitude(90.0).is_err());
        assert!(WebMercator::with_max_latitude(f64::NAN).is_err());
        assert_eq!(
            WebMercator::with_max_latitude(80.0).map(|p| p.max_latitude()),
            Ok(80.0)
        );
    }
}
