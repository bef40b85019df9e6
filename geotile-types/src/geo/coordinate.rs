use approx::AbsDiffEq;
use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Point on the surface of the Earth given by latitude and longitude.
pub trait GeoPoint {
    /// Numeric type used to represent coordinates.
    type Num: Float;

    /// Latitude in degrees.
    fn lat(&self) -> Self::Num;
    /// Longitude in degrees.
    fn lon(&self) -> Self::Num;
}

/// Geographic coordinate: latitude and longitude in degrees and an optional altitude in meters.
///
/// Absent altitude is stored as `NaN`. Two coordinates are equal when their latitudes and
/// longitudes are equal and their altitudes are either equal or both absent.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct GeoCoordinate {
    lat: f64,
    lon: f64,
    alt: f64,
}

impl GeoCoordinate {
    /// Creates a coordinate without altitude.
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            alt: f64::NAN,
        }
    }

    /// Creates a coordinate with the given altitude.
    pub fn with_altitude(lat: f64, lon: f64, alt: f64) -> Self {
        Self { lat, lon, alt }
    }

    /// Altitude in meters, `NaN` if absent.
    pub fn altitude(&self) -> f64 {
        self.alt
    }

    /// Returns true if the altitude is set.
    pub fn has_altitude(&self) -> bool {
        !self.alt.is_nan()
    }

    /// Returns a copy of the coordinate with the altitude replaced.
    pub fn set_altitude(self, alt: f64) -> Self {
        Self { alt, ..self }
    }
}

impl PartialEq for GeoCoordinate {
    fn eq(&self, other: &Self) -> bool {
        self.lat == other.lat
            && self.lon == other.lon
            && (self.alt == other.alt || (self.alt.is_nan() && other.alt.is_nan()))
    }
}

impl AbsDiffEq for GeoCoordinate {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.lat.abs_diff_eq(&other.lat, epsilon)
            && self.lon.abs_diff_eq(&other.lon, epsilon)
            && (self.alt.abs_diff_eq(&other.alt, epsilon)
                || (self.alt.is_nan() && other.alt.is_nan()))
    }
}

impl GeoPoint for GeoCoordinate {
    type Num = f64;

    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

/// Creates a new [`GeoCoordinate`] from latitude and longitude values (in degrees).
///
/// ```
/// use geotile_types::geo::GeoPoint;
/// use geotile_types::latlon;
///
/// let point = latlon!(38.0, 52.0);
/// assert_eq!(point.lat(), 38.0);
/// ```
#[macro_export]
macro_rules! latlon {
    ($lat:expr, $lon:expr) => {
        $crate::geo::GeoCoordinate::new($lat, $lon)
    };
    ($lat:expr, $lon:expr, $alt:expr) => {
        $crate::geo::GeoCoordinate::with_altitude($lat, $lon, $alt)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_altitudes_are_equal() {
        assert_eq!(latlon!(10.0, 20.0), latlon!(10.0, 20.0));
        assert_eq!(latlon!(10.0, 20.0, 5.0), latlon!(10.0, 20.0, 5.0));
        assert_ne!(latlon!(10.0, 20.0), latlon!(10.0, 20.0, 5.0));
        assert_ne!(latlon!(10.0, 20.0), latlon!(10.0, 20.5));
    }

    #[test]
    fn serialization_keeps_values() {
        let point = latlon!(1.5, -2.5, 100.0);
        let json = serde_json::to_string(&point).expect("serialize");
        let restored: GeoCoordinate = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(point, restored);
    }
}
