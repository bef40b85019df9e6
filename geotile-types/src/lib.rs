//! Value types and projection math used by the `geotile` tile cache.
//!
//! Coordinates travel through three spaces:
//!
//! * geographic ([`GeoCoordinate`](geo::GeoCoordinate)) - latitude and longitude in degrees plus
//!   an optional altitude,
//! * normalized web mercator ([`MercatorPoint`](geo::MercatorPoint)) - the `[0, 1] x [0, 1]`
//!   square with the origin at the north-west corner,
//! * scene space ([`Point3d`](cartesian::Point3d)) - mercator space scaled to a square of a
//!   given side length with the Y axis pointing up.
//!
//! [`SceneProjection`](geo::SceneProjection) converts between all three and interpolates
//! coordinates for camera and marker animations.

pub mod cartesian;
pub mod error;
pub mod geo;

pub use error::GeoTypesError;
