//! Cartesian points used for projected and scene coordinates.

use nalgebra::{Point3, Scalar};
use num_traits::Float;

/// 3d point with `f64` coordinates. Used as a scene point.
pub type Point3d = Point3<f64>;

/// Point in a 2d cartesian coordinate system.
pub trait CartesianPoint2d {
    /// Numeric type of the coordinates.
    type Num: Float + Scalar;

    /// X coordinate.
    fn x(&self) -> Self::Num;
    /// Y coordinate.
    fn y(&self) -> Self::Num;
}
