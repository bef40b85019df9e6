use approx::AbsDiffEq;
use serde::{Deserialize, Serialize};

use crate::cartesian::CartesianPoint2d;

/// Point in normalized web mercator space.
///
/// Both coordinates are in `[0, 1]`. `(0, 0)` is the north-west corner of the projected world,
/// `(1, 1)` the south-east one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct MercatorPoint {
    x: f64,
    y: f64,
}

impl MercatorPoint {
    /// Creates a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns a copy with both coordinates clamped into `[0, 1]`.
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
        }
    }
}

impl CartesianPoint2d for MercatorPoint {
    type Num = f64;

    fn x(&self) -> f64 {
        self.x
    }

    fn y(&self) -> f64 {
        self.y
    }
}

impl AbsDiffEq for MercatorPoint {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.x.abs_diff_eq(&other.x, epsilon) && self.y.abs_diff_eq(&other.y, epsilon)
    }
}
