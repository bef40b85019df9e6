//! Error type used by the crate.

use thiserror::Error;

/// Error enum.
#[derive(Debug, Error, PartialEq)]
pub enum GeoTypesError {
    /// Projection parameters are out of their valid range.
    #[error("invalid projection parameter: {0}")]
    InvalidParameter(String),
}
