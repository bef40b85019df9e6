//! Geographic coordinates (see [`GeoCoordinate`]) and their conversion into normalized mercator
//! and scene spaces (see [`Projection`], [`WebMercator`] and [`SceneProjection`]).

mod coordinate;
mod mercator_point;
mod projection;
mod scene;
mod web_mercator;

pub use coordinate::{GeoCoordinate, GeoPoint};
pub use mercator_point::MercatorPoint;
pub use projection::Projection;
pub use scene::SceneProjection;
pub use web_mercator::{WebMercator, MAX_LATITUDE};
