//! Error types used by the crate.

use thiserror::Error;

/// Tile cache error type.
#[derive(Debug, Error)]
pub enum TileCacheError {
    /// Error reading/writing data to the FS.
    #[error("file system error: {0}")]
    Io(#[from] std::io::Error),
    /// Tile spec cannot be represented as a cache file name.
    #[error("invalid tile spec: {0}")]
    InvalidTileSpec(String),
    /// Tile format cannot be used as a file extension.
    #[error("invalid tile format: {0}")]
    InvalidFormat(String),
    /// Cache configuration is not valid.
    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),
    /// Item not found.
    #[error("item not found")]
    NotFound,
    /// Tile fetcher failed to load the tile.
    #[error("failed to fetch tile: {0}")]
    Fetch(String),
    /// Background task failed.
    #[error("background task failed: {0}")]
    Runtime(String),
}

impl From<tokio::task::JoinError> for TileCacheError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Runtime(value.to_string())
    }
}
