use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::codec::is_valid_name_field;
use crate::error::TileCacheError;

const DEFAULT_CACHE_FOLDER: &str = ".tile_cache";
const DEFAULT_MAX_DISK_USAGE: usize = 100 * 1024 * 1024;
const DEFAULT_MAX_MEMORY_USAGE: usize = 50 * 1024 * 1024;
const DEFAULT_PPI: &str = "100";
const DEFAULT_FORMAT: &str = "png";

/// How the size of a tile is counted against a cache limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CostStrategy {
    /// A tile costs its size in bytes. Limits are byte counts.
    #[default]
    ByteSize,
    /// Every tile costs `1`. Limits are tile counts.
    Unitary,
}

impl CostStrategy {
    /// Cost of a tile with the given payload size.
    pub fn cost(&self, byte_size: usize) -> usize {
        match self {
            CostStrategy::ByteSize => byte_size,
            CostStrategy::Unitary => 1,
        }
    }
}

/// Configuration of a [`TileCache`](super::TileCache).
///
/// The configuration is fixed when the cache is opened.
///
/// ```
/// use geotile::cache::{CostStrategy, TileCacheConfig};
///
/// let config = TileCacheConfig::new("/tmp/tiles")
///     .with_max_memory_usage(16 * 1024 * 1024)
///     .with_max_disk_usage(1000)
///     .with_disk_cost_strategy(CostStrategy::Unitary)
///     .with_ppi("200");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TileCacheConfig {
    directory: PathBuf,
    max_disk_usage: usize,
    max_memory_usage: usize,
    ppi: String,
    default_format: String,
    disk_cost_strategy: CostStrategy,
    memory_cost_strategy: CostStrategy,
}

impl Default for TileCacheConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_FOLDER)
    }
}

impl TileCacheConfig {
    /// Default configuration for a cache in the given directory.
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().into(),
            max_disk_usage: DEFAULT_MAX_DISK_USAGE,
            max_memory_usage: DEFAULT_MAX_MEMORY_USAGE,
            ppi: DEFAULT_PPI.to_owned(),
            default_format: DEFAULT_FORMAT.to_owned(),
            disk_cost_strategy: CostStrategy::default(),
            memory_cost_strategy: CostStrategy::default(),
        }
    }

    /// Sets the disk limit.
    pub fn with_max_disk_usage(mut self, max_disk_usage: usize) -> Self {
        self.max_disk_usage = max_disk_usage;
        self
    }

    /// Sets the memory limit.
    pub fn with_max_memory_usage(mut self, max_memory_usage: usize) -> Self {
        self.max_memory_usage = max_memory_usage;
        self
    }

    /// Sets the density suffix of cache files.
    pub fn with_ppi(mut self, ppi: impl Into<String>) -> Self {
        self.ppi = ppi.into();
        self
    }

    /// Sets the format used by [`TileCache::insert`](super::TileCache::insert).
    pub fn with_default_format(mut self, format: impl Into<String>) -> Self {
        self.default_format = format.into();
        self
    }

    /// Sets how tiles are counted against the disk limit.
    pub fn with_disk_cost_strategy(mut self, strategy: CostStrategy) -> Self {
        self.disk_cost_strategy = strategy;
        self
    }

    /// Sets how tiles are counted against the memory limit.
    pub fn with_memory_cost_strategy(mut self, strategy: CostStrategy) -> Self {
        self.memory_cost_strategy = strategy;
        self
    }

    /// Cache directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Disk limit.
    pub fn max_disk_usage(&self) -> usize {
        self.max_disk_usage
    }

    /// Memory limit.
    pub fn max_memory_usage(&self) -> usize {
        self.max_memory_usage
    }

    /// Density suffix of cache files.
    pub fn ppi(&self) -> &str {
        &self.ppi
    }

    /// Format of tiles inserted without an explicit format.
    pub fn default_format(&self) -> &str {
        &self.default_format
    }

    /// Disk cost strategy.
    pub fn disk_cost_strategy(&self) -> CostStrategy {
        self.disk_cost_strategy
    }

    /// Memory cost strategy.
    pub fn memory_cost_strategy(&self) -> CostStrategy {
        self.memory_cost_strategy
    }

    pub(crate) fn validate(&self) -> Result<(), TileCacheError> {
        if self.directory.as_os_str().is_empty() {
            return Err(TileCacheError::InvalidConfig(
                "cache directory is not set".to_owned(),
            ));
        }

        if !is_valid_name_field(&self.ppi) {
            return Err(TileCacheError::InvalidConfig(format!(
                "ppi suffix {:?} cannot be used in a file name",
                self.ppi
            )));
        }

        if !is_valid_name_field(&self.default_format) {
            return Err(TileCacheError::InvalidConfig(format!(
                "default format {:?} cannot be used as a file extension",
                self.default_format
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TileCacheConfig::default();
        assert_eq!(config.directory(), Path::new(DEFAULT_CACHE_FOLDER));
        assert_eq!(config.max_disk_usage(), 100 * 1024 * 1024);
        assert_eq!(config.max_memory_usage(), 50 * 1024 * 1024);
        assert_eq!(config.ppi(), "100");
        assert_eq!(config.default_format(), "png");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation() {
        assert!(TileCacheConfig::new("").validate().is_err());
        assert!(TileCacheConfig::new("tiles")
            .with_ppi("1-2")
            .validate()
            .is_err());
        assert!(TileCacheConfig::new("tiles")
            .with_default_format("")
            .validate()
            .is_err());
    }

    #[test]
    fn unitary_cost() {
        assert_eq!(CostStrategy::Unitary.cost(12345), 1);
        assert_eq!(CostStrategy::ByteSize.cost(12345), 12345);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializes_partial_config() {
        let config: TileCacheConfig = serde_json::from_str(
            r#"{"directory": "/var/cache/tiles", "max_memory_usage": 1000, "memory_cost_strategy": "Unitary"}"#,
        )
        .expect("valid config");

        assert_eq!(config.directory(), Path::new("/var/cache/tiles"));
        assert_eq!(config.max_memory_usage(), 1000);
        assert_eq!(config.memory_cost_strategy(), CostStrategy::Unitary);
        assert_eq!(config.max_disk_usage(), DEFAULT_MAX_DISK_USAGE);
    }
}
