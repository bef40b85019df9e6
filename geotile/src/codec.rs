//! Mapping between [`TileSpec`]s and cache file names.
//!
//! The cache doesn't know how a provider names its files. Instead it is given a [`TileSpecCodec`]
//! that encodes specs into file names and recognizes its own files when the cache directory is
//! scanned. [`DefaultTileSpecCodec`] implements the default scheme:
//!
//! ```text
//! {plugin}-{map_id}-{zoom}-{x}-{y}[-{version}]-{ppi}.{format}
//! ```
//!
//! The `ppi` suffix identifies the pixel density of the tiles. Several caches with different
//! densities can share one directory: each of them treats the files of the others as foreign
//! ([`DecodedFilename::NotMine`]) and never touches them.

use crate::error::TileCacheError;
use crate::tile_spec::TileSpec;

const FIELD_SEPARATOR: char = '-';
const EXTENSION_SEPARATOR: char = '.';

/// Result of decoding a file name found in the cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedFilename {
    /// File belongs to this cache and stores the given tile.
    Tile {
        /// Tile stored in the file.
        spec: TileSpec,
        /// Image format (file extension) of the tile.
        format: String,
    },
    /// File is not recognized as a tile of this cache and must be left untouched.
    NotMine,
    /// File is named as a tile of this cache, but the name is malformed. Such files are garbage
    /// and can be deleted.
    Corrupt,
}

impl DecodedFilename {
    /// Returns the tile spec if the file was recognized as a tile.
    pub fn spec(&self) -> Option<&TileSpec> {
        match self {
            DecodedFilename::Tile { spec, .. } => Some(spec),
            _ => None,
        }
    }
}

/// Strategy for naming cache files.
///
/// Implementations must be bijective on the files they recognize: decoding the result of
/// [`TileSpecCodec::encode`] must give back the same spec and format.
pub trait TileSpecCodec: Send + Sync {
    /// Returns the file name (without directory) for the tile.
    fn encode(&self, spec: &TileSpec, format: &str) -> Result<String, TileCacheError>;

    /// Recognizes a file name (without directory).
    fn decode(&self, filename: &str) -> DecodedFilename;

    /// Some providers return placeholder images instead of errors for missing tiles. Such tiles
    /// are served from memory but never written to disk.
    fn is_tile_bogus(&self, _bytes: &[u8]) -> bool {
        false
    }
}

/// Default file naming scheme of the cache. See [module documentation](self).
#[derive(Debug, Clone)]
pub struct DefaultTileSpecCodec {
    ppi: String,
}

impl DefaultTileSpecCodec {
    /// Creates a codec with the given density suffix. The suffix must be a valid file name field
    /// (see [`is_valid_name_field`]).
    pub fn new(ppi: impl Into<String>) -> Result<Self, TileCacheError> {
        let ppi = ppi.into();
        if !is_valid_name_field(&ppi) {
            return Err(TileCacheError::InvalidConfig(format!(
                "ppi suffix {ppi:?} cannot be used in a file name"
            )));
        }

        Ok(Self { ppi })
    }

    /// Density suffix of the files of this codec.
    pub fn ppi(&self) -> &str {
        &self.ppi
    }
}

impl TileSpecCodec for DefaultTileSpecCodec {
    fn encode(&self, spec: &TileSpec, format: &str) -> Result<String, TileCacheError> {
        if !spec.has_encodable_plugin_id() {
            return Err(TileCacheError::InvalidTileSpec(format!(
                "plugin id {:?} cannot be used in a file name",
                spec.plugin_id()
            )));
        }

        if !is_valid_name_field(format) {
            return Err(TileCacheError::InvalidFormat(format.to_owned()));
        }

        let mut filename = format!(
            "{}-{}-{}-{}-{}",
            spec.plugin_id(),
            spec.map_id(),
            spec.zoom(),
            spec.x(),
            spec.y()
        );
        if let Some(version) = spec.version() {
            filename.push_str(&format!("-{version}"));
        }
        filename.push_str(&format!("-{}.{format}", self.ppi));

        Ok(filename)
    }

    fn decode(&self, filename: &str) -> DecodedFilename {
        let Some((stem, format)) = filename.rsplit_once(EXTENSION_SEPARATOR) else {
            return DecodedFilename::NotMine;
        };

        let fields: Vec<&str> = stem.split(FIELD_SEPARATOR).collect();
        if fields.last() != Some(&self.ppi.as_str()) {
            return DecodedFilename::NotMine;
        }

        if fields.len() != 6 && fields.len() != 7 {
            return DecodedFilename::Corrupt;
        }

        let plugin_id = fields[0];
        if plugin_id.is_empty() || format.is_empty() {
            return DecodedFilename::Corrupt;
        }

        let mut numbers = Vec::with_capacity(5);
        for field in &fields[1..fields.len() - 1] {
            match parse_number(field) {
                Some(value) => numbers.push(value),
                None => return DecodedFilename::Corrupt,
            }
        }

        let version = numbers.get(4).copied();
        let spec = TileSpec::new(plugin_id, numbers[0], numbers[1], numbers[2], numbers[3])
            .with_version(version);

        DecodedFilename::Tile {
            spec,
            format: format.to_owned(),
        }
    }
}

/// A file name field must be non-empty and must not contain separators.
pub fn is_valid_name_field(value: &str) -> bool {
    !value.is_empty()
        && !value.contains([FIELD_SEPARATOR, EXTENSION_SEPARATOR, '/', '\\', '\0'])
}

fn parse_number(field: &str) -> Option<u32> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    field.parse().ok()
}
