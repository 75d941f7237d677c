//! # Tilefuse
//!
//! Server-side compositing and localization of Mapbox Vector Tiles.
//!
//! ## Features
//!
//! - **Composite**: merge source tiles into a single target tile, overzooming
//!   coarser sources by scaling, translating, and clipping their geometry
//!   into the target frame
//! - **Localize**: rewrite a tile's properties for a language and worldview
//!   policy, promoting hidden shadow properties and pruning features that do
//!   not apply
//! - **Byte-exact copies**: sources already at the target zoom contribute
//!   their layers without re-encoding
//! - **Compression envelope**: gzip/zlib autodetect on ingest, optional gzip
//!   on emit, with a decompressed-size cap
//!
//! ## Example
//!
//! ```no_run
//! use tilefuse::{composite, CompositeOptions, SourceTile, TileId};
//!
//! # fn main() -> tilefuse::Result<()> {
//! let buffer = std::fs::read("0-0-0.mvt")?;
//! let tiles = vec![SourceTile::new(0, 0, 0, &buffer)];
//! let output = composite(&tiles, TileId::new(2, 1, 1), &CompositeOptions::default())?;
//! # Ok(())
//! # }
//! ```

pub mod composite;
pub mod encoding;
pub mod error;
pub mod localize;
pub mod tile;

// Re-export commonly used types
pub use composite::{composite, CompositeOptions, SourceTile};
pub use error::{Error, Result};
pub use localize::{localize, LocalizeOptions};
pub use tile::TileId;

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tile extent (MVT specification)
pub const DEFAULT_EXTENT: u32 = 4096;

/// Maximum zoom-level spread between a source tile and the composite target
pub const MAX_OVERZOOM: u32 = 30;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_EXTENT, 4096);
        assert_eq!(MAX_OVERZOOM, 30);
    }
}
