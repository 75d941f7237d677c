//! Tile compositing
//!
//! Merges source tiles, possibly from coarser zooms, into a single tile at a
//! target coordinate. Sources at the target zoom contribute byte-for-byte
//! layer copies; coarser sources are overzoomed per feature. Layer names are
//! deduplicated first-in-wins across all source tiles.

pub(crate) mod clip;
pub(crate) mod feature;
pub(crate) mod reframe;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::encoding::builder::{LayerBuilder, PropertyMapper, TileBuilder};
use crate::encoding::compression::{is_compressed, Compressor, Decompressor};
use crate::encoding::reader::TileReader;
use crate::error::{Error, Result};
use crate::tile::{displacement, TileId};
use crate::MAX_OVERZOOM;

use self::clip::ClipBox;
use self::feature::OverzoomBuilder;

const MVT_VERSION_1: u32 = 1;

/// One source tile of a composite request
///
/// The tile bytes are borrowed for the duration of the operation and may be
/// raw protobuf or gzip/zlib-wrapped protobuf.
#[derive(Debug, Clone)]
pub struct SourceTile<'a> {
    /// Source zoom level
    pub z: u32,
    /// Source column
    pub x: u32,
    /// Source row
    pub y: u32,
    /// Encoded tile bytes
    pub data: &'a [u8],
    /// Layer allowlist; `None` admits every layer
    pub layers: Option<Vec<String>>,
}

impl<'a> SourceTile<'a> {
    /// Create a source tile admitting all layers
    pub fn new(z: u32, x: u32, y: u32, data: &'a [u8]) -> Self {
        Self {
            z,
            x,
            y,
            data,
            layers: None,
        }
    }

    /// Restrict the source to the named layers
    pub fn with_layers(mut self, layers: Vec<String>) -> Self {
        self.layers = Some(layers);
        self
    }

    /// The source tile's pyramid coordinate
    pub fn id(&self) -> TileId {
        TileId::new(self.z, self.x, self.y)
    }
}

/// Composite options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CompositeOptions {
    /// Clipping buffer around the target extent, in tile coordinates
    pub buffer_size: u32,
    /// Gzip the output when it is non-empty
    pub compress: bool,
}

impl Default for CompositeOptions {
    fn default() -> Self {
        Self {
            buffer_size: 0,
            compress: false,
        }
    }
}

/// Composite source tiles into a single tile at `target`
pub fn composite(
    tiles: &[SourceTile<'_>],
    target: TileId,
    options: &CompositeOptions,
) -> Result<Vec<u8>> {
    validate(tiles, target)?;

    let decompressor = Decompressor::new();
    let mut decoded: Vec<Cow<'_, [u8]>> = Vec::with_capacity(tiles.len());
    for tile in tiles {
        let source = tile.id();
        if !source.within_target(target) {
            return Err(Error::InvalidRequest(format!(
                "Invalid tile composite request: SOURCE({},{},{}) TARGET({},{},{})",
                tile.z, tile.x, tile.y, target.z, target.x, target.y
            )));
        }
        if target.z - source.z > MAX_OVERZOOM {
            return Err(Error::InvalidRequest(format!(
                "overzoom from z{} to z{} exceeds the supported {} levels",
                source.z, target.z, MAX_OVERZOOM
            )));
        }
        decoded.push(if is_compressed(tile.data) {
            Cow::Owned(decompressor.decompress(tile.data)?)
        } else {
            Cow::Borrowed(tile.data)
        });
    }

    let mut builder = TileBuilder::new();
    let mut emitted_names: Vec<String> = Vec::new();

    for (tile, bytes) in tiles.iter().zip(decoded.iter()) {
        let zoom_factor = 1i64 << (target.z - tile.z);
        let reader = TileReader::parse(bytes.as_ref())?;
        for layer in reader.layers() {
            let layer = layer?;
            if emitted_names.iter().any(|name| name == layer.name()) {
                continue;
            }
            if let Some(allow) = &tile.layers {
                if !allow.iter().any(|name| name == layer.name()) {
                    continue;
                }
            }
            emitted_names.push(layer.name().to_owned());

            if zoom_factor == 1 {
                builder.add_existing_layer(layer.raw());
                continue;
            }

            let extent = layer.extent();
            let (dx, dy) = displacement(tile.z, extent, target);
            let clip = ClipBox::new(i64::from(extent), i64::from(options.buffer_size));
            let overzoom = OverzoomBuilder::new(clip, zoom_factor, dx, dy);
            let mut dest = LayerBuilder::new(layer.name(), layer.version(), extent);
            let mut mapper = PropertyMapper::new(&layer);
            let lenient = layer.version() == MVT_VERSION_1;

            for feature in layer.features() {
                match overzoom.apply(&layer, &feature, &mut dest, &mut mapper) {
                    Ok(()) => {}
                    Err(Error::Geometry(message)) if lenient => {
                        tracing::warn!(
                            layer = layer.name(),
                            "skipping feature with malformed geometry (v1): {message}"
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
            builder.add_layer(dest);
        }
    }

    let buffer = builder.serialize()?;
    if options.compress {
        Compressor::new().compress(&buffer)
    } else {
        Ok(buffer)
    }
}

fn validate(tiles: &[SourceTile<'_>], target: TileId) -> Result<()> {
    if tiles.is_empty() {
        return Err(Error::validation(
            "'tiles' array must be of length greater than 0",
        ));
    }
    for tile in tiles {
        validate_coordinate(tile.id())?;
        if let Some(layers) = &tile.layers {
            if layers.is_empty() {
                return Err(Error::validation(
                    "'layers' array in 'tiles' object must be of length greater than 0",
                ));
            }
            if layers.iter().any(String::is_empty) {
                return Err(Error::validation(
                    "'layers' values in 'tiles' object must be non-empty strings",
                ));
            }
        }
    }
    validate_coordinate(target)
}

fn validate_coordinate(tile: TileId) -> Result<()> {
    if tile.z < 32 {
        let limit = 1u64 << tile.z;
        if u64::from(tile.x) >= limit || u64::from(tile.y) >= limit {
            return Err(Error::Validation(format!(
                "tile ({}) has out-of-range coordinates for its zoom",
                tile
            )));
        }
    }
    Ok(())
}
