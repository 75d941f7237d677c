//! Read access to encoded tiles
//!
//! The top-level tile message is sliced into per-layer views without copying,
//! so a layer can later be re-emitted byte for byte. Individual layers are
//! decoded on demand.

use prost::Message;

use crate::error::{Error, Result};

use super::mvt::{proto, GeomType, Value};
use super::pbf;

/// Field number of `Tile.layers`
const LAYERS_FIELD: u32 = 3;

/// A parsed tile: an ordered list of raw layer views
pub struct TileReader<'a> {
    layers: Vec<&'a [u8]>,
}

impl<'a> TileReader<'a> {
    /// Slice a tile buffer into its layer submessages
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let mut layers = Vec::new();
        let mut pos = 0;
        while pos < data.len() {
            let key = pbf::read_varint(data, &mut pos)?;
            let (field, wire_type) = pbf::split_key(key);
            if field == LAYERS_FIELD && wire_type == pbf::WIRE_LEN {
                let len = pbf::read_varint(data, &mut pos)? as usize;
                let end = pos
                    .checked_add(len)
                    .filter(|end| *end <= data.len())
                    .ok_or_else(|| Error::decode("layer extends past end of tile"))?;
                layers.push(&data[pos..end]);
                pos = end;
            } else {
                pbf::skip_value(data, &mut pos, wire_type)?;
            }
        }
        Ok(Self { layers })
    }

    /// Number of layers in the tile
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Decode the layers in tile order
    pub fn layers(&self) -> impl Iterator<Item = Result<LayerReader<'a>>> + '_ {
        self.layers.iter().map(|raw| LayerReader::parse(raw))
    }
}

/// A decoded layer together with its raw encoded view
pub struct LayerReader<'a> {
    raw: &'a [u8],
    layer: proto::Layer,
}

impl<'a> LayerReader<'a> {
    /// Decode a single layer submessage
    pub fn parse(raw: &'a [u8]) -> Result<Self> {
        let layer = proto::Layer::decode(raw)?;
        Ok(Self { raw, layer })
    }

    /// The encoded layer, exactly as it appeared in the source tile
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    /// Layer name
    pub fn name(&self) -> &str {
        &self.layer.name
    }

    /// Layer version (1 or 2)
    pub fn version(&self) -> u32 {
        self.layer.version
    }

    /// Layer extent; the MVT default when absent
    pub fn extent(&self) -> u32 {
        self.layer.extent.unwrap_or(crate::DEFAULT_EXTENT)
    }

    /// Size of the layer's key table
    pub fn key_count(&self) -> usize {
        self.layer.keys.len()
    }

    /// Size of the layer's value table
    pub fn value_count(&self) -> usize {
        self.layer.values.len()
    }

    /// Look up a key by table index
    pub fn key(&self, index: u32) -> Result<&str> {
        self.layer
            .keys
            .get(index as usize)
            .map(String::as_str)
            .ok_or_else(|| Error::Decode(format!("key index {index} out of range")))
    }

    /// Look up a value by table index
    pub fn value(&self, index: u32) -> Result<Value> {
        let value = self
            .layer
            .values
            .get(index as usize)
            .ok_or_else(|| Error::Decode(format!("value index {index} out of range")))?;
        Value::from_proto(value)
    }

    /// Number of features in the layer
    pub fn feature_count(&self) -> usize {
        self.layer.features.len()
    }

    /// Iterate features in layer order
    pub fn features<'l>(&'l self) -> impl Iterator<Item = FeatureReader<'l, 'a>> + 'l {
        self.layer
            .features
            .iter()
            .map(move |feature| FeatureReader {
                layer: self,
                feature,
            })
    }
}

/// A feature within a decoded layer
pub struct FeatureReader<'l, 'a> {
    layer: &'l LayerReader<'a>,
    feature: &'l proto::Feature,
}

impl<'l, 'a> FeatureReader<'l, 'a> {
    /// Feature id, if present
    pub fn id(&self) -> Option<u64> {
        self.feature.id
    }

    /// Decoded geometry type
    pub fn geom_type(&self) -> GeomType {
        self.feature
            .r#type
            .and_then(|t| GeomType::try_from(t).ok())
            .unwrap_or(GeomType::Unknown)
    }

    /// Raw geometry command integers
    pub fn geometry(&self) -> &'l [u32] {
        &self.feature.geometry
    }

    /// Property tag pairs as (key index, value index)
    pub fn tag_pairs(&self) -> Result<impl Iterator<Item = (u32, u32)> + 'l> {
        let tags = &self.feature.tags;
        if tags.len() % 2 != 0 {
            return Err(Error::decode("feature has an odd number of tag integers"));
        }
        Ok(tags.chunks_exact(2).map(|pair| (pair[0], pair[1])))
    }

    /// Resolved properties in tag order
    pub fn properties(&self) -> Properties<'l, 'a> {
        Properties {
            layer: self.layer,
            tags: &self.feature.tags,
            pos: 0,
        }
    }
}

/// Iterator over a feature's resolved (key, value) properties
pub struct Properties<'l, 'a> {
    layer: &'l LayerReader<'a>,
    tags: &'l [u32],
    pos: usize,
}

impl<'l, 'a> Iterator for Properties<'l, 'a> {
    type Item = Result<(&'l str, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.tags.len() {
            return None;
        }
        if self.pos + 1 >= self.tags.len() {
            self.pos = self.tags.len();
            return Some(Err(Error::decode(
                "feature has an odd number of tag integers",
            )));
        }
        let key = self.tags[self.pos];
        let value = self.tags[self.pos + 1];
        self.pos += 2;
        Some(
            self.layer
                .key(key)
                .and_then(|k| self.layer.value(value).map(|v| (k, v))),
        )
    }
}
