//! Tile, layer, and feature builders
//!
//! Mirrors the MVT encoding rules: per-layer key/value tables deduplicated in
//! first-seen order, features referencing table entries by index, geometry as
//! delta-encoded command integers with a cursor continuous across parts.

use bytes::{BufMut, BytesMut};
use geo_types::Coord;
use prost::Message;
use std::collections::HashMap;

use crate::error::{Error, Result};

use super::geometry::{command, zigzag, CLOSE_PATH, LINE_TO, MOVE_TO};
use super::mvt::{proto, GeomType, Value};
use super::pbf;
use super::reader::LayerReader;

/// Field number of `Tile.layers`
const LAYERS_FIELD: u32 = 3;

/// Builds a tile from existing layer views and newly built layers
///
/// Existing layers are copied into the output byte for byte. Built layers
/// that end up with no committed features are omitted, so a tile with nothing
/// to say serializes to an empty buffer.
#[derive(Default)]
pub struct TileBuilder<'a> {
    layers: Vec<PendingLayer<'a>>,
}

enum PendingLayer<'a> {
    Existing(&'a [u8]),
    Built(LayerBuilder),
}

impl<'a> TileBuilder<'a> {
    /// Create an empty tile builder
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Append an already-encoded layer without re-encoding it
    pub fn add_existing_layer(&mut self, raw: &'a [u8]) {
        self.layers.push(PendingLayer::Existing(raw));
    }

    /// Append a built layer
    pub fn add_layer(&mut self, layer: LayerBuilder) {
        self.layers.push(PendingLayer::Built(layer));
    }

    /// Serialize the tile to a contiguous buffer
    pub fn serialize(self) -> Result<Vec<u8>> {
        let mut buf = BytesMut::new();
        for layer in self.layers {
            match layer {
                PendingLayer::Existing(raw) => {
                    pbf::write_key(&mut buf, LAYERS_FIELD, pbf::WIRE_LEN);
                    pbf::write_varint(&mut buf, raw.len() as u64);
                    buf.put_slice(raw);
                }
                PendingLayer::Built(layer) => {
                    if layer.is_empty() {
                        continue;
                    }
                    let message = layer.into_proto();
                    pbf::write_key(&mut buf, LAYERS_FIELD, pbf::WIRE_LEN);
                    pbf::write_varint(&mut buf, message.encoded_len() as u64);
                    message
                        .encode(&mut buf)
                        .map_err(|e| Error::Internal(format!("failed to encode layer: {e}")))?;
                }
            }
        }
        Ok(buf.to_vec())
    }
}

/// Builds one layer, maintaining deduplicated key and value tables
pub struct LayerBuilder {
    name: String,
    version: u32,
    extent: u32,
    keys: Vec<String>,
    key_lookup: HashMap<String, u32>,
    values: Vec<proto::Value>,
    value_lookup: HashMap<Value, u32>,
    features: Vec<proto::Feature>,
}

impl LayerBuilder {
    /// Create a layer builder with the given name, version, and extent
    pub fn new(name: impl Into<String>, version: u32, extent: u32) -> Self {
        Self {
            name: name.into(),
            version,
            extent,
            keys: Vec::new(),
            key_lookup: HashMap::new(),
            values: Vec::new(),
            value_lookup: HashMap::new(),
            features: Vec::new(),
        }
    }

    /// Layer name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if no feature has been committed
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Number of committed features
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Index of `key` in the layer's key table, interning it on first use
    pub fn key_index(&mut self, key: &str) -> u32 {
        if let Some(&index) = self.key_lookup.get(key) {
            return index;
        }
        let index = self.keys.len() as u32;
        self.keys.push(key.to_owned());
        self.key_lookup.insert(key.to_owned(), index);
        index
    }

    /// Index of `value` in the layer's value table, interning it on first use
    pub fn value_index(&mut self, value: &Value) -> u32 {
        if let Some(&index) = self.value_lookup.get(value) {
            return index;
        }
        let index = self.values.len() as u32;
        self.values.push(value.to_proto());
        self.value_lookup.insert(value.clone(), index);
        index
    }

    fn push(&mut self, feature: proto::Feature) {
        self.features.push(feature);
    }

    fn into_proto(self) -> proto::Layer {
        proto::Layer {
            version: self.version,
            name: self.name,
            features: self.features,
            keys: self.keys,
            values: self.values,
            extent: Some(self.extent),
        }
    }
}

/// Builds one feature; nothing reaches the layer until `commit`
///
/// Dropping the builder, or calling `rollback`, discards the feature without
/// touching the destination layer's tables.
pub struct FeatureBuilder {
    geom_type: GeomType,
    id: Option<u64>,
    geometry: Vec<u32>,
    cursor: (i64, i64),
    properties: Vec<(String, Value)>,
    mapped: Vec<(u32, u32)>,
}

impl FeatureBuilder {
    /// Create a feature builder for the given geometry type
    pub fn new(geom_type: GeomType) -> Self {
        Self {
            geom_type,
            id: None,
            geometry: Vec::new(),
            cursor: (0, 0),
            properties: Vec::new(),
            mapped: Vec::new(),
        }
    }

    /// Set the feature id
    pub fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }

    /// Append a point set as a single MoveTo command
    pub fn add_points(&mut self, points: &[Coord<i64>]) {
        if points.is_empty() {
            return;
        }
        self.geometry.push(command(MOVE_TO, points.len() as u32));
        for point in points {
            self.push_vertex(*point);
        }
    }

    /// Append one linestring part; `line` must have at least two vertices
    pub fn add_linestring(&mut self, line: &[Coord<i64>]) {
        debug_assert!(line.len() >= 2);
        self.geometry.push(command(MOVE_TO, 1));
        self.push_vertex(line[0]);
        self.geometry.push(command(LINE_TO, line.len() as u32 - 1));
        for point in &line[1..] {
            self.push_vertex(*point);
        }
    }

    /// Append one ring; `ring` is closed (first vertex repeated at the end)
    /// and must have at least four entries
    pub fn add_ring(&mut self, ring: &[Coord<i64>]) {
        debug_assert!(ring.len() >= 4);
        debug_assert_eq!(ring.first(), ring.last());
        let count = ring.len() - 1;
        self.geometry.push(command(MOVE_TO, 1));
        self.push_vertex(ring[0]);
        self.geometry.push(command(LINE_TO, count as u32 - 1));
        for point in &ring[1..count] {
            self.push_vertex(*point);
        }
        self.geometry.push(command(CLOSE_PATH, 1));
    }

    /// Replace the geometry with an already-encoded command stream
    pub fn set_raw_geometry(&mut self, words: &[u32]) {
        self.geometry = words.to_vec();
    }

    fn push_vertex(&mut self, point: Coord<i64>) {
        let dx = (point.x - self.cursor.0) as i32;
        let dy = (point.y - self.cursor.1) as i32;
        self.geometry.push(zigzag(dx));
        self.geometry.push(zigzag(dy));
        self.cursor = (point.x, point.y);
    }

    /// True once any geometry has been written
    pub fn has_geometry(&self) -> bool {
        !self.geometry.is_empty()
    }

    /// Add a property by key and value; interned into the destination layer's
    /// tables at commit
    pub fn add_property(&mut self, key: impl Into<String>, value: Value) {
        self.properties.push((key.into(), value));
    }

    /// Add a property already resolved to destination table indexes
    pub fn add_mapped_property(&mut self, key_index: u32, value_index: u32) {
        self.mapped.push((key_index, value_index));
    }

    /// Commit the feature into `layer`
    pub fn commit(self, layer: &mut LayerBuilder) {
        let mut tags = Vec::with_capacity(2 * (self.properties.len() + self.mapped.len()));
        for (key, value) in &self.properties {
            tags.push(layer.key_index(key));
            tags.push(layer.value_index(value));
        }
        for (key_index, value_index) in self.mapped {
            tags.push(key_index);
            tags.push(value_index);
        }
        layer.push(proto::Feature {
            id: self.id,
            tags,
            r#type: Some(self.geom_type as i32),
            geometry: self.geometry,
        });
    }

    /// Discard the feature
    pub fn rollback(self) {}
}

/// Copies properties between layers by table index
///
/// Each source key/value index is resolved against the destination layer once
/// and memoized, avoiding repeated string compares across features.
pub struct PropertyMapper {
    keys: Vec<Option<u32>>,
    values: Vec<Option<u32>>,
}

impl PropertyMapper {
    /// Create a mapper sized to the source layer's tables
    pub fn new(source: &LayerReader<'_>) -> Self {
        Self {
            keys: vec![None; source.key_count()],
            values: vec![None; source.value_count()],
        }
    }

    /// Map a source (key, value) index pair into destination table indexes
    pub fn map(
        &mut self,
        source: &LayerReader<'_>,
        dest: &mut LayerBuilder,
        key: u32,
        value: u32,
    ) -> Result<(u32, u32)> {
        let key_slot = self
            .keys
            .get_mut(key as usize)
            .ok_or_else(|| Error::Decode(format!("key index {key} out of range")))?;
        let key_index = match key_slot {
            Some(index) => *index,
            None => {
                let index = dest.key_index(source.key(key)?);
                *key_slot = Some(index);
                index
            }
        };

        let value_slot = self
            .values
            .get_mut(value as usize)
            .ok_or_else(|| Error::Decode(format!("value index {value} out of range")))?;
        let value_index = match value_slot {
            Some(index) => *index,
            None => {
                let index = dest.value_index(&source.value(value)?);
                *value_slot = Some(index);
                index
            }
        };

        Ok((key_index, value_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::reader::TileReader;
    use geo_types::coord;

    #[test]
    fn test_key_value_tables_first_seen_order() {
        let mut layer = LayerBuilder::new("test", 2, 4096);
        assert_eq!(layer.key_index("b"), 0);
        assert_eq!(layer.key_index("a"), 1);
        assert_eq!(layer.key_index("b"), 0);
        assert_eq!(layer.value_index(&Value::from("x")), 0);
        assert_eq!(layer.value_index(&Value::from(1i64)), 1);
        assert_eq!(layer.value_index(&Value::from("x")), 0);

        let proto = layer.into_proto();
        assert_eq!(proto.keys, vec!["b".to_owned(), "a".to_owned()]);
        assert_eq!(proto.values.len(), 2);
    }

    #[test]
    fn test_commit_and_rollback() {
        let mut layer = LayerBuilder::new("test", 2, 4096);

        let mut committed = FeatureBuilder::new(GeomType::Point);
        committed.add_points(&[coord! { x: 1, y: 1 }]);
        committed.commit(&mut layer);

        let mut dropped = FeatureBuilder::new(GeomType::Point);
        dropped.add_points(&[coord! { x: 2, y: 2 }]);
        dropped.rollback();

        assert_eq!(layer.feature_count(), 1);
    }

    #[test]
    fn test_empty_layer_omitted() {
        let mut tile = TileBuilder::new();
        tile.add_layer(LayerBuilder::new("empty", 2, 4096));
        assert!(tile.serialize().unwrap().is_empty());
    }

    #[test]
    fn test_existing_layer_copied_verbatim() {
        let mut layer = LayerBuilder::new("roads", 2, 4096);
        let mut feature = FeatureBuilder::new(GeomType::Point);
        feature.add_points(&[coord! { x: 12, y: 34 }]);
        feature.add_property("class", Value::from("street"));
        feature.commit(&mut layer);
        let mut tile = TileBuilder::new();
        tile.add_layer(layer);
        let encoded = tile.serialize().unwrap();

        let reader = TileReader::parse(&encoded).unwrap();
        let raw: Vec<&[u8]> = reader.layers().map(|l| l.unwrap().raw()).collect();
        let mut copy = TileBuilder::new();
        for slice in raw {
            copy.add_existing_layer(slice);
        }
        assert_eq!(copy.serialize().unwrap(), encoded);
    }

    #[test]
    fn test_ring_encoding() {
        let mut layer = LayerBuilder::new("water", 2, 4096);
        let mut feature = FeatureBuilder::new(GeomType::Polygon);
        feature.add_ring(&[
            coord! { x: 0, y: 0 },
            coord! { x: 10, y: 0 },
            coord! { x: 10, y: 10 },
            coord! { x: 0, y: 10 },
            coord! { x: 0, y: 0 },
        ]);
        feature.commit(&mut layer);
        let proto = layer.into_proto();
        let geometry = &proto.features[0].geometry;
        // MoveTo(1) + 1 vertex, LineTo(3) + 3 vertices, ClosePath(1)
        assert_eq!(geometry.len(), 1 + 2 + 1 + 6 + 1);
        assert_eq!(geometry[0], 9);
        assert_eq!(*geometry.last().unwrap(), 15);
    }

    #[test]
    fn test_property_mapper_memoizes() {
        let mut source_layer = LayerBuilder::new("src", 2, 4096);
        for i in 0..3i64 {
            let mut feature = FeatureBuilder::new(GeomType::Point);
            feature.add_points(&[coord! { x: i, y: i }]);
            feature.add_property("kind", Value::from("poi"));
            feature.add_property("rank", Value::from(i));
            feature.commit(&mut source_layer);
        }
        let mut tile = TileBuilder::new();
        tile.add_layer(source_layer);
        let encoded = tile.serialize().unwrap();

        let reader = TileReader::parse(&encoded).unwrap();
        let source = reader.layers().next().unwrap().unwrap();
        let mut dest = LayerBuilder::new("dst", 2, 4096);
        let mut mapper = PropertyMapper::new(&source);

        for feature in source.features() {
            let mut out = FeatureBuilder::new(GeomType::Point);
            out.add_points(&[coord! { x: 0, y: 0 }]);
            for (key, value) in feature.tag_pairs().unwrap() {
                let (ki, vi) = mapper.map(&source, &mut dest, key, value).unwrap();
                out.add_mapped_property(ki, vi);
            }
            out.commit(&mut dest);
        }

        let proto = dest.into_proto();
        assert_eq!(proto.keys, vec!["kind".to_owned(), "rank".to_owned()]);
        // one "poi" string plus three distinct ranks
        assert_eq!(proto.values.len(), 4);

        assert!(mapper.map(&source, &mut LayerBuilder::new("x", 2, 4096), 99, 0).is_err());
    }
}
