//! MVT wire format: protobuf messages, geometry commands, tile readers and
//! builders, and the compression envelope

pub mod builder;
pub mod compression;
pub mod geometry;
pub mod mvt;
pub mod pbf;
pub mod reader;

pub use builder::{FeatureBuilder, LayerBuilder, PropertyMapper, TileBuilder};
pub use compression::{is_compressed, is_gzip, is_zlib, Compressor, Decompressor};
pub use geometry::{decode_geometry, GeometrySink, RingRole};
pub use mvt::{GeomType, Value};
pub use reader::{FeatureReader, LayerReader, TileReader};
