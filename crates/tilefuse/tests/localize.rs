//! End-to-end localize tests: tiles are built with the public encoding API,
//! localized, decoded, and checked property by property.

use geo_types::coord;
use tilefuse::encoding::{
    Compressor, Decompressor, FeatureBuilder, GeomType, LayerBuilder, TileBuilder, TileReader,
    Value,
};
use tilefuse::{localize, LocalizeOptions};

fn tile_with_features(layer_name: &str, features: &[&[(&str, Value)]]) -> Vec<u8> {
    let mut layer = LayerBuilder::new(layer_name, 2, 4096);
    for (index, properties) in features.iter().enumerate() {
        let mut feature = FeatureBuilder::new(GeomType::Point);
        feature.set_id(index as u64 + 1);
        feature.add_points(&[coord! { x: 100 * (index as i64 + 1), y: 200 }]);
        for (key, value) in properties.iter() {
            feature.add_property(*key, value.clone());
        }
        feature.commit(&mut layer);
    }
    let mut tile = TileBuilder::new();
    tile.add_layer(layer);
    tile.serialize().unwrap()
}

struct OutFeature {
    id: Option<u64>,
    geometry: Vec<u32>,
    properties: Vec<(String, Value)>,
}

fn decode_features(data: &[u8]) -> Vec<OutFeature> {
    if data.is_empty() {
        return Vec::new();
    }
    let reader = TileReader::parse(data).unwrap();
    let mut out = Vec::new();
    for layer in reader.layers() {
        let layer = layer.unwrap();
        for feature in layer.features() {
            out.push(OutFeature {
                id: feature.id(),
                geometry: feature.geometry().to_vec(),
                properties: feature
                    .properties()
                    .map(|p| p.map(|(k, v)| (k.to_owned(), v)))
                    .collect::<Result<Vec<_>, _>>()
                    .unwrap(),
            });
        }
    }
    out
}

#[test]
fn pass_through_drops_hidden_properties() {
    let data = tile_with_features(
        "places",
        &[&[
            ("name", Value::from("A")),
            ("_mbx_name_en", Value::from("A-en")),
            ("class", Value::from("road")),
        ]],
    );
    let out = localize(&data, &LocalizeOptions::default()).unwrap();
    let features = decode_features(&out);
    assert_eq!(features.len(), 1);
    assert_eq!(
        features[0].properties,
        vec![
            ("name".to_owned(), Value::from("A")),
            ("class".to_owned(), Value::from("road")),
        ]
    );
}

#[test]
fn pass_through_preserves_geometry_and_id() {
    let data = tile_with_features("places", &[&[("name", Value::from("A"))]]);
    let out = localize(&data, &LocalizeOptions::default()).unwrap();

    let input = decode_features(&data);
    let output = decode_features(&out);
    assert_eq!(output.len(), 1);
    assert_eq!(output[0].id, input[0].id);
    assert_eq!(output[0].geometry, input[0].geometry);
}

#[test]
fn pass_through_removes_incompatible_worldview_features() {
    let data = tile_with_features(
        "places",
        &[
            &[("name", Value::from("kept"))],
            &[
                ("name", Value::from("dropped")),
                ("_mbx_worldview", Value::from("US")),
            ],
            &[
                ("name", Value::from("universal")),
                ("_mbx_worldview", Value::from("all")),
            ],
        ],
    );
    let out = localize(&data, &LocalizeOptions::default()).unwrap();
    let features = decode_features(&out);
    assert_eq!(features.len(), 2);
    assert_eq!(
        features[0].properties,
        vec![("name".to_owned(), Value::from("kept"))]
    );
    assert_eq!(
        features[1].properties,
        vec![("name".to_owned(), Value::from("universal"))]
    );
}

#[test]
fn worldview_split_emits_one_feature_per_match() {
    let data = tile_with_features(
        "places",
        &[&[
            ("name", Value::from("border")),
            ("_mbx_worldview", Value::from("CN,US,JP")),
        ]],
    );
    let options = LocalizeOptions {
        worldviews: Some(vec!["US".to_owned(), "CN".to_owned()]),
        ..Default::default()
    };
    let out = localize(&data, &options).unwrap();
    let features = decode_features(&out);

    // intersection in requested order, geometry and id copied verbatim
    assert_eq!(features.len(), 2);
    assert_eq!(features[0].id, features[1].id);
    assert_eq!(features[0].geometry, features[1].geometry);

    let worldview_of = |feature: &OutFeature| {
        feature
            .properties
            .iter()
            .find(|(k, _)| k == "worldview")
            .map(|(_, v)| v.clone())
    };
    assert_eq!(worldview_of(&features[0]), Some(Value::from("US")));
    assert_eq!(worldview_of(&features[1]), Some(Value::from("CN")));
}

#[test]
fn localized_mode_selects_language_and_adds_local() {
    let data = tile_with_features(
        "places",
        &[&[
            ("name", Value::from("Wien")),
            ("name_en", Value::from("Vienna")),
            ("name_fr", Value::from("Vienne")),
            ("population", Value::from(1900000i64)),
        ]],
    );
    let options = LocalizeOptions {
        languages: Some(vec!["fr".to_owned(), "en".to_owned()]),
        ..Default::default()
    };
    let out = localize(&data, &options).unwrap();
    let features = decode_features(&out);
    assert_eq!(features.len(), 1);
    assert_eq!(
        features[0].properties,
        vec![
            ("population".to_owned(), Value::from(1900000i64)),
            ("name".to_owned(), Value::from("Vienne")),
            ("name_local".to_owned(), Value::from("Wien")),
        ]
    );
}

#[test]
fn feature_without_worldview_key_emits_once_without_tag() {
    let data = tile_with_features("places", &[&[("name", Value::from("X"))]]);
    let options = LocalizeOptions {
        languages: Some(vec!["en".to_owned()]),
        ..Default::default()
    };
    let out = localize(&data, &options).unwrap();
    let features = decode_features(&out);
    assert_eq!(features.len(), 1);
    assert!(features[0]
        .properties
        .iter()
        .all(|(key, _)| key != "worldview"));
}

#[test]
fn layer_shape_is_preserved() {
    let mut first = LayerBuilder::new("alpha", 2, 2048);
    let mut feature = FeatureBuilder::new(GeomType::Point);
    feature.add_points(&[coord! { x: 5, y: 5 }]);
    feature.add_property("name", Value::from("a"));
    feature.commit(&mut first);

    let mut second = LayerBuilder::new("beta", 1, 4096);
    let mut feature = FeatureBuilder::new(GeomType::Point);
    feature.add_points(&[coord! { x: 6, y: 6 }]);
    feature.add_property("name", Value::from("b"));
    feature.commit(&mut second);

    let mut tile = TileBuilder::new();
    tile.add_layer(first);
    tile.add_layer(second);
    let data = tile.serialize().unwrap();

    let out = localize(&data, &LocalizeOptions::default()).unwrap();
    let reader = TileReader::parse(&out).unwrap();
    let layers: Vec<_> = reader.layers().map(|l| l.unwrap()).collect();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].name(), "alpha");
    assert_eq!(layers[0].version(), 2);
    assert_eq!(layers[0].extent(), 2048);
    assert_eq!(layers[1].name(), "beta");
    assert_eq!(layers[1].version(), 1);
    assert_eq!(layers[1].extent(), 4096);
}

#[test]
fn fully_dropped_layer_leaves_an_empty_tile() {
    let data = tile_with_features(
        "places",
        &[&[("_mbx_worldview", Value::from("RU"))]],
    );
    let options = LocalizeOptions {
        worldviews: Some(vec!["US".to_owned()]),
        ..Default::default()
    };
    let out = localize(&data, &options).unwrap();
    assert!(out.is_empty());

    // and compression of an empty result stays empty
    let options = LocalizeOptions {
        worldviews: Some(vec!["US".to_owned()]),
        compress: true,
        ..Default::default()
    };
    let out = localize(&data, &options).unwrap();
    assert!(out.is_empty());
}

#[test]
fn compressed_input_and_output() {
    let data = tile_with_features("places", &[&[("name", Value::from("A"))]]);
    let gzipped = Compressor::new().compress(&data).unwrap();

    let plain = localize(&gzipped, &LocalizeOptions::default()).unwrap();
    assert_eq!(decode_features(&plain).len(), 1);

    let options = LocalizeOptions {
        compress: true,
        ..Default::default()
    };
    let out = localize(&gzipped, &options).unwrap();
    assert!(out.starts_with(&[0x1f, 0x8b]));
    let unpacked = Decompressor::new().decompress(&out).unwrap();
    assert_eq!(unpacked, plain);
}

#[test]
fn singular_option_keys_are_rejected_with_plural_hint() {
    let err = serde_json::from_value::<LocalizeOptions>(serde_json::json!({
        "language": ["en"]
    }))
    .unwrap_err();
    assert!(err.to_string().contains("languages"));

    let err = serde_json::from_value::<LocalizeOptions>(serde_json::json!({
        "worldview": ["US"]
    }))
    .unwrap_err();
    assert!(err.to_string().contains("worldviews"));

    let options: LocalizeOptions = serde_json::from_value(serde_json::json!({
        "languages": ["en"],
        "worldviews": ["US", "CN"],
        "compress": true
    }))
    .unwrap();
    assert_eq!(options.languages.as_deref(), Some(&["en".to_owned()][..]));
    assert!(options.compress);
    assert_eq!(options.hidden_prefix, "_mbx_");
}
