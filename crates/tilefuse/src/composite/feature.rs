//! Per-feature overzoom pipeline
//!
//! Decodes a source feature's geometry, re-frames it into the target tile,
//! clips against the buffered extent, and commits the surviving remnants into
//! the destination layer with id and properties preserved. Features whose
//! clipped geometry is degenerate leave no trace in the output.

use geo_types::{coord, Coord};

use crate::encoding::builder::{FeatureBuilder, LayerBuilder, PropertyMapper};
use crate::encoding::geometry::{decode_geometry, RingRole};
use crate::encoding::reader::{FeatureReader, LayerReader};
use crate::encoding::GeomType;
use crate::error::Result;

use super::clip::{clip_polyline, clip_ring, ClipBox};
use super::reframe::{LineAccumulator, PointAccumulator, Reframe, RingAccumulator};

/// Builds overzoomed copies of source features in a destination layer
pub(crate) struct OverzoomBuilder {
    clip: ClipBox,
    reframe: Reframe,
}

impl OverzoomBuilder {
    pub(crate) fn new(clip: ClipBox, zoom_factor: i64, dx: i64, dy: i64) -> Self {
        Self {
            clip,
            reframe: Reframe::new(zoom_factor, dx, dy),
        }
    }

    /// Run one source feature through the pipeline
    pub(crate) fn apply(
        &self,
        source: &LayerReader<'_>,
        feature: &FeatureReader<'_, '_>,
        dest: &mut LayerBuilder,
        mapper: &mut PropertyMapper,
    ) -> Result<()> {
        match feature.geom_type() {
            GeomType::Point => self.build_points(source, feature, dest, mapper),
            GeomType::Linestring => self.build_linestrings(source, feature, dest, mapper),
            GeomType::Polygon => self.build_polygons(source, feature, dest, mapper),
            GeomType::Unknown => Err(crate::error::Error::geometry("unknown geometry type")),
        }
    }

    fn build_points(
        &self,
        source: &LayerReader<'_>,
        feature: &FeatureReader<'_, '_>,
        dest: &mut LayerBuilder,
        mapper: &mut PropertyMapper,
    ) -> Result<()> {
        let mut accumulator = PointAccumulator::new(self.reframe);
        decode_geometry(GeomType::Point, feature.geometry(), &mut accumulator)?;
        let points: Vec<Coord<i64>> = accumulator
            .points
            .into_iter()
            .filter(|p| self.clip.contains(*p))
            .collect();
        if points.is_empty() {
            return Ok(());
        }

        let mut builder = FeatureBuilder::new(GeomType::Point);
        builder.add_points(&points);
        self.finish(source, feature, dest, mapper, builder)
    }

    fn build_linestrings(
        &self,
        source: &LayerReader<'_>,
        feature: &FeatureReader<'_, '_>,
        dest: &mut LayerBuilder,
        mapper: &mut PropertyMapper,
    ) -> Result<()> {
        let mut accumulator = LineAccumulator::new(self.reframe);
        decode_geometry(GeomType::Linestring, feature.geometry(), &mut accumulator)?;

        let mut builder = FeatureBuilder::new(GeomType::Linestring);
        let mut any = false;
        for line in &accumulator.lines {
            for piece in clip_polyline(line, &self.clip) {
                if piece.len() >= 2 && piece.windows(2).any(|w| w[0] != w[1]) {
                    builder.add_linestring(&piece);
                    any = true;
                }
            }
        }
        if !any {
            builder.rollback();
            return Ok(());
        }
        self.finish(source, feature, dest, mapper, builder)
    }

    fn build_polygons(
        &self,
        source: &LayerReader<'_>,
        feature: &FeatureReader<'_, '_>,
        dest: &mut LayerBuilder,
        mapper: &mut PropertyMapper,
    ) -> Result<()> {
        let mut accumulator = RingAccumulator::new(self.reframe);
        decode_geometry(GeomType::Polygon, feature.geometry(), &mut accumulator)?;

        // an outer ring opens a polygon; inners attach to the one before them
        let mut polygons: Vec<(Vec<Coord<i64>>, Vec<Vec<Coord<i64>>>)> = Vec::new();
        for (role, ring) in accumulator.rings {
            match role {
                RingRole::Outer => polygons.push((ring, Vec::new())),
                RingRole::Inner => {
                    if let Some((_, inners)) = polygons.last_mut() {
                        inners.push(ring);
                    }
                }
            }
        }

        let mut builder = FeatureBuilder::new(GeomType::Polygon);
        let mut any = false;
        for (outer, inners) in polygons {
            let (env_min, env_max) = envelope(&outer);
            if !self.clip.intersects_envelope(env_min, env_max) {
                continue;
            }
            let clipped_outer = clip_ring(&outer, &self.clip);
            if clipped_outer.len() <= 3 {
                continue;
            }
            builder.add_ring(&clipped_outer);
            any = true;

            for inner in inners {
                // the clipper expects outer orientation; restore on the way out
                let mut presented = inner;
                presented.reverse();
                let mut clipped = clip_ring(&presented, &self.clip);
                if clipped.len() <= 3 {
                    continue;
                }
                clipped.reverse();
                builder.add_ring(&clipped);
            }
        }
        if !any {
            builder.rollback();
            return Ok(());
        }
        self.finish(source, feature, dest, mapper, builder)
    }

    fn finish(
        &self,
        source: &LayerReader<'_>,
        feature: &FeatureReader<'_, '_>,
        dest: &mut LayerBuilder,
        mapper: &mut PropertyMapper,
        mut builder: FeatureBuilder,
    ) -> Result<()> {
        if let Some(id) = feature.id() {
            builder.set_id(id);
        }
        for (key, value) in feature.tag_pairs()? {
            let (key_index, value_index) = mapper.map(source, dest, key, value)?;
            builder.add_mapped_property(key_index, value_index);
        }
        builder.commit(dest);
        Ok(())
    }
}

fn envelope(ring: &[Coord<i64>]) -> (Coord<i64>, Coord<i64>) {
    let mut min = coord! { x: i64::MAX, y: i64::MAX };
    let mut max = coord! { x: i64::MIN, y: i64::MIN };
    for p in ring {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    (min, max)
}
