//! Geometry re-framing for overzoom
//!
//! Streams decoded source vertices into the target tile's coordinate frame:
//! scale by the zoom factor, translate by the sub-tile displacement.
//! Consecutive duplicate vertices are suppressed, compared in the source
//! frame before scaling.

use geo_types::{coord, Coord};

use crate::encoding::geometry::{GeometrySink, RingRole};

/// Source-to-target frame transform
#[derive(Debug, Clone, Copy)]
pub(crate) struct Reframe {
    pub factor: i64,
    pub dx: i64,
    pub dy: i64,
}

impl Reframe {
    pub(crate) fn new(factor: i64, dx: i64, dy: i64) -> Self {
        Self { factor, dx, dy }
    }

    fn apply(&self, x: i64, y: i64) -> Coord<i64> {
        coord! {
            x: x * self.factor - self.dx,
            y: y * self.factor - self.dy,
        }
    }
}

/// Collects a re-framed point set
pub(crate) struct PointAccumulator {
    reframe: Reframe,
    prev: Option<(i64, i64)>,
    pub points: Vec<Coord<i64>>,
}

impl PointAccumulator {
    pub(crate) fn new(reframe: Reframe) -> Self {
        Self {
            reframe,
            prev: None,
            points: Vec::new(),
        }
    }
}

impl GeometrySink for PointAccumulator {
    fn begin(&mut self, count: usize) {
        self.points.reserve(count);
        self.prev = None;
    }

    fn vertex(&mut self, x: i64, y: i64) {
        if self.prev == Some((x, y)) {
            return;
        }
        self.prev = Some((x, y));
        self.points.push(self.reframe.apply(x, y));
    }

    fn end(&mut self, _role: Option<RingRole>) {}
}

/// Collects re-framed linestrings
pub(crate) struct LineAccumulator {
    reframe: Reframe,
    prev: Option<(i64, i64)>,
    current: Vec<Coord<i64>>,
    pub lines: Vec<Vec<Coord<i64>>>,
}

impl LineAccumulator {
    pub(crate) fn new(reframe: Reframe) -> Self {
        Self {
            reframe,
            prev: None,
            current: Vec::new(),
            lines: Vec::new(),
        }
    }
}

impl GeometrySink for LineAccumulator {
    fn begin(&mut self, count: usize) {
        self.current = Vec::with_capacity(count);
        self.prev = None;
    }

    fn vertex(&mut self, x: i64, y: i64) {
        if self.prev == Some((x, y)) {
            return;
        }
        self.prev = Some((x, y));
        self.current.push(self.reframe.apply(x, y));
    }

    fn end(&mut self, _role: Option<RingRole>) {
        let line = std::mem::take(&mut self.current);
        if line.len() >= 2 {
            self.lines.push(line);
        }
    }
}

/// Collects re-framed rings annotated with their decoded role
///
/// Rings are stored closed (first vertex repeated at the end).
pub(crate) struct RingAccumulator {
    reframe: Reframe,
    prev: Option<(i64, i64)>,
    current: Vec<Coord<i64>>,
    pub rings: Vec<(RingRole, Vec<Coord<i64>>)>,
}

impl RingAccumulator {
    pub(crate) fn new(reframe: Reframe) -> Self {
        Self {
            reframe,
            prev: None,
            current: Vec::new(),
            rings: Vec::new(),
        }
    }
}

impl GeometrySink for RingAccumulator {
    fn begin(&mut self, count: usize) {
        self.current = Vec::with_capacity(count + 1);
        self.prev = None;
    }

    fn vertex(&mut self, x: i64, y: i64) {
        if self.prev == Some((x, y)) {
            return;
        }
        self.prev = Some((x, y));
        self.current.push(self.reframe.apply(x, y));
    }

    fn end(&mut self, role: Option<RingRole>) {
        let mut ring = std::mem::take(&mut self.current);
        if ring.len() < 3 {
            return;
        }
        ring.push(ring[0]);
        self.rings.push((role.unwrap_or(RingRole::Outer), ring));
    }
}
