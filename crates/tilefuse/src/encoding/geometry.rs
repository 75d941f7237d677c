//! MVT geometry command stream decoding
//!
//! Geometry is a sequence of command integers (MoveTo, LineTo, ClosePath)
//! with zigzag-encoded coordinate deltas. Decoding streams vertices through a
//! [`GeometrySink`]; the cursor is continuous across parts of a multi-part
//! geometry, as required by the specification.

use crate::error::{Error, Result};

use super::mvt::GeomType;

pub(crate) const MOVE_TO: u32 = 1;
pub(crate) const LINE_TO: u32 = 2;
pub(crate) const CLOSE_PATH: u32 = 7;

/// Pack a command id and repeat count into a command integer
pub(crate) fn command(id: u32, count: u32) -> u32 {
    (id & 0x7) | (count << 3)
}

/// ZigZag encode a signed parameter
pub(crate) fn zigzag(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// ZigZag decode a parameter, widened for overzoom arithmetic
pub(crate) fn unzigzag(v: u32) -> i64 {
    i64::from((v >> 1) as i32 ^ -((v & 1) as i32))
}

/// Ring orientation as decoded from the surveyor's formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingRole {
    /// Positive area: a polygon's outer boundary
    Outer,
    /// Negative (or zero) area: a hole
    Inner,
}

/// Streaming consumer of decoded geometry
///
/// The decoder calls `begin` with the vertex count of the next part, `vertex`
/// once per decoded vertex, and `end` when the part is complete. For polygon
/// rings `end` carries the decoded [`RingRole`]; the closing vertex is not
/// repeated. A sink may keep state across calls; no state leaks across
/// features because a sink is built per feature.
pub trait GeometrySink {
    fn begin(&mut self, count: usize);
    fn vertex(&mut self, x: i64, y: i64);
    fn end(&mut self, role: Option<RingRole>);
}

/// Decode a feature's geometry, streaming vertices into `sink`
pub fn decode_geometry<S: GeometrySink>(
    geom_type: GeomType,
    data: &[u32],
    sink: &mut S,
) -> Result<()> {
    let mut cursor = Cursor::new(data);
    match geom_type {
        GeomType::Point => decode_points(&mut cursor, sink),
        GeomType::Linestring => decode_linestrings(&mut cursor, sink),
        GeomType::Polygon => decode_polygons(&mut cursor, sink),
        GeomType::Unknown => Err(Error::geometry("unknown geometry type")),
    }
}

struct Cursor<'a> {
    data: &'a [u32],
    pos: usize,
    x: i64,
    y: i64,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u32]) -> Self {
        Self {
            data,
            pos: 0,
            x: 0,
            y: 0,
        }
    }

    fn done(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn next_command(&mut self) -> Result<(u32, u32)> {
        let word = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::geometry("expected a command integer"))?;
        self.pos += 1;
        Ok((word & 0x7, word >> 3))
    }

    fn require(&self, count: u32) -> Result<()> {
        let needed = count as usize * 2;
        if self.data.len() - self.pos < needed {
            return Err(Error::geometry("truncated coordinate parameters"));
        }
        Ok(())
    }

    fn next_vertex(&mut self) -> Result<(i64, i64)> {
        if self.data.len() - self.pos < 2 {
            return Err(Error::geometry("truncated coordinate parameters"));
        }
        self.x += unzigzag(self.data[self.pos]);
        self.y += unzigzag(self.data[self.pos + 1]);
        self.pos += 2;
        Ok((self.x, self.y))
    }
}

fn decode_points<S: GeometrySink>(cursor: &mut Cursor<'_>, sink: &mut S) -> Result<()> {
    let (id, count) = cursor.next_command()?;
    if id != MOVE_TO || count == 0 {
        return Err(Error::geometry("point geometry must start with MoveTo"));
    }
    cursor.require(count)?;
    sink.begin(count as usize);
    for _ in 0..count {
        let (x, y) = cursor.next_vertex()?;
        sink.vertex(x, y);
    }
    sink.end(None);
    if !cursor.done() {
        return Err(Error::geometry("trailing data after point geometry"));
    }
    Ok(())
}

fn decode_linestrings<S: GeometrySink>(cursor: &mut Cursor<'_>, sink: &mut S) -> Result<()> {
    if cursor.done() {
        return Err(Error::geometry("empty linestring geometry"));
    }
    while !cursor.done() {
        let (id, count) = cursor.next_command()?;
        if id != MOVE_TO || count != 1 {
            return Err(Error::geometry("linestring part must start with MoveTo(1)"));
        }
        let (x, y) = cursor.next_vertex()?;
        let (id, count) = cursor.next_command()?;
        if id != LINE_TO || count == 0 {
            return Err(Error::geometry("linestring part requires LineTo"));
        }
        cursor.require(count)?;
        sink.begin(count as usize + 1);
        sink.vertex(x, y);
        for _ in 0..count {
            let (x, y) = cursor.next_vertex()?;
            sink.vertex(x, y);
        }
        sink.end(None);
    }
    Ok(())
}

fn decode_polygons<S: GeometrySink>(cursor: &mut Cursor<'_>, sink: &mut S) -> Result<()> {
    if cursor.done() {
        return Err(Error::geometry("empty polygon geometry"));
    }
    while !cursor.done() {
        let (id, count) = cursor.next_command()?;
        if id != MOVE_TO || count != 1 {
            return Err(Error::geometry("ring must start with MoveTo(1)"));
        }
        let (first_x, first_y) = cursor.next_vertex()?;
        let (id, count) = cursor.next_command()?;
        if id != LINE_TO || count == 0 {
            return Err(Error::geometry("ring requires LineTo"));
        }
        cursor.require(count)?;
        sink.begin(count as usize + 1);
        sink.vertex(first_x, first_y);

        // surveyor's formula, closing edge included below
        let mut area = 0i128;
        let (mut prev_x, mut prev_y) = (first_x, first_y);
        for _ in 0..count {
            let (x, y) = cursor.next_vertex()?;
            area += i128::from(prev_x) * i128::from(y) - i128::from(x) * i128::from(prev_y);
            prev_x = x;
            prev_y = y;
            sink.vertex(x, y);
        }
        area += i128::from(prev_x) * i128::from(first_y) - i128::from(first_x) * i128::from(prev_y);

        let (id, count) = cursor.next_command()?;
        if id != CLOSE_PATH || count != 1 {
            return Err(Error::geometry("ring must end with ClosePath(1)"));
        }
        let role = if area > 0 {
            RingRole::Outer
        } else {
            RingRole::Inner
        };
        sink.end(Some(role));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collector {
        parts: Vec<(Vec<(i64, i64)>, Option<RingRole>)>,
        current: Vec<(i64, i64)>,
    }

    impl GeometrySink for Collector {
        fn begin(&mut self, _count: usize) {
            self.current.clear();
        }

        fn vertex(&mut self, x: i64, y: i64) {
            self.current.push((x, y));
        }

        fn end(&mut self, role: Option<RingRole>) {
            self.parts.push((std::mem::take(&mut self.current), role));
        }
    }

    #[test]
    fn test_zigzag() {
        assert_eq!(zigzag(0), 0);
        assert_eq!(zigzag(-1), 1);
        assert_eq!(zigzag(1), 2);
        assert_eq!(zigzag(-2), 3);
        for n in [-4096, -1, 0, 1, 4096] {
            assert_eq!(unzigzag(zigzag(n)), i64::from(n));
        }
    }

    #[test]
    fn test_command_packing() {
        assert_eq!(command(MOVE_TO, 1), 9);
        assert_eq!(command(LINE_TO, 3), 26);
        assert_eq!(command(CLOSE_PATH, 1), 15);
    }

    #[test]
    fn test_decode_point() {
        // MoveTo(1), (25, 17)
        let data = [9, 50, 34];
        let mut sink = Collector::default();
        decode_geometry(GeomType::Point, &data, &mut sink).unwrap();
        assert_eq!(sink.parts, vec![(vec![(25, 17)], None)]);
    }

    #[test]
    fn test_decode_multipoint() {
        // MoveTo(2), (5, 7), (3, 2)
        let data = [17, 10, 14, 3, 9];
        let mut sink = Collector::default();
        decode_geometry(GeomType::Point, &data, &mut sink).unwrap();
        assert_eq!(sink.parts, vec![(vec![(5, 7), (3, 2)], None)]);
    }

    #[test]
    fn test_decode_multilinestring_cursor_continues() {
        // Line 1: (2,2)..(10,10); line 2 starts with a delta from (10,10).
        let data = [
            9,
            zigzag(2),
            zigzag(2),
            command(LINE_TO, 1),
            zigzag(8),
            zigzag(8),
            9,
            zigzag(-9),
            zigzag(-9),
            command(LINE_TO, 1),
            zigzag(4),
            zigzag(0),
        ];
        let mut sink = Collector::default();
        decode_geometry(GeomType::Linestring, &data, &mut sink).unwrap();
        assert_eq!(
            sink.parts,
            vec![
                (vec![(2, 2), (10, 10)], None),
                (vec![(1, 1), (5, 1)], None),
            ]
        );
    }

    #[test]
    fn test_decode_polygon_roles() {
        // Outer ring (0,0) (10,0) (10,10) (0,10): y-down clockwise on screen,
        // positive surveyor area. Inner ring wound the other way.
        let outer = [
            9,
            zigzag(0),
            zigzag(0),
            command(LINE_TO, 3),
            zigzag(10),
            zigzag(0),
            zigzag(0),
            zigzag(10),
            zigzag(-10),
            zigzag(0),
            15,
        ];
        let inner = [
            9,
            zigzag(2),
            zigzag(-8),
            command(LINE_TO, 3),
            zigzag(0),
            zigzag(6),
            zigzag(6),
            zigzag(0),
            zigzag(0),
            zigzag(-6),
            15,
        ];
        let data: Vec<u32> = outer.iter().chain(inner.iter()).copied().collect();
        let mut sink = Collector::default();
        decode_geometry(GeomType::Polygon, &data, &mut sink).unwrap();
        assert_eq!(sink.parts.len(), 2);
        assert_eq!(sink.parts[0].1, Some(RingRole::Outer));
        assert_eq!(
            sink.parts[0].0,
            vec![(0, 0), (10, 0), (10, 10), (0, 10)]
        );
        assert_eq!(sink.parts[1].1, Some(RingRole::Inner));
        assert_eq!(sink.parts[1].0, vec![(2, 2), (2, 8), (8, 8), (8, 2)]);
    }

    #[test]
    fn test_malformed_geometry() {
        let mut sink = Collector::default();
        // ClosePath where a MoveTo is required
        assert!(decode_geometry(GeomType::Point, &[15], &mut sink).is_err());
        // truncated parameters
        assert!(decode_geometry(GeomType::Point, &[17, 10], &mut sink).is_err());
        // missing LineTo
        assert!(decode_geometry(GeomType::Linestring, &[9, 2, 2], &mut sink).is_err());
        // unknown type
        assert!(decode_geometry(GeomType::Unknown, &[9, 0, 0], &mut sink).is_err());
    }
}
