//! Axis-aligned box clipping in tile coordinates
//!
//! Points are tested for cover, polylines are clipped parametrically and
//! split on exits and re-entries, and rings are clipped with
//! Sutherland-Hodgman against the four box edges. Intersection points are
//! computed in f64 and rounded back to the integer grid.

use geo_types::{coord, Coord};

/// The clip region: tile extent expanded by the buffer on every side
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClipBox {
    pub min: Coord<i64>,
    pub max: Coord<i64>,
}

impl ClipBox {
    pub(crate) fn new(extent: i64, buffer: i64) -> Self {
        Self {
            min: coord! { x: -buffer, y: -buffer },
            max: coord! { x: extent + buffer, y: extent + buffer },
        }
    }

    /// Cover test, boundary inclusive
    pub(crate) fn contains(&self, p: Coord<i64>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Envelope overlap test, boundary inclusive
    pub(crate) fn intersects_envelope(&self, min: Coord<i64>, max: Coord<i64>) -> bool {
        min.x <= self.max.x && max.x >= self.min.x && min.y <= self.max.y && max.y >= self.min.y
    }
}

/// Clip a polyline, returning the surviving pieces
///
/// Each output line has at least two vertices and no consecutive duplicates.
pub(crate) fn clip_polyline(line: &[Coord<i64>], clip: &ClipBox) -> Vec<Vec<Coord<i64>>> {
    let mut out = Vec::new();
    let mut current: Vec<Coord<i64>> = Vec::new();
    for segment in line.windows(2) {
        match clip_segment(segment[0], segment[1], clip) {
            None => flush(&mut current, &mut out),
            Some((start, end, exited)) => {
                match current.last() {
                    None => current.push(start),
                    Some(&last) if last != start => {
                        // the polyline left the box and re-entered elsewhere
                        flush(&mut current, &mut out);
                        current.push(start);
                    }
                    _ => {}
                }
                if current.last() != Some(&end) {
                    current.push(end);
                }
                if exited {
                    flush(&mut current, &mut out);
                }
            }
        }
    }
    flush(&mut current, &mut out);
    out
}

fn flush(current: &mut Vec<Coord<i64>>, out: &mut Vec<Vec<Coord<i64>>>) {
    if current.len() >= 2 {
        out.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

/// Liang-Barsky clip of one segment; returns the clipped endpoints and
/// whether the segment exits the box before its far end
fn clip_segment(
    a: Coord<i64>,
    b: Coord<i64>,
    clip: &ClipBox,
) -> Option<(Coord<i64>, Coord<i64>, bool)> {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;

    let checks = [
        (-dx, (a.x - clip.min.x) as f64),
        (dx, (clip.max.x - a.x) as f64),
        (-dy, (a.y - clip.min.y) as f64),
        (dy, (clip.max.y - a.y) as f64),
    ];
    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                if r > t0 {
                    t0 = r;
                }
            } else {
                if r < t0 {
                    return None;
                }
                if r < t1 {
                    t1 = r;
                }
            }
        }
    }

    let at = |t: f64| -> Coord<i64> {
        coord! {
            x: ((a.x as f64 + t * dx).round() as i64).clamp(clip.min.x, clip.max.x),
            y: ((a.y as f64 + t * dy).round() as i64).clamp(clip.min.y, clip.max.y),
        }
    };
    let start = if t0 <= 0.0 { a } else { at(t0) };
    let end = if t1 >= 1.0 { b } else { at(t1) };
    Some((start, end, t1 < 1.0))
}

/// Sutherland-Hodgman clip of one closed ring
///
/// The input ring repeats its first vertex at the end and is presented in
/// outer orientation. Returns the clipped ring, closed, or an empty vector
/// when fewer than four vertices survive.
pub(crate) fn clip_ring(ring: &[Coord<i64>], clip: &ClipBox) -> Vec<Coord<i64>> {
    if ring.len() < 4 {
        return Vec::new();
    }
    let mut current: Vec<Coord<i64>> = ring[..ring.len() - 1].to_vec();
    for edge in [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom] {
        if current.len() < 3 {
            return Vec::new();
        }
        let mut next: Vec<Coord<i64>> = Vec::with_capacity(current.len() + 4);
        for i in 0..current.len() {
            let a = current[i];
            let b = current[(i + 1) % current.len()];
            let a_inside = edge.inside(a, clip);
            let b_inside = edge.inside(b, clip);
            match (a_inside, b_inside) {
                (true, true) => push_unique(&mut next, b),
                (true, false) => push_unique(&mut next, edge.intersect(a, b, clip)),
                (false, true) => {
                    push_unique(&mut next, edge.intersect(a, b, clip));
                    push_unique(&mut next, b);
                }
                (false, false) => {}
            }
        }
        current = next;
    }

    while current.len() > 1 && current.first() == current.last() {
        current.pop();
    }
    if current.len() < 3 {
        return Vec::new();
    }
    let first = current[0];
    current.push(first);
    current
}

fn push_unique(ring: &mut Vec<Coord<i64>>, p: Coord<i64>) {
    if ring.last() != Some(&p) {
        ring.push(p);
    }
}

#[derive(Clone, Copy)]
enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    fn inside(self, p: Coord<i64>, clip: &ClipBox) -> bool {
        match self {
            Edge::Left => p.x >= clip.min.x,
            Edge::Right => p.x <= clip.max.x,
            Edge::Top => p.y >= clip.min.y,
            Edge::Bottom => p.y <= clip.max.y,
        }
    }

    fn intersect(self, a: Coord<i64>, b: Coord<i64>, clip: &ClipBox) -> Coord<i64> {
        let interp_y = |x: i64| -> i64 {
            let t = (x - a.x) as f64 / (b.x - a.x) as f64;
            (a.y as f64 + t * (b.y - a.y) as f64).round() as i64
        };
        let interp_x = |y: i64| -> i64 {
            let t = (y - a.y) as f64 / (b.y - a.y) as f64;
            (a.x as f64 + t * (b.x - a.x) as f64).round() as i64
        };
        match self {
            Edge::Left => coord! { x: clip.min.x, y: interp_y(clip.min.x) },
            Edge::Right => coord! { x: clip.max.x, y: interp_y(clip.max.x) },
            Edge::Top => coord! { x: interp_x(clip.min.y), y: clip.min.y },
            Edge::Bottom => coord! { x: interp_x(clip.max.y), y: clip.max.y },
        }
    }
}
