//! Ring orientation and simplicity checks.

use super::{Coord, Polygon};

/// Twice the signed area of a ring; positive for counter-clockwise rings.
///
/// An unclosed ring is treated as if its last position joined the first.
#[must_use]
pub fn signed_area(ring: &[Coord]) -> f64 {
    ring.iter()
        .zip(ring.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum()
}

#[must_use]
pub fn is_counter_clockwise(ring: &[Coord]) -> bool {
    signed_area(ring) > 0.0
}

#[must_use]
pub fn is_closed(ring: &[Coord]) -> bool {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) => first == last,
        _ => false,
    }
}

/// A ring is valid when closed, with at least four positions and no
/// intersecting non-adjacent segments.
#[must_use]
pub fn is_valid_ring(ring: &[Coord]) -> bool {
    ring.len() >= 4 && is_closed(ring) && is_simple(ring)
}

/// Check that no two non-adjacent segments of a closed ring touch.
#[must_use]
pub fn is_simple(ring: &[Coord]) -> bool {
    let segments: Vec<(Coord, Coord)> = ring.windows(2).map(|w| (w[0], w[1])).collect();
    let n = segments.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            if adjacent {
                continue;
            }
            let (a, b) = segments[i];
            let (c, d) = segments[j];
            if segments_intersect(a, b, c, d) {
                return false;
            }
        }
    }
    true
}

fn orientation(a: Coord, b: Coord, c: Coord) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(a: Coord, b: Coord, p: Coord) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

fn segments_intersect(a: Coord, b: Coord, c: Coord, d: Coord) -> bool {
    let d1 = orientation(c, d, a);
    let d2 = orientation(c, d, b);
    let d3 = orientation(a, b, c);
    let d4 = orientation(a, b, d);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(c, d, a))
        || (d2 == 0.0 && on_segment(c, d, b))
        || (d3 == 0.0 && on_segment(a, b, c))
        || (d4 == 0.0 && on_segment(a, b, d))
}

/// Orientation corrections applied to a set of polygons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindingFix {
    pub exteriors: usize,
    pub interiors: usize,
}

impl WindingFix {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exteriors == 0 && self.interiors == 0
    }
}

/// Make the exterior counter-clockwise and every interior clockwise.
///
/// Rings without area have no orientation and are left alone.
pub fn orient_polygon(polygon: &mut Polygon) -> WindingFix {
    let mut fix = WindingFix::default();
    if signed_area(&polygon.exterior) < 0.0 {
        polygon.exterior.reverse();
        fix.exteriors += 1;
    }
    for interior in &mut polygon.interiors {
        if signed_area(interior) > 0.0 {
            interior.reverse();
            fix.interiors += 1;
        }
    }
    fix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(points: &[(f64, f64)]) -> Vec<Coord> {
        points.iter().map(|&(x, y)| Coord::new(x, y)).collect()
    }

    #[test]
    fn test_orientation() {
        let ccw = ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]);
        let cw: Vec<Coord> = ccw.iter().rev().copied().collect();
        assert!(is_counter_clockwise(&ccw));
        assert!(!is_counter_clockwise(&cw));
    }

    #[test]
    fn test_bowtie_is_not_simple() {
        let bowtie = ring(&[(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0), (0.0, 0.0)]);
        assert!(!is_simple(&bowtie));
        assert!(!is_valid_ring(&bowtie));
    }

    #[test]
    fn test_unclosed_ring_invalid() {
        let open = ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        assert!(!is_valid_ring(&open));
        let short = ring(&[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]);
        assert!(!is_valid_ring(&short));
    }

    #[test]
    fn test_orient_polygon() {
        let mut polygon = Polygon {
            exterior: ring(&[(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0), (0.0, 0.0)]),
            interiors: vec![ring(&[(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0), (1.0, 1.0)])],
        };
        let fix = orient_polygon(&mut polygon);
        assert_eq!(
            fix,
            WindingFix {
                exteriors: 1,
                interiors: 1
            }
        );
        assert!(is_counter_clockwise(&polygon.exterior));
        assert!(!is_counter_clockwise(&polygon.interiors[0]));
        assert!(orient_polygon(&mut polygon).is_empty());
    }

    #[test]
    fn test_orient_polygon_skips_degenerate_rings() {
        let flat = ring(&[(0.0, 0.0), (2.0, 0.0), (4.0, 0.0), (0.0, 0.0)]);
        let mut polygon = Polygon {
            exterior: flat.clone(),
            interiors: Vec::new(),
        };
        assert!(orient_polygon(&mut polygon).is_empty());
        assert_eq!(polygon.exterior, flat);
    }

    #[test]
    fn test_unclosed_ring_orientation() {
        let open_cw = ring(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]);
        assert_eq!(signed_area(&open_cw), -2.0);

        let mut polygon = Polygon {
            exterior: open_cw,
            interiors: Vec::new(),
        };
        assert_eq!(orient_polygon(&mut polygon).exteriors, 1);
        assert!(orient_polygon(&mut polygon).is_empty());
    }
}
