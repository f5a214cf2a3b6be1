// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar polygons with optional holes, validity checks and triangulation

use crate::error::{Error, Result};
use crate::triangulation::triangulate_polygon_with_holes;
use nalgebra::Point2;

/// Polygons with an absolute area at or below this are considered degenerate
pub const MIN_AREA_THRESHOLD: f64 = 1e-9;

/// Tolerance for orientation tests
const ORIENTATION_EPSILON: f64 = 1e-12;

/// 2D polygon with optional holes
///
/// Closure is implicit: the last point connects back to the first and the
/// first point is not repeated.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon2D {
    /// Outer boundary
    pub outer: Vec<Point2<f64>>,
    /// Interior boundaries
    pub holes: Vec<Vec<Point2<f64>>>,
}

impl Polygon2D {
    /// Create a polygon without holes
    pub fn new(outer: Vec<Point2<f64>>) -> Self {
        Self {
            outer,
            holes: Vec::new(),
        }
    }

    /// Create a polygon with holes
    pub fn with_holes(outer: Vec<Point2<f64>>, holes: Vec<Vec<Point2<f64>>>) -> Self {
        Self { outer, holes }
    }

    /// Axis-aligned rectangle from two opposite corners
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(vec![
            Point2::new(min_x, min_y),
            Point2::new(max_x, min_y),
            Point2::new(max_x, max_y),
            Point2::new(min_x, max_y),
        ])
    }

    /// Add a hole to the polygon
    pub fn add_hole(&mut self, hole: Vec<Point2<f64>>) {
        self.holes.push(hole);
    }

    pub fn has_holes(&self) -> bool {
        !self.holes.is_empty()
    }

    /// Net covered area (outer minus holes)
    pub fn area(&self) -> f64 {
        let outer = compute_signed_area(&self.outer).abs();
        let holes: f64 = self
            .holes
            .iter()
            .map(|h| compute_signed_area(h).abs())
            .sum();
        (outer - holes).max(0.0)
    }

    /// True when the polygon covers no area
    pub fn is_empty(&self) -> bool {
        dedup_ring(&self.outer).len() < 3 || self.area() <= MIN_AREA_THRESHOLD
    }

    /// True when the polygon is simple, non-degenerate and has nonzero area
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check validity, reporting the first violation found
    pub fn validate(&self) -> Result<()> {
        let outer = dedup_ring(&self.outer);
        validate_ring(&outer, "outer boundary")?;

        let mut holes = Vec::with_capacity(self.holes.len());
        for (i, hole) in self.holes.iter().enumerate() {
            let hole = dedup_ring(hole);
            validate_ring(&hole, &format!("hole {}", i))?;

            if rings_cross(&outer, &hole) {
                return Err(Error::InvalidPolygon(format!(
                    "hole {} intersects the outer boundary",
                    i
                )));
            }
            if !point_in_ring(&hole[0], &outer) {
                return Err(Error::InvalidPolygon(format!(
                    "hole {} lies outside the outer boundary",
                    i
                )));
            }
            holes.push(hole);
        }

        for i in 0..holes.len() {
            for j in (i + 1)..holes.len() {
                if rings_cross(&holes[i], &holes[j])
                    || point_in_ring(&holes[i][0], &holes[j])
                    || point_in_ring(&holes[j][0], &holes[i])
                {
                    return Err(Error::InvalidPolygon(format!(
                        "holes {} and {} overlap",
                        i, j
                    )));
                }
            }
        }

        Ok(())
    }

    /// Copy with duplicate vertices removed, a counter-clockwise outer
    /// boundary and clockwise holes
    pub fn normalized(&self) -> Polygon2D {
        Polygon2D {
            outer: ensure_ccw(&dedup_ring(&self.outer)),
            holes: self
                .holes
                .iter()
                .map(|h| ensure_cw(&dedup_ring(h)))
                .filter(|h| h.len() >= 3)
                .collect(),
        }
    }

    /// Bounding box as (min, max)
    pub fn bounds(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        ring_bounds(&self.outer)
    }

    /// Resolve self-intersections, see [`crate::repair::repair`]
    pub fn repair(&self) -> Vec<Polygon2D> {
        crate::repair::repair(self)
    }

    /// Triangulate the polygon using earcutr
    ///
    /// Points are the normalized outer boundary followed by every hole;
    /// indices address that combined list.
    pub fn triangulate(&self) -> Result<Triangulation> {
        let normalized = self.normalized();
        if normalized.outer.len() < 3 {
            return Err(Error::InvalidPolygon(
                "Polygon must have at least 3 vertices".to_string(),
            ));
        }

        let indices = triangulate_polygon_with_holes(&normalized.outer, &normalized.holes)?;

        let mut points = normalized.outer;
        for hole in normalized.holes {
            points.extend(hole);
        }

        Ok(Triangulation { points, indices })
    }
}

/// Triangulated polygon
#[derive(Debug, Clone)]
pub struct Triangulation {
    /// All vertices (outer + holes)
    pub points: Vec<Point2<f64>>,
    /// Triangle indices
    pub indices: Vec<usize>,
}

fn validate_ring(ring: &[Point2<f64>], name: &str) -> Result<()> {
    if ring.len() < 3 {
        return Err(Error::InvalidPolygon(format!(
            "{} has fewer than 3 distinct vertices",
            name
        )));
    }
    if ring.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(Error::InvalidPolygon(format!(
            "{} has non-finite coordinates",
            name
        )));
    }
    if compute_signed_area(ring).abs() <= MIN_AREA_THRESHOLD {
        return Err(Error::InvalidPolygon(format!("{} has zero area", name)));
    }
    if !ring_is_simple(ring) {
        return Err(Error::InvalidPolygon(format!(
            "{} self-intersects",
            name
        )));
    }
    Ok(())
}

/// Compute the signed area of a ring
/// Positive = counter-clockwise, Negative = clockwise
pub fn compute_signed_area(ring: &[Point2<f64>]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    let n = ring.len();

    for i in 0..n {
        let j = (i + 1) % n;
        area += ring[i].x * ring[j].y;
        area -= ring[j].x * ring[i].y;
    }

    area * 0.5
}

/// Ensure ring has counter-clockwise winding (positive area)
pub fn ensure_ccw(ring: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if compute_signed_area(ring) < 0.0 {
        ring.iter().rev().cloned().collect()
    } else {
        ring.to_vec()
    }
}

/// Ensure ring has clockwise winding (for holes)
pub fn ensure_cw(ring: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if compute_signed_area(ring) > 0.0 {
        ring.iter().rev().cloned().collect()
    } else {
        ring.to_vec()
    }
}

/// Drop consecutive duplicate vertices, including an explicit closing vertex
pub fn dedup_ring(ring: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut result: Vec<Point2<f64>> = Vec::with_capacity(ring.len());
    for p in ring {
        if result.last() != Some(p) {
            result.push(*p);
        }
    }
    while result.len() > 1 && result.first() == result.last() {
        result.pop();
    }
    result
}

/// Check if a point is inside a ring using ray casting
pub fn point_in_ring(point: &Point2<f64>, ring: &[Point2<f64>]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let mut inside = false;
    let n = ring.len();

    let mut j = n - 1;
    for i in 0..n {
        let pi = &ring[i];
        let pj = &ring[j];

        if ((pi.y > point.y) != (pj.y > point.y))
            && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

/// Compute bounding box of a ring
pub fn ring_bounds(ring: &[Point2<f64>]) -> Option<(Point2<f64>, Point2<f64>)> {
    let first = ring.first()?;
    let mut min = *first;
    let mut max = *first;

    for p in ring.iter().skip(1) {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }

    Some((min, max))
}

#[inline]
fn orientation(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

#[inline]
fn sign(value: f64) -> i8 {
    if value > ORIENTATION_EPSILON {
        1
    } else if value < -ORIENTATION_EPSILON {
        -1
    } else {
        0
    }
}

/// `q` lies within the bounding box of segment `p`-`r` (assumes collinearity)
#[inline]
fn on_segment(p: &Point2<f64>, q: &Point2<f64>, r: &Point2<f64>) -> bool {
    q.x <= p.x.max(r.x) && q.x >= p.x.min(r.x) && q.y <= p.y.max(r.y) && q.y >= p.y.min(r.y)
}

/// Closed-segment intersection test (touching counts)
pub fn segments_intersect(
    p1: &Point2<f64>,
    p2: &Point2<f64>,
    p3: &Point2<f64>,
    p4: &Point2<f64>,
) -> bool {
    if p1.x.max(p2.x) < p3.x.min(p4.x)
        || p3.x.max(p4.x) < p1.x.min(p2.x)
        || p1.y.max(p2.y) < p3.y.min(p4.y)
        || p3.y.max(p4.y) < p1.y.min(p2.y)
    {
        return false;
    }

    let o1 = sign(orientation(p1, p2, p3));
    let o2 = sign(orientation(p1, p2, p4));
    let o3 = sign(orientation(p3, p4, p1));
    let o4 = sign(orientation(p3, p4, p2));

    if o1 != o2 && o3 != o4 && o1 * o2 <= 0 && o3 * o4 <= 0 {
        if o1 != 0 || o2 != 0 || o3 != 0 || o4 != 0 {
            return true;
        }
    }

    (o1 == 0 && on_segment(p1, p3, p2))
        || (o2 == 0 && on_segment(p1, p4, p2))
        || (o3 == 0 && on_segment(p3, p1, p4))
        || (o4 == 0 && on_segment(p3, p2, p4))
}

/// True when no two edges of the ring touch except adjacent edges at their
/// shared vertex
pub fn ring_is_simple(ring: &[Point2<f64>]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    for i in 0..n {
        let a = &ring[i];
        let b = &ring[(i + 1) % n];

        // Adjacent edge folding back over this one (zero-width spike)
        let c = &ring[(i + 2) % n];
        if sign(orientation(a, b, c)) == 0 && (a - b).dot(&(c - b)) > 0.0 {
            return false;
        }

        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let c = &ring[j];
            let d = &ring[(j + 1) % n];
            if segments_intersect(a, b, c, d) {
                return false;
            }
        }
    }

    true
}

/// True when any edge of `a` touches any edge of `b`
fn rings_cross(a: &[Point2<f64>], b: &[Point2<f64>]) -> bool {
    let n = a.len();
    let m = b.len();
    for i in 0..n {
        let p1 = &a[i];
        let p2 = &a[(i + 1) % n];
        for j in 0..m {
            if segments_intersect(p1, p2, &b[j], &b[(j + 1) % m]) {
                return true;
            }
        }
    }
    false
}
