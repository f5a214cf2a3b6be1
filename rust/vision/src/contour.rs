// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall polygon extraction from the binary mask

use crate::types::BinaryMask;
use blueprint3d_geometry::polygon::compute_signed_area;
use blueprint3d_geometry::{Point2, Polygon2D};
use imageproc::contours::{find_contours, BorderType, Contour};
use serde::{Deserialize, Serialize};

/// How traced hole borders relate to the outer borders around them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HoleMode {
    /// Every border becomes its own filled polygon
    #[default]
    Independent,
    /// Hole borders are cut out of the outer border that encloses them
    Hierarchy,
}

/// Parameters for contour extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    /// Contours enclosing less than this many square pixels are noise
    pub min_area: f64,
    pub hole_mode: HoleMode,
    /// Inset of the fallback rectangle from the image border (pixels)
    pub fallback_inset: u32,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            min_area: 150.0,
            hole_mode: HoleMode::Independent,
            fallback_inset: 10,
        }
    }
}

/// Outcome of wall extraction
#[derive(Debug, Clone, PartialEq)]
pub enum WallExtraction {
    /// Polygons traced from the mask
    Polygons(Vec<Polygon2D>),
    /// Nothing usable was traced; a rectangle inset from the border stands in
    FallbackUsed(Polygon2D),
    /// Not even the fallback rectangle was valid
    Empty,
}

impl WallExtraction {
    pub fn polygons(&self) -> &[Polygon2D] {
        match self {
            WallExtraction::Polygons(polygons) => polygons,
            WallExtraction::FallbackUsed(polygon) => std::slice::from_ref(polygon),
            WallExtraction::Empty => &[],
        }
    }

    pub fn into_polygons(self) -> Vec<Polygon2D> {
        match self {
            WallExtraction::Polygons(polygons) => polygons,
            WallExtraction::FallbackUsed(polygon) => vec![polygon],
            WallExtraction::Empty => Vec::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, WallExtraction::FallbackUsed(_))
    }

    pub fn is_empty(&self) -> bool {
        self.polygons().is_empty()
    }

    pub fn len(&self) -> usize {
        self.polygons().len()
    }
}

/// Trace wall outlines in the mask and turn them into valid polygons
pub fn extract_wall_polygons(mask: &BinaryMask, config: &ContourConfig) -> WallExtraction {
    let contours = find_contours::<i32>(mask.as_image());

    let candidates = match config.hole_mode {
        HoleMode::Independent => independent_polygons(&contours, config.min_area),
        HoleMode::Hierarchy => hierarchical_polygons(&contours, config.min_area),
    };

    let mut accepted = Vec::with_capacity(candidates.len());
    let mut repaired = 0usize;
    let mut discarded = 0usize;

    for candidate in candidates {
        if candidate.is_valid() && !candidate.is_empty() {
            accepted.push(candidate);
            continue;
        }

        let pieces = candidate.repair();
        if pieces.is_empty() {
            discarded += 1;
            tracing::warn!(
                vertices = candidate.outer.len(),
                "could not repair wall contour, skipping"
            );
        } else {
            repaired += 1;
            accepted.extend(pieces.into_iter().filter(|p| !p.is_empty()));
        }
    }

    tracing::debug!(
        contours = contours.len(),
        accepted = accepted.len(),
        repaired,
        discarded,
        "traced wall contours"
    );

    if !accepted.is_empty() {
        return WallExtraction::Polygons(accepted);
    }

    let fallback = fallback_rectangle(mask.width(), mask.height(), config.fallback_inset);
    if fallback.is_valid() {
        tracing::warn!(
            width = mask.width(),
            height = mask.height(),
            "no wall contours found, using fallback rectangle"
        );
        WallExtraction::FallbackUsed(fallback)
    } else {
        WallExtraction::Empty
    }
}

/// Rectangle inset from the image border, the inset clamped so the
/// rectangle keeps a positive size
pub fn fallback_rectangle(width: u32, height: u32, inset: u32) -> Polygon2D {
    let (w, h) = (width as i64, height as i64);
    let i = (inset as i64).min(h / 2 - 1).min(w / 2 - 1).max(0);
    Polygon2D::rectangle(i as f64, i as f64, (w - i) as f64, (h - i) as f64)
}

fn independent_polygons(contours: &[Contour<i32>], min_area: f64) -> Vec<Polygon2D> {
    contours
        .iter()
        .filter_map(|c| contour_ring(c, min_area))
        .map(Polygon2D::new)
        .collect()
}

fn hierarchical_polygons(contours: &[Contour<i32>], min_area: f64) -> Vec<Polygon2D> {
    let mut polygon_of = vec![None; contours.len()];
    let mut polygons: Vec<Polygon2D> = Vec::new();

    for (i, contour) in contours.iter().enumerate() {
        if contour.border_type != BorderType::Outer {
            continue;
        }
        if let Some(ring) = contour_ring(contour, min_area) {
            polygon_of[i] = Some(polygons.len());
            polygons.push(Polygon2D::new(ring));
        }
    }

    for contour in contours {
        if contour.border_type != BorderType::Hole {
            continue;
        }
        let Some(owner) = contour.parent.and_then(|p| polygon_of[p]) else {
            continue;
        };
        if let Some(ring) = contour_ring(contour, min_area) {
            polygons[owner].add_hole(ring);
        }
    }

    polygons
}

/// Area-filtered, compressed ring from a traced border
fn contour_ring(contour: &Contour<i32>, min_area: f64) -> Option<Vec<Point2<f64>>> {
    if contour.points.len() < 3 {
        return None;
    }

    let points: Vec<Point2<f64>> = contour
        .points
        .iter()
        .map(|p| Point2::new(p.x as f64, p.y as f64))
        .collect();

    if compute_signed_area(&points).abs() < min_area {
        return None;
    }

    let ring = compress_straight_runs(&points);
    let mut distinct = ring.clone();
    distinct.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    distinct.dedup();
    if distinct.len() < 3 {
        return None;
    }

    Some(ring)
}

/// Drop vertices lying in the middle of a straight run, keeping only the
/// endpoints of horizontal, vertical and diagonal segments
pub fn compress_straight_runs(points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    let mut ring: Vec<Point2<f64>> = Vec::with_capacity(points.len());
    for p in points {
        if ring.last() != Some(p) {
            ring.push(*p);
        }
    }
    while ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }

    let n = ring.len();
    if n < 3 {
        return ring;
    }

    // A vertex whose incoming and outgoing steps point the same way sits
    // inside a straight run; removing every such vertex at once is safe
    (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let cur = ring[i];
            let next = ring[(i + 1) % n];
            let d1 = cur - prev;
            let d2 = next - cur;
            let cross = d1.x * d2.y - d1.y * d2.x;
            cross != 0.0 || d1.dot(&d2) <= 0.0
        })
        .map(|i| ring[i])
        .collect()
}
