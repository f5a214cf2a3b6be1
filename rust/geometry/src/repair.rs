// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Self-intersection repair for traced polygons
//!
//! Re-fills the polygon with a non-zero winding rule through i_overlay, which
//! resolves crossings and collapses zero-width spikes. A bow-tie comes back as
//! its two lobes.

use crate::polygon::{compute_signed_area, ensure_ccw, ensure_cw, point_in_ring, Polygon2D};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use nalgebra::Point2;

/// Repair a polygon into zero or more valid polygons
///
/// Valid input is returned unchanged. An empty result means the input covered
/// no area.
pub fn repair(polygon: &Polygon2D) -> Vec<Polygon2D> {
    if polygon.is_valid() {
        return vec![polygon.clone()];
    }

    let subject = polygon_to_paths(polygon);
    if subject.is_empty() {
        return Vec::new();
    }
    let clip: Vec<Vec<[f64; 2]>> = Vec::new();

    let shapes = subject.overlay(&clip, OverlayRule::Union, FillRule::NonZero);

    let mut repaired = Vec::new();
    for shape in &shapes {
        for candidate in shape_to_polygons(shape) {
            match candidate.validate() {
                Ok(()) => repaired.push(candidate),
                Err(e) => tracing::debug!(error = %e, "dropping unrepairable fragment"),
            }
        }
    }

    repaired
}

/// Merge possibly overlapping polygons into disjoint valid polygons
///
/// Overlapping inputs come back as their outline; polygons that only touch
/// may stay separate.
pub fn union_all(polygons: &[Polygon2D]) -> Vec<Polygon2D> {
    let subject: Vec<Vec<[f64; 2]>> = polygons
        .iter()
        .flat_map(|p| polygon_to_paths(&p.normalized()))
        .collect();
    if subject.is_empty() {
        return Vec::new();
    }
    let clip: Vec<Vec<[f64; 2]>> = Vec::new();

    let shapes = subject.overlay(&clip, OverlayRule::Union, FillRule::NonZero);

    shapes
        .iter()
        .flat_map(|shape| shape_to_polygons(shape))
        .filter(|candidate| match candidate.validate() {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "dropping degenerate union fragment");
                false
            }
        })
        .collect()
}

fn polygon_to_paths(polygon: &Polygon2D) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(&polygon.outer)
        .chain(polygon.holes.iter())
        .filter(|ring| ring.len() >= 3)
        .map(|ring| ring.iter().map(|p| [p.x, p.y]).collect())
        .collect()
}

/// Convert one i_overlay shape (outer contour first, then holes) into
/// polygons, splitting rings that pinch at a repeated vertex
fn shape_to_polygons(shape: &[Vec<[f64; 2]>]) -> Vec<Polygon2D> {
    let Some((outer, holes)) = shape.split_first() else {
        return Vec::new();
    };

    let mut polygons: Vec<Polygon2D> = split_pinched_ring(&path_to_ring(outer))
        .into_iter()
        .map(|ring| Polygon2D::new(ensure_ccw(&ring)))
        .collect();

    for hole in holes {
        for ring in split_pinched_ring(&path_to_ring(hole)) {
            let owner = polygons
                .iter_mut()
                .max_by_key(|p| ring.iter().filter(|v| point_in_ring(v, &p.outer)).count());
            if let Some(owner) = owner {
                owner.add_hole(ensure_cw(&ring));
            }
        }
    }

    polygons
}

fn path_to_ring(path: &[[f64; 2]]) -> Vec<Point2<f64>> {
    path.iter().map(|p| Point2::new(p[0], p[1])).collect()
}

/// Split a ring wherever it revisits an earlier vertex
fn split_pinched_ring(ring: &[Point2<f64>]) -> Vec<Vec<Point2<f64>>> {
    let mut loops = Vec::new();
    let mut stack: Vec<Point2<f64>> = Vec::with_capacity(ring.len());

    for p in ring {
        if let Some(pos) = stack.iter().position(|q| q == p) {
            let closed: Vec<Point2<f64>> = stack.drain(pos + 1..).collect();
            let mut piece = Vec::with_capacity(closed.len() + 1);
            piece.push(*p);
            piece.extend(closed);
            if piece.len() >= 3 && compute_signed_area(&piece).abs() > 0.0 {
                loops.push(piece);
            }
        } else {
            stack.push(*p);
        }
    }

    if stack.len() >= 3 && compute_signed_area(&stack).abs() > 0.0 {
        loops.push(stack);
    }

    loops
}
