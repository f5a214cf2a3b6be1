// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation utilities
//!
//! Wrapper around earcutr. Output winding is not guaranteed; callers that
//! care about facing orient the triangles themselves.

use crate::{Error, Point2, Point3, Result, Vector3};

/// Flatten rings into the interleaved coordinate layout earcutr expects,
/// returning the start index of every ring after the first
fn flatten_rings<'a>(rings: impl Iterator<Item = &'a [Point2<f64>]>) -> (Vec<f64>, Vec<usize>) {
    let mut vertices = Vec::new();
    let mut ring_starts = Vec::new();

    for (i, ring) in rings.enumerate() {
        if i > 0 {
            ring_starts.push(vertices.len() / 2);
        }
        for p in ring {
            vertices.push(p.x);
            vertices.push(p.y);
        }
    }

    (vertices, ring_starts)
}

/// Triangulate a simple polygon (no holes)
/// Returns triangle indices into the input points
pub fn triangulate_polygon(points: &[Point2<f64>]) -> Result<Vec<usize>> {
    triangulate_polygon_with_holes(points, &[])
}

/// Triangulate a polygon with holes
/// Returns triangle indices into the combined vertex array (outer + all holes)
pub fn triangulate_polygon_with_holes(
    outer: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
) -> Result<Vec<usize>> {
    if outer.len() < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points in outer boundary".to_string(),
        ));
    }

    if outer.len() == 3 && holes.is_empty() {
        return Ok(vec![0, 1, 2]);
    }

    // Degenerate holes would shift the index space, so reject them up front
    if holes.iter().any(|h| h.len() < 3) {
        return Err(Error::TriangulationError(
            "Hole has fewer than 3 points".to_string(),
        ));
    }

    let (vertices, hole_indices) =
        flatten_rings(std::iter::once(outer).chain(holes.iter().map(|h| h.as_slice())));

    let indices = earcutr::earcut(&vertices, &hole_indices, 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))?;

    if indices.is_empty() {
        return Err(Error::TriangulationError(
            "earcut produced no triangles".to_string(),
        ));
    }

    Ok(indices)
}

/// Project 3D points onto a 2D plane defined by a normal
///
/// The (u, v, normal) basis is right-handed, so a ring that winds
/// counter-clockwise around `normal` stays counter-clockwise in 2D.
pub fn project_to_2d(points_3d: &[Point3<f64>], normal: &Vector3<f64>) -> Vec<Point2<f64>> {
    let Some(origin) = points_3d.first() else {
        return Vec::new();
    };

    // Pick the axis least parallel to the normal for a stable cross product
    let (ax, ay, az) = (normal.x.abs(), normal.y.abs(), normal.z.abs());
    let reference = if ax <= ay && ax <= az {
        Vector3::x()
    } else if ay <= az {
        Vector3::y()
    } else {
        Vector3::z()
    };

    let u_axis = reference.cross(normal).normalize();
    let v_axis = normal.cross(&u_axis).normalize();

    points_3d
        .iter()
        .map(|p| {
            let v = p - origin;
            Point2::new(v.dot(&u_axis), v.dot(&v_axis))
        })
        .collect()
}

/// Calculate the unit normal of a planar polygon using Newell's method
///
/// Returns `None` for degenerate input.
pub fn calculate_polygon_normal(points: &[Point3<f64>]) -> Option<Vector3<f64>> {
    let n = points.len();
    if n < 3 {
        return None;
    }

    let mut normal = Vector3::<f64>::zeros();
    for i in 0..n {
        let current = &points[i];
        let next = &points[(i + 1) % n];

        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }

    normal.try_normalize(1e-12)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(min: f64, max: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(min, min),
            Point2::new(max, min),
            Point2::new(max, max),
            Point2::new(min, max),
        ]
    }

    #[test]
    fn test_triangulate_square() {
        let indices = triangulate_polygon(&square(0.0, 1.0)).unwrap();
        assert_eq!(indices.len(), 6);
    }

    #[test]
    fn test_triangulate_triangle() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.5, 1.0),
        ];
        assert_eq!(triangulate_polygon(&points).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_triangulate_insufficient_points() {
        let points = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        assert!(triangulate_polygon(&points).is_err());
    }

    #[test]
    fn test_triangulate_concave() {
        // L-shaped room outline
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(20.0, 0.0),
            Point2::new(20.0, 10.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 20.0),
            Point2::new(0.0, 20.0),
        ];
        let indices = triangulate_polygon(&points).unwrap();
        assert_eq!(indices.len(), 12);
    }

    #[test]
    fn test_triangulate_square_with_hole() {
        let indices = triangulate_polygon_with_holes(&square(0.0, 10.0), &[square(3.0, 7.0)])
            .unwrap();
        // A square ring splits into 8 triangles
        assert_eq!(indices.len(), 24);
        assert!(indices.iter().all(|&i| i < 8));
    }

    #[test]
    fn test_degenerate_hole_rejected() {
        let hole = vec![Point2::new(3.0, 3.0), Point2::new(4.0, 4.0)];
        assert!(triangulate_polygon_with_holes(&square(0.0, 10.0), &[hole]).is_err());
    }

    #[test]
    fn test_calculate_polygon_normal() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let normal = calculate_polygon_normal(&points).unwrap();
        assert_relative_eq!(normal.z, 1.0, epsilon = 1e-12);

        let line = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        assert!(calculate_polygon_normal(&line).is_none());
    }

    #[test]
    fn test_project_to_2d_keeps_winding() {
        // Counter-clockwise around +Y
        let points = vec![
            Point3::new(0.0, 5.0, 0.0),
            Point3::new(0.0, 5.0, 1.0),
            Point3::new(1.0, 5.0, 1.0),
            Point3::new(1.0, 5.0, 0.0),
        ];
        let normal = calculate_polygon_normal(&points).unwrap();
        assert_relative_eq!(normal.y, 1.0, epsilon = 1e-12);

        let projected = project_to_2d(&points, &normal);
        let area = crate::polygon::compute_signed_area(&projected);
        assert_relative_eq!(area, 1.0, epsilon = 1e-12);
    }
}
