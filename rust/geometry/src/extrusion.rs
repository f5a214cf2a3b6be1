// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extrusion operations - converting 2D polygons to closed prisms

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::polygon::{Polygon2D, Triangulation};
use nalgebra::{Matrix4, Point2, Point3, Vector3};

/// Extrude a 2D polygon along +Z from `z = 0` to `z = height`
///
/// The result is a closed solid with outward-facing triangles: the bottom cap
/// faces -Z, the top cap +Z and every side quad points away from the
/// material, including the walls around holes.
pub fn extrude_polygon(
    polygon: &Polygon2D,
    height: f64,
    transform: Option<Matrix4<f64>>,
) -> Result<Mesh> {
    if !height.is_finite() || height <= 0.0 {
        return Err(Error::InvalidExtrusion(format!(
            "Height must be positive, got {}",
            height
        )));
    }

    let normalized = polygon.normalized();
    let triangulation = normalized.triangulate()?;

    let side_vertex_count: usize = std::iter::once(&normalized.outer)
        .chain(normalized.holes.iter())
        .map(|ring| ring.len() * 4)
        .sum();
    let mut mesh = Mesh::with_capacity(
        triangulation.points.len() * 2 + side_vertex_count,
        triangulation.indices.len() * 2 + side_vertex_count / 4 * 6,
    );

    create_cap_mesh(&triangulation, 0.0, false, &mut mesh);
    create_cap_mesh(&triangulation, height, true, &mut mesh);

    create_side_walls(&normalized.outer, height, &mut mesh);
    for hole in &normalized.holes {
        create_side_walls(hole, height, &mut mesh);
    }

    if let Some(mat) = transform {
        apply_transform(&mut mesh, &mat);
    }

    Ok(mesh)
}

/// Create a cap mesh (top or bottom) from triangulation
///
/// earcut does not promise a winding, so each triangle is flipped as needed
/// to face up for the top cap and down for the bottom cap.
fn create_cap_mesh(triangulation: &Triangulation, z: f64, facing_up: bool, mesh: &mut Mesh) {
    let base_index = mesh.vertex_count() as u32;
    let normal = if facing_up {
        Vector3::new(0.0, 0.0, 1.0)
    } else {
        Vector3::new(0.0, 0.0, -1.0)
    };

    for point in &triangulation.points {
        mesh.add_vertex(Point3::new(point.x, point.y, z), normal);
    }

    for tri in triangulation.indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0], tri[1], tri[2]);
        let ccw = cross_2d(
            &triangulation.points[i0],
            &triangulation.points[i1],
            &triangulation.points[i2],
        ) > 0.0;

        let (i1, i2) = if ccw == facing_up { (i1, i2) } else { (i2, i1) };
        mesh.add_triangle(
            base_index + i0 as u32,
            base_index + i1 as u32,
            base_index + i2 as u32,
        );
    }
}

#[inline]
fn cross_2d(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Create side walls for a ring
///
/// Expects the outer ring counter-clockwise and holes clockwise, so the
/// right-hand side of every edge is outside the solid.
fn create_side_walls(boundary: &[Point2<f64>], height: f64, mesh: &mut Mesh) {
    for i in 0..boundary.len() {
        let j = (i + 1) % boundary.len();

        let p0 = &boundary[i];
        let p1 = &boundary[j];

        let edge = Vector3::new(p1.x - p0.x, p1.y - p0.y, 0.0);
        let normal = match Vector3::new(edge.y, -edge.x, 0.0).try_normalize(1e-10) {
            Some(n) => n,
            None => continue,
        };

        let idx = mesh.vertex_count() as u32;
        mesh.add_vertex(Point3::new(p0.x, p0.y, 0.0), normal);
        mesh.add_vertex(Point3::new(p1.x, p1.y, 0.0), normal);
        mesh.add_vertex(Point3::new(p1.x, p1.y, height), normal);
        mesh.add_vertex(Point3::new(p0.x, p0.y, height), normal);

        mesh.add_triangle(idx, idx + 1, idx + 2);
        mesh.add_triangle(idx, idx + 2, idx + 3);
    }
}

/// Apply transformation matrix to mesh
pub fn apply_transform(mesh: &mut Mesh, transform: &Matrix4<f64>) {
    mesh.positions.chunks_exact_mut(3).for_each(|chunk| {
        let point = Point3::new(chunk[0] as f64, chunk[1] as f64, chunk[2] as f64);
        let transformed = transform.transform_point(&point);
        chunk[0] = transformed.x as f32;
        chunk[1] = transformed.y as f32;
        chunk[2] = transformed.z as f32;
    });

    // Inverse transpose keeps normals perpendicular under non-uniform scale
    let normal_matrix = transform.try_inverse().unwrap_or(*transform).transpose();

    mesh.normals.chunks_exact_mut(3).for_each(|chunk| {
        let normal = Vector3::new(chunk[0] as f64, chunk[1] as f64, chunk[2] as f64);
        let transformed = (normal_matrix * normal.to_homogeneous())
            .xyz()
            .try_normalize(1e-12)
            .unwrap_or(normal);
        chunk[0] = transformed.x as f32;
        chunk[1] = transformed.y as f32;
        chunk[2] = transformed.z as f32;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_extrude_rectangle() {
        let polygon = Polygon2D::rectangle(0.0, 0.0, 10.0, 5.0);
        let mesh = extrude_polygon(&polygon, 20.0, None).unwrap();

        // 2 caps of 2 triangles plus 4 side quads
        assert_eq!(mesh.triangle_count(), 12);

        let (min, max) = mesh.bounds();
        assert_relative_eq!(min.x, 0.0);
        assert_relative_eq!(max.x, 10.0);
        assert_relative_eq!(max.y, 5.0);
        assert_relative_eq!(min.z, 0.0);
        assert_relative_eq!(max.z, 20.0);

        assert_relative_eq!(mesh.volume(), 1000.0, epsilon = 1e-6);
        assert!(mesh.is_closed());
    }

    #[test]
    fn test_clockwise_input_still_faces_outward() {
        let polygon = Polygon2D::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 4.0),
            Point2::new(4.0, 4.0),
            Point2::new(4.0, 0.0),
        ]);
        let mesh = extrude_polygon(&polygon, 2.0, None).unwrap();
        assert_relative_eq!(mesh.volume(), 32.0, epsilon = 1e-6);
    }

    #[test]
    fn test_side_normals_point_outward() {
        let polygon = Polygon2D::rectangle(0.0, 0.0, 10.0, 10.0);
        let mesh = extrude_polygon(&polygon, 1.0, None).unwrap();

        for v in 0..mesh.vertex_count() {
            let p = mesh.position(v);
            let n = Vector3::new(
                mesh.normals[v * 3] as f64,
                mesh.normals[v * 3 + 1] as f64,
                mesh.normals[v * 3 + 2] as f64,
            );
            let from_center = Vector3::new(p.x - 5.0, p.y - 5.0, p.z - 0.5);
            assert!(n.dot(&from_center) > 0.0);
        }
    }

    #[test]
    fn test_extrude_with_hole() {
        let hole = vec![
            Point2::new(3.0, 3.0),
            Point2::new(7.0, 3.0),
            Point2::new(7.0, 7.0),
            Point2::new(3.0, 7.0),
        ];
        let polygon = Polygon2D::with_holes(
            Polygon2D::rectangle(0.0, 0.0, 10.0, 10.0).outer,
            vec![hole],
        );
        let mesh = extrude_polygon(&polygon, 3.0, None).unwrap();

        assert_relative_eq!(mesh.volume(), 84.0 * 3.0, epsilon = 1e-6);
        assert!(mesh.is_closed());
    }

    #[test]
    fn test_extrude_with_transform() {
        let polygon = Polygon2D::rectangle(0.0, 0.0, 10.0, 5.0);
        let transform = Matrix4::new_translation(&Vector3::new(100.0, 200.0, 300.0));
        let mesh = extrude_polygon(&polygon, 20.0, Some(transform)).unwrap();

        let (min, max) = mesh.bounds();
        assert_relative_eq!(min.x, 100.0);
        assert_relative_eq!(max.y, 205.0);
        assert_relative_eq!(min.z, 300.0);
        assert_relative_eq!(max.z, 320.0);
    }

    #[test]
    fn test_invalid_height() {
        let polygon = Polygon2D::rectangle(0.0, 0.0, 10.0, 5.0);
        assert!(extrude_polygon(&polygon, -1.0, None).is_err());
        assert!(extrude_polygon(&polygon, 0.0, None).is_err());
        assert!(extrude_polygon(&polygon, f64::NAN, None).is_err());
    }

    #[test]
    fn test_degenerate_polygon_fails() {
        let polygon = Polygon2D::new(vec![Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)]);
        assert!(extrude_polygon(&polygon, 1.0, None).is_err());
    }
}
