// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Solid boolean operations
//!
//! Callers depend on [`BooleanEngine`] only. [`CsgrsEngine`] implements it on
//! top of csgrs' BSP kernel.

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::triangulation::{calculate_polygon_normal, project_to_2d, triangulate_polygon};
use nalgebra::{Point3, Vector3};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Narrow solid-modeling interface used by model synthesis
pub trait BooleanEngine {
    /// Remove the volume of `cutter` from `host`
    ///
    /// An empty cutter returns the host unchanged.
    fn subtract(&self, host: &Mesh, cutter: &Mesh) -> Result<Mesh>;
}

/// Boolean engine backed by csgrs
#[derive(Debug, Clone, Copy, Default)]
pub struct CsgrsEngine;

impl CsgrsEngine {
    pub fn new() -> Self {
        Self
    }
}

impl BooleanEngine for CsgrsEngine {
    fn subtract(&self, host: &Mesh, cutter: &Mesh) -> Result<Mesh> {
        use csgrs::traits::CSG;

        if cutter.is_empty() {
            return Ok(host.clone());
        }
        if host.is_empty() {
            return Ok(Mesh::new());
        }

        let host_csg = mesh_to_csgrs(host);
        let cutter_csg = mesh_to_csgrs(cutter);

        // The BSP kernel can panic on near-coplanar input
        let result_csg = catch_unwind(AssertUnwindSafe(|| host_csg.difference(&cutter_csg)))
            .map_err(|payload| Error::BooleanFailed(panic_message(payload.as_ref())))?;

        let result = csgrs_to_mesh(&result_csg);
        if !result.is_finite() {
            return Err(Error::BooleanFailed(
                "difference produced non-finite coordinates".to_string(),
            ));
        }

        tracing::debug!(
            host_triangles = host.triangle_count(),
            cutter_triangles = cutter.triangle_count(),
            result_triangles = result.triangle_count(),
            "csg difference complete"
        );

        Ok(result)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("kernel panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("kernel panicked: {}", s)
    } else {
        "kernel panicked".to_string()
    }
}

/// Convert our Mesh format to csgrs Mesh format
fn mesh_to_csgrs(mesh: &Mesh) -> csgrs::mesh::Mesh<()> {
    use csgrs::mesh::{polygon::Polygon, vertex::Vertex, Mesh as CSGMesh};

    let mut polygons = Vec::with_capacity(mesh.triangle_count());

    for [v0, v1, v2] in mesh.triangles() {
        // Degenerate triangles would put NaN planes into the BSP tree
        let face_normal = match (v1 - v0).cross(&(v2 - v0)).try_normalize(1e-10) {
            Some(n) => n,
            None => continue,
        };

        let vertices = vec![
            Vertex::new(v0, face_normal),
            Vertex::new(v1, face_normal),
            Vertex::new(v2, face_normal),
        ];
        polygons.push(Polygon::new(vertices, None));
    }

    CSGMesh::from_polygons(&polygons, None)
}

/// Convert csgrs Mesh format back to our Mesh format
///
/// csgrs polygons are planar n-gons. Each is triangulated in its own plane
/// and every triangle is oriented to agree with the polygon normal.
fn csgrs_to_mesh(csg_mesh: &csgrs::mesh::Mesh<()>) -> Mesh {
    let mut mesh = Mesh::new();

    for polygon in &csg_mesh.polygons {
        let vertices = &polygon.vertices;
        if vertices.len() < 3 {
            continue;
        }

        let points: Vec<Point3<f64>> = vertices
            .iter()
            .map(|v| Point3::new(v.pos[0], v.pos[1], v.pos[2]))
            .collect();

        let raw_normal = Vector3::new(
            vertices[0].normal[0],
            vertices[0].normal[1],
            vertices[0].normal[2],
        );
        let normal = match raw_normal.try_normalize(1e-10) {
            Some(n) if n.iter().all(|c| c.is_finite()) => n,
            _ => match calculate_polygon_normal(&points) {
                Some(n) => n,
                None => continue,
            },
        };

        if points.len() == 3 {
            push_oriented_triangle(&mut mesh, [points[0], points[1], points[2]], &normal);
            continue;
        }

        let points_2d = project_to_2d(&points, &normal);
        let indices = match triangulate_polygon(&points_2d) {
            Ok(idx) => idx,
            Err(_) => continue,
        };

        for tri in indices.chunks_exact(3) {
            push_oriented_triangle(
                &mut mesh,
                [points[tri[0]], points[tri[1]], points[tri[2]]],
                &normal,
            );
        }
    }

    mesh
}

/// Append a flat-shaded triangle, flipping it if it faces away from `normal`
fn push_oriented_triangle(mesh: &mut Mesh, tri: [Point3<f64>; 3], normal: &Vector3<f64>) {
    let [a, mut b, mut c] = tri;
    let geometric = (b - a).cross(&(c - a));
    if geometric.norm_squared() < 1e-20 {
        return;
    }
    if geometric.dot(normal) < 0.0 {
        std::mem::swap(&mut b, &mut c);
    }

    let base = mesh.vertex_count() as u32;
    mesh.add_vertex(a, *normal);
    mesh.add_vertex(b, *normal);
    mesh.add_vertex(c, *normal);
    mesh.add_triangle(base, base + 1, base + 2);
}

/// Closed axis-aligned box with outward-facing triangles
pub fn box_mesh(min: Point3<f64>, max: Point3<f64>) -> Mesh {
    let corners = [
        Point3::new(min.x, min.y, min.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(max.x, max.y, max.z),
        Point3::new(min.x, max.y, max.z),
    ];

    // Quads wound counter-clockwise when viewed from outside
    const FACES: [([usize; 4], [f64; 3]); 6] = [
        ([0, 3, 2, 1], [0.0, 0.0, -1.0]),
        ([4, 5, 6, 7], [0.0, 0.0, 1.0]),
        ([0, 4, 7, 3], [-1.0, 0.0, 0.0]),
        ([1, 2, 6, 5], [1.0, 0.0, 0.0]),
        ([0, 1, 5, 4], [0.0, -1.0, 0.0]),
        ([3, 7, 6, 2], [0.0, 1.0, 0.0]),
    ];

    let mut mesh = Mesh::with_capacity(24, 36);
    for (quad, n) in FACES {
        let normal = Vector3::new(n[0], n[1], n[2]);
        let base = mesh.vertex_count() as u32;
        for &corner in &quad {
            mesh.add_vertex(corners[corner], normal);
        }
        mesh.add_triangle(base, base + 1, base + 2);
        mesh.add_triangle(base, base + 2, base + 3);
    }

    mesh
}
