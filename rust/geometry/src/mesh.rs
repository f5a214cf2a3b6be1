// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;

/// Positions closer than this are treated as the same vertex in topology checks
const WELD_EPSILON: f64 = 1e-4;

/// Triangle mesh
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Vertex positions (x, y, z)
    pub positions: Vec<f32>,
    /// Vertex normals (nx, ny, nz)
    pub normals: Vec<f32>,
    /// Triangle indices (i0, i1, i2)
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            positions: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, index_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count * 3),
            normals: Vec::with_capacity(vertex_count * 3),
            indices: Vec::with_capacity(index_count),
        }
    }

    /// Add a vertex with normal
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>, normal: Vector3<f64>) {
        self.positions.push(position.x as f32);
        self.positions.push(position.y as f32);
        self.positions.push(position.z as f32);

        self.normals.push(normal.x as f32);
        self.normals.push(normal.y as f32);
        self.normals.push(normal.z as f32);
    }

    /// Add a triangle
    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.indices.push(i0);
        self.indices.push(i1);
        self.indices.push(i2);
    }

    /// Position of a vertex in f64
    #[inline]
    pub fn position(&self, index: usize) -> Point3<f64> {
        Point3::new(
            self.positions[index * 3] as f64,
            self.positions[index * 3 + 1] as f64,
            self.positions[index * 3 + 2] as f64,
        )
    }

    /// Iterate over triangles as position triples
    pub fn triangles(&self) -> impl Iterator<Item = [Point3<f64>; 3]> + '_ {
        self.indices.chunks_exact(3).map(move |tri| {
            [
                self.position(tri[0] as usize),
                self.position(tri[1] as usize),
                self.position(tri[2] as usize),
            ]
        })
    }

    /// Merge another mesh into this one
    #[inline]
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }

        let vertex_offset = (self.positions.len() / 3) as u32;

        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices
            .extend(other.indices.iter().map(|&i| i + vertex_offset));
    }

    /// Batch merge multiple meshes at once
    pub fn merge_all(&mut self, meshes: &[Mesh]) {
        let total_positions: usize = meshes.iter().map(|m| m.positions.len()).sum();
        let total_indices: usize = meshes.iter().map(|m| m.indices.len()).sum();

        self.positions.reserve(total_positions);
        self.normals.reserve(total_positions);
        self.indices.reserve(total_indices);

        for mesh in meshes {
            self.merge(mesh);
        }
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }

    /// True when every coordinate and normal component is finite
    pub fn is_finite(&self) -> bool {
        self.positions.iter().all(|v| v.is_finite()) && self.normals.iter().all(|v| v.is_finite())
    }

    /// Calculate bounds (min, max)
    pub fn bounds(&self) -> (Point3<f32>, Point3<f32>) {
        if self.is_empty() {
            return (Point3::origin(), Point3::origin());
        }

        let mut min = Point3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Point3::new(f32::MIN, f32::MIN, f32::MIN);

        self.positions.chunks_exact(3).for_each(|chunk| {
            let (x, y, z) = (chunk[0], chunk[1], chunk[2]);
            min.x = min.x.min(x);
            min.y = min.y.min(y);
            min.z = min.z.min(z);
            max.x = max.x.max(x);
            max.y = max.y.max(y);
            max.z = max.z.max(z);
        });

        (min, max)
    }

    /// Signed enclosed volume via the divergence theorem
    ///
    /// Positive for a closed mesh with outward-facing triangles. Accumulated
    /// in f64 relative to the first vertex to limit cancellation.
    pub fn volume(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let origin = self.position(0).coords;

        self.triangles()
            .map(|[a, b, c]| {
                let a = a.coords - origin;
                let b = b.coords - origin;
                let c = c.coords - origin;
                a.dot(&b.cross(&c))
            })
            .sum::<f64>()
            / 6.0
    }

    /// Scale all positions about the origin
    ///
    /// Normals are unaffected by a positive uniform scale.
    pub fn scale_uniform(&mut self, factor: f64) {
        self.positions
            .iter_mut()
            .for_each(|v| *v = (*v as f64 * factor) as f32);
    }

    /// True when every edge is shared by exactly two triangles after welding
    /// coincident positions
    pub fn is_closed(&self) -> bool {
        if self.is_empty() {
            return false;
        }

        let quantize = |index: u32| -> (i64, i64, i64) {
            let p = self.position(index as usize);
            (
                (p.x / WELD_EPSILON).round() as i64,
                (p.y / WELD_EPSILON).round() as i64,
                (p.z / WELD_EPSILON).round() as i64,
            )
        };

        let mut edge_uses: FxHashMap<((i64, i64, i64), (i64, i64, i64)), u32> =
            FxHashMap::default();

        for tri in self.indices.chunks_exact(3) {
            let keys = [quantize(tri[0]), quantize(tri[1]), quantize(tri[2])];
            for k in 0..3 {
                let a = keys[k];
                let b = keys[(k + 1) % 3];
                if a == b {
                    continue;
                }
                let edge = if a < b { (a, b) } else { (b, a) };
                *edge_uses.entry(edge).or_insert(0) += 1;
            }
        }

        !edge_uses.is_empty() && edge_uses.values().all(|&count| count == 2)
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}
