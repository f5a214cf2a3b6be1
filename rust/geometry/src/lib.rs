// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Blueprint3D Geometry
//!
//! Planar polygon validation and repair, earcutr triangulation, prism
//! extrusion and solid subtraction for turning traced blueprint outlines
//! into closed meshes.

pub mod csg;
pub mod error;
pub mod extrusion;
pub mod mesh;
pub mod obj;
pub mod polygon;
pub mod repair;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point2, Point3, Vector2, Vector3};

pub use csg::{box_mesh, BooleanEngine, CsgrsEngine};
pub use error::{Error, Result};
pub use extrusion::{apply_transform, extrude_polygon};
pub use mesh::Mesh;
pub use obj::{export_obj, write_obj};
pub use polygon::{Polygon2D, Triangulation};
pub use repair::{repair, union_all};
pub use triangulation::{triangulate_polygon, triangulate_polygon_with_holes};
