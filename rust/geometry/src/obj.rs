// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wavefront OBJ export
//!
//! Meshes are Z-up; OBJ consumers expect Y-up. Source Y (pixel rows, which
//! grow downward in the blueprint) becomes OBJ +Z so the plan is not
//! mirrored when viewed from above. That mapping is a reflection, so face
//! winding is reversed on output.

use crate::error::Result;
use crate::mesh::Mesh;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Welded view of a mesh: unique positions and normals plus per-corner
/// references into both
struct Welded {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    /// (position index, normal index) per triangle corner
    corners: Vec<(usize, usize)>,
}

fn weld(mesh: &Mesh) -> Welded {
    let mut position_ids: FxHashMap<[u32; 3], usize> = FxHashMap::default();
    let mut normal_ids: FxHashMap<[u32; 3], usize> = FxHashMap::default();
    let mut welded = Welded {
        positions: Vec::new(),
        normals: Vec::new(),
        corners: Vec::with_capacity(mesh.indices.len()),
    };

    for &index in &mesh.indices {
        let i = index as usize * 3;
        let p = [mesh.positions[i], mesh.positions[i + 1], mesh.positions[i + 2]];
        let n = [mesh.normals[i], mesh.normals[i + 1], mesh.normals[i + 2]];

        // -0.0 and 0.0 must weld together
        let key = |v: [f32; 3]| v.map(|c| (c + 0.0).to_bits());

        let pid = *position_ids.entry(key(p)).or_insert_with(|| {
            welded.positions.push(p);
            welded.positions.len() - 1
        });
        let nid = *normal_ids.entry(key(n)).or_insert_with(|| {
            welded.normals.push(n);
            welded.normals.len() - 1
        });
        welded.corners.push((pid, nid));
    }

    welded
}

/// Write a mesh as a single OBJ object
pub fn write_obj<W: Write>(writer: &mut W, mesh: &Mesh, name: &str) -> Result<()> {
    let welded = weld(mesh);

    writeln!(writer, "# Generated by blueprint3d")?;
    writeln!(
        writer,
        "# {} vertices, {} faces",
        welded.positions.len(),
        mesh.triangle_count()
    )?;
    writeln!(writer, "# Coordinate system: Y-up (OBJ convention)")?;
    writeln!(writer, "o {}", name)?;

    for p in &welded.positions {
        writeln!(writer, "v {:.6} {:.6} {:.6}", p[0], p[2], p[1])?;
    }
    for n in &welded.normals {
        writeln!(writer, "vn {:.6} {:.6} {:.6}", n[0], n[2], n[1])?;
    }

    for tri in welded.corners.chunks_exact(3) {
        let (p0, n0) = (tri[0].0 + 1, tri[0].1 + 1);
        let (p1, n1) = (tri[1].0 + 1, tri[1].1 + 1);
        let (p2, n2) = (tri[2].0 + 1, tri[2].1 + 1);
        writeln!(writer, "f {}//{} {}//{} {}//{}", p0, n0, p2, n2, p1, n1)?;
    }

    Ok(())
}

/// Write a mesh to an OBJ file, named after the file stem
pub fn export_obj(mesh: &Mesh, path: &Path) -> Result<()> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");

    let mut writer = BufWriter::new(File::create(path)?);
    write_obj(&mut writer, mesh, name)?;
    writer.flush()?;

    tracing::debug!(path = %path.display(), triangles = mesh.triangle_count(), "wrote OBJ");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csg::box_mesh;
    use nalgebra::Point3;

    fn render(mesh: &Mesh) -> String {
        let mut out = Vec::new();
        write_obj(&mut out, mesh, "test").unwrap();
        String::from_utf8(out).unwrap()
    }

    fn count_prefix(obj: &str, prefix: &str) -> usize {
        obj.lines().filter(|l| l.starts_with(prefix)).count()
    }

    #[test]
    fn test_box_counts_after_welding() {
        let mesh = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0));
        let obj = render(&mesh);

        assert_eq!(count_prefix(&obj, "v "), 8);
        assert_eq!(count_prefix(&obj, "vn "), 6);
        assert_eq!(count_prefix(&obj, "f "), 12);
        assert!(obj.contains("o test"));
    }

    #[test]
    fn test_axes_are_swapped_to_y_up() {
        let mesh = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0));
        let obj = render(&mesh);

        // Height (source Z = 3) becomes OBJ Y
        let max_y = obj
            .lines()
            .filter(|l| l.starts_with("v "))
            .filter_map(|l| l.split_whitespace().nth(2))
            .filter_map(|v| v.parse::<f64>().ok())
            .fold(f64::MIN, f64::max);
        assert_eq!(max_y, 3.0);
    }

    #[test]
    fn test_face_indices_are_one_based_and_in_range() {
        let mesh = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let obj = render(&mesh);

        for line in obj.lines().filter(|l| l.starts_with("f ")) {
            for corner in line.split_whitespace().skip(1) {
                let mut parts = corner.split("//");
                let v: usize = parts.next().unwrap().parse().unwrap();
                let n: usize = parts.next().unwrap().parse().unwrap();
                assert!((1..=8).contains(&v));
                assert!((1..=6).contains(&n));
            }
        }
    }

    #[test]
    fn test_export_to_file() {
        let dir = std::env::temp_dir().join(format!("blueprint3d-obj-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("walls.obj");

        let mesh = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        export_obj(&mesh, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("o walls"));
        assert_eq!(count_prefix(&written, "f "), 12);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let mesh = box_mesh(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let path = std::env::temp_dir()
            .join("blueprint3d-does-not-exist")
            .join("nested")
            .join("out.obj");
        assert!(export_obj(&mesh, &path).is_err());
    }
}
