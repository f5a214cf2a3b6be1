// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extrude wall outlines, cut openings through them and check the result

use approx::assert_relative_eq;
use blueprint3d_geometry::{
    extrude_polygon, BooleanEngine, CsgrsEngine, Matrix4, Mesh, Point2, Polygon2D, Vector3,
};

/// Hollow rectangle: 100 x 60 outline with a 5 px thick wall
fn room_walls() -> Polygon2D {
    Polygon2D::with_holes(
        Polygon2D::rectangle(0.0, 0.0, 100.0, 60.0).outer,
        vec![Polygon2D::rectangle(5.0, 5.0, 95.0, 55.0).outer],
    )
}

fn analyze_mesh(mesh: &Mesh, name: &str) {
    let (min, max) = mesh.bounds();
    println!("\n=== {} ===", name);
    println!("  Triangles: {}", mesh.triangle_count());
    println!("  Vertices: {}", mesh.vertex_count());
    println!(
        "  Bounds: min=({:.2}, {:.2}, {:.2}), max=({:.2}, {:.2}, {:.2})",
        min.x, min.y, min.z, max.x, max.y, max.z
    );
    println!("  Volume: {:.2}", mesh.volume());
}

#[test]
fn test_door_cut_through_wall() {
    let walls = extrude_polygon(&room_walls(), 75.0, None).unwrap();
    let wall_volume = walls.volume();
    assert_relative_eq!(wall_volume, (6000.0 - 4500.0) * 75.0, epsilon = 1e-3);
    assert!(walls.is_closed());

    // Door straddling the bottom wall, slightly deeper than the wall and
    // starting just below the floor
    let door_footprint = Polygon2D::rectangle(40.0, -2.0, 60.0, 7.0);
    let below_floor = Matrix4::new_translation(&Vector3::new(0.0, 0.0, -1.0));
    let door = extrude_polygon(&door_footprint, 53.5, Some(below_floor)).unwrap();

    let result = CsgrsEngine.subtract(&walls, &door).unwrap();
    analyze_mesh(&result, "Walls with door");

    assert!(!result.is_empty());
    assert!(result.is_finite());
    // 20 wide x 5 deep x 52.5 tall removed
    assert_relative_eq!(result.volume(), wall_volume - 20.0 * 5.0 * 52.5, epsilon = 1.0);
}

#[test]
fn test_window_above_sill() {
    let walls = extrude_polygon(&room_walls(), 75.0, None).unwrap();
    let wall_volume = walls.volume();

    let window_footprint = Polygon2D::rectangle(-1.0, 20.0, 6.0, 40.0);
    let sill = Matrix4::new_translation(&Vector3::new(0.0, 0.0, 22.5));
    let window = extrude_polygon(&window_footprint, 30.0, Some(sill)).unwrap();

    let (min, max) = window.bounds();
    assert_relative_eq!(min.z, 22.5);
    assert_relative_eq!(max.z, 52.5);

    let result = CsgrsEngine.subtract(&walls, &window).unwrap();
    analyze_mesh(&result, "Walls with window");

    // The wall stays intact below the sill
    let (result_min, result_max) = result.bounds();
    assert_relative_eq!(result_min.z, 0.0);
    assert_relative_eq!(result_max.z, 75.0);
    assert_relative_eq!(result.volume(), wall_volume - 5.0 * 20.0 * 30.0, epsilon = 1.0);
}

#[test]
fn test_several_openings_in_one_pass() {
    let walls = extrude_polygon(&room_walls(), 75.0, None).unwrap();

    let mut openings = Mesh::new();
    for x in [15.0, 45.0, 75.0] {
        let footprint = Polygon2D::rectangle(x, 53.0, x + 10.0, 62.0);
        let below_floor = Matrix4::new_translation(&Vector3::new(0.0, 0.0, -1.0));
        openings.merge(&extrude_polygon(&footprint, 53.5, Some(below_floor)).unwrap());
    }

    let result = CsgrsEngine.subtract(&walls, &openings).unwrap();
    assert_relative_eq!(
        result.volume(),
        walls.volume() - 3.0 * 10.0 * 5.0 * 52.5,
        epsilon = 1.0
    );
}

#[test]
fn test_opening_outside_walls_changes_nothing() {
    let walls = extrude_polygon(&room_walls(), 75.0, None).unwrap();
    let far_away = extrude_polygon(&Polygon2D::rectangle(500.0, 500.0, 520.0, 510.0), 10.0, None)
        .unwrap();

    let result = CsgrsEngine.subtract(&walls, &far_away).unwrap();
    assert_relative_eq!(result.volume(), walls.volume(), epsilon = 1.0);
}

#[test]
fn test_repaired_outline_extrudes() {
    let bowtie = Polygon2D::new(vec![
        Point2::new(0.0, 0.0),
        Point2::new(40.0, 40.0),
        Point2::new(40.0, 0.0),
        Point2::new(0.0, 40.0),
    ]);
    assert!(!bowtie.is_valid());

    let pieces = bowtie.repair();
    assert_eq!(pieces.len(), 2);

    let total: f64 = pieces
        .iter()
        .map(|p| extrude_polygon(p, 10.0, None).unwrap().volume())
        .sum();
    assert_relative_eq!(total, 800.0 * 10.0, epsilon = 1e-3);
}
