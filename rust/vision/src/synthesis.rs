// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh synthesis: extrude walls and openings, subtract, rescale to meters
//!
//! All geometry is built in pixel units so that footprints keep their
//! traced coordinates. The finished mesh is scaled by `1 / scale_factor`
//! as the last step.

use crate::error::{ConversionError, Result};
use crate::scale::{RealWorldConstants, ScaleCalibration};
use crate::types::{OpeningKind, OpeningPolygon};
use blueprint3d_geometry::{
    extrude_polygon, union_all, BooleanEngine, Matrix4, Mesh, Polygon2D, Vector3,
};
use serde::{Deserialize, Serialize};

/// Door cutters start this far below the floor so their bottom face is
/// never coplanar with the wall bottom
const DOOR_FLOOR_CLEARANCE_PX: f64 = 1.0;

/// Inputs to [`build_model`] besides the footprints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisParams {
    /// Wall height in meters
    pub wall_height_m: f64,
    /// Drawn wall thickness in pixels, used to calibrate the scale
    pub wall_thickness_px: i64,
    pub constants: RealWorldConstants,
}

impl Default for SynthesisParams {
    fn default() -> Self {
        Self {
            wall_height_m: 3.0,
            wall_thickness_px: 5,
            constants: RealWorldConstants::default(),
        }
    }
}

/// What happened to the opening subtraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtractionOutcome {
    /// Openings were cut out of the walls
    Applied,
    /// Nothing to cut
    NoOpenings,
    /// The boolean failed; the walls are returned without openings
    FellBack(String),
}

/// Final mesh in meters plus bookkeeping about how it was produced
#[derive(Debug, Clone)]
pub struct SynthesizedModel {
    pub mesh: Mesh,
    pub vertex_count: usize,
    pub face_count: usize,
    pub calibration: ScaleCalibration,
    pub subtraction: SubtractionOutcome,
    pub walls_extruded: usize,
    pub walls_skipped: usize,
    /// Opening prisms after merging overlapping footprints of one kind
    pub openings_extruded: usize,
}

/// Build the wall solid with door and window openings removed
pub fn build_model(
    walls: &[Polygon2D],
    doors: &[OpeningPolygon],
    windows: &[OpeningPolygon],
    params: &SynthesisParams,
    engine: &dyn BooleanEngine,
) -> Result<SynthesizedModel> {
    let calibration = ScaleCalibration::calibrate(
        params.wall_thickness_px,
        params.wall_height_m,
        &params.constants,
    );

    let (wall_mesh, walls_extruded, walls_skipped) =
        extrude_walls(walls, calibration.wall_height_px);
    if walls_extruded == 0 {
        return Err(ConversionError::NoWallMeshes);
    }

    // Overlapping matches of one kind share a height band, so their
    // footprints are merged in 2D and each kind becomes one set of
    // disjoint prisms
    let mut cutters = Vec::with_capacity(2);
    let mut openings_extruded = 0;
    for (kind, matches) in [(OpeningKind::Door, doors), (OpeningKind::Window, windows)] {
        let footprints: Vec<Polygon2D> = matches.iter().map(|o| o.polygon.clone()).collect();
        let prisms: Vec<Mesh> = union_all(&footprints)
            .iter()
            .filter_map(|footprint| match extrude_opening(kind, footprint, &calibration) {
                Ok(prism) => Some(prism),
                Err(e) => {
                    tracing::warn!(%kind, error = %e, "skipping opening");
                    None
                }
            })
            .collect();
        openings_extruded += prisms.len();
        let mut solid = Mesh::new();
        solid.merge_all(&prisms);
        if !solid.is_empty() {
            cutters.push(solid);
        }
    }

    let (mut mesh, subtraction) = if cutters.is_empty() {
        (wall_mesh, SubtractionOutcome::NoOpenings)
    } else {
        subtract_openings(wall_mesh, &cutters, engine)
    };

    mesh.scale_uniform(1.0 / calibration.scale_factor);

    tracing::info!(
        vertices = mesh.vertex_count(),
        faces = mesh.triangle_count(),
        walls_extruded,
        walls_skipped,
        openings_extruded,
        scale_factor = calibration.scale_factor,
        "model synthesized"
    );

    Ok(SynthesizedModel {
        vertex_count: mesh.vertex_count(),
        face_count: mesh.triangle_count(),
        mesh,
        calibration,
        subtraction,
        walls_extruded,
        walls_skipped,
        openings_extruded,
    })
}

/// Extrude every usable wall footprint and merge them
///
/// Returns the merged mesh with the extruded and skipped counts.
fn extrude_walls(walls: &[Polygon2D], height: f64) -> (Mesh, usize, usize) {
    let mut meshes = Vec::with_capacity(walls.len());
    let mut skipped = 0;

    for (index, wall) in walls.iter().enumerate() {
        if let Err(e) = wall.validate() {
            tracing::warn!(index, error = %e, "skipping invalid wall polygon");
            skipped += 1;
            continue;
        }
        match extrude_polygon(wall, height, None) {
            Ok(mesh) if !mesh.is_empty() => {
                meshes.push(mesh);
            }
            Ok(_) => {
                tracing::warn!(index, "wall extrusion produced no triangles");
                skipped += 1;
            }
            Err(e) => {
                tracing::warn!(index, error = %e, "wall extrusion failed");
                skipped += 1;
            }
        }
    }

    let mut merged = Mesh::new();
    merged.merge_all(&meshes);
    (merged, meshes.len(), skipped)
}

/// Prism for one opening footprint, placed at its height band
///
/// Windows span `window_sill_px` to `window_sill_px + window_height_px`.
/// Doors span the floor to `door_height_px`, but the prism is moved down by
/// [`DOOR_FLOOR_CLEARANCE_PX`] and made that much taller: its top stays at
/// the door head and its bottom sits below the wall bottom, so the removed
/// wall volume is the same as a floor-level cutter's.
fn extrude_opening(
    kind: OpeningKind,
    footprint: &Polygon2D,
    calibration: &ScaleCalibration,
) -> Result<Mesh> {
    let (base, height) = match kind {
        OpeningKind::Door => (
            -DOOR_FLOOR_CLEARANCE_PX,
            calibration.door_height_px + DOOR_FLOOR_CLEARANCE_PX,
        ),
        OpeningKind::Window => (calibration.window_sill_px, calibration.window_height_px),
    };
    let placement = Matrix4::new_translation(&Vector3::new(0.0, 0.0, base));
    Ok(extrude_polygon(footprint, height, Some(placement))?)
}

/// Subtract each cutter in turn; any failure discards all cuts
fn subtract_openings(
    walls: Mesh,
    cutters: &[Mesh],
    engine: &dyn BooleanEngine,
) -> (Mesh, SubtractionOutcome) {
    match cut_all(&walls, cutters, engine) {
        Ok(result) => (result, SubtractionOutcome::Applied),
        Err(reason) => {
            tracing::warn!(reason = %reason, "opening subtraction failed, keeping walls without openings");
            (walls, SubtractionOutcome::FellBack(reason))
        }
    }
}

fn cut_all(
    walls: &Mesh,
    cutters: &[Mesh],
    engine: &dyn BooleanEngine,
) -> std::result::Result<Mesh, String> {
    let mut current = walls.clone();
    for cutter in cutters {
        current = engine.subtract(&current, cutter).map_err(|e| e.to_string())?;
        if current.is_empty() {
            return Err("subtraction produced an empty mesh".to_string());
        }
        if !current.is_finite() {
            return Err("subtraction produced non-finite coordinates".to_string());
        }
    }
    Ok(current)
}
