// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pixel to meter calibration from the drawn wall thickness

use serde::{Deserialize, Serialize};

/// Real-world dimensions assumed for every blueprint, in meters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealWorldConstants {
    pub wall_thickness_m: f64,
    pub door_height_m: f64,
    pub window_height_m: f64,
    pub window_sill_m: f64,
}

impl Default for RealWorldConstants {
    fn default() -> Self {
        Self {
            wall_thickness_m: 0.2,
            door_height_m: 2.1,
            window_height_m: 1.2,
            window_sill_m: 0.9,
        }
    }
}

/// Scale factor and vertical dimensions in pixel units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleCalibration {
    /// Pixels per meter
    pub scale_factor: f64,
    pub wall_height_px: f64,
    pub door_height_px: f64,
    pub window_height_px: f64,
    pub window_sill_px: f64,
    /// True when the thickness was unusable and a 1:1 scale was assumed
    pub is_fallback: bool,
}

impl ScaleCalibration {
    /// Derive the scale from the wall thickness in pixels
    ///
    /// A thickness of zero or less falls back to one pixel per meter.
    pub fn calibrate(
        wall_thickness_px: i64,
        wall_height_m: f64,
        constants: &RealWorldConstants,
    ) -> Self {
        let usable = wall_thickness_px > 0 && constants.wall_thickness_m > 0.0;
        let scale_factor = if usable {
            wall_thickness_px as f64 / constants.wall_thickness_m
        } else {
            tracing::warn!(
                wall_thickness_px,
                "wall thickness is not positive, assuming 1 pixel per meter"
            );
            1.0
        };

        Self {
            scale_factor,
            wall_height_px: wall_height_m * scale_factor,
            door_height_px: constants.door_height_m * scale_factor,
            window_height_px: constants.window_height_m * scale_factor,
            window_sill_px: constants.window_sill_m * scale_factor,
            is_fallback: !usable,
        }
    }

    /// Convert a pixel-space length back to meters
    pub fn to_meters(&self, pixels: f64) -> f64 {
        pixels / self.scale_factor
    }
}
