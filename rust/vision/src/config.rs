// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion configuration
//!
//! Every field has a default, so a JSON file only needs the values it
//! changes. Environment variables are applied on top of the file.

use crate::contour::ContourConfig;
use crate::error::{ConversionError, Result};
use crate::openings::OpeningConfig;
use crate::preprocess::PreprocessConfig;
use crate::scale::RealWorldConstants;
use crate::synthesis::SynthesisParams;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Full set of tunables for one conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    pub preprocess: PreprocessConfig,
    pub contour: ContourConfig,
    pub openings: OpeningConfig,
    /// Wall height in meters
    pub wall_height_m: f64,
    /// Drawn wall thickness in pixels
    pub wall_thickness_px: i64,
    pub constants: RealWorldConstants,
    /// Write the cleaned mask next to path-based inputs
    pub save_diagnostics: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        let synthesis = SynthesisParams::default();
        Self {
            preprocess: PreprocessConfig::default(),
            contour: ContourConfig::default(),
            openings: OpeningConfig::default(),
            wall_height_m: synthesis.wall_height_m,
            wall_thickness_px: synthesis.wall_thickness_px,
            constants: synthesis.constants,
            save_diagnostics: false,
        }
    }
}

impl ConversionConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ConversionError::Config(e.to_string()))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConversionError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Override fields from `BLUEPRINT3D_*` process environment variables
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Override fields from any variable lookup
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "BLUEPRINT3D_WALL_HEIGHT") {
            self.wall_height_m = v;
        }
        if let Some(v) = parse_var(&lookup, "BLUEPRINT3D_WALL_THICKNESS") {
            self.wall_thickness_px = v;
        }
        if let Some(v) = parse_var(&lookup, "BLUEPRINT3D_MATCH_THRESHOLD") {
            self.openings.threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "BLUEPRINT3D_MIN_CONTOUR_AREA") {
            self.contour.min_area = v;
        }
        if let Some(v) = parse_var(&lookup, "BLUEPRINT3D_SAVE_DIAGNOSTICS") {
            self.save_diagnostics = v;
        }
    }

    /// Reject values no conversion can work with
    pub fn validate(&self) -> Result<()> {
        if !self.wall_height_m.is_finite() || self.wall_height_m <= 0.0 {
            return Err(ConversionError::Config(format!(
                "wall height must be positive, got {}",
                self.wall_height_m
            )));
        }
        if !(-1.0..=1.0).contains(&self.openings.threshold) {
            return Err(ConversionError::Config(format!(
                "match threshold must be within [-1, 1], got {}",
                self.openings.threshold
            )));
        }
        if let Some(iou) = self.openings.nms_iou {
            if !(0.0..=1.0).contains(&iou) {
                return Err(ConversionError::Config(format!(
                    "overlap limit must be within [0, 1], got {}",
                    iou
                )));
            }
        }
        if self.preprocess.block_size < 3 || self.preprocess.block_size % 2 == 0 {
            return Err(ConversionError::Config(format!(
                "threshold block size must be odd and at least 3, got {}",
                self.preprocess.block_size
            )));
        }
        if !self.contour.min_area.is_finite() || self.contour.min_area < 0.0 {
            return Err(ConversionError::Config(format!(
                "minimum contour area must be non-negative, got {}",
                self.contour.min_area
            )));
        }
        let c = &self.constants;
        for (name, value) in [
            ("door height", c.door_height_m),
            ("window height", c.window_height_m),
            ("window sill", c.window_sill_m),
            ("wall thickness", c.wall_thickness_m),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConversionError::Config(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Parameters for the synthesis stage
    pub fn synthesis_params(&self) -> SynthesisParams {
        SynthesisParams {
            wall_height_m: self.wall_height_m,
            wall_thickness_px: self.wall_thickness_px,
            constants: self.constants.clone(),
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "ignoring unparseable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::HoleMode;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ConversionConfig::default();
        assert_eq!(config.wall_height_m, 3.0);
        assert_eq!(config.wall_thickness_px, 5);
        assert_eq!(config.openings.threshold, 0.7);
        assert_eq!(config.contour.min_area, 150.0);
        assert_eq!(config.preprocess.block_size, 11);
        assert!(!config.save_diagnostics);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = ConversionConfig::from_json_str(
            r#"{
                "wall_height_m": 2.5,
                "contour": { "hole_mode": "hierarchy" },
                "openings": { "threshold": 0.8, "nms_iou": 0.3 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.wall_height_m, 2.5);
        assert_eq!(config.contour.hole_mode, HoleMode::Hierarchy);
        assert_eq!(config.contour.min_area, 150.0);
        assert_eq!(config.openings.nms_iou, Some(0.3));
        assert_eq!(config.wall_thickness_px, 5);
    }

    #[test]
    fn test_malformed_json() {
        let err = ConversionConfig::from_json_str("{ wall_height_m: }").unwrap_err();
        assert!(matches!(err, ConversionError::Config(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ConversionConfig::from_json_file(Path::new("/nonexistent/config.json"))
            .unwrap_err();
        assert!(matches!(err, ConversionError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ConversionConfig::default();
        config.apply_env_from(lookup(&[
            ("BLUEPRINT3D_WALL_HEIGHT", "2.4"),
            ("BLUEPRINT3D_WALL_THICKNESS", " 8 "),
            ("BLUEPRINT3D_MATCH_THRESHOLD", "0.75"),
            ("BLUEPRINT3D_SAVE_DIAGNOSTICS", "true"),
        ]));

        assert_eq!(config.wall_height_m, 2.4);
        assert_eq!(config.wall_thickness_px, 8);
        assert_eq!(config.openings.threshold, 0.75);
        assert!(config.save_diagnostics);
        assert_eq!(config.contour.min_area, 150.0);
    }

    #[test]
    fn test_bad_env_value_is_ignored() {
        let mut config = ConversionConfig::default();
        config.apply_env_from(lookup(&[
            ("BLUEPRINT3D_WALL_THICKNESS", "thick"),
            ("BLUEPRINT3D_MIN_CONTOUR_AREA", "90"),
        ]));
        assert_eq!(config.wall_thickness_px, 5);
        assert_eq!(config.contour.min_area, 90.0);
    }

    #[test]
    fn test_validation() {
        let mut config = ConversionConfig {
            wall_height_m: 0.0,
            ..ConversionConfig::default()
        };
        assert!(config.validate().is_err());

        config.wall_height_m = 3.0;
        config.preprocess.block_size = 10;
        assert!(config.validate().is_err());

        config.preprocess.block_size = 11;
        config.openings.threshold = 1.5;
        assert!(config.validate().is_err());

        config.openings.threshold = 0.7;
        config.constants.door_height_m = f64::NAN;
        assert!(config.validate().is_err());

        // Non-positive thickness is allowed and handled by the scale fallback
        config.constants.door_height_m = 2.1;
        config.wall_thickness_px = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_synthesis_params() {
        let config = ConversionConfig {
            wall_height_m: 2.8,
            wall_thickness_px: 7,
            ..ConversionConfig::default()
        };
        let params = config.synthesis_params();
        assert_eq!(params.wall_height_m, 2.8);
        assert_eq!(params.wall_thickness_px, 7);
    }
}
