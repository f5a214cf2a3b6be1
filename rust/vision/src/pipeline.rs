// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end conversion: blueprint image in, wall solid out

use crate::config::ConversionConfig;
use crate::contour::{extract_wall_polygons, WallExtraction};
use crate::error::{ConversionError, Result};
use crate::openings::{detect_with_config, load_template};
use crate::preprocess::{preprocess, save_diagnostic_mask};
use crate::synthesis::{build_model, SynthesizedModel};
use crate::types::{ImageSource, OpeningKind};
use blueprint3d_geometry::{export_obj, BooleanEngine};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Everything needed for one conversion
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub image: ImageSource,
    pub door_template: ImageSource,
    pub window_template: ImageSource,
    pub config: ConversionConfig,
}

impl ConversionRequest {
    pub fn new(
        image: impl Into<ImageSource>,
        door_template: impl Into<ImageSource>,
        window_template: impl Into<ImageSource>,
    ) -> Self {
        Self {
            image: image.into(),
            door_template: door_template.into(),
            window_template: window_template.into(),
            config: ConversionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ConversionConfig) -> Self {
        self.config = config;
        self
    }
}

/// How the wall footprints were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallSummary {
    pub polygon_count: usize,
    /// The fallback rectangle stood in for traced walls
    pub fallback: bool,
}

impl From<&WallExtraction> for WallSummary {
    fn from(extraction: &WallExtraction) -> Self {
        Self {
            polygon_count: extraction.len(),
            fallback: extraction.is_fallback(),
        }
    }
}

/// Result of a successful conversion
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub model: SynthesizedModel,
    pub walls: WallSummary,
    pub door_count: usize,
    pub window_count: usize,
    /// Cleaned mask written next to the input, when enabled
    pub diagnostic_mask: Option<PathBuf>,
}

/// Decode the blueprint, reporting failures as bad input
pub fn load_image(source: &ImageSource) -> Result<DynamicImage> {
    source.decode().map_err(ConversionError::ImageLoad)
}

/// Run the full conversion
///
/// Fails fast on unreadable inputs, on a mask without any usable wall
/// outline and when no wall could be extruded. Subtraction failures are
/// recovered inside the synthesis stage.
pub fn convert(request: &ConversionRequest, engine: &dyn BooleanEngine) -> Result<ConversionOutput> {
    let config = &request.config;
    config.validate()?;

    let image = load_image(&request.image)?;
    tracing::info!(
        source = %request.image.describe(),
        width = image.width(),
        height = image.height(),
        "converting blueprint"
    );

    let mask = preprocess(&image, &config.preprocess)?;
    let diagnostic_mask = match request.image.path() {
        Some(path) if config.save_diagnostics => save_diagnostic_mask(&mask, path),
        _ => None,
    };

    let walls = extract_wall_polygons(&mask, &config.contour);
    if walls.is_empty() {
        return Err(ConversionError::NoWallFeatures);
    }
    let summary = WallSummary::from(&walls);

    let door_template = load_template(&request.door_template)?;
    let window_template = load_template(&request.window_template)?;

    let gray = image.to_luma8();
    let doors = detect_with_config(&gray, &door_template, OpeningKind::Door, &config.openings);
    let windows = detect_with_config(
        &gray,
        &window_template,
        OpeningKind::Window,
        &config.openings,
    );
    tracing::info!(
        walls = summary.polygon_count,
        fallback = summary.fallback,
        doors = doors.len(),
        windows = windows.len(),
        "features detected"
    );

    let model = build_model(
        walls.polygons(),
        &doors,
        &windows,
        &config.synthesis_params(),
        engine,
    )?;

    Ok(ConversionOutput {
        model,
        walls: summary,
        door_count: doors.len(),
        window_count: windows.len(),
        diagnostic_mask,
    })
}

/// Last name handed out, so names issued within one millisecond differ
static LAST_ISSUED: Mutex<(u128, u64)> = Mutex::new((0, 0));

/// `<dir>/<stem>_<unix-millis>.obj`, suffixed with a sequence number when
/// that name was already issued or already exists
pub fn unique_model_path(dir: &Path, stem: &str) -> PathBuf {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);

    let mut last = LAST_ISSUED.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut sequence = if last.0 == millis { last.1 + 1 } else { 0 };

    loop {
        let name = if sequence == 0 {
            format!("{}_{}.obj", stem, millis)
        } else {
            format!("{}_{}_{}.obj", stem, millis, sequence)
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            *last = (millis, sequence);
            return candidate;
        }
        sequence += 1;
    }
}

/// Stem used for output files derived from `source`
pub fn output_stem(source: &ImageSource) -> String {
    source
        .path()
        .and_then(|p| p.file_stem())
        .and_then(|s| s.to_str())
        .unwrap_or("model")
        .to_string()
}

/// Write the model as OBJ under a fresh name in `dir`
pub fn write_model(model: &SynthesizedModel, dir: &Path, stem: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = unique_model_path(dir, stem);
    export_obj(&model.mesh, &path)?;
    tracing::info!(path = %path.display(), faces = model.face_count, "model written");
    Ok(path)
}
