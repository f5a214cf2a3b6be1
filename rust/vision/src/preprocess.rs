// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raster preprocessing: blueprint image to clean binary line mask

use crate::error::{ConversionError, Result};
use crate::types::{BinaryMask, FOREGROUND};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::integral_image::integral_image;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How the local threshold around each pixel is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMethod {
    /// Plain mean over the window, clipped at the image border
    #[default]
    Mean,
    /// Gaussian-weighted mean with replicated borders
    Gaussian,
}

/// Parameters for mask extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Adaptive threshold window size (odd, in pixels)
    pub block_size: u32,
    /// Constant subtracted from the local mean
    pub offset_c: f64,
    /// Local mean weighting
    pub method: ThresholdMethod,
    /// Structuring element radius for the opening (1 = 3x3 square)
    pub open_radius: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            block_size: 11,
            offset_c: 2.0,
            method: ThresholdMethod::Mean,
            open_radius: 1,
        }
    }
}

/// Convert a blueprint image into a binary mask with dark line work as
/// foreground
///
/// No closing step is applied: closing bridges doorway gaps and merges
/// separate rooms into one solid block.
pub fn preprocess(image: &DynamicImage, config: &PreprocessConfig) -> Result<BinaryMask> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ConversionError::ImageLoad(format!(
            "image has zero size ({}x{})",
            image.width(),
            image.height()
        )));
    }

    let gray = image.to_luma8();
    let binary = match config.method {
        ThresholdMethod::Mean => adaptive_threshold_inv(&gray, config.block_size, config.offset_c),
        ThresholdMethod::Gaussian => {
            gaussian_threshold_inv(&gray, config.block_size, config.offset_c)
        }
    };
    let cleaned = if config.open_radius > 0 {
        imageproc::morphology::open(&binary, Norm::LInf, config.open_radius)
    } else {
        binary
    };

    let mask = BinaryMask::from_image(cleaned);
    tracing::debug!(
        width = mask.width(),
        height = mask.height(),
        foreground = mask.foreground_count(),
        "preprocessed blueprint"
    );
    Ok(mask)
}

/// Inverted mean-adaptive threshold
///
/// A pixel becomes foreground iff it is at most `local_mean - c`, where the
/// mean is taken over a `block_size` square window clamped to the image.
pub fn adaptive_threshold_inv(gray: &GrayImage, block_size: u32, c: f64) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut result = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return result;
    }

    let radius = block_size.max(1) / 2;
    // integral(x, y) holds the sum of all pixels strictly above and left of (x, y)
    let integral = integral_image::<_, u64>(gray);
    let at = |x: u32, y: u32| integral.get_pixel(x, y).0[0];

    for y in 0..height {
        let top = y.saturating_sub(radius);
        let bottom = (y + radius).min(height - 1) + 1;
        for x in 0..width {
            let left = x.saturating_sub(radius);
            let right = (x + radius).min(width - 1) + 1;

            let sum = at(right, bottom) + at(left, top) - at(left, bottom) - at(right, top);
            let count = ((right - left) * (bottom - top)) as f64;
            let mean = sum as f64 / count;

            if gray.get_pixel(x, y).0[0] as f64 <= mean - c {
                result.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
    }

    result
}

/// Inverted Gaussian-adaptive threshold
///
/// Same rule as [`adaptive_threshold_inv`] with the local mean taken from a
/// Gaussian blur. Sigma follows the usual block size rule
/// `0.3 * ((block_size - 1) / 2 - 1) + 0.8`, about 2 for an 11 px block.
pub fn gaussian_threshold_inv(gray: &GrayImage, block_size: u32, c: f64) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut result = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return result;
    }

    let sigma = block_sigma(block_size);
    let blurred = imageproc::filter::gaussian_blur_f32(gray, sigma);
    for (x, y, pixel) in gray.enumerate_pixels() {
        let mean = blurred.get_pixel(x, y).0[0] as f64;
        if pixel.0[0] as f64 <= mean - c {
            result.put_pixel(x, y, Luma([FOREGROUND]));
        }
    }
    result
}

fn block_sigma(block_size: u32) -> f32 {
    let half = (block_size.max(3) as f32 - 1.0) * 0.5;
    (0.3 * (half - 1.0) + 0.8).max(0.8)
}

/// Path of the diagnostic mask written next to `source`
pub fn diagnostic_mask_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("blueprint");
    source.with_file_name(format!("{}_cleaned.png", stem))
}

/// Write the mask as `<stem>_cleaned.png` beside the source image
///
/// Failure is logged and otherwise ignored.
pub fn save_diagnostic_mask(mask: &BinaryMask, source: &Path) -> Option<PathBuf> {
    let path = diagnostic_mask_path(source);
    match mask.as_image().save(&path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "saved diagnostic mask");
            Some(path)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not save diagnostic mask");
            None
        }
    }
}
