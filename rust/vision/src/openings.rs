// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Door and window detection by template matching
//!
//! Matching uses the zero-mean normalized cross-correlation coefficient:
//! a score of 1.0 means the window is an affine brightness copy of the
//! template, 0.0 means no linear relation.

use crate::error::{ConversionError, Result};
use crate::types::{ImageSource, OpeningKind, OpeningPolygon};
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::{integral_image, integral_squared_image};
use imageproc::template_matching::{match_template, MatchTemplateMethod};
use serde::{Deserialize, Serialize};

/// Score map produced by [`match_template_ncc`]
pub type ScoreMap = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Variance floor below which a window or template counts as flat
const FLAT_VARIANCE_EPSILON: f64 = 1e-6;

/// Template matching parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpeningConfig {
    /// Minimum correlation score for a match
    pub threshold: f32,
    /// Collapse matches overlapping above this IoU into the best one
    ///
    /// `None` keeps every location that passes the threshold.
    pub nms_iou: Option<f64>,
}

impl Default for OpeningConfig {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            nms_iou: None,
        }
    }
}

/// Load a template as grayscale
pub fn load_template(source: &ImageSource) -> Result<GrayImage> {
    let image = source.decode().map_err(ConversionError::TemplateLoad)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(ConversionError::TemplateLoad(format!(
            "{}: template has zero size",
            source.describe()
        )));
    }
    Ok(image.to_luma8())
}

/// Correlation coefficient of `template` at every position where it fits
/// inside `image`
///
/// The map is `(W - w + 1) x (H - h + 1)`; it is empty when the template
/// is larger than the image in either dimension. Positions where the
/// window or the template has no variance score 0.
pub fn match_template_ncc(image: &GrayImage, template: &GrayImage) -> ScoreMap {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > iw || th > ih {
        return ScoreMap::new(0, 0);
    }

    let n = (tw as f64) * (th as f64);
    let (t_sum, t_sq_sum) = template.pixels().fold((0.0f64, 0.0f64), |(s, sq), p| {
        let v = p.0[0] as f64;
        (s + v, sq + v * v)
    });
    let t_mean = t_sum / n;
    let t_var = t_sq_sum - t_sum * t_mean;

    let (out_w, out_h) = (iw - tw + 1, ih - th + 1);
    let mut scores = ScoreMap::new(out_w, out_h);
    if t_var <= FLAT_VARIANCE_EPSILON {
        return scores;
    }

    // sum(T' * I) = sum(T * I) - mean(T) * sum(I) over each window
    let cross = match_template(image, template, MatchTemplateMethod::CrossCorrelation);
    let sums = integral_image::<_, u64>(image);
    let squares = integral_squared_image::<_, u64>(image);
    let window = |integral: &ImageBuffer<Luma<u64>, Vec<u64>>, x: u32, y: u32| {
        let at = |x: u32, y: u32| integral.get_pixel(x, y).0[0] as f64;
        at(x + tw, y + th) + at(x, y) - at(x, y + th) - at(x + tw, y)
    };

    for y in 0..out_h {
        for x in 0..out_w {
            let w_sum = window(&sums, x, y);
            let w_var = window(&squares, x, y) - w_sum * w_sum / n;
            if w_var <= FLAT_VARIANCE_EPSILON {
                continue;
            }
            let numerator = cross.get_pixel(x, y).0[0] as f64 - t_mean * w_sum;
            let score = (numerator / (t_var * w_var).sqrt()).clamp(-1.0, 1.0);
            scores.put_pixel(x, y, Luma([score as f32]));
        }
    }

    scores
}

/// Every template-sized rectangle whose score reaches `threshold`
///
/// Overlapping matches of the same feature are all reported.
pub fn detect_openings(
    gray: &GrayImage,
    template: &GrayImage,
    kind: OpeningKind,
    threshold: f32,
) -> Vec<OpeningPolygon> {
    let scores = match_template_ncc(gray, template);
    let (tw, th) = template.dimensions();

    let openings: Vec<OpeningPolygon> = scores
        .enumerate_pixels()
        .filter(|(_, _, score)| score.0[0] >= threshold)
        .map(|(x, y, score)| OpeningPolygon::at(kind, x, y, tw, th, score.0[0]))
        .collect();

    tracing::debug!(%kind, matches = openings.len(), threshold, "template matching done");
    openings
}

/// Greedy non-maximum suppression
///
/// Keeps the best-scoring opening of every cluster whose pairwise IoU
/// exceeds `max_iou`.
pub fn suppress_overlapping(mut openings: Vec<OpeningPolygon>, max_iou: f64) -> Vec<OpeningPolygon> {
    openings.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<OpeningPolygon> = Vec::with_capacity(openings.len());
    for candidate in openings {
        if kept
            .iter()
            .all(|k| rectangle_iou(&k.polygon, &candidate.polygon) <= max_iou)
        {
            kept.push(candidate);
        }
    }
    kept
}

/// Run detection for one template kind with the configured threshold and
/// optional suppression
pub fn detect_with_config(
    gray: &GrayImage,
    template: &GrayImage,
    kind: OpeningKind,
    config: &OpeningConfig,
) -> Vec<OpeningPolygon> {
    let openings = detect_openings(gray, template, kind, config.threshold);
    match config.nms_iou {
        Some(iou) => suppress_overlapping(openings, iou),
        None => openings,
    }
}

/// Intersection over union of the bounding boxes of two polygons
fn rectangle_iou(a: &blueprint3d_geometry::Polygon2D, b: &blueprint3d_geometry::Polygon2D) -> f64 {
    let (Some((a_min, a_max)), Some((b_min, b_max))) = (a.bounds(), b.bounds()) else {
        return 0.0;
    };

    let ix = (a_max.x.min(b_max.x) - a_min.x.max(b_min.x)).max(0.0);
    let iy = (a_max.y.min(b_max.y) - a_min.y.max(b_min.y)).max(0.0);
    let intersection = ix * iy;
    let area_a = (a_max.x - a_min.x) * (a_max.y - a_min.y);
    let area_b = (b_max.x - b_min.x) * (b_max.y - b_min.y);
    let union = area_a + area_b - intersection;
    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Deterministic noise so random windows do not correlate with each other
    fn noise(width: u32, height: u32, seed: u32) -> GrayImage {
        let mut state = seed;
        GrayImage::from_fn(width, height, |_, _| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            Luma([(state >> 24) as u8])
        })
    }

    fn crop(image: &GrayImage, x: u32, y: u32, w: u32, h: u32) -> GrayImage {
        image::imageops::crop_imm(image, x, y, w, h).to_image()
    }

    fn best(scores: &ScoreMap) -> (u32, u32, f32) {
        scores
            .enumerate_pixels()
            .map(|(x, y, p)| (x, y, p.0[0]))
            .fold((0, 0, f32::MIN), |acc, c| if c.2 > acc.2 { c } else { acc })
    }

    #[test]
    fn test_planted_pattern_found_at_offset() {
        let image = noise(60, 50, 7);
        let template = crop(&image, 23, 31, 10, 8);

        let scores = match_template_ncc(&image, &template);
        assert_eq!(scores.dimensions(), (51, 43));

        let (x, y, score) = best(&scores);
        assert_eq!((x, y), (23, 31));
        assert_relative_eq!(score, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_brightness_shift_still_matches() {
        let image = noise(40, 40, 3);
        let mut template = crop(&image, 5, 12, 9, 9);
        for p in template.pixels_mut() {
            p.0[0] = p.0[0] / 2 + 20;
        }

        let (x, y, score) = best(&match_template_ncc(&image, &template));
        assert_eq!((x, y), (5, 12));
        assert!(score > 0.99);
    }

    #[test]
    fn test_oversized_template_has_no_matches() {
        let image = noise(20, 20, 1);
        let template = noise(21, 5, 2);
        assert_eq!(match_template_ncc(&image, &template).dimensions(), (0, 0));
        assert!(detect_openings(&image, &template, OpeningKind::Door, 0.0).is_empty());
    }

    #[test]
    fn test_flat_template_scores_zero() {
        let image = noise(30, 30, 5);
        let template = GrayImage::from_pixel(6, 6, Luma([128]));
        let scores = match_template_ncc(&image, &template);
        assert!(scores.pixels().all(|p| p.0[0] == 0.0));
        assert!(detect_openings(&image, &template, OpeningKind::Window, 0.7).is_empty());
    }

    #[test]
    fn test_flat_window_scores_zero() {
        let mut image = GrayImage::from_pixel(30, 30, Luma([255]));
        let template = noise(5, 5, 9);
        for (x, y, p) in template.enumerate_pixels() {
            image.put_pixel(20 + x, 20 + y, *p);
        }

        let scores = match_template_ncc(&image, &template);
        assert_eq!(scores.get_pixel(0, 0).0[0], 0.0);
        assert_relative_eq!(scores.get_pixel(20, 20).0[0], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_detect_reports_template_sized_rectangles() {
        let image = noise(50, 50, 11);
        let template = crop(&image, 30, 4, 12, 7);

        let doors = detect_openings(&image, &template, OpeningKind::Door, 0.95);
        assert_eq!(doors.len(), 1);
        let door = &doors[0];
        assert_eq!(door.kind, OpeningKind::Door);
        let (min, max) = door.polygon.bounds().unwrap();
        assert_eq!((min.x, min.y, max.x, max.y), (30.0, 4.0, 42.0, 11.0));
    }

    #[test]
    fn test_threshold_admits_more_matches_when_lowered() {
        let image = noise(40, 40, 13);
        let template = crop(&image, 10, 10, 8, 8);

        let strict = detect_openings(&image, &template, OpeningKind::Door, 0.95);
        let loose = detect_openings(&image, &template, OpeningKind::Door, -1.0);
        assert_eq!(strict.len(), 1);
        assert_eq!(loose.len(), 33 * 33);
    }

    #[test]
    fn test_suppression_keeps_best_of_cluster() {
        let openings = vec![
            OpeningPolygon::at(OpeningKind::Door, 10, 10, 10, 10, 0.8),
            OpeningPolygon::at(OpeningKind::Door, 11, 10, 10, 10, 0.95),
            OpeningPolygon::at(OpeningKind::Door, 12, 11, 10, 10, 0.75),
            OpeningPolygon::at(OpeningKind::Door, 50, 50, 10, 10, 0.7),
        ];

        let kept = suppress_overlapping(openings, 0.3);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.95);
        assert_eq!(kept[1].score, 0.7);
    }

    #[test]
    fn test_config_toggles_suppression() {
        let image = noise(40, 40, 17);
        let template = crop(&image, 10, 10, 8, 8);
        let mut config = OpeningConfig {
            threshold: 0.0,
            nms_iou: None,
        };
        let all = detect_with_config(&image, &template, OpeningKind::Window, &config);

        config.nms_iou = Some(0.1);
        let suppressed = detect_with_config(&image, &template, OpeningKind::Window, &config);
        assert!(suppressed.len() < all.len());
        assert_eq!(suppressed[0].polygon.bounds().unwrap().0.x, 10.0);
    }

    #[test]
    fn test_load_template_failure() {
        let err = load_template(&ImageSource::Bytes(vec![1, 2, 3])).unwrap_err();
        assert!(matches!(err, ConversionError::TemplateLoad(_)));
    }

    #[test]
    fn test_load_template_from_png_bytes() {
        let template = noise(7, 5, 21);
        let mut bytes = Vec::new();
        image::DynamicImage::ImageLuma8(template.clone())
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let loaded = load_template(&ImageSource::Bytes(bytes)).unwrap();
        assert_eq!(loaded, template);
    }
}
