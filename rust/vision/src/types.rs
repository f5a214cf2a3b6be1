// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types shared across the conversion stages

use blueprint3d_geometry::Polygon2D;
use image::{DynamicImage, GrayImage, ImageReader, Luma};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Stored value of a foreground pixel
pub const FOREGROUND: u8 = 255;

/// Binary line mask with the dimensions of the source image
///
/// Line pixels are foreground. Only 0 and 255 are ever stored.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask(GrayImage);

impl BinaryMask {
    /// Empty (all background) mask
    pub fn new(width: u32, height: u32) -> Self {
        Self(GrayImage::new(width, height))
    }

    /// Wrap a grayscale image, treating any nonzero pixel as foreground
    pub fn from_image(mut image: GrayImage) -> Self {
        for pixel in image.pixels_mut() {
            if pixel.0[0] != 0 {
                pixel.0[0] = FOREGROUND;
            }
        }
        Self(image)
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// 1 for foreground, 0 for background
    pub fn get(&self, x: u32, y: u32) -> u8 {
        u8::from(self.is_foreground(x, y))
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y).0[0] != 0
    }

    pub fn set(&mut self, x: u32, y: u32, foreground: bool) {
        let value = if foreground { FOREGROUND } else { 0 };
        self.0.put_pixel(x, y, Luma([value]));
    }

    pub fn foreground_count(&self) -> usize {
        self.0.pixels().filter(|p| p.0[0] != 0).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.0
    }
}

/// Kind of opening a template represents
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OpeningKind {
    Door,
    Window,
}

impl std::fmt::Display for OpeningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpeningKind::Door => write!(f, "door"),
            OpeningKind::Window => write!(f, "window"),
        }
    }
}

/// Matched opening footprint in pixel coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct OpeningPolygon {
    pub kind: OpeningKind,
    /// Template-sized axis-aligned rectangle at the match location
    pub polygon: Polygon2D,
    /// Normalized cross-correlation score of the match
    pub score: f32,
}

impl OpeningPolygon {
    /// Rectangle with its top-left corner at `(x, y)`
    pub fn at(kind: OpeningKind, x: u32, y: u32, width: u32, height: u32, score: f32) -> Self {
        let (x, y) = (x as f64, y as f64);
        Self {
            kind,
            polygon: Polygon2D::rectangle(x, y, x + width as f64, y + height as f64),
            score,
        }
    }
}

/// Where an input image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// File path, if the image was given as one
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            ImageSource::Path(p) => Some(p),
            ImageSource::Bytes(_) => None,
        }
    }

    /// Decode the image, describing any failure as text
    pub fn decode(&self) -> std::result::Result<DynamicImage, String> {
        match self {
            ImageSource::Path(path) => ImageReader::open(path)
                .map_err(|e| format!("{}: {}", path.display(), e))?
                .with_guessed_format()
                .map_err(|e| format!("{}: {}", path.display(), e))?
                .decode()
                .map_err(|e| format!("{}: {}", path.display(), e)),
            ImageSource::Bytes(bytes) => {
                image::load_from_memory(bytes).map_err(|e| format!("<{} bytes>: {}", bytes.len(), e))
            }
        }
    }

    /// Short description for logs and error messages
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Path(p) => p.display().to_string(),
            ImageSource::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&std::path::Path> for ImageSource {
    fn from(path: &std::path::Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_normalizes_foreground() {
        let mut img = GrayImage::new(3, 1);
        img.put_pixel(0, 0, Luma([1]));
        img.put_pixel(2, 0, Luma([200]));

        let mask = BinaryMask::from_image(img);
        assert_eq!(mask.get(0, 0), 1);
        assert_eq!(mask.get(1, 0), 0);
        assert_eq!(mask.as_image().get_pixel(2, 0).0[0], FOREGROUND);
        assert_eq!(mask.foreground_count(), 2);
    }

    #[test]
    fn test_opening_rectangle() {
        let opening = OpeningPolygon::at(OpeningKind::Door, 10, 20, 8, 4, 0.9);
        let (min, max) = opening.polygon.bounds().unwrap();
        assert_eq!((min.x, min.y), (10.0, 20.0));
        assert_eq!((max.x, max.y), (18.0, 24.0));
        assert_eq!(opening.polygon.area(), 32.0);
    }

    #[test]
    fn test_undecodable_bytes() {
        let err = ImageSource::Bytes(b"not an image".to_vec()).decode().unwrap_err();
        assert!(err.starts_with("<12 bytes>"));
    }

    #[test]
    fn test_missing_file() {
        let source = ImageSource::Path(PathBuf::from("/nonexistent/blueprint.png"));
        assert!(source.decode().is_err());
    }

    #[test]
    fn test_image_source_describe() {
        assert_eq!(ImageSource::Bytes(vec![0; 4]).describe(), "<4 bytes>");
        assert!(ImageSource::from(PathBuf::from("plan.png")).path().is_some());
    }
}
