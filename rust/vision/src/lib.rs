// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Blueprint recognition and 3D wall reconstruction
//!
//! This crate turns a raster blueprint into a solid wall model:
//! 1. Adaptive thresholding and a morphological opening produce a line mask
//! 2. Traced mask borders become wall polygons, repaired when invalid
//! 3. Door and window templates are located by normalized cross-correlation
//! 4. The drawn wall thickness calibrates pixels per meter
//! 5. Walls are extruded, openings subtracted and the result scaled to meters
//!
//! # Usage
//!
//! ```rust,ignore
//! use blueprint3d_vision::{convert, write_model, ConversionRequest};
//! use blueprint3d_geometry::CsgrsEngine;
//!
//! let request = ConversionRequest::new(
//!     PathBuf::from("plan.png"),
//!     PathBuf::from("templates/door.png"),
//!     PathBuf::from("templates/window.png"),
//! );
//! let output = convert(&request, &CsgrsEngine)?;
//! let path = write_model(&output.model, Path::new("models"), "plan")?;
//! ```

pub mod config;
pub mod contour;
pub mod error;
pub mod openings;
pub mod pipeline;
pub mod preprocess;
pub mod scale;
pub mod synthesis;
pub mod types;

pub use config::ConversionConfig;
pub use contour::{extract_wall_polygons, ContourConfig, HoleMode, WallExtraction};
pub use error::{ConversionError, Result, StatusClass};
pub use openings::{
    detect_openings, detect_with_config, load_template, match_template_ncc, suppress_overlapping,
    OpeningConfig,
};
pub use pipeline::{
    convert, load_image, output_stem, unique_model_path, write_model, ConversionOutput,
    ConversionRequest, WallSummary,
};
pub use preprocess::{preprocess, save_diagnostic_mask, PreprocessConfig, ThresholdMethod};
pub use scale::{RealWorldConstants, ScaleCalibration};
pub use synthesis::{build_model, SubtractionOutcome, SynthesisParams, SynthesizedModel};
pub use types::{BinaryMask, ImageSource, OpeningKind, OpeningPolygon};
