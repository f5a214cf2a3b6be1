// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion errors and their status classification

use thiserror::Error;

/// Result type for blueprint conversion
pub type Result<T> = std::result::Result<T, ConversionError>;

/// Which side of a request is at fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// The submitted blueprint cannot be converted (400-class)
    BadInput,
    /// Server-side assets or processing failed (500-class)
    Internal,
}

/// Errors that terminate a conversion
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Image could not be read: {0}")]
    ImageLoad(String),

    #[error("Template could not be read: {0}")]
    TemplateLoad(String),

    #[error("No wall features detected")]
    NoWallFeatures,

    #[error("No valid wall meshes could be created")]
    NoWallMeshes,

    #[error("Geometry error: {0}")]
    Geometry(#[from] blueprint3d_geometry::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ConversionError {
    pub fn status_class(&self) -> StatusClass {
        match self {
            ConversionError::ImageLoad(_)
            | ConversionError::NoWallFeatures
            | ConversionError::NoWallMeshes => StatusClass::BadInput,
            ConversionError::TemplateLoad(_)
            | ConversionError::Geometry(_)
            | ConversionError::Io(_)
            | ConversionError::Config(_) => StatusClass::Internal,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ConversionError::ImageLoad(_) => "IMAGE_LOAD",
            ConversionError::TemplateLoad(_) => "TEMPLATE_LOAD",
            ConversionError::NoWallFeatures => "NO_WALL_FEATURES",
            ConversionError::NoWallMeshes => "NO_WALL_MESHES",
            ConversionError::Geometry(_) => "GEOMETRY_ERROR",
            ConversionError::Io(_) => "IO_ERROR",
            ConversionError::Config(_) => "CONFIG_ERROR",
        }
    }
}
