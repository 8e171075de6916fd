//! Error types for vellum_image

use thiserror::Error;

/// Errors that can occur while creating or converting bitmaps
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// Width or height was zero or negative
    #[error("invalid bitmap dimensions {width}x{height}")]
    InvalidDimension { width: i64, height: i64 },

    /// Raw pixel buffer does not match the declared dimensions
    #[error("invalid pixel data length: expected {expected}, got {actual}")]
    PixelLength { expected: usize, actual: usize },
}

impl ImageError {
    pub(crate) fn dimension(width: impl Into<i64>, height: impl Into<i64>) -> Self {
        Self::InvalidDimension {
            width: width.into(),
            height: height.into(),
        }
    }
}

/// Result type for image operations
pub type Result<T> = std::result::Result<T, ImageError>;
