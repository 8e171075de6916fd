//! Error types for vellum_compositor

use thiserror::Error;
use vellum_core::{CoreError, LayerId};
use vellum_image::ImageError;

use crate::layer::LayerClass;
use crate::layer_set::SurfaceOwner;

/// Errors that can occur while managing or compositing surfaces
///
/// None of these are fatal: callers log them and skip the draw, keeping the
/// previous frame.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositeError {
    /// Width or height was zero or negative
    #[error("invalid surface dimensions {width}x{height}")]
    InvalidDimension { width: i64, height: i64 },

    #[error("{0} not found")]
    LayerNotFound(LayerId),

    #[error("no layer set for {0}")]
    SurfaceNotFound(SurfaceOwner),

    #[error("window {0} not found")]
    WindowNotFound(u32),

    #[error("window {0} is already open")]
    WindowExists(u32),

    /// Background and cast layers have no bitmap an external rasterizer can draw on
    #[error("{0} has no paintable bitmap")]
    NotPaintable(LayerId),

    /// Explicit Z-order outside the range reserved for the layer class
    #[error("z-order {z} is outside the {class} range")]
    ZOrderOutOfRange { class: LayerClass, z: i32 },

    #[error("sprite tree error: {0}")]
    Sprite(#[from] CoreError),

    #[error("image error: {0}")]
    Image(ImageError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CompositeError {
    pub(crate) fn dimension(width: i32, height: i32) -> Self {
        Self::InvalidDimension {
            width: width.into(),
            height: height.into(),
        }
    }
}

impl From<ImageError> for CompositeError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::InvalidDimension { width, height } => {
                Self::InvalidDimension { width, height }
            }
            other => Self::Image(other),
        }
    }
}

/// Result type for compositor operations
pub type Result<T> = std::result::Result<T, CompositeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_dimension_errors_map_to_invalid_dimension() {
        let err: CompositeError = ImageError::InvalidDimension {
            width: 0,
            height: 3,
        }
        .into();
        assert_eq!(
            err,
            CompositeError::InvalidDimension {
                width: 0,
                height: 3
            }
        );
    }

    #[test]
    fn test_error_messages() {
        let err = CompositeError::ZOrderOutOfRange {
            class: LayerClass::Cast,
            z: 5,
        };
        assert_eq!(err.to_string(), "z-order 5 is outside the cast range");
        assert_eq!(
            CompositeError::SurfaceNotFound(SurfaceOwner::Window(3)).to_string(),
            "no layer set for window 3"
        );
    }
}
