//! Vellum Image
//!
//! RGBA bitmaps and the pixel operations the compositor consumes:
//!
//! - [`Bitmap`]: owned RGBA8 buffer (straight alpha) on top of `image::RgbaImage`
//! - [`ops`]: clipped blit with chroma key, sub-image, source-over blend
//! - [`BitmapProvider`]: the seam the compositor allocates and copies through,
//!   with [`SoftwareBitmaps`] as the CPU implementation
//!
//! # Example
//!
//! ```rust
//! use vellum_core::{Color, Rect};
//! use vellum_image::{BitmapProvider, SoftwareBitmaps};
//!
//! let bitmaps = SoftwareBitmaps;
//! let mut canvas = bitmaps.new_transparent(8, 8).unwrap();
//! let mut sprite = bitmaps.new_transparent(2, 2).unwrap();
//! sprite.fill_rect(Rect::new(0, 0, 2, 2), Color::RED);
//! sprite.put_pixel(0, 0, Color::MAGENTA);
//!
//! bitmaps.blit(&mut canvas, &sprite, 3, 3, Some(Color::MAGENTA));
//! assert_eq!(canvas.pixel(3, 3), Some(Color::TRANSPARENT));
//! assert_eq!(canvas.pixel(4, 4), Some(Color::RED));
//! ```

pub mod bitmap;
pub mod error;
pub mod ops;
pub mod provider;

pub use bitmap::Bitmap;
pub use error::{ImageError, Result};
pub use provider::{BitmapProvider, SoftwareBitmaps};
