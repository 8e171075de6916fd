//! RGBA pixel buffers

use image::{Rgba, RgbaImage};
use vellum_core::{Color, Point, Rect, Size};

use crate::error::{ImageError, Result};

/// An owned RGBA8 bitmap with straight alpha
///
/// Every constructor rejects empty dimensions, so a `Bitmap` always has at
/// least one pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    pixels: RgbaImage,
}

impl Bitmap {
    /// A fully transparent `width x height` bitmap
    pub fn new_transparent(width: i32, height: i32) -> Result<Self> {
        let (w, h) = checked_dimensions(width, height)?;
        Ok(Self {
            pixels: RgbaImage::new(w, h),
        })
    }

    /// A bitmap filled with a single color
    pub fn filled(width: i32, height: i32, color: Color) -> Result<Self> {
        let (w, h) = checked_dimensions(width, height)?;
        Ok(Self {
            pixels: RgbaImage::from_pixel(w, h, Rgba(color.to_array())),
        })
    }

    /// Create a bitmap from raw RGBA pixels
    pub fn from_rgba(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ImageError::dimension(width, height));
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(ImageError::PixelLength {
                expected,
                actual: pixels.len(),
            });
        }
        let actual = pixels.len();
        RgbaImage::from_raw(width, height, pixels)
            .map(|pixels| Self { pixels })
            .ok_or(ImageError::PixelLength { expected, actual })
    }

    /// Wrap an existing `image` buffer
    pub fn from_image(pixels: RgbaImage) -> Result<Self> {
        if pixels.width() == 0 || pixels.height() == 0 {
            return Err(ImageError::dimension(pixels.width(), pixels.height()));
        }
        Ok(Self { pixels })
    }

    pub fn width(&self) -> i32 {
        to_i32(self.pixels.width())
    }

    pub fn height(&self) -> i32 {
        to_i32(self.pixels.height())
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// `(0, 0)` to `(width, height)`
    pub fn bounds(&self) -> Rect {
        self.size().to_rect()
    }

    /// Color at `(x, y)`, or `None` outside the bitmap
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.index(Point::new(x, y))
            .map(|(x, y)| Color::from_array(self.pixels.get_pixel(x, y).0))
    }

    /// Overwrite one pixel. Returns false (and does nothing) outside the bitmap.
    pub fn put_pixel(&mut self, x: i32, y: i32, color: Color) -> bool {
        match self.index(Point::new(x, y)) {
            Some((x, y)) => {
                self.pixels.put_pixel(x, y, Rgba(color.to_array()));
                true
            }
            None => false,
        }
    }

    /// Overwrite every pixel of `rect` (clipped to the bitmap) with `color`
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some(area) = rect.intersection(&self.bounds()) else {
            return;
        };
        let px = Rgba(color.to_array());
        for y in area.y()..area.bottom() {
            for x in area.x()..area.right() {
                self.pixels.put_pixel(x as u32, y as u32, px);
            }
        }
    }

    /// Reset every pixel to transparent
    pub fn clear(&mut self) {
        self.fill_rect(self.bounds(), Color::TRANSPARENT);
    }

    /// Whether every pixel has zero alpha
    pub fn is_fully_transparent(&self) -> bool {
        self.pixels.pixels().all(|p| p.0[3] == 0)
    }

    /// Borrow the underlying `image` buffer
    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub(crate) fn as_image_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    /// Take ownership of the underlying `image` buffer
    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    fn index(&self, p: Point) -> Option<(u32, u32)> {
        self.bounds()
            .contains(p)
            .then(|| (p.x as u32, p.y as u32))
    }
}

fn checked_dimensions(width: i32, height: i32) -> Result<(u32, u32)> {
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(ImageError::dimension(width, height)),
    }
}

fn to_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparent_bitmap() {
        let bitmap = Bitmap::new_transparent(4, 3).unwrap();
        assert_eq!(bitmap.size(), Size::new(4, 3));
        assert!(bitmap.is_fully_transparent());
        assert_eq!(bitmap.pixel(3, 2), Some(Color::TRANSPARENT));
        assert_eq!(bitmap.pixel(4, 0), None);
        assert_eq!(bitmap.pixel(-1, 0), None);
    }

    #[test]
    fn test_invalid_dimensions() {
        assert_eq!(
            Bitmap::new_transparent(0, 10),
            Err(ImageError::InvalidDimension {
                width: 0,
                height: 10
            })
        );
        assert!(Bitmap::new_transparent(10, -1).is_err());
        assert!(Bitmap::filled(-3, 3, Color::RED).is_err());
        assert!(Bitmap::from_image(RgbaImage::new(0, 0)).is_err());
    }

    #[test]
    fn test_from_rgba() {
        let pixels = vec![
            255, 0, 0, 255, //
            255, 0, 0, 255, //
            255, 0, 0, 255, //
            255, 0, 0, 255, //
        ];
        let bitmap = Bitmap::from_rgba(pixels, 2, 2).unwrap();
        assert_eq!(bitmap.pixel(1, 1), Some(Color::RED));
    }

    #[test]
    fn test_invalid_rgba_length() {
        let result = Bitmap::from_rgba(vec![255, 0, 0, 255], 2, 2);
        assert_eq!(
            result,
            Err(ImageError::PixelLength {
                expected: 16,
                actual: 4
            })
        );
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut bitmap = Bitmap::new_transparent(4, 4).unwrap();
        bitmap.fill_rect(Rect::new(2, 2, 10, 10), Color::BLUE);
        assert_eq!(bitmap.pixel(1, 1), Some(Color::TRANSPARENT));
        assert_eq!(bitmap.pixel(3, 3), Some(Color::BLUE));

        bitmap.clear();
        assert!(bitmap.is_fully_transparent());
    }
}
