//! Pixel transfer operations
//!
//! All operations clip against both bitmaps and never fail: an offset that
//! puts the source entirely outside the destination simply copies nothing.

use image::Rgba;
use vellum_core::{Color, Point, Rect};

use crate::bitmap::Bitmap;

/// Draw `src` onto `dst` with its top-left corner at `(x, y)`
///
/// Source pixels whose RGB matches `chroma_key` are skipped. Everything else is
/// composited source-over, so fully transparent source pixels leave the
/// destination untouched.
pub fn blit(dst: &mut Bitmap, src: &Bitmap, x: i32, y: i32, chroma_key: Option<Color>) {
    let clip = dst.bounds();
    blend(dst, src, Point::new(x, y), clip, 1.0, chroma_key);
}

/// Copy of the part of `src` covered by `rect`
///
/// The rect is clipped to the source first; `None` when nothing remains.
pub fn sub_image(src: &Bitmap, rect: Rect) -> Option<Bitmap> {
    let area = rect.intersection(&src.bounds())?;
    let view = image::imageops::crop_imm(
        src.as_image(),
        area.x() as u32,
        area.y() as u32,
        area.width() as u32,
        area.height() as u32,
    );
    Bitmap::from_image(view.to_image()).ok()
}

/// Composite `src` onto `dst` at `origin`, touching only pixels inside `clip`
///
/// `opacity` scales the source alpha and is clamped to `0.0..=1.0`.
pub fn blend(
    dst: &mut Bitmap,
    src: &Bitmap,
    origin: Point,
    clip: Rect,
    opacity: f32,
    chroma_key: Option<Color>,
) {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }
    let placed = src.bounds().with_origin(origin);
    let Some(area) = placed
        .intersection(&dst.bounds())
        .and_then(|r| r.intersection(&clip))
    else {
        return;
    };

    let scale = (opacity * 255.0).round() as u32;
    let source = src.as_image();
    let target = dst.as_image_mut();
    for y in area.y()..area.bottom() {
        for x in area.x()..area.right() {
            let s = source.get_pixel((x - origin.x) as u32, (y - origin.y) as u32).0;
            if let Some(key) = chroma_key {
                if key.same_rgb(&Color::from_array(s)) {
                    continue;
                }
            }
            let sa = (u32::from(s[3]) * scale + 127) / 255;
            if sa == 0 {
                continue;
            }
            let d = target.get_pixel_mut(x as u32, y as u32);
            d.0 = source_over(s, sa, d.0);
        }
    }
}

/// Make every pixel matching `key` (RGB only) fully transparent
pub fn apply_chroma_key(bitmap: &mut Bitmap, key: Color) {
    for px in bitmap.as_image_mut().pixels_mut() {
        if key.same_rgb(&Color::from_array(px.0)) {
            *px = Rgba([0, 0, 0, 0]);
        }
    }
}

/// Straight-alpha source-over of one pixel, with the source alpha already
/// scaled to `sa`
fn source_over(s: [u8; 4], sa: u32, d: [u8; 4]) -> [u8; 4] {
    if sa >= 255 {
        return [s[0], s[1], s[2], 255];
    }
    let da = u32::from(d[3]);
    let inv = 255 - sa;
    // Alpha scaled by 255 * 255.
    let out_a = sa * 255 + da * inv;
    if out_a == 0 {
        return [0, 0, 0, 0];
    }
    let channel = |sc: u8, dc: u8| -> u8 {
        let value = (u32::from(sc) * sa * 255 + u32::from(dc) * da * inv + out_a / 2) / out_a;
        value.min(255) as u8
    };
    [
        channel(s[0], d[0]),
        channel(s[1], d[1]),
        channel(s[2], d[2]),
        ((out_a + 127) / 255).min(255) as u8,
    ]
}
