//! Bitmap provider seam
//!
//! The compositor never allocates or copies pixels directly; it asks a
//! [`BitmapProvider`]. [`SoftwareBitmaps`] is the CPU implementation backed by
//! the `image` crate. Hosts with their own pixel storage implement the trait.

use std::fmt::Debug;

use vellum_core::{Color, Point, Rect};

use crate::bitmap::Bitmap;
use crate::error::Result;
use crate::ops;

/// The pixel operations the compositor consumes
pub trait BitmapProvider: Debug + Send + Sync {
    /// Allocate a fully transparent bitmap
    fn new_transparent(&self, width: i32, height: i32) -> Result<Bitmap>;

    /// Draw `src` onto `dst` at `(x, y)`, skipping pixels matching `chroma_key`
    fn blit(&self, dst: &mut Bitmap, src: &Bitmap, x: i32, y: i32, chroma_key: Option<Color>);

    /// Copy out the part of `src` covered by `rect`
    fn sub_image(&self, src: &Bitmap, rect: Rect) -> Option<Bitmap>;

    /// Composite `src` onto `dst` at `origin` with `opacity`, writing only
    /// inside `clip`
    fn blend(
        &self,
        dst: &mut Bitmap,
        src: &Bitmap,
        origin: Point,
        clip: Rect,
        opacity: f32,
        chroma_key: Option<Color>,
    );
}

/// CPU bitmap provider
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwareBitmaps;

impl BitmapProvider for SoftwareBitmaps {
    fn new_transparent(&self, width: i32, height: i32) -> Result<Bitmap> {
        Bitmap::new_transparent(width, height)
    }

    fn blit(&self, dst: &mut Bitmap, src: &Bitmap, x: i32, y: i32, chroma_key: Option<Color>) {
        ops::blit(dst, src, x, y, chroma_key);
    }

    fn sub_image(&self, src: &Bitmap, rect: Rect) -> Option<Bitmap> {
        ops::sub_image(src, rect)
    }

    fn blend(
        &self,
        dst: &mut Bitmap,
        src: &Bitmap,
        origin: Point,
        clip: Rect,
        opacity: f32,
        chroma_key: Option<Color>,
    ) {
        ops::blend(dst, src, origin, clip, opacity, chroma_key);
    }
}
