//! Layers: the flat drawable units a [`LayerSet`](crate::LayerSet) composites
//!
//! A layer is one of a closed set of contents (background fill, transient
//! drawing surface, cast sprite, baked picture, text) plus the bookkeeping the
//! compositor needs: bounds, Z-order, visibility, an opaque hint and a dirty
//! flag.
//!
//! Every setter that changes observable state dirties the layer, and only when
//! the new value actually differs. Z-order changes are the exception: moving a
//! layer in the stack is recorded by its set, not by the layer.

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use vellum_core::{next_layer_id, Color, LayerId, Point, Rect, Size};
use vellum_image::{Bitmap, BitmapProvider};

use crate::error::{CompositeError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Layer Classes
// ─────────────────────────────────────────────────────────────────────────────

/// Layer variant, with its reserved Z-order range
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerClass {
    Background,
    /// Transient immediate-mode drawing surface
    Drawing,
    Cast,
    /// Baked picture, the target of region copies
    Picture,
    Text,
}

impl LayerClass {
    pub const ALL: [LayerClass; 5] = [
        LayerClass::Background,
        LayerClass::Drawing,
        LayerClass::Cast,
        LayerClass::Picture,
        LayerClass::Text,
    ];

    /// Z-orders an explicitly placed layer of this class may use
    pub const fn z_range(self) -> RangeInclusive<i32> {
        match self {
            LayerClass::Background => 0..=0,
            LayerClass::Drawing | LayerClass::Picture => 1..=1,
            LayerClass::Cast => 100..=999,
            LayerClass::Text => 1000..=i32::MAX,
        }
    }

    pub fn accepts(self, z_order: i32) -> bool {
        self.z_range().contains(&z_order)
    }

    pub const fn name(self) -> &'static str {
        match self {
            LayerClass::Background => "background",
            LayerClass::Drawing => "drawing",
            LayerClass::Cast => "cast",
            LayerClass::Picture => "picture",
            LayerClass::Text => "text",
        }
    }
}

impl fmt::Display for LayerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Layer Content
// ─────────────────────────────────────────────────────────────────────────────

/// A cast member's pixels, as referenced by a cast layer
///
/// The source bitmap is shared with the VM's cast library; the layer only
/// shows `src_rect` of it, with `transparent` keyed out.
#[derive(Clone, Debug)]
pub struct CastSource {
    pub image: Arc<Bitmap>,
    pub src_rect: Rect,
    pub transparent: Option<Color>,
}

/// Cast state as reported by the script VM
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CastState {
    pub position: Point,
    pub visible: bool,
    pub src_rect: Rect,
}

/// What a layer draws
#[derive(Clone, Debug)]
pub enum LayerContent {
    Background(Color),
    Drawing(Bitmap),
    Cast(CastSource),
    Picture(Bitmap),
    Text(Bitmap),
}

impl LayerContent {
    pub fn class(&self) -> LayerClass {
        match self {
            LayerContent::Background(_) => LayerClass::Background,
            LayerContent::Drawing(_) => LayerClass::Drawing,
            LayerContent::Cast(_) => LayerClass::Cast,
            LayerContent::Picture(_) => LayerClass::Picture,
            LayerContent::Text(_) => LayerClass::Text,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Layer
// ─────────────────────────────────────────────────────────────────────────────

/// A drawable unit owned by exactly one layer set
#[derive(Debug)]
pub struct Layer {
    id: LayerId,
    bounds: Rect,
    z_order: Option<i32>,
    visible: bool,
    dirty: bool,
    opaque: bool,
    content: LayerContent,
    /// Generated image for background and cast layers
    cache: Option<Bitmap>,
}

impl Layer {
    fn with_content(bounds: Rect, content: LayerContent) -> Self {
        Self {
            id: next_layer_id(),
            bounds,
            z_order: None,
            visible: true,
            dirty: true,
            opaque: false,
            content,
            cache: None,
        }
    }

    /// A solid fill covering `size`, pinned at Z-order 0
    pub fn background(size: Size, color: Color) -> Result<Self> {
        if !size.is_valid() {
            return Err(CompositeError::dimension(size.width, size.height));
        }
        let mut layer = Self::with_content(size.to_rect(), LayerContent::Background(color));
        layer.z_order = Some(0);
        layer.opaque = color.a == u8::MAX;
        Ok(layer)
    }

    /// A transparent drawing surface covering `size`
    pub fn drawing(provider: &dyn BitmapProvider, size: Size) -> Result<Self> {
        let bitmap = provider.new_transparent(size.width, size.height)?;
        Ok(Self::with_content(
            size.to_rect(),
            LayerContent::Drawing(bitmap),
        ))
    }

    /// A baked picture at `origin`
    pub fn picture(bitmap: Bitmap, origin: Point) -> Self {
        let bounds = bitmap.bounds().with_origin(origin);
        Self::with_content(bounds, LayerContent::Picture(bitmap))
    }

    /// Pre-rasterized text at `origin`
    pub fn text(bitmap: Bitmap, origin: Point) -> Self {
        let bounds = bitmap.bounds().with_origin(origin);
        Self::with_content(bounds, LayerContent::Text(bitmap))
    }

    /// A cast member shown at `position`
    ///
    /// `src_rect` is clipped to the source; nothing left is an invalid dimension.
    pub fn cast(source: CastSource, position: Point) -> Result<Self> {
        let src_rect = clip_source(&source.image, source.src_rect)?;
        let bounds = Rect::from_origin_size(position, src_rect.size);
        Ok(Self::with_content(
            bounds,
            LayerContent::Cast(CastSource { src_rect, ..source }),
        ))
    }

    /// Place the layer at an explicit Z-order, checked against its class range
    pub fn with_z_order(mut self, z_order: i32) -> Result<Self> {
        check_z_order(self.class(), z_order)?;
        self.z_order = Some(z_order);
        Ok(self)
    }

    pub fn with_opaque(mut self, opaque: bool) -> Self {
        self.opaque = opaque;
        self
    }

    // -- Accessors --

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn class(&self) -> LayerClass {
        self.content.class()
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn position(&self) -> Point {
        self.bounds.origin
    }

    pub fn size(&self) -> Size {
        self.bounds.size
    }

    /// `None` until the layer is added to a set
    pub fn z_order(&self) -> Option<i32> {
        self.z_order
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_opaque(&self) -> bool {
        self.opaque
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn content(&self) -> &LayerContent {
        &self.content
    }

    /// The layer's current image
    ///
    /// For background and cast layers this is the cached rendering, which may
    /// be missing or stale; check [`is_dirty`](Self::is_dirty) or call
    /// [`regenerate`](Self::regenerate) first.
    pub fn image(&self) -> Option<&Bitmap> {
        match &self.content {
            LayerContent::Drawing(bitmap)
            | LayerContent::Picture(bitmap)
            | LayerContent::Text(bitmap) => Some(bitmap),
            LayerContent::Background(_) | LayerContent::Cast(_) => self.cache.as_ref(),
        }
    }

    // -- Setters --

    /// Returns whether the position changed
    pub fn set_position(&mut self, position: Point) -> bool {
        if self.bounds.origin == position {
            return false;
        }
        self.bounds = self.bounds.with_origin(position);
        self.dirty = true;
        true
    }

    pub fn set_visible(&mut self, visible: bool) -> bool {
        if self.visible == visible {
            return false;
        }
        self.visible = visible;
        self.dirty = true;
        true
    }

    pub fn set_opaque(&mut self, opaque: bool) -> bool {
        if self.opaque == opaque {
            return false;
        }
        self.opaque = opaque;
        self.dirty = true;
        true
    }

    /// Move the layer in its set's stack
    ///
    /// Never dirties the layer itself; the owning set re-sorts and redraws.
    pub fn set_z_order(&mut self, z_order: i32) -> Result<bool> {
        check_z_order(self.class(), z_order)?;
        if self.z_order == Some(z_order) {
            return Ok(false);
        }
        self.z_order = Some(z_order);
        Ok(true)
    }

    pub(crate) fn assign_z_order(&mut self, z_order: i32) {
        self.z_order = Some(z_order);
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Change a cast layer's visible part of its source
    ///
    /// The rect is clipped to the source; the layer's size follows it. Other
    /// layer kinds ignore the call.
    pub fn set_src_rect(&mut self, src_rect: Rect) -> Result<bool> {
        let LayerContent::Cast(cast) = &mut self.content else {
            return Ok(false);
        };
        let src_rect = clip_source(&cast.image, src_rect)?;
        if cast.src_rect == src_rect {
            return Ok(false);
        }
        cast.src_rect = src_rect;
        self.bounds = Rect::from_origin_size(self.bounds.origin, src_rect.size);
        self.invalidate();
        Ok(true)
    }

    /// Change a cast layer's chroma key
    pub fn set_transparent(&mut self, transparent: Option<Color>) -> bool {
        let LayerContent::Cast(cast) = &mut self.content else {
            return false;
        };
        if cast.transparent == transparent {
            return false;
        }
        cast.transparent = transparent;
        self.invalidate();
        true
    }

    /// Change a background layer's fill
    pub fn set_color(&mut self, color: Color) -> bool {
        let LayerContent::Background(current) = &mut self.content else {
            return false;
        };
        if *current == color {
            return false;
        }
        *current = color;
        self.opaque = color.a == u8::MAX;
        self.invalidate();
        true
    }

    /// Apply the VM's view of a cast
    ///
    /// `None` is a no-op. Returns whether anything changed.
    pub fn sync_from(&mut self, state: Option<&CastState>) -> Result<bool> {
        let Some(state) = state else {
            return Ok(false);
        };
        let mut changed = self.set_src_rect(state.src_rect)?;
        changed |= self.set_position(state.position);
        changed |= self.set_visible(state.visible);
        Ok(changed)
    }

    /// Drop the cached image and mark the layer dirty
    pub fn invalidate(&mut self) {
        self.cache = None;
        self.dirty = true;
    }

    /// Mutable pixels for drawing, picture and text layers
    ///
    /// Marks the layer dirty. Background and cast layers have no paintable
    /// bitmap.
    pub fn bitmap_mut(&mut self) -> Option<&mut Bitmap> {
        match &mut self.content {
            LayerContent::Drawing(bitmap)
            | LayerContent::Picture(bitmap)
            | LayerContent::Text(bitmap) => {
                self.dirty = true;
                Some(bitmap)
            }
            LayerContent::Background(_) | LayerContent::Cast(_) => None,
        }
    }

    /// Rebuild the cached image if it is missing
    pub fn regenerate(&mut self, provider: &dyn BitmapProvider) -> Result<()> {
        if self.cache.is_some() {
            return Ok(());
        }
        match &self.content {
            LayerContent::Background(color) => {
                let mut image = provider.new_transparent(self.bounds.width(), self.bounds.height())?;
                image.fill_rect(image.bounds(), *color);
                self.cache = Some(image);
            }
            LayerContent::Cast(cast) => {
                let Some(part) = provider.sub_image(&cast.image, cast.src_rect) else {
                    return Err(CompositeError::dimension(
                        cast.src_rect.width(),
                        cast.src_rect.height(),
                    ));
                };
                let mut image = provider.new_transparent(part.width(), part.height())?;
                provider.blit(&mut image, &part, 0, 0, cast.transparent);
                self.cache = Some(image);
            }
            LayerContent::Drawing(_) | LayerContent::Picture(_) | LayerContent::Text(_) => {}
        }
        Ok(())
    }
}

fn check_z_order(class: LayerClass, z: i32) -> Result<()> {
    if class.accepts(z) {
        Ok(())
    } else {
        Err(CompositeError::ZOrderOutOfRange { class, z })
    }
}

fn clip_source(image: &Bitmap, src_rect: Rect) -> Result<Rect> {
    src_rect
        .intersection(&image.bounds())
        .ok_or_else(|| CompositeError::dimension(src_rect.width(), src_rect.height()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_image::SoftwareBitmaps;

    fn cast_layer() -> Layer {
        let mut image = Bitmap::filled(8, 8, Color::RED).unwrap();
        image.put_pixel(0, 0, Color::MAGENTA);
        let source = CastSource {
            image: Arc::new(image),
            src_rect: Rect::new(0, 0, 4, 4),
            transparent: Some(Color::MAGENTA),
        };
        Layer::cast(source, Point::new(10, 10)).unwrap()
    }

    #[test]
    fn test_class_ranges() {
        assert!(LayerClass::Background.accepts(0));
        assert!(!LayerClass::Background.accepts(1));
        assert!(LayerClass::Drawing.accepts(1));
        assert!(LayerClass::Picture.accepts(1));
        assert!(LayerClass::Cast.accepts(100));
        assert!(LayerClass::Cast.accepts(999));
        assert!(!LayerClass::Cast.accepts(1000));
        assert!(LayerClass::Text.accepts(1000));
        assert!(!LayerClass::Text.accepts(999));
    }

    #[test]
    fn test_explicit_z_order_is_validated() {
        let layer = Layer::text(Bitmap::new_transparent(2, 2).unwrap(), Point::ZERO);
        assert_eq!(
            layer.with_z_order(5).unwrap_err(),
            CompositeError::ZOrderOutOfRange {
                class: LayerClass::Text,
                z: 5
            }
        );

        let layer = cast_layer().with_z_order(150).unwrap();
        assert_eq!(layer.z_order(), Some(150));
    }

    #[test]
    fn test_setters_dirty_only_on_change() {
        let mut layer = cast_layer();
        layer.set_dirty(false);

        assert!(!layer.set_position(Point::new(10, 10)));
        assert!(!layer.set_visible(true));
        assert!(!layer.is_dirty());

        assert!(layer.set_position(Point::new(12, 10)));
        assert!(layer.is_dirty());
        layer.set_dirty(false);

        // Repeating the same value dirties at most once.
        assert!(layer.set_visible(false));
        layer.set_dirty(false);
        assert!(!layer.set_visible(false));
        assert!(!layer.is_dirty());
    }

    #[test]
    fn test_z_order_change_does_not_dirty() {
        let mut layer = cast_layer().with_z_order(100).unwrap();
        layer.set_dirty(false);
        assert!(layer.set_z_order(200).unwrap());
        assert!(!layer.is_dirty());
        assert!(!layer.set_z_order(200).unwrap());
    }

    #[test]
    fn test_cast_regenerates_keyed_image() {
        let mut layer = cast_layer();
        assert!(layer.image().is_none());

        layer.regenerate(&SoftwareBitmaps).unwrap();
        let image = layer.image().unwrap();
        assert_eq!(image.size(), Size::new(4, 4));
        assert_eq!(image.pixel(0, 0), Some(Color::TRANSPARENT));
        assert_eq!(image.pixel(1, 1), Some(Color::RED));
    }

    #[test]
    fn test_invalidate_drops_cache() {
        let mut layer = cast_layer();
        layer.regenerate(&SoftwareBitmaps).unwrap();
        layer.set_dirty(false);

        layer.invalidate();
        assert!(layer.is_dirty());
        assert!(layer.image().is_none());
    }

    #[test]
    fn test_src_rect_resizes_cast() {
        let mut layer = cast_layer();
        assert!(layer.set_src_rect(Rect::new(4, 4, 10, 10)).unwrap());
        assert_eq!(layer.size(), Size::new(4, 4));
        assert!(!layer.set_src_rect(Rect::new(4, 4, 4, 4)).unwrap());
        assert!(layer.set_src_rect(Rect::new(20, 20, 2, 2)).is_err());
    }

    #[test]
    fn test_sync_from_none_is_noop() {
        let mut layer = cast_layer();
        layer.set_dirty(false);
        assert!(!layer.sync_from(None).unwrap());
        assert!(!layer.is_dirty());

        let state = CastState {
            position: Point::new(0, 0),
            visible: false,
            src_rect: Rect::new(0, 0, 4, 4),
        };
        assert!(layer.sync_from(Some(&state)).unwrap());
        assert_eq!(layer.position(), Point::ZERO);
        assert!(!layer.is_visible());
    }

    #[test]
    fn test_background_layer() {
        assert!(Layer::background(Size::new(0, 5), Color::WHITE).is_err());

        let mut layer = Layer::background(Size::new(2, 2), Color::WHITE).unwrap();
        assert_eq!(layer.z_order(), Some(0));
        assert!(layer.is_opaque());
        assert!(layer.bitmap_mut().is_none());

        layer.regenerate(&SoftwareBitmaps).unwrap();
        assert_eq!(layer.image().unwrap().pixel(1, 1), Some(Color::WHITE));

        assert!(layer.set_color(Color::BLUE.with_alpha(128)));
        assert!(!layer.is_opaque());
        assert!(layer.image().is_none());
    }

    #[test]
    fn test_layer_ids_are_unique() {
        let a = Layer::picture(Bitmap::new_transparent(1, 1).unwrap(), Point::ZERO);
        let b = Layer::picture(Bitmap::new_transparent(1, 1).unwrap(), Point::ZERO);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.class(), LayerClass::Picture);
    }
}
