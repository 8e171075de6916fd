//! Per-surface layer collections
//!
//! A [`LayerSet`] owns every layer drawn on one window or picture, keeps them
//! sorted by Z-order and tracks what needs recomposition: a union dirty
//! rectangle plus a full-dirty flag. [`LayerSet::composite`] redraws only the
//! dirty part of the visible area and hands out the finished frame as a shared,
//! immutable bitmap.

use std::fmt;
use std::sync::Arc;

use tracing::{trace, warn};
use vellum_core::{Color, LayerId, Point, Rect, SharedZOrderCounter, Size};
use vellum_image::{Bitmap, BitmapProvider};

use crate::config::CompositorConfig;
use crate::error::{CompositeError, Result};
use crate::layer::{CastSource, Layer, LayerClass};

// ─────────────────────────────────────────────────────────────────────────────
// Surface Owners
// ─────────────────────────────────────────────────────────────────────────────

/// The window or picture a layer set draws
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SurfaceOwner {
    Window(u32),
    Picture(u32),
}

/// Kind of layer set, derived from its owner
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SetKind {
    Window,
    Picture,
}

impl SurfaceOwner {
    pub fn kind(self) -> SetKind {
        match self {
            SurfaceOwner::Window(_) => SetKind::Window,
            SurfaceOwner::Picture(_) => SetKind::Picture,
        }
    }
}

impl fmt::Display for SurfaceOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceOwner::Window(id) => write!(f, "window {id}"),
            SurfaceOwner::Picture(id) => write!(f, "picture {id}"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Layer Set
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered, dirty-tracked layers for one surface
pub struct LayerSet {
    owner: SurfaceOwner,
    size: Size,
    background: Color,
    /// Ascending Z-order; equal orders keep insertion order
    layers: Vec<Layer>,
    counter: SharedZOrderCounter<SurfaceOwner>,
    dirty: bool,
    full_dirty: bool,
    dirty_region: Rect,
    frame: Option<Arc<Bitmap>>,
    provider: Arc<dyn BitmapProvider>,
    incremental: bool,
    layer_warn_threshold: usize,
}

impl fmt::Debug for LayerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerSet")
            .field("owner", &self.owner)
            .field("size", &self.size)
            .field("background", &self.background)
            .field("layers", &self.layers.len())
            .field("dirty", &self.dirty)
            .field("full_dirty", &self.full_dirty)
            .field("dirty_region", &self.dirty_region)
            .finish()
    }
}

impl LayerSet {
    /// Create an empty set; the first composite draws the whole surface
    ///
    /// Counter-assigned Z-orders start above the background slot, so a
    /// background layer always sorts beneath everything else.
    pub fn new(
        owner: SurfaceOwner,
        size: Size,
        background: Color,
        counter: SharedZOrderCounter<SurfaceOwner>,
        provider: Arc<dyn BitmapProvider>,
    ) -> Result<Self> {
        if !size.is_valid() {
            return Err(CompositeError::dimension(size.width, size.height));
        }
        counter.advance_past(owner, *LayerClass::Background.z_range().end());
        Ok(Self {
            owner,
            size,
            background,
            layers: Vec::new(),
            counter,
            dirty: true,
            full_dirty: true,
            dirty_region: Rect::ZERO,
            frame: None,
            provider,
            incremental: true,
            layer_warn_threshold: usize::MAX,
        })
    }

    /// Apply compositing options
    pub fn with_config(mut self, config: &CompositorConfig) -> Self {
        self.incremental = config.incremental;
        self.layer_warn_threshold = config.layer_warn_threshold;
        self
    }

    pub fn owner(&self) -> SurfaceOwner {
        self.owner
    }

    pub fn kind(&self) -> SetKind {
        self.owner.kind()
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn bounds(&self) -> Rect {
        self.size.to_rect()
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn set_background(&mut self, color: Color) {
        if self.background != color {
            self.background = color;
            self.mark_full_dirty();
        }
    }

    pub(crate) fn provider(&self) -> &dyn BitmapProvider {
        &*self.provider
    }

    pub(crate) fn shared_provider(&self) -> Arc<dyn BitmapProvider> {
        Arc::clone(&self.provider)
    }

    // -- Layers --

    /// Add a layer, giving it the owner's next Z-order unless it already has one
    ///
    /// An explicit Z-order also pushes the counter past it, so layers added
    /// later still stack above.
    pub fn add_layer(&mut self, mut layer: Layer) -> LayerId {
        let z = match layer.z_order() {
            Some(z) => {
                self.counter.advance_past(self.owner, z);
                z
            }
            None => {
                let z = self.counter.get_next(self.owner);
                layer.assign_z_order(z);
                z
            }
        };
        let id = layer.id();
        let bounds = layer.bounds();
        let index = self
            .layers
            .partition_point(|l| l.z_order().unwrap_or(0) <= z);
        self.layers.insert(index, layer);
        self.dirty = true;
        self.add_dirty_region(bounds);

        if self.layers.len() > self.layer_warn_threshold {
            warn!(
                owner = %self.owner,
                layers = self.layers.len(),
                "layer set exceeds the configured layer count"
            );
        }
        id
    }

    /// Remove a layer, dirtying the set only if it existed
    pub fn remove_layer(&mut self, id: LayerId) -> Option<Layer> {
        let index = self.index_of(id)?;
        let layer = self.layers.remove(index);
        self.dirty = true;
        self.add_dirty_region(layer.bounds());
        Some(layer)
    }

    /// Remove every layer of `class`, returning how many went
    pub fn remove_layers_of_class(&mut self, class: LayerClass) -> usize {
        let before = self.layers.len();
        let mut region = Rect::ZERO;
        self.layers.retain(|layer| {
            if layer.class() == class {
                region = region.union(&layer.bounds());
                false
            } else {
                true
            }
        });
        let removed = before - self.layers.len();
        if removed > 0 {
            self.dirty = true;
            self.add_dirty_region(region);
        }
        removed
    }

    /// Remove every layer
    pub fn clear_layers(&mut self) -> usize {
        let removed = self.layers.len();
        self.layers.clear();
        if removed > 0 {
            self.mark_full_dirty();
        }
        removed
    }

    /// Layer with the greatest Z-order
    pub fn topmost_layer(&self) -> Option<&Layer> {
        self.layers.last()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// All layers in ascending Z-order
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub(crate) fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id() == id)
    }

    fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id() == id)
    }

    // -- Content helpers --

    /// Add a pre-rasterized text layer
    ///
    /// Text is never drawn into an existing layer: rewriting text in place
    /// would leave the old glyphs behind.
    pub fn add_text_layer(&mut self, bitmap: Bitmap, origin: Point) -> LayerId {
        self.add_layer(Layer::text(bitmap, origin))
    }

    pub fn add_cast_layer(&mut self, source: CastSource, position: Point) -> Result<LayerId> {
        let layer = Layer::cast(source, position)?;
        Ok(self.add_layer(layer))
    }

    /// The set's transient drawing layer, created on first use
    pub fn drawing_layer(&mut self) -> Result<LayerId> {
        if let Some(layer) = self
            .layers
            .iter()
            .find(|l| l.class() == LayerClass::Drawing)
        {
            return Ok(layer.id());
        }
        let layer = Layer::drawing(&*self.provider, self.size)?;
        Ok(self.add_layer(layer))
    }

    /// Let an external rasterizer draw on a layer's bitmap
    ///
    /// `rect` is the area `paint` touches, in layer coordinates.
    pub fn paint_layer<R>(
        &mut self,
        id: LayerId,
        rect: Rect,
        paint: impl FnOnce(&mut Bitmap) -> R,
    ) -> Result<R> {
        let layer = self.layer_mut(id).ok_or(CompositeError::LayerNotFound(id))?;
        let origin = layer.position();
        let bitmap = layer.bitmap_mut().ok_or(CompositeError::NotPaintable(id))?;
        let result = paint(bitmap);
        self.add_dirty_region(rect.offset(origin.x, origin.y));
        Ok(result)
    }

    // -- Layer mutation --

    /// Mutate one layer through its setters
    ///
    /// When `update` dirties the layer, its old and new bounds are recorded as
    /// dirty on the set; a layer that was already dirty and is left unchanged
    /// records nothing. A Z-order change re-sorts the set and redraws it all.
    pub fn update_layer<R>(&mut self, id: LayerId, update: impl FnOnce(&mut Layer) -> R) -> Result<R> {
        let layer = self.layer_mut(id).ok_or(CompositeError::LayerNotFound(id))?;
        let old_bounds = layer.bounds();
        let old_z = layer.z_order();
        let was_dirty = layer.is_dirty();
        layer.set_dirty(false);
        let result = update(layer);
        let dirty = layer.is_dirty();
        layer.set_dirty(was_dirty || dirty);
        let new_bounds = layer.bounds();
        let new_z = layer.z_order();

        if new_z != old_z {
            if let Some(z) = new_z {
                self.counter.advance_past(self.owner, z);
            }
            self.layers.sort_by_key(|l| l.z_order().unwrap_or(0));
            self.mark_full_dirty();
        }
        if dirty {
            self.add_dirty_region(old_bounds.union(&new_bounds));
        }
        Ok(result)
    }

    pub fn move_layer(&mut self, id: LayerId, position: Point) -> Result<bool> {
        self.update_layer(id, |layer| layer.set_position(position))
    }

    pub fn set_layer_visible(&mut self, id: LayerId, visible: bool) -> Result<bool> {
        self.update_layer(id, |layer| layer.set_visible(visible))
    }

    /// Restack a layer; the class range table applies
    pub fn set_layer_z_order(&mut self, id: LayerId, z_order: i32) -> Result<bool> {
        self.update_layer(id, |layer| layer.set_z_order(z_order))?
    }

    /// Change the surface size; the whole surface is redrawn
    pub fn resize(&mut self, width: i32, height: i32) -> Result<()> {
        let size = Size::new(width, height);
        if !size.is_valid() {
            return Err(CompositeError::dimension(width, height));
        }
        if size != self.size {
            self.size = size;
            self.frame = None;
            self.mark_full_dirty();
        }
        Ok(())
    }

    // -- Dirty tracking --

    /// Union `rect` (clipped to the surface) into the dirty region
    pub fn add_dirty_region(&mut self, rect: Rect) {
        if let Some(clipped) = rect.intersection(&self.bounds()) {
            self.dirty_region = self.dirty_region.union(&clipped);
        }
    }

    pub fn mark_full_dirty(&mut self) {
        self.full_dirty = true;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether anything needs recomposition
    ///
    /// Only the set's own state counts; layers' dirty flags are tracked
    /// separately.
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.full_dirty || !self.dirty_region.is_empty()
    }

    pub fn is_full_dirty(&self) -> bool {
        self.full_dirty
    }

    /// The area the next composite redraws, if any
    pub fn dirty_region(&self) -> Option<Rect> {
        if self.full_dirty {
            Some(self.bounds())
        } else if self.dirty_region.is_empty() {
            None
        } else {
            Some(self.dirty_region)
        }
    }

    /// Reset the set's dirty state, leaving every layer's own flag alone
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
        self.full_dirty = false;
        self.dirty_region = Rect::ZERO;
    }

    /// Reset the set's dirty state and every layer's flag
    pub fn clear_all_dirty_flags(&mut self) {
        self.clear_dirty();
        for layer in &mut self.layers {
            layer.set_dirty(false);
        }
    }

    // -- Composition --

    /// The last composited frame
    pub fn frame(&self) -> Option<Arc<Bitmap>> {
        self.frame.clone()
    }

    /// Redraw what changed inside `visible` and return the frame
    ///
    /// Layers are blended in ascending Z-order over the background, skipping
    /// hidden layers and layers outside the redraw area. Pixels outside the
    /// redraw area keep their previous contents. A clean set returns the
    /// previous frame untouched.
    ///
    /// Dirty area outside `visible` is not lost: it stays recorded on the set
    /// and is drawn by the next composite that covers it.
    pub fn composite(&mut self, visible: Rect) -> Result<Arc<Bitmap>> {
        let bounds = self.bounds();
        let previous = self.frame.take();

        let pending = if previous.is_none() || self.full_dirty {
            Some(bounds)
        } else if self.dirty_region.is_empty() {
            None
        } else {
            Some(self.dirty_region)
        };
        let visible = visible.intersection(&bounds);
        let region = if self.incremental {
            pending.and_then(|p| visible.and_then(|v| p.intersection(&v)))
        } else {
            visible
        };
        let remaining = pending.filter(|p| !region.is_some_and(|r| r.contains_rect(p)));

        let mut canvas = match (previous, region) {
            (Some(frame), None) => {
                self.frame = Some(Arc::clone(&frame));
                self.keep_dirty(remaining);
                return Ok(frame);
            }
            (Some(frame), Some(_)) => Arc::try_unwrap(frame).unwrap_or_else(|shared| (*shared).clone()),
            (None, _) => self.provider.new_transparent(self.size.width, self.size.height)?,
        };

        if let Some(region) = region {
            self.draw_region(&mut canvas, region);
        }

        self.keep_dirty(remaining);
        let frame = Arc::new(canvas);
        self.frame = Some(Arc::clone(&frame));
        Ok(frame)
    }

    /// Clear the set's dirty state except for `remaining`
    fn keep_dirty(&mut self, remaining: Option<Rect>) {
        self.clear_dirty();
        if let Some(rect) = remaining {
            self.dirty_region = rect;
        }
    }

    fn draw_region(&mut self, canvas: &mut Bitmap, region: Rect) {
        let provider = &*self.provider;

        // Nothing under a visible opaque layer covering the region shows.
        let start = self
            .layers
            .iter()
            .rposition(|l| l.is_visible() && l.is_opaque() && l.bounds().contains_rect(&region));
        if start.is_none() {
            canvas.fill_rect(region, self.background);
        }

        let mut drawn = 0usize;
        for layer in self.layers.iter_mut().skip(start.unwrap_or(0)) {
            if !layer.is_visible() || !layer.bounds().intersects(&region) {
                continue;
            }
            if let Err(err) = layer.regenerate(provider) {
                warn!(owner = %self.owner, layer = %layer.id(), "skipping layer: {err}");
                continue;
            }
            if let Some(image) = layer.image() {
                provider.blend(canvas, image, layer.position(), region, 1.0, None);
                drawn += 1;
            }
        }
        trace!(owner = %self.owner, %region, drawn, "composited");
    }
}
