//! Baking immediate-mode region copies into picture layers
//!
//! A region copy paints into the topmost layer when that layer is a baked
//! picture. Anything else on top (a cast, text, a drawing surface) means the
//! copy has to land above it, so a fresh surface-sized picture layer is
//! created first. Casts and text stay independent layers while arbitrary
//! pixel copies collapse into as few bitmaps as the stacking allows.

use tracing::{debug, trace};
use vellum_core::{LayerId, Point, Rect};
use vellum_image::Bitmap;

use crate::error::{CompositeError, Result};
use crate::layer::{Layer, LayerClass};
use crate::layer_set::LayerSet;

impl LayerSet {
    /// Copy `src_rect` of `src` onto the surface at `dest`
    ///
    /// Returns the picture layer that received the pixels. That layer is always
    /// left dirty and its bounds are recorded in the set's dirty region.
    pub fn bake_region(&mut self, dest: Point, src: &Bitmap, src_rect: Rect) -> Result<LayerId> {
        let target = self.bake_target()?;

        let provider = self.shared_provider();
        let part = provider.sub_image(src, src_rect);
        let layer = self
            .layer_mut(target)
            .ok_or(CompositeError::LayerNotFound(target))?;
        let origin = layer.position();
        if let Some(bitmap) = layer.bitmap_mut() {
            match &part {
                Some(part) => provider.blit(
                    bitmap,
                    part,
                    dest.x.saturating_sub(origin.x),
                    dest.y.saturating_sub(origin.y),
                    None,
                ),
                None => trace!(%src_rect, "source region is empty"),
            }
        }
        layer.set_dirty(true);
        let bounds = layer.bounds();
        self.add_dirty_region(bounds);
        Ok(target)
    }

    /// The topmost picture layer, or a new one when something else is on top
    fn bake_target(&mut self) -> Result<LayerId> {
        if let Some(topmost) = self.topmost_layer() {
            if topmost.class() == LayerClass::Picture {
                return Ok(topmost.id());
            }
        }
        let size = self.size();
        let bitmap = self.provider().new_transparent(size.width, size.height)?;
        let id = self.add_layer(Layer::picture(bitmap, Point::ZERO));
        debug!(owner = %self.owner(), layer = %id, %size, "created bake layer");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::layer::CastSource;
    use crate::layer_set::SurfaceOwner;
    use vellum_core::{Color, SharedZOrderCounter, Size};
    use vellum_image::SoftwareBitmaps;

    fn window_set() -> LayerSet {
        LayerSet::new(
            SurfaceOwner::Window(1),
            Size::new(32, 24),
            Color::BLACK,
            SharedZOrderCounter::new(),
            Arc::new(SoftwareBitmaps),
        )
        .unwrap()
    }

    fn source() -> Bitmap {
        Bitmap::filled(8, 8, Color::RED).unwrap()
    }

    #[test]
    fn test_bake_into_empty_set_adds_surface_sized_picture() {
        let mut set = window_set();
        set.clear_dirty();

        let id = set.bake_region(Point::new(2, 3), &source(), Rect::new(0, 0, 4, 4)).unwrap();
        assert_eq!(set.layer_count(), 1);

        let layer = set.layer(id).unwrap();
        assert_eq!(layer.class(), LayerClass::Picture);
        assert_eq!(layer.size(), Size::new(32, 24));
        assert!(layer.is_dirty());
        assert!(set.is_dirty());

        let image = layer.image().unwrap();
        assert_eq!(image.pixel(2, 3), Some(Color::RED));
        assert_eq!(image.pixel(6, 7), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_bake_reuses_topmost_picture() {
        let mut set = window_set();
        let first = set.bake_region(Point::ZERO, &source(), Rect::new(0, 0, 2, 2)).unwrap();
        set.clear_all_dirty_flags();

        let second = set.bake_region(Point::new(10, 10), &source(), Rect::new(0, 0, 2, 2)).unwrap();
        assert_eq!(first, second);
        assert_eq!(set.layer_count(), 1);
        assert!(set.layer(first).unwrap().is_dirty());

        let image = set.layer(first).unwrap().image().unwrap();
        assert_eq!(image.pixel(0, 0), Some(Color::RED));
        assert_eq!(image.pixel(10, 10), Some(Color::RED));
    }

    #[test]
    fn test_bake_above_cast_adds_new_picture() {
        let mut set = window_set();
        set.bake_region(Point::ZERO, &source(), Rect::new(0, 0, 2, 2)).unwrap();
        let cast = CastSource {
            image: Arc::new(source()),
            src_rect: Rect::new(0, 0, 4, 4),
            transparent: None,
        };
        set.add_cast_layer(cast, Point::new(5, 5)).unwrap();

        let id = set.bake_region(Point::ZERO, &source(), Rect::new(0, 0, 2, 2)).unwrap();
        assert_eq!(set.layer_count(), 3);
        assert_eq!(set.topmost_layer().unwrap().id(), id);
    }

    #[test]
    fn test_bake_above_text_adds_new_picture() {
        let mut set = window_set();
        set.add_text_layer(source(), Point::ZERO);
        let id = set.bake_region(Point::ZERO, &source(), Rect::new(0, 0, 2, 2)).unwrap();
        assert_eq!(set.layer_count(), 2);
        assert_eq!(set.topmost_layer().unwrap().id(), id);
    }

    #[test]
    fn test_bake_empty_source_region_still_dirties() {
        let mut set = window_set();
        set.clear_dirty();
        let id = set.bake_region(Point::ZERO, &source(), Rect::new(50, 50, 2, 2)).unwrap();
        assert!(set.layer(id).unwrap().is_dirty());
        assert!(set.layer(id).unwrap().image().unwrap().is_fully_transparent());
        assert_eq!(set.dirty_region(), Some(Rect::new(0, 0, 32, 24)));
    }

    #[test]
    fn test_bake_at_extreme_offsets_paints_nothing() {
        let mut set = window_set();
        let id = set.bake_region(Point::ZERO, &source(), Rect::new(0, 0, 1, 1)).unwrap();
        set.move_layer(id, Point::new(10, 10)).unwrap();

        let again = set
            .bake_region(Point::new(i32::MIN, i32::MAX), &source(), Rect::new(0, 0, 4, 4))
            .unwrap();
        assert_eq!(again, id);
        let image = set.layer(id).unwrap().image().unwrap();
        assert_eq!(image.pixel(0, 0), Some(Color::RED));
        assert_eq!(image.pixel(1, 1), Some(Color::TRANSPARENT));
    }
}
