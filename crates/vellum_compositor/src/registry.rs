//! Surface registry
//!
//! Maps each window and picture to its [`LayerSet`]. Sets are created on first
//! reference and live until their owner goes away. Each set sits behind its own
//! lock so producers drawing into one surface never block another surface's
//! composite.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rustc_hash::FxHashMap;
use tracing::{debug, warn};
use vellum_core::{Color, LayerId, Point, Rect, SharedZOrderCounter, Size};
use vellum_image::{Bitmap, BitmapProvider, SoftwareBitmaps};

use crate::config::CompositorConfig;
use crate::error::{CompositeError, Result};
use crate::layer_set::{LayerSet, SurfaceOwner};

/// A layer set shared between the producer and the renderer
pub type SharedLayerSet = Arc<RwLock<LayerSet>>;

/// Lock a shared set for reading, recovering from a poisoned lock
pub fn read_set(set: &SharedLayerSet) -> RwLockReadGuard<'_, LayerSet> {
    set.read().unwrap_or_else(PoisonError::into_inner)
}

/// Lock a shared set for writing, recovering from a poisoned lock
pub fn write_set(set: &SharedLayerSet) -> RwLockWriteGuard<'_, LayerSet> {
    set.write().unwrap_or_else(PoisonError::into_inner)
}

/// Owner id to layer set map, plus the Z-order counter all sets share
#[derive(Debug)]
pub struct SurfaceRegistry {
    sets: RwLock<FxHashMap<SurfaceOwner, SharedLayerSet>>,
    counter: SharedZOrderCounter<SurfaceOwner>,
    provider: Arc<dyn BitmapProvider>,
    config: CompositorConfig,
}

impl Default for SurfaceRegistry {
    fn default() -> Self {
        Self::new(CompositorConfig::default())
    }
}

impl SurfaceRegistry {
    /// A registry drawing with the software bitmap provider
    pub fn new(config: CompositorConfig) -> Self {
        Self::with_provider(config, Arc::new(SoftwareBitmaps))
    }

    pub fn with_provider(config: CompositorConfig, provider: Arc<dyn BitmapProvider>) -> Self {
        Self {
            sets: RwLock::new(FxHashMap::default()),
            counter: SharedZOrderCounter::new(),
            provider,
            config,
        }
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn BitmapProvider> {
        &self.provider
    }

    /// The owner's layer set, created with the given size on first reference
    ///
    /// An existing set is returned as is; `width`, `height` and `background`
    /// only apply at creation. A missing background falls back to the
    /// configured default.
    pub fn get_or_create_layer_set(
        &self,
        owner: SurfaceOwner,
        width: i32,
        height: i32,
        background: Option<Color>,
    ) -> Result<SharedLayerSet> {
        if let Some(set) = self.get(owner) {
            return Ok(set);
        }

        let background = match background {
            Some(color) => color,
            None => self.config.background_color()?,
        };
        let size = Size::new(width, height);

        let mut sets = self.sets.write().unwrap_or_else(PoisonError::into_inner);
        // Another producer may have won the race for the write lock.
        if let Some(set) = sets.get(&owner) {
            return Ok(Arc::clone(set));
        }
        let set = LayerSet::new(
            owner,
            size,
            background,
            self.counter.clone(),
            Arc::clone(&self.provider),
        )
        .map_err(|err| {
            warn!(%owner, %size, "cannot create layer set: {err}");
            err
        })?
        .with_config(&self.config);

        debug!(%owner, %size, "created layer set");
        let set = Arc::new(RwLock::new(set));
        sets.insert(owner, Arc::clone(&set));
        Ok(set)
    }

    pub fn get(&self, owner: SurfaceOwner) -> Option<SharedLayerSet> {
        self.sets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&owner)
            .cloned()
    }

    pub fn contains(&self, owner: SurfaceOwner) -> bool {
        self.sets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&owner)
    }

    /// Current dimensions of the owner's surface
    pub fn size_of(&self, owner: SurfaceOwner) -> Option<Size> {
        self.get(owner).map(|set| read_set(&set).size())
    }

    /// Drop the owner's layer set
    ///
    /// Readers still holding the set or one of its frames keep them alive.
    pub fn remove(&self, owner: SurfaceOwner) -> Option<SharedLayerSet> {
        let removed = self
            .sets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&owner);
        if removed.is_some() {
            debug!(%owner, "removed layer set");
        }
        removed
    }

    /// Every registered owner, sorted
    pub fn owners(&self) -> Vec<SurfaceOwner> {
        let mut owners: Vec<_> = self
            .sets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        owners.sort();
        owners
    }

    pub fn len(&self) -> usize {
        self.sets.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bake a region copy into the owner's surface
    ///
    /// See [`LayerSet::bake_region`]. Fails with `SurfaceNotFound` when the
    /// owner has no layer set.
    pub fn bake_region_into(
        &self,
        owner: SurfaceOwner,
        dest_x: i32,
        dest_y: i32,
        src: &Bitmap,
        src_rect: Rect,
    ) -> Result<LayerId> {
        let Some(set) = self.get(owner) else {
            warn!(%owner, "bake into unknown surface skipped");
            return Err(CompositeError::SurfaceNotFound(owner));
        };
        let result = write_set(&set).bake_region(Point::new(dest_x, dest_y), src, src_rect);
        if let Err(err) = &result {
            warn!(%owner, %src_rect, "bake skipped: {err}");
        }
        result
    }

    /// Composite the owner's surface over its full bounds
    pub fn composite(&self, owner: SurfaceOwner) -> Result<Arc<Bitmap>> {
        let set = self
            .get(owner)
            .ok_or(CompositeError::SurfaceNotFound(owner))?;
        let mut set = write_set(&set);
        let bounds = set.bounds();
        set.composite(bounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_returns_same_set() {
        let registry = SurfaceRegistry::default();
        let owner = SurfaceOwner::Window(1);
        let a = registry.get_or_create_layer_set(owner, 320, 240, None).unwrap();
        let b = registry.get_or_create_layer_set(owner, 10, 10, Some(Color::RED)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.size_of(owner), Some(Size::new(320, 240)));
        assert_eq!(read_set(&a).background(), Color::BLACK);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_dimensions_create_nothing() {
        let registry = SurfaceRegistry::default();
        let owner = SurfaceOwner::Picture(7);
        let result = registry.get_or_create_layer_set(owner, -1, 10, None);
        assert!(matches!(
            result,
            Err(CompositeError::InvalidDimension { .. })
        ));
        assert!(!registry.contains(owner));
        assert_eq!(registry.size_of(owner), None);
    }

    #[test]
    fn test_remove() {
        let registry = SurfaceRegistry::default();
        let owner = SurfaceOwner::Picture(1);
        registry.get_or_create_layer_set(owner, 4, 4, None).unwrap();
        assert!(registry.remove(owner).is_some());
        assert!(registry.remove(owner).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_bake_into_unknown_surface() {
        let registry = SurfaceRegistry::default();
        let src = Bitmap::new_transparent(2, 2).unwrap();
        let owner = SurfaceOwner::Window(9);
        assert_eq!(
            registry.bake_region_into(owner, 0, 0, &src, Rect::new(0, 0, 2, 2)),
            Err(CompositeError::SurfaceNotFound(owner))
        );
    }

    #[test]
    fn test_sets_share_one_counter_per_owner() {
        let registry = SurfaceRegistry::default();
        let window = SurfaceOwner::Window(1);
        let picture = SurfaceOwner::Picture(1);
        let w = registry.get_or_create_layer_set(window, 4, 4, None).unwrap();
        let p = registry.get_or_create_layer_set(picture, 4, 4, None).unwrap();

        let text = Bitmap::new_transparent(1, 1).unwrap();
        let a = write_set(&w).add_text_layer(text.clone(), Point::ZERO);
        let b = write_set(&p).add_text_layer(text, Point::ZERO);

        // Independent sequences: both owners start just above the background slot.
        assert_eq!(read_set(&w).layer(a).unwrap().z_order(), Some(1));
        assert_eq!(read_set(&p).layer(b).unwrap().z_order(), Some(1));
    }

    #[test]
    fn test_owners_sorted() {
        let registry = SurfaceRegistry::default();
        registry.get_or_create_layer_set(SurfaceOwner::Picture(2), 1, 1, None).unwrap();
        registry.get_or_create_layer_set(SurfaceOwner::Window(5), 1, 1, None).unwrap();
        registry.get_or_create_layer_set(SurfaceOwner::Window(1), 1, 1, None).unwrap();
        assert_eq!(
            registry.owners(),
            vec![
                SurfaceOwner::Window(1),
                SurfaceOwner::Window(5),
                SurfaceOwner::Picture(2)
            ]
        );
    }
}
