//! The emulated desktop
//!
//! Windows are root sprites whose single-element Z-path is the window's
//! Z-order; sprites attached to a window inherit its position, visibility and
//! alpha. Each window draws its own [`LayerSet`]. Rendering walks the sprite
//! tree in Z-path order, so everything inside a window lands above the
//! windows behind it and below the windows in front.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};
use vellum_core::{Color, LayerId, Point, Rect, Size, SpriteId, SpriteTree, ZOrderCounter};
use vellum_image::{Bitmap, BitmapProvider};

use crate::config::CompositorConfig;
use crate::error::{CompositeError, Result};
use crate::layer_set::{LayerSet, SurfaceOwner};
use crate::registry::{read_set, write_set, SharedLayerSet, SurfaceRegistry};

/// What a sprite on the desktop draws
#[derive(Clone, Debug)]
pub enum SpriteContent {
    /// A window's or picture's composited layer set
    Surface(SurfaceOwner),
    /// A free-standing bitmap
    Image {
        image: Arc<Bitmap>,
        transparent: Option<Color>,
    },
}

/// Windows, their surfaces and the sprite tree that orders them
#[derive(Debug)]
pub struct Desktop {
    registry: SurfaceRegistry,
    sprites: SpriteTree<SpriteContent>,
    window_orders: ZOrderCounter<()>,
    windows: BTreeMap<u32, SpriteId>,
    screen: Size,
    background: Color,
    frame: Option<Arc<Bitmap>>,
}

impl Desktop {
    pub fn new(config: CompositorConfig) -> Result<Self> {
        config.validate()?;
        let background = config.background_color()?;
        let screen = config.screen_size();
        Ok(Self {
            registry: SurfaceRegistry::new(config),
            sprites: SpriteTree::new(),
            window_orders: ZOrderCounter::new(),
            windows: BTreeMap::new(),
            screen,
            background,
            frame: None,
        })
    }

    pub fn with_provider(config: CompositorConfig, provider: Arc<dyn BitmapProvider>) -> Result<Self> {
        let mut desktop = Self::new(config.clone())?;
        desktop.registry = SurfaceRegistry::with_provider(config, provider);
        Ok(desktop)
    }

    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    pub fn sprites(&self) -> &SpriteTree<SpriteContent> {
        &self.sprites
    }

    pub fn sprites_mut(&mut self) -> &mut SpriteTree<SpriteContent> {
        &mut self.sprites
    }

    pub fn screen_size(&self) -> Size {
        self.screen
    }

    // -- Windows --

    /// Open a window covering `rect`, in front of every open window
    pub fn open_window(&mut self, id: u32, rect: Rect, background: Option<Color>) -> Result<SpriteId> {
        if self.windows.contains_key(&id) {
            warn!(window = id, "window is already open");
            return Err(CompositeError::WindowExists(id));
        }
        let owner = SurfaceOwner::Window(id);
        self.registry
            .get_or_create_layer_set(owner, rect.width(), rect.height(), background)?;

        let z = self.window_orders.get_next(());
        let sprite = self.sprites.create_root(z);
        self.sprites.set_position(sprite, rect.origin)?;
        self.sprites.set_content(sprite, Some(SpriteContent::Surface(owner)))?;
        self.windows.insert(id, sprite);
        debug!(window = id, %rect, z, "opened window");
        Ok(sprite)
    }

    /// Close a window, destroying its sprites and its layer set
    pub fn close_window(&mut self, id: u32) -> Result<()> {
        let sprite = self.window_sprite(id)?;
        self.windows.remove(&id);
        let destroyed = self.sprites.destroy(sprite)?;
        self.registry.remove(SurfaceOwner::Window(id));
        debug!(window = id, sprites = destroyed, "closed window");
        Ok(())
    }

    pub fn is_open(&self, id: u32) -> bool {
        self.windows.contains_key(&id)
    }

    /// The root sprite of an open window
    pub fn window_sprite(&self, id: u32) -> Result<SpriteId> {
        self.windows.get(&id).copied().ok_or_else(|| {
            warn!(window = id, "unknown window");
            CompositeError::WindowNotFound(id)
        })
    }

    pub fn window_layer_set(&self, id: u32) -> Result<SharedLayerSet> {
        self.window_sprite(id)?;
        let owner = SurfaceOwner::Window(id);
        self.registry
            .get(owner)
            .ok_or(CompositeError::SurfaceNotFound(owner))
    }

    /// Run `f` against a window's layer set under its write lock
    pub fn with_window_set<R>(&self, id: u32, f: impl FnOnce(&mut LayerSet) -> R) -> Result<R> {
        let set = self.window_layer_set(id)?;
        let mut guard = write_set(&set);
        Ok(f(&mut *guard))
    }

    /// Bake a region copy into a window
    pub fn bake(&self, id: u32, dest: Point, src: &Bitmap, src_rect: Rect) -> Result<LayerId> {
        self.window_sprite(id)?;
        self.registry
            .bake_region_into(SurfaceOwner::Window(id), dest.x, dest.y, src, src_rect)
    }

    pub fn move_window(&mut self, id: u32, position: Point) -> Result<bool> {
        let sprite = self.window_sprite(id)?;
        Ok(self.sprites.set_position(sprite, position)?)
    }

    pub fn resize_window(&mut self, id: u32, width: i32, height: i32) -> Result<()> {
        self.with_window_set(id, |set| set.resize(width, height))?
    }

    pub fn set_window_visible(&mut self, id: u32, visible: bool) -> Result<bool> {
        let sprite = self.window_sprite(id)?;
        Ok(self.sprites.set_visible(sprite, visible)?)
    }

    pub fn window_z_order(&self, id: u32) -> Option<i32> {
        let sprite = self.windows.get(&id)?;
        self.sprites.z_path(*sprite).map(|path| path.root_z_order())
    }

    /// Open windows from back to front
    pub fn windows_in_order(&self) -> Vec<u32> {
        let mut windows: Vec<(i32, u32)> = self
            .windows
            .keys()
            .filter_map(|&id| Some((self.window_z_order(id)?, id)))
            .collect();
        windows.sort_unstable();
        windows.into_iter().map(|(_, id)| id).collect()
    }

    /// Raise a window above every other window
    ///
    /// Its sprites follow, since their Z-paths start with the window's order.
    pub fn bring_window_to_front(&mut self, id: u32) -> Result<()> {
        let sprite = self.window_sprite(id)?;
        let current = self.window_z_order(id).unwrap_or(i32::MIN);
        if self.other_window_orders(id).all(|z| z < current) {
            return Ok(());
        }
        let z = self.window_orders.get_next(());
        self.sprites.set_root_z_order(sprite, z)?;
        Ok(())
    }

    /// Lower a window below every other window
    pub fn send_window_to_back(&mut self, id: u32) -> Result<()> {
        let sprite = self.window_sprite(id)?;
        let current = self.window_z_order(id).unwrap_or(i32::MAX);
        let Some(lowest) = self.other_window_orders(id).min() else {
            return Ok(());
        };
        if current < lowest {
            return Ok(());
        }
        self.sprites.set_root_z_order(sprite, lowest.saturating_sub(1))?;
        Ok(())
    }

    fn other_window_orders(&self, id: u32) -> impl Iterator<Item = i32> + '_ {
        self.windows
            .keys()
            .filter(move |&&other| other != id)
            .filter_map(|&other| self.window_z_order(other))
    }

    // -- Sprites --

    /// Attach a bitmap sprite under `parent` (a window's root sprite or any
    /// sprite below it), drawn above its earlier siblings
    pub fn add_sprite(
        &mut self,
        parent: SpriteId,
        image: Arc<Bitmap>,
        transparent: Option<Color>,
        position: Point,
    ) -> Result<SpriteId> {
        let sprite = self.sprites.create_child(parent).map_err(|err| {
            warn!("cannot attach sprite: {err}");
            err
        })?;
        self.sprites.set_position(sprite, position)?;
        self.sprites
            .set_content(sprite, Some(SpriteContent::Image { image, transparent }))?;
        Ok(sprite)
    }

    /// Destroy a sprite and everything attached to it
    ///
    /// Removing a window's root sprite closes the window.
    pub fn remove_sprite(&mut self, sprite: SpriteId) -> Result<usize> {
        let window = self
            .windows
            .iter()
            .find_map(|(&id, &root)| (root == sprite).then_some(id));
        if let Some(window) = window {
            let count = self.sprites.destroy(sprite)?;
            self.windows.remove(&window);
            self.registry.remove(SurfaceOwner::Window(window));
            return Ok(count);
        }
        Ok(self.sprites.destroy(sprite)?)
    }

    // -- Rendering --

    /// The last rendered frame
    pub fn frame(&self) -> Option<Arc<Bitmap>> {
        self.frame.clone()
    }

    /// Compose the screen
    ///
    /// Dirty window surfaces are composited first; then every effectively
    /// visible sprite is drawn in Z-path order at its absolute position with
    /// its effective alpha. Nothing changed since the last render returns the
    /// previous frame.
    pub fn render(&mut self) -> Result<Arc<Bitmap>> {
        if let Some(frame) = &self.frame {
            if !self.sprites.is_dirty() && !self.any_drawn_surface_dirty() {
                return Ok(Arc::clone(frame));
            }
        }

        let provider = Arc::clone(self.registry.provider());
        let screen = self.screen.to_rect();
        let mut canvas = provider.new_transparent(self.screen.width, self.screen.height)?;
        canvas.fill_rect(screen, self.background);

        let mut drawn = 0usize;
        for sprite in self.sprites.draw_order() {
            let (Some(position), Some(alpha), Some(content)) = (
                self.sprites.absolute_position(sprite),
                self.sprites.effective_alpha(sprite),
                self.sprites.content(sprite),
            ) else {
                continue;
            };
            match content {
                SpriteContent::Surface(owner) => match self.registry.composite(*owner) {
                    Ok(surface) => {
                        provider.blend(&mut canvas, &surface, position, screen, alpha, None);
                        drawn += 1;
                    }
                    Err(err) => warn!(%owner, "skipping surface: {err}"),
                },
                SpriteContent::Image { image, transparent } => {
                    provider.blend(&mut canvas, image, position, screen, alpha, *transparent);
                    drawn += 1;
                }
            }
        }

        self.sprites.clear_dirty();
        trace!(drawn, "rendered desktop");
        let frame = Arc::new(canvas);
        self.frame = Some(Arc::clone(&frame));
        Ok(frame)
    }

    /// Whether a surface that `render` would draw has changed
    ///
    /// Hidden windows and surfaces no sprite shows are left out; showing one
    /// dirties the sprite tree.
    fn any_drawn_surface_dirty(&self) -> bool {
        self.sprites
            .draw_order()
            .into_iter()
            .filter_map(|sprite| match self.sprites.content(sprite) {
                Some(SpriteContent::Surface(owner)) => self.registry.get(*owner),
                _ => None,
            })
            .any(|set| read_set(&set).is_dirty())
    }
}
