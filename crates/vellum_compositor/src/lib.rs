//! Vellum Compositor
//!
//! Layer compositing for the emulated desktop:
//!
//! - [`Layer`]: background, drawing, cast, baked-picture and text layers with
//!   dirty tracking and lazily regenerated images
//! - [`LayerSet`]: the ordered layers of one window or picture, with a dirty
//!   region and incremental composition
//! - **Baking**: [`LayerSet::bake_region`] flattens region copies into the
//!   topmost picture layer, adding one only when something else is on top
//! - [`SurfaceRegistry`]: owner id to layer set map with per-set locks
//! - [`Desktop`]: windows as root sprites, rendered in Z-path order
//!
//! # Example
//!
//! ```rust
//! use vellum_compositor::{CompositorConfig, Desktop};
//! use vellum_core::{Color, Point, Rect};
//! use vellum_image::Bitmap;
//!
//! let mut desktop = Desktop::new(CompositorConfig::default()).unwrap();
//! desktop.open_window(1, Rect::new(10, 10, 320, 240), Some(Color::WHITE)).unwrap();
//!
//! let picture = Bitmap::filled(64, 64, Color::RED).unwrap();
//! desktop.bake(1, Point::new(5, 5), &picture, Rect::new(0, 0, 16, 16)).unwrap();
//!
//! let frame = desktop.render().unwrap();
//! assert_eq!(frame.pixel(15, 15), Some(Color::RED));
//! ```

mod bake;
pub mod config;
pub mod desktop;
pub mod error;
pub mod layer;
pub mod layer_set;
pub mod registry;


pub use config::CompositorConfig;
pub use desktop::{Desktop, SpriteContent};
pub use error::{CompositeError, Result};
pub use layer::{CastSource, CastState, Layer, LayerClass, LayerContent};
pub use layer_set::{LayerSet, SetKind, SurfaceOwner};
pub use registry::{read_set, write_set, SharedLayerSet, SurfaceRegistry};
