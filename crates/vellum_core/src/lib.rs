//! Vellum Core
//!
//! Ordering primitives for the Vellum desktop compositor:
//!
//! - **Geometry**: integer pixel [`Point`], [`Size`], [`Rect`] and 8-bit [`Color`]
//! - **Z-Paths**: hierarchical, lexicographically compared draw-order keys
//! - **Z-Order Counters**: per-parent local order allocation
//! - **Sprite Tree**: arena-backed drawable hierarchy with inherited position,
//!   visibility and alpha
//! - **Layer Ids**: process-wide unique layer identifiers
//!
//! # Example
//!
//! ```rust
//! use vellum_core::{SpriteTree, ZOrderCounter};
//!
//! let mut windows = ZOrderCounter::new();
//! let mut tree: SpriteTree<()> = SpriteTree::new();
//!
//! let back = tree.create_root(windows.get_next(()));
//! let front = tree.create_root(windows.get_next(()));
//! let cast = tree.create_child(back).unwrap();
//!
//! // Everything in the back window draws before the front window.
//! assert_eq!(tree.draw_order(), vec![back, cast, front]);
//! ```

pub mod error;
pub mod geometry;
pub mod id;
pub mod sprite;
pub mod zorder;
pub mod zpath;

pub use error::{CoreError, Result};
pub use geometry::{Color, Point, Rect, Size};
pub use id::{next_layer_id, LayerId, LayerIdGenerator};
pub use sprite::{SpriteId, SpriteState, SpriteTree};
pub use zorder::{SharedZOrderCounter, ZOrderCounter};
pub use zpath::ZPath;
