//! Error types for vellum_core

use thiserror::Error;

use crate::sprite::SpriteId;

/// Errors raised by the Z-ordering and sprite tree primitives
///
/// None of these are fatal. Callers log them and skip the offending draw.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A Z-Path needs at least one component
    #[error("a z-path needs at least one component")]
    EmptyZPath,

    /// The sprite handle is stale or was never issued by this tree
    #[error("sprite {0:?} not found")]
    SpriteNotFound(SpriteId),

    /// Attaching would make a sprite its own ancestor
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    SpriteCycle { child: SpriteId, parent: SpriteId },

    /// The sprite already has a parent; detach it first
    #[error("sprite {0:?} is already attached")]
    SpriteAttached(SpriteId),

    /// The operation needs a parent and the sprite is a root
    #[error("sprite {0:?} has no parent")]
    SpriteDetached(SpriteId),
}

/// Result type for vellum_core operations
pub type Result<T> = std::result::Result<T, CoreError>;
