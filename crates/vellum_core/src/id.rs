//! Layer identifiers

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a layer
///
/// Ids are process-wide: two layers in different layer sets never share one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub u64);

impl LayerId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Generator for unique layer IDs
///
/// A standalone generator is handy in tests; production code goes through
/// [`next_layer_id`] so ids stay unique across every layer set.
#[derive(Debug)]
pub struct LayerIdGenerator {
    next: AtomicU64,
}

impl Default for LayerIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerIdGenerator {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next(&self) -> LayerId {
        LayerId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

static LAYER_IDS: LayerIdGenerator = LayerIdGenerator::new();

/// Allocate a fresh, process-wide layer id (monotonic, starts at 1)
pub fn next_layer_id() -> LayerId {
    LAYER_IDS.next()
}
