//! Per-parent local order allocation
//!
//! [`ZOrderCounter`] is the single source of local Z-orders for both sprites
//! (keyed by parent sprite) and layers (keyed by owning surface). Because every
//! child of a parent draws its number from the same counter, insertion order and
//! not element type decides sibling draw order.

use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use rustc_hash::FxHashMap;
use tracing::warn;

/// Strictly increasing local orders, one independent sequence per parent
#[derive(Debug, Clone)]
pub struct ZOrderCounter<K: Eq + Hash> {
    next: FxHashMap<K, i32>,
}

impl<K: Eq + Hash> Default for ZOrderCounter<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> ZOrderCounter<K> {
    pub fn new() -> Self {
        Self {
            next: FxHashMap::default(),
        }
    }

    /// Return the next order for `parent`, then advance it
    ///
    /// A parent seen for the first time starts at 0. Once a sequence reaches
    /// `i32::MAX` it stays there and orders stop increasing; callers that can
    /// renumber (see [`SpriteTree`](crate::SpriteTree)) should.
    pub fn get_next(&mut self, parent: K) -> i32 {
        let slot = self.next.entry(parent).or_insert(0);
        let order = *slot;
        match slot.checked_add(1) {
            Some(next) => *slot = next,
            None => warn!("z-order sequence exhausted, orders no longer increase"),
        }
        order
    }

    /// Whether `parent`'s sequence has run out of orders
    pub fn is_exhausted(&self, parent: &K) -> bool {
        self.peek(parent) == i32::MAX
    }

    /// The value the next [`get_next`](Self::get_next) call would return
    pub fn peek(&self, parent: &K) -> i32 {
        self.next.get(parent).copied().unwrap_or(0)
    }

    /// Make sure future orders for `parent` sort after `order`
    ///
    /// Used when an element is moved to the front explicitly, so that elements
    /// created afterwards still land above it.
    pub fn advance_past(&mut self, parent: K, order: i32) {
        let slot = self.next.entry(parent).or_insert(0);
        if *slot <= order {
            if order == i32::MAX {
                warn!("z-order sequence exhausted, orders no longer increase");
            }
            *slot = order.saturating_add(1);
        }
    }

    /// Restart `parent`'s sequence at 0
    pub fn reset(&mut self, parent: &K) {
        self.next.remove(parent);
    }

    /// Drop every sequence
    pub fn reset_all(&mut self) {
        self.next.clear();
    }
}

/// A [`ZOrderCounter`] shared between several owners
///
/// Layer sets created by one registry share a counter so that a set recreated
/// for the same owner keeps issuing increasing orders until explicitly reset.
#[derive(Debug)]
pub struct SharedZOrderCounter<K: Eq + Hash> {
    inner: Arc<Mutex<ZOrderCounter<K>>>,
}

impl<K: Eq + Hash> Clone for SharedZOrderCounter<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: Eq + Hash> Default for SharedZOrderCounter<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> SharedZOrderCounter<K> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ZOrderCounter::new())),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut ZOrderCounter<K>) -> R) -> R {
        let mut counter = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut counter)
    }

    /// See [`ZOrderCounter::get_next`]
    pub fn get_next(&self, parent: K) -> i32 {
        self.with(|c| c.get_next(parent))
    }

    /// See [`ZOrderCounter::peek`]
    pub fn peek(&self, parent: &K) -> i32 {
        self.with(|c| c.peek(parent))
    }

    /// See [`ZOrderCounter::advance_past`]
    pub fn advance_past(&self, parent: K, order: i32) {
        self.with(|c| c.advance_past(parent, order));
    }

    /// See [`ZOrderCounter::reset`]
    pub fn reset(&self, parent: &K) {
        self.with(|c| c.reset(parent));
    }
}
