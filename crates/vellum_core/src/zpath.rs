//! Hierarchical draw-order keys
//!
//! A [`ZPath`] is the sequence of local orders from a root down to an element:
//! `[window_z, child_order, grandchild_order, ...]`. Comparing two paths
//! lexicographically yields a pre-order over the tree, so ancestors sort before
//! their descendants and earlier siblings sort before later ones. A path that is
//! a strict prefix of another sorts first.
//!
//! ```
//! use vellum_core::ZPath;
//!
//! let window = ZPath::root(3);
//! let first = ZPath::from_parent(&window, 0);
//! let second = ZPath::from_parent(&window, 1);
//!
//! assert!(window.less(&first));
//! assert!(first.less(&second));
//! assert!(window.is_prefix_of(&second));
//! ```

use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;

use crate::error::{CoreError, Result};

/// Immutable ordered sequence of local Z-orders
///
/// Depth is always at least one. Paths are cheap to clone for typical nesting
/// depths (windows, casts, and one or two levels below).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ZPath(SmallVec<[i32; 4]>);

impl ZPath {
    /// Build a path from explicit components
    ///
    /// Returns [`CoreError::EmptyZPath`] for an empty sequence.
    pub fn new(components: impl IntoIterator<Item = i32>) -> Result<Self> {
        let path: SmallVec<[i32; 4]> = components.into_iter().collect();
        if path.is_empty() {
            return Err(CoreError::EmptyZPath);
        }
        Ok(Self(path))
    }

    /// A depth-1 path, used for root sprites (the owning window's Z-order)
    pub fn root(z_order: i32) -> Self {
        let mut path = SmallVec::new();
        path.push(z_order);
        Self(path)
    }

    /// Extend `parent` with one local order
    pub fn from_parent(parent: &ZPath, local_z_order: i32) -> Self {
        let mut path = parent.0.clone();
        path.push(local_z_order);
        Self(path)
    }

    /// Lexicographic three-way comparison
    pub fn compare(&self, other: &ZPath) -> Ordering {
        self.0.as_slice().cmp(other.0.as_slice())
    }

    /// Strictly before `other` in draw order
    pub fn less(&self, other: &ZPath) -> bool {
        self.compare(other) == Ordering::Less
    }

    /// Whether every component of `self` matches the corresponding component
    /// of `other`. A path is a prefix of itself.
    pub fn is_prefix_of(&self, other: &ZPath) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Number of components
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The last component: the element's order among its siblings
    pub fn local_z_order(&self) -> i32 {
        // Depth is never zero, so `last` always exists.
        self.0.last().copied().unwrap_or_default()
    }

    /// The first component: the owning window's Z-order
    pub fn root_z_order(&self) -> i32 {
        self.0.first().copied().unwrap_or_default()
    }

    /// All components, root first
    pub fn path(&self) -> &[i32] {
        &self.0
    }

    /// The path one level up, or `None` for a root path
    pub fn parent(&self) -> Option<ZPath> {
        (self.0.len() > 1).then(|| Self(SmallVec::from_slice(&self.0[..self.0.len() - 1])))
    }

    /// Copy of this path with the first component replaced
    pub fn with_root(&self, z_order: i32) -> Self {
        let mut path = self.0.clone();
        path[0] = z_order;
        Self(path)
    }

    /// Copy of this path with the last component replaced
    pub fn with_local(&self, local_z_order: i32) -> Self {
        let mut path = self.0.clone();
        let last = path.len() - 1;
        path[last] = local_z_order;
        Self(path)
    }
}

impl PartialOrd for ZPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ZPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl fmt::Debug for ZPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ZPath{:?}", self.0.as_slice())
    }
}

impl fmt::Display for ZPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{component}")?;
            first = false;
        }
        Ok(())
    }
}
