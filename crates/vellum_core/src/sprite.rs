//! Sprite hierarchy
//!
//! Sprites are the drawable nodes of the desktop: a window is a root sprite and
//! everything it shows hangs below it. The tree is an arena ([`SlotMap`]) with
//! generational [`SpriteId`] handles, so parent links are plain ids and a stale
//! handle is detected instead of dangling.
//!
//! Each sprite carries a [`ZPath`] derived from its parent's path plus a local
//! order drawn from the tree's [`ZOrderCounter`]. Sorting sprites by path gives
//! the draw order directly.
//!
//! # Inherited state
//!
//! - Absolute position is the sum of the local positions along the ancestor
//!   chain.
//! - A sprite is effectively visible only if it and every ancestor are visible.
//! - Effective alpha is the product of the alphas along the chain.
//!
//! # Example
//!
//! ```
//! use vellum_core::{Point, SpriteTree};
//!
//! let mut tree: SpriteTree<()> = SpriteTree::new();
//! let window = tree.create_root(0);
//! tree.set_position(window, Point::new(100, 50)).unwrap();
//!
//! let cast = tree.create_child(window).unwrap();
//! tree.set_position(cast, Point::new(10, 10)).unwrap();
//!
//! assert_eq!(tree.absolute_position(cast), Some(Point::new(110, 60)));
//! assert!(tree.z_path(window).unwrap().is_prefix_of(tree.z_path(cast).unwrap()));
//! ```

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use tracing::warn;

use crate::error::{CoreError, Result};
use crate::geometry::Point;
use crate::zorder::ZOrderCounter;
use crate::zpath::ZPath;

new_key_type! {
    /// Handle to a sprite in a [`SpriteTree`]
    pub struct SpriteId;
}

impl SpriteId {
    /// Convert to raw u64 for storage
    pub fn to_raw(&self) -> u64 {
        use slotmap::Key;
        self.data().as_ffi()
    }

    /// Reconstruct from raw u64
    pub fn from_raw(raw: u64) -> Self {
        slotmap::KeyData::from_ffi(raw).into()
    }
}

/// Model-side sprite state, as reported by the script VM
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteState {
    pub position: Point,
    pub visible: bool,
    pub alpha: f32,
}

/// Internal sprite node storage
#[derive(Debug)]
struct SpriteNode<T> {
    z_path: ZPath,
    position: Point,
    visible: bool,
    alpha: f32,
    /// Root sprites anchor a subtree into the draw order
    is_root: bool,
    parent: Option<SpriteId>,
    /// Kept sorted by local Z-order
    children: Vec<SpriteId>,
    content: Option<T>,
}

impl<T> SpriteNode<T> {
    fn new(z_path: ZPath, is_root: bool) -> Self {
        Self {
            z_path,
            position: Point::ZERO,
            visible: true,
            alpha: 1.0,
            is_root,
            parent: None,
            children: Vec::new(),
            content: None,
        }
    }
}

/// Arena-backed sprite hierarchy
///
/// `T` is the payload a sprite draws (a window surface, a cast bitmap, ...).
/// The tree never inspects it.
#[derive(Debug)]
pub struct SpriteTree<T> {
    nodes: SlotMap<SpriteId, SpriteNode<T>>,
    counter: ZOrderCounter<SpriteId>,
    dirty: bool,
}

impl<T> Default for SpriteTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SpriteTree<T> {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            counter: ZOrderCounter::new(),
            dirty: false,
        }
    }

    // -- Allocation --

    /// Create a root sprite whose path is the single component `z_order`
    pub fn create_root(&mut self, z_order: i32) -> SpriteId {
        self.dirty = true;
        self.nodes.insert(SpriteNode::new(ZPath::root(z_order), true))
    }

    /// Create a sprite and attach it as the last child of `parent`
    pub fn create_child(&mut self, parent: SpriteId) -> Result<SpriteId> {
        let parent_path = self.node(parent)?.z_path.clone();
        let order = self.next_order(parent)?;
        let id = self
            .nodes
            .insert(SpriteNode::new(ZPath::from_parent(&parent_path, order), false));
        self.link(parent, id);
        self.dirty = true;
        Ok(id)
    }

    /// Destroy a sprite and its entire subtree
    ///
    /// Returns the number of sprites removed.
    pub fn destroy(&mut self, id: SpriteId) -> Result<usize> {
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            self.unlink(parent, id);
        }

        let doomed = self.subtree(id);
        for sprite in &doomed {
            self.nodes.remove(*sprite);
            self.counter.reset(sprite);
        }
        self.dirty = true;
        Ok(doomed.len())
    }

    // -- Topology --

    /// Attach a detached sprite as the last child of `parent`
    ///
    /// The child gets a fresh local order from the counter and its subtree's
    /// paths are rebuilt underneath the new parent.
    pub fn attach(&mut self, child: SpriteId, parent: SpriteId) -> Result<()> {
        let child_node = self.node(child)?;
        if child_node.parent.is_some() || child_node.is_root {
            return Err(CoreError::SpriteAttached(child));
        }
        let parent_path = self.node(parent)?.z_path.clone();
        if child == parent || self.is_ancestor(child, parent) {
            return Err(CoreError::SpriteCycle { child, parent });
        }

        let order = self.next_order(parent)?;
        if let Some(node) = self.nodes.get_mut(child) {
            node.z_path = ZPath::from_parent(&parent_path, order);
        }
        self.link(parent, child);
        self.propagate_z_path(child)?;
        self.dirty = true;
        Ok(())
    }

    /// Remove a sprite from its parent's child list
    ///
    /// The sprite keeps its own children; the whole subtree simply stops being
    /// part of the draw order until it is attached again.
    pub fn detach(&mut self, child: SpriteId) -> Result<()> {
        let parent = self
            .node(child)?
            .parent
            .ok_or(CoreError::SpriteDetached(child))?;
        self.unlink(parent, child);
        self.dirty = true;
        Ok(())
    }

    /// Replace the first path component of a root sprite and its subtree
    ///
    /// Used when a window's Z-order changes.
    pub fn set_root_z_order(&mut self, root: SpriteId, z_order: i32) -> Result<()> {
        let node = self.node_mut(root)?;
        if node.parent.is_some() {
            return Err(CoreError::SpriteAttached(root));
        }
        if node.z_path.root_z_order() == z_order {
            return Ok(());
        }
        node.z_path = node.z_path.with_root(z_order);
        self.propagate_z_path(root)?;
        self.dirty = true;
        Ok(())
    }

    /// Rebuild every descendant's path from `id`'s current path
    ///
    /// Each descendant keeps its own local order; only the inherited prefix
    /// changes.
    pub fn propagate_z_path(&mut self, id: SpriteId) -> Result<()> {
        self.node(id)?;
        let mut stack: SmallVec<[SpriteId; 16]> = SmallVec::new();
        stack.push(id);
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            let parent_path = node.z_path.clone();
            let children = node.children.clone();
            for child in children {
                if let Some(child_node) = self.nodes.get_mut(child) {
                    let local = child_node.z_path.local_z_order();
                    child_node.z_path = ZPath::from_parent(&parent_path, local);
                    stack.push(child);
                }
            }
        }
        Ok(())
    }

    /// Move a sprite above all of its siblings
    ///
    /// Only the moved sprite's local order changes; the remaining siblings keep
    /// their relative order.
    pub fn bring_to_front(&mut self, id: SpriteId) -> Result<()> {
        let parent = self.node(id)?.parent.ok_or(CoreError::SpriteDetached(id))?;
        let current = self.local_order(id);
        let others_max = self
            .sibling_orders(parent, id)
            .max()
            .unwrap_or(i32::MIN);
        if current > others_max {
            return Ok(());
        }
        let order = match others_max.checked_add(1) {
            Some(order) => order,
            None => self.renumber_children(parent, Some(id), 0)?,
        };
        self.counter.advance_past(parent, order);
        self.restack(parent, id, order)
    }

    /// Move a sprite below all of its siblings
    pub fn send_to_back(&mut self, id: SpriteId) -> Result<()> {
        let parent = self.node(id)?.parent.ok_or(CoreError::SpriteDetached(id))?;
        let current = self.local_order(id);
        let others_min = self
            .sibling_orders(parent, id)
            .min()
            .unwrap_or(i32::MAX);
        if current < others_min {
            return Ok(());
        }
        let order = match others_min.checked_sub(1) {
            Some(order) => order,
            None => {
                self.renumber_children(parent, Some(id), 1)?;
                0
            }
        };
        self.restack(parent, id, order)
    }

    // -- Queries --

    pub fn contains(&self, id: SpriteId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn z_path(&self, id: SpriteId) -> Option<&ZPath> {
        self.nodes.get(id).map(|n| &n.z_path)
    }

    pub fn parent(&self, id: SpriteId) -> Option<SpriteId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    /// Direct children, in draw order
    pub fn children(&self, id: SpriteId) -> &[SpriteId] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_root(&self, id: SpriteId) -> bool {
        self.nodes.get(id).is_some_and(|n| n.is_root)
    }

    /// All root sprites, sorted by Z-order
    pub fn roots(&self) -> Vec<SpriteId> {
        let mut roots: Vec<SpriteId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.is_root)
            .map(|(id, _)| id)
            .collect();
        roots.sort_by(|a, b| self.nodes[*a].z_path.cmp(&self.nodes[*b].z_path));
        roots
    }

    pub fn position(&self, id: SpriteId) -> Option<Point> {
        self.nodes.get(id).map(|n| n.position)
    }

    pub fn is_visible(&self, id: SpriteId) -> Option<bool> {
        self.nodes.get(id).map(|n| n.visible)
    }

    pub fn alpha(&self, id: SpriteId) -> Option<f32> {
        self.nodes.get(id).map(|n| n.alpha)
    }

    pub fn content(&self, id: SpriteId) -> Option<&T> {
        self.nodes.get(id).and_then(|n| n.content.as_ref())
    }

    /// Sum of local positions from the root down to `id`
    pub fn absolute_position(&self, id: SpriteId) -> Option<Point> {
        self.fold_ancestors(id, Point::ZERO, |acc, n| acc.offset(n.position))
    }

    /// False if the sprite or any ancestor is hidden
    pub fn is_effectively_visible(&self, id: SpriteId) -> Option<bool> {
        self.fold_ancestors(id, true, |acc, n| acc && n.visible)
    }

    /// Product of alphas from the root down to `id`
    pub fn effective_alpha(&self, id: SpriteId) -> Option<f32> {
        self.fold_ancestors(id, 1.0, |acc, n| acc * n.alpha)
    }

    /// Whether the sprite hangs (transitively) under a root sprite
    pub fn is_anchored(&self, id: SpriteId) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            match self.nodes.get(cur) {
                Some(node) if node.is_root => return true,
                Some(node) => current = node.parent,
                None => return false,
            }
        }
        false
    }

    /// Every anchored sprite sorted by [`ZPath`]
    pub fn sorted_by_z_path(&self) -> Vec<SpriteId> {
        let mut ids: Vec<SpriteId> = self
            .nodes
            .keys()
            .filter(|id| self.is_anchored(*id))
            .collect();
        ids.sort_by(|a, b| self.nodes[*a].z_path.cmp(&self.nodes[*b].z_path));
        ids
    }

    /// Anchored, effectively visible sprites in the order they must be drawn
    pub fn draw_order(&self) -> Vec<SpriteId> {
        self.sorted_by_z_path()
            .into_iter()
            .filter(|id| self.is_effectively_visible(*id) == Some(true))
            .collect()
    }

    // -- Properties --

    /// Returns whether the position changed
    pub fn set_position(&mut self, id: SpriteId, position: Point) -> Result<bool> {
        let node = self.node_mut(id)?;
        if node.position == position {
            return Ok(false);
        }
        node.position = position;
        self.dirty = true;
        Ok(true)
    }

    /// Returns whether the flag changed
    pub fn set_visible(&mut self, id: SpriteId, visible: bool) -> Result<bool> {
        let node = self.node_mut(id)?;
        if node.visible == visible {
            return Ok(false);
        }
        node.visible = visible;
        self.dirty = true;
        Ok(true)
    }

    /// Set the local alpha, clamped to `0.0..=1.0`
    pub fn set_alpha(&mut self, id: SpriteId, alpha: f32) -> Result<bool> {
        let alpha = alpha.clamp(0.0, 1.0);
        let node = self.node_mut(id)?;
        if node.alpha == alpha {
            return Ok(false);
        }
        node.alpha = alpha;
        self.dirty = true;
        Ok(true)
    }

    /// Replace the sprite's payload, returning the previous one
    pub fn set_content(&mut self, id: SpriteId, content: Option<T>) -> Result<Option<T>> {
        let node = self.node_mut(id)?;
        let previous = std::mem::replace(&mut node.content, content);
        self.dirty = true;
        Ok(previous)
    }

    /// Apply model-side state to a sprite
    ///
    /// `None` is a no-op. Returns whether anything changed.
    pub fn sync_from(&mut self, id: SpriteId, state: Option<&SpriteState>) -> Result<bool> {
        let Some(state) = state else {
            return Ok(false);
        };
        let moved = self.set_position(id, state.position)?;
        let shown = self.set_visible(id, state.visible)?;
        let faded = self.set_alpha(id, state.alpha)?;
        Ok(moved || shown || faded)
    }

    // -- Dirty tracking --

    /// Whether anything observable changed since the last [`clear_dirty`](Self::clear_dirty)
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    // -- Internals --

    fn node(&self, id: SpriteId) -> Result<&SpriteNode<T>> {
        self.nodes.get(id).ok_or(CoreError::SpriteNotFound(id))
    }

    fn node_mut(&mut self, id: SpriteId) -> Result<&mut SpriteNode<T>> {
        self.nodes.get_mut(id).ok_or(CoreError::SpriteNotFound(id))
    }

    fn local_order(&self, id: SpriteId) -> i32 {
        self.nodes
            .get(id)
            .map_or(0, |n| n.z_path.local_z_order())
    }

    fn sibling_orders(&self, parent: SpriteId, id: SpriteId) -> impl Iterator<Item = i32> + '_ {
        self.children(parent)
            .iter()
            .filter(move |s| **s != id)
            .map(move |s| self.local_order(*s))
    }

    /// The next local order under `parent`, renumbering its children first
    /// when the counter has run out
    fn next_order(&mut self, parent: SpriteId) -> Result<i32> {
        if self.counter.is_exhausted(&parent) {
            self.renumber_children(parent, None, 0)?;
        }
        Ok(self.counter.get_next(parent))
    }

    /// Give `parent`'s children other than `skip` consecutive local orders from
    /// `start`, keeping their relative order, and restart the counter after them
    ///
    /// Returns the first order left unused.
    fn renumber_children(&mut self, parent: SpriteId, skip: Option<SpriteId>, start: i32) -> Result<i32> {
        warn!(?parent, "local z-orders exhausted, renumbering children");
        let children: Vec<SpriteId> = self
            .children(parent)
            .iter()
            .copied()
            .filter(|c| Some(*c) != skip)
            .collect();
        let mut order = start;
        for child in children {
            if let Some(node) = self.nodes.get_mut(child) {
                node.z_path = node.z_path.with_local(order);
            }
            self.propagate_z_path(child)?;
            order += 1;
        }
        self.counter.reset(&parent);
        self.counter.advance_past(parent, order - 1);
        self.dirty = true;
        Ok(order)
    }

    /// Give `id` a new local order and keep the parent's child list sorted
    fn restack(&mut self, parent: SpriteId, id: SpriteId, order: i32) -> Result<()> {
        if let Some(node) = self.nodes.get_mut(id) {
            node.z_path = node.z_path.with_local(order);
        }
        self.unlink(parent, id);
        self.link(parent, id);
        self.propagate_z_path(id)?;
        self.dirty = true;
        Ok(())
    }

    /// Insert `child` into `parent`'s list at the position its order dictates
    fn link(&mut self, parent: SpriteId, child: SpriteId) {
        let order = self.local_order(child);
        let at = self
            .children(parent)
            .partition_point(|s| self.local_order(*s) <= order);
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.insert(at, child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    fn unlink(&mut self, parent: SpriteId, child: SpriteId) {
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.retain(|c| *c != child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = None;
        }
    }

    /// Whether `ancestor` appears on `id`'s parent chain
    fn is_ancestor(&self, ancestor: SpriteId, id: SpriteId) -> bool {
        let mut current = self.parent(id);
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            current = self.parent(cur);
        }
        false
    }

    /// `id` and all its descendants, parents before children
    fn subtree(&self, id: SpriteId) -> Vec<SpriteId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().copied());
        }
        out
    }

    fn fold_ancestors<A>(
        &self,
        id: SpriteId,
        init: A,
        mut f: impl FnMut(A, &SpriteNode<T>) -> A,
    ) -> Option<A> {
        let mut node = self.nodes.get(id)?;
        let mut acc = f(init, node);
        while let Some(parent) = node.parent {
            node = self.nodes.get(parent)?;
            acc = f(acc, node);
        }
        Some(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> SpriteTree<&'static str> {
        SpriteTree::new()
    }

    #[test]
    fn test_siblings_get_increasing_paths() {
        let mut tree = tree();
        let root = tree.create_root(2);
        let kids: Vec<SpriteId> = (0..4).map(|_| tree.create_child(root).unwrap()).collect();

        for pair in kids.windows(2) {
            let a = tree.z_path(pair[0]).unwrap();
            let b = tree.z_path(pair[1]).unwrap();
            assert!(a.less(b));
            assert_ne!(a, b);
        }
        assert_eq!(tree.children(root), kids.as_slice());
    }

    #[test]
    fn test_parent_path_prefixes_child() {
        let mut tree = tree();
        let root = tree.create_root(0);
        let child = tree.create_child(root).unwrap();
        let grandchild = tree.create_child(child).unwrap();

        for (parent, kid) in [(root, child), (child, grandchild)] {
            let p = tree.z_path(parent).unwrap();
            let c = tree.z_path(kid).unwrap();
            assert!(p.is_prefix_of(c));
            assert!(p.less(c));
        }
        assert_eq!(tree.z_path(grandchild).unwrap().depth(), 3);
    }

    #[test]
    fn test_inherited_position_visibility_alpha() {
        let mut tree = tree();
        let root = tree.create_root(0);
        let child = tree.create_child(root).unwrap();
        let leaf = tree.create_child(child).unwrap();

        tree.set_position(root, Point::new(100, 100)).unwrap();
        tree.set_position(child, Point::new(10, 20)).unwrap();
        tree.set_position(leaf, Point::new(1, 2)).unwrap();
        assert_eq!(tree.absolute_position(leaf), Some(Point::new(111, 122)));

        tree.set_alpha(root, 0.5).unwrap();
        tree.set_alpha(leaf, 0.5).unwrap();
        assert_eq!(tree.effective_alpha(leaf), Some(0.25));

        assert_eq!(tree.is_effectively_visible(leaf), Some(true));
        tree.set_visible(child, false).unwrap();
        assert_eq!(tree.is_effectively_visible(leaf), Some(false));
        assert_eq!(tree.is_effectively_visible(root), Some(true));
        assert_eq!(tree.draw_order(), vec![root]);
    }

    #[test]
    fn test_root_z_order_cascades() {
        let mut tree = tree();
        let root = tree.create_root(1);
        let child = tree.create_child(root).unwrap();
        let leaf = tree.create_child(child).unwrap();

        tree.set_root_z_order(root, 9).unwrap();
        assert_eq!(tree.z_path(root).unwrap().path(), &[9]);
        assert_eq!(tree.z_path(child).unwrap().path(), &[9, 0]);
        assert_eq!(tree.z_path(leaf).unwrap().path(), &[9, 0, 0]);

        // Only roots own the first component.
        assert_eq!(
            tree.set_root_z_order(child, 3),
            Err(CoreError::SpriteAttached(child))
        );
    }

    #[test]
    fn test_attach_rejects_cycles() {
        let mut tree = tree();
        let root = tree.create_root(0);
        let a = tree.create_child(root).unwrap();
        let b = tree.create_child(a).unwrap();

        tree.detach(a).unwrap();
        assert_eq!(
            tree.attach(a, b),
            Err(CoreError::SpriteCycle {
                child: a,
                parent: b
            })
        );
        assert_eq!(
            tree.attach(a, a),
            Err(CoreError::SpriteCycle {
                child: a,
                parent: a
            })
        );
        assert_eq!(tree.attach(root, a), Err(CoreError::SpriteAttached(root)));
    }

    #[test]
    fn test_detach_keeps_grandchildren_and_reattach_rebuilds_paths() {
        let mut tree = tree();
        let left = tree.create_root(0);
        let right = tree.create_root(1);
        let a = tree.create_child(left).unwrap();
        let b = tree.create_child(a).unwrap();

        tree.detach(a).unwrap();
        assert!(tree.children(left).is_empty());
        assert_eq!(tree.children(a), &[b]);
        assert!(!tree.is_anchored(b));
        assert!(!tree.draw_order().contains(&b));

        tree.attach(a, right).unwrap();
        assert_eq!(tree.z_path(a).unwrap().path(), &[1, 0]);
        assert_eq!(tree.z_path(b).unwrap().path(), &[1, 0, 0]);
        assert_eq!(tree.draw_order(), vec![left, right, a, b]);
    }

    #[test]
    fn test_destroy_cascades() {
        let mut tree = tree();
        let root = tree.create_root(0);
        let a = tree.create_child(root).unwrap();
        let b = tree.create_child(a).unwrap();
        let c = tree.create_child(root).unwrap();

        assert_eq!(tree.destroy(a), Ok(2));
        assert!(!tree.contains(a));
        assert!(!tree.contains(b));
        assert_eq!(tree.children(root), &[c]);
        assert_eq!(tree.destroy(a), Err(CoreError::SpriteNotFound(a)));
    }

    #[test]
    fn test_bring_to_front_and_send_to_back() {
        let mut tree = tree();
        let root = tree.create_root(0);
        let a = tree.create_child(root).unwrap();
        let b = tree.create_child(root).unwrap();
        let c = tree.create_child(root).unwrap();
        let a_child = tree.create_child(a).unwrap();

        tree.bring_to_front(a).unwrap();
        assert_eq!(tree.children(root), &[b, c, a]);
        assert!(tree.z_path(c).unwrap().less(tree.z_path(a).unwrap()));
        // The moved sprite's subtree follows it.
        assert!(tree.z_path(a).unwrap().is_prefix_of(tree.z_path(a_child).unwrap()));

        // Later children still land on top.
        let d = tree.create_child(root).unwrap();
        assert!(tree.z_path(a).unwrap().less(tree.z_path(d).unwrap()));

        tree.send_to_back(c).unwrap();
        assert_eq!(tree.children(root), &[c, b, a, d]);
        let order = tree.draw_order();
        assert_eq!(order, vec![root, c, b, a, a_child, d]);
    }

    #[test]
    fn test_exhausted_orders_renumber_children() {
        let mut tree = tree();
        let root = tree.create_root(0);
        let a = tree.create_child(root).unwrap();
        let a_child = tree.create_child(a).unwrap();
        tree.counter.advance_past(root, i32::MAX - 2);
        let b = tree.create_child(root).unwrap();
        tree.bring_to_front(a).unwrap();
        assert_eq!(tree.z_path(a).unwrap().local_z_order(), i32::MAX);

        // The counter is spent; the next child renumbers its siblings first.
        let c = tree.create_child(root).unwrap();
        assert_eq!(tree.children(root), &[b, a, c]);
        let locals = [b, a, c].map(|s| tree.z_path(s).unwrap().local_z_order());
        assert_eq!(locals, [0, 1, 2]);
        assert!(tree.z_path(a).unwrap().is_prefix_of(tree.z_path(a_child).unwrap()));
        assert_eq!(tree.draw_order(), vec![root, b, a, a_child, c]);
    }

    #[test]
    fn test_restack_at_order_limits_renumbers() {
        let mut tree = tree();
        let root = tree.create_root(0);
        let a = tree.create_child(root).unwrap();
        let b = tree.create_child(root).unwrap();

        tree.restack(root, b, i32::MAX).unwrap();
        tree.bring_to_front(a).unwrap();
        assert_eq!(tree.children(root), &[b, a]);
        assert!(tree.z_path(b).unwrap().less(tree.z_path(a).unwrap()));
        assert!(tree.z_path(a).unwrap().local_z_order() < i32::MAX);

        tree.restack(root, b, i32::MIN).unwrap();
        tree.send_to_back(a).unwrap();
        assert_eq!(tree.children(root), &[a, b]);
        assert!(tree.z_path(a).unwrap().less(tree.z_path(b).unwrap()));
        assert!(tree.z_path(a).unwrap().local_z_order() > i32::MIN);
    }

    #[test]
    fn test_setters_report_changes_once() {
        let mut tree = tree();
        let root = tree.create_root(0);
        tree.clear_dirty();

        assert_eq!(tree.set_position(root, Point::new(3, 4)), Ok(true));
        assert!(tree.is_dirty());
        tree.clear_dirty();
        assert_eq!(tree.set_position(root, Point::new(3, 4)), Ok(false));
        assert!(!tree.is_dirty());
    }

    #[test]
    fn test_sync_from_none_is_noop() {
        let mut tree = tree();
        let root = tree.create_root(0);
        tree.clear_dirty();
        assert_eq!(tree.sync_from(root, None), Ok(false));
        assert!(!tree.is_dirty());

        let state = SpriteState {
            position: Point::new(5, 5),
            visible: false,
            alpha: 0.5,
        };
        assert_eq!(tree.sync_from(root, Some(&state)), Ok(true));
        assert_eq!(tree.position(root), Some(Point::new(5, 5)));
        assert_eq!(tree.is_visible(root), Some(false));
    }

    #[test]
    fn test_stale_handles_are_not_found() {
        let mut tree = tree();
        let root = tree.create_root(0);
        tree.destroy(root).unwrap();
        assert_eq!(tree.absolute_position(root), None);
        assert_eq!(
            tree.set_visible(root, false),
            Err(CoreError::SpriteNotFound(root))
        );
        assert_eq!(tree.create_child(root), Err(CoreError::SpriteNotFound(root)));
    }

    #[test]
    fn test_raw_id_roundtrip() {
        let mut tree = tree();
        let root = tree.create_root(0);
        assert_eq!(SpriteId::from_raw(root.to_raw()), root);
    }
}
