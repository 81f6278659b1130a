//! Filepath: src/tree.rs
//!
//! `AvlTree` - an AVL-balanced ordered map threaded with a doubly linked
//! list.
//!
//! This module provides the tree facade: construction with the two client
//! collaborators (key extractor, key order), point lookup, insert-or-replace,
//! key-based deletion, bounds access, the path finder with its one-slot
//! cache, and the cursor factories.
//!
//! # Structure
//!
//! Nodes live in a slab arena addressed by stable handles. The `left`/`right`
//! slots form the balanced search tree; the `prev`/`next` links thread the
//! same nodes into a doubly linked backbone whose order is exactly the
//! in-order traversal. Mutating operations first compute a root-to-target
//! path, maintain backbone links at the point of structural change, then
//! rebalance bottom-up along the path.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt as StdFmt;
use std::mem;

use slab::Slab;

use crate::balance;
use crate::cursor::Cursor;
use crate::node::{Arena, Node, NodeId};
use crate::order::{KeyOrder, NaturalOrder};

// ============================================================================
//  Path cache
// ============================================================================

/// The most recently computed root-to-node path, with the key it was
/// computed for.
///
/// Reused only when a later search asks for a comparator-equal key; every
/// structural mutation drops it. This makes the common
/// find-then-mutate-same-key pair cost a single descent.
struct PathCache<K> {
    key: K,
    path: Vec<NodeId>,
}

// ============================================================================
//  AvlTree
// ============================================================================

/// An ordered associative container keyed by a derived key.
///
/// Items are stored in a height-balanced (AVL) binary search tree whose
/// nodes are additionally threaded into a doubly linked list in ascending
/// key order. Tree operations are O(log n); stepping a [`Cursor`] along the
/// backbone is amortized O(1).
///
/// Keys are derived, not stored: the `key_extractor` maps an item to its
/// key, and `key_order` is a consistent total order over keys. Keys must be
/// pairwise distinct under that order; inserting an item whose key already
/// exists replaces the stored item.
///
/// # Type Parameters
///
/// - `E` - The item type
/// - `K` - The derived key type
/// - `X` - The key extractor, any `Fn(&E) -> K`
/// - `C` - The key order (defaults to [`NaturalOrder`] for `K: Ord`)
///
/// # Example
///
/// ```rust
/// use avlist::AvlTree;
///
/// let mut tree: AvlTree<(u32, &str), u32, _> = AvlTree::new(|e: &(u32, &str)| e.0);
/// tree.put((2, "two"));
/// tree.put((1, "one"));
///
/// assert_eq!(tree.find_by_key(&1), Some(&(1, "one")));
/// assert_eq!(tree.len(), 2);
/// ```
pub struct AvlTree<E, K, X, C = NaturalOrder> {
    /// Node arena; tree and backbone links address into it by stable keys.
    nodes: Arena<E>,

    /// Root slot; sentinel when the tree is empty.
    root: NodeId,

    /// Leftmost node (backbone head), kept for O(1) bounds access.
    head: NodeId,

    /// Rightmost node (backbone tail).
    tail: NodeId,

    /// Number of stored items.
    len: usize,

    /// Structural version.
    ///
    /// Bumped by node-adding `put`, successful `remove`, and `clear`; a
    /// same-key replace is a pure value swap and leaves it alone. Cursors
    /// compare their captured stamp against this on every operation.
    version: u64,

    /// Memoized last search. Interior mutability lets `&self` lookups
    /// populate it for a following mutation of the same key.
    cache: RefCell<Option<PathCache<K>>>,

    /// Derives a key from an item. Must be pure and total.
    key_extractor: X,

    /// Total order over keys.
    key_order: C,
}

impl<E, K, X> AvlTree<E, K, X>
where
    X: Fn(&E) -> K,
    K: Ord,
{
    /// Creates an empty tree ordering keys by their [`Ord`] implementation.
    pub fn new(key_extractor: X) -> Self {
        Self::with_key_order(key_extractor, NaturalOrder)
    }
}

impl<E, K, X, C> AvlTree<E, K, X, C>
where
    X: Fn(&E) -> K,
    C: KeyOrder<K>,
{
    /// Creates an empty tree with an explicit key order.
    ///
    /// Both collaborators are required by construction; there is no
    /// partially configured state.
    pub fn with_key_order(key_extractor: X, key_order: C) -> Self {
        Self {
            nodes: Slab::new(),
            root: NodeId::NONE,
            head: NodeId::NONE,
            tail: NodeId::NONE,
            len: 0,
            version: 0,
            cache: RefCell::new(None),
            key_extractor,
            key_order,
        }
    }
}

// ============================================================================
//  Facade: size, bounds, clear, iteration
// ============================================================================

impl<E, K, X, C> AvlTree<E, K, X, C> {
    /// Number of stored items.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// `true` when no items are stored.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Height of the tree; 0 when empty, 1 for a single item.
    ///
    /// Useful for debugging and for estimating lookup cost; the AVL
    /// invariant keeps this within ~1.44·log2(n + 2).
    #[must_use]
    pub fn height(&self) -> usize {
        usize::from(balance::subtree_height(&self.nodes, self.root))
    }

    /// The item with the smallest key, in O(1).
    #[must_use]
    pub fn first(&self) -> Option<&E> {
        self.node_item(self.head)
    }

    /// The item with the largest key, in O(1).
    #[must_use]
    pub fn last(&self) -> Option<&E> {
        self.node_item(self.tail)
    }

    /// The key extractor supplied at construction.
    #[must_use]
    pub const fn key_extractor(&self) -> &X {
        &self.key_extractor
    }

    /// The key order supplied at construction.
    #[must_use]
    pub const fn key_order(&self) -> &C {
        &self.key_order
    }

    /// Removes every item.
    ///
    /// Counts as a structural mutation even when the tree is already empty:
    /// outstanding cursors are invalidated unconditionally.
    pub fn clear(&mut self) {
        tracing::debug!(len = self.len, "clear");
        self.nodes.clear();
        self.root = NodeId::NONE;
        self.head = NodeId::NONE;
        self.tail = NodeId::NONE;
        self.len = 0;
        self.mark_mutation();
    }

    /// Iterates items in ascending key order.
    ///
    /// The iterator walks only backbone links and holds a shared borrow, so
    /// consistency is enforced statically: the tree cannot be mutated while
    /// it is alive. The [`Cursor`] protocol is the dynamically checked
    /// counterpart.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, E> {
        Iter {
            nodes: &self.nodes,
            front: self.head,
            back: self.tail,
            remaining: self.len,
        }
    }

    /// A cursor positioned before the first (leftmost) item.
    #[must_use]
    pub fn cursor(&self) -> Cursor<E, K, X, C> {
        Cursor::new(NodeId::NONE, self.head, self.version)
    }

    /// A cursor positioned after the last (rightmost) item.
    #[must_use]
    pub fn cursor_back(&self) -> Cursor<E, K, X, C> {
        Cursor::new(self.tail, NodeId::NONE, self.version)
    }

    /// Bumps the version and drops the path cache. Every structural
    /// mutation funnels through here.
    fn mark_mutation(&mut self) {
        self.version = self.version.wrapping_add(1);
        *self.cache.get_mut() = None;
    }

    fn node_item(&self, id: NodeId) -> Option<&E> {
        if id.is_none() {
            None
        } else {
            Some(&self.nodes[id.index()].item)
        }
    }

    /// Current version stamp, captured by cursors.
    pub(crate) const fn version(&self) -> u64 {
        self.version
    }

    /// Item and backbone links of a live node, for cursor stepping.
    pub(crate) fn node_entry(&self, id: NodeId) -> (&E, NodeId, NodeId) {
        let node = &self.nodes[id.index()];
        (&node.item, node.prev, node.next)
    }
}

// ============================================================================
//  Lookup, insertion, deletion
// ============================================================================

impl<E, K, X, C> AvlTree<E, K, X, C>
where
    X: Fn(&E) -> K,
    C: KeyOrder<K>,
    K: Clone,
{
    /// Looks up the item whose key compares equal to `key`.
    #[must_use]
    pub fn find_by_key(&self, key: &K) -> Option<&E> {
        let top: NodeId = self.search(key);
        if top.is_none() {
            return None;
        }
        let item: &E = &self.nodes[top.index()].item;
        (self.key_order.compare(key, &(self.key_extractor)(item)) == Ordering::Equal)
            .then_some(item)
    }

    /// Looks up the item whose key equals `item`'s own derived key.
    #[must_use]
    pub fn find(&self, item: &E) -> Option<&E> {
        self.find_by_key(&(self.key_extractor)(item))
    }

    /// Inserts `item`, replacing and returning any item with an equal key.
    ///
    /// A same-key replace is a pure value swap: no rebalancing, no count
    /// change, and no version bump, so outstanding cursors stay valid. A
    /// structural insert attaches a leaf, splices it into the backbone next
    /// to its parent, and rebalances along the search path.
    pub fn put(&mut self, item: E) -> Option<E> {
        let key: K = (self.key_extractor)(&item);
        if self.root.is_none() {
            let id = self.alloc_node(item, NodeId::NONE, NodeId::NONE);
            self.root = id;
            self.head = id;
            self.tail = id;
            self.len = 1;
            self.mark_mutation();
            tracing::trace!("put: planted root");
            return None;
        }
        let mut path: Vec<NodeId> = self.take_path(&key);
        debug_assert!(!path.is_empty(), "non-empty tree yields a non-empty path");
        let target: NodeId = path[path.len() - 1];
        let found: bool = {
            let target_item = &self.nodes[target.index()].item;
            self.key_order.compare(&key, &(self.key_extractor)(target_item)) == Ordering::Equal
        };
        if found {
            let replaced: E = mem::replace(&mut self.nodes[target.index()].item, item);
            // The path is still valid for this key; hand it back to the cache.
            *self.cache.get_mut() = Some(PathCache { key, path });
            return Some(replaced);
        }
        self.attach_leaf(target, item);
        balance::rebalance(&mut self.nodes, &mut path, &mut self.root);
        self.len += 1;
        self.mark_mutation();
        tracing::trace!(len = self.len, height = self.height(), "put: attached leaf");
        None
    }

    /// Removes and returns the item whose key compares equal to `key`.
    ///
    /// Returns `None`, mutating nothing, when the key is absent.
    pub fn remove(&mut self, key: &K) -> Option<E> {
        self.remove_with_gap(key).map(|(item, _, _)| item)
    }

    /// A cursor positioned immediately before the node matching `key`, or
    /// before its would-be position when the key is absent.
    ///
    /// Reuses the path finder, and so the path cache, instead of a separate
    /// walk.
    #[must_use]
    pub fn cursor_at(&self, key: &K) -> Cursor<E, K, X, C> {
        let top: NodeId = self.search(key);
        if top.is_none() {
            return Cursor::new(NodeId::NONE, NodeId::NONE, self.version);
        }
        let node = &self.nodes[top.index()];
        match self.key_order.compare(key, &(self.key_extractor)(&node.item)) {
            Ordering::Less | Ordering::Equal => Cursor::new(node.prev, top, self.version),
            Ordering::Greater => Cursor::new(top, node.next, self.version),
        }
    }

    /// Derived key of a live node, for cursor removal.
    pub(crate) fn key_of(&self, id: NodeId) -> K {
        (self.key_extractor)(&self.nodes[id.index()].item)
    }

    /// Removal engine shared between [`Self::remove`] and cursor removal.
    ///
    /// On a hit, also reports the backbone gap `(prev, next)` left where the
    /// removed item sat, after substitution has settled; a cursor adopts it
    /// as its new position.
    pub(crate) fn remove_with_gap(&mut self, key: &K) -> Option<(E, NodeId, NodeId)> {
        let mut path: Vec<NodeId> = self.take_path(key);
        let hit: bool = path.last().copied().is_some_and(|top| {
            let item = &self.nodes[top.index()].item;
            self.key_order.compare(&(self.key_extractor)(item), key) == Ordering::Equal
        });
        if !hit {
            // Miss: nothing changes, but the descent is still worth caching.
            *self.cache.get_mut() = Some(PathCache {
                key: key.clone(),
                path,
            });
            return None;
        }
        let mut target: NodeId = path[path.len() - 1];

        // Walk the doomed item down to a leaf: repeatedly swap it with the
        // taller side's extreme node (its in-order neighbor), extending the
        // path. Physical detachment then always removes a leaf. The first
        // step fixes the substitution direction, and with it the backbone
        // gap the removed item leaves behind.
        let mut gap: Option<(NodeId, NodeId)> = None;
        loop {
            let (left, right, prev, next) = {
                let node = &self.nodes[target.index()];
                (node.left, node.right, node.prev, node.next)
            };
            if left.is_none() && right.is_none() {
                break;
            }
            let via_successor: bool = balance::subtree_height(&self.nodes, right)
                >= balance::subtree_height(&self.nodes, left);
            if gap.is_none() {
                gap = Some(if via_successor {
                    (prev, target)
                } else {
                    (target, next)
                });
            }
            let substitute: NodeId = if via_successor {
                self.descend_leftmost(right, &mut path)
            } else {
                self.descend_rightmost(left, &mut path)
            };
            let Some((a, b)) = self.nodes.get2_mut(target.index(), substitute.index()) else {
                unreachable!("substitution nodes are distinct live slots");
            };
            mem::swap(&mut a.item, &mut b.item);
            target = substitute;
        }

        path.pop();
        let (prev, next) = {
            let node = &self.nodes[target.index()];
            (node.prev, node.next)
        };
        let (gap_prev, gap_next) = gap.unwrap_or((prev, next));

        // Detach: clear the parent slot, then bridge the backbone.
        let parent: NodeId = path.last().copied().unwrap_or(NodeId::NONE);
        balance::replace_child(&mut self.nodes, parent, &mut self.root, target, NodeId::NONE);
        if prev.is_some() {
            self.nodes[prev.index()].next = next;
        } else {
            self.head = next;
        }
        if next.is_some() {
            self.nodes[next.index()].prev = prev;
        } else {
            self.tail = prev;
        }
        let removed: Node<E> = self.nodes.remove(target.index());
        balance::rebalance(&mut self.nodes, &mut path, &mut self.root);
        self.len -= 1;
        self.mark_mutation();
        tracing::trace!(len = self.len, height = self.height(), "remove: detached leaf");
        Some((removed.item, gap_prev, gap_next))
    }

    /// Path top for `key`: the matching node, or the last node visited
    /// before falling off the tree (the would-be parent).
    ///
    /// Serves `&self` callers through the cache cell; the full path is
    /// retained for a subsequent mutation of the same key.
    fn search(&self, key: &K) -> NodeId {
        if let Some(cache) = self.cache.borrow().as_ref() {
            if self.key_order.compare(&cache.key, key) == Ordering::Equal {
                return cache.path.last().copied().unwrap_or(NodeId::NONE);
            }
        }
        let mut path: Vec<NodeId> = Vec::new();
        self.fill_path(key, &mut path);
        let top: NodeId = path.last().copied().unwrap_or(NodeId::NONE);
        *self.cache.borrow_mut() = Some(PathCache {
            key: key.clone(),
            path,
        });
        top
    }

    /// Like [`Self::search`], but hands the path out for a mutation.
    ///
    /// A comparator-equal cached path is reused as-is; otherwise its buffer
    /// is recycled for the fresh descent. The cache is left empty either
    /// way; mutating callers decide whether to restore it.
    fn take_path(&mut self, key: &K) -> Vec<NodeId> {
        let cached: Option<PathCache<K>> = self.cache.get_mut().take();
        match cached {
            Some(cache) if self.key_order.compare(&cache.key, key) == Ordering::Equal => cache.path,
            Some(cache) => {
                let mut path = cache.path;
                self.fill_path(key, &mut path);
                path
            }
            None => {
                let mut path = Vec::new();
                self.fill_path(key, &mut path);
                path
            }
        }
    }

    /// Walks from the root toward `key`, pushing every visited node.
    ///
    /// Descends left on strictly-less and right otherwise, stopping at an
    /// equal key or where the next child slot is empty.
    fn fill_path(&self, key: &K, path: &mut Vec<NodeId>) {
        path.clear();
        let mut current: NodeId = self.root;
        while current.is_some() {
            path.push(current);
            let node = &self.nodes[current.index()];
            current = match self
                .key_order
                .compare(key, &(self.key_extractor)(&node.item))
            {
                Ordering::Equal => break,
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
    }

    /// Creates a leaf under `parent` and splices it into the backbone.
    ///
    /// The occupied child slot dictates the side; with both slots free the
    /// key comparison decides. Either way the new node lands
    /// backbone-adjacent to its parent, so the splice is O(1). The caller
    /// guarantees the free slot is key-order-correct.
    fn attach_leaf(&mut self, parent: NodeId, item: E) {
        let (parent_left, parent_right, parent_prev, parent_next) = {
            let node = &self.nodes[parent.index()];
            (node.left, node.right, node.prev, node.next)
        };
        let goes_left: bool = parent_right.is_some()
            || (parent_left.is_none() && {
                let parent_item = &self.nodes[parent.index()].item;
                self.key_order.compare(
                    &(self.key_extractor)(&item),
                    &(self.key_extractor)(parent_item),
                ) == Ordering::Less
            });
        if goes_left {
            let id = self.alloc_node(item, parent_prev, parent);
            let parent_node = &mut self.nodes[parent.index()];
            parent_node.left = id;
            parent_node.prev = id;
            if parent_prev.is_some() {
                self.nodes[parent_prev.index()].next = id;
            } else {
                // Only the leftmost node lacks a predecessor.
                self.head = id;
            }
        } else {
            let id = self.alloc_node(item, parent, parent_next);
            let parent_node = &mut self.nodes[parent.index()];
            parent_node.right = id;
            parent_node.next = id;
            if parent_next.is_some() {
                self.nodes[parent_next.index()].prev = id;
            } else {
                // Only the rightmost node lacks a successor.
                self.tail = id;
            }
        }
    }

    fn alloc_node(&mut self, item: E, prev: NodeId, next: NodeId) -> NodeId {
        NodeId::new(self.nodes.insert(Node::new(item, prev, next)))
    }

    /// Pushes the nodes from `subroot` down to its leftmost node, inclusive,
    /// returning that leftmost node.
    fn descend_leftmost(&self, subroot: NodeId, path: &mut Vec<NodeId>) -> NodeId {
        let mut current: NodeId = subroot;
        loop {
            path.push(current);
            let left: NodeId = self.nodes[current.index()].left;
            if left.is_none() {
                return current;
            }
            current = left;
        }
    }

    /// Pushes the nodes from `subroot` down to its rightmost node,
    /// inclusive, returning that rightmost node.
    fn descend_rightmost(&self, subroot: NodeId, path: &mut Vec<NodeId>) -> NodeId {
        let mut current: NodeId = subroot;
        loop {
            path.push(current);
            let right: NodeId = self.nodes[current.index()].right;
            if right.is_none() {
                return current;
            }
            current = right;
        }
    }
}

impl<E, K, X, C> StdFmt::Debug for AvlTree<E, K, X, C> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("AvlTree")
            .field("len", &self.len)
            .field("height", &self.height())
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

// ============================================================================
//  Iter
// ============================================================================

/// Borrowing iterator over the items in ascending key order.
///
/// Produced by [`AvlTree::iter`]. Walks only backbone links; double-ended
/// and exact-size.
pub struct Iter<'a, E> {
    nodes: &'a Arena<E>,
    front: NodeId,
    back: NodeId,
    remaining: usize,
}

impl<'a, E> Iterator for Iter<'a, E> {
    type Item = &'a E;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.nodes[self.front.index()];
        self.front = node.next;
        self.remaining -= 1;
        Some(&node.item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<E> DoubleEndedIterator for Iter<'_, E> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.nodes[self.back.index()];
        self.back = node.prev;
        self.remaining -= 1;
        Some(&node.item)
    }
}

impl<E> ExactSizeIterator for Iter<'_, E> {}

impl<'a, E, K, X, C> IntoIterator for &'a AvlTree<E, K, X, C> {
    type Item = &'a E;
    type IntoIter = Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ============================================================================
//  Tests
// ============================================================================

#[cfg(test)]
impl<E, K, X, C> AvlTree<E, K, X, C>
where
    X: Fn(&E) -> K,
    C: KeyOrder<K>,
{
    /// Verifies every structural invariant, panicking on the first
    /// violation: exact cached heights, AVL balance, backbone agreeing with
    /// the in-order traversal, strictly ascending keys, bounds, and count.
    pub(crate) fn assert_invariants(&self) {
        let mut inorder: Vec<NodeId> = Vec::new();
        let (height, count) = self.check_subtree(self.root, &mut inorder);
        assert_eq!(usize::from(height), self.height());
        assert_eq!(count, self.len, "count diverges from tree size");
        assert_eq!(self.nodes.len(), self.len, "arena holds orphaned slots");
        assert_eq!(self.head, inorder.first().copied().unwrap_or(NodeId::NONE));
        assert_eq!(self.tail, inorder.last().copied().unwrap_or(NodeId::NONE));
        let mut walker: NodeId = self.head;
        for (position, &id) in inorder.iter().enumerate() {
            assert_eq!(walker, id, "backbone diverges from in-order at {position}");
            let node = &self.nodes[id.index()];
            let expected_prev = if position == 0 {
                NodeId::NONE
            } else {
                inorder[position - 1]
            };
            assert_eq!(node.prev, expected_prev);
            walker = node.next;
        }
        assert!(walker.is_none(), "backbone runs past the in-order tail");
        for pair in inorder.windows(2) {
            let a = (self.key_extractor)(&self.nodes[pair[0].index()].item);
            let b = (self.key_extractor)(&self.nodes[pair[1].index()].item);
            assert_eq!(
                self.key_order.compare(&a, &b),
                Ordering::Less,
                "keys are not strictly ascending"
            );
        }
    }

    fn check_subtree(&self, id: NodeId, inorder: &mut Vec<NodeId>) -> (u8, usize) {
        if id.is_none() {
            return (0, 0);
        }
        let (left, right, cached_height) = {
            let node = &self.nodes[id.index()];
            (node.left, node.right, node.height)
        };
        let (left_height, left_count) = self.check_subtree(left, inorder);
        inorder.push(id);
        let (right_height, right_count) = self.check_subtree(right, inorder);
        assert!(
            left_height.abs_diff(right_height) <= 1,
            "AVL balance violated"
        );
        let height = left_height.max(right_height) + 1;
        assert_eq!(cached_height, height, "cached height is stale");
        (height, left_count + right_count + 1)
    }

    fn cached_key(&self) -> Option<K>
    where
        K: Clone,
    {
        self.cache.borrow().as_ref().map(|cache| cache.key.clone())
    }
}
