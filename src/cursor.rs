//! Filepath: src/cursor.rs
//!
//! Bidirectional cursor over the backbone list, with fail-fast consistency
//! checks and removal.
//!
//! A [`Cursor`] is a position in the gap between two adjacent backbone
//! nodes (or a tree bound). It does not borrow the tree: every operation
//! takes the tree as an argument and revalidates a captured version stamp
//! first, so any number of cursors can coexist with mutation, and going
//! stale is a surfaced error instead of silent corruption. Stepping reads
//! only backbone links, never tree pointers.
//!
//! # Consistency Model
//!
//! Structural mutations (node-adding `put`, `remove`, `clear`) bump the
//! tree's version counter. A cursor whose stamp no longer matches fails
//! every operation with [`CursorError::TreeModified`]. The one exemption is
//! the cursor's own [`Cursor::remove`], which recaptures the stamp so the
//! same cursor can keep stepping and removing.
//!
//! # Same-Tree Discipline
//!
//! A cursor must only be used with the tree that created it. This is the
//! caller's responsibility (the same discipline the arena-backed collection
//! crates in this space document for their storage handles); the type
//! parameters pin the tree type, and the version stamp catches most
//! cross-tree mixups, but neither is a guarantee.

use std::fmt as StdFmt;
use std::marker::PhantomData;

use crate::node::NodeId;
use crate::order::KeyOrder;
use crate::tree::AvlTree;

// ============================================================================
//  CursorError
// ============================================================================

/// Errors surfaced by cursor operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorError {
    /// `next`/`previous` was called with no element on that side.
    ///
    /// Signals end of sequence, not a defect; stepping the other way still
    /// works.
    Exhausted,

    /// The tree was structurally mutated outside this cursor.
    ///
    /// The captured version stamp no longer matches the tree's counter. The
    /// cursor is permanently stale; create a fresh one.
    TreeModified,

    /// `remove` was called with no last-returned element.
    ///
    /// Either no successful `next`/`previous` has happened yet, or the
    /// previous removal already consumed the marker. The cursor remains
    /// usable for stepping.
    NoLastElement,

    /// The operation is not part of the cursor contract.
    ///
    /// `set`, `add`, and the positional index queries always fail: tree
    /// positions have no stable integer index, and in-place mutation
    /// through the cursor is excluded by design.
    Unsupported,
}

impl StdFmt::Display for CursorError {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::Exhausted => write!(f, "no element on that side of the cursor"),

            Self::TreeModified => {
                write!(f, "tree was structurally modified outside this cursor")
            }

            Self::NoLastElement => write!(f, "no last returned element to remove"),

            Self::Unsupported => write!(f, "operation is not supported by tree cursors"),
        }
    }
}

impl std::error::Error for CursorError {}

// ============================================================================
//  Cursor
// ============================================================================

/// Which neighbor holds the last returned element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastStep {
    /// Nothing returned yet, or the marker was consumed by a removal.
    Undefined,
    /// The last call was `next`; the returned node is now `prev`.
    ViaPrev,
    /// The last call was `previous`; the returned node is now `next`.
    ViaNext,
}

/// A position between two adjacent backbone nodes of an [`AvlTree`].
///
/// Created by [`AvlTree::cursor`] (before the first item),
/// [`AvlTree::cursor_back`] (after the last item), or
/// [`AvlTree::cursor_at`] (immediately before a key's position).
///
/// # Example
///
/// ```rust
/// use avlist::AvlTree;
///
/// let mut tree: AvlTree<i64, i64, _> = AvlTree::new(|e: &i64| *e);
/// for item in [1_i64, 3, 5, 7, 9] {
///     tree.put(item);
/// }
///
/// let mut cursor = tree.cursor_at(&7);
/// assert_eq!(cursor.next(&tree), Ok(&7));
///
/// // Removal through the cursor keeps the cursor itself alive.
/// assert_eq!(cursor.remove(&mut tree), Ok(7));
/// assert_eq!(cursor.next(&tree), Ok(&9));
/// assert_eq!(tree.len(), 4);
/// ```
#[must_use = "a cursor does nothing until stepped"]
pub struct Cursor<E, K, X, C> {
    /// Node returned by `previous`; sentinel at the pre-head bound.
    prev: NodeId,
    /// Node returned by `next`; sentinel at the post-tail bound.
    next: NodeId,
    /// Version stamp captured at creation or at this cursor's own removal.
    version: u64,
    /// Resolves which neighbor a removal targets.
    last: LastStep,
    /// Pins the tree type without borrowing a tree.
    _tree: PhantomData<fn(&AvlTree<E, K, X, C>)>,
}

impl<E, K, X, C> Cursor<E, K, X, C> {
    pub(crate) const fn new(prev: NodeId, next: NodeId, version: u64) -> Self {
        Self {
            prev,
            next,
            version,
            last: LastStep::Undefined,
            _tree: PhantomData,
        }
    }

    /// Fail-fast consistency check against the tree's version counter.
    fn ensure_in_sync(&self, tree: &AvlTree<E, K, X, C>) -> Result<(), CursorError> {
        if self.version == tree.version() {
            Ok(())
        } else {
            Err(CursorError::TreeModified)
        }
    }

    /// Whether a forward step would succeed.
    ///
    /// # Errors
    ///
    /// [`CursorError::TreeModified`] if the tree changed under the cursor.
    pub fn has_next(&self, tree: &AvlTree<E, K, X, C>) -> Result<bool, CursorError> {
        self.ensure_in_sync(tree)?;
        Ok(self.next.is_some())
    }

    /// Whether a backward step would succeed.
    ///
    /// # Errors
    ///
    /// [`CursorError::TreeModified`] if the tree changed under the cursor.
    pub fn has_previous(&self, tree: &AvlTree<E, K, X, C>) -> Result<bool, CursorError> {
        self.ensure_in_sync(tree)?;
        Ok(self.prev.is_some())
    }

    /// Returns the next item and advances the gap one position forward.
    ///
    /// # Errors
    ///
    /// [`CursorError::TreeModified`] if the tree changed under the cursor;
    /// [`CursorError::Exhausted`] at the post-tail bound.
    pub fn next<'t>(&mut self, tree: &'t AvlTree<E, K, X, C>) -> Result<&'t E, CursorError> {
        self.ensure_in_sync(tree)?;
        if self.next.is_none() {
            return Err(CursorError::Exhausted);
        }
        let (item, _, following) = tree.node_entry(self.next);
        self.prev = self.next;
        self.next = following;
        self.last = LastStep::ViaPrev;
        Ok(item)
    }

    /// Returns the previous item and moves the gap one position backward.
    ///
    /// # Errors
    ///
    /// [`CursorError::TreeModified`] if the tree changed under the cursor;
    /// [`CursorError::Exhausted`] at the pre-head bound.
    pub fn previous<'t>(&mut self, tree: &'t AvlTree<E, K, X, C>) -> Result<&'t E, CursorError> {
        self.ensure_in_sync(tree)?;
        if self.prev.is_none() {
            return Err(CursorError::Exhausted);
        }
        let (item, preceding, _) = tree.node_entry(self.prev);
        self.next = self.prev;
        self.prev = preceding;
        self.last = LastStep::ViaNext;
        Ok(item)
    }

    /// Removes the last returned element from the tree and returns it.
    ///
    /// Goes through the tree's deletion machinery, so the tree rebalances
    /// as usual. The gap re-synchronizes to the nodes now adjacent to the
    /// removed position, and the cursor recaptures the tree's version: its
    /// own removal never makes it stale. The marker resets, so a second
    /// `remove` without an intervening step fails.
    ///
    /// # Errors
    ///
    /// [`CursorError::TreeModified`] if the tree changed under the cursor;
    /// [`CursorError::NoLastElement`] if nothing has been returned since
    /// creation or the last removal.
    pub fn remove(&mut self, tree: &mut AvlTree<E, K, X, C>) -> Result<E, CursorError>
    where
        X: Fn(&E) -> K,
        C: KeyOrder<K>,
        K: Clone,
    {
        self.ensure_in_sync(tree)?;
        let doomed: NodeId = match self.last {
            LastStep::Undefined => return Err(CursorError::NoLastElement),
            LastStep::ViaPrev => self.prev,
            LastStep::ViaNext => self.next,
        };
        let key: K = tree.key_of(doomed);
        let Some((item, gap_prev, gap_next)) = tree.remove_with_gap(&key) else {
            unreachable!("the last returned node is present in the tree");
        };
        tracing::trace!(len = tree.len(), "cursor: removed last returned element");
        self.prev = gap_prev;
        self.next = gap_next;
        self.version = tree.version();
        self.last = LastStep::Undefined;
        Ok(item)
    }

    /// Always fails: in-place replacement is not part of the cursor
    /// contract.
    ///
    /// # Errors
    ///
    /// [`CursorError::Unsupported`], unconditionally.
    pub fn set(&mut self, item: E) -> Result<(), CursorError> {
        let _ = item;
        Err(CursorError::Unsupported)
    }

    /// Always fails: insertion through a cursor is not supported.
    ///
    /// # Errors
    ///
    /// [`CursorError::Unsupported`], unconditionally.
    pub fn add(&mut self, item: E) -> Result<(), CursorError> {
        let _ = item;
        Err(CursorError::Unsupported)
    }

    /// Always fails: tree positions have no stable integer index.
    ///
    /// # Errors
    ///
    /// [`CursorError::Unsupported`], unconditionally.
    pub fn next_index(&self) -> Result<usize, CursorError> {
        Err(CursorError::Unsupported)
    }

    /// Always fails: tree positions have no stable integer index.
    ///
    /// # Errors
    ///
    /// [`CursorError::Unsupported`], unconditionally.
    pub fn previous_index(&self) -> Result<usize, CursorError> {
        Err(CursorError::Unsupported)
    }
}

impl<E, K, X, C> StdFmt::Debug for Cursor<E, K, X, C> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("Cursor")
            .field("prev", &self.prev)
            .field("next", &self.next)
            .field("version", &self.version)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}
