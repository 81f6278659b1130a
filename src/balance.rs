//! Filepath: src/balance.rs
//!
//! AVL rebalancing: rotations, height bookkeeping, and bottom-up
//! propagation along a search path.
//!
//! Every function operates on the arena handed in by the tree. None of them
//! touch backbone links: list order is a pure function of key order, and
//! rotations do not change key order.

use crate::node::{Arena, Node, NodeId};

/// Height of the subtree rooted at `id`; 0 for an absent subtree.
///
/// Reads the cached height field, never walks the subtree.
#[inline]
pub(crate) fn subtree_height<E>(nodes: &Arena<E>, id: NodeId) -> u8 {
    if id.is_none() {
        0
    } else {
        nodes[id.index()].height
    }
}

/// Rebalances every node along `path`, bottom-up.
///
/// The path is consumed from its top (deepest) entry. Each step balances the
/// popped node, then re-links the possibly new subtree root into the parent
/// slot, or into `root` when the path is exhausted. Propagation stops early
/// once a step leaves the subtree height unchanged: ancestors cannot be
/// affected then. That shortcut is what keeps rebalancing amortized
/// logarithmic.
pub(crate) fn rebalance<E>(nodes: &mut Arena<E>, path: &mut Vec<NodeId>, root: &mut NodeId) {
    while let Some(old_subroot) = path.pop() {
        let old_height: u8 = nodes[old_subroot.index()].height;
        let new_subroot: NodeId = balance(nodes, old_subroot);
        let new_height: u8 = nodes[new_subroot.index()].height;
        let parent: NodeId = path.last().copied().unwrap_or(NodeId::NONE);
        replace_child(nodes, parent, root, old_subroot, new_subroot);
        if new_height == old_height {
            break;
        }
    }
}

/// Re-links a child slot after a subtree root changed.
///
/// With no parent (`NodeId::NONE`) the tree root slot itself is updated.
/// `was` must currently occupy the slot being replaced.
pub(crate) fn replace_child<E>(
    nodes: &mut Arena<E>,
    parent: NodeId,
    root: &mut NodeId,
    was: NodeId,
    now: NodeId,
) {
    if was == now {
        return;
    }
    if parent.is_none() {
        debug_assert!(*root == was);
        *root = now;
    } else {
        let parent_node: &mut Node<E> = &mut nodes[parent.index()];
        if parent_node.left == was {
            parent_node.left = now;
        } else {
            debug_assert!(parent_node.right == was);
            parent_node.right = now;
        }
    }
}

/// Restores the AVL invariant at `id`, returning the new subtree root.
///
/// When the children's heights differ by more than one, applies one of the
/// four rotations, chosen by a second-level height comparison; otherwise
/// only recomputes the cached height.
fn balance<E>(nodes: &mut Arena<E>, id: NodeId) -> NodeId {
    let (left, right) = {
        let node = &nodes[id.index()];
        (node.left, node.right)
    };
    let left_height: u8 = subtree_height(nodes, left);
    let right_height: u8 = subtree_height(nodes, right);
    if left_height.abs_diff(right_height) <= 1 {
        nodes[id.index()].height = left_height.max(right_height) + 1;
        return id;
    }
    if left_height < right_height {
        // Right-heavy.
        let (inner, outer) = {
            let node = &nodes[right.index()];
            (node.left, node.right)
        };
        if subtree_height(nodes, inner) <= subtree_height(nodes, outer) {
            rotate_left(nodes, id)
        } else {
            rotate_right_left(nodes, id)
        }
    } else {
        // Left-heavy.
        let (inner, outer) = {
            let node = &nodes[left.index()];
            (node.right, node.left)
        };
        if subtree_height(nodes, inner) <= subtree_height(nodes, outer) {
            rotate_right(nodes, id)
        } else {
            rotate_left_right(nodes, id)
        }
    }
}

/// Single left rotation; the right child becomes the subtree root.
///
/// Height formulas assume the imbalance precondition checked by [`balance`].
fn rotate_left<E>(nodes: &mut Arena<E>, root: NodeId) -> NodeId {
    let a: NodeId = root;
    let b: NodeId = nodes[a.index()].right;
    let c: NodeId = nodes[b.index()].left;
    nodes[a.index()].right = c;
    nodes[b.index()].left = a;
    let a_height: u8 = subtree_height(nodes, c) + 1;
    nodes[a.index()].height = a_height;
    nodes[b.index()].height = a_height + 1;
    b
}

/// Single right rotation; the left child becomes the subtree root.
fn rotate_right<E>(nodes: &mut Arena<E>, root: NodeId) -> NodeId {
    let a: NodeId = root;
    let b: NodeId = nodes[a.index()].left;
    let c: NodeId = nodes[b.index()].right;
    nodes[a.index()].left = c;
    nodes[b.index()].right = a;
    let a_height: u8 = subtree_height(nodes, c) + 1;
    nodes[a.index()].height = a_height;
    nodes[b.index()].height = a_height + 1;
    b
}

/// Double rotation for a right-heavy subtree whose right child leans left:
/// the right child's left subtree rises to the top.
fn rotate_right_left<E>(nodes: &mut Arena<E>, root: NodeId) -> NodeId {
    let a: NodeId = root;
    let b: NodeId = nodes[a.index()].right;
    let c: NodeId = nodes[b.index()].left;
    let (c_left, c_right) = {
        let node = &nodes[c.index()];
        (node.left, node.right)
    };
    nodes[a.index()].right = c_left;
    nodes[b.index()].left = c_right;
    nodes[c.index()].left = a;
    nodes[c.index()].right = b;
    let wing_height: u8 = {
        let a_left = nodes[a.index()].left;
        subtree_height(nodes, a_left) + 1
    };
    nodes[a.index()].height = wing_height;
    nodes[b.index()].height = wing_height;
    nodes[c.index()].height = wing_height + 1;
    c
}

/// Double rotation for a left-heavy subtree whose left child leans right:
/// the left child's right subtree rises to the top.
fn rotate_left_right<E>(nodes: &mut Arena<E>, root: NodeId) -> NodeId {
    let a: NodeId = root;
    let b: NodeId = nodes[a.index()].left;
    let c: NodeId = nodes[b.index()].right;
    let (c_left, c_right) = {
        let node = &nodes[c.index()];
        (node.left, node.right)
    };
    nodes[a.index()].left = c_right;
    nodes[b.index()].right = c_left;
    nodes[c.index()].right = a;
    nodes[c.index()].left = b;
    let wing_height: u8 = {
        let a_right = nodes[a.index()].right;
        subtree_height(nodes, a_right) + 1
    };
    nodes[a.index()].height = wing_height;
    nodes[b.index()].height = wing_height;
    nodes[c.index()].height = wing_height + 1;
    c
}
