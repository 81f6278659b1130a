//! Property-based tests for the tree.
//!
//! Uses differential testing against `BTreeMap` as an oracle, plus direct
//! checks of the structural guarantees: the AVL height bound, strictly
//! ordered traversal, round-tripping, and replace/deletion semantics.

#![expect(clippy::unwrap_used, reason = "fail fast in tests")]

mod common;

use avlist::{AvlTree, CursorError};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Items carry their key in the high bits and a tag in the low bits, so two
/// items with the same key remain distinguishable after a replace.
type Item = i64;

fn make_item(key: i16, tag: u16) -> Item {
    (i64::from(key) << 16) | i64::from(tag)
}

fn item_key(item: &Item) -> i16 {
    #[expect(clippy::cast_possible_truncation, reason = "the key is the high half by construction")]
    let key = (*item >> 16) as i16;
    key
}

type Tree = AvlTree<Item, i16, fn(&Item) -> i16>;

fn new_tree() -> Tree {
    AvlTree::new(item_key as fn(&Item) -> i16)
}

/// The AVL bound: height ≤ 1.44·log2(n + 2).
fn assert_height_bound(tree: &Tree) {
    #[expect(clippy::cast_precision_loss, reason = "test sizes are far below 2^52")]
    let bound = 1.4405 * (((tree.len() + 2) as f64).log2()) + 1e-9;
    assert!(
        (tree.height() as f64) <= bound,
        "height {} exceeds AVL bound {bound:.3} at n={}",
        tree.height(),
        tree.len()
    );
}

// ============================================================================
//  Strategies
// ============================================================================

/// Operations for random differential testing.
#[derive(Debug, Clone)]
enum Op {
    Put(i16, u16),
    Remove(i16),
    Find(i16),
}

fn operations(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            3 => (any::<i16>(), any::<u16>()).prop_map(|(k, t)| Op::Put(k, t)),
            2 => any::<i16>().prop_map(Op::Remove),
            1 => any::<i16>().prop_map(Op::Find),
        ],
        0..=max_ops,
    )
}

/// A narrow key space forces collisions, replaces, and removal hits.
fn dense_operations(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            3 => (-24..=24_i16, any::<u16>()).prop_map(|(k, t)| Op::Put(k, t)),
            2 => (-24..=24_i16).prop_map(Op::Remove),
            1 => (-24..=24_i16).prop_map(Op::Find),
        ],
        0..=max_ops,
    )
}

fn unique_keys(max_count: usize) -> impl Strategy<Value = Vec<i16>> {
    prop::collection::hash_set(any::<i16>(), 0..=max_count)
        .prop_map(|set| set.into_iter().collect())
}

// ============================================================================
//  Round-trip and replace semantics
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Every inserted item is found again by its key, bit-identical.
    #[test]
    fn insert_then_find_round_trips(keys in unique_keys(128)) {
        let mut tree = new_tree();
        for (tag, &key) in keys.iter().enumerate() {
            #[expect(clippy::cast_possible_truncation, reason = "tag fits the fixture width")]
            let item = make_item(key, tag as u16);
            prop_assert!(tree.put(item).is_none());
        }
        prop_assert_eq!(tree.len(), keys.len());
        for (tag, &key) in keys.iter().enumerate() {
            #[expect(clippy::cast_possible_truncation, reason = "tag fits the fixture width")]
            let expected = make_item(key, tag as u16);
            prop_assert_eq!(tree.find_by_key(&key), Some(&expected));
        }
    }

    /// A same-key put replaces the stored item, returns the old one, and
    /// leaves the size alone.
    #[test]
    fn replace_returns_the_old_item_and_keeps_size(key: i16, first: u16, second: u16) {
        prop_assume!(first != second);
        let mut tree = new_tree();
        prop_assert!(tree.put(make_item(key, first)).is_none());
        let replaced = tree.put(make_item(key, second));
        prop_assert_eq!(replaced, Some(make_item(key, first)));
        prop_assert_eq!(tree.len(), 1);
        prop_assert_eq!(tree.find_by_key(&key), Some(&make_item(key, second)));
    }

    /// Removing a present key returns its item and forgets the key; removing
    /// an absent key changes nothing.
    #[test]
    fn removal_semantics(keys in unique_keys(64), absent: i16) {
        prop_assume!(!keys.contains(&absent));
        let mut tree = new_tree();
        for &key in &keys {
            tree.put(make_item(key, 0));
        }
        prop_assert_eq!(tree.remove(&absent), None);
        prop_assert_eq!(tree.len(), keys.len());
        for &key in &keys {
            prop_assert_eq!(tree.remove(&key), Some(make_item(key, 0)));
            prop_assert_eq!(tree.find_by_key(&key), None);
        }
        prop_assert!(tree.is_empty());
    }
}

// ============================================================================
//  Differential testing against BTreeMap
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The tree behaves identically to a `BTreeMap` oracle under random
    /// put/remove/find sequences, and traversal matches the oracle's order.
    #[test]
    fn differential_against_btreemap(ops in dense_operations(200)) {
        let mut tree = new_tree();
        let mut oracle: BTreeMap<i16, Item> = BTreeMap::new();
        for op in ops {
            match op {
                Op::Put(key, tag) => {
                    let item = make_item(key, tag);
                    prop_assert_eq!(tree.put(item), oracle.insert(key, item));
                }
                Op::Remove(key) => {
                    prop_assert_eq!(tree.remove(&key), oracle.remove(&key));
                }
                Op::Find(key) => {
                    prop_assert_eq!(tree.find_by_key(&key), oracle.get(&key));
                }
            }
            prop_assert_eq!(tree.len(), oracle.len());
        }
        let items: Vec<Item> = tree.iter().copied().collect();
        let expected: Vec<Item> = oracle.values().copied().collect();
        prop_assert_eq!(items, expected);
        prop_assert_eq!(tree.first(), oracle.values().next());
        prop_assert_eq!(tree.last(), oracle.values().next_back());
    }

    /// The height bound holds at every point of a random workload.
    #[test]
    fn height_stays_within_the_avl_bound(ops in operations(300)) {
        let mut tree = new_tree();
        for op in ops {
            match op {
                Op::Put(key, tag) => {
                    tree.put(make_item(key, tag));
                }
                Op::Remove(key) => {
                    tree.remove(&key);
                }
                Op::Find(key) => {
                    let _ = tree.find_by_key(&key);
                }
            }
            assert_height_bound(&tree);
        }
    }

    /// Forward cursor traversal is strictly ascending, backward is strictly
    /// descending, and both see exactly `len` items.
    #[test]
    fn cursor_traversals_are_strictly_ordered(ops in dense_operations(150)) {
        let mut tree = new_tree();
        for op in ops {
            match op {
                Op::Put(key, tag) => {
                    tree.put(make_item(key, tag));
                }
                Op::Remove(key) => {
                    tree.remove(&key);
                }
                Op::Find(_) => {}
            }
        }

        let mut forward = tree.cursor();
        let mut seen: usize = 0;
        let mut last_key: Option<i16> = None;
        while forward.has_next(&tree).unwrap() {
            let key = item_key(forward.next(&tree).unwrap());
            if let Some(previous) = last_key {
                prop_assert!(previous < key, "forward traversal not ascending");
            }
            last_key = Some(key);
            seen += 1;
        }
        prop_assert_eq!(seen, tree.len());
        prop_assert_eq!(forward.next(&tree), Err(CursorError::Exhausted));

        let mut backward = tree.cursor_back();
        let mut seen_back: usize = 0;
        let mut last_back: Option<i16> = None;
        while backward.has_previous(&tree).unwrap() {
            let key = item_key(backward.previous(&tree).unwrap());
            if let Some(previous) = last_back {
                prop_assert!(previous > key, "backward traversal not descending");
            }
            last_back = Some(key);
            seen_back += 1;
        }
        prop_assert_eq!(seen_back, tree.len());
    }

    /// Draining every other item through a cursor matches filtering the
    /// oracle, and the survivors still traverse in order.
    #[test]
    fn cursor_removal_agrees_with_the_oracle(keys in unique_keys(96)) {
        let mut tree = new_tree();
        let mut oracle: BTreeMap<i16, Item> = BTreeMap::new();
        for &key in &keys {
            let item = make_item(key, 1);
            tree.put(item);
            oracle.insert(key, item);
        }

        let mut cursor = tree.cursor();
        let mut keep = true;
        while cursor.has_next(&tree).unwrap() {
            let key = item_key(cursor.next(&tree).unwrap());
            if !keep {
                let removed = cursor.remove(&mut tree).unwrap();
                prop_assert_eq!(oracle.remove(&key), Some(removed));
            }
            keep = !keep;
        }

        let items: Vec<Item> = tree.iter().copied().collect();
        let expected: Vec<Item> = oracle.values().copied().collect();
        prop_assert_eq!(items, expected);
    }

    /// `clear` empties the tree and invalidates cursors created before it.
    #[test]
    fn clear_resets_everything(keys in unique_keys(48)) {
        let mut tree = new_tree();
        for &key in &keys {
            tree.put(make_item(key, 0));
        }
        let stale = tree.cursor();
        tree.clear();
        prop_assert!(tree.is_empty());
        prop_assert_eq!(tree.len(), 0);
        prop_assert_eq!(tree.height(), 0);
        prop_assert_eq!(stale.has_next(&tree), Err(CursorError::TreeModified));
        prop_assert_eq!(tree.iter().count(), 0);
    }
}

#[test]
fn tracing_initializes_for_the_suite() {
    common::init_tracing();
    tracing::info!("tree proptests running");
}
