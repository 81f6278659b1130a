//! Filepath: src/lib.rs
//! # `avlist`
//!
//! An ordered associative container keyed by a derived key, backed by a
//! height-balanced (AVL) binary search tree whose nodes are additionally
//! threaded into a doubly linked list in ascending key order.
//!
//! - Point lookup, insert-or-replace (`put`), and key-based deletion in
//!   O(log n).
//! - Bidirectional [`Cursor`]s stepping over the backbone list in amortized
//!   O(1), with removal and fail-fast invalidation.
//! - Keys are derived: the client supplies a key extractor and, optionally,
//!   a comparator at construction. Keys must be pairwise distinct under
//!   that order; a same-key `put` replaces.
//!
//! ## Example
//!
//! ```rust
//! use avlist::AvlTree;
//!
//! #[derive(Debug, PartialEq)]
//! struct Order {
//!     id: u64,
//!     qty: u32,
//! }
//!
//! let mut book: AvlTree<Order, u64, _> = AvlTree::new(|o: &Order| o.id);
//! book.put(Order { id: 7, qty: 50 });
//! book.put(Order { id: 3, qty: 20 });
//!
//! assert_eq!(book.find_by_key(&3).map(|o| o.qty), Some(20));
//!
//! // A same-key put replaces and returns the previous item.
//! let old = book.put(Order { id: 7, qty: 75 });
//! assert_eq!(old.map(|o| o.qty), Some(50));
//! assert_eq!(book.len(), 2);
//!
//! // Cursors step the threaded list in key order.
//! let mut cursor = book.cursor();
//! assert_eq!(cursor.next(&book).map(|o| o.id), Ok(3));
//! assert_eq!(cursor.next(&book).map(|o| o.id), Ok(7));
//! ```
//!
//! ## Consistency Model
//!
//! Single-threaded. Structural mutations bump a version counter; every
//! cursor operation compares its captured stamp first and fails with
//! [`CursorError::TreeModified`] instead of yielding stale results. A
//! cursor's own `remove` recaptures the stamp, so it can keep going. The
//! borrowing [`Iter`] sidesteps the question entirely: while it lives, the
//! borrow checker forbids mutation.
//!
//! There is no locking and no cross-thread guarantee; sharing a tree across
//! threads without external synchronization is not a supported mode.

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod cursor;
pub mod order;
pub mod tree;

mod balance;
mod node;

pub use cursor::{Cursor, CursorError};
pub use order::{KeyOrder, NaturalOrder};
pub use tree::{AvlTree, Iter};
