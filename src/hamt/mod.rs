//! The trie itself: node variants, the `modify` operation and its helpers.
//!
//! This module is the structural core. It knows nothing about hashing keys;
//! callers pass the 32-bit hash of every key they look up or update.
//!
//! - [`Node`]: the closed family of node variants
//! - [`Node::modify`]: the single update operation
//! - [`Edit`]: token of a transient edit session
//! - [`SizeDelta`]: how one update changed the number of bindings
//! - [`InvariantViolation`]: layout rules reported by [`Node::check_invariants`]
//!
//! # Structural Sharing
//!
//! `modify` copies only the nodes on the path from the root to the updated
//! binding. Every other subtree is shared between the old and the new root.
//!
//! # Examples
//!
//! ```rust
//! use persistent_hamt::hamt::{Edit, Node, NodeKind, SizeDelta};
//!
//! let empty = Node::<String, i32>::empty();
//! let (one, _) = Node::modify(empty, Edit::fresh(), 0, 1, "one".to_string(), |_| Some(1));
//! let (two, delta) =
//!     Node::modify(one.clone(), Edit::fresh(), 0, 2, "two".to_string(), |_| Some(2));
//!
//! assert_eq!(delta, SizeDelta::Grew);
//! assert_eq!(two.kind(), NodeKind::Indexed);
//! assert_eq!(one.get(0, 2, "two"), None);      // Original unchanged
//! assert_eq!(two.get(0, 2, "two"), Some(&2));  // New version
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub type ReferenceCounter<T> = std::rc::Rc<T>;

mod array;
pub mod bitwise;
mod edit;
mod invariant;
mod iter;
mod merge;
mod node;

pub use edit::Edit;
pub use edit::SizeDelta;
pub use invariant::InvariantViolation;
pub use iter::Entries;
pub use node::ArrayNode;
pub use node::CollisionNode;
pub use node::IndexedNode;
pub use node::LeafNode;
pub use node::Node;
pub use node::NodeKind;
pub use node::NodeRef;

impl<K, V> Node<K, V> {
    /// Returns an iterator over the bindings of this subtree, which holds
    /// `length` bindings.
    pub fn entries(&self, length: usize) -> Entries<'_, K, V> {
        Entries::new(self, length)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod reference_counter_tests {
    use super::ReferenceCounter;
    use rstest::rstest;

    #[rstest]
    fn test_reference_counter_get_mut_requires_unique_owner() {
        let mut reference_counter: ReferenceCounter<i32> = ReferenceCounter::new(42);
        assert!(ReferenceCounter::get_mut(&mut reference_counter).is_some());
        let reference_counter_clone = reference_counter.clone();
        assert!(ReferenceCounter::get_mut(&mut reference_counter).is_none());
        drop(reference_counter_clone);
        assert!(ReferenceCounter::get_mut(&mut reference_counter).is_some());
    }

    #[rstest]
    fn test_reference_counter_strong_count() {
        let reference_counter: ReferenceCounter<i32> = ReferenceCounter::new(42);
        assert_eq!(ReferenceCounter::strong_count(&reference_counter), 1);
        let reference_counter_clone = reference_counter.clone();
        assert_eq!(ReferenceCounter::strong_count(&reference_counter), 2);
        drop(reference_counter_clone);
        assert_eq!(ReferenceCounter::strong_count(&reference_counter), 1);
    }
}
