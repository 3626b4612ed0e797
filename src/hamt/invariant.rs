//! Structural invariant checking.
//!
//! Updates never fail, but a tree built by hand or corrupted by a bug can break
//! the layout rules that lookups depend on. [`Node::check_invariants`] walks a
//! subtree and reports the first rule it finds broken.

use thiserror::Error;

use super::bitwise::{
    BITS_PER_LEVEL, BRANCHING_FACTOR, MAX_INDEX_NODE, MIN_ARRAY_NODE, hash_fragment,
};
use super::node::{Node, NodeKind};

/// A broken structural rule of the trie.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// An indexed node whose bitmap does not describe its children.
    #[error("indexed node bitmap {mask:#034b} has {expected} bits set but {actual} children")]
    BitmapMismatch {
        /// The node's bitmap.
        mask: u32,
        /// Number of set bits.
        expected: usize,
        /// Number of children.
        actual: usize,
    },

    /// An indexed node holding more children than allowed before expansion.
    #[error("indexed node holds {children} children, more than {max}", max = MAX_INDEX_NODE)]
    OversizedIndexed {
        /// Number of children.
        children: usize,
    },

    /// An array node whose recorded size differs from its occupied slots.
    #[error("array node records size {recorded} but has {actual} occupied slots")]
    ArraySizeMismatch {
        /// The node's recorded size.
        recorded: usize,
        /// Number of occupied slots.
        actual: usize,
    },

    /// An array node that should have been packed into an indexed node.
    #[error("array node holds {size} children, at most {min}", min = MIN_ARRAY_NODE)]
    UndersizedArray {
        /// Number of occupied slots.
        size: usize,
    },

    /// An array node without one slot per fragment.
    #[error("array node has {slots} slots instead of {width}", width = BRANCHING_FACTOR)]
    ArrayWidthMismatch {
        /// Number of slots.
        slots: usize,
    },

    /// A collision node holding fewer than two bindings.
    #[error("collision node holds {children} bindings")]
    DegenerateCollision {
        /// Number of bindings.
        children: usize,
    },

    /// A collision node containing something other than a leaf.
    #[error("collision node contains a {kind:?} node")]
    NonLeafInCollision {
        /// Kind of the offending child.
        kind: NodeKind,
    },

    /// A collision binding whose hash differs from the node's hash.
    #[error("collision node with hash {expected:#010x} contains hash {actual:#010x}")]
    CollisionHashMismatch {
        /// The node's hash.
        expected: u32,
        /// The binding's hash.
        actual: u32,
    },

    /// Two bindings in one collision node with equal keys.
    #[error("collision node with hash {hash:#010x} contains a duplicate key")]
    DuplicateKey {
        /// The node's hash.
        hash: u32,
    },

    /// An empty node stored as a branch child.
    #[error("branch at shift {shift} stores an empty child in slot {slot}")]
    EmptyChild {
        /// Depth of the branch.
        shift: u32,
        /// Logical slot of the child.
        slot: u32,
    },

    /// A binding reachable through a slot its hash does not select.
    #[error("hash {hash:#010x} is stored under slot {slot} at shift {shift}")]
    MisplacedEntry {
        /// Hash of the binding.
        hash: u32,
        /// Depth of the branch.
        shift: u32,
        /// Slot the binding was found under.
        slot: u32,
    },

    /// A map whose recorded length differs from the number of bindings.
    #[error("map records length {recorded} but holds {actual} bindings")]
    LengthMismatch {
        /// The recorded length.
        recorded: usize,
        /// Number of reachable bindings.
        actual: usize,
    },
}

impl<K: Eq, V> Node<K, V> {
    /// Checks the layout rules of the subtree rooted at this node, which sits
    /// at depth `shift`, and returns the number of bindings it holds.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    pub fn check_invariants(&self, shift: u32) -> Result<usize, InvariantViolation> {
        let mut hashes = Vec::new();
        self.collect_checked(shift, &mut hashes)?;
        Ok(hashes.len())
    }

    /// Checks this subtree and appends the hash of every binding to `hashes`.
    fn collect_checked(&self, shift: u32, hashes: &mut Vec<u32>) -> Result<(), InvariantViolation> {
        match self {
            Self::Empty => Ok(()),
            Self::Leaf(leaf) => {
                hashes.push(leaf.hash);
                Ok(())
            }
            Self::Collision(collision) => {
                if collision.children.len() < 2 {
                    return Err(InvariantViolation::DegenerateCollision {
                        children: collision.children.len(),
                    });
                }
                for (position, child) in collision.children.iter().enumerate() {
                    let Some(leaf) = child.as_leaf() else {
                        return Err(InvariantViolation::NonLeafInCollision { kind: child.kind() });
                    };
                    if leaf.hash != collision.hash {
                        return Err(InvariantViolation::CollisionHashMismatch {
                            expected: collision.hash,
                            actual: leaf.hash,
                        });
                    }
                    let duplicate = collision.children[position + 1..]
                        .iter()
                        .filter_map(|other| other.as_leaf())
                        .any(|other| other.key == leaf.key);
                    if duplicate {
                        return Err(InvariantViolation::DuplicateKey {
                            hash: collision.hash,
                        });
                    }
                    hashes.push(leaf.hash);
                }
                Ok(())
            }
            Self::Indexed(indexed) => {
                let expected = indexed.mask.count_ones() as usize;
                if expected != indexed.children.len() {
                    return Err(InvariantViolation::BitmapMismatch {
                        mask: indexed.mask,
                        expected,
                        actual: indexed.children.len(),
                    });
                }
                if indexed.children.len() > MAX_INDEX_NODE {
                    return Err(InvariantViolation::OversizedIndexed {
                        children: indexed.children.len(),
                    });
                }
                let slots = (0..BRANCHING_FACTOR as u32)
                    .filter(|slot| indexed.mask & (1 << slot) != 0);
                for (slot, child) in slots.zip(&indexed.children) {
                    Self::check_child(child, shift, slot, hashes)?;
                }
                Ok(())
            }
            Self::Array(array_node) => {
                if array_node.children.len() != BRANCHING_FACTOR {
                    return Err(InvariantViolation::ArrayWidthMismatch {
                        slots: array_node.children.len(),
                    });
                }
                let actual = array_node.children.iter().flatten().count();
                if actual != array_node.size {
                    return Err(InvariantViolation::ArraySizeMismatch {
                        recorded: array_node.size,
                        actual,
                    });
                }
                if array_node.size <= MIN_ARRAY_NODE {
                    return Err(InvariantViolation::UndersizedArray {
                        size: array_node.size,
                    });
                }
                for (slot, child) in (0..).zip(&array_node.children) {
                    if let Some(child) = child {
                        Self::check_child(child, shift, slot, hashes)?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Checks a branch child found under `slot` of a branch at `shift`.
    fn check_child(
        child: &Self,
        shift: u32,
        slot: u32,
        hashes: &mut Vec<u32>,
    ) -> Result<(), InvariantViolation> {
        if child.is_empty() {
            return Err(InvariantViolation::EmptyChild { shift, slot });
        }
        let start = hashes.len();
        child.collect_checked(shift + BITS_PER_LEVEL, hashes)?;
        match hashes[start..]
            .iter()
            .find(|&&hash| hash_fragment(shift, hash) != slot)
        {
            Some(&hash) => Err(InvariantViolation::MisplacedEntry { hash, shift, slot }),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hamt::bitwise::to_bitmap;
    use crate::hamt::{Edit, NodeRef};
    use rstest::rstest;

    fn leaf(edit: Edit, hash: u32, key: u32) -> NodeRef<u32, u32> {
        Node::leaf(edit, hash, key, key)
    }

    #[rstest]
    fn test_well_formed_tree_reports_count() {
        let edit = Edit::fresh();
        let mut root: NodeRef<u32, u32> = Node::empty();
        for key in 0..500_u32 {
            let hash = key.wrapping_mul(0x9E37_79B9);
            root = Node::modify(root, edit, 0, hash, key, |_| Some(key)).0;
        }
        assert_eq!(root.check_invariants(0), Ok(500));
    }

    #[rstest]
    fn test_bitmap_mismatch_is_reported() {
        let edit = Edit::fresh();
        let node = Node::indexed(edit, to_bitmap(1) | to_bitmap(2), vec![leaf(edit, 1, 1)]);
        assert_eq!(
            node.check_invariants(0),
            Err(InvariantViolation::BitmapMismatch {
                mask: 0b110,
                expected: 2,
                actual: 1,
            })
        );
    }

    #[rstest]
    fn test_misplaced_entry_is_reported() {
        let edit = Edit::fresh();
        let node = Node::indexed(edit, to_bitmap(3), vec![leaf(edit, 4, 4)]);
        assert_eq!(
            node.check_invariants(0),
            Err(InvariantViolation::MisplacedEntry {
                hash: 4,
                shift: 0,
                slot: 3,
            })
        );
    }

    #[rstest]
    fn test_degenerate_collision_is_reported() {
        let edit = Edit::fresh();
        let node = Node::collision(edit, 9, vec![leaf(edit, 9, 1)]);
        assert_eq!(
            node.check_invariants(0),
            Err(InvariantViolation::DegenerateCollision { children: 1 })
        );
    }

    #[rstest]
    fn test_duplicate_collision_key_is_reported() {
        let edit = Edit::fresh();
        let node = Node::collision(edit, 9, vec![leaf(edit, 9, 1), leaf(edit, 9, 1)]);
        assert_eq!(
            node.check_invariants(0),
            Err(InvariantViolation::DuplicateKey { hash: 9 })
        );
    }

    #[rstest]
    fn test_empty_child_is_reported() {
        let edit = Edit::fresh();
        let node: NodeRef<u32, u32> = Node::indexed(edit, to_bitmap(0), vec![Node::empty()]);
        assert_eq!(
            node.check_invariants(0),
            Err(InvariantViolation::EmptyChild { shift: 0, slot: 0 })
        );
    }

    #[rstest]
    fn test_undersized_array_is_reported() {
        let edit = Edit::fresh();
        let mut slots: Vec<Option<NodeRef<u32, u32>>> = vec![None; BRANCHING_FACTOR];
        slots[2] = Some(leaf(edit, 2, 2));
        let node = Node::array(edit, 1, slots);
        assert_eq!(
            node.check_invariants(0),
            Err(InvariantViolation::UndersizedArray { size: 1 })
        );
    }

    #[rstest]
    fn test_error_messages_are_descriptive() {
        let message = InvariantViolation::LengthMismatch {
            recorded: 3,
            actual: 2,
        }
        .to_string();
        assert_eq!(message, "map records length 3 but holds 2 bindings");
    }
}
