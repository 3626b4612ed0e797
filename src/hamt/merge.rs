//! Subtree construction helpers: merging two entries that landed in the same
//! slot, and converting branches between the sparse and dense layouts.

use arrayvec::ArrayVec;
use tracing::trace;

use super::bitwise::{BITS_PER_LEVEL, BRANCHING_FACTOR, MAX_DEPTH, hash_fragment, to_bitmap};
use super::edit::Edit;
use super::node::{Node, NodeRef};

/// Builds the smallest subtree holding `first` and `second`, two leaf or
/// collision nodes that currently compete for the same slot at `shift`.
///
/// Identical hashes produce a collision node. Otherwise the hashes are
/// compared fragment by fragment starting at `shift`; every level on which
/// they agree becomes a single-child indexed node, and the first level on
/// which they differ holds both entries ordered by fragment.
///
/// The shared levels are recorded on an explicit stack rather than through
/// recursion, so the work is bounded by the number of fragments in a hash.
pub(crate) fn merge_leaves<K, V>(
    edit: Edit,
    shift: u32,
    first_hash: u32,
    first: NodeRef<K, V>,
    second_hash: u32,
    second: NodeRef<K, V>,
) -> NodeRef<K, V> {
    if first_hash == second_hash {
        trace!(hash = first_hash, "merged entries into collision node");
        return Node::collision(edit, first_hash, vec![first, second]);
    }

    // Fragments below `shift` already agree, so the hashes differ at some
    // level between `shift` and the last fragment.
    let mut shared_fragments: ArrayVec<u32, MAX_DEPTH> = ArrayVec::new();
    let mut current_shift = shift;
    let (first_fragment, second_fragment) = loop {
        let first_fragment = hash_fragment(current_shift, first_hash);
        let second_fragment = hash_fragment(current_shift, second_hash);
        if first_fragment != second_fragment || shared_fragments.is_full() {
            break (first_fragment, second_fragment);
        }
        shared_fragments.push(first_fragment);
        current_shift += BITS_PER_LEVEL;
    };

    let mask = to_bitmap(first_fragment) | to_bitmap(second_fragment);
    let children = if first_fragment < second_fragment {
        vec![first, second]
    } else {
        vec![second, first]
    };
    trace!(
        shift,
        depth = shared_fragments.len(),
        "merged entries into indexed node"
    );

    let mut merged = Node::indexed(edit, mask, children);
    while let Some(fragment) = shared_fragments.pop() {
        merged = Node::indexed(edit, to_bitmap(fragment), vec![merged]);
    }
    merged
}

/// Converts a dense array node into an indexed node.
///
/// `count` is the number of occupied slots once the child at `removed` is
/// dropped; that slot is skipped while scanning.
pub(crate) fn pack<K, V>(
    edit: Edit,
    count: usize,
    removed: usize,
    slots: &[Option<NodeRef<K, V>>],
) -> NodeRef<K, V> {
    let mut children = Vec::with_capacity(count);
    let mut bitmap = 0;
    for (index, slot) in slots.iter().enumerate() {
        if index == removed {
            continue;
        }
        if let Some(child) = slot.as_ref().filter(|child| !child.is_empty()) {
            children.push(NodeRef::clone(child));
            bitmap |= 1 << index;
        }
    }
    trace!(count = children.len(), "packed array node into indexed node");
    Node::indexed(edit, bitmap, children)
}

/// Converts a full indexed node into an array node, adding `child` at
/// `fragment`.
pub(crate) fn expand<K, V>(
    edit: Edit,
    fragment: u32,
    child: NodeRef<K, V>,
    bitmap: u32,
    children: &[NodeRef<K, V>],
) -> NodeRef<K, V> {
    let mut slots: Vec<Option<NodeRef<K, V>>> = vec![None; BRANCHING_FACTOR];
    let mut remaining = bitmap;
    let mut count = 0;
    for slot in &mut slots {
        if remaining == 0 {
            break;
        }
        if remaining & 1 == 1 {
            *slot = Some(NodeRef::clone(&children[count]));
            count += 1;
        }
        remaining >>= 1;
    }
    slots[fragment as usize] = Some(child);
    trace!(size = count + 1, "expanded indexed node into array node");
    Node::array(edit, count + 1, slots)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hamt::NodeKind;
    use rstest::rstest;

    fn leaf(edit: Edit, hash: u32, key: u32) -> NodeRef<u32, u32> {
        Node::leaf(edit, hash, key, key * 10)
    }

    #[rstest]
    fn test_merge_equal_hashes_builds_collision() {
        let edit = Edit::fresh();
        let merged = merge_leaves(edit, 0, 5, leaf(edit, 5, 1), 5, leaf(edit, 5, 2));
        let collision = merged.as_collision().expect("collision node");
        assert_eq!(collision.hash(), 5);
        assert_eq!(collision.len(), 2);
    }

    #[rstest]
    #[case(3, 17)]
    #[case(17, 3)]
    fn test_merge_orders_children_by_fragment(#[case] first_hash: u32, #[case] second_hash: u32) {
        let edit = Edit::fresh();
        let merged = merge_leaves(
            edit,
            0,
            first_hash,
            leaf(edit, first_hash, first_hash),
            second_hash,
            leaf(edit, second_hash, second_hash),
        );
        let indexed = merged.as_indexed().expect("indexed node");
        assert_eq!(indexed.mask(), to_bitmap(3) | to_bitmap(17));
        let keys: Vec<u32> = indexed
            .children
            .iter()
            .filter_map(|child| child.as_leaf().map(|leaf| *leaf.key()))
            .collect();
        assert_eq!(keys, vec![3, 17]);
    }

    #[rstest]
    fn test_merge_wraps_shared_levels() {
        let edit = Edit::fresh();
        // Identical in the first six fragments, different in the last one.
        let first_hash = 0x0000_0001;
        let second_hash = 0x4000_0001;
        let merged = merge_leaves(
            edit,
            0,
            first_hash,
            leaf(edit, first_hash, 1),
            second_hash,
            leaf(edit, second_hash, 2),
        );

        let mut node = &merged;
        let mut depth = 0;
        while let Some(indexed) = node.as_indexed() {
            if indexed.len() == 2 {
                break;
            }
            assert_eq!(indexed.len(), 1);
            node = &indexed.children[0];
            depth += 1;
        }
        assert_eq!(depth, 6);
        assert_eq!(node.kind(), NodeKind::Indexed);
        assert_eq!(merged.get(0, first_hash, &1), Some(&10));
        assert_eq!(merged.get(0, second_hash, &2), Some(&20));
    }

    #[rstest]
    fn test_merge_starting_below_root() {
        let edit = Edit::fresh();
        let first_hash = 0b00001_00011;
        let second_hash = 0b00010_00011;
        let merged = merge_leaves(
            edit,
            BITS_PER_LEVEL,
            first_hash,
            leaf(edit, first_hash, 1),
            second_hash,
            leaf(edit, second_hash, 2),
        );
        let indexed = merged.as_indexed().expect("indexed node");
        assert_eq!(indexed.mask(), to_bitmap(1) | to_bitmap(2));
    }

    #[rstest]
    fn test_expand_places_children_at_fragments() {
        let edit = Edit::fresh();
        let fragments = [0_u32, 4, 9, 31];
        let children: Vec<_> = fragments
            .iter()
            .map(|&fragment| leaf(edit, fragment, fragment))
            .collect();
        let bitmap = fragments.iter().fold(0, |mask, &fragment| mask | to_bitmap(fragment));

        let expanded = expand(edit, 12, leaf(edit, 12, 12), bitmap, &children);
        let array_node = expanded.as_array().expect("array node");
        assert_eq!(array_node.size(), 5);
        for fragment in [0_usize, 4, 9, 12, 31] {
            let key = array_node.children[fragment]
                .as_ref()
                .and_then(|child| child.as_leaf().map(|leaf| *leaf.key()));
            assert_eq!(key, Some(fragment as u32));
        }
        assert_eq!(array_node.children.iter().flatten().count(), 5);
    }

    #[rstest]
    fn test_pack_skips_removed_and_empty_slots() {
        let edit = Edit::fresh();
        let mut slots: Vec<Option<NodeRef<u32, u32>>> = vec![None; BRANCHING_FACTOR];
        for fragment in [1_u32, 5, 6, 20] {
            slots[fragment as usize] = Some(leaf(edit, fragment, fragment));
        }

        let packed = pack(edit, 3, 5, &slots);
        let indexed = packed.as_indexed().expect("indexed node");
        assert_eq!(indexed.mask(), to_bitmap(1) | to_bitmap(6) | to_bitmap(20));
        assert_eq!(indexed.len(), 3);
    }
}
