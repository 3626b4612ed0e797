//! Depth-first traversal of a subtree.

use smallvec::SmallVec;

use super::node::Node;

/// Iterator over the bindings of a subtree, in no particular order.
///
/// Pending nodes are kept on an explicit stack, so traversal does not recurse.
pub struct Entries<'a, K, V> {
    pending: SmallVec<[&'a Node<K, V>; 32]>,
    remaining: usize,
}

impl<'a, K, V> Entries<'a, K, V> {
    /// Creates an iterator over the subtree rooted at `root`, which is known to
    /// hold `length` bindings.
    pub(crate) fn new(root: &'a Node<K, V>, length: usize) -> Self {
        let mut pending = SmallVec::new();
        pending.push(root);
        Self {
            pending,
            remaining: length,
        }
    }
}

impl<'a, K, V> Iterator for Entries<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.pending.pop() {
            match node {
                Node::Empty => {}
                Node::Leaf(leaf) => {
                    self.remaining = self.remaining.saturating_sub(1);
                    return Some((&leaf.key, &leaf.value));
                }
                Node::Collision(collision) => {
                    self.pending.extend(collision.children.iter().rev().map(AsRef::as_ref));
                }
                Node::Indexed(indexed) => {
                    self.pending.extend(indexed.children.iter().rev().map(AsRef::as_ref));
                }
                Node::Array(array_node) => {
                    let occupied = array_node.children.iter().rev().flatten();
                    self.pending.extend(occupied.map(AsRef::as_ref));
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Entries<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hamt::{Edit, NodeRef};
    use rstest::rstest;
    use std::collections::HashSet;

    #[rstest]
    fn test_entries_visit_every_binding_once() {
        let edit = Edit::fresh();
        let mut root: NodeRef<u32, u32> = Node::empty();
        // Hashes repeat every 40 keys, so collisions appear alongside branches.
        for key in 0..200_u32 {
            root = Node::modify(root, edit, 0, key % 40, key, |_| Some(key * 2)).0;
        }

        let entries = Entries::new(&root, 200);
        assert_eq!(entries.len(), 200);
        let seen: HashSet<(u32, u32)> = entries.map(|(key, value)| (*key, *value)).collect();
        assert_eq!(seen.len(), 200);
        assert!(seen.iter().all(|(key, value)| *value == key * 2));
    }

    #[rstest]
    fn test_entries_of_empty_node() {
        let root: NodeRef<u32, u32> = Node::empty();
        assert_eq!(Entries::new(&root, 0).count(), 0);
    }
}
