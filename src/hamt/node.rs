//! Node variants of the trie and the `modify` operation.
//!
//! A trie is a tree of [`Node`]s shared through [`NodeRef`]. Every update is
//! expressed as a single operation, [`Node::modify`], which applies an update
//! function to the value currently bound to a key and returns the tree that
//! reflects the result together with a [`SizeDelta`].
//!
//! # Transient editing
//!
//! Every node records the [`Edit`] token it was created under. `modify`
//! rewrites a node in place only when both of the following hold:
//!
//! - the caller's token equals the node's token, and
//! - the caller holds the only reference to the node.
//!
//! Any other node is copied, so a snapshot held elsewhere never observes a
//! change.

use std::borrow::Borrow;
use std::ops::Deref;

use tracing::trace;

use super::ReferenceCounter;
use super::array;
use super::bitwise::{
    BITS_PER_LEVEL, MAX_INDEX_NODE, MIN_ARRAY_NODE, from_bitmap, hash_fragment, to_bitmap,
};
use super::edit::{Edit, SizeDelta};
use super::merge::{expand, merge_leaves, pack};

/// Shared handle to a trie node.
pub type NodeRef<K, V> = ReferenceCounter<Node<K, V>>;

// =============================================================================
// Node Definition
// =============================================================================

/// A node of the hash array mapped trie.
#[derive(Clone, Debug)]
pub enum Node<K, V> {
    /// No binding.
    Empty,
    /// A single binding.
    Leaf(LeafNode<K, V>),
    /// Two or more bindings whose hashes are identical.
    Collision(CollisionNode<K, V>),
    /// A sparse branch: a bitmap plus a compacted children array.
    Indexed(IndexedNode<K, V>),
    /// A dense branch addressed directly by hash fragment.
    Array(ArrayNode<K, V>),
}

/// Tag of a [`Node`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// [`Node::Empty`]
    Empty,
    /// [`Node::Leaf`]
    Leaf,
    /// [`Node::Collision`]
    Collision,
    /// [`Node::Indexed`]
    Indexed,
    /// [`Node::Array`]
    Array,
}

/// A single key-value binding.
#[derive(Clone, Debug)]
pub struct LeafNode<K, V> {
    pub(crate) edit: Edit,
    pub(crate) hash: u32,
    pub(crate) key: K,
    pub(crate) value: V,
}

/// Leaves sharing one full hash, scanned linearly by key.
#[derive(Clone, Debug)]
pub struct CollisionNode<K, V> {
    pub(crate) edit: Edit,
    pub(crate) hash: u32,
    /// Always [`Node::Leaf`] entries, at least two of them.
    pub(crate) children: Vec<NodeRef<K, V>>,
}

/// Bitmap-indexed branch.
///
/// `mask.count_ones() == children.len()`, and the child for logical slot `i`
/// lives at the number of set bits below `i`.
#[derive(Clone, Debug)]
pub struct IndexedNode<K, V> {
    pub(crate) edit: Edit,
    pub(crate) mask: u32,
    pub(crate) children: Vec<NodeRef<K, V>>,
}

/// Dense branch with one slot per hash fragment.
///
/// `size` counts the occupied slots.
#[derive(Clone, Debug)]
pub struct ArrayNode<K, V> {
    pub(crate) edit: Edit,
    pub(crate) size: usize,
    pub(crate) children: Vec<Option<NodeRef<K, V>>>,
}

// =============================================================================
// Accessors
// =============================================================================

impl<K, V> LeafNode<K, V> {
    /// Returns the hash of the key.
    #[inline]
    pub const fn hash(&self) -> u32 {
        self.hash
    }

    /// Returns the key.
    #[inline]
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// Returns the value.
    #[inline]
    pub const fn value(&self) -> &V {
        &self.value
    }
}

impl<K, V> CollisionNode<K, V> {
    /// Returns the hash shared by every binding.
    #[inline]
    pub const fn hash(&self) -> u32 {
        self.hash
    }

    /// Returns the number of bindings.
    #[inline]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Always `false`; a collision node holds at least two bindings.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Iterates over the bindings in insertion order.
    pub fn leaves(&self) -> impl Iterator<Item = &LeafNode<K, V>> {
        self.children.iter().filter_map(|child| child.as_leaf())
    }
}

impl<K, V> IndexedNode<K, V> {
    /// Returns the occupancy bitmap.
    #[inline]
    pub const fn mask(&self) -> u32 {
        self.mask
    }

    /// Returns the number of children.
    #[inline]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if the node has no children.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns the sibling to collapse into when the child at `index` is
    /// removed from a two-child node and that sibling holds no branches.
    fn collapse_target(&self, index: usize) -> Option<NodeRef<K, V>> {
        if self.children.len() != 2 {
            return None;
        }
        let sibling = &self.children[index ^ 1];
        sibling.is_leaf_like().then(|| ReferenceCounter::clone(sibling))
    }
}

impl<K, V> ArrayNode<K, V> {
    /// Returns the number of occupied slots.
    #[inline]
    pub const fn size(&self) -> usize {
        self.size
    }
}

impl<K, V> Node<K, V> {
    /// Returns the variant tag.
    #[inline]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Empty => NodeKind::Empty,
            Self::Leaf(_) => NodeKind::Leaf,
            Self::Collision(_) => NodeKind::Collision,
            Self::Indexed(_) => NodeKind::Indexed,
            Self::Array(_) => NodeKind::Array,
        }
    }

    /// Returns the token the node was created under; `None` for
    /// [`Node::Empty`].
    #[inline]
    pub const fn edit(&self) -> Option<Edit> {
        match self {
            Self::Empty => None,
            Self::Leaf(leaf) => Some(leaf.edit),
            Self::Collision(collision) => Some(collision.edit),
            Self::Indexed(indexed) => Some(indexed.edit),
            Self::Array(array_node) => Some(array_node.edit),
        }
    }

    /// Returns `true` for [`Node::Empty`].
    #[inline]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns `true` for nodes without branch children: empty, leaf and
    /// collision nodes.
    #[inline]
    pub const fn is_leaf_like(&self) -> bool {
        matches!(self, Self::Empty | Self::Leaf(_) | Self::Collision(_))
    }

    /// Returns the leaf payload, if this is a leaf.
    #[inline]
    pub const fn as_leaf(&self) -> Option<&LeafNode<K, V>> {
        match self {
            Self::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// Returns the collision payload, if this is a collision node.
    #[inline]
    pub const fn as_collision(&self) -> Option<&CollisionNode<K, V>> {
        match self {
            Self::Collision(collision) => Some(collision),
            _ => None,
        }
    }

    /// Returns the indexed payload, if this is an indexed node.
    #[inline]
    pub const fn as_indexed(&self) -> Option<&IndexedNode<K, V>> {
        match self {
            Self::Indexed(indexed) => Some(indexed),
            _ => None,
        }
    }

    /// Returns the array payload, if this is an array node.
    #[inline]
    pub const fn as_array(&self) -> Option<&ArrayNode<K, V>> {
        match self {
            Self::Array(array_node) => Some(array_node),
            _ => None,
        }
    }

    /// Creates a shared empty node.
    #[must_use]
    pub fn empty() -> NodeRef<K, V> {
        ReferenceCounter::new(Self::Empty)
    }

    pub(crate) fn leaf(edit: Edit, hash: u32, key: K, value: V) -> NodeRef<K, V> {
        ReferenceCounter::new(Self::Leaf(LeafNode {
            edit,
            hash,
            key,
            value,
        }))
    }

    pub(crate) fn collision(edit: Edit, hash: u32, children: Vec<NodeRef<K, V>>) -> NodeRef<K, V> {
        ReferenceCounter::new(Self::Collision(CollisionNode {
            edit,
            hash,
            children,
        }))
    }

    pub(crate) fn indexed(edit: Edit, mask: u32, children: Vec<NodeRef<K, V>>) -> NodeRef<K, V> {
        ReferenceCounter::new(Self::Indexed(IndexedNode {
            edit,
            mask,
            children,
        }))
    }

    pub(crate) fn array(
        edit: Edit,
        size: usize,
        children: Vec<Option<NodeRef<K, V>>>,
    ) -> NodeRef<K, V> {
        ReferenceCounter::new(Self::Array(ArrayNode {
            edit,
            size,
            children,
        }))
    }

    /// Returns mutable access to the node behind `slot` when `edit` owns it
    /// and nothing else references it.
    fn exclusive_mut(slot: &mut NodeRef<K, V>, edit: Edit) -> Option<&mut Self> {
        if slot.edit() == Some(edit) {
            ReferenceCounter::get_mut(slot)
        } else {
            None
        }
    }
}

// =============================================================================
// Lookup
// =============================================================================

impl<K, V> Node<K, V> {
    /// Returns the value bound to `key` in the subtree rooted at this node,
    /// which sits at depth `shift`.
    ///
    /// `hash` must be the hash of `key`.
    pub fn get<Q>(&self, shift: u32, hash: u32, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.get_key_value(shift, hash, key).map(|(_, value)| value)
    }

    /// Returns the stored key and the value bound to `key`.
    pub fn get_key_value<Q>(&self, shift: u32, hash: u32, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let mut node = self;
        let mut shift = shift;
        loop {
            match node {
                Self::Empty => return None,
                Self::Leaf(leaf) => {
                    return (leaf.hash == hash && leaf.key.borrow() == key)
                        .then_some((&leaf.key, &leaf.value));
                }
                Self::Collision(collision) => {
                    if collision.hash != hash {
                        return None;
                    }
                    return collision
                        .leaves()
                        .find(|leaf| leaf.key.borrow() == key)
                        .map(|leaf| (&leaf.key, &leaf.value));
                }
                Self::Indexed(indexed) => {
                    let bit = to_bitmap(hash_fragment(shift, hash));
                    if indexed.mask & bit == 0 {
                        return None;
                    }
                    node = indexed.children[from_bitmap(indexed.mask, bit)].as_ref();
                }
                Self::Array(array_node) => {
                    match &array_node.children[hash_fragment(shift, hash) as usize] {
                        Some(child) => node = child.as_ref(),
                        None => return None,
                    }
                }
            }
            shift += BITS_PER_LEVEL;
        }
    }
}

// =============================================================================
// Modify
// =============================================================================

/// How a `modify` step may treat the node it visits.
enum Access<'a, T> {
    /// Owned by the caller's edit session; edits happen in place.
    Exclusive(&'a mut T),
    /// Possibly observed elsewhere; edits produce a new node.
    Shared(&'a T),
}

impl<T> Deref for Access<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            Self::Exclusive(node) => node,
            Self::Shared(node) => node,
        }
    }
}

/// What happens to the visited slot after a `modify` step.
enum Rewrite<K, V> {
    /// The slot keeps its node, either untouched or edited in place.
    Keep,
    /// The slot receives a different node.
    Replace(NodeRef<K, V>),
    /// The slot's node and `incoming` landed in the same position and must be
    /// merged into a subtree.
    Merge {
        existing_hash: u32,
        incoming: NodeRef<K, V>,
    },
}

type Step<K, V> = (SizeDelta, Rewrite<K, V>);

impl<K: Eq + Clone, V: Clone> Node<K, V> {
    /// Applies `update` to the value bound to `key` and returns the resulting
    /// tree.
    ///
    /// `update` receives the current value (`None` if `key` is unbound) and is
    /// called exactly once. Returning `Some` binds the key to the new value;
    /// returning `None` removes the binding, or does nothing if there was none.
    ///
    /// When nothing changes the returned node is `node` itself. Nodes stamped
    /// with `edit` and not referenced elsewhere are rewritten in place; all
    /// other nodes are left untouched and copied along the update path.
    ///
    /// # Arguments
    ///
    /// * `node` - Root of the subtree
    /// * `edit` - Token of the calling edit session
    /// * `shift` - Depth of `node`, in bits of hash consumed
    /// * `hash` - Hash of `key`
    /// * `key` - The key to update
    /// * `update` - Maps the current value to the new one
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::hamt::{Edit, Node, NodeKind, ReferenceCounter, SizeDelta};
    ///
    /// let root = Node::<&str, i32>::empty();
    /// let (root, delta) = Node::modify(root, Edit::fresh(), 0, 7, "a", |_| Some(1));
    /// assert_eq!(delta, SizeDelta::Grew);
    /// assert_eq!(root.kind(), NodeKind::Leaf);
    /// assert_eq!(root.get(0, 7, "a"), Some(&1));
    ///
    /// let (same, delta) = Node::modify(root.clone(), Edit::fresh(), 0, 9, "b", |_| None);
    /// assert_eq!(delta, SizeDelta::Unchanged);
    /// assert!(ReferenceCounter::ptr_eq(&same, &root));
    /// ```
    pub fn modify<F>(
        mut node: NodeRef<K, V>,
        edit: Edit,
        shift: u32,
        hash: u32,
        key: K,
        update: F,
    ) -> (NodeRef<K, V>, SizeDelta)
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let delta = Self::modify_in_place(&mut node, edit, shift, hash, key, update);
        (node, delta)
    }

    /// Same as [`Node::modify`], but replaces the content of `slot` with the
    /// resulting tree.
    pub fn modify_in_place<F>(
        slot: &mut NodeRef<K, V>,
        edit: Edit,
        shift: u32,
        hash: u32,
        key: K,
        update: F,
    ) -> SizeDelta
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let (delta, rewrite) = if let Some(node) = Self::exclusive_mut(slot, edit) {
            match node {
                Self::Empty => Self::modify_empty(edit, hash, key, update),
                Self::Leaf(leaf) => {
                    LeafNode::modify(Access::Exclusive(leaf), edit, hash, key, update)
                }
                Self::Collision(collision) => {
                    CollisionNode::modify(Access::Exclusive(collision), edit, hash, key, update)
                }
                Self::Indexed(indexed) => {
                    IndexedNode::modify(Access::Exclusive(indexed), edit, shift, hash, key, update)
                }
                Self::Array(array_node) => {
                    ArrayNode::modify(Access::Exclusive(array_node), edit, shift, hash, key, update)
                }
            }
        } else {
            match &**slot {
                Self::Empty => Self::modify_empty(edit, hash, key, update),
                Self::Leaf(leaf) => LeafNode::modify(Access::Shared(leaf), edit, hash, key, update),
                Self::Collision(collision) => {
                    CollisionNode::modify(Access::Shared(collision), edit, hash, key, update)
                }
                Self::Indexed(indexed) => {
                    IndexedNode::modify(Access::Shared(indexed), edit, shift, hash, key, update)
                }
                Self::Array(array_node) => {
                    ArrayNode::modify(Access::Shared(array_node), edit, shift, hash, key, update)
                }
            }
        };

        match rewrite {
            Rewrite::Keep => {}
            Rewrite::Replace(node) => *slot = node,
            Rewrite::Merge {
                existing_hash,
                incoming,
            } => {
                let existing = ReferenceCounter::clone(slot);
                *slot = merge_leaves(edit, shift, existing_hash, existing, hash, incoming);
            }
        }
        delta
    }

    /// Builds the leaf an empty position turns into, if `update` binds a value.
    fn leaf_from_update<F>(edit: Edit, hash: u32, key: K, update: F) -> Option<NodeRef<K, V>>
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        update(None).map(|value| Self::leaf(edit, hash, key, value))
    }

    fn modify_empty<F>(edit: Edit, hash: u32, key: K, update: F) -> Step<K, V>
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        match Self::leaf_from_update(edit, hash, key, update) {
            Some(leaf) => (SizeDelta::Grew, Rewrite::Replace(leaf)),
            None => (SizeDelta::Unchanged, Rewrite::Keep),
        }
    }

    /// Handles a key that does not belong to the visited leaf or collision
    /// node.
    fn modify_absent<F>(existing_hash: u32, edit: Edit, hash: u32, key: K, update: F) -> Step<K, V>
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        match Self::leaf_from_update(edit, hash, key, update) {
            Some(incoming) => (
                SizeDelta::Grew,
                Rewrite::Merge {
                    existing_hash,
                    incoming,
                },
            ),
            None => (SizeDelta::Unchanged, Rewrite::Keep),
        }
    }
}

impl<K: Eq + Clone, V: Clone> LeafNode<K, V> {
    fn modify<F>(this: Access<'_, Self>, edit: Edit, hash: u32, key: K, update: F) -> Step<K, V>
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        if this.key != key {
            return Node::modify_absent(this.hash, edit, hash, key, update);
        }

        let updated = update(Some(&this.value));
        match (updated, this) {
            (None, _) => (SizeDelta::Shrunk, Rewrite::Replace(Node::empty())),
            (Some(value), Access::Exclusive(leaf)) => {
                leaf.value = value;
                (SizeDelta::Unchanged, Rewrite::Keep)
            }
            (Some(value), Access::Shared(_)) => (
                SizeDelta::Unchanged,
                Rewrite::Replace(Node::leaf(edit, hash, key, value)),
            ),
        }
    }
}

impl<K: Eq + Clone, V: Clone> CollisionNode<K, V> {
    fn modify<F>(this: Access<'_, Self>, edit: Edit, hash: u32, key: K, update: F) -> Step<K, V>
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        if hash != this.hash {
            return Node::modify_absent(this.hash, edit, hash, key, update);
        }

        let position = this
            .children
            .iter()
            .position(|child| child.as_leaf().is_some_and(|leaf| leaf.key == key));

        let Some(index) = position else {
            let Some(leaf) = Node::leaf_from_update(edit, hash, key, update) else {
                return (SizeDelta::Unchanged, Rewrite::Keep);
            };
            let end = this.children.len();
            return match this {
                Access::Exclusive(collision) => {
                    array::update_in_place(&mut collision.children, end, leaf);
                    (SizeDelta::Grew, Rewrite::Keep)
                }
                Access::Shared(collision) => (
                    SizeDelta::Grew,
                    Rewrite::Replace(Node::collision(
                        edit,
                        hash,
                        array::update(&collision.children, end, leaf),
                    )),
                ),
            };
        };

        let current = this.children[index].as_leaf().map(|leaf| &leaf.value);
        match update(current) {
            None if this.children.len() == 2 => {
                trace!(hash, "collapsed collision node into its remaining leaf");
                let survivor = ReferenceCounter::clone(&this.children[index ^ 1]);
                (SizeDelta::Shrunk, Rewrite::Replace(survivor))
            }
            None => match this {
                Access::Exclusive(collision) => {
                    array::splice_out_in_place(&mut collision.children, index);
                    (SizeDelta::Shrunk, Rewrite::Keep)
                }
                Access::Shared(collision) => (
                    SizeDelta::Shrunk,
                    Rewrite::Replace(Node::collision(
                        edit,
                        hash,
                        array::splice_out(&collision.children, index),
                    )),
                ),
            },
            Some(value) => {
                let leaf = Node::leaf(edit, hash, key, value);
                match this {
                    Access::Exclusive(collision) => {
                        array::update_in_place(&mut collision.children, index, leaf);
                        (SizeDelta::Unchanged, Rewrite::Keep)
                    }
                    Access::Shared(collision) => (
                        SizeDelta::Unchanged,
                        Rewrite::Replace(Node::collision(
                            edit,
                            hash,
                            array::update(&collision.children, index, leaf),
                        )),
                    ),
                }
            }
        }
    }
}

impl<K: Eq + Clone, V: Clone> IndexedNode<K, V> {
    fn modify<F>(
        this: Access<'_, Self>,
        edit: Edit,
        shift: u32,
        hash: u32,
        key: K,
        update: F,
    ) -> Step<K, V>
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let fragment = hash_fragment(shift, hash);
        let bit = to_bitmap(fragment);
        let index = from_bitmap(this.mask, bit);

        if this.mask & bit == 0 {
            let Some(child) = Node::leaf_from_update(edit, hash, key, update) else {
                return (SizeDelta::Unchanged, Rewrite::Keep);
            };
            if this.children.len() >= MAX_INDEX_NODE {
                let expanded = expand(edit, fragment, child, this.mask, &this.children);
                return (SizeDelta::Grew, Rewrite::Replace(expanded));
            }
            return match this {
                Access::Exclusive(indexed) => {
                    array::splice_in_in_place(&mut indexed.children, index, child);
                    indexed.mask |= bit;
                    (SizeDelta::Grew, Rewrite::Keep)
                }
                Access::Shared(indexed) => (
                    SizeDelta::Grew,
                    Rewrite::Replace(Node::indexed(
                        edit,
                        indexed.mask | bit,
                        array::splice_in(&indexed.children, index, child),
                    )),
                ),
            };
        }

        let child_shift = shift + BITS_PER_LEVEL;
        match this {
            Access::Exclusive(indexed) => {
                let child = &mut indexed.children[index];
                let before = ReferenceCounter::as_ptr(child);
                let delta = Node::modify_in_place(child, edit, child_shift, hash, key, update);
                if std::ptr::eq(before, ReferenceCounter::as_ptr(child)) || !child.is_empty() {
                    return (delta, Rewrite::Keep);
                }

                let mask = indexed.mask & !bit;
                if mask == 0 {
                    return (delta, Rewrite::Replace(Node::empty()));
                }
                if let Some(sibling) = indexed.collapse_target(index) {
                    return (delta, Rewrite::Replace(sibling));
                }
                array::splice_out_in_place(&mut indexed.children, index);
                indexed.mask = mask;
                (delta, Rewrite::Keep)
            }
            Access::Shared(indexed) => {
                let current = &indexed.children[index];
                let mut child = ReferenceCounter::clone(current);
                let delta = Node::modify_in_place(&mut child, edit, child_shift, hash, key, update);
                if ReferenceCounter::ptr_eq(&child, current) {
                    return (delta, Rewrite::Keep);
                }

                if !child.is_empty() {
                    let children = array::update(&indexed.children, index, child);
                    return (delta, Rewrite::Replace(Node::indexed(edit, indexed.mask, children)));
                }

                let mask = indexed.mask & !bit;
                if mask == 0 {
                    return (delta, Rewrite::Replace(Node::empty()));
                }
                if let Some(sibling) = indexed.collapse_target(index) {
                    return (delta, Rewrite::Replace(sibling));
                }
                let children = array::splice_out(&indexed.children, index);
                (delta, Rewrite::Replace(Node::indexed(edit, mask, children)))
            }
        }
    }
}

impl<K: Eq + Clone, V: Clone> ArrayNode<K, V> {
    fn modify<F>(
        this: Access<'_, Self>,
        edit: Edit,
        shift: u32,
        hash: u32,
        key: K,
        update: F,
    ) -> Step<K, V>
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let fragment = hash_fragment(shift, hash) as usize;
        let child_shift = shift + BITS_PER_LEVEL;

        match this {
            Access::Exclusive(array_node) => {
                let Some(child) = &mut array_node.children[fragment] else {
                    let Some(leaf) = Node::leaf_from_update(edit, hash, key, update) else {
                        return (SizeDelta::Unchanged, Rewrite::Keep);
                    };
                    array::update_in_place(&mut array_node.children, fragment, Some(leaf));
                    array_node.size += 1;
                    return (SizeDelta::Grew, Rewrite::Keep);
                };

                let before = ReferenceCounter::as_ptr(child);
                let delta = Node::modify_in_place(child, edit, child_shift, hash, key, update);
                if std::ptr::eq(before, ReferenceCounter::as_ptr(child)) || !child.is_empty() {
                    return (delta, Rewrite::Keep);
                }

                let size = array_node.size - 1;
                if size <= MIN_ARRAY_NODE {
                    let packed = pack(edit, size, fragment, &array_node.children);
                    return (delta, Rewrite::Replace(packed));
                }
                array::update_in_place(&mut array_node.children, fragment, None);
                array_node.size = size;
                (delta, Rewrite::Keep)
            }
            Access::Shared(array_node) => {
                let Some(current) = &array_node.children[fragment] else {
                    let Some(leaf) = Node::leaf_from_update(edit, hash, key, update) else {
                        return (SizeDelta::Unchanged, Rewrite::Keep);
                    };
                    let children = array::update(&array_node.children, fragment, Some(leaf));
                    return (
                        SizeDelta::Grew,
                        Rewrite::Replace(Node::array(edit, array_node.size + 1, children)),
                    );
                };

                let mut child = ReferenceCounter::clone(current);
                let delta = Node::modify_in_place(&mut child, edit, child_shift, hash, key, update);
                if ReferenceCounter::ptr_eq(&child, current) {
                    return (delta, Rewrite::Keep);
                }

                if !child.is_empty() {
                    let children = array::update(&array_node.children, fragment, Some(child));
                    return (delta, Rewrite::Replace(Node::array(edit, array_node.size, children)));
                }

                let size = array_node.size - 1;
                if size <= MIN_ARRAY_NODE {
                    let packed = pack(edit, size, fragment, &array_node.children);
                    return (delta, Rewrite::Replace(packed));
                }
                let children = array::update(&array_node.children, fragment, None);
                (delta, Rewrite::Replace(Node::array(edit, size, children)))
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
