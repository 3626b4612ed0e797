//! Transient (temporarily mutable) hash map for batch updates.

use std::borrow::Borrow;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::debug;

use super::HashTrieMap;
use super::hasher::{DefaultHashBuilder, hash_key};
use crate::hamt::{Edit, Node, NodeRef, SizeDelta};

// =============================================================================
// TransientHashTrieMap Definition
// =============================================================================

/// A transient (temporarily mutable) hash map for efficient batch updates.
///
/// A transient owns one [`Edit`] token for its whole lifetime. Nodes it
/// creates are stamped with that token and rewritten in place by later
/// updates, as long as nothing else holds a reference to them. Nodes shared
/// with a persistent map are copied first, so the persistent map never
/// observes a change.
///
/// After batch updates, convert to [`HashTrieMap`] using
/// [`persistent()`](Self::persistent). The token is dropped with the
/// transient, so the nodes it stamped are never mutated again.
///
/// `PhantomData<Rc<()>>` keeps the type `!Send` and `!Sync` regardless of the
/// `arc` feature.
///
/// # Examples
///
/// ```rust
/// use persistent_hamt::map::{HashTrieMap, TransientHashTrieMap};
///
/// let mut transient = TransientHashTrieMap::new();
/// transient.insert("a".to_string(), 1);
/// transient.insert("b".to_string(), 2);
/// transient.remove("a");
///
/// let persistent: HashTrieMap<String, i32> = transient.persistent();
/// assert_eq!(persistent.len(), 1);
/// assert_eq!(persistent.get("b"), Some(&2));
/// ```
///
/// # Transient-Persistent Pattern
///
/// ```rust
/// use persistent_hamt::map::HashTrieMap;
///
/// let original: HashTrieMap<i32, i32> = (0..10).map(|index| (index, index)).collect();
///
/// let mut transient = original.clone().transient();
/// transient.insert(10, 10);
/// transient.remove(&0);
/// let updated = transient.persistent();
///
/// assert_eq!(original.len(), 10);     // Original unchanged
/// assert_eq!(original.get(&0), Some(&0));
/// assert_eq!(updated.len(), 10);      // New version
/// assert_eq!(updated.get(&0), None);
/// ```
pub struct TransientHashTrieMap<K, V, S = DefaultHashBuilder> {
    root: NodeRef<K, V>,
    length: usize,
    hasher: S,
    edit: Edit,
    /// Marker to ensure `!Send` and `!Sync`.
    _marker: PhantomData<Rc<()>>,
}

// Static assertions to verify TransientHashTrieMap is not Send/Sync
static_assertions::assert_not_impl_any!(TransientHashTrieMap<i32, i32>: Send, Sync);
static_assertions::assert_not_impl_any!(TransientHashTrieMap<String, String>: Send, Sync);

// Arc feature verification: even with Arc, TransientHashTrieMap remains !Send/!Sync
#[cfg(feature = "arc")]
mod arc_send_sync_verification {
    use super::TransientHashTrieMap;
    use std::sync::Arc;

    static_assertions::assert_not_impl_any!(TransientHashTrieMap<Arc<i32>, Arc<i32>>: Send, Sync);
}

// =============================================================================
// TransientHashTrieMap Implementation
// =============================================================================

impl<K, V> TransientHashTrieMap<K, V> {
    /// Creates a new empty transient map.
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }
}

impl<K, V, S> TransientHashTrieMap<K, V, S> {
    /// Creates a new empty transient map that hashes keys with `hasher`.
    #[must_use]
    pub fn with_hasher(hasher: S) -> Self {
        Self::open(Node::empty(), 0, hasher)
    }

    /// Starts an edit session over an existing trie.
    fn open(root: NodeRef<K, V>, length: usize, hasher: S) -> Self {
        let edit = Edit::fresh();
        debug!(%edit, length, "opened transient session");
        Self {
            root,
            length,
            hasher,
            edit,
            _marker: PhantomData,
        }
    }

    /// Returns the number of bindings in the map.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the map contains no bindings.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the token of this edit session.
    #[inline]
    #[must_use]
    pub const fn edit(&self) -> Edit {
        self.edit
    }

    /// Converts this transient map into a persistent map.
    ///
    /// # Complexity
    ///
    /// O(1) - only moves fields
    #[must_use]
    pub fn persistent(self) -> HashTrieMap<K, V, S> {
        debug!(edit = %self.edit, length = self.length, "closed transient session");
        HashTrieMap {
            root: self.root,
            length: self.length,
            hasher: self.hasher,
        }
    }
}

impl<K, V, S> TransientHashTrieMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    /// Returns a reference to the value corresponding to the key.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.root.get(0, hash_key(&self.hasher, key), key)
    }

    /// Returns `true` if the map contains the key.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Binds the key to the value.
    ///
    /// Returns the previous value, or `None` if the key was absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::map::TransientHashTrieMap;
    ///
    /// let mut transient = TransientHashTrieMap::new();
    /// assert_eq!(transient.insert("key", 1), None);
    /// assert_eq!(transient.insert("key", 2), Some(1));
    /// assert_eq!(transient.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = hash_key(&self.hasher, &key);
        let mut previous = None;
        self.apply(hash, key, |current| {
            previous = current.cloned();
            Some(value)
        });
        previous
    }

    /// Removes the binding for the key.
    ///
    /// Returns the removed value, or `None` if the key was absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::map::TransientHashTrieMap;
    ///
    /// let mut transient = TransientHashTrieMap::new();
    /// transient.insert(1, "one");
    /// assert_eq!(transient.remove(&1), Some("one"));
    /// assert_eq!(transient.remove(&1), None);
    /// assert!(transient.is_empty());
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_key(&self.hasher, key);
        let stored = self.root.get_key_value(0, hash, key)?.0.clone();
        let mut removed = None;
        self.apply(hash, stored, |current| {
            removed = current.cloned();
            None
        });
        removed
    }

    /// Replaces the binding for the key with the result of `updater`.
    ///
    /// `updater` receives the current value (`None` if the key is absent).
    /// Returns how the number of bindings changed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::hamt::SizeDelta;
    /// use persistent_hamt::map::TransientHashTrieMap;
    ///
    /// let mut counts: TransientHashTrieMap<String, u32> = TransientHashTrieMap::new();
    /// for word in ["a", "b", "a"] {
    ///     counts.update_with(word, |count| Some(count.map_or(1, |count| count + 1)));
    /// }
    /// assert_eq!(counts.get("a"), Some(&2));
    /// assert_eq!(counts.update_with("c", |_| None), SizeDelta::Unchanged);
    /// ```
    pub fn update_with<Q, F>(&mut self, key: &Q, updater: F) -> SizeDelta
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let hash = hash_key(&self.hasher, key);
        self.apply(hash, key.to_owned(), updater)
    }

    /// Applies one update under this session's token.
    fn apply<F>(&mut self, hash: u32, key: K, update: F) -> SizeDelta
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let delta = Node::modify_in_place(&mut self.root, self.edit, 0, hash, key, update);
        self.length = delta.apply(self.length);
        delta
    }
}

impl<K, V, S: Default> Default for TransientHashTrieMap<K, V, S> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> Extend<(K, V)> for TransientHashTrieMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            let hash = hash_key(&self.hasher, &key);
            self.apply(hash, key, |_| Some(value));
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for TransientHashTrieMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut transient = Self::default();
        transient.extend(iter);
        transient
    }
}

// =============================================================================
// HashTrieMap::transient() method
// =============================================================================

impl<K, V, S> HashTrieMap<K, V, S> {
    /// Converts this persistent map into a transient map.
    ///
    /// The transient starts with a fresh edit token, so none of the existing
    /// nodes are mutated in place; clones of this map stay intact.
    ///
    /// # Complexity
    ///
    /// O(1) - only moves fields
    #[must_use]
    pub fn transient(self) -> TransientHashTrieMap<K, V, S> {
        TransientHashTrieMap::open(self.root, self.length, self.hasher)
    }
}

// =============================================================================
// Tests
// =============================================================================
