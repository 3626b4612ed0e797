//! Persistent hash map on top of the trie core.
//!
//! [`HashTrieMap`] hashes keys with a [`BuildHasher`], drives
//! [`Node::modify`] with a fresh [`Edit`] for every update and keeps the
//! number of bindings alongside the root.
//!
//! - O(log32 N) get, insert and remove
//! - O(1) len, `is_empty` and clone
//!
//! # Examples
//!
//! ```rust
//! use persistent_hamt::map::HashTrieMap;
//!
//! let map = HashTrieMap::new()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2)
//!     .insert("three".to_string(), 3);
//!
//! assert_eq!(map.get("two"), Some(&2));
//!
//! // Structural sharing: the original map is preserved
//! let updated = map.remove("two");
//! assert_eq!(map.len(), 3);           // Original unchanged
//! assert_eq!(updated.get("two"), None); // New version
//! ```

use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use super::hasher::{DefaultHashBuilder, hash_key};
use crate::hamt::{Edit, Entries, InvariantViolation, Node, NodeKind, NodeRef, ReferenceCounter};

// =============================================================================
// HashTrieMap Definition
// =============================================================================

/// A persistent (immutable) hash map based on a hash array mapped trie.
///
/// Cloning is O(1): both maps share the same root until one of them is
/// updated, and even then only the path to the updated binding is copied.
pub struct HashTrieMap<K, V, S = DefaultHashBuilder> {
    /// Root node of the trie
    pub(super) root: NodeRef<K, V>,
    /// Number of bindings
    pub(super) length: usize,
    pub(super) hasher: S,
}

impl<K, V> HashTrieMap<K, V> {
    /// Creates a new empty map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::map::HashTrieMap;
    ///
    /// let map: HashTrieMap<String, i32> = HashTrieMap::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }
}

impl<K, V, S> HashTrieMap<K, V, S> {
    /// Creates a new empty map that hashes keys with `hasher`.
    #[inline]
    #[must_use]
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            root: Node::empty(),
            length: 0,
            hasher,
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

    /// Returns the map's hasher builder.
    #[inline]
    #[must_use]
    pub const fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Returns the variant of the root node.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::hamt::NodeKind;
    /// use persistent_hamt::map::HashTrieMap;
    ///
    /// let map: HashTrieMap<i32, i32> = HashTrieMap::new();
    /// assert_eq!(map.root_kind(), NodeKind::Empty);
    /// assert_eq!(map.insert(1, 1).root_kind(), NodeKind::Leaf);
    /// ```
    #[must_use]
    pub fn root_kind(&self) -> NodeKind {
        self.root.kind()
    }

    /// Returns `true` if both maps share the same root node.
    ///
    /// Maps that share a root are equal, but equal maps need not share one.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        ReferenceCounter::ptr_eq(&self.root, &other.root)
    }

    /// Returns an iterator over key-value pairs, in no particular order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::map::HashTrieMap;
    ///
    /// let map = HashTrieMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    ///
    /// let total: i32 = map.iter().map(|(_, value)| value).sum();
    /// assert_eq!(total, 3);
    /// ```
    #[must_use]
    pub fn iter(&self) -> Entries<'_, K, V> {
        self.root.entries(self.length)
    }

    /// Returns an iterator over keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// Returns an iterator over values.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, value)| value)
    }
}

impl<K: Eq, V, S> HashTrieMap<K, V, S> {
    /// Verifies the structural rules of the trie and the recorded length.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let actual = self.root.check_invariants(0)?;
        if actual == self.length {
            Ok(())
        } else {
            Err(InvariantViolation::LengthMismatch {
                recorded: self.length,
                actual,
            })
        }
    }
}

impl<K, V, S> HashTrieMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Creates a map containing a single key-value pair.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::map::HashTrieMap;
    ///
    /// let map: HashTrieMap<String, i32> = HashTrieMap::singleton("key".to_string(), 42);
    /// assert_eq!(map.len(), 1);
    /// assert_eq!(map.get("key"), Some(&42));
    /// ```
    #[must_use]
    pub fn singleton(key: K, value: V) -> Self
    where
        S: Default,
    {
        Self::with_hasher(S::default()).insert(key, value)
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but `Hash` and
    /// `Eq` on the borrowed form must match those for the key type.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::map::HashTrieMap;
    ///
    /// let map = HashTrieMap::new().insert("hello".to_string(), 42);
    ///
    /// // Can use &str to look up String keys
    /// assert_eq!(map.get("hello"), Some(&42));
    /// assert_eq!(map.get("world"), None);
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.root.get(0, hash_key(&self.hasher, key), key)
    }

    /// Returns the stored key and the value corresponding to `key`.
    #[must_use]
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.root.get_key_value(0, hash_key(&self.hasher, key), key)
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

    /// Returns a new map with the key bound to the value.
    ///
    /// An existing binding for the key is replaced.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::map::HashTrieMap;
    ///
    /// let map1 = HashTrieMap::new().insert("key".to_string(), 1);
    /// let map2 = map1.insert("key".to_string(), 2);
    ///
    /// assert_eq!(map1.get("key"), Some(&1)); // Original unchanged
    /// assert_eq!(map2.get("key"), Some(&2)); // New version
    /// ```
    #[must_use]
    pub fn insert(&self, key: K, value: V) -> Self {
        let hash = hash_key(&self.hasher, &key);
        self.modified(hash, key, |_| Some(value))
    }

    /// Returns a new map without the binding for the key.
    ///
    /// If the key is absent, the returned map shares this map's root.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::map::HashTrieMap;
    ///
    /// let map = HashTrieMap::new()
    ///     .insert("a".to_string(), 1)
    ///     .insert("b".to_string(), 2);
    ///
    /// let removed = map.remove("a");
    /// assert_eq!(removed.get("a"), None);
    /// assert_eq!(removed.len(), 1);
    ///
    /// let unchanged = map.remove("z");
    /// assert!(unchanged.ptr_eq(&map));
    /// ```
    #[must_use]
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = hash_key(&self.hasher, key);
        match self.root.get_key_value(0, hash, key) {
            Some((stored, _)) => self.modified(hash, stored.clone(), |_| None),
            None => self.clone(),
        }
    }

    /// Returns a new map with the binding for the key replaced by the result
    /// of `updater`.
    ///
    /// `updater` receives the current value (`None` if the key is absent).
    /// Returning `Some` binds the key to the new value, returning `None`
    /// removes the binding.
    ///
    /// # Complexity
    ///
    /// O(log32 N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::map::HashTrieMap;
    ///
    /// let map = HashTrieMap::new().insert("count".to_string(), 10);
    ///
    /// // Increment existing value
    /// let updated = map.update_with("count", |maybe_value| maybe_value.map(|value| value + 1));
    /// assert_eq!(updated.get("count"), Some(&11));
    ///
    /// // Insert if not exists
    /// let inserted = map.update_with("new_key", |maybe_value| {
    ///     Some(maybe_value.copied().unwrap_or(100))
    /// });
    /// assert_eq!(inserted.get("new_key"), Some(&100));
    ///
    /// // Remove by returning None
    /// let removed = map.update_with("count", |_| None);
    /// assert_eq!(removed.get("count"), None);
    /// ```
    #[must_use]
    pub fn update_with<Q, F>(&self, key: &Q, updater: F) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let hash = hash_key(&self.hasher, key);
        self.modified(hash, key.to_owned(), updater)
    }

    /// Applies one update under a fresh edit token.
    fn modified<F>(&self, hash: u32, key: K, update: F) -> Self
    where
        F: FnOnce(Option<&V>) -> Option<V>,
    {
        let (root, delta) =
            Node::modify(NodeRef::clone(&self.root), Edit::fresh(), 0, hash, key, update);
        Self {
            root,
            length: delta.apply(self.length),
            hasher: self.hasher.clone(),
        }
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V, S: Clone> Clone for HashTrieMap<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            root: NodeRef::clone(&self.root),
            length: self.length,
            hasher: self.hasher.clone(),
        }
    }
}

impl<K, V, S: Default> Default for HashTrieMap<K, V, S> {
    #[inline]
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashTrieMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut transient = Self::default().transient();
        transient.extend(iter);
        transient.persistent()
    }
}

impl<'a, K, V, S> IntoIterator for &'a HashTrieMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Entries<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, S> PartialEq for HashTrieMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
    S: BuildHasher + Clone,
{
    fn eq(&self, other: &Self) -> bool {
        if self.length != other.length {
            return false;
        }
        if self.ptr_eq(other) {
            return true;
        }

        self.iter()
            .all(|(key, value)| other.get(key).is_some_and(|other_value| other_value == value))
    }
}

impl<K, V, S> Eq for HashTrieMap<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone + Eq,
    S: BuildHasher + Clone,
{
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for HashTrieMap<K, V, S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
