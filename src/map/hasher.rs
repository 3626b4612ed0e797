//! Key hashing for the map wrappers.

use std::hash::{BuildHasher, Hash};

/// Hasher builder used when a map is created without one.
///
/// With the `fxhash` feature this is `rustc_hash::FxBuildHasher`, with the
/// `ahash` feature `ahash::RandomState`, and otherwise the standard library's
/// `DefaultHasher` with fixed keys, so hashes are reproducible between runs.
#[cfg(feature = "fxhash")]
pub type DefaultHashBuilder = rustc_hash::FxBuildHasher;

/// Hasher builder used when a map is created without one.
#[cfg(all(feature = "ahash", not(feature = "fxhash")))]
pub type DefaultHashBuilder = ahash::RandomState;

/// Hasher builder used when a map is created without one.
#[cfg(not(any(feature = "fxhash", feature = "ahash")))]
pub type DefaultHashBuilder = std::hash::BuildHasherDefault<std::hash::DefaultHasher>;

/// Folds a 64-bit hash into the 32 bits the trie consumes.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn fold(hash: u64) -> u32 {
    (hash ^ (hash >> 32)) as u32
}

/// Hashes `key` with `builder` and folds the result to 32 bits.
#[inline]
pub fn hash_key<Q, S>(builder: &S, key: &Q) -> u32
where
    Q: Hash + ?Sized,
    S: BuildHasher,
{
    fold(builder.hash_one(key))
}
