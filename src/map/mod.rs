//! Hash maps built on the trie core.
//!
//! - [`HashTrieMap`]: persistent map, every update returns a new version
//! - [`TransientHashTrieMap`]: mutable builder that edits its own nodes in place
//!
//! Keys are hashed with a [`BuildHasher`](std::hash::BuildHasher) and the
//! 64-bit result is folded to the 32 bits the trie consumes. The hasher used
//! when none is given is [`DefaultHashBuilder`].
//!
//! # Examples
//!
//! ```rust
//! use persistent_hamt::map::HashTrieMap;
//!
//! let words: HashTrieMap<&str, usize> = ["alpha", "beta", "gamma"]
//!     .into_iter()
//!     .map(|word| (word, word.len()))
//!     .collect();
//!
//! let mut transient = words.clone().transient();
//! transient.insert("delta", 5);
//! transient.remove("alpha");
//! let updated = transient.persistent();
//!
//! assert_eq!(words.len(), 3);        // Original unchanged
//! assert_eq!(updated.len(), 3);      // New version
//! assert!(updated.contains_key("delta"));
//! assert!(!updated.contains_key("alpha"));
//! ```

mod hash_trie_map;
mod hasher;
mod transient;

pub use hash_trie_map::HashTrieMap;
pub use hasher::DefaultHashBuilder;
pub use hasher::fold as fold_hash;
pub use hasher::hash_key;
pub use transient::TransientHashTrieMap;
