//! # persistent-hamt
//!
//! A persistent hash array mapped trie (HAMT) with transient in-place editing.
//!
//! ## Overview
//!
//! Every update produces a new version of the trie that shares all untouched
//! subtrees with the previous one. Old versions stay valid for as long as
//! anyone holds them. A transient session, identified by an edit token, may
//! rewrite the nodes it created and exclusively owns, which makes batches of
//! updates much cheaper without affecting any other version.
//!
//! - **Trie core** ([`hamt`]): node variants, the `modify` operation, edit
//!   tokens and an invariant checker
//! - **Map wrappers** ([`map`]): [`HashTrieMap`](map::HashTrieMap) and
//!   [`TransientHashTrieMap`](map::TransientHashTrieMap), which hash keys and
//!   track the number of bindings
//!
//! ## Feature Flags
//!
//! - `map`: Map wrappers (enabled by default)
//! - `arc`: Share nodes through `Arc` instead of `Rc`, making snapshots
//!   thread-safe
//! - `fxhash`: Use `rustc-hash` as the default hasher
//! - `ahash`: Use `ahash` as the default hasher
//! - `full`: Enable `map` and `arc`
//!
//! ## Example
//!
//! ```rust
//! use persistent_hamt::prelude::*;
//!
//! let map = HashTrieMap::new()
//!     .insert("one".to_string(), 1)
//!     .insert("two".to_string(), 2);
//!
//! let updated = map.insert("one".to_string(), 100);
//! assert_eq!(map.get("one"), Some(&1));
//! assert_eq!(updated.get("one"), Some(&100));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Note: Disabling redundant_closure_for_method_calls due to clippy 0.1.92 panic bug
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types.
///
/// # Usage
///
/// ```rust
/// use persistent_hamt::prelude::*;
/// ```
pub mod prelude {
    pub use crate::hamt::{Edit, Node, NodeKind, NodeRef, SizeDelta};

    #[cfg(feature = "map")]
    pub use crate::map::*;
}

pub mod hamt;

#[cfg(feature = "map")]
pub mod map;
