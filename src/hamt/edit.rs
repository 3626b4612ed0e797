//! Edit tokens and size deltas.
//!
//! An [`Edit`] identifies one transient mutation session. Nodes remember the
//! token they were created under, and [`Node::modify`](super::Node::modify)
//! rewrites a node in place only when the caller presents that same token and
//! holds the only reference to the node. Tokens come from a process-wide
//! counter and are never handed out twice.

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_EDIT: AtomicU64 = AtomicU64::new(1);

/// Identifier of a transient edit session.
///
/// # Examples
///
/// ```rust
/// use persistent_hamt::hamt::Edit;
///
/// let first = Edit::fresh();
/// let second = Edit::fresh();
/// assert_ne!(first, second);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edit(NonZeroU64);

impl Edit {
    /// Mints a token that no other caller has received.
    #[must_use]
    pub fn fresh() -> Self {
        let raw = NEXT_EDIT.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and would need 2^64 sessions to wrap.
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    /// Returns the raw token value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for Edit {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "Edit({})", self.0)
    }
}

impl fmt::Display for Edit {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// Change in the number of bindings produced by one `modify` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SizeDelta {
    /// A binding was removed.
    Shrunk,
    /// The number of bindings is unchanged.
    #[default]
    Unchanged,
    /// A binding was added.
    Grew,
}

impl SizeDelta {
    /// Applies the delta to a length.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use persistent_hamt::hamt::SizeDelta;
    ///
    /// assert_eq!(SizeDelta::Grew.apply(2), 3);
    /// assert_eq!(SizeDelta::Shrunk.apply(2), 1);
    /// assert_eq!(SizeDelta::Unchanged.apply(2), 2);
    /// ```
    #[inline]
    #[must_use]
    pub const fn apply(self, length: usize) -> usize {
        match self {
            Self::Shrunk => length.saturating_sub(1),
            Self::Unchanged => length,
            Self::Grew => length + 1,
        }
    }

    /// Returns the delta as a signed integer (-1, 0 or 1).
    #[inline]
    #[must_use]
    pub const fn as_i8(self) -> i8 {
        match self {
            Self::Shrunk => -1,
            Self::Unchanged => 0,
            Self::Grew => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;

    #[rstest]
    fn test_fresh_tokens_are_unique() {
        let tokens: HashSet<Edit> = (0..1_000).map(|_| Edit::fresh()).collect();
        assert_eq!(tokens.len(), 1_000);
    }

    #[rstest]
    fn test_fresh_tokens_are_increasing() {
        let first = Edit::fresh();
        let second = Edit::fresh();
        assert!(second.get() > first.get());
    }

    #[rstest]
    #[case(SizeDelta::Shrunk, 0, 0)]
    #[case(SizeDelta::Shrunk, 5, 4)]
    #[case(SizeDelta::Unchanged, 5, 5)]
    #[case(SizeDelta::Grew, 5, 6)]
    fn test_size_delta_apply(
        #[case] delta: SizeDelta,
        #[case] length: usize,
        #[case] expected: usize,
    ) {
        assert_eq!(delta.apply(length), expected);
    }

    #[rstest]
    fn test_size_delta_as_i8() {
        assert_eq!(SizeDelta::Shrunk.as_i8(), -1);
        assert_eq!(SizeDelta::Unchanged.as_i8(), 0);
        assert_eq!(SizeDelta::Grew.as_i8(), 1);
    }
}
