//! Hash fragment and bitmap arithmetic.
//!
//! A 32-bit hash is consumed [`BITS_PER_LEVEL`] bits at a time, lowest bits
//! first. The fragment selected at a given `shift` picks one of
//! [`BRANCHING_FACTOR`] logical slots; bitmap-indexed nodes translate that slot
//! into a physical position by counting the occupied slots below it.

// =============================================================================
// Constants
// =============================================================================

/// Bits of the hash consumed per trie level.
pub const BITS_PER_LEVEL: u32 = 5;

/// Branching factor (2^5 = 32).
pub const BRANCHING_FACTOR: usize = 1 << BITS_PER_LEVEL;

/// Bit mask for extracting a fragment.
pub const MASK: u32 = (1 << BITS_PER_LEVEL) - 1;

/// Number of children an indexed node may hold before it is expanded into an
/// array node.
pub const MAX_INDEX_NODE: usize = BRANCHING_FACTOR / 2;

/// Occupancy at or below which an array node is packed back into an indexed
/// node.
pub const MIN_ARRAY_NODE: usize = BRANCHING_FACTOR / 4;

/// Width of the hash in bits.
pub const HASH_BITS: u32 = u32::BITS;

/// Number of levels needed to consume a full hash (32 bits / 5 bits per level,
/// rounded up).
pub const MAX_DEPTH: usize = HASH_BITS.div_ceil(BITS_PER_LEVEL) as usize;

// =============================================================================
// Fragment arithmetic
// =============================================================================

/// Extracts the fragment of `hash` selected at `shift`.
///
/// Shifts past the width of the hash yield `0`.
///
/// # Examples
///
/// ```rust
/// use persistent_hamt::hamt::bitwise::hash_fragment;
///
/// assert_eq!(hash_fragment(0, 0b11_00101), 0b00101);
/// assert_eq!(hash_fragment(5, 0b11_00101), 0b11);
/// assert_eq!(hash_fragment(35, u32::MAX), 0);
/// ```
#[inline]
#[must_use]
pub const fn hash_fragment(shift: u32, hash: u32) -> u32 {
    match hash.checked_shr(shift) {
        Some(shifted) => shifted & MASK,
        None => 0,
    }
}

/// Converts a fragment into its single-bit mask.
#[inline]
#[must_use]
pub const fn to_bitmap(fragment: u32) -> u32 {
    1 << fragment
}

/// Returns the physical index of `bit` within a compacted children array
/// described by `bitmap`.
///
/// The index is the number of occupied slots below `bit`.
#[inline]
#[must_use]
pub const fn from_bitmap(bitmap: u32, bit: u32) -> usize {
    (bitmap & (bit - 1)).count_ones() as usize
}

// =============================================================================
// Tests
// =============================================================================
