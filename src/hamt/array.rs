//! Copy-on-write and in-place array edits.
//!
//! Every structural edit a node makes to its children goes through these
//! functions. The `*_in_place` forms are used only when the calling edit
//! session owns the node; the copying forms allocate a new vector of exactly
//! the resulting length and leave the source untouched.

/// Returns a copy of `array` with `value` inserted at `index`.
pub(crate) fn splice_in<T: Clone>(array: &[T], index: usize, value: T) -> Vec<T> {
    let mut result = Vec::with_capacity(array.len() + 1);
    result.extend_from_slice(&array[..index]);
    result.push(value);
    result.extend_from_slice(&array[index..]);
    result
}

/// Inserts `value` at `index`, shifting later elements right.
pub(crate) fn splice_in_in_place<T>(array: &mut Vec<T>, index: usize, value: T) {
    array.insert(index, value);
}

/// Returns a copy of `array` without the element at `index`.
pub(crate) fn splice_out<T: Clone>(array: &[T], index: usize) -> Vec<T> {
    let mut result = Vec::with_capacity(array.len().saturating_sub(1));
    result.extend_from_slice(&array[..index]);
    result.extend_from_slice(&array[index + 1..]);
    result
}

/// Removes the element at `index`, shifting later elements left.
pub(crate) fn splice_out_in_place<T>(array: &mut Vec<T>, index: usize) {
    array.remove(index);
}

/// Returns a copy of `array` with the element at `index` replaced by `value`.
///
/// `index == array.len()` appends.
pub(crate) fn update<T: Clone>(array: &[T], index: usize, value: T) -> Vec<T> {
    if index == array.len() {
        return splice_in(array, index, value);
    }
    let mut result = array.to_vec();
    result[index] = value;
    result
}

/// Replaces the element at `index` with `value`; `index == array.len()`
/// appends.
pub(crate) fn update_in_place<T>(array: &mut Vec<T>, index: usize, value: T) {
    if index == array.len() {
        array.push(value);
    } else {
        array[index] = value;
    }
}

// =============================================================================
// Tests
// =============================================================================
