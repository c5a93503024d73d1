//! Error types for list operations.
//!
//! Every fallible operation on [`BPlusList`](crate::persistent::BPlusList) and
//! [`TransientBPlusList`](crate::persistent::TransientBPlusList) reports a
//! [`BPlusListError`]. A failed operation never publishes a new node, so the
//! list it was called on stays valid and untouched.

use thiserror::Error;

/// Result type alias using [`BPlusListError`].
pub type Result<T> = std::result::Result<T, BPlusListError>;

/// Errors reported by list operations.
///
/// # Examples
///
/// ```rust
/// use bplus_list::error::BPlusListError;
/// use bplus_list::persistent::BPlusList;
///
/// let list: BPlusList<i32> = (0..3).collect();
/// assert_eq!(
///     list.update(5, 0),
///     Err(BPlusListError::IndexOutOfRange { index: 5, length: 3 })
/// );
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BPlusListError {
    /// A single index lies outside the valid bounds of the list.
    #[error("index {index} is out of range for a list of length {length}")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The length of the list at the time of the call.
        length: usize,
    },

    /// An `(index, count)` range does not lie within `[0, length]`.
    #[error("range starting at {index} with {count} elements is out of range for a list of length {length}")]
    RangeOutOfRange {
        /// The first index of the range.
        index: usize,
        /// The number of elements in the range.
        count: usize,
        /// The length of the list at the time of the call.
        length: usize,
    },

    /// The resulting element count would exceed `usize::MAX`.
    #[error("resulting element count would overflow usize")]
    CountOverflow,

    /// A transient cursor observed a structural change made after it was created.
    #[error("transient list was modified during iteration (cursor version {expected}, list version {found})")]
    ConcurrentModification {
        /// The version recorded when the cursor was created.
        expected: u64,
        /// The version of the transient when the cursor was advanced.
        found: u64,
    },

    /// The element the operation needed to locate is not in the list.
    #[error("element not found")]
    ElementNotFound,
}

impl BPlusListError {
    /// Creates an [`IndexOutOfRange`](Self::IndexOutOfRange) error.
    #[must_use]
    pub const fn index_out_of_range(index: usize, length: usize) -> Self {
        Self::IndexOutOfRange { index, length }
    }

    /// Creates a [`RangeOutOfRange`](Self::RangeOutOfRange) error.
    #[must_use]
    pub const fn range_out_of_range(index: usize, count: usize, length: usize) -> Self {
        Self::RangeOutOfRange {
            index,
            count,
            length,
        }
    }
}

/// Checks that `[index, index + count)` lies within a list of `length` elements.
pub(crate) const fn check_range(index: usize, count: usize, length: usize) -> Result<()> {
    match index.checked_add(count) {
        Some(end) if end <= length => Ok(()),
        _ => Err(BPlusListError::range_out_of_range(index, count, length)),
    }
}
