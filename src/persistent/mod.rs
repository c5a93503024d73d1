//! Persistent (immutable) data structures.
//!
//! This module provides [`BPlusList`], an indexable sequence that uses
//! structural sharing to minimize copying, along with its transient
//! (mutable, single-owner) counterpart [`TransientBPlusList`].
//!
//! # Structural Sharing
//!
//! Every edit creates a new version that shares all untouched nodes with
//! the version it came from, so keeping old versions around is cheap.
//!
//! # Examples
//!
//! ```rust
//! use bplus_list::persistent::BPlusList;
//!
//! let list: BPlusList<i32> = (0..100).collect();
//! assert_eq!(list.get(50), Some(&50));
//!
//! // Structural sharing: the original list is preserved
//! let updated = list.update(50, 999).unwrap();
//! assert_eq!(list.get(50), Some(&50));     // Original unchanged
//! assert_eq!(updated.get(50), Some(&999)); // New version
//! ```

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer type.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod bplus_list;

pub use bplus_list::BPlusList;
pub use bplus_list::BPlusListIntoIterator;
pub use bplus_list::BPlusListIterator;
pub use bplus_list::NodeCapacity;
pub use bplus_list::TransientBPlusList;
pub use bplus_list::TransientCursor;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod reference_counter_tests {
    use super::ReferenceCounter;
    use rstest::rstest;

    #[rstest]
    fn test_reference_counter_shares_nodes() {
        let node: ReferenceCounter<Vec<i32>> = ReferenceCounter::new(vec![1, 2, 3]);
        let shared = node.clone();
        assert!(ReferenceCounter::ptr_eq(&node, &shared));
        assert_eq!(ReferenceCounter::strong_count(&node), 2);
        drop(shared);
        assert_eq!(ReferenceCounter::strong_count(&node), 1);
    }

    #[rstest]
    fn test_reference_counter_get_mut_requires_unique_owner() {
        let mut node: ReferenceCounter<i32> = ReferenceCounter::new(42);
        let shared = node.clone();
        assert!(ReferenceCounter::get_mut(&mut node).is_none());
        drop(shared);
        assert!(ReferenceCounter::get_mut(&mut node).is_some());
    }
}
