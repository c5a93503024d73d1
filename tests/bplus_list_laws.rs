//! Property-based tests for `BPlusList` laws.
//!
//! This module verifies the algebraic laws and structural invariants of
//! `BPlusList` against a `Vec` model using proptest.

use bplus_list::persistent::BPlusList;
use proptest::prelude::*;

// =============================================================================
// Construction Laws
// =============================================================================

proptest! {
    /// Bulk construction and repeated `push_back` build the same sequence.
    #[test]
    fn prop_bulk_equals_incremental(
        elements in prop::collection::vec(any::<i32>(), 0..600)
    ) {
        let bulk: BPlusList<i32> = elements.iter().copied().collect();
        let incremental = elements
            .iter()
            .fold(BPlusList::new(), |list, &element| list.push_back(element));

        prop_assert!(bulk.validate_structure().is_ok());
        prop_assert!(incremental.validate_structure().is_ok());
        prop_assert_eq!(&bulk, &incremental);
        prop_assert_eq!(bulk.iter().copied().collect::<Vec<_>>(), elements);
    }

    /// Indexing agrees with the source vector at every position.
    #[test]
    fn prop_get_matches_vec(
        elements in prop::collection::vec(any::<i64>(), 0..400)
    ) {
        let list: BPlusList<i64> = elements.iter().copied().collect();
        for (index, element) in elements.iter().enumerate() {
            prop_assert_eq!(list.get(index), Some(element));
        }
        prop_assert_eq!(list.get(elements.len()), None);
    }

    /// Both ends of the iterator agree with the model.
    #[test]
    fn prop_reverse_iteration_matches_vec(
        elements in prop::collection::vec(any::<u16>(), 0..400)
    ) {
        let list: BPlusList<u16> = elements.iter().copied().collect();
        let reversed: Vec<u16> = list.iter().rev().copied().collect();
        let expected: Vec<u16> = elements.iter().rev().copied().collect();
        prop_assert_eq!(reversed, expected);
    }
}

// =============================================================================
// Edit Laws
// =============================================================================

proptest! {
    /// Get-Update Law: an updated element is returned by `get`.
    #[test]
    fn prop_get_update_law(
        elements in prop::collection::vec(any::<i32>(), 1..300),
        position in any::<prop::sample::Index>()
    ) {
        let list: BPlusList<i32> = elements.iter().copied().collect();
        let index = position.index(elements.len());
        let updated = list.update(index, 99999).unwrap();

        prop_assert_eq!(updated.get(index), Some(&99999));
        prop_assert_eq!(list.get(index), Some(&elements[index]));
        prop_assert!(updated.validate_structure().is_ok());
    }

    /// Insert-Remove Law: removing what was just inserted restores the list.
    #[test]
    fn prop_insert_remove_inverse(
        elements in prop::collection::vec(any::<i32>(), 0..300),
        position in any::<prop::sample::Index>(),
        value in any::<i32>()
    ) {
        let list: BPlusList<i32> = elements.iter().copied().collect();
        let index = position.index(elements.len() + 1);

        let inserted = list.insert(index, value).unwrap();
        prop_assert!(inserted.validate_structure().is_ok());
        prop_assert_eq!(inserted.get(index), Some(&value));

        let restored = inserted.remove(index).unwrap();
        prop_assert!(restored.validate_structure().is_ok());
        prop_assert_eq!(restored, list);
    }

    /// Range removal agrees with `Vec::drain`.
    #[test]
    fn prop_remove_range_matches_vec(
        elements in prop::collection::vec(any::<i32>(), 0..600),
        start in any::<prop::sample::Index>(),
        span in any::<prop::sample::Index>()
    ) {
        let list: BPlusList<i32> = elements.iter().copied().collect();
        let index = start.index(elements.len() + 1);
        let count = span.index(elements.len() - index + 1);

        let removed = list.remove_range(index, count).unwrap();
        let mut model = elements.clone();
        model.drain(index..index + count);

        prop_assert!(removed.validate_structure().is_ok());
        prop_assert_eq!(removed.iter().copied().collect::<Vec<_>>(), model);
    }

    /// Range reads agree with slicing.
    #[test]
    fn prop_get_range_matches_slice(
        elements in prop::collection::vec(any::<i32>(), 0..600),
        start in any::<prop::sample::Index>(),
        span in any::<prop::sample::Index>()
    ) {
        let list: BPlusList<i32> = elements.iter().copied().collect();
        let index = start.index(elements.len() + 1);
        let count = span.index(elements.len() - index + 1);

        let range = list.get_range(index, count).unwrap();
        prop_assert!(range.validate_structure().is_ok());
        prop_assert_eq!(range.iter().copied().collect::<Vec<_>>(), &elements[index..index + count]);
    }
}

// =============================================================================
// Concatenation Laws
// =============================================================================

proptest! {
    /// Identity Law: concatenating the empty list changes nothing.
    #[test]
    fn prop_concat_identity(
        elements in prop::collection::vec(any::<i32>(), 0..300)
    ) {
        let list: BPlusList<i32> = elements.iter().copied().collect();
        let empty = BPlusList::new();

        prop_assert_eq!(&list.concat(&empty).unwrap(), &list);
        prop_assert_eq!(&empty.concat(&list).unwrap(), &list);
    }

    /// Associativity Law: grouping does not change the sequence.
    #[test]
    fn prop_concat_associativity(
        first in prop::collection::vec(any::<i32>(), 0..400),
        second in prop::collection::vec(any::<i32>(), 0..400),
        third in prop::collection::vec(any::<i32>(), 0..400)
    ) {
        let a: BPlusList<i32> = first.iter().copied().collect();
        let b: BPlusList<i32> = second.iter().copied().collect();
        let c: BPlusList<i32> = third.iter().copied().collect();

        let left = a.concat(&b).unwrap().concat(&c).unwrap();
        let right = a.concat(&b.concat(&c).unwrap()).unwrap();

        prop_assert!(left.validate_structure().is_ok());
        prop_assert!(right.validate_structure().is_ok());
        prop_assert_eq!(&left, &right);

        let expected: Vec<i32> = first.into_iter().chain(second).chain(third).collect();
        prop_assert_eq!(left.iter().copied().collect::<Vec<_>>(), expected);
    }

    /// Concatenating trees built by edits keeps every invariant.
    #[test]
    fn prop_concat_after_removals(
        left_size in 0usize..2000,
        right_size in 0usize..2000,
        left_removed in any::<prop::sample::Index>(),
        right_removed in any::<prop::sample::Index>()
    ) {
        let left: BPlusList<usize> = (0..left_size).collect();
        let right: BPlusList<usize> = (left_size..left_size + right_size).collect();
        let left_count = left_removed.index(left_size + 1);
        let right_count = right_removed.index(right_size + 1);

        let left = left.remove_range(left_size - left_count, left_count).unwrap();
        let right = right.remove_range(0, right_count).unwrap();
        let joined = left.concat(&right).unwrap();

        prop_assert!(joined.validate_structure().is_ok());
        let expected: Vec<usize> = (0..left_size - left_count)
            .chain(left_size + right_count..left_size + right_size)
            .collect();
        prop_assert_eq!(joined.iter().copied().collect::<Vec<_>>(), expected);
    }
}
