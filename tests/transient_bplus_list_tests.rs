//! Integration tests for `TransientBPlusList`.

use bplus_list::error::BPlusListError;
use bplus_list::persistent::{BPlusList, TransientBPlusList};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;

fn to_vec<T: Clone>(list: &BPlusList<T>) -> Vec<T> {
    list.iter().cloned().collect()
}

// =============================================================================
// Round Trips
// =============================================================================

#[rstest]
fn test_untouched_transient_returns_same_root() {
    let list: BPlusList<i32> = (0..1000).collect();
    let frozen = list.transient().persistent();
    assert!(frozen.ptr_eq(&list));
}

#[rstest]
fn test_transient_edits_do_not_leak_into_source() {
    let list: BPlusList<i32> = (0..1000).collect();
    let mut transient = list.transient();
    for index in (0..1000).step_by(7) {
        transient.set(index, -1).unwrap();
    }
    transient.insert(500, 12345).unwrap();
    transient.remove(0).unwrap();

    let edited = transient.persistent();
    assert_eq!(edited.validate_structure(), Ok(()));
    assert_eq!(to_vec(&list), (0..1000).collect::<Vec<_>>());

    let mut model: Vec<i32> = (0..1000)
        .map(|value| if value % 7 == 0 { -1 } else { value })
        .collect();
    model.insert(500, 12345);
    model.remove(0);
    assert_eq!(to_vec(&edited), model);
}

#[rstest]
fn test_snapshot_is_isolated_from_later_edits() {
    let mut transient: TransientBPlusList<u64> = (0..300).collect();
    let snapshot = transient.snapshot();

    transient.set(0, 999).unwrap();
    transient.push_back(300);

    assert_eq!(snapshot.get(0), Some(&0));
    assert_eq!(snapshot.len(), 300);
    let finished = transient.persistent();
    assert_eq!(finished.get(0), Some(&999));
    assert_eq!(finished.len(), 301);
    assert_eq!(finished.validate_structure(), Ok(()));
}

#[rstest]
fn test_transient_matches_persistent_edits() {
    let mut random = StdRng::seed_from_u64(7);
    let base: BPlusList<u32> = (0..500).collect();
    let mut transient = base.transient();
    let mut persistent = base.clone();

    for step in 0..2000_u32 {
        match random.gen_range(0..5) {
            0 => {
                transient.push_back(step);
                persistent = persistent.push_back(step);
            }
            1 => {
                let index = random.gen_range(0..=persistent.len());
                transient.insert(index, step).unwrap();
                persistent = persistent.insert(index, step).unwrap();
            }
            2 if !persistent.is_empty() => {
                let index = random.gen_range(0..persistent.len());
                transient.set(index, step).unwrap();
                persistent = persistent.update(index, step).unwrap();
            }
            3 if !persistent.is_empty() => {
                let index = random.gen_range(0..persistent.len());
                transient.remove(index).unwrap();
                persistent = persistent.remove(index).unwrap();
            }
            _ if !persistent.is_empty() => {
                let index = random.gen_range(0..persistent.len());
                let count = random.gen_range(0..=(persistent.len() - index).min(25));
                transient.remove_range(index, count).unwrap();
                persistent = persistent.remove_range(index, count).unwrap();
            }
            _ => {}
        }
        assert_eq!(transient.len(), persistent.len());
    }

    let frozen = transient.persistent();
    assert_eq!(frozen.validate_structure(), Ok(()));
    assert_eq!(frozen, persistent);
}

// =============================================================================
// Errors
// =============================================================================

#[rstest]
fn test_out_of_range_edits_fail() {
    let mut transient: TransientBPlusList<i32> = (0..5).collect();
    assert_eq!(
        transient.set(5, 0),
        Err(BPlusListError::IndexOutOfRange { index: 5, length: 5 })
    );
    assert_eq!(
        transient.insert(6, 0),
        Err(BPlusListError::IndexOutOfRange { index: 6, length: 5 })
    );
    assert_eq!(
        transient.remove_range(3, 3),
        Err(BPlusListError::RangeOutOfRange {
            index: 3,
            count: 3,
            length: 5
        })
    );
    assert_eq!(to_vec(&transient.persistent()), vec![0, 1, 2, 3, 4]);
}

#[rstest]
fn test_cursor_walks_until_modified() {
    let mut transient: TransientBPlusList<i32> = (0..100).collect();
    let mut cursor = transient.cursor();
    for expected in 0..100 {
        assert_eq!(cursor.advance(&transient), Ok(Some(&expected)));
    }
    assert_eq!(cursor.advance(&transient), Ok(None));
    assert_eq!(cursor.position(), 100);

    transient.clear();
    assert!(matches!(
        cursor.advance(&transient),
        Err(BPlusListError::ConcurrentModification { .. })
    ));
    assert!(transient.is_empty());
}

#[rstest]
fn test_failed_edit_does_not_invalidate_cursor() {
    let mut transient: TransientBPlusList<i32> = (0..3).collect();
    let mut cursor = transient.cursor();
    assert!(transient.set(10, 0).is_err());
    assert_eq!(cursor.advance(&transient), Ok(Some(&0)));
}
