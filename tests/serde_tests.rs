#![cfg(feature = "serde")]

//! Integration tests for serde support in bplus-list.
//!
//! Lists serialize as plain sequences, so any format that handles a `Vec`
//! handles a `BPlusList` the same way.

use bplus_list::persistent::BPlusList;
use rstest::rstest;

#[rstest]
fn test_list_json_roundtrip() {
    let list: BPlusList<i32> = (1..=1000).collect();
    let json = serde_json::to_string(&list).unwrap();
    let restored: BPlusList<i32> = serde_json::from_str(&json).unwrap();
    assert_eq!(list, restored);
    assert_eq!(restored.validate_structure(), Ok(()));
}

#[rstest]
fn test_list_matches_vec_encoding() {
    let elements: Vec<String> = (0..20).map(|index| format!("s{index}")).collect();
    let list: BPlusList<String> = elements.iter().cloned().collect();
    assert_eq!(
        serde_json::to_string(&list).unwrap(),
        serde_json::to_string(&elements).unwrap()
    );
}

#[rstest]
fn test_edited_list_serializes_in_order() {
    let list: BPlusList<i32> = (0..100).collect();
    let edited = list.remove_range(10, 80).unwrap().insert(0, -1).unwrap();
    let restored: Vec<i32> = serde_json::from_str(&serde_json::to_string(&edited).unwrap()).unwrap();
    let mut expected = vec![-1];
    expected.extend(0..10);
    expected.extend(90..100);
    assert_eq!(restored, expected);
}

#[rstest]
fn test_nested_lists_roundtrip() {
    let nested: BPlusList<BPlusList<u8>> = (0..10_u8).map(|row| (0..row).collect()).collect();
    let json = serde_json::to_string(&nested).unwrap();
    let restored: BPlusList<BPlusList<u8>> = serde_json::from_str(&json).unwrap();
    assert_eq!(nested, restored);
}

#[rstest]
fn test_deserialize_rejects_non_sequence() {
    let result: Result<BPlusList<i32>, _> = serde_json::from_str("{\"a\": 1}");
    assert!(result.is_err());
}
