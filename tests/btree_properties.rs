//! Property tests: arbitrary insertion orders against a sorted model.

use interchange_btree::{BTreeIndex, Datatype, Error, IndexConfig, Operator, PageId, RecordId, Tuple};
use proptest::prelude::*;
use tempfile::tempdir;

fn rid(i: usize) -> RecordId {
    RecordId::new(PageId::new(1 + (i / 64) as u32), (i % 64) as u16)
}

fn build(keys: &[i32], leaf: usize, node: usize) -> (tempfile::TempDir, BTreeIndex) {
    let dir = tempdir().unwrap();
    let config = IndexConfig::default()
        .with_pool_size(8)
        .with_leaf_capacity(leaf)
        .with_node_capacity(node);
    let mut empty = Vec::<Tuple>::new().into_iter();
    let mut index =
        BTreeIndex::open_or_create(dir.path(), "prop", &mut empty, 0, Datatype::Integer, config)
            .unwrap();
    for (i, &k) in keys.iter().enumerate() {
        index.insert_entry(k, rid(i)).unwrap();
    }
    (dir, index)
}

fn scan(index: &mut BTreeIndex, low: i32, high: i32) -> Vec<RecordId> {
    index
        .start_scan(low, Operator::GreaterThanOrEqual, high, Operator::LessThanOrEqual)
        .unwrap();
    let mut out = Vec::new();
    loop {
        match index.scan_next() {
            Ok(r) => out.push(r),
            Err(Error::ScanComplete) => break,
            Err(e) => panic!("scan failed: {}", e),
        }
    }
    index.end_scan().unwrap();
    out
}

/// Keys of the model entries inside `[low, high]`, in scan order.
fn model_keys(keys: &[i32], got: &[RecordId]) -> Vec<i32> {
    got.iter()
        .map(|r| {
            let i = (r.page_number.0 as usize - 1) * 64 + r.slot_number as usize;
            keys[i]
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// A full scan returns every inserted entry, keys non-decreasing.
    #[test]
    fn prop_full_scan_matches_model(
        keys in proptest::collection::vec(-50i32..50, 0..300),
        leaf in 2usize..6,
        half_node in 1usize..3,
    ) {
        let (_dir, mut index) = build(&keys, leaf, half_node * 2);

        let got = scan(&mut index, i32::MIN, i32::MAX);
        prop_assert_eq!(got.len(), keys.len());

        let got_keys = model_keys(&keys, &got);
        prop_assert!(got_keys.windows(2).all(|w| w[0] <= w[1]));

        let mut got_sorted = got.clone();
        got_sorted.sort();
        let mut expected: Vec<RecordId> = (0..keys.len()).map(rid).collect();
        expected.sort();
        prop_assert_eq!(got_sorted, expected);
    }

    /// Bounded scans return exactly the entries inside the bounds.
    #[test]
    fn prop_range_scan_matches_model(
        keys in proptest::collection::vec(0i32..40, 1..200),
        low in -5i32..45,
        width in 0i32..20,
    ) {
        let (_dir, mut index) = build(&keys, 3, 4);
        let high = low + width;

        let got_keys = model_keys(&keys, &scan(&mut index, low, high));
        let mut expected: Vec<i32> = keys.iter().copied().filter(|k| (low..=high).contains(k)).collect();
        expected.sort();
        prop_assert_eq!(got_keys, expected);
        prop_assert_eq!(index.pinned_page_count(), 0);
    }

    /// The tree stays balanced and within fan-out bounds.
    #[test]
    fn prop_structure_invariants(
        keys in proptest::collection::vec(any::<i32>(), 1..400),
    ) {
        let (_dir, index) = build(&keys, 4, 4);
        let shape = index.check_integrity().unwrap();
        prop_assert_eq!(shape.entry_count, keys.len());
        prop_assert!(shape.leaf_count >= 1);
    }
}
