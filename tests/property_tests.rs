//! Property tests for the canonical sort and deduplication primitive.

use proptest::prelude::*;

use odsutils::check;
use odsutils::record::{OdsRecord, Value};
use odsutils::standard::Standard;

fn record_for(src: u8, hour: u8, dur: u8) -> OdsRecord {
    let mut rec = OdsRecord::new();
    rec.insert("site_id".into(), Value::Str("hcro".into()));
    rec.insert("src_id".into(), Value::Str(format!("src{src}")));
    rec.insert(
        "src_start_utc".into(),
        Value::Str(format!("2025-01-01T{hour:02}:00:00")),
    );
    rec.insert(
        "src_end_utc".into(),
        Value::Str(format!("2025-01-01T{:02}:00:00", hour + dur)),
    );
    rec
}

fn records() -> impl Strategy<Value = Vec<OdsRecord>> {
    proptest::collection::vec((0u8..3, 0u8..6, 1u8..3), 0..24)
        .prop_map(|specs| {
            specs
                .into_iter()
                .map(|(src, hour, dur)| record_for(src, hour, dur))
                .collect()
        })
}

proptest! {
    #[test]
    fn test_dedup_is_idempotent(entries in records()) {
        let standard = Standard::new("latest").unwrap();
        let once = check::dedup_entries(&entries, &standard);
        let twice = check::dedup_entries(&once, &standard);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_dedup_never_grows(entries in records()) {
        let standard = Standard::new("latest").unwrap();
        let deduped = check::dedup_entries(&entries, &standard);
        prop_assert!(deduped.len() <= entries.len());
    }

    #[test]
    fn test_dedup_ignores_input_order(entries in records(), rotation in 0usize..24) {
        let standard = Standard::new("latest").unwrap();
        let mut rotated = entries.clone();
        if !rotated.is_empty() {
            let len = rotated.len();
            rotated.rotate_left(rotation % len);
        }
        prop_assert_eq!(
            check::dedup_entries(&entries, &standard),
            check::dedup_entries(&rotated, &standard)
        );
    }

    #[test]
    fn test_sort_without_collapse_preserves_count(entries in records()) {
        let standard = Standard::new("latest").unwrap();
        let sorted = check::sort_entries(&entries, standard.sort_order_time(), false);
        prop_assert_eq!(sorted.len(), entries.len());
    }

    #[test]
    fn test_sorted_output_is_ordered_by_start(entries in records()) {
        let standard = Standard::new("latest").unwrap();
        let sorted = check::sort_entries(&entries, standard.sort_order_time(), false);
        let starts: Vec<String> = sorted
            .iter()
            .map(|r| r["src_start_utc"].string_form())
            .collect();
        let mut expected = starts.clone();
        expected.sort();
        prop_assert_eq!(starts, expected);
    }
}
