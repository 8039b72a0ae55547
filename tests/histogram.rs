//! Construction, recording, and equivalence behavior.

use centile::{CreationError, Histogram, RecordError};

const TRACKABLE_MAX: u64 = 3600 * 1000 * 1000;
// Store up to 2 * 10^3 in single-unit precision. Can be 5 at most.
const SIGFIG: u8 = 3;
const TEST_VALUE_LEVEL: u64 = 4;

#[test]
fn construction_arg_ranges() {
    assert_eq!(
        CreationError::HighLessThanTwo,
        Histogram::new_with_max(1, SIGFIG).unwrap_err()
    );
    assert_eq!(
        CreationError::SigFigOutOfRange,
        Histogram::new_with_max(TRACKABLE_MAX, 0).unwrap_err()
    );
    assert_eq!(
        CreationError::SigFigOutOfRange,
        Histogram::new_with_max(TRACKABLE_MAX, 6).unwrap_err()
    );
}

#[test]
fn construction_arg_gets() {
    let h = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(h.high(), TRACKABLE_MAX);
    assert_eq!(h.sigfig(), SIGFIG);
    // 22 buckets of 1024 plus bucket 0's extra half
    assert_eq!(h.buckets(), 22);
    assert_eq!(h.distinct_values(), 23 * 1024);
}

#[test]
fn empty_histogram() {
    let h = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(h.len(), 0);
    assert!(h.is_empty());
    assert_eq!(h.min(), 0);
    assert_eq!(h.max(), 0);
    assert_eq!(h.mean(), 0.0);
    assert_eq!(h.value_at_percentile(50.0), 0);
    assert_eq!(h.percentile_below(0), 100.0);
    assert_eq!(h.iter_all().count(), 0);
}

#[test]
fn record() {
    let mut h = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    h.record(TEST_VALUE_LEVEL).unwrap();
    assert_eq!(h.count_at(TEST_VALUE_LEVEL), 1);
    assert_eq!(h.len(), 1);
}

#[test]
fn record_boundaries() {
    let mut h = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    h.record(0).unwrap();
    h.record(1).unwrap();
    h.record(TRACKABLE_MAX).unwrap();

    assert_eq!(h.len(), 3);
    assert_eq!(h.count_at(0), 1);
    assert_eq!(h.count_at(1), 1);
    assert_eq!(h.count_at(TRACKABLE_MAX), 1);
    assert_eq!(h.min(), 0);
    assert!(h.equivalent(TRACKABLE_MAX, h.max()));
}

#[test]
fn record_out_of_range() {
    let mut h = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(
        RecordError::ValueOutOfRange,
        h.record(TRACKABLE_MAX + 1).unwrap_err()
    );
    assert_eq!(
        RecordError::ValueOutOfRange,
        h.record(3 * TRACKABLE_MAX).unwrap_err()
    );

    // a failed record leaves the histogram untouched
    assert_eq!(h.len(), 0);
    assert_eq!(h.iter_all().count(), 0);
}

#[test]
fn record_in_interval() {
    let mut h = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    h.record_correct(TEST_VALUE_LEVEL, TEST_VALUE_LEVEL / 4)
        .unwrap();
    let mut r = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    r += TEST_VALUE_LEVEL;

    // The data will include corrected samples:
    assert_eq!(h.count_at(TEST_VALUE_LEVEL / 4), 1);
    assert_eq!(h.count_at(TEST_VALUE_LEVEL * 2 / 4), 1);
    assert_eq!(h.count_at(TEST_VALUE_LEVEL * 3 / 4), 1);
    assert_eq!(h.count_at(TEST_VALUE_LEVEL), 1);
    assert_eq!(h.len(), 4);
    // But the raw data will not:
    assert_eq!(r.count_at(TEST_VALUE_LEVEL / 4), 0);
    assert_eq!(r.count_at(TEST_VALUE_LEVEL * 2 / 4), 0);
    assert_eq!(r.count_at(TEST_VALUE_LEVEL * 3 / 4), 0);
    assert_eq!(r.count_at(TEST_VALUE_LEVEL), 1);
    assert_eq!(r.len(), 1);
}

#[test]
fn record_in_interval_value_at_or_below_interval_records_once() {
    let mut h = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    h.record_correct(1000, 10_000).unwrap();
    assert_eq!(h.len(), 1);
    h.record_correct(10_000, 10_000).unwrap();
    assert_eq!(h.len(), 2);
}

#[test]
fn record_in_interval_zero_interval_records_once() {
    let mut h = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    h.record_correct(1000, 0).unwrap();
    assert_eq!(h.len(), 1);
}

#[test]
fn equivalent_range() {
    let h = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(h.equivalent_range(1), 1);
    assert_eq!(h.equivalent_range(2500), 2);
    assert_eq!(h.equivalent_range(8191), 4);
    assert_eq!(h.equivalent_range(8192), 8);
    assert_eq!(h.equivalent_range(10000), 8);
}

#[test]
fn lowest_equivalent() {
    let h = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(h.lowest_equivalent(10007), 10000);
    assert_eq!(h.lowest_equivalent(10009), 10008);
}

#[test]
fn highest_equivalent() {
    let h = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(h.highest_equivalent(8180), 8183);
    assert_eq!(h.highest_equivalent(8191), 8191);
    assert_eq!(h.highest_equivalent(8193), 8199);
    assert_eq!(h.highest_equivalent(9995), 9999);
    assert_eq!(h.highest_equivalent(10007), 10007);
    assert_eq!(h.highest_equivalent(10008), 10015);
}

#[test]
fn median_equivalent() {
    let h = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    assert_eq!(h.median_equivalent(4), 4);
    assert_eq!(h.median_equivalent(5), 5);
    assert_eq!(h.median_equivalent(4000), 4001);
    assert_eq!(h.median_equivalent(8000), 8002);
    assert_eq!(h.median_equivalent(10007), 10004);
}

#[test]
fn values_are_equivalent() {
    let h = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    // resolution at 10000 is 8 units
    assert!(h.equivalent(10000, 10007));
    assert!(!h.equivalent(10007, 10008));
}

#[test]
fn count_at_out_of_range_is_zero() {
    let mut h = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    h += 1000;
    assert_eq!(h.count_at(u64::MAX), 0);
}

#[test]
fn iter_all_emits_empty_slots_between_recorded_values() {
    let mut h = Histogram::new_with_max(1000, SIGFIG).unwrap();
    h += 1;
    h += 5;

    let slots: Vec<(u64, u64)> = h.iter_all().map(|s| (s.value(), s.count())).collect();
    assert_eq!(slots, vec![(0, 0), (1, 1), (2, 0), (3, 0), (4, 0), (5, 1)]);
}

#[test]
fn describe_renders_layout() {
    let h = Histogram::new_with_max(TRACKABLE_MAX, SIGFIG).unwrap();
    let line = h.to_string();
    assert!(line.contains("highest_trackable_value: 3600000000"));
    assert!(line.contains("sub_bucket_count: 2048"));
    assert!(line.contains("bucket_count: 22"));
    assert!(line.contains("counts_len: 23552"));
}
