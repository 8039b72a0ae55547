//! `centile` records integer values spanning a large, configurable range while keeping
//! a configurable number of significant decimal digits of precision across the whole
//! range. The resulting "HDR" (High Dynamic Range) histogram supports fast and accurate
//! analysis of the extreme tails of non-normal distributions, like service latencies.
//!
//! A histogram is configured with the highest value it needs to track and the number of
//! significant value digits to preserve. For example, a histogram tracking values
//! between 1 and 3,600,000,000 with 3 significant digits quantizes values by no more
//! than 1/1,000th (0.1%) anywhere in that range. Such a histogram could track response
//! times from 1 microsecond to 1 hour with a resolution of 1 microsecond up to 1
//! millisecond, a resolution of 1 millisecond (or better) up to one second, and so on
//! up to 3.6 seconds (or better) at its maximum.
//!
//! The memory footprint is fixed at construction time and depends solely on the dynamic
//! range and precision chosen; recording never allocates and never searches, it
//! directly computes the storage slot for each sample.
//!
//! # Recording samples
//!
//! ```
//! use centile::Histogram;
//! let mut hist = Histogram::new_with_max(60 * 60 * 1000, 3).unwrap();
//!
//! // samples are recorded with .record, which errors if the value is too large
//! hist.record(54_321).expect("value 54321 should be in range");
//!
//! // for ergonomics, samples can also be recorded with +=
//! // this call will panic if the value is out of range!
//! hist += 54_321;
//!
//! // if the code that produces the values is subject to coordinated omission,
//! // the self-correcting record method should be used instead.
//! // for example, if the expected sampling interval is 10 msec:
//! hist.record_correct(54_321, 10).expect("value 54321 should be in range");
//! ```
//!
//! # Querying samples
//!
//! At any time the histogram can be queried for statistical measurements such as the
//! total number of samples, the value at a given percentile, or the count of samples
//! between two values:
//!
//! ```
//! use centile::Histogram;
//! let mut hist = Histogram::new_with_max(3_600_000_000, 3).unwrap();
//! for v in [31_000, 42_000, 48_000, 96_000] {
//!     hist.record(v).unwrap();
//! }
//! assert_eq!(hist.len(), 4);
//! assert!(hist.equivalent(42_000, hist.value_at_percentile(50.0)));
//! assert_eq!(hist.count_between(40_000, 50_000), 2);
//! ```
//!
//! # Errors and saturation
//!
//! Construction and recording return `Result`; everything on the query side is
//! infallible. A query given an out-of-range value saturates to a neutral result (`0`
//! for counts, `100.0` for percentiles) instead of failing, and a failed `record`
//! leaves the histogram untouched.
//!
//! A histogram is a plain owned value: it is not safe to mutate from several threads
//! without external exclusion. Writers that need concurrency should keep one histogram
//! per thread and aggregate the results downstream.

#![deny(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_results,
    variant_size_differences
)]

use std::fmt;
use std::ops::AddAssign;

use crate::iterators::Iter;

/// `Histogram` is the core data structure in centile. It records values and performs
/// analytics.
///
/// At its heart, it keeps the count for recorded samples in "buckets" of values. The
/// resolution and distribution of these buckets is tuned based on the desired highest
/// trackable value, as well as the user-specified number of significant decimal digits
/// to preserve. The values for the buckets are kept in a way that resembles floats and
/// doubles: there is a mantissa and an exponent, and each bucket represents a different
/// exponent. The "sub-buckets" within a bucket represent different values for the
/// mantissa.
///
/// To a first approximation, the sub-buckets of the first bucket would hold the values
/// `0`, `1`, `2`, `3`, …, the sub-buckets of the second bucket would hold `0`, `2`,
/// `4`, `6`, …, the third would hold `0`, `4`, `8`, and so on. However, the low half of
/// each bucket (except bucket 0) is unnecessary, since those values are already covered
/// by the sub-buckets of all the preceding buckets. Thus, `Histogram` keeps the top
/// half of every such bucket.
///
/// For the purposes of explanation, consider a `Histogram` with 2048 sub-buckets for
/// every bucket:
///
/// <pre>
/// The 0th bucket covers 0...2047 in multiples of 1, using all 2048 sub-buckets
/// The 1st bucket covers 2048..4095 in multiples of 2, using only the top 1024 sub-buckets
/// The 2nd bucket covers 4096..8191 in multiples of 4, using only the top 1024 sub-buckets
/// ...
/// </pre>
///
/// Bucket 0 is "special" here. It is the only one that has 2048 entries. All the rest
/// have 1024 entries (because their bottom half overlaps with and is already covered by
/// all of the previous buckets put together). In other words, the `k`'th bucket could
/// represent `0 * 2^k` to `2048 * 2^k` in 2048 slots with `2^k` precision, but the
/// midpoint of `1024 * 2^k = 2048 * 2^(k-1)` is the k-1'th bucket's end, and everything
/// below it is tracked with better precision by the earlier buckets.
#[derive(Debug, Clone)]
pub struct Histogram {
    // >= 2
    highest_trackable_value: u64,
    // in [1, 5]
    significant_value_digits: u8,

    // in [1, 64]
    bucket_count: u8,
    // 2^(sub_bucket_half_count_magnitude + 1), in [32, 2^18]
    sub_bucket_count: u32,
    // sub_bucket_count / 2
    sub_bucket_half_count: u32,
    // in [4, 17]
    sub_bucket_half_count_magnitude: u8,
    // the bottom sub bucket's bits set
    sub_bucket_mask: u64,

    // Number of leading zeros of the largest value that lands in bucket 0.
    leading_zero_count_base: u8,

    total_count: u64,
    counts: Vec<u64>,
}

/// Module containing the implementation of the `Histogram` slot iterator.
pub mod iterators;

impl Histogram {
    // ********************************************************************************************
    // Construction.
    // ********************************************************************************************

    /// Construct a `Histogram` given the highest value to be tracked and a number of
    /// significant decimal digits.
    ///
    /// `high` is the highest value to be tracked by the histogram, and must be a
    /// positive integer that is `>= 2`.
    ///
    /// `sigfig` specifies the number of significant figures to maintain. This is the
    /// number of significant decimal digits to which the histogram will maintain value
    /// resolution and separation. Must be in the range `[1, 5]`. If you're not sure,
    /// use 3. As `sigfig` increases, memory usage grows exponentially, so choose
    /// carefully if there will be many histograms in memory at once.
    ///
    /// Returns an error if the provided parameters are invalid; see `CreationError`.
    pub fn new_with_max(high: u64, sigfig: u8) -> Result<Histogram, CreationError> {
        if high < 2 {
            return Err(CreationError::HighLessThanTwo);
        }
        if sigfig < 1 || sigfig > 5 {
            return Err(CreationError::SigFigOutOfRange);
        }

        // Given a 3 decimal point accuracy, the expectation is obviously for "+/- 1
        // unit at 1000". It also means that it's "ok to be +/- 2 units at 2000". The
        // "tricky" thing is that it is NOT ok to be +/- 2 units at 1999. Only starting
        // at 2000. So internally, we need to maintain single unit resolution to
        // 2x 10^decimal_points.

        // largest value with single unit resolution, in [20, 200_000].
        let largest = 2 * 10_u32.pow(u32::from(sigfig));

        // Sub-bucket count must be a power of two (for clean direct indexing) that is
        // large enough to provide unit resolution up to `largest`. In [5, 18].
        let sub_bucket_count_magnitude = f64::from(largest).log2().ceil() as u8;
        let sub_bucket_half_count_magnitude = sub_bucket_count_magnitude - 1;
        let sub_bucket_count = 1_u32 << u32::from(sub_bucket_count_magnitude);
        let sub_bucket_half_count = sub_bucket_count / 2;
        let sub_bucket_mask = u64::from(sub_bucket_count) - 1;

        let bucket_count = buckets_to_cover(high, sub_bucket_count);
        // Each bucket past the first contributes only its top half worth of slots; the
        // extra half is bucket 0's bottom half.
        let counts_len = (usize::from(bucket_count) + 1) * (sub_bucket_half_count as usize);

        Ok(Histogram {
            highest_trackable_value: high,
            significant_value_digits: sigfig,

            bucket_count,
            sub_bucket_count,
            sub_bucket_half_count,
            sub_bucket_half_count_magnitude,
            sub_bucket_mask,

            // Establish leading_zero_count_base, used in the bucket_for() fast path:
            // subtract the bits that would be used by the largest value in bucket 0.
            leading_zero_count_base: 64 - sub_bucket_count_magnitude,

            total_count: 0,
            counts: vec![0; counts_len],
        })
    }

    // ********************************************************************************************
    // Histogram administrative read-outs
    // ********************************************************************************************

    /// Get the highest trackable value for the histogram in its current configuration.
    pub fn high(&self) -> u64 {
        self.highest_trackable_value
    }

    /// Get the number of significant value digits kept by this histogram.
    pub fn sigfig(&self) -> u8 {
        self.significant_value_digits
    }

    /// Get the total number of samples recorded.
    pub fn len(&self) -> u64 {
        self.total_count
    }

    /// Returns true if this histogram has no recorded values.
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// Get the number of distinct value slots in the histogram.
    pub fn distinct_values(&self) -> usize {
        self.counts.len()
    }

    /// Get the number of buckets used by the histogram to cover the highest trackable
    /// value.
    ///
    /// This method differs from `distinct_values` in that it does not count the
    /// sub-buckets within each bucket.
    pub fn buckets(&self) -> u8 {
        self.bucket_count
    }

    // ********************************************************************************************
    // Recording samples.
    // ********************************************************************************************

    /// Record `value` in the histogram.
    ///
    /// Returns an error if `value` exceeds the highest trackable value; a failed record
    /// leaves the histogram unchanged.
    pub fn record(&mut self, value: u64) -> Result<(), RecordError> {
        if value > self.highest_trackable_value {
            return Err(RecordError::ValueOutOfRange);
        }

        let index = self.index_for(value);
        self.counts[index] = self.counts[index].saturating_add(1);
        self.total_count = self.total_count.saturating_add(1);
        Ok(())
    }

    /// Record `value` in the histogram while correcting for coordinated omission.
    ///
    /// To compensate for the loss of sampled values when a recorded value is larger
    /// than the expected `interval` between value samples, this method will
    /// auto-generate and record an additional series of decreasingly-smaller (down to
    /// `interval`) value records, modeling the load the observer would have seen had it
    /// not been blocked. A `value` no larger than `interval` is recorded exactly once.
    ///
    /// Note: this is an at-recording correction; correcting the same data again after
    /// the fact double-counts the omission.
    ///
    /// Returns an error if `value` exceeds the highest trackable value.
    pub fn record_correct(&mut self, value: u64, interval: u64) -> Result<(), RecordError> {
        self.record(value)?;
        if interval == 0 {
            return Ok(());
        }

        if value > interval {
            // only enter the loop when the subtraction stays non-negative
            let mut missing = value - interval;
            while missing >= interval {
                self.record(missing)?;
                missing -= interval;
            }
        }

        Ok(())
    }

    // ********************************************************************************************
    // Iteration
    // ********************************************************************************************

    /// Iterate over the histogram's slots from the lowest value upwards, yielding each
    /// slot's value and count.
    ///
    /// Slots with a zero count are yielded as long as non-empty slots follow them;
    /// iteration ends once all recorded samples have been yielded, so the empty tail of
    /// the histogram is never visited. Consumers that only care about recorded values
    /// filter on a non-zero count.
    ///
    /// ```
    /// use centile::Histogram;
    /// let mut hist = Histogram::new_with_max(1000, 3).unwrap();
    /// hist += 1;
    /// hist += 5;
    ///
    /// let slots: Vec<(u64, u64)> = hist.iter_all().map(|s| (s.value(), s.count())).collect();
    /// assert_eq!(slots, vec![(0, 0), (1, 1), (2, 0), (3, 0), (4, 0), (5, 1)]);
    /// ```
    pub fn iter_all(&self) -> Iter<'_> {
        Iter::new(self)
    }

    // ********************************************************************************************
    // Data statistics
    // ********************************************************************************************

    /// Get the lowest recorded value level in the histogram.
    /// If the histogram has no recorded values, the value returned is 0.
    pub fn min(&self) -> u64 {
        self.iter_all()
            .find(|slot| slot.count() != 0)
            .map_or(0, |slot| slot.value())
    }

    /// Get the highest recorded value level in the histogram.
    /// If the histogram has no recorded values, the value returned is 0.
    pub fn max(&self) -> u64 {
        self.iter_all()
            .filter(|slot| slot.count() != 0)
            .last()
            .map_or(0, |slot| slot.value())
    }

    /// Get the computed mean of all recorded values in the histogram, using the median
    /// of each slot's equivalence class as its representative.
    /// If the histogram has no recorded values, the value returned is 0.0.
    pub fn mean(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }

        self.iter_all().fold(0.0_f64, |total, slot| {
            total
                + self.median_equivalent(slot.value()) as f64 * slot.count() as f64
                    / self.total_count as f64
        })
    }

    /// Get the value at a given percentile.
    ///
    /// The percentile is clamped to `[0, 100]`. The value returned is the lowest value
    /// at or below which the given percentage of the overall recorded values fall,
    /// within the histogram's resolution: when several values share the crossing slot,
    /// the slot's lowest equivalent value is reported.
    ///
    /// Returns 0 for an empty histogram.
    ///
    /// ```
    /// use centile::Histogram;
    /// let mut hist = Histogram::new_with_max(10_000, 3).unwrap();
    /// for v in 1..=100 {
    ///     hist.record(v).unwrap();
    /// }
    /// assert_eq!(hist.value_at_percentile(50.0), 50);
    /// assert_eq!(hist.value_at_percentile(99.0), 99);
    /// assert_eq!(hist.value_at_percentile(100.0), 100);
    /// ```
    pub fn value_at_percentile(&self, percentile: f64) -> u64 {
        let percentile = percentile.clamp(0.0, 100.0);

        // round to the nearest sample rank...
        let mut target = ((percentile / 100.0) * self.total_count as f64 + 0.5) as u64;
        // ...but always reach for at least the first recorded entry
        if target < 1 {
            target = 1;
        }

        let mut total_to_current = 0_u64;
        for slot in self.iter_all() {
            total_to_current = total_to_current.saturating_add(slot.count());
            if total_to_current >= target {
                return slot.value();
            }
        }

        0
    }

    /// Get the percentile of recorded samples at or below a given value.
    ///
    /// The returned percentile covers every sample in a slot whose value range lies at
    /// or below `value`, inclusive of `value`'s own slot. A value beyond the
    /// histogram's representable range returns 100.0, as does any query against an
    /// empty histogram.
    pub fn percentile_below(&self, value: u64) -> f64 {
        if self.bucket_for(value) >= self.bucket_count {
            return 100.0;
        }
        if self.total_count == 0 {
            return 100.0;
        }

        let target_index = self.index_for(value);
        let total_to_value: u64 = self.counts[..=target_index].iter().sum();
        100.0 * total_to_value as f64 / self.total_count as f64
    }

    /// Get the count of recorded values within a range of value levels, inclusive to
    /// within the histogram's resolution.
    ///
    /// `low` and `high` are both rounded down to the lowest value of their equivalence
    /// class, and every slot between the two (inclusive) contributes to the count.
    /// Returns 0 when either bound is beyond the representable range, or when the
    /// bounds are reversed.
    pub fn count_between(&self, low: u64, high: u64) -> u64 {
        if self.bucket_for(low) >= self.bucket_count || self.bucket_for(high) >= self.bucket_count {
            return 0;
        }

        let low_index = self.index_for(low);
        let high_index = self.index_for(high);
        if low_index > high_index {
            return 0;
        }
        self.counts[low_index..=high_index].iter().sum()
    }

    /// Get the count of recorded values at a specific value, covering all recorded
    /// values in that value's equivalence class.
    ///
    /// Returns 0 when the value is beyond the representable range.
    pub fn count_at(&self, value: u64) -> u64 {
        if self.bucket_for(value) >= self.bucket_count {
            return 0;
        }
        self.counts[self.index_for(value)]
    }

    // ********************************************************************************************
    // Public helpers
    // ********************************************************************************************

    /// Determine if two values are equivalent within the histogram's resolution.
    /// Equivalent here means that value samples recorded for any two equivalent values
    /// are counted in a common total count.
    pub fn equivalent(&self, value1: u64, value2: u64) -> bool {
        self.lowest_equivalent(value1) == self.lowest_equivalent(value2)
    }

    /// Get the lowest value that is equivalent to the given value within the
    /// histogram's resolution.
    pub fn lowest_equivalent(&self, value: u64) -> u64 {
        let bucket_index = self.bucket_for(value);
        let sub_bucket_index = self.sub_bucket_for(value, bucket_index);
        self.value_from_loc(bucket_index, sub_bucket_index)
    }

    /// Get the highest value that is equivalent to the given value within the
    /// histogram's resolution.
    ///
    /// Note that the return value is capped at `u64::MAX`.
    pub fn highest_equivalent(&self, value: u64) -> u64 {
        if value == u64::MAX {
            u64::MAX
        } else {
            self.next_non_equivalent(value) - 1
        }
    }

    /// Get a value that lies in the middle (rounded up) of the range of values
    /// equivalent to the given value.
    pub fn median_equivalent(&self, value: u64) -> u64 {
        // adding half of the range to the bottom of the range can't overflow since the
        // whole range ends at a power of two no larger than 2^64
        self.lowest_equivalent(value) + (self.equivalent_range(value) >> 1)
    }

    /// Get the next value that is *not* equivalent to the given value within the
    /// histogram's resolution.
    ///
    /// Note that the return value is capped at `u64::MAX`.
    pub fn next_non_equivalent(&self, value: u64) -> u64 {
        self.lowest_equivalent(value)
            .saturating_add(self.equivalent_range(value))
    }

    /// Get the size (in value units) of the range of values that are equivalent to the
    /// given value within the histogram's resolution: the spacing between successive
    /// representable values at this magnitude.
    pub fn equivalent_range(&self, value: u64) -> u64 {
        1_u64 << self.bucket_for(value)
    }

    // ********************************************************************************************
    // Internal helpers
    // ********************************************************************************************

    /// Compute the lowest (and therefore highest precision) bucket index whose
    /// sub-buckets can represent the value.
    #[inline]
    fn bucket_for(&self, value: u64) -> u8 {
        // Calculates the number of powers of two by which the value is greater than
        // the biggest value that fits in bucket 0. This is the bucket index since each
        // successive bucket can hold a value 2x greater. The mask maps small values to
        // bucket 0. It also caps the leading zeros at leading_zero_count_base, so the
        // subtraction will not underflow.
        self.leading_zero_count_base - (value | self.sub_bucket_mask).leading_zeros() as u8
    }

    /// Compute the position inside a bucket at which the given value should be
    /// recorded, in `[0, sub_bucket_count)`.
    ///
    /// For `bucket_index > 0` the result is in the top half of the bucket: the value
    /// would otherwise have fit in the bucket below.
    #[inline]
    fn sub_bucket_for(&self, value: u64, bucket_index: u8) -> u32 {
        (value >> bucket_index) as u32
    }

    /// Find the flat counts slot the given value should be placed in.
    ///
    /// In range for the counts array whenever `bucket_for(value) < bucket_count`,
    /// which every caller establishes first (recording by bounding the value, queries
    /// by checking the bucket).
    fn index_for(&self, value: u64) -> usize {
        let bucket_index = self.bucket_for(value);
        let sub_bucket_index = self.sub_bucket_for(value, bucket_index);
        self.index_for_loc(bucket_index, sub_bucket_index)
    }

    /// Flat counts slot for a (bucket, sub-bucket) pair.
    fn index_for_loc(&self, bucket_index: u8, sub_bucket_index: u32) -> usize {
        debug_assert!(sub_bucket_index < self.sub_bucket_count);
        debug_assert!(bucket_index < self.bucket_count);
        debug_assert!(bucket_index == 0 || sub_bucket_index >= self.sub_bucket_half_count);

        // Index of the first slot that belongs to this bucket, halfway through its
        // sub-buckets: the lower half collapses onto the slots of all the preceding
        // buckets. Bucket 0 is the exception and owns both halves.
        let bucket_base_index =
            (i32::from(bucket_index) + 1) << self.sub_bucket_half_count_magnitude;

        // The offset is only negative in bucket 0 (where a value may sit in the lower
        // half), and bucket_base_index starts halfway into bucket 0's slots there, so
        // the sum is always non-negative.
        let offset_in_bucket = sub_bucket_index as i32 - self.sub_bucket_half_count as i32;

        (bucket_base_index + offset_in_bucket) as usize
    }

    /// Lowest value that maps to the given (bucket, sub-bucket) pair.
    #[inline]
    fn value_from_loc(&self, bucket_index: u8, sub_bucket_index: u32) -> u64 {
        u64::from(sub_bucket_index) << bucket_index
    }

    /// Count recorded at the given (bucket, sub-bucket) pair.
    fn count_at_loc(&self, bucket_index: u8, sub_bucket_index: u32) -> u64 {
        self.counts[self.index_for_loc(bucket_index, sub_bucket_index)]
    }
}

/// Smallest number of buckets needed so that the top bucket's span reaches `high`.
fn buckets_to_cover(high: u64, sub_bucket_count: u32) -> u8 {
    // the k'th bucket tracks values up to (sub_bucket_count - 1) * 2^(k - 1)
    let mut trackable = u64::from(sub_bucket_count) - 1;
    let mut buckets_needed = 1;
    while trackable < high {
        if trackable > u64::MAX / 2 {
            // the next doubling would overflow; that bucket covers the rest of u64
            return buckets_needed + 1;
        }
        trackable <<= 1;
        buckets_needed += 1;
    }
    buckets_needed
}

// ********************************************************************************************
// Trait implementations
// ********************************************************************************************

// make it more ergonomic to record samples
impl AddAssign<u64> for Histogram {
    fn add_assign(&mut self, value: u64) {
        self.record(value).unwrap();
    }
}

impl fmt::Display for Histogram {
    /// Render the histogram's internal layout constants on a single line. Useful when
    /// diagnosing bucketing behavior; not a stable format.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "highest_trackable_value: {}, significant_value_digits: {}, \
             sub_bucket_half_count_magnitude: {}, sub_bucket_half_count: {}, \
             sub_bucket_mask: {}, sub_bucket_count: {}, bucket_count: {}, \
             counts_len: {}",
            self.highest_trackable_value,
            self.significant_value_digits,
            self.sub_bucket_half_count_magnitude,
            self.sub_bucket_half_count,
            self.sub_bucket_mask,
            self.sub_bucket_count,
            self.bucket_count,
            self.counts.len()
        )
    }
}

#[path = "tests/tests.rs"]
#[cfg(test)]
mod tests;

pub mod errors;
pub use crate::errors::*;
