//! Iteration over histogram slots.

use crate::Histogram;

/// A single counter slot: the lowest value that maps to the slot, together with the
/// count recorded for its equivalence class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    value: u64,
    count: u64,
}

impl Slot {
    /// The lowest value equivalent to every value recorded in this slot.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Number of samples recorded in this slot's equivalence class.
    pub fn count(&self) -> u64 {
        self.count
    }
}

/// An iterator that walks every slot in value order: bucket 0 from its first
/// sub-bucket, each later bucket from the top half (the lower half collapses onto the
/// slots of the preceding buckets).
///
/// Slots with a zero count are yielded when non-empty slots follow them; the walk ends
/// after the slot at which the cumulative yielded count reaches the histogram's total,
/// so the empty tail is never visited. See `Histogram::iter_all` for details.
pub struct Iter<'a> {
    hist: &'a Histogram,
    bucket_index: u8,
    sub_bucket_index: u32,
    count_to_index: u64,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(hist: &'a Histogram) -> Iter<'a> {
        Iter {
            hist,
            bucket_index: 0,
            sub_bucket_index: 0,
            count_to_index: 0,
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        // all recorded samples yielded? for an empty histogram this ends the walk
        // before the first slot
        if self.count_to_index >= self.hist.len() {
            return None;
        }
        // the cumulative count reaches the total before the walk runs off the end; the
        // bound only matters if a counter was mutated behind our back
        if self.bucket_index >= self.hist.buckets() {
            return None;
        }

        let value = self
            .hist
            .value_from_loc(self.bucket_index, self.sub_bucket_index);
        let count = self
            .hist
            .count_at_loc(self.bucket_index, self.sub_bucket_index);
        self.count_to_index += count;

        self.sub_bucket_index += 1;
        if self.sub_bucket_index >= self.hist.sub_bucket_count {
            self.sub_bucket_index = self.hist.sub_bucket_half_count;
            self.bucket_index += 1;
        }

        Some(Slot { value, count })
    }
}
