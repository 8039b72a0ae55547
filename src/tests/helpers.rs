use crate::Histogram;

pub fn histo(highest_trackable_value: u64, num_significant_digits: u8) -> Histogram {
    Histogram::new_with_max(highest_trackable_value, num_significant_digits).unwrap()
}
