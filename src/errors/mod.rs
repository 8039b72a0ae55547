//! Error types used throughout this library.

use thiserror::Error;

/// Errors that can occur when creating a histogram.
#[derive(Error, Debug, Eq, PartialEq, Clone, Copy)]
pub enum CreationError {
    /// Highest trackable value must be >= 2 so that the first bucket spans a
    /// non-trivial range.
    #[error("highest trackable value must be >= 2")]
    HighLessThanTwo,
    /// Number of significant digits must be in the range `[1, 5]`. It is capped at 5
    /// because 5 significant digits is already more than almost anyone needs, and
    /// memory usage scales exponentially as this increases.
    #[error("number of significant value digits must be in the range [1, 5]")]
    SigFigOutOfRange,
}

/// Errors that can occur while recording a value.
#[derive(Error, Debug, Eq, PartialEq, Clone, Copy)]
pub enum RecordError {
    /// The value to record is larger than the configured highest trackable value.
    /// Configure a higher maximum, or clamp inputs before recording.
    #[error("value exceeds the highest trackable value")]
    ValueOutOfRange,
}
