//! Error types for the tables and the compressed array.

use thiserror::Error;

/// Error variants for table and compressed-array operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Key `0` is reserved as the empty-slot sentinel.
    #[error("key 0 is reserved as the empty-slot sentinel")]
    ZeroKey,

    /// The derived bucket count is not a power of two.
    #[error("bucket count {0} is not a power of two")]
    InvalidBucketCount(usize),

    /// The capacity hint cannot be rounded up to a power of two.
    #[error("expected input count {0} is too large")]
    CapacityOverflow(usize),

    /// A bucket's fixed slots are exhausted and overflow is disabled.
    #[error("bucket {bucket} is full and overflow is disabled")]
    BucketFull {
        /// Index of the exhausted bucket.
        bucket: usize,
    },

    /// The value does not fit in a checkpoint word.
    #[error("value {0:#x} does not fit in 63 bits")]
    ValueTooLarge(u64),

    /// Logical index past the end of the compressed array.
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        /// Requested index.
        index: usize,
        /// Number of stored values.
        len: usize,
    },

    /// The operation exists in the API but is not provided.
    #[error("not implemented: {0}")]
    Unimplemented(&'static str),

    /// An internal invariant no longer holds.
    #[error("internal invariant violated: {0}")]
    Corrupted(&'static str),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
