//! Table construction options and bucket sizing.

use crate::error::{Error, Result};
use crate::key::Key;

/// A caller-supplied addressing function.
///
/// When set, every bucket lookup uses `hash(key) & (num_buckets - 1)` instead
/// of `key & (num_buckets - 1)`.
pub type HashFn<K> = fn(K) -> u64;

/// Memory/speed tradeoff for tiers whose bucket divisor is tunable.
///
/// Only [`StandardTable`](crate::StandardTable) honours the profile; the other
/// tiers have a divisor fixed by their slot count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PerformanceProfile {
    /// Two expected entries per bucket.
    Fast,
    /// Four expected entries per bucket.
    #[default]
    Normal,
    /// Eight expected entries per bucket.
    SaveMemory,
}

impl PerformanceProfile {
    /// Expected entries per bucket.
    pub fn divisor(self) -> usize {
        match self {
            PerformanceProfile::Fast => 2,
            PerformanceProfile::Normal => 4,
            PerformanceProfile::SaveMemory => 8,
        }
    }
}

/// Construction options shared by every table tier.
#[derive(Debug, Clone, Copy)]
pub struct TableOptions<K> {
    /// Bucket divisor selection (default: [`PerformanceProfile::Normal`]).
    pub profile: PerformanceProfile,
    /// Custom addressing function (default: none, the key is the hash).
    pub hash_fn: Option<HashFn<K>>,
    /// Whether entries may spill past a full bucket (default: `true`).
    ///
    /// Only the medium- and low-overhead tiers can run without overflow.
    pub overflow: bool,
}

impl<K> Default for TableOptions<K> {
    fn default() -> Self {
        Self {
            profile: PerformanceProfile::Normal,
            hash_fn: None,
            overflow: true,
        }
    }
}

impl<K> TableOptions<K> {
    pub fn with_profile(mut self, profile: PerformanceProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_hash_fn(mut self, hash_fn: HashFn<K>) -> Self {
        self.hash_fn = Some(hash_fn);
        self
    }

    pub fn with_overflow(mut self, overflow: bool) -> Self {
        self.overflow = overflow;
        self
    }
}

/// Derives a bucket count from a capacity hint.
///
/// The hint is rounded up to a power of two, clamped to `min_inputs`, divided
/// by `divisor` and clamped to at least 2 buckets.
pub fn bucket_count(expected_num_inputs: usize, min_inputs: usize, divisor: usize) -> Result<usize> {
    debug_assert!(divisor > 0);
    let rounded = expected_num_inputs
        .checked_next_power_of_two()
        .ok_or(Error::CapacityOverflow(expected_num_inputs))?;
    let num_buckets = (rounded.max(min_inputs) / divisor).max(2);
    if !num_buckets.is_power_of_two() {
        return Err(Error::InvalidBucketCount(num_buckets));
    }
    Ok(num_buckets)
}

/// Maps keys to bucket indices.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Addressing<K> {
    mask: u64,
    hash_fn: Option<HashFn<K>>,
}

impl<K: Key> Addressing<K> {
    pub(crate) fn new(num_buckets: usize, hash_fn: Option<HashFn<K>>) -> Self {
        debug_assert!(num_buckets.is_power_of_two());
        Self {
            mask: num_buckets as u64 - 1,
            hash_fn,
        }
    }

    #[inline]
    pub(crate) fn bucket(&self, key: K) -> usize {
        let hash = match self.hash_fn {
            Some(f) => f(key),
            None => key.to_u64(),
        };
        (hash & self.mask) as usize
    }

    #[inline]
    pub(crate) fn num_buckets(&self) -> usize {
        self.mask as usize + 1
    }
}
