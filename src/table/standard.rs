//! Standard tier: four slots per bucket plus an unbounded per-bucket list.

use crate::error::Result;
use crate::key::Key;
use crate::options::{bucket_count, Addressing, TableOptions};

use super::{check_key, default_values, DirectIndexedTable};

pub const STANDARD_SLOTS_PER_BUCKET: usize = 4;
pub const STANDARD_MIN_INPUTS: usize = 128;

/// Standard direct-indexed table.
///
/// The bucket divisor follows [`PerformanceProfile`](crate::PerformanceProfile):
/// `Normal` sizes one bucket per four expected entries, matching the slot
/// count. Overflow is always available, so `set` only fails on key `0`.
pub struct StandardTable<K, V> {
    keys: Vec<K>,
    values: Vec<V>,
    overflow: Vec<Vec<(K, V)>>,
    addressing: Addressing<K>,
    len: usize,
}

impl<K: Key, V: Default> StandardTable<K, V> {
    pub fn new(expected_num_inputs: usize) -> Result<Self> {
        Self::with_options(expected_num_inputs, TableOptions::default())
    }

    pub fn with_options(expected_num_inputs: usize, options: TableOptions<K>) -> Result<Self> {
        let num_buckets = bucket_count(
            expected_num_inputs,
            STANDARD_MIN_INPUTS,
            options.profile.divisor(),
        )?;
        if !options.overflow {
            log::debug!("standard table always overflows; ignoring overflow=false");
        }
        log::debug!(
            "standard table: {} buckets x {} slots, profile={:?}",
            num_buckets,
            STANDARD_SLOTS_PER_BUCKET,
            options.profile
        );

        let slots = num_buckets * STANDARD_SLOTS_PER_BUCKET;
        let mut overflow = Vec::with_capacity(num_buckets);
        overflow.resize_with(num_buckets, Vec::new);
        Ok(Self {
            keys: vec![K::default(); slots],
            values: default_values(slots),
            overflow,
            addressing: Addressing::new(num_buckets, options.hash_fn),
            len: 0,
        })
    }
}

impl<K: Key, V> StandardTable<K, V> {
    /// Longest overflow list; a quick skew indicator.
    pub fn max_overflow_len(&self) -> usize {
        self.overflow.iter().map(Vec::len).max().unwrap_or(0)
    }
}

impl<K: Key, V> DirectIndexedTable<K, V> for StandardTable<K, V> {
    fn set(&mut self, key: K, value: V) -> Result<()> {
        check_key(key)?;
        let bucket = self.addressing.bucket(key);
        let base = bucket * STANDARD_SLOTS_PER_BUCKET;
        let slots = &mut self.keys[base..base + STANDARD_SLOTS_PER_BUCKET];

        let mut empty = None;
        for (i, k) in slots.iter().enumerate() {
            if *k == key {
                self.values[base + i] = value;
                return Ok(());
            }
            if empty.is_none() && k.is_zero() {
                empty = Some(i);
            }
        }
        if let Some(i) = empty {
            slots[i] = key;
            self.values[base + i] = value;
            self.len += 1;
            return Ok(());
        }

        let list = &mut self.overflow[bucket];
        if let Some(entry) = list.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
            return Ok(());
        }
        log::trace!("standard bucket {} full, key {:?} to overflow", bucket, key);
        list.push((key, value));
        self.len += 1;
        Ok(())
    }

    fn get(&self, key: K) -> Result<Option<&V>> {
        check_key(key)?;
        let bucket = self.addressing.bucket(key);
        let base = bucket * STANDARD_SLOTS_PER_BUCKET;
        if let Some(i) = self.keys[base..base + STANDARD_SLOTS_PER_BUCKET]
            .iter()
            .position(|&k| k == key)
        {
            return Ok(Some(&self.values[base + i]));
        }
        Ok(self.overflow[bucket]
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v))
    }

    fn num_buckets(&self) -> usize {
        self.addressing.num_buckets()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn memory_usage(&self) -> usize {
        let overflow: usize = self
            .overflow
            .iter()
            .map(|l| l.capacity() * std::mem::size_of::<(K, V)>())
            .sum();
        self.keys.capacity() * std::mem::size_of::<K>()
            + self.values.capacity() * std::mem::size_of::<V>()
            + self.overflow.capacity() * std::mem::size_of::<Vec<(K, V)>>()
            + overflow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::PerformanceProfile;

    #[test]
    fn test_profile_divisor() {
        let sizes: Vec<usize> = [
            PerformanceProfile::Fast,
            PerformanceProfile::Normal,
            PerformanceProfile::SaveMemory,
        ]
        .into_iter()
        .map(|p| {
            let opts = TableOptions::default().with_profile(p);
            StandardTable::<u64, u64>::with_options(4096, opts)
                .unwrap()
                .num_buckets()
        })
        .collect();
        assert_eq!(sizes, vec![2048, 1024, 512]);
    }

    #[test]
    fn test_overflow_list() {
        let mut t: StandardTable<u64, u64> = StandardTable::new(128).unwrap();
        let buckets = t.num_buckets() as u64;
        // Ten keys sharing bucket 1.
        for i in 0..10u64 {
            t.set(1 + i * buckets, i).unwrap();
        }
        assert_eq!(t.max_overflow_len(), 10 - STANDARD_SLOTS_PER_BUCKET);
        t.set(1 + 9 * buckets, 100).unwrap();
        assert_eq!(t.get(1 + 9 * buckets).unwrap(), Some(&100));
        assert_eq!(t.len(), 10);
    }

    #[test]
    fn test_randomized_against_std_map() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};
        use std::collections::HashMap;

        let mut rng = StdRng::seed_from_u64(3);
        let mut t: StandardTable<u32, u64> = StandardTable::new(2000).unwrap();
        let mut m: HashMap<u32, u64> = HashMap::new();
        for _ in 0..20_000 {
            let key = rng.gen_range(1..5000u32);
            if rng.gen_bool(0.6) {
                let v: u64 = rng.gen();
                t.set(key, v).unwrap();
                m.insert(key, v);
            } else {
                assert_eq!(t.get(key).unwrap(), m.get(&key));
            }
        }
        assert_eq!(t.len(), m.len());
    }
}
