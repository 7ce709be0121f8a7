//! Medium-overhead tier: 64-slot buckets searched with [`find_exact`].

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::key::Key;
use crate::options::{bucket_count, Addressing, TableOptions};
use crate::search::find_exact;

use super::{check_key, default_values, hash_map_bytes, DirectIndexedTable};

pub const MOH_SLOTS_PER_BUCKET: usize = 64;
pub const MOH_MIN_INPUTS: usize = 128;

/// Medium-overhead direct-indexed table.
///
/// Keys are widened to `u64` and laid out as contiguous 64-slot blocks so a
/// bucket probe is a single fixed-width exact-match search. Entries that miss
/// a full bucket go to a keyed fallback map, unless overflow is disabled in
/// which case [`set`](DirectIndexedTable::set) fails with
/// [`Error::BucketFull`].
pub struct MohTable<K, V> {
    /// `num_buckets * MOH_SLOTS_PER_BUCKET`, zero = empty.
    keys: Vec<u64>,
    values: Vec<V>,
    fallback: Option<HashMap<K, V>>,
    addressing: Addressing<K>,
    len: usize,
}

impl<K: Key, V: Default> MohTable<K, V> {
    pub fn new(expected_num_inputs: usize) -> Result<Self> {
        Self::with_options(expected_num_inputs, TableOptions::default())
    }

    pub fn with_options(expected_num_inputs: usize, options: TableOptions<K>) -> Result<Self> {
        let num_buckets = bucket_count(expected_num_inputs, MOH_MIN_INPUTS, MOH_SLOTS_PER_BUCKET)?;
        if options.profile != Default::default() {
            log::debug!("moh table ignores performance profile {:?}", options.profile);
        }
        log::debug!(
            "moh table: {} buckets x {} slots, overflow={}",
            num_buckets,
            MOH_SLOTS_PER_BUCKET,
            options.overflow
        );

        let slots = num_buckets * MOH_SLOTS_PER_BUCKET;
        Ok(Self {
            keys: vec![0; slots],
            values: default_values(slots),
            fallback: options.overflow.then(HashMap::new),
            addressing: Addressing::new(num_buckets, options.hash_fn),
            len: 0,
        })
    }
}

impl<K: Key, V> MohTable<K, V> {
    /// Number of entries held in the fallback map.
    pub fn overflow_len(&self) -> usize {
        self.fallback.as_ref().map_or(0, HashMap::len)
    }

    #[inline]
    fn slot_range(&self, key: K) -> (usize, usize) {
        let bucket = self.addressing.bucket(key);
        (bucket, bucket * MOH_SLOTS_PER_BUCKET)
    }
}

impl<K: Key, V> DirectIndexedTable<K, V> for MohTable<K, V> {
    fn set(&mut self, key: K, value: V) -> Result<()> {
        check_key(key)?;
        let (bucket, base) = self.slot_range(key);
        let block = &mut self.keys[base..base + MOH_SLOTS_PER_BUCKET];

        if let Some(i) = find_exact(key.to_u64(), block) {
            self.values[base + i] = value;
            return Ok(());
        }

        // Slots fill front to back and are never vacated.
        if let Some(i) = block.iter().position(|&k| k == 0) {
            block[i] = key.to_u64();
            self.values[base + i] = value;
            self.len += 1;
            return Ok(());
        }

        match self.fallback.as_mut() {
            Some(map) => {
                log::trace!("moh bucket {} full, key {:?} to fallback", bucket, key);
                if map.insert(key, value).is_none() {
                    self.len += 1;
                }
                Ok(())
            }
            None => {
                log::warn!("moh bucket {} full with overflow disabled", bucket);
                Err(Error::BucketFull { bucket })
            }
        }
    }

    fn get(&self, key: K) -> Result<Option<&V>> {
        check_key(key)?;
        let (_, base) = self.slot_range(key);
        if let Some(i) = find_exact(key.to_u64(), &self.keys[base..base + MOH_SLOTS_PER_BUCKET]) {
            return Ok(Some(&self.values[base + i]));
        }
        Ok(self.fallback.as_ref().and_then(|map| map.get(&key)))
    }

    fn num_buckets(&self) -> usize {
        self.addressing.num_buckets()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn memory_usage(&self) -> usize {
        self.keys.capacity() * std::mem::size_of::<u64>()
            + self.values.capacity() * std::mem::size_of::<V>()
            + self.fallback.as_ref().map_or(0, hash_map_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_sizing() {
        let t: MohTable<u64, u64> = MohTable::new(0).unwrap();
        assert_eq!(t.num_buckets(), 2);
        let t: MohTable<u64, u64> = MohTable::new(100_000).unwrap();
        assert_eq!(t.num_buckets(), 131_072 / MOH_SLOTS_PER_BUCKET);
    }

    #[test]
    fn test_full_bucket_without_overflow() {
        let opts = TableOptions::default().with_overflow(false);
        let mut t: MohTable<u64, u64> = MohTable::with_options(128, opts).unwrap();
        assert_eq!(t.num_buckets(), 2);

        // Even keys all land in bucket 0.
        for i in 1..=MOH_SLOTS_PER_BUCKET as u64 {
            t.set(i * 2, i).unwrap();
        }
        assert_eq!(t.set(1000, 0), Err(Error::BucketFull { bucket: 0 }));
        // Overwrite still works on a full bucket.
        t.set(2, 99).unwrap();
        assert_eq!(t.get(2).unwrap(), Some(&99));
        // Bucket 1 is untouched.
        t.set(1001, 7).unwrap();
        assert_eq!(t.len(), MOH_SLOTS_PER_BUCKET + 1);
    }

    #[test]
    fn test_fallback_overwrite() {
        let mut t: MohTable<u64, u64> = MohTable::new(128).unwrap();
        for i in 1..=(MOH_SLOTS_PER_BUCKET as u64 + 10) {
            t.set(i * 2, i).unwrap();
        }
        assert_eq!(t.overflow_len(), 10);
        let last = (MOH_SLOTS_PER_BUCKET as u64 + 10) * 2;
        t.set(last, 0).unwrap();
        assert_eq!(t.get(last).unwrap(), Some(&0));
        assert_eq!(t.overflow_len(), 10);
        assert_eq!(t.len(), MOH_SLOTS_PER_BUCKET + 10);
    }

    #[test]
    fn test_custom_hash_spreads_keys() {
        fn spread(k: u64) -> u64 {
            k >> 6
        }
        let opts = TableOptions::default()
            .with_overflow(false)
            .with_hash_fn(spread);
        let mut t: MohTable<u64, u64> = MohTable::with_options(1024, opts).unwrap();
        // Multiples of 64 would all hit bucket 0 under plain masking.
        for i in 1..=512u64 {
            t.set(i * 64, i).unwrap();
        }
        for i in 1..=512u64 {
            assert_eq!(t.get(i * 64).unwrap(), Some(&i));
        }
    }
}
