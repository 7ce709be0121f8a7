//! Low-overhead tier: 256-slot buckets with native-width keys.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::key::Key;
use crate::options::{bucket_count, Addressing, TableOptions};

use super::{check_key, default_values, hash_map_bytes, DirectIndexedTable};

pub const LOH_SLOTS_PER_BUCKET: usize = 256;
pub const LOH_MIN_INPUTS: usize = 256;

/// Low-overhead direct-indexed table.
///
/// Keys are stored at their own width (a `u16` key costs two bytes), so the
/// per-entry overhead is the smallest of all tiers. Buckets are scanned
/// linearly.
pub struct LohTable<K, V> {
    keys: Vec<K>,
    values: Vec<V>,
    /// Occupied slots per bucket. Slots fill front to back.
    fill: Vec<u16>,
    fallback: Option<HashMap<K, V>>,
    addressing: Addressing<K>,
    len: usize,
}

impl<K: Key, V: Default> LohTable<K, V> {
    pub fn new(expected_num_inputs: usize) -> Result<Self> {
        Self::with_options(expected_num_inputs, TableOptions::default())
    }

    pub fn with_options(expected_num_inputs: usize, options: TableOptions<K>) -> Result<Self> {
        let num_buckets = bucket_count(expected_num_inputs, LOH_MIN_INPUTS, LOH_SLOTS_PER_BUCKET)?;
        if options.profile != Default::default() {
            log::debug!("loh table ignores performance profile {:?}", options.profile);
        }
        log::debug!(
            "loh table: {} buckets x {} slots, overflow={}",
            num_buckets,
            LOH_SLOTS_PER_BUCKET,
            options.overflow
        );

        let slots = num_buckets * LOH_SLOTS_PER_BUCKET;
        Ok(Self {
            keys: vec![K::default(); slots],
            values: default_values(slots),
            fill: vec![0; num_buckets],
            fallback: options.overflow.then(HashMap::new),
            addressing: Addressing::new(num_buckets, options.hash_fn),
            len: 0,
        })
    }
}

impl<K: Key, V> LohTable<K, V> {
    pub fn overflow_len(&self) -> usize {
        self.fallback.as_ref().map_or(0, HashMap::len)
    }

    /// Position of `key` among the occupied slots of `bucket`.
    #[inline]
    fn find(&self, bucket: usize, key: K) -> Option<usize> {
        let base = bucket * LOH_SLOTS_PER_BUCKET;
        let used = self.fill[bucket] as usize;
        self.keys[base..base + used]
            .iter()
            .position(|&k| k == key)
            .map(|i| base + i)
    }
}

impl<K: Key, V> DirectIndexedTable<K, V> for LohTable<K, V> {
    fn set(&mut self, key: K, value: V) -> Result<()> {
        check_key(key)?;
        let bucket = self.addressing.bucket(key);

        if let Some(slot) = self.find(bucket, key) {
            self.values[slot] = value;
            return Ok(());
        }

        let used = self.fill[bucket] as usize;
        if used < LOH_SLOTS_PER_BUCKET {
            let slot = bucket * LOH_SLOTS_PER_BUCKET + used;
            self.keys[slot] = key;
            self.values[slot] = value;
            self.fill[bucket] += 1;
            self.len += 1;
            return Ok(());
        }

        match self.fallback.as_mut() {
            Some(map) => {
                log::trace!("loh bucket {} full, key {:?} to fallback", bucket, key);
                if map.insert(key, value).is_none() {
                    self.len += 1;
                }
                Ok(())
            }
            None => {
                log::warn!("loh bucket {} full with overflow disabled", bucket);
                Err(Error::BucketFull { bucket })
            }
        }
    }

    fn get(&self, key: K) -> Result<Option<&V>> {
        check_key(key)?;
        let bucket = self.addressing.bucket(key);
        if let Some(slot) = self.find(bucket, key) {
            return Ok(Some(&self.values[slot]));
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
        self.keys.capacity() * std::mem::size_of::<K>()
            + self.values.capacity() * std::mem::size_of::<V>()
            + self.fill.capacity() * std::mem::size_of::<u16>()
            + self.fallback.as_ref().map_or(0, hash_map_bytes)
    }
}
