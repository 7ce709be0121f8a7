//! Fast tier: one slot per bucket, collisions spill into a [`MohTable`].

use crate::error::Result;
use crate::key::Key;
use crate::options::{bucket_count, Addressing, TableOptions};

use super::{check_key, default_values, DirectIndexedTable, MohTable};

const FAST_MIN_INPUTS: usize = 128;

/// Sub-table capacity relative to the primary bucket count.
const OVERFLOW_FACTOR: usize = 4;

/// Fast direct-indexed table.
///
/// The primary array holds one entry per bucket, so a non-colliding lookup is
/// one masked index and one compare. A colliding key costs a second indexed
/// lookup in a medium-overhead sub-table sized for four times as many entries
/// as there are buckets.
pub struct FastTable<K, V> {
    keys: Vec<K>,
    values: Vec<V>,
    overflow: MohTable<K, V>,
    addressing: Addressing<K>,
    len: usize,
}

impl<K: Key, V: Default> FastTable<K, V> {
    pub fn new(expected_num_inputs: usize) -> Result<Self> {
        Self::with_options(expected_num_inputs, TableOptions::default())
    }

    /// Builds the table. `hash_fn` and `overflow` are forwarded to the
    /// sub-table; with `overflow` off, a full sub-table bucket fails `set`.
    pub fn with_options(expected_num_inputs: usize, options: TableOptions<K>) -> Result<Self> {
        let num_buckets = bucket_count(expected_num_inputs, FAST_MIN_INPUTS, 1)?;
        log::debug!("fast table: {} buckets x 1 slot", num_buckets);

        let overflow = MohTable::with_options(
            num_buckets * OVERFLOW_FACTOR,
            TableOptions {
                profile: Default::default(),
                hash_fn: options.hash_fn,
                overflow: options.overflow,
            },
        )?;
        Ok(Self {
            keys: vec![K::default(); num_buckets],
            values: default_values(num_buckets),
            overflow,
            addressing: Addressing::new(num_buckets, options.hash_fn),
            len: 0,
        })
    }
}

impl<K: Key, V> FastTable<K, V> {
    /// Entries that collided out of the primary array.
    pub fn overflow_len(&self) -> usize {
        self.overflow.len()
    }
}

impl<K: Key, V> DirectIndexedTable<K, V> for FastTable<K, V> {
    fn set(&mut self, key: K, value: V) -> Result<()> {
        check_key(key)?;
        let index = self.addressing.bucket(key);

        if self.keys[index] == key {
            self.values[index] = value;
            return Ok(());
        }
        if self.keys[index].is_zero() {
            self.keys[index] = key;
            self.values[index] = value;
            self.len += 1;
            return Ok(());
        }

        log::trace!("fast bucket {} taken, key {:?} to sub-table", index, key);
        let before = self.overflow.len();
        self.overflow.set(key, value)?;
        self.len += self.overflow.len() - before;
        Ok(())
    }

    fn get(&self, key: K) -> Result<Option<&V>> {
        check_key(key)?;
        let index = self.addressing.bucket(key);
        if self.keys[index] == key {
            return Ok(Some(&self.values[index]));
        }
        if self.keys[index].is_zero() {
            return Ok(None);
        }
        self.overflow.get(key)
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
            + self.overflow.memory_usage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_one_bucket_per_input() {
        let t: FastTable<u64, u64> = FastTable::new(1025).unwrap();
        assert_eq!(t.num_buckets(), 2048);
        let t: FastTable<u64, u64> = FastTable::new(3).unwrap();
        assert_eq!(t.num_buckets(), FAST_MIN_INPUTS);
    }

    #[test]
    fn test_collisions_go_to_sub_table() {
        let mut t: FastTable<u64, u64> = FastTable::new(128).unwrap();
        let n = t.num_buckets() as u64;
        t.set(5, 1).unwrap();
        t.set(5 + n, 2).unwrap();
        t.set(5 + 2 * n, 3).unwrap();
        assert_eq!(t.overflow_len(), 2);
        assert_eq!(t.len(), 3);

        t.set(5 + n, 20).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t.get(5).unwrap(), Some(&1));
        assert_eq!(t.get(5 + n).unwrap(), Some(&20));
        assert_eq!(t.get(5 + 2 * n).unwrap(), Some(&3));
        assert_eq!(t.get(5 + 3 * n).unwrap(), None);
    }

    #[test]
    fn test_sub_table_exhaustion_without_overflow() {
        let opts = TableOptions::default().with_overflow(false);
        let mut t: FastTable<u64, u64> = FastTable::with_options(128, opts).unwrap();
        // Multiples of 1024 share primary bucket 0 and sub-table bucket 0.
        let mut result = Ok(());
        for i in 1..=200u64 {
            result = t.set(i * 1024, i);
            if result.is_err() {
                break;
            }
        }
        assert_eq!(result, Err(Error::BucketFull { bucket: 0 }));
        assert_eq!(t.len(), 1 + 64);
    }
}
