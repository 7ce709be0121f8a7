//! Direct-indexed tables.
//!
//! Every tier addresses a bucket with `key & (num_buckets - 1)` (or a custom
//! hash, see [`TableOptions`](crate::TableOptions)), searches the bucket's
//! fixed slots, then falls back to its overflow path. The tiers trade memory
//! for lookup speed:
//!
//! | Tier | Slots per bucket | Overflow |
//! |---|---|---|
//! | [`FastTable`] | 1 | medium-overhead sub-table |
//! | [`StandardTable`] | 4 | per-bucket growing list |
//! | [`MohTable`] | 64 | optional keyed fallback |
//! | [`LohTable`] | 256 | optional keyed fallback |
//!
//! None of the tables are safe for concurrent mutation; all mutators take
//! `&mut self`.

mod fast;
mod loh;
mod moh;
mod standard;

pub use fast::FastTable;
pub use loh::{LohTable, LOH_MIN_INPUTS, LOH_SLOTS_PER_BUCKET};
pub use moh::{MohTable, MOH_MIN_INPUTS, MOH_SLOTS_PER_BUCKET};
pub use standard::{StandardTable, STANDARD_MIN_INPUTS, STANDARD_SLOTS_PER_BUCKET};

use crate::error::{Error, Result};
use crate::key::Key;

/// The operations shared by every table tier.
pub trait DirectIndexedTable<K: Key, V> {
    /// Inserts or overwrites `key`.
    fn set(&mut self, key: K, value: V) -> Result<()>;

    /// Looks up `key`. Absent keys return `Ok(None)`.
    fn get(&self, key: K) -> Result<Option<&V>>;

    /// Removal is not supported by any tier and always fails.
    fn delete(&mut self, key: K) -> Result<bool> {
        check_key(key)?;
        Err(Error::Unimplemented("delete"))
    }

    /// Number of buckets; always a power of two.
    fn num_buckets(&self) -> usize;

    /// Number of distinct keys stored.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate heap bytes owned by the table.
    fn memory_usage(&self) -> usize;

    fn contains_key(&self, key: K) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

#[inline]
pub(crate) fn check_key<K: Key>(key: K) -> Result<()> {
    if key.is_zero() {
        return Err(Error::ZeroKey);
    }
    Ok(())
}

/// Fixed-slot storage: `num_buckets * slots` values, default-initialised.
pub(crate) fn default_values<V: Default>(len: usize) -> Vec<V> {
    let mut values = Vec::with_capacity(len);
    values.resize_with(len, V::default);
    values
}

/// Rough heap size of a `HashMap`, ignoring control bytes.
pub(crate) fn hash_map_bytes<K, V>(map: &std::collections::HashMap<K, V>) -> usize {
    map.capacity() * (std::mem::size_of::<K>() + std::mem::size_of::<V>() + 1)
}
