//! # dam-rs
//!
//! Direct-indexed tables and a checkpoint-compressed array for integer data.
//!
//! The tables address a bucket straight from the key (`key & (buckets - 1)`)
//! and come in four tiers that trade memory for lookup speed. See
//! [`table`] for the tier layout.
//!
//! [`CompressedArray`] stores an append-only `u64` sequence as absolute
//! checkpoints plus small packed differences, and rearranges its storage to
//! reuse an earlier checkpoint when that saves a word.
//!
//! ## Example
//!
//! ```rust
//! use dam_rs::{CompressedArray, DirectIndexedTable, MohTable};
//!
//! let mut t: MohTable<u64, u64> = MohTable::new(1024).unwrap();
//! t.set(7, 70).unwrap();
//! assert_eq!(t.get(7).unwrap(), Some(&70));
//! assert_eq!(t.get(8).unwrap(), None);
//!
//! let mut a = CompressedArray::new();
//! a.append(1_000_000).unwrap();
//! a.append(1_000_040).unwrap();
//! assert_eq!(a.get(1).unwrap(), 1_000_040);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

pub mod compressed;
pub mod error;
pub mod key;
pub mod options;
pub mod search;
pub mod table;

pub use compressed::CompressedArray;
pub use error::{Error, Result};
pub use key::Key;
pub use options::{HashFn, PerformanceProfile, TableOptions};
pub use table::{DirectIndexedTable, FastTable, LohTable, MohTable, StandardTable};

#[cfg(test)]
mod proptests;
