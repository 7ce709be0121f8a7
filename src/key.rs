//! Integer key abstraction.

use std::fmt::Debug;
use std::hash::Hash;

/// An unsigned integer usable as a table key.
///
/// `Key::default()` must be zero: a zeroed key field marks an empty slot, so
/// zero itself can never be stored.
pub trait Key: Copy + Eq + Hash + Debug + Default + 'static {
    /// Widens the key for addressing and SIMD comparison.
    fn to_u64(self) -> u64;

    #[inline]
    fn is_zero(self) -> bool {
        self.to_u64() == 0
    }
}

macro_rules! impl_key {
    ($($t:ty),* $(,)?) => {
        $(
            impl Key for $t {
                #[inline]
                fn to_u64(self) -> u64 {
                    self as u64
                }
            }
        )*
    };
}

impl_key!(u8, u16, u32, u64, usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zero() {
        assert!(u8::default().is_zero());
        assert!(u16::default().is_zero());
        assert!(u32::default().is_zero());
        assert!(u64::default().is_zero());
        assert!(usize::default().is_zero());
    }

    #[test]
    fn test_widening() {
        assert_eq!(255u8.to_u64(), 255);
        assert_eq!(u32::MAX.to_u64(), u32::MAX as u64);
        assert_eq!(u64::MAX.to_u64(), u64::MAX);
        assert!(!7u16.is_zero());
    }
}
