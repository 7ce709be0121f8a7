//! Bit layout of compressed-array words.
//!
//! Checkpoint word:
//! - Bit 63 = 1
//! - Bits 0..63 = absolute base value
//!
//! Packed word (bit 63 = 0) holds three 21-bit slots, slot `i` at bit `21 * i`:
//! - Bits 0..16 = magnitude
//! - Bit 16 = sign (1 = below the base)
//! - Bits 17..21 = multiplier, 1..=15
//!
//! An all-zero slot is free. An occupied slot always has a non-zero magnitude
//! and multiplier, so a difference of zero is never representable.

pub(crate) const CHECKPOINT_FLAG: u64 = 1 << 63;
pub(crate) const MAX_BASE: u64 = CHECKPOINT_FLAG - 1;

pub(crate) const SLOTS_PER_WORD: usize = 3;
const SLOT_BITS: u32 = 21;
const SLOT_MASK: u64 = (1 << SLOT_BITS) - 1;

const MAGNITUDE_MASK: u64 = (1 << 16) - 1;
const SIGN_SHIFT: u32 = 16;
const MULTIPLIER_SHIFT: u32 = 17;
const MULTIPLIER_MASK: u64 = 0xF;
pub(crate) const MAX_MULTIPLIER: u64 = MULTIPLIER_MASK;

/// Largest absolute difference any slot can hold.
pub(crate) const MAX_DIFF: u64 = MAGNITUDE_MASK * MAX_MULTIPLIER;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Word {
    Checkpoint(u64),
    Packed(PackedWord),
}

impl Word {
    #[inline]
    pub(crate) fn decode(raw: u64) -> Self {
        if is_checkpoint(raw) {
            Word::Checkpoint(raw & MAX_BASE)
        } else {
            Word::Packed(PackedWord(raw))
        }
    }
}

#[inline]
pub(crate) fn is_checkpoint(raw: u64) -> bool {
    raw & CHECKPOINT_FLAG != 0
}

#[inline]
pub(crate) fn checkpoint(base: u64) -> u64 {
    debug_assert!(base <= MAX_BASE);
    base | CHECKPOINT_FLAG
}

/// One encoded difference, relative to a checkpoint base.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Slot(u64);

impl Slot {
    /// Encodes `value - base` with the smallest multiplier that divides the
    /// difference exactly and leaves a 16-bit magnitude.
    ///
    /// Returns `None` for a zero difference or one no multiplier can express.
    pub(crate) fn encode(value: u64, base: u64) -> Option<Self> {
        let diff = value.abs_diff(base);
        if diff == 0 || diff > MAX_DIFF {
            return None;
        }
        let multiplier = (1..=MAX_MULTIPLIER).find(|m| diff % m == 0 && diff / m <= MAGNITUDE_MASK)?;
        let sign = (value < base) as u64;
        Some(Self(
            (diff / multiplier) | (sign << SIGN_SHIFT) | (multiplier << MULTIPLIER_SHIFT),
        ))
    }

    #[inline]
    pub(crate) fn magnitude(self) -> u64 {
        self.0 & MAGNITUDE_MASK
    }

    #[inline]
    pub(crate) fn multiplier(self) -> u64 {
        (self.0 >> MULTIPLIER_SHIFT) & MULTIPLIER_MASK
    }

    #[inline]
    pub(crate) fn is_negative(self) -> bool {
        (self.0 >> SIGN_SHIFT) & 1 == 1
    }

    #[inline]
    pub(crate) fn apply(self, base: u64) -> u64 {
        let delta = self.magnitude() * self.multiplier();
        if self.is_negative() {
            base - delta
        } else {
            base + delta
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PackedWord(u64);

impl PackedWord {
    pub(crate) const EMPTY: PackedWord = PackedWord(0);

    #[inline]
    pub(crate) fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub(crate) fn slot(self, i: usize) -> Option<Slot> {
        debug_assert!(i < SLOTS_PER_WORD);
        let bits = (self.0 >> (SLOT_BITS * i as u32)) & SLOT_MASK;
        (bits != 0).then_some(Slot(bits))
    }

    /// First free slot. Slots are filled in order, so this is also the count
    /// of occupied slots.
    #[inline]
    pub(crate) fn free_slot(self) -> Option<usize> {
        (0..SLOTS_PER_WORD).find(|&i| self.slot(i).is_none())
    }

    #[inline]
    pub(crate) fn with_slot(self, i: usize, slot: Slot) -> Self {
        debug_assert!(self.slot(i).is_none());
        Self(self.0 | (slot.0 << (SLOT_BITS * i as u32)))
    }

    #[cfg(test)]
    pub(crate) fn slots(self) -> impl Iterator<Item = Slot> {
        (0..SLOTS_PER_WORD).filter_map(move |i| self.slot(i))
    }
}
