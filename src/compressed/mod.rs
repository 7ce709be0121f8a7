//! Append-only `u64` array stored as checkpoints and packed differences.
//!
//! Storage is a flat run of 64-bit words. A checkpoint word starts a scope and
//! is itself a stored value; the packed words after it hold differences from
//! its base until the next checkpoint.
//!
//! ## Restructuring
//!
//! When a new value cannot be expressed against the most recent checkpoint
//! but can against an earlier one, the array rebuilds its storage so the value
//! joins that earlier scope instead of opening a new checkpoint. Everything
//! after the scope is replayed through the normal append path. The value
//! thereby moves ahead of later scopes in storage; a relocation entry keeps
//! its logical index, so [`CompressedArray::get`] always answers in append
//! order.

mod word;

use crate::error::{Error, Result};

use word::{PackedWord, Slot, Word, MAX_BASE, SLOTS_PER_WORD};

/// A value whose stored position differs from its append position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Relocation {
    logical: usize,
    stored: usize,
}

/// Append-only array of values below `2^63`, compressed around checkpoints.
///
/// Reads walk storage from the start, so [`get`](Self::get) is linear in the
/// number of words. Not safe for concurrent use.
///
/// ```rust
/// use dam_rs::CompressedArray;
///
/// let mut a = CompressedArray::new();
/// for v in [1_000, 1_004, 1_010, 9_000_000, 1_020] {
///     a.append(v).unwrap();
/// }
/// assert_eq!(a.get(3).unwrap(), 9_000_000);
/// assert_eq!(a.get(4).unwrap(), 1_020);
/// assert_eq!(a.num_checkpoints(), 2);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CompressedArray {
    words: Vec<u64>,
    /// Index of the most recent checkpoint word.
    last_checkpoint: Option<usize>,
    /// Sorted by `stored`.
    relocations: Vec<Relocation>,
    len: usize,
    restructuring: bool,
}

impl CompressedArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an array with room for `words` storage words.
    pub fn with_capacity(words: usize) -> Self {
        Self {
            words: Vec::with_capacity(words),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn num_checkpoints(&self) -> usize {
        self.words.iter().filter(|&&w| word::is_checkpoint(w)).count()
    }

    /// Storage words in use (checkpoints plus packed words).
    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    /// Number of values stored out of append order.
    pub fn num_relocations(&self) -> usize {
        self.relocations.len()
    }

    pub fn memory_usage(&self) -> usize {
        self.words.capacity() * std::mem::size_of::<u64>()
            + self.relocations.capacity() * std::mem::size_of::<Relocation>()
    }

    pub fn shrink_to_fit(&mut self) {
        self.words.shrink_to_fit();
        self.relocations.shrink_to_fit();
    }

    /// Appends `value`. Fails with [`Error::ValueTooLarge`] for values that do
    /// not fit a checkpoint base.
    pub fn append(&mut self, value: u64) -> Result<()> {
        if value > MAX_BASE {
            return Err(Error::ValueTooLarge(value));
        }

        if let Some(stored) = self.place(value)? {
            let logical = self.len;
            for r in &mut self.relocations {
                if r.stored >= stored {
                    r.stored += 1;
                }
            }
            let at = self.relocations.partition_point(|r| r.stored < stored);
            self.relocations.insert(at, Relocation { logical, stored });
        }
        self.len += 1;
        Ok(())
    }

    /// Returns the value appended at position `index`.
    pub fn get(&self, index: usize) -> Result<u64> {
        if index >= self.len {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        let stored = self.stored_position(index);
        match self.stored_values().nth(stored) {
            Some(value) => value,
            None => Err(corrupted("stored value count below len")),
        }
    }

    /// All values in append order.
    pub fn to_vec(&self) -> Result<Vec<u64>> {
        let stored: Vec<u64> = self.stored_values().collect::<Result<_>>()?;
        if stored.len() != self.len {
            return Err(corrupted("stored value count differs from len"));
        }
        if self.relocations.is_empty() {
            return Ok(stored);
        }

        let mut out = vec![0u64; self.len];
        let mut moved = vec![false; self.len];
        for r in &self.relocations {
            out[r.logical] = stored[r.stored];
            moved[r.logical] = true;
        }
        let mut in_place = (0..self.len).filter(|&i| !moved[i]);
        let mut relocated = self.relocations.iter().map(|r| r.stored).peekable();
        for (pos, &value) in stored.iter().enumerate() {
            if relocated.peek() == Some(&pos) {
                relocated.next();
                continue;
            }
            if let Some(i) = in_place.next() {
                out[i] = value;
            }
        }
        Ok(out)
    }

    /// Would return the base minimising the differences attached to
    /// `checkpoint`. Checkpoint bases are always the value that opened them.
    pub fn optimal_checkpoint_base(&self, _checkpoint: usize) -> Result<u64> {
        Err(Error::Unimplemented("optimal checkpoint base selection"))
    }

    /// Places `value` in storage. Returns the stored position when the value
    /// was placed by restructuring rather than at the end.
    fn place(&mut self, value: u64) -> Result<Option<usize>> {
        let Some(last) = self.last_checkpoint else {
            if !self.words.is_empty() {
                return Err(corrupted("no checkpoint before packed words"));
            }
            self.push_checkpoint(value);
            return Ok(None);
        };

        let base = checkpoint_base(self.words[last])?;
        if let Some(slot) = Slot::encode(value, base) {
            self.push_slot(slot);
            return Ok(None);
        }

        match self.find_fitting_checkpoint(value, last) {
            Some(checkpoint) => self.restructure(checkpoint, value).map(Some),
            None => {
                self.push_checkpoint(value);
                Ok(None)
            }
        }
    }

    fn push_checkpoint(&mut self, base: u64) {
        self.words.push(word::checkpoint(base));
        self.last_checkpoint = Some(self.words.len() - 1);
    }

    /// Adds a difference to the last scope. Only the final word of storage
    /// can have a free slot.
    fn push_slot(&mut self, slot: Slot) {
        if let Some(&raw) = self.words.last() {
            if let Word::Packed(packed) = Word::decode(raw) {
                if let Some(i) = packed.free_slot() {
                    let n = self.words.len();
                    self.words[n - 1] = packed.with_slot(i, slot).raw();
                    return;
                }
            }
        }
        self.words.push(PackedWord::EMPTY.with_slot(0, slot).raw());
    }

    /// Most recent checkpoint before `last` whose base can encode `value`.
    fn find_fitting_checkpoint(&self, value: u64, last: usize) -> Option<usize> {
        self.words[..last].iter().rposition(|&raw| match Word::decode(raw) {
            Word::Checkpoint(base) => Slot::encode(value, base).is_some(),
            Word::Packed(_) => false,
        })
    }

    /// Rebuilds storage so `value` joins the scope opened at `checkpoint`.
    /// Returns the stored position of `value`.
    ///
    /// Storage is only replaced once the rebuild succeeds.
    fn restructure(&mut self, checkpoint: usize, value: u64) -> Result<usize> {
        if self.restructuring {
            return Err(corrupted("restructure while restructuring"));
        }

        let scope_end = self.words[checkpoint + 1..]
            .iter()
            .position(|&raw| word::is_checkpoint(raw))
            .map_or(self.words.len(), |i| checkpoint + 1 + i);
        let stored = StoredValues::new(&self.words[..scope_end]).count();
        let suffix: Vec<u64> = StoredValues::new(&self.words[scope_end..]).collect::<Result<_>>()?;
        log::debug!(
            "restructuring at checkpoint word {}: value {} joins scope, {} values replayed",
            checkpoint,
            value,
            suffix.len()
        );

        let mut rebuilt = Vec::with_capacity(self.words.len() + 1);
        rebuilt.extend_from_slice(&self.words[..scope_end]);
        let previous = std::mem::replace(&mut self.words, rebuilt);
        let previous_last = self.last_checkpoint.replace(checkpoint);

        self.restructuring = true;
        let replayed = self.replay(value, &suffix);
        self.restructuring = false;

        match replayed {
            Ok(()) => Ok(stored),
            Err(e) => {
                self.words = previous;
                self.last_checkpoint = previous_last;
                Err(e)
            }
        }
    }

    fn replay(&mut self, value: u64, suffix: &[u64]) -> Result<()> {
        for &v in std::iter::once(&value).chain(suffix) {
            if self.place(v)?.is_some() {
                return Err(corrupted("replayed value relocated"));
            }
        }
        Ok(())
    }

    /// Maps an append position to a position in storage order.
    fn stored_position(&self, logical: usize) -> usize {
        if let Some(r) = self.relocations.iter().find(|r| r.logical == logical) {
            return r.stored;
        }
        let moved_before = self.relocations.iter().filter(|r| r.logical < logical).count();
        let mut stored = logical - moved_before;
        for r in &self.relocations {
            if r.stored <= stored {
                stored += 1;
            } else {
                break;
            }
        }
        stored
    }

    fn stored_values(&self) -> StoredValues<'_> {
        StoredValues::new(&self.words)
    }

    #[cfg(test)]
    pub(crate) fn validate(&self) {
        let mut seen_checkpoint = false;
        for (i, &raw) in self.words.iter().enumerate() {
            match Word::decode(raw) {
                Word::Checkpoint(_) => seen_checkpoint = true,
                Word::Packed(packed) => {
                    assert!(seen_checkpoint, "packed word {i} before any checkpoint");
                    assert_ne!(packed.raw(), 0, "empty packed word {i}");
                    let used = packed.free_slot().unwrap_or(SLOTS_PER_WORD);
                    assert_eq!(packed.slots().count(), used, "gap in packed word {i}");
                    for slot in packed.slots() {
                        assert_ne!(slot.magnitude(), 0);
                        assert!((1..=word::MAX_MULTIPLIER).contains(&slot.multiplier()));
                    }
                    let last_of_scope = self
                        .words
                        .get(i + 1)
                        .map_or(true, |&next| word::is_checkpoint(next));
                    assert!(last_of_scope || used == SLOTS_PER_WORD, "free slot mid-scope at {i}");
                }
            }
        }
        assert_eq!(
            self.last_checkpoint,
            self.words.iter().rposition(|&w| word::is_checkpoint(w))
        );
        assert_eq!(self.stored_values().count(), self.len);
        assert!(self
            .relocations
            .windows(2)
            .all(|w| w[0].stored < w[1].stored));
        assert!(!self.restructuring);
    }
}

#[cold]
fn corrupted(what: &'static str) -> Error {
    log::error!("compressed array invariant violated: {}", what);
    Error::Corrupted(what)
}

fn checkpoint_base(raw: u64) -> Result<u64> {
    match Word::decode(raw) {
        Word::Checkpoint(base) => Ok(base),
        Word::Packed(_) => Err(corrupted("checkpoint index points at packed word")),
    }
}

/// Values in storage order.
struct StoredValues<'a> {
    words: &'a [u64],
    pos: usize,
    slot: usize,
    base: Option<u64>,
}

impl<'a> StoredValues<'a> {
    fn new(words: &'a [u64]) -> Self {
        Self {
            words,
            pos: 0,
            slot: 0,
            base: None,
        }
    }
}

impl Iterator for StoredValues<'_> {
    type Item = Result<u64>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = *self.words.get(self.pos)?;
            match Word::decode(raw) {
                Word::Checkpoint(base) => {
                    self.pos += 1;
                    self.base = Some(base);
                    return Some(Ok(base));
                }
                Word::Packed(packed) => {
                    let Some(base) = self.base else {
                        self.pos = self.words.len();
                        return Some(Err(corrupted("packed word before any checkpoint")));
                    };
                    while self.slot < SLOTS_PER_WORD {
                        let i = self.slot;
                        self.slot += 1;
                        if let Some(slot) = packed.slot(i) {
                            return Some(Ok(slot.apply(base)));
                        }
                    }
                    self.slot = 0;
                    self.pos += 1;
                }
            }
        }
    }
}
