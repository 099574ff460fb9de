//! A fixed-size bit vector.
//!
//! Storage is 64 bits per word. The set is sized once at construction; every
//! index must be below that size.
//!
//! # Example
//!
//! ```rust,ignore
//! use lanescope::utils::BitSet;
//!
//! let mut set = BitSet::new(100);
//! assert!(set.insert(50));
//! assert!(!set.insert(50));
//! assert!(set.contains(50));
//! assert_eq!(set.count(), 1);
//! ```

/// A fixed-size bit vector.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitSet {
    /// The bits, stored as a vector of words.
    words: Vec<u64>,
    /// The number of bits in the set.
    len: usize,
}

impl BitSet {
    /// Creates a new empty bit set with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(64)],
            len: capacity,
        }
    }

    /// Returns the capacity of this bit set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Sets the bit at the given index, returning `true` if it was clear.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn insert(&mut self, index: usize) -> bool {
        assert!(index < self.len, "index out of bounds");
        let word = &mut self.words[index / 64];
        let mask = 1u64 << (index % 64);
        let was_clear = *word & mask == 0;
        *word |= mask;
        was_clear
    }

    /// Returns `true` if the bit at the given index is set.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        assert!(index < self.len, "index out of bounds");
        (self.words[index / 64] & (1u64 << (index % 64))) != 0
    }

    /// Returns the number of bits set.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns an iterator over the indices of set bits, in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(w * 64 + bit)
            })
        })
    }
}

impl std::fmt::Debug for BitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset_insert_reports_change() {
        let mut set = BitSet::new(130);
        assert_eq!(set.count(), 0);
        assert!(set.insert(0));
        assert!(set.insert(129));
        assert!(!set.insert(129));
        assert!(set.contains(0));
        assert!(!set.contains(64));
        assert_eq!(set.count(), 2);
        assert_eq!(set.len(), 130);
    }

    #[test]
    fn test_bitset_iter_in_order() {
        let mut set = BitSet::new(200);
        for i in [150, 3, 64, 63] {
            set.insert(i);
        }
        let items: Vec<_> = set.iter().collect();
        assert_eq!(items, vec![3, 63, 64, 150]);
        assert_eq!(format!("{set:?}"), "{3, 63, 64, 150}");
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn test_bitset_out_of_bounds() {
        let set = BitSet::new(10);
        let _ = set.contains(10);
    }
}
