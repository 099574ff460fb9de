//! Internal data structures.

mod bitset;

pub(crate) use bitset::BitSet;
