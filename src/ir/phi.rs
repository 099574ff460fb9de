//! Merge (phi) instructions.
//!
//! A phi node selects among several incoming values depending on which
//! predecessor path executed. A node `%3 = phi(block_1: %1, block_2: %2)` means:
//! - If control came from `block_1`, use `%1`
//! - If control came from `block_2`, use `%2`
//!
//! Phi nodes live at the start of a block that has more than one predecessor
//! path. In structured IR such a block either follows an `if`, follows a
//! `loop`, or is the first block of a loop body.
//!
//! # Thread Safety
//!
//! All types in this module are `Send` and `Sync`.

use std::fmt;

use crate::ir::{BlockId, ValueId};

/// An incoming (predecessor block, value) pair of a phi node.
///
/// # Examples
///
/// ```rust
/// use lanescope::ir::{BlockId, PhiSource, ValueId};
///
/// let source = PhiSource::new(BlockId::new(1), ValueId::new(2));
/// assert_eq!(source.to_string(), "block_1: %2");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhiSource {
    /// The predecessor block from which this value comes.
    pred: BlockId,
    /// The value flowing in along that edge.
    value: ValueId,
}

impl PhiSource {
    /// Creates a new phi source.
    ///
    /// # Arguments
    ///
    /// * `pred` - The predecessor block
    /// * `value` - The value providing the result when control comes from `pred`
    #[must_use]
    pub const fn new(pred: BlockId, value: ValueId) -> Self {
        Self { pred, value }
    }

    /// Returns the predecessor block.
    #[must_use]
    pub const fn pred(&self) -> BlockId {
        self.pred
    }

    /// Returns the incoming value.
    #[must_use]
    pub const fn value(&self) -> ValueId {
        self.value
    }
}

impl fmt::Display for PhiSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pred, self.value)
    }
}

/// A phi node that merges values at a control flow join point.
///
/// # Invariants
///
/// - Each phi node has one source per predecessor edge of its block
/// - Sources are kept in insertion order, which is the order analyses see them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhiNode {
    /// The value defined by this phi node.
    dest: ValueId,
    /// Sources from each predecessor block.
    sources: Vec<PhiSource>,
}

impl PhiNode {
    /// Creates a new phi node with no sources.
    #[must_use]
    pub fn new(dest: ValueId) -> Self {
        Self {
            dest,
            sources: Vec::new(),
        }
    }

    /// Creates a phi node from a list of sources.
    #[must_use]
    pub fn with_sources(dest: ValueId, sources: Vec<PhiSource>) -> Self {
        Self { dest, sources }
    }

    /// Returns the value defined by this phi node.
    #[must_use]
    pub const fn dest(&self) -> ValueId {
        self.dest
    }

    /// Returns the sources of this phi node.
    #[must_use]
    pub fn sources(&self) -> &[PhiSource] {
        &self.sources
    }

    /// Adds a source to this phi node.
    pub fn add_source(&mut self, source: PhiSource) {
        self.sources.push(source);
    }

    /// Returns the number of sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Finds the source coming from the specified predecessor block.
    #[must_use]
    pub fn source_from(&self, pred: BlockId) -> Option<&PhiSource> {
        self.sources.iter().find(|src| src.pred == pred)
    }

    /// Returns all the values read by this phi node.
    pub fn used_values(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.sources.iter().map(|src| src.value)
    }
}

impl fmt::Display for PhiNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = phi ", self.dest)?;
        for (i, source) in self.sources.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{source}")?;
        }
        Ok(())
    }
}
