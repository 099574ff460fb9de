//! SSA value representation and identifiers.
//!
//! Every result produced by an instruction is a [`Value`]. Values are stored in a
//! flat table owned by the [`crate::ir::Function`] and referenced by a dense
//! [`ValueId`], which keeps instructions, blocks and values free of ownership
//! cycles. A vector-valued instruction still produces a single value; its
//! component count is recorded on the value.
//!
//! # Thread Safety
//!
//! All types in this module are `Send` and `Sync`.

use std::fmt;

use crate::ir::BlockId;

/// Unique identifier for an SSA value.
///
/// This is a lightweight handle into the value table, providing O(1) access
/// to value metadata. The identifier is unique within a single function but not
/// across functions. Divergence results are indexed by the same number.
///
/// # Examples
///
/// ```rust
/// use lanescope::ir::ValueId;
///
/// let id = ValueId::new(42);
/// assert_eq!(id.index(), 42);
/// assert_eq!(id.to_string(), "%42");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValueId(usize);

impl ValueId {
    /// Creates a new value identifier.
    ///
    /// # Arguments
    ///
    /// * `index` - The index into the value table
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the underlying index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Definition site of an SSA value.
///
/// Records which instruction of which block defines the value. Phi nodes are
/// ordinary instructions at the start of their block, so they use the same form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefSite {
    /// The block where this value is defined.
    pub block: BlockId,
    /// The instruction index within the block.
    pub instruction: usize,
}

impl DefSite {
    /// Creates a definition site.
    #[must_use]
    pub const fn new(block: BlockId, instruction: usize) -> Self {
        Self { block, instruction }
    }
}

/// Metadata for one SSA value.
///
/// Values are immutable once the function is built. The analysis only
/// annotates them through a separate table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    /// Identifier of this value.
    id: ValueId,
    /// Number of vector components (1 for scalars, up to 4).
    num_components: u8,
    /// The instruction that defines this value.
    def: DefSite,
}

impl Value {
    /// Creates a new value record.
    #[must_use]
    pub const fn new(id: ValueId, num_components: u8, def: DefSite) -> Self {
        Self {
            id,
            num_components,
            def,
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> ValueId {
        self.id
    }

    /// Returns the number of vector components.
    #[must_use]
    pub const fn num_components(&self) -> u8 {
        self.num_components
    }

    /// Returns `true` for single-component values.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        self.num_components == 1
    }

    /// Returns the definition site.
    #[must_use]
    pub const fn def(&self) -> DefSite {
        self.def
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: vec{} (def {}:{})",
            self.id, self.num_components, self.def.block, self.def.instruction
        )
    }
}
