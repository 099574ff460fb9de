//! Basic blocks.
//!
//! A block is an ordered sequence of instructions. Phi nodes, if any, come first.
//! Every block is also a leaf of the structured control flow tree, recorded as
//! the [`CfNodeId`] that wraps it.
//!
//! # Block Structure
//!
//! ```text
//! block_3:
//!   %7 = phi block_1: %4, block_2: %5
//!   %8 = iadd %7, %2
//!   break
//! ```

use std::fmt;

use crate::ir::{CfNodeId, Instruction, PhiNode, ValueId};

/// Identifier of a basic block.
///
/// Block identifiers are dense and follow program order, so iterating blocks by
/// id visits them in the order they appear in the function body.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(usize);

impl BlockId {
    /// Creates a block identifier.
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

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block_{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block_{}", self.0)
    }
}

/// A basic block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block index.
    id: BlockId,
    /// The control flow node wrapping this block.
    cf_node: CfNodeId,
    /// Instructions in program order.
    instructions: Vec<Instruction>,
}

impl Block {
    /// Creates a new empty block.
    #[must_use]
    pub fn new(id: BlockId, cf_node: CfNodeId) -> Self {
        Self {
            id,
            cf_node,
            instructions: Vec::new(),
        }
    }

    /// Returns the block index.
    #[must_use]
    pub const fn id(&self) -> BlockId {
        self.id
    }

    /// Returns the control flow node wrapping this block.
    #[must_use]
    pub const fn cf_node(&self) -> CfNodeId {
        self.cf_node
    }

    /// Returns the instructions in this block.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Returns a mutable reference to the instructions.
    pub fn instructions_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.instructions
    }

    /// Gets an instruction by index.
    #[must_use]
    pub fn instruction(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Appends an instruction and returns its index.
    pub fn push(&mut self, instr: Instruction) -> usize {
        self.instructions.push(instr);
        self.instructions.len() - 1
    }

    /// Returns the number of instructions.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if this block has no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Returns the phi nodes at the start of this block.
    pub fn phis(&self) -> impl Iterator<Item = &PhiNode> {
        self.instructions.iter().map_while(Instruction::as_phi)
    }

    /// Returns all values defined in this block.
    pub fn defined_values(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.instructions.iter().flat_map(Instruction::defs)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.id)?;
        for instr in &self.instructions {
            writeln!(f, "  {instr}")?;
        }
        Ok(())
    }
}
