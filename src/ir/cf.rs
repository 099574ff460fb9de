//! Structured control flow tree.
//!
//! A function body is a list of control flow nodes. Each node is a basic block,
//! an `if` with two lists, or a `loop` with one list. Lists always start and end
//! with a block and alternate between blocks and non-block nodes, so the node
//! in front of a block tells how control reaches it:
//!
//! ```text
//! body:  block_0  if(%c){ block_1 } else { block_2 }  block_3  loop { block_4 ... }  block_6
//!                                                     ^ prev = if: branch merge
//!                                                                     ^ prev = none: loop header
//!                                                                                    ^ prev = loop: loop exit
//! ```
//!
//! Nodes are stored in a flat arena inside [`crate::ir::Function`] and refer to
//! their parent by index; `None` means the function body itself.

use std::fmt;

use crate::ir::{BlockId, ValueId};

/// Identifier of a control flow node.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CfNodeId(usize);

impl CfNodeId {
    /// Creates a control flow node identifier.
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

impl fmt::Debug for CfNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cf_{}", self.0)
    }
}

impl fmt::Display for CfNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cf_{}", self.0)
    }
}

/// A two-way structured branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfNode {
    /// The scalar boolean condition.
    pub condition: ValueId,
    /// Nodes executed when the condition holds.
    pub then_list: Vec<CfNodeId>,
    /// Nodes executed otherwise.
    pub else_list: Vec<CfNodeId>,
}

/// A structured loop. The back edge runs from the last block of the body to
/// the first one; exits are `break` jumps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoopNode {
    /// The loop body.
    pub body: Vec<CfNodeId>,
}

/// A control flow node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CfNode {
    /// A basic block
    Block(BlockId),
    /// A two-way branch
    If(IfNode),
    /// A loop
    Loop(LoopNode),
}

impl CfNode {
    /// Returns the kind of this node.
    #[must_use]
    pub const fn kind(&self) -> CfKind {
        match self {
            Self::Block(_) => CfKind::Block,
            Self::If(_) => CfKind::If,
            Self::Loop(_) => CfKind::Loop,
        }
    }

    /// Returns the `if` payload.
    #[must_use]
    pub const fn as_if(&self) -> Option<&IfNode> {
        match self {
            Self::If(node) => Some(node),
            _ => None,
        }
    }

    /// Returns the `loop` payload.
    #[must_use]
    pub const fn as_loop(&self) -> Option<&LoopNode> {
        match self {
            Self::Loop(node) => Some(node),
            _ => None,
        }
    }

    /// Returns the block, if this node wraps one.
    #[must_use]
    pub const fn as_block(&self) -> Option<BlockId> {
        match self {
            Self::Block(block) => Some(*block),
            _ => None,
        }
    }
}

/// Kind tag of a control flow node, as seen from a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CfKind {
    /// Plain basic block
    Block,
    /// Two-way branch
    If,
    /// Loop
    Loop,
}

/// A node together with its structural parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfEntry {
    /// The node payload.
    pub node: CfNode,
    /// Enclosing `if` or `loop`; `None` for nodes of the function body.
    pub parent: Option<CfNodeId>,
}
