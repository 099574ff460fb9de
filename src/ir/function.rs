//! Function bodies and shaders.
//!
//! A [`Function`] is the top-level container of the IR. It owns flat arenas for
//! values, blocks and control flow nodes and hands out dense indices into them.
//!
//! # Structure
//!
//! ```text
//! Function
//! ├── values:   Vec<Value>      // one entry per SSA definition
//! ├── blocks:   Vec<Block>      // program order
//! ├── cf_nodes: Vec<CfEntry>    // blocks, ifs, loops with parent links
//! ├── body:     Vec<CfNodeId>   // top-level control flow list
//! └── uses:     Vec<Vec<UseSite>> // def-use index, computed at construction
//! ```
//!
//! # Construction
//!
//! Functions are normally produced by [`crate::ir::FunctionBuilder`]. Both paths
//! end in [`Function::from_parts`], which validates SSA form and builds the
//! def-use index. A `Function` is immutable afterwards.
//!
//! # Thread Safety
//!
//! `Function` and `Shader` are `Send` and `Sync` once constructed.

use std::fmt;

use crate::{
    ir::{
        Block, BlockId, CfEntry, CfNode, CfNodeId, DefSite, Instruction, UseKinds, Value, ValueId,
    },
    Error, Result,
};

/// One read of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseSite {
    /// An instruction operand.
    Instruction {
        /// The block holding the instruction.
        block: BlockId,
        /// Instruction index within the block.
        index: usize,
        /// How the instruction reads the value.
        kind: UseKinds,
    },
    /// The condition of an `if` node.
    IfCondition(CfNodeId),
}

impl UseSite {
    /// Returns the kind of this use.
    #[must_use]
    pub const fn kind(&self) -> UseKinds {
        match self {
            Self::Instruction { kind, .. } => *kind,
            Self::IfCondition(_) => UseKinds::IF_CONDITION,
        }
    }
}

/// A function body in structured SSA form.
///
/// # Examples
///
/// ```rust
/// use lanescope::ir::{FunctionBuilder, IntrinsicOp};
///
/// let mut b = FunctionBuilder::new("main");
/// let id = b.intrinsic(IntrinsicOp::LoadLocalInvocationIndex, &[], 1);
/// let one = b.load_const(1);
/// let _sum = b.alu(lanescope::ir::AluOp::Iadd, &[id, one]);
/// let func = b.finish()?;
///
/// assert_eq!(func.value_count(), 3);
/// assert_eq!(func.block_count(), 1);
/// assert_eq!(func.uses(id).len(), 1);
/// # Ok::<(), lanescope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Function {
    /// Function name.
    name: String,
    /// All SSA values, indexed by `ValueId`.
    values: Vec<Value>,
    /// Basic blocks in program order, indexed by `BlockId`.
    blocks: Vec<Block>,
    /// Control flow nodes, indexed by `CfNodeId`.
    cf_nodes: Vec<CfEntry>,
    /// Top-level control flow list.
    body: Vec<CfNodeId>,
    /// Use sites per value.
    uses: Vec<Vec<UseSite>>,
    /// Union of use kinds per value.
    use_kinds: Vec<UseKinds>,
}

impl Function {
    /// Assembles a function from its arenas, validating SSA form.
    ///
    /// # Arguments
    ///
    /// * `name` - Function name
    /// * `values` - Value table; entry `i` must have id `i`
    /// * `blocks` - Blocks; entry `i` must have id `i`
    /// * `cf_nodes` - Control flow node arena
    /// * `body` - Top-level control flow list
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] if a value is defined zero or several times, a
    /// definition site disagrees with the instruction stream, an operand is out of
    /// range, a phi follows a non-phi instruction, or the control flow arena is
    /// inconsistent with the blocks.
    pub fn from_parts(
        name: impl Into<String>,
        values: Vec<Value>,
        blocks: Vec<Block>,
        cf_nodes: Vec<CfEntry>,
        body: Vec<CfNodeId>,
    ) -> Result<Self> {
        let mut func = Self {
            name: name.into(),
            values,
            blocks,
            cf_nodes,
            body,
            uses: Vec::new(),
            use_kinds: Vec::new(),
        };
        func.validate()?;
        func.build_use_index();
        Ok(func)
    }

    fn validate(&self) -> Result<()> {
        for (i, value) in self.values.iter().enumerate() {
            if value.id().index() != i {
                return Err(malformed_error!("value slot {} holds {}", i, value.id()));
            }
            if value.num_components() == 0 || value.num_components() > 4 {
                return Err(malformed_error!(
                    "{} has {} components",
                    value.id(),
                    value.num_components()
                ));
            }
        }

        // Each cf node sits in exactly one list, owned by its parent.
        let mut listed_by: Vec<Option<Option<CfNodeId>>> = vec![None; self.cf_nodes.len()];
        for (i, entry) in self.cf_nodes.iter().enumerate() {
            let id = CfNodeId::new(i);
            let children: Vec<CfNodeId> = match &entry.node {
                CfNode::Block(block) => {
                    if self.blocks.get(block.index()).map(Block::cf_node) != Some(id) {
                        return Err(malformed_error!("{} does not wrap {}", id, block));
                    }
                    Vec::new()
                }
                CfNode::If(node) => {
                    self.check_value(node.condition, || format!("condition of {id}"))?;
                    node.then_list.iter().chain(&node.else_list).copied().collect()
                }
                CfNode::Loop(node) => node.body.clone(),
            };
            for child in children {
                if self.cf_nodes.get(child.index()).and_then(|c| c.parent) != Some(id) {
                    return Err(malformed_error!("{} is not a child of {}", child, id));
                }
                claim(&mut listed_by, child, Some(id))?;
            }
        }

        for &id in &self.body {
            if self.cf_nodes.get(id.index()).map(|entry| entry.parent) != Some(None) {
                return Err(malformed_error!("{} is in the body but has a parent", id));
            }
            claim(&mut listed_by, id, None)?;
        }
        for (i, entry) in self.cf_nodes.iter().enumerate() {
            let id = CfNodeId::new(i);
            match listed_by[i] {
                None => return Err(malformed_error!("{} is not listed by any region", id)),
                Some(owner) if owner != entry.parent => {
                    return Err(malformed_error!(
                        "{} is listed by {:?} but its parent is {:?}",
                        id,
                        owner,
                        entry.parent
                    ))
                }
                Some(_) => {}
            }
        }

        let mut defined = vec![false; self.values.len()];
        for (b, block) in self.blocks.iter().enumerate() {
            if block.id().index() != b {
                return Err(malformed_error!("block slot {} holds {}", b, block.id()));
            }
            let wrapped = self
                .cf_nodes
                .get(block.cf_node().index())
                .and_then(|entry| entry.node.as_block());
            if wrapped != Some(block.id()) {
                return Err(malformed_error!(
                    "{} claims {} which does not wrap it",
                    block.id(),
                    block.cf_node()
                ));
            }

            let mut seen_non_phi = false;
            for (index, instr) in block.instructions().iter().enumerate() {
                match instr {
                    Instruction::Phi(phi) => {
                        if seen_non_phi {
                            return Err(malformed_error!(
                                "phi {} follows a non-phi instruction in {}",
                                phi.dest(),
                                block.id()
                            ));
                        }
                        for source in phi.sources() {
                            if source.pred().index() >= self.blocks.len() {
                                return Err(malformed_error!(
                                    "phi {} names unknown predecessor {}",
                                    phi.dest(),
                                    source.pred()
                                ));
                            }
                        }
                    }
                    _ => seen_non_phi = true,
                }

                for (value, _) in instr.uses() {
                    self.check_value(value, || format!("operand of {}:{}", block.id(), index))?;
                }

                for def in instr.defs() {
                    self.check_value(def, || format!("result of {}:{}", block.id(), index))?;
                    if std::mem::replace(&mut defined[def.index()], true) {
                        return Err(malformed_error!("{} is defined more than once", def));
                    }
                    let site = self.values[def.index()].def();
                    if site != DefSite::new(block.id(), index) {
                        return Err(malformed_error!(
                            "{} is defined at {}:{} but recorded at {}:{}",
                            def,
                            block.id(),
                            index,
                            site.block,
                            site.instruction
                        ));
                    }
                }
            }
        }

        if let Some(missing) = defined.iter().position(|d| !d) {
            return Err(malformed_error!("%{} is never defined", missing));
        }

        Ok(())
    }

    fn check_value(&self, value: ValueId, what: impl FnOnce() -> String) -> Result<()> {
        if value.index() < self.values.len() {
            Ok(())
        } else {
            Err(Error::Malformed {
                message: format!("{} refers to unknown value {}", what(), value),
                file: file!(),
                line: line!(),
            })
        }
    }

    fn build_use_index(&mut self) {
        let mut uses = vec![Vec::new(); self.values.len()];
        let mut use_kinds = vec![UseKinds::empty(); self.values.len()];

        for block in &self.blocks {
            for (index, instr) in block.instructions().iter().enumerate() {
                for (value, kind) in instr.uses() {
                    uses[value.index()].push(UseSite::Instruction {
                        block: block.id(),
                        index,
                        kind,
                    });
                    use_kinds[value.index()] |= kind;
                }
            }
        }
        for (i, entry) in self.cf_nodes.iter().enumerate() {
            if let CfNode::If(node) = &entry.node {
                uses[node.condition.index()].push(UseSite::IfCondition(CfNodeId::new(i)));
                use_kinds[node.condition.index()] |= UseKinds::IF_CONDITION;
            }
        }

        self.uses = uses;
        self.use_kinds = use_kinds;
    }

    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns all values.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Gets a value by id.
    #[must_use]
    pub fn value(&self, id: ValueId) -> Option<&Value> {
        self.values.get(id.index())
    }

    /// Returns the number of values, the size of any per-value result table.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Returns the blocks in program order.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Gets a block by id.
    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the top-level control flow list.
    #[must_use]
    pub fn body(&self) -> &[CfNodeId] {
        &self.body
    }

    /// Gets a control flow node by id.
    #[must_use]
    pub fn cf_node(&self, id: CfNodeId) -> Option<&CfNode> {
        self.cf_nodes.get(id.index()).map(|entry| &entry.node)
    }

    /// Returns the enclosing `if` or `loop` of a node, `None` at function level.
    #[must_use]
    pub fn cf_parent(&self, id: CfNodeId) -> Option<CfNodeId> {
        self.cf_nodes.get(id.index()).and_then(|entry| entry.parent)
    }

    /// Returns the enclosing `if` or `loop` of a block.
    #[must_use]
    pub fn block_parent(&self, block: BlockId) -> Option<CfNodeId> {
        self.block(block).and_then(|b| self.cf_parent(b.cf_node()))
    }

    /// Returns the control flow list that contains `id`.
    #[must_use]
    pub fn cf_list_of(&self, id: CfNodeId) -> &[CfNodeId] {
        match self.cf_parent(id).and_then(|p| self.cf_node(p)) {
            None => &self.body,
            Some(CfNode::If(node)) => {
                if node.then_list.contains(&id) {
                    &node.then_list
                } else {
                    &node.else_list
                }
            }
            Some(CfNode::Loop(node)) => &node.body,
            Some(CfNode::Block(_)) => &[],
        }
    }

    /// Returns the node immediately before `id` in its control flow list.
    #[must_use]
    pub fn cf_prev(&self, id: CfNodeId) -> Option<CfNodeId> {
        let list = self.cf_list_of(id);
        let pos = list.iter().position(|&n| n == id)?;
        pos.checked_sub(1).map(|p| list[p])
    }

    /// Returns the condition of an `if` node.
    #[must_use]
    pub fn if_condition(&self, id: CfNodeId) -> Option<ValueId> {
        self.cf_node(id)
            .and_then(CfNode::as_if)
            .map(|node| node.condition)
    }

    /// Returns the last block of a loop body, the source of its back edge.
    #[must_use]
    pub fn loop_last_block(&self, id: CfNodeId) -> Option<BlockId> {
        self.cf_node(id)
            .and_then(CfNode::as_loop)
            .and_then(|node| node.body.last())
            .and_then(|&last| self.cf_node(last))
            .and_then(CfNode::as_block)
    }

    /// Returns the instruction defining `value`.
    #[must_use]
    pub fn def_instruction(&self, value: ValueId) -> Option<&Instruction> {
        let site = self.value(value)?.def();
        self.block(site.block)?.instruction(site.instruction)
    }

    /// Returns every read of `value`.
    #[must_use]
    pub fn uses(&self, value: ValueId) -> &[UseSite] {
        self.uses.get(value.index()).map_or(&[], Vec::as_slice)
    }

    /// Returns the union of use kinds of `value`.
    #[must_use]
    pub fn use_kinds(&self, value: ValueId) -> UseKinds {
        self.use_kinds
            .get(value.index())
            .copied()
            .unwrap_or_default()
    }

    /// Returns an iterator over all instructions in program order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.blocks.iter().flat_map(Block::instructions)
    }

    /// Writes the function, prefixing each instruction with the tag returned by
    /// `tag` (if any).
    pub(crate) fn write_tagged(
        &self,
        f: &mut fmt::Formatter<'_>,
        tag: &dyn Fn(&Instruction) -> Option<&'static str>,
    ) -> fmt::Result {
        writeln!(f, "impl {} {{", self.name)?;
        self.write_list(f, &self.body, 1, tag)?;
        writeln!(f, "}}")
    }

    fn write_list(
        &self,
        f: &mut fmt::Formatter<'_>,
        list: &[CfNodeId],
        depth: usize,
        tag: &dyn Fn(&Instruction) -> Option<&'static str>,
    ) -> fmt::Result {
        let indent = "  ".repeat(depth);
        for &id in list {
            match self.cf_node(id) {
                Some(CfNode::Block(block_id)) => {
                    let Some(block) = self.block(*block_id) else {
                        continue;
                    };
                    writeln!(f, "{indent}{}:", block.id())?;
                    for instr in block.instructions() {
                        match tag(instr) {
                            Some(t) => writeln!(f, "{indent}  {t} {instr}")?,
                            None => writeln!(f, "{indent}  {instr}")?,
                        }
                    }
                }
                Some(CfNode::If(node)) => {
                    writeln!(f, "{indent}if {} {{", node.condition)?;
                    self.write_list(f, &node.then_list, depth + 1, tag)?;
                    writeln!(f, "{indent}}} else {{")?;
                    self.write_list(f, &node.else_list, depth + 1, tag)?;
                    writeln!(f, "{indent}}}")?;
                }
                Some(CfNode::Loop(node)) => {
                    writeln!(f, "{indent}loop {{")?;
                    self.write_list(f, &node.body, depth + 1, tag)?;
                    writeln!(f, "{indent}}}")?;
                }
                None => {}
            }
        }
        Ok(())
    }
}

/// Records that `owner` lists `node`, rejecting a node listed twice.
fn claim(
    listed_by: &mut [Option<Option<CfNodeId>>],
    node: CfNodeId,
    owner: Option<CfNodeId>,
) -> Result<()> {
    let slot = listed_by
        .get_mut(node.index())
        .ok_or_else(|| malformed_error!("{} is out of range", node))?;
    if slot.is_some() {
        return Err(malformed_error!("{} is listed twice", node));
    }
    *slot = Some(owner);
    Ok(())
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tagged(f, &|_| None)
    }
}

/// A shader: a set of function bodies with one entrypoint.
#[derive(Debug, Clone)]
pub struct Shader {
    /// Shader name.
    name: String,
    /// All functions.
    functions: Vec<Function>,
    /// Index of the entrypoint in `functions`.
    entrypoint: usize,
}

impl Shader {
    /// Creates a shader.
    #[must_use]
    pub fn new(name: impl Into<String>, functions: Vec<Function>, entrypoint: usize) -> Self {
        Self {
            name: name.into(),
            functions,
            entrypoint,
        }
    }

    /// Returns the shader name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns all functions.
    #[must_use]
    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Returns the entrypoint index.
    #[must_use]
    pub const fn entrypoint_index(&self) -> usize {
        self.entrypoint
    }

    /// Returns the entrypoint function.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEntrypoint`] if the index names no function.
    pub fn entrypoint(&self) -> Result<&Function> {
        self.functions
            .get(self.entrypoint)
            .ok_or(Error::InvalidEntrypoint(self.entrypoint))
    }

    /// Finds a function by name.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name() == name)
    }
}
