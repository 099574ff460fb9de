//! Incremental construction of structured SSA functions.
//!
//! [`FunctionBuilder`] appends instructions to a *current block* and opens and
//! closes `if` and `loop` nodes around it. Opening or closing a node always
//! starts a fresh block, so every control flow list starts and ends with a
//! block and blocks alternate with `if`/`loop` nodes.
//!
//! Mistakes are not reported where they happen. The first one is remembered
//! and returned by [`FunctionBuilder::finish`], which also runs the full SSA
//! validation of [`Function::from_parts`]. This keeps emitter signatures free of
//! `Result` while building test and benchmark bodies.
//!
//! # Examples
//!
//! ```rust
//! use lanescope::ir::{AluOp, FunctionBuilder, IntrinsicOp};
//!
//! // if (front_face) { a = 1 } else { a = 2 }
//! let mut b = FunctionBuilder::new("main");
//! let cond = b.intrinsic(IntrinsicOp::LoadFrontFace, &[], 1);
//! b.begin_if(cond);
//! let one = b.load_const(1);
//! let then_end = b.current_block();
//! b.begin_else();
//! let two = b.load_const(2);
//! let else_end = b.current_block();
//! b.end_if();
//! let a = b.phi(1);
//! b.add_phi_source(a, then_end, one);
//! b.add_phi_source(a, else_end, two);
//! let func = b.finish()?;
//!
//! assert_eq!(func.block_count(), 4);
//! # Ok::<(), lanescope::Error>(())
//! ```

use crate::{
    ir::{
        AluInstr, AluOp, AluSrc, Block, BlockId, CallInstr, CfEntry, CfNode, CfNodeId, CopyEntry,
        DefSite, DerefInstr, DerefKind, Function, IfNode, Instruction, IntrinsicInstr,
        IntrinsicOp, JumpKind, LoadConst, LoopNode, ParallelCopy, PhiNode, PhiSource, TexInstr,
        TexOp, TexSrc, Value, ValueId, VariableMode,
    },
    Error, Result,
};

/// An open `if` or `loop` node.
#[derive(Debug, Clone, Copy)]
struct Frame {
    node: CfNodeId,
    in_else: bool,
}

/// Builder for [`Function`] bodies.
#[derive(Debug)]
pub struct FunctionBuilder {
    name: String,
    values: Vec<Value>,
    blocks: Vec<Block>,
    cf_nodes: Vec<CfEntry>,
    body: Vec<CfNodeId>,
    stack: Vec<Frame>,
    current: BlockId,
    error: Option<Error>,
}

impl FunctionBuilder {
    /// Starts a function with an empty entry block.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let mut builder = Self {
            name: name.into(),
            values: Vec::new(),
            blocks: Vec::new(),
            cf_nodes: Vec::new(),
            body: Vec::new(),
            stack: Vec::new(),
            current: BlockId::new(0),
            error: None,
        };
        builder.current = builder.start_block();
        builder
    }

    /// Returns the block instructions are currently appended to.
    #[must_use]
    pub const fn current_block(&self) -> BlockId {
        self.current
    }

    /// Returns the component count of `value`, `1` if it is unknown.
    #[must_use]
    pub fn components(&self, value: ValueId) -> u8 {
        self.values
            .get(value.index())
            .map_or(1, Value::num_components)
    }

    fn fail(&mut self, error: Error) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn push_node(&mut self, node: CfNode) -> CfNodeId {
        let id = CfNodeId::new(self.cf_nodes.len());
        let parent = self.stack.last().map(|frame| frame.node);
        self.cf_nodes.push(CfEntry { node, parent });

        match self.stack.last().copied() {
            None => self.body.push(id),
            Some(frame) => match &mut self.cf_nodes[frame.node.index()].node {
                CfNode::If(node) if frame.in_else => node.else_list.push(id),
                CfNode::If(node) => node.then_list.push(id),
                CfNode::Loop(node) => node.body.push(id),
                CfNode::Block(_) => {}
            },
        }
        id
    }

    fn start_block(&mut self) -> BlockId {
        let block = BlockId::new(self.blocks.len());
        let cf = self.push_node(CfNode::Block(block));
        self.blocks.push(Block::new(block, cf));
        self.current = block;
        block
    }

    fn alloc(&mut self, components: u8) -> ValueId {
        let id = ValueId::new(self.values.len());
        let site = DefSite::new(self.current, self.blocks[self.current.index()].instruction_count());
        self.values.push(Value::new(id, components, site));
        id
    }

    fn emit(&mut self, instr: Instruction) {
        self.blocks[self.current.index()].push(instr);
    }

    /// Opens an `if` on `condition` and moves into its `then` list.
    pub fn begin_if(&mut self, condition: ValueId) -> CfNodeId {
        let node = self.push_node(CfNode::If(IfNode {
            condition,
            then_list: Vec::new(),
            else_list: Vec::new(),
        }));
        self.stack.push(Frame {
            node,
            in_else: false,
        });
        self.start_block();
        node
    }

    /// Moves into the `else` list of the innermost open `if`.
    pub fn begin_else(&mut self) {
        let open_if = self.stack.last().is_some_and(|frame| {
            !frame.in_else && matches!(self.cf_nodes[frame.node.index()].node, CfNode::If(_))
        });
        if !open_if {
            self.fail(malformed_error!("else without an open if"));
            return;
        }
        if let Some(frame) = self.stack.last_mut() {
            frame.in_else = true;
        }
        self.start_block();
    }

    /// Closes the innermost `if` and starts its merge block.
    ///
    /// An `if` closed without [`FunctionBuilder::begin_else`] gets an empty `else` block.
    pub fn end_if(&mut self) {
        let Some(frame) = self.stack.last().copied() else {
            self.fail(malformed_error!("end_if without an open if"));
            return;
        };
        if !matches!(self.cf_nodes[frame.node.index()].node, CfNode::If(_)) {
            self.fail(malformed_error!("end_if closes {} which is a loop", frame.node));
            return;
        }
        if !frame.in_else {
            self.begin_else();
        }
        self.stack.pop();
        self.start_block();
    }

    /// Opens a `loop` and moves into its header block.
    pub fn begin_loop(&mut self) -> CfNodeId {
        let node = self.push_node(CfNode::Loop(LoopNode::default()));
        self.stack.push(Frame {
            node,
            in_else: false,
        });
        self.start_block();
        node
    }

    /// Closes the innermost `loop` and starts its exit block.
    pub fn end_loop(&mut self) {
        match self.stack.last().copied() {
            Some(frame) if matches!(self.cf_nodes[frame.node.index()].node, CfNode::Loop(_)) => {
                self.stack.pop();
                self.start_block();
            }
            Some(frame) => {
                self.fail(malformed_error!("end_loop closes {} which is an if", frame.node));
            }
            None => self.fail(malformed_error!("end_loop without an open loop")),
        }
    }

    /// Emits an ALU instruction reading whole values.
    ///
    /// The result has the opcode's fixed output size, or the widest source's
    /// component count for per-component opcodes.
    pub fn alu(&mut self, op: AluOp, srcs: &[ValueId]) -> ValueId {
        let components = match op.output_size() {
            0 => srcs.iter().map(|&v| self.components(v)).max().unwrap_or(1),
            n => n,
        };
        let srcs = srcs.iter().copied().map(AluSrc::new).collect();
        self.alu_with(op, srcs, components)
    }

    /// Emits an ALU instruction with explicit swizzles and result size.
    pub fn alu_with(&mut self, op: AluOp, srcs: Vec<AluSrc>, components: u8) -> ValueId {
        if srcs.len() != op.num_inputs() {
            self.fail(malformed_error!(
                "{} takes {} sources, got {}",
                op,
                op.num_inputs(),
                srcs.len()
            ));
        }
        let dest = self.alloc(components);
        self.emit(Instruction::Alu(AluInstr { op, dest, srcs }));
        dest
    }

    /// Emits a value-producing intrinsic.
    pub fn intrinsic(&mut self, op: IntrinsicOp, srcs: &[ValueId], components: u8) -> ValueId {
        if !op.has_dest() {
            self.fail(malformed_error!("{} does not produce a value", op));
        }
        let dest = self.alloc(components);
        self.emit(Instruction::Intrinsic(IntrinsicInstr {
            op,
            dest: Some(dest),
            srcs: srcs.to_vec(),
        }));
        dest
    }

    /// Emits an intrinsic executed only for its side effects.
    pub fn intrinsic_void(&mut self, op: IntrinsicOp, srcs: &[ValueId]) {
        if op.has_dest() {
            self.fail(malformed_error!("{} produces a value", op));
        }
        self.emit(Instruction::Intrinsic(IntrinsicInstr {
            op,
            dest: None,
            srcs: srcs.to_vec(),
        }));
    }

    /// Emits a texture instruction.
    pub fn tex(&mut self, op: TexOp, srcs: &[TexSrc], components: u8) -> ValueId {
        let dest = self.alloc(components);
        self.emit(Instruction::Tex(TexInstr {
            op,
            dest,
            srcs: srcs.to_vec(),
        }));
        dest
    }

    /// Emits a scalar constant.
    pub fn load_const(&mut self, bits: u64) -> ValueId {
        self.load_const_vec(&[bits])
    }

    /// Emits a vector constant with one entry per component.
    pub fn load_const_vec(&mut self, bits: &[u64]) -> ValueId {
        let components = u8::try_from(bits.len()).unwrap_or(u8::MAX);
        let dest = self.alloc(components);
        self.emit(Instruction::LoadConst(LoadConst {
            dest,
            bits: bits.to_vec(),
        }));
        dest
    }

    /// Emits an undefined value.
    pub fn undef(&mut self, components: u8) -> ValueId {
        let dest = self.alloc(components);
        self.emit(Instruction::Undef(dest));
        dest
    }

    fn deref_mode(&mut self, parent: ValueId) -> VariableMode {
        let mode = self
            .values
            .get(parent.index())
            .map(Value::def)
            .and_then(|site| self.blocks[site.block.index()].instruction(site.instruction))
            .and_then(|instr| match instr {
                Instruction::Deref(deref) => Some(deref.mode),
                _ => None,
            });
        mode.unwrap_or_else(|| {
            self.fail(malformed_error!("{} is not a deref", parent));
            VariableMode::Function
        })
    }

    fn deref(&mut self, mode: VariableMode, kind: DerefKind) -> ValueId {
        let dest = self.alloc(1);
        self.emit(Instruction::Deref(DerefInstr { dest, mode, kind }));
        dest
    }

    /// Emits the root deref of a named variable.
    pub fn deref_var(&mut self, name: impl Into<String>, mode: VariableMode) -> ValueId {
        self.deref(mode, DerefKind::Var { name: name.into() })
    }

    /// Emits an array element deref; the mode is inherited from `parent`.
    pub fn deref_array(&mut self, parent: ValueId, index: ValueId) -> ValueId {
        let mode = self.deref_mode(parent);
        self.deref(mode, DerefKind::Array { parent, index })
    }

    /// Emits a struct member deref; the mode is inherited from `parent`.
    pub fn deref_struct(&mut self, parent: ValueId, field: u32) -> ValueId {
        let mode = self.deref_mode(parent);
        self.deref(mode, DerefKind::Struct { parent, field })
    }

    /// Emits a parallel copy of `srcs` and returns the fresh destinations in order.
    pub fn parallel_copy(&mut self, srcs: &[ValueId]) -> Vec<ValueId> {
        let entries: Vec<CopyEntry> = srcs
            .iter()
            .map(|&src| CopyEntry {
                dest: self.alloc(self.components(src)),
                src,
            })
            .collect();
        let dests = entries.iter().map(|e| e.dest).collect();
        self.emit(Instruction::ParallelCopy(ParallelCopy { entries }));
        dests
    }

    /// Emits a structured jump.
    pub fn jump(&mut self, kind: JumpKind) {
        self.emit(Instruction::Jump(kind));
    }

    /// Emits a call.
    pub fn call(&mut self, callee: impl Into<String>, args: &[ValueId]) {
        self.emit(Instruction::Call(CallInstr {
            callee: callee.into(),
            args: args.to_vec(),
        }));
    }

    /// Emits a phi with no sources at the start of the current block.
    ///
    /// Sources are attached later with [`FunctionBuilder::add_phi_source`], which is
    /// how loop header phis receive their back edge value. The current block must
    /// not contain anything but phis yet.
    pub fn phi(&mut self, components: u8) -> ValueId {
        let block = &self.blocks[self.current.index()];
        if block.phis().count() != block.instruction_count() {
            let current = self.current;
            self.fail(malformed_error!("phi after non-phi instructions in {}", current));
        }
        let dest = self.alloc(components);
        self.emit(Instruction::Phi(PhiNode::new(dest)));
        dest
    }

    /// Adds the incoming `value` from `pred` to the phi defining `phi`.
    pub fn add_phi_source(&mut self, phi: ValueId, pred: BlockId, value: ValueId) {
        let node = self.values.get(phi.index()).map(Value::def).and_then(|site| {
            match self.blocks[site.block.index()]
                .instructions_mut()
                .get_mut(site.instruction)
            {
                Some(Instruction::Phi(node)) => Some(node),
                _ => None,
            }
        });
        match node {
            Some(node) => node.add_source(PhiSource::new(pred, value)),
            None => self.fail(malformed_error!("{} is not a phi", phi)),
        }
    }

    /// Validates and returns the function.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Malformed`] for the first builder misuse (an unterminated
    /// `if` or `loop`, a misplaced phi, a wrong source count) or for any SSA
    /// violation found by [`Function::from_parts`].
    pub fn finish(self) -> Result<Function> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if let Some(frame) = self.stack.last() {
            return Err(malformed_error!("{} is never closed", frame.node));
        }
        Function::from_parts(self.name, self.values, self.blocks, self.cf_nodes, self.body)
    }
}
