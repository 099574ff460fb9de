//! Per-instruction transfer functions.
//!
//! Each function reads the current table and computes the classification of
//! the instruction's results. Results are only ever raised, so a value that is
//! already divergent is not recomputed.

use log::trace;

use crate::{
    analysis::{phi::phi_uniformity, DivergencePolicy, DivergenceTable, Uniformity},
    config::AnalysisConfig,
    ir::{
        AluInstr, BlockId, DerefInstr, DerefKind, Function, Instruction, IntrinsicInstr,
        IntrinsicOp, TexInstr, TexSrcKind, UseKinds, Value, ValueId, VariableMode,
    },
    Error, Result,
};

/// Returns the value whose divergence decides ALU source `index`.
///
/// A source read as a single component of a vector assembled by `vecN`
/// resolves to the scalar that filled that component.
pub(crate) fn alu_source_value(func: &Function, alu: &AluInstr, index: usize) -> Option<ValueId> {
    let src = alu.srcs.get(index)?;
    let read = match alu.op.input_size(index) {
        0 => func.value(alu.dest).map_or(1, Value::num_components),
        n => n,
    };
    if read != 1 || func.value(src.value).map_or(true, Value::is_scalar) {
        return Some(src.value);
    }

    match func.def_instruction(src.value) {
        Some(Instruction::Alu(parent)) if parent.op.is_vec() => parent
            .srcs
            .get(usize::from(src.swizzle[0]))
            .map_or(Some(src.value), |component| Some(component.value)),
        _ => Some(src.value),
    }
}

/// Returns the array indices along a deref chain rooted in shared memory.
///
/// `None` if any link is not a shared-memory deref.
pub(crate) fn shared_deref_indices(func: &Function, deref: ValueId) -> Option<Vec<ValueId>> {
    let mut indices = Vec::new();
    let mut current = deref;
    loop {
        let Some(Instruction::Deref(DerefInstr { mode, kind, .. })) = func.def_instruction(current)
        else {
            return None;
        };
        if *mode != VariableMode::Shared {
            return None;
        }
        match kind {
            DerefKind::Var { .. } => return Some(indices),
            DerefKind::Array { parent, index } => {
                indices.push(*index);
                current = *parent;
            }
            DerefKind::Struct { parent, .. } => current = *parent,
        }
    }
}

/// Transfer functions bound to one function and configuration.
pub(crate) struct Transfer<'a> {
    func: &'a Function,
    config: &'a AnalysisConfig,
}

impl<'a> Transfer<'a> {
    pub(crate) const fn new(func: &'a Function, config: &'a AnalysisConfig) -> Self {
        Self { func, config }
    }

    /// Applies the transfer function of instruction `index` of `block`,
    /// appending every value that flipped to divergent to `flipped`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedInstruction`] for calls and
    /// [`Error::UnexpectedCfShape`] for merges the phi classifier rejects.
    pub(crate) fn visit(
        &self,
        table: &mut DivergenceTable,
        block: BlockId,
        index: usize,
        instr: &Instruction,
        flipped: &mut Vec<ValueId>,
    ) -> Result<()> {
        match instr {
            Instruction::Alu(alu) => {
                if table.is_uniform(alu.dest) {
                    let fact = self.alu(table, alu);
                    record(table, alu.dest, fact, flipped);
                }
            }
            Instruction::Intrinsic(intr) => {
                if let Some(dest) = intr.dest.filter(|&d| table.is_uniform(d)) {
                    let fact = self.intrinsic(table, intr);
                    record(table, dest, fact, flipped);
                }
            }
            Instruction::Tex(tex) => {
                if table.is_uniform(tex.dest) {
                    let fact = tex_uniformity(table, tex);
                    record(table, tex.dest, fact, flipped);
                }
            }
            Instruction::Phi(phi) => {
                if table.is_uniform(phi.dest()) {
                    let fact = phi_uniformity(self.func, table, block, phi)?;
                    record(table, phi.dest(), fact, flipped);
                }
            }
            Instruction::ParallelCopy(copy) => {
                for entry in &copy.entries {
                    let fact = table.uniformity(entry.src);
                    record(table, entry.dest, fact, flipped);
                }
            }
            Instruction::Deref(deref) => {
                let fact = self.deref(deref.dest);
                record(table, deref.dest, fact, flipped);
            }
            Instruction::LoadConst(_) | Instruction::Undef(_) | Instruction::Jump(_) => {}
            Instruction::Call(_) => {
                return Err(Error::UnsupportedInstruction {
                    block,
                    index,
                    kind: instr.kind_name(),
                })
            }
        }
        Ok(())
    }

    fn alu(&self, table: &DivergenceTable, alu: &AluInstr) -> Uniformity {
        Uniformity::join_all(
            (0..alu.srcs.len())
                .filter_map(|i| alu_source_value(self.func, alu, i))
                .map(|v| table.uniformity(v)),
        )
    }

    fn intrinsic(&self, table: &DivergenceTable, intr: &IntrinsicInstr) -> Uniformity {
        match intr.op.divergence_policy() {
            DivergencePolicy::AlwaysUniform => Uniformity::Uniform,
            DivergencePolicy::AlwaysDivergent => Uniformity::Divergent,
            DivergencePolicy::UniformIfSourcesUniform if !self.config.assume_race_free_memory => {
                Uniformity::Divergent
            }
            DivergencePolicy::UniformIfSourcesUniform if intr.op == IntrinsicOp::LoadDeref => {
                self.load_deref(table, intr)
            }
            DivergencePolicy::UniformIfSourcesUniform => {
                Uniformity::join_all(intr.srcs.iter().map(|&v| table.uniformity(v)))
            }
        }
    }

    fn load_deref(&self, table: &DivergenceTable, intr: &IntrinsicInstr) -> Uniformity {
        let Some((&address, rest)) = intr.srcs.split_first() else {
            return Uniformity::Divergent;
        };
        match shared_deref_indices(self.func, address) {
            Some(indices) => Uniformity::join_all(
                indices
                    .iter()
                    .chain(rest)
                    .map(|&v| table.uniformity(v)),
            ),
            None => Uniformity::Divergent,
        }
    }

    /// Deref values are divergent only when every use is a texture coordinate.
    // TODO: model divergent texture addressing through derefs instead of this
    // coordinate-only placeholder.
    fn deref(&self, value: ValueId) -> Uniformity {
        let kinds = self.func.use_kinds(value);
        Uniformity::from_divergent(kinds == UseKinds::TEX_COORD)
    }
}

fn tex_uniformity(table: &DivergenceTable, tex: &TexInstr) -> Uniformity {
    Uniformity::join_all(
        tex.srcs
            .iter()
            .filter(|src| src.kind == TexSrcKind::Coord)
            .map(|src| table.uniformity(src.value)),
    )
}

fn record(
    table: &mut DivergenceTable,
    value: ValueId,
    fact: Uniformity,
    flipped: &mut Vec<ValueId>,
) {
    if table.raise(value, fact) {
        trace!("{value} is divergent");
        flipped.push(value);
    }
}
