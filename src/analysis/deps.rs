//! Reverse index from values to the blocks whose transfer functions read them.
//!
//! Used by [`crate::RequeueStrategy::Dependents`]: when a value flips, only the
//! blocks listed here can compute a different answer on their next visit.
//! The index is an over-approximation. It lists every value a transfer
//! function may consult, including the scalar behind a swizzled `vecN`
//! component, the indices of a shared deref chain, and the branch conditions
//! enclosing every predecessor of a merge.

use crate::{
    analysis::{
        phi::PhiShape,
        transfer::{alu_source_value, shared_deref_indices},
    },
    ir::{BlockId, CfNode, Function, Instruction, IntrinsicOp, PhiNode, ValueId},
};

/// Blocks reading each value, deduplicated, in program order.
#[derive(Debug, Clone)]
pub(crate) struct DependencyIndex {
    readers: Vec<Vec<BlockId>>,
}

impl DependencyIndex {
    /// Builds the index for `func`.
    pub(crate) fn build(func: &Function) -> Self {
        let mut readers: Vec<Vec<BlockId>> = vec![Vec::new(); func.value_count()];
        for block in func.blocks() {
            for instr in block.instructions() {
                for value in transfer_reads(func, block.id(), instr) {
                    let list = &mut readers[value.index()];
                    if list.last() != Some(&block.id()) {
                        list.push(block.id());
                    }
                }
            }
        }
        Self { readers }
    }

    /// Returns the blocks whose transfer functions read `value`.
    pub(crate) fn readers(&self, value: ValueId) -> &[BlockId] {
        self.readers.get(value.index()).map_or(&[], Vec::as_slice)
    }
}

/// Returns every value the transfer function of `instr` may consult.
fn transfer_reads(func: &Function, block: BlockId, instr: &Instruction) -> Vec<ValueId> {
    match instr {
        Instruction::Alu(alu) => (0..alu.srcs.len())
            .filter_map(|i| alu_source_value(func, alu, i))
            .chain(alu.srcs.iter().map(|s| s.value))
            .collect(),
        Instruction::Intrinsic(intr) if intr.op == IntrinsicOp::LoadDeref => {
            let mut reads = intr.srcs.clone();
            if let Some(indices) = intr
                .srcs
                .first()
                .and_then(|&address| shared_deref_indices(func, address))
            {
                reads.extend(indices);
            }
            reads
        }
        Instruction::Phi(phi) => phi_reads(func, block, phi),
        _ => instr.uses().into_iter().map(|(value, _)| value).collect(),
    }
}

/// Incoming values plus every branch condition that may control the merge.
///
/// Conditions are collected by walking from each predecessor to the function
/// root, a superset of what the classifier inspects for any shape. A block
/// that is not a valid merge position contributes its incoming values only;
/// the visit itself reports the shape error.
fn phi_reads(func: &Function, block: BlockId, phi: &PhiNode) -> Vec<ValueId> {
    let mut reads: Vec<ValueId> = phi.used_values().collect();
    if let Ok(PhiShape::Gamma(node)) = PhiShape::of(func, block) {
        reads.extend(func.if_condition(node));
    }
    for source in phi.sources() {
        let mut current = func.block_parent(source.pred());
        while let Some(node) = current {
            if let Some(CfNode::If(branch)) = func.cf_node(node) {
                reads.push(branch.condition);
            }
            current = func.cf_parent(node);
        }
    }
    reads
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{AluOp, AluSrc, FunctionBuilder, IntrinsicOp},
        test::{continue_loop, if_else_merge},
    };

    #[test]
    fn test_gamma_depends_on_condition() {
        let fixture = if_else_merge(true);
        let index = DependencyIndex::build(&fixture.func);
        assert_eq!(index.readers(fixture.cond), &[fixture.merge]);
    }

    #[test]
    fn test_mu_depends_on_continue_condition() {
        let fixture = continue_loop(true);
        let index = DependencyIndex::build(&fixture.func);
        assert!(index.readers(fixture.continue_cond).contains(&fixture.header));
    }

    #[test]
    fn test_swizzled_vec_component_tracked() {
        let mut b = FunctionBuilder::new("main");
        let a = b.load_const(1);
        let c = b.load_const(2);
        let v = b.alu(AluOp::Vec2, &[a, c]);
        b.begin_loop();
        let user = b.current_block();
        let k = b.intrinsic(IntrinsicOp::LoadPushConstant, &[], 1);
        let done = b.alu_with(AluOp::Ieq, vec![AluSrc::component(v, 1), AluSrc::new(k)], 1);
        b.begin_if(done);
        b.jump(crate::ir::JumpKind::Break);
        b.end_if();
        b.end_loop();
        let func = b.finish().unwrap();

        let index = DependencyIndex::build(&func);
        assert!(index.readers(c).contains(&user));
        assert!(index.readers(v).contains(&user));
        assert!(index.readers(ValueId::new(99)).is_empty());
    }
}
