//! Shared fixtures for unit tests.

use crate::ir::{
    AluOp, BlockId, CfNodeId, Function, FunctionBuilder, IntrinsicOp, JumpKind, ValueId,
};

/// Routes `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `if (cond) { a = 1 } else { b = 2 }; merged = phi(a, b)`
pub struct IfElseMerge {
    pub func: Function,
    pub cond: ValueId,
    pub branch: CfNodeId,
    pub merge: BlockId,
    pub merged: ValueId,
}

// Condition is a per-invocation id when `divergent`, a push constant otherwise
pub fn if_else_merge(divergent: bool) -> IfElseMerge {
    let mut b = FunctionBuilder::new("if_else_merge");
    let op = if divergent {
        IntrinsicOp::LoadInvocationId
    } else {
        IntrinsicOp::LoadPushConstant
    };
    let cond = b.intrinsic(op, &[], 1);
    let branch = b.begin_if(cond);
    let a = b.load_const(1);
    let then_end = b.current_block();
    b.begin_else();
    let c = b.load_const(2);
    let else_end = b.current_block();
    b.end_if();
    let merge = b.current_block();
    let merged = b.phi(1);
    b.add_phi_source(merged, then_end, a);
    b.add_phi_source(merged, else_end, c);

    IfElseMerge {
        func: b.finish().unwrap(),
        cond,
        branch,
        merge,
        merged,
    }
}

/// A counting loop whose header merge has an extra `continue` edge.
///
/// ```text
/// loop {
///   counter = phi(preheader: 0, continue: skipped, last: stepped)
///   if (counter >= n) break
///   if (counter == lane) { skipped = counter + 1; continue }
///   stepped = counter + 1
/// }
/// ```
pub struct ContinueLoop {
    pub func: Function,
    pub loop_node: CfNodeId,
    pub header: BlockId,
    pub exit: BlockId,
    pub counter: ValueId,
    pub continue_cond: ValueId,
}

// `lane` is the subgroup invocation index when `divergent`, a subgroup count otherwise
pub fn continue_loop(divergent: bool) -> ContinueLoop {
    let mut b = FunctionBuilder::new("continue_loop");
    let n = b.intrinsic(IntrinsicOp::LoadPushConstant, &[], 1);
    let lane_op = if divergent {
        IntrinsicOp::LoadSubgroupInvocation
    } else {
        IntrinsicOp::LoadNumSubgroups
    };
    let lane = b.intrinsic(lane_op, &[], 1);
    let zero = b.load_const(0);
    let one = b.load_const(1);
    let preheader = b.current_block();

    let loop_node = b.begin_loop();
    let header = b.current_block();
    let counter = b.phi(1);
    b.add_phi_source(counter, preheader, zero);
    let done = b.alu(AluOp::Ige, &[counter, n]);
    b.begin_if(done);
    b.jump(JumpKind::Break);
    b.end_if();

    let continue_cond = b.alu(AluOp::Ieq, &[counter, lane]);
    b.begin_if(continue_cond);
    let skipped = b.alu(AluOp::Iadd, &[counter, one]);
    let continue_block = b.current_block();
    b.jump(JumpKind::Continue);
    b.end_if();

    let stepped = b.alu(AluOp::Iadd, &[counter, one]);
    let last = b.current_block();
    b.add_phi_source(counter, continue_block, skipped);
    b.add_phi_source(counter, last, stepped);
    b.end_loop();
    let exit = b.current_block();

    ContinueLoop {
        func: b.finish().unwrap(),
        loop_node,
        header,
        exit,
        counter,
        continue_cond,
    }
}

/// A loop left through a per-invocation `break`, with the counter live after it.
///
/// ```text
/// loop {
///   counter = phi(preheader: 0, last: next)
///   if (counter >= local_index) break
///   next = counter + 1
/// }
/// result = phi(break: counter)
/// ```
pub struct BreakLoop {
    pub func: Function,
    pub loop_node: CfNodeId,
    pub exit: BlockId,
    pub counter: ValueId,
    pub break_cond: ValueId,
    pub result: ValueId,
}

pub fn divergent_break_loop() -> BreakLoop {
    let mut b = FunctionBuilder::new("divergent_break_loop");
    let zero = b.load_const(0);
    let one = b.load_const(1);
    let preheader = b.current_block();

    let loop_node = b.begin_loop();
    let counter = b.phi(1);
    b.add_phi_source(counter, preheader, zero);
    let lane = b.intrinsic(IntrinsicOp::LoadLocalInvocationIndex, &[], 1);
    let break_cond = b.alu(AluOp::Ige, &[counter, lane]);
    b.begin_if(break_cond);
    let break_block = b.current_block();
    b.jump(JumpKind::Break);
    b.end_if();
    let next = b.alu(AluOp::Iadd, &[counter, one]);
    let last = b.current_block();
    b.add_phi_source(counter, last, next);
    b.end_loop();

    let exit = b.current_block();
    let result = b.phi(1);
    b.add_phi_source(result, break_block, counter);

    BreakLoop {
        func: b.finish().unwrap(),
        loop_node,
        exit,
        counter,
        break_cond,
        result,
    }
}
