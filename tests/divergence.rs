//! Divergence analysis integration tests.
//!
//! These tests build function bodies through the public builder API and check
//! the classification of the values that matter:
//! 1. ALU sources, including vector reassembly
//! 2. Branch merges, loop header merges and loop exit merges
//! 3. Constants, undefined values and memory
//! 4. Driver properties (determinism, re-queue bound, strategy agreement)
//! 5. Contract violations

use lanescope::{
    analysis::{analyze, analyze_shader, analyze_shader_with, try_analyze, DivergenceAnalysis},
    ir::{
        AluOp, AluSrc, BlockId, Function, FunctionBuilder, Instruction, IntrinsicOp, JumpKind,
        Shader, ValueId,
    },
    AnalysisConfig, Error, RequeueStrategy, Result,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `cond = op(); if (cond) { a = 1 } else { a = 2 }; x = phi(a_then, a_else)`
fn branch_merge(cond_op: IntrinsicOp) -> Result<(Function, ValueId, ValueId)> {
    let mut b = FunctionBuilder::new("branch_merge");
    let cond = b.intrinsic(cond_op, &[], 1);
    b.begin_if(cond);
    let one = b.load_const(1);
    let then_end = b.current_block();
    b.begin_else();
    let two = b.load_const(2);
    let else_end = b.current_block();
    b.end_if();
    let x = b.phi(1);
    b.add_phi_source(x, then_end, one);
    b.add_phi_source(x, else_end, two);
    Ok((b.finish()?, cond, x))
}

/// A loop whose counter is bumped once more on a `continue` path taken when
/// `counter == lane`.
fn continue_loop(lane_op: IntrinsicOp) -> Result<(Function, ValueId)> {
    let mut b = FunctionBuilder::new("continue_loop");
    let n = b.intrinsic(IntrinsicOp::LoadPushConstant, &[], 1);
    let lane = b.intrinsic(lane_op, &[], 1);
    let zero = b.load_const(0);
    let one = b.load_const(1);
    let two = b.load_const(2);
    let preheader = b.current_block();

    b.begin_loop();
    let counter = b.phi(1);
    b.add_phi_source(counter, preheader, zero);
    let done = b.alu(AluOp::Ige, &[counter, n]);
    b.begin_if(done);
    b.jump(JumpKind::Break);
    b.end_if();

    let skip = b.alu(AluOp::Ieq, &[counter, lane]);
    b.begin_if(skip);
    let skipped = b.alu(AluOp::Iadd, &[counter, two]);
    let skip_block = b.current_block();
    b.jump(JumpKind::Continue);
    b.end_if();

    let stepped = b.alu(AluOp::Iadd, &[counter, one]);
    let last = b.current_block();
    b.add_phi_source(counter, skip_block, skipped);
    b.add_phi_source(counter, last, stepped);
    b.end_loop();

    Ok((b.finish()?, counter))
}

/// A loop left when `counter >= op()`, returning the counter at the exit.
fn break_loop(bound_op: IntrinsicOp) -> Result<(Function, ValueId, ValueId)> {
    let mut b = FunctionBuilder::new("break_loop");
    let zero = b.load_const(0);
    let one = b.load_const(1);
    let preheader = b.current_block();

    b.begin_loop();
    let counter = b.phi(1);
    b.add_phi_source(counter, preheader, zero);
    let bound = b.intrinsic(bound_op, &[], 1);
    let done = b.alu(AluOp::Ige, &[counter, bound]);
    b.begin_if(done);
    let break_block = b.current_block();
    b.jump(JumpKind::Break);
    b.end_if();
    let next = b.alu(AluOp::Iadd, &[counter, one]);
    let last = b.current_block();
    b.add_phi_source(counter, last, next);
    b.end_loop();

    let result = b.phi(1);
    b.add_phi_source(result, break_block, counter);
    Ok((b.finish()?, counter, result))
}

/// `loop { if (outer) { if (inner) { break } } counter += 1 }; result = phi(break: counter)`
fn nested_break_loop(outer_op: IntrinsicOp, inner_op: IntrinsicOp) -> Result<(Function, ValueId)> {
    let mut b = FunctionBuilder::new("nested_break_loop");
    let zero = b.load_const(0);
    let one = b.load_const(1);
    let preheader = b.current_block();

    b.begin_loop();
    let counter = b.phi(1);
    b.add_phi_source(counter, preheader, zero);
    let outer = b.intrinsic(outer_op, &[], 1);
    let inner = b.intrinsic(inner_op, &[], 1);
    b.begin_if(outer);
    b.begin_if(inner);
    let break_block = b.current_block();
    b.jump(JumpKind::Break);
    b.end_if();
    b.end_if();
    let next = b.alu(AluOp::Iadd, &[counter, one]);
    let last = b.current_block();
    b.add_phi_source(counter, last, next);
    b.end_loop();

    let result = b.phi(1);
    b.add_phi_source(result, break_block, counter);
    Ok((b.finish()?, result))
}

/// Like [`continue_loop`], with the `continue` guarded by two nested `if`s.
fn nested_continue_loop(
    outer_op: IntrinsicOp,
    inner_op: IntrinsicOp,
) -> Result<(Function, ValueId)> {
    let mut b = FunctionBuilder::new("nested_continue_loop");
    let n = b.intrinsic(IntrinsicOp::LoadPushConstant, &[], 1);
    let zero = b.load_const(0);
    let one = b.load_const(1);
    let two = b.load_const(2);
    let preheader = b.current_block();

    b.begin_loop();
    let counter = b.phi(1);
    b.add_phi_source(counter, preheader, zero);
    let done = b.alu(AluOp::Ige, &[counter, n]);
    b.begin_if(done);
    b.jump(JumpKind::Break);
    b.end_if();

    let outer = b.intrinsic(outer_op, &[], 1);
    let inner = b.intrinsic(inner_op, &[], 1);
    b.begin_if(outer);
    b.begin_if(inner);
    let skipped = b.alu(AluOp::Iadd, &[counter, two]);
    let skip_block = b.current_block();
    b.jump(JumpKind::Continue);
    b.end_if();
    b.end_if();

    let stepped = b.alu(AluOp::Iadd, &[counter, one]);
    let last = b.current_block();
    b.add_phi_source(counter, skip_block, skipped);
    b.add_phi_source(counter, last, stepped);
    b.end_loop();

    Ok((b.finish()?, counter))
}

/// (outer, inner, expected divergence of the merge)
const NESTED_CASES: [(IntrinsicOp, IntrinsicOp, bool); 4] = [
    (IntrinsicOp::LoadInvocationId, IntrinsicOp::LoadPushConstant, true),
    (IntrinsicOp::LoadPushConstant, IntrinsicOp::LoadInvocationId, true),
    (IntrinsicOp::LoadInvocationId, IntrinsicOp::LoadInvocationId, true),
    (IntrinsicOp::LoadPushConstant, IntrinsicOp::LoadPushConstant, false),
];

fn strategies() -> [AnalysisConfig; 2] {
    [
        AnalysisConfig::default(),
        AnalysisConfig {
            requeue: RequeueStrategy::Dependents,
            ..AnalysisConfig::default()
        },
    ]
}

#[test]
fn test_divergent_branch_scenario() -> Result<()> {
    init_logging();
    let (func, cond, x) = branch_merge(IntrinsicOp::LoadInvocationId)?;

    let table = analyze(&func);
    assert!(table.is_divergent(cond));
    assert!(table.is_divergent(x));
    Ok(())
}

#[test]
fn test_uniform_branch_scenario() -> Result<()> {
    init_logging();
    let (func, cond, x) = branch_merge(IntrinsicOp::LoadPushConstant)?;

    let table = analyze(&func);
    assert!(!table.is_divergent(cond));
    assert!(!table.is_divergent(x));
    Ok(())
}

#[test]
fn test_vector_reassembly() -> Result<()> {
    init_logging();
    let mut b = FunctionBuilder::new("reassembly");
    let a = b.intrinsic(IntrinsicOp::LoadWorkGroupId, &[], 1);
    let c = b.intrinsic(IntrinsicOp::LoadLocalInvocationIndex, &[], 1);
    let v = b.alu(AluOp::Vec2, &[a, c]);
    let x = b.alu_with(AluOp::Mov, vec![AluSrc::component(v, 0)], 1);
    let y = b.alu_with(AluOp::Mov, vec![AluSrc::component(v, 1)], 1);
    let yx = b.alu_with(AluOp::Mov, vec![AluSrc::swizzled(v, [1, 0, 0, 0])], 2);
    let func = b.finish()?;

    let table = analyze(&func);
    assert!(table.is_divergent(v));
    assert!(table.is_uniform(x));
    assert!(table.is_divergent(y));
    assert!(table.is_divergent(yx));
    Ok(())
}

#[test]
fn test_single_real_source_merge() -> Result<()> {
    init_logging();
    let mut b = FunctionBuilder::new("partial");
    let cond = b.intrinsic(IntrinsicOp::LoadInvocationId, &[], 1);
    b.begin_if(cond);
    let value = b.load_const(7);
    let then_end = b.current_block();
    b.begin_else();
    let missing = b.undef(1);
    let else_end = b.current_block();
    b.end_if();
    let x = b.phi(1);
    b.add_phi_source(x, then_end, value);
    b.add_phi_source(x, else_end, missing);
    let func = b.finish()?;

    let table = analyze(&func);
    assert!(table.is_divergent(cond));
    assert!(table.is_uniform(x));
    Ok(())
}

#[test]
fn test_loop_header_merge() -> Result<()> {
    init_logging();
    let (func, counter) = continue_loop(IntrinsicOp::LoadSubgroupInvocation)?;
    assert!(analyze(&func).is_divergent(counter));

    let (func, counter) = continue_loop(IntrinsicOp::LoadNumSubgroups)?;
    assert!(analyze(&func).is_uniform(counter));
    Ok(())
}

#[test]
fn test_loop_exit_merge() -> Result<()> {
    init_logging();
    let (func, counter, result) = break_loop(IntrinsicOp::LoadLocalInvocationIndex)?;
    let table = analyze(&func);
    assert!(table.is_uniform(counter));
    assert!(table.is_divergent(result));

    let (func, counter, result) = break_loop(IntrinsicOp::LoadSubgroupSize)?;
    let table = analyze(&func);
    assert!(table.is_uniform(counter));
    assert!(table.is_uniform(result));
    Ok(())
}

#[test]
fn test_constants_and_undef_stay_uniform() -> Result<()> {
    init_logging();
    let (func, _, _) = break_loop(IntrinsicOp::LoadLocalInvocationIndex)?;
    let table = analyze(&func);

    let mut checked = 0;
    for instr in func.instructions() {
        if matches!(instr, Instruction::LoadConst(_)) || instr.is_undef() {
            for value in instr.defs() {
                assert!(table.is_uniform(value), "{value} should be uniform");
                checked += 1;
            }
        }
    }
    assert_eq!(checked, 2);
    Ok(())
}

#[test]
fn test_analysis_is_deterministic() -> Result<()> {
    init_logging();
    let (func, _) = continue_loop(IntrinsicOp::LoadSubgroupInvocation)?;

    let first = analyze(&func);
    let second = analyze(&func);
    let first: Vec<_> = first.divergent_values().collect();
    let second: Vec<_> = second.divergent_values().collect();
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_requeues_bounded_by_values() -> Result<()> {
    init_logging();
    let (func, _) = continue_loop(IntrinsicOp::LoadSubgroupInvocation)?;

    for config in strategies() {
        let mut analysis = DivergenceAnalysis::new(config);
        let table = analysis.run(&func)?;
        let stats = analysis.stats();
        assert_eq!(stats.flips, table.divergent_count());
        assert!(stats.requeues <= stats.flips);
        assert!(stats.requeues <= func.value_count());
        assert!(stats.block_visits >= func.block_count());
    }
    Ok(())
}

#[test]
fn test_strategies_reach_same_fixed_point() -> Result<()> {
    init_logging();
    let functions = [
        branch_merge(IntrinsicOp::LoadInvocationId)?.0,
        continue_loop(IntrinsicOp::LoadSubgroupInvocation)?.0,
        break_loop(IntrinsicOp::LoadLocalInvocationIndex)?.0,
    ];

    for func in &functions {
        let [all, deps] = strategies();
        let all = DivergenceAnalysis::new(all).run(func)?;
        let deps = DivergenceAnalysis::new(deps).run(func)?;
        assert_eq!(
            all.divergent_values().collect::<Vec<_>>(),
            deps.divergent_values().collect::<Vec<_>>(),
            "{}",
            func.name()
        );
    }
    Ok(())
}

#[test]
fn test_racy_memory_makes_loads_divergent() -> Result<()> {
    init_logging();
    let mut b = FunctionBuilder::new("loads");
    let k = b.intrinsic(IntrinsicOp::LoadPushConstant, &[], 1);
    let shared = b.intrinsic(IntrinsicOp::LoadShared, &[k], 1);
    let func = b.finish()?;

    assert!(try_analyze(&func)?.is_uniform(shared));

    let racy = AnalysisConfig {
        assume_race_free_memory: false,
        ..AnalysisConfig::default()
    };
    let table = DivergenceAnalysis::new(racy).run(&func)?;
    assert!(table.is_uniform(k));
    assert!(table.is_divergent(shared));
    Ok(())
}

#[test]
fn test_call_is_rejected() -> Result<()> {
    let mut b = FunctionBuilder::new("caller");
    let k = b.load_const(1);
    b.call("callee", &[k]);
    let func = b.finish()?;

    match try_analyze(&func) {
        Err(Error::UnsupportedInstruction { block, index, kind }) => {
            assert_eq!(block, BlockId::new(0));
            assert_eq!(index, 1);
            assert_eq!(kind, "call");
        }
        other => panic!("expected an unsupported instruction, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_merge_outside_loop_at_list_start() -> Result<()> {
    let mut b = FunctionBuilder::new("stray");
    let entry = b.current_block();
    let x = b.phi(1);
    let k = b.load_const(1);
    b.add_phi_source(x, entry, k);
    let func = b.finish()?;

    assert!(matches!(
        try_analyze(&func),
        Err(Error::UnexpectedCfShape { .. })
    ));
    Ok(())
}

#[test]
fn test_loop_exit_merge_walks_nested_ifs() -> Result<()> {
    init_logging();
    for (outer, inner, divergent) in NESTED_CASES {
        let (func, result) = nested_break_loop(outer, inner)?;
        for config in strategies() {
            let table = DivergenceAnalysis::new(config.clone()).run(&func)?;
            assert_eq!(
                table.is_divergent(result),
                divergent,
                "outer {outer}, inner {inner}, requeue {}",
                config.requeue
            );
        }
    }
    Ok(())
}

#[test]
fn test_loop_header_merge_walks_nested_ifs() -> Result<()> {
    init_logging();
    for (outer, inner, divergent) in NESTED_CASES {
        let (func, counter) = nested_continue_loop(outer, inner)?;
        for config in strategies() {
            let table = DivergenceAnalysis::new(config.clone()).run(&func)?;
            assert_eq!(
                table.is_divergent(counter),
                divergent,
                "outer {outer}, inner {inner}, requeue {}",
                config.requeue
            );
        }
    }
    Ok(())
}

#[test]
fn test_loop_exit_edge_outside_if() -> Result<()> {
    let mut b = FunctionBuilder::new("bare_break");
    let k = b.load_const(1);
    b.begin_loop();
    let body = b.current_block();
    b.jump(JumpKind::Break);
    b.end_loop();
    let result = b.phi(1);
    b.add_phi_source(result, body, k);
    let func = b.finish()?;

    match try_analyze(&func) {
        Err(Error::UnexpectedCfShape { message, .. }) => {
            assert!(message.contains("does not leave from inside an if"), "{message}");
        }
        other => panic!("expected a shape error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_loop_header_without_back_edge() -> Result<()> {
    let mut b = FunctionBuilder::new("open_loop");
    let zero = b.load_const(0);
    let preheader = b.current_block();
    b.begin_loop();
    let counter = b.phi(1);
    b.add_phi_source(counter, preheader, zero);
    b.jump(JumpKind::Break);
    b.end_loop();
    let func = b.finish()?;

    match try_analyze(&func) {
        Err(Error::UnexpectedCfShape { message, .. }) => {
            assert!(message.contains("1 unconditional edges"), "{message}");
        }
        other => panic!("expected a shape error, got {other:?}"),
    }
    Ok(())
}

#[test]
#[should_panic(expected = "divergence analysis of caller failed")]
fn test_analyze_aborts_on_contract_violation() {
    let mut b = FunctionBuilder::new("caller");
    b.call("callee", &[]);
    let func = b.finish().unwrap();
    let _ = analyze(&func);
}

#[test]
fn test_shader_analysis() -> Result<()> {
    init_logging();
    let (divergent, _, x) = branch_merge(IntrinsicOp::LoadInvocationId)?;
    let (uniform, _, y) = branch_merge(IntrinsicOp::LoadPushConstant)?;
    let shader = Shader::new("shader", vec![uniform, divergent], 1);

    let result = analyze_shader(&shader)?;
    assert_eq!(result.tables().len(), 2);
    assert!(result.entrypoint()?.is_divergent(x));
    assert!(result.table(0).is_some_and(|t| t.is_uniform(y)));

    let config = AnalysisConfig {
        requeue: RequeueStrategy::Dependents,
        ..AnalysisConfig::default()
    };
    let result = analyze_shader_with(&shader, &config)?;
    assert!(result.entrypoint()?.is_divergent(x));
    Ok(())
}

#[test]
fn test_shader_with_bad_entrypoint() -> Result<()> {
    let (func, _, _) = branch_merge(IntrinsicOp::LoadPushConstant)?;
    let shader = Shader::new("shader", vec![func], 3);

    assert_eq!(analyze_shader(&shader).err(), Some(Error::InvalidEntrypoint(3)));
    Ok(())
}

#[test]
fn test_annotated_dump() -> Result<()> {
    let (func, _, _) = branch_merge(IntrinsicOp::LoadInvocationId)?;
    let table = analyze(&func);
    let text = func.display_with(&table).to_string();

    assert!(text.starts_with("impl branch_merge {"));
    assert!(text.contains("div %0 = @load_invocation_id ()"));
    assert!(text.contains("con %1"));
    assert!(text.contains("div %3 = phi"));
    assert!(text.contains("} else {"));
    Ok(())
}
