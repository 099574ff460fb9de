//! Benchmarks for the divergence analysis driver.
//!
//! Two synthetic function shapes, each analyzed with both re-queue strategies:
//! - A long chain of branch merges whose conditions depend on the previous merge
//! - A loop carrying many values, made divergent through the back edge only

extern crate lanescope;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lanescope::{
    analysis::DivergenceAnalysis,
    ir::{AluOp, Function, FunctionBuilder, IntrinsicOp, JumpKind},
    AnalysisConfig, RequeueStrategy,
};
use std::hint::black_box;

/// `acc = k; repeat n { if (acc == lane) { acc + 1 } else { acc + 2 } }`
fn branch_chain(n: usize) -> Function {
    let mut b = FunctionBuilder::new("branch_chain");
    let lane = b.intrinsic(IntrinsicOp::LoadLocalInvocationIndex, &[], 1);
    let one = b.load_const(1);
    let two = b.load_const(2);
    let mut acc = b.intrinsic(IntrinsicOp::LoadPushConstant, &[], 1);

    for _ in 0..n {
        let cond = b.alu(AluOp::Ieq, &[acc, lane]);
        b.begin_if(cond);
        let a = b.alu(AluOp::Iadd, &[acc, one]);
        let then_end = b.current_block();
        b.begin_else();
        let c = b.alu(AluOp::Iadd, &[acc, two]);
        let else_end = b.current_block();
        b.end_if();
        let merged = b.phi(1);
        b.add_phi_source(merged, then_end, a);
        b.add_phi_source(merged, else_end, c);
        acc = merged;
    }

    b.finish().unwrap()
}

/// A loop with `n` carried values `c_i = phi(0, c_{i+1} + 1)`; the last one is
/// fed from the invocation index, so divergence travels backwards one value
/// per iteration of the fixed point.
fn carried_loop(n: usize) -> Function {
    let mut b = FunctionBuilder::new("carried_loop");
    let zero = b.load_const(0);
    let one = b.load_const(1);
    let bound = b.intrinsic(IntrinsicOp::LoadPushConstant, &[], 1);
    let preheader = b.current_block();

    b.begin_loop();
    let carried: Vec<_> = (0..n).map(|_| b.phi(1)).collect();
    for &phi in &carried {
        b.add_phi_source(phi, preheader, zero);
    }
    let done = b.alu(AluOp::Ige, &[carried[0], bound]);
    b.begin_if(done);
    b.jump(JumpKind::Break);
    b.end_if();

    let lane = b.intrinsic(IntrinsicOp::LoadSubgroupInvocation, &[], 1);
    let mut next = Vec::with_capacity(n);
    for i in 0..n {
        let src = carried.get(i + 1).copied().unwrap_or(lane);
        next.push(b.alu(AluOp::Iadd, &[src, one]));
    }
    let last = b.current_block();
    for (&phi, &value) in carried.iter().zip(&next) {
        b.add_phi_source(phi, last, value);
    }
    b.end_loop();

    b.finish().unwrap()
}

fn bench_strategies(c: &mut Criterion, name: &str, func: &Function) {
    let mut group = c.benchmark_group(name);
    group.throughput(Throughput::Elements(func.value_count() as u64));

    for requeue in [RequeueStrategy::AllBlocks, RequeueStrategy::Dependents] {
        let config = AnalysisConfig {
            requeue,
            ..AnalysisConfig::default()
        };
        group.bench_with_input(BenchmarkId::from_parameter(requeue), func, |b, func| {
            b.iter(|| {
                let table = DivergenceAnalysis::new(config.clone())
                    .run(black_box(func))
                    .unwrap();
                black_box(table)
            });
        });
    }

    group.finish();
}

/// Benchmark 256 chained branch merges.
fn bench_branch_chain(c: &mut Criterion) {
    let func = branch_chain(256);
    bench_strategies(c, "branch_chain", &func);
}

/// Benchmark a loop carrying 64 values.
fn bench_carried_loop(c: &mut Criterion) {
    let func = carried_loop(64);
    bench_strategies(c, "carried_loop", &func);
}

criterion_group!(benches, bench_branch_chain, bench_carried_loop);
criterion_main!(benches);
