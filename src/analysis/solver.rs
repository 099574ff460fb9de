//! Worklist-based fixed-point driver.
//!
//! # Algorithm
//!
//! 1. Start with every value uniform
//! 2. Add all blocks to the worklist in program order
//! 3. While the worklist is non-empty:
//!    a. Remove a block from the worklist
//!    b. Apply the transfer function of every instruction, in order
//!    c. If any value flipped to divergent, re-queue the affected blocks
//!
//! # Convergence
//!
//! Each value can flip at most once, and a block is only re-queued after at
//! least one flip. The number of re-queue rounds is therefore bounded by the
//! number of values, whichever [`RequeueStrategy`] is used. Every transfer
//! function is monotone, so both strategies reach the same least fixed point.

use std::collections::VecDeque;

use log::{debug, trace};
use rayon::prelude::*;

use crate::{
    analysis::{deps::DependencyIndex, transfer::Transfer, DivergenceTable},
    config::{AnalysisConfig, RequeueStrategy},
    ir::{BlockId, Function, Shader},
    Error, Result,
};

/// Counters collected during one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisStats {
    /// Number of blocks taken off the worklist.
    pub block_visits: usize,
    /// Number of visits that changed a result and re-queued blocks.
    pub requeues: usize,
    /// Number of values that flipped to divergent.
    pub flips: usize,
}

/// Divergence analysis driver.
///
/// # Usage
///
/// ```rust
/// use lanescope::{
///     analysis::DivergenceAnalysis,
///     ir::{AluOp, FunctionBuilder, IntrinsicOp},
///     AnalysisConfig, RequeueStrategy,
/// };
///
/// let mut b = FunctionBuilder::new("main");
/// let id = b.intrinsic(IntrinsicOp::LoadLocalInvocationIndex, &[], 1);
/// let k = b.intrinsic(IntrinsicOp::LoadPushConstant, &[], 1);
/// let sum = b.alu(AluOp::Iadd, &[id, k]);
/// let func = b.finish()?;
///
/// let mut analysis = DivergenceAnalysis::new(AnalysisConfig {
///     requeue: RequeueStrategy::Dependents,
///     ..AnalysisConfig::default()
/// });
/// let table = analysis.run(&func)?;
///
/// assert!(table.is_divergent(sum));
/// assert!(table.is_uniform(k));
/// assert_eq!(analysis.stats().flips, 2);
/// # Ok::<(), lanescope::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DivergenceAnalysis {
    /// Configuration used for every run.
    config: AnalysisConfig,
    /// Counters of the last run.
    stats: AnalysisStats,
}

impl DivergenceAnalysis {
    /// Creates a driver with the given configuration.
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            stats: AnalysisStats::default(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Returns the counters of the last run.
    #[must_use]
    pub const fn stats(&self) -> AnalysisStats {
        self.stats
    }

    /// Classifies every value of `func`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedInstruction`] if the body still contains a
    /// call, and [`Error::UnexpectedCfShape`] if a merge sits where structured
    /// control flow cannot put one.
    pub fn run(&mut self, func: &Function) -> Result<DivergenceTable> {
        self.stats = AnalysisStats::default();

        let num_blocks = func.block_count();
        let mut table = DivergenceTable::new(func.value_count());
        let deps = match self.config.requeue {
            RequeueStrategy::AllBlocks => None,
            RequeueStrategy::Dependents => Some(DependencyIndex::build(func)),
        };
        let transfer = Transfer::new(func, &self.config);

        debug!(
            "divergence analysis of {}: {} blocks, {} values, requeue {}",
            func.name(),
            num_blocks,
            func.value_count(),
            self.config.requeue
        );

        let mut worklist: VecDeque<BlockId> = (0..num_blocks).map(BlockId::new).collect();
        let mut in_worklist = vec![true; num_blocks];
        let mut flipped = Vec::new();

        while let Some(block_id) = worklist.pop_front() {
            in_worklist[block_id.index()] = false;
            self.stats.block_visits += 1;

            let Some(block) = func.block(block_id) else {
                continue;
            };
            flipped.clear();
            for (index, instr) in block.instructions().iter().enumerate() {
                transfer.visit(&mut table, block_id, index, instr, &mut flipped)?;
            }
            if flipped.is_empty() {
                continue;
            }

            self.stats.flips += flipped.len();
            self.stats.requeues += 1;
            let before = worklist.len();
            let mut enqueue = |target: BlockId| {
                if !in_worklist[target.index()] {
                    in_worklist[target.index()] = true;
                    worklist.push_back(target);
                }
            };
            match &deps {
                None => (0..num_blocks).map(BlockId::new).for_each(&mut enqueue),
                Some(deps) => {
                    for &value in &flipped {
                        deps.readers(value).iter().copied().for_each(&mut enqueue);
                    }
                }
            }
            trace!(
                "{} flipped {} values, {} blocks re-queued",
                block_id,
                flipped.len(),
                worklist.len() - before
            );
        }

        debug!(
            "divergence analysis of {} done: {} of {} values divergent, {} visits, {} requeues",
            func.name(),
            table.divergent_count(),
            table.len(),
            self.stats.block_visits,
            self.stats.requeues
        );
        Ok(table)
    }
}

/// Classifies every value of `func` with the default configuration.
///
/// # Errors
///
/// See [`DivergenceAnalysis::run`].
pub fn try_analyze(func: &Function) -> Result<DivergenceTable> {
    DivergenceAnalysis::default().run(func)
}

/// Classifies every value of `func` with the default configuration.
///
/// # Panics
///
/// Panics with the diagnostic of [`try_analyze`] if `func` violates the
/// analysis contract (a call that was not inlined, or an impossible merge
/// position). Such input is a bug in an earlier pass, not a recoverable case.
///
/// # Examples
///
/// ```rust
/// use lanescope::{analysis::analyze, ir::{FunctionBuilder, IntrinsicOp}};
///
/// let mut b = FunctionBuilder::new("main");
/// let k = b.intrinsic(IntrinsicOp::LoadPushConstant, &[], 1);
/// let func = b.finish()?;
///
/// assert!(analyze(&func).is_uniform(k));
/// # Ok::<(), lanescope::Error>(())
/// ```
#[must_use]
pub fn analyze(func: &Function) -> DivergenceTable {
    match try_analyze(func) {
        Ok(table) => table,
        Err(error) => panic!("divergence analysis of {} failed: {error}", func.name()),
    }
}

/// Divergence results of every function of a shader.
#[derive(Debug, Clone)]
pub struct ShaderDivergence {
    /// One table per function, in shader order.
    tables: Vec<DivergenceTable>,
    /// Index of the entrypoint's table.
    entrypoint: usize,
}

impl ShaderDivergence {
    /// Returns the table of the entrypoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidEntrypoint`] if the shader had no such function.
    pub fn entrypoint(&self) -> Result<&DivergenceTable> {
        self.tables
            .get(self.entrypoint)
            .ok_or(Error::InvalidEntrypoint(self.entrypoint))
    }

    /// Returns the table of the function at `index`.
    #[must_use]
    pub fn table(&self, index: usize) -> Option<&DivergenceTable> {
        self.tables.get(index)
    }

    /// Returns all tables, in shader order.
    #[must_use]
    pub fn tables(&self) -> &[DivergenceTable] {
        &self.tables
    }
}

/// Analyzes every function of `shader` with the default configuration.
///
/// # Errors
///
/// See [`analyze_shader_with`].
pub fn analyze_shader(shader: &Shader) -> Result<ShaderDivergence> {
    analyze_shader_with(shader, &AnalysisConfig::default())
}

/// Analyzes every function of `shader` in parallel.
///
/// Function bodies are independent, so each gets its own driver and table.
///
/// # Errors
///
/// Returns [`Error::InvalidEntrypoint`] if the shader's entrypoint index names
/// no function, or the first error of [`DivergenceAnalysis::run`] in shader order.
pub fn analyze_shader_with(shader: &Shader, config: &AnalysisConfig) -> Result<ShaderDivergence> {
    shader.entrypoint()?;

    debug!(
        "analyzing shader {} ({} functions)",
        shader.name(),
        shader.functions().len()
    );
    let tables = shader
        .functions()
        .par_iter()
        .map(|func| DivergenceAnalysis::new(config.clone()).run(func))
        .collect::<Result<Vec<_>>>()?;

    Ok(ShaderDivergence {
        tables,
        entrypoint: shader.entrypoint_index(),
    })
}
