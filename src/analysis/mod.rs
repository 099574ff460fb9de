//! Divergence analysis for structured SSA shader IR.
//!
//! The analysis decides, for every SSA value of a function, whether it is
//! *uniform* (identical in every invocation of a parallel group) or *divergent*
//! (may differ between invocations). The answer is a sound over-approximation:
//! a value reported uniform is uniform, a value reported divergent may not be.
//!
//! # Architecture
//!
//! - [`Uniformity`] - The two-element lattice each value lives in
//! - [`DivergenceTable`] - One monotone bit per value
//! - [`DivergencePolicy`] - Static classification of intrinsics
//! - [`PhiShape`] - Gamma, mu and eta merges and their controlling conditions
//! - [`DivergenceAnalysis`] - The worklist driver
//!
//! # Usage
//!
//! ```rust
//! use lanescope::{analysis::analyze, ir::{FunctionBuilder, IntrinsicOp}};
//!
//! // if (invocation_id) { a = 1 } else { a = 2 }; x = phi(a, a)
//! let mut b = FunctionBuilder::new("main");
//! let cond = b.intrinsic(IntrinsicOp::LoadInvocationId, &[], 1);
//! b.begin_if(cond);
//! let one = b.load_const(1);
//! let then_end = b.current_block();
//! b.begin_else();
//! let two = b.load_const(2);
//! let else_end = b.current_block();
//! b.end_if();
//! let x = b.phi(1);
//! b.add_phi_source(x, then_end, one);
//! b.add_phi_source(x, else_end, two);
//! let func = b.finish()?;
//!
//! let table = analyze(&func);
//! assert!(table.is_divergent(cond));
//! assert!(table.is_uniform(one));
//! assert!(table.is_divergent(x));
//! # Ok::<(), lanescope::Error>(())
//! ```

mod deps;
mod lattice;
mod phi;
mod policy;
mod solver;
mod table;
mod transfer;

pub use lattice::{JoinSemiLattice, Uniformity};
pub use phi::PhiShape;
pub use policy::DivergencePolicy;
pub use solver::{
    analyze, analyze_shader, analyze_shader_with, try_analyze, AnalysisStats, DivergenceAnalysis,
    ShaderDivergence,
};
pub use table::{AnnotatedFunction, DivergenceTable};
