// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # lanescope
//!
//! Divergence analysis for structured SSA shader IR.
//!
//! GPUs run a shader for many invocations at once, in lock-step groups of lanes.
//! A value that is the same in every lane of a group is *uniform* and can live
//! in a scalar register; a branch on a uniform condition needs no lane masking.
//! `lanescope` computes, for every SSA value of a function, whether it is
//! uniform or *divergent*.
//!
//! ## Features
//!
//! - **Structured IR** - Arena-indexed values, blocks, `if`s and `loop`s, built with validation
//! - **Fixed-point analysis** - Monotone worklist driver with a bounded number of rounds
//! - **Merge classification** - Branch merges, loop headers and loop exits are told apart
//! - **Static policies** - Per-intrinsic divergence policies, texture and memory rules
//! - **Parallel shaders** - Independent function bodies analyzed on the rayon pool
//!
//! ## Quick Start
//!
//! ```rust
//! use lanescope::prelude::*;
//!
//! let mut b = FunctionBuilder::new("main");
//! let index = b.intrinsic(IntrinsicOp::LoadLocalInvocationIndex, &[], 1);
//! let base = b.intrinsic(IntrinsicOp::LoadPushConstant, &[], 1);
//! let addr = b.alu(AluOp::Iadd, &[base, index]);
//! let data = b.intrinsic(IntrinsicOp::LoadSsbo, &[base, base], 1);
//! let func = b.finish()?;
//!
//! let table = analyze(&func);
//! assert!(table.is_uniform(base));
//! assert!(table.is_divergent(addr));
//! assert!(table.is_uniform(data));
//!
//! println!("{}", func.display_with(&table));
//! # Ok::<(), lanescope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`ir`] - The structured SSA representation and its builder
//! - [`analysis`] - Lattice, result table, transfer functions and driver
//! - [`AnalysisConfig`] - Re-queue strategy and memory model
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! Building IR reports [`Error::Malformed`] for broken SSA. The analysis itself is
//! total over valid input; [`analysis::try_analyze`] reports contract violations
//! (calls that were not inlined, impossible merge positions) and
//! [`analysis::analyze`] panics on them.
//!
//! ```rust
//! use lanescope::{analysis::try_analyze, ir::FunctionBuilder, Error};
//!
//! let mut b = FunctionBuilder::new("main");
//! b.call("helper", &[]);
//! let func = b.finish()?;
//!
//! match try_analyze(&func) {
//!     Err(Error::UnsupportedInstruction { kind, .. }) => assert_eq!(kind, "call"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! # Ok::<(), lanescope::Error>(())
//! ```

#[macro_use]
pub(crate) mod error;
pub(crate) mod utils;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
pub mod prelude;

pub mod analysis;
mod config;
pub mod ir;

/// `lanescope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

pub use config::{AnalysisConfig, RequeueStrategy};
pub use error::Error;
