//! Structured SSA intermediate representation of shader functions.
//!
//! The IR models what a divergence analysis needs to see: SSA values with a
//! component count, instructions with explicit def/use lists, basic blocks, and a
//! structured control flow tree of blocks, `if`s and `loop`s. There is no
//! arbitrary branch; every merge point is the block following an `if`, the
//! header of a loop, or the block following a loop.
//!
//! # Key Components
//!
//! - [`Function`] - Arena owning values, blocks and the control flow tree
//! - [`FunctionBuilder`] - Incremental construction with validation at the end
//! - [`Instruction`] - Closed set of instruction kinds
//! - [`PhiNode`] - Merge instruction at the start of a block
//! - [`CfNode`] - Block, `if` or `loop` node of the control flow tree
//! - [`Shader`] - A set of functions with one entrypoint
//!
//! # Usage Example
//!
//! ```rust
//! use lanescope::ir::{AluOp, FunctionBuilder, IntrinsicOp, JumpKind};
//!
//! // i = 0; loop { if (i >= n) break; i = i + 1 }
//! let mut b = FunctionBuilder::new("count");
//! let n = b.intrinsic(IntrinsicOp::LoadPushConstant, &[], 1);
//! let zero = b.load_const(0);
//! let preheader = b.current_block();
//! b.begin_loop();
//! let i = b.phi(1);
//! b.add_phi_source(i, preheader, zero);
//! let done = b.alu(AluOp::Ige, &[i, n]);
//! b.begin_if(done);
//! b.jump(JumpKind::Break);
//! b.end_if();
//! let one = b.load_const(1);
//! let next = b.alu(AluOp::Iadd, &[i, one]);
//! b.add_phi_source(i, b.current_block(), next);
//! b.end_loop();
//! let func = b.finish()?;
//!
//! println!("{func}");
//! # Ok::<(), lanescope::Error>(())
//! ```

mod block;
mod builder;
mod cf;
mod function;
mod instruction;
mod ops;
mod phi;
mod value;

pub use block::{Block, BlockId};
pub use builder::FunctionBuilder;
pub use cf::{CfEntry, CfKind, CfNode, CfNodeId, IfNode, LoopNode};
pub use function::{Function, Shader, UseSite};
pub use instruction::{
    AluInstr, AluSrc, CallInstr, CopyEntry, DerefInstr, DerefKind, Instruction, IntrinsicInstr,
    LoadConst, ParallelCopy, TexInstr, TexSrc, UseKinds,
};
pub use ops::{AluOp, IntrinsicOp, JumpKind, TexOp, TexSrcKind, VariableMode};
pub use phi::{PhiNode, PhiSource};
pub use value::{DefSite, Value, ValueId};
