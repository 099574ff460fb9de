//! # lanescope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and
//! functions. Import it to build functions and analyze them without naming every
//! module.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all lanescope operations
pub use crate::Error;

/// The result type used throughout lanescope
pub use crate::Result;

/// Analysis configuration
pub use crate::{AnalysisConfig, RequeueStrategy};

// ================================================================================================
// IR
// ================================================================================================

/// Function bodies, shaders and their construction
pub use crate::ir::{Function, FunctionBuilder, Shader};

/// Identifiers
pub use crate::ir::{BlockId, CfNodeId, ValueId};

/// Operation kinds
pub use crate::ir::{AluOp, AluSrc, IntrinsicOp, JumpKind, TexOp, TexSrc, TexSrcKind, VariableMode};

// ================================================================================================
// Analysis
// ================================================================================================

/// Entry points
pub use crate::analysis::{analyze, analyze_shader, try_analyze, DivergenceAnalysis};

/// Results
pub use crate::analysis::{AnalysisStats, DivergenceTable, ShaderDivergence, Uniformity};
