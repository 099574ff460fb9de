//! Configuration for the divergence analysis.
//!
//! This module provides the knobs that change how the fixed point is reached
//! and which memory model the load policies assume.

use strum::{Display, EnumIter, IntoStaticStr};

/// Which blocks are queued again after a block changed some result.
///
/// Both strategies reach the same fixed point; they differ only in how many
/// block visits it takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RequeueStrategy {
    /// Queue every block of the function again.
    #[default]
    AllBlocks,
    /// Queue only the blocks whose transfer functions read a value that flipped.
    Dependents,
}

/// Configuration for [`crate::analysis::DivergenceAnalysis`].
///
/// # Examples
///
/// ```rust
/// use lanescope::{AnalysisConfig, RequeueStrategy};
///
/// let config = AnalysisConfig {
///     requeue: RequeueStrategy::Dependents,
///     ..AnalysisConfig::default()
/// };
/// assert!(config.assume_race_free_memory);
/// ```
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Re-queue strategy after a change (default: [`RequeueStrategy::AllBlocks`]).
    pub requeue: RequeueStrategy,

    /// Treat memory loads from a uniform address as uniform (default: `true`).
    ///
    /// This holds only if no other invocation writes the loaded location
    /// concurrently. When `false`, loads are always divergent.
    pub assume_race_free_memory: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            requeue: RequeueStrategy::AllBlocks,
            assume_race_free_memory: true,
        }
    }
}
