//! Static divergence policies of intrinsics.

use strum::{Display, IntoStaticStr};

use crate::ir::IntrinsicOp;

/// How an intrinsic's result relates to its sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum DivergencePolicy {
    /// Identical across the group whatever the sources are.
    AlwaysUniform,
    /// Uniform when every source is uniform. Memory loads fall here under the
    /// assumption that no other invocation races on the loaded location.
    UniformIfSourcesUniform,
    /// May differ per invocation whatever the sources are.
    AlwaysDivergent,
}

impl IntrinsicOp {
    /// Returns the divergence policy of this intrinsic.
    ///
    /// Intrinsics without a result report [`DivergencePolicy::AlwaysDivergent`];
    /// the analysis never consults them.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lanescope::{analysis::DivergencePolicy, ir::IntrinsicOp};
    ///
    /// assert_eq!(IntrinsicOp::Ballot.divergence_policy(), DivergencePolicy::AlwaysUniform);
    /// assert_eq!(IntrinsicOp::LoadUbo.divergence_policy(), DivergencePolicy::UniformIfSourcesUniform);
    /// assert_eq!(IntrinsicOp::LoadInvocationId.divergence_policy(), DivergencePolicy::AlwaysDivergent);
    /// ```
    #[must_use]
    pub const fn divergence_policy(self) -> DivergencePolicy {
        match self {
            Self::ShaderClock
            | Self::Ballot
            | Self::ReadInvocation
            | Self::ReadFirstInvocation
            | Self::VoteAny
            | Self::VoteAll
            | Self::VoteFeq
            | Self::VoteIeq
            | Self::Reduce
            | Self::LoadPushConstant
            | Self::LoadSubgroupSize
            | Self::LoadNumSubgroups
            | Self::LoadLocalGroupSize
            | Self::LoadWorkGroupId
            | Self::LoadNumWorkGroups
            | Self::GetBufferSize
            | Self::VulkanResourceIndex => DivergencePolicy::AlwaysUniform,

            // LoadDeref additionally requires a shared-memory deref chain.
            Self::LoadUbo
            | Self::LoadSsbo
            | Self::LoadShared
            | Self::LoadGlobal
            | Self::LoadUniform
            | Self::ImageLoad
            | Self::LoadDeref => DivergencePolicy::UniformIfSourcesUniform,

            Self::LoadInvocationId
            | Self::LoadLocalInvocationId
            | Self::LoadLocalInvocationIndex
            | Self::LoadGlobalInvocationId
            | Self::LoadSubgroupInvocation
            | Self::LoadInterpolatedInput
            | Self::LoadBarycentricPixel
            | Self::LoadFrontFace
            | Self::LoadSampleId
            | Self::LoadInput
            | Self::SsboAtomicAdd
            | Self::SharedAtomicAdd
            | Self::DerefAtomicAdd
            | Self::ImageAtomicAdd
            | Self::StoreSsbo
            | Self::StoreShared
            | Self::StoreDeref
            | Self::StoreOutput
            | Self::Barrier
            | Self::DiscardIf => DivergencePolicy::AlwaysDivergent,
        }
    }
}
