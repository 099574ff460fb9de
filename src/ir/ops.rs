//! Operation kinds carried by IR instructions.
//!
//! Each enum here is closed: adding a variant forces every exhaustive `match` in
//! the analysis to be revisited at build time. Textual names come from `strum`
//! and follow the usual lower snake case spelling of shader IR dumps.
//!
//! # Operation Categories
//!
//! - [`AluOp`] - Arithmetic, logic, comparison, conversion and vector assembly
//! - [`IntrinsicOp`] - System value reads, subgroup operations, memory access
//! - [`TexOp`] and [`TexSrcKind`] - Texture instructions and their source roles
//! - [`VariableMode`] - Storage class of a memory location
//! - [`JumpKind`] - Structured control transfers

use strum::{Display, EnumIter, IntoStaticStr};

/// An ALU opcode.
///
/// Sources of an ALU instruction are either *per-component* (they are read with
/// as many components as the destination has) or *fixed size* (vector assembly
/// and dot products). [`AluOp::input_size`] reports the fixed size, or `0` for
/// per-component sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum AluOp {
    /// Component-wise copy
    Mov,
    /// Float addition
    Fadd,
    /// Float multiplication
    Fmul,
    /// Float negation
    Fneg,
    /// Float absolute value
    Fabs,
    /// Float minimum
    Fmin,
    /// Float maximum
    Fmax,
    /// Float less-than
    Flt,
    /// Float greater-or-equal
    Fge,
    /// Float equality
    Feq,
    /// Float inequality (unordered)
    Fneu,
    /// Integer addition
    Iadd,
    /// Integer subtraction
    Isub,
    /// Integer multiplication
    Imul,
    /// Integer negation
    Ineg,
    /// Bitwise and
    Iand,
    /// Bitwise or
    Ior,
    /// Bitwise xor
    Ixor,
    /// Bitwise not
    Inot,
    /// Shift left
    Ishl,
    /// Arithmetic shift right
    Ishr,
    /// Logical shift right
    Ushr,
    /// Integer equality
    Ieq,
    /// Integer inequality
    Ine,
    /// Signed less-than
    Ilt,
    /// Signed greater-or-equal
    Ige,
    /// Unsigned less-than
    Ult,
    /// Unsigned greater-or-equal
    Uge,
    /// Boolean select: `src0 ? src1 : src2`
    Bcsel,
    /// Signed integer to float
    I2f,
    /// Float to signed integer
    F2i,
    /// Unsigned integer to float
    U2f,
    /// Float to unsigned integer
    F2u,
    /// Boolean to integer
    B2i,
    /// Assemble a 2-component vector from scalars
    Vec2,
    /// Assemble a 3-component vector from scalars
    Vec3,
    /// Assemble a 4-component vector from scalars
    Vec4,
    /// 2-component dot product
    Fdot2,
    /// 3-component dot product
    Fdot3,
    /// 4-component dot product
    Fdot4,
}

impl AluOp {
    /// Returns the number of sources this opcode reads.
    #[must_use]
    pub const fn num_inputs(self) -> usize {
        match self {
            Self::Mov
            | Self::Fneg
            | Self::Fabs
            | Self::Ineg
            | Self::Inot
            | Self::I2f
            | Self::F2i
            | Self::U2f
            | Self::F2u
            | Self::B2i => 1,
            Self::Bcsel | Self::Vec3 => 3,
            Self::Vec4 => 4,
            _ => 2,
        }
    }

    /// Returns the fixed component count of source `index`, or `0` when the
    /// source is read per-component.
    #[must_use]
    pub const fn input_size(self, _index: usize) -> u8 {
        match self {
            Self::Vec2 | Self::Vec3 | Self::Vec4 => 1,
            Self::Fdot2 => 2,
            Self::Fdot3 => 3,
            Self::Fdot4 => 4,
            _ => 0,
        }
    }

    /// Returns the fixed destination component count, or `0` when the
    /// destination size follows the instruction.
    #[must_use]
    pub const fn output_size(self) -> u8 {
        match self {
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
            Self::Fdot2 | Self::Fdot3 | Self::Fdot4 => 1,
            _ => 0,
        }
    }

    /// Returns `true` for the opcodes that assemble a vector from scalar sources.
    #[must_use]
    pub const fn is_vec(self) -> bool {
        matches!(self, Self::Vec2 | Self::Vec3 | Self::Vec4)
    }
}

/// An intrinsic (system value read, subgroup operation, memory access, barrier).
///
/// Whether an intrinsic produces a value is a property of the opcode, see
/// [`IntrinsicOp::has_dest`]. How its result diverges is declared by
/// `IntrinsicOp::divergence_policy` in the analysis module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum IntrinsicOp {
    // Group-wide queries
    /// Read the shader clock
    ShaderClock,
    /// Ballot of a boolean across the subgroup
    Ballot,
    /// Read a value from a given invocation
    ReadInvocation,
    /// Read a value from the first active invocation
    ReadFirstInvocation,
    /// True if any invocation votes true
    VoteAny,
    /// True if all invocations vote true
    VoteAll,
    /// Float equality vote
    VoteFeq,
    /// Integer equality vote
    VoteIeq,
    /// Subgroup reduction
    Reduce,

    // Invocation-invariant constants
    /// Push constant read
    LoadPushConstant,
    /// Subgroup size
    LoadSubgroupSize,
    /// Number of subgroups in the workgroup
    LoadNumSubgroups,
    /// Workgroup dimensions
    LoadLocalGroupSize,

    // Workgroup identity
    /// Workgroup id
    LoadWorkGroupId,
    /// Number of workgroups
    LoadNumWorkGroups,

    // Buffer and resource queries
    /// Size of a storage buffer
    GetBufferSize,
    /// Descriptor index computation
    VulkanResourceIndex,

    // Address-dependent loads
    /// Uniform buffer load
    LoadUbo,
    /// Storage buffer load
    LoadSsbo,
    /// Shared memory load
    LoadShared,
    /// Global memory load
    LoadGlobal,
    /// Default uniform block load
    LoadUniform,
    /// Storage image load
    ImageLoad,

    // Per-invocation values
    /// Generic load through a deref chain
    LoadDeref,
    /// Invocation id (per-primitive stages)
    LoadInvocationId,
    /// Local invocation id
    LoadLocalInvocationId,
    /// Flat local invocation index
    LoadLocalInvocationIndex,
    /// Global invocation id
    LoadGlobalInvocationId,
    /// Invocation index inside the subgroup
    LoadSubgroupInvocation,
    /// Interpolated fragment input
    LoadInterpolatedInput,
    /// Pixel-center barycentrics
    LoadBarycentricPixel,
    /// Front facing flag
    LoadFrontFace,
    /// Sample id
    LoadSampleId,
    /// Non-interpolated stage input
    LoadInput,

    // Atomics
    /// Storage buffer atomic add
    SsboAtomicAdd,
    /// Shared memory atomic add
    SharedAtomicAdd,
    /// Atomic add through a deref chain
    DerefAtomicAdd,
    /// Storage image atomic add
    ImageAtomicAdd,

    // Side effects only
    /// Storage buffer store
    StoreSsbo,
    /// Shared memory store
    StoreShared,
    /// Store through a deref chain
    StoreDeref,
    /// Stage output store
    StoreOutput,
    /// Control barrier
    Barrier,
    /// Conditional fragment discard
    DiscardIf,
}

impl IntrinsicOp {
    /// Returns `true` if the intrinsic defines a value.
    #[must_use]
    pub const fn has_dest(self) -> bool {
        !matches!(
            self,
            Self::StoreSsbo
                | Self::StoreShared
                | Self::StoreDeref
                | Self::StoreOutput
                | Self::Barrier
                | Self::DiscardIf
        )
    }
}

/// Texture opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TexOp {
    /// Implicit-lod sample
    Tex,
    /// Sample with lod bias
    Txb,
    /// Sample with explicit lod
    Txl,
    /// Sample with explicit derivatives
    Txd,
    /// Texel fetch
    Txf,
    /// Size query
    Txs,
    /// Lod query
    Lod,
    /// Gather
    Tg4,
}

/// The role a source plays in a texture instruction.
///
/// Only [`TexSrcKind::Coord`] influences the divergence of the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TexSrcKind {
    /// Texture coordinate
    Coord,
    /// Projective divisor
    Projector,
    /// Shadow comparator
    Comparator,
    /// Texel offset
    Offset,
    /// Lod bias
    Bias,
    /// Explicit lod
    Lod,
    /// Minimum lod clamp
    MinLod,
    /// Multisample index
    MsIndex,
    /// X derivative
    Ddx,
    /// Y derivative
    Ddy,
    /// Texture deref
    TextureDeref,
    /// Sampler deref
    SamplerDeref,
    /// Texture array offset
    TextureOffset,
    /// Sampler array offset
    SamplerOffset,
}

/// Storage class of a variable or memory location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum VariableMode {
    /// Function-local temporaries
    Function,
    /// Workgroup-shared memory
    Shared,
    /// Storage buffer memory
    Ssbo,
    /// Uniform buffer memory
    Ubo,
    /// Push constants
    PushConst,
    /// Stage inputs
    Input,
    /// Stage outputs
    Output,
    /// Global memory
    Global,
}

/// Structured control transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum JumpKind {
    /// Leave the innermost loop
    Break,
    /// Jump to the header of the innermost loop
    Continue,
    /// Leave the function
    Return,
}
