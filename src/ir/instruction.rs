//! IR instructions with explicit def/use information.
//!
//! [`Instruction`] is a closed enumeration over every instruction kind the
//! analysis understands. Each variant carries a kind-specific payload with its
//! operands and, if it produces one, its result value.
//!
//! # Instruction Kinds
//!
//! | Variant | Result | Operands |
//! |---------|--------|----------|
//! | [`Instruction::Alu`] | one value | swizzled sources |
//! | [`Instruction::Intrinsic`] | zero or one value | plain sources |
//! | [`Instruction::Tex`] | one value | role-tagged sources |
//! | [`Instruction::Phi`] | one value | (predecessor, value) pairs |
//! | [`Instruction::ParallelCopy`] | one value per entry | one source per entry |
//! | [`Instruction::LoadConst`] | one value | none |
//! | [`Instruction::Undef`] | one value | none |
//! | [`Instruction::Deref`] | one value | parent deref and array index |
//! | [`Instruction::Jump`] | none | none |
//! | [`Instruction::Call`] | none | arguments |
//!
//! # Thread Safety
//!
//! All types in this module are `Send` and `Sync`.

use std::fmt;

use bitflags::bitflags;
use strum::IntoStaticStr;

use crate::ir::{AluOp, IntrinsicOp, JumpKind, PhiNode, TexOp, TexSrcKind, ValueId, VariableMode};

bitflags! {
    /// The ways a value is read.
    ///
    /// Each use of a value has exactly one kind; the function keeps the union of
    /// all kinds per value so policies such as "used only as a texture
    /// coordinate" are a single comparison.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct UseKinds: u16 {
        /// Source of an ALU instruction
        const ALU = 1;
        /// Source of an intrinsic
        const INTRINSIC = 1 << 1;
        /// Coordinate source of a texture instruction
        const TEX_COORD = 1 << 2;
        /// Any other texture source
        const TEX_OTHER = 1 << 3;
        /// Incoming value of a phi
        const PHI = 1 << 4;
        /// Source of a parallel copy entry
        const PARALLEL_COPY = 1 << 5;
        /// Parent or index of a deref
        const DEREF = 1 << 6;
        /// Call argument
        const CALL = 1 << 7;
        /// Condition of an `if`
        const IF_CONDITION = 1 << 8;
    }
}

/// A source operand of an ALU instruction.
///
/// The swizzle maps each component read by the instruction to a component of
/// the source value; `swizzle[0]` is the component read for a single-component
/// access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AluSrc {
    /// The value being read.
    pub value: ValueId,
    /// Component selection.
    pub swizzle: [u8; 4],
}

impl AluSrc {
    /// Reads `value` with the identity swizzle.
    #[must_use]
    pub const fn new(value: ValueId) -> Self {
        Self {
            value,
            swizzle: [0, 1, 2, 3],
        }
    }

    /// Reads `value` with an explicit swizzle.
    #[must_use]
    pub const fn swizzled(value: ValueId, swizzle: [u8; 4]) -> Self {
        Self { value, swizzle }
    }

    /// Reads a single component of `value` (broadcast to every lane of the swizzle).
    #[must_use]
    pub const fn component(value: ValueId, component: u8) -> Self {
        Self {
            value,
            swizzle: [component; 4],
        }
    }
}

impl From<ValueId> for AluSrc {
    fn from(value: ValueId) -> Self {
        Self::new(value)
    }
}

/// An ALU instruction: `dest = op(srcs...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AluInstr {
    /// The opcode.
    pub op: AluOp,
    /// The result value.
    pub dest: ValueId,
    /// Sources in opcode order.
    pub srcs: Vec<AluSrc>,
}

/// An intrinsic call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrinsicInstr {
    /// The intrinsic.
    pub op: IntrinsicOp,
    /// The result value, if the intrinsic has one.
    pub dest: Option<ValueId>,
    /// Sources in intrinsic order.
    pub srcs: Vec<ValueId>,
}

/// A texture source tagged with its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TexSrc {
    /// What the source means to the texture unit.
    pub kind: TexSrcKind,
    /// The value being read.
    pub value: ValueId,
}

impl TexSrc {
    /// Creates a texture source.
    #[must_use]
    pub const fn new(kind: TexSrcKind, value: ValueId) -> Self {
        Self { kind, value }
    }
}

/// A texture instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TexInstr {
    /// The texture opcode.
    pub op: TexOp,
    /// The result value.
    pub dest: ValueId,
    /// Sources with their roles.
    pub srcs: Vec<TexSrc>,
}

/// One `dest = src` assignment of a parallel copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CopyEntry {
    /// The value defined by this entry.
    pub dest: ValueId,
    /// The value copied.
    pub src: ValueId,
}

/// A simultaneous multi-assignment; all sources are read before any
/// destination is written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParallelCopy {
    /// The assignments.
    pub entries: Vec<CopyEntry>,
}

/// A constant load. Each component is stored as raw bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadConst {
    /// The result value.
    pub dest: ValueId,
    /// Raw bits per component.
    pub bits: Vec<u64>,
}

/// How a deref derives its memory location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerefKind {
    /// The root: a named variable.
    Var {
        /// The variable name.
        name: String,
    },
    /// An element of an array deref.
    Array {
        /// The array being indexed.
        parent: ValueId,
        /// The element index.
        index: ValueId,
    },
    /// A member of a struct deref.
    Struct {
        /// The struct being accessed.
        parent: ValueId,
        /// Member index.
        field: u32,
    },
}

/// A pointer / memory-location computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerefInstr {
    /// The resulting location value.
    pub dest: ValueId,
    /// Storage class of the location.
    pub mode: VariableMode,
    /// How the location is derived.
    pub kind: DerefKind,
}

impl DerefInstr {
    /// Returns the parent deref, if this is not a variable root.
    #[must_use]
    pub const fn parent(&self) -> Option<ValueId> {
        match &self.kind {
            DerefKind::Var { .. } => None,
            DerefKind::Array { parent, .. } | DerefKind::Struct { parent, .. } => Some(*parent),
        }
    }

    /// Returns the array index, if this is an array deref.
    #[must_use]
    pub const fn index(&self) -> Option<ValueId> {
        match &self.kind {
            DerefKind::Array { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// A function call. Calls are expected to be inlined before divergence analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInstr {
    /// Name of the called function.
    pub callee: String,
    /// Argument values.
    pub args: Vec<ValueId>,
}

/// An IR instruction.
///
/// # Examples
///
/// ```rust
/// use lanescope::ir::{AluInstr, AluOp, AluSrc, Instruction, ValueId};
///
/// let add = Instruction::Alu(AluInstr {
///     op: AluOp::Iadd,
///     dest: ValueId::new(2),
///     srcs: vec![AluSrc::new(ValueId::new(0)), AluSrc::new(ValueId::new(1))],
/// });
/// assert_eq!(add.defs(), vec![ValueId::new(2)]);
/// assert_eq!(add.uses().len(), 2);
/// assert_eq!(add.kind_name(), "alu");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Instruction {
    /// Arithmetic / logic operation
    Alu(AluInstr),
    /// Intrinsic call
    Intrinsic(IntrinsicInstr),
    /// Texture sample or query
    Tex(TexInstr),
    /// Merge instruction
    Phi(PhiNode),
    /// Simultaneous multi-assignment
    ParallelCopy(ParallelCopy),
    /// Constant load
    LoadConst(LoadConst),
    /// Undefined-value placeholder
    Undef(ValueId),
    /// Memory-location computation
    Deref(DerefInstr),
    /// Structured jump
    Jump(JumpKind),
    /// Function call
    Call(CallInstr),
}

impl Instruction {
    /// Returns the lower snake case name of the instruction kind.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        self.into()
    }

    /// Returns the values defined by this instruction, in definition order.
    #[must_use]
    pub fn defs(&self) -> Vec<ValueId> {
        match self {
            Self::Alu(alu) => vec![alu.dest],
            Self::Intrinsic(intr) => intr.dest.into_iter().collect(),
            Self::Tex(tex) => vec![tex.dest],
            Self::Phi(phi) => vec![phi.dest()],
            Self::ParallelCopy(copy) => copy.entries.iter().map(|e| e.dest).collect(),
            Self::LoadConst(load) => vec![load.dest],
            Self::Undef(dest) => vec![*dest],
            Self::Deref(deref) => vec![deref.dest],
            Self::Jump(_) | Self::Call(_) => Vec::new(),
        }
    }

    /// Returns every value read by this instruction together with the kind of use.
    #[must_use]
    pub fn uses(&self) -> Vec<(ValueId, UseKinds)> {
        match self {
            Self::Alu(alu) => alu.srcs.iter().map(|s| (s.value, UseKinds::ALU)).collect(),
            Self::Intrinsic(intr) => intr
                .srcs
                .iter()
                .map(|&v| (v, UseKinds::INTRINSIC))
                .collect(),
            Self::Tex(tex) => tex
                .srcs
                .iter()
                .map(|s| {
                    let kind = if s.kind == TexSrcKind::Coord {
                        UseKinds::TEX_COORD
                    } else {
                        UseKinds::TEX_OTHER
                    };
                    (s.value, kind)
                })
                .collect(),
            Self::Phi(phi) => phi.used_values().map(|v| (v, UseKinds::PHI)).collect(),
            Self::ParallelCopy(copy) => copy
                .entries
                .iter()
                .map(|e| (e.src, UseKinds::PARALLEL_COPY))
                .collect(),
            Self::Deref(deref) => deref
                .parent()
                .into_iter()
                .chain(deref.index())
                .map(|v| (v, UseKinds::DEREF))
                .collect(),
            Self::Call(call) => call.args.iter().map(|&v| (v, UseKinds::CALL)).collect(),
            Self::LoadConst(_) | Self::Undef(_) | Self::Jump(_) => Vec::new(),
        }
    }

    /// Returns the phi node if this is a merge instruction.
    #[must_use]
    pub const fn as_phi(&self) -> Option<&PhiNode> {
        match self {
            Self::Phi(phi) => Some(phi),
            _ => None,
        }
    }

    /// Returns `true` for the undefined-value placeholder.
    #[must_use]
    pub const fn is_undef(&self) -> bool {
        matches!(self, Self::Undef(_))
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for AluSrc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [char; 4] = ['x', 'y', 'z', 'w'];
        write!(f, "{}", self.value)?;
        if self.swizzle != [0, 1, 2, 3] {
            write!(f, ".")?;
            for &c in &self.swizzle {
                write!(f, "{}", NAMES[usize::from(c & 3)])?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for TexSrc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.value, self.kind)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alu(alu) => {
                write!(f, "{} = {} ", alu.dest, alu.op)?;
                write_list(f, &alu.srcs)
            }
            Self::Intrinsic(intr) => {
                if let Some(dest) = intr.dest {
                    write!(f, "{dest} = ")?;
                }
                write!(f, "@{} (", intr.op)?;
                write_list(f, &intr.srcs)?;
                write!(f, ")")
            }
            Self::Tex(tex) => {
                write!(f, "{} = {} ", tex.dest, tex.op)?;
                write_list(f, &tex.srcs)
            }
            Self::Phi(phi) => write!(f, "{phi}"),
            Self::ParallelCopy(copy) => {
                write!(f, "parallel_copy ")?;
                for (i, entry) in copy.entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", entry.dest, entry.src)?;
                }
                Ok(())
            }
            Self::LoadConst(load) => {
                write!(f, "{} = load_const (", load.dest)?;
                for (i, bits) in load.bits.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "0x{bits:x}")?;
                }
                write!(f, ")")
            }
            Self::Undef(dest) => write!(f, "{dest} = undefined"),
            Self::Deref(deref) => {
                write!(f, "{} = deref_", deref.dest)?;
                match &deref.kind {
                    DerefKind::Var { name } => write!(f, "var &{name}")?,
                    DerefKind::Array { parent, index } => write!(f, "array &{parent}[{index}]")?,
                    DerefKind::Struct { parent, field } => write!(f, "struct &{parent}->{field}")?,
                }
                write!(f, " ({})", deref.mode)
            }
            Self::Jump(kind) => write!(f, "{kind}"),
            Self::Call(call) => {
                write!(f, "call {} (", call.callee)?;
                write_list(f, &call.args)?;
                write!(f, ")")
            }
        }
    }
}
