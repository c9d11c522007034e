//! Static per-opcode descriptors, i.e. everything generic passes need to know
//! about an opcode, without having to special-case it.
//!
//! The table is built once (lazily), with exactly one [`InstDesc`] per
//! [`Opcode`], and never changes afterwards. Target-specific behavior is not
//! baked into it, but layered on top by the queries on
//! [`InstDef`](crate::InstDef), which all take a [`Target`].

use crate::{ChanMask, Opcode, OpcodeFamily, Target, TargetFeatures};
use bitflags::bitflags;
use lazy_static::lazy_static;

/// Fixed argument layout of memory loads and stores.
pub mod mem_args {
    /// Base address.
    pub const BASE: usize = 0;
    /// Offset from the base address (scaled by the access size).
    pub const OFFSET: usize = 1;
    /// Loads only: range limit, for range-checked loads.
    pub const RANGE: usize = 2;
    /// Loads only: dependent-read counter to signal on completion.
    pub const DRC: usize = 3;
    /// Stores only: data to store.
    pub const DATA: usize = 2;

    pub const LOAD_COUNT: usize = 4;
    pub const STORE_COUNT: usize = 3;
}

/// Fixed argument layout of texture sample instructions.
pub mod smp_args {
    use std::ops::Range;

    /// One scalar argument per coordinate component (see
    /// [`SmpParams::coord_count`](crate::params::SmpParams::coord_count)).
    pub const COORDS: Range<usize> = 0..4;
    /// Texture state words (only the first `Target::texture_state_words`
    /// are used, the rest must be `RegBank::Unused`).
    pub const STATE: Range<usize> = 4..8;
    /// LOD bias or replacement LOD, if any.
    pub const LOD: usize = 8;
    /// `smpgrad` only: two gradients per coordinate component.
    pub const GRADS: Range<usize> = 9..15;
    /// `smpreplace` only: the value being (partially) replaced, which must
    /// be allocated to the same register as the destination.
    pub const REPLACE: usize = 15;

    pub const COUNT: usize = 16;
}

bitflags! {
    /// Capability flags of an opcode.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct DescFlags: u32 {
        /// Can be repeated (see also `REPEAT_MASK`/`REPEAT_MASK_ONLY`).
        const REPEAT = 1 << 0;
        /// Repeats can be controlled with a per-repeat mask.
        const REPEAT_MASK = 1 << 1;
        /// Repeats can *only* be expressed as a mask (the repeat count is
        /// implied by the highest set bit of the mask).
        const REPEAT_MASK_ONLY = 1 << 2;
        const END_FLAG = 1 << 3;
        const SYNC_START = 1 << 4;
        const NO_SCHED = 1 << 5;
        /// The destination write mask can exclude some channels.
        const DEST_MASKABLE = 1 << 6;
        /// Has a variant that also tests its result (and writes a predicate).
        const TEST_VARIANT = 1 << 7;
        const VECTOR = 1 << 8;
        const MEM_LOAD = 1 << 9;
        const MEM_STORE = 1 << 10;
        const TEXTURE_SAMPLE = 1 << 11;
        /// Sources can be individually selected as F16 or F32.
        const F16F32_SELECT = 1 << 12;
        /// Has effects beyond writing its destinations (so its sources are
        /// always live).
        const SIDE_EFFECTS = 1 << 13;
        /// The hardware may deschedule the instance after this instruction.
        const DESCHEDULE = 1 << 14;
        /// Supports MOE increments encoded in the instruction itself.
        const MOE_INCREMENTS = 1 << 15;
        /// Sources can be immediates.
        const IMMEDIATE_SRC = 1 << 16;
        /// Operands can be dynamically indexed.
        const DYNAMIC_INDEX = 1 << 17;
    }
}

/// Which predicates an instruction can be executed under.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PredicateSupport {
    None,
    /// Only `p0`, possibly negated.
    ShortRange,
    /// Any predicate register, possibly negated.
    ExtendedRange,
    /// Like `ShortRange`, but allowing one predicate per vector channel.
    VectorShort,
    /// Like `ExtendedRange`, but allowing one predicate per vector channel.
    VectorExtended,
    /// Not supported by the instruction itself, but might end up predicated
    /// anyway, by a later expansion (USP) pass, after scheduling/allocation.
    ///
    /// Passes that run before that expansion must assume predication may
    /// still be introduced.
    UspOnly,
}

impl PredicateSupport {
    /// Highest usable predicate register, or `None` if predicates are rejected.
    pub fn max_pred_reg(self) -> Option<u32> {
        match self {
            Self::None => None,
            Self::ShortRange | Self::VectorShort => Some(0),
            Self::ExtendedRange | Self::VectorExtended | Self::UspOnly => Some(3),
        }
    }

    pub fn per_chan(self) -> bool {
        matches!(self, Self::VectorShort | Self::VectorExtended)
    }
}

/// Smallest unit a destination write mask can select.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MaskGranularity {
    /// All channels are always written.
    Whole,
    /// Either 16-bit half (`xy` or `zw`) can be written on its own.
    Halves,
    /// Every channel can be written on its own.
    Channels,
}

impl MaskGranularity {
    /// Widen `mask` to the smallest mask this granularity can express.
    pub fn expand(self, mask: ChanMask) -> ChanMask {
        match self {
            Self::Whole if mask.is_empty() => ChanMask::NONE,
            Self::Whole => ChanMask::ALL,
            Self::Halves => {
                let mut expanded = ChanMask::NONE;
                for half in [ChanMask::XY, ChanMask::ZW] {
                    if mask.intersects(half) {
                        expanded |= half;
                    }
                }
                expanded
            }
            Self::Channels => mask,
        }
    }
}

/// Hardware register number alignment requirement.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HwRegAlign {
    None,
    Even,
    Odd,
}

impl HwRegAlign {
    pub fn allows(self, reg_number: u32) -> bool {
        match self {
            Self::None => true,
            Self::Even => reg_number % 2 == 0,
            Self::Odd => reg_number % 2 == 1,
        }
    }
}

/// How one MOE source slot (of the hardware encoding) maps to arguments.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MoeOperand {
    /// A range of arguments, which must be in consecutive registers.
    Args { first: u8, count: u8, align: HwRegAlign },

    /// A single argument, which is encoded as (and must be allocated to the
    /// same register as) destination `dest`.
    AliasOfDest { arg: u8, dest: u8 },
}

impl MoeOperand {
    const fn arg(first: u8) -> Self {
        Self::Args { first, count: 1, align: HwRegAlign::None }
    }

    const fn even_arg(first: u8) -> Self {
        Self::Args { first, count: 1, align: HwRegAlign::Even }
    }

    const fn args(first: u8, count: u8) -> Self {
        Self::Args { first, count, align: HwRegAlign::None }
    }

    /// The arguments this MOE slot maps to, as a `start..end` pair.
    pub fn arg_range(self) -> std::ops::Range<usize> {
        match self {
            Self::Args { first, count, .. } => usize::from(first)..usize::from(first + count),
            Self::AliasOfDest { arg, .. } => usize::from(arg)..usize::from(arg) + 1,
        }
    }
}

/// Static description of one opcode.
#[derive(Clone, Debug)]
pub struct InstDesc {
    pub flags: DescFlags,
    pub family: OpcodeFamily,

    pub dest_count: u8,
    pub default_arg_count: u8,

    /// Number of MOE source slots used (always `moe_remap.len()`).
    pub moe_arg_count: u8,

    pub max_repeat: u8,

    /// Width of the register number field of destinations.
    pub dest_reg_bits: u8,
    /// Width of the register number (or immediate) field of sources.
    pub src_reg_bits: u8,

    pub predicate_support: PredicateSupport,
    pub mask_granularity: MaskGranularity,

    /// Pairs of arguments which can be swapped without changing the result.
    pub commutable: &'static [(u8, u8)],

    pub moe_remap: &'static [MoeOperand],

    /// Alignment of the (register group formed by the) destinations.
    pub dest_align: HwRegAlign,

    pub required_features: TargetFeatures,
}

impl InstDesc {
    pub fn is_available_on(&self, target: &Target) -> bool {
        target.supports(self.required_features)
    }

    /// Check internal consistency, panicking on any violation.
    #[track_caller]
    fn validate(&self, opcode: Opcode) {
        let name = opcode.mnemonic();
        let arg_count = usize::from(self.default_arg_count);

        assert_eq!(self.moe_remap.len(), usize::from(self.moe_arg_count), "`{name}`");
        assert!(self.moe_arg_count <= 3, "`{name}`: too many MOE source slots");
        for (i, moe) in self.moe_remap.iter().enumerate() {
            let range = moe.arg_range();
            assert!(!range.is_empty() && range.end <= arg_count, "`{name}`: {moe:?}");
            if let MoeOperand::AliasOfDest { dest, .. } = *moe {
                assert!(dest < self.dest_count, "`{name}`: {moe:?}");
            }
            for other in &self.moe_remap[..i] {
                let other = other.arg_range();
                assert!(
                    range.end <= other.start || other.end <= range.start,
                    "`{name}`: overlapping MOE slots"
                );
            }
        }

        for &(a, b) in self.commutable {
            assert!(a != b && usize::from(a.max(b)) < arg_count, "`{name}`: ({a}, {b})");
        }

        assert!(self.max_repeat >= 1, "`{name}`");
        if !self.flags.contains(DescFlags::REPEAT) {
            assert_eq!(self.max_repeat, 1, "`{name}`: non-repeatable");
            assert!(!self.flags.intersects(DescFlags::REPEAT_MASK | DescFlags::REPEAT_MASK_ONLY));
        }
        if self.flags.contains(DescFlags::REPEAT_MASK_ONLY) {
            assert!(self.flags.contains(DescFlags::REPEAT_MASK), "`{name}`");
            assert!(self.max_repeat <= 8, "`{name}`: repeat masks are 8 bits");
        }

        assert_eq!(
            self.flags.contains(DescFlags::DEST_MASKABLE),
            self.mask_granularity != MaskGranularity::Whole,
            "`{name}`: maskability disagrees with mask granularity"
        );
        if self.flags.contains(DescFlags::VECTOR) {
            assert!(self.required_features.contains(TargetFeatures::VECTOR_INSTRUCTIONS));
        }
    }
}

lazy_static! {
    static ref INST_DESCS: Vec<InstDesc> = Opcode::ALL
        .iter()
        .enumerate()
        .map(|(i, &opcode)| {
            assert_eq!(opcode.index(), i);
            let desc = describe(opcode);
            desc.validate(opcode);
            desc
        })
        .collect();
}

impl Opcode {
    /// Look up the static descriptor of this opcode.
    #[inline]
    pub fn desc(self) -> &'static InstDesc {
        &INST_DESCS[self.index()]
    }
}

const NO_DEST_ALIGN: HwRegAlign = HwRegAlign::None;

const BASE: InstDesc = InstDesc {
    flags: DescFlags::empty(),
    family: OpcodeFamily::Misc,
    dest_count: 1,
    default_arg_count: 0,
    moe_arg_count: 0,
    max_repeat: 1,
    dest_reg_bits: 8,
    src_reg_bits: 7,
    predicate_support: PredicateSupport::ShortRange,
    mask_granularity: MaskGranularity::Whole,
    commutable: &[],
    moe_remap: &[],
    dest_align: NO_DEST_ALIGN,
    required_features: TargetFeatures::empty(),
};

const ALU_FLAGS: DescFlags = DescFlags::REPEAT
    .union(DescFlags::REPEAT_MASK)
    .union(DescFlags::END_FLAG)
    .union(DescFlags::SYNC_START)
    .union(DescFlags::NO_SCHED)
    .union(DescFlags::MOE_INCREMENTS)
    .union(DescFlags::DYNAMIC_INDEX);

const ALU: InstDesc = InstDesc {
    flags: ALU_FLAGS.union(DescFlags::IMMEDIATE_SRC),
    max_repeat: 16,
    predicate_support: PredicateSupport::ExtendedRange,
    ..BASE
};

const VECTOR: InstDesc = InstDesc {
    flags: ALU_FLAGS
        .difference(DescFlags::DYNAMIC_INDEX)
        .union(DescFlags::VECTOR)
        .union(DescFlags::DEST_MASKABLE),
    family: OpcodeFamily::VectorPerChannel,
    max_repeat: 4,
    predicate_support: PredicateSupport::VectorExtended,
    mask_granularity: MaskGranularity::Channels,
    dest_align: HwRegAlign::Even,
    required_features: TargetFeatures::VECTOR_INSTRUCTIONS,
    ..BASE
};

const LOAD: InstDesc = InstDesc {
    flags: DescFlags::MEM_LOAD
        .union(DescFlags::DESCHEDULE)
        .union(DescFlags::SYNC_START)
        .union(DescFlags::IMMEDIATE_SRC),
    family: OpcodeFamily::Memory,
    default_arg_count: mem_args::LOAD_COUNT as u8,
    moe_arg_count: 2,
    moe_remap: &[MoeOperand::arg(mem_args::BASE as u8), MoeOperand::arg(mem_args::OFFSET as u8)],
    ..BASE
};

const STORE: InstDesc = InstDesc {
    flags: DescFlags::MEM_STORE
        .union(DescFlags::SIDE_EFFECTS)
        .union(DescFlags::IMMEDIATE_SRC),
    family: OpcodeFamily::Memory,
    dest_count: 0,
    default_arg_count: mem_args::STORE_COUNT as u8,
    moe_arg_count: 3,
    moe_remap: &[
        MoeOperand::arg(mem_args::BASE as u8),
        MoeOperand::arg(mem_args::OFFSET as u8),
        MoeOperand::arg(mem_args::DATA as u8),
    ],
    ..BASE
};

const SMP_COORDS: MoeOperand = MoeOperand::args(smp_args::COORDS.start as u8, 4);
const SMP_STATE: MoeOperand = MoeOperand::args(smp_args::STATE.start as u8, 4);

const SMP: InstDesc = InstDesc {
    flags: DescFlags::TEXTURE_SAMPLE.union(DescFlags::DESCHEDULE),
    family: OpcodeFamily::TextureSample,
    default_arg_count: smp_args::COUNT as u8,
    moe_arg_count: 2,
    predicate_support: PredicateSupport::UspOnly,
    moe_remap: &[SMP_COORDS, SMP_STATE],
    ..BASE
};

const SMP_GRAD_REMAP: &[MoeOperand] =
    &[SMP_COORDS, SMP_STATE, MoeOperand::args(smp_args::GRADS.start as u8, 6)];
const SMP_REPLACE_REMAP: &[MoeOperand] = &[
    SMP_COORDS,
    SMP_STATE,
    MoeOperand::AliasOfDest { arg: smp_args::REPLACE as u8, dest: 0 },
];

const ONE_SRC: &[MoeOperand] = &[MoeOperand::arg(0)];
const TWO_SRCS: &[MoeOperand] = &[MoeOperand::arg(0), MoeOperand::arg(1)];
const THREE_SRCS: &[MoeOperand] = &[MoeOperand::arg(0), MoeOperand::arg(1), MoeOperand::arg(2)];

const ONE_VEC_SRC: &[MoeOperand] = &[MoeOperand::even_arg(0)];
const TWO_VEC_SRCS: &[MoeOperand] = &[MoeOperand::even_arg(0), MoeOperand::even_arg(1)];
const THREE_VEC_SRCS: &[MoeOperand] =
    &[MoeOperand::even_arg(0), MoeOperand::even_arg(1), MoeOperand::even_arg(2)];

const FDP3_REMAP: &[MoeOperand] = &[MoeOperand::args(0, 3), MoeOperand::args(3, 3)];

const SRC01_COMMUTE: &[(u8, u8)] = &[(0, 1)];

/// The single source of truth for per-opcode static information.
fn describe(opcode: Opcode) -> InstDesc {
    use Opcode::*;

    let unary = |family| InstDesc {
        family,
        default_arg_count: 1,
        moe_arg_count: 1,
        moe_remap: ONE_SRC,
        ..ALU
    };
    let binary = |family, commutable: &'static [(u8, u8)]| InstDesc {
        family,
        default_arg_count: 2,
        moe_arg_count: 2,
        moe_remap: TWO_SRCS,
        commutable,
        ..ALU
    };
    let ternary = |family, commutable: &'static [(u8, u8)]| InstDesc {
        family,
        default_arg_count: 3,
        moe_arg_count: 3,
        moe_remap: THREE_SRCS,
        commutable,
        ..ALU
    };
    let byte_maskable = |desc: InstDesc| InstDesc {
        flags: desc.flags | DescFlags::DEST_MASKABLE,
        mask_granularity: MaskGranularity::Channels,
        ..desc
    };
    let vector = |family, arg_count: u8, commutable: &'static [(u8, u8)]| InstDesc {
        family,
        default_arg_count: arg_count,
        moe_arg_count: arg_count,
        moe_remap: match arg_count {
            1 => ONE_VEC_SRC,
            2 => TWO_VEC_SRCS,
            _ => THREE_VEC_SRCS,
        },
        commutable,
        ..VECTOR
    };

    match opcode {
        Nop => InstDesc {
            flags: DescFlags::END_FLAG | DescFlags::SYNC_START | DescFlags::NO_SCHED,
            dest_count: 0,
            ..BASE
        },
        Wdf | Idf => InstDesc {
            flags: DescFlags::SIDE_EFFECTS | DescFlags::DESCHEDULE,
            dest_count: 0,
            default_arg_count: 1,
            predicate_support: PredicateSupport::None,
            ..BASE
        },

        Mov => byte_maskable(unary(OpcodeFamily::Move)),
        Limm => InstDesc {
            flags: DescFlags::IMMEDIATE_SRC | DescFlags::END_FLAG | DescFlags::NO_SCHED,
            family: OpcodeFamily::Move,
            default_arg_count: 1,
            src_reg_bits: 32,
            ..BASE
        },

        And | Or | Xor => {
            let desc = byte_maskable(binary(OpcodeFamily::Bitwise, SRC01_COMMUTE));
            InstDesc { flags: desc.flags | DescFlags::TEST_VARIANT, ..desc }
        }
        Not => byte_maskable(unary(OpcodeFamily::Bitwise)),
        Shl | Shr | Asr => InstDesc {
            flags: ALU.flags | DescFlags::TEST_VARIANT,
            ..binary(OpcodeFamily::Shift, &[])
        },

        Fmad => InstDesc {
            flags: ALU.flags | DescFlags::F16F32_SELECT,
            ..ternary(OpcodeFamily::ScalarFloat, SRC01_COMMUTE)
        },
        Fmul | Fadd | Fmin | Fmax => InstDesc {
            flags: ALU.flags | DescFlags::F16F32_SELECT | DescFlags::TEST_VARIANT,
            ..binary(OpcodeFamily::ScalarFloat, SRC01_COMMUTE)
        },
        Fsub => InstDesc {
            flags: ALU.flags | DescFlags::F16F32_SELECT | DescFlags::TEST_VARIANT,
            ..binary(OpcodeFamily::ScalarFloat, &[])
        },
        Fmad16 => InstDesc {
            flags: ALU.flags | DescFlags::DEST_MASKABLE,
            mask_granularity: MaskGranularity::Halves,
            ..ternary(OpcodeFamily::ScalarFloat, SRC01_COMMUTE)
        },
        Frcp | Frsq | Fexp | Flog | Fsin | Fcos | Ffrc | Ftrc => InstDesc {
            flags: ALU.flags.difference(DescFlags::IMMEDIATE_SRC),
            ..unary(OpcodeFamily::FloatWhole)
        },
        Fdsx | Fdsy => InstDesc {
            flags: ALU.flags.difference(DescFlags::IMMEDIATE_SRC) | DescFlags::REPEAT_MASK_ONLY,
            max_repeat: 4,
            ..unary(OpcodeFamily::FloatWhole)
        },
        Fdp3 => InstDesc {
            flags: DescFlags::END_FLAG | DescFlags::NO_SCHED | DescFlags::TEST_VARIANT,
            family: OpcodeFamily::DotProduct,
            default_arg_count: 6,
            moe_arg_count: 2,
            moe_remap: FDP3_REMAP,
            predicate_support: PredicateSupport::ExtendedRange,
            ..BASE
        },

        PckF16F32 => InstDesc {
            flags: ALU.flags | DescFlags::DEST_MASKABLE,
            mask_granularity: MaskGranularity::Halves,
            ..binary(OpcodeFamily::ComponentSelect, &[])
        },
        PckU8F32 | PckC10F32 => byte_maskable(binary(OpcodeFamily::ComponentSelect, &[])),
        UnpckF32F16 | UnpckF32U8 | UnpckF32C10 => unary(OpcodeFamily::ComponentSelect),

        Movc => byte_maskable(ternary(OpcodeFamily::ConditionalMove, &[])),
        Vmovc => InstDesc {
            predicate_support: PredicateSupport::VectorShort,
            ..vector(OpcodeFamily::ConditionalMove, 3, &[])
        },

        Sop2 => InstDesc {
            predicate_support: PredicateSupport::ShortRange,
            ..byte_maskable(binary(OpcodeFamily::ByteAlu, &[]))
        },
        Sop3 | Lrp1 | Fpma => InstDesc {
            predicate_support: PredicateSupport::ShortRange,
            ..byte_maskable(ternary(OpcodeFamily::ByteAlu, &[]))
        },

        Imae | Ima16 => InstDesc {
            flags: ALU.flags | DescFlags::TEST_VARIANT,
            ..ternary(OpcodeFamily::IntegerMulAdd, SRC01_COMMUTE)
        },
        Ima32 => InstDesc {
            flags: DescFlags::END_FLAG | DescFlags::NO_SCHED | DescFlags::IMMEDIATE_SRC,
            dest_count: 2,
            max_repeat: 1,
            dest_align: HwRegAlign::Even,
            required_features: TargetFeatures::IMA32,
            ..ternary(OpcodeFamily::IntegerMulAdd, SRC01_COMMUTE)
        },

        Efo => InstDesc {
            flags: ALU.flags.difference(DescFlags::IMMEDIATE_SRC),
            predicate_support: PredicateSupport::ShortRange,
            ..ternary(OpcodeFamily::Efo, &[])
        },

        TestPred | Setp => InstDesc {
            flags: DescFlags::END_FLAG | DescFlags::NO_SCHED | DescFlags::IMMEDIATE_SRC,
            max_repeat: 1,
            predicate_support: PredicateSupport::ShortRange,
            ..binary(OpcodeFamily::Test, &[])
        },
        TestMask => InstDesc {
            predicate_support: PredicateSupport::ShortRange,
            ..byte_maskable(binary(OpcodeFamily::Test, &[]))
        },

        Vmad | Vmad4 => vector(OpcodeFamily::VectorPerChannel, 3, SRC01_COMMUTE),
        Vmul | Vadd | Vmin | Vmax => vector(OpcodeFamily::VectorPerChannel, 2, SRC01_COMMUTE),
        Vmov => vector(OpcodeFamily::VectorPerChannel, 1, &[]),
        Vdp3 | Vdp4 => InstDesc {
            flags: VECTOR.flags | DescFlags::TEST_VARIANT,
            ..vector(OpcodeFamily::DotProduct, 2, SRC01_COMMUTE)
        },
        Vrcp | Vrsq | Vexp | Vlog => vector(OpcodeFamily::VectorReplicated, 1, &[]),

        Ldab | Ldaw | Ldad => LOAD,
        Ldlb | Ldlw | Ldld => InstDesc { required_features: TargetFeatures::LOCAL_MEMORY, ..LOAD },
        Stab | Staw | Stad => STORE,
        Stlb | Stlw | Stld => InstDesc { required_features: TargetFeatures::LOCAL_MEMORY, ..STORE },

        Smp | SmpBias => SMP,
        SmpGrad => InstDesc {
            moe_arg_count: 3,
            moe_remap: SMP_GRAD_REMAP,
            required_features: TargetFeatures::SAMPLE_GRADIENTS,
            ..SMP
        },
        SmpReplace => InstDesc {
            moe_arg_count: 3,
            moe_remap: SMP_REPLACE_REMAP,
            ..SMP
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_complete_and_consistent() {
        // Forces (and thus validates) the whole table.
        assert_eq!(INST_DESCS.len(), Opcode::COUNT);
        for &opcode in Opcode::ALL {
            let desc = opcode.desc();
            assert!(usize::from(desc.moe_arg_count) <= usize::from(desc.default_arg_count));
        }
    }

    #[test]
    fn memory_argument_counts() {
        for &opcode in Opcode::ALL {
            if opcode.is_load() {
                assert_eq!(usize::from(opcode.desc().default_arg_count), mem_args::LOAD_COUNT);
                assert_eq!(opcode.desc().dest_count, 1);
            } else if opcode.is_store() {
                assert_eq!(usize::from(opcode.desc().default_arg_count), mem_args::STORE_COUNT);
                assert_eq!(opcode.desc().dest_count, 0);
                assert!(opcode.desc().flags.contains(DescFlags::SIDE_EFFECTS));
            }
        }
    }

    #[test]
    fn texture_samples_share_one_layout() {
        for &opcode in Opcode::ALL.iter().filter(|op| op.is_texture_sample()) {
            let desc = opcode.desc();
            assert_eq!(usize::from(desc.default_arg_count), smp_args::COUNT);
            assert!(desc.flags.contains(DescFlags::TEXTURE_SAMPLE | DescFlags::DESCHEDULE));
            assert_eq!(desc.predicate_support, PredicateSupport::UspOnly);
        }
    }

    #[test]
    fn mask_granularity_expansion() {
        use MaskGranularity::*;
        assert_eq!(Whole.expand(ChanMask::NONE), ChanMask::NONE);
        assert_eq!(Whole.expand(ChanMask::Y), ChanMask::ALL);
        assert_eq!(Halves.expand(ChanMask::Y), ChanMask::XY);
        assert_eq!(Halves.expand(ChanMask::Y | ChanMask::W), ChanMask::ALL);
        assert_eq!(Channels.expand(ChanMask::Z), ChanMask::Z);
    }

    #[test]
    fn vector_opcodes_need_vector_targets() {
        assert!(!Opcode::Vmad.desc().is_available_on(&Target::SGX540));
        assert!(Opcode::Vmad.desc().is_available_on(&Target::SGX543));
        assert!(!Opcode::Ima32.desc().is_available_on(&Target::SGX543));
        assert!(Opcode::Ima32.desc().is_available_on(&Target::SGX545));
        assert!(Opcode::Fmad.desc().is_available_on(&Target::SGX530));
    }
}
