//! Opcode-specific instruction parameters.
//!
//! Every [`InstDef`](crate::InstDef) carries exactly one [`InstParams`] variant,
//! which always matches its opcode: it's (re)created by
//! [`InstParams::for_opcode`] whenever the opcode changes, and the checked
//! accessors (`as_float`, `as_smp_mut`, etc.) panic on any mismatch.

use crate::{ChanMask, Opcode, RegFormat};

/// Floating-point source modifier.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FloatSrcMod {
    pub negate: bool,
    pub absolute: bool,
}

impl FloatSrcMod {
    pub const NONE: Self = Self { negate: false, absolute: false };

    pub fn negated(self) -> Self {
        Self { negate: !self.negate, ..self }
    }

    /// Take the absolute value, which also discards any earlier negation.
    pub fn abs(self) -> Self {
        Self { negate: false, absolute: true }
    }
}

/// Parameters of scalar floating-point instructions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FloatParams {
    pub src_mods: [FloatSrcMod; 3],

    /// For F16 sources, which half (`0` for low, `1` for high) is read.
    pub f16_component: [u8; 3],

    pub saturate: bool,
}

/// Parameters of pack (`pck*`) and unpack (`unpck*`) instructions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PckParams {
    /// Which component of each source is read, in units of the source format
    /// (i.e. halves of F16 sources, bytes of U8/C10 sources).
    pub component: [u8; 2],

    /// Scale to/from the `[0, 1]` range when converting to/from fixed-point.
    pub scale: bool,
}

/// Selector for one factor of a SOP-style (byte ALU) operation.
///
/// `Src*` selectors name the *argument index* they read from.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SopSel {
    #[default]
    Zero,
    One,
    Src0,
    Src0Alpha,
    Src1,
    Src1Alpha,
    Src2,
    Src2Alpha,
}

impl SopSel {
    /// The argument this selector reads, and whether it reads its alpha
    /// (`w`) channel (as opposed to the channel being computed).
    pub fn src_arg(self) -> Option<(usize, bool)> {
        match self {
            Self::Zero | Self::One => None,
            Self::Src0 => Some((0, false)),
            Self::Src0Alpha => Some((0, true)),
            Self::Src1 => Some((1, false)),
            Self::Src1Alpha => Some((1, true)),
            Self::Src2 => Some((2, false)),
            Self::Src2Alpha => Some((2, true)),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SopOp {
    #[default]
    Add,
    Sub,
    Min,
    Max,
}

/// Parameters of `sop2`, `sop3` and `lrp1`.
///
/// Colour (`xyz`) and alpha (`w`) are computed independently, each as
/// `op(term0 * sel[0], term1 * sel[1])`, where the terms are the two arguments
/// listed by [`SopParams::term_args`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SopParams {
    pub csel: [SopSel; 2],
    pub complement_csel: [bool; 2],
    pub cop: SopOp,

    pub asel: [SopSel; 2],
    pub complement_asel: [bool; 2],
    pub aop: SopOp,
}

impl SopParams {
    /// The two arguments being combined (as opposed to only being used as
    /// factors via selectors).
    #[track_caller]
    pub fn term_args(opcode: Opcode) -> [usize; 2] {
        match opcode {
            Opcode::Sop2 => [0, 1],
            Opcode::Sop3 | Opcode::Lrp1 => [1, 2],
            _ => panic!("`{}` is not a SOP-style instruction", opcode.mnemonic()),
        }
    }
}

/// Parameters of `fpma` (byte-wise `src0 * src1 + src2`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FpmaParams {
    /// Either `Src0` or `Src0Alpha` (i.e. whether the multiplier is
    /// replicated from `src0.w`).
    pub csel0: SopSel,
    pub negate_src0: bool,
    pub saturate: bool,
}

impl Default for FpmaParams {
    fn default() -> Self {
        Self { csel0: SopSel::Src0, negate_src0: false, saturate: false }
    }
}

/// How `imae` interprets its third source.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImaeSrc2Kind {
    #[default]
    U16,
    U32,
    /// 16-bit, zero-extended, and with the carry-in taken from `src2`'s
    /// high word.
    Z16,
}

/// Parameters of `imae` and `ima16`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImaeParams {
    pub signed: bool,
    pub src2_kind: ImaeSrc2Kind,
    pub write_carry: bool,
}

/// Parameters of `ima32`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ima32Params {
    pub signed: bool,
    pub negate_src2: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TestCond {
    #[default]
    Zero,
    NonZero,
    Negative,
    Positive,
    NegativeOrZero,
    PositiveOrZero,
}

/// ALU operation whose result is tested.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum TestAlu {
    /// Test `src0` as-is.
    #[default]
    None,
    FAdd,
    FSub,
    IAdd,
    ISub,
    And,
    Or,
    Xor,
}

/// Parameters of `testpred`/`testmask`/`setp`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestParams {
    pub alu: TestAlu,
    pub cond: TestCond,

    /// If present, only this channel of the ALU result is tested
    /// (otherwise the whole register is).
    pub chan_sel: Option<u8>,
}

/// Parameters of `movc` (and the condition of `vmovc`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MovcParams {
    pub cond: TestCond,
}

/// Parameters of memory loads and stores.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemParams {
    pub bypass_cache: bool,

    /// The range limit argument is checked against the offset, with
    /// out-of-range loads returning zero (and stores being skipped).
    pub range_checked: bool,

    /// Offset is applied after (rather than before) the access, and the
    /// updated base is written back.
    pub post_increment: bool,
}

/// Which level-of-detail control a texture sample uses.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SmpLodMode {
    #[default]
    Implicit,
    Bias,
    Replace,
    Gradients,
}

impl SmpLodMode {
    pub fn for_opcode(opcode: Opcode) -> Self {
        match opcode {
            Opcode::SmpBias => Self::Bias,
            Opcode::SmpReplace => Self::Replace,
            Opcode::SmpGrad => Self::Gradients,
            _ => Self::Implicit,
        }
    }
}

/// Parameters of texture sample instructions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmpParams {
    /// Texture dimensionality (`1..=3`).
    pub dim: u8,
    pub projected: bool,
    pub coord_format: RegFormat,

    /// Percentage-closer filtering (i.e. shadow comparison).
    pub pcf: bool,

    pub texture_unit: u32,
    pub lod_mode: SmpLodMode,
}

impl Default for SmpParams {
    fn default() -> Self {
        Self {
            dim: 2,
            projected: false,
            coord_format: RegFormat::F32,
            pcf: false,
            texture_unit: 0,
            lod_mode: SmpLodMode::Implicit,
        }
    }
}

impl SmpParams {
    /// Number of coordinate arguments actually used.
    pub fn coord_count(&self) -> usize {
        let count = usize::from(self.dim) + usize::from(self.projected) + usize::from(self.pcf);
        count.min(crate::desc::smp_args::COORDS.len())
    }
}

/// Inputs of the multipliers/adders inside `efo`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum EfoSrc {
    #[default]
    Src0,
    Src1,
    Src2,
    I0,
    I1,
    M0,
    M1,
}

/// Which internal result is written to the destination.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum EfoDestSrc {
    #[default]
    A0,
    A1,
    M0,
    M1,
}

/// Parameters of `efo` (two multiplies and two adds, with internal routing).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EfoParams {
    pub m0_srcs: [EfoSrc; 2],
    pub m1_srcs: [EfoSrc; 2],
    pub a0_srcs: [EfoSrc; 2],
    pub a1_srcs: [EfoSrc; 2],
    pub dest_src: EfoDestSrc,

    /// Write the adder results back into internal registers `i0`/`i1`.
    pub write_i0: bool,
    pub write_i1: bool,

    pub src_mods: [FloatSrcMod; 3],
}

/// Per-source component selection of vector instructions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Swizzle(pub [u8; 4]);

impl Default for Swizzle {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Swizzle {
    pub const IDENTITY: Self = Self([0, 1, 2, 3]);

    #[track_caller]
    pub fn splat(chan: u8) -> Self {
        assert!(usize::from(chan) < ChanMask::CHAN_COUNT);
        Self([chan; 4])
    }

    /// The source channel read to compute result channel `i`.
    pub fn sel(self, i: usize) -> usize {
        usize::from(self.0[i]) % ChanMask::CHAN_COUNT
    }

    /// The source channels read to compute the result channels in `mask`.
    pub fn apply(self, mask: ChanMask) -> ChanMask {
        mask.chans().map(|i| self.sel(i)).collect()
    }
}

/// Parameters of vector instructions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VecParams {
    pub swizzles: [Swizzle; 3],
    pub src_mods: [FloatSrcMod; 3],
    pub src_formats: [RegFormat; 3],
    pub dest_format: RegFormat,
}

impl Default for VecParams {
    fn default() -> Self {
        Self {
            swizzles: [Swizzle::IDENTITY; 3],
            src_mods: [FloatSrcMod::NONE; 3],
            src_formats: [RegFormat::F32; 3],
            dest_format: RegFormat::F32,
        }
    }
}

/// Opcode-specific parameters (see module-level docs).
///
/// Bulkier parameter sets are boxed, to keep `InstDef` itself small.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstParams {
    None,
    Float(FloatParams),
    Pck(PckParams),
    Sop(Box<SopParams>),
    Fpma(FpmaParams),
    Imae(ImaeParams),
    Ima32(Ima32Params),
    Test(TestParams),
    Movc(MovcParams),
    Mem(MemParams),
    Smp(Box<SmpParams>),
    Efo(Box<EfoParams>),
    Vec(Box<VecParams>),
    Vmovc(Box<VecParams>, MovcParams),
}

macro_rules! accessors {
    ($($name:ident, $name_mut:ident => $variant:ident($ty:ty);)+) => {
        impl InstParams {
            $(
                #[track_caller]
                pub fn $name(&self) -> &$ty {
                    match self {
                        InstParams::$variant(params) => params,
                        _ => panic!(
                            concat!("expected `InstParams::", stringify!($variant), "`, found {:?}"),
                            self,
                        ),
                    }
                }

                #[track_caller]
                pub fn $name_mut(&mut self) -> &mut $ty {
                    match self {
                        InstParams::$variant(params) => params,
                        _ => panic!(
                            concat!("expected `InstParams::", stringify!($variant), "`, found {:?}"),
                            self,
                        ),
                    }
                }
            )+
        }
    };
}

accessors! {
    as_float, as_float_mut => Float(FloatParams);
    as_pck, as_pck_mut => Pck(PckParams);
    as_sop, as_sop_mut => Sop(SopParams);
    as_fpma, as_fpma_mut => Fpma(FpmaParams);
    as_imae, as_imae_mut => Imae(ImaeParams);
    as_ima32, as_ima32_mut => Ima32(Ima32Params);
    as_test, as_test_mut => Test(TestParams);
    as_mem, as_mem_mut => Mem(MemParams);
    as_smp, as_smp_mut => Smp(SmpParams);
    as_efo, as_efo_mut => Efo(EfoParams);
}

impl InstParams {
    /// Default parameters for `opcode`, i.e. the only valid variant for it.
    pub fn for_opcode(opcode: Opcode) -> Self {
        use Opcode::*;
        match opcode {
            Fmad | Fmul | Fadd | Fsub | Fmin | Fmax | Fmad16 | Frcp | Frsq | Fexp | Flog
            | Fsin | Fcos | Ffrc | Ftrc | Fdsx | Fdsy | Fdp3 => {
                Self::Float(FloatParams::default())
            }
            PckF16F32 | PckU8F32 | PckC10F32 | UnpckF32F16 | UnpckF32U8 | UnpckF32C10 => {
                Self::Pck(PckParams::default())
            }
            Sop2 | Sop3 | Lrp1 => Self::Sop(Box::default()),
            Fpma => Self::Fpma(FpmaParams::default()),
            Imae | Ima16 => Self::Imae(ImaeParams::default()),
            Ima32 => Self::Ima32(Ima32Params::default()),
            TestPred | TestMask | Setp => Self::Test(TestParams::default()),
            Movc => Self::Movc(MovcParams::default()),
            Vmovc => Self::Vmovc(Box::default(), MovcParams::default()),
            Ldab | Ldaw | Ldad | Ldlb | Ldlw | Ldld | Stab | Staw | Stad | Stlb | Stlw | Stld => {
                Self::Mem(MemParams::default())
            }
            Smp | SmpBias | SmpReplace | SmpGrad => Self::Smp(Box::new(SmpParams {
                lod_mode: SmpLodMode::for_opcode(opcode),
                ..SmpParams::default()
            })),
            Efo => Self::Efo(Box::default()),
            Vmad | Vmul | Vadd | Vmin | Vmax | Vmov | Vmad4 | Vdp3 | Vdp4 | Vrcp | Vrsq | Vexp
            | Vlog => Self::Vec(Box::default()),
            Nop | Wdf | Idf | Mov | Limm | And | Or | Xor | Not | Shl | Shr | Asr => Self::None,
        }
    }

    /// Whether `self` is the variant `opcode` requires.
    pub fn matches_opcode(&self, opcode: Opcode) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(&Self::for_opcode(opcode))
    }

    /// Vector parameters, of either vector ALU instructions or `vmovc`.
    #[track_caller]
    pub fn as_vec(&self) -> &VecParams {
        match self {
            InstParams::Vec(params) | InstParams::Vmovc(params, _) => params,
            _ => panic!("expected vector parameters, found {self:?}"),
        }
    }

    #[track_caller]
    pub fn as_vec_mut(&mut self) -> &mut VecParams {
        match self {
            InstParams::Vec(params) | InstParams::Vmovc(params, _) => params,
            _ => panic!("expected vector parameters, found {self:?}"),
        }
    }

    /// Floating-point source modifiers, for any instruction that has them.
    pub fn float_src_mods(&self) -> Option<&[FloatSrcMod; 3]> {
        match self {
            InstParams::Float(params) => Some(&params.src_mods),
            InstParams::Efo(params) => Some(&params.src_mods),
            InstParams::Vec(params) | InstParams::Vmovc(params, _) => Some(&params.src_mods),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OpcodeFamily;

    fn family_params_kind(family: OpcodeFamily) -> &'static [&'static str] {
        match family {
            OpcodeFamily::Move
            | OpcodeFamily::Bitwise
            | OpcodeFamily::Shift
            | OpcodeFamily::Misc => &["None"],
            OpcodeFamily::ScalarFloat
            | OpcodeFamily::FloatWhole
            | OpcodeFamily::DotProduct
            | OpcodeFamily::VectorPerChannel
            | OpcodeFamily::VectorReplicated => &["Float", "Vec"],
            OpcodeFamily::ComponentSelect => &["Pck"],
            OpcodeFamily::ConditionalMove => &["Movc", "Vmovc"],
            OpcodeFamily::ByteAlu => &["Sop", "Fpma"],
            OpcodeFamily::IntegerMulAdd => &["Imae", "Ima32"],
            OpcodeFamily::Efo => &["Efo"],
            OpcodeFamily::Test => &["Test"],
            OpcodeFamily::Memory => &["Mem"],
            OpcodeFamily::TextureSample => &["Smp"],
        }
    }

    #[test]
    fn params_agree_with_opcode_family() {
        for &opcode in Opcode::ALL {
            let params = InstParams::for_opcode(opcode);
            assert!(params.matches_opcode(opcode));
            let variant = format!("{params:?}");
            let variant = variant.split(['(', ' ']).next().unwrap();
            assert!(
                family_params_kind(opcode.desc().family).contains(&variant),
                "`{}` has {variant} parameters",
                opcode.mnemonic()
            );
        }
    }

    #[test]
    fn swizzle_maps_result_channels() {
        let swizzle = Swizzle([3, 3, 0, 1]);
        assert_eq!(swizzle.apply(ChanMask::X), ChanMask::W);
        assert_eq!(swizzle.apply(ChanMask::XY), ChanMask::W);
        assert_eq!(swizzle.apply(ChanMask::ALL), ChanMask::X | ChanMask::Y | ChanMask::W);
        assert_eq!(Swizzle::IDENTITY.apply(ChanMask::ZW), ChanMask::ZW);
    }

    #[test]
    #[should_panic(expected = "expected `InstParams::Smp`")]
    fn mismatched_accessor_panics() {
        InstParams::for_opcode(Opcode::Fmad).as_smp();
    }
}
