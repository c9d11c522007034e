//! Opcode families, and the behavior (liveness and register legality) shared
//! by all the opcodes of each family.
//!
//! Every [`OpcodeBehavior`] method has a conservative default, so a family
//! only overrides what it can answer more precisely.

use crate::desc::{mem_args, smp_args, DescFlags};
use crate::liveness::{live_chans_in_arg_default, written_live_chans};
use crate::params::{EfoSrc, SmpLodMode, SopParams};
use crate::{ChanMask, InstDef, Opcode, RegBank, RegFormat, Target};

/// Groups of opcodes sharing operand semantics.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpcodeFamily {
    Move,
    /// Bitwise operations, computed independently per channel.
    Bitwise,
    Shift,
    /// Scalar floating-point arithmetic, computed independently per channel
    /// (or per 16-bit half, for F16 arithmetic).
    ScalarFloat,
    /// Scalar floating-point functions, reading their entire source.
    FloatWhole,
    DotProduct,
    /// Pack/unpack, i.e. format conversions selecting source components.
    ComponentSelect,
    ConditionalMove,
    /// Byte-wise blending arithmetic (`sop2`, `sop3`, `lrp1`, `fpma`).
    ByteAlu,
    IntegerMulAdd,
    Efo,
    Test,
    VectorPerChannel,
    /// Vector functions computing one result, replicated to every channel.
    VectorReplicated,
    Memory,
    TextureSample,
    Misc,
}

impl OpcodeFamily {
    pub fn behavior(self) -> &'static dyn OpcodeBehavior {
        match self {
            Self::Move => &Moves,
            Self::Bitwise => &PerChannelAlu,
            Self::Shift | Self::IntegerMulAdd => &CrossChannelAlu,
            Self::ScalarFloat => &ScalarFloat,
            Self::FloatWhole => &CrossChannelAlu,
            Self::DotProduct => &DotProducts,
            Self::ComponentSelect => &ComponentSelect,
            Self::ConditionalMove => &ConditionalMoves,
            Self::ByteAlu => &ByteAlu,
            Self::Efo => &Efo,
            Self::Test => &Tests,
            Self::VectorPerChannel => &VectorPerChannel,
            Self::VectorReplicated => &VectorReplicated,
            Self::Memory => &MemoryAccess,
            Self::TextureSample => &TextureSample,
            Self::Misc => &DrcSync,
        }
    }
}

/// Opcode-family-specific answers to the questions generic passes ask.
///
/// All methods must be pure functions of their inputs.
pub trait OpcodeBehavior: Sync {
    /// Channels of source `arg` read, given that only `live_dests[d]` of each
    /// destination `d` are needed afterwards.
    ///
    /// Must never exceed [`live_chans_in_arg_default`].
    fn live_chans_in_arg(&self, inst: &InstDef, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
        live_chans_in_arg_default(inst, arg, live_dests)
    }

    fn can_use_src(
        &self,
        target: &Target,
        inst: &InstDef,
        arg: usize,
        bank: RegBank,
        index_bank: Option<RegBank>,
    ) -> bool {
        let _ = (target, arg);
        generic_can_use_src(inst, bank, index_bank)
    }

    fn can_use_dest(
        &self,
        target: &Target,
        inst: &InstDef,
        dest: usize,
        bank: RegBank,
        index_bank: Option<RegBank>,
    ) -> bool {
        let _ = (target, dest);
        generic_can_use_dest(inst, bank, index_bank)
    }
}

fn can_index(inst: &InstDef, bank: RegBank, index_bank: Option<RegBank>) -> bool {
    match index_bank {
        None => true,
        Some(RegBank::Index) => {
            inst.desc().flags.contains(DescFlags::DYNAMIC_INDEX) && bank.supports_dynamic_index()
        }
        Some(_) => false,
    }
}

/// Register banks any source can use, unless its opcode says otherwise.
pub fn generic_can_use_src(inst: &InstDef, bank: RegBank, index_bank: Option<RegBank>) -> bool {
    let flags = inst.desc().flags;
    let bank_ok = match bank {
        RegBank::Temp
        | RegBank::PrimAttr
        | RegBank::SecAttr
        | RegBank::Output
        | RegBank::Global
        | RegBank::SpecialConst => true,
        RegBank::FpInternal => !flags.contains(DescFlags::VECTOR),
        RegBank::Immediate => flags.contains(DescFlags::IMMEDIATE_SRC),
        RegBank::Predicate
        | RegBank::Index
        | RegBank::Drc
        | RegBank::RegArray
        | RegBank::Unused => false,
    };
    bank_ok && can_index(inst, bank, index_bank)
}

/// Register banks any destination can use, unless its opcode says otherwise.
pub fn generic_can_use_dest(inst: &InstDef, bank: RegBank, index_bank: Option<RegBank>) -> bool {
    let bank_ok = match bank {
        RegBank::Temp | RegBank::PrimAttr | RegBank::Output => true,
        RegBank::FpInternal => !inst.desc().flags.contains(DescFlags::VECTOR),
        RegBank::SecAttr
        | RegBank::Global
        | RegBank::SpecialConst
        | RegBank::Immediate
        | RegBank::Predicate
        | RegBank::Index
        | RegBank::Drc
        | RegBank::RegArray
        | RegBank::Unused => false,
    };
    bank_ok && can_index(inst, bank, index_bank)
}

/// Only what's written *and* live needs to be read, channel by channel.
fn per_channel(inst: &InstDef, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
    written_live_chans(inst, live_dests) & inst.src(arg).chan_mask()
}

/// Everything is read as soon as anything written is live.
fn all_if_live(inst: &InstDef, arg: usize, live_dests: &[ChanMask], chans: ChanMask) -> ChanMask {
    if written_live_chans(inst, live_dests).is_empty() {
        ChanMask::NONE
    } else {
        chans & inst.src(arg).chan_mask()
    }
}

fn f16_half(component: u8) -> ChanMask {
    if component == 0 {
        ChanMask::XY
    } else {
        ChanMask::ZW
    }
}

struct Moves;

impl OpcodeBehavior for Moves {
    fn live_chans_in_arg(&self, inst: &InstDef, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
        per_channel(inst, arg, live_dests)
    }

    fn can_use_src(
        &self,
        _target: &Target,
        inst: &InstDef,
        _arg: usize,
        bank: RegBank,
        index_bank: Option<RegBank>,
    ) -> bool {
        match inst.opcode() {
            Opcode::Limm => bank == RegBank::Immediate && index_bank.is_none(),
            _ => generic_can_use_src(inst, bank, index_bank),
        }
    }

    fn can_use_dest(
        &self,
        _target: &Target,
        inst: &InstDef,
        _dest: usize,
        bank: RegBank,
        index_bank: Option<RegBank>,
    ) -> bool {
        // Index registers can only be written by moves.
        (bank == RegBank::Index && index_bank.is_none())
            || generic_can_use_dest(inst, bank, index_bank)
    }
}

struct PerChannelAlu;

impl OpcodeBehavior for PerChannelAlu {
    fn live_chans_in_arg(&self, inst: &InstDef, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
        per_channel(inst, arg, live_dests)
    }
}

struct CrossChannelAlu;

impl OpcodeBehavior for CrossChannelAlu {}

struct ScalarFloat;

impl OpcodeBehavior for ScalarFloat {
    fn live_chans_in_arg(&self, inst: &InstDef, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
        let written_live = written_live_chans(inst, live_dests);
        let src = inst.src(arg);

        if inst.opcode() == Opcode::Fmad16 {
            return inst.desc().mask_granularity.expand(written_live) & src.chan_mask();
        }

        match src.format {
            RegFormat::F16 if !written_live.is_empty() => {
                let component = inst.params().as_float().f16_component[arg];
                f16_half(component) & src.chan_mask()
            }
            _ => written_live & src.chan_mask(),
        }
    }
}

struct DotProducts;

impl OpcodeBehavior for DotProducts {
    fn live_chans_in_arg(&self, inst: &InstDef, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
        let read = match inst.opcode() {
            Opcode::Vdp3 => inst.params().as_vec().swizzles[arg].apply(ChanMask::XYZ),
            Opcode::Vdp4 => inst.params().as_vec().swizzles[arg].apply(ChanMask::ALL),
            _ => ChanMask::ALL,
        };
        all_if_live(inst, arg, live_dests, read)
    }
}

struct ComponentSelect;

impl ComponentSelect {
    /// Destination units (in the destination format), in the order they're
    /// filled from alternating sources.
    fn dest_units(inst: &InstDef) -> impl Iterator<Item = ChanMask> + '_ {
        let units: &[ChanMask] = match inst.opcode() {
            Opcode::PckF16F32 => &[ChanMask::XY, ChanMask::ZW],
            _ => &[ChanMask::X, ChanMask::Y, ChanMask::Z, ChanMask::W],
        };
        let mask = inst.dest_mask(0);
        units.iter().copied().filter(move |&unit| mask.intersects(unit))
    }
}

impl OpcodeBehavior for ComponentSelect {
    fn live_chans_in_arg(&self, inst: &InstDef, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
        let live = written_live_chans(inst, live_dests);
        let is_pack = matches!(
            inst.opcode(),
            Opcode::PckF16F32 | Opcode::PckU8F32 | Opcode::PckC10F32
        );
        let used = if is_pack {
            Self::dest_units(inst)
                .enumerate()
                .any(|(i, unit)| i % 2 == arg && live.intersects(unit))
        } else {
            !live.is_empty()
        };
        if !used {
            return ChanMask::NONE;
        }

        let src = inst.src(arg);
        let component = inst.params().as_pck().component[arg];
        let read = match src.format {
            RegFormat::F16 => f16_half(component),
            RegFormat::U8 => ChanMask::chan(usize::from(component) % ChanMask::CHAN_COUNT),
            _ => ChanMask::ALL,
        };
        read & src.chan_mask()
    }
}

struct ConditionalMoves;

impl OpcodeBehavior for ConditionalMoves {
    fn live_chans_in_arg(&self, inst: &InstDef, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
        // Argument 0 is the condition, always read in full.
        if arg == 0 {
            return all_if_live(inst, arg, live_dests, ChanMask::ALL);
        }
        let written_live = written_live_chans(inst, live_dests);
        let read = match inst.opcode() {
            Opcode::Vmovc => inst.params().as_vec().swizzles[arg].apply(written_live),
            _ => written_live,
        };
        read & inst.src(arg).chan_mask()
    }
}

struct ByteAlu;

impl OpcodeBehavior for ByteAlu {
    fn live_chans_in_arg(&self, inst: &InstDef, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
        let live = written_live_chans(inst, live_dests);
        let width = inst.src(arg).chan_mask();

        if inst.opcode() == Opcode::Fpma {
            let params = inst.params().as_fpma();
            let read = match (arg, params.csel0.src_arg()) {
                (0, Some((0, true))) if !live.is_empty() => ChanMask::W,
                (0, Some((0, false))) => live,
                (0, _) => ChanMask::NONE,
                _ => live,
            };
            return read & width;
        }

        let params = inst.params().as_sop();
        let terms = SopParams::term_args(inst.opcode());
        let colour_live = live & ChanMask::XYZ;
        let alpha_live = live & ChanMask::W;

        let mut read = ChanMask::NONE;
        if terms.contains(&arg) {
            read |= live;
        }
        if !colour_live.is_empty() {
            for sel in params.csel {
                match sel.src_arg() {
                    Some((src, true)) if src == arg => read |= ChanMask::W,
                    Some((src, false)) if src == arg => read |= colour_live,
                    _ => {}
                }
            }
        }
        if !alpha_live.is_empty() {
            for sel in params.asel {
                if matches!(sel.src_arg(), Some((src, _)) if src == arg) {
                    read |= ChanMask::W;
                }
            }
        }
        read & width
    }
}

struct Efo;

impl OpcodeBehavior for Efo {
    fn live_chans_in_arg(&self, inst: &InstDef, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
        let params = inst.params().as_efo();
        let this_src = match arg {
            0 => EfoSrc::Src0,
            1 => EfoSrc::Src1,
            _ => EfoSrc::Src2,
        };
        let routed = [params.m0_srcs, params.m1_srcs, params.a0_srcs, params.a1_srcs]
            .iter()
            .flatten()
            .any(|&src| src == this_src);
        if routed {
            live_chans_in_arg_default(inst, arg, live_dests)
        } else {
            ChanMask::NONE
        }
    }

    fn can_use_src(
        &self,
        _target: &Target,
        inst: &InstDef,
        _arg: usize,
        bank: RegBank,
        index_bank: Option<RegBank>,
    ) -> bool {
        // Internal registers are read through `EfoSrc::I0`/`EfoSrc::I1` instead.
        bank != RegBank::FpInternal && generic_can_use_src(inst, bank, index_bank)
    }
}

struct Tests;

impl OpcodeBehavior for Tests {
    fn live_chans_in_arg(&self, inst: &InstDef, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
        match inst.params().as_test().chan_sel {
            Some(chan) => all_if_live(inst, arg, live_dests, ChanMask::chan(usize::from(chan))),
            None if inst.opcode() == Opcode::TestMask => per_channel(inst, arg, live_dests),
            None => live_chans_in_arg_default(inst, arg, live_dests),
        }
    }

    fn can_use_dest(
        &self,
        _target: &Target,
        inst: &InstDef,
        _dest: usize,
        bank: RegBank,
        index_bank: Option<RegBank>,
    ) -> bool {
        match inst.opcode() {
            Opcode::TestPred | Opcode::Setp => bank == RegBank::Predicate && index_bank.is_none(),
            _ => generic_can_use_dest(inst, bank, index_bank),
        }
    }
}

struct VectorPerChannel;

impl OpcodeBehavior for VectorPerChannel {
    fn live_chans_in_arg(&self, inst: &InstDef, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
        let written_live = written_live_chans(inst, live_dests);
        inst.params().as_vec().swizzles[arg].apply(written_live) & inst.src(arg).chan_mask()
    }
}

struct VectorReplicated;

impl OpcodeBehavior for VectorReplicated {
    fn live_chans_in_arg(&self, inst: &InstDef, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
        let chan = inst.params().as_vec().swizzles[arg].sel(0);
        all_if_live(inst, arg, live_dests, ChanMask::chan(chan))
    }
}

struct MemoryAccess;

impl OpcodeBehavior for MemoryAccess {
    fn live_chans_in_arg(&self, inst: &InstDef, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
        let opcode = inst.opcode();
        if opcode.is_load() && arg == mem_args::RANGE && !inst.params().as_mem().range_checked {
            return ChanMask::NONE;
        }
        live_chans_in_arg_default(inst, arg, live_dests)
    }

    fn can_use_src(
        &self,
        _target: &Target,
        inst: &InstDef,
        arg: usize,
        bank: RegBank,
        index_bank: Option<RegBank>,
    ) -> bool {
        let opcode = inst.opcode();
        if opcode.is_load() && arg == mem_args::DRC {
            return bank == RegBank::Drc && index_bank.is_none();
        }
        let immediate_ok = match arg {
            mem_args::OFFSET => true,
            mem_args::RANGE => opcode.is_load(),
            _ => false,
        };
        if bank == RegBank::Immediate && !immediate_ok {
            return false;
        }
        bank != RegBank::FpInternal && generic_can_use_src(inst, bank, index_bank)
    }

    fn can_use_dest(
        &self,
        _target: &Target,
        _inst: &InstDef,
        _dest: usize,
        bank: RegBank,
        index_bank: Option<RegBank>,
    ) -> bool {
        matches!(bank, RegBank::Temp | RegBank::PrimAttr | RegBank::Output) && index_bank.is_none()
    }
}

struct TextureSample;

impl OpcodeBehavior for TextureSample {
    fn live_chans_in_arg(&self, inst: &InstDef, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
        let params = inst.params().as_smp();
        let used = if smp_args::COORDS.contains(&arg) {
            arg - smp_args::COORDS.start < params.coord_count()
        } else if smp_args::STATE.contains(&arg) {
            true
        } else if arg == smp_args::LOD {
            matches!(params.lod_mode, SmpLodMode::Bias | SmpLodMode::Replace)
        } else if smp_args::GRADS.contains(&arg) {
            params.lod_mode == SmpLodMode::Gradients
                && arg - smp_args::GRADS.start < 2 * usize::from(params.dim.min(3))
        } else {
            arg == smp_args::REPLACE && inst.opcode() == Opcode::SmpReplace
        };
        if used {
            all_if_live(inst, arg, live_dests, ChanMask::ALL)
        } else {
            ChanMask::NONE
        }
    }

    fn can_use_src(
        &self,
        target: &Target,
        _inst: &InstDef,
        arg: usize,
        bank: RegBank,
        index_bank: Option<RegBank>,
    ) -> bool {
        if index_bank.is_some() {
            return false;
        }
        if smp_args::STATE.contains(&arg) {
            // State words past the target's state size must stay unused.
            if arg - smp_args::STATE.start >= usize::from(target.texture_state_words) {
                return bank == RegBank::Unused;
            }
            return matches!(bank, RegBank::Temp | RegBank::PrimAttr | RegBank::SecAttr);
        }
        matches!(bank, RegBank::Temp | RegBank::PrimAttr | RegBank::SecAttr | RegBank::Output)
            || (bank == RegBank::SpecialConst && arg != smp_args::REPLACE)
    }

    fn can_use_dest(
        &self,
        _target: &Target,
        _inst: &InstDef,
        _dest: usize,
        bank: RegBank,
        index_bank: Option<RegBank>,
    ) -> bool {
        matches!(bank, RegBank::Temp | RegBank::PrimAttr | RegBank::Output) && index_bank.is_none()
    }
}

struct DrcSync;

impl OpcodeBehavior for DrcSync {
    fn can_use_src(
        &self,
        _target: &Target,
        _inst: &InstDef,
        _arg: usize,
        bank: RegBank,
        index_bank: Option<RegBank>,
    ) -> bool {
        bank == RegBank::Drc && index_bank.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{SopSel, Swizzle};
    use crate::{Arg, DynIndex};

    fn with_temp_srcs(opcode: Opcode) -> InstDef {
        let mut inst = InstDef::new(opcode);
        if inst.dest_count() > 0 {
            inst.set_dest(0, Arg::temp(0, RegFormat::F32));
        }
        let count = inst.src_count();
        inst.set_srcs(0, Arg::array_set(RegBank::Temp, 2, count as u32, RegFormat::F32));
        inst
    }

    #[test]
    fn generic_bank_legality() {
        let target = Target::SGX543;
        let fadd = with_temp_srcs(Opcode::Fadd);
        assert!(fadd.can_use_src(&target, 0, RegBank::SecAttr, None));
        assert!(fadd.can_use_src(&target, 1, RegBank::Immediate, None));
        assert!(fadd.can_use_src(&target, 1, RegBank::Temp, Some(RegBank::Index)));
        assert!(!fadd.can_use_src(&target, 1, RegBank::SpecialConst, Some(RegBank::Index)));
        assert!(!fadd.can_use_src(&target, 1, RegBank::Temp, Some(RegBank::Temp)));
        assert!(!fadd.can_use_src(&target, 0, RegBank::Predicate, None));
        assert!(!fadd.can_use_dest(&target, 0, RegBank::SecAttr, None));
        assert!(fadd.can_use_dest(&target, 0, RegBank::FpInternal, None));

        let frcp = with_temp_srcs(Opcode::Frcp);
        assert!(!frcp.can_use_src(&target, 0, RegBank::Immediate, None));

        let vmad = with_temp_srcs(Opcode::Vmad);
        assert!(!vmad.can_use_src(&target, 0, RegBank::FpInternal, None));
        assert!(!vmad.can_use_src(&target, 0, RegBank::Temp, Some(RegBank::Index)));
    }

    #[test]
    fn family_bank_legality() {
        let target = Target::SGX543;

        let limm = InstDef::new(Opcode::Limm);
        assert!(limm.can_use_src(&target, 0, RegBank::Immediate, None));
        assert!(!limm.can_use_src(&target, 0, RegBank::Temp, None));
        assert!(InstDef::new(Opcode::Mov).can_use_dest(&target, 0, RegBank::Index, None));
        assert!(!InstDef::new(Opcode::Fadd).can_use_dest(&target, 0, RegBank::Index, None));

        let setp = InstDef::new(Opcode::Setp);
        assert!(setp.can_use_dest(&target, 0, RegBank::Predicate, None));
        assert!(!setp.can_use_dest(&target, 0, RegBank::Temp, None));

        let ldad = InstDef::new(Opcode::Ldad);
        assert!(ldad.can_use_src(&target, mem_args::DRC, RegBank::Drc, None));
        assert!(!ldad.can_use_src(&target, mem_args::BASE, RegBank::Drc, None));
        assert!(ldad.can_use_src(&target, mem_args::OFFSET, RegBank::Immediate, None));
        assert!(!ldad.can_use_src(&target, mem_args::BASE, RegBank::Immediate, None));
        assert!(!InstDef::new(Opcode::Stad).can_use_src(
            &target,
            mem_args::DATA,
            RegBank::Immediate,
            None
        ));

        let smp = InstDef::new(Opcode::Smp);
        assert!(smp.can_use_src(&Target::SGX530, 6, RegBank::SecAttr, None));
        assert!(!smp.can_use_src(&Target::SGX530, 7, RegBank::SecAttr, None));
        assert!(smp.can_use_src(&Target::SGX530, 7, RegBank::Unused, None));
        assert!(smp.can_use_src(&Target::SGX543, 7, RegBank::SecAttr, None));

        let efo = InstDef::new(Opcode::Efo);
        assert!(!efo.can_use_src(&target, 0, RegBank::FpInternal, None));
        assert!(efo.can_use_dest(&target, 0, RegBank::FpInternal, None));

        assert!(InstDef::new(Opcode::Wdf).can_use_src(&target, 0, RegBank::Drc, None));
    }

    #[test]
    fn per_channel_liveness() {
        let fmad = with_temp_srcs(Opcode::Fmad);
        for arg in 0..3 {
            assert_eq!(fmad.live_chans_in_arg(arg, &[ChanMask::Y]), ChanMask::Y);
            assert_eq!(fmad.live_chans_in_arg(arg, &[ChanMask::NONE]), ChanMask::NONE);
        }

        let mut mov = with_temp_srcs(Opcode::Mov);
        mov.set_dest_mask(0, ChanMask::XY);
        assert_eq!(mov.live_chans_in_arg(0, &[ChanMask::ALL]), ChanMask::XY);
    }

    #[test]
    fn f16_sources_read_their_half() {
        let mut fadd = with_temp_srcs(Opcode::Fadd);
        *fadd.src_mut(1) = Arg::temp(9, RegFormat::F16);
        fadd.params_mut().as_float_mut().f16_component[1] = 1;
        assert_eq!(fadd.live_chans_in_arg(1, &[ChanMask::X]), ChanMask::ZW);
        assert_eq!(fadd.live_chans_in_arg(0, &[ChanMask::X]), ChanMask::X);

        let fmad16 = with_temp_srcs(Opcode::Fmad16);
        assert_eq!(fmad16.live_chans_in_arg(2, &[ChanMask::W]), ChanMask::ZW);
    }

    #[test]
    fn dot_products_read_whole_vectors() {
        let vdp3 = with_temp_srcs(Opcode::Vdp3);
        assert_eq!(vdp3.live_chans_in_arg(0, &[ChanMask::X]), ChanMask::XYZ);
        let mut vdp4 = with_temp_srcs(Opcode::Vdp4);
        assert_eq!(vdp4.live_chans_in_arg(1, &[ChanMask::X]), ChanMask::ALL);
        vdp4.params_mut().as_vec_mut().swizzles[1] = Swizzle::splat(2);
        assert_eq!(vdp4.live_chans_in_arg(1, &[ChanMask::X]), ChanMask::Z);
        assert_eq!(vdp4.live_chans_in_arg(1, &[ChanMask::NONE]), ChanMask::NONE);
    }

    #[test]
    fn pack_alternates_sources() {
        let mut pck = with_temp_srcs(Opcode::PckU8F32);
        assert_eq!(pck.live_chans_in_arg(0, &[ChanMask::Z]), ChanMask::ALL);
        assert_eq!(pck.live_chans_in_arg(1, &[ChanMask::Z]), ChanMask::NONE);
        assert_eq!(pck.live_chans_in_arg(1, &[ChanMask::W]), ChanMask::ALL);

        // With only `yz` written, `y` comes from source 0 and `z` from source 1.
        pck.set_dest_mask(0, ChanMask::Y | ChanMask::Z);
        assert_eq!(pck.live_chans_in_arg(0, &[ChanMask::Z]), ChanMask::NONE);
        assert_eq!(pck.live_chans_in_arg(1, &[ChanMask::Z]), ChanMask::ALL);

        let mut unpck = with_temp_srcs(Opcode::UnpckF32U8);
        *unpck.src_mut(0) = Arg::temp(4, RegFormat::U8);
        unpck.params_mut().as_pck_mut().component[0] = 2;
        assert_eq!(unpck.live_chans_in_arg(0, &[ChanMask::X]), ChanMask::Z);
    }

    #[test]
    fn conditional_moves() {
        let movc = with_temp_srcs(Opcode::Movc);
        assert_eq!(movc.live_chans_in_arg(0, &[ChanMask::Y]), ChanMask::ALL);
        assert_eq!(movc.live_chans_in_arg(1, &[ChanMask::Y]), ChanMask::Y);
        assert_eq!(movc.live_chans_in_arg(2, &[ChanMask::Y]), ChanMask::Y);
    }

    #[test]
    fn replicated_vector_results() {
        let mut vrcp = with_temp_srcs(Opcode::Vrcp);
        vrcp.params_mut().as_vec_mut().swizzles[0] = Swizzle([3, 0, 0, 0]);
        assert_eq!(vrcp.live_chans_in_arg(0, &[ChanMask::XYZ]), ChanMask::W);
    }

    #[test]
    fn sop_selectors() {
        let mut sop2 = with_temp_srcs(Opcode::Sop2);
        {
            let params = sop2.params_mut().as_sop_mut();
            params.csel = [SopSel::Src1Alpha, SopSel::One];
            params.asel = [SopSel::One, SopSel::One];
        }
        assert_eq!(sop2.live_chans_in_arg(0, &[ChanMask::X]), ChanMask::X);
        assert_eq!(sop2.live_chans_in_arg(1, &[ChanMask::X]), ChanMask::X | ChanMask::W);

        let mut sop3 = with_temp_srcs(Opcode::Sop3);
        sop3.params_mut().as_sop_mut().asel = [SopSel::Src0, SopSel::Zero];
        assert_eq!(sop3.live_chans_in_arg(0, &[ChanMask::X]), ChanMask::NONE);
        assert_eq!(sop3.live_chans_in_arg(0, &[ChanMask::W]), ChanMask::W);
    }

    #[test]
    fn texture_sample_argument_usage() {
        let mut smp = with_temp_srcs(Opcode::Smp);
        let live = [ChanMask::ALL];
        assert_eq!(smp.live_chans_in_arg(0, &live), ChanMask::ALL);
        assert_eq!(smp.live_chans_in_arg(1, &live), ChanMask::ALL);
        assert_eq!(smp.live_chans_in_arg(2, &live), ChanMask::NONE);
        assert_eq!(smp.live_chans_in_arg(smp_args::LOD, &live), ChanMask::NONE);
        assert_eq!(smp.live_chans_in_arg(smp_args::REPLACE, &live), ChanMask::NONE);
        smp.params_mut().as_smp_mut().projected = true;
        assert_eq!(smp.live_chans_in_arg(2, &live), ChanMask::ALL);

        let grad = with_temp_srcs(Opcode::SmpGrad);
        assert_eq!(grad.live_chans_in_arg(smp_args::GRADS.start + 3, &live), ChanMask::ALL);
        assert_eq!(grad.live_chans_in_arg(smp_args::GRADS.start + 4, &live), ChanMask::NONE);
    }

    #[test]
    fn unrouted_efo_sources_are_dead() {
        let mut efo = with_temp_srcs(Opcode::Efo);
        efo.params_mut().as_efo_mut().m0_srcs = [EfoSrc::Src0, EfoSrc::Src2];
        assert_eq!(efo.live_chans_in_arg(0, &[ChanMask::X]), ChanMask::ALL);
        assert_eq!(efo.live_chans_in_arg(1, &[ChanMask::X]), ChanMask::NONE);
    }

    #[test]
    fn indexed_sources() {
        let mut fadd = with_temp_srcs(Opcode::Fadd);
        let index =
            DynIndex { bank: RegBank::Index, number: 0, array_offset: 0, stride_in_bytes: 4 };
        fadd.set_src(0, Arg::temp(1, RegFormat::F32).with_index(index));
        assert!(fadd.can_use_src(&Target::SGX530, 0, RegBank::Temp, fadd.src(0).index_bank()));
    }
}
