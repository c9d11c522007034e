//! Instructions ([`InstDef`]), and the per-instruction capability queries
//! layered over the static opcode descriptors.

use crate::context::{EntityListLinks, ListMembership};
use crate::desc::{DescFlags, PredicateSupport};
use crate::{
    Arg, ChanMask, Errata, Inst, InstDesc, InstParams, InternedStr, IrError, Opcode, PredSrc,
    RegBank, Target, TargetFeatures, BRN21752_MAX_REPEAT,
};
use bitflags::bitflags;
use smallvec::SmallVec;

bitflags! {
    /// Per-instruction flags (as opposed to the per-opcode [`DescFlags`]).
    ///
    /// There are intentionally no "scratch" bits here, passes needing to mark
    /// instructions should use a [`PassLocal`](crate::PassLocal) side table.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct InstFlags: u32 {
        /// Predicates gate individual destination channels, instead of the
        /// whole instruction (see [`InstDef::make_predicate_per_chan`]).
        const PER_CHAN_PRED = 1 << 0;
        /// Don't execute for invalid (i.e. helper) instances.
        const SKIP_INVALID = 1 << 1;
        const SYNC_START = 1 << 2;
        const NO_SCHED = 1 << 3;
        const END = 1 << 4;
        /// Only executed once (not per instance).
        const ONE_SHOT = 1 << 5;
        /// Loads previously spilled data.
        const FETCH = 1 << 6;
        /// Stores data to be later fetched.
        const SPILL = 1 << 7;
        /// Sources are individually F16/F32-selected (see `DescFlags::F16F32_SELECT`).
        const FORMAT_SELECT = 1 << 8;
        const MOE_SWIZZLE = 1 << 9;
    }
}

/// Source location an instruction was generated from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DebugLoc {
    pub file: InternedStr,
    pub line: u32,
}

/// One destination of an instruction, and its associated masks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DestSlot {
    pub arg: Arg,

    /// For partial writes, the register providing the channels that aren't
    /// written (i.e. those outside the destination mask).
    pub old: Option<Arg>,

    /// Channels written (only meaningful for `DEST_MASKABLE` opcodes,
    /// see [`InstDef::dest_mask`]).
    pub mask: ChanMask,

    /// Channels live after this instruction, as computed by liveness.
    pub live_chans: ChanMask,
}

impl Default for DestSlot {
    fn default() -> Self {
        Self { arg: Arg::UNUSED, old: None, mask: ChanMask::ALL, live_chans: ChanMask::ALL }
    }
}

/// Links tying several instructions into one unit, which scheduling must
/// never split up.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InstGroupLinks {
    pub parent: Option<Inst>,
    pub next: Option<Inst>,
    pub child_index: u32,
}

/// Definition for an [`Inst`]: an opcode, its operands, and everything else
/// later passes need to reason about it.
///
/// The shape of the operand arrays (and the [`InstParams`] variant) always
/// follows the opcode, which is why the opcode can only be changed via
/// [`Program::set_opcode`](crate::Program::set_opcode).
#[derive(Clone, Debug)]
pub struct InstDef {
    opcode: Opcode,
    pub flags: InstFlags,

    dests: SmallVec<[DestSlot; 1]>,
    srcs: SmallVec<[Arg; 4]>,
    // NOTE `None` slots only occur before the last predicate (per-channel
    // predication leaving some channels unpredicated).
    preds: SmallVec<[Option<PredSrc>; 1]>,

    repeat_count: u8,
    // NOTE `0` means "no mask", i.e. every repeat executes.
    repeat_mask: u8,

    params: InstParams,

    /// Id reserved for use by a single pass (e.g. dependency graph or live
    /// interval numbering), independent of the stable [`Inst::id`].
    pub pass_id: Option<u32>,

    pub debug_loc: Option<DebugLoc>,

    pub group: InstGroupLinks,

    pub(crate) block: Option<crate::Block>,
    pub(crate) block_index: u64,

    pub(crate) block_links: EntityListLinks<Inst>,
    pub(crate) opcode_links: EntityListLinks<Inst>,
    pub(crate) worklist_links: EntityListLinks<Inst>,
    pub(crate) scratch_links: EntityListLinks<Inst>,
}

macro_rules! inst_memberships {
    ($($(#[$attr:meta])* $name:ident => $field:ident),+ $(,)?) => {
        $(
            $(#[$attr])*
            pub enum $name {}

            impl ListMembership for $name {
                type Entity = Inst;

                const NAME: &'static str = stringify!($name);

                fn links(def: &InstDef) -> &EntityListLinks<Inst> {
                    &def.$field
                }
                fn links_mut(def: &mut InstDef) -> &mut EntityListLinks<Inst> {
                    &mut def.$field
                }
            }
        )+
    };
}

inst_memberships! {
    /// Ordered instruction list of a basic block.
    InBlock => block_links,
    /// Per-opcode list of all instructions in a `Program`.
    InOpcodeList => opcode_links,
    /// Available-instruction worklist (for list scheduling).
    InWorklist => worklist_links,
    /// Temporary list, for any pass to use.
    InScratch => scratch_links,
}

impl InstDef {
    /// Create a detached instruction with all its operands unused, and the
    /// default parameters for `opcode`.
    pub fn new(opcode: Opcode) -> Self {
        let mut def = InstDef {
            opcode,
            flags: InstFlags::empty(),
            dests: SmallVec::new(),
            srcs: SmallVec::new(),
            preds: SmallVec::new(),
            repeat_count: 1,
            repeat_mask: 0,
            params: InstParams::None,
            pass_id: None,
            debug_loc: None,
            group: InstGroupLinks::default(),
            block: None,
            block_index: 0,
            block_links: EntityListLinks::default(),
            opcode_links: EntityListLinks::default(),
            worklist_links: EntityListLinks::default(),
            scratch_links: EntityListLinks::default(),
        };
        def.reshape_for(opcode);
        def
    }

    /// Change the opcode, reshaping everything that depends on it.
    ///
    /// Operands in slots that exist for both opcodes are kept, new slots are
    /// left unused, and parameters are reset to the defaults for `opcode`.
    /// Repeats are clamped to the descriptor's maximum (and converted to a
    /// mask for mask-only opcodes), while predicates the new opcode can't
    /// encode are dropped.
    ///
    /// Target-dependent repeat limits are left to the caller (see
    /// [`InstDef::clamp_repeat`]).
    pub(crate) fn reshape_for(&mut self, opcode: Opcode) {
        let desc = opcode.desc();
        self.opcode = opcode;

        self.dests.resize(usize::from(desc.dest_count), DestSlot::default());
        self.srcs.resize(usize::from(desc.default_arg_count), Arg::UNUSED);
        self.params = InstParams::for_opcode(opcode);

        self.clamp_repeat(desc.max_repeat);

        let support = desc.predicate_support;
        match support.max_pred_reg() {
            Some(max) if self.predicates().all(|pred| pred.reg <= max) => {}
            _ => self.preds.clear(),
        }
        if !support.per_chan() {
            self.preds.truncate(1);
            self.flags.remove(InstFlags::PER_CHAN_PRED);
        }
        self.trim_predicates();
    }

    /// Copy everything but list membership (which starts out detached).
    pub(crate) fn detached_copy(&self) -> Self {
        InstDef {
            group: InstGroupLinks::default(),
            block: None,
            block_index: 0,
            block_links: EntityListLinks::default(),
            opcode_links: EntityListLinks::default(),
            worklist_links: EntityListLinks::default(),
            scratch_links: EntityListLinks::default(),
            ..self.clone()
        }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn desc(&self) -> &'static InstDesc {
        self.opcode.desc()
    }

    pub fn params(&self) -> &InstParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut InstParams {
        &mut self.params
    }

    /// The block this instruction is currently inserted in, if any.
    pub fn block(&self) -> Option<crate::Block> {
        self.block
    }

    /// Position in the containing block, increasing from first to last
    /// instruction (but not necessarily contiguous).
    pub fn block_index(&self) -> Option<u64> {
        self.block.map(|_| self.block_index)
    }

    pub fn is_in_worklist(&self) -> bool {
        self.worklist_links.is_attached()
    }

    pub fn is_in_scratch_list(&self) -> bool {
        self.scratch_links.is_attached()
    }
}

/// Operand accessors.
impl InstDef {
    #[track_caller]
    fn check_dest(&self, dest: usize) {
        assert!(
            dest < self.dests.len(),
            "`{}` has {} destination(s), no destination {dest}",
            self.opcode.mnemonic(),
            self.dests.len()
        );
    }

    #[track_caller]
    fn check_src(&self, arg: usize) {
        assert!(
            arg < self.srcs.len(),
            "`{}` has {} source(s), no source {arg}",
            self.opcode.mnemonic(),
            self.srcs.len()
        );
    }

    pub fn dest_count(&self) -> usize {
        self.dests.len()
    }

    pub fn dests(&self) -> impl ExactSizeIterator<Item = &Arg> + Clone {
        self.dests.iter().map(|slot| &slot.arg)
    }

    #[track_caller]
    pub fn dest(&self, dest: usize) -> &Arg {
        self.check_dest(dest);
        &self.dests[dest].arg
    }

    #[track_caller]
    pub fn dest_mut(&mut self, dest: usize) -> &mut Arg {
        self.check_dest(dest);
        &mut self.dests[dest].arg
    }

    #[track_caller]
    pub fn set_dest(&mut self, dest: usize, arg: Arg) {
        *self.dest_mut(dest) = arg;
    }

    #[track_caller]
    pub fn dest_slot(&self, dest: usize) -> &DestSlot {
        self.check_dest(dest);
        &self.dests[dest]
    }

    #[track_caller]
    pub fn dest_slot_mut(&mut self, dest: usize) -> &mut DestSlot {
        self.check_dest(dest);
        &mut self.dests[dest]
    }

    #[track_caller]
    pub fn old_dest(&self, dest: usize) -> Option<&Arg> {
        self.dest_slot(dest).old.as_ref()
    }

    #[track_caller]
    pub fn set_old_dest(&mut self, dest: usize, old: Option<Arg>) {
        self.dest_slot_mut(dest).old = old;
    }

    pub fn src_count(&self) -> usize {
        self.srcs.len()
    }

    pub fn srcs(&self) -> &[Arg] {
        &self.srcs
    }

    #[track_caller]
    pub fn src(&self, arg: usize) -> &Arg {
        self.check_src(arg);
        &self.srcs[arg]
    }

    #[track_caller]
    pub fn src_mut(&mut self, arg: usize) -> &mut Arg {
        self.check_src(arg);
        &mut self.srcs[arg]
    }

    /// Replace source `arg`. Repeat limits depending on operands aren't
    /// rechecked here, see [`InstDef::check_repeat`].
    #[track_caller]
    pub fn set_src(&mut self, arg: usize, src: Arg) {
        *self.src_mut(arg) = src;
    }

    /// Set consecutive sources, starting at `first`.
    #[track_caller]
    pub fn set_srcs(&mut self, first: usize, srcs: impl IntoIterator<Item = Arg>) {
        for (i, src) in srcs.into_iter().enumerate() {
            self.set_src(first + i, src);
        }
    }

    /// All operands (destinations, old destinations and sources).
    pub fn all_args(&self) -> impl Iterator<Item = &Arg> + Clone {
        self.dests
            .iter()
            .flat_map(|slot| [Some(&slot.arg), slot.old.as_ref()].into_iter().flatten())
            .chain(&self.srcs)
    }
}

/// Predication.
impl InstDef {
    pub fn predicate_support(&self) -> PredicateSupport {
        self.desc().predicate_support
    }

    pub fn is_predicated(&self) -> bool {
        !self.preds.is_empty()
    }

    /// Every predicate set, in slot order.
    pub fn predicates(&self) -> impl Iterator<Item = &PredSrc> + Clone {
        self.preds.iter().flatten()
    }

    pub(crate) fn predicates_mut(&mut self) -> impl Iterator<Item = &mut PredSrc> {
        self.preds.iter_mut().flatten()
    }

    /// Predicate slots, up to the last one set (with per-channel predicates,
    /// slot `i` gates destination channel `i`).
    pub fn predicate_slots(&self) -> &[Option<PredSrc>] {
        &self.preds
    }

    /// Predicate `index` (with `0` being the primary predicate), if set.
    pub fn predicate(&self, index: usize) -> Option<PredSrc> {
        self.preds.get(index).copied().flatten()
    }

    pub fn is_predicate_per_chan(&self) -> bool {
        self.flags.contains(InstFlags::PER_CHAN_PRED)
    }

    fn check_predicate_reg(&self, reg: u32) -> Result<(), IrError> {
        let opcode = self.opcode;
        match self.predicate_support().max_pred_reg() {
            None => Err(IrError::PredicateUnsupported { opcode }),
            Some(max) if reg > max => Err(IrError::PredicateRegOutOfRange { opcode, reg, max }),
            Some(_) => Ok(()),
        }
    }

    fn check_per_chan_predicates(&self, target: &Target) -> Result<(), IrError> {
        if self.predicate_support().per_chan() && target.supports(TargetFeatures::VECTOR_PREDICATES)
        {
            Ok(())
        } else {
            Err(IrError::PerChanPredicateUnsupported { opcode: self.opcode, core: target.core })
        }
    }

    fn trim_predicates(&mut self) {
        while matches!(self.preds.last(), Some(None)) {
            self.preds.pop();
        }
        if self.preds.is_empty() {
            self.flags.remove(InstFlags::PER_CHAN_PRED);
        }
    }

    /// Replace all predicates with just `p{reg}` (negated if `negate`),
    /// gating the whole instruction.
    pub fn set_predicate(&mut self, reg: u32, negate: bool) -> Result<(), IrError> {
        self.check_predicate_reg(reg)?;
        self.preds.clear();
        self.preds.push(Some(PredSrc { reg, negate }));
        self.flags.remove(InstFlags::PER_CHAN_PRED);
        Ok(())
    }

    /// Set predicate `index`, keeping all others. Any `index` other than `0`
    /// needs per-channel predicate support, from both opcode and `target`.
    #[track_caller]
    pub fn set_predicate_at(
        &mut self,
        target: &Target,
        index: usize,
        reg: u32,
        negate: bool,
    ) -> Result<(), IrError> {
        assert!(index < ChanMask::CHAN_COUNT, "no predicate {index} (at most one per channel)");
        self.check_predicate_reg(reg)?;
        if index > 0 {
            self.check_per_chan_predicates(target)?;
        }
        if self.preds.len() <= index {
            self.preds.resize(index + 1, None);
        }
        self.preds[index] = Some(PredSrc { reg, negate });
        Ok(())
    }

    /// Reset predicate `index` only (a no-op if it wasn't set).
    pub fn clear_predicate(&mut self, index: usize) {
        if let Some(slot) = self.preds.get_mut(index) {
            *slot = None;
        }
        self.trim_predicates();
    }

    pub fn clear_predicates(&mut self) {
        self.preds.clear();
        self.flags.remove(InstFlags::PER_CHAN_PRED);
    }

    pub fn make_predicate_per_chan(&mut self, target: &Target) -> Result<(), IrError> {
        self.check_per_chan_predicates(target)?;
        self.flags.insert(InstFlags::PER_CHAN_PRED);
        Ok(())
    }
}

/// Destination masks and liveness.
impl InstDef {
    /// Channels of destination `dest` actually written (always all of them
    /// for opcodes that can't mask their destination).
    #[track_caller]
    pub fn dest_mask(&self, dest: usize) -> ChanMask {
        let slot = self.dest_slot(dest);
        if self.desc().flags.contains(DescFlags::DEST_MASKABLE) {
            slot.mask
        } else {
            ChanMask::ALL
        }
    }

    #[track_caller]
    pub fn set_dest_mask(&mut self, dest: usize, mask: ChanMask) {
        self.dest_slot_mut(dest).mask = mask;
    }

    /// Widen `requested` to the smallest mask destination `dest` can be
    /// encoded with.
    #[track_caller]
    pub fn minimal_dest_mask(&self, dest: usize, requested: ChanMask) -> ChanMask {
        self.check_dest(dest);
        self.desc().mask_granularity.expand(requested)
    }

    #[track_caller]
    pub fn live_chans_in_dest(&self, dest: usize) -> ChanMask {
        self.dest_slot(dest).live_chans
    }

    #[track_caller]
    pub fn set_live_chans_in_dest(&mut self, dest: usize, live: ChanMask) {
        self.dest_slot_mut(dest).live_chans = live;
    }

    /// Live channels of every destination, as recorded by liveness.
    pub fn live_dest_masks(&self) -> SmallVec<[ChanMask; 2]> {
        self.dests.iter().map(|slot| slot.live_chans).collect()
    }

    /// Whether every channel live in destination `dest` is written.
    #[track_caller]
    pub fn wrote_all_live_channels(&self, dest: usize) -> bool {
        self.dest_mask(dest).contains(self.live_chans_in_dest(dest))
    }
}

/// Repeats.
impl InstDef {
    pub fn can_repeat(&self) -> bool {
        self.desc().flags.contains(DescFlags::REPEAT)
    }

    pub fn can_use_repeat_mask(&self) -> bool {
        self.desc().flags.contains(DescFlags::REPEAT_MASK)
    }

    /// Whether repeats can *only* be expressed via a repeat mask.
    pub fn use_repeat_mask_only(&self) -> bool {
        self.desc().flags.contains(DescFlags::REPEAT_MASK_ONLY)
    }

    pub fn repeat_count(&self) -> u8 {
        self.repeat_count
    }

    pub fn repeat_mask(&self) -> Option<u8> {
        Some(self.repeat_mask).filter(|&mask| mask != 0)
    }

    /// Whether any operand is affected by `Errata::BRN21752`.
    fn touches_brn21752(&self) -> bool {
        self.all_args().any(|arg| arg.bank == RegBank::FpInternal || arg.index.is_some())
    }

    /// Maximum repeat count on `target`, taking errata into account.
    pub fn max_repeat_count(&self, target: &Target) -> u8 {
        let max = self.desc().max_repeat;
        if target.has_erratum(Errata::BRN21752) && self.touches_brn21752() {
            max.min(BRN21752_MAX_REPEAT)
        } else {
            max
        }
    }

    /// Set the repeat count, which must be within `1..=max_repeat_count`.
    ///
    /// For mask-only opcodes, without a mask this also sets the mask (to
    /// execute every repeat), while an existing mask must imply `count`.
    pub fn set_repeat_count(&mut self, target: &Target, count: u8) -> Result<(), IrError> {
        let opcode = self.opcode;
        let max = self.max_repeat_count(target);
        if count > 1 && !self.can_repeat() {
            return Err(IrError::RepeatUnsupported { opcode });
        }
        if count == 0 || count > max {
            return Err(IrError::RepeatCountOutOfRange { opcode, count, max });
        }

        if let Some(mask) = self.repeat_mask() {
            let implied = implied_repeat_count(mask);
            if implied > count || (self.use_repeat_mask_only() && implied != count) {
                return Err(IrError::RepeatCountMismatchesMask { opcode, count, mask });
            }
        } else if self.use_repeat_mask_only() && count > 1 {
            self.repeat_mask = repeat_mask_for_count(count);
        }

        self.repeat_count = count;
        Ok(())
    }

    /// Set (or, with `0`, clear) the repeat mask, which also sets the repeat
    /// count to the one implied by the mask.
    pub fn set_repeat_mask(&mut self, target: &Target, mask: u8) -> Result<(), IrError> {
        let opcode = self.opcode;
        if !self.can_use_repeat_mask() {
            return Err(IrError::RepeatMaskUnsupported { opcode });
        }

        if mask == 0 {
            self.repeat_mask = 0;
            if self.use_repeat_mask_only() {
                self.repeat_count = 1;
            }
            return Ok(());
        }

        let count = implied_repeat_count(mask);
        let max = self.max_repeat_count(target);
        if count > max {
            return Err(IrError::RepeatCountOutOfRange { opcode, count, max });
        }
        self.repeat_mask = mask;
        self.repeat_count = count;
        Ok(())
    }

    pub fn clear_repeat(&mut self) {
        self.repeat_count = 1;
        self.repeat_mask = 0;
    }

    /// Bring the repeat count (and mask) within `1..=max`, dropping repeats
    /// (and mask bits) past `max`, and giving mask-only opcodes the mask
    /// equivalent of their count.
    pub fn clamp_repeat(&mut self, max: u8) {
        let max = if self.can_repeat() { max.max(1) } else { 1 };
        if !self.can_use_repeat_mask() {
            self.repeat_mask = 0;
        }
        self.repeat_mask &= repeat_mask_for_count(max);
        self.repeat_count = self.repeat_count.clamp(1, max);

        if self.use_repeat_mask_only() {
            if self.repeat_mask == 0 && self.repeat_count > 1 {
                self.repeat_mask = repeat_mask_for_count(self.repeat_count);
            }
            self.repeat_count = self.repeat_mask().map_or(1, implied_repeat_count);
        } else if let Some(mask) = self.repeat_mask() {
            self.repeat_count = self.repeat_count.max(implied_repeat_count(mask));
        }
    }

    /// Check the repeat count against `max_repeat_count`, which (unlike the
    /// checks in `set_repeat_count`) also accounts for operands changed since.
    pub fn check_repeat(&self, target: &Target) -> Result<(), IrError> {
        let max = self.max_repeat_count(target);
        if self.repeat_count > max {
            return Err(IrError::RepeatCountOutOfRange {
                opcode: self.opcode,
                count: self.repeat_count,
                max,
            });
        }
        Ok(())
    }
}

/// Repeat count implied by a (non-zero) repeat mask, i.e. up to (and
/// including) its highest set bit.
pub fn implied_repeat_count(mask: u8) -> u8 {
    (u8::BITS - mask.leading_zeros()) as u8
}

/// Repeat mask executing each of the first `count` repeats.
fn repeat_mask_for_count(count: u8) -> u8 {
    u8::try_from((1u32 << u32::from(count).min(u8::BITS)) - 1).unwrap_or(u8::MAX)
}

/// Capability queries.
impl InstDef {
    pub fn is_available_on(&self, target: &Target) -> bool {
        self.desc().is_available_on(target)
    }

    pub fn supports_end_flag(&self) -> bool {
        self.desc().flags.contains(DescFlags::END_FLAG)
    }

    pub fn supports_sync_start(&self) -> bool {
        self.desc().flags.contains(DescFlags::SYNC_START)
    }

    pub fn supports_no_schedule(&self) -> bool {
        self.desc().flags.contains(DescFlags::NO_SCHED)
    }

    pub fn has_side_effects(&self) -> bool {
        self.desc().flags.contains(DescFlags::SIDE_EFFECTS)
    }

    /// Whether the hardware may switch to another task after this
    /// instruction (so e.g. internal registers don't survive across it).
    pub fn is_descheduling_point(&self) -> bool {
        self.desc().flags.contains(DescFlags::DESCHEDULE) || self.flags.contains(InstFlags::END)
    }

    pub fn supports_per_inst_moe_increments(&self, target: &Target) -> bool {
        target.supports(TargetFeatures::PER_INST_MOE_INCREMENTS)
            && self.desc().flags.contains(DescFlags::MOE_INCREMENTS)
    }

    /// Whether `number` fits in the register number field of a destination
    /// (if `is_dest`) or source.
    pub fn fits_register_number(&self, is_dest: bool, number: u32) -> bool {
        let desc = self.desc();
        let bits = if is_dest { desc.dest_reg_bits } else { desc.src_reg_bits };
        u64::from(number) < (1u64 << bits)
    }

    /// Whether `bank` (dynamically indexed by `index_bank`, if any) is legal
    /// for source `arg`.
    #[track_caller]
    pub fn can_use_src(
        &self,
        target: &Target,
        arg: usize,
        bank: RegBank,
        index_bank: Option<RegBank>,
    ) -> bool {
        self.check_src(arg);
        self.desc().family.behavior().can_use_src(target, self, arg, bank, index_bank)
    }

    /// Whether `bank` (dynamically indexed by `index_bank`, if any) is legal
    /// for destination `dest`.
    #[track_caller]
    pub fn can_use_dest(
        &self,
        target: &Target,
        dest: usize,
        bank: RegBank,
        index_bank: Option<RegBank>,
    ) -> bool {
        self.check_dest(dest);
        self.desc().family.behavior().can_use_dest(target, self, dest, bank, index_bank)
    }

    pub fn commutable_pairs(&self) -> &'static [(u8, u8)] {
        self.desc().commutable
    }

    pub fn are_args_commutable(&self, a: usize, b: usize) -> bool {
        self.commutable_pairs().iter().any(|&(x, y)| {
            let (x, y) = (usize::from(x), usize::from(y));
            (x, y) == (a, b) || (y, x) == (a, b)
        })
    }

    /// Swap sources `a` and `b` (along with any per-source parameters),
    /// returning `false` (and leaving `self` unchanged) if they don't commute.
    pub fn swap_commutable_args(&mut self, a: usize, b: usize) -> bool {
        if !self.are_args_commutable(a, b) {
            return false;
        }
        self.srcs.swap(a, b);
        match &mut self.params {
            InstParams::Float(params) => {
                params.src_mods.swap(a, b);
                params.f16_component.swap(a, b);
            }
            InstParams::Vec(params) => {
                params.swizzles.swap(a, b);
                params.src_mods.swap(a, b);
                params.src_formats.swap(a, b);
            }
            _ => {}
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RegFormat, Target};

    fn fmad() -> InstDef {
        let mut inst = InstDef::new(Opcode::Fmad);
        inst.set_dest(0, Arg::temp(0, RegFormat::F32));
        inst.set_srcs(0, Arg::array_set(RegBank::Temp, 1, 3, RegFormat::F32));
        inst
    }

    #[test]
    fn new_inst_follows_descriptor() {
        for &opcode in Opcode::ALL {
            let inst = InstDef::new(opcode);
            assert_eq!(inst.dest_count(), usize::from(opcode.desc().dest_count));
            assert_eq!(inst.src_count(), usize::from(opcode.desc().default_arg_count));
            assert!(inst.params().matches_opcode(opcode));
            assert!(inst.srcs().iter().all(Arg::is_unused));
        }
    }

    #[test]
    fn reshape_keeps_common_operands() {
        let mut inst = fmad();
        inst.params_mut().as_float_mut().saturate = true;
        inst.reshape_for(Opcode::Fadd);
        assert_eq!(inst.src_count(), 2);
        assert_eq!(*inst.src(1), Arg::temp(2, RegFormat::F32));
        assert!(!inst.params().as_float().saturate);

        inst.reshape_for(Opcode::Stad);
        assert_eq!(inst.dest_count(), 0);
        assert_eq!(inst.src_count(), 3);
        assert!(inst.src(2).is_unused());
    }

    #[test]
    #[should_panic(expected = "`fadd` has 2 source(s), no source 2")]
    fn out_of_range_source_panics() {
        InstDef::new(Opcode::Fadd).src(2);
    }

    #[test]
    fn dest_mask_is_normalized_for_unmaskable() {
        let mut inst = fmad();
        inst.set_dest_mask(0, ChanMask::X);
        assert_eq!(inst.dest_mask(0), ChanMask::ALL);

        let mut mov = InstDef::new(Opcode::Mov);
        mov.set_dest_mask(0, ChanMask::XY);
        assert_eq!(mov.dest_mask(0), ChanMask::XY);
        mov.set_live_chans_in_dest(0, ChanMask::Y);
        assert!(mov.wrote_all_live_channels(0));
        mov.set_live_chans_in_dest(0, ChanMask::XYZ);
        assert!(!mov.wrote_all_live_channels(0));
    }

    #[test]
    fn minimal_dest_mask_granularity() {
        let fmad16 = InstDef::new(Opcode::Fmad16);
        assert_eq!(fmad16.minimal_dest_mask(0, ChanMask::Z), ChanMask::ZW);
        assert_eq!(fmad().minimal_dest_mask(0, ChanMask::Z), ChanMask::ALL);
        assert_eq!(InstDef::new(Opcode::Mov).minimal_dest_mask(0, ChanMask::Z), ChanMask::Z);
    }

    #[test]
    fn predicates() {
        let target = Target::SGX543;
        let mut inst = InstDef::new(Opcode::Vmad);
        assert!(!inst.is_predicated());
        inst.set_predicate(1, true).unwrap();
        assert_eq!(inst.predicate(0), Some(PredSrc { reg: 1, negate: true }));
        inst.set_predicate_at(&target, 3, 2, false).unwrap();
        inst.make_predicate_per_chan(&target).unwrap();
        assert_eq!(inst.predicate_slots().len(), 4);
        assert_eq!(inst.predicates().count(), 2);
        assert!(inst.is_predicate_per_chan());

        // Only the cleared slot goes away.
        inst.clear_predicate(0);
        assert_eq!(inst.predicate(0), None);
        assert_eq!(inst.predicate(3), Some(PredSrc { reg: 2, negate: false }));
        assert!(inst.is_predicated());
        assert!(inst.is_predicate_per_chan());

        inst.set_predicate_at(&target, 1, 0, false).unwrap();
        inst.clear_predicate(3);
        assert_eq!(inst.predicate_slots(), [None, Some(PredSrc { reg: 0, negate: false })]);

        inst.clear_predicates();
        assert!(!inst.is_predicated());
        assert!(!inst.is_predicate_per_chan());
    }

    #[test]
    fn predicate_legality() {
        let target = Target::SGX543;
        assert_eq!(
            InstDef::new(Opcode::Wdf).set_predicate(3, false),
            Err(IrError::PredicateUnsupported { opcode: Opcode::Wdf })
        );

        let mut sop2 = InstDef::new(Opcode::Sop2);
        assert_eq!(sop2.set_predicate(0, true), Ok(()));
        assert_eq!(
            sop2.set_predicate(1, false),
            Err(IrError::PredicateRegOutOfRange { opcode: Opcode::Sop2, reg: 1, max: 0 })
        );
        assert_eq!(sop2.predicate(0), Some(PredSrc { reg: 0, negate: true }));

        let mut fmad = fmad();
        assert_eq!(fmad.set_predicate_at(&target, 0, 3, false), Ok(()));
        assert_eq!(
            fmad.set_predicate_at(&target, 1, 3, false),
            Err(IrError::PerChanPredicateUnsupported { opcode: Opcode::Fmad, core: target.core })
        );
        assert!(fmad.make_predicate_per_chan(&target).is_err());
        assert!(!fmad.is_predicate_per_chan());

        // Texture samples may be predicated, for a later expansion to honor.
        assert_eq!(InstDef::new(Opcode::Smp).set_predicate(2, false), Ok(()));
    }

    #[test]
    fn per_chan_predicates_need_target_support() {
        let mut vmad = InstDef::new(Opcode::Vmad);
        let target = Target { features: TargetFeatures::VECTOR_INSTRUCTIONS, ..Target::SGX543 };
        assert_eq!(
            vmad.make_predicate_per_chan(&target),
            Err(IrError::PerChanPredicateUnsupported { opcode: Opcode::Vmad, core: target.core })
        );
        assert!(vmad.set_predicate_at(&target, 2, 1, false).is_err());
        assert!(!vmad.is_predicated());
        assert_eq!(vmad.make_predicate_per_chan(&Target::SGX543), Ok(()));
    }

    #[test]
    fn reshape_drops_unencodable_predicates() {
        let target = Target::SGX543;
        let mut vmad = InstDef::new(Opcode::Vmad);
        vmad.set_predicate_at(&target, 2, 3, false).unwrap();
        vmad.make_predicate_per_chan(&target).unwrap();
        vmad.reshape_for(Opcode::Fmad);
        assert!(!vmad.is_predicated());
        assert!(!vmad.is_predicate_per_chan());

        let mut fmad = fmad();
        fmad.set_predicate(2, true).unwrap();
        fmad.reshape_for(Opcode::Efo);
        assert!(!fmad.is_predicated());

        let mut fmad = self::fmad();
        fmad.set_predicate(0, true).unwrap();
        fmad.reshape_for(Opcode::Efo);
        assert_eq!(fmad.predicate(0), Some(PredSrc { reg: 0, negate: true }));
    }

    #[test]
    fn reshape_clamps_repeats() {
        let mut inst = fmad();
        inst.set_repeat_count(&Target::SGX543, 16).unwrap();
        inst.reshape_for(Opcode::Vmad);
        assert_eq!(inst.repeat_count(), 4);
        assert_eq!(inst.repeat_mask(), None);

        let mut inst = fmad();
        inst.set_repeat_count(&Target::SGX543, 3).unwrap();
        inst.reshape_for(Opcode::Fdsx);
        assert_eq!(inst.repeat_count(), 3);
        assert_eq!(inst.repeat_mask(), Some(0b111));

        let mut inst = fmad();
        inst.set_repeat_mask(&Target::SGX543, 0b1010_0001).unwrap();
        inst.reshape_for(Opcode::Fdsy);
        assert_eq!(inst.repeat_mask(), Some(0b0001));
        assert_eq!(inst.repeat_count(), 1);

        inst.set_repeat_count(&Target::SGX543, 4).unwrap_err();
        inst.reshape_for(Opcode::Ldad);
        assert_eq!((inst.repeat_count(), inst.repeat_mask()), (1, None));
    }

    #[test]
    fn operand_changes_are_caught_by_check_repeat() {
        let mut inst = fmad();
        inst.set_repeat_count(&Target::SGX530, 16).unwrap();
        assert_eq!(inst.check_repeat(&Target::SGX530), Ok(()));

        inst.set_src(1, Arg::new(RegBank::FpInternal, 1, RegFormat::F32));
        assert_eq!(
            inst.check_repeat(&Target::SGX530),
            Err(IrError::RepeatCountOutOfRange { opcode: Opcode::Fmad, count: 16, max: 4 })
        );
        assert_eq!(inst.check_repeat(&Target::SGX543), Ok(()));

        inst.clamp_repeat(inst.max_repeat_count(&Target::SGX530));
        assert_eq!(inst.repeat_count(), 4);
    }

    #[test]
    fn brn21752_limits_repeats() {
        let mut inst = fmad();
        assert_eq!(inst.max_repeat_count(&Target::SGX530), 16);

        inst.set_src(2, Arg::new(RegBank::FpInternal, 0, RegFormat::F32));
        assert_eq!(inst.max_repeat_count(&Target::SGX530), BRN21752_MAX_REPEAT);
        assert_eq!(inst.max_repeat_count(&Target::SGX543), 16);
        assert_eq!(
            inst.set_repeat_count(&Target::SGX530, 8),
            Err(IrError::RepeatCountOutOfRange { opcode: Opcode::Fmad, count: 8, max: 4 })
        );
        assert_eq!(inst.set_repeat_count(&Target::SGX543, 8), Ok(()));
    }

    #[test]
    fn repeats_of_unrepeatable_opcodes() {
        let mut inst = InstDef::new(Opcode::Ldad);
        assert!(!inst.can_repeat());
        assert_eq!(inst.set_repeat_count(&Target::SGX545, 1), Ok(()));
        assert_eq!(
            inst.set_repeat_count(&Target::SGX545, 2),
            Err(IrError::RepeatUnsupported { opcode: Opcode::Ldad })
        );
        assert_eq!(
            inst.set_repeat_mask(&Target::SGX545, 0b11),
            Err(IrError::RepeatMaskUnsupported { opcode: Opcode::Ldad })
        );
    }

    #[test]
    fn mask_only_repeats() {
        let target = Target::SGX543;
        let mut inst = InstDef::new(Opcode::Fdsx);
        assert!(inst.use_repeat_mask_only());

        inst.set_repeat_count(&target, 3).unwrap();
        assert_eq!(inst.repeat_mask(), Some(0b111));

        inst.set_repeat_mask(&target, 0b1001).unwrap();
        assert_eq!(inst.repeat_count(), 4);
        assert_eq!(
            inst.set_repeat_count(&target, 2),
            Err(IrError::RepeatCountMismatchesMask { opcode: Opcode::Fdsx, count: 2, mask: 0b1001 })
        );
        assert_eq!(inst.repeat_count(), 4);
        inst.set_repeat_count(&target, 4).unwrap();
        assert_eq!(inst.repeat_mask(), Some(0b1001));
    }

    #[test]
    fn register_number_widths() {
        let limm = InstDef::new(Opcode::Limm);
        assert!(limm.fits_register_number(false, u32::MAX));
        assert!(limm.fits_register_number(true, 255));
        assert!(!limm.fits_register_number(true, 256));
        assert!(!fmad().fits_register_number(false, 128));
    }

    #[test]
    fn commutable_swap() {
        let mut inst = fmad();
        inst.params_mut().as_float_mut().src_mods[0] = crate::params::FloatSrcMod::NONE.negated();
        assert!(!inst.swap_commutable_args(1, 2));
        assert!(inst.swap_commutable_args(1, 0));
        assert_eq!(*inst.src(0), Arg::temp(2, RegFormat::F32));
        assert!(inst.params().as_float().src_mods[1].negate);
        assert!(!InstDef::new(Opcode::Fsub).are_args_commutable(0, 1));
    }

    #[test]
    fn descheduling_points() {
        assert!(InstDef::new(Opcode::Smp).is_descheduling_point());
        assert!(InstDef::new(Opcode::Wdf).is_descheduling_point());
        assert!(!fmad().is_descheduling_point());
        assert!(fmad().supports_per_inst_moe_increments(&Target::SGX543));
        assert!(!fmad().supports_per_inst_moe_increments(&Target::SGX530));
    }
}
