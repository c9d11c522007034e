//! Register groups, i.e. runs of operands the hardware requires to be in
//! consecutive (and possibly aligned) registers.
//!
//! Groups are derived from the MOE remapping of each opcode's descriptor
//! (see [`MoeOperand`]), adjusted for the parameters of the instruction and
//! the target, so register allocation and encoding never need to look at the
//! remapping tables themselves.

use crate::desc::{smp_args, HwRegAlign, MoeOperand};
use crate::{Arg, InstDef, Target};
use arrayvec::ArrayVec;
use std::ops::Range;

/// Maximum number of source groups of any instruction (one per MOE slot).
pub const MAX_SRC_GROUPS: usize = 3;

/// Maximum number of destination groups of any instruction.
pub const MAX_DEST_GROUPS: usize = 1;

/// One run of arguments (or destinations) occupying consecutive registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegGroup {
    pub start: usize,
    pub count: usize,
    pub align: HwRegAlign,

    /// The destination this (source) group must share its register with.
    pub aliases_dest: Option<usize>,
}

impl RegGroup {
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.count
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.range().contains(&idx)
    }

    pub fn overlaps(&self, other: &RegGroup) -> bool {
        self.start < other.start + other.count && other.start < self.start + self.count
    }

    /// Whether `args` (the operands in this group, in order) are in
    /// consecutive registers of one bank, with the first one aligned.
    ///
    /// Operands not yet assigned to a register (i.e. unused) are ignored.
    pub fn is_satisfied_by<'a>(&self, args: impl IntoIterator<Item = &'a Arg>) -> bool {
        let mut expected = None;
        for (i, arg) in args.into_iter().enumerate() {
            if arg.is_unused() {
                continue;
            }
            let base = arg.number.wrapping_sub(i as u32);
            match expected {
                None => {
                    if !self.align.allows(base) {
                        return false;
                    }
                    expected = Some((arg.bank, base));
                }
                Some(expected) if expected != (arg.bank, base) => return false,
                Some(_) => {}
            }
        }
        true
    }
}

impl InstDef {
    /// Source register groups (at most one per MOE source slot), never
    /// overlapping one another.
    pub fn source_register_groups(&self, target: &Target) -> ArrayVec<RegGroup, MAX_SRC_GROUPS> {
        let mut groups = ArrayVec::<RegGroup, MAX_SRC_GROUPS>::new();
        let smp = self.opcode().is_texture_sample().then(|| self.params().as_smp());

        for &moe in self.desc().moe_remap {
            let group = match moe {
                MoeOperand::Args { first, count, align } => {
                    let start = usize::from(first);
                    let mut count = usize::from(count);

                    // Texture samples only use as many arguments as needed.
                    if let Some(smp) = smp {
                        count = count.min(if start == smp_args::COORDS.start {
                            smp.coord_count()
                        } else if start == smp_args::STATE.start {
                            usize::from(target.texture_state_words)
                        } else if start == smp_args::GRADS.start {
                            2 * usize::from(smp.dim.min(3))
                        } else {
                            count
                        });
                    }

                    // A lone argument is only a "group" if it's constrained.
                    if count == 0 || (count == 1 && align == HwRegAlign::None) {
                        continue;
                    }
                    RegGroup { start, count, align, aliases_dest: None }
                }
                MoeOperand::AliasOfDest { arg, dest } => RegGroup {
                    start: usize::from(arg),
                    count: 1,
                    align: HwRegAlign::None,
                    aliases_dest: Some(usize::from(dest)),
                },
            };

            // Aliases of the same arguments collapse into one group.
            if groups.iter().any(|existing| existing.range() == group.range()) {
                continue;
            }
            debug_assert!(!groups.iter().any(|existing| existing.overlaps(&group)));
            groups.push(group);
        }
        groups
    }

    /// Destination register groups.
    pub fn dest_register_groups(&self) -> ArrayVec<RegGroup, MAX_DEST_GROUPS> {
        let desc = self.desc();
        let count = self.dest_count();
        let mut groups = ArrayVec::new();
        if count > 1 || (count == 1 && desc.dest_align != HwRegAlign::None) {
            groups.push(RegGroup { start: 0, count, align: desc.dest_align, aliases_dest: None });
        }
        groups
    }

    pub fn is_arg_in_register_group(&self, target: &Target, arg: usize) -> bool {
        self.source_register_groups(target).iter().any(|group| group.contains(arg))
    }

    /// Call `f(self, is_dest = false, group)` for every source group.
    pub fn process_source_register_groups(
        &self,
        target: &Target,
        mut f: impl FnMut(&InstDef, bool, RegGroup),
    ) {
        for group in self.source_register_groups(target) {
            f(self, false, group);
        }
    }

    /// Call `f(self, is_dest = true, group)` for every destination group.
    pub fn process_dest_register_groups(&self, mut f: impl FnMut(&InstDef, bool, RegGroup)) {
        for group in self.dest_register_groups() {
            f(self, true, group);
        }
    }

    /// Whether the current operands satisfy every register group (including
    /// destination aliasing).
    pub fn register_groups_satisfied(&self, target: &Target) -> bool {
        let srcs_ok = self.source_register_groups(target).iter().all(|group| {
            let args_ok = group.is_satisfied_by(&self.srcs()[group.range()]);
            let alias_ok = group.aliases_dest.map_or(true, |dest| {
                let src = self.src(group.start);
                src.is_unused() || src == self.dest(dest)
            });
            args_ok && alias_ok
        });
        srcs_ok
            && self
                .dest_register_groups()
                .iter()
                .all(|group| group.is_satisfied_by(group.range().map(|dest| self.dest(dest))))
    }
}
