//! Textual rendering of operands, instructions and blocks.
//!
//! Individual operands implement `fmt::Display` directly, while instructions
//! and blocks need a [`Plan`] (to resolve interned debug file names, and to
//! give instructions short stable names, independent of their global ids).

use crate::{Arg, Block, ChanMask, Context, FxIndexSet, Inst, InstDef, InstFlags, PredSrc};
use crate::params::FloatSrcMod;
use crate::{Program, RegBank, RegFormat};
use itertools::Itertools;
use smallvec::SmallVec;
use std::{fmt, iter};

impl RegBank {
    fn prefix(self) -> &'static str {
        match self {
            RegBank::Temp => "r",
            RegBank::PrimAttr => "pa",
            RegBank::SecAttr => "sa",
            RegBank::Output => "o",
            RegBank::FpInternal => "i",
            RegBank::Immediate => "#",
            RegBank::Predicate => "p",
            RegBank::Index => "idx",
            RegBank::Global => "g",
            RegBank::SpecialConst => "sc",
            RegBank::RegArray => "arr",
            RegBank::Drc => "drc",
            RegBank::Unused => "_",
        }
    }
}

impl fmt::Display for ChanMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in ['x', 'y', 'z', 'w'].into_iter().enumerate() {
            if self.has_chan(i) {
                write!(f, "{name}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unused() {
            return write!(f, "_");
        }
        write!(f, "{}{}", self.bank.prefix(), self.number)?;
        match (self.index, self.array_offset) {
            (Some(index), 0) => write!(f, "[{}{}]", index.bank.prefix(), index.number)?,
            (Some(index), offset) => {
                write!(f, "[{}{} + {offset}]", index.bank.prefix(), index.number)?;
            }
            (None, 0) => {}
            (None, offset) => write!(f, "[{offset}]")?,
        }
        match self.format {
            RegFormat::F32 | RegFormat::Untyped => Ok(()),
            RegFormat::F16 => write!(f, ".f16"),
            RegFormat::C10 => write!(f, ".c10"),
            RegFormat::U8 => write!(f, ".u8"),
        }
    }
}

impl fmt::Display for PredSrc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p{}", if self.negate { "!" } else { "" }, self.reg)
    }
}

/// Printing plan: which blocks (or lone instructions) to print, and the
/// (per-plan) names of every instruction involved.
pub struct Plan<'a> {
    program: &'a Program,
    roots: Vec<Root>,
    inst_names: FxIndexSet<Inst>,
}

#[derive(Copy, Clone)]
enum Root {
    Block(Block),
    Inst(Inst),
}

impl<'a> Plan<'a> {
    pub fn for_blocks(program: &'a Program, blocks: impl IntoIterator<Item = Block>) -> Self {
        let mut plan = Plan { program, roots: vec![], inst_names: FxIndexSet::default() };
        for block in blocks {
            plan.roots.push(Root::Block(block));
            for inst in program.at_block(block) {
                plan.inst_names.insert(inst.position);
            }
        }
        plan
    }

    pub fn for_block(program: &'a Program, block: Block) -> Self {
        Self::for_blocks(program, [block])
    }

    /// Print only `inst`, regardless of where it is (or whether it's in a
    /// block at all).
    pub fn for_inst(program: &'a Program, inst: Inst) -> Self {
        Plan { program, roots: vec![Root::Inst(inst)], inst_names: [inst].into_iter().collect() }
    }
}

impl fmt::Display for Plan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let printer = Printer { cx: self.program.cx_ref(), inst_names: &self.inst_names };
        for (block_idx, &root) in self.roots.iter().enumerate() {
            match root {
                Root::Block(block) => {
                    let insts = self
                        .program
                        .at_block(block)
                        .into_iter()
                        .map(|inst| printer.inst_line(inst.position, inst.def()));
                    writeln!(f, "{}", printer.pretty_block(&format!("block{block_idx}"), insts))?;
                }
                Root::Inst(inst) => {
                    writeln!(f, "{}", printer.inst_line(inst, self.program.inst(inst)))?;
                }
            }
        }
        Ok(())
    }
}

pub struct Printer<'a, 'b> {
    cx: &'a Context,
    inst_names: &'b FxIndexSet<Inst>,
}

impl Printer<'_, '_> {
    fn inst_name(&self, inst: Inst) -> String {
        match self.inst_names.get_index_of(&inst) {
            Some(idx) => format!("inst{idx}"),
            None => format!("inst#{}", inst.id()),
        }
    }

    fn inst_line(&self, inst: Inst, def: &InstDef) -> String {
        let mut line = format!("{} = {}", self.inst_name(inst), def.print(self));
        if let Some(parent) = def.group.parent {
            line += &format!(" in_group({})", self.inst_name(parent));
        }
        if let Some(loc) = def.debug_loc {
            line += &format!(" // {}:{}", &self.cx[loc.file], loc.line);
        }
        line
    }

    /// Returns `header + " { " + contents + " }"` on one line if short enough
    /// (and without comments), or with one (indented) line per entry otherwise.
    fn pretty_block(&self, header: &str, contents: impl IntoIterator<Item = String>) -> String {
        let contents: SmallVec<[_; 16]> = contents.into_iter().collect();
        if contents.is_empty() {
            return format!("{header} {{}}");
        }

        // FIXME make max line width configurable.
        let max_line_len = 80;
        let fits_on_single_line = contents
            .iter()
            .try_fold(header.len() + 4, |single_line_len, entry| {
                if entry.contains('\n') || entry.contains("//") {
                    return None;
                }
                single_line_len.checked_add(1)?.checked_add(entry.len()).filter(|&len| {
                    len <= max_line_len
                })
            })
            .is_some();

        let (sep, end) = if fits_on_single_line { (" ", " }") } else { ("\n  ", "\n}") };
        iter::once(format!("{header} {{"))
            .chain(contents.iter().map(|entry| format!("{sep}{entry}")))
            .chain([end.to_string()])
            .collect()
    }
}

pub trait Print {
    type Output;
    fn print(&self, printer: &Printer<'_, '_>) -> Self::Output;
}

impl Print for InstDef {
    type Output = String;
    fn print(&self, _printer: &Printer<'_, '_>) -> String {
        let mut s = String::new();

        if self.is_predicated() {
            let preds = self.predicate_slots().iter().map(|pred| match pred {
                Some(pred) => pred.to_string(),
                None => "_".to_string(),
            });
            s += &format!("({}) ", preds.format(", "));
        }

        s += self.opcode().mnemonic();
        if self.repeat_count() > 1 {
            s += &format!(".rpt{}", self.repeat_count());
        }
        if let Some(mask) = self.repeat_mask() {
            s += &format!(".rmsk{mask:04b}");
        }
        for (flag, suffix) in [
            (InstFlags::SKIP_INVALID, ".skipinv"),
            (InstFlags::SYNC_START, ".syncs"),
            (InstFlags::NO_SCHED, ".nosched"),
            (InstFlags::END, ".end"),
        ] {
            if self.flags.contains(flag) {
                s += suffix;
            }
        }

        let dests = (0..self.dest_count()).map(|dest| {
            let slot = self.dest_slot(dest);
            let mut d = slot.arg.to_string();
            let mask = self.dest_mask(dest);
            if mask != ChanMask::ALL {
                d += &format!(".{mask}");
            }
            if let Some(old) = &slot.old {
                d += &format!(" (old {old})");
            }
            d
        });
        let src_mods = self.params().float_src_mods();
        let srcs = self.srcs().iter().enumerate().map(|(arg, src)| {
            match src_mods.and_then(|mods| mods.get(arg)).filter(|_| !src.is_unused()) {
                Some(FloatSrcMod { negate, absolute: true }) => {
                    format!("{}|{src}|", if *negate { "-" } else { "" })
                }
                Some(FloatSrcMod { negate: true, absolute: false }) => format!("-{src}"),
                _ => src.to_string(),
            }
        });
        let mut operands = dests.chain(srcs).peekable();
        if operands.peek().is_some() {
            s += " ";
            s += &operands.join(", ");
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DebugLoc, DynIndex, Opcode, Target};
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    #[test]
    fn operands() {
        let index =
            DynIndex { bank: RegBank::Index, number: 1, array_offset: 0, stride_in_bytes: 4 };
        assert_eq!(Arg::temp(3, RegFormat::F32).to_string(), "r3");
        assert_eq!(Arg::new(RegBank::PrimAttr, 2, RegFormat::F16).to_string(), "pa2.f16");
        assert_eq!(Arg::imm(42).to_string(), "#42");
        assert_eq!(Arg::UNUSED.to_string(), "_");
        assert_eq!(
            Arg::new(RegBank::SecAttr, 0, RegFormat::F32).with_index(index).to_string(),
            "sa0[idx1]"
        );
        assert_eq!(Arg::temp(8, RegFormat::F32).with_array_offset(2).to_string(), "r8[2]");
        assert_eq!(PredSrc { reg: 1, negate: true }.to_string(), "!p1");
        assert_eq!(ChanMask::XY.to_string(), "xy");
    }

    #[test]
    fn block_snapshot() {
        let cx = Rc::new(Context::new(Target::SGX540));
        let mut program = Program::new(cx.clone());
        let block = program.alloc_block();

        let mut fmad = InstDef::new(Opcode::Fmad);
        fmad.set_dest(0, Arg::temp(0, RegFormat::F32));
        fmad.set_srcs(0, Arg::array_set(RegBank::Temp, 1, 3, RegFormat::F32));
        fmad.debug_loc = Some(DebugLoc { file: cx.intern("a.frag"), line: 7 });
        let fmad = program.define_inst(fmad);
        program.insert_inst(block, fmad).unwrap();

        let mut mov = InstDef::new(Opcode::Mov);
        mov.set_dest(0, Arg::new(RegBank::Output, 0, RegFormat::F32));
        mov.set_dest_mask(0, ChanMask::XY);
        mov.set_src(0, Arg::temp(0, RegFormat::F32));
        mov.set_predicate(0, true).unwrap();
        mov.flags |= InstFlags::END;
        let mov = program.define_inst(mov);
        program.insert_inst(block, mov).unwrap();

        assert_eq!(
            Plan::for_block(&program, block).to_string(),
            "block0 {\n  \
               inst0 = fmad r0, r1, r2, r3 // a.frag:7\n  \
               inst1 = (!p0) mov.end o0.xy, r0\n\
             }\n"
        );

        assert_eq!(Plan::for_inst(&program, mov).to_string(), "inst0 = (!p0) mov.end o0.xy, r0\n");
    }

    #[test]
    fn source_modifiers_and_per_chan_predicates() {
        let target = Target::SGX543;
        let mut program = Program::new(Rc::new(Context::new(target.clone())));

        let mut fmad = InstDef::new(Opcode::Fmad);
        fmad.set_dest(0, Arg::temp(0, RegFormat::F32));
        fmad.set_srcs(0, Arg::array_set(RegBank::Temp, 1, 3, RegFormat::F32));
        let mods = &mut fmad.params_mut().as_float_mut().src_mods;
        mods[0] = FloatSrcMod::NONE.negated();
        mods[2] = FloatSrcMod::NONE.abs().negated();
        let fmad = program.define_inst(fmad);
        assert_eq!(
            Plan::for_inst(&program, fmad).to_string(),
            "inst0 = fmad r0, -r1, r2, -|r3|\n"
        );

        let mut vmov = InstDef::new(Opcode::Vmov);
        vmov.set_dest(0, Arg::temp(4, RegFormat::F32));
        vmov.set_src(0, Arg::temp(8, RegFormat::F32));
        vmov.set_predicate_at(&target, 1, 2, false).unwrap();
        vmov.set_predicate_at(&target, 3, 1, true).unwrap();
        vmov.make_predicate_per_chan(&target).unwrap();
        let vmov = program.define_inst(vmov);
        assert_eq!(
            Plan::for_inst(&program, vmov).to_string(),
            "inst0 = (_, p2, _, !p1) vmov r4, r8\n"
        );
    }

    #[test]
    fn short_blocks_fit_on_one_line() {
        let mut program = Program::new(Rc::new(Context::new(Target::SGX530)));
        let block = program.alloc_block();
        assert_eq!(Plan::for_block(&program, block).to_string(), "block0 {}\n");

        let nop = program.alloc_inst(None);
        program.insert_inst(block, nop).unwrap();
        assert_eq!(Plan::for_block(&program, block).to_string(), "block0 { inst0 = nop }\n");
    }
}
