//! Immutable IR traversal, over the operands of instructions.

use crate::func_at::BlockAt;
use crate::{Arg, Block, DynIndex, InstDef, PredSrc, RegBank};
use rustc_hash::FxHashSet;

/// Which operand slot of an instruction an [`Arg`] occupies.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArgUse {
    /// Destination `i` (written).
    Dest(usize),

    /// Old value of destination `i`, i.e. the register whose unwritten
    /// channels are merged into destination `i` (read).
    OldDest(usize),

    /// Source `i` (read).
    Src(usize),
}

impl ArgUse {
    pub fn is_write(self) -> bool {
        matches!(self, ArgUse::Dest(_))
    }
}

// FIXME `Sized` bound shouldn't be needed but removing it requires
// writing `impl Visitor<'a> + ?Sized` in `fn inner_visit_with` signatures.
pub trait Visitor<'a>: Sized {
    // Leaves (noop default behavior).
    fn visit_dyn_index(&mut self, _index: &'a DynIndex) {}
    fn visit_predicate(&mut self, _pred: &'a PredSrc) {}

    // Non-leaves (defaulting to calling `.inner_visit_with(self)`).
    fn visit_arg_use(&mut self, _arg_use: ArgUse, arg: &'a Arg) {
        arg.inner_visit_with(self);
    }
    fn visit_inst_def(&mut self, inst_def: &'a InstDef) {
        inst_def.inner_visit_with(self);
    }
}

/// One level of visiting: call the matching [`Visitor`] method on every field
/// of `self` (each of which, by default, keeps going one level deeper).
pub trait InnerVisit {
    fn inner_visit_with<'a>(&'a self, visitor: &mut impl Visitor<'a>);
}

impl InnerVisit for Arg {
    fn inner_visit_with<'a>(&'a self, visitor: &mut impl Visitor<'a>) {
        if let Some(index) = &self.index {
            visitor.visit_dyn_index(index);
        }
    }
}

impl InnerVisit for InstDef {
    fn inner_visit_with<'a>(&'a self, visitor: &mut impl Visitor<'a>) {
        for dest in 0..self.dest_count() {
            let slot = self.dest_slot(dest);
            visitor.visit_arg_use(ArgUse::Dest(dest), &slot.arg);
            if let Some(old) = &slot.old {
                visitor.visit_arg_use(ArgUse::OldDest(dest), old);
            }
        }
        for (i, src) in self.srcs().iter().enumerate() {
            visitor.visit_arg_use(ArgUse::Src(i), src);
        }
        for pred in self.predicates() {
            visitor.visit_predicate(pred);
        }
    }
}

impl InnerVisit for BlockAt<'_, Block> {
    fn inner_visit_with<'a>(&'a self, visitor: &mut impl Visitor<'a>) {
        for inst in *self {
            visitor.visit_inst_def(inst.def());
        }
    }
}

/// Registers (as `(bank, number)` pairs) read and written by some
/// instructions, ignoring unused operands and immediates.
#[derive(Default)]
pub struct RegUses {
    pub reads: FxHashSet<(RegBank, u32)>,
    pub writes: FxHashSet<(RegBank, u32)>,
}

impl RegUses {
    pub fn of(inst_def: &InstDef) -> Self {
        let mut uses = Self::default();
        uses.visit_inst_def(inst_def);
        uses
    }
}

impl Visitor<'_> for RegUses {
    fn visit_dyn_index(&mut self, index: &DynIndex) {
        self.reads.insert((index.bank, index.number));
    }
    fn visit_predicate(&mut self, pred: &PredSrc) {
        self.reads.insert((RegBank::Predicate, pred.reg));
    }

    fn visit_arg_use(&mut self, arg_use: ArgUse, arg: &Arg) {
        if !matches!(arg.bank, RegBank::Unused | RegBank::Immediate) {
            let uses = if arg_use.is_write() { &mut self.writes } else { &mut self.reads };
            uses.insert((arg.bank, arg.number));
        }
        arg.inner_visit_with(self);
    }
}

impl InstDef {
    /// Whether any operand (including dynamic indices and predicates)
    /// reads `number` in `bank`.
    pub fn reads_reg(&self, bank: RegBank, number: u32) -> bool {
        RegUses::of(self).reads.contains(&(bank, number))
    }

    pub fn writes_reg(&self, bank: RegBank, number: u32) -> bool {
        RegUses::of(self).writes.contains(&(bank, number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Context, Opcode, Program, RegFormat, Target};
    use std::rc::Rc;

    fn indexed_mov() -> InstDef {
        let mut mov = InstDef::new(Opcode::Mov);
        mov.set_dest(0, Arg::temp(3, RegFormat::F32));
        mov.set_old_dest(0, Some(Arg::temp(7, RegFormat::F32)));
        let index =
            DynIndex { bank: RegBank::Index, number: 1, array_offset: 0, stride_in_bytes: 4 };
        mov.set_src(0, Arg::new(RegBank::PrimAttr, 0, RegFormat::F32).with_index(index));
        mov.set_predicate(2, true).unwrap();
        mov
    }

    #[test]
    fn arg_uses_in_slot_order() {
        struct Slots(Vec<ArgUse>);
        impl Visitor<'_> for Slots {
            fn visit_arg_use(&mut self, arg_use: ArgUse, _: &Arg) {
                self.0.push(arg_use);
            }
        }

        let mut slots = Slots(vec![]);
        slots.visit_inst_def(&indexed_mov());
        assert_eq!(slots.0, [ArgUse::Dest(0), ArgUse::OldDest(0), ArgUse::Src(0)]);
    }

    #[test]
    fn reads_and_writes() {
        let mov = indexed_mov();
        assert!(mov.writes_reg(RegBank::Temp, 3));
        assert!(!mov.reads_reg(RegBank::Temp, 3));
        assert!(mov.reads_reg(RegBank::Temp, 7));
        assert!(mov.reads_reg(RegBank::PrimAttr, 0));
        assert!(mov.reads_reg(RegBank::Index, 1));
        assert!(mov.reads_reg(RegBank::Predicate, 2));

        let mut limm = InstDef::new(Opcode::Limm);
        limm.set_src(0, Arg::imm(42));
        assert!(RegUses::of(&limm).reads.is_empty());
    }

    #[test]
    fn visit_whole_block() {
        let mut program = Program::new(Rc::new(Context::new(Target::SGX540)));
        let block = program.alloc_block();
        for n in 0..3 {
            let mut def = InstDef::new(Opcode::Mov);
            def.set_dest(0, Arg::temp(n, RegFormat::F32));
            let inst = program.define_inst(def);
            program.insert_inst(block, inst).unwrap();
        }

        let mut uses = RegUses::default();
        program.at_block(block).inner_visit_with(&mut uses);
        assert_eq!(uses.writes.len(), 3);
        assert!(uses.reads.is_empty());
    }
}
