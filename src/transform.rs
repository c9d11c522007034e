//! Mutable IR traversal, over the operands of instructions.

use crate::func_at::BlockAtMut;
use crate::visit::ArgUse;
use crate::{Arg, Block, DynIndex, InstDef, PredSrc, Program, RegBank};
use rustc_hash::FxHashMap;

/// Outcome of transforming an operand (or part of one) by value.
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transformed<T> {
    /// Nothing to do, the original value stays in place.
    Unchanged,

    /// A replacement value, which also forces a replacement of whatever
    /// contains the original.
    Changed(T),
}

impl<T> Transformed<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Transformed<U> {
        match self {
            Transformed::Unchanged => Transformed::Unchanged,
            Transformed::Changed(new) => Transformed::Changed(f(new)),
        }
    }

    pub fn apply_to(self, dest: &mut T) {
        match self {
            Transformed::Unchanged => {}
            Transformed::Changed(new) => *dest = new,
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, Transformed::Changed(_))
    }
}

/// Input of [`transform!`], pairing each result with its original.
enum TransformedWithOriginal<'a, T> {
    Original(&'a T),
    Changed(T),
}

impl<T> Transformed<T> {
    fn with_original(self, original: &T) -> TransformedWithOriginal<'_, T> {
        match self {
            Transformed::Unchanged => TransformedWithOriginal::Original(original),
            Transformed::Changed(new) => TransformedWithOriginal::Changed(new),
        }
    }
}

impl<T: Clone> TransformedWithOriginal<'_, T> {
    fn is_changed(&self) -> bool {
        matches!(self, TransformedWithOriginal::Changed(_))
    }
    fn changed_or_original_cloned(self) -> T {
        match self {
            TransformedWithOriginal::Original(original) => original.clone(),
            TransformedWithOriginal::Changed(new) => new,
        }
    }
}

// HACK `transform!` needs auto-ref-like behavior for inputs.
trait AutoRef {
    fn auto_ref(&self) -> &Self {
        self
    }
}

impl<T> AutoRef for T {}

/// Combine the results of transforming several fields into one result for the
/// value holding them: `Changed` if any field changed (rebuilt with clones of
/// the unchanged fields), `Unchanged` otherwise.
macro_rules! transform {
    ({ $($input:ident -> $input_transformed:expr),+ $(,)? } => $output:expr) => {{
        let ($($input,)+) = ($($input_transformed.with_original($input.auto_ref()),)+);
        if $($input.is_changed())||+ {
            let ($($input,)*) = ($($input.changed_or_original_cloned(),)+);
            Transformed::Changed($output)
        } else {
            Transformed::Unchanged
        }
    }};
}

// FIXME `Sized` bound shouldn't be needed but removing it requires
// writing `impl Transformer + ?Sized` in `fn inner_transform_with` signatures.
pub trait Transformer: Sized {
    // Register numbers and predicates (left alone by default).
    fn transform_reg(&mut self, _bank: RegBank, _number: u32) -> Transformed<(RegBank, u32)> {
        Transformed::Unchanged
    }
    fn transform_predicate(&mut self, _pred: &PredSrc) -> Transformed<PredSrc> {
        Transformed::Unchanged
    }

    // Operands (recursing into their index by default).
    fn transform_dyn_index(&mut self, index: &DynIndex) -> Transformed<DynIndex> {
        index.inner_transform_with(self)
    }
    fn transform_arg_use(&mut self, _arg_use: ArgUse, arg: &Arg) -> Transformed<Arg> {
        arg.inner_transform_with(self)
    }

    // Whole instructions, rewritten in place slot by slot.
    fn in_place_transform_inst_def(&mut self, inst_def: &mut InstDef) {
        inst_def.inner_in_place_transform_with(self);
    }
}

/// One level of transformation: hand every field of `self` to the matching
/// [`Transformer`] method, and rebuild `self` only if any of them changed.
pub trait InnerTransform: Sized {
    fn inner_transform_with(&self, transformer: &mut impl Transformer) -> Transformed<Self>;
}

/// Like [`InnerTransform`], for values rewritten in place.
pub trait InnerInPlaceTransform {
    fn inner_in_place_transform_with(&mut self, transformer: &mut impl Transformer);
}

impl InnerTransform for DynIndex {
    fn inner_transform_with(&self, transformer: &mut impl Transformer) -> Transformed<Self> {
        transformer
            .transform_reg(self.bank, self.number)
            .map(|(bank, number)| DynIndex { bank, number, ..*self })
    }
}

impl InnerTransform for Arg {
    fn inner_transform_with(&self, transformer: &mut impl Transformer) -> Transformed<Self> {
        let Self { bank, number, index, array_offset: _, number_pre_indexing: _, format: _ } =
            self;

        let reg = (*bank, *number);
        let transformed_reg = match bank {
            RegBank::Unused | RegBank::Immediate => Transformed::Unchanged,
            _ => transformer.transform_reg(*bank, *number),
        };
        transform!({
            reg -> transformed_reg,
            index -> match index {
                Some(index) => transformer.transform_dyn_index(index).map(Some),
                None => Transformed::Unchanged,
            },
        } => Arg { bank: reg.0, number: reg.1, index, ..*self })
    }
}

impl InnerInPlaceTransform for InstDef {
    fn inner_in_place_transform_with(&mut self, transformer: &mut impl Transformer) {
        for dest in 0..self.dest_count() {
            let slot = self.dest_slot_mut(dest);
            transformer.transform_arg_use(ArgUse::Dest(dest), &slot.arg).apply_to(&mut slot.arg);
            if let Some(old) = &mut slot.old {
                transformer.transform_arg_use(ArgUse::OldDest(dest), old).apply_to(old);
            }
        }
        for i in 0..self.src_count() {
            let src = self.src_mut(i);
            transformer.transform_arg_use(ArgUse::Src(i), src).apply_to(src);
        }
        for pred in self.predicates_mut() {
            transformer.transform_predicate(pred).apply_to(pred);
        }
    }
}

impl BlockAtMut<'_, Block> {
    pub fn inner_in_place_transform_with(self, transformer: &mut impl Transformer) {
        let mut iter = self.into_iter();
        while let Some(inst) = iter.next() {
            transformer.in_place_transform_inst_def(inst.def());
        }
    }
}

/// Register renaming (which can also move registers to another bank, e.g.
/// when promoting temporaries to attribute registers).
///
/// Every operand naming a renamed register is rewritten, including dynamic
/// index registers, but excluding immediates (whose "number" is a value).
#[derive(Default)]
pub struct RegRenamer {
    pub renames: FxHashMap<(RegBank, u32), (RegBank, u32)>,
}

impl RegRenamer {
    pub fn rename(&mut self, from: (RegBank, u32), to: (RegBank, u32)) -> &mut Self {
        self.renames.insert(from, to);
        self
    }
}

impl Transformer for RegRenamer {
    fn transform_reg(&mut self, bank: RegBank, number: u32) -> Transformed<(RegBank, u32)> {
        match self.renames.get(&(bank, number)) {
            Some(&new) => Transformed::Changed(new),
            None => Transformed::Unchanged,
        }
    }

    fn transform_predicate(&mut self, pred: &PredSrc) -> Transformed<PredSrc> {
        match self.renames.get(&(RegBank::Predicate, pred.reg)) {
            Some(&(RegBank::Predicate, reg)) => Transformed::Changed(PredSrc { reg, ..*pred }),
            Some(&(bank, _)) => panic!(
                "predicate p{} can only be renamed to another predicate, not {bank:?}",
                pred.reg
            ),
            None => Transformed::Unchanged,
        }
    }
}

impl Program {
    /// Apply `transformer` to every instruction of `block`.
    pub fn transform_block(&mut self, block: Block, transformer: &mut impl Transformer) {
        tracing::trace!(?block, "transforming block");
        self.at_block_mut(block).inner_in_place_transform_with(transformer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Context, Opcode, RegFormat, Target};
    use std::rc::Rc;

    #[test]
    fn unchanged_is_free() {
        let arg = Arg::temp(1, RegFormat::F32);
        assert_eq!(arg.inner_transform_with(&mut RegRenamer::default()), Transformed::Unchanged);
    }

    #[test]
    fn rename_keeps_everything_else() {
        let mut renamer = RegRenamer::default();
        renamer.rename((RegBank::Temp, 1), (RegBank::PrimAttr, 9));
        renamer.rename((RegBank::Index, 0), (RegBank::Index, 1));

        let index =
            DynIndex { bank: RegBank::Index, number: 0, array_offset: 2, stride_in_bytes: 4 };
        let arg = Arg::temp(1, RegFormat::F16).with_index(index).with_array_offset(3);
        let Transformed::Changed(new) = arg.inner_transform_with(&mut renamer) else {
            panic!("expected a change");
        };
        assert_eq!(
            (new.bank, new.number, new.array_offset, new.format),
            (RegBank::PrimAttr, 9, 3, RegFormat::F16)
        );
        assert_eq!(new.index, Some(DynIndex { number: 1, ..index }));

        // Immediates are values, not registers.
        assert_eq!(Arg::imm(1).inner_transform_with(&mut renamer), Transformed::Unchanged);
    }

    #[test]
    fn rename_across_block() {
        let mut program = Program::new(Rc::new(Context::new(Target::SGX545)));
        let block = program.alloc_block();

        let mut fadd = InstDef::new(Opcode::Fadd);
        fadd.set_dest(0, Arg::temp(2, RegFormat::F32));
        fadd.set_srcs(0, [Arg::temp(0, RegFormat::F32), Arg::temp(1, RegFormat::F32)]);
        fadd.set_predicate(0, false).unwrap();
        let fadd = program.define_inst(fadd);
        program.insert_inst(block, fadd).unwrap();

        let mut mov = InstDef::new(Opcode::Mov);
        mov.set_dest(0, Arg::new(RegBank::Output, 0, RegFormat::F32));
        mov.set_src(0, Arg::temp(2, RegFormat::F32));
        let mov = program.define_inst(mov);
        program.insert_inst(block, mov).unwrap();

        let mut renamer = RegRenamer::default();
        renamer
            .rename((RegBank::Temp, 2), (RegBank::Temp, 0))
            .rename((RegBank::Predicate, 0), (RegBank::Predicate, 3));
        program.transform_block(block, &mut renamer);

        assert_eq!(*program.inst(fadd).dest(0), Arg::temp(0, RegFormat::F32));
        assert_eq!(*program.inst(fadd).src(0), Arg::temp(0, RegFormat::F32));
        assert_eq!(program.inst(fadd).predicate(0).map(|pred| pred.reg), Some(3));
        assert_eq!(*program.inst(mov).src(0), Arg::temp(0, RegFormat::F32));
        assert_eq!(program.inst(mov).dest(0).bank, RegBank::Output);
    }
}
