//! Pass-scoped bookkeeping: side tables keyed by instruction, and lists of
//! instructions that may be freed while the list still refers to them.

use crate::{FxIndexMap, Inst, Program};
use std::collections::VecDeque;

/// Per-instruction data owned by a single pass (e.g. "already visited" marks,
/// or scheduling state), dropped together with the pass.
///
/// Iteration follows insertion order.
pub struct PassLocal<T> {
    data: FxIndexMap<Inst, T>,
}

impl<T> Default for PassLocal<T> {
    fn default() -> Self {
        Self { data: FxIndexMap::default() }
    }
}

impl<T> PassLocal<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, inst: Inst) -> Option<&T> {
        self.data.get(&inst)
    }

    pub fn get_mut(&mut self, inst: Inst) -> Option<&mut T> {
        self.data.get_mut(&inst)
    }

    pub fn contains(&self, inst: Inst) -> bool {
        self.data.contains_key(&inst)
    }

    /// Returns the previous value for `inst`, if any.
    pub fn insert(&mut self, inst: Inst, value: T) -> Option<T> {
        self.data.insert(inst, value)
    }

    pub fn remove(&mut self, inst: Inst) -> Option<T> {
        self.data.shift_remove(&inst)
    }

    pub fn entry_or_default(&mut self, inst: Inst) -> &mut T
    where
        T: Default,
    {
        self.data.entry(inst).or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Inst, &T)> + '_ {
        self.data.iter().map(|(&inst, value)| (inst, value))
    }

    /// Drop the data of instructions that have since been freed.
    pub fn prune(&mut self, program: &Program) {
        self.data.retain(|&inst, _| program.contains_inst(inst));
    }
}

impl PassLocal<()> {
    /// Mark `inst`, returning `false` if it was already marked.
    pub fn mark(&mut self, inst: Inst) -> bool {
        self.data.insert(inst, ()).is_none()
    }
}

/// FIFO list of instructions which doesn't keep them alive, i.e. other code
/// may free instructions while they're still in the list, and they get
/// skipped over (instead of being returned) from then on.
#[derive(Clone, Debug, Default)]
pub struct WeakInstList {
    insts: VecDeque<Inst>,
}

impl WeakInstList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, inst: Inst) {
        self.insts.push_back(inst);
    }

    /// Number of entries, including ones referring to freed instructions.
    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    /// Remove and return the first instruction that still exists, discarding
    /// any freed ones before it.
    pub fn pop_live(&mut self, program: &Program) -> Option<Inst> {
        while let Some(inst) = self.insts.pop_front() {
            if program.contains_inst(inst) {
                return Some(inst);
            }
            tracing::trace!(?inst, "skipping freed instruction");
        }
        None
    }

    pub fn iter_live<'a>(&'a self, program: &'a Program) -> impl Iterator<Item = Inst> + 'a {
        self.insts.iter().copied().filter(|&inst| program.contains_inst(inst))
    }

    /// Discard every entry referring to a freed instruction.
    pub fn prune(&mut self, program: &Program) {
        self.insts.retain(|&inst| program.contains_inst(inst));
    }
}

impl Extend<Inst> for WeakInstList {
    fn extend<I: IntoIterator<Item = Inst>>(&mut self, insts: I) {
        self.insts.extend(insts);
    }
}
