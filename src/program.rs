//! Programs, i.e. the owners of all instruction and block definitions, and
//! the lifecycle operations keeping every instruction list consistent.

use crate::context::{EntityDefs, EntityList, ListMembership};
use crate::inst::{InBlock, InOpcodeList, InScratch, InWorklist};
use crate::{Block, BlockAt, BlockAtMut, Context, Entity, Inst, InstDef, IrError, Opcode, Target};
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Definition for a [`Block`]: an ordered list of instructions.
#[derive(Clone, Debug, Default)]
pub struct BlockDef {
    pub(crate) insts: EntityList<InBlock>,
}

impl BlockDef {
    pub fn insts(&self) -> EntityList<InBlock> {
        self.insts
    }
}

/// Distance between the `block_index` of consecutive instructions, after
/// (re)numbering a block.
const BLOCK_INDEX_GAP: u64 = 1 << 16;

/// A `block_index` strictly between those of `prev` and `next` (if any),
/// or `None` if there's no room left (and the block needs renumbering).
fn index_between(prev: Option<u64>, next: Option<u64>) -> Option<u64> {
    match (prev, next) {
        (None, None) => Some(BLOCK_INDEX_GAP),
        (Some(prev), None) => prev.checked_add(BLOCK_INDEX_GAP),
        (None, Some(next)) => (next > 0).then_some(next / 2),
        (Some(prev), Some(next)) => {
            let mid = prev + (next - prev) / 2;
            (mid > prev).then_some(mid)
        }
    }
}

/// Lists only used by (and only meaningful during) a single pass.
pub trait PassListMembership: ListMembership<Entity = Inst> {}
impl PassListMembership for InWorklist {}
impl PassListMembership for InScratch {}

/// Owner of all the instructions (and blocks) of a shader program.
pub struct Program {
    /// Context used for all entity allocation and interning in this program.
    ///
    /// Private to disallow switching the context (and thus the target).
    cx: Rc<Context>,

    insts: EntityDefs<Inst>,
    blocks: EntityDefs<Block>,

    /// Every (live) instruction, by opcode, in allocation order.
    opcode_lists: FxHashMap<Opcode, EntityList<InOpcodeList>>,
}

impl Program {
    pub fn new(cx: Rc<Context>) -> Self {
        Self {
            cx,
            insts: EntityDefs::new(),
            blocks: EntityDefs::new(),
            opcode_lists: FxHashMap::default(),
        }
    }

    pub fn cx(&self) -> Rc<Context> {
        self.cx.clone()
    }

    pub fn cx_ref(&self) -> &Rc<Context> {
        &self.cx
    }

    pub fn target(&self) -> &Target {
        self.cx.target()
    }

    pub fn insts(&self) -> &EntityDefs<Inst> {
        &self.insts
    }

    #[track_caller]
    pub fn inst(&self, inst: Inst) -> &InstDef {
        &self.insts[inst]
    }

    /// Mutable access to an instruction (everything affecting the lists it's
    /// in, including its opcode, can only be changed through `Program`).
    #[track_caller]
    pub fn inst_mut(&mut self, inst: Inst) -> &mut InstDef {
        &mut self.insts[inst]
    }

    pub fn try_inst(&self, inst: Inst) -> Result<&InstDef, IrError> {
        self.insts.try_get(inst)
    }

    /// Whether `inst` is still defined (i.e. hasn't been freed).
    pub fn contains_inst(&self, inst: Inst) -> bool {
        self.insts.contains(inst)
    }

    #[track_caller]
    pub fn block(&self, block: Block) -> &BlockDef {
        &self.blocks[block]
    }

    pub fn at_block(&self, block: Block) -> BlockAt<'_, Block> {
        BlockAt { insts: &self.insts, blocks: &self.blocks, position: block }
    }

    pub fn at_block_mut(&mut self, block: Block) -> BlockAtMut<'_, Block> {
        BlockAtMut { insts: &mut self.insts, blocks: &self.blocks, position: block }
    }

    /// Every (live) instruction with `opcode`, in allocation order.
    pub fn insts_with_opcode(&self, opcode: Opcode) -> impl Iterator<Item = Inst> + Clone + '_ {
        self.opcode_lists.get(&opcode).copied().unwrap_or_default().iter_in(&self.insts)
    }

    pub fn alloc_block(&mut self) -> Block {
        self.blocks.define(&self.cx, BlockDef::default())
    }
}

/// Instruction lifecycle.
impl Program {
    /// Track a newly defined instruction in its opcode list.
    fn track_new_inst(&mut self, inst: Inst) -> Inst {
        let opcode = self.insts[inst].opcode();
        let list = self.opcode_lists.entry(opcode).or_default();
        // NOTE freshly defined, so never already in an opcode list.
        if let Err(err) = list.insert_last(inst, &mut self.insts) {
            unreachable!("{err}");
        }
        inst
    }

    /// Allocate a new detached `nop`, to be populated by the caller (starting
    /// with [`Program::set_opcode`]), copying the source location of
    /// `template` (if any).
    pub fn alloc_inst(&mut self, template: Option<Inst>) -> Inst {
        let mut def = InstDef::new(Opcode::Nop);
        def.debug_loc = template.and_then(|template| self.insts.get(template)?.debug_loc);
        let inst = self.insts.define(&self.cx, def);
        tracing::trace!(?inst, ?template, "allocated instruction");
        self.track_new_inst(inst)
    }

    /// Define a new (detached) instruction from an already populated `def`.
    pub fn define_inst(&mut self, def: InstDef) -> Inst {
        let inst = self.insts.define(&self.cx, def.detached_copy());
        tracing::trace!(?inst, opcode = def.opcode().mnemonic(), "defined instruction");
        self.track_new_inst(inst)
    }

    /// Change the opcode of `inst`, reshaping its operands and resetting its
    /// parameters to match (see `InstDef::new`), and clamping its repeats to
    /// what the target allows for the new opcode.
    pub fn set_opcode(&mut self, inst: Inst, opcode: Opcode) -> Result<(), IrError> {
        let target = self.cx.target();
        if !opcode.desc().is_available_on(target) {
            return Err(IrError::OpcodeUnavailable { opcode, core: target.core });
        }

        let old_opcode = self.insts.try_get(inst)?.opcode();
        if old_opcode == opcode {
            return Ok(());
        }
        tracing::debug!(
            ?inst,
            from = old_opcode.mnemonic(),
            to = opcode.mnemonic(),
            "changing opcode"
        );

        if let Some(list) = self.opcode_lists.get_mut(&old_opcode) {
            list.remove(inst, &mut self.insts)?;
        }
        let def = &mut self.insts[inst];
        def.reshape_for(opcode);
        let max = def.max_repeat_count(target);
        def.clamp_repeat(max);
        self.opcode_lists.entry(opcode).or_default().insert_last(inst, &mut self.insts)
    }

    /// Deep copy `inst` into a new, detached, instruction.
    pub fn copy_inst(&mut self, inst: Inst) -> Result<Inst, IrError> {
        let def = self.insts.try_get(inst)?.detached_copy();
        let copy = self.insts.define(&self.cx, def);
        tracing::trace!(?inst, ?copy, "copied instruction");
        Ok(self.track_new_inst(copy))
    }

    /// Free `inst`, which must not be in any block (or pass-local list).
    pub fn free_inst(&mut self, inst: Inst) -> Result<(), IrError> {
        let def = self.insts.try_get(inst)?;
        if let Some(block) = def.block() {
            return Err(IrError::FreeAttached { inst, block });
        }
        for (attached, list) in [
            (def.is_in_worklist(), InWorklist::NAME),
            (def.is_in_scratch_list(), InScratch::NAME),
        ] {
            if attached {
                return Err(IrError::AlreadyInList { kind: Inst::KIND, idx: inst.id(), list });
            }
        }

        let opcode = def.opcode();
        if let Some(list) = self.opcode_lists.get_mut(&opcode) {
            list.remove(inst, &mut self.insts)?;
        }
        self.insts.remove(inst);
        tracing::trace!(?inst, opcode = opcode.mnemonic(), "freed instruction");
        Ok(())
    }
}

/// Block membership.
impl Program {
    fn check_in_block(&self, inst: Inst, block: Block) -> Result<(), IrError> {
        if self.insts.try_get(inst)?.block() == Some(block) {
            Ok(())
        } else {
            Err(IrError::NotInBlock { inst, block })
        }
    }

    /// Give `inst` (just linked into `block`) a `block_index` between its
    /// neighbors, renumbering the whole block if needed.
    fn number_inserted(&mut self, block: Block, inst: Inst) {
        let list = self.blocks[block].insts;
        let prev = list.prev_of(inst, &self.insts).map(|prev| self.insts[prev].block_index);
        let next = list.next_of(inst, &self.insts).map(|next| self.insts[next].block_index);

        let def = &mut self.insts[inst];
        def.block = Some(block);
        match index_between(prev, next) {
            Some(idx) => def.block_index = idx,
            None => {
                tracing::trace!(?block, "renumbering block");
                let members: Vec<_> = list.iter_in(&self.insts).collect();
                for (i, member) in members.into_iter().enumerate() {
                    self.insts[member].block_index = (i as u64 + 1) * BLOCK_INDEX_GAP;
                }
            }
        }
    }

    /// Append `inst` to `block`.
    pub fn insert_inst(&mut self, block: Block, inst: Inst) -> Result<(), IrError> {
        self.blocks.try_get(block)?;
        self.blocks[block].insts.insert_last(inst, &mut self.insts)?;
        self.number_inserted(block, inst);
        tracing::trace!(?block, ?inst, "appended instruction");
        Ok(())
    }

    /// Insert `inst` into `block`, right before `before`.
    pub fn insert_inst_before(
        &mut self,
        block: Block,
        inst: Inst,
        before: Inst,
    ) -> Result<(), IrError> {
        self.blocks.try_get(block)?;
        self.check_in_block(before, block)?;
        self.blocks[block].insts.insert_before(inst, before, &mut self.insts)?;
        self.number_inserted(block, inst);
        tracing::trace!(?block, ?inst, ?before, "inserted instruction");
        Ok(())
    }

    /// Insert `inst` into `block`, right after `after`.
    pub fn insert_inst_after(
        &mut self,
        block: Block,
        inst: Inst,
        after: Inst,
    ) -> Result<(), IrError> {
        self.blocks.try_get(block)?;
        self.check_in_block(after, block)?;
        self.blocks[block].insts.insert_after(inst, after, &mut self.insts)?;
        self.number_inserted(block, inst);
        tracing::trace!(?block, ?inst, ?after, "inserted instruction");
        Ok(())
    }

    /// Remove `inst` from `block`, without freeing it.
    pub fn remove_inst(&mut self, block: Block, inst: Inst) -> Result<(), IrError> {
        self.blocks.try_get(block)?;
        self.check_in_block(inst, block)?;
        self.blocks[block].insts.remove(inst, &mut self.insts)?;
        let def = &mut self.insts[inst];
        def.block = None;
        def.block_index = 0;
        tracing::trace!(?block, ?inst, "removed instruction");
        Ok(())
    }
}

/// Pass-local lists (worklists and scratch lists).
impl Program {
    pub fn pass_list_push<M: PassListMembership>(
        &mut self,
        list: &mut EntityList<M>,
        inst: Inst,
    ) -> Result<(), IrError> {
        list.insert_last(inst, &mut self.insts)
    }

    pub fn pass_list_remove<M: PassListMembership>(
        &mut self,
        list: &mut EntityList<M>,
        inst: Inst,
    ) -> Result<(), IrError> {
        list.remove(inst, &mut self.insts)
    }

    pub fn pass_list_pop_first<M: PassListMembership>(
        &mut self,
        list: &mut EntityList<M>,
    ) -> Option<Inst> {
        let first = list.first()?;
        list.remove(first, &mut self.insts).ok()?;
        Some(first)
    }

    /// Detach every member of `list`, leaving it empty.
    pub fn pass_list_clear<M: PassListMembership>(&mut self, list: &mut EntityList<M>) {
        list.clear(&mut self.insts);
    }
}

/// Instruction groups (units which scheduling must keep together).
impl Program {
    /// Make `members` (in order) the group led by `parent`.
    pub fn link_inst_group(&mut self, parent: Inst, members: &[Inst]) -> Result<(), IrError> {
        self.insts.try_get(parent)?;
        for &member in members {
            self.insts.try_get(member)?;
        }

        self.insts[parent].group.next = members.first().copied();
        for (i, &member) in members.iter().enumerate() {
            let group = &mut self.insts[member].group;
            group.parent = Some(parent);
            group.child_index = i as u32;
            group.next = members.get(i + 1).copied();
        }
        Ok(())
    }

    /// The members of the group led by `parent`, in order (stopping early
    /// at any member that was freed in the meantime).
    pub fn inst_group(&self, parent: Inst) -> impl Iterator<Item = Inst> + '_ {
        let mut next = self.insts.get(parent).and_then(|def| def.group.next);
        std::iter::from_fn(move || {
            let member = next?;
            next = self.insts.get(member)?.group.next;
            Some(member)
        })
    }
}

/// Cross-checks.
impl Program {
    /// Check the liveness of every source of every instruction in every
    /// block, against the recorded destination liveness.
    pub fn check_liveness(&self, blocks: impl IntoIterator<Item = Block>) -> Result<(), IrError> {
        for block in blocks {
            for inst in self.at_block(block) {
                let def = inst.def();
                let live_dests = def.live_dest_masks();
                for arg in 0..def.src_count() {
                    def.check_live_chans_in_arg(arg, &live_dests)?;
                }
            }
        }
        Ok(())
    }

    /// Check the repeat count of every instruction in every block, against
    /// limits that depend on operands set after the repeat count.
    pub fn check_repeats(&self, blocks: impl IntoIterator<Item = Block>) -> Result<(), IrError> {
        let target = self.target();
        for block in blocks {
            for inst in self.at_block(block) {
                inst.def().check_repeat(target)?;
            }
        }
        Ok(())
    }
}
