//! Traversal helpers for blocks and their instructions.
//!
//! `BlockAt<P>`/`BlockAtMut<P>` are like `(&Program, P)`/`(&mut Program, P)`
//! (where `P` is some type describing a "position" in the program), except:
//! * they only borrow the `EntityDefs` fields of `Program`
//!   * this can prevent borrow conflicts, especially when mutating other fields
//!   * `BlockAtMut` can't change block membership (only `Program` can)
//! * they're dedicated types with inherent methods and trait `impl`s

use crate::inst::InBlock;
use crate::{Block, BlockDef, EntityDefs, EntityList, EntityListIter, Inst, InstDef};

/// Immutable traversal (i.e. visiting) helper for blocks and instructions.
///
/// The point/position type `P` should be an entity or a shallow entity wrapper
/// (e.g. `EntityList<InBlock>`).
#[derive(Copy, Clone)]
pub struct BlockAt<'a, P: Copy> {
    pub insts: &'a EntityDefs<Inst>,
    pub blocks: &'a EntityDefs<Block>,

    pub position: P,
}

impl<'a, P: Copy> BlockAt<'a, P> {
    /// Reposition to `new_position`.
    pub fn at<P2: Copy>(self, new_position: P2) -> BlockAt<'a, P2> {
        BlockAt { insts: self.insts, blocks: self.blocks, position: new_position }
    }
}

impl<'a> BlockAt<'a, Block> {
    pub fn def(self) -> &'a BlockDef {
        &self.blocks[self.position]
    }
}

impl<'a> IntoIterator for BlockAt<'a, Block> {
    type IntoIter = BlockAt<'a, Option<EntityListIter<InBlock>>>;
    type Item = BlockAt<'a, Inst>;
    fn into_iter(self) -> Self::IntoIter {
        self.at(self.def().insts()).into_iter()
    }
}

impl<'a> IntoIterator for BlockAt<'a, EntityList<InBlock>> {
    type IntoIter = BlockAt<'a, Option<EntityListIter<InBlock>>>;
    type Item = BlockAt<'a, Inst>;
    fn into_iter(self) -> Self::IntoIter {
        self.at(Some(self.position.iter()))
    }
}

impl<'a> Iterator for BlockAt<'a, Option<EntityListIter<InBlock>>> {
    type Item = BlockAt<'a, Inst>;
    fn next(&mut self) -> Option<Self::Item> {
        let (next, rest) = self.position?.split_first(self.insts)?;
        self.position = rest;
        Some(self.at(next))
    }
}

impl DoubleEndedIterator for BlockAt<'_, Option<EntityListIter<InBlock>>> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let (prev, rest) = self.position?.split_last(self.insts)?;
        self.position = rest;
        Some(self.at(prev))
    }
}

impl<'a> BlockAt<'a, Inst> {
    pub fn def(self) -> &'a InstDef {
        &self.insts[self.position]
    }

    /// The next instruction in the same block, if any.
    pub fn next_in_block(self) -> Option<Self> {
        let next = self.def().block_links.next()?;
        Some(self.at(next))
    }

    /// The previous instruction in the same block, if any.
    pub fn prev_in_block(self) -> Option<Self> {
        let prev = self.def().block_links.prev()?;
        Some(self.at(prev))
    }
}

/// Mutable traversal (i.e. transforming) helper for blocks and instructions.
///
/// The point/position type `P` should be an entity or a shallow entity wrapper
/// (e.g. `EntityList<InBlock>`).
pub struct BlockAtMut<'a, P: Copy> {
    pub insts: &'a mut EntityDefs<Inst>,
    pub blocks: &'a EntityDefs<Block>,

    pub position: P,
}

impl<'a, P: Copy> BlockAtMut<'a, P> {
    /// Emulate a "reborrow", which is automatic only for `&mut` types.
    pub fn reborrow(&mut self) -> BlockAtMut<'_, P> {
        BlockAtMut { insts: self.insts, blocks: self.blocks, position: self.position }
    }

    /// Reposition to `new_position`.
    pub fn at<P2: Copy>(self, new_position: P2) -> BlockAtMut<'a, P2> {
        BlockAtMut { insts: self.insts, blocks: self.blocks, position: new_position }
    }

    /// Downgrade to immutable traversal.
    pub fn freeze(self) -> BlockAt<'a, P> {
        BlockAt { insts: self.insts, blocks: self.blocks, position: self.position }
    }
}

// HACK can't implement `IntoIterator` because `next` borrows `self`.
impl<'a> BlockAtMut<'a, Block> {
    pub fn into_iter(self) -> BlockAtMut<'a, Option<EntityListIter<InBlock>>> {
        let iter = Some(self.blocks[self.position].insts().iter());
        self.at(iter)
    }
}

// HACK can't implement `Iterator` because `next` borrows `self`.
impl BlockAtMut<'_, Option<EntityListIter<InBlock>>> {
    pub fn next(&mut self) -> Option<BlockAtMut<'_, Inst>> {
        let (next, rest) = self.position?.split_first(self.insts)?;
        self.position = rest;
        Some(self.reborrow().at(next))
    }
}

impl<'a> BlockAtMut<'a, Inst> {
    pub fn def(self) -> &'a mut InstDef {
        &mut self.insts[self.position]
    }
}
