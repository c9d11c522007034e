//! Instruction IR for a USC-style (scalar/vector, multi-bank register file)
//! GPU shader compiler backend.
//!
//! The IR is a set of basic blocks, each an ordered list of instructions
//! ([`InstDef`]), with every instruction made of:
//! * an [`Opcode`], which selects a static [`InstDesc`] (capabilities such as
//!   repeats, predication, destination masking, register field widths, and
//!   the grouping of arguments the hardware reads as consecutive registers)
//! * destination and source operands ([`Arg`]), each naming one register in
//!   one [`RegBank`] (optionally dynamically indexed)
//! * predicates, repeat settings and per-opcode parameters ([`InstParams`])
//!
//! All instructions are owned by a [`Program`] (and referred to by [`Inst`]
//! handles), which can thread each of them through several intrusive lists at
//! once: the block they're in, the per-opcode list of all instructions, and
//! up to two lists owned by the pass currently running (see
//! [`PassListMembership`]).
//!
//! Queries that depend on the GPU being compiled for take a [`Target`], so
//! one process can compile for several cores at once.

use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

mod context;
mod error;
mod family;
mod group;
mod inst;
mod opcode;
mod operand;
mod pass;
mod program;
mod target;

pub mod desc;
pub mod func_at;
pub mod liveness;
pub mod params;
pub mod print;
pub mod transform;
pub mod visit;

pub use context::{
    Block, Context, Entity, EntityDefs, EntityList, EntityListIter, EntityListLinks, Inst,
    InternedStr, ListMembership,
};
pub use desc::InstDesc;
pub use error::IrError;
pub use family::{generic_can_use_dest, generic_can_use_src, OpcodeBehavior, OpcodeFamily};
pub use func_at::{BlockAt, BlockAtMut};
pub use group::{RegGroup, MAX_DEST_GROUPS, MAX_SRC_GROUPS};
pub use inst::{
    implied_repeat_count, DebugLoc, DestSlot, InBlock, InOpcodeList, InScratch, InWorklist,
    InstDef, InstFlags, InstGroupLinks,
};
pub use opcode::Opcode;
pub use operand::{Arg, ChanMask, DynIndex, PredSrc, RegBank, RegFormat};
pub use params::InstParams;
pub use pass::{PassLocal, WeakInstList};
pub use program::{BlockDef, PassListMembership, Program};
pub use target::{Errata, GpuCore, Target, TargetFeatures, BRN21752_MAX_REPEAT};
pub use transform::Transformed;

pub type FxIndexMap<K, V> = indexmap::IndexMap<K, V, BuildHasherDefault<FxHasher>>;
pub type FxIndexSet<V> = indexmap::IndexSet<V, BuildHasherDefault<FxHasher>>;
