//! Checked precondition failures.
//!
//! Everything here is a compiler-internal error (i.e. a bug in the pass that
//! triggered it), never a user-facing diagnostic. Queries whose "no" answer is
//! part of normal control-flow (e.g. [`InstDef::can_use_src`](crate::InstDef::can_use_src))
//! return `bool` instead.

use crate::{Block, ChanMask, GpuCore, Inst, Opcode};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IrError {
    #[error("{kind}({idx}) was used after being freed")]
    StaleHandle { kind: &'static str, idx: u32 },

    #[error("{kind}({idx}) is already a member of a {list} list")]
    AlreadyInList {
        kind: &'static str,
        idx: u32,
        list: &'static str,
    },

    #[error("{kind}({idx}) is not a member of this {list} list")]
    NotInList {
        kind: &'static str,
        idx: u32,
        list: &'static str,
    },

    #[error("{inst:?} is in {block:?}, and must be removed from it before being freed")]
    FreeAttached { inst: Inst, block: Block },

    #[error("{inst:?} is not in {block:?}")]
    NotInBlock { inst: Inst, block: Block },

    #[error("`{}` is not available on {core:?}", opcode.mnemonic())]
    OpcodeUnavailable { opcode: Opcode, core: GpuCore },

    #[error("`{}` cannot be repeated", opcode.mnemonic())]
    RepeatUnsupported { opcode: Opcode },

    #[error("`{}` cannot be repeated {count} times (maximum is {max})", opcode.mnemonic())]
    RepeatCountOutOfRange { opcode: Opcode, count: u8, max: u8 },

    #[error(
        "`{}` only supports repeat masks, and a repeat count of {count} \
         doesn't match the mask {mask:#06b}",
        opcode.mnemonic()
    )]
    RepeatCountMismatchesMask { opcode: Opcode, count: u8, mask: u8 },

    #[error("`{}` does not support repeat masks", opcode.mnemonic())]
    RepeatMaskUnsupported { opcode: Opcode },

    #[error("`{}` cannot be predicated", opcode.mnemonic())]
    PredicateUnsupported { opcode: Opcode },

    #[error("`{}` cannot be predicated on p{reg} (highest usable is p{max})", opcode.mnemonic())]
    PredicateRegOutOfRange { opcode: Opcode, reg: u32, max: u32 },

    #[error("`{}` cannot use per-channel predicates on {core:?}", opcode.mnemonic())]
    PerChanPredicateUnsupported { opcode: Opcode, core: GpuCore },

    #[error(
        "liveness of `{}` source {arg} claims {claimed:?}, \
         which is not within the conservative {allowed:?}",
        opcode.mnemonic()
    )]
    LivenessWidened {
        opcode: Opcode,
        arg: usize,
        claimed: ChanMask,
        allowed: ChanMask,
    },
}
