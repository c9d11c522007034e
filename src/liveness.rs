//! Channel liveness of instruction sources, i.e. which channels of each
//! source are read, given which channels of the destinations are needed.
//!
//! The per-family answers live in [`OpcodeBehavior`](crate::OpcodeBehavior)
//! implementations, this module only holds the conservative default, and the
//! entry points on [`InstDef`] (which also check the per-family answers
//! against the default).

use crate::{ChanMask, InstDef, IrError};

/// Union of the channels, over all destinations, that are both written and
/// live (which are the only ones worth computing at all).
pub fn written_live_chans(inst: &InstDef, live_dests: &[ChanMask]) -> ChanMask {
    live_dests
        .iter()
        .enumerate()
        .map(|(dest, &live)| live & inst.dest_mask(dest))
        .fold(ChanMask::NONE, |acc, live| acc | live)
}

/// Every channel of source `arg` is read whenever any channel of any
/// destination is live (or always, for instructions without destinations,
/// or with side effects).
pub fn live_chans_in_arg_default(inst: &InstDef, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
    let always_live = inst.dest_count() == 0 || inst.has_side_effects();
    if always_live || live_dests.iter().any(|live| !live.is_empty()) {
        inst.src(arg).chan_mask()
    } else {
        ChanMask::NONE
    }
}

impl InstDef {
    #[track_caller]
    fn check_live_dests(&self, live_dests: &[ChanMask]) {
        assert_eq!(
            live_dests.len(),
            self.dest_count(),
            "`{}`: one live channel mask per destination expected",
            self.opcode().mnemonic()
        );
    }

    /// Channels of source `arg` read, given that only `live_dests[d]` of
    /// each destination `d` are needed.
    #[track_caller]
    pub fn live_chans_in_arg(&self, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
        self.check_live_dests(live_dests);
        let live = self.desc().family.behavior().live_chans_in_arg(self, arg, live_dests);
        debug_assert!(
            live_chans_in_arg_default(self, arg, live_dests).contains(live),
            "`{}` source {arg}: {live:?} read, more than conservatively possible",
            self.opcode().mnemonic()
        );
        live
    }

    /// Like [`InstDef::live_chans_in_arg`], but always conservative.
    #[track_caller]
    pub fn live_chans_in_arg_default(&self, arg: usize, live_dests: &[ChanMask]) -> ChanMask {
        self.check_live_dests(live_dests);
        live_chans_in_arg_default(self, arg, live_dests)
    }

    /// Channels of source `arg` read, given the live channels recorded in
    /// every destination (see [`InstDef::set_live_chans_in_dest`]).
    #[track_caller]
    pub fn live_chans_in_src(&self, arg: usize) -> ChanMask {
        self.live_chans_in_arg(arg, &self.live_dest_masks())
    }

    /// Compute the liveness of source `arg`, failing (instead of asserting)
    /// if the answer exceeds the conservative default.
    #[track_caller]
    pub fn check_live_chans_in_arg(
        &self,
        arg: usize,
        live_dests: &[ChanMask],
    ) -> Result<ChanMask, IrError> {
        self.check_live_dests(live_dests);
        let claimed = self.desc().family.behavior().live_chans_in_arg(self, arg, live_dests);
        let allowed = live_chans_in_arg_default(self, arg, live_dests);
        if allowed.contains(claimed) {
            Ok(claimed)
        } else {
            tracing::warn!(
                opcode = self.opcode().mnemonic(),
                arg,
                ?claimed,
                ?allowed,
                "liveness override widened the conservative answer"
            );
            Err(IrError::LivenessWidened { opcode: self.opcode(), arg, claimed, allowed })
        }
    }
}
