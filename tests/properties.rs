//! Property-based tests of the IR model invariants generic passes rely on.

use proptest::prelude::*;
use std::rc::Rc;
use usc_ir::desc::{mem_args, smp_args};
use usc_ir::{
    Arg, ChanMask, Context, DynIndex, InstDef, IrError, Opcode, Program, RegBank, RegFormat,
    Target,
};

// ── Strategies ──────────────────────────────────────────────────────────

fn arb_opcode() -> impl Strategy<Value = Opcode> {
    prop::sample::select(Opcode::ALL)
}

fn arb_format() -> impl Strategy<Value = RegFormat> {
    prop::sample::select(vec![
        RegFormat::F32,
        RegFormat::F16,
        RegFormat::C10,
        RegFormat::U8,
        RegFormat::Untyped,
    ])
}

fn arb_chan_mask() -> impl Strategy<Value = ChanMask> {
    (0u8..16).prop_map(ChanMask::from_bits_truncate)
}

fn arb_indexable_bank() -> impl Strategy<Value = RegBank> {
    prop::sample::select(vec![RegBank::Temp, RegBank::PrimAttr, RegBank::SecAttr, RegBank::Output])
}

fn arb_dyn_index() -> impl Strategy<Value = DynIndex> {
    (0u32..4, 0u32..8, prop::sample::select(vec![1u32, 4, 16])).prop_map(
        |(number, array_offset, stride_in_bytes)| DynIndex {
            bank: RegBank::Index,
            number,
            array_offset,
            stride_in_bytes,
        },
    )
}

/// Register operands, optionally dynamically indexed and/or array-offset.
fn arb_arg() -> impl Strategy<Value = Arg> {
    (
        arb_indexable_bank(),
        0u32..128,
        arb_format(),
        prop::option::of(arb_dyn_index()),
        0u32..4,
    )
        .prop_map(|(bank, number, format, index, array_offset)| {
            let arg = Arg::new(bank, number, format).with_array_offset(array_offset);
            match index {
                Some(index) => arg.with_index(index),
                None => arg,
            }
        })
}

/// An instruction of any opcode, with every source a distinct temporary
/// (or left unused), and arbitrary write masks on maskable destinations.
fn arb_inst() -> impl Strategy<Value = InstDef> {
    (arb_opcode(), prop::collection::vec(any::<bool>(), 16), prop::collection::vec(0u8..16, 2))
        .prop_map(|(opcode, used, masks)| {
            let mut inst = InstDef::new(opcode);
            for arg in 0..inst.src_count() {
                if used[arg] {
                    inst.set_src(arg, Arg::temp(arg as u32, RegFormat::F32));
                }
            }
            for dest in 0..inst.dest_count() {
                inst.set_dest(dest, Arg::temp(100 + dest as u32, RegFormat::F32));
                let mask = ChanMask::from_bits_truncate(masks[dest % masks.len()]);
                inst.set_dest_mask(dest, inst.minimal_dest_mask(dest, mask));
            }
            inst
        })
}

// ── Operands ────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn arg_equality_ignores_format(arg in arb_arg(), format in arb_format()) {
        prop_assert_eq!(arg, arg);

        let reinterpreted = arg.with_format(format);
        prop_assert_eq!(arg, reinterpreted);
        prop_assert_eq!(reinterpreted, arg);
        prop_assert_eq!(arg.cmp(&reinterpreted), std::cmp::Ordering::Equal);
    }

    #[test]
    fn arg_order_agrees_with_equality(a in arb_arg(), b in arb_arg()) {
        prop_assert_eq!(a == b, a.cmp(&b) == std::cmp::Ordering::Equal);
        prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
    }

    #[test]
    fn array_set_is_consecutive(
        bank in arb_indexable_bank(),
        base in 0u32..64,
        count in 0u32..8,
        format in arb_format(),
    ) {
        let args: Vec<_> = Arg::array_set(bank, base, count, format).collect();
        prop_assert_eq!(args.len(), count as usize);
        for (i, arg) in args.iter().enumerate() {
            prop_assert_eq!(arg, &Arg::new(bank, base + i as u32, format));
            prop_assert_eq!(arg.index, None);
        }
    }
}

// ── Descriptor table ────────────────────────────────────────────────────

#[test]
fn every_opcode_has_a_consistent_descriptor() {
    for &opcode in Opcode::ALL {
        let desc = opcode.desc();
        assert_eq!(usize::from(desc.moe_arg_count), desc.moe_remap.len(), "{opcode:?}");

        let inst = InstDef::new(opcode);
        assert_eq!(inst.dest_count(), usize::from(desc.dest_count), "{opcode:?}");
        assert_eq!(inst.src_count(), usize::from(desc.default_arg_count), "{opcode:?}");

        let expected_args = if opcode.is_load() {
            Some(mem_args::LOAD_COUNT)
        } else if opcode.is_store() {
            Some(mem_args::STORE_COUNT)
        } else if opcode.is_texture_sample() {
            Some(smp_args::COUNT)
        } else {
            None
        };
        if let Some(expected_args) = expected_args {
            assert_eq!(inst.src_count(), expected_args, "{opcode:?}");
        }
        if opcode.is_store() {
            assert_eq!(inst.dest_count(), 0, "{opcode:?}");
        }
    }
}

#[test]
fn every_target_has_basic_opcodes() {
    for target in Target::ALL {
        for opcode in [Opcode::Nop, Opcode::Mov, Opcode::Fmad, Opcode::Ldad, Opcode::Smp] {
            assert!(opcode.desc().is_available_on(&target), "{opcode:?} on {:?}", target.core);
        }
    }
}

// ── Masks, liveness, groups ─────────────────────────────────────────────

proptest! {
    #[test]
    fn minimal_dest_mask_is_a_widening_fixpoint(
        opcode in arb_opcode(),
        requested in arb_chan_mask(),
    ) {
        let inst = InstDef::new(opcode);
        for dest in 0..inst.dest_count() {
            let minimal = inst.minimal_dest_mask(dest, requested);
            prop_assert!(
                minimal.contains(requested),
                "{:?}: {:?} widened to {:?}",
                opcode,
                requested,
                minimal
            );
            prop_assert_eq!(inst.minimal_dest_mask(dest, minimal), minimal);
        }
    }

    #[test]
    fn liveness_never_exceeds_default(
        inst in arb_inst(),
        live in prop::collection::vec(arb_chan_mask(), 2),
    ) {
        let live_dests = &live[..inst.dest_count()];
        for arg in 0..inst.src_count() {
            let live_in_arg = inst.check_live_chans_in_arg(arg, live_dests);
            prop_assert!(live_in_arg.is_ok(), "{:?}", live_in_arg);

            let live_in_arg = live_in_arg.unwrap();
            prop_assert!(inst.src(arg).chan_mask().contains(live_in_arg));
            prop_assert!(inst.live_chans_in_arg_default(arg, live_dests).contains(live_in_arg));
        }
    }

    #[test]
    fn register_groups_never_overlap(inst in arb_inst()) {
        for target in Target::ALL {
            if !inst.is_available_on(&target) {
                continue;
            }

            let groups = inst.source_register_groups(&target);
            for (i, a) in groups.iter().enumerate() {
                prop_assert!(a.range().end <= inst.src_count(), "{:?}", a);
                for b in &groups[..i] {
                    prop_assert!(!a.overlaps(b), "{:?}: {:?} and {:?}", inst.opcode(), a, b);
                }
                if let Some(dest) = a.aliases_dest {
                    prop_assert!(dest < inst.dest_count());
                    prop_assert_eq!(a.count, 1);
                }
            }

            let groups = inst.dest_register_groups();
            for (i, a) in groups.iter().enumerate() {
                prop_assert!(a.range().end <= inst.dest_count(), "{:?}", a);
                for b in &groups[..i] {
                    prop_assert!(!a.overlaps(b));
                }
            }
        }
    }
}

// ── Repeats ─────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn mask_only_repeats_reject_mismatched_counts(
        opcode in prop::sample::select(vec![Opcode::Fdsx, Opcode::Fdsy]),
        mask in 1u8..16,
        count in 1u8..=4,
    ) {
        let target = Target::SGX543;
        let mut inst = InstDef::new(opcode);
        prop_assert!(inst.use_repeat_mask_only());
        inst.set_repeat_mask(&target, mask).unwrap();

        let implied = usc_ir::implied_repeat_count(mask);
        prop_assert_eq!(inst.repeat_count(), implied);

        let result = inst.set_repeat_count(&target, count);
        if count == implied {
            prop_assert_eq!(result, Ok(()));
        } else {
            prop_assert_eq!(
                result,
                Err(IrError::RepeatCountMismatchesMask { opcode, count, mask })
            );
        }
        prop_assert_eq!(inst.repeat_count(), implied);
        prop_assert_eq!(inst.repeat_mask(), Some(mask));
    }

    #[test]
    fn repeat_count_within_target_maximum(opcode in arb_opcode(), count in 0u8..20) {
        for target in Target::ALL {
            let mut inst = InstDef::new(opcode);
            let max = inst.max_repeat_count(&target);
            match inst.set_repeat_count(&target, count) {
                Ok(()) => {
                    prop_assert!((1..=max).contains(&count));
                    prop_assert_eq!(inst.repeat_count(), count);
                    if inst.use_repeat_mask_only() {
                        prop_assert_eq!(
                            inst.repeat_mask().map(usc_ir::implied_repeat_count),
                            (count > 1).then_some(count)
                        );
                    }
                }
                Err(_) => prop_assert_eq!(inst.repeat_count(), 1),
            }
        }
    }
}

proptest! {
    #[test]
    fn set_opcode_keeps_repeats_within_target_maximum(
        from in arb_opcode(),
        to in arb_opcode(),
        count in 1u8..=16,
        internal_src in any::<bool>(),
    ) {
        for target in Target::ALL {
            let mut program = Program::new(Rc::new(Context::new(target.clone())));
            let inst = program.alloc_inst(None);
            if program.set_opcode(inst, from).is_err() {
                continue;
            }
            let def = program.inst_mut(inst);
            if internal_src && def.src_count() > 0 {
                def.set_src(0, Arg::new(RegBank::FpInternal, 0, RegFormat::F32));
            }
            let _ = def.set_repeat_count(&target, count);

            if program.set_opcode(inst, to).is_err() {
                prop_assert_eq!(program.inst(inst).opcode(), from);
                continue;
            }
            let def = program.inst(inst);
            prop_assert!(def.repeat_count() >= 1);
            prop_assert!(
                def.repeat_count() <= def.max_repeat_count(&target),
                "{:?} -> {:?} on {:?}: rpt{}",
                from,
                to,
                target.core,
                def.repeat_count()
            );
            prop_assert_eq!(def.check_repeat(&target), Ok(()));
            if def.use_repeat_mask_only() {
                prop_assert_eq!(
                    def.repeat_mask().map_or(1, usc_ir::implied_repeat_count),
                    def.repeat_count()
                );
            }
        }
    }
}

// ── Block lists ─────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn insert_then_remove_preserves_block(
        len in 0usize..12,
        position in any::<prop::sample::Index>(),
    ) {
        let mut program = Program::new(Rc::new(Context::new(Target::SGX540)));
        let block = program.alloc_block();
        for _ in 0..len {
            let inst = program.alloc_inst(None);
            program.insert_inst(block, inst).unwrap();
        }
        let before: Vec<_> =
            program.at_block(block).into_iter().map(|inst| inst.position).collect();

        let inst = program.alloc_inst(None);
        match before.get(position.index(len + 1)) {
            Some(&next) => program.insert_inst_before(block, inst, next).unwrap(),
            None => program.insert_inst(block, inst).unwrap(),
        }
        prop_assert_eq!(program.block(block).insts().len(), len + 1);
        program.remove_inst(block, inst).unwrap();

        let after: Vec<_> =
            program.at_block(block).into_iter().map(|inst| inst.position).collect();
        prop_assert_eq!(&after, &before);
        prop_assert_eq!(program.block(block).insts().len(), len);
        prop_assert_eq!(program.inst(inst).block(), None);
        prop_assert!(program.free_inst(inst).is_ok());
    }
}
