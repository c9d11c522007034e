//! Hardware target description.
//!
//! Everything that differs between GPU cores of the family (which opcodes
//! exist, how large some argument groups are, which hardware errata need to be
//! worked around) is expressed as data here, so one build can compile for any
//! (or several) of them, side by side.

use bitflags::bitflags;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GpuCore {
    Sgx530,
    Sgx540,
    Sgx543,
    Sgx545,
}

bitflags! {
    /// Optional instruction set features.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TargetFeatures: u32 {
        /// Vector (4-wide F32/F16) ALU instructions.
        const VECTOR_INSTRUCTIONS = 1 << 0;

        /// MOE increments may be encoded per-instruction (instead of only via
        /// a separate MOE state-setting instruction).
        const PER_INST_MOE_INCREMENTS = 1 << 1;

        /// 32-bit integer multiply-add, with a two-register result.
        const IMA32 = 1 << 2;

        /// Loads/stores to/from local (per-instance) memory.
        const LOCAL_MEMORY = 1 << 3;

        /// Texture samples with explicitly supplied gradients.
        const SAMPLE_GRADIENTS = 1 << 4;

        /// Per-channel (instead of only per-instruction) predication of
        /// vector instructions.
        const VECTOR_PREDICATES = 1 << 5;
    }
}

bitflags! {
    /// Known hardware errata, each named after its bug-tracker identifier.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Errata: u32 {
        /// Repeated instructions touching internal (`FpInternal`) registers,
        /// or using dynamic indexing, misbehave above a small repeat count.
        //
        // FIXME only the numeric effect (see `BRN21752_MAX_REPEAT`) is known,
        // get the actual errata documentation before porting to new revisions.
        const BRN21752 = 1 << 0;
    }
}

/// Maximum repeat count for instructions affected by [`Errata::BRN21752`].
pub const BRN21752_MAX_REPEAT: u8 = 4;

/// Hardware target, passed (via `Context`) into every capability query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub core: GpuCore,
    pub revision: u32,
    pub features: TargetFeatures,
    pub errata: Errata,

    /// Size (in 32-bit words) of a texture state block, i.e. the number of
    /// texture state arguments a sample instruction actually uses.
    pub texture_state_words: u8,
}

impl Target {
    pub const SGX530: Self = Self {
        core: GpuCore::Sgx530,
        revision: 125,
        features: TargetFeatures::empty(),
        errata: Errata::BRN21752,
        texture_state_words: 3,
    };
    pub const SGX540: Self = Self {
        core: GpuCore::Sgx540,
        revision: 120,
        ..Self::SGX530
    };
    pub const SGX543: Self = Self {
        core: GpuCore::Sgx543,
        revision: 113,
        features: TargetFeatures::VECTOR_INSTRUCTIONS
            .union(TargetFeatures::PER_INST_MOE_INCREMENTS)
            .union(TargetFeatures::LOCAL_MEMORY)
            .union(TargetFeatures::VECTOR_PREDICATES),
        errata: Errata::empty(),
        texture_state_words: 4,
    };
    pub const SGX545: Self = Self {
        core: GpuCore::Sgx545,
        revision: 109,
        features: TargetFeatures::PER_INST_MOE_INCREMENTS
            .union(TargetFeatures::IMA32)
            .union(TargetFeatures::LOCAL_MEMORY)
            .union(TargetFeatures::SAMPLE_GRADIENTS),
        errata: Errata::empty(),
        texture_state_words: 4,
    };

    /// All the preset targets, mostly useful for exhaustive testing.
    pub const ALL: [Self; 4] = [Self::SGX530, Self::SGX540, Self::SGX543, Self::SGX545];

    pub fn supports(&self, features: TargetFeatures) -> bool {
        self.features.contains(features)
    }

    pub fn has_erratum(&self, errata: Errata) -> bool {
        self.errata.intersects(errata)
    }
}
