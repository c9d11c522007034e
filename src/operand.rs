//! Instruction operands ([`Arg`]) and channel masks.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Register bank (or "register file") an [`Arg`] refers to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegBank {
    /// Per-instance temporaries.
    Temp,
    /// Primary attributes (per-instance inputs, also usable as temporaries).
    PrimAttr,
    /// Secondary attributes (uniform across instances, e.g. constants).
    SecAttr,
    Output,
    /// ALU-internal registers (shared by e.g. `EFO` and its neighbors).
    FpInternal,
    /// Not a register at all: `Arg::number` is the literal value.
    Immediate,
    Predicate,
    /// Index registers, only usable for dynamic indexing of other operands.
    Index,
    Global,
    /// Hardware constants (e.g. `0.0`, `1.0`), read-only.
    SpecialConst,
    /// Array-backed virtual registers, resolved to real banks before
    /// register allocation (see `Arg::array_offset`).
    RegArray,
    /// Dependent-read counters (used to wait on memory/texture results).
    Drc,
    /// Placeholder for unused argument slots.
    Unused,
}

impl RegBank {
    /// Whether operands in this bank can carry a dynamic index.
    pub fn supports_dynamic_index(self) -> bool {
        matches!(self, Self::Temp | Self::PrimAttr | Self::SecAttr | Self::Output)
    }

    /// Whether operands in this bank hold (32-bit, 4-channel) data registers.
    pub fn is_data_register(self) -> bool {
        matches!(
            self,
            Self::Temp
                | Self::PrimAttr
                | Self::SecAttr
                | Self::Output
                | Self::FpInternal
                | Self::Global
                | Self::SpecialConst
                | Self::RegArray
        )
    }
}

/// How the bits of a register are interpreted.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RegFormat {
    F32,
    F16,
    /// 10-bit fixed-point, one value per 8-bit channel (plus overflow bits).
    C10,
    U8,
    Untyped,
}

/// Dynamic (runtime-computed) index, applied on top of a static register number.
///
/// The effective register (or memory) location is
/// `number + array_offset + value_of(index register) * stride_in_bytes`,
/// interpreted according to the addressing mode of the consuming instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DynIndex {
    pub bank: RegBank,
    pub number: u32,
    pub array_offset: u32,
    pub stride_in_bytes: u32,
}

/// One source or destination operand of an instruction.
///
/// Equality, hashing and ordering only consider *which* register is referred
/// to (`bank`, `number`, `index`, `array_offset`), *not* `format` (two views of
/// the same bits are still the same register), nor `number_pre_indexing`
/// (which is bookkeeping for earlier passes).
#[derive(Copy, Clone, Debug)]
pub struct Arg {
    pub bank: RegBank,

    /// Register number, or the literal value for `RegBank::Immediate`.
    pub number: u32,

    /// Dynamic index, `None` for statically addressed operands (and required
    /// to be `None` for `RegBank::Immediate`).
    pub index: Option<DynIndex>,

    /// Static offset into the register array, for `RegBank::RegArray`.
    pub array_offset: u32,

    /// `number` before any implicit index/offset adjustments made by earlier
    /// passes (kept so later passes can recover the original intent).
    pub number_pre_indexing: u32,

    pub format: RegFormat,
}

impl Arg {
    pub const UNUSED: Arg = Arg::new(RegBank::Unused, 0, RegFormat::Untyped);

    pub const fn new(bank: RegBank, number: u32, format: RegFormat) -> Self {
        Self {
            bank,
            number,
            index: None,
            array_offset: 0,
            number_pre_indexing: number,
            format,
        }
    }

    pub const fn temp(number: u32, format: RegFormat) -> Self {
        Self::new(RegBank::Temp, number, format)
    }

    pub const fn imm(value: u32) -> Self {
        Self::new(RegBank::Immediate, value, RegFormat::Untyped)
    }

    pub const fn pred(number: u32) -> Self {
        Self::new(RegBank::Predicate, number, RegFormat::Untyped)
    }

    /// `count` operands in `bank` with consecutive numbers starting at `base`,
    /// e.g. for the per-component expansion of a vector into scalar slots.
    pub fn array_set(
        bank: RegBank,
        base: u32,
        count: u32,
        format: RegFormat,
    ) -> impl ExactSizeIterator<Item = Arg> + Clone {
        (0..count).map(move |i| Arg::new(bank, base + i, format))
    }

    #[track_caller]
    pub fn with_index(self, index: DynIndex) -> Self {
        assert!(
            self.bank.supports_dynamic_index(),
            "{:?} operands cannot be dynamically indexed",
            self.bank
        );
        Self { index: Some(index), ..self }
    }

    pub fn with_array_offset(self, array_offset: u32) -> Self {
        Self { array_offset, ..self }
    }

    pub fn with_format(self, format: RegFormat) -> Self {
        Self { format, ..self }
    }

    pub fn is_unused(&self) -> bool {
        self.bank == RegBank::Unused
    }

    pub fn is_imm(&self) -> bool {
        self.bank == RegBank::Immediate
    }

    pub fn index_bank(&self) -> Option<RegBank> {
        self.index.map(|index| index.bank)
    }

    /// All the channels this operand actually has, i.e. the most that can
    /// ever be read from (or written to) it.
    pub fn chan_mask(&self) -> ChanMask {
        match self.bank {
            RegBank::Unused => ChanMask::NONE,
            _ => ChanMask::ALL,
        }
    }

    fn identity(&self) -> (RegBank, u32, Option<DynIndex>, u32) {
        let Self { bank, number, index, array_offset, number_pre_indexing: _, format: _ } = *self;
        (bank, number, index, array_offset)
    }
}

impl PartialEq for Arg {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Arg {}

impl Hash for Arg {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl PartialOrd for Arg {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Arg {
    fn cmp(&self, other: &Self) -> Ordering {
        self.identity().cmp(&other.identity())
    }
}

/// Predicate source of an instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PredSrc {
    pub reg: u32,
    pub negate: bool,
}

/// Set of channels (`x`, `y`, `z`, `w`) of a register.
///
/// For scalar (32-bit) registers channels are the four bytes (`x` being the
/// least significant), for vector registers they're the four components.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct ChanMask(u8);

impl ChanMask {
    pub const NONE: Self = Self(0);
    pub const X: Self = Self(0b0001);
    pub const Y: Self = Self(0b0010);
    pub const Z: Self = Self(0b0100);
    pub const W: Self = Self(0b1000);
    pub const XY: Self = Self(0b0011);
    pub const ZW: Self = Self(0b1100);
    pub const XYZ: Self = Self(0b0111);
    pub const ALL: Self = Self(0b1111);

    pub const CHAN_COUNT: usize = 4;

    /// Build a mask out of the low 4 bits of `bits` (higher bits are ignored).
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    #[track_caller]
    pub fn chan(i: usize) -> Self {
        assert!(i < Self::CHAN_COUNT, "channel index {i} out of range");
        Self(1 << i)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn has_chan(self, i: usize) -> bool {
        i < Self::CHAN_COUNT && self.0 & (1 << i) != 0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Indices of the channels in this mask, in increasing order.
    pub fn chans(self) -> impl Iterator<Item = usize> + Clone {
        (0..Self::CHAN_COUNT).filter(move |&i| self.has_chan(i))
    }
}

impl fmt::Debug for ChanMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChanMask(")?;
        for (i, name) in ['x', 'y', 'z', 'w'].into_iter().enumerate() {
            write!(f, "{}", if self.has_chan(i) { name } else { '_' })?;
        }
        write!(f, ")")
    }
}

impl BitOr for ChanMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ChanMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ChanMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for ChanMask {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for ChanMask {
    type Output = Self;
    fn not(self) -> Self {
        Self(!self.0 & Self::ALL.0)
    }
}

impl FromIterator<usize> for ChanMask {
    fn from_iter<I: IntoIterator<Item = usize>>(chans: I) -> Self {
        chans.into_iter().fold(Self::NONE, |mask, i| mask | Self::chan(i))
    }
}
