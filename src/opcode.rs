//! Opcodes, and a few opcode-level properties that don't need the descriptor table.

macro_rules! def_opcodes {
    ($($group:ident: [$($name:ident = $mnemonic:literal),+ $(,)?]),+ $(,)?) => {
        #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(u16)]
        pub enum Opcode {
            $($($name,)+)+
        }

        impl Opcode {
            /// Every opcode, in declaration (and discriminant) order.
            pub const ALL: &'static [Opcode] = &[$($(Opcode::$name,)+)+];

            pub const COUNT: usize = Self::ALL.len();

            pub fn mnemonic(self) -> &'static str {
                match self {
                    $($(Opcode::$name => $mnemonic,)+)+
                }
            }

            /// Dense index, usable for tables of size [`Opcode::COUNT`].
            #[inline]
            pub fn index(self) -> usize {
                self as usize
            }
        }
    };
}

def_opcodes! {
    misc: [
        Nop = "nop",
        Wdf = "wdf",
        Idf = "idf",
    ],
    moves: [
        Mov = "mov",
        Limm = "limm",
    ],
    bitwise: [
        And = "and",
        Or = "or",
        Xor = "xor",
        Not = "not",
        Shl = "shl",
        Shr = "shr",
        Asr = "asr",
    ],
    float: [
        Fmad = "fmad",
        Fmul = "fmul",
        Fadd = "fadd",
        Fsub = "fsub",
        Fmin = "fmin",
        Fmax = "fmax",
        Fmad16 = "fmad16",
        Frcp = "frcp",
        Frsq = "frsq",
        Fexp = "fexp",
        Flog = "flog",
        Fsin = "fsin",
        Fcos = "fcos",
        Ffrc = "ffrc",
        Ftrc = "ftrc",
        Fdsx = "fdsx",
        Fdsy = "fdsy",
        Fdp3 = "fdp3",
    ],
    pack: [
        PckF16F32 = "pckf16f32",
        PckU8F32 = "pcku8f32",
        PckC10F32 = "pckc10f32",
        UnpckF32F16 = "unpckf32f16",
        UnpckF32U8 = "unpckf32u8",
        UnpckF32C10 = "unpckf32c10",
    ],
    select: [
        Movc = "movc",
        Vmovc = "vmovc",
    ],
    byte_alu: [
        Sop2 = "sop2",
        Sop3 = "sop3",
        Lrp1 = "lrp1",
        Fpma = "fpma",
    ],
    integer: [
        Imae = "imae",
        Ima32 = "ima32",
        Ima16 = "ima16",
    ],
    efo: [
        Efo = "efo",
    ],
    test: [
        TestPred = "testpred",
        TestMask = "testmask",
        Setp = "setp",
    ],
    vector: [
        Vmad = "vmad",
        Vmul = "vmul",
        Vadd = "vadd",
        Vmin = "vmin",
        Vmax = "vmax",
        Vmov = "vmov",
        Vmad4 = "vmad4",
        Vdp3 = "vdp3",
        Vdp4 = "vdp4",
        Vrcp = "vrcp",
        Vrsq = "vrsq",
        Vexp = "vexp",
        Vlog = "vlog",
    ],
    memory: [
        Ldab = "ldab",
        Ldaw = "ldaw",
        Ldad = "ldad",
        Ldlb = "ldlb",
        Ldlw = "ldlw",
        Ldld = "ldld",
        Stab = "stab",
        Staw = "staw",
        Stad = "stad",
        Stlb = "stlb",
        Stlw = "stlw",
        Stld = "stld",
    ],
    texture: [
        Smp = "smp",
        SmpBias = "smpbias",
        SmpReplace = "smpreplace",
        SmpGrad = "smpgrad",
    ],
}

impl Opcode {
    pub fn is_load(self) -> bool {
        use Opcode::*;
        matches!(self, Ldab | Ldaw | Ldad | Ldlb | Ldlw | Ldld)
    }

    pub fn is_store(self) -> bool {
        use Opcode::*;
        matches!(self, Stab | Staw | Stad | Stlb | Stlw | Stld)
    }

    pub fn is_texture_sample(self) -> bool {
        matches!(self, Opcode::Smp | Opcode::SmpBias | Opcode::SmpReplace | Opcode::SmpGrad)
    }
}
