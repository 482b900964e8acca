//! # Conditional Execution
//!
//! Every ARM instruction carries a condition in bits 31-28. The instruction
//! only executes when the CPSR flags satisfy it, otherwise it is skipped
//! without side effects.
//!
//! ```text
//! ┌───────┬────────┬─────────────────────┬──────────────────┐
//! │ Code  │ Suffix │     Meaning         │   Flags Tested   │
//! ├───────┼────────┼─────────────────────┼──────────────────┤
//! │ 0000  │   EQ   │ Equal               │ Z=1              │
//! │ 0001  │   NE   │ Not equal           │ Z=0              │
//! │ 0010  │   CS   │ Carry set / ≥ (uns) │ C=1              │
//! │ 0011  │   CC   │ Carry clear / < (u) │ C=0              │
//! │ 0100  │   MI   │ Minus / negative    │ N=1              │
//! │ 0101  │   PL   │ Plus / non-negative │ N=0              │
//! │ 0110  │   VS   │ Overflow set        │ V=1              │
//! │ 0111  │   VC   │ Overflow clear      │ V=0              │
//! │ 1000  │   HI   │ Higher (unsigned)   │ C=1 AND Z=0      │
//! │ 1001  │   LS   │ Lower/same (unsig)  │ C=0 OR Z=1       │
//! │ 1010  │   GE   │ ≥ (signed)          │ N=V              │
//! │ 1011  │   LT   │ < (signed)          │ N≠V              │
//! │ 1100  │   GT   │ > (signed)          │ Z=0 AND N=V      │
//! │ 1101  │   LE   │ ≤ (signed)          │ Z=1 OR N≠V       │
//! │ 1110  │   AL   │ Always              │ -                │
//! │ 1111  │   NV   │ Never (reserved)    │ -                │
//! └───────┴────────┴─────────────────────┴──────────────────┘
//! ```
//!
//! NV is reserved from `ARMv3` on. Old or broken binaries still contain it, so
//! it is handled as "never execute" rather than as an error.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::psr::Psr;
use crate::error::CpuError;

#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub enum Condition {
    EQ = 0x0,
    NE = 0x1,
    /// Also known as HS (Higher or Same).
    CS = 0x2,
    /// Also known as LO (Lower).
    CC = 0x3,
    MI = 0x4,
    PL = 0x5,
    VS = 0x6,
    VC = 0x7,
    HI = 0x8,
    LS = 0x9,
    GE = 0xA,
    LT = 0xB,
    GT = 0xC,
    LE = 0xD,
    AL = 0xE,
    NV = 0xF,
}

impl Condition {
    /// Extracts the condition field (bits 31-28) of an ARM op code.
    #[must_use]
    pub fn from_op_code(op_code: u32) -> Self {
        Self::from_nibble(op_code.get_bits(28..=31) as u8)
    }

    const fn from_nibble(nibble: u8) -> Self {
        match nibble & 0xF {
            0x0 => Self::EQ,
            0x1 => Self::NE,
            0x2 => Self::CS,
            0x3 => Self::CC,
            0x4 => Self::MI,
            0x5 => Self::PL,
            0x6 => Self::VS,
            0x7 => Self::VC,
            0x8 => Self::HI,
            0x9 => Self::LS,
            0xA => Self::GE,
            0xB => Self::LT,
            0xC => Self::GT,
            0xD => Self::LE,
            0xE => Self::AL,
            _ => Self::NV,
        }
    }

    /// Whether an instruction with this condition executes given the
    /// N, Z, C and V flags of `psr`.
    #[must_use]
    pub fn is_satisfied(self, psr: Psr) -> bool {
        let n = psr.sign_flag();
        let z = psr.zero_flag();
        let c = psr.carry_flag();
        let v = psr.overflow_flag();

        match self {
            Self::EQ => z,
            Self::NE => !z,
            Self::CS => c,
            Self::CC => !c,
            Self::MI => n,
            Self::PL => !n,
            Self::VS => v,
            Self::VC => !v,
            Self::HI => c && !z,
            Self::LS => !c || z,
            Self::GE => n == v,
            Self::LT => n != v,
            Self::GT => !z && (n == v),
            Self::LE => z || (n != v),
            Self::AL => true,
            Self::NV => false,
        }
    }
}

impl TryFrom<u8> for Condition {
    type Error = CpuError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > 0xF {
            return Err(CpuError::InvalidCondition(value));
        }

        Ok(Self::from_nibble(value))
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EQ => f.write_str("EQ"),
            Self::NE => f.write_str("NE"),
            Self::CS => f.write_str("CS"),
            Self::CC => f.write_str("CC"),
            Self::MI => f.write_str("MI"),
            Self::PL => f.write_str("PL"),
            Self::VS => f.write_str("VS"),
            Self::VC => f.write_str("VC"),
            Self::HI => f.write_str("HI"),
            Self::LS => f.write_str("LS"),
            Self::GE => f.write_str("GE"),
            Self::LT => f.write_str("LT"),
            Self::GT => f.write_str("GT"),
            Self::LE => f.write_str("LE"),
            Self::AL => Ok(()),
            Self::NV => f.write_str("NV"),
        }
    }
}
