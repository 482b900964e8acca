//! # THUMB Instruction Decoding
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Format 5 BX:  0100 0111 0 H2 Rs(3) Rd(3)  (H1 = 0, Rd = 0)   │
//! │  Format 17:    1101 1111 Value8           Software interrupt │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! H2 extends Rs to the full R0-R15 range.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum ThumbModeInstruction {
    BranchAndExchange { register: usize },
    SoftwareInterrupt { comment: u8 },
    Undefined,
}

impl From<u16> for ThumbModeInstruction {
    fn from(op_code: u16) -> Self {
        if op_code & 0xFF80 == 0x4700 {
            Self::BranchAndExchange {
                register: op_code.get_bits(3..=6) as usize,
            }
        } else if op_code & 0xFF00 == 0xDF00 {
            Self::SoftwareInterrupt {
                comment: op_code.get_bits(0..=7) as u8,
            }
        } else {
            Self::Undefined
        }
    }
}

impl std::fmt::Display for ThumbModeInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BranchAndExchange { register } => write!(f, "BX R{register}"),
            Self::SoftwareInterrupt { comment } => write!(f, "SWI 0x{comment:02X}"),
            Self::Undefined => f.write_str("UNDEFINED"),
        }
    }
}
