//! # Operating Modes
//!
//! The mode field (CPSR bits 4-0) selects privilege and which physical
//! registers back R8-R14:
//!
//! ```text
//! ┌────────────┬──────┬──────────────────────────┬──────┐
//! │ Mode       │ Bits │ Banked registers         │ SPSR │
//! ├────────────┼──────┼──────────────────────────┼──────┤
//! │ User       │10000 │ -                        │  no  │
//! │ FIQ        │10001 │ R8-R14                   │ yes  │
//! │ IRQ        │10010 │ R13-R14                  │ yes  │
//! │ Supervisor │10011 │ R13-R14                  │ yes  │
//! │ Abort      │10111 │ R13-R14                  │ yes  │
//! │ Undefined  │11011 │ R13-R14                  │ yes  │
//! │ System     │11111 │ - (shares User registers)│  no  │
//! └────────────┴──────┴──────────────────────────┴──────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CpuError;

/// Mask of the mode field inside a PSR.
pub const MODE_MASK: u32 = 0b1_1111;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Mode {
    /// The normal ARM program execution state.
    User = 0b10000,

    /// Designed to support a data transfer or channel process.
    Fiq = 0b10001,

    /// Used for general-purpose interrupt handling.
    Irq = 0b10010,

    /// Protected mode for the operating system.
    Supervisor = 0b10011,

    /// Entered after a data or instruction prefetch abort.
    Abort = 0b10111,

    /// Entered when an undefined instruction is executed.
    Undefined = 0b11011,

    /// A privileged user mode for the operating system.
    System = 0b11111,
}

impl Mode {
    /// Every mode except User may change the control bits of the CPSR.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        !matches!(self, Self::User)
    }

    /// User and System share the same registers and have no SPSR.
    #[must_use]
    pub const fn has_spsr(self) -> bool {
        !matches!(self, Self::User | Self::System)
    }
}

impl From<Mode> for u32 {
    fn from(m: Mode) -> Self {
        m as Self
    }
}

impl TryFrom<u32> for Mode {
    type Error = CpuError;

    /// Decodes the low 5 bits of a PSR word.
    fn try_from(psr: u32) -> Result<Self, Self::Error> {
        match psr & MODE_MASK {
            0b10000 => Ok(Self::User),
            0b10001 => Ok(Self::Fiq),
            0b10010 => Ok(Self::Irq),
            0b10011 => Ok(Self::Supervisor),
            0b10111 => Ok(Self::Abort),
            0b11011 => Ok(Self::Undefined),
            0b11111 => Ok(Self::System),
            mode_bits => Err(CpuError::CorruptedMode { psr, mode_bits }),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => f.write_str("USR"),
            Self::Fiq => f.write_str("FIQ"),
            Self::Irq => f.write_str("IRQ"),
            Self::Supervisor => f.write_str("SVC"),
            Self::Abort => f.write_str("ABT"),
            Self::Undefined => f.write_str("UND"),
            Self::System => f.write_str("SYS"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_legal_modes() {
        for mode in [
            Mode::User,
            Mode::Fiq,
            Mode::Irq,
            Mode::Supervisor,
            Mode::Abort,
            Mode::Undefined,
            Mode::System,
        ] {
            let raw: u32 = mode.into();
            assert_eq!(Mode::try_from(raw), Ok(mode));
            assert_eq!(Mode::try_from(raw | 0xF000_00C0), Ok(mode));
        }
    }

    #[test]
    fn decode_illegal_modes() {
        let legal = [0x10, 0x11, 0x12, 0x13, 0x17, 0x1B, 0x1F];
        for bits in (0..=MODE_MASK).filter(|b| !legal.contains(b)) {
            assert_eq!(
                Mode::try_from(0x6000_0000 | bits),
                Err(CpuError::CorruptedMode {
                    psr: 0x6000_0000 | bits,
                    mode_bits: bits
                })
            );
        }
    }

    #[test]
    fn privileges() {
        assert!(!Mode::User.is_privileged());
        assert!(Mode::System.is_privileged());
        assert!(!Mode::System.has_spsr());
        assert!(Mode::Irq.has_spsr());
    }
}
