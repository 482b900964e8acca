//! # Program Status Registers (CPSR and SPSR)
//!
//! The PSR holds the condition flags, the control bits and the operating mode.
//!
//! ```text
//! 31 30 29 28 27       10 9 8 7 6 5 4   0
//! ┌──┬──┬──┬──┬──────────┬─┬─┬─┬─┬─┬─────┐
//! │N │Z │C │V │ Reserved │E│A│I│F│T│Mode │
//! └──┴──┴──┴──┴──────────┴─┴─┴─┴─┴─┴─────┘
//! ```
//!
//! - **Flags (28-31)**: tested by [`condition`](super::condition)
//! - **E (9)** and **A (8)**: endianness and imprecise abort disable
//! - **I/F (7-6)**: IRQ/FIQ disable, 1 means masked
//! - **T (5)**: ARM (0) or THUMB (1) state
//! - **Mode (4-0)**: see [`cpu_modes`](super::cpu_modes)
//!
//! Each exception mode owns a SPSR that receives the CPSR on exception
//! entry. See [`register_bank`](super::register_bank) for its storage.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::arm::alu_instruction::ArithmeticOpResult;
use crate::cpu::cpu_modes::{MODE_MASK, Mode};
use crate::error::CpuError;

/// Byte written by the `f` field of MSR.
pub const FLAGS_MASK: u32 = 0xFF00_0000;

/// Byte written by the `c` field of MSR.
pub const CONTROL_MASK: u32 = 0x0000_00FF;

/// Program Status Register (CPSR or SPSR).
///
/// A thin wrapper around the raw word. The only field with an invariant is
/// the mode: every setter here keeps it one of the seven legal encodings,
/// while [`Psr::from`] on a raw `u32` is unchecked and [`Psr::mode`] reports
/// a corrupted value as [`CpuError::CorruptedMode`].
///
/// ```
/// use arm7::cpu::cpu_modes::Mode;
/// use arm7::cpu::psr::Psr;
///
/// let mut cpsr = Psr::from(Mode::Irq);
/// cpsr.set_zero_flag(true);
/// cpsr.set_mode(Mode::Supervisor);
///
/// assert!(cpsr.zero_flag());
/// assert_eq!(cpsr.mode(), Ok(Mode::Supervisor));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Psr(u32);

impl Psr {
    /// N => Bit 31, (0=Not Signed, 1=Signed)
    #[must_use]
    pub fn sign_flag(self) -> bool {
        self.0.get_bit(31)
    }

    /// Z => Bit 30, (0=Not Zero, 1=Zero)
    #[must_use]
    pub fn zero_flag(self) -> bool {
        self.0.get_bit(30)
    }

    /// C => Bit 29, (0=Borrow/No Carry, 1=Carry/No Borrow)
    #[must_use]
    pub fn carry_flag(self) -> bool {
        self.0.get_bit(29)
    }

    /// V => Bit 28, (0=No Overflow, 1=Overflow)
    #[must_use]
    pub fn overflow_flag(self) -> bool {
        self.0.get_bit(28)
    }

    /// E => Bit 9, (0=Little, 1=Big)
    #[must_use]
    pub fn endian(self) -> bool {
        self.0.get_bit(9)
    }

    /// A => Bit 8, (0=Enable, 1=Disable)
    #[must_use]
    pub fn abort_disable(self) -> bool {
        self.0.get_bit(8)
    }

    /// I => Bit 7, (0=Enable, 1=Disable)
    #[must_use]
    pub fn irq_disable(self) -> bool {
        self.0.get_bit(7)
    }

    /// F => Bit 6, (0=Enable, 1=Disable)
    #[must_use]
    pub fn fiq_disable(self) -> bool {
        self.0.get_bit(6)
    }

    /// T => Bit 5, (0=ARM, 1=THUMB)
    #[must_use]
    pub fn state_bit(self) -> bool {
        self.0.get_bit(5)
    }

    /// M4-M0 => Bits 4-0
    ///
    /// # Errors
    ///
    /// [`CpuError::CorruptedMode`] when the field is not a legal mode.
    pub fn mode(self) -> Result<Mode, CpuError> {
        Mode::try_from(self.0)
    }

    pub fn set_sign_flag(&mut self, value: bool) {
        self.0.set_bit(31, value);
    }

    pub fn set_zero_flag(&mut self, value: bool) {
        self.0.set_bit(30, value);
    }

    pub fn set_carry_flag(&mut self, value: bool) {
        self.0.set_bit(29, value);
    }

    pub fn set_overflow_flag(&mut self, value: bool) {
        self.0.set_bit(28, value);
    }

    pub fn set_flags(&mut self, op_result: &ArithmeticOpResult) {
        self.set_carry_flag(op_result.carry);
        self.set_zero_flag(op_result.zero);
        self.set_sign_flag(op_result.sign);
        self.set_overflow_flag(op_result.overflow);
    }

    pub fn set_endian(&mut self, value: bool) {
        self.0.set_bit(9, value);
    }

    pub fn set_abort_disable(&mut self, value: bool) {
        self.0.set_bit(8, value);
    }

    pub fn set_irq_disable(&mut self, value: bool) {
        self.0.set_bit(7, value);
    }

    pub fn set_fiq_disable(&mut self, value: bool) {
        self.0.set_bit(6, value);
    }

    /// Only the controller should flip this, through a state change.
    pub(crate) fn set_state_bit(&mut self, value: bool) {
        self.0.set_bit(5, value);
    }

    /// Overwrites bits 4-0 only.
    pub const fn set_mode(&mut self, m: Mode) {
        self.0 &= !MODE_MASK;
        self.0 |= m as u32;
    }

    /// Replaces the bits selected by `mask` with the ones of `value`.
    ///
    /// # Errors
    ///
    /// Refuses the write, leaving `self` untouched, when the resulting mode
    /// field would not be a legal mode.
    pub fn write_masked(&mut self, value: u32, mask: u32) -> Result<(), CpuError> {
        let new = (self.0 & !mask) | (value & mask);
        Mode::try_from(new)?;
        self.0 = new;
        Ok(())
    }

    #[must_use]
    pub fn cpu_state(self) -> CpuState {
        self.state_bit().into()
    }

    pub fn set_cpu_state(&mut self, state: CpuState) {
        self.set_state_bit(state.into());
    }
}

impl Default for Psr {
    fn default() -> Self {
        Self::from(Mode::User)
    }
}

impl From<Mode> for Psr {
    fn from(m: Mode) -> Self {
        let mut s = Self(0);

        s.set_mode(m);

        s
    }
}

impl From<u32> for Psr {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl From<Psr> for u32 {
    fn from(p: Psr) -> Self {
        p.0
    }
}

impl std::fmt::Display for Psr {
    /// Flags in upper case when set, e.g. `nZCv IfT SVC`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flag = |set: bool, c: char| if set { c.to_ascii_uppercase() } else { c };

        write!(
            f,
            "{}{}{}{} {}{}{} ",
            flag(self.sign_flag(), 'n'),
            flag(self.zero_flag(), 'z'),
            flag(self.carry_flag(), 'c'),
            flag(self.overflow_flag(), 'v'),
            flag(self.irq_disable(), 'i'),
            flag(self.fiq_disable(), 'f'),
            flag(self.state_bit(), 't'),
        )?;

        match self.mode() {
            Ok(mode) => write!(f, "{mode}"),
            Err(_) => write!(f, "?{:05b}", self.0 & MODE_MASK),
        }
    }
}

/// The CPU execution state (ARM or THUMB), mirrored by the T bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// 16-bit instructions. See `thumb` module.
    Thumb,
    /// 32-bit instructions. See `arm` module.
    Arm,
}

impl CpuState {
    /// Width of one instruction in bytes.
    #[must_use]
    pub const fn instruction_size(self) -> u32 {
        match self {
            Self::Arm => 4,
            Self::Thumb => 2,
        }
    }
}

impl From<CpuState> for bool {
    fn from(state: CpuState) -> Self {
        match state {
            CpuState::Arm => false,
            CpuState::Thumb => true,
        }
    }
}

impl From<bool> for CpuState {
    fn from(state: bool) -> Self {
        if state { Self::Thumb } else { Self::Arm }
    }
}
