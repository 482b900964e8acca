//! # ARM7TDMI Register File
//!
//! The 16 registers visible at any time, resolved through the current mode.
//!
//! - **R0-R12**: General purpose
//! - **R13 (SP)**: Stack pointer (by convention)
//! - **R14 (LR)**: Link register (return address)
//! - **R15 (PC)**: Program counter, shared by every mode
//!
//! For register banking by mode, see [`register_bank`](super::register_bank).

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cpu::cpu_modes::Mode;
use crate::cpu::psr::Psr;
use crate::cpu::register_bank::{RegisterBank, RegisterSlot, banked_slot};
use crate::error::CpuError;

/// Stack Pointer register index.
pub const REG_SP: usize = 0xD;

/// Link Register index (return address for subroutines).
pub const REG_LR: usize = 0xE;

/// Program Counter register index.
pub const REG_PROGRAM_COUNTER: usize = 0xF;

/// General registers, banked registers and status registers.
///
/// R15 only changes through [`RegisterFile::set_program_counter`]; the
/// controller calls it for branches, exception entry and sequential
/// advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFile {
    /// R0-R15 of User/System mode. R8-R14 are shadowed by the bank in
    /// exception modes.
    registers: [u32; 16],
    bank: RegisterBank,
    pub cpsr: Psr,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    /// Register file as left by the Reset exception: every register zeroed,
    /// Supervisor mode, ARM state, IRQ and FIQ masked.
    #[must_use]
    pub fn new() -> Self {
        let mut cpsr = Psr::from(Mode::Supervisor);
        cpsr.set_irq_disable(true);
        cpsr.set_fiq_disable(true);

        Self {
            registers: [0; 16],
            bank: RegisterBank::default(),
            cpsr,
        }
    }

    /// # Errors
    ///
    /// Fails if the CPSR mode field is corrupted.
    pub fn operating_mode(&self) -> Result<Mode, CpuError> {
        self.cpsr.mode()
    }

    /// Switches mode without touching flags or control bits.
    pub const fn set_operating_mode(&mut self, mode: Mode) {
        self.cpsr.set_mode(mode);
    }

    /// Reads `reg` as seen by the current mode. R15 gives the raw PC.
    ///
    /// # Errors
    ///
    /// Fails if the CPSR mode field is corrupted.
    pub fn register_at(&self, reg: usize) -> Result<u32, CpuError> {
        Ok(self.register_in_mode(self.operating_mode()?, reg))
    }

    /// Writes `reg` as seen by the current mode. R15 is ignored, see
    /// [`set_register_in_mode`](Self::set_register_in_mode).
    ///
    /// # Errors
    ///
    /// Fails if the CPSR mode field is corrupted.
    pub fn set_register_at(&mut self, reg: usize, new_value: u32) -> Result<(), CpuError> {
        let mode = self.operating_mode()?;
        self.set_register_in_mode(mode, reg, new_value);
        Ok(())
    }

    /// Reads `reg` as seen by `mode`, whatever the current mode is.
    ///
    /// Used by LDM/STM with the S bit, which transfer the User bank.
    #[must_use]
    pub fn register_in_mode(&self, mode: Mode, reg: usize) -> u32 {
        match banked_slot(mode, reg & 0xF) {
            RegisterSlot::Shared(index) => self.registers[index],
            slot => self.bank.get(slot).unwrap_or_default(),
        }
    }

    /// Writes `reg` as seen by `mode`.
    ///
    /// R15 is only written through [`set_program_counter`](Self::set_program_counter),
    /// a write to it here is dropped.
    pub fn set_register_in_mode(&mut self, mode: Mode, reg: usize, new_value: u32) {
        if reg & 0xF == REG_PROGRAM_COUNTER {
            warn!("write of 0x{new_value:08X} to R15 outside the branch path ignored");
            return;
        }

        match banked_slot(mode, reg & 0xF) {
            RegisterSlot::Shared(index) => self.registers[index] = new_value,
            slot => {
                if let Some(value) = self.bank.get_mut(slot) {
                    *value = new_value;
                }
            }
        }
    }

    #[must_use]
    pub const fn program_counter(&self) -> u32 {
        self.registers[REG_PROGRAM_COUNTER]
    }

    pub const fn set_program_counter(&mut self, new_value: u32) {
        self.registers[REG_PROGRAM_COUNTER] = new_value;
    }

    pub const fn advance_program_counter(&mut self, bytes: u32) {
        self.registers[REG_PROGRAM_COUNTER] = self.registers[REG_PROGRAM_COUNTER].wrapping_add(bytes);
    }

    /// SPSR of the current mode, `None` in User and System mode.
    ///
    /// # Errors
    ///
    /// Fails if the CPSR mode field is corrupted.
    pub fn spsr(&self) -> Result<Option<Psr>, CpuError> {
        Ok(self.bank.spsr(self.operating_mode()?))
    }

    /// Writes the SPSR of the current mode. Returns `false`, leaving every
    /// register untouched, in a mode without SPSR.
    ///
    /// # Errors
    ///
    /// Fails if the CPSR mode field is corrupted.
    pub fn set_spsr(&mut self, psr: Psr) -> Result<bool, CpuError> {
        let mode = self.operating_mode()?;
        Ok(self.set_spsr_of(mode, psr))
    }

    #[must_use]
    pub const fn spsr_of(&self, mode: Mode) -> Option<Psr> {
        self.bank.spsr(mode)
    }

    pub const fn set_spsr_of(&mut self, mode: Mode, psr: Psr) -> bool {
        match self.bank.spsr_mut(mode) {
            Some(spsr) => {
                *spsr = psr;
                true
            }
            None => false,
        }
    }

    /// The 16 registers visible in the current mode.
    ///
    /// # Errors
    ///
    /// Fails if the CPSR mode field is corrupted.
    pub fn visible(&self) -> Result<[u32; 16], CpuError> {
        let mode = self.operating_mode()?;
        Ok(std::array::from_fn(|reg| self.register_in_mode(mode, reg)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reset_state() {
        let registers = RegisterFile::new();
        assert_eq!(registers.operating_mode(), Ok(Mode::Supervisor));
        assert!(registers.cpsr.irq_disable());
        assert!(registers.cpsr.fiq_disable());
        assert!(!registers.cpsr.state_bit());
        assert_eq!(registers.visible(), Ok([0; 16]));
        assert_eq!(registers.spsr_of(Mode::Irq), Some(Psr::from(Mode::User)));
    }

    #[test]
    fn sp_is_private_per_mode() {
        let mut registers = RegisterFile::new();

        registers.set_operating_mode(Mode::Irq);
        registers.set_register_at(REG_SP, 0x0300_7FA0).unwrap();

        registers.set_operating_mode(Mode::Supervisor);
        assert_eq!(registers.register_at(REG_SP), Ok(0));
        registers.set_register_at(REG_SP, 0x0300_7FE0).unwrap();

        registers.set_operating_mode(Mode::Irq);
        assert_eq!(registers.register_at(REG_SP), Ok(0x0300_7FA0));

        registers.set_operating_mode(Mode::Supervisor);
        assert_eq!(registers.register_at(REG_SP), Ok(0x0300_7FE0));
    }

    #[test]
    fn fiq_shadows_r8_to_r14() {
        let mut registers = RegisterFile::new();
        registers.set_operating_mode(Mode::User);
        for reg in 0..15 {
            registers.set_register_at(reg, reg as u32).unwrap();
        }

        registers.set_operating_mode(Mode::Fiq);
        for reg in 0..8 {
            assert_eq!(registers.register_at(reg), Ok(reg as u32));
        }
        for reg in 8..15 {
            assert_eq!(registers.register_at(reg), Ok(0));
            registers.set_register_at(reg, 0xF0 + reg as u32).unwrap();
        }

        registers.set_operating_mode(Mode::System);
        for reg in 0..15 {
            assert_eq!(registers.register_at(reg), Ok(reg as u32));
        }
        assert_eq!(registers.register_in_mode(Mode::Fiq, 12), 0xFC);
    }

    #[test]
    fn pc_is_shared() {
        let mut registers = RegisterFile::new();
        registers.set_program_counter(0x0800_0000);
        registers.advance_program_counter(4);
        for mode in [Mode::User, Mode::Fiq, Mode::Irq, Mode::Undefined] {
            registers.set_operating_mode(mode);
            assert_eq!(registers.register_at(REG_PROGRAM_COUNTER), Ok(0x0800_0004));
        }
    }

    #[test]
    fn pc_write_through_register_path_is_dropped() {
        let mut registers = RegisterFile::new();
        registers.set_program_counter(0x100);

        registers.set_register_at(REG_PROGRAM_COUNTER, 0x2000).unwrap();
        registers.set_register_in_mode(Mode::User, REG_PROGRAM_COUNTER, 0x3000);

        assert_eq!(registers.program_counter(), 0x100);
        assert_eq!(registers.register_at(REG_PROGRAM_COUNTER), Ok(0x100));
    }

    #[test]
    fn user_and_system_have_no_spsr() {
        let mut registers = RegisterFile::new();
        registers.set_operating_mode(Mode::User);
        assert_eq!(registers.spsr(), Ok(None));
        assert_eq!(registers.set_spsr(Psr::from(Mode::Irq)), Ok(false));

        registers.set_operating_mode(Mode::Abort);
        assert_eq!(registers.set_spsr(Psr::from(Mode::Irq)), Ok(true));
        assert_eq!(registers.spsr(), Ok(Some(Psr::from(Mode::Irq))));
    }

    #[test]
    fn corrupted_mode_is_reported() {
        let mut registers = RegisterFile::new();
        registers.cpsr = Psr::from(0x0000_0000);
        assert!(registers.register_at(0).is_err());
        assert!(registers.set_register_at(0, 1).is_err());
        assert!(registers.visible().is_err());
    }
}
