//! # Banked Registers for Exception Modes
//!
//! Storage for the registers that only exist in some modes, and the rule
//! that decides which physical register a register number names.
//! See [`cpu_modes`](super::cpu_modes) for the banking table.
//!
//! Resolution is a pure function of `(mode, register)`: nothing is copied on
//! a mode switch, the registers simply start resolving to a different slot.

use serde::{Deserialize, Serialize};

use crate::cpu::cpu_modes::Mode;
use crate::cpu::psr::Psr;

/// Physical location of a visible register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterSlot {
    /// R0-R15 as seen by User and System mode.
    Shared(usize),
    /// R8-R14 of FIQ mode, index 0 is R8.
    Fiq(usize),
    /// R13-R14 of IRQ mode, index 0 is R13.
    Irq(usize),
    /// R13-R14 of Supervisor mode.
    Supervisor(usize),
    /// R13-R14 of Abort mode.
    Abort(usize),
    /// R13-R14 of Undefined mode.
    Undefined(usize),
}

/// Resolves `register` (0-15) in `mode`.
///
/// R0-R7 and R15 are always shared. FIQ takes over R8-R14, the other
/// exception modes only R13-R14.
#[must_use]
pub const fn banked_slot(mode: Mode, register: usize) -> RegisterSlot {
    match (mode, register) {
        (Mode::Fiq, 8..=14) => RegisterSlot::Fiq(register - 8),
        (Mode::Irq, 13..=14) => RegisterSlot::Irq(register - 13),
        (Mode::Supervisor, 13..=14) => RegisterSlot::Supervisor(register - 13),
        (Mode::Abort, 13..=14) => RegisterSlot::Abort(register - 13),
        (Mode::Undefined, 13..=14) => RegisterSlot::Undefined(register - 13),
        _ => RegisterSlot::Shared(register),
    }
}

/// Private registers of every exception mode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegisterBank {
    /// R8-R14 for FIQ mode.
    pub fiq: [u32; 7],
    /// R13 (SP) and R14 (LR) for IRQ mode.
    pub irq: [u32; 2],
    /// R13 (SP) and R14 (LR) for Supervisor mode.
    pub svc: [u32; 2],
    /// R13 (SP) and R14 (LR) for Abort mode.
    pub abt: [u32; 2],
    /// R13 (SP) and R14 (LR) for Undefined mode.
    pub und: [u32; 2],

    pub spsr_fiq: Psr,
    pub spsr_irq: Psr,
    pub spsr_svc: Psr,
    pub spsr_abt: Psr,
    pub spsr_und: Psr,
}

impl RegisterBank {
    /// Banked value behind `slot`, `None` for a shared slot.
    #[must_use]
    pub fn get(&self, slot: RegisterSlot) -> Option<u32> {
        match slot {
            RegisterSlot::Shared(_) => None,
            RegisterSlot::Fiq(i) => self.fiq.get(i).copied(),
            RegisterSlot::Irq(i) => self.irq.get(i).copied(),
            RegisterSlot::Supervisor(i) => self.svc.get(i).copied(),
            RegisterSlot::Abort(i) => self.abt.get(i).copied(),
            RegisterSlot::Undefined(i) => self.und.get(i).copied(),
        }
    }

    /// Mutable banked value behind `slot`, `None` for a shared slot.
    pub fn get_mut(&mut self, slot: RegisterSlot) -> Option<&mut u32> {
        match slot {
            RegisterSlot::Shared(_) => None,
            RegisterSlot::Fiq(i) => self.fiq.get_mut(i),
            RegisterSlot::Irq(i) => self.irq.get_mut(i),
            RegisterSlot::Supervisor(i) => self.svc.get_mut(i),
            RegisterSlot::Abort(i) => self.abt.get_mut(i),
            RegisterSlot::Undefined(i) => self.und.get_mut(i),
        }
    }

    /// SPSR owned by `mode`. User and System have none.
    #[must_use]
    pub const fn spsr(&self, mode: Mode) -> Option<Psr> {
        if !mode.has_spsr() {
            return None;
        }

        Some(match mode {
            Mode::Fiq => self.spsr_fiq,
            Mode::Irq => self.spsr_irq,
            Mode::Supervisor => self.spsr_svc,
            Mode::Abort => self.spsr_abt,
            _ => self.spsr_und,
        })
    }

    pub const fn spsr_mut(&mut self, mode: Mode) -> Option<&mut Psr> {
        if !mode.has_spsr() {
            return None;
        }

        Some(match mode {
            Mode::Fiq => &mut self.spsr_fiq,
            Mode::Irq => &mut self.spsr_irq,
            Mode::Supervisor => &mut self.spsr_svc,
            Mode::Abort => &mut self.spsr_abt,
            _ => &mut self.spsr_und,
        })
    }
}
