//! # Exceptions
//!
//! ```text
//! ┌───────────────────────────┬────────┬──────────┬──────┬──────┐
//! │ Exception                 │ Vector │ Priority │ Mode │ I F  │
//! ├───────────────────────────┼────────┼──────────┼──────┼──────┤
//! │ Reset                     │  0x00  │    1     │ SVC  │ 1 1  │
//! │ Undefined instruction     │  0x04  │    7     │ UND  │ 1 u  │
//! │ Software interrupt        │  0x08  │    6     │ SVC  │ 1 u  │
//! │ Prefetch abort            │  0x0C  │    5     │ ABT  │ 1 u  │
//! │ Data abort                │  0x10  │    2     │ ABT  │ 1 u  │
//! │ Address exceeds 26 bit    │  0x14  │    0     │ SVC  │ 1 u  │
//! │ Normal interrupt (IRQ)    │  0x18  │    4     │ IRQ  │ 1 u  │
//! │ Fast interrupt (FIQ)      │  0x1C  │    3     │ FIQ  │ 1 1  │
//! └───────────────────────────┴────────┴──────────┴──────┴──────┘
//! ```
//!
//! Priority 1 is the highest. Priority 0 marks the legacy 26-bit address
//! exception, which the ARM7TDMI never generates: it is never dispatched.
//!
//! Undefined instruction and SWI are synchronous and enter their handler in
//! the step that executed the instruction. Everything else is raised by the
//! host and taken at the next instruction boundary.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cpu::cpu_modes::Mode;
use crate::cpu::psr::Psr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExceptionKind {
    Reset,
    UndefinedInstruction,
    SoftwareInterrupt,
    PrefetchAbort,
    DataAbort,
    AddressExceeds26Bit,
    NormalInterrupt,
    FastInterrupt,
}

impl ExceptionKind {
    pub const ALL: [Self; 8] = [
        Self::Reset,
        Self::UndefinedInstruction,
        Self::SoftwareInterrupt,
        Self::PrefetchAbort,
        Self::DataAbort,
        Self::AddressExceeds26Bit,
        Self::NormalInterrupt,
        Self::FastInterrupt,
    ];

    #[must_use]
    pub const fn descriptor(self) -> &'static ExceptionDescriptor {
        &EXCEPTION_TABLE[self as usize]
    }

    const fn pending_bit(self) -> u8 {
        1 << self as u8
    }
}

impl std::fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reset => f.write_str("Reset"),
            Self::UndefinedInstruction => f.write_str("Undefined instruction"),
            Self::SoftwareInterrupt => f.write_str("Software interrupt"),
            Self::PrefetchAbort => f.write_str("Prefetch abort"),
            Self::DataAbort => f.write_str("Data abort"),
            Self::AddressExceeds26Bit => f.write_str("Address exceeds 26 bit"),
            Self::NormalInterrupt => f.write_str("IRQ"),
            Self::FastInterrupt => f.write_str("FIQ"),
        }
    }
}

/// Effect of exception entry on one interrupt disable bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskTransition {
    /// `1`: set the bit, masking the interrupt.
    Disable,
    /// `0`: clear the bit.
    Enable,
    /// `u`: leave the bit as it is.
    Unchanged,
}

impl MaskTransition {
    const fn parse(c: u8) -> Self {
        match c {
            b'1' => Self::Disable,
            b'0' => Self::Enable,
            _ => Self::Unchanged,
        }
    }

    #[must_use]
    pub const fn apply(self, disabled: bool) -> bool {
        match self {
            Self::Disable => true,
            Self::Enable => false,
            Self::Unchanged => disabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionDescriptor {
    pub kind: ExceptionKind,
    pub vector: u32,
    pub priority: u8,
    pub entry_mode: Mode,
    pub irq_mask: MaskTransition,
    pub fiq_mask: MaskTransition,
}

impl ExceptionDescriptor {
    /// `masks` is the I/F transition pair, e.g. `"1u"`.
    const fn new(kind: ExceptionKind, vector: u32, priority: u8, entry_mode: Mode, masks: &str) -> Self {
        let masks = masks.as_bytes();
        Self {
            kind,
            vector,
            priority,
            entry_mode,
            irq_mask: MaskTransition::parse(masks[0]),
            fiq_mask: MaskTransition::parse(masks[1]),
        }
    }

    /// Updates the I and F bits of `cpsr` for entry into this exception.
    pub fn apply_masks(&self, cpsr: &mut Psr) {
        cpsr.set_irq_disable(self.irq_mask.apply(cpsr.irq_disable()));
        cpsr.set_fiq_disable(self.fiq_mask.apply(cpsr.fiq_disable()));
    }

    /// Whether the exception can be taken with the given CPSR.
    ///
    /// IRQ and FIQ wait while masked, priority 0 never dispatches.
    #[must_use]
    pub fn is_eligible(&self, cpsr: Psr) -> bool {
        match self.kind {
            _ if self.priority == 0 => false,
            ExceptionKind::NormalInterrupt => !cpsr.irq_disable(),
            ExceptionKind::FastInterrupt => !cpsr.fiq_disable(),
            _ => true,
        }
    }
}

/// Indexed by `ExceptionKind as usize`.
pub static EXCEPTION_TABLE: [ExceptionDescriptor; 8] = [
    ExceptionDescriptor::new(ExceptionKind::Reset, 0x00, 1, Mode::Supervisor, "11"),
    ExceptionDescriptor::new(ExceptionKind::UndefinedInstruction, 0x04, 7, Mode::Undefined, "1u"),
    ExceptionDescriptor::new(ExceptionKind::SoftwareInterrupt, 0x08, 6, Mode::Supervisor, "1u"),
    ExceptionDescriptor::new(ExceptionKind::PrefetchAbort, 0x0C, 5, Mode::Abort, "1u"),
    ExceptionDescriptor::new(ExceptionKind::DataAbort, 0x10, 2, Mode::Abort, "1u"),
    ExceptionDescriptor::new(ExceptionKind::AddressExceeds26Bit, 0x14, 0, Mode::Supervisor, "1u"),
    ExceptionDescriptor::new(ExceptionKind::NormalInterrupt, 0x18, 4, Mode::Irq, "1u"),
    ExceptionDescriptor::new(ExceptionKind::FastInterrupt, 0x1C, 3, Mode::Fiq, "11"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatcherState {
    Idle,
    Pending,
    Dispatching,
}

/// Tracks raised exceptions until the controller enters them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExceptionDispatcher {
    /// One bit per [`ExceptionKind`].
    pending: u8,
    dispatching: bool,
}

impl ExceptionDispatcher {
    #[must_use]
    pub const fn state(&self) -> DispatcherState {
        if self.dispatching {
            DispatcherState::Dispatching
        } else if self.pending == 0 {
            DispatcherState::Idle
        } else {
            DispatcherState::Pending
        }
    }

    /// Marks `kind` as pending. Returns `false` when the exception can never
    /// be dispatched and was dropped.
    pub fn raise(&mut self, kind: ExceptionKind) -> bool {
        if kind.descriptor().priority == 0 {
            warn!("{kind} exception raised, it is never dispatched on this core");
            return false;
        }

        debug!("{kind} exception pending");
        self.pending |= kind.pending_bit();
        true
    }

    /// Drops a pending `kind`, e.g. when an interrupt line is lowered before
    /// the core took it.
    pub fn withdraw(&mut self, kind: ExceptionKind) {
        self.pending &= !kind.pending_bit();
    }

    #[must_use]
    pub const fn is_pending(&self, kind: ExceptionKind) -> bool {
        self.pending & kind.pending_bit() != 0
    }

    #[must_use]
    pub fn pending(&self) -> Vec<ExceptionKind> {
        ExceptionKind::ALL
            .into_iter()
            .filter(|kind| self.is_pending(*kind))
            .collect()
    }

    /// Highest priority pending exception that `cpsr` lets through.
    #[must_use]
    pub fn select(&self, cpsr: Psr) -> Option<ExceptionKind> {
        EXCEPTION_TABLE
            .iter()
            .filter(|descriptor| self.is_pending(descriptor.kind) && descriptor.is_eligible(cpsr))
            .min_by_key(|descriptor| descriptor.priority)
            .map(|descriptor| descriptor.kind)
    }

    /// Consumes `kind` and enters the dispatching state.
    pub fn begin_dispatch(&mut self, kind: ExceptionKind) {
        self.withdraw(kind);
        self.dispatching = true;
    }

    pub const fn finish_dispatch(&mut self) {
        self.dispatching = false;
    }

    /// Forgets every pending exception.
    pub const fn clear(&mut self) {
        self.pending = 0;
        self.dispatching = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn table_is_indexed_by_kind() {
        for kind in ExceptionKind::ALL {
            assert_eq!(kind.descriptor().kind, kind);
        }
    }

    #[test]
    fn table_content() {
        let vectors: Vec<u32> = EXCEPTION_TABLE.iter().map(|d| d.vector).collect();
        assert_eq!(vectors, vec![0x00, 0x04, 0x08, 0x0C, 0x10, 0x14, 0x18, 0x1C]);

        let priorities: Vec<u8> = EXCEPTION_TABLE.iter().map(|d| d.priority).collect();
        assert_eq!(priorities, vec![1, 7, 6, 5, 2, 0, 4, 3]);

        let irq = ExceptionKind::NormalInterrupt.descriptor();
        assert_eq!(irq.entry_mode, Mode::Irq);
        assert_eq!(irq.irq_mask, MaskTransition::Disable);
        assert_eq!(irq.fiq_mask, MaskTransition::Unchanged);

        let fiq = ExceptionKind::FastInterrupt.descriptor();
        assert_eq!(fiq.fiq_mask, MaskTransition::Disable);
    }

    #[test]
    fn mask_string_parsing() {
        assert_eq!(MaskTransition::parse(b'1'), MaskTransition::Disable);
        assert_eq!(MaskTransition::parse(b'0'), MaskTransition::Enable);
        assert_eq!(MaskTransition::parse(b'u'), MaskTransition::Unchanged);
        assert!(MaskTransition::Unchanged.apply(true));
        assert!(!MaskTransition::Enable.apply(true));
    }

    #[test]
    fn apply_masks() {
        let mut cpsr = Psr::from(Mode::User);
        ExceptionKind::NormalInterrupt.descriptor().apply_masks(&mut cpsr);
        assert!(cpsr.irq_disable());
        assert!(!cpsr.fiq_disable());

        ExceptionKind::Reset.descriptor().apply_masks(&mut cpsr);
        assert!(cpsr.fiq_disable());
    }

    #[test]
    fn state_machine() {
        let mut dispatcher = ExceptionDispatcher::default();
        assert_eq!(dispatcher.state(), DispatcherState::Idle);

        assert!(dispatcher.raise(ExceptionKind::NormalInterrupt));
        assert_eq!(dispatcher.state(), DispatcherState::Pending);

        dispatcher.begin_dispatch(ExceptionKind::NormalInterrupt);
        assert_eq!(dispatcher.state(), DispatcherState::Dispatching);

        dispatcher.finish_dispatch();
        assert_eq!(dispatcher.state(), DispatcherState::Idle);
    }

    #[test]
    fn legacy_exception_is_dropped() {
        let mut dispatcher = ExceptionDispatcher::default();
        assert!(!dispatcher.raise(ExceptionKind::AddressExceeds26Bit));
        assert_eq!(dispatcher.pending(), vec![]);
        assert_eq!(dispatcher.select(Psr::from(Mode::User)), None);
    }

    #[test]
    fn selects_highest_priority() {
        let mut dispatcher = ExceptionDispatcher::default();
        dispatcher.raise(ExceptionKind::NormalInterrupt);
        dispatcher.raise(ExceptionKind::FastInterrupt);
        dispatcher.raise(ExceptionKind::PrefetchAbort);

        let cpsr = Psr::from(Mode::User);
        assert_eq!(dispatcher.select(cpsr), Some(ExceptionKind::FastInterrupt));

        dispatcher.raise(ExceptionKind::DataAbort);
        assert_eq!(dispatcher.select(cpsr), Some(ExceptionKind::DataAbort));

        dispatcher.raise(ExceptionKind::Reset);
        assert_eq!(dispatcher.select(cpsr), Some(ExceptionKind::Reset));
    }

    #[test]
    fn masked_interrupts_stay_pending() {
        let mut dispatcher = ExceptionDispatcher::default();
        dispatcher.raise(ExceptionKind::NormalInterrupt);
        dispatcher.raise(ExceptionKind::FastInterrupt);

        let mut cpsr = Psr::from(Mode::User);
        cpsr.set_irq_disable(true);
        cpsr.set_fiq_disable(true);
        assert_eq!(dispatcher.select(cpsr), None);

        cpsr.set_irq_disable(false);
        assert_eq!(dispatcher.select(cpsr), Some(ExceptionKind::NormalInterrupt));
        assert_eq!(
            dispatcher.pending(),
            vec![ExceptionKind::NormalInterrupt, ExceptionKind::FastInterrupt]
        );

        dispatcher.withdraw(ExceptionKind::NormalInterrupt);
        assert_eq!(dispatcher.select(cpsr), None);
    }
}
