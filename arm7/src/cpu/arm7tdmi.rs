//! # ARM7TDMI controller
//!
//! Owns the register file, the exception dispatcher and the bus, and runs
//! one instruction (or one exception entry) per [`Arm7tdmi::step`].
//!
//! ## Pipeline view
//!
//! While an instruction at address `X` executes, R15 holds `X`. Operand
//! reads of R15 observe the prefetch:
//!
//! | State | Read of R15                                   |
//! |-------|-----------------------------------------------|
//! | ARM   | `X + 8`, `X + 12` for register shifts and stores of R15 |
//! | THUMB | `X + 4`                                       |
//!
//! ## Exception entry
//!
//! ```text
//! LR_<mode>   = return address
//! SPSR_<mode> = CPSR
//! CPSR.mode   = entry mode, T = 0, I/F per table
//! PC          = vector
//! ```

use tracing::{debug, info, trace, warn};

use crate::bitwise::Bits;
use crate::bus::Bus;
use crate::cpu::arm::mode::ArmModeOpcode;
use crate::cpu::arm::operations::SIZE_OF_INSTRUCTION;
use crate::cpu::exception::{DispatcherState, ExceptionDispatcher, ExceptionKind};
use crate::cpu::psr::CpuState;
use crate::cpu::registers::{REG_LR, REG_PROGRAM_COUNTER, RegisterFile};
use crate::error::CpuError;

/// What an executed instruction asks the controller to do with R15.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Move on to the next sequential instruction.
    Advance,

    /// R15 was already written.
    Branch,

    /// Enter the exception, the instruction did not complete.
    Raise(ExceptionKind),
}

impl Flow {
    /// Combines the flows of two register writes of the same instruction.
    pub(crate) const fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Raise(kind), _) | (_, Self::Raise(kind)) => Self::Raise(kind),
            (Self::Branch, _) | (_, Self::Branch) => Self::Branch,
            _ => Self::Advance,
        }
    }
}

/// A synchronous exception caused by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    pub kind: ExceptionKind,
    pub address: u32,
    pub op_code: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The instruction ran.
    Executed { address: u32, op_code: u32 },

    /// The condition failed and the instruction was skipped.
    Skipped { address: u32, op_code: u32 },

    /// The instruction raised an exception and the handler was entered.
    Trapped(Fault),

    /// A pending exception was entered before fetching.
    Interrupted(ExceptionKind),
}

pub struct Arm7tdmi<B: Bus> {
    pub bus: B,
    pub registers: RegisterFile,
    exceptions: ExceptionDispatcher,
}

impl<B: Bus> Arm7tdmi<B> {
    /// Creates a core in its reset state: Supervisor mode, ARM state, IRQ and
    /// FIQ disabled, PC at the reset vector.
    pub fn new(bus: B) -> Self {
        let mut cpu = Self {
            bus,
            registers: RegisterFile::new(),
            exceptions: ExceptionDispatcher::default(),
        };
        cpu.reset();

        cpu
    }

    /// Puts the core back into its reset state. Pending exceptions are
    /// forgotten.
    pub fn reset(&mut self) {
        self.registers = RegisterFile::new();
        self.exceptions.clear();
        self.registers
            .set_program_counter(ExceptionKind::Reset.descriptor().vector);

        info!("reset: {}", self.registers.cpsr);
    }

    #[must_use]
    pub fn cpu_state(&self) -> CpuState {
        self.registers.cpsr.cpu_state()
    }

    /// Branch and exchange: bit 0 of `address` selects THUMB, the PC gets
    /// `address` with bit 0 cleared.
    pub fn change_cpu_state(&mut self, address: u32) {
        let state = CpuState::from(address.get_bit(0));
        self.force_change_cpu_state(state);
        self.registers.set_program_counter(address & !1);

        debug!("switched to {state:?} at 0x{:08X}", address & !1);
    }

    /// Sets the T bit without touching the PC.
    pub fn force_change_cpu_state(&mut self, state: CpuState) {
        self.registers.cpsr.set_cpu_state(state);
    }

    /// Marks `kind` as pending; it is entered at the start of a later
    /// [`Arm7tdmi::step`] once the CPSR masks allow it.
    ///
    /// Returns `false` when the exception can never be taken by this core.
    pub fn raise_exception(&mut self, kind: ExceptionKind) -> bool {
        self.exceptions.raise(kind)
    }

    /// Drops a pending exception, e.g. when the host lowers an interrupt
    /// line before the core took it.
    pub fn withdraw_exception(&mut self, kind: ExceptionKind) {
        self.exceptions.withdraw(kind);
    }

    #[must_use]
    pub fn pending_exceptions(&self) -> Vec<ExceptionKind> {
        self.exceptions.pending()
    }

    #[must_use]
    pub const fn dispatcher_state(&self) -> DispatcherState {
        self.exceptions.state()
    }

    /// Runs one instruction, or enters the highest priority pending
    /// exception the CPSR lets through.
    ///
    /// # Errors
    ///
    /// Fails with [`CpuError::CorruptedMode`] when the CPSR mode bits are not
    /// a legal mode. Nothing is executed in that case.
    pub fn step(&mut self) -> Result<StepOutcome, CpuError> {
        self.registers.operating_mode()?;

        if let Some(kind) = self.exceptions.select(self.registers.cpsr) {
            let next = self.registers.program_counter();
            let return_address = match (kind, self.cpu_state()) {
                (ExceptionKind::DataAbort, CpuState::Thumb) => next.wrapping_add(6),
                _ => next.wrapping_add(4),
            };
            self.enter_exception(kind, return_address);

            return Ok(StepOutcome::Interrupted(kind));
        }

        match self.cpu_state() {
            CpuState::Arm => self.execute_arm(),
            CpuState::Thumb => self.execute_thumb(),
        }
    }

    /// Fetches, decodes and executes the ARM instruction at PC.
    ///
    /// # Errors
    ///
    /// Propagates [`CpuError::CorruptedMode`] from register accesses.
    pub fn execute_arm(&mut self) -> Result<StepOutcome, CpuError> {
        let address = self.registers.program_counter();
        let op_code = ArmModeOpcode::from(self.bus.read_word(address));

        #[cfg(feature = "disassembler")]
        trace!("0x{address:08X}: {}", op_code.disassembler());
        #[cfg(not(feature = "disassembler"))]
        trace!("0x{address:08X}: 0x{:08X} {:?}", op_code.raw, op_code.instruction);

        if !op_code.condition.is_satisfied(self.registers.cpsr) {
            self.registers.advance_program_counter(SIZE_OF_INSTRUCTION);
            return Ok(StepOutcome::Skipped {
                address,
                op_code: op_code.raw,
            });
        }

        let flow = self.execute_arm_instruction(op_code.instruction)?;

        Ok(self.complete(flow, address, op_code.raw, CpuState::Arm))
    }

    /// Applies the flow of an instruction fetched at `address` in `state`.
    pub(crate) fn complete(&mut self, flow: Flow, address: u32, op_code: u32, state: CpuState) -> StepOutcome {
        match flow {
            Flow::Advance => {
                self.registers
                    .advance_program_counter(state.instruction_size());
                StepOutcome::Executed { address, op_code }
            }
            Flow::Branch => StepOutcome::Executed { address, op_code },
            Flow::Raise(kind) => {
                self.enter_exception(kind, address.wrapping_add(state.instruction_size()));
                StepOutcome::Trapped(Fault {
                    kind,
                    address,
                    op_code,
                })
            }
        }
    }

    /// Switches to the handler of `kind`, leaving `return_address` in the
    /// entry mode's LR.
    pub(crate) fn enter_exception(&mut self, kind: ExceptionKind, return_address: u32) {
        let descriptor = kind.descriptor();
        self.exceptions.begin_dispatch(kind);

        if kind == ExceptionKind::Reset {
            self.reset();
            return;
        }

        let cpsr = self.registers.cpsr;
        let mode = descriptor.entry_mode;

        self.registers
            .set_register_in_mode(mode, REG_LR, return_address);
        self.registers.set_spsr_of(mode, cpsr);
        self.registers.set_operating_mode(mode);
        self.force_change_cpu_state(CpuState::Arm);
        descriptor.apply_masks(&mut self.registers.cpsr);
        self.registers.set_program_counter(descriptor.vector);

        self.exceptions.finish_dispatch();

        info!(
            "{kind} exception: {cpsr} -> {}, return address 0x{return_address:08X}",
            self.registers.cpsr
        );
    }

    /// Leaves an exception handler: CPSR is restored from the current SPSR
    /// and PC is set to LR.
    ///
    /// The handler is expected to adjust LR beforehand when the interrupted
    /// instruction must be resumed rather than skipped. Returns `false`, and
    /// changes nothing, in User and System mode.
    ///
    /// # Errors
    ///
    /// Fails when the CPSR or the restored SPSR has no legal mode.
    pub fn return_from_exception(&mut self) -> Result<bool, CpuError> {
        let mode = self.registers.operating_mode()?;
        let Some(spsr) = self.registers.spsr()? else {
            warn!("exception return requested in {mode}, which has no SPSR");
            return Ok(false);
        };
        spsr.mode()?;

        let return_address = self.registers.register_at(REG_LR)?;
        self.registers.cpsr = spsr;
        self.branch_to(return_address);

        debug!("returned from {mode} to 0x{:08X}", self.registers.program_counter());
        Ok(true)
    }

    /// Copies the SPSR of the current mode into the CPSR. Without an SPSR
    /// the CPSR is left untouched.
    pub(crate) fn restore_cpsr_from_spsr(&mut self) -> Result<(), CpuError> {
        match self.registers.spsr()? {
            Some(spsr) => {
                spsr.mode()?;
                self.registers.cpsr = spsr;
            }
            None => warn!(
                "CPSR restore requested in {}, which has no SPSR",
                self.registers.cpsr
            ),
        }

        Ok(())
    }

    /// Operand read of `reg`. R15 reads as the instruction address plus
    /// `pc_offset`.
    pub(crate) fn read_register(&self, reg: usize, pc_offset: u32) -> Result<u32, CpuError> {
        if reg == REG_PROGRAM_COUNTER {
            Ok(self.registers.program_counter().wrapping_add(pc_offset))
        } else {
            self.registers.register_at(reg)
        }
    }

    /// Result write of `reg`. Writing R15 is a branch.
    pub(crate) fn write_register(&mut self, reg: usize, value: u32) -> Result<Flow, CpuError> {
        if reg == REG_PROGRAM_COUNTER {
            self.branch_to(value);
            Ok(Flow::Branch)
        } else {
            self.registers.set_register_at(reg, value)?;
            Ok(Flow::Advance)
        }
    }

    /// Sets PC aligned to the instruction size of the current state.
    pub(crate) fn branch_to(&mut self, address: u32) {
        let aligned = match self.cpu_state() {
            CpuState::Arm => address & !3,
            CpuState::Thumb => address & !1,
        };
        self.registers.set_program_counter(aligned);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::cpu_modes::Mode;
    use crate::cpu::psr::Psr;
    use crate::cpu::registers::REG_SP;
    use crate::memory::FlatMemory;
    use pretty_assertions::assert_eq;

    fn cpu_with(words: &[u32]) -> Arm7tdmi<FlatMemory> {
        let mut memory = FlatMemory::new(0x1000);
        memory.load_words(0, words);
        Arm7tdmi::new(memory)
    }

    fn user_mode(cpu: &mut Arm7tdmi<FlatMemory>) {
        cpu.registers.cpsr = Psr::from(Mode::User);
    }

    #[test]
    fn reset_state() {
        let cpu = cpu_with(&[]);

        assert_eq!(cpu.registers.operating_mode(), Ok(Mode::Supervisor));
        assert_eq!(cpu.cpu_state(), CpuState::Arm);
        assert!(cpu.registers.cpsr.irq_disable());
        assert!(cpu.registers.cpsr.fiq_disable());
        assert_eq!(cpu.registers.program_counter(), 0);
        assert_eq!(cpu.dispatcher_state(), DispatcherState::Idle);
    }

    #[test]
    fn change_cpu_state() {
        let mut cpu = cpu_with(&[]);

        cpu.change_cpu_state(0x0000_0201);
        assert_eq!(cpu.cpu_state(), CpuState::Thumb);
        assert_eq!(cpu.registers.program_counter(), 0x200);

        cpu.change_cpu_state(0x0000_0300);
        assert_eq!(cpu.cpu_state(), CpuState::Arm);
        assert_eq!(cpu.registers.program_counter(), 0x300);

        cpu.force_change_cpu_state(CpuState::Thumb);
        assert_eq!(cpu.cpu_state(), CpuState::Thumb);
        assert_eq!(cpu.registers.program_counter(), 0x300);
    }

    #[test]
    fn irq_entry_from_user_mode() {
        let mut cpu = cpu_with(&[]);
        user_mode(&mut cpu);
        cpu.registers.cpsr.set_carry_flag(true);
        cpu.registers.set_program_counter(0x100);
        let old_cpsr = cpu.registers.cpsr;

        assert!(cpu.raise_exception(ExceptionKind::NormalInterrupt));
        assert_eq!(cpu.dispatcher_state(), DispatcherState::Pending);

        let outcome = cpu.step().unwrap();

        assert_eq!(outcome, StepOutcome::Interrupted(ExceptionKind::NormalInterrupt));
        assert_eq!(cpu.registers.operating_mode(), Ok(Mode::Irq));
        assert!(cpu.registers.cpsr.irq_disable());
        assert!(!cpu.registers.cpsr.fiq_disable());
        assert!(cpu.registers.cpsr.carry_flag());
        assert_eq!(cpu.cpu_state(), CpuState::Arm);
        assert_eq!(cpu.registers.register_at(REG_LR), Ok(0x104));
        assert_eq!(cpu.registers.spsr(), Ok(Some(old_cpsr)));
        assert_eq!(cpu.registers.program_counter(), 0x18);
        assert_eq!(cpu.dispatcher_state(), DispatcherState::Idle);
        assert_eq!(cpu.registers.register_in_mode(Mode::User, REG_LR), 0);
    }

    #[test]
    fn masked_irq_waits() {
        // MOV R0, #1
        let mut cpu = cpu_with(&[0xE3A0_0001]);

        cpu.raise_exception(ExceptionKind::NormalInterrupt);
        let outcome = cpu.step().unwrap();

        assert_eq!(
            outcome,
            StepOutcome::Executed {
                address: 0,
                op_code: 0xE3A0_0001
            }
        );
        assert_eq!(cpu.pending_exceptions(), vec![ExceptionKind::NormalInterrupt]);

        cpu.withdraw_exception(ExceptionKind::NormalInterrupt);
        assert!(cpu.pending_exceptions().is_empty());
    }

    #[test]
    fn fiq_wins_over_irq() {
        let mut cpu = cpu_with(&[]);
        user_mode(&mut cpu);

        cpu.raise_exception(ExceptionKind::NormalInterrupt);
        cpu.raise_exception(ExceptionKind::FastInterrupt);

        assert_eq!(cpu.step(), Ok(StepOutcome::Interrupted(ExceptionKind::FastInterrupt)));
        assert_eq!(cpu.registers.program_counter(), 0x1C);
        assert!(cpu.registers.cpsr.fiq_disable());
        assert!(cpu.registers.cpsr.irq_disable());

        // IRQ is still pending but masked by the FIQ entry.
        assert_eq!(cpu.pending_exceptions(), vec![ExceptionKind::NormalInterrupt]);
    }

    #[test]
    fn data_abort_in_thumb_returns_past_the_instruction() {
        let mut cpu = cpu_with(&[]);
        user_mode(&mut cpu);
        cpu.change_cpu_state(0x0000_0401);

        cpu.raise_exception(ExceptionKind::DataAbort);
        assert_eq!(cpu.step(), Ok(StepOutcome::Interrupted(ExceptionKind::DataAbort)));

        assert_eq!(cpu.registers.operating_mode(), Ok(Mode::Abort));
        assert_eq!(cpu.registers.register_at(REG_LR), Ok(0x406));
        assert_eq!(cpu.cpu_state(), CpuState::Arm);
        assert!(cpu.registers.spsr().unwrap().unwrap().state_bit());
    }

    #[test]
    fn raised_reset_resets() {
        let mut cpu = cpu_with(&[]);
        user_mode(&mut cpu);
        cpu.registers.set_register_at(3, 0x33).unwrap();
        cpu.registers.set_program_counter(0x80);

        cpu.raise_exception(ExceptionKind::Reset);
        assert_eq!(cpu.step(), Ok(StepOutcome::Interrupted(ExceptionKind::Reset)));

        assert_eq!(cpu.registers, RegisterFile::new());
        assert_eq!(cpu.dispatcher_state(), DispatcherState::Idle);
    }

    #[test]
    fn legacy_exception_is_never_taken() {
        let mut cpu = cpu_with(&[]);

        assert!(!cpu.raise_exception(ExceptionKind::AddressExceeds26Bit));
        assert!(cpu.pending_exceptions().is_empty());
    }

    #[test]
    fn return_from_exception() {
        let mut cpu = cpu_with(&[]);
        user_mode(&mut cpu);
        cpu.registers.cpsr.set_zero_flag(true);
        cpu.registers.set_register_at(REG_SP, 0x3000).unwrap();
        cpu.registers.set_program_counter(0x200);
        let user_cpsr = cpu.registers.cpsr;

        cpu.raise_exception(ExceptionKind::NormalInterrupt);
        cpu.step().unwrap();
        cpu.registers.set_register_at(REG_SP, 0x3F00).unwrap();

        // SUBS PC, LR, #4 is what a handler does, adjust LR by hand here.
        let lr = cpu.registers.register_at(REG_LR).unwrap();
        cpu.registers.set_register_at(REG_LR, lr - 4).unwrap();

        assert_eq!(cpu.return_from_exception(), Ok(true));
        assert_eq!(cpu.registers.cpsr, user_cpsr);
        assert_eq!(cpu.registers.program_counter(), 0x200);
        assert_eq!(cpu.registers.register_at(REG_SP), Ok(0x3000));
    }

    #[test]
    fn return_from_exception_without_spsr() {
        let mut cpu = cpu_with(&[]);
        cpu.registers.set_operating_mode(Mode::System);
        cpu.registers.set_program_counter(0x40);

        assert_eq!(cpu.return_from_exception(), Ok(false));
        assert_eq!(cpu.registers.program_counter(), 0x40);
        assert_eq!(cpu.registers.operating_mode(), Ok(Mode::System));
    }

    #[test]
    fn corrupted_mode_stops_the_core() {
        let mut cpu = cpu_with(&[0xE3A0_0001]);
        cpu.registers.cpsr = Psr::from(0x0000_00C1);

        assert!(matches!(cpu.step(), Err(CpuError::CorruptedMode { .. })));
        assert_eq!(cpu.registers.program_counter(), 0);
        assert_eq!(cpu.registers.register_at(0), Err(CpuError::CorruptedMode { psr: 0xC1, mode_bits: 1 }));
    }

    #[test]
    fn branch_alignment_follows_state() {
        let mut cpu = cpu_with(&[]);

        cpu.branch_to(0x1237);
        assert_eq!(cpu.registers.program_counter(), 0x1234);

        cpu.force_change_cpu_state(CpuState::Thumb);
        cpu.branch_to(0x1237);
        assert_eq!(cpu.registers.program_counter(), 0x1236);
    }

    #[test]
    fn flow_merge() {
        assert_eq!(Flow::Advance.merge(Flow::Advance), Flow::Advance);
        assert_eq!(Flow::Advance.merge(Flow::Branch), Flow::Branch);
        assert_eq!(
            Flow::Branch.merge(Flow::Raise(ExceptionKind::UndefinedInstruction)),
            Flow::Raise(ExceptionKind::UndefinedInstruction)
        );
    }
}
