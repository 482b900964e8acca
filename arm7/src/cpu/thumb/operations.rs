use tracing::{debug, trace};

use crate::bus::Bus;
use crate::cpu::arm7tdmi::{Arm7tdmi, Flow, StepOutcome};
use crate::cpu::psr::CpuState;
use crate::cpu::thumb::instruction::ThumbModeInstruction;
use crate::error::CpuError;

/// R15 as an operand: instruction address + 4.
const PC_READ_OFFSET: u32 = 4;

impl<B: Bus> Arm7tdmi<B> {
    /// Fetches, decodes and executes the THUMB instruction at PC.
    ///
    /// # Errors
    ///
    /// Propagates [`CpuError::CorruptedMode`] from register accesses.
    pub fn execute_thumb(&mut self) -> Result<StepOutcome, CpuError> {
        let address = self.registers.program_counter();
        let op_code = self.bus.read_half_word(address);
        let instruction = ThumbModeInstruction::from(op_code);

        trace!("0x{address:08X}: 0x{op_code:04X} {instruction}");

        let flow = match instruction {
            ThumbModeInstruction::BranchAndExchange { register } => self.thumb_branch_and_exchange(register)?,
            ThumbModeInstruction::SoftwareInterrupt { comment } => self.software_interrupt(u32::from(comment)),
            ThumbModeInstruction::Undefined => {
                debug!("THUMB op code 0x{op_code:04X} is left to the undefined instruction handler");
                self.undefined_instruction()
            }
        };

        Ok(self.complete(flow, address, u32::from(op_code), CpuState::Thumb))
    }

    fn thumb_branch_and_exchange(&mut self, register: usize) -> Result<Flow, CpuError> {
        let address = self.read_register(register, PC_READ_OFFSET)?;
        self.change_cpu_state(address);

        Ok(Flow::Branch)
    }
}

#[cfg(test)]
mod tests {
    use crate::bus::Bus;
    use crate::cpu::arm7tdmi::{Arm7tdmi, Fault, StepOutcome};
    use crate::cpu::cpu_modes::Mode;
    use crate::cpu::exception::ExceptionKind;
    use crate::cpu::psr::{CpuState, Psr};
    use crate::cpu::registers::REG_LR;
    use crate::memory::FlatMemory;
    use pretty_assertions::assert_eq;

    fn thumb_cpu_at(address: u32, half_words: &[u16]) -> Arm7tdmi<FlatMemory> {
        let mut cpu = Arm7tdmi::new(FlatMemory::new(0x1000));
        for (index, half_word) in half_words.iter().enumerate() {
            cpu.bus
                .write_half_word(address + index as u32 * 2, *half_word);
        }
        cpu.registers.cpsr = Psr::from(Mode::User);
        cpu.change_cpu_state(address | 1);

        cpu
    }

    #[test]
    fn bx_back_to_arm() {
        // BX R3
        let mut cpu = thumb_cpu_at(0x100, &[0x4718]);
        cpu.registers.set_register_at(3, 0x200).unwrap();

        assert_eq!(
            cpu.step(),
            Ok(StepOutcome::Executed {
                address: 0x100,
                op_code: 0x4718
            })
        );
        assert_eq!(cpu.cpu_state(), CpuState::Arm);
        assert_eq!(cpu.registers.program_counter(), 0x200);
    }

    #[test]
    fn bx_pc_reads_ahead() {
        // BX PC at 0x102: target 0x106, bit 0 clear so ARM
        let mut cpu = thumb_cpu_at(0x102, &[0x4778]);
        cpu.step().unwrap();

        assert_eq!(cpu.cpu_state(), CpuState::Arm);
        assert_eq!(cpu.registers.program_counter(), 0x106);
    }

    #[test]
    fn swi_from_thumb() {
        // SWI 0x05
        let mut cpu = thumb_cpu_at(0x100, &[0xDF05]);
        let user_cpsr = cpu.registers.cpsr;

        assert_eq!(
            cpu.step(),
            Ok(StepOutcome::Trapped(Fault {
                kind: ExceptionKind::SoftwareInterrupt,
                address: 0x100,
                op_code: 0xDF05,
            }))
        );
        assert_eq!(cpu.cpu_state(), CpuState::Arm);
        assert_eq!(cpu.registers.operating_mode(), Ok(Mode::Supervisor));
        assert_eq!(cpu.registers.register_at(REG_LR), Ok(0x102));
        assert_eq!(cpu.registers.spsr(), Ok(Some(user_cpsr)));
        assert_eq!(cpu.registers.program_counter(), 0x08);
    }

    #[test]
    fn other_thumb_instructions_trap() {
        // MOV R0, #1
        let mut cpu = thumb_cpu_at(0x100, &[0x2001]);

        assert!(matches!(
            cpu.step(),
            Ok(StepOutcome::Trapped(Fault {
                kind: ExceptionKind::UndefinedInstruction,
                address: 0x100,
                ..
            }))
        ));
        assert_eq!(cpu.registers.operating_mode(), Ok(Mode::Undefined));
        assert_eq!(cpu.registers.register_at(REG_LR), Ok(0x102));
        assert_eq!(cpu.registers.register_at(0), Ok(0));
    }
}
