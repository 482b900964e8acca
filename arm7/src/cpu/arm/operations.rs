use tracing::{debug, warn};

use crate::bitwise::Bits;
use crate::bus::Bus;
use crate::cpu::arm::alu_instruction::{
    AluSecondOperandInfo, ArmModeAluInstruction, ShiftOperator, rotate_immediate, shift_immediate,
    shift_register,
};
use crate::cpu::arm::instructions::{
    ArmModeInstruction, ArmModeMultiplyLongVariant, ArmModeMultiplyVariant,
    HalfwordDataTransferOffsetKind, MsrOperand, PsrKind, PsrOpKind, SingleDataTransferOffsetInfo,
};
use crate::cpu::arm7tdmi::{Arm7tdmi, Flow};
use crate::cpu::cpu_modes::Mode;
use crate::cpu::exception::ExceptionKind;
use crate::cpu::flags::{
    HalfwordTransferKind, Indexing, LoadStoreKind, Offsetting, ReadWriteKind,
};
use crate::cpu::psr::{CONTROL_MASK, FLAGS_MASK};
use crate::cpu::registers::{REG_LR, REG_PROGRAM_COUNTER};
use crate::error::CpuError;

pub const SIZE_OF_INSTRUCTION: u32 = 4;

/// R15 as an operand: instruction address + 8.
const PC_READ_OFFSET: u32 = 8;

/// R15 as an operand when the shift amount comes from a register.
const PC_READ_OFFSET_REGISTER_SHIFT: u32 = 12;

/// R15 stored by STR/STM: instruction address + 12.
const PC_STORE_OFFSET: u32 = 12;

/// Bit 5 of a PSR, MSR never changes it in the CPSR.
const STATE_BIT_MASK: u32 = 1 << 5;

impl<B: Bus> Arm7tdmi<B> {
    pub(crate) fn execute_arm_instruction(&mut self, instruction: ArmModeInstruction) -> Result<Flow, CpuError> {
        use ArmModeInstruction::*;

        match instruction {
            DataProcessing {
                alu_instruction,
                set_conditions,
                rn,
                destination,
                op2,
            } => self.data_processing(alu_instruction, set_conditions, rn, destination, op2),
            Multiply {
                variant,
                should_set_codes,
                rd_destination_register,
                rn_accumulate_register,
                rs_operand_register,
                rm_operand_register,
            } => self.multiply(
                variant,
                should_set_codes,
                rd_destination_register,
                rn_accumulate_register,
                rs_operand_register,
                rm_operand_register,
            ),
            MultiplyLong {
                variant,
                should_set_codes,
                rdhi_destination_register,
                rdlo_destination_register,
                rs_operand_register,
                rm_operand_register,
            } => self.multiply_long(
                variant,
                should_set_codes,
                rdhi_destination_register,
                rdlo_destination_register,
                rs_operand_register,
                rm_operand_register,
            ),
            PsrTransfer { psr_kind, kind } => self.psr_transfer(psr_kind, kind),
            SingleDataSwap { quantity, rn, rd, rm } => self.single_data_swap(quantity, rn, rd, rm),
            BranchAndExchange { register } => self.branch_and_exchange(register),
            HalfwordDataTransfer {
                indexing,
                offsetting,
                write_back,
                load_store_kind,
                offset_kind,
                base_register,
                source_destination_register,
                transfer_kind,
            } => self.half_word_data_transfer(
                indexing,
                offsetting,
                write_back,
                load_store_kind,
                offset_kind,
                base_register,
                source_destination_register,
                transfer_kind,
            ),
            SingleDataTransfer {
                load_store,
                quantity,
                write_back,
                indexing,
                rd,
                base_register,
                offset_info,
                offsetting,
            } => self.single_data_transfer(
                load_store,
                quantity,
                write_back,
                indexing,
                rd,
                base_register,
                offset_info,
                offsetting,
            ),
            BlockDataTransfer {
                indexing,
                offsetting,
                load_psr,
                write_back,
                load_store,
                rn,
                register_list,
            } => self.block_data_transfer(
                indexing,
                offsetting,
                load_psr,
                write_back,
                load_store,
                rn,
                register_list,
            ),
            Branch { link, offset } => self.branch(link, offset),
            SoftwareInterrupt { comment } => Ok(self.software_interrupt(comment)),
            Undefined => Ok(self.undefined_instruction()),
        }
    }

    pub(crate) fn data_processing(
        &mut self,
        alu_instruction: ArmModeAluInstruction,
        set_conditions: bool,
        rn: usize,
        destination: usize,
        op2: AluSecondOperandInfo,
    ) -> Result<Flow, CpuError> {
        // The pipeline moves one more word while the shift register is read.
        let pc_offset = if op2.shifts_by_register() {
            PC_READ_OFFSET_REGISTER_SHIFT
        } else {
            PC_READ_OFFSET
        };

        let carry = self.registers.cpsr.carry_flag();
        let op1 = self.read_register(rn, pc_offset)?;
        let op2 = match op2 {
            AluSecondOperandInfo::Immediate { base, shift } => rotate_immediate(base, shift, carry),
            AluSecondOperandInfo::Register {
                shift_op,
                shift_kind,
                register,
            } => {
                let rm = self.read_register(register, pc_offset)?;
                match shift_op {
                    ShiftOperator::Immediate(amount) => shift_immediate(shift_kind, amount, rm, carry),
                    ShiftOperator::Register(rs) => {
                        let amount = self.read_register(rs, pc_offset)?;
                        shift_register(shift_kind, amount, rm, carry)
                    }
                }
            }
        };

        let result = alu_instruction.execute(op1, op2, self.registers.cpsr);

        if alu_instruction.is_comparison() {
            if set_conditions {
                self.registers.cpsr.set_flags(&result);
            }
            return Ok(Flow::Advance);
        }

        if destination == REG_PROGRAM_COUNTER {
            // S=1 with Rd=R15 is how handlers return (MOVS PC, LR / SUBS PC, LR, #4).
            if set_conditions {
                self.restore_cpsr_from_spsr()?;
            }
            self.branch_to(result.result);
            return Ok(Flow::Branch);
        }

        self.registers.set_register_at(destination, result.result)?;
        if set_conditions {
            self.registers.cpsr.set_flags(&result);
        }

        Ok(Flow::Advance)
    }

    pub(crate) fn multiply(
        &mut self,
        variant: ArmModeMultiplyVariant,
        should_set_codes: bool,
        rd_destination_register: usize,
        rn_accumulate_register: usize,
        rs_operand_register: usize,
        rm_operand_register: usize,
    ) -> Result<Flow, CpuError> {
        let rm = self.read_register(rm_operand_register, PC_READ_OFFSET)?;
        let rs = self.read_register(rs_operand_register, PC_READ_OFFSET)?;

        let result = match variant {
            ArmModeMultiplyVariant::Mul => rm.wrapping_mul(rs),
            ArmModeMultiplyVariant::Mla => {
                let rn = self.read_register(rn_accumulate_register, PC_READ_OFFSET)?;
                rm.wrapping_mul(rs).wrapping_add(rn)
            }
        };

        // C is meaningless after a multiply, V is untouched.
        if should_set_codes {
            self.registers.cpsr.set_sign_flag(result.get_bit(31));
            self.registers.cpsr.set_zero_flag(result == 0);
        }

        self.write_register(rd_destination_register, result)
    }

    pub(crate) fn multiply_long(
        &mut self,
        variant: ArmModeMultiplyLongVariant,
        should_set_codes: bool,
        rdhi_destination_register: usize,
        rdlo_destination_register: usize,
        rs_operand_register: usize,
        rm_operand_register: usize,
    ) -> Result<Flow, CpuError> {
        let rm = self.read_register(rm_operand_register, PC_READ_OFFSET)?;
        let rs = self.read_register(rs_operand_register, PC_READ_OFFSET)?;

        let product = if variant.is_signed() {
            (i64::from(rm as i32) * i64::from(rs as i32)) as u64
        } else {
            u64::from(rm) * u64::from(rs)
        };

        let result = if variant.accumulates() {
            let hi = self.read_register(rdhi_destination_register, PC_READ_OFFSET)?;
            let lo = self.read_register(rdlo_destination_register, PC_READ_OFFSET)?;
            product.wrapping_add((u64::from(hi) << 32) | u64::from(lo))
        } else {
            product
        };

        if should_set_codes {
            self.registers.cpsr.set_sign_flag(result >> 63 == 1);
            self.registers.cpsr.set_zero_flag(result == 0);
        }

        let lo = self.write_register(rdlo_destination_register, result as u32)?;
        let hi = self.write_register(rdhi_destination_register, (result >> 32) as u32)?;

        Ok(lo.merge(hi))
    }

    pub(crate) fn psr_transfer(&mut self, psr_kind: PsrKind, kind: PsrOpKind) -> Result<Flow, CpuError> {
        let mode = self.registers.operating_mode()?;

        match kind {
            PsrOpKind::Mrs {
                destination_register,
            } => {
                let psr = match psr_kind {
                    PsrKind::Cpsr => self.registers.cpsr,
                    PsrKind::Spsr => self.registers.spsr()?.unwrap_or_else(|| {
                        warn!("MRS of SPSR in {mode}, which has no SPSR, reading CPSR");
                        self.registers.cpsr
                    }),
                };

                self.write_register(destination_register, psr.into())
            }
            PsrOpKind::Msr { field_mask, operand } => {
                let value = match operand {
                    MsrOperand::Register(register) => self.read_register(register, PC_READ_OFFSET)?,
                    MsrOperand::Immediate { base, shift } => base.rotate_right(shift),
                };

                let mut psr = match psr_kind {
                    PsrKind::Cpsr => self.registers.cpsr,
                    PsrKind::Spsr => {
                        let Some(spsr) = self.registers.spsr()? else {
                            warn!("MSR to SPSR in {mode}, which has no SPSR, ignored");
                            return Ok(Flow::Advance);
                        };
                        spsr
                    }
                };

                if field_mask.get_bit(3) {
                    psr.write_masked(value, FLAGS_MASK)?;
                }

                if field_mask.get_bit(0) {
                    let control_mask = match psr_kind {
                        PsrKind::Cpsr => CONTROL_MASK & !STATE_BIT_MASK,
                        PsrKind::Spsr => CONTROL_MASK,
                    };

                    if !mode.is_privileged() {
                        debug!("MSR control field write ignored in {mode}");
                    } else if let Err(error) = psr.write_masked(value, control_mask) {
                        warn!("MSR control field write ignored: {error}");
                    }
                }

                match psr_kind {
                    PsrKind::Cpsr => self.registers.cpsr = psr,
                    PsrKind::Spsr => {
                        self.registers.set_spsr(psr)?;
                    }
                }

                Ok(Flow::Advance)
            }
        }
    }

    pub(crate) fn single_data_swap(
        &mut self,
        quantity: ReadWriteKind,
        rn: usize,
        rd: usize,
        rm: usize,
    ) -> Result<Flow, CpuError> {
        let address = self.read_register(rn, PC_READ_OFFSET)?;
        let source = self.read_register(rm, PC_READ_OFFSET)?;

        let old = match quantity {
            ReadWriteKind::Byte => {
                let old = u32::from(self.bus.read_byte(address));
                self.bus.write_byte(address, source as u8);
                old
            }
            ReadWriteKind::Word => {
                let old = self.bus.read_word(address);
                self.bus.write_word(address, source);
                old
            }
        };

        self.write_register(rd, old)
    }

    pub(crate) fn branch_and_exchange(&mut self, register: usize) -> Result<Flow, CpuError> {
        let address = self.read_register(register, PC_READ_OFFSET)?;
        self.change_cpu_state(address);

        Ok(Flow::Branch)
    }

    pub(crate) fn half_word_data_transfer(
        &mut self,
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        load_store_kind: LoadStoreKind,
        offset_kind: HalfwordDataTransferOffsetKind,
        base_register: usize,
        source_destination_register: usize,
        transfer_kind: HalfwordTransferKind,
    ) -> Result<Flow, CpuError> {
        if load_store_kind == LoadStoreKind::Store && transfer_kind != HalfwordTransferKind::UnsignedHalfwords {
            warn!("signed halfword store encoding {transfer_kind:?} is undefined");
            return Ok(self.undefined_instruction());
        }

        let base = self.read_register(base_register, PC_READ_OFFSET)?;
        let offset = match offset_kind {
            HalfwordDataTransferOffsetKind::Immediate { offset } => offset,
            HalfwordDataTransferOffsetKind::Register { register } => {
                self.read_register(register, PC_READ_OFFSET)?
            }
        };

        let offset_address = offsetting.apply(base, offset);
        let address = match indexing {
            Indexing::Pre => offset_address,
            Indexing::Post => base,
        };
        let write_back = write_back || indexing == Indexing::Post;

        match load_store_kind {
            LoadStoreKind::Load => {
                let value = match transfer_kind {
                    HalfwordTransferKind::UnsignedHalfwords => u32::from(self.bus.read_half_word(address)),
                    HalfwordTransferKind::SignedByte => u32::from(self.bus.read_byte(address)).sign_extended(8),
                    HalfwordTransferKind::SignedHalfwords => {
                        u32::from(self.bus.read_half_word(address)).sign_extended(16)
                    }
                    HalfwordTransferKind::Reserved => return Ok(self.undefined_instruction()),
                };

                if write_back {
                    self.write_back_base(base_register, offset_address)?;
                }
                self.write_register(source_destination_register, value)
            }
            LoadStoreKind::Store => {
                let value = self.read_register(source_destination_register, PC_STORE_OFFSET)?;
                self.bus.write_half_word(address, value as u16);

                if write_back {
                    self.write_back_base(base_register, offset_address)?;
                }
                Ok(Flow::Advance)
            }
        }
    }

    pub(crate) fn single_data_transfer(
        &mut self,
        load_store: LoadStoreKind,
        quantity: ReadWriteKind,
        write_back: bool,
        indexing: Indexing,
        rd: usize,
        base_register: usize,
        offset_info: SingleDataTransferOffsetInfo,
        offsetting: Offsetting,
    ) -> Result<Flow, CpuError> {
        let base = self.read_register(base_register, PC_READ_OFFSET)?;
        let offset = match offset_info {
            SingleDataTransferOffsetInfo::Immediate { offset } => offset,
            SingleDataTransferOffsetInfo::RegisterImmediate {
                shift_amount,
                shift_kind,
                reg_offset,
            } => {
                let rm = self.read_register(reg_offset, PC_READ_OFFSET)?;
                shift_immediate(shift_kind, shift_amount, rm, self.registers.cpsr.carry_flag()).value
            }
        };

        let offset_address = offsetting.apply(base, offset);
        let address = match indexing {
            Indexing::Pre => offset_address,
            Indexing::Post => base,
        };
        // Post-indexed transfers always write back, W selects the user
        // bank translation there which has no meaning without an MMU.
        let write_back = write_back || indexing == Indexing::Post;

        match load_store {
            LoadStoreKind::Load => {
                let value = match quantity {
                    ReadWriteKind::Byte => u32::from(self.bus.read_byte(address)),
                    ReadWriteKind::Word => self.bus.read_word(address),
                };

                // Written back first so the loaded value wins when Rn == Rd.
                if write_back {
                    self.write_back_base(base_register, offset_address)?;
                }
                self.write_register(rd, value)
            }
            LoadStoreKind::Store => {
                let value = self.read_register(rd, PC_STORE_OFFSET)?;
                match quantity {
                    ReadWriteKind::Byte => self.bus.write_byte(address, value as u8),
                    ReadWriteKind::Word => self.bus.write_word(address, value),
                }

                if write_back {
                    self.write_back_base(base_register, offset_address)?;
                }
                Ok(Flow::Advance)
            }
        }
    }

    pub(crate) fn block_data_transfer(
        &mut self,
        indexing: Indexing,
        offsetting: Offsetting,
        load_psr: bool,
        write_back: bool,
        load_store: LoadStoreKind,
        rn: usize,
        register_list: u16,
    ) -> Result<Flow, CpuError> {
        let base = self.read_register(rn, PC_READ_OFFSET)?;

        // An empty list transfers R15 alone but moves the base by 16 words.
        let (registers, span): (Vec<usize>, u32) = if register_list == 0 {
            (vec![REG_PROGRAM_COUNTER], 0x40)
        } else {
            let registers: Vec<usize> = (0..16)
                .filter(|reg| register_list.get_bit(*reg as u8))
                .collect();
            let span = registers.len() as u32 * 4;
            (registers, span)
        };

        // Registers always go to memory in ascending order, lowest register
        // at the lowest address.
        let (lowest_address, final_base) = match (offsetting, indexing) {
            (Offsetting::Up, Indexing::Pre) => (base.wrapping_add(4), base.wrapping_add(span)),
            (Offsetting::Up, Indexing::Post) => (base, base.wrapping_add(span)),
            (Offsetting::Down, Indexing::Pre) => (base.wrapping_sub(span), base.wrapping_sub(span)),
            (Offsetting::Down, Indexing::Post) => (
                base.wrapping_sub(span).wrapping_add(4),
                base.wrapping_sub(span),
            ),
        };

        let mode = self.registers.operating_mode()?;
        let loads_pc = load_store == LoadStoreKind::Load && registers.contains(&REG_PROGRAM_COUNTER);
        // S without R15 in an LDM (or any STM) moves the User bank.
        let transfer_mode = if load_psr && !loads_pc { Mode::User } else { mode };

        match load_store {
            LoadStoreKind::Store => {
                for (index, reg) in registers.iter().copied().enumerate() {
                    let address = lowest_address.wrapping_add(index as u32 * 4);
                    let value = if reg == REG_PROGRAM_COUNTER {
                        self.registers
                            .program_counter()
                            .wrapping_add(PC_STORE_OFFSET)
                    } else if reg == rn && write_back && index != 0 {
                        final_base
                    } else {
                        self.registers.register_in_mode(transfer_mode, reg)
                    };

                    self.bus.write_word(address, value);
                }

                if write_back {
                    self.write_back_base(rn, final_base)?;
                }

                Ok(Flow::Advance)
            }
            LoadStoreKind::Load => {
                let values: Vec<u32> = (0..registers.len() as u32)
                    .map(|index| self.bus.read_word(lowest_address.wrapping_add(index * 4)))
                    .collect();

                if write_back && !registers.contains(&rn) {
                    self.write_back_base(rn, final_base)?;
                }

                let mut flow = Flow::Advance;
                for (reg, value) in registers.into_iter().zip(values) {
                    if reg == REG_PROGRAM_COUNTER {
                        if load_psr {
                            self.restore_cpsr_from_spsr()?;
                        }
                        self.branch_to(value);
                        flow = Flow::Branch;
                    } else {
                        self.registers
                            .set_register_in_mode(transfer_mode, reg, value);
                    }
                }

                Ok(flow)
            }
        }
    }

    pub(crate) fn branch(&mut self, link: bool, offset: i32) -> Result<Flow, CpuError> {
        let address = self.registers.program_counter();

        if link {
            self.registers
                .set_register_at(REG_LR, address.wrapping_add(SIZE_OF_INSTRUCTION))?;
        }

        self.branch_to(
            address
                .wrapping_add(PC_READ_OFFSET)
                .wrapping_add_signed(offset),
        );

        Ok(Flow::Branch)
    }

    pub(crate) fn software_interrupt(&self, comment: u32) -> Flow {
        debug!(
            "SWI 0x{comment:06X} at 0x{:08X}",
            self.registers.program_counter()
        );

        Flow::Raise(ExceptionKind::SoftwareInterrupt)
    }

    pub(crate) fn undefined_instruction(&self) -> Flow {
        warn!(
            "undefined instruction at 0x{:08X}",
            self.registers.program_counter()
        );

        Flow::Raise(ExceptionKind::UndefinedInstruction)
    }

    /// Base register update of a transfer, R15 is never written back.
    fn write_back_base(&mut self, base_register: usize, value: u32) -> Result<(), CpuError> {
        if base_register == REG_PROGRAM_COUNTER {
            debug!("write-back to R15 ignored");
            return Ok(());
        }

        self.registers.set_register_at(base_register, value)
    }
}
