//! # Data processing primitives
//!
//! The barrel shifter that produces operand 2, and the ALU proper.
//!
//! Every shifter function returns the shifted value together with the
//! shifter carry-out. Logical operations copy that carry into C, arithmetic
//! ones replace it with the adder carry.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::flags::ShiftKind;
use crate::cpu::psr::Psr;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum ArmModeAluInstruction {
    And = 0x0,
    Eor = 0x1,
    Sub = 0x2,
    Rsb = 0x3,
    Add = 0x4,
    Adc = 0x5,
    Sbc = 0x6,
    Rsc = 0x7,
    Tst = 0x8,
    Teq = 0x9,
    Cmp = 0xA,
    Cmn = 0xB,
    Orr = 0xC,
    Mov = 0xD,
    Bic = 0xE,
    Mvn = 0xF,
}

impl Display for ArmModeAluInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Eor => f.write_str("EOR"),
            Self::Sub => f.write_str("SUB"),
            Self::Rsb => f.write_str("RSB"),
            Self::Add => f.write_str("ADD"),
            Self::Adc => f.write_str("ADC"),
            Self::Sbc => f.write_str("SBC"),
            Self::Rsc => f.write_str("RSC"),
            Self::Tst => f.write_str("TST"),
            Self::Teq => f.write_str("TEQ"),
            Self::Cmp => f.write_str("CMP"),
            Self::Cmn => f.write_str("CMN"),
            Self::Orr => f.write_str("ORR"),
            Self::Mov => f.write_str("MOV"),
            Self::Bic => f.write_str("BIC"),
            Self::Mvn => f.write_str("MVN"),
        }
    }
}

/// Logical operations take C from the shifter, arithmetic ones from the adder.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AluInstructionKind {
    Logical,
    Arithmetic,
}

impl ArmModeAluInstruction {
    #[must_use]
    pub const fn kind(self) -> AluInstructionKind {
        match self {
            Self::And | Self::Eor | Self::Tst | Self::Teq | Self::Orr | Self::Mov | Self::Bic | Self::Mvn => {
                AluInstructionKind::Logical
            }
            Self::Sub | Self::Rsb | Self::Add | Self::Adc | Self::Sbc | Self::Rsc | Self::Cmp | Self::Cmn => {
                AluInstructionKind::Arithmetic
            }
        }
    }

    /// TST, TEQ, CMP and CMN only update flags, they never write Rd.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(self, Self::Tst | Self::Teq | Self::Cmp | Self::Cmn)
    }

    /// Computes `rn <op> operand2`.
    ///
    /// The returned flags are the ones the instruction would set with S=1:
    /// logical operations take C from the shifter and keep the V of `psr`.
    #[must_use]
    pub fn execute(self, rn: u32, operand2: ShifterOutput, psr: Psr) -> ArithmeticOpResult {
        let carry = psr.carry_flag();
        let op2 = operand2.value;

        match self.kind() {
            AluInstructionKind::Logical => {
                let result = match self {
                    Self::And | Self::Tst => rn & op2,
                    Self::Eor | Self::Teq => rn ^ op2,
                    Self::Orr => rn | op2,
                    Self::Mov => op2,
                    Self::Bic => rn & !op2,
                    _ => !op2,
                };
                logical(result, operand2.carry, psr)
            }
            AluInstructionKind::Arithmetic => {
                let (a, b, carry_in) = match self {
                    Self::Sub | Self::Cmp => (rn, !op2, true),
                    Self::Rsb => (op2, !rn, true),
                    Self::Add | Self::Cmn => (rn, op2, false),
                    Self::Adc => (rn, op2, carry),
                    Self::Sbc => (rn, !op2, carry),
                    _ => (op2, !rn, carry),
                };
                add_with_carry(a, b, carry_in)
            }
        }
    }
}

impl From<u32> for ArmModeAluInstruction {
    fn from(alu_op_code: u32) -> Self {
        match alu_op_code & 0xF {
            0x0 => Self::And,
            0x1 => Self::Eor,
            0x2 => Self::Sub,
            0x3 => Self::Rsb,
            0x4 => Self::Add,
            0x5 => Self::Adc,
            0x6 => Self::Sbc,
            0x7 => Self::Rsc,
            0x8 => Self::Tst,
            0x9 => Self::Teq,
            0xA => Self::Cmp,
            0xB => Self::Cmn,
            0xC => Self::Orr,
            0xD => Self::Mov,
            0xE => Self::Bic,
            _ => Self::Mvn,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArithmeticOpResult {
    pub result: u32,
    pub carry: bool,
    pub overflow: bool,
    pub sign: bool,
    pub zero: bool,
}

/// Value produced by the barrel shifter and its carry-out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShifterOutput {
    pub value: u32,
    pub carry: bool,
}

impl ShifterOutput {
    const fn new(value: u32, carry: bool) -> Self {
        Self { value, carry }
    }
}

/// Where the shift amount of a register operand comes from.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum ShiftOperator {
    /// 5-bit amount encoded in the instruction.
    Immediate(u32),
    /// Low byte of the given register.
    Register(usize),
}

/// Operand 2 of a data processing instruction.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum AluSecondOperandInfo {
    /// `base` rotated right by `shift` (already doubled).
    Immediate { base: u32, shift: u32 },
    Register {
        shift_op: ShiftOperator,
        shift_kind: ShiftKind,
        register: usize,
    },
}

impl AluSecondOperandInfo {
    /// A register-specified shift delays the read of R15 by one more word.
    #[must_use]
    pub const fn shifts_by_register(self) -> bool {
        matches!(
            self,
            Self::Register {
                shift_op: ShiftOperator::Register(_),
                ..
            }
        )
    }
}

impl Display for AluSecondOperandInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Immediate { base, shift } => write!(f, "#{}", base.rotate_right(*shift)),
            Self::Register {
                shift_op: ShiftOperator::Immediate(0),
                shift_kind: ShiftKind::Lsl,
                register,
            } => write!(f, "R{register}"),
            Self::Register {
                shift_op: ShiftOperator::Immediate(0),
                shift_kind: ShiftKind::Ror,
                register,
            } => write!(f, "R{register}, RRX"),
            Self::Register {
                shift_op: ShiftOperator::Immediate(0),
                shift_kind,
                register,
            } => write!(f, "R{register}, {shift_kind} #32"),
            Self::Register {
                shift_op: ShiftOperator::Immediate(amount),
                shift_kind,
                register,
            } => write!(f, "R{register}, {shift_kind} #{amount}"),
            Self::Register {
                shift_op: ShiftOperator::Register(rs),
                shift_kind,
                register,
            } => write!(f, "R{register}, {shift_kind} R{rs}"),
        }
    }
}

fn logical(result: u32, carry: bool, psr: Psr) -> ArithmeticOpResult {
    ArithmeticOpResult {
        result,
        carry,
        overflow: psr.overflow_flag(),
        sign: result >> 31 == 1,
        zero: result == 0,
    }
}

/// `a + b + carry_in` with the flags of the ARM adder.
///
/// Subtraction is expressed as `a + !b + 1` (or `+ C` for SBC), which makes C
/// the "no borrow" flag.
#[must_use]
pub const fn add_with_carry(a: u32, b: u32, carry_in: bool) -> ArithmeticOpResult {
    let wide = a as u64 + b as u64 + carry_in as u64;
    let result = wide as u32;

    ArithmeticOpResult {
        result,
        carry: wide > u32::MAX as u64,
        overflow: (!(a ^ b) & (a ^ result)) >> 31 == 1,
        sign: result >> 31 == 1,
        zero: result == 0,
    }
}

/// Immediate operand: `base` rotated right by `rotate`.
///
/// C is only replaced when the rotation is non-zero.
#[must_use]
pub fn rotate_immediate(base: u32, rotate: u32, carry: bool) -> ShifterOutput {
    if rotate == 0 {
        return ShifterOutput::new(base, carry);
    }

    let value = base.rotate_right(rotate);
    ShifterOutput::new(value, value.get_bit(31))
}

/// Shift by a 5-bit amount encoded in the instruction.
///
/// An amount of 0 has special meanings: no shift for LSL, a shift by 32 for
/// LSR and ASR, and RRX for ROR.
#[must_use]
pub fn shift_immediate(kind: ShiftKind, shift_amount: u32, rm: u32, carry: bool) -> ShifterOutput {
    let amount = shift_amount & 0x1F;

    match (kind, amount) {
        (ShiftKind::Lsl, 0) => ShifterOutput::new(rm, carry),
        (ShiftKind::Lsr, 0) => ShifterOutput::new(0, rm.get_bit(31)),
        (ShiftKind::Asr, 0) => ShifterOutput::new(((rm as i32) >> 31) as u32, rm.get_bit(31)),
        (ShiftKind::Ror, 0) => ShifterOutput::new((u32::from(carry) << 31) | (rm >> 1), rm.get_bit(0)),
        (ShiftKind::Lsl, n) => ShifterOutput::new(rm << n, rm.get_bit((32 - n) as u8)),
        (ShiftKind::Lsr, n) => ShifterOutput::new(rm >> n, rm.get_bit((n - 1) as u8)),
        (ShiftKind::Asr, n) => ShifterOutput::new(((rm as i32) >> n) as u32, rm.get_bit((n - 1) as u8)),
        (ShiftKind::Ror, n) => ShifterOutput::new(rm.rotate_right(n), rm.get_bit((n - 1) as u8)),
    }
}

/// Shift by the low byte of a register.
///
/// An amount of 0 leaves both value and carry unchanged. Amounts of 32 and
/// more saturate instead of wrapping.
#[must_use]
pub fn shift_register(kind: ShiftKind, shift_amount: u32, rm: u32, carry: bool) -> ShifterOutput {
    let amount = shift_amount & 0xFF;
    if amount == 0 {
        return ShifterOutput::new(rm, carry);
    }

    match kind {
        ShiftKind::Lsl => match amount {
            1..=31 => ShifterOutput::new(rm << amount, rm.get_bit((32 - amount) as u8)),
            32 => ShifterOutput::new(0, rm.get_bit(0)),
            _ => ShifterOutput::new(0, false),
        },
        ShiftKind::Lsr => match amount {
            1..=31 => ShifterOutput::new(rm >> amount, rm.get_bit((amount - 1) as u8)),
            32 => ShifterOutput::new(0, rm.get_bit(31)),
            _ => ShifterOutput::new(0, false),
        },
        ShiftKind::Asr => match amount {
            1..=31 => ShifterOutput::new(((rm as i32) >> amount) as u32, rm.get_bit((amount - 1) as u8)),
            _ => ShifterOutput::new(((rm as i32) >> 31) as u32, rm.get_bit(31)),
        },
        ShiftKind::Ror => match amount % 32 {
            0 => ShifterOutput::new(rm, rm.get_bit(31)),
            n => ShifterOutput::new(rm.rotate_right(n), rm.get_bit((n - 1) as u8)),
        },
    }
}
