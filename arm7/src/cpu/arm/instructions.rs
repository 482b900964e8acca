//! # ARM Instruction Decoding
//!
//! Classifies a 32-bit ARM word into exactly one format and extracts its
//! fields.
//!
//! ## Decoding Priority
//!
//! Several formats share the same high bits (multiply, halfword transfers,
//! BX, PSR transfers, swaps and data processing all start with `00`), so
//! classification walks a priority list and stops at the first match:
//!
//! ```text
//! ┌────┬────────────────────────────┬───────────────────────────────────────┐
//! │ #  │ Format                     │ Pattern (bits 27-0)                   │
//! ├────┼────────────────────────────┼───────────────────────────────────────┤
//! │  1 │ Multiply / Multiply long   │ 000000xx ... 1001, 00001xxx ... 1001  │
//! │  2 │ Halfword / signed transfer │ 000x xxxx ... 1SH1, SH != 00          │
//! │  3 │ Branch and exchange        │ 0001 0010 1111 1111 1111 0001 Rn      │
//! │  4 │ PSR transfer (MRS/MSR)     │ 00x1 0xx0 ..., register form bit 7=0  │
//! │  5 │ Data processing            │ 00xx ..., not register form 1xx1      │
//! │  6 │ Single data transfer       │ 01xx ..., not 011 with bit 4 set      │
//! │  7 │ Block data transfer        │ 100x                                  │
//! │  8 │ Branch / Branch with link  │ 101L                                  │
//! │  9 │ Software interrupt         │ 1111                                  │
//! │ 10 │ Single data swap           │ 0001 0B00 .... .... 0000 1001 ....    │
//! │ 11 │ Undefined                  │ anything else, coprocessor included   │
//! └────┴────────────────────────────┴───────────────────────────────────────┘
//! ```
//!
//! ## Instruction Encoding Example
//!
//! ```text
//! ADD R0, R1, R2, LSL #3
//!
//! 31-28  27-26  25  24-21  20  19-16  15-12  11-7   6-5  4  3-0
//! [1110] [ 00 ] [0] [0100] [0] [0001] [0000] [00011][00] [0][0010]
//!   ↑       ↑    ↑    ↑     ↑    ↑      ↑      ↑     ↑   ↑   ↑
//!   │       │    │    │     │    │      │      │     │   │   └─ Rm = R2
//!   │       │    │    │     │    │      │      │     │   └──── Shift by imm
//!   │       │    │    │     │    │      │      │     └──────── LSL
//!   │       │    │    │     │    │      │      └────────────── Shift = 3
//!   │       │    │    │     │    │      └───────────────────── Rd = R0
//!   │       │    │    │     │    └──────────────────────────── Rn = R1
//!   │       │    │    │     └───────────────────────────────── S = 0 (no flags)
//!   │       │    │    └─────────────────────────────────────── ADD opcode
//!   │       │    └──────────────────────────────────────────── Register operand
//!   │       └───────────────────────────────────────────────── Data processing
//!   └───────────────────────────────────────────────────────── Always execute
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bitwise::Bits;
use crate::cpu::arm::alu_instruction::{AluSecondOperandInfo, ArmModeAluInstruction, ShiftOperator};
use crate::cpu::flags::{
    HalfwordTransferKind, Indexing, LoadStoreKind, Offsetting, OperandKind, ReadWriteKind, ShiftKind,
};

#[cfg(feature = "disassembler")]
use crate::cpu::condition::Condition;

/// Format tag of an ARM word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmFormat {
    DataProcessingAlu,
    Multiply,
    HalfwordSignedTransfer,
    BranchExchange,
    PsrTransfer,
    SingleDataTransfer,
    BlockDataTransfer,
    Branch,
    BranchLink,
    SoftwareInterrupt,
    SingleDataSwap,
    SingleDataSwapByte,
    Undefined,
}

type DecodeRule = fn(u32) -> Option<ArmFormat>;

const fn when(matches: bool, format: ArmFormat) -> Option<ArmFormat> {
    if matches { Some(format) } else { None }
}

/// Ordered from the most to the least specific encoding.
const DECODE_RULES: [DecodeRule; 10] = [
    |op| {
        let short = op & 0x0FC0_00F0 == 0x0000_0090;
        let long = op & 0x0F80_00F0 == 0x0080_0090;
        when(short || long, ArmFormat::Multiply)
    },
    |op| {
        when(
            op & 0x0E00_0090 == 0x0000_0090 && op & 0x60 != 0,
            ArmFormat::HalfwordSignedTransfer,
        )
    },
    |op| when(op & 0x0FFF_FFF0 == 0x012F_FF10, ArmFormat::BranchExchange),
    |op| {
        let immediate = op & (1 << 25) != 0;
        let bit7 = op & (1 << 7) != 0;
        when(
            op & 0x0D90_0000 == 0x0100_0000 && (immediate || !bit7),
            ArmFormat::PsrTransfer,
        )
    },
    |op| {
        let register_shift_space = op & 0x0200_0090 == 0x0000_0090;
        when(
            op & 0x0C00_0000 == 0 && !register_shift_space,
            ArmFormat::DataProcessingAlu,
        )
    },
    |op| {
        let undefined_space = op & 0x0200_0010 == 0x0200_0010;
        when(
            op & 0x0C00_0000 == 0x0400_0000 && !undefined_space,
            ArmFormat::SingleDataTransfer,
        )
    },
    |op| when(op & 0x0E00_0000 == 0x0800_0000, ArmFormat::BlockDataTransfer),
    |op| match op & 0x0F00_0000 {
        0x0A00_0000 => Some(ArmFormat::Branch),
        0x0B00_0000 => Some(ArmFormat::BranchLink),
        _ => None,
    },
    |op| when(op & 0x0F00_0000 == 0x0F00_0000, ArmFormat::SoftwareInterrupt),
    |op| match op & 0x0FF0_0FF0 {
        0x0100_0090 => Some(ArmFormat::SingleDataSwap),
        0x0140_0090 => Some(ArmFormat::SingleDataSwapByte),
        _ => None,
    },
];

/// Returns the format of `op_code`. Total: every word gets exactly one tag.
#[must_use]
pub fn classify(op_code: u32) -> ArmFormat {
    DECODE_RULES
        .iter()
        .find_map(|rule| rule(op_code))
        .unwrap_or(ArmFormat::Undefined)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PsrKind {
    Cpsr,
    Spsr,
}

impl From<bool> for PsrKind {
    fn from(spsr: bool) -> Self {
        if spsr { Self::Spsr } else { Self::Cpsr }
    }
}

impl std::fmt::Display for PsrKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpsr => f.write_str("CPSR"),
            Self::Spsr => f.write_str("SPSR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MsrOperand {
    Register(usize),
    /// `base` rotated right by `shift` (already doubled).
    Immediate { base: u32, shift: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PsrOpKind {
    Mrs { destination_register: usize },
    /// `field_mask` is bits 19-16: f, s, x, c.
    Msr { field_mask: u32, operand: MsrOperand },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SingleDataTransferOffsetInfo {
    Immediate {
        offset: u32,
    },
    RegisterImmediate {
        shift_amount: u32,
        shift_kind: ShiftKind,
        reg_offset: usize,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum HalfwordDataTransferOffsetKind {
    Immediate { offset: u32 },
    Register { register: usize },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmModeMultiplyVariant {
    Mul,
    Mla,
}

impl From<u32> for ArmModeMultiplyVariant {
    fn from(op_code: u32) -> Self {
        if op_code.get_bit(21) { Self::Mla } else { Self::Mul }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmModeMultiplyLongVariant {
    Umull,
    Umlal,
    Smull,
    Smlal,
}

impl ArmModeMultiplyLongVariant {
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Smull | Self::Smlal)
    }

    #[must_use]
    pub const fn accumulates(self) -> bool {
        matches!(self, Self::Umlal | Self::Smlal)
    }
}

impl From<u32> for ArmModeMultiplyLongVariant {
    fn from(op_code: u32) -> Self {
        match (op_code.get_bit(22), op_code.get_bit(21)) {
            (false, false) => Self::Umull,
            (false, true) => Self::Umlal,
            (true, false) => Self::Smull,
            (true, true) => Self::Smlal,
        }
    }
}

impl std::fmt::Display for ArmModeMultiplyLongVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Umull => f.write_str("UMULL"),
            Self::Umlal => f.write_str("UMLAL"),
            Self::Smull => f.write_str("SMULL"),
            Self::Smlal => f.write_str("SMLAL"),
        }
    }
}

/// All ARM instruction types after decoding.
///
/// | Variant                | Example Instructions | Description                  |
/// |------------------------|----------------------|------------------------------|
/// | `DataProcessing`       | AND, ADD, CMP, MOV   | ALU operations               |
/// | `Multiply`             | MUL, MLA             | 32-bit multiply              |
/// | `MultiplyLong`         | UMULL, SMLAL         | 64-bit multiply              |
/// | `PsrTransfer`          | MRS, MSR             | Status register access       |
/// | `SingleDataSwap`       | SWP, SWPB            | Atomic memory swap           |
/// | `BranchAndExchange`    | BX                   | Branch + possible ARM↔THUMB  |
/// | `HalfwordDataTransfer` | LDRH, STRH, LDRSB    | 16-bit and signed loads      |
/// | `SingleDataTransfer`   | LDR, STR, LDRB       | 32-bit and byte loads/stores |
/// | `BlockDataTransfer`    | LDM, STM             | Multiple register transfer   |
/// | `Branch`               | B, BL                | Branch (and link)            |
/// | `SoftwareInterrupt`    | SWI                  | Supervisor call              |
/// | `Undefined`            | -                    | Undefined instruction trap   |
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum ArmModeInstruction {
    DataProcessing {
        alu_instruction: ArmModeAluInstruction,
        set_conditions: bool,
        rn: usize,
        destination: usize,
        op2: AluSecondOperandInfo,
    },
    Multiply {
        variant: ArmModeMultiplyVariant,
        should_set_codes: bool,
        rd_destination_register: usize,
        rn_accumulate_register: usize,
        rs_operand_register: usize,
        rm_operand_register: usize,
    },
    MultiplyLong {
        variant: ArmModeMultiplyLongVariant,
        should_set_codes: bool,
        rdhi_destination_register: usize,
        rdlo_destination_register: usize,
        rs_operand_register: usize,
        rm_operand_register: usize,
    },
    PsrTransfer {
        psr_kind: PsrKind,
        kind: PsrOpKind,
    },
    SingleDataSwap {
        quantity: ReadWriteKind,
        rn: usize,
        rd: usize,
        rm: usize,
    },
    BranchAndExchange {
        register: usize,
    },
    HalfwordDataTransfer {
        indexing: Indexing,
        offsetting: Offsetting,
        write_back: bool,
        load_store_kind: LoadStoreKind,
        offset_kind: HalfwordDataTransferOffsetKind,
        base_register: usize,
        source_destination_register: usize,
        transfer_kind: HalfwordTransferKind,
    },
    SingleDataTransfer {
        load_store: LoadStoreKind,
        quantity: ReadWriteKind,
        write_back: bool,
        indexing: Indexing,
        rd: usize,
        base_register: usize,
        offset_info: SingleDataTransferOffsetInfo,
        offsetting: Offsetting,
    },
    BlockDataTransfer {
        indexing: Indexing,
        offsetting: Offsetting,
        load_psr: bool,
        write_back: bool,
        load_store: LoadStoreKind,
        rn: usize,
        register_list: u16,
    },
    Branch {
        link: bool,
        /// Byte offset from the instruction address + 8.
        offset: i32,
    },
    SoftwareInterrupt {
        comment: u32,
    },
    Undefined,
}

fn register(op_code: u32, lowest_bit: u8) -> usize {
    op_code.get_bits(lowest_bit..=lowest_bit + 3) as usize
}

impl ArmModeInstruction {
    fn data_processing(op_code: u32) -> Self {
        let op_kind: OperandKind = op_code.get_bit(25).into();

        let op2 = match op_kind {
            OperandKind::Immediate => AluSecondOperandInfo::Immediate {
                base: op_code.get_bits(0..=7),
                shift: op_code.get_bits(8..=11) * 2,
            },
            OperandKind::Register => {
                let shift_op = if op_code.get_bit(4) {
                    ShiftOperator::Register(register(op_code, 8))
                } else {
                    ShiftOperator::Immediate(op_code.get_bits(7..=11))
                };
                AluSecondOperandInfo::Register {
                    shift_op,
                    shift_kind: op_code.get_bits(5..=6).into(),
                    register: register(op_code, 0),
                }
            }
        };

        Self::DataProcessing {
            alu_instruction: op_code.get_bits(21..=24).into(),
            set_conditions: op_code.get_bit(20),
            rn: register(op_code, 16),
            destination: register(op_code, 12),
            op2,
        }
    }

    fn multiply(op_code: u32) -> Self {
        let should_set_codes = op_code.get_bit(20);
        let rs_operand_register = register(op_code, 8);
        let rm_operand_register = register(op_code, 0);

        if op_code.get_bit(23) {
            Self::MultiplyLong {
                variant: op_code.into(),
                should_set_codes,
                rdhi_destination_register: register(op_code, 16),
                rdlo_destination_register: register(op_code, 12),
                rs_operand_register,
                rm_operand_register,
            }
        } else {
            Self::Multiply {
                variant: op_code.into(),
                should_set_codes,
                rd_destination_register: register(op_code, 16),
                rn_accumulate_register: register(op_code, 12),
                rs_operand_register,
                rm_operand_register,
            }
        }
    }

    fn psr_transfer(op_code: u32) -> Self {
        let kind = if op_code.get_bit(21) {
            let operand = if op_code.get_bit(25) {
                MsrOperand::Immediate {
                    base: op_code.get_bits(0..=7),
                    shift: op_code.get_bits(8..=11) * 2,
                }
            } else {
                MsrOperand::Register(register(op_code, 0))
            };
            PsrOpKind::Msr {
                field_mask: op_code.get_bits(16..=19),
                operand,
            }
        } else {
            PsrOpKind::Mrs {
                destination_register: register(op_code, 12),
            }
        };

        Self::PsrTransfer {
            psr_kind: op_code.get_bit(22).into(),
            kind,
        }
    }

    fn half_word_data_transfer(op_code: u32) -> Self {
        let offset_kind = if op_code.get_bit(22) {
            HalfwordDataTransferOffsetKind::Immediate {
                offset: (op_code.get_bits(8..=11) << 4) | op_code.get_bits(0..=3),
            }
        } else {
            HalfwordDataTransferOffsetKind::Register {
                register: register(op_code, 0),
            }
        };

        Self::HalfwordDataTransfer {
            indexing: op_code.get_bit(24).into(),
            offsetting: op_code.get_bit(23).into(),
            write_back: op_code.get_bit(21),
            load_store_kind: op_code.get_bit(20).into(),
            offset_kind,
            base_register: register(op_code, 16),
            source_destination_register: register(op_code, 12),
            transfer_kind: op_code.get_bits(5..=6).into(),
        }
    }

    fn single_data_transfer(op_code: u32) -> Self {
        // The I bit has the opposite meaning of the data processing one.
        let op_kind: OperandKind = (!op_code.get_bit(25)).into();

        let offset_info = match op_kind {
            OperandKind::Immediate => SingleDataTransferOffsetInfo::Immediate {
                offset: op_code.get_bits(0..=11),
            },
            OperandKind::Register => SingleDataTransferOffsetInfo::RegisterImmediate {
                shift_amount: op_code.get_bits(7..=11),
                shift_kind: op_code.get_bits(5..=6).into(),
                reg_offset: register(op_code, 0),
            },
        };

        Self::SingleDataTransfer {
            load_store: op_code.get_bit(20).into(),
            quantity: op_code.get_bit(22).into(),
            write_back: op_code.get_bit(21),
            indexing: op_code.get_bit(24).into(),
            rd: register(op_code, 12),
            base_register: register(op_code, 16),
            offset_info,
            offsetting: op_code.get_bit(23).into(),
        }
    }

    fn block_data_transfer(op_code: u32) -> Self {
        Self::BlockDataTransfer {
            indexing: op_code.get_bit(24).into(),
            offsetting: op_code.get_bit(23).into(),
            load_psr: op_code.get_bit(22),
            write_back: op_code.get_bit(21),
            load_store: op_code.get_bit(20).into(),
            rn: register(op_code, 16),
            register_list: op_code.get_bits(0..=15) as u16,
        }
    }

    fn single_data_swap(op_code: u32, quantity: ReadWriteKind) -> Self {
        Self::SingleDataSwap {
            quantity,
            rn: register(op_code, 16),
            rd: register(op_code, 12),
            rm: register(op_code, 0),
        }
    }

    /// Format tag this instruction was decoded from.
    #[must_use]
    pub const fn format(&self) -> ArmFormat {
        match self {
            Self::DataProcessing { .. } => ArmFormat::DataProcessingAlu,
            Self::Multiply { .. } | Self::MultiplyLong { .. } => ArmFormat::Multiply,
            Self::PsrTransfer { .. } => ArmFormat::PsrTransfer,
            Self::SingleDataSwap {
                quantity: ReadWriteKind::Word,
                ..
            } => ArmFormat::SingleDataSwap,
            Self::SingleDataSwap {
                quantity: ReadWriteKind::Byte,
                ..
            } => ArmFormat::SingleDataSwapByte,
            Self::BranchAndExchange { .. } => ArmFormat::BranchExchange,
            Self::HalfwordDataTransfer { .. } => ArmFormat::HalfwordSignedTransfer,
            Self::SingleDataTransfer { .. } => ArmFormat::SingleDataTransfer,
            Self::BlockDataTransfer { .. } => ArmFormat::BlockDataTransfer,
            Self::Branch { link: false, .. } => ArmFormat::Branch,
            Self::Branch { link: true, .. } => ArmFormat::BranchLink,
            Self::SoftwareInterrupt { .. } => ArmFormat::SoftwareInterrupt,
            Self::Undefined => ArmFormat::Undefined,
        }
    }
}

impl From<u32> for ArmModeInstruction {
    fn from(op_code: u32) -> Self {
        match classify(op_code) {
            ArmFormat::DataProcessingAlu => Self::data_processing(op_code),
            ArmFormat::Multiply => Self::multiply(op_code),
            ArmFormat::HalfwordSignedTransfer => Self::half_word_data_transfer(op_code),
            ArmFormat::BranchExchange => Self::BranchAndExchange {
                register: register(op_code, 0),
            },
            ArmFormat::PsrTransfer => Self::psr_transfer(op_code),
            ArmFormat::SingleDataTransfer => Self::single_data_transfer(op_code),
            ArmFormat::BlockDataTransfer => Self::block_data_transfer(op_code),
            ArmFormat::Branch | ArmFormat::BranchLink => Self::Branch {
                link: op_code.get_bit(24),
                offset: (op_code.get_bits(0..=23) << 2).sign_extended(26) as i32,
            },
            ArmFormat::SoftwareInterrupt => Self::SoftwareInterrupt {
                comment: op_code.get_bits(0..=23),
            },
            ArmFormat::SingleDataSwap => Self::single_data_swap(op_code, ReadWriteKind::Word),
            ArmFormat::SingleDataSwapByte => Self::single_data_swap(op_code, ReadWriteKind::Byte),
            ArmFormat::Undefined => {
                debug!("undefined instruction decode: opcode=0x{op_code:08X}");
                Self::Undefined
            }
        }
    }
}

#[cfg(feature = "disassembler")]
impl ArmModeInstruction {
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn disassembler(&self, condition: Condition) -> String {
        let sign = |offsetting: &Offsetting| match offsetting {
            Offsetting::Up => "",
            Offsetting::Down => "-",
        };
        let load_store_name = |kind: &LoadStoreKind| match kind {
            LoadStoreKind::Load => "LDR",
            LoadStoreKind::Store => "STR",
        };

        match self {
            Self::DataProcessing {
                alu_instruction,
                set_conditions,
                rn,
                destination,
                op2,
            } => {
                let set_string = if *set_conditions { "S" } else { "" };
                if alu_instruction.is_comparison() {
                    format!("{alu_instruction}{condition} R{rn}, {op2}")
                } else if matches!(alu_instruction, ArmModeAluInstruction::Mov | ArmModeAluInstruction::Mvn) {
                    format!("{alu_instruction}{condition}{set_string} R{destination}, {op2}")
                } else {
                    format!("{alu_instruction}{condition}{set_string} R{destination}, R{rn}, {op2}")
                }
            }
            Self::Multiply {
                variant,
                should_set_codes,
                rd_destination_register,
                rn_accumulate_register,
                rs_operand_register,
                rm_operand_register,
            } => {
                let s = if *should_set_codes { "S" } else { "" };
                match variant {
                    ArmModeMultiplyVariant::Mul => format!(
                        "MUL{condition}{s} R{rd_destination_register}, R{rm_operand_register}, R{rs_operand_register}"
                    ),
                    ArmModeMultiplyVariant::Mla => format!(
                        "MLA{condition}{s} R{rd_destination_register}, R{rm_operand_register}, R{rs_operand_register}, R{rn_accumulate_register}"
                    ),
                }
            }
            Self::MultiplyLong {
                variant,
                should_set_codes,
                rdhi_destination_register,
                rdlo_destination_register,
                rs_operand_register,
                rm_operand_register,
            } => {
                let s = if *should_set_codes { "S" } else { "" };
                format!(
                    "{variant}{condition}{s} R{rdlo_destination_register}, R{rdhi_destination_register}, R{rm_operand_register}, R{rs_operand_register}"
                )
            }
            Self::PsrTransfer { psr_kind, kind } => match kind {
                PsrOpKind::Mrs {
                    destination_register,
                } => format!("MRS{condition} R{destination_register}, {psr_kind}"),
                PsrOpKind::Msr { field_mask, operand } => {
                    let fields: String = [(3, 'f'), (2, 's'), (1, 'x'), (0, 'c')]
                        .into_iter()
                        .filter(|(bit, _)| field_mask.get_bit(*bit))
                        .map(|(_, name)| name)
                        .collect();
                    match operand {
                        MsrOperand::Register(rm) => format!("MSR{condition} {psr_kind}_{fields}, R{rm}"),
                        MsrOperand::Immediate { base, shift } => format!(
                            "MSR{condition} {psr_kind}_{fields}, #0x{:X}",
                            base.rotate_right(*shift)
                        ),
                    }
                }
            },
            Self::SingleDataSwap { quantity, rn, rd, rm } => {
                let b = if *quantity == ReadWriteKind::Byte { "B" } else { "" };
                format!("SWP{condition}{b} R{rd}, R{rm}, [R{rn}]")
            }
            Self::BranchAndExchange { register } => format!("BX{condition} R{register}"),
            Self::HalfwordDataTransfer {
                indexing,
                offsetting,
                write_back,
                load_store_kind,
                offset_kind,
                base_register,
                source_destination_register,
                transfer_kind,
            } => {
                let sign = sign(offsetting);
                let offset = match offset_kind {
                    HalfwordDataTransferOffsetKind::Immediate { offset: 0 } => String::new(),
                    HalfwordDataTransferOffsetKind::Immediate { offset } => format!(", #{sign}{offset}"),
                    HalfwordDataTransferOffsetKind::Register { register } => format!(", {sign}R{register}"),
                };
                let w = if *write_back { "!" } else { "" };
                let address = match indexing {
                    Indexing::Pre => format!("[R{base_register}{offset}]{w}"),
                    Indexing::Post => format!("[R{base_register}]{offset}"),
                };
                let suffix = match transfer_kind {
                    HalfwordTransferKind::UnsignedHalfwords => "H",
                    HalfwordTransferKind::SignedByte => "SB",
                    HalfwordTransferKind::SignedHalfwords => "SH",
                    HalfwordTransferKind::Reserved => "?",
                };
                let op = load_store_name(load_store_kind);
                format!("{op}{condition}{suffix} R{source_destination_register}, {address}")
            }
            Self::SingleDataTransfer {
                load_store,
                quantity,
                write_back,
                indexing,
                rd,
                base_register,
                offset_info,
                offsetting,
            } => {
                let sign = sign(offsetting);
                let b = if *quantity == ReadWriteKind::Byte { "B" } else { "" };
                let offset = match offset_info {
                    SingleDataTransferOffsetInfo::Immediate { offset: 0 } => String::new(),
                    SingleDataTransferOffsetInfo::Immediate { offset } => format!(", #{sign}{offset}"),
                    SingleDataTransferOffsetInfo::RegisterImmediate {
                        shift_amount,
                        shift_kind,
                        reg_offset,
                    } => format!(
                        ", {sign}{}",
                        AluSecondOperandInfo::Register {
                            shift_op: ShiftOperator::Immediate(*shift_amount),
                            shift_kind: *shift_kind,
                            register: *reg_offset,
                        }
                    ),
                };
                let w = if *write_back { "!" } else { "" };
                let address = match indexing {
                    Indexing::Pre => format!("[R{base_register}{offset}]{w}"),
                    Indexing::Post => format!("[R{base_register}]{offset}"),
                };
                let op = load_store_name(load_store);
                format!("{op}{condition}{b} R{rd}, {address}")
            }
            Self::BlockDataTransfer {
                indexing,
                offsetting,
                load_psr,
                write_back,
                load_store,
                rn,
                register_list,
            } => {
                let op = match load_store {
                    LoadStoreKind::Store => "STM",
                    LoadStoreKind::Load => "LDM",
                };
                let offset_modifier = match offsetting {
                    Offsetting::Down => "D",
                    Offsetting::Up => "I",
                };
                let index_type = match indexing {
                    Indexing::Pre => "B",
                    Indexing::Post => "A",
                };
                let registers = (0..=15)
                    .filter(|i| register_list.get_bit(*i))
                    .map(|i| format!("R{i}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let w = if *write_back { "!" } else { "" };
                let f = if *load_psr { "^" } else { "" };
                format!("{op}{condition}{offset_modifier}{index_type} R{rn}{w}, {{{registers}}}{f}")
            }
            Self::Branch { link, offset } => {
                let link = if *link { "L" } else { "" };
                format!("B{link}{condition} 0x{offset:08X}")
            }
            Self::SoftwareInterrupt { comment } => format!("SWI{condition} 0x{comment:06X}"),
            Self::Undefined => format!("UND{condition}"),
        }
    }
}
