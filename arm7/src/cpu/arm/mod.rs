//! # ARM Instruction Set (32-bit)
//!
//! Every instruction carries a condition and runs only when the CPSR flags
//! satisfy it.
//!
//! ## Format
//!
//! ```text
//! 31-28   27-25   24-0
//! [Cond] [Format] [Instruction-specific]
//! ```
//!
//! - **Condition (bits 28-31)**: See [`condition`](super::condition)
//! - **Format (bits 25-27)**: Narrowed down by [`instructions::classify`]
//!
//! ## Instruction Categories
//!
//! | Bits 27-25 | Category              | Examples                    |
//! |------------|-----------------------|-----------------------------|
//! | 00x        | Data Processing / PSR | AND, ADD, CMP, MOV, MRS     |
//! | 000        | Multiply/Swap/BX/LDRH | MUL, UMULL, SWP, BX, LDRSB  |
//! | 01x        | Single Data Transfer  | LDR, STR                    |
//! | 100        | Block Data Transfer   | LDM, STM                    |
//! | 101        | Branch                | B, BL                       |
//! | 1111       | Software Interrupt    | SWI                         |
//!
//! Coprocessor encodings are decoded as undefined, there is no coprocessor
//! attached to this core.
//!
//! ## Barrel Shifter
//!
//! Operand2 can be shifted at no extra cost: LSL, LSR, ASR, ROR, RRX.
//!
//! ## Submodules
//!
//! - [`instructions`] - Decoding (`From<u32>`)
//! - [`operations`] - Execution
//! - [`alu_instruction`] - ALU ops and barrel shifter
//! - [`mode`] - Fetched op code with its condition

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
#[allow(clippy::cast_lossless)]
pub mod alu_instruction;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::similar_names)]
pub mod instructions;

pub mod mode;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
#[allow(clippy::cast_lossless)]
#[allow(clippy::similar_names)]
#[allow(clippy::too_many_arguments)]
pub mod operations;
