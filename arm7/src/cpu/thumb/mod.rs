//! # THUMB Instruction Set (16-bit)
//!
//! Only the mode switch contract is executed in THUMB state: `BX` to leave
//! (or stay in) THUMB and `SWI` to reach the supervisor. Any other halfword
//! enters the Undefined Instruction handler, which can emulate it.
//!
//! R15 reads as the instruction address + 4.

#[allow(clippy::cast_possible_truncation)]
pub mod instruction;

#[allow(clippy::cast_possible_truncation)]
pub mod operations;
