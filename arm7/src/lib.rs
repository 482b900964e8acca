//! # ARM7TDMI core
//!
//! Emulation of the ARM7TDMI found in the Nintendo DS: register banking,
//! conditional execution, the ARM instruction set and exception entry.
//!
//! The core only talks to the outside world through the [`bus::Bus`] trait.
//! A host drives it by calling [`cpu::arm7tdmi::Arm7tdmi::step`] and signals
//! interrupts or bus faults with
//! [`cpu::arm7tdmi::Arm7tdmi::raise_exception`].

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
pub mod bitwise;

pub mod bus;
pub mod cpu;
pub mod error;

#[allow(clippy::cast_possible_truncation)]
pub mod memory;
