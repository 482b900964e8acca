//! # Bus contract
//!
//! The core never decodes addresses itself. Every memory access made by an
//! instruction is forwarded unchanged to a [`Bus`] implementation, which owns
//! address decoding, peripherals, wait states and the handling of unaligned
//! accesses.

use crate::error::CpuError;

/// Width of a single bus access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferSize {
    Byte = 1,
    HalfWord = 2,
    Word = 4,
}

impl TryFrom<usize> for TransferSize {
    type Error = CpuError;

    fn try_from(size: usize) -> Result<Self, Self::Error> {
        match size {
            1 => Ok(Self::Byte),
            2 => Ok(Self::HalfWord),
            4 => Ok(Self::Word),
            _ => Err(CpuError::InvalidTransferSize(size)),
        }
    }
}

/// Memory interface consumed by the CPU.
///
/// Reads take `&mut self` because reading an I/O register can have side
/// effects (acknowledging a FIFO, clearing a status bit).
pub trait Bus {
    fn read_byte(&mut self, address: u32) -> u8;

    fn read_half_word(&mut self, address: u32) -> u16;

    fn read_word(&mut self, address: u32) -> u32;

    fn write_byte(&mut self, address: u32, value: u8);

    fn write_half_word(&mut self, address: u32, value: u16);

    fn write_word(&mut self, address: u32, value: u32);

    /// Sized read, the value is zero-extended to 32 bits.
    fn read(&mut self, address: u32, size: TransferSize) -> u32 {
        match size {
            TransferSize::Byte => self.read_byte(address).into(),
            TransferSize::HalfWord => self.read_half_word(address).into(),
            TransferSize::Word => self.read_word(address),
        }
    }

    /// Sized write, only the low `size` bytes of `value` are used.
    #[allow(clippy::cast_possible_truncation)]
    fn write(&mut self, address: u32, size: TransferSize, value: u32) {
        match size {
            TransferSize::Byte => self.write_byte(address, value as u8),
            TransferSize::HalfWord => self.write_half_word(address, value as u16),
            TransferSize::Word => self.write_word(address, value),
        }
    }
}
