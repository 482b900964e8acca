use tracing::warn;

use crate::bitwise::Bits;
use crate::bus::Bus;

/// Flat little-endian RAM starting at address 0.
///
/// No peripherals and no wait states. Accesses outside the buffer behave as
/// open bus: reads return 0 and writes are dropped.
///
/// Unaligned accesses follow the ARM7 convention: writes are forced to the
/// natural alignment, reads fetch the aligned value and rotate it so the
/// addressed byte ends up in the low byte.
#[derive(Debug, Clone, Default)]
pub struct FlatMemory {
    data: Vec<u8>,
}

impl FlatMemory {
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    /// Creates a memory of `size` bytes with `image` copied at address 0.
    #[must_use]
    pub fn with_image(size: usize, image: &[u8]) -> Self {
        let mut memory = Self::new(size.max(image.len()));
        memory.data[..image.len()].copy_from_slice(image);
        memory
    }

    /// Writes a sequence of ARM op codes starting at `address`.
    pub fn load_words(&mut self, address: u32, words: &[u32]) {
        for (i, word) in words.iter().enumerate() {
            self.write_word(address.wrapping_add(i as u32 * 4), *word);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn read_raw(&self, address: u32) -> u8 {
        self.data.get(address as usize).copied().unwrap_or_else(|| {
            warn!("read from unmapped address 0x{address:08X}");
            0
        })
    }

    fn write_raw(&mut self, address: u32, value: u8) {
        match self.data.get_mut(address as usize) {
            Some(byte) => *byte = value,
            None => warn!("write of 0x{value:02X} to unmapped address 0x{address:08X}"),
        }
    }
}

impl Bus for FlatMemory {
    fn read_byte(&mut self, address: u32) -> u8 {
        self.read_raw(address)
    }

    fn read_half_word(&mut self, address: u32) -> u16 {
        let aligned = address & !1;
        let value = u16::from_le_bytes([
            self.read_raw(aligned),
            self.read_raw(aligned.wrapping_add(1)),
        ]);

        value.rotate_right((address & 1) * 8)
    }

    fn read_word(&mut self, address: u32) -> u32 {
        let aligned = address & !3;
        let value = u32::from_le_bytes([
            self.read_raw(aligned),
            self.read_raw(aligned.wrapping_add(1)),
            self.read_raw(aligned.wrapping_add(2)),
            self.read_raw(aligned.wrapping_add(3)),
        ]);

        value.rotate_right((address & 3) * 8)
    }

    fn write_byte(&mut self, address: u32, value: u8) {
        self.write_raw(address, value);
    }

    fn write_half_word(&mut self, address: u32, value: u16) {
        let aligned = address & !1;
        self.write_raw(aligned, value as u8);
        self.write_raw(aligned.wrapping_add(1), (value >> 8) as u8);
    }

    fn write_word(&mut self, address: u32, value: u32) {
        let aligned = address & !3;
        for byte_nth in 0..4 {
            self.write_raw(
                aligned.wrapping_add(u32::from(byte_nth)),
                value.get_bits(byte_nth * 8..=byte_nth * 8 + 7) as u8,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn little_endian_word() {
        let mut memory = FlatMemory::new(0x10);
        memory.write_word(0x4, 0x1234_5678);
        assert_eq!(memory.read_byte(0x4), 0x78);
        assert_eq!(memory.read_byte(0x7), 0x12);
        assert_eq!(memory.read_half_word(0x6), 0x1234);
        assert_eq!(memory.read_word(0x4), 0x1234_5678);
    }

    #[test]
    fn unaligned_reads_rotate() {
        let mut memory = FlatMemory::new(0x10);
        memory.write_word(0x0, 0x1122_3344);
        assert_eq!(memory.read_word(0x1), 0x4411_2233);
        assert_eq!(memory.read_word(0x2), 0x3344_1122);
        assert_eq!(memory.read_half_word(0x1), 0x4433);
    }

    #[test]
    fn unaligned_writes_are_forced_aligned() {
        let mut memory = FlatMemory::new(0x10);
        memory.write_word(0x6, 0xCAFE_BABE);
        assert_eq!(memory.read_word(0x4), 0xCAFE_BABE);
        memory.write_half_word(0x9, 0xBEEF);
        assert_eq!(memory.read_half_word(0x8), 0xBEEF);
    }

    #[test]
    fn open_bus() {
        let mut memory = FlatMemory::new(4);
        memory.write_word(0x100, 0xFFFF_FFFF);
        assert_eq!(memory.read_word(0x100), 0);
        assert_eq!(memory.read_word(0), 0);
    }

    #[test]
    fn with_image() {
        let mut memory = FlatMemory::with_image(0x8, &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(memory.len(), 8);
        assert_eq!(memory.read_word(0), 0x0403_0201);
        memory.load_words(4, &[0xE1A0_0000]);
        assert_eq!(memory.read_word(4), 0xE1A0_0000);
    }
}
