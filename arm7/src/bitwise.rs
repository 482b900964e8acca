use std::ops::RangeInclusive;

/// Helper methods to inspect and manipulate bits of the unsigned integers
/// used all over the core. Bit indexes go from lsb to msb (right to left).
pub trait Bits: Copy {
    fn get_bit(self, bit_idx: u8) -> bool;

    fn set_bit(&mut self, bit_idx: u8, value: bool);

    /// Returns the bits in `bits_range` (inclusive) moved down to bit 0.
    fn get_bits(self, bits_range: RangeInclusive<u8>) -> Self;

    /// Returns a sign-extended copy of the value.
    /// `number_of_bits` is the width of the two's complement number
    /// stored in the low bits of the value.
    fn sign_extended(self, number_of_bits: u8) -> Self;
}

macro_rules! impl_bits {
    ($($unsigned:ty => $signed:ty),* $(,)?) => {
        $(
            impl Bits for $unsigned {
                fn get_bit(self, bit_idx: u8) -> bool {
                    debug_assert!(u32::from(bit_idx) < <$unsigned>::BITS);
                    (self >> bit_idx) & 1 == 1
                }

                fn set_bit(&mut self, bit_idx: u8, value: bool) {
                    debug_assert!(u32::from(bit_idx) < <$unsigned>::BITS);
                    let mask: $unsigned = 1 << bit_idx;
                    if value {
                        *self |= mask;
                    } else {
                        *self &= !mask;
                    }
                }

                fn get_bits(self, bits_range: RangeInclusive<u8>) -> Self {
                    let start = *bits_range.start();
                    let length = u32::from(*bits_range.end() - start) + 1;
                    let value = self >> start;

                    if length >= <$unsigned>::BITS {
                        value
                    } else {
                        value & ((1 << length) - 1)
                    }
                }

                fn sign_extended(self, number_of_bits: u8) -> Self {
                    debug_assert!(number_of_bits > 0);
                    let unused = <$unsigned>::BITS - u32::from(number_of_bits);

                    // Moving the sign bit to the msb and back with an arithmetic
                    // shift replicates it over the unused high bits.
                    (((self << unused) as $signed) >> unused) as $unsigned
                }
            }
        )*
    };
}

impl_bits!(u8 => i8, u16 => i16, u32 => i32, u64 => i64);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::Rng;

    #[test]
    fn get_bit() {
        let b = 0b10_1100_1110_u32;
        assert!(b.get_bit(1));
        assert!(!b.get_bit(0));
        assert!(b.get_bit(2));
        assert!(!b.get_bit(31));
    }

    #[test]
    fn set_bit() {
        let mut b = 0b110_0110_u32;
        b.set_bit(0, true);
        b.set_bit(1, true);
        b.set_bit(2, false);
        b.set_bit(3, false);
        assert_eq!(b, 0b110_0011);
    }

    #[test]
    fn get_bits() {
        let op_code = 0xE12F_FF11_u32;
        assert_eq!(op_code.get_bits(28..=31), 0xE);
        assert_eq!(op_code.get_bits(4..=27), 0x12_FFF1);
        assert_eq!(op_code.get_bits(0..=3), 1);
        assert_eq!(op_code.get_bits(0..=31), op_code);

        let half = 0xDF12_u16;
        assert_eq!(half.get_bits(8..=15), 0xDF);
    }

    #[test]
    fn sign_extended() {
        assert_eq!(0b1001_u32.sign_extended(4), 0xFFFF_FFF9);
        assert_eq!(0b0111_u32.sign_extended(4), 7);
        assert_eq!(0x80_u8.sign_extended(8), 0x80);
        assert_eq!(0x80_u32.sign_extended(8), 0xFFFF_FF80);
        assert_eq!(0x8000_u32.sign_extended(16), 0xFFFF_8000);
        assert_eq!((0x00FF_FFFF_u32 << 2).sign_extended(26), 0xFFFF_FFFC);
    }

    #[test]
    fn set_then_get_random_bits() {
        let mut rng = rand::thread_rng();
        for _ in 0..64 {
            let mut value: u32 = rng.r#gen();
            let bit_idx = rng.gen_range(0..32);
            let bit: bool = rng.r#gen();

            value.set_bit(bit_idx, bit);
            assert_eq!(value.get_bit(bit_idx), bit);
        }
    }
}
