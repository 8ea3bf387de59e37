//! Bit cost of ASTC integer sequence encoding.
//!
//! ASTC packs sequences of quantized integers with a mixed radix scheme:
//! depending on the quantization level each value is stored as plain bits,
//! or as plain bits plus a share of a base-3 ("trit") or base-5 ("quint")
//! group. Five trits pack into 8 bits and three quints into 7 bits, with
//! partial groups at the end of a sequence truncated to the bits they need.

// Plain bits, trit flag and quint flag for quantization levels 0..=11
// (ranges 2, 3, 4, 5, 6, 8, 10, 12, 16, 20, 24 and 32).
const BITS: [u32; 12] = [1, 0, 2, 0, 1, 3, 0, 2, 4, 0, 3, 5];
const TRITS: [u32; 12] = [0, 1, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0];
const QUINTS: [u32; 12] = [0, 0, 0, 1, 0, 0, 1, 0, 0, 1, 0, 0];

/// Returns the number of bits needed to encode `count` values at
/// quantization level `quant_mode`.
///
/// # Panics
///
/// Panics if `quant_mode` is not in `0..=11`.
pub fn ise_sequence_bitcount(count: u32, quant_mode: u8) -> u32 {
    let q = usize::from(quant_mode);
    count * BITS[q] + TRITS[q] * ((8 * count + 4) / 5) + QUINTS[q] * ((7 * count + 2) / 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_bit_levels() {
        assert_eq!(ise_sequence_bitcount(1, 0), 1);
        assert_eq!(ise_sequence_bitcount(12, 2), 24);
        assert_eq!(ise_sequence_bitcount(16, 5), 48);
        assert_eq!(ise_sequence_bitcount(13, 8), 52);
        assert_eq!(ise_sequence_bitcount(16, 11), 80);
        assert_eq!(ise_sequence_bitcount(32, 5), 96);
    }

    #[test]
    fn trit_levels() {
        // Full trit blocks cost 8 bits per 5 values, partial blocks truncate
        assert_eq!(ise_sequence_bitcount(5, 1), 8);
        assert_eq!(ise_sequence_bitcount(1, 1), 2);
        assert_eq!(ise_sequence_bitcount(24, 4), 63);
        assert_eq!(ise_sequence_bitcount(7, 7), 26);
        assert_eq!(ise_sequence_bitcount(20, 10), 92);
    }

    #[test]
    fn quint_levels() {
        assert_eq!(ise_sequence_bitcount(3, 3), 7);
        assert_eq!(ise_sequence_bitcount(4, 3), 10);
        assert_eq!(ise_sequence_bitcount(10, 6), 34);
        assert_eq!(ise_sequence_bitcount(11, 9), 48);
    }
}
