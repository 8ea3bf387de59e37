//! Decoding of the 11-bit ASTC block mode field.
//!
//! The block mode selects the weight grid dimensions, the dual-plane flag and
//! the weight quantization level through a branching micro-format. The bit
//! layout here is normative: a decoder that disagrees with it misreads every
//! block in a conformant bitstream.

use crate::integer_sequence::ise_sequence_bitcount;
use crate::{MAX_WEIGHTS_PER_BLOCK, MAX_WEIGHT_BITS_PER_BLOCK, MIN_WEIGHT_BITS_PER_BLOCK};

/// Properties encoded by a valid 2D block mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DecodedMode2d {
    /// Number of weights in the X dimension.
    pub x_weights: u32,
    /// Number of weights in the Y dimension.
    pub y_weights: u32,
    /// True if the mode stores two weight planes.
    pub is_dual_plane: bool,
    /// Weight quantization level, in `0..=11`.
    pub quant_mode: u8,
}

/// Properties encoded by a valid 3D block mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DecodedMode3d {
    /// Number of weights in the X dimension.
    pub x_weights: u32,
    /// Number of weights in the Y dimension.
    pub y_weights: u32,
    /// Number of weights in the Z dimension.
    pub z_weights: u32,
    /// True if the mode stores two weight planes.
    pub is_dual_plane: bool,
    /// Weight quantization level, in `0..=11`.
    pub quant_mode: u8,
}

/// Decodes `block_mode` as a 2D block mode.
///
/// Returns `None` for the reserved encodings and for modes whose weights do
/// not fit the ISE bit budget of a block.
pub fn decode_block_mode_2d(block_mode: u16) -> Option<DecodedMode2d> {
    let m = u32::from(block_mode);

    let mut base_quant_mode = (m >> 4) & 1;
    let mut h = (m >> 9) & 1;
    let mut d = (m >> 10) & 1;
    let a = (m >> 5) & 0x3;

    let x_weights;
    let y_weights;

    if (m & 3) != 0 {
        base_quant_mode |= (m & 3) << 1;
        let mut b = (m >> 7) & 3;
        match (m >> 2) & 3 {
            0 => {
                x_weights = b + 4;
                y_weights = a + 2;
            }
            1 => {
                x_weights = b + 8;
                y_weights = a + 2;
            }
            2 => {
                x_weights = a + 2;
                y_weights = b + 8;
            }
            _ => {
                b &= 1;
                if (m & 0x100) != 0 {
                    x_weights = b + 2;
                    y_weights = a + 2;
                } else {
                    x_weights = a + 2;
                    y_weights = b + 6;
                }
            }
        }
    } else {
        base_quant_mode |= ((m >> 2) & 3) << 1;
        if (m >> 2) & 3 == 0 {
            return None;
        }

        let b = (m >> 9) & 3;
        match (m >> 7) & 3 {
            0 => {
                x_weights = 12;
                y_weights = a + 2;
            }
            1 => {
                x_weights = a + 2;
                y_weights = 12;
            }
            2 => {
                x_weights = a + 6;
                y_weights = b + 6;
                d = 0;
                h = 0;
            }
            _ => match (m >> 5) & 3 {
                0 => {
                    x_weights = 6;
                    y_weights = 10;
                }
                1 => {
                    x_weights = 10;
                    y_weights = 6;
                }
                _ => return None,
            },
        }
    }

    let weight_count = x_weights * y_weights * (d + 1);
    let quant_mode = (base_quant_mode - 2 + 6 * h) as u8;
    let weight_bits = ise_sequence_bitcount(weight_count, quant_mode);

    let valid = weight_count <= MAX_WEIGHTS_PER_BLOCK as u32
        && weight_bits >= MIN_WEIGHT_BITS_PER_BLOCK
        && weight_bits <= MAX_WEIGHT_BITS_PER_BLOCK;

    valid.then_some(DecodedMode2d {
        x_weights,
        y_weights,
        is_dual_plane: d != 0,
        quant_mode,
    })
}

/// Decodes `block_mode` as a 3D block mode.
///
/// Returns `None` for the reserved encodings and for modes whose weights do
/// not fit the ISE bit budget of a block.
pub fn decode_block_mode_3d(block_mode: u16) -> Option<DecodedMode3d> {
    let m = u32::from(block_mode);

    let mut base_quant_mode = (m >> 4) & 1;
    let mut h = (m >> 9) & 1;
    let mut d = (m >> 10) & 1;
    let a = (m >> 5) & 0x3;

    let mut x_weights;
    let mut y_weights;
    let mut z_weights;

    if (m & 3) != 0 {
        base_quant_mode |= (m & 3) << 1;
        let b = (m >> 7) & 3;
        let c = (m >> 2) & 0x3;
        x_weights = a + 2;
        y_weights = b + 2;
        z_weights = c + 2;
    } else {
        base_quant_mode |= ((m >> 2) & 3) << 1;
        if (m >> 2) & 3 == 0 {
            return None;
        }

        let b = (m >> 9) & 3;
        if (m >> 7) & 3 != 3 {
            d = 0;
            h = 0;
        }
        match (m >> 7) & 3 {
            0 => {
                x_weights = 6;
                y_weights = b + 2;
                z_weights = a + 2;
            }
            1 => {
                x_weights = a + 2;
                y_weights = 6;
                z_weights = b + 2;
            }
            2 => {
                x_weights = a + 2;
                y_weights = b + 2;
                z_weights = 6;
            }
            _ => {
                x_weights = 2;
                y_weights = 2;
                z_weights = 2;
                match (m >> 5) & 3 {
                    0 => x_weights = 6,
                    1 => y_weights = 6,
                    2 => z_weights = 6,
                    _ => return None,
                }
            }
        }
    }

    let weight_count = x_weights * y_weights * z_weights * (d + 1);
    let quant_mode = (base_quant_mode - 2 + 6 * h) as u8;
    let weight_bits = ise_sequence_bitcount(weight_count, quant_mode);

    let valid = weight_count <= MAX_WEIGHTS_PER_BLOCK as u32
        && weight_bits >= MIN_WEIGHT_BITS_PER_BLOCK
        && weight_bits <= MAX_WEIGHT_BITS_PER_BLOCK;

    valid.then_some(DecodedMode3d {
        x_weights,
        y_weights,
        z_weights,
        is_dual_plane: d != 0,
        quant_mode,
    })
}
