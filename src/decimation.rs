//! Decimation tables mapping between the stored weight grid and the texel
//! grid of a block.
//!
//! A block mode usually stores fewer weights than the block has texels. The
//! decimation table precomputes, in both directions, how the coarse grid
//! spreads into per-texel weights: 2D grids use truncated fixed-point
//! bilinear interpolation, 3D grids interpolate over a simplex inside each
//! grid cell. Every array is stored transposed (slot-major) and padded so
//! that vectorized consumers can over-read full SIMD registers past the live
//! lanes: counts and blend weights pad with zeros, index arrays pad by
//! repeating a valid in-block index.

use bytemuck::Zeroable;

use crate::{
    round_up_to_simd_multiple, MAX_TEXELS_PER_BLOCK, MAX_WEIGHTS_PER_BLOCK, TEXEL_WEIGHT_SUM,
};

/// Precomputed weight-grid/texel-grid correspondence for one grid shape.
///
/// Allocated over-aligned so that aligned vector loads can be used on the
/// float arrays.
#[derive(Zeroable)]
#[repr(C, align(32))]
pub struct DecimationTable {
    /// Number of texels in the block.
    pub texel_count: u32,
    /// Number of weights in the grid.
    pub weight_count: u32,
    /// Weight grid X dimension.
    pub weight_x: u32,
    /// Weight grid Y dimension.
    pub weight_y: u32,
    /// Weight grid Z dimension (1 for 2D grids).
    pub weight_z: u32,

    /// Number of grid weights contributing to each texel, in `1..=4`.
    pub texel_weight_count: [u8; MAX_TEXELS_PER_BLOCK],
    /// Grid indices of the contributors of each texel, slot-major.
    pub texel_weights_4t: [[u8; MAX_TEXELS_PER_BLOCK]; 4],
    /// Integer blend weight of each contributor; the live slots of a texel
    /// sum to [`TEXEL_WEIGHT_SUM`].
    pub texel_weights_int_4t: [[u8; MAX_TEXELS_PER_BLOCK]; 4],
    /// Blend weights as floats, scaled to sum to 1.0.
    pub texel_weights_float_4t: [[f32; MAX_TEXELS_PER_BLOCK]; 4],

    /// Number of texels each grid weight contributes to.
    pub weight_texel_count: [u8; MAX_WEIGHTS_PER_BLOCK],
    /// Texel indices reached by each grid weight, slot-major.
    pub weight_texel: [[u8; MAX_WEIGHTS_PER_BLOCK]; MAX_TEXELS_PER_BLOCK],
    /// Blend weight applied to each of those texels.
    pub weights_flt: [[f32; MAX_WEIGHTS_PER_BLOCK]; MAX_TEXELS_PER_BLOCK],

    /// For weight `i` and each of its texels, the full four-contributor grid
    /// index list of that texel, rotated so that slot 0 is `i` itself.
    pub texel_weights_texel: [[[u8; 4]; MAX_TEXELS_PER_BLOCK]; MAX_WEIGHTS_PER_BLOCK],
    /// Float blend weights matching `texel_weights_texel`.
    pub texel_weights_float_texel: [[[f32; 4]; MAX_TEXELS_PER_BLOCK]; MAX_WEIGHTS_PER_BLOCK],
}

/// Per-texel and per-weight incidence lists gathered while walking the block.
#[derive(Zeroable)]
struct Accumulator {
    weight_count_of_texel: [u8; MAX_TEXELS_PER_BLOCK],
    grid_weights_of_texel: [[u8; 4]; MAX_TEXELS_PER_BLOCK],
    weights_of_texel: [[u8; 4]; MAX_TEXELS_PER_BLOCK],

    texel_count_of_weight: [u8; MAX_WEIGHTS_PER_BLOCK],
    texels_of_weight: [[u8; MAX_TEXELS_PER_BLOCK]; MAX_WEIGHTS_PER_BLOCK],
    texel_weights_of_weight: [[u8; MAX_TEXELS_PER_BLOCK]; MAX_WEIGHTS_PER_BLOCK],
    max_texel_count_of_weight: u8,
}

impl Accumulator {
    /// Records the nonzero corner contributions of one texel, keeping the
    /// texel-side and weight-side lists in step.
    fn push_texel(&mut self, texel: usize, corners: [i32; 4], weights: [i32; 4]) {
        for (&corner, &weight) in corners.iter().zip(weights.iter()) {
            if weight == 0 {
                continue;
            }

            let t = usize::from(self.weight_count_of_texel[texel]);
            self.grid_weights_of_texel[texel][t] = corner as u8;
            self.weights_of_texel[texel][t] = weight as u8;
            self.weight_count_of_texel[texel] += 1;

            let q = corner as usize;
            let n = usize::from(self.texel_count_of_weight[q]);
            self.texels_of_weight[q][n] = texel as u8;
            self.texel_weights_of_weight[q][n] = weight as u8;
            self.texel_count_of_weight[q] += 1;

            self.max_texel_count_of_weight =
                self.max_texel_count_of_weight.max(self.texel_count_of_weight[q]);
        }
    }
}

/// Maps a texel position to a grid position in 4.4 fixed point.
fn grid_position(texels: u32, weights: u32, x: u32) -> u32 {
    (((1024 + texels / 2) / (texels - 1)) * x * (weights - 1) + 32) >> 6
}

/// Builds the decimation table for a 2D weight grid.
pub(crate) fn decimation_table_2d(
    x_texels: u32,
    y_texels: u32,
    x_weights: u32,
    y_weights: u32,
) -> Box<DecimationTable> {
    let texels_per_block = x_texels * y_texels;
    let weights_per_block = x_weights * y_weights;

    let mut acc = Accumulator::zeroed();

    for y in 0..y_texels {
        for x in 0..x_texels {
            let texel = (y * x_texels + x) as usize;

            let x_weight = grid_position(x_texels, x_weights, x) as i32;
            let y_weight = grid_position(y_texels, y_weights, y) as i32;

            let x_weight_frac = x_weight & 0xF;
            let y_weight_frac = y_weight & 0xF;
            let x_weight_int = x_weight >> 4;
            let y_weight_int = y_weight >> 4;

            let q0 = y_weight_int * x_weights as i32 + x_weight_int;
            let corners = [q0, q0 + 1, q0 + x_weights as i32, q0 + x_weights as i32 + 1];

            // Truncated-precision bilinear interpolation
            let prod = x_weight_frac * y_weight_frac;
            let w3 = (prod + 8) >> 4;
            let w1 = x_weight_frac - w3;
            let w2 = y_weight_frac - w3;
            let w0 = 16 - x_weight_frac - y_weight_frac + w3;

            acc.push_texel(texel, corners, [w0, w1, w2, w3]);
        }
    }

    fill_table(&acc, texels_per_block, weights_per_block, x_weights, y_weights, 1)
}

/// Builds the decimation table for a 3D weight grid.
///
/// The grid cell containing a texel is split into simplexes; the texel
/// interpolates over the four corners of the simplex its fractional position
/// falls in.
pub(crate) fn decimation_table_3d(
    x_texels: u32,
    y_texels: u32,
    z_texels: u32,
    x_weights: u32,
    y_weights: u32,
    z_weights: u32,
) -> Box<DecimationTable> {
    let texels_per_block = x_texels * y_texels * z_texels;
    let weights_per_block = x_weights * y_weights * z_weights;

    let mut acc = Accumulator::zeroed();

    for z in 0..z_texels {
        for y in 0..y_texels {
            for x in 0..x_texels {
                let texel = ((z * y_texels + y) * x_texels + x) as usize;

                let x_weight = grid_position(x_texels, x_weights, x) as i32;
                let y_weight = grid_position(y_texels, y_weights, y) as i32;
                let z_weight = grid_position(z_texels, z_weights, z) as i32;

                let fs = x_weight & 0xF;
                let ft = y_weight & 0xF;
                let fp = z_weight & 0xF;
                let x_weight_int = x_weight >> 4;
                let y_weight_int = y_weight >> 4;
                let z_weight_int = z_weight >> 4;

                let n = x_weights as i32;
                let nm = (x_weights * y_weights) as i32;

                let cas = (usize::from(fs > ft) << 2) | (usize::from(ft > fp) << 1)
                    | usize::from(fs > fp);

                // Cases 1 and 6 are geometrically unreachable; the final arm
                // maps them to case 0.
                let (s1, s2, w0, w1, w2, w3) = match cas {
                    7 => (1, n, 16 - fs, fs - ft, ft - fp, fp),
                    3 => (n, 1, 16 - ft, ft - fs, fs - fp, fp),
                    5 => (1, nm, 16 - fs, fs - fp, fp - ft, ft),
                    4 => (nm, 1, 16 - fp, fp - fs, fs - ft, ft),
                    2 => (n, nm, 16 - ft, ft - fp, fp - fs, fs),
                    _ => (nm, n, 16 - fp, fp - ft, ft - fs, fs),
                };

                let q0 = (z_weight_int * y_weights as i32 + y_weight_int) * n + x_weight_int;
                let q3 = ((z_weight_int + 1) * y_weights as i32 + y_weight_int + 1) * n
                    + x_weight_int
                    + 1;
                let corners = [q0, q0 + s1, q0 + s1 + s2, q3];

                acc.push_texel(texel, corners, [w0, w1, w2, w3]);
            }
        }
    }

    fill_table(
        &acc,
        texels_per_block,
        weights_per_block,
        x_weights,
        y_weights,
        z_weights,
    )
}

/// Transposes the accumulated incidence lists into the padded SIMD layout.
fn fill_table(
    acc: &Accumulator,
    texels_per_block: u32,
    weights_per_block: u32,
    x_weights: u32,
    y_weights: u32,
    z_weights: u32,
) -> Box<DecimationTable> {
    let texels_per_block = texels_per_block as usize;
    let weights_per_block = weights_per_block as usize;
    let max_texel_count = usize::from(acc.max_texel_count_of_weight);

    // The zeroed allocation already provides the zero tails past
    // `texels_per_block` and the zero inactive texel slots.
    let mut dt = bytemuck::zeroed_box::<DecimationTable>();

    for i in 0..texels_per_block {
        let count = usize::from(acc.weight_count_of_texel[i]);
        dt.texel_weight_count[i] = count as u8;

        for j in 0..count {
            dt.texel_weights_4t[j][i] = acc.grid_weights_of_texel[i][j];
            dt.texel_weights_int_4t[j][i] = acc.weights_of_texel[i][j];
            dt.texel_weights_float_4t[j][i] =
                f32::from(acc.weights_of_texel[i][j]) * (1.0 / TEXEL_WEIGHT_SUM as f32);
        }
    }

    for i in 0..weights_per_block {
        let texel_count_wt = usize::from(acc.texel_count_of_weight[i]);
        dt.weight_texel_count[i] = texel_count_wt as u8;

        for j in 0..texel_count_wt {
            let texel = usize::from(acc.texels_of_weight[i][j]);

            dt.weight_texel[j][i] = texel as u8;
            dt.weights_flt[j][i] = f32::from(acc.texel_weights_of_weight[i][j]);

            // Copy the texel's four contributors; exactly one of them is this
            // weight, and it is rotated into slot 0 so unrolled consumers can
            // rely on an identity-mapped first lane.
            let mut swap_idx = 0;
            for k in 0..4 {
                let contributor = dt.texel_weights_4t[k][texel];
                let contribution = dt.texel_weights_float_4t[k][texel];
                if usize::from(contributor) == i && contribution != 0.0 {
                    swap_idx = k;
                }
                dt.texel_weights_texel[i][j][k] = contributor;
                dt.texel_weights_float_texel[i][j][k] = contribution;
            }

            if swap_idx != 0 {
                dt.texel_weights_texel[i][j].swap(0, swap_idx);
                dt.texel_weights_float_texel[i][j].swap(0, swap_idx);
            }
        }

        // Pad the inactive lanes of this weight with its last live texel so
        // over-reading gathers stay on a valid in-block texel.
        let last_texel = dt.weight_texel[texel_count_wt - 1][i];
        for j in texel_count_wt..max_texel_count {
            dt.weight_texel[j][i] = last_texel;
        }
    }

    // Pad the weight-indexed arrays past `weights_per_block` the same way,
    // repeating the last live texel of the last live weight.
    let last_texel_count_wt = usize::from(acc.texel_count_of_weight[weights_per_block - 1]);
    let last_texel = dt.weight_texel[last_texel_count_wt - 1][weights_per_block - 1];

    let weights_per_block_simd = round_up_to_simd_multiple(weights_per_block);
    for i in weights_per_block..weights_per_block_simd {
        for j in 0..max_texel_count {
            dt.weight_texel[j][i] = last_texel;
        }
    }

    dt.texel_count = texels_per_block as u32;
    dt.weight_count = weights_per_block as u32;
    dt.weight_x = x_weights;
    dt.weight_y = y_weights;
    dt.weight_z = z_weights;

    dt
}
