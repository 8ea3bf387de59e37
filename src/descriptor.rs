//! Assembly of the per-block-size descriptor.

use crate::block_mode::{decode_block_mode_2d, decode_block_mode_3d};
use crate::decimation::{decimation_table_2d, decimation_table_3d, DecimationTable};
use crate::integer_sequence::ise_sequence_bitcount;
use crate::partition::{init_partition_tables, PartitionInfo};
use crate::rng::XorShift128p;
use crate::{
    MAX_DECIMATION_MODES, MAX_KMEANS_TEXELS, MAX_TEXELS_PER_BLOCK, MAX_WEIGHTS_PER_BLOCK,
    MAX_WEIGHT_BITS_PER_BLOCK, MAX_WEIGHT_MODES, MIN_WEIGHT_BITS_PER_BLOCK, PARTITION_COUNT,
};

/// Per-mode usage percentiles for a 2D block footprint, indexed by the raw
/// 11-bit mode value. Produced offline from a compression corpus.
pub type ModePercentiles = [f32; MAX_WEIGHT_MODES];

/// One accepted block mode.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BlockMode {
    /// Index of the weight grid shape in the decimation mode arrays.
    pub decimation_mode: i16,
    /// Weight quantization level, in `0..=11`.
    pub quant_mode: u8,
    /// True if the mode stores two weight planes.
    pub is_dual_plane: bool,
    /// The raw 11-bit mode value.
    pub mode_index: u16,
    /// True if the mode's usage percentile passed the cutoff.
    pub percentile_hit: bool,
    /// True if the mode's usage percentile is zero.
    pub percentile_always: bool,
}

/// One weight grid shape referenced by at least one accepted block mode.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DecimationMode {
    /// Highest quantization level a single weight plane fits at, or -1.
    pub maxprec_1plane: i8,
    /// Highest quantization level two weight planes fit at, or -1.
    pub maxprec_2planes: i8,
    /// True if any mode using this grid passed the percentile cutoff.
    pub percentile_hit: bool,
    /// True if any mode using this grid has a zero percentile.
    pub percentile_always: bool,
}

/// Every precomputed structure needed to code blocks of one footprint.
///
/// Built once by [`BlockSizeDescriptor::new`] and read-only afterwards, so it
/// can be shared freely across threads. Dropping the descriptor releases the
/// decimation tables it owns; block modes refer to their table by index, not
/// by pointer.
pub struct BlockSizeDescriptor {
    /// Block X dimension in texels.
    pub xdim: u32,
    /// Block Y dimension in texels.
    pub ydim: u32,
    /// Block Z dimension in texels (1 for 2D blocks).
    pub zdim: u32,
    /// Total texels per block.
    pub texel_count: u32,

    /// The accepted block modes, densely packed.
    pub block_modes: Vec<BlockMode>,
    /// Maps a raw mode value to its index in `block_modes`, or -1.
    pub block_mode_packed_index: [i16; MAX_WEIGHT_MODES],

    /// The distinct weight grid shapes referenced by `block_modes`.
    pub decimation_modes: Vec<DecimationMode>,
    /// Decimation tables parallel to `decimation_modes`.
    pub decimation_tables: Vec<Box<DecimationTable>>,

    /// Partition tables: 1024 seeds each for 2, 3 and 4 partitions, then the
    /// single-partition entry. Indexed through [`Self::partition_info`].
    pub partitions: Box<[PartitionInfo]>,

    /// Texel indices sampled for k-means cluster seeding.
    pub kmeans_texels: [u8; MAX_KMEANS_TEXELS],
    /// Number of live entries in `kmeans_texels`.
    pub kmeans_texel_count: u32,
}

impl BlockSizeDescriptor {
    /// Builds the descriptor for one block footprint.
    ///
    /// `z_texels` of 1 selects a 2D block. For 2D blocks, modes whose usage
    /// percentile exceeds `mode_cutoff` are omitted when `can_omit_modes` is
    /// set; `percentiles` supplies the per-mode percentile table, and `None`
    /// treats every legal mode as percentile zero (the right choice for a
    /// decompressor, which cannot assume anything about the encoder's mode
    /// selection). 3D blocks have no percentile data and keep every legal
    /// mode.
    ///
    /// # Panics
    ///
    /// Panics if the dimensions are outside the supported range: 2D blocks
    /// from 2x2 to 12x12, 3D blocks from 2x2x2 to 6x6x6.
    pub fn new(
        x_texels: u32,
        y_texels: u32,
        z_texels: u32,
        can_omit_modes: bool,
        mode_cutoff: f32,
        percentiles: Option<&ModePercentiles>,
    ) -> Self {
        let mut bsd = if z_texels > 1 {
            assert!(
                (2..=6).contains(&x_texels)
                    && (2..=6).contains(&y_texels)
                    && (2..=6).contains(&z_texels),
                "unsupported 3D block size {x_texels}x{y_texels}x{z_texels}"
            );
            construct_3d(x_texels, y_texels, z_texels)
        } else {
            assert!(
                (2..=12).contains(&x_texels) && (2..=12).contains(&y_texels),
                "unsupported 2D block size {x_texels}x{y_texels}"
            );
            construct_2d(x_texels, y_texels, can_omit_modes, mode_cutoff, percentiles)
        };

        init_partition_tables(&mut bsd);
        bsd
    }

    /// Looks up the accepted block mode for a raw mode value.
    pub fn block_mode(&self, mode_index: u16) -> Option<&BlockMode> {
        let packed = self.block_mode_packed_index[usize::from(mode_index)];
        if packed < 0 {
            return None;
        }
        Some(&self.block_modes[packed as usize])
    }

    /// Returns the decimation table of a decimation mode index.
    pub fn decimation_table(&self, decimation_mode: usize) -> &DecimationTable {
        &self.decimation_tables[decimation_mode]
    }

    /// Returns the 1024-entry partition table for `partition_count`.
    ///
    /// The single-partition table has one live entry at seed 0.
    ///
    /// # Panics
    ///
    /// Panics if `partition_count` is not in `1..=4`.
    pub fn partition_table(&self, partition_count: u32) -> &[PartitionInfo] {
        assert!((1..=4).contains(&partition_count));
        let start = if partition_count == 1 {
            3 * PARTITION_COUNT
        } else {
            (partition_count as usize - 2) * PARTITION_COUNT
        };
        &self.partitions[start..start + PARTITION_COUNT]
    }

    /// Returns the partition info entry for (`partition_count`, `seed`).
    pub fn partition_info(&self, partition_count: u32, seed: u32) -> &PartitionInfo {
        &self.partition_table(partition_count)[seed as usize]
    }
}

fn empty_descriptor(x_texels: u32, y_texels: u32, z_texels: u32) -> BlockSizeDescriptor {
    BlockSizeDescriptor {
        xdim: x_texels,
        ydim: y_texels,
        zdim: z_texels,
        texel_count: x_texels * y_texels * z_texels,
        block_modes: Vec::new(),
        block_mode_packed_index: [-1; MAX_WEIGHT_MODES],
        decimation_modes: Vec::new(),
        decimation_tables: Vec::new(),
        partitions: bytemuck::zeroed_slice_box(4 * PARTITION_COUNT),
        kmeans_texels: [0; MAX_KMEANS_TEXELS],
        kmeans_texel_count: 0,
    }
}

/// Appends the decimation mode for a 2D weight grid, building its table and
/// the quantization ceilings for one and two planes.
fn construct_dt_entry_2d(
    x_texels: u32,
    y_texels: u32,
    x_weights: u32,
    y_weights: u32,
    bsd: &mut BlockSizeDescriptor,
) -> usize {
    let index = bsd.decimation_modes.len();
    debug_assert!(index < MAX_DECIMATION_MODES);

    let weight_count = x_weights * y_weights;
    debug_assert!(weight_count <= MAX_WEIGHTS_PER_BLOCK as u32);

    let dt = decimation_table_2d(x_texels, y_texels, x_weights, y_weights);

    let try_2planes = 2 * weight_count <= MAX_WEIGHTS_PER_BLOCK as u32;
    let mut maxprec_1plane = -1i8;
    let mut maxprec_2planes = -1i8;
    for quant in 0..12u8 {
        let bits_1plane = ise_sequence_bitcount(weight_count, quant);
        if (MIN_WEIGHT_BITS_PER_BLOCK..=MAX_WEIGHT_BITS_PER_BLOCK).contains(&bits_1plane) {
            maxprec_1plane = quant as i8;
        }

        if try_2planes {
            let bits_2planes = ise_sequence_bitcount(2 * weight_count, quant);
            if (MIN_WEIGHT_BITS_PER_BLOCK..=MAX_WEIGHT_BITS_PER_BLOCK).contains(&bits_2planes) {
                maxprec_2planes = quant as i8;
            }
        }
    }

    debug_assert!(maxprec_1plane >= 0 || maxprec_2planes >= 0);

    bsd.decimation_modes.push(DecimationMode {
        maxprec_1plane,
        maxprec_2planes,
        percentile_hit: false,
        percentile_always: false,
    });
    bsd.decimation_tables.push(dt);

    index
}

fn construct_2d(
    x_texels: u32,
    y_texels: u32,
    can_omit_modes: bool,
    mode_cutoff: f32,
    percentiles: Option<&ModePercentiles>,
) -> BlockSizeDescriptor {
    // Remap table from (y_weights * 16 + x_weights) to packed decimation mode
    const MAX_DMI: usize = 12 * 16 + 12;
    let mut decimation_mode_index = [-1i32; MAX_DMI];

    let mut bsd = empty_descriptor(x_texels, y_texels, 1);

    for i in 0..MAX_WEIGHT_MODES {
        let Some(mode) = decode_block_mode_2d(i as u16) else {
            continue;
        };

        let percentile = percentiles.map_or(0.0, |table| table[i]);
        let selected = percentile <= mode_cutoff || !can_omit_modes;

        // A compressor never uses more weights per axis than the block has
        // texels; such modes are legal to encode but pointless, and the
        // tables assume they are absent.
        if !selected || mode.x_weights > x_texels || mode.y_weights > y_texels {
            continue;
        }

        let key = (mode.y_weights * 16 + mode.x_weights) as usize;
        let decimation_mode = match decimation_mode_index[key] {
            -1 => {
                let new_mode =
                    construct_dt_entry_2d(x_texels, y_texels, mode.x_weights, mode.y_weights, &mut bsd);
                decimation_mode_index[key] = new_mode as i32;
                new_mode
            }
            found => found as usize,
        };

        let percentile_always = percentile == 0.0;
        let percentile_hit = percentile_always || percentile <= mode_cutoff;

        let dm = &mut bsd.decimation_modes[decimation_mode];
        dm.percentile_always |= percentile_always;
        dm.percentile_hit |= percentile_hit;

        bsd.block_mode_packed_index[i] = bsd.block_modes.len() as i16;
        bsd.block_modes.push(BlockMode {
            decimation_mode: decimation_mode as i16,
            quant_mode: mode.quant_mode,
            is_dual_plane: mode.is_dual_plane,
            mode_index: i as u16,
            percentile_hit,
            percentile_always,
        });
    }

    assign_kmeans_texels(&mut bsd);
    bsd
}

fn construct_3d(x_texels: u32, y_texels: u32, z_texels: u32) -> BlockSizeDescriptor {
    // Remap table from (z_weights * 64 + y_weights * 8 + x_weights)
    const MAX_DMI: usize = 6 * 64 + 6 * 8 + 6;
    let mut decimation_mode_index = [-1i32; MAX_DMI];

    let mut bsd = empty_descriptor(x_texels, y_texels, z_texels);

    // Unlike 2D, every grid shape that fits the block is built up front
    for x_weights in 2..=x_texels {
        for y_weights in 2..=y_texels {
            for z_weights in 2..=z_texels {
                let weight_count = x_weights * y_weights * z_weights;
                if weight_count > MAX_WEIGHTS_PER_BLOCK as u32 {
                    continue;
                }

                let index = bsd.decimation_modes.len();
                debug_assert!(index < MAX_DECIMATION_MODES);
                let key = (z_weights * 64 + y_weights * 8 + x_weights) as usize;
                decimation_mode_index[key] = index as i32;

                let dt = decimation_table_3d(
                    x_texels, y_texels, z_texels, x_weights, y_weights, z_weights,
                );

                let mut maxprec_1plane = -1i8;
                let mut maxprec_2planes = -1i8;
                for quant in 0..12u8 {
                    let bits_1plane = ise_sequence_bitcount(weight_count, quant);
                    if (MIN_WEIGHT_BITS_PER_BLOCK..=MAX_WEIGHT_BITS_PER_BLOCK)
                        .contains(&bits_1plane)
                    {
                        maxprec_1plane = quant as i8;
                    }

                    let bits_2planes = ise_sequence_bitcount(2 * weight_count, quant);
                    if (MIN_WEIGHT_BITS_PER_BLOCK..=MAX_WEIGHT_BITS_PER_BLOCK)
                        .contains(&bits_2planes)
                    {
                        maxprec_2planes = quant as i8;
                    }
                }

                if 2 * weight_count > MAX_WEIGHTS_PER_BLOCK as u32 {
                    maxprec_2planes = -1;
                }

                bsd.decimation_modes.push(DecimationMode {
                    maxprec_1plane,
                    maxprec_2planes,
                    percentile_hit: false,
                    percentile_always: false,
                });
                bsd.decimation_tables.push(dt);
            }
        }
    }

    // No percentile data exists for 3D blocks; every legal mode is kept
    for i in 0..MAX_WEIGHT_MODES {
        let Some(mode) = decode_block_mode_3d(i as u16) else {
            continue;
        };
        if mode.x_weights > x_texels || mode.y_weights > y_texels || mode.z_weights > z_texels {
            continue;
        }

        let key = (mode.z_weights * 64 + mode.y_weights * 8 + mode.x_weights) as usize;
        let decimation_mode = decimation_mode_index[key];
        debug_assert!(decimation_mode >= 0);

        let dm = &mut bsd.decimation_modes[decimation_mode as usize];
        dm.percentile_hit = true;
        dm.percentile_always = true;

        bsd.block_mode_packed_index[i] = bsd.block_modes.len() as i16;
        bsd.block_modes.push(BlockMode {
            decimation_mode: decimation_mode as i16,
            quant_mode: mode.quant_mode,
            is_dual_plane: mode.is_dual_plane,
            mode_index: i as u16,
            percentile_hit: true,
            percentile_always: true,
        });
    }

    assign_kmeans_texels(&mut bsd);
    bsd
}

/// Picks the texels used to seed k-means clustering: all of them on small
/// blocks, a random but reproducible subset on blocks with more texels than
/// `MAX_KMEANS_TEXELS`.
fn assign_kmeans_texels(bsd: &mut BlockSizeDescriptor) {
    let texel_count = bsd.texel_count as usize;
    if texel_count <= MAX_KMEANS_TEXELS {
        for i in 0..texel_count {
            bsd.kmeans_texels[i] = i as u8;
        }
        bsd.kmeans_texel_count = texel_count as u32;
        return;
    }

    let mut rng = XorShift128p::new();
    let mut seen = [false; MAX_TEXELS_PER_BLOCK];
    let mut assigned = 0;
    while assigned < MAX_KMEANS_TEXELS {
        let texel = (rng.next() as u32 % bsd.texel_count) as usize;
        if !seen[texel] {
            bsd.kmeans_texels[assigned] = texel as u8;
            seen[texel] = true;
            assigned += 1;
        }
    }
    bsd.kmeans_texel_count = MAX_KMEANS_TEXELS as u32;
}
