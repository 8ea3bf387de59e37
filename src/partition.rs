//! Procedural partition patterns and their deduplication.
//!
//! ASTC does not store partition shapes; a 10-bit seed plus the partition
//! count feed a hash that assigns every texel to a partition. The full
//! (count, seed) table is generated up front. Different seeds frequently
//! produce the same texel grouping with the partition labels permuted, so
//! patterns are reduced to a canonical label-order form and duplicates are
//! invalidated.

use bytemuck::Zeroable;

use crate::descriptor::BlockSizeDescriptor;
use crate::{round_up_to_simd_multiple, MAX_TEXELS_PER_BLOCK, PARTITION_COUNT};

/// Texel assignment of one (partition count, seed) pair.
#[derive(Clone, Zeroable)]
#[repr(C)]
pub struct PartitionInfo {
    /// Number of live partitions; 0 marks an unusable or duplicate entry.
    pub partition_count: u8,
    /// Number of texels in each partition.
    pub partition_texel_count: [u8; 4],
    /// Partition of each texel, in `0..4`.
    pub partition_of_texel: [u8; MAX_TEXELS_PER_BLOCK],
    /// Texel indices of each partition, padded to a SIMD multiple by
    /// repeating the last live entry.
    pub texels_of_partition: [[u8; MAX_TEXELS_PER_BLOCK]; 4],
    /// Bit `i` is set if the `i`-th k-means sample texel is in partition `p`.
    pub coverage_bitmaps: [u64; 4],
}

/// Seed mixing function behind the procedural partition assignment.
///
/// The multiplier and shift schedule are fixed by the ASTC specification.
fn hash52(mut p: u32) -> u32 {
    p ^= p >> 15;

    // (2^4 + 1) * (2^7 + 1) * (2^17 - 1)
    p = p.wrapping_mul(0xEEDE_0891);
    p ^= p >> 5;
    p = p.wrapping_add(p << 16);
    p ^= p >> 7;
    p ^= p >> 3;
    p ^= p << 6;
    p ^= p >> 17;
    p
}

/// Computes the partition of the texel at (`x`, `y`, `z`).
fn select_partition(
    seed: u32,
    x: u32,
    y: u32,
    z: u32,
    partition_count: u32,
    small_block: bool,
) -> u8 {
    // Bias the coordinates of small blocks for a better spread
    let (x, y, z) = if small_block {
        (x << 1, y << 1, z << 1)
    } else {
        (x, y, z)
    };

    let seed = seed + (partition_count - 1) * 1024;
    let rnum = hash52(seed);

    let mut seed1 = rnum & 0xF;
    let mut seed2 = (rnum >> 4) & 0xF;
    let mut seed3 = (rnum >> 8) & 0xF;
    let mut seed4 = (rnum >> 12) & 0xF;
    let mut seed5 = (rnum >> 16) & 0xF;
    let mut seed6 = (rnum >> 20) & 0xF;
    let mut seed7 = (rnum >> 24) & 0xF;
    let mut seed8 = (rnum >> 28) & 0xF;
    let mut seed9 = (rnum >> 18) & 0xF;
    let mut seed10 = (rnum >> 22) & 0xF;
    let mut seed11 = (rnum >> 26) & 0xF;
    let mut seed12 = ((rnum >> 30) | (rnum << 2)) & 0xF;

    // Square to bias the distribution towards small coefficients
    seed1 *= seed1;
    seed2 *= seed2;
    seed3 *= seed3;
    seed4 *= seed4;
    seed5 *= seed5;
    seed6 *= seed6;
    seed7 *= seed7;
    seed8 *= seed8;
    seed9 *= seed9;
    seed10 *= seed10;
    seed11 *= seed11;
    seed12 *= seed12;

    let (sh1, sh2) = if seed & 1 != 0 {
        (
            if seed & 2 != 0 { 4 } else { 5 },
            if partition_count == 3 { 6 } else { 5 },
        )
    } else {
        (
            if partition_count == 3 { 6 } else { 5 },
            if seed & 2 != 0 { 4 } else { 5 },
        )
    };
    let sh3 = if seed & 0x10 != 0 { sh1 } else { sh2 };

    seed1 >>= sh1;
    seed2 >>= sh2;
    seed3 >>= sh1;
    seed4 >>= sh2;
    seed5 >>= sh1;
    seed6 >>= sh2;
    seed7 >>= sh1;
    seed8 >>= sh2;

    seed9 >>= sh3;
    seed10 >>= sh3;
    seed11 >>= sh3;
    seed12 >>= sh3;

    let a = (seed1 * x + seed2 * y + seed11 * z + (rnum >> 14)) & 0x3F;
    let b = (seed3 * x + seed4 * y + seed12 * z + (rnum >> 10)) & 0x3F;
    let c = (seed5 * x + seed6 * y + seed9 * z + (rnum >> 6)) & 0x3F;
    let d = (seed7 * x + seed8 * y + seed10 * z + (rnum >> 2)) & 0x3F;

    // Drop the planes beyond the requested partition count
    let b = if partition_count > 1 { b } else { 0 };
    let c = if partition_count > 2 { c } else { 0 };
    let d = if partition_count > 3 { d } else { 0 };

    if a >= b && a >= c && a >= d {
        0
    } else if b >= c && b >= d {
        1
    } else if c >= d {
        2
    } else {
        3
    }
}

/// Fills one partition info entry for (`partition_count`, `partition_index`).
fn generate_partition_info(
    xdim: u32,
    ydim: u32,
    zdim: u32,
    kmeans_texels: &[u8],
    partition_count: u32,
    partition_index: u32,
    pi: &mut PartitionInfo,
) {
    let texels_per_block = xdim * ydim * zdim;
    let small_block = texels_per_block < 32;

    let mut counts = [0usize; 4];
    let mut texel_idx = 0u8;
    for z in 0..zdim {
        for y in 0..ydim {
            for x in 0..xdim {
                let part =
                    select_partition(partition_index, x, y, z, partition_count, small_block);
                let part = usize::from(part);
                pi.texels_of_partition[part][counts[part]] = texel_idx;
                counts[part] += 1;
                pi.partition_of_texel[usize::from(texel_idx)] = part as u8;
                texel_idx += 1;
            }
        }
    }

    // Repeat the last texel of each partition so vector loads can over-read
    for i in 0..partition_count as usize {
        let ptex_count = counts[i];
        for j in ptex_count..round_up_to_simd_multiple(ptex_count) {
            pi.texels_of_partition[i][j] = pi.texels_of_partition[i][ptex_count - 1];
        }
    }

    // The live partition count is the non-empty prefix; a hole invalidates
    // everything after it even if later partitions are populated.
    pi.partition_count = counts.iter().take_while(|&&count| count != 0).count() as u8;

    for i in 0..4 {
        pi.partition_texel_count[i] = counts[i] as u8;
        pi.coverage_bitmaps[i] = 0;
    }

    for (i, &texel) in kmeans_texels.iter().enumerate() {
        let part = usize::from(pi.partition_of_texel[usize::from(texel)]);
        pi.coverage_bitmaps[part] |= 1u64 << i;
    }
}

/// Rewrites a partition pattern with labels in first-appearance order and
/// packs two bits per texel into the bag.
fn canonical_partitioning(partition_of_texel: &[u8], bit_pattern: &mut [u64; 7]) {
    *bit_pattern = [0; 7];

    let mut mapped_index = [-1i32; 4];
    let mut map_weight_count = 0;

    for (i, &partition) in partition_of_texel.iter().enumerate() {
        let index = usize::from(partition);
        if mapped_index[index] == -1 {
            mapped_index[index] = map_weight_count;
            map_weight_count += 1;
        }

        bit_pattern[i >> 5] |= (mapped_index[index] as u64) << (2 * (i & 0x1F));
    }
}

/// Invalidates entries whose canonical pattern already appeared at a lower
/// seed.
fn remove_duplicate_partitionings(texel_count: usize, table: &mut [PartitionInfo]) {
    let mut bit_patterns = vec![[0u64; 7]; table.len()];
    for (pi, pattern) in table.iter().zip(bit_patterns.iter_mut()) {
        canonical_partitioning(&pi.partition_of_texel[..texel_count], pattern);
    }

    for i in 0..table.len() {
        for j in 0..i {
            if bit_patterns[i] == bit_patterns[j] {
                table[i].partition_count = 0;
                break;
            }
        }
    }
}

/// Generates the full partition table set of a descriptor: a single 1-partition
/// entry plus 1024 seeds for each of 2, 3 and 4 partitions, then strips
/// label-permuted duplicates from the multi-partition tables.
pub(crate) fn init_partition_tables(bsd: &mut BlockSizeDescriptor) {
    let xdim = bsd.xdim;
    let ydim = bsd.ydim;
    let zdim = bsd.zdim;
    let texel_count = bsd.texel_count as usize;
    let kmeans_count = bsd.kmeans_texel_count as usize;

    generate_partition_info(
        xdim,
        ydim,
        zdim,
        &bsd.kmeans_texels[..kmeans_count],
        1,
        0,
        &mut bsd.partitions[3 * PARTITION_COUNT],
    );
    for i in 0..PARTITION_COUNT {
        for pc in 2..=4u32 {
            generate_partition_info(
                xdim,
                ydim,
                zdim,
                &bsd.kmeans_texels[..kmeans_count],
                pc,
                i as u32,
                &mut bsd.partitions[(pc as usize - 2) * PARTITION_COUNT + i],
            );
        }
    }

    for pc in 0..3 {
        let table = &mut bsd.partitions[pc * PARTITION_COUNT..(pc + 1) * PARTITION_COUNT];
        remove_duplicate_partitionings(texel_count, table);
    }
}
