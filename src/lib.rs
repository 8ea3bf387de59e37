//! # astc_block_geometry
//!
//! Precomputed block geometry for the ASTC (Adaptive Scalable Texture
//! Compression) format.
//!
//! ASTC interprets every compressed block through a set of per-block-size
//! lookup structures: the list of legal 11-bit block modes, the decimation
//! tables that upsample a coarse weight grid to one weight per texel, and the
//! procedurally hashed partition patterns that split a block into up to four
//! groups of texels. Building these structures is expensive, so both a
//! compressor and a decompressor build them once per block size and then
//! treat them as read-only.
//!
//! This crate performs that precomputation. The entry point is
//! [`BlockSizeDescriptor::new`], which assembles everything for one block
//! footprint:
//!
//! ```
//! use astc_block_geometry::BlockSizeDescriptor;
//!
//! let bsd = BlockSizeDescriptor::new(6, 6, 1, false, 0.0, None);
//!
//! assert_eq!(bsd.texel_count, 36);
//! assert!(bsd.block_modes.len() > 0);
//! ```
//!
//! The block-mode decode and the decimation interpolation are normative parts
//! of the ASTC specification; an implementation that diverges there produces
//! pixels that disagree with conformant decoders. The tables in this crate
//! are laid out for SIMD consumption: arrays are transposed so that gathers
//! are strided, and tails are padded so that full-width vector loads past the
//! live lanes stay inside the allocation and read inert values.

mod block_mode;
mod decimation;
mod descriptor;
mod integer_sequence;
mod partition;
mod rng;

pub use block_mode::{decode_block_mode_2d, decode_block_mode_3d, DecodedMode2d, DecodedMode3d};
pub use decimation::DecimationTable;
pub use descriptor::{BlockMode, BlockSizeDescriptor, DecimationMode, ModePercentiles};
pub use integer_sequence::ise_sequence_bitcount;
pub use partition::PartitionInfo;

/// Largest texel count of any supported block footprint (6x6x6).
pub const MAX_TEXELS_PER_BLOCK: usize = 216;

/// Largest number of stored weights a block mode may use.
pub const MAX_WEIGHTS_PER_BLOCK: usize = 64;

/// Smallest number of bits the stored weights of a block may occupy.
pub const MIN_WEIGHT_BITS_PER_BLOCK: u32 = 24;

/// Largest number of bits the stored weights of a block may occupy.
pub const MAX_WEIGHT_BITS_PER_BLOCK: u32 = 96;

/// Number of distinct values of the 11-bit block mode field.
pub const MAX_WEIGHT_MODES: usize = 2048;

/// Largest number of distinct weight grids any block size can reference.
pub const MAX_DECIMATION_MODES: usize = 87;

/// Number of partition pattern seeds per partition count.
pub const PARTITION_COUNT: usize = 1024;

/// Upper limit on texels sampled for k-means cluster seeding.
pub const MAX_KMEANS_TEXELS: usize = 64;

/// Fixed-point scale of the per-texel blend weights; the integer weights of
/// every texel sum to this value.
pub const TEXEL_WEIGHT_SUM: u32 = 16;

/// Widest SIMD lane count the table layouts are padded for.
///
/// `MAX_TEXELS_PER_BLOCK` and `MAX_WEIGHTS_PER_BLOCK` are both multiples of
/// this, so padded tails never leave the fixed-size arrays.
pub const SIMD_WIDTH: usize = 8;

/// Rounds `count` up to the next multiple of [`SIMD_WIDTH`].
pub const fn round_up_to_simd_multiple(count: usize) -> usize {
    (count + SIMD_WIDTH - 1) / SIMD_WIDTH * SIMD_WIDTH
}
