//! Structural invariants of the generated descriptors, checked across the
//! full set of standard ASTC block footprints.

use astc_block_geometry::{
    decode_block_mode_2d, decode_block_mode_3d, BlockSizeDescriptor, DecimationTable,
    MAX_DECIMATION_MODES, TEXEL_WEIGHT_SUM,
};

const FOOTPRINTS_2D: [(u32, u32); 14] = [
    (4, 4),
    (5, 4),
    (5, 5),
    (6, 5),
    (6, 6),
    (8, 5),
    (8, 6),
    (8, 8),
    (10, 5),
    (10, 6),
    (10, 8),
    (10, 10),
    (12, 10),
    (12, 12),
];

const FOOTPRINTS_3D: [(u32, u32, u32); 10] = [
    (3, 3, 3),
    (4, 3, 3),
    (4, 4, 3),
    (4, 4, 4),
    (5, 4, 4),
    (5, 5, 4),
    (5, 5, 5),
    (6, 5, 5),
    (6, 6, 5),
    (6, 6, 6),
];

fn all_descriptors() -> Vec<BlockSizeDescriptor> {
    let mut descriptors = Vec::new();
    for (x, y) in FOOTPRINTS_2D {
        descriptors.push(BlockSizeDescriptor::new(x, y, 1, false, 0.0, None));
    }
    for (x, y, z) in FOOTPRINTS_3D {
        descriptors.push(BlockSizeDescriptor::new(x, y, z, false, 0.0, None));
    }
    descriptors
}

#[test]
fn block_modes_round_trip_through_packed_index() {
    for bsd in all_descriptors() {
        assert!(!bsd.block_modes.is_empty());
        assert!(bsd.decimation_modes.len() <= MAX_DECIMATION_MODES);
        assert_eq!(bsd.decimation_modes.len(), bsd.decimation_tables.len());

        for (k, bm) in bsd.block_modes.iter().enumerate() {
            assert_eq!(
                bsd.block_mode_packed_index[usize::from(bm.mode_index)],
                k as i16
            );

            let dt = bsd.decimation_table(bm.decimation_mode as usize);
            if bsd.zdim > 1 {
                let decoded = decode_block_mode_3d(bm.mode_index).unwrap();
                assert_eq!(
                    (dt.weight_x, dt.weight_y, dt.weight_z),
                    (decoded.x_weights, decoded.y_weights, decoded.z_weights)
                );
                assert_eq!(bm.is_dual_plane, decoded.is_dual_plane);
                assert_eq!(bm.quant_mode, decoded.quant_mode);
            } else {
                let decoded = decode_block_mode_2d(bm.mode_index).unwrap();
                assert_eq!((dt.weight_x, dt.weight_y), (decoded.x_weights, decoded.y_weights));
                assert_eq!(dt.weight_z, 1);
                assert_eq!(bm.is_dual_plane, decoded.is_dual_plane);
                assert_eq!(bm.quant_mode, decoded.quant_mode);
            }
        }
    }
}

#[test]
fn texel_weights_sum_to_the_fixed_point_scale() {
    for bsd in all_descriptors() {
        for dt in &bsd.decimation_tables {
            for texel in 0..dt.texel_count as usize {
                let count = usize::from(dt.texel_weight_count[texel]);
                assert!((1..=4).contains(&count));

                let mut total = 0u32;
                for slot in 0..4 {
                    let int_weight = u32::from(dt.texel_weights_int_4t[slot][texel]);
                    if slot >= count {
                        assert_eq!(int_weight, 0);
                    }
                    total += int_weight;

                    let float_weight = dt.texel_weights_float_4t[slot][texel];
                    assert_eq!(float_weight * TEXEL_WEIGHT_SUM as f32, int_weight as f32);
                }
                assert_eq!(total, TEXEL_WEIGHT_SUM);
            }
        }
    }
}

fn weight_side_matches(dt: &DecimationTable, grid_weight: usize, texel: usize, int_weight: u8) {
    let count = usize::from(dt.weight_texel_count[grid_weight]);
    let matches = (0..count)
        .filter(|&t| usize::from(dt.weight_texel[t][grid_weight]) == texel)
        .collect::<Vec<_>>();
    assert_eq!(matches.len(), 1);
    assert_eq!(dt.weights_flt[matches[0]][grid_weight], f32::from(int_weight));
}

#[test]
fn texel_and_weight_views_are_symmetric() {
    for bsd in all_descriptors() {
        for dt in &bsd.decimation_tables {
            let texel_incidences: u32 = (0..dt.texel_count as usize)
                .map(|i| u32::from(dt.texel_weight_count[i]))
                .sum();
            let weight_incidences: u32 = (0..dt.weight_count as usize)
                .map(|i| u32::from(dt.weight_texel_count[i]))
                .sum();
            assert_eq!(texel_incidences, weight_incidences);

            // Every texel-side contribution appears exactly once weight-side
            for texel in 0..dt.texel_count as usize {
                for slot in 0..usize::from(dt.texel_weight_count[texel]) {
                    let grid_weight = usize::from(dt.texel_weights_4t[slot][texel]);
                    assert!(grid_weight < dt.weight_count as usize);
                    weight_side_matches(dt, grid_weight, texel, dt.texel_weights_int_4t[slot][texel]);
                }
            }

            // And every weight-side texel refers back to a live contribution
            for grid_weight in 0..dt.weight_count as usize {
                for t in 0..usize::from(dt.weight_texel_count[grid_weight]) {
                    let texel = usize::from(dt.weight_texel[t][grid_weight]);
                    assert!(texel < dt.texel_count as usize);
                    let found = (0..usize::from(dt.texel_weight_count[texel])).any(|slot| {
                        usize::from(dt.texel_weights_4t[slot][texel]) == grid_weight
                            && f32::from(dt.texel_weights_int_4t[slot][texel])
                                == dt.weights_flt[t][grid_weight]
                    });
                    assert!(found);
                }
            }
        }
    }
}

#[test]
fn contributor_lists_lead_with_their_own_weight() {
    for bsd in all_descriptors() {
        for dt in &bsd.decimation_tables {
            for grid_weight in 0..dt.weight_count as usize {
                for t in 0..usize::from(dt.weight_texel_count[grid_weight]) {
                    assert_eq!(
                        usize::from(dt.texel_weights_texel[grid_weight][t][0]),
                        grid_weight
                    );
                    assert!(dt.texel_weights_float_texel[grid_weight][t][0] > 0.0);
                }
            }
        }
    }
}

/// Two-bit-per-texel pattern with partition labels renumbered in order of
/// first appearance; label-permuted duplicates collapse to the same key.
fn canonical_pattern(partition_of_texel: &[u8]) -> [u64; 7] {
    let mut pattern = [0u64; 7];
    let mut remap = [-1i32; 4];
    let mut next = 0;
    for (i, &partition) in partition_of_texel.iter().enumerate() {
        let index = usize::from(partition);
        if remap[index] == -1 {
            remap[index] = next;
            next += 1;
        }
        pattern[i >> 5] |= (remap[index] as u64) << (2 * (i & 0x1F));
    }
    pattern
}

#[test]
fn live_partitionings_are_canonically_unique() {
    for bsd in [
        BlockSizeDescriptor::new(4, 4, 1, false, 0.0, None),
        BlockSizeDescriptor::new(6, 6, 1, false, 0.0, None),
        BlockSizeDescriptor::new(4, 4, 4, false, 0.0, None),
    ] {
        let texel_count = bsd.texel_count as usize;
        for pc in 2..=4u32 {
            let mut seen = std::collections::HashSet::new();
            for pi in bsd.partition_table(pc) {
                if pi.partition_count == 0 {
                    continue;
                }
                let canon = canonical_pattern(&pi.partition_of_texel[..texel_count]);
                assert!(seen.insert(canon), "{pc}-partition duplicate survived");
            }
            assert!(!seen.is_empty());
        }
    }
}

#[test]
fn partition_entries_cover_every_texel() {
    for bsd in all_descriptors() {
        let texel_count = bsd.texel_count;
        let full = if bsd.kmeans_texel_count == 64 {
            u64::MAX
        } else {
            (1u64 << bsd.kmeans_texel_count) - 1
        };

        for pc in 2..=4u32 {
            for pi in bsd.partition_table(pc) {
                let total: u32 = pi
                    .partition_texel_count
                    .iter()
                    .map(|&count| u32::from(count))
                    .sum();
                assert_eq!(total, texel_count);

                // Texel ids generated with pc partitions never reach pc
                for &partition in &pi.partition_of_texel[..texel_count as usize] {
                    assert!(u32::from(partition) < pc);
                }

                // Sampled texels land in exactly one coverage bitmap
                let union = pi.coverage_bitmaps.iter().fold(0, |acc, &bm| acc | bm);
                assert_eq!(union, full);
                let overlap: u64 = pi
                    .coverage_bitmaps
                    .iter()
                    .enumerate()
                    .flat_map(|(i, &a)| pi.coverage_bitmaps[i + 1..].iter().map(move |&b| a & b))
                    .fold(0, |acc, shared| acc | shared);
                assert_eq!(overlap, 0);
            }
        }

        // Only seed 0 of the single-partition table is generated
        let pi = bsd.partition_info(1, 0);
        assert_eq!(pi.partition_count, 1);
        assert_eq!(u32::from(pi.partition_texel_count[0]), texel_count);
        assert_eq!(pi.coverage_bitmaps[0], full);
    }
}

#[test]
fn six_by_six_seed_17_covers_the_block() {
    let bsd = BlockSizeDescriptor::new(6, 6, 1, false, 0.0, None);
    let pi = bsd.partition_info(2, 17);
    let total: u32 = pi.partition_texel_count.iter().map(|&c| u32::from(c)).sum();
    assert_eq!(total, 36);
}

#[test]
fn eight_by_eight_seed_23_coverage_union_is_full() {
    let bsd = BlockSizeDescriptor::new(8, 8, 1, false, 0.0, None);
    let pi = bsd.partition_info(2, 23);
    assert_eq!(pi.coverage_bitmaps[0] | pi.coverage_bitmaps[1], u64::MAX);
}

#[test]
fn construction_is_deterministic() {
    for (x, y, z) in [(4, 4, 1), (12, 12, 1), (4, 4, 4)] {
        let a = BlockSizeDescriptor::new(x, y, z, false, 0.0, None);
        let b = BlockSizeDescriptor::new(x, y, z, false, 0.0, None);

        assert_eq!(a.block_modes, b.block_modes);
        assert_eq!(a.block_mode_packed_index, b.block_mode_packed_index);
        assert_eq!(a.decimation_modes, b.decimation_modes);
        assert_eq!(a.kmeans_texels, b.kmeans_texels);
        assert_eq!(a.kmeans_texel_count, b.kmeans_texel_count);

        for (dt_a, dt_b) in a.decimation_tables.iter().zip(b.decimation_tables.iter()) {
            assert_eq!(dt_a.texel_weight_count, dt_b.texel_weight_count);
            assert_eq!(dt_a.texel_weights_4t, dt_b.texel_weights_4t);
            assert_eq!(dt_a.texel_weights_int_4t, dt_b.texel_weights_int_4t);
            assert_eq!(dt_a.texel_weights_float_4t, dt_b.texel_weights_float_4t);
            assert_eq!(dt_a.weight_texel_count, dt_b.weight_texel_count);
            assert_eq!(dt_a.weight_texel, dt_b.weight_texel);
            assert_eq!(dt_a.weights_flt, dt_b.weights_flt);
        }

        for (pi_a, pi_b) in a.partitions.iter().zip(b.partitions.iter()) {
            assert_eq!(pi_a.partition_count, pi_b.partition_count);
            assert_eq!(pi_a.partition_of_texel, pi_b.partition_of_texel);
            assert_eq!(pi_a.partition_texel_count, pi_b.partition_texel_count);
            assert_eq!(pi_a.coverage_bitmaps, pi_b.coverage_bitmaps);
        }
    }
}

#[test]
fn three_d_partitioning_matches_2d_invariants() {
    let bsd = BlockSizeDescriptor::new(4, 4, 4, false, 0.0, None);
    let pi = bsd.partition_info(2, 100);

    let total: u32 = pi.partition_texel_count.iter().map(|&c| u32::from(c)).sum();
    assert_eq!(total, 64);
    assert_eq!(pi.coverage_bitmaps[0] | pi.coverage_bitmaps[1], u64::MAX);
    assert_eq!(pi.coverage_bitmaps[0] & pi.coverage_bitmaps[1], 0);
}
