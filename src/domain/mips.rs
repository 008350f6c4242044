/// Compute kernels run in 8×8 workgroups.
pub const WORKGROUP_SIZE: u32 = 8;

/// Dispatches are never narrower than 4 groups per axis; the kernels bounds
/// check instead.
pub const MIN_DISPATCH_GROUPS: u32 = 4;

/// One level of the filtered mip pyramid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MipLevelDescriptor {
    pub level: u32,
    pub resolution: u32,
    /// Filter roughness this level represents; zero only at level 0.
    pub roughness: f32,
    /// Compute dispatch grid, in workgroups.
    pub dispatch: [u32; 3],
}

/// Mip chain descriptors for a cube of the given face resolution.
///
/// The chain has `floor(log2(resolution))` levels. Level 0 holds the
/// unfiltered capture; level k is convolved from level k-1 at roughness
/// `(k / K)²`, which eases in quadratically so the sharp low mips spend
/// more of the range.
pub fn mip_chain(resolution: u32) -> Vec<MipLevelDescriptor> {
    assert!(
        resolution.is_power_of_two() && resolution > 1,
        "cube resolution must be a power of two"
    );

    let count = resolution.ilog2();

    (0..count)
        .map(|level| {
            let resolution = (resolution >> level).max(1);
            let groups = resolution.div_ceil(WORKGROUP_SIZE).max(MIN_DISPATCH_GROUPS);

            MipLevelDescriptor {
                level,
                resolution,
                roughness: (level as f32 / count as f32).powi(2),
                dispatch: [groups, groups, 6],
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_has_floor_log2_levels() {
        assert_eq!(mip_chain(128).len(), 7);
        assert_eq!(mip_chain(64).len(), 6);
        assert_eq!(mip_chain(2).len(), 1);
    }

    #[test]
    fn resolutions_halve() {
        let chain = mip_chain(128);

        for (level, descriptor) in chain.iter().enumerate() {
            assert_eq!(descriptor.level as usize, level);
            assert_eq!(descriptor.resolution, 128 >> level);
        }
    }

    #[test]
    fn roughness_starts_at_zero_and_strictly_increases() {
        let chain = mip_chain(256);

        assert_eq!(chain[0].roughness, 0.0);

        for pair in chain.windows(2) {
            assert!(pair[1].roughness > pair[0].roughness);
        }

        assert!(chain.last().unwrap().roughness < 1.0);
    }

    #[test]
    fn dispatch_covers_level_with_minimum() {
        for descriptor in mip_chain(128) {
            let groups = descriptor.dispatch[0];

            assert!(groups >= MIN_DISPATCH_GROUPS);
            assert!(groups * WORKGROUP_SIZE >= descriptor.resolution);
            assert_eq!(descriptor.dispatch[2], 6);
        }
    }
}
