//! Lattice coordinates and the sample-point mapping.

use bytemuck::{Pod, Zeroable};
use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_RESOLUTION;
use crate::error::{Error, Result};
use crate::math::Aabb;

/// Integer position of one voxel in an `M x M x M` lattice.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
#[repr(C)]
pub struct LatticeIndex {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl LatticeIndex {
    /// Create a new lattice index
    #[inline]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Convert to linear index for flat array storage (x fastest, z slowest)
    #[inline]
    pub const fn to_linear(self, resolution: u32) -> usize {
        let m = resolution as usize;
        self.x as usize + (self.y as usize) * m + (self.z as usize) * m * m
    }

    /// Create from linear index
    #[inline]
    pub const fn from_linear(index: usize, resolution: u32) -> Self {
        let m = resolution as usize;
        let x = (index % m) as u32;
        let y = ((index / m) % m) as u32;
        let z = (index / (m * m)) as u32;
        Self { x, y, z }
    }

    /// Convert to glam UVec3
    #[inline]
    pub const fn to_uvec3(self) -> UVec3 {
        UVec3::new(self.x, self.y, self.z)
    }
}

impl From<UVec3> for LatticeIndex {
    fn from(v: UVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// A regular `M x M x M` partition of a box domain.
///
/// Sample points follow `coord(idx) = min + (idx + 1) / M * size` per axis,
/// which for the default `[-0.5, 0.5]^3` domain is `(idx + 1) / M - 0.5`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    resolution: u32,
    domain: Aabb,
}

impl Lattice {
    /// Create a lattice, rejecting a zero or oversized resolution and
    /// degenerate domains.
    pub fn new(resolution: u32, domain: Aabb) -> Result<Self> {
        if resolution == 0 || resolution > MAX_RESOLUTION {
            return Err(Error::InvalidResolution(resolution));
        }
        if !domain.is_valid() {
            return Err(Error::InvalidConfig(format!(
                "domain {:?}..{:?} must have finite, positive extents",
                domain.min, domain.max
            )));
        }
        Ok(Self { resolution, domain })
    }

    /// Lattice over the default `[-0.5, 0.5]^3` domain.
    pub fn unit(resolution: u32) -> Result<Self> {
        Self::new(resolution, Aabb::default())
    }

    /// Voxels per axis
    #[inline]
    pub const fn resolution(&self) -> u32 {
        self.resolution
    }

    /// The sampled domain
    #[inline]
    pub const fn domain(&self) -> Aabb {
        self.domain
    }

    /// Total number of voxels (`M^3`)
    #[inline]
    pub const fn len(&self) -> usize {
        let m = self.resolution as usize;
        m * m * m
    }

    /// Never true; a lattice holds at least one voxel.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Voxels in one z-slice (`M^2`)
    #[inline]
    pub const fn slice_len(&self) -> usize {
        let m = self.resolution as usize;
        m * m
    }

    /// Volume represented by one voxel.
    #[inline]
    pub fn voxel_volume(&self) -> f32 {
        self.domain.volume() / self.len() as f32
    }

    /// Coordinate of lattice position `idx` along one axis.
    #[inline]
    fn axis_coord(&self, idx: u32, min: f32, extent: f32) -> f32 {
        min + (idx + 1) as f32 / self.resolution as f32 * extent
    }

    /// Sample point for a lattice index.
    #[inline]
    pub fn sample_point(&self, index: LatticeIndex) -> Vec3 {
        let min = self.domain.min;
        let size = self.domain.size();
        Vec3::new(
            self.axis_coord(index.x, min.x, size.x),
            self.axis_coord(index.y, min.y, size.y),
            self.axis_coord(index.z, min.z, size.z),
        )
    }

    /// Sample point for a flat index.
    #[inline]
    pub fn sample_point_linear(&self, index: usize) -> Vec3 {
        self.sample_point(LatticeIndex::from_linear(index, self.resolution))
    }

    /// Iterate over all lattice indices in storage order.
    pub fn indices(&self) -> impl Iterator<Item = LatticeIndex> {
        let resolution = self.resolution;
        (0..self.len()).map(move |i| LatticeIndex::from_linear(i, resolution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_index_linear_roundtrip() {
        let m = 7;
        for z in 0..m {
            for y in 0..m {
                for x in 0..m {
                    let idx = LatticeIndex::new(x, y, z);
                    assert_eq!(LatticeIndex::from_linear(idx.to_linear(m), m), idx);
                }
            }
        }
    }

    #[test]
    fn x_is_fastest_axis() {
        assert_eq!(LatticeIndex::new(1, 0, 0).to_linear(4), 1);
        assert_eq!(LatticeIndex::new(0, 1, 0).to_linear(4), 4);
        assert_eq!(LatticeIndex::new(0, 0, 1).to_linear(4), 16);
    }

    #[test]
    fn unit_lattice_matches_reference_mapping() {
        let m = 64;
        let lattice = Lattice::unit(m).unwrap();
        for idx in [0, 1, 31, 62, 63] {
            let expected = (idx + 1) as f32 / m as f32 - 0.5;
            let p = lattice.sample_point(LatticeIndex::new(idx, idx, idx));
            assert_eq!(p, Vec3::splat(expected));
        }
    }

    #[test]
    fn last_sample_sits_on_upper_face() {
        let lattice = Lattice::unit(8).unwrap();
        let p = lattice.sample_point(LatticeIndex::new(7, 0, 0));
        assert_eq!(p.x, 0.5);
        assert_eq!(p.y, -0.375);
    }

    #[test]
    fn custom_domain_mapping() {
        let domain = Aabb::new(Vec3::new(0.0, -1.0, 2.0), Vec3::new(2.0, 1.0, 6.0));
        let lattice = Lattice::new(4, domain).unwrap();
        let p = lattice.sample_point(LatticeIndex::new(0, 1, 3));
        assert_eq!(p, Vec3::new(0.5, 0.0, 6.0));
        assert_eq!(lattice.voxel_volume(), 16.0 / 64.0);
    }

    #[test]
    fn rejects_zero_resolution() {
        assert!(matches!(Lattice::unit(0), Err(Error::InvalidResolution(0))));
        assert!(matches!(
            Lattice::unit(MAX_RESOLUTION + 1),
            Err(Error::InvalidResolution(_))
        ));
    }

    #[test]
    fn rejects_degenerate_domain() {
        let flat = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0));
        assert!(matches!(
            Lattice::new(4, flat),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn indices_cover_lattice_in_order() {
        let lattice = Lattice::unit(3).unwrap();
        let all: Vec<_> = lattice.indices().collect();
        assert_eq!(all.len(), 27);
        assert_eq!(all[0], LatticeIndex::new(0, 0, 0));
        assert_eq!(all[1], LatticeIndex::new(1, 0, 0));
        assert_eq!(all[26], LatticeIndex::new(2, 2, 2));
    }
}
