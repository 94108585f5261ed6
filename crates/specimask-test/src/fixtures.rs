//! Shapes with known answers.

use glam::{Affine3A, Vec3};
use specimask_core::{EulerAngles, Lattice, ProxyObject, Result};
use specimask_voxel::{LocalFrameOracle, TriMesh, VoxelGrid};

/// Half extents of the reference box, off the sample planes of the
/// resolutions it is tested at.
pub const BOX_HALF_EXTENTS: Vec3 = Vec3::new(0.31, 0.23, 0.17);

/// Boxes whose faces lie on sample planes, with the resolution that puts
/// them there and the number of sample points strictly inside.
pub const GRID_ALIGNED_BOXES: [(Vec3, u32, usize); 3] = [
    (Vec3::splat(0.25), 4, 1),
    (Vec3::splat(0.25), 8, 27),
    (Vec3::new(0.3125, 0.25, 0.125), 16, 189),
];

/// Radius of the reference sphere in world units.
pub const SPHERE_RADIUS: f32 = 0.3;

/// Exact occupancy of an origin-centred box: a voxel is occupied iff its
/// sample point lies strictly inside.
pub fn box_indicator(lattice: Lattice, half_extents: Vec3) -> VoxelGrid {
    VoxelGrid::from_fn(lattice, |index| {
        let p = lattice.sample_point(index);
        p.abs().cmplt(half_extents).all()
    })
}

/// Closed axis-aligned box mesh centred at the origin.
pub fn box_mesh(half_extents: Vec3) -> TriMesh {
    TriMesh::cuboid(half_extents)
}

/// World transform of the reference sphere: scaled unit icosphere, rotated
/// and nudged off the lattice symmetry planes.
pub fn sphere_transform() -> Affine3A {
    Affine3A::from_scale_rotation_translation(
        Vec3::splat(SPHERE_RADIUS),
        EulerAngles::new(0.3, 0.5, 0.7).to_quat(),
        Vec3::new(0.013, -0.021, 0.007),
    )
}

/// Unit icosphere placed in the world through [`sphere_transform`].
///
/// Returns the oracle and the enclosed volume of the placed mesh.
pub fn reference_sphere(subdivisions: u32) -> Result<(LocalFrameOracle<TriMesh>, f64)> {
    let local = TriMesh::icosphere(1.0, subdivisions);
    let volume = local.volume() * f64::from(SPHERE_RADIUS).powi(3);
    Ok((LocalFrameOracle::new(local, sphere_transform())?, volume))
}

/// Two proxies on either side of the origin with distinct orientations.
pub fn proxy_pair() -> [ProxyObject; 2] {
    [
        ProxyObject::from_euler(Vec3::new(-0.12, 0.05, 0.02), EulerAngles::new(0.0, 0.0, 0.0)),
        ProxyObject::from_euler(Vec3::new(0.15, -0.04, 0.06), EulerAngles::new(1.1, 0.0, 0.4)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn box_indicator_counts() {
        // 15 sample coordinates per axis: (i + 1) / 15 - 0.5
        let grid = box_indicator(Lattice::unit(15).unwrap(), BOX_HALF_EXTENTS);
        let per_axis = |h: f32| {
            (0..15)
                .filter(|&i| ((i + 1) as f32 / 15.0 - 0.5).abs() < h)
                .count()
        };
        let expected = per_axis(0.31) * per_axis(0.23) * per_axis(0.17);
        assert_eq!(grid.count_occupied(), expected);
        assert!(expected > 0);
    }

    #[test]
    fn sphere_volume_close_to_analytic() {
        let (_, volume) = reference_sphere(3).unwrap();
        let analytic = 4.0 / 3.0 * PI * 0.3f64.powi(3);
        assert_relative_eq!(volume, analytic, max_relative = 0.02);
        assert!(volume < analytic);
    }
}
