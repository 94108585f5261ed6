//! Volume sanity checks for built grids.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::grid::VoxelGrid;

/// Occupied volume of a grid compared with a known reference volume.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeReport {
    pub resolution: u32,
    pub occupied_voxels: usize,
    /// Occupied voxel count times voxel volume.
    pub occupied_volume: f64,
    pub reference_volume: f64,
    pub absolute_error: f64,
    /// `absolute_error / reference_volume`; infinite for a zero reference.
    pub relative_error: f64,
}

impl VolumeReport {
    pub fn new(grid: &VoxelGrid, reference_volume: f64) -> Self {
        let occupied_volume = grid.occupied_volume();
        let absolute_error = (occupied_volume - reference_volume).abs();
        let relative_error = if reference_volume == 0.0 {
            if absolute_error == 0.0 {
                0.0
            } else {
                f64::INFINITY
            }
        } else {
            absolute_error / reference_volume.abs()
        };
        Self {
            resolution: grid.resolution(),
            occupied_voxels: grid.count_occupied(),
            occupied_volume,
            reference_volume,
            absolute_error,
            relative_error,
        }
    }

    pub fn is_plausible(&self, tolerance: f64) -> bool {
        self.relative_error <= tolerance
    }
}

/// Build a [`VolumeReport`] and log it, warning when the relative error
/// exceeds `tolerance`.
pub fn check_volume(grid: &VoxelGrid, reference_volume: f64, tolerance: f64) -> VolumeReport {
    let report = VolumeReport::new(grid, reference_volume);
    if report.is_plausible(tolerance) {
        info!(
            resolution = report.resolution,
            occupied = report.occupied_voxels,
            volume = report.occupied_volume,
            relative_error = report.relative_error,
            "volume check passed"
        );
    } else {
        warn!(
            resolution = report.resolution,
            occupied = report.occupied_voxels,
            volume = report.occupied_volume,
            reference = report.reference_volume,
            relative_error = report.relative_error,
            tolerance,
            "occupied volume far from reference; surface may not be closed"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use specimask_core::{Lattice, LatticeIndex};

    #[test]
    fn half_full_grid() {
        let lattice = Lattice::unit(4).unwrap();
        let grid = VoxelGrid::from_fn(lattice, |LatticeIndex { z, .. }| z < 2);
        let report = VolumeReport::new(&grid, 0.5);
        assert_eq!(report.occupied_voxels, 32);
        assert_relative_eq!(report.occupied_volume, 0.5, epsilon = 1e-9);
        assert!(report.is_plausible(1e-6));
    }

    #[test]
    fn far_off_volume_is_flagged() {
        let lattice = Lattice::unit(4).unwrap();
        let grid = VoxelGrid::empty(lattice);
        let report = check_volume(&grid, 0.25, 0.1);
        assert_relative_eq!(report.relative_error, 1.0);
        assert!(!report.is_plausible(0.1));
    }

    #[test]
    fn zero_reference() {
        let grid = VoxelGrid::empty(Lattice::unit(2).unwrap());
        assert_eq!(VolumeReport::new(&grid, 0.0).relative_error, 0.0);
        let full = VoxelGrid::from_fn(Lattice::unit(2).unwrap(), |_| true);
        assert!(VolumeReport::new(&full, 0.0).relative_error.is_infinite());
    }
}
