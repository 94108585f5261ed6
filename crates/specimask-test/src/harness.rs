//! Mask regression testing.
//!
//! Compares a built mask against an expected one and, when they differ by
//! more than the configured threshold, writes a diff image tiling every
//! z-slice so the disagreement can be inspected.

use image::{GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};
use specimask_core::LatticeIndex;
use specimask_voxel::VoxelGrid;

use crate::{MaskTestConfig, Result, TestError};

/// Voxel-level difference between two masks of equal resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaskComparison {
    /// Occupied in the expected mask only.
    pub missing: usize,
    /// Occupied in the actual mask only.
    pub extra: usize,
    pub total: usize,
    /// First disagreeing voxel in storage order.
    pub first_mismatch: Option<LatticeIndex>,
}

impl MaskComparison {
    pub const fn mismatched(&self) -> usize {
        self.missing + self.extra
    }

    /// Mismatched voxels as a fraction of all voxels.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.mismatched() as f64 / self.total as f64
        }
    }

    pub const fn is_exact(&self) -> bool {
        self.mismatched() == 0
    }
}

/// Count disagreements between `expected` and `actual`.
pub fn compare_masks(expected: &VoxelGrid, actual: &VoxelGrid) -> Result<MaskComparison> {
    if expected.resolution() != actual.resolution() {
        return Err(TestError::MaskComparison(format!(
            "Mask resolutions don't match: {} vs {}",
            expected.resolution(),
            actual.resolution()
        )));
    }

    let resolution = expected.resolution();
    let mut comparison = MaskComparison {
        missing: 0,
        extra: 0,
        total: expected.cells().len(),
        first_mismatch: None,
    };
    for (i, (&e, &a)) in expected.cells().iter().zip(actual.cells()).enumerate() {
        match (e, a) {
            (true, false) => comparison.missing += 1,
            (false, true) => comparison.extra += 1,
            _ => continue,
        }
        if comparison.first_mismatch.is_none() {
            comparison.first_mismatch = Some(LatticeIndex::from_linear(i, resolution));
        }
    }
    Ok(comparison)
}

/// Number of slice tiles per row in a tiled image.
fn tile_columns(resolution: u32) -> u32 {
    let mut columns = 1;
    while columns * columns < resolution {
        columns += 1;
    }
    columns
}

fn tiled_image<P: image::Pixel>(
    resolution: u32,
    background: P,
    mut pixel: impl FnMut(u32, u32, u32) -> P,
) -> ImageBuffer<P, Vec<P::Subpixel>> {
    let columns = tile_columns(resolution);
    let rows = resolution.div_ceil(columns);
    // One pixel gutter between tiles.
    let stride = resolution + 1;
    let mut image = ImageBuffer::from_pixel(columns * stride, rows * stride, background);
    for z in 0..resolution {
        let (ox, oy) = ((z % columns) * stride, (z / columns) * stride);
        for y in 0..resolution {
            for x in 0..resolution {
                // Flip y so +y points up.
                image.put_pixel(ox + x, oy + resolution - 1 - y, pixel(x, y, z));
            }
        }
    }
    image
}

/// Grayscale image of every z-slice of a mask; occupied voxels are white.
pub fn slice_image(grid: &VoxelGrid) -> GrayImage {
    tiled_image(grid.resolution(), Luma([64u8]), |x, y, z| {
        Luma([if grid.get_xyz(x, y, z) { 255 } else { 0 }])
    })
}

/// Diff image of two masks of equal resolution.
///
/// Voxels both masks agree on are grey (occupied) or black (empty); voxels
/// only the expected mask occupies are red and voxels only the actual mask
/// occupies are blue.
pub fn diff_image(expected: &VoxelGrid, actual: &VoxelGrid) -> RgbaImage {
    tiled_image(expected.resolution(), Rgba([32, 32, 32, 255]), |x, y, z| {
        match (expected.get_xyz(x, y, z), actual.get_xyz(x, y, z)) {
            (true, true) => Rgba([160, 160, 160, 255]),
            (false, false) => Rgba([0, 0, 0, 255]),
            (true, false) => Rgba([255, 0, 0, 255]),
            (false, true) => Rgba([0, 96, 255, 255]),
        }
    })
}

/// Mask regression test runner.
pub struct MaskRegressionTest {
    config: MaskTestConfig,
}

impl MaskRegressionTest {
    pub fn new(config: MaskTestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MaskTestConfig {
        &self.config
    }

    /// Compare `actual` against `expected`.
    ///
    /// Fails when the mismatch fraction exceeds the threshold, after saving
    /// `<output_dir>/<name>_diff.png`.
    pub fn check(
        &self,
        name: &str,
        expected: &VoxelGrid,
        actual: &VoxelGrid,
    ) -> Result<MaskComparison> {
        let comparison = compare_masks(expected, actual)?;
        if comparison.fraction() <= self.config.threshold {
            tracing::debug!(
                name,
                mismatched = comparison.mismatched(),
                "mask comparison passed"
            );
            return Ok(comparison);
        }

        std::fs::create_dir_all(&self.config.output_dir)?;
        let diff_path = format!("{}/{}_diff.png", self.config.output_dir, name);
        diff_image(expected, actual).save(&diff_path)?;
        tracing::warn!(name, path = %diff_path, "saved mask diff");

        Err(TestError::MaskComparison(format!(
            "{} of {} voxels differ ({} missing, {} extra, first at {:?}), \
             fraction {:.6} exceeds threshold {:.6} (see {})",
            comparison.mismatched(),
            comparison.total,
            comparison.missing,
            comparison.extra,
            comparison.first_mismatch,
            comparison.fraction(),
            self.config.threshold,
            diff_path
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use specimask_core::Lattice;

    fn lower_half(resolution: u32) -> VoxelGrid {
        VoxelGrid::from_fn(Lattice::unit(resolution).unwrap(), |i| 2 * i.z < resolution)
    }

    #[test]
    fn identical_masks_compare_exact() {
        let grid = lower_half(4);
        let comparison = compare_masks(&grid, &grid).unwrap();
        assert!(comparison.is_exact());
        assert_eq!(comparison.first_mismatch, None);
        assert_eq!(comparison.total, 64);
    }

    #[test]
    fn counts_missing_and_extra() {
        let expected = lower_half(4);
        let actual = VoxelGrid::from_fn(*expected.lattice(), |i| {
            (2 * i.z < 4 && i != LatticeIndex::new(1, 0, 0)) || i == LatticeIndex::new(3, 3, 3)
        });
        let comparison = compare_masks(&expected, &actual).unwrap();
        assert_eq!(comparison.missing, 1);
        assert_eq!(comparison.extra, 1);
        assert_eq!(comparison.first_mismatch, Some(LatticeIndex::new(1, 0, 0)));
        assert!((comparison.fraction() - 2.0 / 64.0).abs() < 1e-12);
    }

    #[test]
    fn resolution_mismatch_is_an_error() {
        assert!(matches!(
            compare_masks(&lower_half(2), &lower_half(3)),
            Err(TestError::MaskComparison(_))
        ));
    }

    #[test]
    fn tiles_cover_every_slice() {
        assert_eq!(tile_columns(1), 1);
        assert_eq!(tile_columns(4), 2);
        assert_eq!(tile_columns(5), 3);
        let image = slice_image(&lower_half(5));
        assert_eq!(image.dimensions(), (18, 12));
        // z = 0, x = 0, y = 0 is bottom-left of the first tile
        assert_eq!(image.get_pixel(0, 4)[0], 255);
        // z = 4 is empty, in the second row of tiles
        assert_eq!(image.get_pixel(6, 6)[0], 0);
    }

    #[test]
    fn failing_check_writes_diff() {
        let dir = std::env::temp_dir().join(format!("specimask-harness-{}", std::process::id()));
        let runner = MaskRegressionTest::new(
            MaskTestConfig::default().with_output_dir(dir.to_string_lossy().into_owned()),
        );
        let expected = lower_half(3);
        let actual = VoxelGrid::empty(*expected.lattice());
        assert!(runner.check("lower_half", &expected, &actual).is_err());
        assert!(dir.join("lower_half_diff.png").exists());

        let lenient = MaskRegressionTest::new(
            MaskTestConfig::default()
                .with_threshold(1.0)
                .with_output_dir(dir.to_string_lossy().into_owned()),
        );
        assert!(lenient.check("lenient", &expected, &actual).is_ok());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
