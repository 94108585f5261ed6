//! Test harness for specimask voxelization.
//!
//! Provides analytic fixtures and mask regression checks that dump diff
//! images when a grid drifts from its expectation.

pub mod fixtures;
pub mod harness;

pub use harness::{compare_masks, diff_image, MaskComparison, MaskRegressionTest};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestError {
    #[error("Voxelization error: {0}")]
    Voxel(#[from] specimask_core::Error),
    #[error("Mask comparison failed: {0}")]
    MaskComparison(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, TestError>;

/// Mask regression test configuration.
#[derive(Debug, Clone)]
pub struct MaskTestConfig {
    /// Maximum allowed fraction of mismatched voxels (0.0-1.0).
    pub threshold: f64,
    /// Directory for diff images.
    pub output_dir: String,
}

impl Default for MaskTestConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            output_dir: "target/test_output".to_string(),
        }
    }
}

impl MaskTestConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<String>) -> Self {
        self.output_dir = dir.into();
        self
    }
}
