//! Voxelization configuration.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use specimask_core::constants::{DEFAULT_CAST_AXES, DEFAULT_CAST_EPSILON, MAX_RAY_CROSSINGS};
use specimask_core::{Aabb, Error, Lattice, Result};

use crate::proxy::ProxyIndexKind;

/// Parameters of one voxelization run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoxelizeConfig {
    /// Voxels per axis (M).
    pub resolution: u32,
    /// Box being sampled.
    pub domain: Aabb,
    /// Directions rays are cast along; a point is inside only if every
    /// axis sees an odd number of crossings.
    pub cast_axes: Vec<Vec3>,
    /// Step taken past each hit before re-casting.
    pub cast_epsilon: f32,
    /// Crossing count above which a ray is reported as degenerate.
    pub max_crossings: u32,
    /// Build z-slices on the rayon thread pool.
    pub parallel: bool,
    /// Lookup structure for nearest-proxy queries.
    pub proxy_index: ProxyIndexKind,
}

impl Default for VoxelizeConfig {
    fn default() -> Self {
        Self {
            resolution: 64,
            domain: Aabb::default(),
            cast_axes: DEFAULT_CAST_AXES.to_vec(),
            cast_epsilon: DEFAULT_CAST_EPSILON,
            max_crossings: MAX_RAY_CROSSINGS,
            parallel: true,
            proxy_index: ProxyIndexKind::default(),
        }
    }
}

impl VoxelizeConfig {
    /// Create a new config with the given resolution.
    pub fn new(resolution: u32) -> Self {
        Self {
            resolution,
            ..Default::default()
        }
    }

    /// Set the sampled domain.
    pub fn with_domain(mut self, domain: Aabb) -> Self {
        self.domain = domain;
        self
    }

    /// Replace the cast axes.
    pub fn with_cast_axes(mut self, axes: impl Into<Vec<Vec3>>) -> Self {
        self.cast_axes = axes.into();
        self
    }

    /// Set the re-cast step.
    pub fn with_cast_epsilon(mut self, epsilon: f32) -> Self {
        self.cast_epsilon = epsilon;
        self
    }

    /// Set the per-ray crossing limit.
    pub fn with_max_crossings(mut self, max_crossings: u32) -> Self {
        self.max_crossings = max_crossings;
        self
    }

    /// Enable or disable the parallel build.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Choose the nearest-proxy lookup structure.
    pub fn with_proxy_index(mut self, kind: ProxyIndexKind) -> Self {
        self.proxy_index = kind;
        self
    }

    /// Check every parameter and return the lattice to sample.
    pub fn validate(&self) -> Result<Lattice> {
        let lattice = Lattice::new(self.resolution, self.domain)?;
        if self.cast_axes.is_empty() {
            return Err(Error::InvalidConfig("at least one cast axis is required".to_string()));
        }
        if let Some(axis) = self
            .cast_axes
            .iter()
            .find(|a| !a.is_finite() || a.length_squared() == 0.0)
        {
            return Err(Error::InvalidConfig(format!(
                "cast axis {axis} must be finite and non-zero"
            )));
        }
        if !self.cast_epsilon.is_finite() || self.cast_epsilon <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "cast epsilon must be positive, got {}",
                self.cast_epsilon
            )));
        }
        if self.max_crossings == 0 {
            return Err(Error::InvalidConfig("max crossings must be at least 1".to_string()));
        }
        Ok(lattice)
    }
}
