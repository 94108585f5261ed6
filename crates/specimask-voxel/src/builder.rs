//! Lattice enumeration that turns the classifier into occupancy grids.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use glam::Vec3;
use rayon::prelude::*;
use specimask_core::{Error, Lattice, ProxyObject, Result};
use tracing::info;

use crate::classifier::ParityClassifier;
use crate::config::VoxelizeConfig;
use crate::grid::{VectorField, VoxelGrid};
use crate::oracle::RayCastOracle;
use crate::proxy::NearestProxyAssigner;

/// Cooperative cancellation flag shared between a caller and a build.
///
/// Builds poll it between voxels and stop with [`Error::Cancelled`].
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every build holding this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Per-build state shared by all slices.
struct BuildPass<'a> {
    lattice: Lattice,
    classifier: ParityClassifier,
    assigner: Option<NearestProxyAssigner<'a>>,
}

/// Samples a surface on a regular lattice.
///
/// Every voxel depends only on its own sample point, the oracle, and the
/// proxies, so z-slices are filled independently (on the rayon pool when
/// `config.parallel` is set) and the result is the same either way. The
/// oracle and proxies are only read. An error in any voxel aborts the
/// whole build; no partial grid is returned.
pub struct VoxelGridBuilder<'a, O: ?Sized> {
    oracle: &'a O,
    config: VoxelizeConfig,
    cancel: CancelToken,
}

impl<'a, O: RayCastOracle + ?Sized> VoxelGridBuilder<'a, O> {
    pub fn new(oracle: &'a O, config: VoxelizeConfig) -> Self {
        Self {
            oracle,
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Observe `token` for cancellation.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &VoxelizeConfig {
        &self.config
    }

    /// Classify every lattice voxel.
    #[tracing::instrument(level = "debug", skip_all, fields(resolution = self.config.resolution))]
    pub fn build_mask(&self) -> Result<VoxelGrid> {
        let pass = self.prepare(None)?;
        let started = Instant::now();
        let (cells, _) = self.run(&pass)?;
        let grid = VoxelGrid::from_cells(pass.lattice, cells)?;
        info!(
            resolution = pass.lattice.resolution(),
            occupied = grid.count_occupied(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "built occupancy mask"
        );
        Ok(grid)
    }

    /// Classify every voxel and give each occupied one the direction of
    /// its nearest proxy.
    ///
    /// `proxies` must be non-empty; this is checked before any ray is cast.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(resolution = self.config.resolution, proxies = proxies.len())
    )]
    pub fn build_mask_and_field(
        &self,
        proxies: &[ProxyObject],
    ) -> Result<(VoxelGrid, VectorField)> {
        let pass = self.prepare(Some(proxies))?;
        let started = Instant::now();
        let (cells, vectors) = self.run(&pass)?;
        let grid = VoxelGrid::from_cells(pass.lattice, cells)?;
        let field = VectorField::from_vectors(pass.lattice, vectors)?;
        info!(
            resolution = pass.lattice.resolution(),
            occupied = grid.count_occupied(),
            proxies = proxies.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "built occupancy mask and vector field"
        );
        Ok((grid, field))
    }

    /// Validate everything up front so configuration errors never cost a ray.
    fn prepare<'p>(&self, proxies: Option<&'p [ProxyObject]>) -> Result<BuildPass<'p>> {
        let lattice = self.config.validate()?;
        let classifier = ParityClassifier::from_config(&self.config)?;
        let assigner = proxies
            .map(|proxies| NearestProxyAssigner::new(proxies, self.config.proxy_index))
            .transpose()?;
        tracing::debug!(
            resolution = lattice.resolution(),
            axes = classifier.axes().len(),
            epsilon = classifier.epsilon(),
            parallel = self.config.parallel,
            "starting voxelization"
        );
        Ok(BuildPass {
            lattice,
            classifier,
            assigner,
        })
    }

    fn run(&self, pass: &BuildPass<'_>) -> Result<(Vec<bool>, Vec<Vec3>)> {
        let len = pass.lattice.len();
        let slice_len = pass.lattice.slice_len();
        let mut cells = vec![false; len];
        let mut vectors = if pass.assigner.is_some() {
            vec![Vec3::ZERO; len]
        } else {
            Vec::new()
        };

        match (self.config.parallel, pass.assigner.is_some()) {
            (true, true) => cells
                .par_chunks_mut(slice_len)
                .zip(vectors.par_chunks_mut(slice_len))
                .enumerate()
                .try_for_each(|(z, (cells, vectors))| {
                    self.fill_slice(pass, z, cells, Some(vectors))
                })?,
            (true, false) => cells
                .par_chunks_mut(slice_len)
                .enumerate()
                .try_for_each(|(z, cells)| self.fill_slice(pass, z, cells, None))?,
            (false, true) => {
                for (z, (cells, vectors)) in cells
                    .chunks_mut(slice_len)
                    .zip(vectors.chunks_mut(slice_len))
                    .enumerate()
                {
                    self.fill_slice(pass, z, cells, Some(vectors))?;
                }
            }
            (false, false) => {
                for (z, cells) in cells.chunks_mut(slice_len).enumerate() {
                    self.fill_slice(pass, z, cells, None)?;
                }
            }
        }

        Ok((cells, vectors))
    }

    fn fill_slice(
        &self,
        pass: &BuildPass<'_>,
        z: usize,
        cells: &mut [bool],
        mut vectors: Option<&mut [Vec3]>,
    ) -> Result<()> {
        let _span = tracing::trace_span!("voxelize.slice", z).entered();
        let base = z * pass.lattice.slice_len();
        for (offset, cell) in cells.iter_mut().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let point = pass.lattice.sample_point_linear(base + offset);
            let inside = pass.classifier.is_inside(self.oracle, point)?;
            *cell = inside;
            if inside {
                if let (Some(vectors), Some(assigner)) = (vectors.as_deref_mut(), &pass.assigner) {
                    vectors[offset] = assigner.nearest_direction(point);
                }
            }
        }
        Ok(())
    }
}

/// Occupancy mask of `oracle` at `resolution` with default settings.
pub fn build_mask<O>(oracle: &O, resolution: u32) -> Result<VoxelGrid>
where
    O: RayCastOracle + ?Sized,
{
    VoxelGridBuilder::new(oracle, VoxelizeConfig::new(resolution)).build_mask()
}

/// Occupancy mask and nearest-proxy field with default settings.
pub fn build_mask_and_field<O>(
    oracle: &O,
    proxies: &[ProxyObject],
    resolution: u32,
) -> Result<(VoxelGrid, VectorField)>
where
    O: RayCastOracle + ?Sized,
{
    VoxelGridBuilder::new(oracle, VoxelizeConfig::new(resolution)).build_mask_and_field(proxies)
}
