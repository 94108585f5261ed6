//! Specimask voxelization benchmark.
//!
//! Voxelizes the reference sphere at increasing resolutions and logs build
//! time and volume error for each. Usage:
//!
//! ```text
//! specimask-benchmark [OUTPUT_DIR]
//! ```
//!
//! With `OUTPUT_DIR`, the finest mask and field are written there as text
//! grids and `.npy` arrays. Set `RUST_LOG` to change verbosity.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use glam::Vec3;
use specimask_core::{EulerAngles, ProxyObject};
use specimask_test::fixtures::reference_sphere;
use specimask_voxel::{check_volume, ProxyIndexKind, VoxelGridBuilder, VoxelizeConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

const RESOLUTIONS: [u32; 3] = [16, 32, 64];
const SPHERE_SUBDIVISIONS: u32 = 3;

/// Proxies spread on a ring inside the sphere.
fn ring_proxies(count: usize) -> Vec<ProxyObject> {
    (0..count)
        .map(|i| {
            let angle = i as f32 / count as f32 * std::f32::consts::TAU;
            ProxyObject::from_euler(
                Vec3::new(angle.cos(), angle.sin(), 0.0) * 0.15,
                EulerAngles::new(0.0, std::f32::consts::FRAC_PI_2, angle),
            )
        })
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let output_dir = std::env::args().nth(1).map(PathBuf::from);
    let (sphere, volume) = reference_sphere(SPHERE_SUBDIVISIONS)?;
    let proxies = ring_proxies(64);
    info!(
        faces = sphere.inner().len(),
        reference_volume = volume,
        proxies = proxies.len(),
        "Specimask voxelization benchmark"
    );

    let mut finest = None;
    for resolution in RESOLUTIONS {
        let config = VoxelizeConfig::new(resolution).with_proxy_index(ProxyIndexKind::KdTree);
        let started = Instant::now();
        let (mask, field) = VoxelGridBuilder::new(&sphere, config)
            .build_mask_and_field(&proxies)
            .with_context(|| format!("voxelizing at resolution {resolution}"))?;
        let elapsed = started.elapsed();
        let report = check_volume(&mask, volume, 0.05);
        info!(
            resolution,
            voxels = mask.cells().len(),
            occupied = report.occupied_voxels,
            relative_error = report.relative_error,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            voxels_per_sec = mask.cells().len() as f64 / elapsed.as_secs_f64().max(1e-9),
            "resolution done"
        );
        finest = Some((mask, field));
    }

    if let (Some(dir), Some((mask, field))) = (output_dir, finest) {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating {}", dir.display()))?;
        specimask_io::save_mask(dir.join("mask.txt"), &mask)?;
        specimask_io::save_mask(dir.join("mask.npy"), &mask)?;
        specimask_io::save_field(dir.join("field.txt"), &field)?;
        specimask_io::save_field(dir.join("field.npy"), &field)?;
        info!(dir = %dir.display(), "wrote outputs");
    }

    Ok(())
}
