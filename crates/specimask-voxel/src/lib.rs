//! Voxelization engine for the specimask workspace.
//!
//! Turns a closed surface, reachable only through a [`RayCastOracle`], into a
//! boolean occupancy grid by ray parity, and optionally assigns every occupied
//! voxel the direction of its nearest [`ProxyObject`](specimask_core::ProxyObject).
//!
//! - [`ParityClassifier`]: inside/outside decision for one point
//! - [`VoxelGridBuilder`]: lattice enumeration, sequential or data-parallel
//! - [`NearestProxyAssigner`]: nearest-proxy lookup with a stable tie-break
//! - [`TriMesh`]: a reference oracle over an indexed triangle mesh

pub mod builder;
pub mod classifier;
pub mod config;
pub mod diagnostics;
pub mod grid;
mod kdtree;
pub mod oracle;
pub mod proxy;
pub mod trimesh;

pub use builder::{build_mask, build_mask_and_field, CancelToken, VoxelGridBuilder};
pub use classifier::ParityClassifier;
pub use config::VoxelizeConfig;
pub use diagnostics::{check_volume, VolumeReport};
pub use grid::{VectorField, VoxelGrid};
pub use oracle::{LocalFrameOracle, RayCastOracle, RayHit};
pub use proxy::{nearest_direction, NearestProxyAssigner, ProxyIndexKind};
pub use trimesh::TriMesh;
