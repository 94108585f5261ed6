//! Core types, math, and errors for the specimask voxelizer.
//!
//! This crate provides the foundational types shared by the other crates:
//! - Lattice coordinates and the sample-point mapping
//! - Geometry primitives (rays, bounding boxes, Euler rotations)
//! - Proxy objects carrying an orientation
//! - The workspace-wide error type

pub mod coords;
pub mod error;
pub mod math;
pub mod types;

pub use coords::{Lattice, LatticeIndex};
pub use error::{Error, Result};
pub use math::{Aabb, EulerAngles, Ray};
pub use types::ProxyObject;

/// Voxelizer-wide constants
pub mod constants {
    use glam::Vec3;

    /// Distance a re-cast steps past the previous hit along the cast axis.
    pub const DEFAULT_CAST_EPSILON: f32 = 1.0e-5;
    /// Upper bound on boundary crossings counted along a single ray.
    pub const MAX_RAY_CROSSINGS: u32 = 4096;
    /// Largest accepted lattice resolution per axis.
    pub const MAX_RESOLUTION: u32 = 2048;
    /// Cast axes used by the parity classifier unless configured otherwise.
    pub const DEFAULT_CAST_AXES: [Vec3; 2] = [Vec3::X, Vec3::Y];
    /// Local axis a proxy's rotation is applied to.
    pub const PROXY_REFERENCE_AXIS: Vec3 = Vec3::Z;
}
