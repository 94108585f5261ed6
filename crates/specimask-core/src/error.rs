//! Error types for the voxelizer.

use glam::Vec3;
use thiserror::Error;

/// Voxelizer-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Lattice resolution outside the accepted range
    #[error("Invalid resolution {0}: must be in 1..={max}", max = crate::constants::MAX_RESOLUTION)]
    InvalidResolution(u32),

    /// A vector field was requested without any proxy objects
    #[error("Vector field requested with an empty proxy list")]
    EmptyProxies,

    /// Any other rejected configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The ray-cast collaborator failed
    #[error("Ray-cast oracle error: {0}")]
    Oracle(String),

    /// A ray kept reporting hits past the crossing limit
    #[error("Degenerate ray from {point} along {axis}: more than {crossings} crossings")]
    DegenerateRay {
        point: Vec3,
        axis: Vec3,
        crossings: u32,
    },

    /// The build was cancelled by the caller
    #[error("Voxelization cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed input while parsing a grid
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
