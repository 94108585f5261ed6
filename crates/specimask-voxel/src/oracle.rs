//! The ray-cast capability the voxelizer depends on.

use std::sync::Arc;

use glam::{Affine3A, Vec3};
use specimask_core::{Error, Result};

/// The nearest boundary crossing along a ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// World-space intersection point
    pub point: Vec3,
    /// Identifier of the face that was hit
    pub face: u32,
}

/// Answers "where does this ray first cross the surface?".
///
/// Rays are unbounded. `direction` need not be normalized. Implementations
/// must tolerate being re-invoked with an origin advanced just past a
/// previous hit along the same direction. `Ok(None)` means no further
/// crossing; `Err` is reserved for a collaborator that cannot answer.
pub trait RayCastOracle: Send + Sync {
    fn cast(&self, origin: Vec3, direction: Vec3) -> Result<Option<RayHit>>;
}

impl<T: RayCastOracle + ?Sized> RayCastOracle for &T {
    fn cast(&self, origin: Vec3, direction: Vec3) -> Result<Option<RayHit>> {
        (**self).cast(origin, direction)
    }
}

impl<T: RayCastOracle + ?Sized> RayCastOracle for Box<T> {
    fn cast(&self, origin: Vec3, direction: Vec3) -> Result<Option<RayHit>> {
        (**self).cast(origin, direction)
    }
}

impl<T: RayCastOracle + ?Sized> RayCastOracle for Arc<T> {
    fn cast(&self, origin: Vec3, direction: Vec3) -> Result<Option<RayHit>> {
        (**self).cast(origin, direction)
    }
}

/// Places an oracle that works in mesh-local coordinates into world space.
///
/// Queries stay in world space. Each ray is mapped into the local frame
/// through the inverse of `world_from_local`, and hits are mapped back.
#[derive(Clone, Debug)]
pub struct LocalFrameOracle<O> {
    inner: O,
    world_from_local: Affine3A,
    local_from_world: Affine3A,
}

impl<O: RayCastOracle> LocalFrameOracle<O> {
    /// Wrap `inner`, rejecting transforms that cannot be inverted.
    pub fn new(inner: O, world_from_local: Affine3A) -> Result<Self> {
        let det = world_from_local.matrix3.determinant();
        if !det.is_finite() || det == 0.0 || !world_from_local.translation.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "mesh world transform is not invertible (determinant {det})"
            )));
        }
        Ok(Self {
            inner,
            world_from_local,
            local_from_world: world_from_local.inverse(),
        })
    }

    /// The wrapped local-space oracle
    pub fn inner(&self) -> &O {
        &self.inner
    }

    pub fn world_from_local(&self) -> Affine3A {
        self.world_from_local
    }
}

impl<O: RayCastOracle> RayCastOracle for LocalFrameOracle<O> {
    fn cast(&self, origin: Vec3, direction: Vec3) -> Result<Option<RayHit>> {
        let local_origin = self.local_from_world.transform_point3(origin);
        let local_direction = self.local_from_world.transform_vector3(direction);
        let hit = self.inner.cast(local_origin, local_direction)?;
        Ok(hit.map(|hit| RayHit {
            point: self.world_from_local.transform_point3(hit.point),
            face: hit.face,
        }))
    }
}
