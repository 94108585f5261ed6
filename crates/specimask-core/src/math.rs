//! Geometry primitives: rays, boxes and Euler rotations.

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Half-line `origin + t * direction` for `t >= 0`.
///
/// `direction` need not be unit length; parameters are then measured in
/// multiples of it.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Ray with a normalized direction.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Axis-aligned box given by its corners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    /// The conventional voxelization domain, `[-0.5, 0.5]^3`.
    fn default() -> Self {
        Self::from_half_extents(Vec3::splat(0.5))
    }
}

impl Aabb {
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centered at the origin.
    #[inline]
    pub fn from_half_extents(half_extents: Vec3) -> Self {
        Self::new(-half_extents, half_extents)
    }

    /// Tightest box around `points`, or `None` when there are none.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let first = *points.first()?;
        Some(points.iter().fold(Self::new(first, first), |bounds, &p| {
            Self::new(bounds.min.min(p), bounds.max.max(p))
        }))
    }

    /// Edge lengths along each axis.
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        self.size().element_product()
    }

    /// True when every extent is finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.size().cmpgt(Vec3::ZERO).all()
    }

    /// The same box grown outward by `margin` on every face.
    #[inline]
    pub fn loosened(&self, margin: f32) -> Self {
        Self::new(self.min - Vec3::splat(margin), self.max + Vec3::splat(margin))
    }

    /// Parameter interval `[enter, exit]` over which `ray` is inside the
    /// box, clamped to `t >= 0`. `None` when the ray misses or points away.
    pub fn clip_ray(&self, ray: &Ray) -> Option<(f32, f32)> {
        let inv = ray.direction.recip();
        let a = (self.min - ray.origin) * inv;
        let b = (self.max - ray.origin) * inv;
        let enter = a.min(b).max_element().max(0.0);
        let exit = a.max(b).min_element();
        (enter <= exit).then_some((enter, exit))
    }
}

/// Euler angles in radians, applied about X, then Y, then Z.
///
/// The composed rotation is `Rz * Ry * Rx`, the XYZ convention of most
/// scene-authoring tools.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct EulerAngles {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl EulerAngles {
    /// Create a new set of angles
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Convert to a unit quaternion.
    pub fn to_quat(self) -> Quat {
        let rotation = Quat::from_rotation_z(self.z)
            * Quat::from_rotation_y(self.y)
            * Quat::from_rotation_x(self.x);
        rotation.normalize()
    }
}

impl From<EulerAngles> for Quat {
    fn from(angles: EulerAngles) -> Self {
        angles.to_quat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn ray_new_normalizes() {
        let ray = Ray::new(Vec3::new(0.1, 0.0, 0.0), Vec3::new(0.0, 4.0, 0.0));
        assert_eq!(ray.direction, Vec3::Y);
        assert_eq!(ray.at(2.0), Vec3::new(0.1, 2.0, 0.0));
    }

    #[test]
    fn default_domain_is_unit_cube() {
        let domain = Aabb::default();
        assert_eq!(domain.min, Vec3::splat(-0.5));
        assert_eq!(domain.max, Vec3::splat(0.5));
        assert_eq!(domain.volume(), 1.0);
        assert!(domain.is_valid());
    }

    #[test]
    fn flat_or_inverted_domains_are_invalid() {
        assert!(!Aabb::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0)).is_valid());
        assert!(!Aabb::new(Vec3::ONE, Vec3::ZERO).is_valid());
        assert!(!Aabb::new(Vec3::ZERO, Vec3::splat(f32::INFINITY)).is_valid());
    }

    #[test]
    fn bounds_of_points() {
        let aabb = Aabb::from_points(&[Vec3::new(1.0, -2.0, 0.5), Vec3::new(-1.0, 3.0, 0.0)])
            .expect("non-empty");
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 3.0, 0.5));
        assert!(Aabb::from_points(&[]).is_none());
    }

    #[test]
    fn clip_ray_through_domain() {
        let domain = Aabb::default();

        let through = Ray::new(Vec3::new(-1.0, 0.1, 0.2), Vec3::X);
        let (enter, exit) = domain.clip_ray(&through).expect("crosses the domain");
        assert_relative_eq!(enter, 0.5);
        assert_relative_eq!(exit, 1.5);

        let from_inside = Ray::new(Vec3::new(0.25, 0.0, 0.0), Vec3::X);
        assert_eq!(domain.clip_ray(&from_inside), Some((0.0, 0.25)));

        let beside = Ray::new(Vec3::new(-1.0, 0.7, 0.0), Vec3::X);
        assert!(domain.clip_ray(&beside).is_none());
        let away = Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::X);
        assert!(domain.clip_ray(&away).is_none());
    }

    #[test]
    fn loosened_grows_every_face() {
        let grown = Aabb::default().loosened(0.25);
        assert_eq!(grown, Aabb::from_half_extents(Vec3::splat(0.75)));
    }

    #[test]
    fn euler_applies_x_then_y_then_z() {
        // X by 90 deg takes +Z to -Y, then Z by 90 deg takes -Y to +X.
        let q = EulerAngles::new(FRAC_PI_2, 0.0, FRAC_PI_2).to_quat();
        let v = q * Vec3::Z;
        assert_relative_eq!(v.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(v.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(v.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn zero_euler_is_identity() {
        let q = EulerAngles::default().to_quat();
        assert_relative_eq!((q * Vec3::Z).z, 1.0);
    }
}
