//! Proxy objects that donate an orientation to nearby voxels.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::constants::PROXY_REFERENCE_AXIS;
use crate::math::EulerAngles;

/// An oriented marker in the domain.
///
/// Proxies are read-only inputs; their order in a sequence decides
/// which one wins an exact distance tie.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProxyObject {
    /// World-space position
    pub position: Vec3,
    /// Orientation. Constructors normalize it; a value written directly
    /// only needs to be nonzero, since [`Self::direction`] renormalizes.
    pub rotation: Quat,
}

impl ProxyObject {
    /// Create a proxy from a position and a rotation.
    #[inline]
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation: rotation.normalize(),
        }
    }

    /// Create a proxy from a position and XYZ Euler angles.
    #[inline]
    pub fn from_euler(position: Vec3, angles: EulerAngles) -> Self {
        Self::new(position, angles.to_quat())
    }

    /// Create an unrotated proxy.
    #[inline]
    pub fn at(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// The proxy's orientation applied to the local reference axis.
    ///
    /// Unit length for any finite, nonzero rotation.
    #[inline]
    pub fn direction(&self) -> Vec3 {
        (self.rotation * PROXY_REFERENCE_AXIS).normalize()
    }

    /// Finite position and a finite, nonzero rotation.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.position.is_finite()
            && self.rotation.is_finite()
            && self.rotation.length_squared() > 0.0
    }

    /// Squared distance from the proxy to a point.
    #[inline]
    pub fn distance_squared(&self, point: Vec3) -> f32 {
        (self.position - point).length_squared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn unrotated_proxy_points_up() {
        assert_eq!(ProxyObject::at(Vec3::ZERO).direction(), Vec3::Z);
    }

    #[test]
    fn direction_is_unit_length() {
        let proxy = ProxyObject::from_euler(Vec3::ONE, EulerAngles::new(0.3, 1.1, -2.4));
        assert_relative_eq!(proxy.direction().length(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn unnormalized_rotation_is_normalized() {
        let proxy = ProxyObject::new(Vec3::ZERO, Quat::from_xyzw(0.0, 0.0, 0.0, 3.0));
        assert_relative_eq!(proxy.direction().z, 1.0);
    }

    #[test]
    fn zero_or_non_finite_parts_are_invalid() {
        assert!(ProxyObject::at(Vec3::ONE).is_valid());
        let zero = ProxyObject {
            position: Vec3::ZERO,
            rotation: Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
        };
        assert!(!zero.is_valid());
        assert!(!ProxyObject::at(Vec3::INFINITY).is_valid());
        assert!(!ProxyObject::new(Vec3::ZERO, Quat::from_xyzw(0.0, 0.0, 0.0, 0.0)).is_valid());
    }

    #[test]
    fn rotation_about_y_tilts_toward_x() {
        let proxy = ProxyObject::from_euler(Vec3::ZERO, EulerAngles::new(0.0, FRAC_PI_2, 0.0));
        let d = proxy.direction();
        assert_relative_eq!(d.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(d.z, 0.0, epsilon = 1e-6);
    }
}
