//! Ray-parity inside/outside classification.

use glam::Vec3;
use specimask_core::constants::{DEFAULT_CAST_AXES, DEFAULT_CAST_EPSILON, MAX_RAY_CROSSINGS};
use specimask_core::{Error, Result};

use crate::config::VoxelizeConfig;
use crate::oracle::RayCastOracle;

/// Decides whether a point lies inside a closed surface.
///
/// A ray is cast along each configured axis and its boundary crossings are
/// counted. The point is inside only if every axis sees an odd count; one
/// even count (zero included) makes it outside. Requiring agreement across
/// axes filters most grazing hits that corrupt a single axis's parity.
///
/// Points on the surface are outside: a first hit at the point itself ends
/// the count at zero.
///
/// The surface must be watertight. Holes or self-intersections give a
/// consistent but wrong answer and are not detected here.
#[derive(Clone, Debug, PartialEq)]
pub struct ParityClassifier {
    axes: Vec<Vec3>,
    epsilon: f32,
    max_crossings: u32,
}

impl Default for ParityClassifier {
    fn default() -> Self {
        Self {
            axes: DEFAULT_CAST_AXES.to_vec(),
            epsilon: DEFAULT_CAST_EPSILON,
            max_crossings: MAX_RAY_CROSSINGS,
        }
    }
}

impl ParityClassifier {
    /// Classifier using the axes, re-cast step and crossing limit of `config`.
    pub fn from_config(config: &VoxelizeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            axes: config.cast_axes.iter().map(|a| a.normalize()).collect(),
            epsilon: config.cast_epsilon,
            max_crossings: config.max_crossings,
        })
    }

    /// Unit cast axes, in test order.
    pub fn axes(&self) -> &[Vec3] {
        &self.axes
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn max_crossings(&self) -> u32 {
        self.max_crossings
    }

    /// Count boundary crossings along `axis` starting at `point`.
    ///
    /// After each hit the ray restarts `epsilon` past the hit point. More
    /// than `max_crossings` hits fails with [`Error::DegenerateRay`]. When
    /// the first hit is `point` itself the point lies on the surface and
    /// zero crossings are reported.
    pub fn count_crossings<O>(&self, oracle: &O, point: Vec3, axis: Vec3) -> Result<u32>
    where
        O: RayCastOracle + ?Sized,
    {
        let mut origin = point;
        let mut crossings = 0;
        while let Some(hit) = oracle.cast(origin, axis)? {
            if crossings == 0 && hit.point == point {
                return Ok(0);
            }
            if crossings == self.max_crossings {
                return Err(Error::DegenerateRay {
                    point,
                    axis,
                    crossings,
                });
            }
            crossings += 1;
            origin = hit.point + axis * self.epsilon;
        }
        Ok(crossings)
    }

    /// True when every axis sees an odd number of crossings.
    pub fn is_inside<O>(&self, oracle: &O, point: Vec3) -> Result<bool>
    where
        O: RayCastOracle + ?Sized,
    {
        for &axis in &self.axes {
            if self.count_crossings(oracle, point, axis)? % 2 == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
