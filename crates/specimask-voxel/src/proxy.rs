//! Nearest-proxy orientation lookup.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use specimask_core::{Error, ProxyObject, Result};

use crate::kdtree::ProxyKdTree;

/// Lookup structure used to find the nearest proxy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProxyIndexKind {
    /// Scan every proxy; best for a handful of proxies.
    #[default]
    Linear,
    /// Static k-d tree; same answers as the scan, sublinear queries.
    KdTree,
}

/// Index of the proxy closest to `point`.
///
/// Uses a strict less-than, so on an exact distance tie the earliest
/// proxy in the sequence wins. `None` only for an empty slice.
pub fn nearest_proxy_linear(point: Vec3, proxies: &[ProxyObject]) -> Option<usize> {
    let (first, rest) = proxies.split_first()?;
    let mut best = 0;
    let mut best_distance = first.distance_squared(point);
    for (i, proxy) in rest.iter().enumerate() {
        let distance = proxy.distance_squared(point);
        if distance < best_distance {
            best = i + 1;
            best_distance = distance;
        }
    }
    Some(best)
}

/// Direction of the proxy closest to `point`.
///
/// Fails with [`Error::EmptyProxies`] when there is nothing to choose from,
/// and with [`Error::InvalidConfig`] when the chosen proxy is malformed.
pub fn nearest_direction(point: Vec3, proxies: &[ProxyObject]) -> Result<Vec3> {
    let i = nearest_proxy_linear(point, proxies).ok_or(Error::EmptyProxies)?;
    check_proxy(i, &proxies[i])?;
    Ok(proxies[i].direction())
}

fn check_proxy(i: usize, proxy: &ProxyObject) -> Result<()> {
    if proxy.is_valid() {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "proxy {i} needs a finite position and a finite, nonzero rotation: {proxy:?}"
        )))
    }
}

/// Assigns each queried point the direction of its nearest proxy.
///
/// Directions are computed once per proxy up front.
#[derive(Clone, Debug)]
pub struct NearestProxyAssigner<'a> {
    proxies: &'a [ProxyObject],
    directions: Vec<Vec3>,
    tree: Option<ProxyKdTree>,
}

impl<'a> NearestProxyAssigner<'a> {
    /// Prepare lookups over `proxies`, which must be non-empty with finite
    /// positions and finite, nonzero rotations.
    pub fn new(proxies: &'a [ProxyObject], kind: ProxyIndexKind) -> Result<Self> {
        if proxies.is_empty() {
            return Err(Error::EmptyProxies);
        }
        for (i, proxy) in proxies.iter().enumerate() {
            check_proxy(i, proxy)?;
        }

        let directions = proxies.iter().map(ProxyObject::direction).collect();
        let tree = match kind {
            ProxyIndexKind::Linear => None,
            ProxyIndexKind::KdTree => {
                let positions: Vec<Vec3> = proxies.iter().map(|p| p.position).collect();
                Some(ProxyKdTree::build(&positions))
            }
        };
        tracing::debug!(proxies = proxies.len(), ?kind, "prepared nearest-proxy lookup");

        Ok(Self {
            proxies,
            directions,
            tree,
        })
    }

    pub fn proxies(&self) -> &'a [ProxyObject] {
        self.proxies
    }

    pub fn kind(&self) -> ProxyIndexKind {
        if self.tree.is_some() {
            ProxyIndexKind::KdTree
        } else {
            ProxyIndexKind::Linear
        }
    }

    /// Index of the nearest proxy, earliest on ties.
    #[inline]
    pub fn nearest_index(&self, point: Vec3) -> usize {
        let nearest = match &self.tree {
            Some(tree) => tree.nearest(point),
            None => nearest_proxy_linear(point, self.proxies),
        };
        // Non-empty by construction.
        nearest.unwrap_or(0)
    }

    /// Unit direction of the nearest proxy.
    #[inline]
    pub fn nearest_direction(&self, point: Vec3) -> Vec3 {
        self.directions[self.nearest_index(point)]
    }
}
