//! Static k-d tree over proxy positions.

use glam::Vec3;

const NONE: u32 = u32::MAX;

#[derive(Clone, Debug)]
struct KdNode {
    position: Vec3,
    /// Index into the original proxy sequence
    index: u32,
    axis: u8,
    left: u32,
    right: u32,
}

/// Nearest-neighbor index that agrees exactly with a linear scan.
///
/// Distances are computed with the same expression as the scan, equal
/// distances resolve to the lowest original index, and a subtree is only
/// skipped when its splitting plane is strictly farther than the best
/// candidate, so tied candidates are never pruned.
#[derive(Clone, Debug)]
pub(crate) struct ProxyKdTree {
    nodes: Vec<KdNode>,
    root: u32,
}

impl ProxyKdTree {
    pub(crate) fn build(positions: &[Vec3]) -> Self {
        let mut order: Vec<u32> = (0..positions.len() as u32).collect();
        let mut nodes = Vec::with_capacity(positions.len());
        let root = Self::build_recursive(positions, &mut order, &mut nodes);
        Self { nodes, root }
    }

    fn build_recursive(positions: &[Vec3], items: &mut [u32], nodes: &mut Vec<KdNode>) -> u32 {
        if items.is_empty() {
            return NONE;
        }

        let mut bounds_min = Vec3::splat(f32::INFINITY);
        let mut bounds_max = Vec3::splat(f32::NEG_INFINITY);
        for &i in items.iter() {
            bounds_min = bounds_min.min(positions[i as usize]);
            bounds_max = bounds_max.max(positions[i as usize]);
        }
        let extent = bounds_max - bounds_min;
        let axis = if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        };

        items.sort_unstable_by(|&a, &b| {
            positions[a as usize][axis]
                .total_cmp(&positions[b as usize][axis])
                .then(a.cmp(&b))
        });
        let median = items.len() / 2;
        let index = items[median];

        let slot = nodes.len();
        nodes.push(KdNode {
            position: positions[index as usize],
            index,
            axis: axis as u8,
            left: NONE,
            right: NONE,
        });

        let (lower, rest) = items.split_at_mut(median);
        let left = Self::build_recursive(positions, lower, nodes);
        let right = Self::build_recursive(positions, &mut rest[1..], nodes);
        nodes[slot].left = left;
        nodes[slot].right = right;
        slot as u32
    }

    /// Original index of the nearest position; `None` for an empty tree.
    pub(crate) fn nearest(&self, point: Vec3) -> Option<usize> {
        if self.root == NONE {
            return None;
        }
        let mut best = (f32::INFINITY, u32::MAX);
        self.search(self.root, point, &mut best);
        Some(best.1 as usize)
    }

    fn search(&self, slot: u32, point: Vec3, best: &mut (f32, u32)) {
        let node = &self.nodes[slot as usize];
        let distance = (node.position - point).length_squared();
        if distance < best.0 || (distance == best.0 && node.index < best.1) {
            *best = (distance, node.index);
        }

        let axis = node.axis as usize;
        let diff = point[axis] - node.position[axis];
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };
        if near != NONE {
            self.search(near, point, best);
        }
        if far != NONE && diff * diff <= best.0 {
            self.search(far, point, best);
        }
    }
}
