//! Indexed triangle mesh usable as a world-space ray-cast oracle.

use glam::{Affine3A, Vec3};
use hashbrown::HashMap;
use specimask_core::{Aabb, Error, Ray, Result};

use crate::oracle::{RayCastOracle, RayHit};

/// Marks an edge with no face on its other side.
pub const NO_NEIGHBOUR: u32 = u32::MAX;

/// A triangle soup with shared vertices.
///
/// Faces are wound counter-clockwise when seen from outside. Casting walks
/// every triangle behind an AABB early-out, which is plenty for the mesh
/// sizes used to synthesize specimens.
///
/// A ray that only touches an edge while running inside the plane of the
/// face across that edge is sliding along the surface, not crossing it, and
/// is not reported. Points on a face therefore never pick up a stray
/// crossing from the faces that border it.
#[derive(Clone, Debug)]
pub struct TriMesh {
    vertices: Vec<Vec3>,
    indices: Vec<[u32; 3]>,
    neighbours: Vec<[u32; 3]>,
    aabb: Aabb,
}

impl TriMesh {
    /// Create a mesh, validating indices and coordinates.
    pub fn new(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>) -> Result<Self> {
        if indices.is_empty() {
            return Err(Error::InvalidData("mesh has no triangles".to_string()));
        }
        if let Some(v) = vertices.iter().find(|v| !v.is_finite()) {
            return Err(Error::InvalidData(format!("non-finite vertex {v}")));
        }
        let count = vertices.len();
        if let Some((face, tri)) = indices
            .iter()
            .enumerate()
            .find(|(_, tri)| tri.iter().any(|&i| i as usize >= count))
        {
            return Err(Error::InvalidData(format!(
                "triangle {face} references {tri:?} but the mesh has {count} vertices"
            )));
        }
        let aabb = Aabb::from_points(&vertices)
            .ok_or_else(|| Error::InvalidData("mesh has no vertices".to_string()))?;
        Ok(Self::assemble(vertices, indices, aabb))
    }

    fn assemble(vertices: Vec<Vec3>, indices: Vec<[u32; 3]>, aabb: Aabb) -> Self {
        let neighbours = edge_neighbours(&indices);
        Self {
            vertices,
            indices,
            neighbours,
            aabb,
        }
    }

    /// Axis-aligned box centered at the origin.
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents;
        let vertices = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        let indices = vec![
            [0, 2, 1],
            [0, 3, 2], // -z
            [4, 5, 6],
            [4, 6, 7], // +z
            [0, 1, 5],
            [0, 5, 4], // -y
            [3, 7, 6],
            [3, 6, 2], // +y
            [0, 4, 7],
            [0, 7, 3], // -x
            [1, 2, 6],
            [1, 6, 5], // +x
        ];
        Self::assemble(vertices, indices, Aabb::from_half_extents(h.abs()))
    }

    /// Geodesic sphere centered at the origin: an icosahedron whose faces
    /// are split into four `subdivisions` times.
    pub fn icosphere(radius: f32, subdivisions: u32) -> Self {
        let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
        let mut vertices: Vec<Vec3> = [
            (-1.0, t, 0.0),
            (1.0, t, 0.0),
            (-1.0, -t, 0.0),
            (1.0, -t, 0.0),
            (0.0, -1.0, t),
            (0.0, 1.0, t),
            (0.0, -1.0, -t),
            (0.0, 1.0, -t),
            (t, 0.0, -1.0),
            (t, 0.0, 1.0),
            (-t, 0.0, -1.0),
            (-t, 0.0, 1.0),
        ]
        .into_iter()
        .map(|(x, y, z)| Vec3::new(x, y, z).normalize())
        .collect();
        let mut indices: Vec<[u32; 3]> = vec![
            [0, 11, 5],
            [0, 5, 1],
            [0, 1, 7],
            [0, 7, 10],
            [0, 10, 11],
            [1, 5, 9],
            [5, 11, 4],
            [11, 10, 2],
            [10, 7, 6],
            [7, 1, 8],
            [3, 9, 4],
            [3, 4, 2],
            [3, 2, 6],
            [3, 6, 8],
            [3, 8, 9],
            [4, 9, 5],
            [2, 4, 11],
            [6, 2, 10],
            [8, 6, 7],
            [9, 8, 1],
        ];

        for _ in 0..subdivisions {
            let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
            let mut midpoint = |a: u32, b: u32, vertices: &mut Vec<Vec3>| -> u32 {
                let key = (a.min(b), a.max(b));
                *midpoints.entry(key).or_insert_with(|| {
                    let p = ((vertices[a as usize] + vertices[b as usize]) * 0.5).normalize();
                    vertices.push(p);
                    (vertices.len() - 1) as u32
                })
            };

            let mut next = Vec::with_capacity(indices.len() * 4);
            for [a, b, c] in indices {
                let ab = midpoint(a, b, &mut vertices);
                let bc = midpoint(b, c, &mut vertices);
                let ca = midpoint(c, a, &mut vertices);
                next.extend([[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
            }
            indices = next;
        }

        for v in &mut vertices {
            *v *= radius;
        }
        let aabb = Aabb::from_half_extents(Vec3::splat(radius.abs()));
        Self::assemble(vertices, indices, aabb)
    }

    /// A copy with every vertex mapped through `transform`.
    ///
    /// Transforms with a negative determinant flip the winding, so faces
    /// are re-ordered to stay outward-facing.
    pub fn transformed(&self, transform: &Affine3A) -> Self {
        let vertices: Vec<Vec3> = self
            .vertices
            .iter()
            .map(|&v| transform.transform_point3(v))
            .collect();
        let indices = if transform.matrix3.determinant() < 0.0 {
            self.indices.iter().map(|&[a, b, c]| [a, c, b]).collect()
        } else {
            self.indices.clone()
        };
        let aabb = Aabb::from_points(&vertices).unwrap_or(self.aabb);
        Self::assemble(vertices, indices, aabb)
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn indices(&self) -> &[[u32; 3]] {
        &self.indices
    }

    /// Number of triangles
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    /// For each face, the face across edge `k` (corners `k` and `k + 1`),
    /// or [`NO_NEIGHBOUR`].
    pub fn neighbours(&self) -> &[[u32; 3]] {
        &self.neighbours
    }

    /// Corner positions of one triangle.
    #[inline]
    pub fn triangle(&self, face: usize) -> [Vec3; 3] {
        self.indices[face].map(|i| self.vertices[i as usize])
    }

    /// True when `hit` lies on an edge of `face` whose neighbour contains
    /// the ray direction.
    fn grazes_neighbour(&self, face: usize, hit: &TriangleHit, direction: Vec3) -> bool {
        hit.edges
            .into_iter()
            .zip(self.neighbours[face])
            .any(|(on_edge, neighbour)| {
                if !on_edge || neighbour == NO_NEIGHBOUR {
                    return false;
                }
                let [a, b, c] = self.triangle(neighbour as usize);
                (b - a).cross(c - a).dot(direction) == 0.0
            })
    }

    /// Enclosed volume by the divergence theorem.
    ///
    /// Exact for a closed, outward-wound mesh; meaningless otherwise.
    pub fn volume(&self) -> f64 {
        let sum: f64 = (0..self.len())
            .map(|face| {
                let [a, b, c] = self.triangle(face).map(|v| v.as_dvec3());
                a.dot(b.cross(c))
            })
            .sum();
        sum / 6.0
    }
}

impl RayCastOracle for TriMesh {
    fn cast(&self, origin: Vec3, direction: Vec3) -> Result<Option<RayHit>> {
        if !origin.is_finite() || !direction.is_finite() || direction == Vec3::ZERO {
            return Err(Error::Oracle(format!(
                "malformed ray query: origin {origin}, direction {direction}"
            )));
        }
        // Not normalized: `toi` is measured in multiples of `direction`.
        let ray = Ray { origin, direction };
        if self.aabb.loosened(1.0e-6).clip_ray(&ray).is_none() {
            return Ok(None);
        }

        let mut best: Option<(f32, u32)> = None;
        for face in 0..self.indices.len() {
            let [a, b, c] = self.triangle(face);
            if let Some(hit) = ray_triangle(a, b, c, &ray) {
                if self.grazes_neighbour(face, &hit, ray.direction) {
                    continue;
                }
                if best.map_or(true, |(best_toi, _)| hit.toi < best_toi) {
                    best = Some((hit.toi, face as u32));
                }
            }
        }

        Ok(best.map(|(toi, face)| RayHit {
            point: ray.at(toi),
            face,
        }))
    }
}

/// Pairs up faces sharing an edge. An edge used by a single face, or by
/// more than two, keeps [`NO_NEIGHBOUR`] on its unmatched sides.
fn edge_neighbours(indices: &[[u32; 3]]) -> Vec<[u32; 3]> {
    let mut neighbours = vec![[NO_NEIGHBOUR; 3]; indices.len()];
    let mut open: HashMap<(u32, u32), (usize, usize)> = HashMap::with_capacity(indices.len() * 2);
    for (face, tri) in indices.iter().enumerate() {
        for edge in 0..3 {
            let (a, b) = (tri[edge], tri[(edge + 1) % 3]);
            let key = (a.min(b), a.max(b));
            if let Some((other, other_edge)) = open.remove(&key) {
                neighbours[face][edge] = other as u32;
                neighbours[other][other_edge] = face as u32;
            } else {
                open.insert(key, (face, edge));
            }
        }
    }
    neighbours
}

struct TriangleHit {
    toi: f32,
    /// Whether the hit lies on edge `k`, from corner `k` to corner `k + 1`.
    edges: [bool; 3],
}

/// Time of impact of a ray with a triangle, counting hits on edges and
/// vertices and ignoring rays parallel to the triangle's plane.
pub fn ray_triangle_toi(a: Vec3, b: Vec3, c: Vec3, ray: &Ray) -> Option<f32> {
    ray_triangle(a, b, c, ray).map(|hit| hit.toi)
}

fn ray_triangle(a: Vec3, b: Vec3, c: Vec3, ray: &Ray) -> Option<TriangleHit> {
    let ab = b - a;
    let ac = c - a;

    // normal
    let n = ab.cross(ac);
    let d = n.dot(ray.direction);

    // the normal and the ray direction are perpendicular
    if d == 0.0 {
        return None;
    }

    let ap = ray.origin - a;
    let t = ap.dot(n);

    // the ray starts on the far side of the triangle's plane
    if (t < 0.0 && d < 0.0) || (t > 0.0 && d > 0.0) {
        return None;
    }

    let d_abs = d.abs();
    let e = -ray.direction.cross(ap);

    // barycentric coordinates, scaled by |d|
    let (v, w) = if d > 0.0 {
        (-ac.dot(e), ab.dot(e))
    } else {
        (ac.dot(e), -ab.dot(e))
    };
    if v < 0.0 || v > d_abs || w < 0.0 || v + w > d_abs {
        return None;
    }

    Some(TriangleHit {
        toi: t.abs() / d_abs,
        // v weighs b and w weighs c
        edges: [w == 0.0, v + w == d_abs, v == 0.0],
    })
}
