//! Occupancy grids and per-voxel vector fields.

use glam::Vec3;
use specimask_core::{Error, Lattice, LatticeIndex, Result};

/// Boolean occupancy over a lattice, stored x-fastest.
///
/// Produced by the builder or a grid reader and never mutated afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelGrid {
    lattice: Lattice,
    cells: Vec<bool>,
}

impl VoxelGrid {
    /// An all-empty grid.
    pub fn empty(lattice: Lattice) -> Self {
        Self {
            cells: vec![false; lattice.len()],
            lattice,
        }
    }

    /// Wrap existing cells; the length must be `M^3`.
    pub fn from_cells(lattice: Lattice, cells: Vec<bool>) -> Result<Self> {
        if cells.len() != lattice.len() {
            return Err(Error::InvalidData(format!(
                "expected {} cells for resolution {}, got {}",
                lattice.len(),
                lattice.resolution(),
                cells.len()
            )));
        }
        Ok(Self { lattice, cells })
    }

    /// Build a grid by evaluating `f` at every lattice index.
    pub fn from_fn(lattice: Lattice, mut f: impl FnMut(LatticeIndex) -> bool) -> Self {
        let cells = lattice.indices().map(&mut f).collect();
        Self { lattice, cells }
    }

    #[inline]
    pub const fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Voxels per axis
    #[inline]
    pub const fn resolution(&self) -> u32 {
        self.lattice.resolution()
    }

    /// Flat cell storage (x fastest, then y, then z)
    #[inline]
    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    /// Take the flat cell storage
    pub fn into_cells(self) -> Vec<bool> {
        self.cells
    }

    /// Occupancy at a lattice index.
    #[inline]
    pub fn get(&self, index: LatticeIndex) -> bool {
        self.cells[index.to_linear(self.resolution())]
    }

    /// Occupancy at `(x, y, z)`.
    #[inline]
    pub fn get_xyz(&self, x: u32, y: u32, z: u32) -> bool {
        self.get(LatticeIndex::new(x, y, z))
    }

    /// One z-slice, rows of constant y.
    pub fn slice(&self, z: u32) -> &[bool] {
        let len = self.lattice.slice_len();
        let start = z as usize * len;
        &self.cells[start..start + len]
    }

    /// Number of occupied voxels.
    pub fn count_occupied(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Occupied voxels as a fraction of all voxels.
    pub fn occupied_fraction(&self) -> f64 {
        self.count_occupied() as f64 / self.cells.len() as f64
    }

    /// Occupied fraction times the domain volume.
    pub fn occupied_volume(&self) -> f64 {
        self.occupied_fraction() * f64::from(self.lattice.domain().volume())
    }

    /// Iterate over the indices of occupied voxels in storage order.
    pub fn iter_occupied(&self) -> impl Iterator<Item = LatticeIndex> + '_ {
        let resolution = self.resolution();
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c)
            .map(move |(i, _)| LatticeIndex::from_linear(i, resolution))
    }
}

/// A direction per voxel; zero wherever the matching mask voxel is empty.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorField {
    lattice: Lattice,
    vectors: Vec<Vec3>,
}

impl VectorField {
    /// An all-zero field.
    pub fn zeros(lattice: Lattice) -> Self {
        Self {
            vectors: vec![Vec3::ZERO; lattice.len()],
            lattice,
        }
    }

    /// Wrap existing vectors; the length must be `M^3`.
    pub fn from_vectors(lattice: Lattice, vectors: Vec<Vec3>) -> Result<Self> {
        if vectors.len() != lattice.len() {
            return Err(Error::InvalidData(format!(
                "expected {} vectors for resolution {}, got {}",
                lattice.len(),
                lattice.resolution(),
                vectors.len()
            )));
        }
        Ok(Self { lattice, vectors })
    }

    #[inline]
    pub const fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Voxels per axis
    #[inline]
    pub const fn resolution(&self) -> u32 {
        self.lattice.resolution()
    }

    /// Flat vector storage (x fastest, then y, then z)
    #[inline]
    pub fn vectors(&self) -> &[Vec3] {
        &self.vectors
    }

    /// Vector at a lattice index.
    #[inline]
    pub fn get(&self, index: LatticeIndex) -> Vec3 {
        self.vectors[index.to_linear(self.resolution())]
    }

    /// One scalar component (0 = x, 1 = y, 2 = z) of every vector.
    pub fn component(&self, axis: usize) -> Vec<f32> {
        self.vectors.iter().map(|v| v[axis]).collect()
    }

    /// Exact bitwise equality, distinguishing `0.0` from `-0.0`.
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.lattice == other.lattice
            && self.vectors.len() == other.vectors.len()
            && self
                .vectors
                .iter()
                .zip(&other.vectors)
                .all(|(a, b)| a.to_array().map(f32::to_bits) == b.to_array().map(f32::to_bits))
    }

    /// True when every vector outside `mask` is zero.
    pub fn is_supported_by(&self, mask: &VoxelGrid) -> bool {
        self.vectors.len() == mask.cells().len()
            && self
                .vectors
                .iter()
                .zip(mask.cells())
                .all(|(v, &occupied)| occupied || *v == Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_grid_has_no_occupancy() {
        let grid = VoxelGrid::empty(Lattice::unit(4).unwrap());
        assert_eq!(grid.count_occupied(), 0);
        assert_eq!(grid.cells().len(), 64);
        assert_eq!(grid.iter_occupied().count(), 0);
    }

    #[test]
    fn from_cells_checks_length() {
        let lattice = Lattice::unit(2).unwrap();
        assert!(matches!(
            VoxelGrid::from_cells(lattice, vec![true; 7]),
            Err(Error::InvalidData(_))
        ));
        assert!(VoxelGrid::from_cells(lattice, vec![true; 8]).is_ok());
    }

    #[test]
    fn from_fn_uses_storage_order() {
        let grid = VoxelGrid::from_fn(Lattice::unit(3).unwrap(), |i| i.x == 2 && i.z == 1);
        assert!(grid.get_xyz(2, 0, 1));
        assert!(grid.get_xyz(2, 2, 1));
        assert!(!grid.get_xyz(2, 0, 0));
        assert_eq!(grid.count_occupied(), 3);
        assert_eq!(grid.slice(1).iter().filter(|&&c| c).count(), 3);
        assert!(grid.slice(0).iter().all(|&c| !c));
    }

    #[test]
    fn occupied_volume_scales_with_domain() {
        let lattice = Lattice::unit(2).unwrap();
        let cells = vec![true, false, false, false, true, false, false, false];
        let grid = VoxelGrid::from_cells(lattice, cells).unwrap();
        assert_eq!(grid.occupied_fraction(), 0.25);
        assert_eq!(grid.occupied_volume(), 0.25);
        let occupied: Vec<_> = grid.iter_occupied().collect();
        assert_eq!(occupied, vec![LatticeIndex::new(0, 0, 0), LatticeIndex::new(0, 0, 1)]);
    }

    #[test]
    fn field_bit_eq_distinguishes_signed_zero() {
        let lattice = Lattice::unit(1).unwrap();
        let a = VectorField::from_vectors(lattice, vec![Vec3::ZERO]).unwrap();
        let b = VectorField::from_vectors(lattice, vec![Vec3::new(-0.0, 0.0, 0.0)]).unwrap();
        assert_eq!(a, b);
        assert!(!a.bit_eq(&b));
        assert!(a.bit_eq(&a.clone()));
    }

    #[test]
    fn field_support_follows_mask() {
        let lattice = Lattice::unit(1).unwrap();
        let field = VectorField::from_vectors(lattice, vec![Vec3::Z]).unwrap();
        let full = VoxelGrid::from_cells(lattice, vec![true]).unwrap();
        let empty = VoxelGrid::empty(lattice);
        assert!(field.is_supported_by(&full));
        assert!(!field.is_supported_by(&empty));
        assert!(VectorField::zeros(lattice).is_supported_by(&empty));
    }
}
